use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid blob path: {0}")]
    InvalidPath(String),
}

/// Opaque blob storage for uploaded files. Writes return the public URL path
/// the file is served under; deletes take that same path back.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, namespace: &str, filename: &str, bytes: &[u8]) -> Result<String, BlobError>;

    async fn delete(&self, url_path: &str) -> Result<(), BlobError>;
}

pub const PUBLIC_PREFIX: &str = "/uploads/";

fn check_segment(segment: &str) -> Result<(), BlobError> {
    if segment.is_empty()
        || segment.contains('/')
        || segment.contains('\\')
        || segment.contains("..")
    {
        return Err(BlobError::InvalidPath(segment.to_string()));
    }
    Ok(())
}

/// Filesystem-backed blob store rooted at the uploads directory, which is
/// served statically at /uploads.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, url_path: &str) -> Result<PathBuf, BlobError> {
        let relative = url_path
            .strip_prefix(PUBLIC_PREFIX)
            .ok_or_else(|| BlobError::InvalidPath(url_path.to_string()))?;
        let mut resolved = self.root.clone();
        for segment in relative.split('/') {
            check_segment(segment)?;
            resolved.push(segment);
        }
        Ok(resolved)
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, namespace: &str, filename: &str, bytes: &[u8]) -> Result<String, BlobError> {
        check_segment(namespace)?;
        check_segment(filename)?;
        let dir = self.root.join(namespace);
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(filename), bytes).await?;
        Ok(format!("{}{}/{}", PUBLIC_PREFIX, namespace, filename))
    }

    async fn delete(&self, url_path: &str) -> Result<(), BlobError> {
        let path = self.resolve(url_path)?;
        tokio::fs::remove_file(path).await?;
        Ok(())
    }
}

/// In-memory blob store used by tests.
#[derive(Default)]
pub struct MemoryBlobStore {
    files: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn contains(&self, url_path: &str) -> bool {
        self.files.read().await.contains_key(url_path)
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, namespace: &str, filename: &str, bytes: &[u8]) -> Result<String, BlobError> {
        check_segment(namespace)?;
        check_segment(filename)?;
        let url = format!("{}{}/{}", PUBLIC_PREFIX, namespace, filename);
        self.files.write().await.insert(url.clone(), bytes.to_vec());
        Ok(url)
    }

    async fn delete(&self, url_path: &str) -> Result<(), BlobError> {
        let mut files = self.files.write().await;
        files
            .remove(url_path)
            .map(|_| ())
            .ok_or_else(|| BlobError::InvalidPath(url_path.to_string()))
    }
}
