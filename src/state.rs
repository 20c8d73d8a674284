use std::sync::Arc;

use crate::blob::{BlobStore, FsBlobStore, MemoryBlobStore};
use crate::config;
use crate::models::{Article, User};
use crate::store::memory::MemoryCollection;
use crate::store::postgres::PgStore;
use crate::store::{Collection, Repo, StoreError};

/// Shared application state: typed collection handles plus the blob store.
#[derive(Clone)]
pub struct AppState {
    pub articles: Repo<Article>,
    pub users: Repo<User>,
    pub blobs: Arc<dyn BlobStore>,
}

impl AppState {
    pub fn new(
        articles: Arc<dyn Collection>,
        users: Arc<dyn Collection>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            articles: Repo::new(articles),
            users: Repo::new(users),
            blobs,
        }
    }

    /// Fully in-memory state for tests and store-less local runs.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryCollection::new()),
            Arc::new(MemoryCollection::new()),
            Arc::new(MemoryBlobStore::new()),
        )
    }

    /// Postgres-backed state, creating collection tables when missing.
    pub async fn postgres(url: &str) -> Result<Self, StoreError> {
        let store = PgStore::connect(url).await?;
        store.ensure_collections().await?;
        let uploads_root = config::config().uploads.root.clone();
        Ok(Self::new(
            Arc::new(store.collection("articles")?),
            Arc::new(store.collection("users")?),
            Arc::new(FsBlobStore::new(uploads_root)),
        ))
    }
}
