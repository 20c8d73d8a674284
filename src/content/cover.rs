use chrono::Utc;

use crate::blob::{BlobStore, PUBLIC_PREFIX};
use crate::error::ApiError;

/// Sentinel meaning "no cover"; the front-end substitutes its bundled default.
pub const DEFAULT_COVER: &str = "default-cover.jpg";

pub const COVER_NAMESPACE: &str = "covers";

/// A file received with a create/update request.
#[derive(Debug, Clone)]
pub struct CoverUpload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Collision-resistant stored name: epoch-millis prefix plus the slugified
/// original name (lower-cased, spaces to hyphens).
pub fn object_name(original: &str, stamp_ms: i64) -> String {
    format!("{}-{}", stamp_ms, slugify(original))
}

fn slugify(name: &str) -> String {
    let slug: String = name
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == ' ' { '-' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        .collect();
    if slug.is_empty() {
        "cover".to_string()
    } else {
        slug
    }
}

/// Decide the article's new cover URL. Precedence: fresh upload, then an
/// explicit removal request, then a verbatim URL from the body, then the
/// sentinel. Stale covers are deleted best-effort; a failed delete is logged
/// and never aborts the surrounding create/update.
pub async fn resolve(
    blobs: &dyn BlobStore,
    existing: Option<&str>,
    upload: Option<CoverUpload>,
    remove_requested: bool,
    explicit_url: Option<&str>,
) -> Result<String, ApiError> {
    if let Some(upload) = upload {
        let name = object_name(&upload.filename, Utc::now().timestamp_millis());
        let url = blobs.put(COVER_NAMESPACE, &name, &upload.bytes).await?;
        discard(blobs, existing).await;
        return Ok(url);
    }

    if remove_requested {
        discard(blobs, existing).await;
        return Ok(DEFAULT_COVER.to_string());
    }

    if let Some(url) = explicit_url {
        // Covers both "already a full URL" and "unchanged" round-trips.
        return Ok(url.to_string());
    }

    Ok(DEFAULT_COVER.to_string())
}

/// Best-effort deletion of a replaced cover. Only files we store ourselves
/// (under the uploads prefix) are candidates.
async fn discard(blobs: &dyn BlobStore, existing: Option<&str>) {
    let Some(old) = existing else { return };
    if old == DEFAULT_COVER || !old.starts_with(PUBLIC_PREFIX) {
        return;
    }
    if let Err(e) = blobs.delete(old).await {
        tracing::warn!("failed to delete stale cover {}: {}", old, e);
    }
}
