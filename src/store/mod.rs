//! Object store access.
//!
//! DESIGN
//! ======
//! The gallery only needs two calls from its bucket: list everything (paged)
//! and fetch one object. `ObjectStore` is that seam. `S3Store` talks to an
//! S3-compatible endpoint with SigV4-signed requests; `LocalStore` serves a
//! directory tree so the gallery can run without a bucket. The concrete
//! backend is picked from config by [`build_store`].

pub mod local;
pub mod s3;
pub mod sigv4;

use std::sync::Arc;

use axum::body::Bytes;

use crate::config::StoreConfig;

// =============================================================================
// TYPES
// =============================================================================

/// Listing entry for one stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    pub key: String,
    pub size: u64,
    pub last_modified: Option<String>,
    pub etag: Option<String>,
}

/// One page of a listing. `next_token` is `None` on the last page.
#[derive(Debug, Clone, Default)]
pub struct ObjectPage {
    pub objects: Vec<ObjectMeta>,
    pub next_token: Option<String>,
}

/// Fetched object contents.
#[derive(Debug, Clone)]
pub struct ObjectBody {
    pub bytes: Bytes,
    pub content_type: Option<String>,
}

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("invalid object key: {0}")]
    InvalidKey(String),

    #[error("store request failed: {0}")]
    Request(String),

    #[error("store response error: status {status}")]
    Status { status: u16, body: String },

    #[error("store response parse failed: {0}")]
    Parse(String),

    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl StoreError {
    /// Whether retrying the same call may succeed.
    #[must_use]
    pub fn retryable(&self) -> bool {
        matches!(self, Self::Request(_) | Self::Status { status: 429 | 500..=599, .. })
    }
}

// =============================================================================
// TRAIT
// =============================================================================

#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch one listing page, continuing from `token` when given.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the request fails or the response is malformed.
    async fn list_page(&self, token: Option<&str>) -> Result<ObjectPage, StoreError>;

    /// Fetch one object's bytes.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for a missing key, or another
    /// [`StoreError`] if the request fails.
    async fn get(&self, key: &str) -> Result<ObjectBody, StoreError>;
}

/// Build the store selected by config.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be constructed.
pub fn build_store(config: &StoreConfig) -> Result<Arc<dyn ObjectStore>, StoreError> {
    match config {
        StoreConfig::S3(s3_config) => Ok(Arc::new(s3::S3Store::new(s3_config.clone())?)),
        StoreConfig::Local { root } => Ok(Arc::new(local::LocalStore::new(root.clone()))),
    }
}

/// Content type guessed from a key's extension.
#[must_use]
pub fn content_type_for_key(key: &str) -> &'static str {
    let ext = key.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("avif") => "image/avif",
        Some("bmp") => "image/bmp",
        _ => "image/jpeg",
    }
}
