//! Image index: bucket listing and the in-memory key set.
//!
//! DESIGN
//! ======
//! A lister task pages through the whole bucket and feeds every object into
//! a bounded channel; an indexer task drains it and keeps only image keys.
//! The channel bound means a slow indexer throttles listing instead of
//! buffering the bucket in memory. The index serves random picks (prefetch)
//! and `/`-delimited directory listings (`/dir`).
//!
//! ERROR HANDLING
//! ==============
//! Retryable listing failures back off exponentially. When retries run out
//! the index keeps whatever was listed so far and reports `Failed`; the
//! server stays up and serves the partial set.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde::Serialize;
use tokio::sync::{RwLock, mpsc};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::GalleryConfig;
use crate::store::{ObjectMeta, ObjectStore, StoreError};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexStatus {
    Loading,
    Ready,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirEntry {
    pub name: String,
    pub prefix: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    pub key: String,
    pub name: String,
    pub size: u64,
    pub last_modified: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirListing {
    pub prefix: String,
    pub dirs: Vec<DirEntry>,
    pub files: Vec<FileEntry>,
    pub total_files: usize,
    pub offset: usize,
    pub limit: usize,
    pub status: IndexStatus,
}

// =============================================================================
// INDEX
// =============================================================================

/// Shared set of indexed images. Clone is cheap.
#[derive(Clone)]
pub struct ImageIndex {
    inner: Arc<RwLock<IndexInner>>,
    extensions: Arc<[String]>,
}

struct IndexInner {
    objects: BTreeMap<String, ObjectMeta>,
    /// Same keys as `objects`, for uniform random picks.
    keys: Vec<String>,
    /// Position of each key in `keys`.
    positions: HashMap<String, usize>,
    status: IndexStatus,
}

impl ImageIndex {
    /// `extensions` are lower-case and dot-less, e.g. `["jpg", "jpeg"]`.
    #[must_use]
    pub fn new(extensions: Vec<String>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(IndexInner {
                objects: BTreeMap::new(),
                keys: Vec::new(),
                positions: HashMap::new(),
                status: IndexStatus::Loading,
            })),
            extensions: extensions.into(),
        }
    }

    #[must_use]
    pub fn is_image_key(&self, key: &str) -> bool {
        is_image_key(key, &self.extensions)
    }

    /// Insert an image object. Returns `false` for non-image keys.
    pub async fn insert(&self, meta: ObjectMeta) -> bool {
        if !self.is_image_key(&meta.key) {
            return false;
        }
        let mut inner = self.inner.write().await;
        if !inner.objects.contains_key(&meta.key) {
            let position = inner.keys.len();
            inner.positions.insert(meta.key.clone(), position);
            inner.keys.push(meta.key.clone());
        }
        inner.objects.insert(meta.key.clone(), meta);
        true
    }

    /// Drop a key, e.g. after the store reports it gone.
    pub async fn remove(&self, key: &str) -> Option<ObjectMeta> {
        let mut inner = self.inner.write().await;
        let meta = inner.objects.remove(key)?;
        if let Some(position) = inner.positions.remove(key) {
            inner.keys.swap_remove(position);
            if let Some(moved) = inner.keys.get(position).cloned() {
                inner.positions.insert(moved, position);
            }
        }
        Some(meta)
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.objects.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.objects.is_empty()
    }

    pub async fn get(&self, key: &str) -> Option<ObjectMeta> {
        self.inner.read().await.objects.get(key).cloned()
    }

    pub async fn status(&self) -> IndexStatus {
        self.inner.read().await.status
    }

    pub async fn set_status(&self, status: IndexStatus) {
        self.inner.write().await.status = status;
    }

    /// Uniformly random indexed key, or `None` while the index is empty.
    pub async fn random_key(&self) -> Option<String> {
        let inner = self.inner.read().await;
        if inner.keys.is_empty() {
            return None;
        }
        let i = rand::rng().random_range(0..inner.keys.len());
        Some(inner.keys[i].clone())
    }

    /// Immediate children of `prefix`, treating `/` as the delimiter.
    ///
    /// `prefix` is normalised: leading slashes are dropped and a trailing
    /// slash is added when non-empty. Files are paged by `offset`/`limit`;
    /// directories are always complete.
    pub async fn list_dir(&self, prefix: &str, offset: usize, limit: usize) -> DirListing {
        let prefix = normalize_prefix(prefix);
        let inner = self.inner.read().await;

        let mut dirs: BTreeMap<&str, usize> = BTreeMap::new();
        let mut files: Vec<&ObjectMeta> = Vec::new();
        for (key, meta) in inner
            .objects
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
        {
            let rest = &key[prefix.len()..];
            match rest.split_once('/') {
                Some((dir, _)) => *dirs.entry(dir).or_default() += 1,
                None => files.push(meta),
            }
        }

        let total_files = files.len();
        DirListing {
            dirs: dirs
                .into_iter()
                .map(|(name, count)| DirEntry { name: name.to_owned(), prefix: format!("{prefix}{name}/"), count })
                .collect(),
            files: files
                .into_iter()
                .skip(offset)
                .take(limit)
                .map(|meta| FileEntry {
                    key: meta.key.clone(),
                    name: meta.key[prefix.len()..].to_owned(),
                    size: meta.size,
                    last_modified: meta.last_modified.clone(),
                })
                .collect(),
            prefix,
            total_files,
            offset,
            limit,
            status: inner.status,
        }
    }
}

/// Case-insensitive extension check against dot-less lower-case extensions.
#[must_use]
pub fn is_image_key(key: &str, extensions: &[String]) -> bool {
    let name = key.rsplit('/').next().unwrap_or(key);
    let Some((stem, ext)) = name.rsplit_once('.') else {
        return false;
    };
    !stem.is_empty() && extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
}

#[must_use]
pub fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_start_matches('/');
    if trimmed.is_empty() || trimmed.ends_with('/') {
        trimmed.to_owned()
    } else {
        format!("{trimmed}/")
    }
}

// =============================================================================
// LISTER + INDEXER
// =============================================================================

#[derive(Debug, Clone, Copy)]
struct RetryPolicy {
    retries: u32,
    base: Duration,
}

/// Spawn the lister and indexer. The returned handle completes once the
/// whole bucket has been listed and indexed (or listing gave up).
pub fn spawn_indexing(store: Arc<dyn ObjectStore>, index: ImageIndex, config: &GalleryConfig) -> JoinHandle<()> {
    let (tx, mut rx) = mpsc::channel::<ObjectMeta>(config.list_queue_capacity);
    let policy = RetryPolicy { retries: config.list_retries, base: Duration::from_millis(config.list_retry_base_ms) };

    info!(
        queue_capacity = config.list_queue_capacity,
        retries = policy.retries,
        extensions = ?index.extensions,
        "bucket indexing started"
    );

    let lister = tokio::spawn(async move { list_all(store.as_ref(), &tx, policy).await });

    tokio::spawn(async move {
        while let Some(meta) = rx.recv().await {
            index.insert(meta).await;
        }

        let outcome = lister.await;
        let indexed = index.len().await;
        let status = match outcome {
            Ok(Ok(listed)) => {
                info!(listed, indexed, "indexing finished");
                IndexStatus::Ready
            }
            Ok(Err(e)) => {
                error!(error = %e, indexed, "bucket listing failed; serving partial index");
                IndexStatus::Failed
            }
            Err(e) => {
                error!(error = %e, "lister task aborted");
                IndexStatus::Failed
            }
        };
        index.set_status(status).await;
    })
}

/// Page through the store, sending every object. Returns the number listed.
async fn list_all(
    store: &dyn ObjectStore,
    tx: &mpsc::Sender<ObjectMeta>,
    policy: RetryPolicy,
) -> Result<usize, StoreError> {
    let mut token: Option<String> = None;
    let mut count = 0usize;

    loop {
        let page = list_page_with_retry(store, token.as_deref(), policy).await?;
        count += page.objects.len();
        info!(count, "objects listed");

        for meta in page.objects {
            if tx.send(meta).await.is_err() {
                warn!(count, "index receiver dropped; stopping listing");
                return Ok(count);
            }
        }

        token = page.next_token;
        if token.is_none() {
            return Ok(count);
        }
    }
}

async fn list_page_with_retry(
    store: &dyn ObjectStore,
    token: Option<&str>,
    policy: RetryPolicy,
) -> Result<crate::store::ObjectPage, StoreError> {
    let mut attempt = 0u32;
    loop {
        match store.list_page(token).await {
            Ok(page) => return Ok(page),
            Err(e) if e.retryable() && attempt < policy.retries => {
                let delay = backoff(policy.base, attempt);
                warn!(error = %e, attempt, delay_ms = delay.as_millis(), "bucket listing failed; retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// `base * 2^attempt`, capped at 30s.
fn backoff(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(1u32 << attempt.min(16)).min(Duration::from_secs(30))
}

#[cfg(test)]
#[path = "index_test.rs"]
mod tests;
