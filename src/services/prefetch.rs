//! Prefetch service: keeps a bounded queue of random images ready.
//!
//! DESIGN
//! ======
//! Workers pick a random indexed key, fetch it, and push the bytes into a
//! bounded channel. `/random` pops from the other end, so a request is
//! served from memory while the workers refill in the background. A full
//! queue blocks the workers; dropping the receiver stops them.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::GalleryConfig;
use crate::services::index::ImageIndex;
use crate::store::{ObjectStore, StoreError, content_type_for_key};

#[derive(Debug, Clone)]
pub struct CachedImage {
    pub key: String,
    pub bytes: Bytes,
    pub content_type: String,
}

/// Spawn `config.prefetch_workers` workers and return the queue receiver.
pub fn spawn_prefetchers(
    store: Arc<dyn ObjectStore>,
    index: ImageIndex,
    config: &GalleryConfig,
) -> (mpsc::Receiver<CachedImage>, Vec<JoinHandle<()>>) {
    let (tx, rx) = mpsc::channel::<CachedImage>(config.cache_capacity);
    let idle = Duration::from_millis(config.prefetch_idle_ms);

    info!(workers = config.prefetch_workers, cache_capacity = config.cache_capacity, "image prefetch started");

    let handles = (0..config.prefetch_workers)
        .map(|worker| {
            let store = store.clone();
            let index = index.clone();
            let tx = tx.clone();
            tokio::spawn(async move { prefetch_loop(worker, store.as_ref(), &index, &tx, idle).await })
        })
        .collect();

    (rx, handles)
}

async fn prefetch_loop(
    worker: usize,
    store: &dyn ObjectStore,
    index: &ImageIndex,
    tx: &mpsc::Sender<CachedImage>,
    idle: Duration,
) {
    while !tx.is_closed() {
        let Some(key) = index.random_key().await else {
            tokio::time::sleep(idle).await;
            continue;
        };

        match store.get(&key).await {
            Ok(body) => {
                let content_type = body
                    .content_type
                    .filter(|ct| ct.starts_with("image/"))
                    .unwrap_or_else(|| content_type_for_key(&key).to_owned());
                debug!(worker, key = %key, size = body.bytes.len(), "prefetched image");
                let image = CachedImage { key, bytes: body.bytes, content_type };
                if tx.send(image).await.is_err() {
                    break;
                }
            }
            Err(StoreError::NotFound(_)) => {
                warn!(worker, key = %key, "indexed image missing from store; dropping from index");
                index.remove(&key).await;
            }
            Err(e) => {
                warn!(worker, key = %key, error = %e, "image prefetch failed");
                tokio::time::sleep(idle).await;
            }
        }
    }
    debug!(worker, "image prefetch stopped");
}

#[cfg(test)]
#[path = "prefetch_test.rs"]
mod tests;
