//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! holds the object store, the image index, and the receiving end of the
//! prefetch queue. The sending end lives with the prefetch workers so they
//! stop once the last state clone is gone.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};

use crate::services::index::ImageIndex;
use crate::services::prefetch::CachedImage;
use crate::store::ObjectStore;

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped or Clone.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ObjectStore>,
    pub index: ImageIndex,
    /// Prefetched random images, popped by `/random`.
    pub image_queue: Arc<Mutex<mpsc::Receiver<CachedImage>>>,
    /// How long `/random` waits for the queue before giving up.
    pub random_wait: Duration,
}

impl AppState {
    #[must_use]
    pub fn new(
        store: Arc<dyn ObjectStore>,
        index: ImageIndex,
        image_queue: mpsc::Receiver<CachedImage>,
        random_wait: Duration,
    ) -> Self {
        Self { store, index, image_queue: Arc::new(Mutex::new(image_queue)), random_wait }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
