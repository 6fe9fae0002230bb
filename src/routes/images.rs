//! Image routes: `/random` and `/obj/{*key}`.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::http::header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE, HeaderName};
use axum::response::{IntoResponse, Response};
use tracing::{debug, warn};

use crate::state::AppState;
use crate::store::{StoreError, content_type_for_key};

/// Objects are immutable once uploaded.
const OBJECT_CACHE_CONTROL: &str = "public, max-age=86400";

fn image_response(key: &str, bytes: Bytes, content_type: &str, cache_control: &str) -> Response {
    let headers = [
        (CONTENT_TYPE, content_type.to_owned()),
        (CONTENT_LENGTH, bytes.len().to_string()),
        (CACHE_CONTROL, cache_control.to_owned()),
        (HeaderName::from_static("x-object-key"), urlencoding::encode(key).into_owned()),
    ];
    (headers, bytes).into_response()
}

/// `GET /random`: next prefetched random image.
pub async fn random_image(State(state): State<AppState>) -> Result<Response, StatusCode> {
    let queue = state.image_queue.clone();
    // Waiting for the lock counts against the same deadline as the queue.
    let next = tokio::time::timeout(state.random_wait, async move { queue.lock().await.recv().await }).await;

    match next {
        Ok(Some(image)) => {
            debug!(key = %image.key, size = image.bytes.len(), "serving random image");
            Ok(image_response(&image.key, image.bytes, &image.content_type, "no-store"))
        }
        Ok(None) => {
            warn!("image queue closed");
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
        Err(_) => {
            let indexed = state.index.len().await;
            warn!(
                wait_ms = state.random_wait.as_millis(),
                indexed,
                "no prefetched image available"
            );
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}

/// `GET /obj/{*key}`: one image by key.
pub async fn get_object(State(state): State<AppState>, Path(key): Path<String>) -> Result<Response, StatusCode> {
    if !state.index.is_image_key(&key) {
        return Err(StatusCode::NOT_FOUND);
    }

    let body = state.store.get(&key).await.map_err(|e| {
        if !matches!(e, StoreError::NotFound(_)) {
            warn!(key = %key, error = %e, "object fetch failed");
        }
        store_error_to_status(e)
    })?;

    let content_type = body
        .content_type
        .filter(|ct| ct.starts_with("image/"))
        .unwrap_or_else(|| content_type_for_key(&key).to_owned());
    Ok(image_response(&key, body.bytes, &content_type, OBJECT_CACHE_CONTROL))
}

pub(crate) fn store_error_to_status(err: StoreError) -> StatusCode {
    match err {
        StoreError::NotFound(_) | StoreError::InvalidKey(_) => StatusCode::NOT_FOUND,
        StoreError::Request(_) | StoreError::Status { .. } | StoreError::Parse(_) => StatusCode::BAD_GATEWAY,
        StoreError::Io(_) | StoreError::HttpClientBuild(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
#[path = "images_test.rs"]
mod tests;
