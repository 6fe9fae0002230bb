//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! This process is the upstream of the front-end dev server's proxy table:
//! `/random`, `/obj` and `/dir` are forwarded here unmodified. In production
//! the built front-end can be served from the same router as a fallback.

pub mod dir;
pub mod images;

use std::path::Path;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Backend routes, plus the static front-end when `frontend_dir` is given.
pub fn app(state: AppState, frontend_dir: Option<&Path>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let router = Router::new()
        .route("/random", get(images::random_image))
        .route("/obj/{*key}", get(images::get_object))
        .route("/dir", get(dir::list_root))
        .route("/dir/", get(dir::list_root))
        .route("/dir/{*prefix}", get(dir::list_prefix))
        .route("/favicon.ico", get(not_found))
        .route("/healthz", get(healthz));

    let router = match frontend_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir).append_index_html_on_directories(true)),
        None => router,
    };

    router
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `bind_addr` and serve `app` until the server stops.
///
/// # Errors
///
/// Returns the I/O error if the address cannot be bound or the accept loop fails.
pub async fn serve(bind_addr: &str, app: Router) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!(bind_addr = %listener.local_addr()?, "picbox listening");
    axum::serve(listener, app).await
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
