//! Directory listing routes: `/dir` and `/dir/{*prefix}`.

use axum::extract::{Path, Query, State};
use axum::response::Json;
use serde::Deserialize;

use crate::services::index::DirListing;
use crate::state::AppState;

pub const DEFAULT_LIMIT: usize = 500;
pub const MAX_LIMIT: usize = 5000;

#[derive(Debug, Default, Deserialize)]
pub struct DirQuery {
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

impl DirQuery {
    fn page(&self) -> (usize, usize) {
        let limit = self.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
        (self.offset.unwrap_or(0), limit)
    }
}

/// `GET /dir`: top level of the index.
pub async fn list_root(State(state): State<AppState>, Query(query): Query<DirQuery>) -> Json<DirListing> {
    let (offset, limit) = query.page();
    Json(state.index.list_dir("", offset, limit).await)
}

/// `GET /dir/{*prefix}`: one level below `prefix`.
pub async fn list_prefix(
    State(state): State<AppState>,
    Path(prefix): Path<String>,
    Query(query): Query<DirQuery>,
) -> Json<DirListing> {
    let (offset, limit) = query.page();
    Json(state.index.list_dir(&prefix, offset, limit).await)
}

#[cfg(test)]
#[path = "dir_test.rs"]
mod tests;
