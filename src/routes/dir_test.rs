use super::*;
use crate::services::index::IndexStatus;
use crate::state::test_helpers;
use crate::store::local::LocalStore;
use std::sync::Arc;

fn state() -> AppState {
    let (state, _tx) = test_helpers::test_app_state(Arc::new(LocalStore::new("/nonexistent".into())));
    state
}

#[test]
fn dir_query_defaults_and_caps_limit() {
    assert_eq!(DirQuery::default().page(), (0, DEFAULT_LIMIT));
    let query = DirQuery { offset: Some(7), limit: Some(1_000_000) };
    assert_eq!(query.page(), (7, MAX_LIMIT));
}

#[tokio::test]
async fn list_root_reports_dirs_and_files() {
    let state = state();
    test_helpers::seed_index(&state, &["a.jpg", "2024/b.jpg", "2024/c.jpg"]).await;

    let Json(listing) = list_root(State(state), Query(DirQuery::default())).await;
    assert_eq!(listing.prefix, "");
    assert_eq!(listing.dirs.len(), 1);
    assert_eq!(listing.dirs[0].count, 2);
    assert_eq!(listing.files.len(), 1);
    assert_eq!(listing.limit, DEFAULT_LIMIT);
    assert_eq!(listing.status, IndexStatus::Loading);
}

#[tokio::test]
async fn list_prefix_pages_files() {
    let state = state();
    test_helpers::seed_index(&state, &["2024/a.jpg", "2024/b.jpg", "2024/c.jpg"]).await;

    let query = DirQuery { offset: Some(1), limit: Some(1) };
    let Json(listing) = list_prefix(State(state), Path("2024".to_owned()), Query(query)).await;
    assert_eq!(listing.prefix, "2024/");
    assert_eq!(listing.total_files, 3);
    assert_eq!(listing.files.len(), 1);
    assert_eq!(listing.files[0].key, "2024/b.jpg");
}

#[tokio::test]
async fn listing_serializes_status_snake_case() {
    let state = state();
    state.index.set_status(IndexStatus::Ready).await;
    let Json(listing) = list_root(State(state), Query(DirQuery::default())).await;
    let json = serde_json::to_value(&listing).unwrap();
    assert_eq!(json["status"], "ready");
    assert_eq!(json["files"], serde_json::json!([]));
}
