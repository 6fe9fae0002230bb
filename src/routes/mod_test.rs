use super::*;
use crate::config::GalleryConfig;
use crate::frontend::dev_server_config;
use crate::services::index::{ImageIndex, IndexStatus, spawn_indexing};
use crate::services::prefetch::spawn_prefetchers;
use crate::store::local::LocalStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

fn write(root: &Path, key: &str, contents: &[u8]) {
    let path = root.join(key);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

/// Full stack over a temp directory: index, prefetch, router on a loopback port.
async fn serve(root: &Path, frontend_dir: Option<&Path>) -> String {
    let store: Arc<dyn crate::store::ObjectStore> = Arc::new(LocalStore::new(root.to_path_buf()));
    let gallery = GalleryConfig { cache_capacity: 2, prefetch_idle_ms: 5, ..GalleryConfig::default() };
    let index = ImageIndex::new(gallery.image_extensions.clone());
    spawn_indexing(store.clone(), index.clone(), &gallery)
        .await
        .unwrap();
    assert_eq!(index.status().await, IndexStatus::Ready);

    let (queue, _workers) = spawn_prefetchers(store.clone(), index.clone(), &gallery);
    let state = AppState::new(store, index, queue, Duration::from_secs(2));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = app(state, frontend_dir);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn fixture() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "2024/01/a.jpg", b"\xff\xd8a");
    write(dir.path(), "2024/b.jpeg", b"\xff\xd8b");
    write(dir.path(), "notes.txt", b"not an image");
    dir
}

#[tokio::test]
async fn every_dev_proxy_prefix_is_served() {
    let photos = fixture();
    let base = serve(photos.path(), None).await;
    let client = reqwest::Client::new();

    let sample_paths = [("/random", "/random"), ("/obj", "/obj/2024/b.jpeg"), ("/dir", "/dir")];
    let config = dev_server_config();
    for rule in config.server.proxy.rules() {
        let (_, path) = sample_paths
            .iter()
            .find(|(prefix, _)| *prefix == rule.prefix)
            .expect("every proxied prefix has a sample path");
        let response = client.get(format!("{base}{path}")).send().await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK, "prefix {}", rule.prefix);
    }
}

#[tokio::test]
async fn random_serves_indexed_jpegs() {
    let photos = fixture();
    let base = serve(photos.path(), None).await;

    for _ in 0..4 {
        let response = reqwest::get(format!("{base}/random")).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "image/jpeg");
        let key = response.headers()["x-object-key"].to_str().unwrap().to_owned();
        assert!(key == "2024%2F01%2Fa.jpg" || key == "2024%2Fb.jpeg", "unexpected key {key}");
        let body = response.bytes().await.unwrap();
        assert_eq!(&body[..2], b"\xff\xd8");
    }
}

#[tokio::test]
async fn obj_returns_bytes_and_rejects_non_images() {
    let photos = fixture();
    let base = serve(photos.path(), None).await;

    let response = reqwest::get(format!("{base}/obj/2024/01/a.jpg")).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(&response.bytes().await.unwrap()[..], b"\xff\xd8a");

    let response = reqwest::get(format!("{base}/obj/notes.txt")).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);

    let response = reqwest::get(format!("{base}/obj/2024/missing.jpg")).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn dir_lists_json_by_prefix() {
    let photos = fixture();
    let base = serve(photos.path(), None).await;

    let root: serde_json::Value = reqwest::get(format!("{base}/dir")).await.unwrap().json().await.unwrap();
    assert_eq!(root["prefix"], "");
    assert_eq!(root["dirs"][0]["name"], "2024");
    assert_eq!(root["dirs"][0]["count"], 2);
    assert_eq!(root["total_files"], 0);
    assert_eq!(root["status"], "ready");

    let year: serde_json::Value = reqwest::get(format!("{base}/dir/2024?limit=10"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(year["prefix"], "2024/");
    assert_eq!(year["files"][0]["key"], "2024/b.jpeg");
    assert_eq!(year["dirs"][0]["prefix"], "2024/01/");
    assert_eq!(year["limit"], 10);
}

#[tokio::test]
async fn favicon_and_unknown_paths_are_not_found() {
    let photos = fixture();
    let base = serve(photos.path(), None).await;

    for path in ["/favicon.ico", "/", "/obj", "/app"] {
        let response = reqwest::get(format!("{base}{path}")).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND, "path {path}");
    }
    let response = reqwest::get(format!("{base}/healthz")).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
}

#[tokio::test]
async fn frontend_dir_is_served_as_fallback() {
    let photos = fixture();
    let front = tempfile::tempdir().unwrap();
    write(front.path(), "index.html", b"<!doctype html><div class=\"grid grid-cols-3\"></div>");

    let base = serve(photos.path(), Some(front.path())).await;
    let response = reqwest::get(format!("{base}/")).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert!(response.text().await.unwrap().contains("grid-cols-3"));

    let response = reqwest::get(format!("{base}/dir")).await.unwrap();
    assert_eq!(response.headers()["content-type"], "application/json");
}

#[tokio::test]
async fn serve_reports_address_in_use() {
    let photos = fixture();
    let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = taken.local_addr().unwrap().to_string();

    let store: Arc<dyn crate::store::ObjectStore> = Arc::new(LocalStore::new(photos.path().to_path_buf()));
    let (state, _tx) = crate::state::test_helpers::test_app_state(store);
    let result = super::serve(&addr, app(state, None)).await;
    assert!(result.is_err());
}
