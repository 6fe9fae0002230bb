use std::time::Duration;

use picbox::config::AppConfig;
use picbox::frontend::dev_server_config;
use picbox::services::index::{ImageIndex, spawn_indexing};
use picbox::services::prefetch::spawn_prefetchers;
use picbox::{routes, state, store};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            std::process::exit(1);
        }
    };

    // The front-end dev server proxies to a fixed upstream.
    let proxy = dev_server_config().server.proxy;
    if !proxy.upstream_authorities().contains(&config.bind_addr) {
        tracing::warn!(
            bind_addr = %config.bind_addr,
            upstreams = ?proxy.upstream_authorities(),
            "bind address differs from the front-end proxy upstream"
        );
    }

    let store = match store::build_store(&config.store) {
        Ok(store) => store,
        Err(e) => {
            tracing::error!(error = %e, "object store init failed");
            std::process::exit(1);
        }
    };

    let index = ImageIndex::new(config.gallery.image_extensions.clone());

    // Spawn background listing + prefetch tasks.
    let _indexer = spawn_indexing(store.clone(), index.clone(), &config.gallery);
    let (queue, _prefetchers) = spawn_prefetchers(store.clone(), index.clone(), &config.gallery);

    let state = state::AppState::new(store, index, queue, Duration::from_secs(config.gallery.random_wait_secs));
    let app = routes::app(state, config.frontend_dir.as_deref());

    if let Err(e) = routes::serve(&config.bind_addr, app).await {
        tracing::error!(error = %e, bind_addr = %config.bind_addr, "server failed");
        std::process::exit(1);
    }
}
