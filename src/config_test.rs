use super::*;
use std::collections::HashMap;

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect();
    move |key| map.get(key).cloned()
}

const S3_VARS: &[(&str, &str)] = &[
    ("S3_ENDPOINT", "https://s3.example.test/"),
    ("S3_BUCKET", "photos"),
    ("S3_ACCESS_KEY_ID", "AKID"),
    ("S3_SECRET_ACCESS_KEY", "SECRET"),
];

#[test]
fn from_lookup_defaults_to_s3_on_proxy_upstream() {
    let cfg = AppConfig::from_lookup(lookup(S3_VARS)).unwrap();
    assert_eq!(cfg.bind_addr, "127.0.0.1:8080");
    assert!(cfg.frontend_dir.is_none());
    assert_eq!(cfg.gallery, GalleryConfig::default());

    let StoreConfig::S3(s3) = cfg.store else {
        panic!("expected s3 store");
    };
    assert_eq!(s3.endpoint, "https://s3.example.test");
    assert_eq!(s3.bucket, "photos");
    assert_eq!(s3.region, DEFAULT_S3_REGION);
    assert_eq!(s3.credentials.access_key_id, "AKID");
    assert_eq!(
        s3.timeouts,
        S3Timeouts { request_secs: DEFAULT_S3_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_S3_CONNECT_TIMEOUT_SECS }
    );
}

#[test]
fn gallery_defaults_match_cache_and_queue_sizes() {
    let gallery = GalleryConfig::default();
    assert_eq!(gallery.image_extensions, vec!["jpg", "jpeg"]);
    assert_eq!(gallery.list_queue_capacity, 1000);
    assert_eq!(gallery.cache_capacity, 50);
    assert_eq!(gallery.prefetch_workers, 1);
}

#[test]
fn from_lookup_parses_overrides() {
    let mut vars = S3_VARS.to_vec();
    vars.extend([
        ("BIND_ADDR", "0.0.0.0:9090"),
        ("S3_REGION", "eu-west-1"),
        ("IMAGE_EXTENSIONS", "JPG, .png"),
        ("CACHE_CAPACITY", "8"),
        ("PREFETCH_WORKERS", "3"),
        ("RANDOM_WAIT_SECS", "2"),
        ("FRONTEND_DIR", "/srv/front"),
    ]);
    let cfg = AppConfig::from_lookup(lookup(&vars)).unwrap();
    assert_eq!(cfg.bind_addr, "0.0.0.0:9090");
    assert_eq!(cfg.gallery.image_extensions, vec!["jpg", "png"]);
    assert_eq!(cfg.gallery.cache_capacity, 8);
    assert_eq!(cfg.gallery.prefetch_workers, 3);
    assert_eq!(cfg.gallery.random_wait_secs, 2);
    assert_eq!(cfg.frontend_dir, Some(PathBuf::from("/srv/front")));
    let StoreConfig::S3(s3) = cfg.store else {
        panic!("expected s3 store");
    };
    assert_eq!(s3.region, "eu-west-1");
}

#[test]
fn from_lookup_fs_backend() {
    let cfg = AppConfig::from_lookup(lookup(&[("STORE_BACKEND", "fs"), ("STORE_DIR", "/data/photos")])).unwrap();
    assert_eq!(cfg.store, StoreConfig::Local { root: PathBuf::from("/data/photos") });
}

#[test]
fn from_lookup_missing_bucket_errors() {
    let vars: Vec<_> = S3_VARS.iter().copied().filter(|(k, _)| *k != "S3_BUCKET").collect();
    let err = AppConfig::from_lookup(lookup(&vars)).unwrap_err();
    assert_eq!(err, ConfigError::Missing("S3_BUCKET"));
}

#[test]
fn from_lookup_blank_value_counts_as_missing() {
    let mut vars = S3_VARS.to_vec();
    vars.retain(|(k, _)| *k != "S3_SECRET_ACCESS_KEY");
    vars.push(("S3_SECRET_ACCESS_KEY", "   "));
    let err = AppConfig::from_lookup(lookup(&vars)).unwrap_err();
    assert_eq!(err, ConfigError::Missing("S3_SECRET_ACCESS_KEY"));
}

#[test]
fn from_lookup_malformed_number_errors() {
    let mut vars = S3_VARS.to_vec();
    vars.push(("CACHE_CAPACITY", "lots"));
    let err = AppConfig::from_lookup(lookup(&vars)).unwrap_err();
    assert_eq!(err, ConfigError::Invalid { var: "CACHE_CAPACITY", value: "lots".into() });
}

#[test]
fn from_lookup_zero_capacity_errors() {
    let mut vars = S3_VARS.to_vec();
    vars.push(("LIST_QUEUE_CAPACITY", "0"));
    assert!(matches!(
        AppConfig::from_lookup(lookup(&vars)),
        Err(ConfigError::Invalid { var: "LIST_QUEUE_CAPACITY", .. })
    ));
}

#[test]
fn from_lookup_unknown_backend_errors() {
    let err = AppConfig::from_lookup(lookup(&[("STORE_BACKEND", "gcs")])).unwrap_err();
    assert!(err.to_string().contains("unknown STORE_BACKEND"));
}

#[test]
fn from_lookup_rejects_endpoint_without_scheme() {
    let mut vars: Vec<_> = S3_VARS.iter().copied().filter(|(k, _)| *k != "S3_ENDPOINT").collect();
    vars.push(("S3_ENDPOINT", "s3.example.test"));
    assert!(matches!(
        AppConfig::from_lookup(lookup(&vars)),
        Err(ConfigError::Invalid { var: "S3_ENDPOINT", .. })
    ));
}

#[test]
fn parse_extensions_normalizes() {
    assert_eq!(parse_extensions("JPG, .jpeg,,png "), vec!["jpg", "jpeg", "png"]);
    assert!(parse_extensions(" , ").is_empty());
}
