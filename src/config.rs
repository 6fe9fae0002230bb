//! Server configuration parsed from environment variables.
//!
//! Parsing goes through a lookup closure so tests can supply values without
//! touching the process environment.

use std::path::PathBuf;

use crate::store::s3::{S3Config, S3Timeouts};
use crate::store::sigv4::Credentials;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_S3_REGION: &str = "us-east-1";
pub const DEFAULT_S3_REQUEST_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_S3_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_IMAGE_EXTENSIONS: &str = "jpg,jpeg";
pub const DEFAULT_LIST_QUEUE_CAPACITY: usize = 1000;
pub const DEFAULT_LIST_RETRIES: u32 = 5;
pub const DEFAULT_LIST_RETRY_BASE_MS: u64 = 500;
pub const DEFAULT_CACHE_CAPACITY: usize = 50;
pub const DEFAULT_PREFETCH_WORKERS: usize = 1;
pub const DEFAULT_PREFETCH_IDLE_MS: u64 = 250;
pub const DEFAULT_RANDOM_WAIT_SECS: u64 = 30;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required env var {0}")]
    Missing(&'static str),
    #[error("invalid value for {var}: {value}")]
    Invalid { var: &'static str, value: String },
    #[error("unknown STORE_BACKEND: {0} (expected 's3' or 'fs')")]
    UnknownBackend(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    S3(S3Config),
    Local { root: PathBuf },
}

/// Sizes and timings for the background index and prefetch tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryConfig {
    /// Lower-cased extensions, without the dot.
    pub image_extensions: Vec<String>,
    pub list_queue_capacity: usize,
    pub list_retries: u32,
    pub list_retry_base_ms: u64,
    pub cache_capacity: usize,
    pub prefetch_workers: usize,
    pub prefetch_idle_ms: u64,
    pub random_wait_secs: u64,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            image_extensions: parse_extensions(DEFAULT_IMAGE_EXTENSIONS),
            list_queue_capacity: DEFAULT_LIST_QUEUE_CAPACITY,
            list_retries: DEFAULT_LIST_RETRIES,
            list_retry_base_ms: DEFAULT_LIST_RETRY_BASE_MS,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            prefetch_workers: DEFAULT_PREFETCH_WORKERS,
            prefetch_idle_ms: DEFAULT_PREFETCH_IDLE_MS,
            random_wait_secs: DEFAULT_RANDOM_WAIT_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: String,
    pub store: StoreConfig,
    pub gallery: GalleryConfig,
    pub frontend_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Build typed config from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value is malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build typed config from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value is malformed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_addr = get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_owned());
        let store = match get("STORE_BACKEND").as_deref().unwrap_or("s3") {
            "s3" => StoreConfig::S3(s3_config(&get)?),
            "fs" => StoreConfig::Local { root: PathBuf::from(require(&get, "STORE_DIR")?) },
            other => return Err(ConfigError::UnknownBackend(other.to_owned())),
        };

        let image_extensions = parse_extensions(&get("IMAGE_EXTENSIONS").unwrap_or_else(|| DEFAULT_IMAGE_EXTENSIONS.into()));
        if image_extensions.is_empty() {
            return Err(ConfigError::Invalid {
                var: "IMAGE_EXTENSIONS",
                value: get("IMAGE_EXTENSIONS").unwrap_or_default(),
            });
        }

        let gallery = GalleryConfig {
            image_extensions,
            list_queue_capacity: positive(&get, "LIST_QUEUE_CAPACITY", DEFAULT_LIST_QUEUE_CAPACITY)?,
            list_retries: parse_or(&get, "LIST_RETRIES", DEFAULT_LIST_RETRIES)?,
            list_retry_base_ms: parse_or(&get, "LIST_RETRY_BASE_MS", DEFAULT_LIST_RETRY_BASE_MS)?,
            cache_capacity: positive(&get, "CACHE_CAPACITY", DEFAULT_CACHE_CAPACITY)?,
            prefetch_workers: positive(&get, "PREFETCH_WORKERS", DEFAULT_PREFETCH_WORKERS)?,
            prefetch_idle_ms: parse_or(&get, "PREFETCH_IDLE_MS", DEFAULT_PREFETCH_IDLE_MS)?,
            random_wait_secs: parse_or(&get, "RANDOM_WAIT_SECS", DEFAULT_RANDOM_WAIT_SECS)?,
        };

        let frontend_dir = get("FRONTEND_DIR").map(PathBuf::from);

        Ok(Self { bind_addr, store, gallery, frontend_dir })
    }
}

fn s3_config<G>(get: &G) -> Result<S3Config, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let endpoint = require(get, "S3_ENDPOINT")?.trim_end_matches('/').to_owned();
    if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
        return Err(ConfigError::Invalid { var: "S3_ENDPOINT", value: endpoint });
    }
    Ok(S3Config {
        endpoint,
        bucket: require(get, "S3_BUCKET")?,
        region: get("S3_REGION").unwrap_or_else(|| DEFAULT_S3_REGION.to_owned()),
        credentials: Credentials {
            access_key_id: require(get, "S3_ACCESS_KEY_ID")?,
            secret_access_key: require(get, "S3_SECRET_ACCESS_KEY")?,
        },
        timeouts: S3Timeouts {
            request_secs: parse_or(get, "S3_REQUEST_TIMEOUT_SECS", DEFAULT_S3_REQUEST_TIMEOUT_SECS)?,
            connect_secs: parse_or(get, "S3_CONNECT_TIMEOUT_SECS", DEFAULT_S3_CONNECT_TIMEOUT_SECS)?,
        },
    })
}

fn require<G>(get: &G, var: &'static str) -> Result<String, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    get(var).ok_or(ConfigError::Missing(var))
}

fn parse_or<G, T>(get: &G, var: &'static str, default: T) -> Result<T, ConfigError>
where
    G: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match get(var) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { var, value: raw }),
    }
}

fn positive<G>(get: &G, var: &'static str, default: usize) -> Result<usize, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let value = parse_or(get, var, default)?;
    if value == 0 {
        return Err(ConfigError::Invalid { var, value: "0".into() });
    }
    Ok(value)
}

/// `"JPG, .jpeg,,png"` -> `["jpg", "jpeg", "png"]`
#[must_use]
pub fn parse_extensions(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
        .collect()
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
