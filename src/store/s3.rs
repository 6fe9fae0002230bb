//! S3-compatible object store client.
//!
//! Thin HTTP wrapper for `ListObjectsV2` and `GetObject` using path-style
//! addressing (`{endpoint}/{bucket}/{key}`), which self-hosted gateways
//! expect. Pure parsing in `parse_list_response` for testability.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use time::OffsetDateTime;

use super::sigv4::{self, Credentials, SigningRequest};
use super::{ObjectBody, ObjectMeta, ObjectPage, ObjectStore, StoreError};

const SERVICE: &str = "s3";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct S3Timeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Config {
    /// Scheme and authority, e.g. `https://s3.example.com`. No trailing slash.
    pub endpoint: String,
    pub bucket: String,
    pub region: String,
    pub credentials: Credentials,
    pub timeouts: S3Timeouts,
}

// =============================================================================
// CLIENT
// =============================================================================

pub struct S3Store {
    http: reqwest::Client,
    config: S3Config,
}

/// A signed request ready to send.
#[derive(Debug)]
pub(crate) struct PreparedRequest {
    pub(crate) url: String,
    pub(crate) headers: Vec<(String, String)>,
}

impl S3Store {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: S3Config) -> Result<Self, StoreError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| StoreError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, config })
    }

    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.config.bucket
    }

    async fn send(&self, prepared: PreparedRequest) -> Result<reqwest::Response, StoreError> {
        let mut request = self.http.get(&prepared.url);
        for (name, value) in &prepared.headers {
            if name != "host" {
                request = request.header(name, value);
            }
        }
        request
            .send()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))
    }
}

/// Build and sign a GET against the bucket.
pub(crate) fn prepare_get(
    config: &S3Config,
    key: Option<&str>,
    query: &[(String, String)],
    at: OffsetDateTime,
) -> Result<PreparedRequest, StoreError> {
    let endpoint = reqwest::Url::parse(&config.endpoint)
        .map_err(|e| StoreError::Request(format!("invalid endpoint {}: {e}", config.endpoint)))?;
    let host = match (endpoint.host_str(), endpoint.port()) {
        (Some(host), Some(port)) => format!("{host}:{port}"),
        (Some(host), None) => host.to_owned(),
        (None, _) => return Err(StoreError::Request(format!("endpoint has no host: {}", config.endpoint))),
    };

    // Gateways mounted under a path (`https://gw/s3`) sign that path too.
    let mount = endpoint.path().trim_end_matches('/');
    let path = match key {
        Some(key) => format!("{mount}/{}/{key}", config.bucket),
        None => format!("{mount}/{}", config.bucket),
    };
    let base = format!("{}://{host}", endpoint.scheme());
    let amz_date = sigv4::amz_date(at);
    let mut headers = vec![
        ("host".to_owned(), host),
        ("x-amz-content-sha256".to_owned(), sigv4::EMPTY_PAYLOAD_SHA256.to_owned()),
        ("x-amz-date".to_owned(), amz_date.clone()),
    ];
    let signing = SigningRequest {
        method: "GET",
        path: &path,
        query,
        headers: &headers,
        payload_sha256: sigv4::EMPTY_PAYLOAD_SHA256,
    };
    let auth = sigv4::authorization(&signing, &config.credentials, &amz_date, &config.region, SERVICE);
    headers.push(("authorization".to_owned(), auth));

    let query_string = sigv4::canonical_query(query);
    let url = if query_string.is_empty() {
        format!("{base}{}", sigv4::encode_path(&path))
    } else {
        format!("{base}{}?{query_string}", sigv4::encode_path(&path))
    };
    Ok(PreparedRequest { url, headers })
}

#[async_trait::async_trait]
impl ObjectStore for S3Store {
    async fn list_page(&self, token: Option<&str>) -> Result<ObjectPage, StoreError> {
        let mut query = vec![("list-type".to_owned(), "2".to_owned())];
        if let Some(token) = token {
            query.push(("continuation-token".to_owned(), token.to_owned()));
        }
        let prepared = prepare_get(&self.config, None, &query, OffsetDateTime::now_utc())?;
        let response = self.send(prepared).await?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;
        if status != 200 {
            return Err(StoreError::Status { status, body: text });
        }
        parse_list_response(&text)
    }

    async fn get(&self, key: &str) -> Result<ObjectBody, StoreError> {
        if key.is_empty() {
            return Err(StoreError::InvalidKey(key.to_owned()));
        }
        let prepared = prepare_get(&self.config, Some(key), &[], OffsetDateTime::now_utc())?;
        let response = self.send(prepared).await?;

        let status = response.status().as_u16();
        if status == 404 {
            return Err(StoreError::NotFound(key.to_owned()));
        }
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Status { status, body });
        }
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;
        Ok(ObjectBody { bytes, content_type })
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListBucketResult {
    #[serde(default)]
    is_truncated: bool,
    next_continuation_token: Option<String>,
    #[serde(default)]
    contents: Vec<Contents>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Contents {
    key: String,
    #[serde(default)]
    size: u64,
    last_modified: Option<String>,
    #[serde(rename = "ETag")]
    etag: Option<String>,
}

// =============================================================================
// PARSING
// =============================================================================

pub(crate) fn parse_list_response(xml: &str) -> Result<ObjectPage, StoreError> {
    let result: ListBucketResult = quick_xml::de::from_str(xml).map_err(|e| StoreError::Parse(e.to_string()))?;

    let objects = result
        .contents
        .into_iter()
        .map(|c| ObjectMeta {
            key: c.key,
            size: c.size,
            last_modified: c.last_modified,
            etag: c.etag.map(|e| e.trim_matches('"').to_owned()),
        })
        .collect();

    let next_token = if result.is_truncated {
        result.next_continuation_token.filter(|t| !t.is_empty())
    } else {
        None
    };

    Ok(ObjectPage { objects, next_token })
}

#[cfg(test)]
#[path = "s3_test.rs"]
mod tests;
