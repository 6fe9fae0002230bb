//! AWS Signature Version 4 request signing.
//!
//! Pure functions only; `S3Store` supplies the clock. Header names passed in
//! must already be lowercase.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;

type HmacSha256 = Hmac<Sha256>;

pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// SHA-256 of an empty payload, used for every GET.
pub const EMPTY_PAYLOAD_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

/// Everything that goes into one signature.
#[derive(Debug, Clone)]
pub struct SigningRequest<'a> {
    pub method: &'a str,
    /// Unencoded absolute path, e.g. `/bucket/photos/a b.jpg`.
    pub path: &'a str,
    /// Unencoded query pairs.
    pub query: &'a [(String, String)],
    /// Lowercase header names with values. Must include `host`.
    pub headers: &'a [(String, String)],
    pub payload_sha256: &'a str,
}

/// `20130524T000000Z`
#[must_use]
pub fn amz_date(at: OffsetDateTime) -> String {
    format!(
        "{:04}{:02}{:02}T{:02}{:02}{:02}Z",
        at.year(),
        u8::from(at.month()),
        at.day(),
        at.hour(),
        at.minute(),
        at.second()
    )
}

#[must_use]
pub fn hex(bytes: &[u8]) -> String {
    use std::fmt::Write;
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}

#[must_use]
pub fn sha256_hex(data: &[u8]) -> String {
    hex(&Sha256::digest(data))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// Percent-encode each path segment, keeping the `/` separators.
#[must_use]
pub fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Sorted, encoded `k=v&k=v` query string.
#[must_use]
pub fn canonical_query(query: &[(String, String)]) -> String {
    let mut pairs: Vec<(String, String)> = query
        .iter()
        .map(|(k, v)| (urlencoding::encode(k).into_owned(), urlencoding::encode(v).into_owned()))
        .collect();
    pairs.sort();
    pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

fn sorted_headers<'h>(headers: &'h [(String, String)]) -> Vec<(&'h str, String)> {
    let mut sorted: Vec<(&str, String)> = headers
        .iter()
        .map(|(k, v)| (k.as_str(), v.trim().to_owned()))
        .collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    sorted
}

/// `host;range;x-amz-content-sha256;x-amz-date`
#[must_use]
pub fn signed_headers(headers: &[(String, String)]) -> String {
    sorted_headers(headers)
        .iter()
        .map(|(k, _)| *k)
        .collect::<Vec<_>>()
        .join(";")
}

#[must_use]
pub fn canonical_request(req: &SigningRequest<'_>) -> String {
    let canonical_headers: String = sorted_headers(req.headers)
        .iter()
        .map(|(k, v)| format!("{k}:{v}\n"))
        .collect();
    format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        req.method,
        encode_path(req.path),
        canonical_query(req.query),
        canonical_headers,
        signed_headers(req.headers),
        req.payload_sha256
    )
}

#[must_use]
pub fn credential_scope(date: &str, region: &str, service: &str) -> String {
    format!("{date}/{region}/{service}/aws4_request")
}

#[must_use]
pub fn string_to_sign(amz_date: &str, scope: &str, canonical_request: &str) -> String {
    format!("{ALGORITHM}\n{amz_date}\n{scope}\n{}", sha256_hex(canonical_request.as_bytes()))
}

#[must_use]
pub fn signing_key(secret: &str, date: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac_sha256(format!("AWS4{secret}").as_bytes(), date.as_bytes());
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

/// Sign a request and return the `Authorization` header value.
///
/// `amz_date` must match the `x-amz-date` header included in `req.headers`.
#[must_use]
pub fn authorization(
    req: &SigningRequest<'_>,
    creds: &Credentials,
    amz_date: &str,
    region: &str,
    service: &str,
) -> String {
    let date = &amz_date[..8.min(amz_date.len())];
    let scope = credential_scope(date, region, service);
    let to_sign = string_to_sign(amz_date, &scope, &canonical_request(req));
    let key = signing_key(&creds.secret_access_key, date, region, service);
    let signature = hex(&hmac_sha256(&key, to_sign.as_bytes()));
    format!(
        "{ALGORITHM} Credential={}/{scope}, SignedHeaders={}, Signature={signature}",
        creds.access_key_id,
        signed_headers(req.headers)
    )
}

#[cfg(test)]
#[path = "sigv4_test.rs"]
mod tests;
