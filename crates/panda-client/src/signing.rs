//! Request signing.
//!
//! Every request carries `cloud_id`, `access_key`, `timestamp` and a
//! `signature`: the base64 HMAC-SHA256 of
//! `METHOD\nhost\npath\ncanonical-query` keyed with the secret key.

use base64::Engine;
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use sha2::Sha256;

use panda_core::{TranscodeError, TranscodeResult};

type HmacSha256 = Hmac<Sha256>;

/// Everything except RFC 3986 unreserved characters is escaped, including
/// `/` and space (as `%20`).
const URL_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

pub fn url_escape(s: &str) -> String {
    utf8_percent_encode(s, URL_ESCAPE).to_string()
}

/// Parameters sorted by key (then value), escaped and joined with `&`.
pub fn canonical_query_string(params: &[(String, String)]) -> String {
    let mut sorted: Vec<&(String, String)> = params.iter().collect();
    sorted.sort();
    sorted
        .iter()
        .map(|(k, v)| format!("{}={}", url_escape(k), url_escape(v)))
        .collect::<Vec<_>>()
        .join("&")
}

pub fn string_to_sign(method: &str, host: &str, path: &str, params: &[(String, String)]) -> String {
    format!(
        "{}\n{}\n{}\n{}",
        method.to_uppercase(),
        host.to_lowercase(),
        path,
        canonical_query_string(params)
    )
}

pub fn signature(
    secret_key: &str,
    method: &str,
    host: &str,
    path: &str,
    params: &[(String, String)],
) -> TranscodeResult<String> {
    let mut mac = HmacSha256::new_from_slice(secret_key.as_bytes())
        .map_err(|e| TranscodeError::InvalidSettings(format!("Unusable secret key: {}", e)))?;
    mac.update(string_to_sign(method, host, path, params).as_bytes());
    let digest = mac.finalize().into_bytes();
    Ok(base64::engine::general_purpose::STANDARD.encode(digest))
}

/// Request timestamp in the format the API expects (UTC, ISO-8601).
pub fn timestamp_now() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%S%.6f+00:00")
        .to_string()
}

/// Identity and secret used to sign requests.
pub struct SigningKey<'a> {
    pub cloud_id: &'a str,
    pub access_key: &'a str,
    pub secret_key: &'a str,
    pub host: &'a str,
}

/// `params` extended with the authentication parameters and signature.
pub fn signed_params(
    key: &SigningKey<'_>,
    method: &str,
    path: &str,
    params: &[(String, String)],
    timestamp: &str,
) -> TranscodeResult<Vec<(String, String)>> {
    let mut signed: Vec<(String, String)> = params.to_vec();
    signed.push(("cloud_id".to_string(), key.cloud_id.to_string()));
    signed.push(("access_key".to_string(), key.access_key.to_string()));
    signed.push(("timestamp".to_string(), timestamp.to_string()));
    let sig = signature(key.secret_key, method, key.host, path, &signed)?;
    signed.push(("signature".to_string(), sig));
    Ok(signed)
}
