//! Signed HTTP client for the Panda transcoding API.
//!
//! Provides the request plumbing (signing, error mapping, GET memoization)
//! and, in [`api`], one method per provider operation. Services and the CLI
//! use this client directly.

pub mod api;
pub mod cache;
pub mod signing;

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use panda_core::constants::{API_VERSION_PATH, DEFAULT_API_HOST, DEFAULT_HTTP_TIMEOUT_SECS};
use panda_core::{PandaSettings, TranscodeError, TranscodeResult};

pub use api::{EncodingFilter, NewProfile};
pub use cache::{CacheKey, RequestCache};

/// Provider account credentials.
#[derive(Clone)]
pub struct Credentials {
    pub cloud_id: String,
    pub access_key: String,
    pub secret_key: String,
    /// Host name, or a full `http(s)://` base for self-hosted endpoints.
    pub api_host: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("cloud_id", &self.cloud_id)
            .field("access_key", &"[redacted]")
            .field("secret_key", &"[redacted]")
            .field("api_host", &self.api_host)
            .finish()
    }
}

impl Credentials {
    pub fn from_settings(settings: &PandaSettings) -> Self {
        Self {
            cloud_id: settings.cloud_id.clone(),
            access_key: settings.access_key.clone(),
            secret_key: settings.secret_key.clone(),
            api_host: settings.api_host().to_string(),
        }
    }

    /// `(base_url, signing_host)` for the configured host.
    fn endpoint(&self) -> (String, String) {
        let host = self.api_host.trim();
        let host = if host.is_empty() { DEFAULT_API_HOST } else { host };
        if let Some(rest) = host
            .strip_prefix("https://")
            .or_else(|| host.strip_prefix("http://"))
        {
            let authority = rest.split('/').next().unwrap_or(rest);
            let base = format!("{}{}", host.trim_end_matches('/'), API_VERSION_PATH);
            return (base, authority.to_lowercase());
        }
        (
            format!("https://{}{}", host, API_VERSION_PATH),
            host.to_lowercase(),
        )
    }
}

/// HTTP client for the provider API.
///
/// Clones share the connection pool, credentials and response cache. Use
/// [`ProviderClient::fork`] to get a client with its own empty cache, one
/// per request cycle.
#[derive(Clone, Debug)]
pub struct ProviderClient {
    http: Client,
    credentials: Arc<RwLock<Credentials>>,
    cache: Arc<RequestCache>,
}

impl ProviderClient {
    pub fn new(credentials: Credentials, timeout: Duration) -> TranscodeResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TranscodeError::transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            credentials: Arc::new(RwLock::new(credentials)),
            cache: Arc::new(RequestCache::new()),
        })
    }

    pub fn from_settings(settings: &PandaSettings) -> TranscodeResult<Self> {
        Self::new(
            Credentials::from_settings(settings),
            Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        )
    }

    /// A client sharing this one's connection pool and credentials, with an
    /// empty cache.
    pub fn fork(&self) -> Self {
        Self {
            http: self.http.clone(),
            credentials: Arc::clone(&self.credentials),
            cache: Arc::new(RequestCache::new()),
        }
    }

    pub fn cloud_id(&self) -> String {
        self.credentials().cloud_id
    }

    pub fn base_url(&self) -> String {
        self.credentials().endpoint().0
    }

    /// Replace the credentials and drop every memoized response.
    pub fn update_credentials(&self, credentials: Credentials) {
        *self
            .credentials
            .write()
            .unwrap_or_else(PoisonError::into_inner) = credentials;
        self.cache.clear();
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn cached_responses(&self) -> usize {
        self.cache.len()
    }

    fn credentials(&self) -> Credentials {
        self.credentials
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Memoized GET.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> TranscodeResult<T> {
        let key = CacheKey::new(path, params);
        if let Some(hit) = self.cache.get(&key) {
            tracing::trace!(path = %path, "Serving provider response from cache");
            return decode(path, hit);
        }

        let value = self.request(Method::GET, path, params).await?;
        self.cache.insert(key, value.clone());
        decode(path, value)
    }

    pub async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> TranscodeResult<T> {
        let value = self.request(Method::POST, path, params).await?;
        self.cache.clear();
        decode(path, value)
    }

    pub async fn put_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> TranscodeResult<T> {
        let value = self.request(Method::PUT, path, params).await?;
        self.cache.clear();
        decode(path, value)
    }

    pub async fn delete_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> TranscodeResult<T> {
        let value = self.request(Method::DELETE, path, params).await?;
        self.cache.clear();
        decode(path, value)
    }

    #[tracing::instrument(skip(self, params), fields(http.method = %method, http.path = %path))]
    async fn request(
        &self,
        method: Method,
        path: &str,
        params: &[(String, String)],
    ) -> TranscodeResult<JsonValue> {
        let credentials = self.credentials();
        let (base_url, host) = credentials.endpoint();
        let key = signing::SigningKey {
            cloud_id: &credentials.cloud_id,
            access_key: &credentials.access_key,
            secret_key: &credentials.secret_key,
            host: &host,
        };
        let signed = signing::signed_params(
            &key,
            method.as_str(),
            path,
            params,
            &signing::timestamp_now(),
        )?;

        let url = format!("{}{}", base_url, path);
        let request = self.http.request(method.clone(), &url);
        let request = if method == Method::GET || method == Method::DELETE {
            request.query(&signed)
        } else {
            request.form(&signed)
        };

        let response = request.send().await.map_err(|e| {
            TranscodeError::transport(format!("{} {} failed: {}", method, path, e))
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            TranscodeError::transport(format!("Failed to read response of {} {}: {}", method, path, e))
        })?;

        let value: JsonValue = match serde_json::from_str(&body) {
            Ok(value) => value,
            Err(_) if !status.is_success() => {
                return Err(TranscodeError::provider(status.as_u16().to_string(), body));
            }
            Err(e) => {
                return Err(TranscodeError::provider(
                    "MalformedResponse",
                    format!("Response of {} {} is not JSON: {}", method, path, e),
                ));
            }
        };

        tracing::debug!(
            method = %method,
            path = %path,
            params = ?params,
            response = %value,
            "Provider request"
        );

        if let Some(error) = value.get("error") {
            let code = match error {
                JsonValue::String(s) => s.clone(),
                other => other.to_string(),
            };
            let message = value
                .get("message")
                .and_then(JsonValue::as_str)
                .unwrap_or_default()
                .to_string();
            return Err(TranscodeError::provider(code, message));
        }

        if !status.is_success() {
            return Err(TranscodeError::provider(status.as_u16().to_string(), body));
        }

        Ok(value)
    }
}

fn decode<T: DeserializeOwned>(path: &str, value: JsonValue) -> TranscodeResult<T> {
    serde_json::from_value(value).map_err(|e| {
        TranscodeError::provider(
            "MalformedResponse",
            format!("Unexpected response from {}: {}", path, e),
        )
    })
}
