//! Configuration module
//!
//! [`PandaSettings`] is the storage engine's settings blob (provider account,
//! selected profiles, S3/CloudFront locations). The host persists it as an
//! opaque value; it is serializable for that purpose. [`Config`] wraps the
//! settings with the process-level options read from the environment.

use std::env;

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::constants::{DEFAULT_API_HOST, DEFAULT_HTTP_TIMEOUT_SECS};
use crate::error::{TranscodeError, TranscodeResult};
use crate::models::BaseUrls;

/// Placeholder replaced by the media file id in the state update URL template.
pub const FILE_ID_PLACEHOLDER: &str = "{file_id}";

/// Settings of a configured Panda storage engine.
#[derive(Clone, Default, Serialize, Deserialize, Validate)]
pub struct PandaSettings {
    #[validate(length(min = 1, message = "cloud id must not be empty"))]
    pub cloud_id: String,
    #[validate(length(min = 1, message = "access key must not be empty"))]
    pub access_key: String,
    #[validate(length(min = 1, message = "secret key must not be empty"))]
    pub secret_key: String,
    /// API host name, or a full base URL for self-hosted endpoints.
    #[serde(default)]
    pub api_host: Option<String>,
    /// Names of the provider profiles every video is encoded with.
    #[serde(default)]
    pub profiles: Vec<String>,
    #[validate(length(min = 1, message = "S3 bucket name must not be empty"))]
    pub s3_bucket_name: String,
    /// CloudFront download domain (e.g. a1b2c3d4e5f6.cloudfront.net)
    #[serde(default)]
    pub cloudfront_download_uri: Option<String>,
    /// CloudFront streaming domain
    #[serde(default)]
    pub cloudfront_streaming_uri: Option<String>,
}

// Credentials are never printed.
impl std::fmt::Debug for PandaSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PandaSettings")
            .field("cloud_id", &self.cloud_id)
            .field("access_key", &"[redacted]")
            .field("secret_key", &"[redacted]")
            .field("api_host", &self.api_host)
            .field("profiles", &self.profiles)
            .field("s3_bucket_name", &self.s3_bucket_name)
            .field("cloudfront_download_uri", &self.cloudfront_download_uri)
            .field("cloudfront_streaming_uri", &self.cloudfront_streaming_uri)
            .finish()
    }
}

impl PandaSettings {
    /// API host, falling back to the default provider host when unset.
    pub fn api_host(&self) -> &str {
        self.api_host
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .unwrap_or(DEFAULT_API_HOST)
    }

    /// Base URLs files hosted by this engine are reachable under.
    pub fn base_urls(&self) -> BaseUrls {
        BaseUrls::new(
            &self.s3_bucket_name,
            self.cloudfront_download_uri.as_deref(),
            self.cloudfront_streaming_uri.as_deref(),
        )
    }

    /// Field rules plus the checks that span several fields.
    pub fn validate_settings(&self) -> TranscodeResult<()> {
        self.validate()?;

        if self.api_host().contains(char::is_whitespace) {
            return Err(TranscodeError::InvalidSettings(format!(
                "API host '{}' must not contain whitespace",
                self.api_host()
            )));
        }

        if self.profiles.iter().any(|p| p.trim().is_empty()) {
            return Err(TranscodeError::InvalidSettings(
                "profile names must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Process configuration for binaries embedding the integration.
#[derive(Clone, Debug)]
pub struct Config {
    pub settings: PandaSettings,
    /// Fully qualified URL the provider calls on state changes. May contain
    /// `{file_id}`.
    pub state_update_url: Option<String>,
    pub http_timeout_secs: u64,
    pub database_url: Option<String>,
    pub environment: String,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let settings = PandaSettings {
            cloud_id: env::var("PANDA_CLOUD_ID").unwrap_or_default(),
            access_key: env::var("PANDA_ACCESS_KEY").unwrap_or_default(),
            secret_key: env::var("PANDA_SECRET_KEY").unwrap_or_default(),
            api_host: env::var("PANDA_API_HOST").ok().filter(|s| !s.is_empty()),
            profiles: env::var("PANDA_PROFILES")
                .unwrap_or_default()
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            s3_bucket_name: env::var("S3_BUCKET_NAME").unwrap_or_default(),
            cloudfront_download_uri: env::var("CLOUDFRONT_DOWNLOAD_URI")
                .ok()
                .filter(|s| !s.is_empty()),
            cloudfront_streaming_uri: env::var("CLOUDFRONT_STREAMING_URI")
                .ok()
                .filter(|s| !s.is_empty()),
        };

        let config = Config {
            settings,
            state_update_url: env::var("PANDA_STATE_UPDATE_URL")
                .ok()
                .filter(|s| !s.is_empty()),
            http_timeout_secs: env::var("PANDA_HTTP_TIMEOUT_SECS")
                .unwrap_or_else(|_| DEFAULT_HTTP_TIMEOUT_SECS.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PANDA_HTTP_TIMEOUT_SECS must be a valid number"))?,
            database_url: env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            environment: env::var("ENVIRONMENT")
                .or_else(|_| env::var("APP_ENV"))
                .unwrap_or_else(|_| "development".to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.settings
            .validate_settings()
            .map_err(|e| anyhow::anyhow!(e))?;

        if self.http_timeout_secs == 0 {
            return Err(anyhow::anyhow!(
                "PANDA_HTTP_TIMEOUT_SECS must be greater than zero"
            ));
        }

        if let Some(url) = &self.state_update_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(anyhow::anyhow!(
                    "PANDA_STATE_UPDATE_URL must be a fully qualified http(s) URL"
                ));
            }
        }

        Ok(())
    }

    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    /// State update URL for one media file, if a template is configured.
    pub fn state_update_url_for(&self, media_file_id: Uuid) -> Option<String> {
        state_update_url_for(self.state_update_url.as_deref(), media_file_id)
    }
}

/// Expand a state update URL template for one media file.
///
/// Templates without `{file_id}` get the id appended as a `file_id` query
/// parameter.
pub fn state_update_url_for(template: Option<&str>, media_file_id: Uuid) -> Option<String> {
    let template = template?;
    if template.contains(FILE_ID_PLACEHOLDER) {
        return Some(template.replace(FILE_ID_PLACEHOLDER, &media_file_id.to_string()));
    }
    let separator = if template.contains('?') { '&' } else { '?' };
    Some(format!("{}{}file_id={}", template, separator, media_file_id))
}
