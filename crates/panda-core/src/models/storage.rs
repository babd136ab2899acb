//! Storage locations: base URLs of the S3 bucket and CloudFront distributions
//! files are served from.

use serde::{Deserialize, Serialize};

/// Base URLs an engine serves its files under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseUrls {
    /// `http://{bucket}.s3.amazonaws.com/`
    pub s3_http: String,
    /// `http://{domain}/` when a CloudFront download domain is configured
    pub cdn_http: Option<String>,
    /// `rtmp://{domain}/cfx/st/` when a CloudFront streaming domain is configured
    pub cdn_streaming: Option<String>,
}

fn clean_domain(domain: Option<&str>) -> Option<&str> {
    domain
        .map(|d| d.trim_matches(|c| c == ' ' || c == '/'))
        .filter(|d| !d.is_empty())
}

impl BaseUrls {
    pub fn new(s3_bucket: &str, cdn_http: Option<&str>, cdn_streaming: Option<&str>) -> Self {
        Self {
            s3_http: format!("http://{}.s3.amazonaws.com/", s3_bucket.trim()),
            cdn_http: clean_domain(cdn_http).map(|d| format!("http://{}/", d)),
            cdn_streaming: clean_domain(cdn_streaming).map(|d| format!("rtmp://{}/cfx/st/", d)),
        }
    }

    /// Base for derived resources such as thumbnails. Always the bucket.
    pub fn primary(&self) -> &str {
        &self.s3_http
    }

    /// `(scheme, base)` pairs files are accessible under. The CloudFront HTTP
    /// base replaces the raw S3 base when configured.
    pub fn access_bases(&self) -> Vec<(&'static str, &str)> {
        let mut bases = Vec::with_capacity(2);
        match &self.cdn_http {
            Some(cdn) => bases.push(("http", cdn.as_str())),
            None => bases.push(("http", self.s3_http.as_str())),
        }
        if let Some(rtmp) = &self.cdn_streaming {
            bases.push(("rtmp", rtmp.as_str()));
        }
        bases
    }
}

/// One way of accessing a stored file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageUri {
    pub scheme: String,
    /// Path of the file relative to `server_uri`.
    pub file_uri: String,
    pub server_uri: String,
}

impl StorageUri {
    pub fn url(&self) -> String {
        format!("{}{}", self.server_uri, self.file_uri)
    }
}
