//! Records returned by the provider REST API.
//!
//! Timestamps are kept as the provider's strings; the API does not use a
//! single consistent format.

use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};

/// Status reported for videos and encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteStatus {
    Success,
    Fail,
    Processing,
    #[serde(other)]
    Unknown,
}

impl RemoteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemoteStatus::Success => "success",
            RemoteStatus::Fail => "fail",
            RemoteStatus::Processing => "processing",
            RemoteStatus::Unknown => "unknown",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RemoteStatus::Success)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, RemoteStatus::Fail)
    }

    /// Whether the status is usable as a list filter on the provider API.
    pub fn is_filterable(&self) -> bool {
        !matches!(self, RemoteStatus::Unknown)
    }
}

impl Display for RemoteStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

/// The provider account ("cloud") the credentials belong to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cloud {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub s3_videos_bucket: Option<String>,
    #[serde(default)]
    pub s3_private_access: Option<bool>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// A named encoding recipe registered with the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub extname: Option<String>,
    #[serde(default)]
    pub width: Option<i32>,
    #[serde(default)]
    pub height: Option<i32>,
    #[serde(default)]
    pub preset_name: Option<String>,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// A provider-side preset profiles can be created from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub extname: Option<String>,
    #[serde(default)]
    pub width: Option<i32>,
    #[serde(default)]
    pub height: Option<i32>,
}

/// A transcoding submission (the provider calls it a "video").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Video {
    pub id: String,
    pub status: RemoteStatus,
    #[serde(default)]
    pub extname: Option<String>,
    #[serde(default)]
    pub width: Option<i32>,
    #[serde(default)]
    pub height: Option<i32>,
    #[serde(default)]
    pub file_size: Option<i64>,
    /// Duration in milliseconds
    #[serde(default)]
    pub duration: Option<i64>,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub original_filename: Option<String>,
    #[serde(default)]
    pub audio_codec: Option<String>,
    #[serde(default)]
    pub video_codec: Option<String>,
    #[serde(default)]
    pub fps: Option<f64>,
    #[serde(default)]
    pub audio_bitrate: Option<i64>,
    #[serde(default)]
    pub video_bitrate: Option<i64>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// One output rendition of a video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Encoding {
    pub id: String,
    pub video_id: String,
    pub profile_id: String,
    pub status: RemoteStatus,
    #[serde(default)]
    pub profile_name: Option<String>,
    #[serde(default)]
    pub extname: Option<String>,
    #[serde(default)]
    pub width: Option<i32>,
    #[serde(default)]
    pub height: Option<i32>,
    #[serde(default)]
    pub file_size: Option<i64>,
    /// Duration in milliseconds
    #[serde(default)]
    pub duration: Option<i64>,
    #[serde(default)]
    pub encoding_progress: Option<i32>,
    #[serde(default)]
    pub encoding_time: Option<i64>,
    #[serde(default)]
    pub started_encoding_at: Option<String>,
    #[serde(default)]
    pub audio_bitrate: Option<i64>,
    #[serde(default)]
    pub video_bitrate: Option<i64>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_encoding_with_minimal_fields() {
        let e: Encoding = serde_json::from_value(json!({
            "id": "e1",
            "video_id": "v1",
            "profile_id": "p1",
            "status": "processing",
            "encoding_progress": 40
        }))
        .unwrap();
        assert_eq!(e.status, RemoteStatus::Processing);
        assert_eq!(e.encoding_progress, Some(40));
        assert!(e.extname.is_none());
    }

    #[test]
    fn encoding_without_video_id_is_rejected() {
        let result: Result<Encoding, _> = serde_json::from_value(json!({
            "id": "e1",
            "profile_id": "p1",
            "status": "success"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn unknown_status_is_preserved_as_unknown() {
        let v: Video = serde_json::from_value(json!({
            "id": "v1",
            "status": "cancelled"
        }))
        .unwrap();
        assert_eq!(v.status, RemoteStatus::Unknown);
        assert!(!v.status.is_success());
        assert!(!v.status.is_filterable());
    }
}
