//! Artifact descriptors and the `panda:<json>` pseudo-URL.
//!
//! A harvested rendition is handed to the host's generic media file creation
//! path as a URL. The host dispatches the URL to its storage engines, and the
//! Panda engine recognizes the prefix and decodes the descriptor again.

use serde::{Deserialize, Serialize};

use crate::constants::PANDA_URL_PREFIX;
use crate::error::{TranscodeError, TranscodeResult};
use crate::filetypes::playable_extension;
use crate::models::{Encoding, Video};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactDescriptor {
    /// Provider id of the video or encoding.
    pub id: String,
    /// Extension including the leading dot.
    pub extname: String,
    pub display_name: String,
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
    pub audio_bitrate: Option<i64>,
    #[serde(default)]
    pub video_bitrate: Option<i64>,
}

impl ArtifactDescriptor {
    /// Descriptor for the source video itself.
    pub fn from_video(video: &Video, display_name: String) -> Self {
        Self {
            id: video.id.clone(),
            extname: video.extname.clone().unwrap_or_default(),
            display_name,
            width: video.width,
            height: video.height,
            file_size: video.file_size,
            duration: video.duration,
            audio_bitrate: video.audio_bitrate,
            video_bitrate: video.video_bitrate,
        }
    }

    /// Descriptor for an encoding. Segmented streams are relabeled with the
    /// playlist extension.
    pub fn from_encoding(encoding: &Encoding, display_name: String) -> Self {
        let extname = encoding.extname.as_deref().unwrap_or_default();
        Self {
            id: encoding.id.clone(),
            extname: playable_extension(extname).to_string(),
            display_name,
            width: encoding.width,
            height: encoding.height,
            file_size: encoding.file_size,
            duration: encoding.duration,
            audio_bitrate: encoding.audio_bitrate,
            video_bitrate: encoding.video_bitrate,
        }
    }

    pub fn to_url(&self) -> TranscodeResult<String> {
        let json = serde_json::to_string(self).map_err(|e| {
            TranscodeError::InvalidInput(format!("Failed to encode artifact descriptor: {}", e))
        })?;
        Ok(format!("{}{}", PANDA_URL_PREFIX, json))
    }

    /// Decode a `panda:` URL. `Ok(None)` when the URL lacks the prefix.
    pub fn from_url(url: &str) -> TranscodeResult<Option<Self>> {
        let Some(json) = url.strip_prefix(PANDA_URL_PREFIX) else {
            return Ok(None);
        };
        serde_json::from_str(json).map(Some).map_err(|e| {
            TranscodeError::InvalidInput(format!("Malformed artifact descriptor: {}", e))
        })
    }

    /// Combined bitrate, `None` when neither part is reported.
    pub fn bitrate(&self) -> Option<i64> {
        let total = self
            .audio_bitrate
            .unwrap_or(0)
            .saturating_add(self.video_bitrate.unwrap_or(0));
        (total != 0).then_some(total)
    }

    pub fn duration_seconds(&self) -> Option<f64> {
        self.duration.map(|ms| ms as f64 / 1000.0)
    }

    /// Identifier of the stored file: provider id plus extension.
    pub fn unique_id(&self) -> String {
        format!("{}{}", self.id, self.extname)
    }
}
