use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "media_type", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Video,
    Audio,
    Image,
    Document,
}

impl FromStr for MediaType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "video" => Ok(MediaType::Video),
            "audio" => Ok(MediaType::Audio),
            "image" => Ok(MediaType::Image),
            "document" => Ok(MediaType::Document),
            _ => Err(anyhow::anyhow!("Invalid media type: {}", s)),
        }
    }
}

impl Display for MediaType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            MediaType::Video => write!(f, "video"),
            MediaType::Audio => write!(f, "audio"),
            MediaType::Image => write!(f, "image"),
            MediaType::Document => write!(f, "document"),
        }
    }
}

/// A file of a host media item, stored by one storage engine.
///
/// Transcoding artifacts are media files too: they are created by the host
/// once every encoding of a job has succeeded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaFile {
    pub id: Uuid,
    pub media_id: Uuid,
    pub display_name: String,
    pub media_type: MediaType,
    /// Engine type of the storage engine hosting the file.
    pub storage_engine: String,
    /// Engine-specific identifier of the stored file.
    pub unique_id: String,
    pub container: Option<String>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub file_size: Option<i64>,
    pub bitrate: Option<i64>,
    /// Duration in seconds
    pub duration: Option<f64>,
    pub thumbnail_url: Option<String>,
    /// URI the file can be downloaded from, if the hosting engine exposes one.
    pub download_uri: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl MediaFile {
    pub fn is_video(&self) -> bool {
        self.media_type == MediaType::Video
    }

    /// Download URI, ignoring blank values.
    pub fn download_uri(&self) -> Option<&str> {
        self.download_uri
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
    }
}

/// Metadata an engine extracts from a URL it recognizes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedMetadata {
    pub unique_id: String,
    pub container: Option<String>,
    pub display_name: Option<String>,
    pub media_type: MediaType,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub file_size: Option<i64>,
    pub bitrate: Option<i64>,
    pub duration: Option<f64>,
    pub thumbnail_url: Option<String>,
    pub download_uri: Option<String>,
}

/// Insertable form of a media file.
#[derive(Debug, Clone)]
pub struct NewMediaFile {
    pub media_id: Uuid,
    pub storage_engine: String,
    pub display_name: String,
    pub metadata: ParsedMetadata,
}

impl NewMediaFile {
    /// Build from parsed metadata; `fallback_name` is used when the engine
    /// found no display name.
    pub fn from_parsed(
        media_id: Uuid,
        storage_engine: impl Into<String>,
        fallback_name: &str,
        metadata: ParsedMetadata,
    ) -> Self {
        let display_name = metadata
            .display_name
            .clone()
            .unwrap_or_else(|| fallback_name.to_string());
        Self {
            media_id,
            storage_engine: storage_engine.into(),
            display_name,
            metadata,
        }
    }

    pub fn into_media_file(self, id: Uuid, created_at: DateTime<Utc>) -> MediaFile {
        let m = self.metadata;
        MediaFile {
            id,
            media_id: self.media_id,
            display_name: self.display_name,
            media_type: m.media_type,
            storage_engine: self.storage_engine,
            unique_id: m.unique_id,
            container: m.container,
            width: m.width,
            height: m.height,
            file_size: m.file_size,
            bitrate: m.bitrate,
            duration: m.duration,
            thumbnail_url: m.thumbnail_url,
            download_uri: m.download_uri,
            created_at,
        }
    }
}
