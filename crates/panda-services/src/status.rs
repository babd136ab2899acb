//! Transcoding status of media files, for status pages and the CLI.

use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use panda_core::models::{Encoding, MediaFile, Video};
use panda_core::TranscodeResult;

use crate::lifecycle::JobLifecycleManager;
use crate::profiles::profile_ids_names;

/// Remote jobs and encodings of one media file.
#[derive(Debug, Clone, Serialize)]
pub struct FileStatus {
    pub media_file_id: Uuid,
    pub display_name: String,
    pub videos: Vec<Video>,
    pub encodings: Vec<Encoding>,
}

impl FileStatus {
    pub fn is_transcoding(&self) -> bool {
        !self.videos.is_empty() || !self.encodings.is_empty()
    }
}

/// Status of every file of a media item.
#[derive(Debug, Clone, Serialize)]
pub struct MediaStatus {
    pub files: Vec<FileStatus>,
    /// Profile id to name, filled when any file has remote jobs.
    pub profile_names: HashMap<String, String>,
    /// No file has encodings: the jobs were harvested or never submitted,
    /// so the page should be refreshed rather than polled.
    pub refresh_suggested: bool,
}

impl JobLifecycleManager {
    pub async fn file_status(&self, media_file: &MediaFile) -> TranscodeResult<FileStatus> {
        Ok(FileStatus {
            media_file_id: media_file.id,
            display_name: media_file.display_name.clone(),
            videos: self.associated_videos(media_file).await?,
            encodings: self.associated_encodings(media_file).await?,
        })
    }

    pub async fn media_status(&self, media_id: Uuid) -> TranscodeResult<MediaStatus> {
        let media_files = self.repository().list_media_files(media_id).await?;
        let mut files = Vec::with_capacity(media_files.len());
        for file in &media_files {
            files.push(self.file_status(file).await?);
        }

        let profile_names = if files.iter().any(FileStatus::is_transcoding) {
            profile_ids_names(self.client()).await?
        } else {
            HashMap::new()
        };
        let refresh_suggested = files.iter().all(|f| f.encodings.is_empty());

        Ok(MediaStatus {
            files,
            profile_names,
            refresh_suggested,
        })
    }
}
