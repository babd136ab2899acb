use anyhow::Result;
use async_trait::async_trait;
use panda_core::models::{MediaFile, NewMediaFile};
use uuid::Uuid;

/// Media file storage as seen by the transcoding integration.
///
/// An association links a media file to a remote video it was submitted
/// as. It is stored as a meta row keyed by `association_key(video_id)`.
#[async_trait]
pub trait MediaFileRepository: Send + Sync {
    async fn get_media_file(&self, id: Uuid) -> Result<Option<MediaFile>>;

    /// All files of a media item, oldest first.
    async fn list_media_files(&self, media_id: Uuid) -> Result<Vec<MediaFile>>;

    async fn insert_media_file(&self, new_file: NewMediaFile) -> Result<MediaFile>;

    /// Delete a media file and its meta rows. Returns `false` when it did
    /// not exist.
    async fn delete_media_file(&self, id: Uuid) -> Result<bool>;

    /// Remote video ids associated with the media file, in key order.
    async fn list_associations(&self, media_file_id: Uuid) -> Result<Vec<String>>;

    /// Idempotent.
    async fn add_association(&self, media_file_id: Uuid, video_id: &str) -> Result<()>;

    /// Remove an association. Returns `true` only for the caller that
    /// actually deleted it, so concurrent removers can use it as a claim.
    async fn remove_association(&self, media_file_id: Uuid, video_id: &str) -> Result<bool>;
}
