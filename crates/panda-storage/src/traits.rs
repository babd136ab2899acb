//! Storage engine trait

use async_trait::async_trait;
use panda_core::models::{MediaFile, ParsedMetadata, StorageUri};
use panda_core::{CommitHooks, TranscodeError};
use thiserror::Error;
use uuid::Uuid;

/// Storage engine errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// The engine does not handle this URL; the next engine should try.
    #[error("Storage engine is not suitable for this URL")]
    Unsuitable,

    #[error("Cannot transcode: {0}")]
    CannotTranscode(String),

    #[error("Media file not found: {0}")]
    NotFound(Uuid),

    #[error(transparent)]
    Transcode(#[from] TranscodeError),

    #[error("Repository error: {0}")]
    Repository(#[from] anyhow::Error),
}

/// Result type for storage engine operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for TranscodeError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Transcode(e) => e,
            StorageError::Repository(e) => TranscodeError::from(e),
            StorageError::CannotTranscode(msg) => TranscodeError::UnsupportedMedia(msg),
            other => TranscodeError::InvalidInput(other.to_string()),
        }
    }
}

#[async_trait]
pub trait StorageEngine: Send + Sync {
    /// Identifier stored on the media files this engine hosts.
    fn engine_type(&self) -> &'static str;

    fn display_name(&self) -> &str;

    /// Metadata of the file behind `url`, or [`StorageError::Unsuitable`]
    /// when this engine does not handle it.
    fn parse(&self, url: &str) -> StorageResult<ParsedMetadata>;

    /// Offer to transcode a media file. Work that needs the file's record to
    /// be committed is queued on `hooks`.
    async fn transcode(&self, media_file: &MediaFile, _hooks: &mut CommitHooks) -> StorageResult<()> {
        Err(StorageError::CannotTranscode(format!(
            "{} does not transcode media file {}",
            self.engine_type(),
            media_file.id
        )))
    }

    /// URIs the file can be accessed under.
    fn get_uris(&self, media_file: &MediaFile) -> Vec<StorageUri>;
}
