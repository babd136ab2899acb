//! Job lifecycle: binds local media files to remote transcoding jobs.
//!
//! A job is submitted for a video media file and recorded as an association
//! on it. Polling fetches the job and its encodings; once every encoding
//! succeeded the job is harvested: one artifact for the source video and
//! one per encoding are materialized through an [`ArtifactSink`], then the
//! association is dropped. Nothing is materialized while any encoding is
//! pending or failed.
//!
//! Harvesting is exclusive per media file. Inside the process a per-file
//! async mutex serializes pollers; across processes the association is
//! removed (compare-and-swap) before anything is materialized, so only the
//! poller that removed it harvests. The association is restored if
//! materialization fails.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

use panda_client::{EncodingFilter, ProviderClient};
use panda_core::constants::ORIGINAL_PROFILE_LABEL;
use panda_core::filetypes::split_extension;
use panda_core::models::{
    ArtifactDescriptor, Encoding, Job, JobState, MediaFile, PollOutcome, Video,
};
use panda_core::{TranscodeError, TranscodeResult};
use panda_db::MediaFileRepository;

use crate::profiles::{profile_ids_names, profile_names_to_ids};

/// Host-side creation of media files from URLs.
///
/// Harvested artifacts are handed over as `panda:<json>` URLs; the sink
/// dispatches them to the storage engine that accepts them and persists the
/// resulting media file under `media_id`.
#[async_trait]
pub trait ArtifactSink: Send + Sync {
    async fn materialize(&self, media_id: Uuid, url: &str) -> TranscodeResult<MediaFile>;
}

#[derive(Default)]
struct HarvestLocks {
    locks: Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
}

impl HarvestLocks {
    async fn acquire(&self, media_file_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(media_file_id).or_default())
        };
        lock.lock_owned().await
    }

    /// Drop the lock of a media file nobody holds or waits for.
    fn release(&self, media_file_id: Uuid, guard: OwnedMutexGuard<()>) {
        drop(guard);
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if locks
            .get(&media_file_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&media_file_id);
        }
    }
}

pub struct JobLifecycleManager {
    client: ProviderClient,
    repository: Arc<dyn MediaFileRepository>,
    harvest_locks: Arc<HarvestLocks>,
}

impl JobLifecycleManager {
    pub fn new(client: ProviderClient, repository: Arc<dyn MediaFileRepository>) -> Self {
        Self {
            client,
            repository,
            harvest_locks: Arc::new(HarvestLocks::default()),
        }
    }

    /// A manager for one request cycle: fresh response cache, shared
    /// repository and harvest locks.
    pub fn fork(&self) -> Self {
        Self {
            client: self.client.fork(),
            repository: Arc::clone(&self.repository),
            harvest_locks: Arc::clone(&self.harvest_locks),
        }
    }

    pub fn client(&self) -> &ProviderClient {
        &self.client
    }

    pub fn repository(&self) -> &Arc<dyn MediaFileRepository> {
        &self.repository
    }

    /// Local preconditions for submitting `media_file`.
    pub fn check_transcodable(
        &self,
        media_file: &MediaFile,
        profile_names: &[String],
    ) -> TranscodeResult<()> {
        if profile_names.is_empty() {
            return Err(TranscodeError::UnsupportedMedia(
                "no transcoding profiles are configured".to_string(),
            ));
        }
        if !media_file.is_video() {
            return Err(TranscodeError::UnsupportedMedia(format!(
                "media file {} is a {} file, only videos are transcoded",
                media_file.id, media_file.media_type
            )));
        }
        if media_file.download_uri().is_none() {
            return Err(TranscodeError::UnsupportedMedia(format!(
                "media file {} has no download URI",
                media_file.id
            )));
        }
        Ok(())
    }

    /// Submit `media_file` for transcoding with the named profiles and
    /// associate the resulting job with it.
    #[tracing::instrument(skip(self, media_file, profile_names), fields(media_file_id = %media_file.id))]
    pub async fn submit(
        &self,
        media_file: &MediaFile,
        profile_names: &[String],
        state_update_url: Option<&str>,
    ) -> TranscodeResult<Job> {
        self.check_transcodable(media_file, profile_names)?;
        let source_url = media_file.download_uri().ok_or_else(|| {
            TranscodeError::UnsupportedMedia(format!(
                "media file {} has no download URI",
                media_file.id
            ))
        })?;

        let profile_ids = profile_names_to_ids(&self.client, profile_names).await?;
        if profile_ids.is_empty() {
            return Err(TranscodeError::UnsupportedMedia(format!(
                "none of the configured profiles ({}) exist on the provider",
                profile_names.join(", ")
            )));
        }

        let video = self
            .client
            .transcode_file(source_url, &profile_ids, state_update_url)
            .await?;
        self.repository
            .add_association(media_file.id, &video.id)
            .await?;

        tracing::info!(
            video_id = %video.id,
            profiles = profile_ids.len(),
            "Media file submitted for transcoding"
        );
        Ok(Job::submitted(&video, media_file.id, profile_ids))
    }

    /// Refresh the jobs of `media_file` and harvest those that completed.
    ///
    /// Without `video_id`, every associated job is polled. Ids that are not
    /// associated with the file are ignored.
    #[tracing::instrument(skip(self, media_file, sink), fields(media_file_id = %media_file.id))]
    pub async fn poll_status(
        &self,
        media_file: &MediaFile,
        video_id: Option<&str>,
        sink: &dyn ArtifactSink,
    ) -> TranscodeResult<Vec<PollOutcome>> {
        let associated = self.repository.list_associations(media_file.id).await?;
        let video_ids: Vec<String> = match video_id {
            Some(id) if associated.iter().any(|a| a == id) => vec![id.to_string()],
            Some(id) => {
                tracing::debug!(video_id = %id, "Video is not associated with the media file");
                Vec::new()
            }
            None => associated,
        };

        let mut outcomes = Vec::with_capacity(video_ids.len());
        for id in &video_ids {
            outcomes.push(self.poll_video(media_file, id, sink).await?);
        }
        Ok(outcomes)
    }

    /// Poll every file of a media item.
    pub async fn poll_media(
        &self,
        media_id: Uuid,
        video_id: Option<&str>,
        sink: &dyn ArtifactSink,
    ) -> TranscodeResult<Vec<PollOutcome>> {
        let files = self.repository.list_media_files(media_id).await?;
        let mut outcomes = Vec::new();
        for file in &files {
            outcomes.extend(self.poll_status(file, video_id, sink).await?);
        }
        Ok(outcomes)
    }

    async fn poll_video(
        &self,
        media_file: &MediaFile,
        video_id: &str,
        sink: &dyn ArtifactSink,
    ) -> TranscodeResult<PollOutcome> {
        let video = self.client.get_video(video_id).await?;
        let encodings = self
            .client
            .get_encodings(&EncodingFilter::for_video(video_id))
            .await?;
        let mut job = Job::from_remote(&video, media_file.id, encodings);

        if !job.state.is_harvestable() {
            tracing::debug!(video_id = %video_id, state = %job.state, "Job not ready for harvest");
            return Ok(PollOutcome {
                job,
                artifacts: Vec::new(),
            });
        }

        let guard = self.harvest_locks.acquire(media_file.id).await;
        let result = self.harvest(media_file, &video, &mut job, sink).await;
        self.harvest_locks.release(media_file.id, guard);

        let artifacts = result?;
        Ok(PollOutcome { job, artifacts })
    }

    async fn harvest(
        &self,
        media_file: &MediaFile,
        video: &Video,
        job: &mut Job,
        sink: &dyn ArtifactSink,
    ) -> TranscodeResult<Vec<MediaFile>> {
        if !self
            .repository
            .remove_association(media_file.id, &video.id)
            .await?
        {
            tracing::debug!(video_id = %video.id, "Job already harvested by another poller");
            job.state = JobState::Harvested;
            return Ok(Vec::new());
        }

        let materialized = match profile_ids_names(&self.client).await {
            Ok(profiles) => {
                let descriptors = harvest_descriptors(media_file, video, &job.encodings, &profiles);
                materialize_all(media_file.media_id, &descriptors, sink).await
            }
            Err(e) => Err((Vec::new(), e)),
        };

        match materialized {
            Ok(artifacts) => {
                job.state = JobState::Harvested;
                tracing::info!(
                    video_id = %video.id,
                    artifacts = artifacts.len(),
                    "Transcoding job harvested"
                );
                Ok(artifacts)
            }
            Err((partial, e)) => {
                // The job may only be re-harvested once its partial output is gone.
                if !self.discard_artifacts(video, &partial).await {
                    tracing::error!(
                        video_id = %video.id,
                        "Association left removed; partial harvest could not be discarded"
                    );
                    return Err(e);
                }
                if let Err(restore) = self
                    .repository
                    .add_association(media_file.id, &video.id)
                    .await
                {
                    tracing::error!(
                        video_id = %video.id,
                        error = %restore,
                        "Failed to restore association after failed harvest"
                    );
                }
                Err(e)
            }
        }
    }

    /// Delete artifacts created by an interrupted harvest. Returns `false` if
    /// any of them could not be deleted.
    async fn discard_artifacts(&self, video: &Video, artifacts: &[MediaFile]) -> bool {
        let mut discarded = true;
        for artifact in artifacts {
            if let Err(e) = self.repository.delete_media_file(artifact.id).await {
                tracing::error!(
                    video_id = %video.id,
                    media_file_id = %artifact.id,
                    error = %e,
                    "Failed to discard artifact of failed harvest"
                );
                discarded = false;
            }
        }
        if !artifacts.is_empty() {
            tracing::warn!(
                video_id = %video.id,
                artifacts = artifacts.len(),
                "Discarded artifacts of failed harvest"
            );
        }
        discarded
    }

    /// Fetch an encoding and check it belongs to a job of `media_file`.
    async fn owned_encoding(
        &self,
        media_file: &MediaFile,
        encoding_id: &str,
    ) -> TranscodeResult<Encoding> {
        let encoding = self.client.get_encoding(encoding_id).await?;
        let associated = self.repository.list_associations(media_file.id).await?;
        if !associated.iter().any(|id| *id == encoding.video_id) {
            return Err(TranscodeError::Ownership {
                encoding_id: encoding_id.to_string(),
                media_file_id: media_file.id,
            });
        }
        Ok(encoding)
    }

    /// Cancel an encoding of one of the file's jobs. Returns the provider's
    /// deletion flag.
    #[tracing::instrument(skip(self, media_file), fields(media_file_id = %media_file.id))]
    pub async fn cancel(&self, media_file: &MediaFile, encoding_id: &str) -> TranscodeResult<bool> {
        self.owned_encoding(media_file, encoding_id).await?;
        let deleted = self.client.delete_encoding(encoding_id).await?;
        tracing::info!(deleted, "Encoding cancelled");
        Ok(deleted)
    }

    /// Replace an encoding with a fresh one for the same job and profile.
    #[tracing::instrument(skip(self, media_file), fields(media_file_id = %media_file.id))]
    pub async fn retry(&self, media_file: &MediaFile, encoding_id: &str) -> TranscodeResult<Encoding> {
        let encoding = self.owned_encoding(media_file, encoding_id).await?;
        if !self.client.delete_encoding(encoding_id).await? {
            return Err(TranscodeError::provider(
                "EncodingNotDeleted",
                format!("Could not delete encoding {}", encoding_id),
            ));
        }
        let fresh = self
            .client
            .add_transcode_profile(&encoding.video_id, &encoding.profile_id)
            .await?;
        tracing::info!(new_encoding_id = %fresh.id, "Encoding retried");
        Ok(fresh)
    }

    /// Remote jobs associated with `media_file`.
    pub async fn associated_videos(&self, media_file: &MediaFile) -> TranscodeResult<Vec<Video>> {
        let ids = self.repository.list_associations(media_file.id).await?;
        let mut videos = Vec::with_capacity(ids.len());
        for id in &ids {
            videos.push(self.client.get_video(id).await?);
        }
        Ok(videos)
    }

    /// Encodings of every job associated with `media_file`.
    pub async fn associated_encodings(
        &self,
        media_file: &MediaFile,
    ) -> TranscodeResult<Vec<Encoding>> {
        let ids = self.repository.list_associations(media_file.id).await?;
        let mut encodings = Vec::new();
        for id in &ids {
            encodings.extend(
                self.client
                    .get_encodings(&EncodingFilter::for_video(id.as_str()))
                    .await?,
            );
        }
        Ok(encodings)
    }
}

/// Artifacts for a completed job: the source video first, then one per
/// encoding.
///
/// Display names read `(<profile>) <stem><ext>` where the stem comes from the
/// original file name and underscores in profile names become spaces.
pub fn harvest_descriptors(
    media_file: &MediaFile,
    video: &Video,
    encodings: &[Encoding],
    profile_names: &HashMap<String, String>,
) -> Vec<ArtifactDescriptor> {
    let (stem, _) = split_extension(&media_file.display_name);

    let mut descriptors = Vec::with_capacity(encodings.len() + 1);
    let original = format!(
        "({}) {}{}",
        ORIGINAL_PROFILE_LABEL,
        stem,
        video.extname.as_deref().unwrap_or_default()
    );
    descriptors.push(ArtifactDescriptor::from_video(video, original));

    for encoding in encodings {
        let profile = profile_names
            .get(&encoding.profile_id)
            .map(String::as_str)
            .or(encoding.profile_name.as_deref())
            .unwrap_or(encoding.profile_id.as_str());
        // Display name is fixed after the extension remap.
        let mut descriptor = ArtifactDescriptor::from_encoding(encoding, String::new());
        descriptor.display_name = format!(
            "({}) {}{}",
            profile.replace('_', " "),
            stem,
            descriptor.extname
        );
        descriptors.push(descriptor);
    }
    descriptors
}

/// Materialize every descriptor in order. On failure the artifacts created
/// so far are handed back with the error.
async fn materialize_all(
    media_id: Uuid,
    descriptors: &[ArtifactDescriptor],
    sink: &dyn ArtifactSink,
) -> Result<Vec<MediaFile>, (Vec<MediaFile>, TranscodeError)> {
    let mut artifacts = Vec::with_capacity(descriptors.len());
    for descriptor in descriptors {
        let materialized = match descriptor.to_url() {
            Ok(url) => sink.materialize(media_id, &url).await,
            Err(e) => Err(e),
        };
        match materialized {
            Ok(file) => artifacts.push(file),
            Err(e) => return Err((artifacts, e)),
        }
    }
    Ok(artifacts)
}
