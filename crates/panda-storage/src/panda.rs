//! Panda storage engine
//!
//! Hosts the renditions produced by Panda in the S3 bucket of the Panda
//! cloud, optionally served through CloudFront. Video files hosted by other
//! engines are submitted for transcoding once their record is committed.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use panda_client::{Credentials, ProviderClient};
use panda_core::config::state_update_url_for;
use panda_core::constants::{PANDA_ENGINE_NAME, PANDA_ENGINE_TYPE};
use panda_core::filetypes::container_for_extension;
use panda_core::models::{
    ArtifactDescriptor, BaseUrls, MediaFile, MediaType, ParsedMetadata, StorageUri,
};
use panda_core::{CommitHooks, Config, PandaSettings, TranscodeError};
use panda_db::MediaFileRepository;
use panda_services::JobLifecycleManager;

use crate::traits::{StorageEngine, StorageError, StorageResult};

pub struct PandaStorage {
    settings: PandaSettings,
    base_urls: BaseUrls,
    lifecycle: Arc<JobLifecycleManager>,
    /// Template of the URL the provider notifies on state changes.
    state_update_url: Option<String>,
}

impl PandaStorage {
    pub fn new(
        settings: PandaSettings,
        lifecycle: Arc<JobLifecycleManager>,
        state_update_url: Option<String>,
    ) -> Self {
        let base_urls = settings.base_urls();
        Self {
            settings,
            base_urls,
            lifecycle,
            state_update_url,
        }
    }

    /// Engine, client and lifecycle manager from process configuration.
    pub fn from_config(
        config: &Config,
        repository: Arc<dyn MediaFileRepository>,
    ) -> StorageResult<Self> {
        config.settings.validate_settings()?;
        let client = ProviderClient::new(
            Credentials::from_settings(&config.settings),
            Duration::from_secs(config.http_timeout_secs),
        )?;
        let lifecycle = Arc::new(JobLifecycleManager::new(client, repository));
        Ok(Self::new(
            config.settings.clone(),
            lifecycle,
            config.state_update_url.clone(),
        ))
    }

    pub fn settings(&self) -> &PandaSettings {
        &self.settings
    }

    pub fn base_urls(&self) -> &BaseUrls {
        &self.base_urls
    }

    pub fn lifecycle(&self) -> &Arc<JobLifecycleManager> {
        &self.lifecycle
    }

    fn hosts(&self, media_file: &MediaFile) -> bool {
        media_file.storage_engine == PANDA_ENGINE_TYPE
    }
}

#[async_trait]
impl StorageEngine for PandaStorage {
    fn engine_type(&self) -> &'static str {
        PANDA_ENGINE_TYPE
    }

    fn display_name(&self) -> &str {
        PANDA_ENGINE_NAME
    }

    fn parse(&self, url: &str) -> StorageResult<ParsedMetadata> {
        let descriptor = ArtifactDescriptor::from_url(url)?.ok_or(StorageError::Unsuitable)?;
        let unique_id = descriptor.unique_id();

        Ok(ParsedMetadata {
            container: container_for_extension(&descriptor.extname).map(str::to_string),
            display_name: Some(descriptor.display_name.clone()),
            // Only videos are sent to Panda.
            media_type: MediaType::Video,
            width: descriptor.width,
            height: descriptor.height,
            file_size: descriptor.file_size,
            bitrate: descriptor.bitrate(),
            duration: descriptor.duration_seconds(),
            thumbnail_url: Some(format!("{}{}_1.jpg", self.base_urls.primary(), descriptor.id)),
            download_uri: self
                .base_urls
                .access_bases()
                .first()
                .map(|(_, base)| format!("{}{}", base, unique_id)),
            unique_id,
        })
    }

    async fn transcode(&self, media_file: &MediaFile, hooks: &mut CommitHooks) -> StorageResult<()> {
        if self.hosts(media_file) {
            return Ok(());
        }

        self.lifecycle
            .check_transcodable(media_file, &self.settings.profiles)
            .map_err(|e| match e {
                TranscodeError::UnsupportedMedia(msg) => StorageError::CannotTranscode(msg),
                other => StorageError::Transcode(other),
            })?;

        // The provider downloads the file as soon as it is submitted, so the
        // record must be committed first.
        let lifecycle = self.lifecycle.fork();
        let file = media_file.clone();
        let profiles = self.settings.profiles.clone();
        let state_update_url = state_update_url_for(self.state_update_url.as_deref(), media_file.id);
        hooks.after_commit(format!("panda-submit-{}", media_file.id), async move {
            lifecycle
                .submit(&file, &profiles, state_update_url.as_deref())
                .await
                .map(|_| ())
        });

        tracing::debug!(media_file_id = %media_file.id, "Panda submission queued after commit");
        Ok(())
    }

    fn get_uris(&self, media_file: &MediaFile) -> Vec<StorageUri> {
        self.base_urls
            .access_bases()
            .into_iter()
            .map(|(scheme, base)| StorageUri {
                scheme: scheme.to_string(),
                file_uri: media_file.unique_id.clone(),
                server_uri: base.to_string(),
            })
            .collect()
    }
}
