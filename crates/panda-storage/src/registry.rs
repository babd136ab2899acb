//! Registry of storage engines
//!
//! Dispatches URLs to the first engine that accepts them and creates media
//! files from the result. The registry is also the [`ArtifactSink`] harvested
//! renditions are materialized through.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use panda_core::models::{MediaFile, NewMediaFile, StorageUri};
use panda_core::{CommitHooks, TranscodeResult};
use panda_db::MediaFileRepository;
use panda_services::ArtifactSink;

use crate::traits::{StorageEngine, StorageError, StorageResult};

#[derive(Clone)]
pub struct EngineRegistry {
    engines: Arc<RwLock<Vec<Arc<dyn StorageEngine>>>>,
    repository: Arc<dyn MediaFileRepository>,
}

impl EngineRegistry {
    pub fn new(repository: Arc<dyn MediaFileRepository>) -> Self {
        Self {
            engines: Arc::new(RwLock::new(Vec::new())),
            repository,
        }
    }

    /// Register an engine. Engines are tried in registration order; an engine
    /// registered again under the same type replaces the earlier one.
    pub async fn register(&self, engine: Arc<dyn StorageEngine>) {
        let mut engines = self.engines.write().await;
        match engines
            .iter()
            .position(|e| e.engine_type() == engine.engine_type())
        {
            Some(idx) => engines[idx] = engine,
            None => engines.push(engine),
        }
    }

    pub async fn engine(&self, engine_type: &str) -> Option<Arc<dyn StorageEngine>> {
        self.engines
            .read()
            .await
            .iter()
            .find(|e| e.engine_type() == engine_type)
            .cloned()
    }

    pub async fn engine_types(&self) -> Vec<&'static str> {
        self.engines
            .read()
            .await
            .iter()
            .map(|e| e.engine_type())
            .collect()
    }

    /// Insertable media file for `url`, from the first engine that accepts it.
    pub async fn parse(&self, media_id: Uuid, url: &str) -> StorageResult<NewMediaFile> {
        let engines = self.engines.read().await;
        for engine in engines.iter() {
            match engine.parse(url) {
                Ok(metadata) => {
                    return Ok(NewMediaFile::from_parsed(
                        media_id,
                        engine.engine_type(),
                        url,
                        metadata,
                    ));
                }
                Err(StorageError::Unsuitable) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(StorageError::Unsuitable)
    }

    /// Parse `url` and persist the resulting media file.
    pub async fn add_media_file(&self, media_id: Uuid, url: &str) -> StorageResult<MediaFile> {
        let new_file = self.parse(media_id, url).await?;
        let file = self.repository.insert_media_file(new_file).await?;
        tracing::info!(
            media_file_id = %file.id,
            media_id = %media_id,
            storage_engine = %file.storage_engine,
            "Media file created"
        );
        Ok(file)
    }

    /// Offer `media_file` to every engine. Returns the number of engines that
    /// accepted it.
    pub async fn transcode_all(
        &self,
        media_file: &MediaFile,
        hooks: &mut CommitHooks,
    ) -> StorageResult<usize> {
        let engines: Vec<Arc<dyn StorageEngine>> = self.engines.read().await.clone();
        let mut accepted = 0;
        for engine in engines {
            match engine.transcode(media_file, hooks).await {
                Ok(()) => accepted += 1,
                Err(StorageError::CannotTranscode(reason)) => {
                    tracing::debug!(
                        engine = engine.engine_type(),
                        media_file_id = %media_file.id,
                        reason = %reason,
                        "Engine declined to transcode"
                    );
                }
                Err(e) => return Err(e),
            }
        }
        Ok(accepted)
    }

    /// URIs of `media_file` from the engine hosting it.
    pub async fn get_uris(&self, media_file: &MediaFile) -> StorageResult<Vec<StorageUri>> {
        let engine = self
            .engine(&media_file.storage_engine)
            .await
            .ok_or(StorageError::NotFound(media_file.id))?;
        Ok(engine.get_uris(media_file))
    }
}

#[async_trait]
impl ArtifactSink for EngineRegistry {
    async fn materialize(&self, media_id: Uuid, url: &str) -> TranscodeResult<MediaFile> {
        Ok(self.add_media_file(media_id, url).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{RemoteUrlStorage, REMOTE_ENGINE_TYPE};
    use panda_core::models::{MediaType, ParsedMetadata};
    use panda_db::memory::InMemoryMediaFileRepository;

    struct PrefixEngine {
        prefix: &'static str,
        engine_type: &'static str,
    }

    #[async_trait]
    impl StorageEngine for PrefixEngine {
        fn engine_type(&self) -> &'static str {
            self.engine_type
        }

        fn display_name(&self) -> &str {
            self.engine_type
        }

        fn parse(&self, url: &str) -> StorageResult<ParsedMetadata> {
            let rest = url.strip_prefix(self.prefix).ok_or(StorageError::Unsuitable)?;
            Ok(ParsedMetadata {
                unique_id: rest.to_string(),
                container: None,
                display_name: None,
                media_type: MediaType::Document,
                width: None,
                height: None,
                file_size: None,
                bitrate: None,
                duration: None,
                thumbnail_url: None,
                download_uri: None,
            })
        }

        fn get_uris(&self, _media_file: &MediaFile) -> Vec<StorageUri> {
            Vec::new()
        }
    }

    fn registry() -> (EngineRegistry, InMemoryMediaFileRepository) {
        let repo = InMemoryMediaFileRepository::new();
        (EngineRegistry::new(Arc::new(repo.clone())), repo)
    }

    #[tokio::test]
    async fn first_accepting_engine_wins() {
        let (registry, repo) = registry();
        registry
            .register(Arc::new(PrefixEngine {
                prefix: "local:",
                engine_type: "Local",
            }))
            .await;
        registry.register(Arc::new(RemoteUrlStorage::new())).await;

        let media_id = Uuid::new_v4();
        let local = registry.add_media_file(media_id, "local:notes.txt").await.unwrap();
        assert_eq!(local.storage_engine, "Local");
        assert_eq!(local.display_name, "local:notes.txt");

        let remote = registry
            .add_media_file(media_id, "http://x.org/clip.mp4")
            .await
            .unwrap();
        assert_eq!(remote.storage_engine, REMOTE_ENGINE_TYPE);
        assert_eq!(remote.display_name, "clip.mp4");
        assert_eq!(repo.file_count(), 2);
    }

    #[tokio::test]
    async fn unclaimed_urls_are_rejected() {
        let (registry, repo) = registry();
        registry.register(Arc::new(RemoteUrlStorage::new())).await;
        assert!(matches!(
            registry.add_media_file(Uuid::new_v4(), "ftp://x.org/a").await,
            Err(StorageError::Unsuitable)
        ));
        assert_eq!(repo.file_count(), 0);
    }

    #[tokio::test]
    async fn registering_twice_replaces() {
        let (registry, _) = registry();
        registry.register(Arc::new(RemoteUrlStorage::new())).await;
        registry.register(Arc::new(RemoteUrlStorage::new())).await;
        assert_eq!(registry.engine_types().await, vec![REMOTE_ENGINE_TYPE]);
    }

    #[tokio::test]
    async fn engines_that_cannot_transcode_are_skipped() {
        let (registry, _) = registry();
        registry.register(Arc::new(RemoteUrlStorage::new())).await;
        let file = registry
            .add_media_file(Uuid::new_v4(), "http://x.org/clip.mp4")
            .await
            .unwrap();
        let mut hooks = CommitHooks::new();
        assert_eq!(registry.transcode_all(&file, &mut hooks).await.unwrap(), 0);
        assert!(hooks.is_empty());
    }

    #[tokio::test]
    async fn uris_come_from_hosting_engine() {
        let (registry, _) = registry();
        registry.register(Arc::new(RemoteUrlStorage::new())).await;
        let file = registry
            .add_media_file(Uuid::new_v4(), "https://x.org/clip.mp4")
            .await
            .unwrap();
        let uris = registry.get_uris(&file).await.unwrap();
        assert_eq!(uris[0].url(), "https://x.org/clip.mp4");
        assert_eq!(uris[0].scheme, "https");

        let mut orphan = file.clone();
        orphan.storage_engine = "Gone".to_string();
        assert!(matches!(
            registry.get_uris(&orphan).await,
            Err(StorageError::NotFound(_))
        ));
    }
}
