//! In-memory repository for tests without a database.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use panda_core::models::{MediaFile, NewMediaFile};
use uuid::Uuid;

use crate::repository::MediaFileRepository;

#[derive(Clone, Default)]
pub struct InMemoryMediaFileRepository {
    files: Arc<Mutex<Vec<MediaFile>>>,
    associations: Arc<Mutex<HashMap<Uuid, BTreeSet<String>>>>,
}

impl InMemoryMediaFileRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_media_file(&self, file: MediaFile) {
        self.files.lock().unwrap().push(file);
    }

    /// Every stored file.
    pub fn media_files(&self) -> Vec<MediaFile> {
        self.files.lock().unwrap().clone()
    }

    pub fn file_count(&self) -> usize {
        self.files.lock().unwrap().len()
    }
}

#[async_trait]
impl MediaFileRepository for InMemoryMediaFileRepository {
    async fn get_media_file(&self, id: Uuid) -> Result<Option<MediaFile>> {
        Ok(self
            .files
            .lock()
            .unwrap()
            .iter()
            .find(|f| f.id == id)
            .cloned())
    }

    async fn list_media_files(&self, media_id: Uuid) -> Result<Vec<MediaFile>> {
        Ok(self
            .files
            .lock()
            .unwrap()
            .iter()
            .filter(|f| f.media_id == media_id)
            .cloned()
            .collect())
    }

    async fn insert_media_file(&self, new_file: NewMediaFile) -> Result<MediaFile> {
        let file = new_file.into_media_file(Uuid::new_v4(), Utc::now());
        self.files.lock().unwrap().push(file.clone());
        Ok(file)
    }

    async fn delete_media_file(&self, id: Uuid) -> Result<bool> {
        let mut files = self.files.lock().unwrap();
        let before = files.len();
        files.retain(|f| f.id != id);
        let deleted = files.len() != before;
        if deleted {
            self.associations.lock().unwrap().remove(&id);
        }
        Ok(deleted)
    }

    async fn list_associations(&self, media_file_id: Uuid) -> Result<Vec<String>> {
        Ok(self
            .associations
            .lock()
            .unwrap()
            .get(&media_file_id)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn add_association(&self, media_file_id: Uuid, video_id: &str) -> Result<()> {
        self.associations
            .lock()
            .unwrap()
            .entry(media_file_id)
            .or_default()
            .insert(video_id.to_string());
        Ok(())
    }

    async fn remove_association(&self, media_file_id: Uuid, video_id: &str) -> Result<bool> {
        Ok(self
            .associations
            .lock()
            .unwrap()
            .get_mut(&media_file_id)
            .map(|ids| ids.remove(video_id))
            .unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use panda_core::models::{MediaType, ParsedMetadata};

    fn new_file(media_id: Uuid) -> NewMediaFile {
        NewMediaFile::from_parsed(
            media_id,
            "RemoteURLStorage",
            "clip.mp4",
            ParsedMetadata {
                unique_id: "http://example.com/clip.mp4".to_string(),
                container: Some("mp4".to_string()),
                display_name: None,
                media_type: MediaType::Video,
                width: None,
                height: None,
                file_size: None,
                bitrate: None,
                duration: None,
                thumbnail_url: None,
                download_uri: Some("http://example.com/clip.mp4".to_string()),
            },
        )
    }

    #[tokio::test]
    async fn insert_and_list() {
        let repo = InMemoryMediaFileRepository::new();
        let media_id = Uuid::new_v4();
        let file = repo.insert_media_file(new_file(media_id)).await.unwrap();
        assert_eq!(file.display_name, "clip.mp4");
        assert_eq!(repo.list_media_files(media_id).await.unwrap().len(), 1);
        assert!(repo.get_media_file(file.id).await.unwrap().is_some());
        assert!(repo.list_media_files(Uuid::new_v4()).await.unwrap().is_empty());

        assert!(repo.delete_media_file(file.id).await.unwrap());
        assert!(!repo.delete_media_file(file.id).await.unwrap());
        assert_eq!(repo.file_count(), 0);
    }

    #[tokio::test]
    async fn association_removal_is_claimed_once() {
        let repo = InMemoryMediaFileRepository::new();
        let id = Uuid::new_v4();
        repo.add_association(id, "v2").await.unwrap();
        repo.add_association(id, "v1").await.unwrap();
        repo.add_association(id, "v1").await.unwrap();
        assert_eq!(repo.list_associations(id).await.unwrap(), vec!["v1", "v2"]);

        assert!(repo.remove_association(id, "v1").await.unwrap());
        assert!(!repo.remove_association(id, "v1").await.unwrap());
        assert!(!repo.remove_association(Uuid::new_v4(), "v1").await.unwrap());
        assert_eq!(repo.list_associations(id).await.unwrap(), vec!["v2"]);
    }
}
