use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use panda_core::models::{association_key, video_id_from_key, MediaFile, MediaType, NewMediaFile};
use sqlx::{PgConnection, PgPool, Postgres};
use uuid::Uuid;

use crate::repository::MediaFileRepository;

#[derive(Debug, sqlx::FromRow)]
struct MediaFileRow {
    id: Uuid,
    media_id: Uuid,
    display_name: String,
    media_type: MediaType,
    storage_engine: String,
    unique_id: String,
    container: Option<String>,
    width: Option<i32>,
    height: Option<i32>,
    file_size: Option<i64>,
    bitrate: Option<i64>,
    duration: Option<f64>,
    thumbnail_url: Option<String>,
    download_uri: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<MediaFileRow> for MediaFile {
    fn from(row: MediaFileRow) -> Self {
        MediaFile {
            id: row.id,
            media_id: row.media_id,
            display_name: row.display_name,
            media_type: row.media_type,
            storage_engine: row.storage_engine,
            unique_id: row.unique_id,
            container: row.container,
            width: row.width,
            height: row.height,
            file_size: row.file_size,
            bitrate: row.bitrate,
            duration: row.duration,
            thumbnail_url: row.thumbnail_url,
            download_uri: row.download_uri,
            created_at: row.created_at,
        }
    }
}

const SELECT_COLUMNS: &str = "id, media_id, display_name, media_type, storage_engine, unique_id, \
     container, width, height, file_size, bitrate, duration, thumbnail_url, download_uri, created_at";

#[derive(Clone)]
pub struct PgMediaFileRepository {
    pool: PgPool,
}

impl PgMediaFileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Insert on an existing connection, typically an open transaction.
    #[tracing::instrument(skip(conn, new_file), fields(db.table = "media_files", db.operation = "insert"))]
    pub async fn insert_with(conn: &mut PgConnection, new_file: NewMediaFile) -> Result<MediaFile> {
        let file = new_file.into_media_file(Uuid::new_v4(), Utc::now());

        sqlx::query(
            r#"
            INSERT INTO media_files (
                id, media_id, display_name, media_type, storage_engine, unique_id,
                container, width, height, file_size, bitrate, duration,
                thumbnail_url, download_uri, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(file.id)
        .bind(file.media_id)
        .bind(&file.display_name)
        .bind(file.media_type)
        .bind(&file.storage_engine)
        .bind(&file.unique_id)
        .bind(&file.container)
        .bind(file.width)
        .bind(file.height)
        .bind(file.file_size)
        .bind(file.bitrate)
        .bind(file.duration)
        .bind(&file.thumbnail_url)
        .bind(&file.download_uri)
        .bind(file.created_at)
        .execute(conn)
        .await
        .context("Failed to insert media file")?;

        tracing::debug!(media_file_id = %file.id, engine = %file.storage_engine, "Media file inserted");
        Ok(file)
    }
}

#[async_trait]
impl MediaFileRepository for PgMediaFileRepository {
    #[tracing::instrument(skip(self), fields(db.table = "media_files", db.operation = "select", db.record_id = %id))]
    async fn get_media_file(&self, id: Uuid) -> Result<Option<MediaFile>> {
        let query = format!("SELECT {} FROM media_files WHERE id = $1", SELECT_COLUMNS);
        let row = sqlx::query_as::<Postgres, MediaFileRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch media file")?;
        Ok(row.map(MediaFile::from))
    }

    #[tracing::instrument(skip(self), fields(db.table = "media_files", db.operation = "select"))]
    async fn list_media_files(&self, media_id: Uuid) -> Result<Vec<MediaFile>> {
        let query = format!(
            "SELECT {} FROM media_files WHERE media_id = $1 ORDER BY created_at, id",
            SELECT_COLUMNS
        );
        let rows = sqlx::query_as::<Postgres, MediaFileRow>(&query)
            .bind(media_id)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list media files")?;
        Ok(rows.into_iter().map(MediaFile::from).collect())
    }

    async fn insert_media_file(&self, new_file: NewMediaFile) -> Result<MediaFile> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .context("Failed to acquire database connection")?;
        Self::insert_with(&mut *conn, new_file).await
    }

    #[tracing::instrument(skip(self), fields(db.table = "media_files", db.operation = "delete", db.record_id = %id))]
    async fn delete_media_file(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM media_files WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete media file")?;
        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self), fields(db.table = "media_files_meta", db.operation = "select", db.record_id = %media_file_id))]
    async fn list_associations(&self, media_file_id: Uuid) -> Result<Vec<String>> {
        let keys: Vec<String> = sqlx::query_scalar::<Postgres, String>(
            "SELECT key FROM media_files_meta WHERE media_files_id = $1 ORDER BY key",
        )
        .bind(media_file_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list media file associations")?;

        Ok(keys
            .iter()
            .filter_map(|key| video_id_from_key(key))
            .map(str::to_string)
            .collect())
    }

    #[tracing::instrument(skip(self), fields(db.table = "media_files_meta", db.operation = "insert", db.record_id = %media_file_id))]
    async fn add_association(&self, media_file_id: Uuid, video_id: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO media_files_meta (media_files_id, key, value)
            VALUES ($1, $2, $3)
            ON CONFLICT (media_files_id, key) DO NOTHING
            "#,
        )
        .bind(media_file_id)
        .bind(association_key(video_id))
        .bind(video_id)
        .execute(&self.pool)
        .await
        .context("Failed to associate video with media file")?;
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "media_files_meta", db.operation = "delete", db.record_id = %media_file_id))]
    async fn remove_association(&self, media_file_id: Uuid, video_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM media_files_meta WHERE media_files_id = $1 AND key = $2")
            .bind(media_file_id)
            .bind(association_key(video_id))
            .execute(&self.pool)
            .await
            .context("Failed to remove media file association")?;
        Ok(result.rows_affected() > 0)
    }
}
