//! Files referenced by plain HTTP(S) URLs.
//!
//! The file stays where it is; the URL itself is the unique id and the
//! download URI. Videos added this way can be handed to Panda for
//! transcoding.

use async_trait::async_trait;

use panda_core::filetypes::{container_for_extension, media_type_for_container, split_extension};
use panda_core::models::{MediaFile, ParsedMetadata, StorageUri};

use crate::traits::{StorageEngine, StorageError, StorageResult};

pub const REMOTE_ENGINE_TYPE: &str = "RemoteURLStorage";

#[derive(Debug, Clone, Default)]
pub struct RemoteUrlStorage;

impl RemoteUrlStorage {
    pub fn new() -> Self {
        Self
    }
}

fn scheme_of(url: &str) -> Option<&'static str> {
    if url.starts_with("https://") {
        Some("https")
    } else if url.starts_with("http://") {
        Some("http")
    } else {
        None
    }
}

/// Last path segment, without query string or fragment.
fn file_name(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let path = path.split_once("://").map_or(path, |(_, rest)| rest);
    match path.split_once('/') {
        Some((_, rest)) => rest.rsplit('/').next().unwrap_or(rest),
        None => "",
    }
}

#[async_trait]
impl StorageEngine for RemoteUrlStorage {
    fn engine_type(&self) -> &'static str {
        REMOTE_ENGINE_TYPE
    }

    fn display_name(&self) -> &str {
        "Remote URL"
    }

    fn parse(&self, url: &str) -> StorageResult<ParsedMetadata> {
        let url = url.trim();
        if scheme_of(url).is_none() {
            return Err(StorageError::Unsuitable);
        }

        let name = file_name(url);
        let (_, ext) = split_extension(name);
        let container = container_for_extension(ext);

        Ok(ParsedMetadata {
            unique_id: url.to_string(),
            container: container.map(str::to_string),
            display_name: (!name.is_empty()).then(|| name.to_string()),
            media_type: container
                .map(media_type_for_container)
                .unwrap_or(panda_core::models::MediaType::Document),
            width: None,
            height: None,
            file_size: None,
            bitrate: None,
            duration: None,
            thumbnail_url: None,
            download_uri: Some(url.to_string()),
        })
    }

    fn get_uris(&self, media_file: &MediaFile) -> Vec<StorageUri> {
        let url = media_file.unique_id.as_str();
        vec![StorageUri {
            scheme: scheme_of(url).unwrap_or("http").to_string(),
            file_uri: url.to_string(),
            server_uri: String::new(),
        }]
    }
}
