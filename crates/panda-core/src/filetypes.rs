//! File extension helpers.

use crate::models::MediaType;

/// Raw container extension the provider reports for multi-bitrate segmented
/// streams.
pub const SEGMENTED_STREAM_EXTENSION: &str = ".ts";

/// Playlist extension that players actually read for segmented streams.
pub const PLAYLIST_EXTENSION: &str = ".m3u8";

/// Normalize an extension: no leading dot, lowercase.
pub fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}

/// Guess the container format for a file extension.
pub fn container_for_extension(ext: &str) -> Option<&'static str> {
    let container = match normalize_extension(ext).as_str() {
        "mp4" | "m4v" | "m4a" => "mp4",
        "ogg" | "ogv" | "oga" => "ogg",
        "mpg" | "mpeg" => "mpeg",
        "webm" => "webm",
        "flv" => "flv",
        "mov" => "mov",
        "mkv" => "mkv",
        "avi" => "avi",
        "wmv" => "wmv",
        "3gp" => "3gp",
        "mp3" => "mp3",
        "flac" => "flac",
        "m3u8" => "m3u8",
        "ts" => "ts",
        _ => return None,
    };
    Some(container)
}

/// Guess the kind of media from a container format.
pub fn media_type_for_container(container: &str) -> MediaType {
    match container {
        "mp3" | "flac" => MediaType::Audio,
        "mp4" | "ogg" | "mpeg" | "webm" | "flv" | "mov" | "mkv" | "avi" | "wmv" | "3gp"
        | "m3u8" | "ts" => MediaType::Video,
        _ => MediaType::Document,
    }
}

/// Extension to present for a rendition: segmented streams are only playable
/// through their playlist.
pub fn playable_extension(extname: &str) -> &str {
    if extname.eq_ignore_ascii_case(SEGMENTED_STREAM_EXTENSION) {
        PLAYLIST_EXTENSION
    } else {
        extname
    }
}

/// Split a file name into stem and extension (with the dot). Leading dots of
/// hidden files are part of the stem.
pub fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 && !name[..idx].ends_with('/') => (&name[..idx], &name[idx..]),
        _ => (name, ""),
    }
}
