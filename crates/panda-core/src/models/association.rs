use crate::constants::META_VIDEO_PREFIX;

/// Meta key linking a media file to a remote video.
pub fn association_key(video_id: &str) -> String {
    format!("{}{}", META_VIDEO_PREFIX, video_id)
}

/// Video id of an association meta key, `None` for unrelated keys.
pub fn video_id_from_key(key: &str) -> Option<&str> {
    key.strip_prefix(META_VIDEO_PREFIX)
        .filter(|id| !id.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_round_trip() {
        let key = association_key("abc123");
        assert_eq!(key, "panda_video_abc123");
        assert_eq!(video_id_from_key(&key), Some("abc123"));
    }

    #[test]
    fn unrelated_keys_are_ignored() {
        assert_eq!(video_id_from_key("license"), None);
        assert_eq!(video_id_from_key("panda_video_"), None);
    }
}
