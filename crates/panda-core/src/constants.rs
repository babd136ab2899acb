//! Constants shared across the workspace.

/// Engine type string stored on media files hosted by the Panda engine.
pub const PANDA_ENGINE_TYPE: &str = "PandaStorage";

/// Human-readable default name of the Panda engine.
pub const PANDA_ENGINE_NAME: &str = "Panda Transcoding & Storage";

/// Prefix of the pseudo-URL carrying an encoded artifact descriptor.
pub const PANDA_URL_PREFIX: &str = "panda:";

/// Prefix of media file meta keys that link a media file to a remote video.
pub const META_VIDEO_PREFIX: &str = "panda_video_";

pub const DEFAULT_API_HOST: &str = "api.pandastream.com";
pub const EU_API_HOST: &str = "api.eu.pandastream.com";

/// API version path segment prepended to every request path.
pub const API_VERSION_PATH: &str = "/v2";

pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Label used for the artifact created from the source video itself.
pub const ORIGINAL_PROFILE_LABEL: &str = "original";
