//! Panda Services Layer
//!
//! Orchestration binding local media files to remote transcoding jobs:
//! submission, status polling and harvesting, cancel/retry of encodings,
//! profile lookups and settings verification. Storage engines and the CLI
//! depend on this crate; HTTP plumbing stays in `panda-client`.

pub mod lifecycle;
pub mod profiles;
pub mod settings;
pub mod status;

pub use lifecycle::{ArtifactSink, JobLifecycleManager};
pub use profiles::{
    ensure_custom_profiles, profile_ids_names, profile_ids_to_names, profile_names_to_ids,
    CustomProfile, CUSTOM_PROFILES,
};
pub use settings::verify_settings;
pub use status::{FileStatus, MediaStatus};
