use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use uuid::Uuid;

use super::{Encoding, MediaFile, RemoteStatus, Video};

/// Lifecycle state of a job as seen from the local side.
///
/// `Submitted → Processing → Succeeded → Harvested`, with `Stalled` when any
/// encoding failed. A stalled job only moves again through a manual
/// retry or cancel of its failed encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Submitted,
    Processing,
    Succeeded,
    Stalled,
    Harvested,
}

impl JobState {
    /// Derive the state from the remote video and its encodings.
    pub fn from_remote(video_status: RemoteStatus, encodings: &[Encoding]) -> Self {
        if encodings.iter().any(|e| e.status.is_failure()) {
            return JobState::Stalled;
        }
        if encodings.iter().any(|e| !e.status.is_success()) {
            return JobState::Processing;
        }
        if encodings.is_empty() {
            // Encodings only show up once the provider fetched the source.
            return match video_status {
                RemoteStatus::Success => JobState::Succeeded,
                RemoteStatus::Fail => JobState::Stalled,
                RemoteStatus::Processing | RemoteStatus::Unknown => JobState::Submitted,
            };
        }
        JobState::Succeeded
    }

    pub fn is_harvestable(&self) -> bool {
        matches!(self, JobState::Succeeded)
    }
}

impl Display for JobState {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            JobState::Submitted => write!(f, "submitted"),
            JobState::Processing => write!(f, "processing"),
            JobState::Succeeded => write!(f, "succeeded"),
            JobState::Stalled => write!(f, "stalled"),
            JobState::Harvested => write!(f, "harvested"),
        }
    }
}

/// One remote transcoding submission of a local media file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub video_id: String,
    pub media_file_id: Uuid,
    pub profile_ids: Vec<String>,
    pub state: JobState,
    pub encodings: Vec<Encoding>,
}

impl Job {
    /// A freshly submitted job.
    pub fn submitted(video: &Video, media_file_id: Uuid, profile_ids: Vec<String>) -> Self {
        Self {
            video_id: video.id.clone(),
            media_file_id,
            profile_ids,
            state: JobState::Submitted,
            encodings: Vec::new(),
        }
    }

    pub fn from_remote(video: &Video, media_file_id: Uuid, encodings: Vec<Encoding>) -> Self {
        let mut profile_ids: Vec<String> = Vec::with_capacity(encodings.len());
        for e in &encodings {
            if !profile_ids.contains(&e.profile_id) {
                profile_ids.push(e.profile_id.clone());
            }
        }
        Self {
            video_id: video.id.clone(),
            media_file_id,
            profile_ids,
            state: JobState::from_remote(video.status, &encodings),
            encodings,
        }
    }

    pub fn failed_encodings(&self) -> impl Iterator<Item = &Encoding> {
        self.encodings.iter().filter(|e| e.status.is_failure())
    }
}

/// Result of polling one job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollOutcome {
    pub job: Job,
    /// Media files materialized by this poll; empty unless the job was
    /// harvested by it.
    pub artifacts: Vec<MediaFile>,
}
