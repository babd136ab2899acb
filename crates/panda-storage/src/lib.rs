//! Storage engines
//!
//! A storage engine recognizes URLs it can host ([`StorageEngine::parse`]),
//! optionally offers to transcode files hosted elsewhere, and lists the URIs
//! its files are reachable under. [`PandaStorage`] hosts the renditions
//! produced by Panda; [`RemoteUrlStorage`] accepts plain HTTP URLs.
//! [`EngineRegistry`] dispatches between them and creates media files.

pub mod panda;
pub mod registry;
pub mod remote;
pub mod traits;

pub use panda::PandaStorage;
pub use registry::EngineRegistry;
pub use remote::RemoteUrlStorage;
pub use traits::{StorageEngine, StorageError, StorageResult};
