//! Panda Core Library
//!
//! This crate provides the domain models, error types, settings and small
//! helpers shared by every crate of the Panda transcoding integration.

pub mod config;
pub mod constants;
pub mod error;
pub mod filetypes;
pub mod hooks;
pub mod models;

// Re-export commonly used types
pub use config::{Config, PandaSettings};
pub use error::{ErrorMetadata, LogLevel, TranscodeError, TranscodeResult};
pub use hooks::CommitHooks;
