//! Persistence for media files and their transcoding associations.
//!
//! The lifecycle manager only talks to [`MediaFileRepository`]; the
//! Postgres implementation lives in [`pg`] and an in-memory one for tests in
//! [`memory`] (feature `test-utils`).

pub mod pg;
pub mod repository;
pub mod setup;
pub mod transaction;

#[cfg(any(test, feature = "test-utils"))]
pub mod memory;

pub use pg::PgMediaFileRepository;
pub use repository::MediaFileRepository;
pub use setup::{connect, run_migrations};
pub use transaction::TransactionGuard;
