//! Data models
//!
//! Provider records (`Cloud`, `Profile`, `Video`, `Encoding`) are decoded at
//! the API boundary; host-side records (`MediaFile`) and the job lifecycle
//! types live next to them.

mod artifact;
mod association;
mod job;
mod media_file;
mod provider;
mod storage;

pub use artifact::*;
pub use association::*;
pub use job::*;
pub use media_file::*;
pub use provider::*;
pub use storage::*;
