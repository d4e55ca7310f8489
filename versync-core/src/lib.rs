//! Versioned sync core
//!
//! Classifies local/remote differences, archives changed and deleted files
//! server-side before the mirror overwrites them, and prunes old version
//! directories. All remote I/O goes through [`provider::RemoteProvider`].

pub mod archive;
pub mod backup;
pub mod classify;
pub mod error;
pub mod layout;
pub mod logfile;
pub mod outcome;
pub mod provider;
pub mod restore;
pub mod retention;
pub mod schedule;
pub mod source;
pub mod stamp;
pub mod status;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use error::{ProviderError, SyncError};
pub use layout::{Bucket, RemoteLayout, RemotePath};
pub use provider::{Location, MirrorRequest, RemoteProvider};
pub use source::{RetentionPolicy, Source};
pub use stamp::VersionStamp;
pub type Result<T> = std::result::Result<T, SyncError>;
