//! Publishing a snapshot to the remote service
//!
//! The snapshot markup is packaged into a compressed single-entry
//! archive and pushed through the service's upload-register-poll
//! protocol. See [`client::PublishClient`] for the step sequence.

pub mod archive;
pub mod client;
pub mod types;

pub use archive::{ARCHIVE_ENTRY_NAME, build_archive};
pub use client::PublishClient;
pub use types::{
    Project, ProjectStatus, PublishError, PublishedPage, UploadTarget,
};
