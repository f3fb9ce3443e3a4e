//! Publish workflow types and errors

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from the publish workflow.
///
/// Configuration errors are raised before any network call is made.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Publish endpoint not configured")]
    MissingEndpoint,

    #[error("Publish API key not configured")]
    MissingApiKey,

    #[error("Failed to build archive: {0}")]
    Archive(String),

    #[error("Upload target request failed: {0}")]
    UploadTarget(String),

    #[error("Archive transfer failed: {0}")]
    Transfer(String),

    #[error("Project registration failed: {0}")]
    Register(String),

    #[error("Publish processing failed: {0}")]
    ProcessingFailed(String),

    #[error("Publish did not complete within {0} status checks")]
    Timeout(u32),

    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Request body for the temporary upload target.
#[derive(Debug, Serialize)]
pub struct UploadTargetRequest {
    pub filename: String,
}

/// A temporary upload target issued by the service.
///
/// `upload_url` receives the archive bytes directly; `object_key`
/// identifies the uploaded object when registering the project.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadTarget {
    pub upload_url: String,
    pub object_key: String,
}

/// Request body registering a project against an uploaded archive.
#[derive(Debug, Serialize)]
pub struct ProjectRequest {
    pub title: String,
    pub object_key: String,
}

/// A registered project awaiting processing.
#[derive(Debug, Clone, Deserialize)]
pub struct Project {
    pub project_id: String,
}

/// One status poll response.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectStatus {
    pub status: String,
    /// Viewable URL, present once status is `ready`
    #[serde(default)]
    pub url: Option<String>,
    /// Failure detail, present when status is `failed`
    #[serde(default)]
    pub error: Option<String>,
}

/// Final outcome of a successful publish.
#[derive(Debug, Clone)]
pub struct PublishedPage {
    pub project_id: String,
    /// Where the published snapshot can be viewed
    pub view_url: String,
}
