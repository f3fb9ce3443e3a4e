//! Publish workflow client
//!
//! Four steps against the remote service, in order:
//!
//! 1. request a temporary upload target,
//! 2. transfer the archive bytes directly to that target,
//! 3. register a project referencing the uploaded object,
//! 4. poll the project status until `ready` or `failed`.
//!
//! Configuration problems (missing endpoint or API key) abort before the
//! first network call.

use reqwest::Client;

use super::archive::build_archive;
use super::types::{
    Project, ProjectRequest, ProjectStatus, PublishError, PublishedPage, UploadTarget,
    UploadTargetRequest,
};
use crate::config::SnapshotConfig;
use crate::progress::{SnapshotProgress, SnapshotStep};
use crate::utils::filename_from_title;

const API_KEY_HEADER: &str = "X-API-Key";

/// Client for the publishing service.
pub struct PublishClient {
    client: Client,
    endpoint: String,
    api_key: String,
    poll_interval: std::time::Duration,
    max_polls: u32,
}

impl PublishClient {
    /// Build a client from config.
    ///
    /// Fails fast when the endpoint or API key is missing so the caller
    /// never archives and uploads into a dead end.
    pub fn from_config(config: &SnapshotConfig) -> Result<Self, PublishError> {
        let endpoint = config
            .publish_endpoint()
            .ok_or(PublishError::MissingEndpoint)?
            .trim_end_matches('/')
            .to_string();
        let api_key = config
            .publish_api_key()
            .ok_or(PublishError::MissingApiKey)?
            .to_string();

        Ok(Self {
            client: Client::new(),
            endpoint,
            api_key,
            poll_interval: config.publish_poll_interval(),
            max_polls: config.publish_max_polls(),
        })
    }

    /// Run the whole workflow: archive, upload, register, poll.
    pub async fn publish(
        &self,
        html: String,
        title: &str,
        progress: &dyn SnapshotProgress,
    ) -> Result<PublishedPage, PublishError> {
        progress.report(SnapshotStep::Publishing, "Building archive");
        let archive = build_archive(html).await?;

        let filename = filename_from_title(title, "gz");

        progress.report(SnapshotStep::Publishing, "Requesting upload target");
        let target = self.request_upload_target(&filename).await?;

        progress.report(SnapshotStep::Publishing, "Transferring archive");
        self.transfer_archive(&target, archive).await?;

        progress.report(SnapshotStep::Publishing, "Registering project");
        let project = self.register_project(title, &target).await?;

        progress.report(SnapshotStep::Publishing, "Waiting for processing");
        let view_url = self.wait_until_ready(&project).await?;

        log::info!("Published {} as project {}", filename, project.project_id);
        Ok(PublishedPage {
            project_id: project.project_id,
            view_url,
        })
    }

    /// Step 1: obtain a temporary upload target.
    pub async fn request_upload_target(
        &self,
        filename: &str,
    ) -> Result<UploadTarget, PublishError> {
        let response = self
            .client
            .post(format!("{}/uploads", self.endpoint))
            .header(API_KEY_HEADER, &self.api_key)
            .json(&UploadTargetRequest {
                filename: filename.to_string(),
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PublishError::UploadTarget(status_detail(response).await));
        }
        response
            .json::<UploadTarget>()
            .await
            .map_err(PublishError::Http)
    }

    /// Step 2: transfer the archive bytes directly to the target.
    ///
    /// The target URL is pre-authorized by the service; no API key here.
    pub async fn transfer_archive(
        &self,
        target: &UploadTarget,
        archive: Vec<u8>,
    ) -> Result<(), PublishError> {
        let response = self
            .client
            .put(&target.upload_url)
            .header("Content-Type", "application/gzip")
            .body(archive)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PublishError::Transfer(status_detail(response).await));
        }
        Ok(())
    }

    /// Step 3: register a project referencing the uploaded object.
    pub async fn register_project(
        &self,
        title: &str,
        target: &UploadTarget,
    ) -> Result<Project, PublishError> {
        let response = self
            .client
            .post(format!("{}/projects", self.endpoint))
            .header(API_KEY_HEADER, &self.api_key)
            .json(&ProjectRequest {
                title: title.to_string(),
                object_key: target.object_key.clone(),
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PublishError::Register(status_detail(response).await));
        }
        response.json::<Project>().await.map_err(PublishError::Http)
    }

    /// Step 4: poll until the project is `ready` or `failed`.
    ///
    /// A `failed` status stops polling immediately with the service's
    /// error detail; exhausting the poll budget is a timeout.
    pub async fn wait_until_ready(&self, project: &Project) -> Result<String, PublishError> {
        for attempt in 1..=self.max_polls {
            tokio::time::sleep(self.poll_interval).await;

            let status = self.fetch_status(project).await?;
            log::debug!(
                "Publish status for {} (attempt {attempt}/{}): {}",
                project.project_id,
                self.max_polls,
                status.status
            );

            match status.status.as_str() {
                "ready" => {
                    return status.url.ok_or_else(|| {
                        PublishError::ProcessingFailed(
                            "service reported ready without a viewable URL".to_string(),
                        )
                    });
                }
                "failed" => {
                    return Err(PublishError::ProcessingFailed(
                        status
                            .error
                            .unwrap_or_else(|| "no error detail provided".to_string()),
                    ));
                }
                _ => {}
            }
        }

        Err(PublishError::Timeout(self.max_polls))
    }

    async fn fetch_status(&self, project: &Project) -> Result<ProjectStatus, PublishError> {
        let response = self
            .client
            .get(format!(
                "{}/projects/{}",
                self.endpoint, project.project_id
            ))
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PublishError::ProcessingFailed(status_detail(response).await));
        }
        response
            .json::<ProjectStatus>()
            .await
            .map_err(PublishError::Http)
    }
}

async fn status_detail(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    if body.is_empty() {
        format!("status {status}")
    } else {
        format!("status {status}: {body}")
    }
}
