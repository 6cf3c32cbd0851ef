//! HTTP client for the mosh backend REST endpoints.
//!
//! Wraps the backend HTTP API (project CRUD, upload, conversion,
//! timeline, scenes, clips, mosh submission, deletion) using
//! [`reqwest`].

use remosh_core::job::ConvertFormat;
use remosh_core::project::{Project, Scene};

use crate::types::*;

/// HTTP client for a single backend instance.
pub struct BackendClient {
    client: reqwest::Client,
    api_url: String,
}

/// Errors from the backend REST API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend returned a non-2xx status code.
    #[error("Backend API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}

impl ApiError {
    /// True when the backend answered 404 for the addressed resource.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::Api { status: 404, .. })
    }
}

impl BackendClient {
    /// Create a new API client.
    ///
    /// * `api_url` - Base HTTP URL, e.g. `http://localhost:8080`.
    pub fn new(api_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
        }
    }

    /// Create an API client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, api_url: String) -> Self {
        Self { client, api_url }
    }

    /// Base HTTP URL.
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    // ---- projects ----

    /// `GET /api/projects`
    pub async fn list_projects(&self) -> Result<Vec<Project>, ApiError> {
        let response = self
            .client
            .get(format!("{}/api/projects", self.api_url))
            .send()
            .await?;
        let list: ProjectListResponse = Self::parse_response(response).await?;
        Ok(list.projects)
    }

    /// `POST /api/projects`
    pub async fn create_project(&self, name: &str) -> Result<Project, ApiError> {
        let response = self
            .client
            .post(format!("{}/api/projects", self.api_url))
            .json(&CreateProjectRequest { name: name.into() })
            .send()
            .await?;
        let envelope: ProjectEnvelope = Self::parse_response(response).await?;
        Ok(envelope.project)
    }

    /// `GET /api/projects/{id}` -- full project state including clips,
    /// mosh sessions, and cached scenes.
    pub async fn get_project(&self, project_id: &str) -> Result<ProjectDetail, ApiError> {
        let response = self
            .client
            .get(format!("{}/api/projects/{}", self.api_url, project_id))
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// `POST /api/projects/{id}/scan` -- rebuild project metadata from
    /// whatever is on disk, then return the refreshed project.
    pub async fn scan_project(&self, project_id: &str) -> Result<Project, ApiError> {
        let response = self
            .client
            .post(format!("{}/api/projects/{}/scan", self.api_url, project_id))
            .send()
            .await?;
        let envelope: ProjectEnvelope = Self::parse_response(response).await?;
        Ok(envelope.project)
    }

    // ---- media ----

    /// `POST /api/projects/{id}/upload` -- multipart upload of the
    /// source video under the `video` form field.
    pub async fn upload_video(
        &self,
        project_id: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadResponse, ApiError> {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new().part("video", part);

        let response = self
            .client
            .post(format!("{}/api/projects/{}/upload", self.api_url, project_id))
            .multipart(form)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// `POST /api/projects/{id}/convert` -- convert the uploaded
    /// original into the moshable AVI container.
    pub async fn convert_video(&self, project_id: &str) -> Result<ConvertResponse, ApiError> {
        let response = self
            .client
            .post(format!("{}/api/projects/{}/convert", self.api_url, project_id))
            .send()
            .await?;
        Self::parse_response(response).await
    }

    // ---- timeline / scenes / clips ----

    /// `POST /api/projects/{id}/timeline`
    pub async fn generate_timeline(
        &self,
        project_id: &str,
        request: &TimelineRequest,
    ) -> Result<TimelineResponse, ApiError> {
        let response = self
            .client
            .post(format!("{}/api/projects/{}/timeline", self.api_url, project_id))
            .json(request)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// `POST /api/projects/{id}/scenes`
    pub async fn detect_scenes(
        &self,
        project_id: &str,
        request: &DetectScenesRequest,
    ) -> Result<Vec<Scene>, ApiError> {
        let response = self
            .client
            .post(format!("{}/api/projects/{}/scenes", self.api_url, project_id))
            .json(request)
            .send()
            .await?;
        let scenes: ScenesResponse = Self::parse_response(response).await?;
        Ok(scenes.scenes)
    }

    /// `POST /api/projects/{id}/clip`
    pub async fn create_clip(
        &self,
        project_id: &str,
        request: &CreateClipRequest,
    ) -> Result<CreateClipResponse, ApiError> {
        let response = self
            .client
            .post(format!("{}/api/projects/{}/clip", self.api_url, project_id))
            .json(request)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// `DELETE /api/projects/{id}/clips/{clipId}`
    pub async fn delete_clip(
        &self,
        project_id: &str,
        clip_id: &str,
    ) -> Result<DeleteClipResponse, ApiError> {
        let response = self
            .client
            .delete(format!(
                "{}/api/projects/{}/clips/{}",
                self.api_url, project_id, clip_id
            ))
            .send()
            .await?;
        Self::parse_response(response).await
    }

    // ---- moshing ----

    /// `POST /api/projects/{id}/mosh` -- submit a single or batch mosh.
    /// Returns the minted job ids plus the session they belong to.
    pub async fn generate_mosh(
        &self,
        project_id: &str,
        request: &MoshRequest,
    ) -> Result<MoshResponse, ApiError> {
        let response = self
            .client
            .post(format!("{}/api/projects/{}/mosh", self.api_url, project_id))
            .json(request)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// `GET /api/projects/{id}/moshes` -- the authoritative job
    /// listing, with per-job parameters and status. Pulled whenever a
    /// pushed update reports a completion; the push payload alone is
    /// never trusted for artifact contents.
    pub async fn list_moshes(&self, project_id: &str) -> Result<Vec<MoshJob>, ApiError> {
        let response = self
            .client
            .get(format!("{}/api/projects/{}/moshes", self.api_url, project_id))
            .send()
            .await?;
        let list: MoshListResponse = Self::parse_response(response).await?;
        Ok(list.moshes)
    }

    /// `POST /api/projects/{id}/convert-mosh/{filename}` -- convert a
    /// finished artifact to a playable format. Progress for the
    /// returned `conversion_id` arrives over the push channel.
    pub async fn convert_mosh(
        &self,
        project_id: &str,
        filename: &str,
        format: ConvertFormat,
    ) -> Result<ConvertMoshResponse, ApiError> {
        let response = self
            .client
            .post(format!(
                "{}/api/projects/{}/convert-mosh/{}",
                self.api_url, project_id, filename
            ))
            .json(&ConvertMoshRequest { format })
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// `GET /api/projects/{id}/converted-files/{sessionId}/{moshId}`
    pub async fn converted_files(
        &self,
        project_id: &str,
        session_id: &str,
        mosh_id: &str,
    ) -> Result<ConvertedFilesResponse, ApiError> {
        let response = self
            .client
            .get(format!(
                "{}/api/projects/{}/converted-files/{}/{}",
                self.api_url, project_id, session_id, mosh_id
            ))
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// `DELETE /api/projects/{id}/sessions/{sessionId}/mosh/{moshId}`
    pub async fn delete_mosh(
        &self,
        project_id: &str,
        session_id: &str,
        mosh_id: &str,
    ) -> Result<DeleteMoshResponse, ApiError> {
        let response = self
            .client
            .delete(format!(
                "{}/api/projects/{}/sessions/{}/mosh/{}",
                self.api_url, project_id, session_id, mosh_id
            ))
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// `DELETE /api/projects/{id}/sessions/{sessionId}`
    pub async fn delete_session(
        &self,
        project_id: &str,
        session_id: &str,
    ) -> Result<DeleteSessionResponse, ApiError> {
        let response = self
            .client
            .delete(format!(
                "{}/api/projects/{}/sessions/{}",
                self.api_url, project_id, session_id
            ))
            .send()
            .await?;
        Self::parse_response(response).await
    }

    // ---- maintenance ----

    /// `POST /api/migrate` -- fold pre-project uploads into projects.
    pub async fn migrate_legacy(&self) -> Result<MigrateResponse, ApiError> {
        let response = self
            .client
            .post(format!("{}/api/migrate", self.api_url))
            .send()
            .await?;
        Self::parse_response(response).await
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or an [`ApiError::Api`] carrying
    /// the status and body text on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ApiError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}
