//! Typed calls to the Schematics REST API
//!
//! Every call checks the expected status code and turns anything else into
//! [`Error::Api`] with the raw body attached.

pub mod types;

use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::config::Timeouts;
use crate::error::{Error, Result};
use crate::infra::transport::{ApiRequest, ApiResponse, Method, Transport};

use self::types::*;

/// Header carrying the access token of a private template repository
const GITHUB_TOKEN_HEADER: &str = "X-Github-token";

/// Workspace action that runs asynchronously on the service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspaceAction {
    Plan,
    Apply,
    Destroy,
}

impl WorkspaceAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkspaceAction::Plan => "plan",
            WorkspaceAction::Apply => "apply",
            WorkspaceAction::Destroy => "destroy",
        }
    }

    fn operation(&self) -> &'static str {
        match self {
            WorkspaceAction::Plan => "plan the workspace",
            WorkspaceAction::Apply => "apply the workspace",
            WorkspaceAction::Destroy => "destroy the workspace resources",
        }
    }
}

/// Schematics API bound to one transport
#[derive(Clone)]
pub struct SchematicsApi {
    transport: Arc<dyn Transport>,
    timeouts: Timeouts,
}

impl SchematicsApi {
    pub fn new(transport: Arc<dyn Transport>, timeouts: Timeouts) -> Self {
        Self {
            transport,
            timeouts,
        }
    }

    pub fn timeouts(&self) -> &Timeouts {
        &self.timeouts
    }

    /// `POST /workspaces`, expects 201
    pub async fn create_workspace(
        &self,
        request: &WorkspaceCreateRequest,
        github_token: Option<&str>,
    ) -> Result<WorkspaceResponse> {
        let mut call = ApiRequest::new(Method::Post, "/workspaces", "create the workspace")
            .json(serde_json::to_value(request)?)
            .timeout(self.timeouts.create);
        if let Some(token) = github_token.filter(|t| !t.is_empty()) {
            call = call.header(GITHUB_TOKEN_HEADER, token);
        }

        let response = self.send(call, &[201]).await?;
        response.json()
    }

    /// `GET /workspaces/{id}`
    pub async fn get_workspace(&self, workspace_id: &str) -> Result<WorkspaceResponse> {
        self.get(
            format!("/workspaces/{}", workspace_id),
            "get the workspace",
            self.timeouts.action,
        )
        .await
    }

    /// `GET /workspaces`
    pub async fn list_workspaces(&self) -> Result<WorkspaceListResponse> {
        self.get("/workspaces", "list the workspaces", self.timeouts.list)
            .await
    }

    /// `DELETE /workspaces/{id}`, expects 200
    pub async fn delete_workspace(&self, workspace_id: &str, destroy_resources: bool) -> Result<()> {
        let call = ApiRequest::new(
            Method::Delete,
            format!("/workspaces/{}", workspace_id),
            "delete the workspace",
        )
        .query("destroy_resources", destroy_resources.to_string())
        .refresh_token()
        .timeout(self.timeouts.delete);

        self.send(call, &[200]).await?;
        Ok(())
    }

    /// `GET /workspaces/{id}/actions`
    pub async fn list_activities(&self, workspace_id: &str) -> Result<WorkspaceActivities> {
        self.get(
            format!("/workspaces/{}/actions", workspace_id),
            "list the workspace activities",
            self.timeouts.list,
        )
        .await
    }

    /// `GET /workspaces/{id}/actions/{activity_id}`
    pub async fn get_activity(
        &self,
        workspace_id: &str,
        activity_id: &str,
    ) -> Result<WorkspaceActivity> {
        self.get(
            format!("/workspaces/{}/actions/{}", workspace_id, activity_id),
            "get the workspace activity",
            self.timeouts.refresh,
        )
        .await
    }

    /// `PUT /workspaces/{id}/{plan|apply|destroy}`, expects 202 or 200
    pub async fn trigger_action(
        &self,
        workspace_id: &str,
        action: WorkspaceAction,
    ) -> Result<WorkspaceActivityTriggerResult> {
        let call = ApiRequest::new(
            Method::Put,
            format!("/workspaces/{}/{}", workspace_id, action.as_str()),
            action.operation(),
        )
        .refresh_token()
        .timeout(self.timeouts.action);

        let response = self.send(call, &[202, 200]).await?;
        if response.body.is_empty() {
            return Ok(WorkspaceActivityTriggerResult::default());
        }
        response.json()
    }

    /// `PUT /workspaces/{id}/template_data/{template_id}/template_repo_upload`
    pub async fn upload_template_tar(
        &self,
        workspace_id: &str,
        template_id: &str,
        file_name: &str,
        archive: Vec<u8>,
    ) -> Result<TemplateRepoTarUploadResponse> {
        let call = ApiRequest::new(
            Method::Put,
            format!(
                "/workspaces/{}/template_data/{}/template_repo_upload",
                workspace_id, template_id
            ),
            "upload the code",
        )
        .file("file", file_name, archive)
        .timeout(self.timeouts.upload);

        let response = self.send(call, &[200]).await?;
        response.json()
    }

    /// `GET /workspaces/{id}/output_values`
    pub async fn output_values(&self, workspace_id: &str) -> Result<Vec<OutputValuesItem>> {
        self.get(
            format!("/workspaces/{}/output_values", workspace_id),
            "get the workspace outputs",
            self.timeouts.action,
        )
        .await
    }

    /// `GET /version`
    pub async fn version(&self) -> Result<VersionResponse> {
        self.get("/version", "get the version", self.timeouts.list)
            .await
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: impl Into<String>,
        operation: &'static str,
        timeout: std::time::Duration,
    ) -> Result<T> {
        let call = ApiRequest::new(Method::Get, path, operation).timeout(timeout);
        let response = self.send(call, &[200]).await?;
        response.json()
    }

    async fn send(&self, call: ApiRequest, expected: &[u16]) -> Result<ApiResponse> {
        let operation = call.operation;
        let response = self.transport.send(call).await?;

        if !expected.contains(&response.status) {
            return Err(Error::api(operation, response.status, &response.body));
        }
        Ok(response)
    }
}
