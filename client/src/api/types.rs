//! Request and response payloads of the Schematics API
//!
//! Response fields are all optional: the service omits fields freely and a
//! missing field must never fail decoding.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==================== Requests ====================

/// Create workspace request
#[derive(Debug, Clone, Default, Serialize)]
pub struct WorkspaceCreateRequest {
    pub name: String,
    pub description: String,
    pub location: String,
    pub resource_group: String,
    pub tags: Vec<String>,
    #[serde(rename = "type")]
    pub template_types: Vec<String>,
    pub template_data: Vec<TemplateSourceDataRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_repo: Option<TemplateRepoRequest>,
}

/// Template settings of a create request
#[derive(Debug, Clone, Default, Serialize)]
pub struct TemplateSourceDataRequest {
    pub folder: String,
    #[serde(rename = "type")]
    pub template_type: String,
    pub variablestore: Vec<WorkspaceVariableRequest>,
}

/// One variable of a create request
#[derive(Debug, Clone, Default, Serialize)]
pub struct WorkspaceVariableRequest {
    pub name: String,
    pub value: String,
    #[serde(rename = "type")]
    pub var_type: String,
    pub description: String,
    pub secure: bool,
    pub use_default: bool,
}

/// Git repository of a create request
#[derive(Debug, Clone, Default, Serialize)]
pub struct TemplateRepoRequest {
    pub url: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub branch: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub release: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub repo_sha_value: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub repo_url: String,
}

// ==================== Responses ====================

/// Workspace as returned by create, get and list
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WorkspaceResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub resource_group: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default, rename = "type")]
    pub template_types: Option<Vec<String>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub template_repo: Option<TemplateRepoResponse>,
    #[serde(default)]
    pub template_data: Option<Vec<TemplateSourceDataResponse>>,
}

/// Git repository as normalized by the service
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TemplateRepoResponse {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub repo_url: Option<String>,
    #[serde(default)]
    pub full_url: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub release: Option<String>,
    #[serde(default)]
    pub repo_sha_value: Option<String>,
}

/// Template settings as stored by the service
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TemplateSourceDataResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub folder: Option<String>,
    #[serde(default, rename = "type")]
    pub template_type: Option<String>,
    #[serde(default)]
    pub variablestore: Option<Vec<WorkspaceVariableResponse>>,
}

/// One variable as stored by the service
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WorkspaceVariableResponse {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default, rename = "type")]
    pub var_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub secure: Option<bool>,
    #[serde(default)]
    pub use_default: Option<bool>,
}

/// Paginated list of workspaces
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WorkspaceListResponse {
    #[serde(default)]
    pub offset: Option<u64>,
    #[serde(default)]
    pub limit: Option<u64>,
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub workspaces: Option<Vec<WorkspaceResponse>>,
}

/// Activities of one workspace, oldest first
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WorkspaceActivities {
    #[serde(default)]
    pub workspace_id: Option<String>,
    #[serde(default)]
    pub workspace_name: Option<String>,
    #[serde(default)]
    pub actions: Option<Vec<WorkspaceActivity>>,
}

/// One activity record
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WorkspaceActivity {
    #[serde(default)]
    pub action_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub performed_by: Option<String>,
    #[serde(default)]
    pub performed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub templates: Option<Vec<WorkspaceActivityTemplate>>,
}

/// Per-template execution of an activity
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WorkspaceActivityTemplate {
    #[serde(default)]
    pub template_id: Option<String>,
    #[serde(default)]
    pub template_type: Option<String>,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Response to a plan, apply or destroy trigger
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WorkspaceActivityTriggerResult {
    #[serde(default)]
    pub activityid: Option<String>,
}

/// Response to a code upload
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TemplateRepoTarUploadResponse {
    #[serde(default)]
    pub file_value: Option<String>,
    #[serde(default)]
    pub has_received_file: Option<bool>,
    #[serde(default)]
    pub id: Option<String>,
}

/// Outputs of one template
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OutputValuesItem {
    #[serde(default)]
    pub folder: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub output_values: Option<Vec<HashMap<String, serde_json::Value>>>,
    #[serde(default)]
    pub value_type: Option<String>,
}

/// Build and component versions of the service
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct VersionResponse {
    #[serde(default)]
    pub builddate: Option<String>,
    #[serde(default)]
    pub buildno: Option<String>,
    #[serde(default)]
    pub commitsha: Option<String>,
    #[serde(default)]
    pub supported_template_types: Option<Vec<HashMap<String, serde_json::Value>>>,
}
