//! Read-only views returned by the listing and version readers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::status::WorkspaceStatus;

/// Version of the remote API this client speaks
pub const API_VERSION: &str = "1.0";

/// Summary of one existing workspace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceSummary {
    pub id: String,
    pub name: String,
    pub description: String,
    pub location: String,
    /// Creator of the workspace
    pub owner: String,
    pub state: WorkspaceStatus,
    pub created: Option<DateTime<Utc>>,
}

/// Workspaces visible to the account
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceList {
    pub workspaces: Vec<WorkspaceSummary>,
}

/// Service build and the component versions of each supported template
///
/// Every `*_versions` list has one entry per supported template, in the order
/// of `template_names`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportedVersion {
    pub builddate: String,
    pub buildno: String,
    pub commitsha: String,
    pub api_version: String,
    pub terraform_versions: Vec<String>,
    pub ibm_cloud_provider_versions: Vec<String>,
    pub helm_versions: Vec<String>,
    pub helm_provider_versions: Vec<String>,
    pub ansible_versions: Vec<String>,
    pub ansible_provisioner_versions: Vec<String>,
    pub kubernetes_provider_versions: Vec<String>,
    pub oc_client_versions: Vec<String>,
    pub rest_api_provider_versions: Vec<String>,
    pub template_names: Vec<String>,
}

impl SupportedVersion {
    /// Rows of the component table: title and one version per template
    pub fn component_rows(&self) -> [(&'static str, &[String]); 9] {
        [
            ("Terraform", self.terraform_versions.as_slice()),
            ("IBM Cloud Provider", self.ibm_cloud_provider_versions.as_slice()),
            ("Helm", self.helm_versions.as_slice()),
            ("Helm Provider", self.helm_provider_versions.as_slice()),
            ("Ansible", self.ansible_versions.as_slice()),
            ("Ansible Provisioner", self.ansible_provisioner_versions.as_slice()),
            ("Kubernetes Provider", self.kubernetes_provider_versions.as_slice()),
            ("OC Client", self.oc_client_versions.as_slice()),
            ("Rest API Provider", self.rest_api_provider_versions.as_slice()),
        ]
    }
}
