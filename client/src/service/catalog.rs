//! Read-only views of the account: workspace list and service versions

use std::collections::HashMap;

use crate::api::types::VersionResponse;
use crate::api::SchematicsApi;
use crate::domain::status::WorkspaceStatus;
use crate::domain::types::{SupportedVersion, WorkspaceList, WorkspaceSummary, API_VERSION};
use crate::error::Result;

/// Catalog service
#[derive(Clone)]
pub struct CatalogService {
    api: SchematicsApi,
}

impl CatalogService {
    pub fn new(api: SchematicsApi) -> Self {
        Self { api }
    }

    /// Workspaces of the account
    pub async fn list(&self) -> Result<WorkspaceList> {
        let response = self.api.list_workspaces().await?;

        let workspaces = response
            .workspaces
            .unwrap_or_default()
            .into_iter()
            .map(|w| WorkspaceSummary {
                id: w.id.unwrap_or_default(),
                name: w.name.unwrap_or_default(),
                description: w.description.unwrap_or_default(),
                location: w.location.unwrap_or_default(),
                owner: w.created_by.unwrap_or_default(),
                state: WorkspaceStatus::parse(w.status.as_deref().unwrap_or_default()),
                created: w.created_at,
            })
            .collect();

        Ok(WorkspaceList { workspaces })
    }

    /// Service build and supported component versions
    pub async fn version(&self) -> Result<SupportedVersion> {
        let response = self.api.version().await?;
        Ok(supported_version(response))
    }
}

fn supported_version(response: VersionResponse) -> SupportedVersion {
    let mut columns: HashMap<String, Vec<String>> = HashMap::new();

    for template in response.supported_template_types.unwrap_or_default() {
        for (component, value) in template {
            let version = match value {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            columns.entry(component).or_default().push(version);
        }
    }

    let mut column = |name: &str| columns.remove(name).unwrap_or_default();

    SupportedVersion {
        builddate: response.builddate.unwrap_or_default(),
        buildno: response.buildno.unwrap_or_default(),
        commitsha: response.commitsha.unwrap_or_default(),
        api_version: API_VERSION.to_string(),
        terraform_versions: column("terraform"),
        ibm_cloud_provider_versions: column("ibm_cloud_provider"),
        helm_versions: column("helm"),
        helm_provider_versions: column("helm_provider"),
        ansible_versions: column("ansible"),
        ansible_provisioner_versions: column("ansible_provisioner"),
        kubernetes_provider_versions: column("kubernetes_provider"),
        oc_client_versions: column("oc_client"),
        rest_api_provider_versions: column("provider_restapi"),
        template_names: column("template_name"),
    }
}
