//! Client composition

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::api::SchematicsApi;
use crate::config::Config;
use crate::domain::activity::Activity;
use crate::domain::types::{SupportedVersion, WorkspaceList};
use crate::domain::workspace::Workspace;
use crate::error::Result;
use crate::infra::archive::TarPackager;
use crate::infra::auth::IamAuthenticator;
use crate::infra::transport::{HttpTransport, Transport};
use crate::service::{ActivityService, CatalogService, WaitPolicy, WorkspaceService};

/// Entry point to the Schematics service
///
/// Cheap to clone. Workspaces driven through the same client share its
/// transport and token cache but nothing else.
#[derive(Clone)]
pub struct Client {
    config: Arc<Config>,
    workspaces: WorkspaceService,
    catalog: CatalogService,
}

impl Client {
    /// Build a client talking to the configured endpoint with IAM authentication
    pub fn new(config: Config) -> Result<Self> {
        let connect_timeout = Duration::from_secs(config.http_timeout);

        let tokens = IamAuthenticator::new(
            &config.iam_endpoint,
            config.require_api_key()?,
            connect_timeout,
        )?;
        let transport = HttpTransport::new(
            &config.api_base_url(),
            &config.user_agent,
            connect_timeout,
            Arc::new(tokens),
        )?;

        info!("Schematics client ready for {}", config.api_base_url());
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Build a client on top of an existing transport
    pub fn with_transport(config: Config, transport: Arc<dyn Transport>) -> Self {
        let api = SchematicsApi::new(transport, config.timeouts());
        let activities = ActivityService::new(api.clone(), WaitPolicy::from_config(&config));
        let workspaces = WorkspaceService::new(api.clone(), activities, Arc::new(TarPackager));

        Self {
            config: Arc::new(config),
            workspaces,
            catalog: CatalogService::new(api),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn workspaces(&self) -> &WorkspaceService {
        &self.workspaces
    }

    pub fn activities(&self) -> &ActivityService {
        self.workspaces.activities()
    }

    /// New local workspace using the configured template type
    pub fn workspace(&self, name: &str, description: &str) -> Workspace {
        let mut workspace = Workspace::new(name, description);
        workspace.template_type = self.config.template_type.clone();
        workspace
    }

    /// Workspaces of the account
    pub async fn list(&self) -> Result<WorkspaceList> {
        self.catalog.list().await
    }

    /// Service build and supported component versions
    pub async fn version(&self) -> Result<SupportedVersion> {
        self.catalog.version().await
    }

    /// See [`WorkspaceService::run`]
    pub async fn run(&self, workspace: &mut Workspace) -> Result<()> {
        self.workspaces.run(workspace).await
    }

    /// See [`WorkspaceService::delete`]
    pub async fn delete(&self, workspace: &mut Workspace, destroy: bool) -> Result<()> {
        self.workspaces.delete(workspace, destroy).await
    }

    /// See [`ActivityService::wait`]
    pub async fn wait(&self, activity: Option<&mut Activity>) -> Result<()> {
        self.activities().wait(activity).await
    }
}
