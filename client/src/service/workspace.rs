//! Workspace service - drives a workspace through its remote lifecycle

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::api::types::{
    TemplateRepoRequest, TemplateSourceDataRequest, WorkspaceCreateRequest, WorkspaceResponse,
    WorkspaceVariableRequest,
};
use crate::api::{SchematicsApi, WorkspaceAction};
use crate::domain::activity::Activity;
use crate::domain::status::{ActivityKind, WorkspaceStatus};
use crate::domain::workspace::{GitRepo, Variable, Workspace};
use crate::error::{Error, Result};
use crate::infra::archive::Packager;
use crate::service::activity::ActivityService;

/// Workspace service for managing the workspace lifecycle
#[derive(Clone)]
pub struct WorkspaceService {
    api: SchematicsApi,
    activities: ActivityService,
    packager: Arc<dyn Packager>,
}

impl WorkspaceService {
    /// Create a new workspace service
    pub fn new(api: SchematicsApi, activities: ActivityService, packager: Arc<dyn Packager>) -> Self {
        Self {
            api,
            activities,
            packager,
        }
    }

    pub fn activities(&self) -> &ActivityService {
        &self.activities
    }

    /// Create the remote workspace and return its creation activity.
    ///
    /// On success the values of the service replace the local ones. On
    /// failure the workspace is left untouched.
    pub async fn create(&self, workspace: &mut Workspace) -> Result<Option<Activity>> {
        ensure_not_deleted(workspace)?;
        if workspace.is_created() {
            return Err(Error::InvalidState {
                expected: WorkspaceStatus::New.to_string(),
                actual: workspace.status().to_string(),
            });
        }

        info!("Creating workspace {}", workspace.name);

        let request = create_request(workspace);
        let github_token = workspace.git_repo.as_ref().and_then(|r| r.token.as_deref());
        let response = self.api.create_workspace(&request, github_token).await?;

        adopt_created(workspace, response)?;
        workspace.output.clear();

        info!(
            "Created workspace {} ({}) with status {}",
            workspace.id(),
            workspace.name,
            workspace.status()
        );

        self.activities
            .last_activity(
                workspace.id(),
                &workspace.created_by,
                &ActivityKind::WorkspaceCreate,
            )
            .await
    }

    /// Package the inline code and upload it to the workspace template
    pub async fn upload(&self, workspace: &mut Workspace) -> Result<()> {
        ensure_created(workspace)?;

        let template_id = workspace
            .template_id
            .clone()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Error::MissingTemplate(workspace.id().to_string()))?;

        let archive = self.packager.pack(workspace.files())?;
        let file_name = format!("{}.tar", workspace.name);

        info!(
            "Uploading {} files ({} bytes) to workspace {}",
            workspace.files().len(),
            archive.len(),
            workspace.id()
        );

        let response = self
            .api
            .upload_template_tar(workspace.id(), &template_id, &file_name, archive)
            .await?;

        if !response.has_received_file.unwrap_or(false) {
            return Err(Error::Api {
                operation: "upload the code".to_string(),
                status: 200,
                message: Some("the service did not receive the file".to_string()),
                body: serde_json::to_string(&response)?,
            });
        }

        Ok(())
    }

    /// Trigger a plan and return its activity
    pub async fn plan(&self, workspace: &mut Workspace) -> Result<Option<Activity>> {
        ensure_created(workspace)?;
        workspace.output.clear();

        let activity = self
            .trigger(workspace, WorkspaceAction::Plan, ActivityKind::Plan)
            .await?;
        workspace.transition_to(WorkspaceStatus::Planning);
        Ok(activity)
    }

    /// Trigger an apply and return its activity
    pub async fn apply(&self, workspace: &mut Workspace) -> Result<Option<Activity>> {
        ensure_created(workspace)?;
        workspace.output.clear();

        let activity = self
            .trigger(workspace, WorkspaceAction::Apply, ActivityKind::Apply)
            .await?;
        workspace.transition_to(WorkspaceStatus::Applying);
        Ok(activity)
    }

    /// Trigger the destruction of the workspace resources and return its activity
    pub async fn destroy(&self, workspace: &mut Workspace) -> Result<Option<Activity>> {
        ensure_created(workspace)?;

        self.trigger(workspace, WorkspaceAction::Destroy, ActivityKind::Destroy)
            .await
    }

    /// Create, upload, plan and apply, waiting for every step to finish.
    /// Stops at the first error.
    pub async fn run(&self, workspace: &mut Workspace) -> Result<()> {
        let mut created = self.create(workspace).await?;
        self.activities.wait(created.as_mut()).await?;

        if workspace.has_code() {
            self.upload(workspace).await?;
        } else {
            debug!(
                "Workspace {} has no inline code, skipping upload",
                workspace.id()
            );
        }

        let mut planned = self.plan(workspace).await?;
        self.activities.wait(planned.as_mut()).await?;
        workspace.transition_to(WorkspaceStatus::Planned);

        let mut applied = self.apply(workspace).await?;
        self.activities.wait(applied.as_mut()).await?;
        workspace.transition_to(WorkspaceStatus::Active);

        self.refresh_output(workspace).await?;

        info!(
            "Workspace {} is {} with {} outputs",
            workspace.id(),
            workspace.status(),
            workspace.output.len()
        );
        Ok(())
    }

    /// Delete the remote workspace. With `destroy` the resources are
    /// destroyed first and the deletion waits for that to finish.
    pub async fn delete(&self, workspace: &mut Workspace, destroy: bool) -> Result<()> {
        ensure_created(workspace)?;

        if destroy {
            match self.destroy(workspace).await? {
                Some(mut activity) => {
                    self.activities.wait(Some(&mut activity)).await?;
                    workspace.transition_to(WorkspaceStatus::Destroyed);
                    info!("Destroyed the resources of workspace {}", workspace.id());
                }
                None => warn!(
                    "No destroy activity found for workspace {}, the service destroys the resources on delete",
                    workspace.id()
                ),
            }
        }

        // destroy_resources also covers a destroy activity that never showed up
        self.api.delete_workspace(workspace.id(), destroy).await?;
        workspace.transition_to(WorkspaceStatus::Deleted);

        info!("Deleted workspace {}", workspace.id());
        Ok(())
    }

    /// Re-read the workspace status from the service
    pub async fn refresh(&self, workspace: &mut Workspace) -> Result<()> {
        ensure_created(workspace)?;

        let response = self.api.get_workspace(workspace.id()).await?;
        if let Some(status) = response.status.as_deref() {
            workspace.transition_to(WorkspaceStatus::parse(status));
        }
        if workspace.template_id.is_none() {
            workspace.template_id = first_template_id(&response);
        }

        Ok(())
    }

    /// Load the output values of the last apply into `workspace.output`
    pub async fn refresh_output(&self, workspace: &mut Workspace) -> Result<()> {
        ensure_created(workspace)?;

        let items = self.api.output_values(workspace.id()).await?;

        workspace.output.clear();
        for values in items.into_iter().filter_map(|item| item.output_values) {
            for entry in values {
                for (name, output) in entry {
                    let value = match output {
                        serde_json::Value::Object(mut fields) => fields
                            .remove("value")
                            .unwrap_or(serde_json::Value::Null),
                        other => other,
                    };
                    workspace.output.insert(name, value);
                }
            }
        }

        debug!(
            "Workspace {} has outputs {:?}",
            workspace.id(),
            workspace.output.keys().collect::<Vec<_>>()
        );
        Ok(())
    }

    /// The most recent `kind` activity performed by the workspace creator
    pub async fn last_activity(
        &self,
        workspace: &Workspace,
        kind: &ActivityKind,
    ) -> Result<Option<Activity>> {
        ensure_created(workspace)?;

        self.activities
            .last_activity(workspace.id(), &workspace.created_by, kind)
            .await
    }

    async fn trigger(
        &self,
        workspace: &Workspace,
        action: WorkspaceAction,
        kind: ActivityKind,
    ) -> Result<Option<Activity>> {
        info!("Triggering {} on workspace {}", action.as_str(), workspace.id());

        let result = self.api.trigger_action(workspace.id(), action).await?;

        match result.activityid.filter(|id| !id.is_empty()) {
            Some(activity_id) => self
                .activities
                .get(workspace.id(), &activity_id)
                .await
                .map(Some),
            None => {
                self.activities
                    .last_activity(workspace.id(), &workspace.created_by, &kind)
                    .await
            }
        }
    }
}

fn ensure_not_deleted(workspace: &Workspace) -> Result<()> {
    if *workspace.status() == WorkspaceStatus::Deleted {
        return Err(Error::InvalidState {
            expected: "an existing workspace".to_string(),
            actual: WorkspaceStatus::Deleted.to_string(),
        });
    }
    Ok(())
}

fn ensure_created(workspace: &Workspace) -> Result<()> {
    ensure_not_deleted(workspace)?;
    if !workspace.is_created() {
        return Err(Error::NotCreated(workspace.name.clone()));
    }
    Ok(())
}

fn create_request(workspace: &Workspace) -> WorkspaceCreateRequest {
    let variablestore = workspace
        .variables()
        .iter()
        .map(|v| WorkspaceVariableRequest {
            name: v.name.clone(),
            value: v.value.clone(),
            var_type: v.var_type.clone(),
            description: v.description.clone(),
            secure: v.secure,
            use_default: v.use_default,
        })
        .collect();

    let template_repo = workspace.git_repo.as_ref().map(|repo| TemplateRepoRequest {
        url: repo.url.clone(),
        branch: repo.branch.clone(),
        release: repo.release.clone(),
        repo_sha_value: repo.repo_sha_value.clone(),
        repo_url: repo.repo_url.clone(),
    });

    WorkspaceCreateRequest {
        name: workspace.name.clone(),
        description: workspace.description.clone(),
        location: workspace.location.clone(),
        resource_group: workspace.resource_group.clone(),
        tags: workspace.tags.clone(),
        template_types: vec![workspace.template_type.clone()],
        template_data: vec![TemplateSourceDataRequest {
            folder: workspace.folder.clone(),
            template_type: workspace.template_type.clone(),
            variablestore,
        }],
        template_repo,
    }
}

fn first_template_id(response: &WorkspaceResponse) -> Option<String> {
    response
        .template_data
        .as_ref()
        .and_then(|data| data.first())
        .and_then(|template| template.id.clone())
        .filter(|id| !id.is_empty())
}

/// Replace the local values with the canonical ones of a create response
fn adopt_created(workspace: &mut Workspace, response: WorkspaceResponse) -> Result<()> {
    let id = response
        .id
        .clone()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| Error::Decode("create response carries no workspace ID".to_string()))?;

    workspace.template_id = first_template_id(&response);
    workspace.set_id(id);
    workspace.name = response.name.unwrap_or_default();
    workspace.description = response.description.unwrap_or_default();
    workspace.location = response.location.unwrap_or_default();
    workspace.resource_group = response.resource_group.unwrap_or_default();
    workspace.created_by = response.created_by.unwrap_or_default();
    if response.created_at.is_some() {
        workspace.created_at = response.created_at;
    }
    if let Some(tags) = response.tags {
        workspace.tags = tags;
    }
    if let Some(template_type) = response.template_types.and_then(|t| t.into_iter().next()) {
        workspace.template_type = template_type;
    }
    if let Some(status) = response.status.as_deref() {
        workspace.set_created_status(WorkspaceStatus::parse(status));
    }

    if let Some(repo) = response.template_repo {
        let token = workspace.git_repo.as_ref().and_then(|r| r.token.clone());
        workspace.git_repo = Some(GitRepo {
            url: repo.url.unwrap_or_default(),
            repo_url: repo.repo_url.unwrap_or_default(),
            branch: repo.branch.unwrap_or_default(),
            release: repo.release.unwrap_or_default(),
            repo_sha_value: repo.repo_sha_value.unwrap_or_default(),
            token,
        });
    }

    if let Some(template) = response.template_data.and_then(|t| t.into_iter().next()) {
        workspace.folder = template.folder.unwrap_or_default();
        if let Some(template_type) = template.template_type.filter(|t| !t.is_empty()) {
            workspace.template_type = template_type;
        }

        let variables = template
            .variablestore
            .unwrap_or_default()
            .into_iter()
            .map(|v| Variable {
                name: v.name.unwrap_or_default(),
                value: v.value.unwrap_or_default(),
                var_type: v.var_type.unwrap_or_default(),
                description: v.description.unwrap_or_default(),
                secure: v.secure.unwrap_or(false),
                use_default: v.use_default.unwrap_or(false),
            })
            .collect();
        workspace.replace_variables(variables);
    }

    Ok(())
}
