//! Workspace domain model

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::status::WorkspaceStatus;
use crate::error::{Error, Result};

/// File name inline code is stored under
pub const MAIN_CODE_FILE: &str = "main.tf";

/// Template type new workspaces use unless told otherwise
pub const DEFAULT_TEMPLATE_TYPE: &str = "terraform_v0.13";

/// Variable type assumed when none is given
const DEFAULT_VARIABLE_TYPE: &str = "string";

/// Input variable of a workspace template
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub value: String,
    #[serde(rename = "type")]
    pub var_type: String,
    pub description: String,
    /// Value is sensitive and never logged
    pub secure: bool,
    /// Let the template use its own default value
    pub use_default: bool,
}

impl Variable {
    /// Create a plain string variable
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            var_type: DEFAULT_VARIABLE_TYPE.to_string(),
            description: String::new(),
            secure: false,
            use_default: false,
        }
    }
}

impl fmt::Debug for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = if self.secure { "***" } else { self.value.as_str() };
        f.debug_struct("Variable")
            .field("name", &self.name)
            .field("value", &value)
            .field("var_type", &self.var_type)
            .field("description", &self.description)
            .field("secure", &self.secure)
            .field("use_default", &self.use_default)
            .finish()
    }
}

/// Git repository holding the template code
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitRepo {
    /// URL as given by the user
    pub url: String,
    /// Canonical repository URL computed by the service
    pub repo_url: String,
    pub branch: String,
    pub release: String,
    /// Resolved commit SHA
    pub repo_sha_value: String,
    /// Access token for private repositories
    #[serde(skip_serializing)]
    pub token: Option<String>,
}

impl GitRepo {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

impl fmt::Debug for GitRepo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitRepo")
            .field("url", &self.url)
            .field("repo_url", &self.repo_url)
            .field("branch", &self.branch)
            .field("release", &self.release)
            .field("repo_sha_value", &self.repo_sha_value)
            .field("token", &self.token.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Remote execution environment for infrastructure code
///
/// Values set before `create` are a wish list: once the service accepts the
/// workspace its canonical values replace them.
#[derive(Debug, Clone)]
pub struct Workspace {
    /// Remote ID, empty until created
    id: String,

    pub name: String,

    pub description: String,

    pub location: String,

    pub resource_group: String,

    pub tags: Vec<String>,

    /// Folder of the template inside the code or repository
    pub folder: String,

    /// Template kind, e.g. `terraform_v0.13`
    pub template_type: String,

    /// Remote template ID, known once created
    pub template_id: Option<String>,

    /// Repository to take the code from instead of inline files
    pub git_repo: Option<GitRepo>,

    /// Creation timestamp
    pub created_at: Option<DateTime<Utc>>,

    /// Creator identity, used to recognize our own activities
    pub created_by: String,

    /// Values produced by the last successful apply
    pub output: HashMap<String, serde_json::Value>,

    status: WorkspaceStatus,

    /// Last status with a place in the lifecycle. Lateral statuses such as
    /// FAILED never lower it.
    progress: WorkspaceStatus,

    variables: Vec<Variable>,

    files: BTreeMap<String, Vec<u8>>,
}

impl Workspace {
    /// Create a new local workspace. An empty name gets a date-based default.
    pub fn new(name: &str, description: &str) -> Self {
        let name = if name.is_empty() {
            default_name()
        } else {
            name.to_string()
        };

        Self {
            id: String::new(),
            name,
            description: description.to_string(),
            location: String::new(),
            resource_group: String::new(),
            tags: Vec::new(),
            folder: String::new(),
            template_type: DEFAULT_TEMPLATE_TYPE.to_string(),
            template_id: None,
            git_repo: None,
            created_at: None,
            created_by: String::new(),
            output: HashMap::new(),
            status: WorkspaceStatus::New,
            progress: WorkspaceStatus::New,
            variables: Vec::new(),
            files: BTreeMap::new(),
        }
    }

    /// Add a variable. Fails if the name is empty or already used.
    pub fn add_var(
        &mut self,
        name: &str,
        value: &str,
        var_type: &str,
        description: &str,
        secure: bool,
    ) -> Result<()> {
        let mut variable = Variable::new(name, value);
        if !var_type.is_empty() {
            variable.var_type = var_type.to_string();
        }
        variable.description = description.to_string();
        variable.secure = secure;

        self.add_variable(variable)
    }

    /// Add a fully built variable, with the same checks as [`Workspace::add_var`]
    pub fn add_variable(&mut self, mut variable: Variable) -> Result<()> {
        if variable.name.is_empty() {
            return Err(Error::EmptyVariableName);
        }
        if self.variables.iter().any(|v| v.name == variable.name) {
            return Err(Error::DuplicateVariable(variable.name));
        }
        if variable.var_type.is_empty() {
            variable.var_type = DEFAULT_VARIABLE_TYPE.to_string();
        }

        self.variables.push(variable);
        Ok(())
    }

    /// Variables in insertion order
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Set the code repository, keeping any other repository settings
    pub fn add_repo(&mut self, url: &str) {
        match &mut self.git_repo {
            Some(repo) => repo.url = url.to_string(),
            None => self.git_repo = Some(GitRepo::new(url)),
        }
    }

    /// Set the inline code of the main template file
    pub fn set_code(&mut self, code: impl Into<Vec<u8>>) {
        self.files.insert(MAIN_CODE_FILE.to_string(), code.into());
    }

    /// Add another inline file next to the main code
    pub fn add_file(&mut self, name: &str, content: impl Into<Vec<u8>>) {
        self.files.insert(name.to_string(), content.into());
    }

    /// Inline code of the main template file
    pub fn code(&self) -> Option<&[u8]> {
        self.files.get(MAIN_CODE_FILE).map(Vec::as_slice)
    }

    /// Every inline file, by name
    pub fn files(&self) -> &BTreeMap<String, Vec<u8>> {
        &self.files
    }

    pub fn has_code(&self) -> bool {
        !self.files.is_empty()
    }

    /// Remote ID, empty until the service accepted the workspace
    pub fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn set_id(&mut self, id: String) {
        self.id = id;
    }

    /// Check if the remote workspace exists
    pub fn is_created(&self) -> bool {
        !self.id.is_empty()
    }

    pub fn status(&self) -> &WorkspaceStatus {
        &self.status
    }

    /// Move to a new status if the lifecycle allows it
    pub fn transition_to(&mut self, next: WorkspaceStatus) -> bool {
        if !self.status.can_transition_to(&next) || !self.progress.can_transition_to(&next) {
            warn!(
                "Ignoring status change of workspace {} from {} to {}",
                self.id, self.status, next
            );
            return false;
        }

        self.adopt_status(next);
        true
    }

    fn adopt_status(&mut self, status: WorkspaceStatus) {
        if status.rank().is_some() {
            self.progress = status.clone();
        }
        self.status = status;
    }

    /// Requested output values. Keys without a value are left out.
    pub fn get_param(&self, keys: &[&str]) -> HashMap<String, serde_json::Value> {
        keys.iter()
            .filter_map(|key| {
                self.output
                    .get(*key)
                    .map(|value| (key.to_string(), value.clone()))
            })
            .collect()
    }

    /// Replace local values with the canonical values of the service
    pub(crate) fn replace_variables(&mut self, variables: Vec<Variable>) {
        self.variables = variables;
    }

    /// Adopt a status reported right after creation
    pub(crate) fn set_created_status(&mut self, status: WorkspaceStatus) {
        if self.status == WorkspaceStatus::New {
            self.adopt_status(status);
        } else {
            self.transition_to(status);
        }
    }
}

/// Default workspace name for the current date
pub fn default_name() -> String {
    format!("workspace_{}", Utc::now().format("%m_%d_%Y"))
}
