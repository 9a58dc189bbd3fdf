//! Activity domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::types::WorkspaceActivity;
use crate::domain::status::{ActivityKind, ActivityStatus};

/// One asynchronous action taken against a workspace
///
/// An activity always has a real ID. "No activity" is represented by
/// `Option::<Activity>::None` wherever an activity may be absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    /// Remote action ID
    pub id: String,

    /// Action performed
    pub name: ActivityKind,

    /// Last observed status
    pub status: ActivityStatus,

    /// Start of the underlying template execution
    pub start_time: Option<DateTime<Utc>>,

    /// End of the underlying template execution
    pub end_time: Option<DateTime<Utc>>,

    /// When the action was triggered
    pub performed_at: Option<DateTime<Utc>>,

    /// Who triggered the action
    pub performed_by: String,

    /// Diagnostic message, often a JSON document itself
    pub message: String,

    /// Workspace the activity belongs to
    pub workspace_id: String,
}

impl Activity {
    /// Translate a remote activity record. Returns `None` when the record
    /// carries no action ID.
    pub fn from_wire(workspace_id: &str, record: &WorkspaceActivity) -> Option<Self> {
        let id = record.action_id.as_deref().filter(|id| !id.is_empty())?;

        let mut activity = Self {
            id: id.to_string(),
            name: ActivityKind::default(),
            status: ActivityStatus::default(),
            start_time: None,
            end_time: None,
            performed_at: None,
            performed_by: String::new(),
            message: String::new(),
            workspace_id: workspace_id.to_string(),
        };
        activity.update(record);

        Some(activity)
    }

    /// Overwrite the mutable fields with a fresher record of the same activity
    pub fn update(&mut self, record: &WorkspaceActivity) {
        let template = record.templates.as_ref().and_then(|t| t.first());

        if let Some(id) = record.action_id.as_deref().filter(|id| !id.is_empty()) {
            self.id = id.to_string();
        }
        if let Some(name) = &record.name {
            self.name = ActivityKind::parse(name);
        }
        if let Some(status) = &record.status {
            self.status = ActivityStatus::parse(status);
        }
        if let Some(performed_by) = record.performed_by.as_deref().filter(|p| !p.is_empty()) {
            self.performed_by = performed_by.to_string();
        }
        if record.performed_at.is_some() {
            self.performed_at = record.performed_at;
        }
        if let Some(template) = template {
            self.message = template.message.clone().unwrap_or_default();
            self.start_time = template.start_time;
            self.end_time = template.end_time;
        }
    }

    /// Check if polling this activity can stop
    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Pick the activity a caller triggered out of every activity of a workspace.
///
/// Candidates must match `kind` exactly and have been performed by
/// `performed_by` (the workspace creator), which separates our actions from
/// those other actors run on the same workspace. Among several candidates the
/// most recently performed wins; ties keep the earliest in `activities`.
pub fn select_latest<'a>(
    activities: &'a [Activity],
    kind: &ActivityKind,
    performed_by: &str,
) -> Option<&'a Activity> {
    let mut selected: Option<&Activity> = None;

    for activity in activities
        .iter()
        .filter(|a| a.name == *kind && a.performed_by == performed_by)
    {
        match selected {
            Some(current) if activity.performed_at <= current.performed_at => {}
            _ => selected = Some(activity),
        }
    }

    selected
}
