//! Workspace and activity status models

use std::fmt;

use serde::{Deserialize, Serialize};

/// Workspace lifecycle status as reported by the remote service
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WorkspaceStatus {
    /// Built locally, not created remotely yet
    New,
    /// Created without a template
    Draft,
    /// Created and waiting for a plan
    Inactive,
    /// Plan in progress
    Planning,
    /// Plan completed
    Planned,
    /// Apply in progress
    Applying,
    /// Resources applied
    Active,
    /// Last action failed
    Failed,
    /// Resources destroyed
    Destroyed,
    /// Workspace deleted
    Deleted,
    /// Any status this client does not know about
    Unknown(String),
}

impl WorkspaceStatus {
    pub fn as_str(&self) -> &str {
        match self {
            WorkspaceStatus::New => "NEW",
            WorkspaceStatus::Draft => "DRAFT",
            WorkspaceStatus::Inactive => "INACTIVE",
            WorkspaceStatus::Planning => "PLANNING",
            WorkspaceStatus::Planned => "PLANNED",
            WorkspaceStatus::Applying => "APPLYING",
            WorkspaceStatus::Active => "ACTIVE",
            WorkspaceStatus::Failed => "FAILED",
            WorkspaceStatus::Destroyed => "DESTROYED",
            WorkspaceStatus::Deleted => "DELETED",
            WorkspaceStatus::Unknown(s) => s,
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "NEW" => WorkspaceStatus::New,
            "DRAFT" => WorkspaceStatus::Draft,
            "INACTIVE" => WorkspaceStatus::Inactive,
            // The service has used both spellings
            "PLANNING" | "PLANING" => WorkspaceStatus::Planning,
            "PLANNED" => WorkspaceStatus::Planned,
            "APPLYING" => WorkspaceStatus::Applying,
            "ACTIVE" => WorkspaceStatus::Active,
            "FAILED" => WorkspaceStatus::Failed,
            "DESTROYED" => WorkspaceStatus::Destroyed,
            "DELETED" => WorkspaceStatus::Deleted,
            _ => WorkspaceStatus::Unknown(s.to_string()),
        }
    }

    /// Check if the workspace reached the end of its lifecycle
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkspaceStatus::Destroyed | WorkspaceStatus::Deleted)
    }

    /// Position in the forward-only lifecycle; `None` for lateral statuses
    pub(crate) fn rank(&self) -> Option<u8> {
        match self {
            WorkspaceStatus::New => Some(0),
            WorkspaceStatus::Draft | WorkspaceStatus::Inactive => Some(1),
            WorkspaceStatus::Planning => Some(2),
            WorkspaceStatus::Planned => Some(3),
            WorkspaceStatus::Applying => Some(4),
            WorkspaceStatus::Active => Some(5),
            WorkspaceStatus::Destroyed => Some(6),
            WorkspaceStatus::Deleted => Some(7),
            WorkspaceStatus::Failed | WorkspaceStatus::Unknown(_) => None,
        }
    }

    /// Check whether moving from `self` to `next` keeps the lifecycle forward-only
    pub fn can_transition_to(&self, next: &WorkspaceStatus) -> bool {
        match (self, next) {
            (WorkspaceStatus::Deleted, _) => false,
            (WorkspaceStatus::Destroyed, next) => *next == WorkspaceStatus::Deleted,
            (_, WorkspaceStatus::Destroyed | WorkspaceStatus::Deleted) => true,
            (_, WorkspaceStatus::New) => false,
            (current, next) => match (current.rank(), next.rank()) {
                (Some(from), Some(to)) => to >= from,
                _ => true,
            },
        }
    }
}

impl fmt::Display for WorkspaceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for WorkspaceStatus {
    fn from(s: String) -> Self {
        WorkspaceStatus::parse(&s)
    }
}

impl From<WorkspaceStatus> for String {
    fn from(status: WorkspaceStatus) -> Self {
        status.as_str().to_string()
    }
}

/// Status of one remote activity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActivityStatus {
    Done,
    Failed,
    Error,
    Cancelled,
    /// Still running, or a status this client does not act on
    Other(String),
}

impl ActivityStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ActivityStatus::Done => "DONE",
            ActivityStatus::Failed => "FAILED",
            ActivityStatus::Error => "ERROR",
            ActivityStatus::Cancelled => "CANCELLED",
            ActivityStatus::Other(s) => s,
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "DONE" => ActivityStatus::Done,
            "FAILED" => ActivityStatus::Failed,
            "ERROR" => ActivityStatus::Error,
            "CANCELLED" | "CANCELED" | "STOPPED" => ActivityStatus::Cancelled,
            _ => ActivityStatus::Other(s.to_string()),
        }
    }

    /// Check if polling can stop
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ActivityStatus::Other(_))
    }

    /// Check if the activity finished successfully
    pub fn is_success(&self) -> bool {
        *self == ActivityStatus::Done
    }
}

impl Default for ActivityStatus {
    fn default() -> Self {
        ActivityStatus::Other(String::new())
    }
}

impl fmt::Display for ActivityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for ActivityStatus {
    fn from(s: String) -> Self {
        ActivityStatus::parse(&s)
    }
}

impl From<ActivityStatus> for String {
    fn from(status: ActivityStatus) -> Self {
        status.as_str().to_string()
    }
}

/// Name of the action an activity performs
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActivityKind {
    WorkspaceCreate,
    Plan,
    Apply,
    Destroy,
    Other(String),
}

impl ActivityKind {
    pub fn as_str(&self) -> &str {
        match self {
            ActivityKind::WorkspaceCreate => "WORKSPACE_CREATE",
            ActivityKind::Plan => "PLAN",
            ActivityKind::Apply => "APPLY",
            ActivityKind::Destroy => "DESTROY",
            ActivityKind::Other(s) => s,
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "WORKSPACE_CREATE" => ActivityKind::WorkspaceCreate,
            "PLAN" => ActivityKind::Plan,
            "APPLY" => ActivityKind::Apply,
            "DESTROY" => ActivityKind::Destroy,
            _ => ActivityKind::Other(s.to_string()),
        }
    }
}

impl Default for ActivityKind {
    fn default() -> Self {
        ActivityKind::Other(String::new())
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for ActivityKind {
    fn from(s: String) -> Self {
        ActivityKind::parse(&s)
    }
}

impl From<ActivityKind> for String {
    fn from(kind: ActivityKind) -> Self {
        kind.as_str().to_string()
    }
}
