//! Domain models

pub mod activity;
pub mod status;
pub mod types;
pub mod workspace;

pub use activity::Activity;
pub use status::{ActivityKind, ActivityStatus, WorkspaceStatus};
pub use types::{SupportedVersion, WorkspaceList, WorkspaceSummary};
pub use workspace::{GitRepo, Variable, Workspace};
