//! Service layer

pub mod activity;
pub mod catalog;
pub mod workspace;

pub use activity::{ActivityService, WaitPolicy};
pub use catalog::CatalogService;
pub use workspace::WorkspaceService;
