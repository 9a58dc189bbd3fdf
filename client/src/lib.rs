//! Schematics workspace client
//!
//! Drives remote infrastructure-as-code workspaces through their lifecycle:
//! create, upload the code, plan, apply and finally destroy or delete. Every
//! step starts an activity on the service; the client polls each activity to
//! completion before starting the next step.
//!
//! ```no_run
//! # async fn demo() -> schematics_client::Result<()> {
//! use schematics_client::{Client, Config};
//!
//! let client = Client::new(Config::load()?)?;
//!
//! let mut workspace = client.workspace("gics-demo", "demo workspace");
//! workspace.add_var("prefix", "gics-demo", "string", "", false)?;
//! workspace.set_code(r#"output "name" { value = "${var.prefix}-group" }"#);
//!
//! client.run(&mut workspace).await?;
//! println!("{:?}", workspace.get_param(&["name"]));
//!
//! client.delete(&mut workspace, true).await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod client;
pub mod config;
pub mod domain;
pub mod error;
pub mod infra;
pub mod service;

pub use client::Client;
pub use config::{Config, Timeouts};
pub use domain::{
    Activity, ActivityKind, ActivityStatus, GitRepo, SupportedVersion, Variable, Workspace,
    WorkspaceList, WorkspaceStatus, WorkspaceSummary,
};
pub use error::{Error, ErrorKind, Result};
pub use service::WaitPolicy;
