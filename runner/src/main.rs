//! Schematics Runner
//!
//! Prints the service versions and the workspaces of the account, then
//! provisions and tears down two demo workspaces: one from inline code and
//! one from a git repository.

use std::path::PathBuf;

use anyhow::Context;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use schematics_client::{Client, Config, SupportedVersion, Workspace, WorkspaceList};

const DEMO_CODE: &str = r#"
variable "prefix" {}
provider "ibm" {
  generation = 2
  region     = "us-south"
}
resource "ibm_resource_group" "group" {
  name = "${var.prefix}-group"
}
output "name" {
  value = ibm_resource_group.group.name
}
"#;

const DEMO_REPO: &str =
    "https://github.com/IBM/cloud-enterprise-examples/tree/master/iac/01-getting-started";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::load()?;

    let filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();
    if config.log_format == "json" {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .init();
    }

    info!("Starting Schematics Runner v{}", env!("CARGO_PKG_VERSION"));

    // The one client of this process, shared by every workspace below
    let client = Client::new(config)?;

    print_version(&client.version().await?);
    print_workspaces(&client.list().await?);

    let mut with_code = code_workspace(&client)?;
    provision(&client, &mut with_code).await?;
    let output = with_code.get_param(&["name"]);
    match output.get("name") {
        Some(name) => println!("Resource Group name: {}", name),
        None => println!("Resource Group name: <none>"),
    }
    client.delete(&mut with_code, true).await?;

    let mut with_repo = repo_workspace(&client)?;
    provision(&client, &mut with_repo).await?;
    client.delete(&mut with_repo, true).await?;

    info!("Runner finished");
    Ok(())
}

fn code_workspace(client: &Client) -> anyhow::Result<Workspace> {
    let mut workspace = client.workspace("GICS-Demo-with-Code", "");
    workspace.add_var("prefix", "gics-demo", "", "", false)?;
    workspace.set_code(DEMO_CODE);
    Ok(workspace)
}

fn repo_workspace(client: &Client) -> anyhow::Result<Workspace> {
    let key_path = public_key_path()?;
    let public_key = std::fs::read_to_string(&key_path)
        .with_context(|| format!("Failed to read public key {}", key_path.display()))?;

    let mut workspace = client.workspace("GICS-Demo-with-Repo", "");
    workspace.add_var("project_name", "gics", "", "", false)?;
    workspace.add_var("environment", "testing", "", "", false)?;
    workspace.add_var("public_key", public_key.trim(), "", "", true)?;
    workspace.add_repo(DEMO_REPO);
    Ok(workspace)
}

fn public_key_path() -> anyhow::Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".ssh").join("id_rsa.pub"))
}

async fn provision(client: &Client, workspace: &mut Workspace) -> anyhow::Result<()> {
    if let Err(e) = client.run(workspace).await {
        error!(
            "Workspace {} failed (code {}): {}",
            workspace.name,
            e.code(),
            e
        );
        return Err(e.into());
    }

    info!("Workspace {} ({}) is {}", workspace.name, workspace.id(), workspace.status());
    Ok(())
}

fn print_version(version: &SupportedVersion) {
    println!("> Schematics Runner version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "> Build {} {} (SHA: {})",
        version.buildno, version.builddate, version.commitsha
    );
    println!("> API Version: {}", version.api_version);
    println!("> Supported Template versions:");

    let mut rows = vec![row("Template Name", &version.template_names)];
    for (title, versions) in version.component_rows() {
        rows.push(row(title, versions));
    }
    print_table(&rows);
}

fn print_workspaces(list: &WorkspaceList) {
    println!("> Workspaces:");

    let mut rows = vec![row(
        "ID",
        &["Name", "Description", "Location", "Owner", "State", "Created"],
    )];
    for w in &list.workspaces {
        rows.push(vec![
            w.id.clone(),
            w.name.clone(),
            w.description.clone(),
            w.location.clone(),
            w.owner.clone(),
            w.state.to_string(),
            w.created.map(|c| c.to_rfc3339()).unwrap_or_default(),
        ]);
    }
    print_table(&rows);
}

fn row<S: AsRef<str>>(title: &str, cells: &[S]) -> Vec<String> {
    std::iter::once(title.to_string())
        .chain(cells.iter().map(|c| c.as_ref().to_string()))
        .collect()
}

/// Print rows as left-aligned columns separated by two spaces
fn print_table(rows: &[Vec<String>]) {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    let widths: Vec<usize> = (0..columns)
        .map(|i| {
            rows.iter()
                .filter_map(|r| r.get(i))
                .map(|c| c.chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect();

    for r in rows {
        let line = r
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = width))
            .collect::<Vec<_>>()
            .join("  ");
        println!("{}", line.trim_end());
    }
}
