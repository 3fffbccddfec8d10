//! `signalfire groups`: which version of each release runs in which
//! deployment, per group.

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use signalfire_daemon::request_groups;
use signalfire_daemon::views::{GroupView, GroupsResponse};

use super::{print_json, GlobalArgs};

#[derive(Args, Debug)]
pub struct GroupsArgs {
    /// Show only this group.
    #[arg(long)]
    pub group: Option<String>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct VersionRow {
    #[tabled(rename = "release")]
    release: String,
    #[tabled(rename = "version")]
    version: String,
    #[tabled(rename = "deployments")]
    deployments: String,
}

impl GroupsArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let socket = global.query_socket()?;
        let response =
            request_groups(&socket, self.group.clone()).context("failed to list groups")?;

        if let Some(name) = &self.group {
            if response.groups.is_empty() {
                bail!("no deployment group named '{name}'");
            }
        }

        if self.json {
            return print_json(&response);
        }
        print_groups(response);
        Ok(())
    }
}

fn print_groups(response: GroupsResponse) {
    println!(
        "Signalfire v{} | {} groups",
        env!("CARGO_PKG_VERSION"),
        response.groups.len()
    );

    if response.groups.is_empty() {
        println!("No deployment groups yet.");
        return;
    }

    for group in response.groups {
        let deployments = group.deployments.len();
        println!(
            "{} {}",
            group.name.to_uppercase().bold(),
            format!("({deployments} deployments)").bright_black()
        );
        let rows = version_rows(&group);
        if rows.is_empty() {
            println!("  no releases");
            continue;
        }
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
    }
}

/// One row per release version, newest last within a release.
fn version_rows(group: &GroupView) -> Vec<VersionRow> {
    let mut rows = Vec::new();
    for release in &group.releases {
        for version in &release.versions {
            rows.push(VersionRow {
                release: release.name.clone(),
                version: version.version.clone(),
                deployments: version.deployments.join(", "),
            });
        }
    }
    rows
}
