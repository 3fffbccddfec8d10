//! `signalfire directors`

use anyhow::{Context, Result};
use clap::Args;
use tabled::{settings::Style, Table, Tabled};

use signalfire_daemon::request_directors;

use super::{print_json, GlobalArgs};

#[derive(Args, Debug)]
pub struct DirectorsArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct DirectorRow {
    #[tabled(rename = "director")]
    name: String,
    #[tabled(rename = "uuid")]
    uuid: String,
}

impl DirectorsArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let socket = global.query_socket()?;
        let response = request_directors(&socket).context("failed to list directors")?;

        if self.json {
            return print_json(&response);
        }

        if response.directors.is_empty() {
            println!("No directors have reported yet.");
            return Ok(());
        }

        let rows: Vec<DirectorRow> = response
            .directors
            .into_iter()
            .map(|director| DirectorRow {
                name: director.name,
                uuid: director.uuid,
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        Ok(())
    }
}
