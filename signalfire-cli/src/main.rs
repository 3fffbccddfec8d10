//! Signalfire: release inventory across directors.
//!
//! # Usage
//!
//! ```text
//! signalfire daemon start|stop|status
//! signalfire directors [--json]
//! signalfire groups [--group <name>] [--json]
//! signalfire config check
//!
//! global: --config <path>   (env CONFIG_PATH, default sf_conf.yml)
//!         --socket <path>   (env SIGNALFIRE_SOCKET)
//! ```

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    config::ConfigCommand, daemon::DaemonCommand, directors::DirectorsArgs, groups::GroupsArgs,
    GlobalArgs,
};

#[derive(Parser, Debug)]
#[command(
    name = "signalfire",
    version,
    about = "Track which release versions run where, grouped across directors",
    long_about = None,
)]
struct Cli {
    /// Config file.
    #[arg(long, global = true, env = "CONFIG_PATH")]
    config: Option<PathBuf>,

    /// Daemon socket; overrides `server.socket` from the config.
    #[arg(long, global = true, env = "SIGNALFIRE_SOCKET")]
    socket: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run or control the background poller.
    Daemon {
        #[command(subcommand)]
        command: DaemonCommand,
    },

    /// List directors with a current snapshot.
    Directors(DirectorsArgs),

    /// Show deployment groups and their release versions.
    Groups(GroupsArgs),

    /// Inspect the configuration file.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let global = GlobalArgs {
        config: cli.config,
        socket: cli.socket,
    };
    match cli.command {
        Commands::Daemon { command } => commands::daemon::run(command, &global),
        Commands::Directors(args) => args.run(&global),
        Commands::Groups(args) => args.run(&global),
        Commands::Config { command } => commands::config::run(command, &global),
    }
}
