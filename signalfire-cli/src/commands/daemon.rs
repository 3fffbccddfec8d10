//! `signalfire daemon`: foreground runtime and socket control.

use anyhow::{Context, Result};
use clap::Subcommand;

use signalfire_daemon::{request_status, request_stop, start_blocking, DaemonError};

use super::{print_json, GlobalArgs};

#[derive(Subcommand, Debug)]
pub enum DaemonCommand {
    /// Run the daemon in the foreground (pollers + collator + socket server).
    Start,
    /// Request graceful daemon shutdown over the Unix socket.
    Stop,
    /// Query daemon runtime status over the Unix socket.
    Status,
}

pub fn run(command: DaemonCommand, global: &GlobalArgs) -> Result<()> {
    match command {
        DaemonCommand::Start => {
            let (_, config) = global.load_config()?;
            let socket = global.socket_for(&config)?;
            start_blocking(config, socket).context("daemon exited with error")?;
        }
        DaemonCommand::Stop => {
            let socket = global.query_socket()?;
            match request_stop(&socket) {
                Ok(()) => println!("daemon stop requested"),
                Err(DaemonError::DaemonNotRunning { .. }) => {
                    println!("daemon is not running");
                }
                Err(err) => return Err(err).context("failed to stop daemon"),
            }
        }
        DaemonCommand::Status => {
            let socket = global.query_socket()?;
            match request_status(&socket) {
                Ok(status) => print_json(&status)?,
                Err(DaemonError::DaemonNotRunning { .. }) => {
                    print_json(&serde_json::json!({
                        "running": false,
                        "socket": socket.display().to_string(),
                    }))?;
                }
                Err(err) => return Err(err).context("failed to query daemon status"),
            }
        }
    }

    Ok(())
}
