pub mod config;
pub mod daemon;
pub mod directors;
pub mod groups;

use std::path::PathBuf;

use anyhow::{Context, Result};

use signalfire_core::{config as core_config, Config};
use signalfire_daemon::paths::resolve_socket_path;

/// Flags shared by every subcommand.
#[derive(Debug, Clone, Default)]
pub struct GlobalArgs {
    pub config: Option<PathBuf>,
    pub socket: Option<PathBuf>,
}

impl GlobalArgs {
    /// Load and validate the config file; it must exist.
    pub fn load_config(&self) -> Result<(PathBuf, Config)> {
        let path = core_config::resolve_path(self.config.as_deref());
        let config = core_config::load_at(&path)
            .with_context(|| format!("failed to load config {}", path.display()))?;
        Ok((path, config))
    }

    /// Socket for commands that talk to a running daemon. The config is only
    /// read when present, to pick up `server.socket`.
    pub fn query_socket(&self) -> Result<PathBuf> {
        if let Some(socket) = self.socket.as_deref() {
            return Ok(socket.to_path_buf());
        }
        let home = home_dir()?;
        let path = core_config::resolve_path(self.config.as_deref());
        let config = if path.exists() {
            Some(
                core_config::load_at(&path)
                    .with_context(|| format!("failed to load config {}", path.display()))?,
            )
        } else {
            None
        };
        Ok(resolve_socket_path(None, config.as_ref(), &home))
    }

    pub fn socket_for(&self, config: &Config) -> Result<PathBuf> {
        let home = home_dir()?;
        Ok(resolve_socket_path(self.socket.as_deref(), Some(config), &home))
    }
}

fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().context("could not determine home directory")
}

pub(crate) fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("failed to render JSON")?
    );
    Ok(())
}
