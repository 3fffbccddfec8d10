//! `signalfire config check`

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;

use signalfire_director::{canonicalize_url, tls};

use super::GlobalArgs;

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Parse and validate the config, then print what the daemon would use.
    Check,
}

pub fn run(command: ConfigCommand, global: &GlobalArgs) -> Result<()> {
    match command {
        ConfigCommand::Check => check(global),
    }
}

fn check(global: &GlobalArgs) -> Result<()> {
    let (path, config) = global.load_config()?;
    let socket = global.socket_for(&config)?;

    println!("{} {}", "config ok:".green().bold(), path.display());

    println!("targets: {}", config.targets.len());
    for (idx, target) in config.targets.iter().enumerate() {
        let url = canonicalize_url(&target.url)
            .with_context(|| format!("targets[{idx}]: invalid url '{}'", target.url))?;
        let auth = if target.auth.client_id.is_empty() {
            "no credentials".to_string()
        } else {
            format!("client {}", target.auth.client_id)
        };
        tls::client_config(target).with_context(|| format!("targets[{idx}]: {url}"))?;
        let tls = if target.insecure_skip_verify {
            ", tls unverified"
        } else if target.ca_cert().is_some() {
            ", custom ca"
        } else {
            ""
        };
        println!(
            "  - {url} (every {}s, {auth}{tls})",
            target.poll_interval().as_secs()
        );
    }

    let source = if config.rules.is_some() {
        "configured"
    } else {
        "default"
    };
    println!("rules ({source}):");
    for (idx, pattern) in config.rule_patterns().iter().enumerate() {
        println!("  {}. {pattern}", idx + 1);
    }

    println!(
        "log: {}{}",
        config.log_level()?,
        if config.log.json { " (json)" } else { "" }
    );
    println!("socket: {}", socket.display());
    Ok(())
}
