use std::path::{Path, PathBuf};

use signalfire_core::Config;

pub const DAEMON_SOCKET: &str = "signalfire.sock";

pub fn signalfire_root(home: &Path) -> PathBuf {
    home.join(".signalfire")
}

pub fn default_socket_path(home: &Path) -> PathBuf {
    signalfire_root(home).join(DAEMON_SOCKET)
}

/// Socket path precedence: explicit flag, then `server.socket` from the
/// config, then `~/.signalfire/signalfire.sock`.
pub fn resolve_socket_path(
    explicit: Option<&Path>,
    config: Option<&Config>,
    home: &Path,
) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    config
        .and_then(|config| config.server.socket.clone())
        .unwrap_or_else(|| default_socket_path(home))
}
