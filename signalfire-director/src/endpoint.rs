//! Director URL handling.

use signalfire_core::DirectorError;
use url::Url;

/// Port directors listen on when the configured URL names none.
pub const DEFAULT_DIRECTOR_PORT: u16 = 25555;

/// Normalize a configured director address.
///
/// `https://` is assumed when no scheme is given, the default director port is
/// added when no port is given, and any trailing `/` is dropped.
pub fn canonicalize_url(raw: &str) -> Result<String, DirectorError> {
    let raw = raw.trim();
    let with_scheme = if raw.starts_with("http://") || raw.starts_with("https://") {
        raw.to_owned()
    } else {
        format!("https://{raw}")
    };

    let mut parsed = Url::parse(&with_scheme).map_err(|err| {
        DirectorError::InvalidTarget(format!("cannot parse director url '{raw}': {err}"))
    })?;
    if parsed.host_str().is_none() {
        return Err(DirectorError::InvalidTarget(format!(
            "director url '{raw}' has no host"
        )));
    }
    if !has_explicit_port(&with_scheme) {
        parsed.set_port(Some(DEFAULT_DIRECTOR_PORT)).map_err(|()| {
            DirectorError::InvalidTarget(format!("cannot set port on director url '{raw}'"))
        })?;
    }

    Ok(parsed.as_str().trim_end_matches('/').to_owned())
}

/// `Url` hides ports equal to the scheme default, so look at the authority
/// text directly.
fn has_explicit_port(with_scheme: &str) -> bool {
    let after_scheme = with_scheme
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(with_scheme);
    let authority = after_scheme.split('/').next().unwrap_or_default();
    let host_port = authority.rsplit('@').next().unwrap_or(authority);
    match host_port.rsplit_once(':') {
        Some((host, port)) => {
            !port.is_empty()
                && port.bytes().all(|b| b.is_ascii_digit())
                && (!host.starts_with('[') || host.ends_with(']'))
        }
        None => false,
    }
}
