//! Director authentication: static basic credentials or a UAA
//! client-credentials token.

use std::time::{Duration, Instant};

use base64::Engine;
use parking_lot::Mutex;
use serde::Deserialize;
use signalfire_core::config::TargetAuth;
use signalfire_core::DirectorError;

use crate::client::UserAuthentication;

/// Tokens are re-requested once they are this old, even if the UAA granted a
/// longer lifetime.
pub const TOKEN_REFRESH_AFTER: Duration = Duration::from_secs(30);

/// Produces the `Authorization` header for director requests.
#[derive(Debug)]
pub enum Authorizer {
    Basic { header: String },
    Uaa(UaaAuth),
}

impl Authorizer {
    /// Choose the scheme the director advertises in its `/info`.
    pub fn from_info(
        info: &UserAuthentication,
        credentials: &TargetAuth,
    ) -> Result<Self, DirectorError> {
        match info.kind.as_str() {
            "basic" => Ok(Self::basic(credentials)),
            "uaa" => {
                let url = info.options.url.as_deref().unwrap_or_default();
                if url.is_empty() {
                    return Err(DirectorError::Authentication(
                        "director advertises uaa auth without a uaa url".to_owned(),
                    ));
                }
                Ok(Self::Uaa(UaaAuth::new(url, credentials)))
            }
            other => Err(DirectorError::Authentication(format!(
                "unsupported director auth type '{other}'"
            ))),
        }
    }

    pub fn basic(credentials: &TargetAuth) -> Self {
        let raw = format!("{}:{}", credentials.client_id, credentials.client_secret);
        Self::Basic {
            header: format!(
                "Basic {}",
                base64::engine::general_purpose::STANDARD.encode(raw)
            ),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Basic { .. } => "basic",
            Self::Uaa(_) => "uaa",
        }
    }

    /// Obtain credentials up front so bad secrets fail at startup.
    pub fn login(&self, agent: &ureq::Agent) -> Result<(), DirectorError> {
        match self {
            Self::Basic { .. } => Ok(()),
            Self::Uaa(uaa) => uaa.refresh(agent).map(|_| ()),
        }
    }

    pub fn header(&self, agent: &ureq::Agent) -> Result<String, DirectorError> {
        match self {
            Self::Basic { header } => Ok(header.clone()),
            Self::Uaa(uaa) => uaa.header(agent),
        }
    }
}

#[derive(Debug)]
struct AccessToken {
    value: String,
    fetched_at: Instant,
    lifetime: Duration,
}

impl AccessToken {
    fn is_fresh(&self) -> bool {
        self.fetched_at.elapsed() < self.lifetime.min(TOKEN_REFRESH_AFTER)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: u64,
}

/// OAuth client-credentials grant against the director's UAA.
#[derive(Debug)]
pub struct UaaAuth {
    token_url: String,
    client_id: String,
    client_secret: String,
    token: Mutex<Option<AccessToken>>,
}

impl UaaAuth {
    pub fn new(uaa_url: &str, credentials: &TargetAuth) -> Self {
        Self {
            token_url: format!("{}/oauth/token", uaa_url.trim_end_matches('/')),
            client_id: credentials.client_id.clone(),
            client_secret: credentials.client_secret.clone(),
            token: Mutex::new(None),
        }
    }

    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    fn header(&self, agent: &ureq::Agent) -> Result<String, DirectorError> {
        {
            let token = self.token.lock();
            if let Some(token) = token.as_ref().filter(|t| t.is_fresh()) {
                return Ok(format!("Bearer {}", token.value));
            }
        }
        let value = self.refresh(agent)?;
        Ok(format!("Bearer {value}"))
    }

    fn refresh(&self, agent: &ureq::Agent) -> Result<String, DirectorError> {
        tracing::debug!(url = %self.token_url, "requesting uaa token");
        let response = agent
            .post(&self.token_url)
            .set("Accept", "application/json")
            .send_form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .map_err(|err| match err {
                ureq::Error::Status(code, _) => DirectorError::Authentication(format!(
                    "could not authenticate: status {code}"
                )),
                ureq::Error::Transport(transport) => DirectorError::Transport {
                    url: self.token_url.clone(),
                    message: transport.to_string(),
                },
            })?;

        let body: TokenResponse = response.into_json().map_err(|err| DirectorError::Decode {
            url: self.token_url.clone(),
            message: err.to_string(),
        })?;

        let lifetime = match body.expires_in {
            0 => TOKEN_REFRESH_AFTER,
            secs => Duration::from_secs(secs),
        };
        *self.token.lock() = Some(AccessToken {
            value: body.access_token.clone(),
            fetched_at: Instant::now(),
            lifetime,
        });
        Ok(body.access_token)
    }
}
