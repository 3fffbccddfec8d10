//! HTTP director client.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use signalfire_core::config::TargetConfig;
use signalfire_core::{DirectorClient, DirectorDeployment, DirectorError};

use crate::auth::Authorizer;
use crate::endpoint::canonicalize_url;
use crate::tls;

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// The unauthenticated `/info` document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DirectorInfo {
    pub name: String,
    pub uuid: String,
    #[serde(default)]
    pub user_authentication: UserAuthentication,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UserAuthentication {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub options: AuthOptions,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AuthOptions {
    #[serde(default)]
    pub url: Option<String>,
}

/// A connected director. Identity is fixed at connect time.
#[derive(Debug)]
pub struct HttpDirector {
    agent: ureq::Agent,
    url: String,
    info: DirectorInfo,
    auth: Authorizer,
}

impl HttpDirector {
    /// Resolve the target, apply its TLS settings, read `/info`, and log in once.
    pub fn connect(target: &TargetConfig) -> Result<Self, DirectorError> {
        let url = canonicalize_url(&target.url)?;
        let mut builder = ureq::AgentBuilder::new()
            .timeout_connect(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT);
        if let Some(tls) = tls::client_config(target)? {
            builder = builder.tls_config(tls);
        }
        let agent = builder.build();

        let info: DirectorInfo = get_json(&agent, &join(&url, "/info"), None)?;
        let auth = Authorizer::from_info(&info.user_authentication, &target.auth)?;
        auth.login(&agent)?;

        tracing::info!(
            director = %info.name,
            uuid = %info.uuid,
            url = %url,
            auth = auth.kind(),
            "connected to director",
        );
        Ok(Self {
            agent,
            url,
            info,
            auth,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn info(&self) -> &DirectorInfo {
        &self.info
    }

    fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, DirectorError> {
        let header = self.auth.header(&self.agent)?;
        get_json(&self.agent, &join(&self.url, path), Some(&header))
    }
}

impl DirectorClient for HttpDirector {
    fn name(&self) -> &str {
        &self.info.name
    }

    fn uuid(&self) -> &str {
        &self.info.uuid
    }

    fn list_deployments(&self) -> Result<Vec<DirectorDeployment>, DirectorError> {
        self.get("/deployments")
    }
}

fn join(base: &str, path: &str) -> String {
    format!("{}/{}", base, path.trim_start_matches('/'))
}

fn get_json<T: DeserializeOwned>(
    agent: &ureq::Agent,
    url: &str,
    authorization: Option<&str>,
) -> Result<T, DirectorError> {
    tracing::debug!(url = %url, "director request");
    let mut request = agent.get(url).set("Accept", "application/json");
    if let Some(value) = authorization {
        request = request.set("Authorization", value);
    }

    let response = request.call().map_err(|err| request_error(url, err))?;
    response.into_json().map_err(|err| DirectorError::Decode {
        url: url.to_owned(),
        message: err.to_string(),
    })
}

fn request_error(url: &str, err: ureq::Error) -> DirectorError {
    match err {
        ureq::Error::Status(code @ (401 | 403), _) => {
            DirectorError::Authentication(format!("{url} returned HTTP {code}"))
        }
        ureq::Error::Status(code, _) => DirectorError::Status {
            url: url.to_owned(),
            code,
        },
        ureq::Error::Transport(transport) => DirectorError::Transport {
            url: url.to_owned(),
            message: transport.to_string(),
        },
    }
}
