//! Domain types for the director inventory and its collated view.
//!
//! Snapshot types (`Environment`, `Deployment`, `Release`) are what a poll
//! cycle reports for one director and are replaced wholesale in the cache.
//! Collated types (`DeploymentGroup` and below) are derived by the collator and
//! rebuilt from scratch on every cache change.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Globally unique deployment identifier: `<director uuid>/<deployment name>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeploymentId(pub String);

impl DeploymentId {
    pub fn new(director_uuid: &str, deployment_name: &str) -> Self {
        Self(format!("{director_uuid}/{deployment_name}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeploymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for DeploymentId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for DeploymentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ---------------------------------------------------------------------------
// Snapshot entities
// ---------------------------------------------------------------------------

/// A release as reported by a director for one deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub name: String,
    pub version: String,
}

impl Release {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

/// A deployment as reported by a director.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    pub name: String,
    #[serde(default)]
    pub releases: Vec<Release>,
}

/// Everything one director reported during its latest successful poll.
///
/// Identity is the `uuid`; the cache never holds two environments with the
/// same uuid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub name: String,
    pub uuid: String,
    #[serde(default)]
    pub deployments: Vec<Deployment>,
}

// ---------------------------------------------------------------------------
// Collation input
// ---------------------------------------------------------------------------

/// One deployment flattened together with the director that reported it.
/// This is what collation rules inspect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentInput {
    pub director_uuid: String,
    pub director_name: String,
    pub deployment_name: String,
    pub releases: Vec<Release>,
}

impl DeploymentInput {
    pub fn id(&self) -> DeploymentId {
        DeploymentId::new(&self.director_uuid, &self.deployment_name)
    }

    /// Flatten every deployment of `env` into rule inputs, in report order.
    pub fn flatten(env: &Environment) -> Vec<DeploymentInput> {
        env.deployments
            .iter()
            .map(|deployment| DeploymentInput {
                director_uuid: env.uuid.clone(),
                director_name: env.name.clone(),
                deployment_name: deployment.name.clone(),
                releases: deployment.releases.clone(),
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Collated entities
// ---------------------------------------------------------------------------

/// A deployment as a member of a [`DeploymentGroup`](crate::group::DeploymentGroup).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollatedDeployment {
    pub id: DeploymentId,
    pub name: String,
    pub director_uuid: String,
}

/// One version of a release and the deployments (by id) running it, in the
/// order they were added to the group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollatedVersion {
    pub version: String,
    pub deployments: Vec<DeploymentId>,
}

/// A release name and every version of it seen within one group, ascending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollatedRelease {
    pub name: String,
    pub versions: Vec<CollatedVersion>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deployment_id_joins_director_and_name() {
        let id = DeploymentId::new("d-123", "api-prod");
        assert_eq!(id.to_string(), "d-123/api-prod");
        assert_eq!(id, DeploymentId::from("d-123/api-prod"));
    }

    #[test]
    fn flatten_carries_director_identity() {
        let env = Environment {
            name: "lab".into(),
            uuid: "u-1".into(),
            deployments: vec![
                Deployment {
                    name: "api-prod".into(),
                    releases: vec![Release::new("app", "2.1")],
                },
                Deployment {
                    name: "db-prod".into(),
                    releases: vec![],
                },
            ],
        };

        let inputs = DeploymentInput::flatten(&env);
        assert_eq!(inputs.len(), 2);
        assert_eq!(inputs[0].director_name, "lab");
        assert_eq!(inputs[0].id(), DeploymentId::from("u-1/api-prod"));
        assert_eq!(inputs[0].releases, vec![Release::new("app", "2.1")]);
        assert_eq!(inputs[1].deployment_name, "db-prod");
    }

    #[test]
    fn environment_deserializes_without_deployments() {
        let env: Environment =
            serde_yaml::from_str("name: lab\nuuid: u-1\n").expect("deserialize");
        assert!(env.deployments.is_empty());
    }
}
