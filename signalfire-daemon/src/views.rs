//! JSON shapes served over the daemon socket.
//!
//! The core makes no promise about group, deployment, or release order, so
//! everything is sorted here before it leaves the process: directors by uuid,
//! groups by name, deployments by id, releases by name. Versions keep the
//! core's version ordering.

use serde::{Deserialize, Serialize};
use signalfire_core::{DeploymentGroup, Environment, PollRecords};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectorsResponse {
    pub directors: Vec<DirectorView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectorView {
    pub name: String,
    pub uuid: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupsResponse {
    pub groups: Vec<GroupView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupView {
    pub name: String,
    pub deployments: Vec<DeploymentView>,
    pub releases: Vec<ReleaseView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentView {
    pub name: String,
    pub id: String,
    pub director_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseView {
    pub name: String,
    pub versions: Vec<VersionView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionView {
    pub version: String,
    pub deployments: Vec<String>,
}

/// Poll health of one director as shown by `status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollerView {
    pub director: String,
    pub last_success_at: Option<String>,
    pub last_failure_at: Option<String>,
    pub last_error: Option<String>,
    pub consecutive_failures: u32,
}

pub fn directors_view(environments: &[Environment]) -> DirectorsResponse {
    let mut directors: Vec<DirectorView> = environments
        .iter()
        .map(|env| DirectorView {
            name: env.name.clone(),
            uuid: env.uuid.clone(),
        })
        .collect();
    directors.sort_by(|a, b| a.uuid.cmp(&b.uuid));
    DirectorsResponse { directors }
}

/// Shape groups for transmission, optionally keeping only the named group.
pub fn groups_view(groups: Vec<DeploymentGroup>, only: Option<&str>) -> GroupsResponse {
    let mut groups: Vec<GroupView> = groups
        .into_iter()
        .filter(|group| only.map_or(true, |name| group.name == name))
        .map(group_view)
        .collect();
    groups.sort_by(|a, b| a.name.cmp(&b.name));
    GroupsResponse { groups }
}

fn group_view(group: DeploymentGroup) -> GroupView {
    let mut deployments: Vec<DeploymentView> = group
        .deployments
        .into_iter()
        .map(|deployment| DeploymentView {
            name: deployment.name,
            id: deployment.id.0,
            director_id: deployment.director_uuid,
        })
        .collect();
    deployments.sort_by(|a, b| a.id.cmp(&b.id));

    let mut releases: Vec<ReleaseView> = group
        .releases
        .into_iter()
        .map(|release| ReleaseView {
            name: release.name,
            versions: release
                .versions
                .into_iter()
                .map(|version| VersionView {
                    version: version.version,
                    deployments: version.deployments.into_iter().map(|id| id.0).collect(),
                })
                .collect(),
        })
        .collect();
    releases.sort_by(|a, b| a.name.cmp(&b.name));

    GroupView {
        name: group.name,
        deployments,
        releases,
    }
}

pub fn pollers_view(records: &PollRecords) -> Vec<PollerView> {
    let mut pollers: Vec<PollerView> = records
        .iter()
        .map(|(director, record)| PollerView {
            director: director.clone(),
            last_success_at: record.last_success_at.map(|at| at.to_rfc3339()),
            last_failure_at: record.last_failure_at.map(|at| at.to_rfc3339()),
            last_error: record.last_error.clone(),
            consecutive_failures: record.consecutive_failures,
        })
        .collect();
    pollers.sort_by(|a, b| a.director.cmp(&b.director));
    pollers
}
