//! Per-group bookkeeping of deployments, releases, and version fan-out.
//!
//! A group never keeps an empty container around: a version with no
//! deployments, a release with no versions, and a group with no deployments
//! are all pruned by the mutation that emptied them (the last one by the
//! caller, on the `true` returned from [`DeploymentGroup::remove_deployment_by_id`]).

use serde::{Deserialize, Serialize};

use crate::types::{
    CollatedDeployment, CollatedRelease, CollatedVersion, DeploymentId, DeploymentInput, Release,
};
use crate::version;

/// A named bucket of deployments and the release versions they run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentGroup {
    pub name: String,
    pub deployments: Vec<CollatedDeployment>,
    pub releases: Vec<CollatedRelease>,
}

impl DeploymentGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            deployments: Vec::new(),
            releases: Vec::new(),
        }
    }

    /// Add a deployment and record every release version it reports.
    pub fn add_deployment(&mut self, input: &DeploymentInput) {
        let deployment = CollatedDeployment {
            id: input.id(),
            name: input.deployment_name.clone(),
            director_uuid: input.director_uuid.clone(),
        };
        for release in &input.releases {
            self.add_release(&deployment.id, release);
        }
        self.deployments.push(deployment);
    }

    /// Remove a deployment and every version reference it held.
    ///
    /// Returns `true` when the group has no deployments left; the caller is
    /// expected to drop the group.
    pub fn remove_deployment_by_id(&mut self, id: &DeploymentId) -> bool {
        self.deployments.retain(|deployment| &deployment.id != id);
        if self.deployments.is_empty() {
            self.releases.clear();
            return true;
        }

        self.releases.retain_mut(|release| !release.remove_deployment_by_id(id));
        false
    }

    pub fn contains(&self, id: &DeploymentId) -> bool {
        self.deployments.iter().any(|deployment| &deployment.id == id)
    }

    pub fn release(&self, name: &str) -> Option<&CollatedRelease> {
        self.releases.iter().find(|release| release.name == name)
    }

    fn add_release(&mut self, id: &DeploymentId, release: &Release) {
        let idx = match self.releases.iter().position(|r| r.name == release.name) {
            Some(idx) => idx,
            None => {
                self.releases.push(CollatedRelease {
                    name: release.name.clone(),
                    versions: Vec::new(),
                });
                self.releases.len() - 1
            }
        };
        self.releases[idx].add_deployment_version(id, &release.version);
    }
}

impl CollatedRelease {
    pub fn version(&self, version: &str) -> Option<&CollatedVersion> {
        self.versions.iter().find(|v| v.version == version)
    }

    fn add_deployment_version(&mut self, id: &DeploymentId, version: &str) {
        match self.versions.iter_mut().find(|v| v.version == version) {
            Some(existing) => existing.deployments.push(id.clone()),
            None => self.versions.push(CollatedVersion {
                version: version.to_owned(),
                deployments: vec![id.clone()],
            }),
        }
        self.sort_versions();
    }

    /// Returns `true` when no versions remain.
    fn remove_deployment_by_id(&mut self, id: &DeploymentId) -> bool {
        for version in &mut self.versions {
            version.deployments.retain(|held| held != id);
        }
        self.versions.retain(|version| !version.deployments.is_empty());
        self.sort_versions();
        self.versions.is_empty()
    }

    fn sort_versions(&mut self) {
        self.versions
            .sort_by(|a, b| version::compare(&a.version, &b.version));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(director: &str, name: &str, releases: &[(&str, &str)]) -> DeploymentInput {
        DeploymentInput {
            director_uuid: director.to_owned(),
            director_name: format!("{director}-name"),
            deployment_name: name.to_owned(),
            releases: releases
                .iter()
                .map(|(name, version)| Release::new(*name, *version))
                .collect(),
        }
    }

    fn version_strings(release: &CollatedRelease) -> Vec<&str> {
        release.versions.iter().map(|v| v.version.as_str()).collect()
    }

    #[test]
    fn add_builds_release_fan_out() {
        let mut group = DeploymentGroup::new("prod");
        group.add_deployment(&input("d1", "api-prod", &[("app", "2.1"), ("log", "1")]));
        group.add_deployment(&input("d2", "api-prod", &[("app", "2.1")]));

        assert_eq!(group.deployments.len(), 2);
        let app = group.release("app").expect("app release");
        assert_eq!(app.versions.len(), 1);
        assert_eq!(
            app.versions[0].deployments,
            vec![DeploymentId::from("d1/api-prod"), DeploymentId::from("d2/api-prod")]
        );
        assert!(group.release("log").is_some());
    }

    #[test]
    fn versions_stay_sorted_as_they_are_added() {
        let mut group = DeploymentGroup::new("prod");
        group.add_deployment(&input("d1", "a", &[("app", "2.1")]));
        group.add_deployment(&input("d1", "b", &[("app", "2.1-rc.1")]));
        group.add_deployment(&input("d1", "c", &[("app", "1.9.12")]));
        group.add_deployment(&input("d1", "d", &[("app", "10")]));

        let app = group.release("app").expect("app release");
        assert_eq!(version_strings(app), vec!["1.9.12", "2.1-rc.1", "2.1", "10"]);
    }

    #[test]
    fn removing_last_deployment_empties_group() {
        let mut group = DeploymentGroup::new("prod");
        group.add_deployment(&input("d1", "api-prod", &[("app", "2.1")]));

        assert!(group.remove_deployment_by_id(&DeploymentId::from("d1/api-prod")));
        assert!(group.deployments.is_empty());
        assert!(group.releases.is_empty());
    }

    #[test]
    fn removing_last_user_of_a_version_prunes_version() {
        let mut group = DeploymentGroup::new("prod");
        group.add_deployment(&input("d1", "a", &[("app", "2.1")]));
        group.add_deployment(&input("d1", "b", &[("app", "2.2")]));

        assert!(!group.remove_deployment_by_id(&DeploymentId::from("d1/b")));
        let app = group.release("app").expect("app release");
        assert_eq!(version_strings(app), vec!["2.1"]);
        assert!(app.version("2.2").is_none());
    }

    #[test]
    fn removing_last_version_prunes_release() {
        let mut group = DeploymentGroup::new("prod");
        group.add_deployment(&input("d1", "a", &[("app", "2.1")]));
        group.add_deployment(&input("d1", "b", &[("app", "2.1"), ("extra", "0.1")]));

        assert!(!group.remove_deployment_by_id(&DeploymentId::from("d1/b")));
        assert!(group.release("extra").is_none());
        let app = group.release("app").expect("app release");
        assert_eq!(app.versions[0].deployments, vec![DeploymentId::from("d1/a")]);
    }

    #[test]
    fn removing_unknown_id_leaves_group_untouched() {
        let mut group = DeploymentGroup::new("prod");
        group.add_deployment(&input("d1", "a", &[("app", "2.1")]));
        let before = group.clone();

        assert!(!group.remove_deployment_by_id(&DeploymentId::from("d9/nope")));
        assert_eq!(group, before);
    }

    #[test]
    fn deployment_order_within_a_version_is_insertion_order() {
        let mut group = DeploymentGroup::new("prod");
        for name in ["c", "a", "b"] {
            group.add_deployment(&input("d1", name, &[("app", "1")]));
        }
        group.remove_deployment_by_id(&DeploymentId::from("d1/a"));

        let ids: Vec<&str> = group.release("app").expect("app").versions[0]
            .deployments
            .iter()
            .map(DeploymentId::as_str)
            .collect();
        assert_eq!(ids, vec!["d1/c", "d1/b"]);
    }
}
