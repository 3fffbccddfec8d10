//! Derives deployment groups from cached director snapshots.
//!
//! Every cache wakeup triggers a full rebuild: the current groups and the
//! deployment index are discarded and every deployment of every environment is
//! re-inserted through the same add/remove primitives an incremental update
//! would use ([`CollatorState::add_deployment`] and
//! [`CollatorState::remove_deployment`]).

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::cache::Cache;
use crate::error::CoreError;
use crate::group::DeploymentGroup;
use crate::rule::RuleSet;
use crate::types::{DeploymentId, DeploymentInput, Environment};

/// Groups plus the deployment-id → group-name index that must always agree
/// with group membership.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollatorState {
    groups: Vec<DeploymentGroup>,
    ids_to_groups: HashMap<DeploymentId, String>,
}

impl CollatorState {
    /// Build state from scratch for `environments`.
    pub fn rebuild(rules: &RuleSet, environments: &[Environment]) -> Result<Self, CoreError> {
        let mut state = Self::default();
        for env in environments {
            for input in DeploymentInput::flatten(env) {
                state.add_deployment(rules, &input)?;
            }
        }
        Ok(state)
    }

    pub fn groups(&self) -> &[DeploymentGroup] {
        &self.groups
    }

    pub fn group(&self, name: &str) -> Option<&DeploymentGroup> {
        self.groups.iter().find(|group| group.name == name)
    }

    pub fn group_of(&self, id: &DeploymentId) -> Option<&str> {
        self.ids_to_groups.get(id).map(String::as_str)
    }

    /// Place a deployment into the group its rules select, replacing any
    /// previous entry with the same id. Returns the group name, or `None`
    /// when no rule applies and the deployment was dropped.
    pub fn add_deployment(
        &mut self,
        rules: &RuleSet,
        input: &DeploymentInput,
    ) -> Result<Option<String>, CoreError> {
        let Some(group) = rules.group_for(input) else {
            tracing::info!(
                deployment = %input.deployment_name,
                director = %input.director_name,
                "dropping deployment: no collation rule matched",
            );
            return Ok(None);
        };

        let id = input.id();
        self.remove_deployment(&id)?;
        self.ids_to_groups.insert(id, group.clone());

        let idx = match self.groups.iter().position(|g| g.name == group) {
            Some(idx) => idx,
            None => {
                self.groups.push(DeploymentGroup::new(group.clone()));
                self.groups.len() - 1
            }
        };
        self.groups[idx].add_deployment(input);

        tracing::debug!(
            deployment = %input.deployment_name,
            group = %group,
            "inserted deployment into group",
        );
        Ok(Some(group))
    }

    /// Remove a deployment from whichever group holds it, dropping the group
    /// if it empties. Returns whether the deployment was present.
    pub fn remove_deployment(&mut self, id: &DeploymentId) -> Result<bool, CoreError> {
        let Some(group) = self.ids_to_groups.get(id).cloned() else {
            return Ok(false);
        };

        let Some(idx) = self.groups.iter().position(|g| g.name == group) else {
            tracing::error!(
                deployment = %id,
                group = %group,
                "deployment index points at a missing group",
            );
            return Err(CoreError::Inconsistent {
                deployment_id: id.clone(),
                group,
            });
        };

        if self.groups[idx].remove_deployment_by_id(id) {
            self.groups.remove(idx);
        }
        self.ids_to_groups.remove(id);
        Ok(true)
    }
}

/// Owns the rule set and the current derived groups.
#[derive(Debug)]
pub struct Collator {
    rules: RuleSet,
    state: RwLock<CollatorState>,
}

impl Collator {
    pub fn new(rules: RuleSet) -> Self {
        Self {
            rules,
            state: RwLock::new(CollatorState::default()),
        }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Copy of the current groups. Order is not meaningful.
    pub async fn get_deployment_groups(&self) -> Vec<DeploymentGroup> {
        self.state.read().await.groups.clone()
    }

    /// Copy of the full derived state, index included.
    pub async fn snapshot(&self) -> CollatorState {
        self.state.read().await.clone()
    }

    /// Discard everything and rebuild from `environments`. Returns the number
    /// of groups produced. On an internal consistency fault the previous state
    /// is kept and the fault is returned.
    pub async fn collate(&self, environments: &[Environment]) -> Result<usize, CoreError> {
        let mut state = self.state.write().await;
        *state = CollatorState::rebuild(&self.rules, environments)?;
        Ok(state.groups.len())
    }

    /// Rebuild once from the current cache contents, then again on every
    /// cache wakeup. Only returns on an internal consistency fault.
    pub async fn watch(self: Arc<Self>, cache: Arc<Cache>) -> Result<(), CoreError> {
        let mut wakeups = cache.subscribe().await;
        self.collate(&cache.get_environments().await).await?;

        while wakeups.recv().await.is_some() {
            let environments = cache.get_environments().await;
            let groups = self.collate(&environments).await?;
            tracing::debug!(
                directors = environments.len(),
                groups,
                "rebuilt deployment groups"
            );
        }
        Ok(())
    }

    /// Run [`Collator::watch`] on a background task.
    pub fn spawn_watch(self: &Arc<Self>, cache: Arc<Cache>) -> JoinHandle<Result<(), CoreError>> {
        let collator = Arc::clone(self);
        tokio::spawn(collator.watch(cache))
    }
}
