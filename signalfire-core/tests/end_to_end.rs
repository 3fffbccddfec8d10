//! Poll → cache → collate, end to end, with in-memory directors.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use signalfire_core::{
    scheduler::poll_once, Cache, Collator, DeploymentGroup, DirectorClient, DirectorDeployment,
    DirectorError, DirectorRelease, PollRecords, PollTarget, RuleSet,
};
use tokio::sync::RwLock;

struct FakeDirector {
    name: String,
    uuid: String,
    deployments: Mutex<Vec<DirectorDeployment>>,
}

impl FakeDirector {
    fn new(name: &str, uuid: &str, deployments: &[(&str, &str, &str)]) -> Arc<Self> {
        let director = Arc::new(Self {
            name: name.to_owned(),
            uuid: uuid.to_owned(),
            deployments: Mutex::new(vec![]),
        });
        director.set(deployments);
        director
    }

    fn set(&self, deployments: &[(&str, &str, &str)]) {
        *self.deployments.lock().expect("lock") = deployments
            .iter()
            .map(|(name, release, version)| DirectorDeployment {
                name: (*name).to_owned(),
                releases: vec![DirectorRelease {
                    name: (*release).to_owned(),
                    version: (*version).to_owned(),
                }],
            })
            .collect();
    }
}

impl DirectorClient for FakeDirector {
    fn name(&self) -> &str {
        &self.name
    }

    fn uuid(&self) -> &str {
        &self.uuid
    }

    fn list_deployments(&self) -> Result<Vec<DirectorDeployment>, DirectorError> {
        Ok(self.deployments.lock().expect("lock").clone())
    }
}

fn target(director: &Arc<FakeDirector>) -> PollTarget {
    PollTarget {
        client: director.clone(),
        poll_interval: Duration::from_secs(30),
    }
}

async fn wait_for_groups<F>(collator: &Collator, done: F) -> Vec<DeploymentGroup>
where
    F: Fn(&[DeploymentGroup]) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let groups = collator.get_deployment_groups().await;
            if done(&groups) {
                return groups;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("collator converged")
}

fn group<'a>(groups: &'a [DeploymentGroup], name: &str) -> &'a DeploymentGroup {
    groups
        .iter()
        .find(|g| g.name == name)
        .unwrap_or_else(|| panic!("group {name} missing"))
}

#[tokio::test]
async fn two_directors_collate_into_prod_and_staging() {
    let cache = Arc::new(Cache::new());
    let collator = Arc::new(Collator::new(
        RuleSet::from_patterns(&[".*-(.*)"]).expect("rules"),
    ));
    let watch = collator.spawn_watch(cache.clone());
    let records = RwLock::new(PollRecords::new());

    let east = FakeDirector::new("east", "uuid-east", &[("api-prod", "app", "2.1")]);
    let west = FakeDirector::new("west", "uuid-west", &[("api-staging", "app", "2.1-rc.1")]);
    assert!(poll_once(&target(&east), &cache, &records).await);
    assert!(poll_once(&target(&west), &cache, &records).await);

    let groups = wait_for_groups(&collator, |g| g.len() == 2).await;

    let prod = group(&groups, "prod");
    let app = prod.release("app").expect("app in prod");
    assert_eq!(app.versions.len(), 1);
    assert_eq!(app.versions[0].version, "2.1");
    assert_eq!(prod.deployments[0].id.as_str(), "uuid-east/api-prod");
    assert_eq!(prod.deployments[0].director_uuid, "uuid-east");

    let staging = group(&groups, "staging");
    let app = staging.release("app").expect("app in staging");
    assert_eq!(app.versions.len(), 1);
    assert_eq!(app.versions[0].version, "2.1-rc.1");

    watch.abort();
}

#[tokio::test]
async fn final_release_sorts_above_its_candidate_in_one_group() {
    let cache = Arc::new(Cache::new());
    let collator = Arc::new(Collator::new(
        RuleSet::from_patterns(&["^(api)-"]).expect("rules"),
    ));
    let watch = collator.spawn_watch(cache.clone());
    let records = RwLock::new(PollRecords::new());

    let east = FakeDirector::new("east", "uuid-east", &[("api-prod", "app", "2.1")]);
    let west = FakeDirector::new("west", "uuid-west", &[("api-staging", "app", "2.1-rc.1")]);
    poll_once(&target(&east), &cache, &records).await;
    poll_once(&target(&west), &cache, &records).await;

    let groups = wait_for_groups(&collator, |g| {
        g.len() == 1 && g[0].deployments.len() == 2
    })
    .await;

    let versions: Vec<&str> = groups[0]
        .release("app")
        .expect("app")
        .versions
        .iter()
        .map(|v| v.version.as_str())
        .collect();
    assert_eq!(versions, vec!["2.1-rc.1", "2.1"]);

    watch.abort();
}

#[tokio::test]
async fn vanished_deployment_prunes_its_group_on_next_poll() {
    let cache = Arc::new(Cache::new());
    let collator = Arc::new(Collator::new(RuleSet::default()));
    let watch = collator.spawn_watch(cache.clone());
    let records = RwLock::new(PollRecords::new());

    let east = FakeDirector::new(
        "east",
        "uuid-east",
        &[("api-prod", "app", "2.1"), ("api-canary", "app", "2.2")],
    );
    poll_once(&target(&east), &cache, &records).await;
    wait_for_groups(&collator, |g| g.len() == 2).await;

    east.set(&[("api-prod", "app", "2.1")]);
    poll_once(&target(&east), &cache, &records).await;
    let groups = wait_for_groups(&collator, |g| g.len() == 1).await;

    assert_eq!(groups[0].name, "prod");
    assert_eq!(cache.len().await, 1, "re-poll replaces, never duplicates");

    watch.abort();
}
