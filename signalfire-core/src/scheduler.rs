//! One timed poll loop per director, feeding the cache.
//!
//! Loops are independent: no shared state beyond the cache and the poll
//! records, no coordination, no cancellation protocol other than dropping
//! (aborting) the returned task handles. A failed poll is logged, recorded,
//! and otherwise ignored; the cache keeps the last good snapshot until the
//! next tick.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::cache::Cache;
use crate::error::DirectorError;
use crate::types::{Deployment, Environment, Release};

/// A deployment as the director's API reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectorDeployment {
    pub name: String,
    #[serde(default)]
    pub releases: Vec<DirectorRelease>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectorRelease {
    pub name: String,
    pub version: String,
}

/// The inbound boundary to a director. Implementations are blocking; the
/// scheduler calls them on the blocking thread pool.
pub trait DirectorClient: Send + Sync {
    fn name(&self) -> &str;
    fn uuid(&self) -> &str;
    fn list_deployments(&self) -> Result<Vec<DirectorDeployment>, DirectorError>;
}

/// Outcome history of one director's polls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollRecord {
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_failure_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub consecutive_failures: u32,
}

/// Shortest period a poll loop will run at; shorter intervals are raised to it.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Poll records keyed by director name.
pub type PollRecords = HashMap<String, PollRecord>;

/// A director and how often to poll it.
#[derive(Clone)]
pub struct PollTarget {
    pub client: Arc<dyn DirectorClient>,
    pub poll_interval: Duration,
}

impl std::fmt::Debug for PollTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollTarget")
            .field("director", &self.client.name())
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

#[derive(Debug)]
pub struct Scheduler {
    targets: Vec<PollTarget>,
    cache: Arc<Cache>,
    records: Arc<RwLock<PollRecords>>,
}

impl Scheduler {
    pub fn new(targets: Vec<PollTarget>, cache: Arc<Cache>) -> Self {
        Self {
            targets,
            cache,
            records: Arc::new(RwLock::new(PollRecords::new())),
        }
    }

    /// Shared handle to the per-director poll records.
    pub fn records(&self) -> Arc<RwLock<PollRecords>> {
        self.records.clone()
    }

    /// Spawn one loop per target. Each loop polls immediately, then once per
    /// interval, forever.
    pub fn start(self) -> Vec<JoinHandle<()>> {
        self.targets
            .into_iter()
            .map(|target| {
                let cache = self.cache.clone();
                let records = self.records.clone();
                tokio::spawn(poll_loop(target, cache, records))
            })
            .collect()
    }
}

async fn poll_loop(target: PollTarget, cache: Arc<Cache>, records: Arc<RwLock<PollRecords>>) {
    let mut interval = tokio::time::interval(target.poll_interval.max(MIN_POLL_INTERVAL));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        poll_once(&target, &cache, &records).await;
    }
}

/// Run one poll cycle for `target`. Returns whether the cache was updated.
pub async fn poll_once(
    target: &PollTarget,
    cache: &Cache,
    records: &RwLock<PollRecords>,
) -> bool {
    let client = target.client.clone();
    let name = client.name().to_owned();
    let outcome = tokio::task::spawn_blocking(move || client.list_deployments())
        .await
        .unwrap_or_else(|err| {
            Err(DirectorError::Transport {
                url: name.clone(),
                message: format!("poll task join error: {err}"),
            })
        });

    match outcome {
        Ok(deployments) => {
            let env = to_environment(target.client.as_ref(), deployments);
            tracing::debug!(
                director = %env.name,
                deployments = env.deployments.len(),
                "polled director",
            );
            cache.update_environment(env).await;
            let mut records = records.write().await;
            let record = records.entry(name).or_default();
            record.last_success_at = Some(Utc::now());
            record.consecutive_failures = 0;
            true
        }
        Err(err) => {
            tracing::error!(
                director = %name,
                error = %err,
                "could not get deployments from director",
            );
            let mut records = records.write().await;
            let record = records.entry(name).or_default();
            record.last_failure_at = Some(Utc::now());
            record.last_error = Some(err.to_string());
            record.consecutive_failures = record.consecutive_failures.saturating_add(1);
            false
        }
    }
}

/// Translate a director's raw inventory into a cache snapshot.
pub fn to_environment(
    client: &dyn DirectorClient,
    deployments: Vec<DirectorDeployment>,
) -> Environment {
    Environment {
        name: client.name().to_owned(),
        uuid: client.uuid().to_owned(),
        deployments: deployments
            .into_iter()
            .map(|deployment| Deployment {
                name: deployment.name,
                releases: deployment
                    .releases
                    .into_iter()
                    .map(|release| Release {
                        name: release.name,
                        version: release.version,
                    })
                    .collect(),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;

    /// Replays a scripted list of responses, repeating the last one.
    struct ScriptedDirector {
        name: String,
        uuid: String,
        script: Mutex<Vec<Result<Vec<DirectorDeployment>, String>>>,
        calls: AtomicUsize,
    }

    impl ScriptedDirector {
        fn new(name: &str, script: Vec<Result<Vec<DirectorDeployment>, String>>) -> Self {
            Self {
                name: name.to_owned(),
                uuid: format!("{name}-uuid"),
                script: Mutex::new(script),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl DirectorClient for ScriptedDirector {
        fn name(&self) -> &str {
            &self.name
        }

        fn uuid(&self) -> &str {
            &self.uuid
        }

        fn list_deployments(&self) -> Result<Vec<DirectorDeployment>, DirectorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut script = self.script.lock().expect("script lock");
            let next = if script.len() > 1 {
                script.remove(0)
            } else {
                script[0].clone()
            };
            next.map_err(|message| DirectorError::Transport {
                url: self.name.clone(),
                message,
            })
        }
    }

    fn deployment(name: &str, version: &str) -> DirectorDeployment {
        DirectorDeployment {
            name: name.to_owned(),
            releases: vec![DirectorRelease {
                name: "app".to_owned(),
                version: version.to_owned(),
            }],
        }
    }

    fn target(director: Arc<ScriptedDirector>, secs: u64) -> PollTarget {
        PollTarget {
            client: director,
            poll_interval: Duration::from_secs(secs),
        }
    }

    #[tokio::test]
    async fn successful_poll_updates_cache_and_record() {
        let director = Arc::new(ScriptedDirector::new(
            "lab",
            vec![Ok(vec![deployment("api-prod", "2.1")])],
        ));
        let cache = Cache::new();
        let records = RwLock::new(PollRecords::new());

        assert!(poll_once(&target(director, 30), &cache, &records).await);

        let envs = cache.get_environments().await;
        assert_eq!(envs.len(), 1);
        assert_eq!(envs[0].name, "lab");
        assert_eq!(envs[0].uuid, "lab-uuid");
        assert_eq!(envs[0].deployments[0].releases[0].version, "2.1");

        let records = records.read().await;
        let record = records.get("lab").expect("record");
        assert!(record.last_success_at.is_some());
        assert_eq!(record.consecutive_failures, 0);
    }

    #[tokio::test]
    async fn failed_poll_keeps_last_good_snapshot() {
        let director = Arc::new(ScriptedDirector::new(
            "lab",
            vec![
                Ok(vec![deployment("api-prod", "2.1")]),
                Err("connection refused".to_owned()),
            ],
        ));
        let cache = Cache::new();
        let records = RwLock::new(PollRecords::new());
        let target = target(director, 30);

        assert!(poll_once(&target, &cache, &records).await);
        assert!(!poll_once(&target, &cache, &records).await);
        assert!(!poll_once(&target, &cache, &records).await);

        let envs = cache.get_environments().await;
        assert_eq!(envs.len(), 1);
        assert_eq!(envs[0].deployments.len(), 1, "stale snapshot retained");

        let records = records.read().await;
        let record = records.get("lab").expect("record");
        assert_eq!(record.consecutive_failures, 2);
        assert!(record
            .last_error
            .as_deref()
            .unwrap_or_default()
            .contains("connection refused"));
    }

    #[tokio::test]
    async fn failed_first_poll_leaves_cache_empty() {
        let director = Arc::new(ScriptedDirector::new(
            "lab",
            vec![Err("unauthorized".to_owned())],
        ));
        let cache = Cache::new();
        let records = RwLock::new(PollRecords::new());

        assert!(!poll_once(&target(director, 30), &cache, &records).await);
        assert!(cache.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn loops_poll_immediately_then_every_interval() {
        let fast = Arc::new(ScriptedDirector::new("fast", vec![Ok(vec![])]));
        let slow = Arc::new(ScriptedDirector::new("slow", vec![Err("down".to_owned())]));
        let cache = Arc::new(Cache::new());
        let scheduler = Scheduler::new(
            vec![target(fast.clone(), 10), target(slow.clone(), 25)],
            cache.clone(),
        );
        let records = scheduler.records();
        let handles = scheduler.start();

        for _ in 0..55 {
            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        assert_eq!(fast.calls.load(Ordering::SeqCst), 6, "t=0,10,20,30,40,50");
        assert_eq!(slow.calls.load(Ordering::SeqCst), 3, "t=0,25,50");
        assert_eq!(cache.len().await, 1, "only the healthy director is cached");
        assert_eq!(
            records.read().await.get("slow").map(|r| r.consecutive_failures),
            Some(3)
        );

        for handle in handles {
            handle.abort();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn zero_interval_is_raised_to_the_minimum() {
        let director = Arc::new(ScriptedDirector::new("zero", vec![Ok(vec![])]));
        let cache = Arc::new(Cache::new());
        let scheduler = Scheduler::new(vec![target(director.clone(), 0)], cache.clone());
        let handles = scheduler.start();

        for _ in 0..5 {
            tokio::time::sleep(Duration::from_millis(500)).await;
        }

        assert!(!handles[0].is_finished(), "poll loop must keep running");
        assert_eq!(cache.len().await, 1);
        assert_eq!(director.calls.load(Ordering::SeqCst), 3, "t=0,1,2");

        for handle in handles {
            handle.abort();
        }
    }
}
