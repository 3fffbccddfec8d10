//! Signalfire core: director inventory aggregation.
//!
//! - [`cache`]: latest snapshot per director, with change wakeups
//! - [`collator`]: rebuilds deployment groups on every cache change
//! - [`group`]: per-group deployment / release / version bookkeeping
//! - [`rule`]: ordered naming rules that pick a deployment's group
//! - [`scheduler`]: one poll loop per director
//! - [`version`]: release version ordering
//! - [`config`]: YAML configuration
//! - [`error`]: [`CoreError`], [`DirectorError`]

pub mod cache;
pub mod collator;
pub mod config;
pub mod error;
pub mod group;
pub mod rule;
pub mod scheduler;
pub mod types;
pub mod version;

pub use cache::Cache;
pub use collator::{Collator, CollatorState};
pub use config::Config;
pub use error::{CoreError, DirectorError};
pub use group::DeploymentGroup;
pub use rule::{CollationRule, RegexCaptureRule, RuleSet};
pub use scheduler::{
    DirectorClient, DirectorDeployment, DirectorRelease, PollRecord, PollRecords, PollTarget,
    Scheduler,
};
pub use types::{
    CollatedDeployment, CollatedRelease, CollatedVersion, Deployment, DeploymentId,
    DeploymentInput, Environment, Release,
};
