//! Latest known inventory per director.
//!
//! The cache is the single source of truth for "what was last observed". A
//! write either replaces one environment (matched by uuid) or appends one, and
//! is followed by a wakeup to every listener. Reads hand out deep copies so no
//! caller ever holds a lock or aliases cache state.
//!
//! # Wakeups
//!
//! A listener is the sending half of a bounded channel. Wakeups carry no data,
//! so a listener whose slot is still full already has a pending "re-read"
//! and the new wakeup is coalesced into it. With a capacity-1 channel (what
//! [`Cache::subscribe`] creates) every batch of writes is followed by at least
//! one wakeup delivered after the batch, and writers never queue more than one
//! unprocessed rebuild.

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::{Mutex, RwLock};

use crate::types::Environment;

#[derive(Debug, Default)]
pub struct Cache {
    environments: RwLock<Vec<Environment>>,
    listeners: Mutex<Vec<mpsc::Sender<()>>>,
}

impl Cache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a wakeup channel.
    pub async fn add_listener(&self, listener: mpsc::Sender<()>) {
        self.listeners.lock().await.push(listener);
    }

    /// Register and return a fresh single-slot wakeup channel.
    pub async fn subscribe(&self) -> mpsc::Receiver<()> {
        let (tx, rx) = mpsc::channel(1);
        self.add_listener(tx).await;
        rx
    }

    /// Replace the environment with the same uuid, or append it.
    pub async fn update_environment(&self, env: Environment) {
        {
            let mut environments = self.environments.write().await;
            match environments.iter_mut().find(|stored| stored.uuid == env.uuid) {
                Some(stored) => *stored = env,
                None => environments.push(env),
            }
        }
        self.notify_listeners().await;
    }

    /// Deep copy of every stored environment, in first-seen order.
    pub async fn get_environments(&self) -> Vec<Environment> {
        self.environments.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.environments.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.environments.read().await.is_empty()
    }

    async fn notify_listeners(&self) {
        let mut listeners = self.listeners.lock().await;
        listeners.retain(|listener| match listener.try_send(()) {
            Ok(()) | Err(TrySendError::Full(())) => true,
            Err(TrySendError::Closed(())) => {
                tracing::debug!("dropping closed cache listener");
                false
            }
        });
    }
}
