//! Install and activate phases, and precaching.

use futures_util::future::join_all;
use serde::Serialize;

use swcache_core::{CacheKey, Error, Request};

use super::ServiceWorker;

/// Lifecycle position of the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
}

impl WorkerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
        }
    }
}

/// Outcome of a best-effort precache run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PrecacheReport {
    pub cached: usize,
    /// Inputs that could not be fetched or stored.
    pub failed: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivationReport {
    pub current: String,
    /// Buckets removed because their name is not the current version.
    pub deleted: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StartupReport {
    pub precache: PrecacheReport,
    pub activation: ActivationReport,
}

impl ServiceWorker {
    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    async fn set_state(&self, state: WorkerState) {
        tracing::info!(state = state.as_str(), bucket = %self.cache_name(), "worker state changed");
        *self.state.write().await = state;
    }

    /// Open the current bucket and precache the static allow-list.
    ///
    /// Individual failures are logged and reported; installation itself
    /// always completes.
    pub async fn install(&self) -> PrecacheReport {
        self.set_state(WorkerState::Installing).await;

        if let Err(err) = self.store.open_bucket(self.cache_name()).await {
            tracing::warn!(bucket = %self.cache_name(), error = %err, "failed to open bucket");
        }

        let paths = self.config.static_paths.clone();
        let report = self.precache(&paths).await;
        tracing::info!(cached = report.cached, failed = report.failed.len(), "install precache finished");

        self.set_state(WorkerState::Installed).await;
        report
    }

    /// Delete every bucket except the current one and take control.
    pub async fn activate(&self) -> ActivationReport {
        self.set_state(WorkerState::Activating).await;

        let current = self.cache_name().to_string();
        let names = match self.store.bucket_names().await {
            Ok(names) => names,
            Err(err) => {
                tracing::warn!(error = %err, "failed to list buckets");
                Vec::new()
            }
        };

        let mut deleted = Vec::new();
        for name in names.into_iter().filter(|name| *name != current) {
            match self.store.delete_bucket(&name).await {
                Ok(true) => {
                    tracing::info!(bucket = %name, "deleted old bucket");
                    deleted.push(name);
                }
                Ok(false) => {}
                Err(err) => tracing::warn!(bucket = %name, error = %err, "failed to delete old bucket"),
            }
        }

        self.set_state(WorkerState::Activated).await;
        tracing::info!(bucket = %current, "worker activated; claiming clients");
        ActivationReport { current, deleted }
    }

    /// Install, then activate immediately without waiting for old clients.
    pub async fn start(&self) -> StartupReport {
        let precache = self.install().await;
        let activation = self.activate().await;
        StartupReport { precache, activation }
    }

    /// Fetch and store each input concurrently.
    pub(crate) async fn precache(&self, inputs: &[String]) -> PrecacheReport {
        let results = join_all(inputs.iter().map(|input| self.precache_one(input))).await;

        let mut report = PrecacheReport::default();
        for (input, result) in inputs.iter().zip(results) {
            match result {
                Ok(()) => report.cached += 1,
                Err(err) => {
                    tracing::warn!(input = %input, error = %err, "precache failed");
                    report.failed.push(input.clone());
                }
            }
        }
        report
    }

    async fn precache_one(&self, input: &str) -> Result<(), Error> {
        let url = self.resolve(input)?;
        let request = Request::get(url);
        let response = self.network.fetch(&request).await?.error_for_status()?;
        self.bucket.put(&CacheKey::for_request(&request), &response).await
    }
}
