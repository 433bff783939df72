//! The cache engine: request interception, caching strategies, bucket
//! lifecycle and the page control protocol.
//!
//! ### Flow
//! - Non-GET requests are not intercepted.
//! - GET requests are classified by URL shape, mapped to a [`CachePolicy`]
//!   and served by the matching strategy.
//! - Storage failures never fail a request: a failed read is a miss and a
//!   failed write is skipped.
//!
//! ### Background work
//! Stale-while-revalidate refreshes and network-first fetches that lost
//! their race keep running after the response is returned. They are tracked
//! so the host can wait for them with [`ServiceWorker::drain_background`].

mod control;
mod lifecycle;
mod notify;
mod strategy;
mod tasks;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::RwLock;
use url::Url;

use swcache_core::{
    AppConfig, CacheDb, CacheKey, CachePolicy, Classifier, ConfigError, Error, PolicyTable, Request, ResourceClass,
    Response,
};

use crate::fetch::{Network, resolve};

pub use lifecycle::{ActivationReport, PrecacheReport, StartupReport, WorkerState};
pub use notify::{BACKGROUND_SYNC_TAG, DEFAULT_CLICK_URL, Notification, NotificationData, NotificationTemplate};

use tasks::BackgroundTasks;

/// Immutable engine configuration, built once and injected at construction.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Name of the current bucket.
    pub cache_version: String,
    pub origin: Url,
    pub offline_url: Url,
    /// Installation allow-list, relative to `origin`.
    pub static_paths: Vec<String>,
    pub classifier: Classifier,
    pub policies: PolicyTable,
    pub notification: NotificationTemplate,
}

impl WorkerConfig {
    /// Derive the engine configuration from the loaded application config.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the origin or offline page cannot be parsed.
    pub fn from_app(config: &AppConfig) -> Result<Self, ConfigError> {
        let origin = config.origin_url()?;
        let offline_url = origin
            .join(&config.offline_page)
            .map_err(|e| ConfigError::Invalid { field: "offline_page".into(), reason: e.to_string() })?;

        Ok(Self {
            cache_version: config.cache_version.clone(),
            origin,
            offline_url,
            static_paths: config.static_paths.clone(),
            classifier: Classifier::from_config(config),
            policies: PolicyTable::from_config(config),
            notification: NotificationTemplate {
                title: config.notification_title.clone(),
                body: config.notification_body.clone(),
                icon: config.notification_icon.clone(),
            },
        })
    }
}

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    Cache,
    Network,
    /// The pre-cached offline page, substituted for an unreachable HTML page.
    OfflinePage,
    /// Generated 503 when neither network nor offline page is available.
    Synthesized,
}

impl ResponseSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseSource::Cache => "cache",
            ResponseSource::Network => "network",
            ResponseSource::OfflinePage => "offline_page",
            ResponseSource::Synthesized => "synthesized",
        }
    }
}

/// Result of an intercepted request.
#[derive(Debug, Clone)]
pub struct Served {
    pub class: ResourceClass,
    pub policy: CachePolicy,
    pub source: ResponseSource,
    pub response: Response,
}

/// Handle on one named bucket of the store.
///
/// Cheap to clone; spawned strategy tasks carry their own copy.
#[derive(Debug, Clone)]
pub(crate) struct Bucket {
    store: CacheDb,
    name: Arc<str>,
}

impl Bucket {
    fn new(store: CacheDb, name: &str) -> Self {
        Self { store, name: Arc::from(name) }
    }

    /// Read an entry, treating storage failures as a miss.
    async fn lookup(&self, key: &CacheKey) -> Option<Response> {
        match self.store.match_entry(&self.name, key).await {
            Ok(found) => found,
            Err(err) => {
                tracing::warn!(bucket = %self.name, url = %key.url, error = %err, "cache read failed; treating as miss");
                None
            }
        }
    }

    /// Store a response, stamping a capture time if it has none.
    async fn put(&self, key: &CacheKey, response: &Response) -> Result<(), Error> {
        let mut stored = response.clone();
        stored.ensure_date(Utc::now());
        self.store.put_entry(&self.name, key, &stored).await
    }
}

/// Fetch `request` and store a 2xx response under `key`.
///
/// Write failures are logged and skipped; the response is returned either way.
async fn fetch_and_store(
    network: &dyn Network, bucket: &Bucket, request: &Request, key: &CacheKey,
) -> Result<Response, Error> {
    let response = network.fetch(request).await?;
    if response.ok() {
        match bucket.put(key, &response).await {
            Ok(()) => tracing::debug!(url = %key.url, status = response.status, "stored network response"),
            Err(err) => tracing::warn!(url = %key.url, error = %err, "cache write failed; skipping"),
        }
    }
    Ok(response)
}

/// The cache engine.
pub struct ServiceWorker {
    config: Arc<WorkerConfig>,
    store: CacheDb,
    bucket: Bucket,
    network: Arc<dyn Network>,
    state: RwLock<WorkerState>,
    background: BackgroundTasks,
}

impl ServiceWorker {
    pub fn new(config: WorkerConfig, store: CacheDb, network: Arc<dyn Network>) -> Self {
        let bucket = Bucket::new(store.clone(), &config.cache_version);
        Self {
            config: Arc::new(config),
            store,
            bucket,
            network,
            state: RwLock::new(WorkerState::Parsed),
            background: BackgroundTasks::default(),
        }
    }

    pub fn store(&self) -> &CacheDb {
        &self.store
    }

    /// Name of the current bucket.
    pub fn cache_name(&self) -> &str {
        &self.config.cache_version
    }

    pub fn classify(&self, url: &Url) -> ResourceClass {
        self.config.classifier.classify(url)
    }

    /// Resolve a page-supplied URL against the worker origin.
    pub fn resolve(&self, raw: &str) -> Result<Url, Error> {
        resolve(&self.config.origin, raw).map_err(|e| Error::InvalidUrl(e.to_string()))
    }

    /// Handle a fetch event.
    ///
    /// Returns `Ok(None)` when the request is not intercepted (any method
    /// other than GET); the host then performs it unchanged.
    ///
    /// # Errors
    ///
    /// Propagates the network error when a non-HTML request can be served
    /// neither from the network nor from the bucket.
    pub async fn handle_fetch(&self, request: &Request) -> Result<Option<Served>, Error> {
        if !request.is_get() {
            tracing::debug!(method = %request.method, url = %request.url, "not intercepted");
            return Ok(None);
        }

        let class = self.classify(&request.url);
        let policy = self.config.policies.policy_for(class);
        tracing::debug!(url = %request.url, %class, policy = policy.name(), "intercepted");

        let (source, response) = match policy {
            CachePolicy::CacheFirst { max_age } => self.cache_first(request, max_age).await?,
            CachePolicy::NetworkFirst { timeout } => self.network_first(request, timeout).await?,
            CachePolicy::StaleWhileRevalidate => self.stale_while_revalidate(request).await?,
        };

        Ok(Some(Served { class, policy, source, response }))
    }

    /// Perform a request the worker does not intercept, bypassing every bucket.
    pub async fn passthrough(&self, request: &Request) -> Result<Response, Error> {
        self.network.fetch(request).await
    }

    /// Wait for all tracked background work. Returns how many tasks were joined.
    pub async fn drain_background(&self) -> usize {
        self.background.drain().await
    }

    /// Background tasks not yet joined.
    pub async fn pending_background(&self) -> usize {
        self.background.pending().await
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{ScriptedNetwork, worker_with};
    use super::*;

    #[test]
    fn test_worker_config_from_app() {
        let config = WorkerConfig::from_app(&AppConfig::default()).unwrap();
        assert_eq!(config.cache_version, "heritage-site-v1.0.0");
        assert_eq!(config.offline_url.as_str(), "http://localhost:8080/offline.html");
        assert_eq!(config.static_paths.len(), 19);
    }

    #[test]
    fn test_worker_config_rejects_bad_origin() {
        let app = AppConfig { origin: "localhost".into(), ..Default::default() };
        assert!(WorkerConfig::from_app(&app).is_err());
    }

    #[tokio::test]
    async fn test_non_get_not_intercepted() {
        let network = ScriptedNetwork::new();
        let worker = worker_with(network.clone()).await;
        let url = worker.resolve("/api/items").unwrap();

        let request = Request::new("POST", url.clone());
        let result = worker.handle_fetch(&request).await.unwrap();
        assert!(result.is_none());
        assert_eq!(network.calls(), 0);

        network.respond(url.as_str(), 201, "created");
        let response = worker.passthrough(&request).await.unwrap();
        assert_eq!(response.status, 201);
        assert_eq!(super::testing::stored_body(&worker, "/api/items").await, None);
    }

    #[tokio::test]
    async fn test_served_carries_class_and_policy() {
        let network = ScriptedNetwork::new();
        let worker = worker_with(network.clone()).await;
        let url = worker.resolve("/images/hero.jpg").unwrap();
        network.respond(url.as_str(), 200, "jpeg");

        let served = worker.handle_fetch(&Request::get(url)).await.unwrap().unwrap();
        assert_eq!(served.class, ResourceClass::Image);
        assert!(matches!(served.policy, CachePolicy::CacheFirst { .. }));
        assert_eq!(served.source, ResponseSource::Network);
    }

    #[tokio::test]
    async fn test_put_stamps_missing_date() {
        let worker = worker_with(ScriptedNetwork::new()).await;
        let key = CacheKey::get(&worker.resolve("/x.html").unwrap());

        worker.bucket.put(&key, &Response::new(key.url.clone(), 200, "x")).await.unwrap();

        let stored = worker.bucket.lookup(&key).await.unwrap();
        assert!(stored.captured_at().is_some());
    }
}
