//! Scripted network and worker fixtures for engine tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use swcache_core::http::http_date;
use swcache_core::{AppConfig, CacheDb, CacheKey, Error, Request, Response};

use super::{ServiceWorker, WorkerConfig};
use crate::fetch::Network;

#[derive(Debug, Clone)]
enum Route {
    Respond { response: Response, delay: Duration },
    Fail,
}

/// In-process network: routes are exact URLs, anything unrouted is offline.
#[derive(Debug, Default)]
pub(crate) struct ScriptedNetwork {
    routes: Mutex<HashMap<String, Route>>,
    calls: AtomicUsize,
    completed: AtomicUsize,
}

impl ScriptedNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, url: &str, status: u16, body: &str) {
        self.respond_after(url, status, body, Duration::ZERO);
    }

    pub fn respond_after(&self, url: &str, status: u16, body: &str, delay: Duration) {
        let response = Response::new(url, status, body.as_bytes().to_vec()).with_header("date", http_date(Utc::now()));
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), Route::Respond { response, delay });
    }

    pub fn fail(&self, url: &str) {
        self.routes.lock().unwrap().insert(url.to_string(), Route::Fail);
    }

    /// Fetches started.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Fetches that produced a response.
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Network for ScriptedNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let route = self.routes.lock().unwrap().get(request.url.as_str()).cloned();
        match route {
            Some(Route::Respond { response, delay }) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                self.completed.fetch_add(1, Ordering::SeqCst);
                Ok(response)
            }
            Some(Route::Fail) | None => Err(Error::Network(format!("unreachable: {}", request.url))),
        }
    }
}

/// Config with a short allow-list and a 100ms network-first deadline.
pub(crate) fn test_config() -> WorkerConfig {
    let app = AppConfig {
        cache_version: "v2".into(),
        static_paths: vec!["/".into(), "/css/style.css".into(), "/js/script.js".into()],
        network_timeout_ms: 100,
        ..Default::default()
    };
    WorkerConfig::from_app(&app).unwrap()
}

pub(crate) async fn worker_with(network: Arc<ScriptedNetwork>) -> ServiceWorker {
    let store = CacheDb::open_in_memory().await.unwrap();
    ServiceWorker::new(test_config(), store, network)
}

/// Put `body` into the current bucket for `path`, captured `age` ago.
pub(crate) async fn seed(worker: &ServiceWorker, path: &str, body: &str, age: chrono::Duration) {
    let url = worker.resolve(path).unwrap();
    let response = Response::new(url.as_str(), 200, body.as_bytes().to_vec())
        .with_header("date", http_date(Utc::now() - age));
    worker
        .store
        .put_entry(worker.cache_name(), &CacheKey::get(&url), &response)
        .await
        .unwrap();
}

/// Stored body for `path` in the current bucket.
pub(crate) async fn stored_body(worker: &ServiceWorker, path: &str) -> Option<String> {
    let url = worker.resolve(path).unwrap();
    worker
        .store
        .match_entry(worker.cache_name(), &CacheKey::get(&url))
        .await
        .unwrap()
        .map(|r| String::from_utf8(r.body).unwrap())
}
