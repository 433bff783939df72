//! The three caching strategies.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use swcache_core::classify::is_html_page;
use swcache_core::policy::is_fresh;
use swcache_core::{CacheKey, Error, Request, Response};

use super::{ResponseSource, ServiceWorker, fetch_and_store};

/// Body of the synthesized 503 for HTML pages.
pub(crate) const OFFLINE_MESSAGE: &str = "Page unavailable offline";

type Outcome = (ResponseSource, Response);

impl ServiceWorker {
    /// Serve a fresh cached entry, otherwise fetch and store.
    pub(crate) async fn cache_first(&self, request: &Request, max_age: Duration) -> Result<Outcome, Error> {
        let key = CacheKey::for_request(request);

        if let Some(cached) = self.bucket.lookup(&key).await {
            if is_fresh(&cached, max_age, Utc::now()) {
                tracing::debug!(url = %request.url, "cache hit");
                return Ok((ResponseSource::Cache, cached));
            }
            tracing::debug!(url = %request.url, "cached entry is stale");
        }

        let fetched = fetch_and_store(self.network.as_ref(), &self.bucket, request, &key)
            .await
            .and_then(Response::error_for_status);
        match fetched {
            Ok(response) => Ok((ResponseSource::Network, response)),
            Err(err) if err.is_network() && is_html_page(&request.url) => {
                tracing::warn!(url = %request.url, error = %err, "cache-first fetch failed; serving offline fallback");
                Ok(self.offline_fallback(request).await)
            }
            Err(err) => {
                tracing::warn!(url = %request.url, error = %err, "cache-first fetch failed");
                Err(err)
            }
        }
    }

    /// Race the network against `timeout`; fall back to the bucket.
    ///
    /// A non-2xx answer counts as a failure; it is returned only when nothing
    /// is cached. A fetch that loses the race is not aborted. If it later
    /// succeeds it still updates the bucket.
    pub(crate) async fn network_first(&self, request: &Request, timeout: Duration) -> Result<Outcome, Error> {
        let key = CacheKey::for_request(request);
        let mut fetch = {
            let network = Arc::clone(&self.network);
            let bucket = self.bucket.clone();
            let request = request.clone();
            let key = key.clone();
            tokio::spawn(async move { fetch_and_store(network.as_ref(), &bucket, &request, &key).await })
        };

        let raced = tokio::time::timeout(timeout, &mut fetch).await;
        let (err, upstream) = match raced {
            Ok(Ok(Ok(response))) if response.ok() => {
                tracing::debug!(url = %request.url, status = response.status, "network response");
                return Ok((ResponseSource::Network, response));
            }
            Ok(Ok(Ok(response))) => (response.status_error(), Some(response)),
            Ok(Ok(Err(err))) => (err, None),
            Ok(Err(join_err)) => (Error::Network(format!("fetch task failed: {join_err}")), None),
            Err(_) => {
                let url = request.url.to_string();
                self.background
                    .spawn(async move {
                        match fetch.await {
                            Ok(Ok(response)) => {
                                tracing::debug!(url = %url, status = response.status, "late network response")
                            }
                            Ok(Err(err)) => tracing::debug!(url = %url, error = %err, "late network fetch failed"),
                            Err(err) => tracing::warn!(url = %url, error = %err, "late network fetch task failed"),
                        }
                    })
                    .await;
                (Error::FetchTimeout(format!("{} after {}ms", request.url, timeout.as_millis())), None)
            }
        };

        tracing::debug!(url = %request.url, error = %err, "network unavailable; trying cache");
        match (self.bucket.lookup(&key).await, upstream) {
            (Some(cached), _) => Ok((ResponseSource::Cache, cached)),
            (None, Some(response)) => Ok((ResponseSource::Network, response)),
            (None, None) => Err(err),
        }
    }

    /// Serve any cached entry now and refresh it in the background.
    ///
    /// With nothing cached the caller waits for the same fetch that would
    /// have refreshed the entry, and gets its response whatever the status.
    pub(crate) async fn stale_while_revalidate(&self, request: &Request) -> Result<Outcome, Error> {
        let key = CacheKey::for_request(request);
        let cached = self.bucket.lookup(&key).await;

        let revalidation = {
            let network = Arc::clone(&self.network);
            let bucket = self.bucket.clone();
            let request = request.clone();
            let key = key.clone();
            tokio::spawn(async move { fetch_and_store(network.as_ref(), &bucket, &request, &key).await })
        };

        if let Some(cached) = cached {
            let url = request.url.to_string();
            self.background
                .spawn(async move {
                    match revalidation.await {
                        Ok(Ok(response)) if response.ok() => {
                            tracing::debug!(url = %url, status = response.status, "background revalidation done")
                        }
                        Ok(Ok(response)) => {
                            tracing::info!(url = %url, status = response.status, "background revalidation failed")
                        }
                        Ok(Err(err)) => tracing::info!(url = %url, error = %err, "background revalidation failed"),
                        Err(err) => tracing::warn!(url = %url, error = %err, "background revalidation task failed"),
                    }
                })
                .await;
            tracing::debug!(url = %request.url, "serving cached entry");
            return Ok((ResponseSource::Cache, cached));
        }

        let err = match revalidation.await {
            Ok(Ok(response)) => return Ok((ResponseSource::Network, response)),
            Ok(Err(err)) => err,
            Err(join_err) => Error::Network(format!("fetch task failed: {join_err}")),
        };

        if err.is_network() && is_html_page(&request.url) {
            tracing::warn!(url = %request.url, error = %err, "page not cached and network failed; serving offline fallback");
            Ok(self.offline_fallback(request).await)
        } else {
            Err(err)
        }
    }

    /// Cached offline page, or a synthesized 503.
    pub(crate) async fn offline_fallback(&self, request: &Request) -> Outcome {
        let key = CacheKey::get(&self.config.offline_url);
        match self.bucket.lookup(&key).await {
            Some(page) => (ResponseSource::OfflinePage, page),
            None => (ResponseSource::Synthesized, Response::service_unavailable(request.url.as_str(), OFFLINE_MESSAGE)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::super::testing::{ScriptedNetwork, seed, stored_body, worker_with};
    use super::*;

    fn minutes(n: i64) -> chrono::Duration {
        chrono::Duration::minutes(n)
    }

    #[tokio::test]
    async fn test_cache_first_fresh_hit_skips_network() {
        let network = ScriptedNetwork::new();
        let worker = worker_with(network.clone()).await;
        seed(&worker, "/css/style.css", "body{}", minutes(10)).await;

        let url = worker.resolve("/css/style.css").unwrap();
        let served = worker.handle_fetch(&Request::get(url)).await.unwrap().unwrap();

        assert_eq!(served.source, ResponseSource::Cache);
        assert_eq!(served.response.body_text(), Some("body{}"));
        assert_eq!(network.calls(), 0);
    }

    #[tokio::test]
    async fn test_cache_first_stale_entry_refetched_and_overwritten() {
        let network = ScriptedNetwork::new();
        let worker = worker_with(network.clone()).await;
        seed(&worker, "/css/style.css", "old", minutes(120)).await;
        let url = worker.resolve("/css/style.css").unwrap();
        network.respond(url.as_str(), 200, "new");

        let before = worker.bucket.lookup(&CacheKey::get(&url)).await.unwrap().captured_at().unwrap();
        let served = worker.handle_fetch(&Request::get(url.clone())).await.unwrap().unwrap();

        assert_eq!(served.source, ResponseSource::Network);
        assert_eq!(served.response.body_text(), Some("new"));
        assert_eq!(network.calls(), 1);

        let after = worker.bucket.lookup(&CacheKey::get(&url)).await.unwrap();
        assert_eq!(after.body_text(), Some("new"));
        assert!(after.captured_at().unwrap() > before);
    }

    #[tokio::test]
    async fn test_cache_first_error_status_propagates_and_is_not_stored() {
        let network = ScriptedNetwork::new();
        let worker = worker_with(network.clone()).await;
        let url = worker.resolve("/images/missing.png").unwrap();
        network.respond(url.as_str(), 404, "nope");

        let result = worker.handle_fetch(&Request::get(url)).await;

        assert!(matches!(result, Err(Error::Network(_))));
        assert_eq!(stored_body(&worker, "/images/missing.png").await, None);
    }

    #[tokio::test]
    async fn test_cache_first_error_status_html_serves_offline_page() {
        let network = ScriptedNetwork::new();
        let worker = worker_with(network.clone()).await;
        seed(&worker, "/offline.html", "<h1>offline</h1>", minutes(1)).await;
        let url = worker.resolve("/").unwrap();
        network.respond(url.as_str(), 500, "boom");

        let served = worker.handle_fetch(&Request::get(url)).await.unwrap().unwrap();

        assert_eq!(served.source, ResponseSource::OfflinePage);
        assert_eq!(served.response.body_text(), Some("<h1>offline</h1>"));
        assert_eq!(stored_body(&worker, "/").await, None);
    }

    #[tokio::test]
    async fn test_cache_first_error_status_html_without_page_synthesizes_503() {
        let network = ScriptedNetwork::new();
        let worker = worker_with(network.clone()).await;
        let url = worker.resolve("/").unwrap();
        network.respond(url.as_str(), 502, "bad gateway");

        let served = worker.handle_fetch(&Request::get(url)).await.unwrap().unwrap();

        assert_eq!(served.source, ResponseSource::Synthesized);
        assert_eq!(served.response.body_text(), Some(OFFLINE_MESSAGE));
    }

    #[tokio::test]
    async fn test_cache_first_offline_non_html_propagates() {
        let network = ScriptedNetwork::new();
        let worker = worker_with(network.clone()).await;
        let url = worker.resolve("/js/script.js").unwrap();

        let result = worker.handle_fetch(&Request::get(url)).await;
        assert!(matches!(result, Err(Error::Network(_))));
    }

    #[tokio::test]
    async fn test_cache_first_offline_html_serves_offline_page() {
        let network = ScriptedNetwork::new();
        let worker = worker_with(network.clone()).await;
        seed(&worker, "/offline.html", "<h1>offline</h1>", minutes(1)).await;
        let url = worker.resolve("/").unwrap();

        let served = worker.handle_fetch(&Request::get(url)).await.unwrap().unwrap();
        assert_eq!(served.source, ResponseSource::OfflinePage);
        assert_eq!(served.response.body_text(), Some("<h1>offline</h1>"));
    }

    #[tokio::test]
    async fn test_cache_first_offline_html_without_page_synthesizes_503() {
        let network = ScriptedNetwork::new();
        let worker = worker_with(network.clone()).await;
        let url = worker.resolve("/").unwrap();

        let served = worker.handle_fetch(&Request::get(url)).await.unwrap().unwrap();
        assert_eq!(served.source, ResponseSource::Synthesized);
        assert_eq!(served.response.status, 503);
        assert_eq!(served.response.body_text(), Some(OFFLINE_MESSAGE));
    }

    #[tokio::test]
    async fn test_network_first_fast_network_updates_bucket() {
        let network = ScriptedNetwork::new();
        let worker = worker_with(network.clone()).await;
        seed(&worker, "/api/items", "cached", minutes(5)).await;
        let url = worker.resolve("/api/items").unwrap();
        network.respond(url.as_str(), 200, "fresh");

        let served = worker.handle_fetch(&Request::get(url)).await.unwrap().unwrap();

        assert_eq!(served.source, ResponseSource::Network);
        assert_eq!(served.response.body_text(), Some("fresh"));
        assert_eq!(stored_body(&worker, "/api/items").await.as_deref(), Some("fresh"));
    }

    #[tokio::test]
    async fn test_network_first_timeout_serves_cache_and_late_result_is_harmless() {
        let network = ScriptedNetwork::new();
        let worker = worker_with(network.clone()).await;
        seed(&worker, "/api/items", "cached", minutes(5)).await;
        let url = worker.resolve("/api/items").unwrap();
        network.respond_after(url.as_str(), 200, "late", Duration::from_millis(400));

        let served = worker.handle_fetch(&Request::get(url)).await.unwrap().unwrap();
        assert_eq!(served.source, ResponseSource::Cache);
        assert_eq!(served.response.body_text(), Some("cached"));
        assert_eq!(network.completed(), 0);

        assert_eq!(worker.drain_background().await, 1);
        assert_eq!(network.completed(), 1);
        assert_eq!(stored_body(&worker, "/api/items").await.as_deref(), Some("late"));
    }

    #[tokio::test]
    async fn test_network_first_error_status_falls_back_to_cache() {
        let network = ScriptedNetwork::new();
        let worker = worker_with(network.clone()).await;
        seed(&worker, "/api/items", "cached", minutes(5)).await;
        let url = worker.resolve("/api/items").unwrap();
        network.respond(url.as_str(), 503, "upstream down");

        let served = worker.handle_fetch(&Request::get(url)).await.unwrap().unwrap();

        assert_eq!(served.source, ResponseSource::Cache);
        assert_eq!(served.response.status, 200);
        assert_eq!(served.response.body_text(), Some("cached"));
        assert_eq!(stored_body(&worker, "/api/items").await.as_deref(), Some("cached"));
    }

    #[tokio::test]
    async fn test_network_first_error_status_without_cache_is_returned() {
        let network = ScriptedNetwork::new();
        let worker = worker_with(network.clone()).await;
        let url = worker.resolve("/api/items").unwrap();
        network.respond(url.as_str(), 503, "upstream down");

        let served = worker.handle_fetch(&Request::get(url)).await.unwrap().unwrap();

        assert_eq!(served.source, ResponseSource::Network);
        assert_eq!(served.response.status, 503);
        assert_eq!(stored_body(&worker, "/api/items").await, None);
    }

    #[tokio::test]
    async fn test_network_first_failure_without_cache_propagates() {
        let network = ScriptedNetwork::new();
        let worker = worker_with(network.clone()).await;
        let url = worker.resolve("/api/items").unwrap();

        let result = worker.handle_fetch(&Request::get(url)).await;
        assert!(matches!(result, Err(Error::Network(_))));
    }

    #[tokio::test]
    async fn test_network_first_timeout_without_cache_is_timeout() {
        let network = ScriptedNetwork::new();
        let worker = worker_with(network.clone()).await;
        let url = worker.resolve("/api/slow").unwrap();
        network.respond_after(url.as_str(), 200, "late", Duration::from_millis(400));

        let result = worker.handle_fetch(&Request::get(url)).await;
        assert!(matches!(result, Err(Error::FetchTimeout(_))));
        worker.drain_background().await;
    }

    #[tokio::test]
    async fn test_swr_returns_cached_before_revalidation_completes() {
        let network = ScriptedNetwork::new();
        let worker = worker_with(network.clone()).await;
        seed(&worker, "/gallery.html", "old", minutes(600)).await;
        let url = worker.resolve("/gallery.html").unwrap();
        network.respond_after(url.as_str(), 200, "new", Duration::from_millis(300));

        let start = Instant::now();
        let served = worker.handle_fetch(&Request::get(url.clone())).await.unwrap().unwrap();
        assert_eq!(served.source, ResponseSource::Cache);
        assert_eq!(served.response.body_text(), Some("old"));
        assert_eq!(network.completed(), 0);
        assert!(start.elapsed() < Duration::from_millis(300));

        worker.drain_background().await;

        let served = worker.handle_fetch(&Request::get(url)).await.unwrap().unwrap();
        assert_eq!(served.source, ResponseSource::Cache);
        assert_eq!(served.response.body_text(), Some("new"));
        worker.drain_background().await;
    }

    #[tokio::test]
    async fn test_swr_revalidation_failure_is_silent() {
        let network = ScriptedNetwork::new();
        let worker = worker_with(network.clone()).await;
        seed(&worker, "/gallery.html", "old", minutes(1)).await;
        network.fail(worker.resolve("/gallery.html").unwrap().as_str());

        let url = worker.resolve("/gallery.html").unwrap();
        let served = worker.handle_fetch(&Request::get(url)).await.unwrap().unwrap();
        assert_eq!(served.response.body_text(), Some("old"));

        assert_eq!(worker.drain_background().await, 1);
        assert_eq!(stored_body(&worker, "/gallery.html").await.as_deref(), Some("old"));
    }

    #[tokio::test]
    async fn test_swr_error_status_keeps_cached_entry() {
        let network = ScriptedNetwork::new();
        let worker = worker_with(network.clone()).await;
        seed(&worker, "/gallery.html", "old", minutes(1)).await;
        let url = worker.resolve("/gallery.html").unwrap();
        network.respond(url.as_str(), 500, "boom");

        let served = worker.handle_fetch(&Request::get(url)).await.unwrap().unwrap();
        assert_eq!(served.source, ResponseSource::Cache);

        assert_eq!(worker.drain_background().await, 1);
        assert_eq!(stored_body(&worker, "/gallery.html").await.as_deref(), Some("old"));
    }

    #[tokio::test]
    async fn test_swr_cold_cache_error_status_is_returned() {
        let network = ScriptedNetwork::new();
        let worker = worker_with(network.clone()).await;
        let url = worker.resolve("/missing.html").unwrap();
        network.respond(url.as_str(), 404, "not here");

        let served = worker.handle_fetch(&Request::get(url)).await.unwrap().unwrap();

        assert_eq!(served.source, ResponseSource::Network);
        assert_eq!(served.response.status, 404);
        assert_eq!(stored_body(&worker, "/missing.html").await, None);
    }

    #[tokio::test]
    async fn test_swr_cold_cache_then_cached_copy() {
        let network = ScriptedNetwork::new();
        let worker = worker_with(network.clone()).await;
        let url = worker.resolve("/index.html").unwrap();
        network.respond(url.as_str(), 200, "<html>home</html>");

        let first = worker.handle_fetch(&Request::get(url.clone())).await.unwrap().unwrap();
        assert_eq!(first.class, swcache_core::ResourceClass::Html);
        assert_eq!(first.source, ResponseSource::Network);
        assert_eq!(first.response.body_text(), Some("<html>home</html>"));
        assert_eq!(network.calls(), 1);

        network.respond_after(url.as_str(), 200, "<html>home v2</html>", Duration::from_millis(300));
        let second = worker.handle_fetch(&Request::get(url)).await.unwrap().unwrap();
        assert_eq!(second.source, ResponseSource::Cache);
        assert_eq!(second.response.body_text(), Some("<html>home</html>"));
        assert_eq!(network.completed(), 1);

        worker.drain_background().await;
        assert_eq!(network.calls(), 2);
    }

    #[tokio::test]
    async fn test_swr_cold_cache_offline_html_falls_back() {
        let network = ScriptedNetwork::new();
        let worker = worker_with(network.clone()).await;
        let url = worker.resolve("/gallery.html").unwrap();

        let served = worker.handle_fetch(&Request::get(url)).await.unwrap().unwrap();
        assert_eq!(served.source, ResponseSource::Synthesized);
        assert_eq!(served.response.status, 503);
    }

    #[tokio::test]
    async fn test_swr_cold_cache_offline_other_propagates() {
        let network = ScriptedNetwork::new();
        let worker = worker_with(network.clone()).await;
        let url = worker.resolve("/models/vase.glb").unwrap();

        let result = worker.handle_fetch(&Request::get(url)).await;
        assert!(matches!(result, Err(Error::Network(_))));
    }
}
