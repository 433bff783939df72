//! Page-to-worker control messages.

use swcache_core::{ControlMessage, ControlReply, Error};

use super::{PrecacheReport, ServiceWorker};

impl ServiceWorker {
    /// Dispatch a control message. Only `GET_CACHE_SIZE` produces a reply.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the cache size cannot be read.
    pub async fn handle_message(&self, message: ControlMessage) -> Result<Option<ControlReply>, Error> {
        tracing::debug!(kind = message.kind(), "control message");
        match message {
            ControlMessage::CacheUrls { urls } => {
                self.cache_urls(&urls).await;
                Ok(None)
            }
            ControlMessage::ClearCache => {
                self.clear_cache().await;
                Ok(None)
            }
            ControlMessage::GetCacheSize => {
                let size = self.cache_size().await?;
                Ok(Some(ControlReply::CacheSize { size }))
            }
        }
    }

    /// Add each URL to the current bucket, best-effort.
    pub async fn cache_urls(&self, urls: &[String]) -> PrecacheReport {
        let report = self.precache(urls).await;
        tracing::info!(cached = report.cached, failed = report.failed.len(), "cached urls on request");
        report
    }

    /// Delete every bucket, the current one included. Returns how many were removed.
    ///
    /// A later write to the current bucket recreates it.
    pub async fn clear_cache(&self) -> usize {
        let names = match self.store.bucket_names().await {
            Ok(names) => names,
            Err(err) => {
                tracing::warn!(error = %err, "failed to list buckets");
                return 0;
            }
        };

        let mut cleared = 0;
        for name in names {
            match self.store.delete_bucket(&name).await {
                Ok(true) => cleared += 1,
                Ok(false) => {}
                Err(err) => tracing::warn!(bucket = %name, error = %err, "failed to delete bucket"),
            }
        }
        tracing::info!(cleared, "cleared all buckets");
        cleared
    }

    /// Sum of stored body lengths in the current bucket.
    pub async fn cache_size(&self) -> Result<u64, Error> {
        self.store.bucket_size(self.cache_name()).await
    }
}
