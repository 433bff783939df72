//! Per-class cache policies.
//!
//! Every [`ResourceClass`] maps to exactly one [`CachePolicy`]; the mapping is
//! an exhaustive `match`, so adding a class without a policy does not compile.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::classify::ResourceClass;
use crate::config::AppConfig;
use crate::http::Response;

/// How a request of a given class is served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CachePolicy {
    /// Serve a cached entry younger than `max_age`, otherwise fetch and store.
    CacheFirst {
        #[serde(with = "duration_ms")]
        max_age: Duration,
    },
    /// Race the network against `timeout`, fall back to the cached entry.
    NetworkFirst {
        #[serde(with = "duration_ms")]
        timeout: Duration,
    },
    /// Serve any cached entry immediately and refresh it in the background.
    StaleWhileRevalidate,
}

impl CachePolicy {
    pub fn name(&self) -> &'static str {
        match self {
            CachePolicy::CacheFirst { .. } => "cache_first",
            CachePolicy::NetworkFirst { .. } => "network_first",
            CachePolicy::StaleWhileRevalidate => "stale_while_revalidate",
        }
    }
}

/// TTLs and timeouts the policy table is parameterised by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyTable {
    pub static_max_age: Duration,
    pub image_max_age: Duration,
    pub font_max_age: Duration,
    pub network_timeout: Duration,
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl PolicyTable {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            static_max_age: Duration::from_millis(config.static_max_age_ms),
            image_max_age: Duration::from_millis(config.image_max_age_ms),
            font_max_age: Duration::from_millis(config.font_max_age_ms),
            network_timeout: config.network_timeout(),
        }
    }

    pub fn policy_for(&self, class: ResourceClass) -> CachePolicy {
        match class {
            ResourceClass::Static => CachePolicy::CacheFirst { max_age: self.static_max_age },
            ResourceClass::Image => CachePolicy::CacheFirst { max_age: self.image_max_age },
            ResourceClass::Font => CachePolicy::CacheFirst { max_age: self.font_max_age },
            ResourceClass::Api => CachePolicy::NetworkFirst { timeout: self.network_timeout },
            ResourceClass::Html | ResourceClass::Other => CachePolicy::StaleWhileRevalidate,
        }
    }
}

/// Cache-first freshness: `now - captured < max_age`.
///
/// An entry without a readable capture time is never fresh.
pub fn is_fresh(response: &Response, max_age: Duration, now: DateTime<Utc>) -> bool {
    let Some(captured) = response.captured_at() else {
        return false;
    };
    let Ok(max_age) = chrono::Duration::from_std(max_age) else {
        return true;
    };
    now.signed_duration_since(captured) < max_age
}

mod duration_ms {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }
}
