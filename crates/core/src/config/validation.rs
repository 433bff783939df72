//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `cache_version` or `user_agent` is empty
    /// - `origin` is not an absolute http(s) URL
    /// - a static path or the offline page does not start with `/`
    /// - a max-age is 0
    /// - `network_timeout_ms` is 0 or exceeds `timeout_ms`
    /// - `max_bytes` is 0 or exceeds 50MB
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_version.trim().is_empty() {
            return Err(ConfigError::Invalid { field: "cache_version".into(), reason: "must not be empty".into() });
        }

        self.origin_url()?;

        if let Some(path) = self.static_paths.iter().find(|p| !p.starts_with('/')) {
            return Err(ConfigError::Invalid {
                field: "static_paths".into(),
                reason: format!("path must start with '/': {path}"),
            });
        }
        if !self.offline_page.starts_with('/') {
            return Err(ConfigError::Invalid { field: "offline_page".into(), reason: "must start with '/'".into() });
        }

        for (field, value) in [
            ("static_max_age_ms", self.static_max_age_ms),
            ("image_max_age_ms", self.image_max_age_ms),
            ("font_max_age_ms", self.font_max_age_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid { field: field.into(), reason: "must be greater than 0".into() });
            }
        }

        if self.network_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "network_timeout_ms".into(),
                reason: "must be greater than 0".into(),
            });
        }
        if self.network_timeout_ms > self.timeout_ms {
            return Err(ConfigError::Invalid {
                field: "network_timeout_ms".into(),
                reason: format!("must not exceed timeout_ms ({})", self.timeout_ms),
            });
        }

        if self.max_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must be greater than 0".into() });
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must not exceed 50MB".into() });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if self.static_paths.iter().any(|p| self.api_prefixes.iter().any(|api| p.starts_with(api.as_str()))) {
            tracing::warn!(
                api_prefixes = ?self.api_prefixes,
                "static_paths overlap api_prefixes; static classification takes precedence"
            );
        }

        Ok(())
    }
}
