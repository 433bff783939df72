//! URL resolution for intercepted and precached requests.

use url::Url;

/// Error type for URL resolution failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Resolve a page-supplied URL against the worker origin.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Join relative references (`/css/style.css`, `about.html`) onto `origin`
/// 3. Require http or https
/// 4. Lowercase the host
/// 5. Remove fragment (#...), keep the query string intact
pub fn resolve(origin: &Url, input: &str) -> Result<Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = if trimmed.contains("://") {
        Url::parse(trimmed)
    } else {
        origin.join(trimmed)
    }
    .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if let Some(host) = parsed.host_str().map(str::to_lowercase) {
        parsed
            .set_host(Some(&host))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);

    Ok(parsed)
}
