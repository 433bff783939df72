//! Cache key generation.

use sha2::{Digest, Sha256};
use url::Url;

use crate::http::Request;

/// Identity of a stored response inside a bucket.
///
/// The fragment never takes part in matching, and the method is upper-cased.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub hash: String,
    pub method: String,
    pub url: String,
}

impl CacheKey {
    pub fn new(method: &str, url: &Url) -> Self {
        let mut url = url.clone();
        url.set_fragment(None);
        let method = method.to_ascii_uppercase();
        let url = url.to_string();
        Self { hash: compute_cache_key(&method, &url), method, url }
    }

    pub fn for_request(request: &Request) -> Self {
        Self::new(&request.method, &request.url)
    }

    pub fn get(url: &Url) -> Self {
        Self::new("GET", url)
    }
}

/// Compute the hex SHA-256 key for a method and URL.
pub fn compute_cache_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}
