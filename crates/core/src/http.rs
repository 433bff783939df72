//! Request and response values exchanged between the engine, the network
//! and the bucket store.
//!
//! Header names are stored lower-cased so lookups are case-insensitive.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::Error;

/// An intercepted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub url: Url,
}

impl Request {
    /// A GET request for `url`.
    pub fn get(url: Url) -> Self {
        Self { method: "GET".into(), url }
    }

    pub fn new(method: impl Into<String>, url: Url) -> Self {
        Self { method: method.into(), url }
    }

    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }
}

/// A response as served to the page or stored in a bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// Final URL the response was produced for.
    pub url: String,
    pub status: u16,
    pub status_text: String,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(url: impl Into<String>, status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            url: url.into(),
            status,
            status_text: canonical_reason(status).to_string(),
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    /// Last-resort answer for an HTML request when both network and cache fail.
    pub fn service_unavailable(url: impl Into<String>, message: &str) -> Self {
        Self::new(url, 503, message.as_bytes().to_vec())
            .with_header("content-type", "text/plain; charset=utf-8")
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Status in the 2xx range.
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turn a non-2xx response into a `NETWORK_ERROR`.
    pub fn error_for_status(self) -> Result<Self, Error> {
        if self.ok() { Ok(self) } else { Err(self.status_error()) }
    }

    /// The network error a non-2xx status stands for.
    pub fn status_error(&self) -> Error {
        Error::Network(format!("{} returned {} {}", self.url, self.status, self.status_text).trim_end().to_string())
    }

    /// Capture time read from the `date` header.
    ///
    /// Returns None when the header is missing or not a valid HTTP-date.
    pub fn captured_at(&self) -> Option<DateTime<Utc>> {
        self.header("date")
            .and_then(|v| DateTime::parse_from_rfc2822(v).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Stamp a `date` header if the response does not carry one.
    pub fn ensure_date(&mut self, now: DateTime<Utc>) {
        self.headers
            .entry("date".to_string())
            .or_insert_with(|| http_date(now));
    }

    pub fn body_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }
}

/// Format a timestamp as an IMF-fixdate (`Sun, 06 Nov 1994 08:49:37 GMT`).
pub fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

fn canonical_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_error_for_status() {
        let ok = Response::new("https://example.com/a", 204, "");
        assert!(ok.error_for_status().is_ok());

        let err = Response::new("https://example.com/a", 503, "down").error_for_status().unwrap_err();
        assert!(err.is_network());
        assert_eq!(err.to_string(), "NETWORK_ERROR: https://example.com/a returned 503 Service Unavailable");

        let err = Response::new("https://example.com/a", 599, "").status_error();
        assert_eq!(err.to_string(), "NETWORK_ERROR: https://example.com/a returned 599");
    }

    #[test]
    fn test_request_is_get() {
        let url = Url::parse("https://example.com/").unwrap();
        assert!(Request::get(url.clone()).is_get());
        assert!(Request::new("get", url.clone()).is_get());
        assert!(!Request::new("POST", url).is_get());
    }

    #[test]
    fn test_header_lookup_case_insensitive() {
        let response = Response::new("https://example.com/", 200, "hi").with_header("Content-Type", "text/plain");
        assert_eq!(response.header("content-type"), Some("text/plain"));
        assert_eq!(response.header("CONTENT-TYPE"), Some("text/plain"));
    }

    #[test]
    fn test_ok_range() {
        assert!(Response::new("u", 200, "").ok());
        assert!(Response::new("u", 204, "").ok());
        assert!(!Response::new("u", 304, "").ok());
        assert!(!Response::new("u", 404, "").ok());
    }

    #[test]
    fn test_captured_at_roundtrips_http_date() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let response = Response::new("u", 200, "").with_header("date", http_date(at));
        assert_eq!(response.header("date"), Some("Sat, 09 Mar 2024 14:05:07 GMT"));
        assert_eq!(response.captured_at(), Some(at));
    }

    #[test]
    fn test_captured_at_missing_or_garbage() {
        assert_eq!(Response::new("u", 200, "").captured_at(), None);
        let response = Response::new("u", 200, "").with_header("date", "yesterday");
        assert_eq!(response.captured_at(), None);
    }

    #[test]
    fn test_ensure_date_keeps_existing() {
        let old = Utc::now() - Duration::hours(3);
        let mut response = Response::new("u", 200, "").with_header("date", http_date(old));
        response.ensure_date(Utc::now());
        assert_eq!(response.header("date"), Some(http_date(old).as_str()));

        let mut fresh = Response::new("u", 200, "");
        fresh.ensure_date(old);
        assert!(fresh.captured_at().is_some());
    }

    #[test]
    fn test_service_unavailable() {
        let response = Response::service_unavailable("https://example.com/page", "offline");
        assert_eq!(response.status, 503);
        assert_eq!(response.status_text, "Service Unavailable");
        assert_eq!(response.body_text(), Some("offline"));
    }
}
