//! URL classification into resource classes.
//!
//! Classification is an ordered list of `(Matcher, ResourceClass)` rules. The
//! first rule whose matcher accepts the URL decides the class; when none
//! does, the class is [`ResourceClass::Other`], so every URL has exactly one
//! class.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::AppConfig;

/// Resource class derived from URL shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResourceClass {
    Static,
    Image,
    Font,
    Api,
    Html,
    Other,
}

impl ResourceClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceClass::Static => "static",
            ResourceClass::Image => "image",
            ResourceClass::Font => "font",
            ResourceClass::Api => "api",
            ResourceClass::Html => "html",
            ResourceClass::Other => "other",
        }
    }
}

impl fmt::Display for ResourceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A URL prefix: absolute (`https://cdn.example/`) or path-only (`/images/`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlPrefix {
    Absolute(String),
    Path(String),
}

impl UrlPrefix {
    pub fn parse(raw: &str) -> Self {
        if raw.contains("://") { UrlPrefix::Absolute(raw.to_string()) } else { UrlPrefix::Path(raw.to_string()) }
    }

    fn matches(&self, url: &Url) -> bool {
        match self {
            UrlPrefix::Absolute(prefix) => url.as_str().starts_with(prefix.as_str()),
            UrlPrefix::Path(prefix) => url.path().starts_with(prefix.as_str()),
        }
    }
}

/// A predicate over request URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matcher {
    /// Path equals one of the listed paths.
    ExactPath(Vec<String>),
    /// Last path segment ends with one of the listed extensions (case-insensitive).
    Extension(Vec<String>),
    /// URL starts with one of the prefixes.
    Prefix(Vec<UrlPrefix>),
    /// Document-shaped path: `.html`, trailing slash, empty, or no extension.
    HtmlPage,
    AnyOf(Vec<Matcher>),
}

impl Matcher {
    pub fn matches(&self, url: &Url) -> bool {
        match self {
            Matcher::ExactPath(paths) => paths.iter().any(|p| p == url.path()),
            Matcher::Extension(exts) => {
                let segment = last_segment(url).to_ascii_lowercase();
                exts.iter().any(|ext| segment.ends_with(ext.to_ascii_lowercase().as_str()))
            }
            Matcher::Prefix(prefixes) => prefixes.iter().any(|p| p.matches(url)),
            Matcher::HtmlPage => is_html_page(url),
            Matcher::AnyOf(matchers) => matchers.iter().any(|m| m.matches(url)),
        }
    }
}

/// Whether the URL looks like a document navigation.
pub fn is_html_page(url: &Url) -> bool {
    let path = url.path();
    path.is_empty() || path.ends_with('/') || path.ends_with(".html") || !last_segment(url).contains('.')
}

fn prefixes(raw: &[String]) -> Vec<UrlPrefix> {
    raw.iter().map(|p| UrlPrefix::parse(p)).collect()
}

fn last_segment(url: &Url) -> &str {
    url.path().rsplit('/').next().unwrap_or("")
}

/// Ordered classification rules with an `Other` fallback.
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: Vec<(Matcher, ResourceClass)>,
}

impl Classifier {
    pub fn new(rules: Vec<(Matcher, ResourceClass)>) -> Self {
        Self { rules }
    }

    /// Build the standard rule order from configuration:
    /// static, image, font, api, html.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(vec![
            (Matcher::ExactPath(config.static_paths.clone()), ResourceClass::Static),
            (
                Matcher::AnyOf(vec![
                    Matcher::Extension(config.image_extensions.clone()),
                    Matcher::Prefix(prefixes(&config.image_prefixes)),
                ]),
                ResourceClass::Image,
            ),
            (
                Matcher::AnyOf(vec![
                    Matcher::Extension(config.font_extensions.clone()),
                    Matcher::Prefix(prefixes(&config.font_prefixes)),
                ]),
                ResourceClass::Font,
            ),
            (Matcher::Prefix(prefixes(&config.api_prefixes)), ResourceClass::Api),
            (Matcher::HtmlPage, ResourceClass::Html),
        ])
    }

    pub fn classify(&self, url: &Url) -> ResourceClass {
        self.rules
            .iter()
            .find(|(matcher, _)| matcher.matches(url))
            .map(|(_, class)| *class)
            .unwrap_or(ResourceClass::Other)
    }
}
