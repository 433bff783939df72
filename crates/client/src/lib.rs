//! Runtime side of swcache.
//!
//! This crate provides the network layer and the cache engine that the
//! server drives: fetch interception, caching strategies, bucket lifecycle,
//! control messages and push/sync handlers.

pub mod fetch;
pub mod worker;

pub use fetch::{FetchClient, FetchConfig, Network, UrlError, resolve};

pub use worker::{
    ActivationReport, BACKGROUND_SYNC_TAG, DEFAULT_CLICK_URL, Notification, NotificationData, NotificationTemplate,
    PrecacheReport, ResponseSource, Served, ServiceWorker, StartupReport, WorkerConfig, WorkerState,
};
