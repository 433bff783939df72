//! Core types and shared functionality for swcache.
//!
//! This crate provides:
//! - Versioned cache buckets with a SQLite backend
//! - URL classification and the per-class cache policy table
//! - Request/response value types and the control protocol
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod classify;
pub mod config;
pub mod error;
pub mod http;
pub mod policy;
pub mod protocol;

pub use cache::{CacheDb, CacheKey};
pub use classify::{Classifier, ResourceClass};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use http::{Request, Response};
pub use policy::{CachePolicy, PolicyTable};
pub use protocol::{ControlMessage, ControlReply};
