//! SQLite-backed storage for versioned cache buckets.
//!
//! This module provides persistent buckets of stored responses using SQLite
//! with async access via tokio-rusqlite. It supports:
//!
//! - Keys derived from request method and URL via SHA-256
//! - Automatic schema migrations
//! - WAL mode for concurrent access
//! - Bucket deletion cascading to its entries

pub mod buckets;
pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;

pub use crate::Error;

pub use connection::CacheDb;
pub use hash::CacheKey;
