//! Cache module for storing news payloads
//!
//! This module provides the key-value storage contract with in-memory and
//! file-backed implementations, and the news cache built on top of it. The
//! cache keeps one payload per query per day and evicts days older than the
//! retention window whenever it writes.

mod manager;
pub mod store;

pub use manager::{NewsCache, DEFAULT_RETENTION_DAYS, MAX_RETENTION_DAYS};
pub use store::{FileStore, KeyValueStore, MemoryStore, StorageError};
