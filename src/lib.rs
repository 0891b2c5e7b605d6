//! Portal Notícias Library
//!
//! Offline-aware news fetching: the remote client, the date-bucketed cache,
//! the connectivity check and the paginating feed session. The binary is a
//! thin host over these modules.

pub mod cache;
pub mod cli;
pub mod config;
pub mod connectivity;
pub mod data;
pub mod favorites;
pub mod feed;
pub mod news;
pub mod time_fmt;
