//! Command-line interface parsing for Portal Notícias
//!
//! This module handles parsing of CLI arguments using clap. Category ids are
//! validated while parsing so a typo fails before any network or disk access.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::data::{all_categories, get_category_by_id};

/// Error types for CLI argument parsing
#[derive(Debug, Error)]
pub enum CliError {
    /// The specified category id is not recognized
    #[error("Invalid category: '{0}'. Valid categories: {}", valid_category_ids())]
    InvalidCategory(String),
}

fn valid_category_ids() -> String {
    all_categories()
        .iter()
        .map(|category| category.id)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Portal Notícias - Brazilian news headlines with an offline cache
#[derive(Parser, Debug)]
#[command(name = "portal-noticias")]
#[command(about = "Brazilian news headlines with an offline cache")]
#[command(version)]
pub struct Cli {
    /// Configuration file (defaults to ./portal-noticias.toml, then the user config dir)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Fetch and print headlines
    ///
    /// Examples:
    ///   portal-noticias headlines
    ///   portal-noticias headlines --category sports
    ///   portal-noticias headlines --search eleições --pages 2
    Headlines {
        /// Category id (see `categories`)
        #[arg(long, short, default_value = "all", value_parser = parse_category_arg)]
        category: String,

        /// Free-text search combined with the category keyword
        #[arg(long, short, default_value = "")]
        search: String,

        /// Number of pages to load (capped by the configured maximum)
        #[arg(long, short, value_name = "N")]
        pages: Option<u32>,

        /// Skip the network and read from the cache only
        #[arg(long)]
        offline: bool,
    },

    /// List available categories
    Categories,

    /// Inspect or clear the news cache
    #[command(subcommand)]
    Cache(CacheCommand),

    /// Manage favorite articles
    #[command(subcommand)]
    Favorites(FavoritesCommand),
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum CacheCommand {
    /// Print every cached payload, newest first
    List,
    /// Remove all cached news
    Clear,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum FavoritesCommand {
    /// Print saved articles
    List,
    /// Save a cached article by its URL
    Add { url: String },
    /// Remove a saved article by id (its URL unless the API provided one)
    Remove { id: String },
    /// Remove every saved article
    Clear,
}

/// Parses a category id argument.
///
/// # Returns
/// * `Ok(String)` with the id if it names a known category
/// * `Err(CliError::InvalidCategory)` otherwise
pub fn parse_category_arg(s: &str) -> Result<String, CliError> {
    get_category_by_id(s)
        .map(|category| category.id.to_string())
        .ok_or_else(|| CliError::InvalidCategory(s.to_string()))
}
