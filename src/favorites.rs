//! Saved articles
//!
//! The whole list lives under one key, `{namespace}:favorites`, as a JSON
//! array. Every change rewrites that key.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::cache::{KeyValueStore, StorageError};
use crate::data::Article;

/// Favorite articles persisted in a [`KeyValueStore`]
#[derive(Clone)]
pub struct Favorites {
    store: Arc<dyn KeyValueStore>,
    key: String,
    /// Serializes read-modify-write cycles
    lock: Arc<Mutex<()>>,
}

impl std::fmt::Debug for Favorites {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Favorites").field("key", &self.key).finish_non_exhaustive()
    }
}

impl Favorites {
    pub fn new(store: Arc<dyn KeyValueStore>, namespace: &str) -> Self {
        Self {
            store,
            key: format!("{}:favorites", namespace),
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// Reads the stored list; an unreadable payload counts as empty
    pub async fn load(&self) -> Result<Vec<Article>, StorageError> {
        let Some(raw) = self.store.get(&self.key).await? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str(&raw) {
            Ok(articles) => Ok(articles),
            Err(e) => {
                warn!(key = %self.key, error = %e, "discarding unreadable favorites");
                Ok(Vec::new())
            }
        }
    }

    /// Alias of [`Favorites::load`]
    pub async fn list(&self) -> Result<Vec<Article>, StorageError> {
        self.load().await
    }

    pub async fn is_favorite(&self, article: &Article) -> Result<bool, StorageError> {
        let id = article.identity();
        Ok(self.load().await?.iter().any(|fav| fav.identity() == id))
    }

    /// Saves `article` with its identity as `id`; returns `false` if already saved
    pub async fn add(&self, article: &Article) -> Result<bool, StorageError> {
        let _guard = self.lock.lock().await;
        let mut favorites = self.load().await?;
        let id = article.identity().to_string();
        if favorites.iter().any(|fav| fav.identity() == id) {
            return Ok(false);
        }

        let mut saved = article.clone();
        saved.id = Some(id.clone());
        favorites.push(saved);
        self.write(&favorites).await?;
        debug!(id, "favorite added");
        Ok(true)
    }

    /// Removes the article whose identity is `id`; returns `false` if none matched
    pub async fn remove(&self, id: &str) -> Result<bool, StorageError> {
        let _guard = self.lock.lock().await;
        let mut favorites = self.load().await?;
        let before = favorites.len();
        favorites.retain(|fav| fav.identity() != id);
        if favorites.len() == before {
            return Ok(false);
        }
        self.write(&favorites).await?;
        debug!(id, "favorite removed");
        Ok(true)
    }

    pub async fn clear(&self) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        self.store.remove(&self.key).await
    }

    async fn write(&self, favorites: &[Article]) -> Result<(), StorageError> {
        let json = serde_json::to_string(favorites)?;
        self.store.set(&self.key, &json).await
    }
}
