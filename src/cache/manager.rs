//! News cache over a key-value store
//!
//! Payloads are bucketed by query and calendar day under
//! `{namespace}:news:{query}:{YYYY-MM-DD}`. Expired buckets are evicted lazily
//! on every save; there is no background sweep.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use futures::future::try_join_all;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::store::{KeyValueStore, StorageError};
use crate::data::{CacheRecord, NewsResponse};

/// Default number of days a record is retained
pub const DEFAULT_RETENTION_DAYS: i64 = 7;

/// Largest accepted retention window, in days
pub const MAX_RETENTION_DAYS: i64 = 3650;

const DATE_FORMAT: &str = "%Y-%m-%d";

type Today = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

/// Durable, query-scoped, date-bucketed storage of news payloads
#[derive(Clone)]
pub struct NewsCache {
    store: Arc<dyn KeyValueStore>,
    namespace: String,
    retention_days: i64,
    today: Today,
    /// Serializes eviction-then-write so concurrent saves cannot interleave
    write_lock: Arc<Mutex<()>>,
}

impl std::fmt::Debug for NewsCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewsCache")
            .field("namespace", &self.namespace)
            .field("retention_days", &self.retention_days)
            .finish_non_exhaustive()
    }
}

impl NewsCache {
    /// Creates a cache owning every key under `namespace`
    pub fn new(store: Arc<dyn KeyValueStore>, namespace: impl Into<String>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
            retention_days: DEFAULT_RETENTION_DAYS,
            today: Arc::new(|| Utc::now().date_naive()),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Sets the retention window, clamped to `1..=MAX_RETENTION_DAYS`
    pub fn with_retention_days(mut self, days: i64) -> Self {
        self.retention_days = days.clamp(1, MAX_RETENTION_DAYS);
        self
    }

    /// Replaces the clock used to date records
    pub fn with_today(mut self, today: impl Fn() -> NaiveDate + Send + Sync + 'static) -> Self {
        self.today = Arc::new(today);
        self
    }

    fn news_prefix(&self) -> String {
        format!("{}:news:", self.namespace)
    }

    fn query_prefix(&self, query: &str) -> String {
        format!("{}{}:", self.news_prefix(), query)
    }

    fn record_key(&self, query: &str, date: NaiveDate) -> String {
        format!("{}{}", self.query_prefix(query), date.format(DATE_FORMAT))
    }

    fn last_update_key(&self) -> String {
        format!("{}:last-update", self.namespace)
    }

    /// Date suffix of a key belonging to `query`, if it is one
    fn record_date(&self, key: &str, query: &str) -> Option<NaiveDate> {
        let suffix = key.strip_prefix(&self.query_prefix(query))?;
        NaiveDate::parse_from_str(suffix, DATE_FORMAT).ok()
    }

    async fn news_keys(&self) -> Result<Vec<String>, StorageError> {
        let prefix = self.news_prefix();
        Ok(self
            .store
            .get_all_keys()
            .await?
            .into_iter()
            .filter(|key| key.starts_with(&prefix))
            .collect())
    }

    async fn read_record(&self, key: &str) -> Result<Option<CacheRecord>, StorageError> {
        match self.store.get(key).await? {
            Some(json) => match serde_json::from_str::<CacheRecord>(&json) {
                Ok(record) => Ok(Some(record)),
                Err(e) => {
                    warn!(key, error = %e, "skipping unreadable cache record");
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    /// Writes `response` as today's record for `query`
    ///
    /// Every record dated `retention_days` or more before today is deleted
    /// first. Records that cannot be parsed are deleted too.
    pub async fn save(&self, response: &NewsResponse, query: &str) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        let today = (self.today)();
        let cutoff = today - Duration::days(self.retention_days);

        let keys = self.news_keys().await?;
        let values = try_join_all(keys.iter().map(|key| self.store.get(key))).await?;

        let mut expired = Vec::new();
        for (key, value) in keys.into_iter().zip(values) {
            let Some(json) = value else { continue };
            match serde_json::from_str::<CacheRecord>(&json) {
                Ok(record) if record.date <= cutoff => expired.push(key),
                Ok(_) => {}
                Err(e) => {
                    warn!(key = %key, error = %e, "evicting unreadable cache record");
                    expired.push(key);
                }
            }
        }
        if !expired.is_empty() {
            debug!(count = expired.len(), %cutoff, "evicting expired cache records");
            self.store.multi_remove(&expired).await?;
        }

        let record = CacheRecord {
            query: query.to_string(),
            date: today,
            response: response.clone(),
        };
        let json = serde_json::to_string(&record)?;
        self.store.set(&self.record_key(query, today), &json).await?;
        self.store
            .set(&self.last_update_key(), &today.format(DATE_FORMAT).to_string())
            .await?;
        Ok(())
    }

    /// Returns the newest cached payload for `query`
    ///
    /// Today's bucket is tried first; otherwise the most recent retained day.
    pub async fn load(&self, query: &str) -> Result<Option<NewsResponse>, StorageError> {
        let today_key = self.record_key(query, (self.today)());
        if let Some(record) = self.read_record(&today_key).await? {
            return Ok(Some(record.response));
        }

        let mut dated: Vec<(NaiveDate, String)> = self
            .store
            .get_all_keys()
            .await?
            .into_iter()
            .filter(|key| *key != today_key)
            .filter_map(|key| self.record_date(&key, query).map(|date| (date, key)))
            .collect();
        dated.sort_unstable_by(|a, b| b.0.cmp(&a.0));

        // An unreadable bucket must not hide an older readable one
        for (_, key) in dated {
            if let Some(record) = self.read_record(&key).await? {
                return Ok(Some(record.response));
            }
        }
        Ok(None)
    }

    /// Every retained record across all queries, newest date first
    pub async fn load_all(&self) -> Result<Vec<CacheRecord>, StorageError> {
        let keys = self.news_keys().await?;
        let records = try_join_all(keys.iter().map(|key| self.read_record(key))).await?;

        let mut records: Vec<CacheRecord> = records.into_iter().flatten().collect();
        // Stable sort keeps storage order for equal dates
        records.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(records)
    }

    /// Deletes every record plus the last-update marker
    pub async fn clear(&self) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        let keys = self.news_keys().await?;
        if !keys.is_empty() {
            self.store.multi_remove(&keys).await?;
        }
        self.store.remove(&self.last_update_key()).await
    }

    /// Day of the most recent save, if any
    pub async fn last_update(&self) -> Result<Option<NaiveDate>, StorageError> {
        Ok(self
            .store
            .get(&self.last_update_key())
            .await?
            .and_then(|value| NaiveDate::parse_from_str(&value, DATE_FORMAT).ok()))
    }
}
