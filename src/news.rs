//! Offline-aware news fetching
//!
//! [`NewsService::fetch_news`] decides between the network and the cache:
//!
//! 1. Offline: serve the cached payload for the query, or fail with
//!    [`NewsError::OfflineNoCache`]. No request is sent.
//! 2. Online: query the API. A successful page is written through to the
//!    cache (a failed write is only logged). A failed request falls back to
//!    the cache and only surfaces the original error if nothing is cached.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cache::{NewsCache, StorageError};
use crate::connectivity::Connectivity;
use crate::data::{ArticleQuery, NewsApiClient, NewsApiError, NewsResponse, SortBy};

/// Default reach of the `from` filter, in days before today
pub const DEFAULT_LOOKBACK_DAYS: i64 = 7;

/// Largest accepted reach of the `from` filter, in days
pub const MAX_LOOKBACK_DAYS: i64 = 3650;

/// Errors surfaced by a fetch after every recovery path was tried
#[derive(Debug, Error)]
pub enum NewsError {
    /// Network or API failure with no cached payload to fall back on
    #[error(transparent)]
    Remote(#[from] NewsApiError),

    #[error("offline and no cached news available for \"{query}\"")]
    OfflineNoCache { query: String },

    #[error("local storage failed: {0}")]
    Storage(#[from] StorageError),
}

/// Where a fetched payload came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchSource {
    /// Fresh page from the API
    Network,
    /// API request failed, cached payload served instead
    CacheFallback,
    /// Device offline, cached payload served
    Offline,
}

impl FetchSource {
    pub fn is_cached(&self) -> bool {
        !matches!(self, FetchSource::Network)
    }
}

/// Result of a successful fetch
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched {
    pub response: NewsResponse,
    pub source: FetchSource,
}

/// One page request, expressed in terms of the effective query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsRequest {
    pub query: String,
    /// Explicit lower date bound; defaults to today minus the lookback window
    pub from: Option<NaiveDate>,
    pub sort_by: SortBy,
    pub page: u32,
    pub page_size: u32,
}

impl NewsRequest {
    /// First page of `query` with default sorting and a page size of 20
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            from: None,
            sort_by: SortBy::default(),
            page: 1,
            page_size: 20,
        }
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn from(mut self, from: NaiveDate) -> Self {
        self.from = Some(from);
        self
    }

    pub fn sort_by(mut self, sort_by: SortBy) -> Self {
        self.sort_by = sort_by;
        self
    }
}

/// Composes the remote client, cache and connectivity oracle
#[derive(Clone)]
pub struct NewsService {
    client: NewsApiClient,
    cache: NewsCache,
    connectivity: Arc<dyn Connectivity>,
    lookback_days: i64,
}

impl NewsService {
    pub fn new(
        client: NewsApiClient,
        cache: NewsCache,
        connectivity: Arc<dyn Connectivity>,
    ) -> Self {
        Self {
            client,
            cache,
            connectivity,
            lookback_days: DEFAULT_LOOKBACK_DAYS,
        }
    }

    /// Sets the `from` window, clamped to `0..=MAX_LOOKBACK_DAYS`
    pub fn with_lookback_days(mut self, days: i64) -> Self {
        self.lookback_days = days.clamp(0, MAX_LOOKBACK_DAYS);
        self
    }

    pub fn cache(&self) -> &NewsCache {
        &self.cache
    }

    /// Fetches one page, falling back to the cache as described in the module docs
    pub async fn fetch_news(&self, request: &NewsRequest) -> Result<Fetched, NewsError> {
        let query = request.query.as_str();

        if !self.connectivity.is_online().await {
            return match self.cache.load(query).await? {
                Some(response) => {
                    info!(query, "offline: serving cached news");
                    Ok(Fetched {
                        response,
                        source: FetchSource::Offline,
                    })
                }
                None => Err(NewsError::OfflineNoCache {
                    query: query.to_string(),
                }),
            };
        }

        let article_query = ArticleQuery {
            query: query.to_string(),
            from: request
                .from
                .unwrap_or_else(|| Utc::now().date_naive() - Duration::days(self.lookback_days)),
            sort_by: request.sort_by,
            page: request.page,
            page_size: request.page_size,
        };

        match self.client.fetch_articles(&article_query).await {
            Ok(response) => {
                debug!(query, total = response.total_results, "fresh news received");
                if let Err(e) = self.cache.save(&response, query).await {
                    warn!(query, error = %e, "failed to cache news, continuing");
                }
                Ok(Fetched {
                    response,
                    source: FetchSource::Network,
                })
            }
            Err(api_error) => {
                warn!(query, error = %api_error, "news API failed, trying cache");
                match self.cache.load(query).await {
                    Ok(Some(response)) => {
                        info!(query, "serving cached news after API failure");
                        Ok(Fetched {
                            response,
                            source: FetchSource::CacheFallback,
                        })
                    }
                    Ok(None) => Err(api_error.into()),
                    Err(storage_error) => {
                        warn!(query, error = %storage_error, "cache fallback unavailable");
                        Err(api_error.into())
                    }
                }
            }
        }
    }

    /// Every cached payload, newest first; empty if the cache cannot be read
    pub async fn all_cached_news(&self) -> Vec<NewsResponse> {
        match self.cache.load_all().await {
            Ok(records) => records.into_iter().map(|record| record.response).collect(),
            Err(e) => {
                warn!(error = %e, "failed to read cached news");
                Vec::new()
            }
        }
    }

    pub async fn clear_cache(&self) -> Result<(), NewsError> {
        Ok(self.cache.clear().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{KeyValueStore, MemoryStore};
    use crate::connectivity::StaticConnectivity;
    use crate::data::fixtures;
    use async_trait::async_trait;
    use reqwest::Client;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Store whose every operation fails
    struct BrokenStore;

    #[async_trait]
    impl KeyValueStore for BrokenStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Unavailable("disk full".into()))
        }
        async fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("disk full".into()))
        }
        async fn remove(&self, _key: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("disk full".into()))
        }
        async fn get_all_keys(&self) -> Result<Vec<String>, StorageError> {
            Err(StorageError::Unavailable("disk full".into()))
        }
        async fn multi_remove(&self, _keys: &[String]) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("disk full".into()))
        }
    }

    fn ok_body(response: &NewsResponse) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(response)
    }

    fn service(
        server: &MockServer,
        store: Arc<dyn KeyValueStore>,
        online: bool,
    ) -> (NewsService, Arc<StaticConnectivity>) {
        let connectivity = Arc::new(StaticConnectivity::new(online));
        let client = NewsApiClient::with_client(Client::new(), server.uri(), "key");
        let cache = NewsCache::new(store, "@portal-noticias");
        (
            NewsService::new(client, cache, connectivity.clone()),
            connectivity,
        )
    }

    #[tokio::test]
    async fn test_offline_with_cache_serves_cache_without_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let (service, _) = service(&server, Arc::new(MemoryStore::new()), false);
        let cached = fixtures::response(1, &["https://cached.example/1"]);
        service.cache().save(&cached, "tesla").await.unwrap();

        let fetched = service.fetch_news(&NewsRequest::new("tesla")).await.unwrap();

        assert_eq!(fetched.response, cached);
        assert_eq!(fetched.source, FetchSource::Offline);
    }

    #[tokio::test]
    async fn test_offline_without_cache_fails() {
        let server = MockServer::start().await;
        let (service, _) = service(&server, Arc::new(MemoryStore::new()), false);

        let err = service
            .fetch_news(&NewsRequest::new("tesla"))
            .await
            .unwrap_err();

        assert!(matches!(err, NewsError::OfflineNoCache { ref query } if query == "tesla"));
        assert!(err.to_string().contains("tesla"));
    }

    #[tokio::test]
    async fn test_offline_storage_failure_propagates() {
        let server = MockServer::start().await;
        let (service, _) = service(&server, Arc::new(BrokenStore), false);

        let err = service
            .fetch_news(&NewsRequest::new("tesla"))
            .await
            .unwrap_err();

        assert!(matches!(err, NewsError::Storage(_)));
    }

    #[tokio::test]
    async fn test_online_success_writes_through() {
        let server = MockServer::start().await;
        let fresh = fixtures::response(1, &["https://fresh.example/1"]);
        Mock::given(method("GET"))
            .and(path("/everything"))
            .and(query_param("q", "tesla"))
            .and(query_param("page", "1"))
            .and(query_param("pageSize", "10"))
            .and(query_param("from", "2025-04-28"))
            .respond_with(ok_body(&fresh))
            .expect(1)
            .mount(&server)
            .await;
        let (service, connectivity) = service(&server, Arc::new(MemoryStore::new()), true);

        let request = NewsRequest::new("tesla")
            .page_size(10)
            .from(NaiveDate::from_ymd_opt(2025, 4, 28).unwrap());
        let fetched = service.fetch_news(&request).await.unwrap();
        assert_eq!(fetched.response, fresh);
        assert_eq!(fetched.source, FetchSource::Network);

        connectivity.set_online(false);
        let offline = service.fetch_news(&request).await.unwrap();
        assert_eq!(offline.response, fresh);
        assert_eq!(offline.source, FetchSource::Offline);
    }

    #[tokio::test]
    async fn test_online_default_from_is_lookback_window() {
        let server = MockServer::start().await;
        let expected_from = (Utc::now().date_naive() - Duration::days(3))
            .format("%Y-%m-%d")
            .to_string();
        Mock::given(method("GET"))
            .and(query_param("from", expected_from.as_str()))
            .respond_with(ok_body(&fixtures::response(0, &[])))
            .expect(1)
            .mount(&server)
            .await;
        let (service, _) = service(&server, Arc::new(MemoryStore::new()), true);
        let service = service.with_lookback_days(3);

        assert!(service.fetch_news(&NewsRequest::new("x")).await.is_ok());
    }

    #[tokio::test]
    async fn test_huge_lookback_is_clamped() {
        let server = MockServer::start().await;
        let expected_from = (Utc::now().date_naive() - Duration::days(MAX_LOOKBACK_DAYS))
            .format("%Y-%m-%d")
            .to_string();
        Mock::given(method("GET"))
            .and(query_param("from", expected_from.as_str()))
            .respond_with(ok_body(&fixtures::response(0, &[])))
            .expect(1)
            .mount(&server)
            .await;
        let (service, _) = service(&server, Arc::new(MemoryStore::new()), true);
        let service = service.with_lookback_days(200_000_000);

        assert!(service.fetch_news(&NewsRequest::new("x")).await.is_ok());
    }

    #[tokio::test]
    async fn test_online_success_survives_cache_write_failure() {
        let server = MockServer::start().await;
        let fresh = fixtures::response(1, &["https://fresh.example/1"]);
        Mock::given(method("GET"))
            .respond_with(ok_body(&fresh))
            .mount(&server)
            .await;
        let (service, _) = service(&server, Arc::new(BrokenStore), true);

        let fetched = service.fetch_news(&NewsRequest::new("tesla")).await.unwrap();
        assert_eq!(fetched.response, fresh);
        assert_eq!(fetched.source, FetchSource::Network);
    }

    #[tokio::test]
    async fn test_api_failure_with_cache_serves_stale_data() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;
        let (service, _) = service(&server, Arc::new(MemoryStore::new()), true);
        let cached = fixtures::response(1, &["https://cached.example/1"]);
        service.cache().save(&cached, "test").await.unwrap();

        let fetched = service.fetch_news(&NewsRequest::new("test")).await.unwrap();

        assert_eq!(fetched.response, cached);
        assert_eq!(fetched.source, FetchSource::CacheFallback);
        assert!(fetched.source.is_cached());
    }

    #[tokio::test]
    async fn test_api_failure_without_cache_propagates_original_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429).set_body_string(
                r#"{"status":"error","code":"rateLimited","message":"Too many requests"}"#,
            ))
            .mount(&server)
            .await;
        let (service, _) = service(&server, Arc::new(MemoryStore::new()), true);

        let err = service
            .fetch_news(&NewsRequest::new("tesla"))
            .await
            .unwrap_err();

        match err {
            NewsError::Remote(NewsApiError::Api { status, .. }) => assert_eq!(status, 429),
            other => panic!("expected remote API error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_api_failure_with_broken_cache_propagates_original_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;
        let (service, _) = service(&server, Arc::new(BrokenStore), true);

        let err = service
            .fetch_news(&NewsRequest::new("tesla"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            NewsError::Remote(NewsApiError::Api { status: 502, .. })
        ));
    }

    #[tokio::test]
    async fn test_all_cached_news_newest_first_and_empty_on_failure() {
        let server = MockServer::start().await;
        let (service, _) = service(&server, Arc::new(MemoryStore::new()), false);
        service
            .cache()
            .save(&fixtures::response(1, &["https://a.example/1"]), "tesla")
            .await
            .unwrap();
        service
            .cache()
            .save(&fixtures::response(0, &[]), "spacex")
            .await
            .unwrap();
        assert_eq!(service.all_cached_news().await.len(), 2);

        service.clear_cache().await.unwrap();
        assert!(service.all_cached_news().await.is_empty());

        let (broken, _) = self::service(&server, Arc::new(BrokenStore), false);
        assert!(broken.all_cached_news().await.is_empty());
    }
}
