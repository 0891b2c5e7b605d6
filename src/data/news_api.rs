//! News API client
//!
//! Performs paginated `/everything` queries against the news API and
//! normalizes failures into "no response" versus "server said no".

use std::time::Duration;

use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use super::{NewsResponse, SortBy};
use crate::config::ApiConfig;

/// Errors that can occur when querying the news API
#[derive(Debug, Error)]
pub enum NewsApiError {
    /// The request was sent but no response came back (connect failure, timeout)
    #[error("network error: no response from the news server ({0})")]
    Network(#[source] reqwest::Error),

    /// The server answered with a non-2xx status or an unreadable payload
    #[error("news API error (HTTP {status}): {}", summarize_body(.body))]
    Api { status: u16, body: String },

    /// The HTTP client could not be constructed
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl NewsApiError {
    /// Message reported by the API in its JSON error envelope, if any
    pub fn message(&self) -> Option<String> {
        match self {
            NewsApiError::Api { body, .. } => serde_json::from_str::<ApiErrorBody>(body)
                .ok()
                .and_then(|envelope| envelope.message),
            _ => None,
        }
    }
}

/// Error envelope returned by the API on failures
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
}

fn summarize_body(body: &str) -> String {
    if let Ok(ApiErrorBody {
        message: Some(message),
    }) = serde_json::from_str::<ApiErrorBody>(body)
    {
        return message;
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "empty response body".to_string()
    } else {
        trimmed.chars().take(200).collect()
    }
}

/// Parameters of a single `/everything` request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleQuery {
    /// Search term
    pub query: String,
    /// Inclusive lower bound on publication date
    pub from: NaiveDate,
    pub sort_by: SortBy,
    /// 1-based page index
    pub page: u32,
    pub page_size: u32,
}

/// Client for the news API
#[derive(Debug, Clone)]
pub struct NewsApiClient {
    http_client: Client,
    /// Base URL for the API (allows override for testing)
    base_url: String,
    api_key: String,
    language: String,
}

impl NewsApiClient {
    /// Creates a client from configuration, applying the request timeout
    pub fn new(config: &ApiConfig) -> Result<Self, NewsApiError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(NewsApiError::Client)?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            language: config.language.clone(),
        })
    }

    /// Creates a client with a custom HTTP client and endpoint
    pub fn with_client(
        http_client: Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let base_url: String = base_url.into();
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            language: "pt".to_string(),
        }
    }

    /// Overrides the two-letter language filter
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Fetches one page of articles
    ///
    /// # Returns
    /// * `Ok(NewsResponse)` - The page as returned by the API
    /// * `Err(NewsApiError::Network)` - If no response was received
    /// * `Err(NewsApiError::Api)` - If the server rejected the request or the payload is malformed
    pub async fn fetch_articles(&self, query: &ArticleQuery) -> Result<NewsResponse, NewsApiError> {
        let url = format!("{}/everything", self.base_url);
        let from = query.from.format("%Y-%m-%d").to_string();
        let page = query.page.to_string();
        let page_size = query.page_size.to_string();

        debug!(q = %query.query, page = query.page, "requesting articles");

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("q", query.query.as_str()),
                ("from", from.as_str()),
                ("sortBy", query.sort_by.as_param()),
                ("page", page.as_str()),
                ("pageSize", page_size.as_str()),
                ("language", self.language.as_str()),
                ("apiKey", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(NewsApiError::Network)?;

        let status = response.status();
        let body = response.text().await.map_err(NewsApiError::Network)?;

        if !status.is_success() {
            return Err(NewsApiError::Api {
                status: status.as_u16(),
                body,
            });
        }

        match serde_json::from_str::<NewsResponse>(&body) {
            Ok(news) if news.status == "ok" => Ok(news),
            _ => Err(NewsApiError::Api {
                status: status.as_u16(),
                body,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const OK_BODY: &str = r#"{
        "status": "ok",
        "totalResults": 37,
        "articles": [{
            "source": {"id": "globo", "name": "Globo"},
            "author": "Redação",
            "title": "Seleção vence amistoso",
            "description": null,
            "url": "https://globo.example/selecao",
            "urlToImage": null,
            "publishedAt": "2025-06-12T10:00:00Z",
            "content": null
        }]
    }"#;

    fn sample_query() -> ArticleQuery {
        ArticleQuery {
            query: "tesla".to_string(),
            from: NaiveDate::from_ymd_opt(2025, 6, 5).unwrap(),
            sort_by: SortBy::PublishedAt,
            page: 2,
            page_size: 20,
        }
    }

    fn client_for(server: &MockServer) -> NewsApiClient {
        NewsApiClient::with_client(Client::new(), server.uri(), "test-key")
    }

    #[tokio::test]
    async fn test_fetch_articles_sends_all_parameters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/everything"))
            .and(query_param("q", "tesla"))
            .and(query_param("from", "2025-06-05"))
            .and(query_param("sortBy", "publishedAt"))
            .and(query_param("page", "2"))
            .and(query_param("pageSize", "20"))
            .and(query_param("language", "pt"))
            .and(query_param("apiKey", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_string(OK_BODY))
            .expect(1)
            .mount(&server)
            .await;

        let response = client_for(&server)
            .fetch_articles(&sample_query())
            .await
            .expect("request should succeed");

        assert_eq!(response.total_results, 37);
        assert_eq!(response.articles.len(), 1);
        assert_eq!(response.articles[0].source.id.as_deref(), Some("globo"));
    }

    #[tokio::test]
    async fn test_non_success_status_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/everything"))
            .respond_with(ResponseTemplate::new(401).set_body_string(
                r#"{"status":"error","code":"apiKeyInvalid","message":"Your API key is invalid."}"#,
            ))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .fetch_articles(&sample_query())
            .await
            .unwrap_err();

        match &err {
            NewsApiError::Api { status, body } => {
                assert_eq!(*status, 401);
                assert!(body.contains("apiKeyInvalid"));
            }
            other => panic!("expected Api error, got {:?}", other),
        }
        assert_eq!(err.message().as_deref(), Some("Your API key is invalid."));
        assert!(err.to_string().contains("Your API key is invalid."));
    }

    #[tokio::test]
    async fn test_malformed_payload_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/everything"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .fetch_articles(&sample_query())
            .await
            .unwrap_err();

        assert!(matches!(err, NewsApiError::Api { status: 200, .. }));
        assert!(err.message().is_none());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_network_error() {
        // Bind then drop a plain listener so the port refuses connections
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let uri = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let client = NewsApiClient::with_client(Client::new(), uri, "test-key");
        let err = client.fetch_articles(&sample_query()).await.unwrap_err();

        assert!(matches!(err, NewsApiError::Network(_)));
    }

    #[tokio::test]
    async fn test_with_language_overrides_filter() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/everything"))
            .and(query_param("language", "en"))
            .respond_with(ResponseTemplate::new(200).set_body_string(OK_BODY))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).with_language("en");
        assert!(client.fetch_articles(&sample_query()).await.is_ok());
    }

    #[test]
    fn test_new_trims_trailing_slash() {
        let config = ApiConfig {
            base_url: "https://newsapi.org/v2/".to_string(),
            ..ApiConfig::default()
        };
        let client = NewsApiClient::new(&config).expect("client builds");
        assert_eq!(client.base_url, "https://newsapi.org/v2");
        assert_eq!(client.language, "pt");
    }
}
