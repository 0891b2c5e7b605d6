//! Core data models for the news client
//!
//! This module contains the article and response types exchanged with the
//! news API and persisted in the local cache.

pub mod categories;
pub mod news_api;

pub use categories::{all_categories, effective_query, get_category_by_id, Category};
pub use news_api::{ArticleQuery, NewsApiClient, NewsApiError};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Publisher of an article as reported by the news API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// Publisher identifier, absent for smaller outlets
    pub id: Option<String>,
    /// Human-readable publisher name
    #[serde(default)]
    pub name: String,
}

/// A single news article
///
/// Field names follow the API wire format (`urlToImage`, `publishedAt`) so a
/// payload can be cached and restored without any mapping step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub source: Source,
    pub author: Option<String>,
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
    /// Canonical link to the article, used as the natural key
    pub url: String,
    #[serde(rename = "urlToImage")]
    pub image_url: Option<String>,
    /// ISO-8601 publication timestamp, kept verbatim
    #[serde(default)]
    pub published_at: String,
    pub content: Option<String>,
    /// Explicit identifier, only set on articles stored as favorites
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl Article {
    /// Stable identity of the article: `id` when present, otherwise `url`
    pub fn identity(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.url)
    }
}

/// A page of results from the news API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsResponse {
    pub status: String,
    /// Total number of matches available for the query, across all pages
    #[serde(default)]
    pub total_results: u32,
    #[serde(default)]
    pub articles: Vec<Article>,
}

/// A news payload stored in the cache for one query on one calendar day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub query: String,
    /// Day the payload was saved (serialized as `YYYY-MM-DD`)
    pub date: NaiveDate,
    #[serde(rename = "news")]
    pub response: NewsResponse,
}

/// Ordering applied by the news API
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortBy {
    #[default]
    #[serde(rename = "publishedAt")]
    PublishedAt,
    #[serde(rename = "relevancy")]
    Relevancy,
    #[serde(rename = "popularity")]
    Popularity,
}

impl SortBy {
    /// Value of the `sortBy` query parameter
    pub fn as_param(&self) -> &'static str {
        match self {
            SortBy::PublishedAt => "publishedAt",
            SortBy::Relevancy => "relevancy",
            SortBy::Popularity => "popularity",
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    const API_PAYLOAD: &str = r#"{
        "status": "ok",
        "totalResults": 1,
        "articles": [{
            "source": {"id": null, "name": "G1"},
            "author": null,
            "title": "Chuva forte atinge o litoral",
            "description": "Previsão indica mais chuva",
            "url": "https://g1.example/chuva",
            "urlToImage": "https://g1.example/chuva.jpg",
            "publishedAt": "2025-06-12T10:00:00Z",
            "content": null
        }]
    }"#;

    #[test]
    fn test_news_response_parses_api_payload() {
        let response: NewsResponse = serde_json::from_str(API_PAYLOAD).expect("valid payload");

        assert_eq!(response.status, "ok");
        assert_eq!(response.total_results, 1);
        let article = &response.articles[0];
        assert_eq!(article.source.name, "G1");
        assert!(article.source.id.is_none());
        assert_eq!(article.image_url.as_deref(), Some("https://g1.example/chuva.jpg"));
        assert_eq!(article.published_at, "2025-06-12T10:00:00Z");
        assert!(article.id.is_none());
    }

    #[test]
    fn test_article_serializes_wire_field_names() {
        let response: NewsResponse = serde_json::from_str(API_PAYLOAD).unwrap();
        let json = serde_json::to_string(&response).unwrap();

        assert!(json.contains("\"totalResults\""));
        assert!(json.contains("\"urlToImage\""));
        assert!(json.contains("\"publishedAt\""));

        // id is only written for favorites
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value["articles"][0].get("id").is_none());
    }

    #[test]
    fn test_identity_prefers_id_over_url() {
        let mut article = fixtures::article("https://a.example/1", "A");
        assert_eq!(article.identity(), "https://a.example/1");

        article.id = Some("fav-1".to_string());
        assert_eq!(article.identity(), "fav-1");
    }

    #[test]
    fn test_cache_record_uses_plain_date_and_news_field() {
        let record = CacheRecord {
            query: "tesla".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 6, 12).unwrap(),
            response: fixtures::response(1, &["https://a.example/1"]),
        };

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"date\":\"2025-06-12\""));
        assert!(json.contains("\"news\":"));
    }

    #[test]
    fn test_sort_by_param_values() {
        assert_eq!(SortBy::default().as_param(), "publishedAt");
        assert_eq!(SortBy::Relevancy.as_param(), "relevancy");
        assert_eq!(SortBy::Popularity.as_param(), "popularity");
    }
}
