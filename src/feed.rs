//! Feed session state machine
//!
//! A [`FeedSession`] holds the article list for one query + category and
//! walks its pages. Transitions are explicit:
//!
//! - `Idle | Loaded | Error --begin--> Loading`, refused while already
//!   `Loading` or when paginating past the last page
//! - `Loading --finish(Ok)--> Loaded`, `Loading --finish(Err)--> Error`
//!
//! [`FeedSession::begin`] and [`FeedSession::finish`] can be driven
//! separately (e.g. with the fetch running on another task); results carrying
//! an outdated generation are dropped, so a query or category change makes
//! any in-flight response irrelevant.

use std::collections::HashSet;

use tracing::debug;

use crate::config::FeedConfig;
use crate::data::categories::ALL_CATEGORY_ID;
use crate::data::{effective_query, Article, SortBy};
use crate::news::{FetchSource, Fetched, NewsError, NewsRequest, NewsService};

/// Lifecycle of the current fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedStatus {
    /// Nothing requested yet, or the previous request was superseded
    Idle,
    /// A page request is in flight
    Loading,
    /// The last request succeeded
    Loaded,
    /// The last request failed; `last_error` holds the message
    Error,
}

/// Pagination and status bookkeeping for one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryState {
    /// Free-text search entered by the user
    pub query: String,
    /// Selected category id
    pub category: String,
    /// Next page to request when paginating (1-based)
    pub page: u32,
    pub page_size: u32,
    /// Upper bound on pages walked for one query
    pub max_pages: u32,
    pub has_more_pages: bool,
    pub status: FeedStatus,
    /// Message of the last unrecovered failure, cleared by the next success
    pub last_error: Option<String>,
}

impl QueryState {
    pub fn is_loading(&self) -> bool {
        self.status == FeedStatus::Loading
    }
}

/// A request handed out by [`FeedSession::begin`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFetch {
    pub generation: u64,
    pub refresh: bool,
    pub request: NewsRequest,
}

/// Article list plus the state machine that fills it
#[derive(Debug, Clone)]
pub struct FeedSession {
    pub state: QueryState,
    articles: Vec<Article>,
    generation: u64,
    default_query: String,
    sort_by: SortBy,
    last_source: Option<FetchSource>,
}

impl FeedSession {
    /// Creates an idle session on the `all` category with no search text
    pub fn new(config: &FeedConfig) -> Self {
        Self {
            state: QueryState {
                query: String::new(),
                category: ALL_CATEGORY_ID.to_string(),
                page: 1,
                page_size: config.page_size,
                max_pages: config.max_pages,
                has_more_pages: true,
                status: FeedStatus::Idle,
                last_error: None,
            },
            articles: Vec::new(),
            generation: 0,
            default_query: config.default_query.clone(),
            sort_by: config.sort_by,
            last_source: None,
        }
    }

    pub fn articles(&self) -> &[Article] {
        &self.articles
    }

    /// Origin of the most recently applied result
    pub fn last_source(&self) -> Option<FetchSource> {
        self.last_source
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Search string sent to the API for the current query and category
    pub fn effective_query(&self) -> String {
        effective_query(&self.state.category, &self.state.query, &self.default_query)
    }

    /// Changes the search text; returns `false` if it was already set
    pub fn set_query(&mut self, query: impl Into<String>) -> bool {
        let query = query.into();
        if query == self.state.query {
            return false;
        }
        self.state.query = query;
        self.restart();
        true
    }

    /// Changes the category; returns `false` if it was already selected
    pub fn set_category(&mut self, category: impl Into<String>) -> bool {
        let category = category.into();
        if category == self.state.category {
            return false;
        }
        self.state.category = category;
        self.restart();
        true
    }

    /// Back to the first page; any in-flight result becomes stale
    fn restart(&mut self) {
        self.generation += 1;
        self.state.page = 1;
        self.state.has_more_pages = true;
        if self.state.is_loading() {
            self.state.status = FeedStatus::Idle;
        }
    }

    /// Starts a fetch, or returns `None` when the guard refuses it
    ///
    /// `refresh` requests the first page and will replace the list; otherwise
    /// the next page is requested and appended.
    pub fn begin(&mut self, refresh: bool) -> Option<PendingFetch> {
        if self.state.is_loading() || (!refresh && !self.state.has_more_pages) {
            return None;
        }
        if refresh {
            self.generation += 1;
        }
        self.state.status = FeedStatus::Loading;

        let page = if refresh { 1 } else { self.state.page };
        let request = NewsRequest::new(self.effective_query())
            .page(page)
            .page_size(self.state.page_size)
            .sort_by(self.sort_by);

        Some(PendingFetch {
            generation: self.generation,
            refresh,
            request,
        })
    }

    /// Applies the outcome of `pending`; returns `false` if it was stale
    pub fn finish(&mut self, pending: PendingFetch, result: Result<Fetched, NewsError>) -> bool {
        if pending.generation != self.generation || !self.state.is_loading() {
            debug!(
                generation = pending.generation,
                current = self.generation,
                "discarding stale news result"
            );
            return false;
        }

        match result {
            Ok(fetched) => self.apply_success(&pending, fetched),
            Err(e) => {
                self.state.status = FeedStatus::Error;
                self.state.last_error = Some(e.to_string());
            }
        }
        true
    }

    fn apply_success(&mut self, pending: &PendingFetch, fetched: Fetched) {
        let Fetched { response, source } = fetched;
        let loaded_page = pending.request.page;

        if source.is_cached() && loaded_page > 1 {
            // The cache holds a single snapshot per query, nothing further to walk
            let known: HashSet<String> = self
                .articles
                .iter()
                .map(|a| a.identity().to_string())
                .collect();
            self.articles.extend(
                response
                    .articles
                    .into_iter()
                    .filter(|a| !known.contains(a.identity())),
            );
            self.state.has_more_pages = false;
        } else {
            let total_pages = response.total_results.div_ceil(self.state.page_size.max(1));
            let last_page = total_pages.min(self.state.max_pages);
            self.state.has_more_pages = loaded_page < last_page;
            self.state.page = loaded_page + 1;

            if pending.refresh {
                self.articles = response.articles;
            } else {
                self.articles.extend(response.articles);
            }
        }

        self.state.status = FeedStatus::Loaded;
        self.state.last_error = None;
        self.last_source = Some(source);
    }

    /// Runs one guarded fetch through `service`; returns whether a result was applied
    pub async fn load_news(&mut self, service: &NewsService, refresh: bool) -> bool {
        let Some(pending) = self.begin(refresh) else {
            return false;
        };
        let result = service.fetch_news(&pending.request).await;
        self.finish(pending, result)
    }

    /// Reloads the first page, replacing the list
    pub async fn refresh(&mut self, service: &NewsService) -> bool {
        self.load_news(service, true).await
    }

    /// Appends the next page if one remains
    pub async fn load_more(&mut self, service: &NewsService) -> bool {
        self.load_news(service, false).await
    }
}
