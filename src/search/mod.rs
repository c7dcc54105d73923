//! Web text search — collaborator interface for specification enrichment.

pub mod duckduckgo;

use async_trait::async_trait;

use crate::error::SearchError;

/// One search result.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub title: String,
    pub body: String,
    pub url: String,
}

/// Text-search backend trait.
#[async_trait]
pub trait WebSearch: Send + Sync {
    /// Run a text search, returning at most `max_results` hits.
    ///
    /// An empty result set is an error (`SearchError::NoResults`) so the
    /// caller has one failure path to handle.
    async fn search(&self, query: &str, max_results: usize)
    -> Result<Vec<SearchHit>, SearchError>;
}
