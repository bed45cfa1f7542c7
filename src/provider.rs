//! Pluggable result providers and the engine-level failover policy.
//!
//! Adapters that scrape live search engines sit outside this crate; they
//! plug in through [`ResultProvider`] and the uniform [`ProviderResult`]
//! contract. The local pipeline implements the same trait, so a built
//! [`SearchEngine`] can stand in a failover chain next to remote providers.

use crate::engine::SearchEngine;
use serde::{Deserialize, Serialize};
use std::future::Future;
use tracing::{debug, warn};

/// A single result from a provider, in the uniform cross-provider shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResult {
    pub title: String,
    pub link: String,
    pub snippet: String,
    pub score: f64,
    /// Which provider produced this result.
    pub source: String,
}

/// Errors a provider can report. `Blocked` is distinct so fallback policy
/// can treat bot detection as a reason to try the next provider.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("provider blocked the request: {0}")]
    Blocked(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

/// A pluggable source of search results.
///
/// Implementations must be `Send + Sync` so chains can be queried from any
/// task.
pub trait ResultProvider: Send + Sync {
    /// Human-readable provider name, used as the `source` tag and in logs.
    fn name(&self) -> &'static str;

    /// Run the query and return up to `limit` results.
    fn search(
        &self,
        query: &str,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<ProviderResult>, ProviderError>> + Send;
}

/// Two-level failover: queries the primary and falls back to the secondary
/// when the primary errors (including detected blocking) or returns zero
/// results. Implements [`ResultProvider`] itself, so chains compose.
pub struct Failover<P, S> {
    primary: P,
    secondary: S,
}

impl<P: ResultProvider, S: ResultProvider> Failover<P, S> {
    pub fn new(primary: P, secondary: S) -> Self {
        Self { primary, secondary }
    }
}

impl<P: ResultProvider, S: ResultProvider> ResultProvider for Failover<P, S> {
    fn name(&self) -> &'static str {
        "failover"
    }

    async fn search(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ProviderResult>, ProviderError> {
        match self.primary.search(query, limit).await {
            Ok(results) if !results.is_empty() => Ok(results),
            Ok(_) => {
                debug!(
                    provider = self.primary.name(),
                    "primary returned no results, falling back"
                );
                self.secondary.search(query, limit).await
            }
            Err(err) => {
                warn!(
                    provider = self.primary.name(),
                    error = %err,
                    "primary failed, falling back"
                );
                self.secondary.search(query, limit).await
            }
        }
    }
}

impl ResultProvider for SearchEngine {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn search(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ProviderResult>, ProviderError> {
        let hits = SearchEngine::search(self, query)
            .map_err(|err| ProviderError::Unavailable(err.to_string()))?;
        Ok(hits
            .into_iter()
            .take(limit)
            .map(|hit| ProviderResult {
                title: hit.title,
                link: hit.link,
                snippet: hit.snippet,
                score: hit.score,
                source: "local".to_string(),
            })
            .collect())
    }
}
