//! Error types for the engine's public surface.
//!
//! Per-URL crawl failures (network errors, timeouts, bad status codes,
//! non-HTML content) are not represented here: they are logged and the URL
//! is skipped, never aborting a crawl.

/// Errors surfaced by [`crate::SearchEngine`] operations.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// `search` was called before `build` completed. A caller bug, kept
    /// distinct from a query that merely matches no documents.
    #[error("search engine not built; call build() first")]
    NotBuilt,

    /// The HTTP client could not be constructed.
    #[error("HTTP client error: {0}")]
    Client(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SearchError>;
