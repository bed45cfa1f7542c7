//! minisearch — a self-contained web search pipeline.
//!
//! Given seed URLs, [`SearchEngine::build`] concurrently crawls reachable
//! pages under a page-count and time budget, builds an inverted index over
//! the frozen corpus, and computes PageRank over the discovered link graph.
//! [`SearchEngine::search`] then answers keyword queries by combining BM25
//! term relevance with link authority.
//!
//! ```no_run
//! use minisearch::SearchEngine;
//!
//! # async fn run() -> minisearch::Result<()> {
//! let mut engine = SearchEngine::new();
//! engine.build(&["https://example.com".into()]).await?;
//! for hit in engine.search("example")? {
//!     println!("{:.3}  {}  {}", hit.score, hit.title, hit.link);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! All state lives in memory for one build-and-query cycle; a rebuild
//! replaces the artifact wholesale. Remote result providers plug in through
//! [`ResultProvider`] with [`Failover`] chaining.

pub mod crawler;
pub mod engine;
pub mod error;
pub mod indexer;
pub mod provider;
pub mod ranker;
pub mod tokenizer;

pub use crawler::{CorpusMap, CrawlConfig, Crawler, Document};
pub use engine::{SearchEngine, SearchHit};
pub use error::{Result, SearchError};
pub use indexer::{build_index, DocId, Index, Posting};
pub use provider::{Failover, ProviderError, ProviderResult, ResultProvider};
pub use ranker::{LinkGraph, RankConfig, Ranker};
