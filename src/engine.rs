//! Orchestration: build (crawl → index → rank) and query serving.

use crate::crawler::{CorpusMap, CrawlConfig, Crawler};
use crate::error::{Result, SearchError};
use crate::indexer::{build_index, Index};
use crate::ranker::{RankConfig, Ranker};
use crate::tokenizer::tokenize;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

const SNIPPET_BEFORE: usize = 60;
const SNIPPET_AFTER: usize = 140;
const SNIPPET_FALLBACK: usize = 200;
const ELLIPSIS: &str = "…";

/// One search result as presented to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub link: String,
    pub snippet: String,
    pub score: f64,
}

/// Everything one build produces. Created exactly once per `build` call and
/// never mutated afterwards, so any number of concurrent searches can share
/// it through the `Arc` without locking.
struct BuildArtifact {
    corpus: CorpusMap,
    index: Arc<Index>,
    ranker: Ranker,
}

/// The search engine: crawls and indexes on [`SearchEngine::build`], answers
/// keyword queries on [`SearchEngine::search`].
pub struct SearchEngine {
    crawl_config: CrawlConfig,
    rank_config: RankConfig,
    artifact: Option<Arc<BuildArtifact>>,
}

impl SearchEngine {
    pub fn new() -> Self {
        Self::with_config(CrawlConfig::default(), RankConfig::default())
    }

    pub fn with_config(crawl_config: CrawlConfig, rank_config: RankConfig) -> Self {
        Self {
            crawl_config,
            rank_config,
            artifact: None,
        }
    }

    /// Crawl from the seeds, then index the corpus and compute PageRank.
    /// Replaces any previous build artifact wholesale.
    pub async fn build(&mut self, seeds: &[String]) -> Result<()> {
        let crawler = Crawler::new(self.crawl_config.clone())?;
        let corpus = crawler.crawl(seeds).await;
        self.build_from_corpus(corpus);
        Ok(())
    }

    /// Index and rank a pre-fetched corpus without crawling.
    pub fn build_from_corpus(&mut self, corpus: CorpusMap) {
        let index = Arc::new(build_index(&corpus));
        let mut ranker = Ranker::new(&corpus, Arc::clone(&index), self.rank_config.clone());
        ranker.compute_pagerank();
        info!(pages = corpus.len(), "search engine built");
        self.artifact = Some(Arc::new(BuildArtifact {
            corpus,
            index,
            ranker,
        }));
    }

    pub fn is_built(&self) -> bool {
        self.artifact.is_some()
    }

    /// Answer a keyword query against the current build.
    ///
    /// Returns [`SearchError::NotBuilt`] if no build has completed; an empty
    /// result list is the normal outcome for a query matching nothing.
    pub fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        let artifact = self.artifact.as_ref().ok_or(SearchError::NotBuilt)?;
        let tokens = tokenize(query);
        let scored = artifact.ranker.score(&tokens);

        let mut hits = Vec::with_capacity(scored.len());
        for (doc_id, score) in scored {
            let url = &artifact.index.reverse_doc_map[doc_id as usize];
            let Some(doc) = artifact.corpus.get(url) else {
                continue;
            };
            hits.push(SearchHit {
                title: doc.title.clone(),
                link: url.clone(),
                snippet: snippet(&doc.content, &tokens),
                score,
            });
        }
        Ok(hits)
    }
}

impl Default for SearchEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Window around the earliest query-token occurrence in the content, with
/// ellipsis markers where truncated. Falls back to the opening of the
/// document when no token occurs.
fn snippet(content: &str, tokens: &[String]) -> String {
    let lowered = content.to_lowercase();
    let hit = tokens
        .iter()
        .filter_map(|token| lowered.find(token.as_str()))
        .min();
    let Some(pos) = hit else {
        return leading_snippet(content);
    };
    // The offset comes from the lowercased copy, whose byte length can
    // differ; clamp onto char boundaries of the original.
    let pos = floor_boundary(content, pos.min(content.len()));
    let start = floor_boundary(content, pos.saturating_sub(SNIPPET_BEFORE));
    let end = floor_boundary(content, (pos + SNIPPET_AFTER).min(content.len()));

    let mut out = String::new();
    if start > 0 {
        out.push_str(ELLIPSIS);
    }
    out.push_str(&content[start..end]);
    if end < content.len() {
        out.push_str(ELLIPSIS);
    }
    out
}

fn leading_snippet(content: &str) -> String {
    let mut out: String = content.chars().take(SNIPPET_FALLBACK).collect();
    if out.len() < content.len() {
        out.push_str(ELLIPSIS);
    }
    out
}

fn floor_boundary(s: &str, mut idx: usize) -> usize {
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}
