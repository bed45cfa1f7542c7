//! Ranking: PageRank over the crawl's link graph, BM25 term relevance, and
//! their combination into one query-time score.

use crate::crawler::CorpusMap;
use crate::indexer::{DocId, Index};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct RankConfig {
    /// BM25 term-frequency saturation.
    pub k1: f64,
    /// BM25 document-length normalization strength.
    pub b: f64,
    /// Scale applied to PageRank before adding it to BM25. PageRank mass is
    /// on the order of 1/N while BM25 totals land in the 1–10 range, so the
    /// default rescales authority to be felt without drowning relevance.
    /// Heuristic, deliberately exposed rather than inferred.
    pub pagerank_weight: f64,
    pub damping: f64,
    pub max_iterations: usize,
    /// L1 convergence threshold for the power iteration.
    pub tolerance: f64,
}

impl Default for RankConfig {
    fn default() -> Self {
        Self {
            k1: 1.5,
            b: 0.75,
            pagerank_weight: 100.0,
            damping: 0.85,
            max_iterations: 100,
            tolerance: 1.0e-6,
        }
    }
}

/// Sparse directed graph over DocIds. Edges keep only outbound links that
/// resolve to another document in the same corpus; a node with no qualifying
/// out-edges is dangling.
#[derive(Debug, Default)]
pub struct LinkGraph {
    out: Vec<Vec<DocId>>,
}

impl LinkGraph {
    pub fn from_corpus(corpus: &CorpusMap, index: &Index) -> Self {
        let mut out = vec![Vec::new(); index.num_docs()];
        for (url, doc) in corpus {
            let Some(&src) = index.doc_map.get(url) else {
                continue;
            };
            let mut targets: Vec<DocId> = doc
                .links
                .iter()
                .filter_map(|link| index.doc_map.get(link).copied())
                .collect();
            targets.sort_unstable();
            targets.dedup();
            out[src as usize] = targets;
        }
        Self { out }
    }

    pub fn num_nodes(&self) -> usize {
        self.out.len()
    }

    pub fn out_degree(&self, doc: DocId) -> usize {
        self.out[doc as usize].len()
    }
}

/// Holds the link graph and inverted index for one build. The rank vector
/// starts uniform and is overwritten once by [`Ranker::compute_pagerank`];
/// after that the whole struct is read-only and safe to share across
/// concurrent queries.
pub struct Ranker {
    index: Arc<Index>,
    graph: LinkGraph,
    config: RankConfig,
    pagerank: Vec<f64>,
}

impl Ranker {
    pub fn new(corpus: &CorpusMap, index: Arc<Index>, config: RankConfig) -> Self {
        let graph = LinkGraph::from_corpus(corpus, &index);
        let n = index.num_docs();
        let pagerank = if n == 0 {
            Vec::new()
        } else {
            vec![1.0 / n as f64; n]
        };
        Self {
            index,
            graph,
            config,
            pagerank,
        }
    }

    /// Power iteration:
    ///
    /// ```text
    /// r' = d * (M · r) + d * danglingMass / N + (1 - d) / N
    /// ```
    ///
    /// where M spreads each node's rank uniformly over its in-corpus
    /// out-edges and dangling nodes redistribute their entire mass over all
    /// documents. Stops when the L1 delta falls below `tolerance` or after
    /// `max_iterations`. Entries stay non-negative and sum to ≈ 1.
    pub fn compute_pagerank(&mut self) -> &[f64] {
        let n = self.graph.num_nodes();
        if n == 0 {
            return &self.pagerank;
        }
        let teleport = (1.0 - self.config.damping) / n as f64;
        for iteration in 0..self.config.max_iterations {
            let mut next = vec![0.0; n];
            let mut dangling_mass = 0.0;
            for (src, targets) in self.graph.out.iter().enumerate() {
                if targets.is_empty() {
                    dangling_mass += self.pagerank[src];
                } else {
                    let share = self.pagerank[src] / targets.len() as f64;
                    for &target in targets {
                        next[target as usize] += share;
                    }
                }
            }
            let dangling_share = self.config.damping * dangling_mass / n as f64;
            for value in next.iter_mut() {
                *value = self.config.damping * *value + dangling_share + teleport;
            }
            let delta: f64 = next
                .iter()
                .zip(&self.pagerank)
                .map(|(a, b)| (a - b).abs())
                .sum();
            self.pagerank = next;
            if delta < self.config.tolerance {
                debug!(iterations = iteration + 1, "pagerank converged");
                break;
            }
        }
        &self.pagerank
    }

    pub fn pagerank(&self) -> &[f64] {
        &self.pagerank
    }

    /// Score documents for the query tokens: BM25 accumulated per document,
    /// plus `pagerank_weight` times the document's PageRank. Only documents
    /// with a BM25 contribution are candidates; link authority alone never
    /// admits a document. Sorted by descending score, ties broken by
    /// ascending DocId.
    pub fn score(&self, query_tokens: &[String]) -> Vec<(DocId, f64)> {
        let n = self.index.num_docs();
        if n == 0 || query_tokens.is_empty() {
            return Vec::new();
        }
        let avgdl = self.index.avg_doc_len;
        let k1 = self.config.k1;
        let b = self.config.b;

        let mut bm25: HashMap<DocId, f64> = HashMap::new();
        for token in query_tokens {
            let Some(postings) = self.index.postings.get(token) else {
                continue;
            };
            let df = postings.len() as f64;
            let idf = (1.0 + (n as f64 - df + 0.5) / (df + 0.5)).ln();
            for posting in postings {
                let tf = posting.term_frequency as f64;
                let dl = self.index.doc_lengths[posting.doc_id as usize] as f64;
                let len_norm = if avgdl > 0.0 { dl / avgdl } else { 0.0 };
                let gain = idf * (tf * (k1 + 1.0)) / (tf + k1 * (1.0 - b + b * len_norm));
                *bm25.entry(posting.doc_id).or_insert(0.0) += gain;
            }
        }

        let mut scored: Vec<(DocId, f64)> = bm25
            .into_iter()
            .map(|(doc_id, relevance)| {
                (
                    doc_id,
                    relevance + self.config.pagerank_weight * self.pagerank[doc_id as usize],
                )
            })
            .collect();
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        scored
    }
}
