//! Inverted-index construction over a frozen corpus snapshot.
//!
//! Document IDs are dense integers assigned in corpus iteration order, so
//! the index is deterministic for a given corpus. Rebuilding is whole-corpus
//! only; there is no incremental update path.

use crate::crawler::CorpusMap;
use crate::tokenizer::tokenize;
use std::collections::HashMap;
use tracing::info;

pub type DocId = u32;

/// How many times the title is prepended to the body before counting terms,
/// biasing term frequency toward title matches.
pub const TITLE_WEIGHT: usize = 2;

/// One entry in a term's postings list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    pub doc_id: DocId,
    pub term_frequency: u32,
}

/// The build output: postings plus the document maps and length statistics
/// BM25 needs. Read-only once built.
#[derive(Debug, Default)]
pub struct Index {
    /// term → postings, at most one posting per (term, document) pair.
    pub postings: HashMap<String, Vec<Posting>>,
    /// url → DocId. Bijective with `reverse_doc_map`.
    pub doc_map: HashMap<String, DocId>,
    /// DocId → url, indexed directly since IDs are dense.
    pub reverse_doc_map: Vec<String>,
    /// DocId → token count after title weighting.
    pub doc_lengths: Vec<u32>,
    /// Mean of `doc_lengths`; 0.0 for an empty corpus.
    pub avg_doc_len: f64,
}

impl Index {
    pub fn num_docs(&self) -> usize {
        self.reverse_doc_map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reverse_doc_map.is_empty()
    }
}

/// Build the inverted index, document maps, and length statistics for a
/// corpus. An empty corpus yields empty structures without error.
pub fn build_index(corpus: &CorpusMap) -> Index {
    let mut index = Index::default();
    let mut total_len: u64 = 0;

    for (url, doc) in corpus {
        let doc_id = index.reverse_doc_map.len() as DocId;
        index.doc_map.insert(url.clone(), doc_id);
        index.reverse_doc_map.push(url.clone());

        let mut text =
            String::with_capacity((doc.title.len() + 1) * TITLE_WEIGHT + doc.content.len());
        for _ in 0..TITLE_WEIGHT {
            text.push_str(&doc.title);
            text.push(' ');
        }
        text.push_str(&doc.content);

        let tokens = tokenize(&text);
        index.doc_lengths.push(tokens.len() as u32);
        total_len += tokens.len() as u64;

        let mut tf: HashMap<&str, u32> = HashMap::new();
        for token in &tokens {
            *tf.entry(token.as_str()).or_insert(0) += 1;
        }
        for (term, freq) in tf {
            index
                .postings
                .entry(term.to_string())
                .or_default()
                .push(Posting {
                    doc_id,
                    term_frequency: freq,
                });
        }
    }

    let n = index.num_docs();
    index.avg_doc_len = if n == 0 {
        0.0
    } else {
        total_len as f64 / n as f64
    };
    info!(num_docs = n, num_terms = index.postings.len(), "index built");
    index
}
