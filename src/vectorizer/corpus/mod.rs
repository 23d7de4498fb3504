use ahash::RandomState;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::vectorizer::term::TermFrequency;

/// Per-term statistics over the fitted documents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermStat {
    /// number of documents containing the term
    pub doc_freq: u64,
    /// occurrences over all documents
    pub total_count: u64,
}

/// keep document count and term statistics
/// terms are kept in first-seen order, which is the vocabulary order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Corpus {
    doc_num: u64,
    term_stats: IndexMap<Box<str>, TermStat, RandomState>,
}

impl Corpus {
    /// Create a new instance
    pub fn new() -> Self {
        Self {
            doc_num: 0,
            term_stats: IndexMap::with_hasher(RandomState::new()),
        }
    }

    /// Add a document's terms to the corpus
    pub fn add_doc(&mut self, doc: &TermFrequency) {
        self.doc_num += 1;
        for (term, count) in doc.iter() {
            match self.term_stats.get_mut(term) {
                Some(stat) => {
                    stat.doc_freq += 1;
                    stat.total_count += count;
                }
                None => {
                    self.term_stats.insert(
                        term.into(),
                        TermStat {
                            doc_freq: 1,
                            total_count: count,
                        },
                    );
                }
            }
        }
    }

    /// Get the number of documents in the corpus
    pub fn get_doc_num(&self) -> u64 {
        self.doc_num
    }

    /// Number of documents containing `term`
    pub fn get_doc_freq(&self, term: &str) -> u64 {
        self.term_stats.get(term).map_or(0, |stat| stat.doc_freq)
    }

    /// Terms in first-seen order
    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.term_stats.keys().map(|t| &**t)
    }

    /// The `limit` most frequent terms (by total count, ties by first-seen),
    /// returned in first-seen order.
    pub fn frequent_terms(&self, limit: usize) -> Vec<&str> {
        if limit >= self.term_stats.len() {
            return self.terms().collect();
        }
        let mut ranked: Vec<(usize, u64)> = self
            .term_stats
            .values()
            .enumerate()
            .map(|(idx, stat)| (idx, stat.total_count))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(limit);
        // 語彙順 (初出順) に戻す
        ranked.sort_unstable_by_key(|&(idx, _)| idx);
        ranked
            .into_iter()
            .filter_map(|(idx, _)| self.term_stats.get_index(idx).map(|(t, _)| &**t))
            .collect()
    }
}
