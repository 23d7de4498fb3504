use std::collections::BTreeMap;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::config::ExtractConfig;
use crate::normalize::Normalizer;
use crate::types::CleanedRecord;
use crate::vectorizer::{
    report::{KeywordList, KeywordReport},
    term::TermFrequency,
    KeywordVectorizer,
};

/// Keyword extraction over cleaned records.
///
/// Both modes turn content into terms through `Normalizer::terms`, so grouped
/// and per-document results share one vocabulary policy.
#[derive(Debug, Clone, Copy)]
pub struct KeywordExtractor<'n> {
    normalizer: &'n Normalizer,
    max_features: usize,
}

impl<'n> KeywordExtractor<'n> {
    pub fn new(normalizer: &'n Normalizer, max_features: usize) -> Self {
        Self {
            normalizer,
            max_features,
        }
    }

    pub fn from_config(normalizer: &'n Normalizer, config: &ExtractConfig) -> Self {
        Self::new(normalizer, config.max_features)
    }

    /// One synthetic document per group: every member's content joined.
    /// IDF is computed across groups. Keys come out in ascending order;
    /// a group without positive-score terms maps to an empty list.
    pub fn extract_by_group<F>(&self, records: &[CleanedRecord], group_key: F, top_n: usize) -> KeywordReport
    where
        F: for<'r> Fn(&'r CleanedRecord) -> &'r str,
    {
        let mut groups: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for record in records {
            groups.entry(group_key(record)).or_default().push(record.content.as_str());
        }

        let docs: Vec<(&str, TermFrequency)> = groups
            .into_par_iter()
            .map(|(key, contents)| (key, self.analyze(&contents.join(" "))))
            .collect();

        let mut vectorizer: KeywordVectorizer = KeywordVectorizer::new(self.max_features);
        vectorizer.fit(docs.iter().map(|(_, tf)| tf));
        info!(
            groups = docs.len(),
            vocabulary = vectorizer.vocabulary().len(),
            "fitted grouped keyword model"
        );

        let mut report = KeywordReport::new();
        for (key, tf) in &docs {
            report.insert(*key, vectorizer.top_terms(tf, top_n));
        }
        report
    }

    /// Grouped mode keyed by `category`.
    pub fn extract_by_category(&self, records: &[CleanedRecord], top_n: usize) -> KeywordReport {
        self.extract_by_group(records, |r| r.category.as_str(), top_n)
    }

    /// Keywords of each document, fitted locally per batch of `doc_batch_size`.
    ///
    /// Scores are comparable only inside one batch. Documents whose content is
    /// empty or yields no terms are excluded before fitting and never appear
    /// in the result. A repeated id keeps its first position with the later list.
    pub fn extract_per_document(&self, records: &[CleanedRecord], top_n: usize, doc_batch_size: usize) -> KeywordReport {
        let batch_size = doc_batch_size.max(1);
        let mut report = KeywordReport::new();
        let mut excluded = 0usize;

        for (batch_no, batch) in records.chunks(batch_size).enumerate() {
            let docs: Vec<(&str, TermFrequency)> = batch
                .par_iter()
                .filter(|r| !r.content.trim().is_empty())
                .map(|r| (r.id.as_str(), self.analyze(&r.content)))
                .filter(|(_, tf)| !tf.is_empty())
                .collect();
            excluded += batch.len() - docs.len();
            if docs.is_empty() {
                continue;
            }

            let mut vectorizer: KeywordVectorizer = KeywordVectorizer::new(self.max_features);
            vectorizer.fit(docs.iter().map(|(_, tf)| tf));

            let lists: Vec<(&str, KeywordList)> = docs
                .par_iter()
                .map(|(id, tf)| (*id, vectorizer.top_terms(tf, top_n)))
                .collect();
            for (id, list) in lists {
                report.insert(id, list);
            }
            debug!(batch = batch_no, documents = docs.len(), "scored document batch");
        }

        info!(documents = report.len(), excluded, "per-document keywords extracted");
        report
    }

    fn analyze(&self, content: &str) -> TermFrequency {
        let terms = self.normalizer.terms(content);
        TermFrequency::from(terms.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NormalizerConfig;
    use crate::normalize::segment::LexiconSegmenter;

    fn normalizer() -> Normalizer {
        Normalizer::with_segmenter(
            &NormalizerConfig::default(),
            LexiconSegmenter::new(["kinh tế", "việt nam", "thế giới", "bóng đá"], '_'),
        )
    }

    fn record(id: &str, category: &str, content: &str) -> CleanedRecord {
        CleanedRecord {
            id: id.into(),
            category: category.into(),
            content: content.into(),
        }
    }

    fn scenario() -> Vec<CleanedRecord> {
        vec![
            record("1", "A", "kinh tế việt nam"),
            record("2", "A", "kinh tế thế giới"),
            record("3", "B", "bóng đá việt nam"),
        ]
    }

    #[test]
    fn grouped_scenario() {
        let n = normalizer();
        let report = KeywordExtractor::new(&n, 5000).extract_by_category(&scenario(), 2);

        assert_eq!(report.keys().collect::<Vec<_>>(), ["A", "B"]);
        let a = report.get("A").unwrap();
        assert_eq!(a.terms(), ["kinh tế", "thế giới"]);
        assert!(a.0[0].score > a.0[1].score);
        let b = report.get("B").unwrap();
        assert_eq!(b.terms(), ["bóng đá", "việt nam"]);
    }

    #[test]
    fn per_document_skips_empty_content() {
        let n = normalizer();
        let mut records = scenario();
        records.push(record("4", "B", ""));
        records.push(record("5", "B", "   "));
        let report = KeywordExtractor::new(&n, 5000).extract_per_document(&records, 10, 2);

        assert_eq!(report.keys().collect::<Vec<_>>(), ["1", "2", "3"]);
        for (_, list) in report.iter() {
            assert!(list.iter().all(|e| e.score > 0.0));
        }
    }

    #[test]
    fn single_document_batch_still_scores() {
        let n = normalizer();
        let report = KeywordExtractor::new(&n, 5000).extract_per_document(&scenario(), 10, 1);
        let first = report.get("1").unwrap();
        assert_eq!(first.terms(), ["kinh tế", "việt nam"]);
        assert_eq!(first.0[0].score, 0.707);
    }

    #[test]
    fn vocabulary_cap_limits_terms() {
        let n = normalizer();
        let report = KeywordExtractor::new(&n, 1).extract_by_category(&scenario(), 10);
        // kinh tế and việt nam both occur twice; the first-seen one is kept
        assert_eq!(report.get("A").unwrap().terms(), ["kinh tế"]);
        assert!(report.get("B").unwrap().is_empty());
    }
}
