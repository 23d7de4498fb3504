use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{HarvestError, Result};

/// Controls the cursor walk and the shard/checkpoint layer.
#[derive(Clone, Debug)]
pub struct HarvestConfig {
    /// Directory holding `progress.json` and `batch_NNNNN.jsonl`.
    pub state_dir: PathBuf,
    /// Records requested per page.
    pub page_size: usize,
    /// Buffered records that trigger a shard write + checkpoint.
    pub flush_threshold: usize,
    /// Lease requested when the cursor is opened.
    pub initial_lease: Duration,
    /// Lease requested on every renewal.
    pub renew_lease: Duration,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from("batches"),
            page_size: 5000,
            flush_threshold: 1000,
            initial_lease: Duration::from_secs(5 * 60),
            renew_lease: Duration::from_secs(5 * 60 * 60),
        }
    }
}

impl HarvestConfig {
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(HarvestError::Configuration("page_size must be positive".into()));
        }
        if self.flush_threshold == 0 {
            return Err(HarvestError::Configuration("flush_threshold must be positive".into()));
        }
        Ok(())
    }
}

/// Where the Elasticsearch index lives and which `_source` fields to read.
#[derive(Clone, Debug)]
pub struct ElasticConfig {
    pub host: String,
    pub index: String,
    pub category_field: String,
    pub content_field: String,
}

impl Default for ElasticConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost:9200".to_string(),
            index: "vietnamese_curated_data".to_string(),
            category_field: "category".to_string(),
            content_field: "content".to_string(),
        }
    }
}

/// Word segmentation backend.
#[derive(Clone, Debug, Default)]
pub enum SegmenterConfig {
    /// Tokens are the whitespace-separated words, no compounds.
    #[default]
    Whitespace,
    /// Greedy longest match against a compound lexicon file.
    Lexicon(PathBuf),
    /// External program reading text on stdin and writing segmented text on stdout.
    Command { program: String, args: Vec<String> },
}

/// Token filtering policy shared by harvesting and keyword extraction.
/// Built once by the caller and passed by reference.
#[derive(Clone, Debug)]
pub struct NormalizerConfig {
    pub stopwords: HashSet<String>,
    /// Character joining the words of a compound token (`kinh_tế`).
    pub joiner: char,
    /// Tokens shorter than this (in chars) are dropped.
    pub min_token_chars: usize,
    pub segmenter: SegmenterConfig,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            stopwords: HashSet::new(),
            joiner: '_',
            min_token_chars: 2,
            segmenter: SegmenterConfig::default(),
        }
    }
}

impl NormalizerConfig {
    pub fn with_stopwords<I, T>(mut self, stopwords: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.stopwords = stopwords.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_segmenter(mut self, segmenter: SegmenterConfig) -> Self {
        self.segmenter = segmenter;
        self
    }

    /// Read a stopword list, one entry per line.
    pub fn load_stopwords(path: impl AsRef<Path>) -> Result<HashSet<String>> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(HarvestError::missing(path));
        }
        let text = fs::read_to_string(path)?;
        Ok(text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }
}

/// Keyword extraction defaults.
#[derive(Clone, Debug)]
pub struct ExtractConfig {
    /// Vocabulary cap: most frequent terms kept when fitting.
    pub max_features: usize,
    /// Result length per key.
    pub top_n: usize,
    /// Documents per locally fitted batch in per-document mode.
    pub doc_batch_size: usize,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            max_features: 5000,
            top_n: 10,
            doc_batch_size: 1000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn stopwords_file_is_trimmed_and_skips_blank_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stopwords.txt");
        fs::write(&path, "và\n  của \n\nlà\n").unwrap();

        let stopwords = NormalizerConfig::load_stopwords(&path).unwrap();
        assert_eq!(stopwords.len(), 3);
        assert!(stopwords.contains("của"));
    }

    #[test]
    fn missing_stopwords_file_reports_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.txt");
        match NormalizerConfig::load_stopwords(&path) {
            Err(HarvestError::MissingArtifact { path: reported }) => assert_eq!(reported, path),
            other => panic!("expected missing artifact, got {other:?}"),
        }
    }

    #[test]
    fn zero_flush_threshold_is_rejected() {
        let config = HarvestConfig {
            flush_threshold: 0,
            ..HarvestConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
