//! Resumable corpus harvesting and TF-IDF keyword extraction.
pub mod config;
pub mod error;
pub mod harvest;
pub mod normalize;
pub mod types;
pub mod utils;
pub mod vectorizer;
pub mod worker;

/// Error types
/// - `HarvestError`: every fallible operation of this crate
/// - `SourceError`: failures of a remote page source; `Expired` is the
///   cursor-lease condition the harvester turns into a clean stop
pub use error::{HarvestError, Result, SourceError};

/// Records flowing through the pipeline
/// - `SourceRecord`: read once from the cursor
/// - `CleanedRecord`: normalized record, the line format of shard files
/// - `Checkpoint`: count of records durably committed to shards
pub use types::{Checkpoint, CleanedRecord, SourceRecord};

/// Harvester
/// Walks a `PageSource` page by page, normalizes records in parallel and
/// commits them in numbered shards, advancing the checkpoint only after the
/// shard write succeeded.
///
/// A restarted run skips the records the checkpoint already covers,
/// truncating any uncheckpointed shard tail left by a crash.
/// Lease expiry ends a run early without error.
pub use harvest::{CorpusSnapshot, Harvest, HarvestStats, Harvester, StopReason};

/// Page sources
/// - `PageSource`: server-side cursor with a renewable lease
/// - `ElasticScrollSource`: Elasticsearch scroll API
/// - `MemoryPageSource`: in-process source with failure injection
pub use harvest::{elastic::ElasticScrollSource, source::{MemoryPageSource, Page, PageSource}};

/// Checkpoint + shard directory
pub use harvest::store::ShardStore;

/// Text Normalizer
/// Unicode composition, case folding, segmentation and token filtering.
/// Also produces the terms used for keyword scoring.
pub use normalize::Normalizer;

/// Keyword extraction
/// - grouped mode: one synthetic document per group key
/// - per-document mode: locally fitted batches of documents
pub use vectorizer::extract::KeywordExtractor;

/// Keyword artifacts
/// `KeywordReport` maps a key to a `KeywordList` and is stored as JSON and CBOR.
pub use vectorizer::report::{KeywordEntry, KeywordList, KeywordReport};

/// TF-IDF Vectorizer
/// Fits a capped vocabulary and IDF vector over term frequencies and ranks
/// the terms of a document.
///
/// `KeywordVectorizer<N, E>` has the following generic parameters:
/// - `N`: Score type (f32, f64)
/// - `E`: TF-IDF calculation engine type (e.g., DefaultTFIDFEngine)
pub use vectorizer::KeywordVectorizer;

/// TF IDF Calculation Engine Trait
/// By implementing this trait, you can plug different TF-IDF calculation strategies
/// into `KeywordVectorizer<N, E>`.
/// `DefaultTFIDFEngine` uses raw counts, smoothed IDF and L2-normalized rows.
pub use vectorizer::tfidf::{DefaultTFIDFEngine, TFIDFEngine};

/// Corpus statistics (document count, document frequency, total counts)
pub use vectorizer::corpus::Corpus;

/// Term Frequency structure
/// Occurrence counts of the terms of one document, in first-seen order.
pub use vectorizer::term::TermFrequency;
