pub mod segment;

use std::fmt;

use tracing::warn;
use unicode_normalization::UnicodeNormalization;

use crate::config::{NormalizerConfig, SegmenterConfig};
use crate::error::Result;
use crate::types::{CleanedRecord, SourceRecord};

use self::segment::{CommandSegmenter, LexiconSegmenter, Segmenter, WhitespaceSegmenter};

/// Turns raw text into a filtered token string, and stored content into terms.
///
/// Both harvesting (`normalize`) and keyword extraction (`terms`) go through
/// the same token policy:
/// - a token survives only if every char is Latin (with diacritics), a digit, `_`, `.` or `-`
/// - stopword and length checks run on the space form of a compound (`kinh tế`)
/// - normalized content keeps the joiner (`kinh_tế`), terms use the space form
///
/// Never fails: empty or unusable input gives an empty result.
pub struct Normalizer {
    config: NormalizerConfig,
    segmenter: Box<dyn Segmenter>,
}

impl fmt::Debug for Normalizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Normalizer")
            .field("stopwords", &self.config.stopwords.len())
            .field("joiner", &self.config.joiner)
            .field("segmenter", &self.config.segmenter)
            .finish()
    }
}

impl Normalizer {
    /// Build the segmenter described by `config.segmenter`.
    /// Fails only when a lexicon file is missing or unreadable.
    pub fn new(config: &NormalizerConfig) -> Result<Self> {
        let segmenter: Box<dyn Segmenter> = match &config.segmenter {
            SegmenterConfig::Whitespace => Box::new(WhitespaceSegmenter),
            SegmenterConfig::Lexicon(path) => Box::new(LexiconSegmenter::from_file(path, config.joiner)?),
            SegmenterConfig::Command { program, args } => {
                Box::new(CommandSegmenter::new(program.clone(), args.clone()))
            }
        };
        Ok(Self {
            config: config.clone(),
            segmenter,
        })
    }

    /// Use a caller-provided segmenter; `config.segmenter` is ignored.
    pub fn with_segmenter(config: &NormalizerConfig, segmenter: impl Segmenter + 'static) -> Self {
        Self {
            config: config.clone(),
            segmenter: Box::new(segmenter),
        }
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// raw text -> space-joined surviving tokens
    pub fn normalize(&self, raw: &str) -> String {
        if raw.trim().is_empty() {
            return String::new();
        }
        let joiner = self.config.joiner;
        let folded: String = raw
            .nfc()
            .collect::<String>()
            .to_lowercase()
            .chars()
            .map(|c| if is_representable(c, joiner) { c } else { ' ' })
            .collect();
        let segmented = self.segment(&folded);
        segmented
            .split_whitespace()
            .filter_map(|token| self.accept(token))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Normalize one source record.
    pub fn clean(&self, record: &SourceRecord) -> CleanedRecord {
        CleanedRecord {
            id: record.id.clone(),
            category: record.category.trim().to_string(),
            content: self.normalize(&record.raw_text),
        }
    }

    /// Stored content -> terms for keyword scoring.
    /// Content is segmented again so that unjoined compounds are recognized.
    pub fn terms(&self, content: &str) -> Vec<String> {
        if content.trim().is_empty() {
            return Vec::new();
        }
        let joiner = self.config.joiner;
        self.segment(content)
            .split_whitespace()
            .filter_map(|token| self.accept(token))
            .map(|token| token.replace(joiner, " "))
            .collect()
    }

    fn segment(&self, text: &str) -> String {
        match self.segmenter.segment(text) {
            Ok(segmented) => segmented,
            Err(e) => {
                warn!(error = %e, bytes = text.len(), "segmentation failed, falling back to whitespace tokens");
                text.to_string()
            }
        }
    }

    /// validity + stopword + length filter
    fn accept<'t>(&self, token: &'t str) -> Option<&'t str> {
        let joiner = self.config.joiner;
        let token = token.trim_matches(|c| c == '.' || c == '-');
        if token.is_empty() || !token.chars().all(|c| is_allowed(c, joiner)) {
            return None;
        }
        let spaced = token.replace(joiner, " ");
        let spaced = spaced.trim();
        if spaced.chars().count() < self.config.min_token_chars || self.config.stopwords.contains(spaced) {
            return None;
        }
        Some(token)
    }
}

/// Chars kept before segmentation; everything else becomes whitespace.
#[inline]
fn is_representable(c: char, joiner: char) -> bool {
    c.is_whitespace() || c.is_alphanumeric() || c == joiner || c == '_' || c == '.' || c == '-'
}

/// Allow-listed alphabet for surviving tokens.
#[inline]
fn is_allowed(c: char, joiner: char) -> bool {
    c.is_ascii_alphanumeric() || c == joiner || c == '_' || c == '.' || c == '-' || is_latin_letter(c)
}

#[inline]
fn is_latin_letter(c: char) -> bool {
    matches!(c, '\u{00C0}'..='\u{024F}' | '\u{1E00}'..='\u{1EFF}')
        && c != '\u{00D7}'
        && c != '\u{00F7}'
        && c.is_alphabetic()
}
