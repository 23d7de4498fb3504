use serde::{Deserialize, Serialize};

/// One unit read from the remote corpus.
/// Read once from the cursor and never modified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRecord {
    pub id: String,
    pub category: String,
    /// Raw article text. Non-string or missing fields arrive as an empty string.
    pub raw_text: String,
}

impl SourceRecord {
    pub fn new(id: impl Into<String>, category: impl Into<String>, raw_text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            category: category.into(),
            raw_text: raw_text.into(),
        }
    }
}

/// A record after normalization.
/// This is also the line format of shard files: `{"id", "category", "content"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanedRecord {
    pub id: String,
    pub category: String,
    /// space-joined normalized tokens, may be empty
    pub content: String,
}

/// Number of source records durably committed to shards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub processed: u64,
}

impl Checkpoint {
    pub fn new(processed: u64) -> Self {
        Self { processed }
    }
}
