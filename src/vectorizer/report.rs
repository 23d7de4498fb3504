use std::fs;
use std::path::Path;

use ahash::RandomState;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{HarvestError, Result};
use crate::utils::fs::write_atomic;

/// One ranked term. Serialized as `[term, score]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "(String, f64)", into = "(String, f64)")]
pub struct KeywordEntry {
    pub term: String,
    pub score: f64,
}

impl KeywordEntry {
    pub fn new(term: impl Into<String>, score: f64) -> Self {
        Self {
            term: term.into(),
            score,
        }
    }
}

impl From<(String, f64)> for KeywordEntry {
    fn from((term, score): (String, f64)) -> Self {
        Self { term, score }
    }
}

impl From<KeywordEntry> for (String, f64) {
    fn from(entry: KeywordEntry) -> Self {
        (entry.term, entry.score)
    }
}

/// At most N entries, score descending, ties in vocabulary order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeywordList(pub Vec<KeywordEntry>);

impl KeywordList {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, KeywordEntry> {
        self.0.iter()
    }

    pub fn terms(&self) -> Vec<&str> {
        self.0.iter().map(|e| e.term.as_str()).collect()
    }
}

impl FromIterator<KeywordEntry> for KeywordList {
    fn from_iter<I: IntoIterator<Item = KeywordEntry>>(iter: I) -> Self {
        KeywordList(iter.into_iter().collect())
    }
}

/// Group key or document id -> keyword list.
///
/// Artifacts:
/// - JSON: `{"key": [["term", 0.812], …], …}`
/// - CBOR: same structure, for fast reload
///
/// Both are written through an atomic replace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeywordReport {
    entries: IndexMap<String, KeywordList, RandomState>,
}

impl KeywordReport {
    pub fn new() -> Self {
        Self {
            entries: IndexMap::with_hasher(RandomState::new()),
        }
    }

    /// Insert or replace the list of `key`. A replaced key keeps its position.
    pub fn insert(&mut self, key: impl Into<String>, list: KeywordList) -> Option<KeywordList> {
        self.entries.insert(key.into(), list)
    }

    pub fn get(&self, key: &str) -> Option<&KeywordList> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &KeywordList)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let bytes = serde_json::to_vec_pretty(self)?;
        write_atomic(path, &bytes)?;
        info!(path = %path.display(), keys = self.len(), "keyword report written");
        Ok(())
    }

    pub fn save_binary(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let bytes = serde_cbor::to_vec(self)?;
        write_atomic(path, &bytes)?;
        info!(path = %path.display(), keys = self.len(), "keyword report written");
        Ok(())
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = read_artifact(path.as_ref())?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn load_binary(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = read_artifact(path.as_ref())?;
        Ok(serde_cbor::from_slice(&bytes)?)
    }
}

fn read_artifact(path: &Path) -> Result<Vec<u8>> {
    if !path.exists() {
        return Err(HarvestError::missing(path));
    }
    Ok(fs::read(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn report() -> KeywordReport {
        let mut report = KeywordReport::new();
        report.insert(
            "Kinh doanh",
            KeywordList(vec![KeywordEntry::new("kinh tế", 0.894), KeywordEntry::new("thế giới", 0.447)]),
        );
        report.insert("Thể thao", KeywordList::default());
        report
    }

    #[test]
    fn json_shape_is_term_score_pairs() {
        let value = serde_json::to_value(report()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "Kinh doanh": [["kinh tế", 0.894], ["thế giới", 0.447]],
                "Thể thao": []
            })
        );
    }

    #[test]
    fn artifacts_reload() {
        let dir = tempdir().unwrap();
        let report = report();
        report.save_json(dir.path().join("keywords.json")).unwrap();
        report.save_binary(dir.path().join("keywords.cbor")).unwrap();

        assert_eq!(KeywordReport::load_json(dir.path().join("keywords.json")).unwrap(), report);
        let binary = KeywordReport::load_binary(dir.path().join("keywords.cbor")).unwrap();
        assert_eq!(binary.keys().collect::<Vec<_>>(), ["Kinh doanh", "Thể thao"]);
        assert_eq!(binary, report);
    }

    #[test]
    fn missing_artifact_names_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("keywords.cbor");
        match KeywordReport::load_binary(&path) {
            Err(HarvestError::MissingArtifact { path: reported }) => assert_eq!(reported, path),
            other => panic!("expected missing artifact, got {other:?}"),
        }
    }

    #[test]
    fn replacing_a_key_keeps_position() {
        let mut report = report();
        report.insert("Kinh doanh", KeywordList::default());
        assert_eq!(report.keys().next(), Some("Kinh doanh"));
        assert!(report.get("Kinh doanh").unwrap().is_empty());
    }
}
