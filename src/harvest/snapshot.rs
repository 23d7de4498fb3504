use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::error::{HarvestError, Result};
use crate::harvest::store::read_jsonl_into;
use crate::types::CleanedRecord;
use crate::utils::fs::write_atomic;

/// The assembled corpus: every shard concatenated in ascending index order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorpusSnapshot {
    pub records: Vec<CleanedRecord>,
}

impl CorpusSnapshot {
    pub fn new(records: Vec<CleanedRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CleanedRecord> {
        self.records.iter()
    }

    /// Write as JSON lines, replacing any previous snapshot atomically.
    pub fn write_jsonl(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut bytes = Vec::with_capacity(self.records.len() * 256);
        for record in &self.records {
            write_line(&mut bytes, record)?;
        }
        write_atomic(path, &bytes)?;
        info!(path = %path.display(), records = self.records.len(), "corpus snapshot written");
        Ok(())
    }

    /// Reload a snapshot written by `write_jsonl`.
    pub fn load_jsonl(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(HarvestError::missing(path));
        }
        let mut records = Vec::new();
        read_jsonl_into(path, &mut records)?;
        Ok(Self { records })
    }
}

impl From<Vec<CleanedRecord>> for CorpusSnapshot {
    fn from(records: Vec<CleanedRecord>) -> Self {
        Self::new(records)
    }
}

impl<'a> IntoIterator for &'a CorpusSnapshot {
    type Item = &'a CleanedRecord;
    type IntoIter = std::slice::Iter<'a, CleanedRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

fn write_line<T: Serialize>(buf: &mut Vec<u8>, value: &T) -> Result<()> {
    serde_json::to_writer(&mut *buf, value)?;
    buf.push(b'\n');
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn snapshot_survives_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("all_news.jsonl");
        let snapshot = CorpusSnapshot::new(vec![
            CleanedRecord { id: "1".into(), category: "A".into(), content: "kinh_tế việt_nam".into() },
            CleanedRecord { id: "2".into(), category: "B".into(), content: String::new() },
        ]);
        snapshot.write_jsonl(&path).unwrap();
        assert_eq!(CorpusSnapshot::load_jsonl(&path).unwrap(), snapshot);
    }

    #[test]
    fn missing_snapshot_is_reported() {
        let dir = tempdir().unwrap();
        let err = CorpusSnapshot::load_jsonl(dir.path().join("absent.jsonl")).unwrap_err();
        assert!(matches!(err, HarvestError::MissingArtifact { .. }));
    }
}
