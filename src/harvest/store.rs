use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{HarvestError, Result};
use crate::types::{Checkpoint, CleanedRecord};
use crate::utils::fs::write_atomic;

pub const CHECKPOINT_FILE: &str = "progress.json";
const SHARD_PREFIX: &str = "batch_";
const SHARD_SUFFIX: &str = ".jsonl";

/// Checkpoint + shard files of one harvesting run.
///
/// Layout:
/// ```text
/// <dir>/progress.json        {"processed": <n>}
/// <dir>/batch_00000.jsonl    one CleanedRecord per line
/// <dir>/batch_00001.jsonl
/// ```
/// The directory is owned by a single run at a time.
#[derive(Debug, Clone)]
pub struct ShardStore {
    dir: PathBuf,
}

/// Shard state after reconciliation against the checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardLayout {
    /// complete records left in shards (== checkpoint)
    pub records: u64,
    /// uncheckpointed records removed from the tail
    pub truncated: u64,
    /// index the next flush writes to
    pub next_index: u32,
}

/// complete-line scan of one shard file
struct ShardScan {
    index: u32,
    lines: usize,
    complete_len: usize,
    len: usize,
}

impl ShardStore {
    /// Open (and create if needed) a state directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn checkpoint_path(&self) -> PathBuf {
        self.dir.join(CHECKPOINT_FILE)
    }

    pub fn shard_path(&self, index: u32) -> PathBuf {
        self.dir.join(format!("{SHARD_PREFIX}{index:05}{SHARD_SUFFIX}"))
    }

    /// `{processed: 0}` when no checkpoint has been written yet.
    pub fn load_checkpoint(&self) -> Result<Checkpoint> {
        let path = self.checkpoint_path();
        if !path.exists() {
            return Ok(Checkpoint::default());
        }
        let text = fs::read_to_string(&path)?;
        serde_json::from_str(&text)
            .map_err(|e| HarvestError::corruption(&path, format!("unreadable checkpoint: {e}")))
    }

    /// Overwrite the checkpoint through an atomic replace.
    pub fn save_checkpoint(&self, processed: u64) -> Result<()> {
        let bytes = serde_json::to_vec(&Checkpoint::new(processed))?;
        write_atomic(&self.checkpoint_path(), &bytes)?;
        Ok(())
    }

    /// Append `records` to shard `index`, one JSON object per line.
    /// The file is created if absent and synced before returning.
    pub fn write_shard(&self, index: u32, records: Vec<CleanedRecord>) -> Result<usize> {
        let path = self.shard_path(index);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut writer = BufWriter::new(file);
        for record in &records {
            serde_json::to_writer(&mut writer, record)?;
            writer.write_all(b"\n")?;
        }
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        debug!(shard = index, records = records.len(), "shard appended");
        Ok(records.len())
    }

    /// Existing shard indices, ascending.
    pub fn shard_indices(&self) -> Result<Vec<u32>> {
        let mut indices = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let name = entry?.file_name();
            if let Some(index) = name.to_str().and_then(parse_shard_name) {
                indices.push(index);
            }
        }
        indices.sort_unstable();
        Ok(indices)
    }

    pub fn shard_paths(&self) -> Result<Vec<PathBuf>> {
        Ok(self.shard_indices()?.into_iter().map(|i| self.shard_path(i)).collect())
    }

    /// Bring the shards back in line with `checkpoint`.
    ///
    /// - torn (unterminated) final lines are removed
    /// - records beyond `checkpoint.processed` are cut from the tail
    /// - fewer records than the checkpoint is a `Corruption` error
    ///
    /// A shard left without records is deleted and its index reused.
    pub fn reconcile(&self, checkpoint: Checkpoint) -> Result<ShardLayout> {
        let mut scans = Vec::new();
        let mut on_disk = 0u64;
        for index in self.shard_indices()? {
            let bytes = fs::read(self.shard_path(index))?;
            let lines = bytes.iter().filter(|&&b| b == b'\n').count();
            on_disk += lines as u64;
            scans.push(ShardScan {
                index,
                lines,
                complete_len: offset_after_lines(&bytes, lines),
                len: bytes.len(),
            });
        }

        if on_disk < checkpoint.processed {
            return Err(HarvestError::corruption(
                &self.dir,
                format!(
                    "checkpoint records {} processed but shards hold {}",
                    checkpoint.processed, on_disk
                ),
            ));
        }

        let truncated = on_disk - checkpoint.processed;
        let mut excess = truncated;
        let mut next_index = 0;
        for scan in scans.iter().rev() {
            let drop = excess.min(scan.lines as u64) as usize;
            excess -= drop as u64;
            let keep = scan.lines - drop;
            let path = self.shard_path(scan.index);
            if keep == 0 {
                fs::remove_file(&path)?;
                warn!(shard = scan.index, dropped = drop, "removed uncheckpointed shard");
                continue;
            }
            next_index = next_index.max(scan.index + 1);
            if drop == 0 && scan.complete_len == scan.len {
                continue;
            }
            let bytes = fs::read(&path)?;
            write_atomic(&path, &bytes[..offset_after_lines(&bytes, keep)])?;
            warn!(shard = scan.index, dropped = drop, "truncated uncheckpointed shard tail");
        }

        Ok(ShardLayout {
            records: checkpoint.processed,
            truncated,
            next_index,
        })
    }

    /// All records of all shards in ascending shard order.
    pub fn read_all(&self) -> Result<Vec<CleanedRecord>> {
        let mut records = Vec::new();
        for path in self.shard_paths()? {
            read_jsonl_into(&path, &mut records)?;
        }
        Ok(records)
    }
}

/// Parse `batch_NNNNN.jsonl` into its index.
fn parse_shard_name(name: &str) -> Option<u32> {
    name.strip_prefix(SHARD_PREFIX)?
        .strip_suffix(SHARD_SUFFIX)?
        .parse()
        .ok()
}

/// Byte length of the first `lines` newline-terminated lines.
fn offset_after_lines(bytes: &[u8], lines: usize) -> usize {
    if lines == 0 {
        return 0;
    }
    bytes
        .iter()
        .enumerate()
        .filter(|(_, &b)| b == b'\n')
        .nth(lines - 1)
        .map_or(bytes.len(), |(pos, _)| pos + 1)
}

/// Append the records of a JSON-lines file to `out`.
/// An unterminated final line is ignored.
pub(crate) fn read_jsonl_into(path: &Path, out: &mut Vec<CleanedRecord>) -> Result<()> {
    let text = fs::read_to_string(path)?;
    let mut lines: Vec<&str> = text.split('\n').collect();
    // 改行で終わらない最後の行は書きかけ
    if let Some(tail) = lines.pop() {
        if !tail.trim().is_empty() {
            warn!(path = %path.display(), "ignoring torn final line");
        }
    }
    out.reserve(lines.len());
    for (no, line) in lines.into_iter().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(line)
            .map_err(|e| HarvestError::corruption(path, format!("line {}: {e}", no + 1)))?;
        out.push(record);
    }
    Ok(())
}
