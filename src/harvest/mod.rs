pub mod elastic;
pub mod snapshot;
pub mod source;
pub mod store;

use rayon::prelude::*;
use tracing::{debug, error, info, warn};

use crate::config::HarvestConfig;
use crate::error::{Result, SourceError};
use crate::normalize::Normalizer;
use crate::types::{Checkpoint, CleanedRecord};

pub use self::snapshot::CorpusSnapshot;
use self::source::{Page, PageSource};
use self::store::ShardStore;

/// Why the cursor walk ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// the source reported no further pages
    Exhausted,
    /// the cursor lease expired; the next run resumes from the checkpoint
    LeaseExpired,
}

/// Counters of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HarvestStats {
    /// records read from the cursor, skipped ones included
    pub fetched: u64,
    /// records skipped because an earlier run already committed them
    pub skipped: u64,
    /// records written to shards during this run
    pub written: u64,
    pub shards_written: u32,
    /// uncheckpointed records cut from the shards before starting
    pub truncated: u64,
    pub checkpoint: Checkpoint,
    pub stop: StopReason,
}

/// Result of `Harvester::harvest`.
#[derive(Debug, Clone)]
pub struct Harvest {
    pub corpus: CorpusSnapshot,
    pub stats: HarvestStats,
}

/// Walks a `PageSource`, normalizes records and commits them in shards.
///
/// Durability order per flush: shard write, then checkpoint save.
/// A restart skips the first `checkpoint.processed` records of the fresh cursor,
/// which assumes the source iterates in a stable order.
pub struct Harvester<'n, S: PageSource> {
    source: S,
    store: ShardStore,
    normalizer: &'n Normalizer,
    config: HarvestConfig,
}

/// mutable state of one walk
struct Run {
    buffer: Vec<CleanedRecord>,
    resume_from: u64,
    processed: u64,
    fetched: u64,
    skipped: u64,
    written: u64,
    next_shard: u32,
    shards_written: u32,
}

impl Run {
    fn new(start: Checkpoint, next_shard: u32, capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
            resume_from: start.processed,
            processed: start.processed,
            fetched: 0,
            skipped: 0,
            written: 0,
            next_shard,
            shards_written: 0,
        }
    }
}

impl<'n, S: PageSource> Harvester<'n, S> {
    pub fn new(source: S, normalizer: &'n Normalizer, config: HarvestConfig) -> Result<Self> {
        config.validate()?;
        let store = ShardStore::open(&config.state_dir)?;
        Ok(Self {
            source,
            store,
            normalizer,
            config,
        })
    }

    pub fn store(&self) -> &ShardStore {
        &self.store
    }

    /// Run to completion (or to lease expiry) and reassemble the corpus.
    ///
    /// On every exit path the buffer is flushed, the checkpoint persisted
    /// and the cursor released (release errors are only logged).
    /// Lease expiry is not an error; other source failures are returned
    /// after the cleanup.
    pub fn harvest(mut self) -> Result<Harvest> {
        let start = self.store.load_checkpoint()?;
        let layout = self.store.reconcile(start)?;
        info!(
            processed = start.processed,
            truncated = layout.truncated,
            next_shard = layout.next_index,
            "resuming harvest"
        );

        let mut run = Run::new(start, layout.next_index, self.config.flush_threshold);

        let walked = self.walk(&mut run);
        let flushed = self.flush(&mut run);
        self.release();

        let stop = match (walked, flushed) {
            (Ok(stop), Ok(())) => stop,
            (Ok(_), Err(e)) => return Err(e),
            (Err(e), flushed) => {
                if let Err(flush_err) = flushed {
                    error!(error = %flush_err, "final flush failed");
                }
                error!(error = %e, processed = run.processed, "harvest aborted, resumable from checkpoint");
                return Err(e);
            }
        };

        let corpus = CorpusSnapshot::new(self.store.read_all()?);
        let stats = HarvestStats {
            fetched: run.fetched,
            skipped: run.skipped,
            written: run.written,
            shards_written: run.shards_written,
            truncated: layout.truncated,
            checkpoint: Checkpoint::new(run.processed),
            stop,
        };
        info!(records = corpus.len(), ?stop, "harvest finished");
        Ok(Harvest { corpus, stats })
    }

    fn walk(&mut self, run: &mut Run) -> Result<StopReason> {
        let mut first = true;
        loop {
            let page = match self.fetch(first) {
                Ok(page) => page,
                Err(SourceError::Expired) => {
                    warn!(processed = run.processed, "cursor lease expired, stopping at checkpoint");
                    return Ok(StopReason::LeaseExpired);
                }
                Err(e) => return Err(e.into()),
            };
            first = false;
            if page.records.is_empty() {
                return Ok(StopReason::Exhausted);
            }
            let has_more = page.has_more;
            let total = page.total_hint;
            self.absorb(run, page)?;
            match total {
                Some(total) => info!("retrieved {}/{} (processed {})", run.fetched, total, run.processed),
                None => info!("retrieved {} (processed {})", run.fetched, run.processed),
            }
            if !has_more {
                return Ok(StopReason::Exhausted);
            }
        }
    }

    /// First page opens the cursor; every later page renews the lease first.
    fn fetch(&mut self, first: bool) -> std::result::Result<Page, SourceError> {
        if !first {
            self.source.renew()?;
        }
        self.source.next_page()
    }

    fn absorb(&mut self, run: &mut Run, page: Page) -> Result<()> {
        let len = page.records.len() as u64;
        // 前回までに確定済みの件数ぶんは読み飛ばす
        let skip = run.resume_from.saturating_sub(run.fetched).min(len) as usize;
        run.fetched += len;
        run.skipped += skip as u64;
        if skip == page.records.len() {
            return Ok(());
        }

        let normalizer = self.normalizer;
        let cleaned: Vec<CleanedRecord> = page.records[skip..]
            .par_iter()
            .map(|record| normalizer.clean(record))
            .collect();

        for record in cleaned {
            run.buffer.push(record);
            if run.buffer.len() >= self.config.flush_threshold {
                self.flush(run)?;
            }
        }
        Ok(())
    }

    /// Hand the buffer to the store, then advance the checkpoint.
    fn flush(&mut self, run: &mut Run) -> Result<()> {
        if run.buffer.is_empty() {
            return Ok(());
        }
        let batch = std::mem::replace(&mut run.buffer, Vec::with_capacity(self.config.flush_threshold));
        let index = run.next_shard;
        let count = self.store.write_shard(index, batch)? as u64;
        run.next_shard += 1;
        run.shards_written += 1;
        let processed = run.processed + count;
        self.store.save_checkpoint(processed)?;
        run.processed = processed;
        run.written += count;
        info!(shard = index, records = count, processed, "shard committed");
        Ok(())
    }

    fn release(&mut self) {
        match self.source.release() {
            Ok(()) => debug!("cursor released"),
            Err(e) => debug!(error = %e, "cursor release failed"),
        }
    }
}
