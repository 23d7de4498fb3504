use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::SourceError;
use crate::types::SourceRecord;

/// One page returned by a cursor.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub records: Vec<SourceRecord>,
    /// false once the cursor is exhausted
    pub has_more: bool,
    /// total size of the remote record set, when the source knows it
    pub total_hint: Option<u64>,
}

/// Server-side iteration cursor with a renewable lease.
///
/// Call order used by the harvester:
/// `next_page` for the first page, then `renew` + `next_page` for each further page,
/// and finally `release` exactly once on every exit path.
pub trait PageSource {
    /// Fetch the next page. The first call opens the cursor.
    fn next_page(&mut self) -> Result<Page, SourceError>;
    /// Extend the cursor lease before the next fetch.
    /// `SourceError::Expired` means the cursor is gone.
    fn renew(&mut self) -> Result<(), SourceError>;
    /// Free the server-side cursor. Errors are reported but not fatal to callers.
    fn release(&mut self) -> Result<(), SourceError>;
}

impl<S: PageSource + ?Sized> PageSource for Box<S> {
    fn next_page(&mut self) -> Result<Page, SourceError> {
        (**self).next_page()
    }

    fn renew(&mut self) -> Result<(), SourceError> {
        (**self).renew()
    }

    fn release(&mut self) -> Result<(), SourceError> {
        (**self).release()
    }
}

/// In-process page source over a fixed record list.
///
/// Iteration order is the vector order, so it is stable across cursors.
/// Failure injection:
/// - `expire_after_renewals(n)`: the (n+1)-th `renew` reports `Expired`
/// - `fail_at_page(p)`: fetching page `p` (0-based) reports a transport failure
/// - `fail_release()`: `release` reports a transport failure
#[derive(Debug, Clone)]
pub struct MemoryPageSource {
    records: Vec<SourceRecord>,
    page_size: usize,
    position: usize,
    pages_served: usize,
    renewals: usize,
    expire_after: Option<usize>,
    fail_at: Option<usize>,
    fail_release: bool,
    released: Arc<AtomicBool>,
}

impl MemoryPageSource {
    pub fn new(records: Vec<SourceRecord>, page_size: usize) -> Self {
        Self {
            records,
            page_size: page_size.max(1),
            position: 0,
            pages_served: 0,
            renewals: 0,
            expire_after: None,
            fail_at: None,
            fail_release: false,
            released: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn expire_after_renewals(mut self, renewals: usize) -> Self {
        self.expire_after = Some(renewals);
        self
    }

    pub fn fail_at_page(mut self, page: usize) -> Self {
        self.fail_at = Some(page);
        self
    }

    pub fn fail_release(mut self) -> Self {
        self.fail_release = true;
        self
    }

    /// Flag set once `release` has been called.
    pub fn released_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.released)
    }
}

impl PageSource for MemoryPageSource {
    fn next_page(&mut self) -> Result<Page, SourceError> {
        if self.released.load(Ordering::Acquire) {
            return Err(SourceError::Protocol("cursor already released".into()));
        }
        if self.fail_at == Some(self.pages_served) {
            return Err(SourceError::Transport(format!("injected failure at page {}", self.pages_served)));
        }
        let end = (self.position + self.page_size).min(self.records.len());
        let records = self.records[self.position..end].to_vec();
        self.position = end;
        self.pages_served += 1;
        Ok(Page {
            records,
            has_more: self.position < self.records.len(),
            total_hint: Some(self.records.len() as u64),
        })
    }

    fn renew(&mut self) -> Result<(), SourceError> {
        if let Some(limit) = self.expire_after {
            if self.renewals >= limit {
                return Err(SourceError::Expired);
            }
        }
        self.renewals += 1;
        Ok(())
    }

    fn release(&mut self) -> Result<(), SourceError> {
        if self.released.swap(true, Ordering::AcqRel) {
            return Err(SourceError::Protocol("cursor already released".into()));
        }
        if self.fail_release {
            return Err(SourceError::Transport("injected release failure".into()));
        }
        Ok(())
    }
}
