//! The ledger is the append-only list of dispatched uploads and their live status.
//!
//! All mutation goes through [`Ledger::mutate`], which runs under the lock of a `tokio::sync::watch`
//! channel. Concurrent progress callbacks therefore never lose each other's updates, and
//! observers only ever see complete snapshots.
use crate::err::{self, Error};
use crate::source::{format_bytes, FileHandle};
use crate::store::Progress;
use snafu::OptionExt;
#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc, time::Duration};
use tokio::sync::watch;

/// Position of a record in the ledger, fixed when the record is created.
pub type RecordId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "kebab-case"))]
pub enum Status {
    InProgress,
    Success,
    Error,
}
impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Status::InProgress => "in-progress",
            Status::Success => "success",
            Status::Error => "error",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
pub struct UploadRecord {
    pub id: RecordId,
    pub filename: String,
    pub filetype: String,
    /// Human-readable size
    pub filesize: String,
    pub status: Status,
    /// 0..=100, never decreases
    pub percentage: u8,
    /// Set once the put has resolved
    pub file_url: Option<String>,
    /// Why the put was rejected
    pub error: Option<String>,
    /// Wall time of the put
    pub elapsed: Option<Duration>,
    /// The failed record this one retries
    pub retry_of: Option<RecordId>,
}
impl UploadRecord {
    fn new(id: RecordId, file: &FileHandle, retry_of: Option<RecordId>) -> Self {
        Self {
            id,
            filename: file.name.clone(),
            filetype: file.mime_type.clone(),
            filesize: format_bytes(file.size),
            status: Status::InProgress,
            percentage: 0,
            file_url: None,
            error: None,
            elapsed: None,
            retry_of,
        }
    }

    /// Apply a progress event. Returns whether the record changed.
    ///
    /// Percentages below the current one are ignored, and so are events on records that are no
    /// longer in progress.
    pub fn on_progress(&mut self, progress: Progress) -> bool {
        let percentage = progress.percentage();
        if self.status != Status::InProgress || percentage <= self.percentage {
            return false;
        }
        self.percentage = percentage;
        if percentage == 100 {
            self.status = Status::Success;
        }
        true
    }

    /// The put resolved: the object is fully stored, so the record is complete even if the final
    /// progress event has not arrived yet.
    pub fn on_complete(&mut self, url: String, elapsed: Duration) -> bool {
        if self.status == Status::Error {
            return false;
        }
        self.percentage = 100;
        self.status = Status::Success;
        self.file_url = Some(url);
        self.elapsed = Some(elapsed);
        true
    }

    /// The put was rejected. Any record whose put has not resolved yet can fail, including one
    /// whose body was fully sent; the percentage is kept.
    pub fn on_failed(&mut self, reason: String) -> bool {
        if self.status == Status::Error || self.file_url.is_some() {
            return false;
        }
        self.status = Status::Error;
        self.error = Some(reason);
        true
    }

    pub fn is_finished(&self) -> bool {
        match self.status {
            Status::InProgress => false,
            Status::Success => self.file_url.is_some(),
            Status::Error => true,
        }
    }
}

#[derive(Clone)]
pub struct Ledger {
    records: Arc<watch::Sender<Vec<UploadRecord>>>,
}
impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}
impl fmt::Debug for Ledger {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Ledger")
            .field("records", &*self.records.borrow())
            .finish()
    }
}

impl Ledger {
    pub fn new() -> Self {
        let (records, _) = watch::channel(Vec::new());
        Self {
            records: Arc::new(records),
        }
    }

    /// The single mutation entry point. `f` returns whether it changed anything; observers are
    /// only notified if it did.
    fn mutate<R: Default>(&self, f: impl FnOnce(&mut Vec<UploadRecord>) -> (bool, R)) -> R {
        let mut out = R::default();
        self.records.send_if_modified(|records| {
            let (modified, result) = f(records);
            out = result;
            modified
        });
        out
    }

    fn mutate_record(
        &self,
        id: RecordId,
        f: impl FnOnce(&mut UploadRecord) -> bool,
    ) -> Result<bool, Error> {
        let changed = self.mutate(|records| match records.get_mut(id) {
            Some(record) => {
                let changed = f(record);
                (changed, Some(changed))
            }
            None => (false, None),
        });
        changed.context(err::NoSuchRecord { id })
    }

    fn push(&self, file: &FileHandle, retry_of: Option<RecordId>) -> RecordId {
        self.mutate(|records| {
            let id = records.len();
            records.push(UploadRecord::new(id, file, retry_of));
            (true, id)
        })
    }

    /// Append a record for `file`. Its id is the ledger length at the moment of creation.
    pub fn create(&self, file: &FileHandle) -> RecordId {
        self.push(file, None)
    }

    /// Append a record for another attempt at the upload of failed record `failed`.
    pub fn create_retry(&self, file: &FileHandle, failed: RecordId) -> RecordId {
        self.push(file, Some(failed))
    }

    pub fn progress(&self, id: RecordId, progress: Progress) -> Result<bool, Error> {
        self.mutate_record(id, |record| record.on_progress(progress))
    }

    pub fn complete(&self, id: RecordId, url: String, elapsed: Duration) -> Result<bool, Error> {
        self.mutate_record(id, |record| record.on_complete(url, elapsed))
    }

    pub fn fail(&self, id: RecordId, reason: String) -> Result<bool, Error> {
        self.mutate_record(id, |record| record.on_failed(reason))
    }

    pub fn get(&self, id: RecordId) -> Option<UploadRecord> {
        self.records.borrow().get(id).cloned()
    }

    /// Copy of the current records.
    pub fn snapshot(&self) -> Vec<UploadRecord> {
        self.records.borrow().clone()
    }

    /// Receiver that is notified after every change.
    pub fn subscribe(&self) -> watch::Receiver<Vec<UploadRecord>> {
        self.records.subscribe()
    }

    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
