//! # Upload tracker
//! Upload local files to Amazon S3 and follow the progress of every file.
//!
//! - Pick files with `UploadTracker::choose` and drop some with `UploadTracker::dismiss`.
//! - Start all uploads at once with `UploadTracker::dispatch_uploads`.
//! - Follow progress through the [`Ledger`](ledger::Ledger), either by polling
//! `Ledger::snapshot` or by awaiting changes on `Ledger::subscribe`, and turn records into
//! displayable rows with [`render_ledger`](render::render_ledger).
//! - Retry failed uploads with `UploadTracker::retry`.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

pub mod auth;
mod config;
mod dispatch;
pub mod err;
pub mod ledger;
mod memory;
pub mod render;
pub mod selection;
mod source;
pub mod store;

pub use auth::{AuthClient, LocalSession};
pub use config::*;
pub use dispatch::*;
pub use err::Error;
pub use ledger::{Ledger, RecordId, Status, UploadRecord};
pub use memory::MemoryStore;
pub use render::{render_ledger, render_selection, summarize, Alert, ProgressRow, Summary, Token};
pub use selection::{Selection, SelectionItem};
pub use source::*;
pub use store::{ObjectStore, Progress, ProgressObserver, PutReceipt, S3Store};

#[cfg(test)]
mod mock;

/// One user's upload session: the current selection and the ledger of dispatched uploads.
pub struct UploadTracker<S, A> {
    store: Arc<S>,
    auth: A,
    config: Config,
    selection: Selection,
    ledger: Ledger,
    /// Files behind each ledger record, kept for retries
    dispatched: HashMap<RecordId, FileHandle>,
}
impl<S, A> UploadTracker<S, A> {
    pub fn new(store: S, auth: A) -> Self {
        Self::with_config(store, auth, Config::default())
    }
    pub fn with_config(store: S, auth: A, config: Config) -> Self {
        Self {
            store: Arc::new(store),
            auth,
            config,
            selection: Selection::new(),
            ledger: Ledger::new(),
            dispatched: HashMap::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
    pub fn selection(&self) -> &Selection {
        &self.selection
    }
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Replace the selection with `files`.
    pub fn choose(&mut self, files: Vec<FileHandle>) -> &[SelectionItem] {
        self.selection.choose(files)
    }
    /// Drop the selected file at position `index`.
    pub fn dismiss(&mut self, index: usize) -> Result<SelectionItem, Error> {
        self.selection.dismiss(index)
    }
}

impl<S, A: AuthClient> UploadTracker<S, A> {
    /// End the session. On success the selection and the ledger start over; uploads still in
    /// flight keep reporting to the old ledger. On failure nothing changes.
    pub async fn sign_out(&mut self) -> Result<(), Error> {
        match self.auth.sign_out().await {
            Ok(()) => {
                info!(uploads = self.ledger.len(), "signed out");
                self.selection.clear();
                self.ledger = Ledger::new();
                self.dispatched.clear();
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "sign-out failed, keeping session");
                Err(e)
            }
        }
    }
}
