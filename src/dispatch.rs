use super::*;
use crate::config::StoreConfig;
use crate::store::{Progress, ProgressObserver};
use futures::future::{join_all, BoxFuture};
use futures_stopwatch::try_stopwatch;
use snafu::OptionExt;
use tokio::task::JoinHandle;
use tracing::debug;

/// Uploads started by one call to `dispatch_uploads` or `retry`.
///
/// Dropping a `Dispatch` does not cancel anything; the uploads keep running and keep updating the
/// ledger.
#[derive(Debug)]
pub struct Dispatch {
    records: Vec<RecordId>,
    tasks: Vec<JoinHandle<()>>,
}
impl Dispatch {
    /// Ledger records created for this dispatch, in selection order.
    pub fn records(&self) -> &[RecordId] {
        &self.records
    }
    /// Wait until every upload of this dispatch has either succeeded or failed.
    pub async fn finished(self) {
        for result in join_all(self.tasks).await {
            if let Err(e) = result {
                warn!(error = %e, "upload task panicked");
            }
        }
    }
}

impl<S: ObjectStore, A> UploadTracker<S, A> {
    /// Upload every selected file, all in parallel, without waiting for any of them.
    ///
    /// Each file gets a new ledger record before its request is issued. The selection is cleared
    /// afterwards. An empty selection is refused and nothing is sent to the store.
    ///
    /// Must be called from within a tokio runtime.
    pub fn dispatch_uploads(&mut self) -> Result<Dispatch, Error> {
        snafu::ensure!(!self.selection.is_empty(), err::NoFilesSelected);
        let files = self.selection.files().cloned().collect::<Vec<_>>();
        info!(files = files.len(), "uploading files to S3");
        let mut dispatch = Dispatch {
            records: Vec::with_capacity(files.len()),
            tasks: Vec::with_capacity(files.len()),
        };
        for file in files {
            let (record, task) = self.spawn_upload(file, None);
            dispatch.records.push(record);
            dispatch.tasks.push(task);
        }
        self.selection.clear();
        Ok(dispatch)
    }

    /// Upload the file of a failed record again, as a new ledger record that points back at the
    /// failed one.
    pub fn retry(&mut self, id: RecordId) -> Result<Dispatch, Error> {
        let record = self.ledger.get(id).context(err::NoSuchRecord { id })?;
        snafu::ensure!(record.status == Status::Error, err::NotRetryable { id });
        let file = self
            .dispatched
            .get(&id)
            .cloned()
            .context(err::NoSuchRecord { id })?;
        info!(record = id, key = %file.name, "retrying upload");
        let (record, task) = self.spawn_upload(file, Some(id));
        Ok(Dispatch {
            records: vec![record],
            tasks: vec![task],
        })
    }

    fn spawn_upload(
        &mut self,
        file: FileHandle,
        retry_of: Option<RecordId>,
    ) -> (RecordId, JoinHandle<()>) {
        let record = match retry_of {
            Some(failed) => self.ledger.create_retry(&file, failed),
            None => self.ledger.create(&file),
        };
        let context = UploadContext {
            record,
            key: file.name.clone(),
            ledger: self.ledger.clone(),
        };
        // The request is registered with the store here, in dispatch order
        let request = self.store.put(
            &file.name,
            file.source.clone(),
            self.config.store.access_level,
            context.observer(),
        );
        self.dispatched.insert(record, file);
        let store_config = self.config.store.clone();
        (record, tokio::spawn(context.run(request, store_config)))
    }
}

/// Everything one upload needs to report back to the ledger. The record id is fixed at dispatch
/// time, so reports never depend on what other uploads did to the ledger in the meantime.
pub(crate) struct UploadContext {
    record: RecordId,
    key: String,
    ledger: Ledger,
}
impl UploadContext {
    fn observer(&self) -> ProgressObserver {
        let (ledger, record) = (self.ledger.clone(), self.record);
        Arc::new(move |progress: Progress| {
            debug!(record, loaded = progress.loaded, total = progress.total, "progress");
            if let Err(e) = ledger.progress(record, progress) {
                debug!(error = %e, "dropping progress event");
            }
        })
    }

    async fn run(
        self,
        request: BoxFuture<'static, Result<PutReceipt, Error>>,
        store_config: StoreConfig,
    ) {
        match try_stopwatch(request).await {
            Ok((receipt, elapsed)) => {
                let url = store_config.object_url(&receipt.key);
                info!(
                    record = self.record,
                    key = %receipt.key,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "completed the upload, file available at {}",
                    url
                );
                if let Err(e) = self.ledger.complete(self.record, url, elapsed) {
                    debug!(error = %e, "dropping completion");
                }
            }
            Err(e) => {
                warn!(record = self.record, key = %self.key, error = %e, "upload failed");
                if let Err(e) = self.ledger.fail(self.record, e.to_string()) {
                    debug!(error = %e, "dropping failure");
                }
            }
        }
    }
}
