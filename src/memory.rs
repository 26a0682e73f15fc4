use crate::config::{AccessLevel, StoreConfig};
use crate::err::{self, Error};
use crate::source::ObjectSource;
use crate::store::{track_progress, ObjectStore, ProgressObserver, PutReceipt};
use bytes::{Bytes, BytesMut};
use futures::{
    future::{BoxFuture, FutureExt},
    stream::TryStreamExt,
};
use snafu::ResultExt;
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};
use tokio::sync::Mutex;

/// An object store that keeps everything in memory. Used for dry runs and testing.
///
/// Objects are read in chunks of `chunk_size`, reporting progress after each chunk and yielding to
/// the runtime in between so that concurrent puts interleave.
#[derive(Clone)]
pub struct MemoryStore {
    objects: Arc<Mutex<HashMap<String, Bytes>>>,
    rejected: Arc<HashSet<String>>,
    config: StoreConfig,
}
impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}
impl MemoryStore {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            objects: Default::default(),
            rejected: Default::default(),
            config,
        }
    }
    /// Fail every put of `key`.
    pub fn reject(mut self, key: &str) -> Self {
        Arc::make_mut(&mut self.rejected).insert(key.to_string());
        self
    }
    /// Content stored under the full object key (including access-level prefix).
    pub async fn get(&self, object_key: &str) -> Option<Bytes> {
        self.objects.lock().await.get(object_key).cloned()
    }
    pub async fn keys(&self) -> Vec<String> {
        let mut keys = self.objects.lock().await.keys().cloned().collect::<Vec<_>>();
        keys.sort();
        keys
    }
}

impl ObjectStore for MemoryStore {
    fn put(
        &self,
        key: &str,
        source: ObjectSource,
        level: AccessLevel,
        observer: ProgressObserver,
    ) -> BoxFuture<'static, Result<PutReceipt, Error>> {
        let objects = self.objects.clone();
        let rejected = self.rejected.contains(key);
        let chunk_size = self.config.chunk_size;
        let object_key = self.config.object_key(level, key);
        let key = key.to_owned();
        async move {
            snafu::ensure!(
                !rejected,
                err::Rejected {
                    key: key.clone(),
                    reason: "access denied",
                }
            );
            let (stream, len) = source.open(chunk_size).await?;
            let content = track_progress(stream, len, observer)
                .and_then(|chunk| async move {
                    tokio::task::yield_now().await;
                    Ok(chunk)
                })
                .try_fold(BytesMut::new(), |mut acc, chunk| async move {
                    acc.extend_from_slice(&chunk);
                    Ok(acc)
                })
                .await
                .context(err::Io {
                    description: object_key.clone(),
                })?;
            objects.lock().await.insert(object_key, content.freeze());
            Ok(PutReceipt { key })
        }
        .boxed()
    }
}
