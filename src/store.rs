//! The `ObjectStore` trait is the seam between the tracker and the storage provider: a single
//! put-with-progress operation. [`S3Store`] implements it on top of `aws-sdk-s3`.
use crate::config::{AccessLevel, StoreConfig};
use crate::err::{self, Error};
use crate::source::ObjectSource;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use futures::{
    future::{BoxFuture, FutureExt},
    stream::{Stream, TryStreamExt},
};
use http_body::Frame;
use http_body_util::StreamBody;
use snafu::ResultExt;
use std::{
    io,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

/// Cumulative transfer progress of one object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Bytes transferred so far
    pub loaded: u64,
    /// Total bytes of the object
    pub total: u64,
}
impl Progress {
    /// Rounded percentage in `0..=100`. An empty object counts as complete.
    pub fn percentage(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        let pct = (self.loaded as f64 / self.total as f64 * 100.0).round();
        pct.clamp(0.0, 100.0) as u8
    }
}

/// Called by a store with cumulative progress, zero or more times before the put resolves.
pub type ProgressObserver = Arc<dyn Fn(Progress) + Send + Sync>;

/// Result of a successful put.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutReceipt {
    /// The key that was passed to `put`, without access-level prefix.
    pub key: String,
}

pub trait ObjectStore: Send + Sync + 'static {
    /// Store `source` under `key`. The request is registered when `put` is called; the returned
    /// future drives the transfer.
    fn put(
        &self,
        key: &str,
        source: ObjectSource,
        level: AccessLevel,
        observer: ProgressObserver,
    ) -> BoxFuture<'static, Result<PutReceipt, Error>>;
}

impl<T: ObjectStore + ?Sized> ObjectStore for Arc<T> {
    fn put(
        &self,
        key: &str,
        source: ObjectSource,
        level: AccessLevel,
        observer: ProgressObserver,
    ) -> BoxFuture<'static, Result<PutReceipt, Error>> {
        (**self).put(key, source, level, observer)
    }
}

/// Report cumulative progress to `observer` as chunks are pulled from `stream`.
pub fn track_progress<S>(
    stream: S,
    total: u64,
    observer: ProgressObserver,
) -> impl Stream<Item = io::Result<Bytes>>
where
    S: Stream<Item = io::Result<Bytes>>,
{
    let loaded = Arc::new(AtomicU64::new(0));
    stream.inspect_ok(move |chunk| {
        let loaded = loaded.fetch_add(chunk.len() as u64, Ordering::Relaxed) + chunk.len() as u64;
        observer(Progress { loaded, total });
    })
}

#[derive(Clone)]
pub struct S3Store {
    s3: aws_sdk_s3::Client,
    config: StoreConfig,
}
impl S3Store {
    pub fn new(s3: aws_sdk_s3::Client, config: StoreConfig) -> Self {
        Self { s3, config }
    }
    /// Client with credentials resolved from the environment and the configured region.
    pub async fn from_env(config: StoreConfig) -> Self {
        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_sdk_s3::config::Region::new(config.region.clone()))
            .load()
            .await;
        Self::new(aws_sdk_s3::Client::new(&sdk_config), config)
    }
}

impl ObjectStore for S3Store {
    fn put(
        &self,
        key: &str,
        source: ObjectSource,
        level: AccessLevel,
        observer: ProgressObserver,
    ) -> BoxFuture<'static, Result<PutReceipt, Error>> {
        let s3 = self.s3.clone();
        let bucket = self.config.bucket.clone();
        let chunk_size = self.config.chunk_size;
        let object_key = self.config.object_key(level, key);
        let key = key.to_owned();
        async move {
            let (stream, len) = source.open(chunk_size).await?;
            let body = StreamBody::new(track_progress(stream, len, observer).map_ok(Frame::data));
            s3.put_object()
                .bucket(bucket)
                .key(object_key.clone())
                .content_length(len as i64)
                .body(ByteStream::from_body_1_x(body))
                .send()
                .await
                .context(err::PutObject { key: object_key })?;
            Ok(PutReceipt { key })
        }
        .boxed()
    }
}
