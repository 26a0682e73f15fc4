use crate::*;
use futures::future::{self, BoxFuture, FutureExt};
use std::sync::Mutex;
use tokio::sync::oneshot;

/// A put registered with [`ScriptedStore`]. The test drives its progress and decides how it ends.
pub struct ScriptedPut {
    pub key: String,
    pub level: AccessLevel,
    pub size: u64,
    observer: ProgressObserver,
    finish: oneshot::Sender<Result<(), String>>,
}
impl ScriptedPut {
    pub fn progress(&self, loaded: u64) {
        (self.observer)(Progress {
            loaded,
            total: self.size,
        })
    }
    pub fn succeed(self) {
        let _ = self.finish.send(Ok(()));
    }
    pub fn reject(self, reason: &str) {
        let _ = self.finish.send(Err(reason.to_string()));
    }
}

/// Store whose puts only make progress when the test says so.
#[derive(Clone, Default)]
pub struct ScriptedStore {
    puts: Arc<Mutex<Vec<ScriptedPut>>>,
    calls: Arc<Mutex<usize>>,
}
impl ScriptedStore {
    pub fn new() -> Self {
        Self::default()
    }
    /// Number of puts issued so far
    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
    /// Take all puts registered since the last call, in the order they were issued.
    pub fn take(&self) -> Vec<ScriptedPut> {
        std::mem::take(&mut *self.puts.lock().unwrap())
    }
}
impl ObjectStore for ScriptedStore {
    fn put(
        &self,
        key: &str,
        source: ObjectSource,
        level: AccessLevel,
        observer: ProgressObserver,
    ) -> BoxFuture<'static, Result<PutReceipt, Error>> {
        let size = match &source {
            ObjectSource::Data { data } => data.len() as u64,
            ObjectSource::File { path } => std::fs::metadata(path).unwrap().len(),
        };
        let (finish, finished) = oneshot::channel();
        *self.calls.lock().unwrap() += 1;
        self.puts.lock().unwrap().push(ScriptedPut {
            key: key.to_string(),
            level,
            size,
            observer,
            finish,
        });
        let key = key.to_string();
        async move {
            match finished.await {
                Ok(Ok(())) => Ok(PutReceipt { key }),
                Ok(Err(reason)) => Err(Error::Rejected { key, reason }),
                Err(_) => Err(Error::Rejected {
                    key,
                    reason: "dropped by test".to_string(),
                }),
            }
        }
        .boxed()
    }
}

/// Auth client whose sign-out always fails.
pub struct FailingAuth;
impl AuthClient for FailingAuth {
    fn sign_out(&self) -> BoxFuture<'static, Result<(), Error>> {
        future::ready(Err(Error::SignOut {
            reason: "network unreachable".to_string(),
        }))
        .boxed()
    }
}
