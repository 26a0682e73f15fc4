use crate::err::{self, Error};
use futures::future::{self, BoxFuture, FutureExt};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Session provider. Authentication itself happens outside of this crate; the tracker only ever
/// ends a session.
pub trait AuthClient: Send + Sync {
    fn sign_out(&self) -> BoxFuture<'static, Result<(), Error>>;
}

/// A session of a user whose credentials the SDK resolves from the environment.
#[derive(Clone, Debug)]
pub struct LocalSession {
    user: String,
    signed_in: Arc<AtomicBool>,
}
impl LocalSession {
    pub fn new(user: &str) -> Self {
        Self {
            user: user.to_string(),
            signed_in: Arc::new(AtomicBool::new(true)),
        }
    }
    pub fn user(&self) -> &str {
        &self.user
    }
    pub fn is_signed_in(&self) -> bool {
        self.signed_in.load(Ordering::SeqCst)
    }
}

impl AuthClient for LocalSession {
    fn sign_out(&self) -> BoxFuture<'static, Result<(), Error>> {
        let was_signed_in = self.signed_in.swap(false, Ordering::SeqCst);
        let result = if was_signed_in {
            Ok(())
        } else {
            err::SignOut {
                reason: format!("{} is not signed in", self.user),
            }
            .fail()
        };
        future::ready(result).boxed()
    }
}
