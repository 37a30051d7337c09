use std::fmt::{Debug, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::{self, BoxFuture, FutureExt, Shared};

use crate::entities::{ThrownError, Value};

/// Outcome of a settled [FutureValue]
pub type Settlement = Result<Value, ThrownError>;

/// Cloneable future settling to a [Settlement].
///
/// Every clone observes the same settlement. Settlement happens when any clone is polled to
/// completion, whatever the executor driving it.
#[derive(Clone)]
pub struct FutureValue {
    identity: Arc<()>,
    inner: Shared<BoxFuture<'static, Settlement>>,
}

impl FutureValue {
    /// Wrap a future
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = Settlement> + Send + 'static,
    {
        Self {
            identity: Arc::new(()),
            inner: future.boxed().shared(),
        }
    }

    /// A future resolving to the given value
    pub fn resolved<V: Into<Value>>(value: V) -> Self {
        Self::new(future::ready(Ok(value.into())))
    }

    /// A future rejecting with the given error
    pub fn rejected(error: ThrownError) -> Self {
        Self::new(future::ready(Err(error)))
    }

    /// Settlement of the future if a clone already drove it to completion
    pub fn peek(&self) -> Option<Settlement> {
        self.inner.peek().cloned()
    }

    /// Check if both values are clones of the same future
    pub fn ptr_eq(&self, other: &FutureValue) -> bool {
        Arc::ptr_eq(&self.identity, &other.identity)
    }

    /// Chain a callback run once with the settlement, keeping the settlement untouched.
    pub(crate) fn inspect_settlement<F>(self, callback: F) -> Self
    where
        F: FnOnce(&Settlement) + Send + 'static,
    {
        Self::new(async move {
            let settlement = self.await;
            callback(&settlement);
            settlement
        })
    }
}

impl Future for FutureValue {
    type Output = Settlement;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.poll_unpin(cx)
    }
}

impl Debug for FutureValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", Value::Future(self.clone()))
    }
}
