//! Waiting between throttled attempts.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Type alias for a boxed future used internally.
pub(crate) type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Suspends the calling task between rate-limited attempts.
///
/// The client uses [`TokioSleeper`] unless another implementation is
/// injected with [`Client::with_sleeper`](crate::Client::with_sleeper),
/// which lets tests observe the requested waits without spending real
/// time.
pub trait Sleeper: Send + Sync {
    /// Wait for `duration`.
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + 'static>>;
}

/// [`Sleeper`] backed by `tokio::time::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + 'static>> {
        Box::pin(tokio::time::sleep(duration))
    }
}

impl fmt::Debug for dyn Sleeper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Sleeper")
    }
}
