//! Runtime abstraction layer for async operations
//!
//! Timers and fetches are spawned through [`spawn`], which hands back an
//! [`AsyncHandle`] so that the scheduler can abort them on cancellation
//! without holding a concrete join handle type.

use crate::prelude::Future;

/// Handle to a spawned async task
pub trait AsyncHandle: Send + Sync {
    /// Check if the task is finished
    fn is_finished(&self) -> bool;

    /// Cancel the task
    fn cancel(&self);
}

/// Spawn `future` on the current tokio runtime
pub fn spawn<F>(future: F) -> Box<dyn AsyncHandle>
where
    F: Future<Output = ()> + Send + 'static,
{
    Box::new(TokioHandle(tokio::spawn(future)))
}

/// Sleep until `deadline` on the active runtime's clock
pub async fn sleep_until(deadline: tokio::time::Instant) {
    tokio::time::sleep_until(deadline).await;
}

/// Current instant on the runtime clock (pausable in tests)
pub fn now() -> tokio::time::Instant {
    tokio::time::Instant::now()
}

struct TokioHandle(tokio::task::JoinHandle<()>);

impl AsyncHandle for TokioHandle {
    fn is_finished(&self) -> bool {
        self.0.is_finished()
    }

    fn cancel(&self) {
        self.0.abort();
    }
}
