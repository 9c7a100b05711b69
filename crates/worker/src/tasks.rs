//! Keep-alive task tracking.
//!
//! A handler may start work that outlives the value it returns (a background
//! cache refresh, a revalidation fetch). Those tasks are spawned immediately
//! and registered in a [`WaitUntil`]; the host awaits [`WaitUntil::settle`]
//! so the process stays up until they finish. The handler's caller never
//! waits on them.

use futures_util::future::{BoxFuture, join_all};
use std::fmt;
use std::future::Future;
use tokio::task::{JoinError, JoinHandle};

/// Tasks a handler needs kept alive after it returns.
#[derive(Default)]
pub struct WaitUntil {
    pending: Vec<(&'static str, BoxFuture<'static, Result<(), JoinError>>)>,
}

/// How the tracked tasks ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Settled {
    pub completed: usize,
    /// Tasks that panicked or were aborted.
    pub failed: usize,
}

impl WaitUntil {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `task` now and keep it alive.
    pub fn spawn<F>(&mut self, label: &'static str, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.track(label, tokio::spawn(task));
    }

    /// Keep an already spawned task alive; its output is discarded.
    pub fn track<T>(&mut self, label: &'static str, handle: JoinHandle<T>)
    where
        T: Send + 'static,
    {
        self.pending.push((label, Box::pin(async move { handle.await.map(|_| ()) })));
    }

    /// Move every task tracked by `other` into this set.
    pub fn extend(&mut self, other: WaitUntil) {
        self.pending.extend(other.pending);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Wait for every tracked task.
    pub async fn settle(self) -> Settled {
        let (labels, futures): (Vec<_>, Vec<_>) = self.pending.into_iter().unzip();
        let results = join_all(futures).await;

        let mut settled = Settled::default();
        for (label, result) in labels.into_iter().zip(results) {
            match result {
                Ok(()) => settled.completed += 1,
                Err(e) => {
                    tracing::warn!(task = label, error = %e, "keep-alive task did not complete");
                    settled.failed += 1;
                }
            }
        }
        settled
    }
}

impl fmt::Debug for WaitUntil {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.pending.iter().map(|(label, _)| label)).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_settle_waits_for_tasks() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut wait_until = WaitUntil::new();

        for _ in 0..3 {
            let counter = counter.clone();
            wait_until.spawn("increment", async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }

        assert_eq!(wait_until.len(), 3);
        let settled = wait_until.settle().await;
        assert_eq!(settled, Settled { completed: 3, failed: 0 });
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_settle_counts_panics() {
        let mut wait_until = WaitUntil::new();
        wait_until.spawn("boom", async { panic!("background task failed") });
        wait_until.spawn("fine", async {});

        let settled = wait_until.settle().await;
        assert_eq!(settled.completed, 1);
        assert_eq!(settled.failed, 1);
    }

    #[tokio::test]
    async fn test_track_discards_output() {
        let mut wait_until = WaitUntil::new();
        wait_until.track("value", tokio::spawn(async { 42u32 }));

        let mut other = WaitUntil::new();
        other.spawn("unit", async {});
        wait_until.extend(other);

        assert_eq!(wait_until.settle().await.completed, 2);
    }

    #[tokio::test]
    async fn test_empty_settle() {
        let wait_until = WaitUntil::new();
        assert!(wait_until.is_empty());
        assert_eq!(wait_until.settle().await, Settled::default());
    }
}
