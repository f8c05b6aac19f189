//! Debounced Prefetch Scheduling
//!
//! One cancellable delayed task per query signature. Arming a new
//! prefetch cancels any pending one for that signature, so rapid
//! scrolling coalesces into a single cache warm-up instead of a timer
//! pile-up.

use std::future::Future;
use std::time::Duration;

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

struct ScheduledTask {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Per-signature debounced task scheduler
#[derive(Default)]
pub struct PrefetchScheduler {
    tasks: DashMap<String, ScheduledTask>,
}

impl PrefetchScheduler {
    /// Create an empty scheduler
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a delayed task for a signature, cancelling any pending one.
    ///
    /// The task body runs detached from the visible request path; its
    /// outcome is never observed by callers.
    pub fn schedule<F>(&self, signature: &str, delay: Duration, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        let task_token = token.clone();

        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = task_token.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    task.await;
                }
            }
        });

        if let Some(previous) = self
            .tasks
            .insert(signature.to_string(), ScheduledTask { token, handle })
        {
            previous.token.cancel();
            previous.handle.abort();
        }
    }

    /// Cancel any pending task for a signature
    pub fn cancel(&self, signature: &str) {
        if let Some((_, task)) = self.tasks.remove(signature) {
            task.token.cancel();
            task.handle.abort();
        }
    }

    /// Cancel all pending tasks
    pub fn cancel_all(&self) {
        let signatures: Vec<String> = self.tasks.iter().map(|e| e.key().clone()).collect();
        for signature in signatures {
            self.cancel(&signature);
        }
    }

    /// Number of signatures with a scheduled task slot
    pub fn pending(&self) -> usize {
        self.tasks.len()
    }
}

impl Drop for PrefetchScheduler {
    fn drop(&mut self) {
        for task in self.tasks.iter() {
            task.token.cancel();
            task.handle.abort();
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
