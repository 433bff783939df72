//! Tracking for detached background work.

use std::future::Future;

use tokio::sync::Mutex;
use tokio::task::JoinSet;

/// Detached tasks whose results are only used for their side effects.
///
/// Failures stop at the task boundary; they are logged when the task is
/// joined and never reach a response.
#[derive(Default)]
pub(crate) struct BackgroundTasks {
    set: Mutex<JoinSet<()>>,
}

impl BackgroundTasks {
    pub async fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut set = self.set.lock().await;
        while set.try_join_next().is_some() {}
        set.spawn(task);
    }

    /// Tasks spawned and not yet joined.
    pub async fn pending(&self) -> usize {
        self.set.lock().await.len()
    }

    /// Join every task spawned so far. Tasks spawned meanwhile are left for the next drain.
    pub async fn drain(&self) -> usize {
        let mut set = std::mem::take(&mut *self.set.lock().await);
        let mut joined = 0;
        while let Some(result) = set.join_next().await {
            if let Err(err) = result {
                tracing::warn!(error = %err, "background task panicked or was cancelled");
            }
            joined += 1;
        }
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_drain_waits_for_tasks() {
        let tasks = BackgroundTasks::default();
        let done = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let done = Arc::clone(&done);
            tasks
                .spawn(async move {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    done.fetch_add(1, Ordering::SeqCst);
                })
                .await;
        }

        assert_eq!(tasks.drain().await, 3);
        assert_eq!(done.load(Ordering::SeqCst), 3);
        assert_eq!(tasks.pending().await, 0);
    }

    #[tokio::test]
    async fn test_panicking_task_is_contained() {
        let tasks = BackgroundTasks::default();
        tasks
            .spawn(async {
                if true {
                    panic!("revalidation exploded");
                }
            })
            .await;

        assert_eq!(tasks.drain().await, 1);
        assert_eq!(tasks.pending().await, 0);
    }
}
