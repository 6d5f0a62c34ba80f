//! Bounded background runner for suggestion prefetches.
//!
//! Every task waits for a permit before it starts, so at most `limit`
//! provider calls run in the background at once. Closing the scheduler
//! refuses new work and fails tasks still waiting for a permit.

use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Arc;

use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug_span};

const DEFAULT_LIMIT: NonZeroUsize = NonZeroUsize::new(4).unwrap();

/// Why a task could not run.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchedulerError {
    /// The session ended before the task got a permit.
    #[error("scheduler closed")]
    Closed,
    /// Spawn was called off a Tokio runtime.
    #[error("no tokio runtime available")]
    NoRuntime,
}

/// Result alias for scheduler operations.
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Cloneable handle to a shared pool of background permits.
#[derive(Debug, Clone)]
pub struct TaskScheduler {
    permits: Arc<Semaphore>,
    limit: NonZeroUsize,
}

impl TaskScheduler {
    /// Allows `limit` tasks to run concurrently.
    #[must_use]
    pub fn with_limit(limit: NonZeroUsize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(limit.get())),
            limit,
        }
    }

    /// Concurrency limit.
    #[must_use]
    pub const fn limit(&self) -> NonZeroUsize {
        self.limit
    }

    /// Tasks currently holding a permit.
    #[must_use]
    pub fn running(&self) -> usize {
        if self.is_closed() {
            return 0;
        }
        self.limit.get() - self.permits.available_permits()
    }

    /// Whether [`TaskScheduler::close`] has been called on any clone.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.permits.is_closed()
    }

    /// Stops accepting work. Running tasks finish; queued ones fail.
    pub fn close(&self) {
        self.permits.close();
    }

    /// Queues `task` under a tracing span named after `label`.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Closed`] after [`TaskScheduler::close`] and
    /// [`SchedulerError::NoRuntime`] when called outside a Tokio runtime. The
    /// returned handle resolves to [`SchedulerError::Closed`] if the
    /// scheduler closes while the task is still queued.
    pub fn spawn<F, T>(
        &self,
        label: &str,
        task: F,
    ) -> SchedulerResult<JoinHandle<SchedulerResult<T>>>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        if self.is_closed() {
            return Err(SchedulerError::Closed);
        }
        let runtime = Handle::try_current().map_err(|_| SchedulerError::NoRuntime)?;

        let permits = Arc::clone(&self.permits);
        let span = debug_span!("background", task = label);
        Ok(runtime.spawn(
            async move {
                let Ok(_permit) = permits.acquire_owned().await else {
                    return Err(SchedulerError::Closed);
                };
                Ok(task.await)
            }
            .instrument(span),
        ))
    }
}

impl Default for TaskScheduler {
    fn default() -> Self {
        Self::with_limit(DEFAULT_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;

    fn one_at_a_time() -> TaskScheduler {
        TaskScheduler::with_limit(NonZeroUsize::MIN)
    }

    #[tokio::test]
    async fn second_task_waits_for_the_first() {
        let scheduler = one_at_a_time();
        let (release, wait) = oneshot::channel::<()>();
        let first = scheduler
            .spawn("first", async move {
                let _ = wait.await;
                1
            })
            .unwrap();
        let second = scheduler.spawn("second", async { 2 }).unwrap();

        tokio::task::yield_now().await;
        assert_eq!(scheduler.running(), 1);
        assert!(!second.is_finished());

        release.send(()).unwrap();
        assert_eq!(first.await.unwrap(), Ok(1));
        assert_eq!(second.await.unwrap(), Ok(2));
        assert_eq!(scheduler.running(), 0);
    }

    #[tokio::test]
    async fn closed_scheduler_refuses_work() {
        let scheduler = TaskScheduler::default();
        scheduler.clone().close();

        assert!(scheduler.is_closed());
        assert_eq!(scheduler.spawn("late", async {}).unwrap_err(), SchedulerError::Closed);
    }

    #[tokio::test]
    async fn close_fails_queued_tasks_but_not_running_ones() {
        let scheduler = one_at_a_time();
        let (release, wait) = oneshot::channel::<()>();
        let running = scheduler
            .spawn("running", async move {
                let _ = wait.await;
            })
            .unwrap();
        tokio::task::yield_now().await;
        let queued = scheduler.spawn("queued", async {}).unwrap();

        scheduler.close();
        release.send(()).unwrap();

        assert_eq!(running.await.unwrap(), Ok(()));
        assert_eq!(queued.await.unwrap(), Err(SchedulerError::Closed));
    }

    #[test]
    fn spawn_outside_runtime_is_an_error() {
        let result = TaskScheduler::default().spawn("orphan", async {});
        assert_eq!(result.unwrap_err(), SchedulerError::NoRuntime);
    }
}
