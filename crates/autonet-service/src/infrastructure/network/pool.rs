//! Bounded pool that runs handshake sessions as Tokio tasks.
//!
//! The coordinator hands every admitted device's session to a
//! [`SessionPool`].  The pool is constructed by the caller around an explicit
//! runtime [`Handle`] and injected into the coordinator; there is no global
//! pool.
//!
//! # Bounding (for beginners)
//!
//! A `Semaphore` holds `max_sessions` permits.  Each submitted task first
//! waits for a permit and only then runs its session, so at most
//! `max_sessions` sessions are active at once.  Submission itself never
//! blocks: extra sessions simply queue on the semaphore, the same way extra
//! jobs queue in a fixed-size thread pool.
//!
//! # Shutdown
//!
//! [`SessionPool::shutdown`] closes the semaphore (queued tasks give up
//! without running) and aborts every task in flight.  Later submissions are
//! refused.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::debug;

struct PoolInner {
    handle: Handle,
    permits: Arc<Semaphore>,
    max_sessions: usize,
    tasks: Mutex<JoinSet<()>>,
}

/// Cloneable handle to a bounded task pool.
#[derive(Clone)]
pub struct SessionPool {
    inner: Arc<PoolInner>,
}

impl SessionPool {
    /// Creates a pool that spawns onto `handle` and runs at most
    /// `max_sessions` tasks concurrently.
    pub fn new(handle: Handle, max_sessions: usize) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                handle,
                permits: Arc::new(Semaphore::new(max_sessions)),
                max_sessions,
                tasks: Mutex::new(JoinSet::new()),
            }),
        }
    }

    fn tasks(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.inner.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Submits a fire-and-forget task.
    ///
    /// Returns `false` without running `task` when the pool has been shut down.
    pub fn submit<F>(&self, task: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.is_shut_down() {
            return false;
        }
        let permits = Arc::clone(&self.inner.permits);
        let mut tasks = self.tasks();

        // Reap finished tasks so the set does not grow with every session.
        while tasks.try_join_next().is_some() {}

        tasks.spawn_on(
            async move {
                // Acquire fails only once the pool is shut down.
                let Ok(_permit) = permits.acquire_owned().await else {
                    debug!("session dropped: pool shut down while queued");
                    return;
                };
                task.await;
            },
            &self.inner.handle,
        );
        true
    }

    /// Number of tasks currently holding a permit.
    pub fn active(&self) -> usize {
        if self.is_shut_down() {
            return 0;
        }
        self.inner.max_sessions - self.inner.permits.available_permits()
    }

    pub fn max_sessions(&self) -> usize {
        self.inner.max_sessions
    }

    /// Stops accepting work and aborts every queued or running task.
    pub fn shutdown(&self) {
        self.inner.permits.close();
        self.tasks().abort_all();
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.permits.is_closed()
    }
}

impl std::fmt::Debug for SessionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionPool")
            .field("max_sessions", &self.inner.max_sessions)
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_pool_runs_every_submitted_task() {
        // Arrange
        let pool = SessionPool::new(Handle::current(), 2);
        let (tx, mut rx) = mpsc::channel(8);

        // Act
        for i in 0..5 {
            let tx = tx.clone();
            assert!(pool.submit(async move {
                tx.send(i).await.unwrap();
            }));
        }
        drop(tx);

        // Assert
        let mut seen = Vec::new();
        while let Some(i) = rx.recv().await {
            seen.push(i);
        }
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pool_never_exceeds_max_sessions() {
        // Arrange
        let pool = SessionPool::new(Handle::current(), 2);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (done_tx, mut done_rx) = mpsc::channel(8);

        // Act
        for _ in 0..6 {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            let done_tx = done_tx.clone();
            pool.submit(async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(100)).await;
                running.fetch_sub(1, Ordering::SeqCst);
                done_tx.send(()).await.unwrap();
            });
        }
        drop(done_tx);
        while done_rx.recv().await.is_some() {}

        // Assert
        assert_eq!(peak.load(Ordering::SeqCst), 2);
        assert_eq!(pool.active(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_active_counts_running_tasks() {
        let pool = SessionPool::new(Handle::current(), 4);
        pool.submit(tokio::time::sleep(Duration::from_secs(10)));
        pool.submit(tokio::time::sleep(Duration::from_secs(10)));

        tokio::time::sleep(Duration::from_millis(1)).await;

        assert_eq!(pool.active(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_aborts_running_and_refuses_new_tasks() {
        // Arrange
        let pool = SessionPool::new(Handle::current(), 1);
        let finished = Arc::new(AtomicUsize::new(0));
        for _ in 0..2 {
            let finished = Arc::clone(&finished);
            pool.submit(async move {
                tokio::time::sleep(Duration::from_secs(1)).await;
                finished.fetch_add(1, Ordering::SeqCst);
            });
        }
        tokio::time::sleep(Duration::from_millis(10)).await;

        // Act
        pool.shutdown();
        let accepted = pool.submit(async {});
        tokio::time::sleep(Duration::from_secs(5)).await;

        // Assert
        assert!(!accepted);
        assert!(pool.is_shut_down());
        assert_eq!(finished.load(Ordering::SeqCst), 0);
        assert_eq!(pool.active(), 0);
    }

    #[tokio::test]
    async fn test_clones_share_the_same_bound() {
        let pool = SessionPool::new(Handle::current(), 3);
        let clone = pool.clone();

        clone.shutdown();

        assert_eq!(pool.max_sessions(), 3);
        assert!(pool.is_shut_down());
    }
}
