//! # Worker Pool
//!
//! A size-bounded pool of tokio tasks shared by every pooled dispatcher of a node. Each
//! submitted task waits for one of `size` permits before running, so at most `size`
//! mailbox drains execute at once no matter how many actors exist.
//!
//! Every task runs under `catch_unwind`: a panic is counted, logged, and reported to the
//! task's recover hook instead of tearing down the worker.

use futures::future::BoxFuture;
use futures::FutureExt;
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::error;

/// Hook invoked with the panic message when a task faults.
pub type RecoverFn = Arc<dyn Fn(String) + Send + Sync>;

/// Shared, cheap-to-clone handle to a bounded task pool.
#[derive(Clone)]
pub struct WorkerPool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    size: usize,
    permits: Arc<Semaphore>,
    running: AtomicI64,
    panics: AtomicU64,
}

impl WorkerPool {
    /// Creates a pool running at most `size` tasks concurrently (at least one).
    pub fn new(size: usize) -> Self {
        let size = size.clamp(1, Semaphore::MAX_PERMITS);
        Self {
            inner: Arc::new(PoolInner {
                size,
                permits: Arc::new(Semaphore::new(size)),
                running: AtomicI64::new(0),
                panics: AtomicU64::new(0),
            }),
        }
    }

    /// Queues `task` on the pool. Must be called from within a tokio runtime.
    ///
    /// Tasks submitted after [`WorkerPool::close`] are dropped.
    pub fn submit(&self, task: BoxFuture<'static, ()>, recover: Option<RecoverFn>) {
        let pool = self.clone();
        tokio::spawn(async move {
            let Ok(_permit) = pool.inner.permits.clone().acquire_owned().await else {
                return;
            };
            pool.inner.running.fetch_add(1, Ordering::Relaxed);
            pool.try_run(task, recover).await;
            pool.inner.running.fetch_sub(1, Ordering::Relaxed);
        });
    }

    /// Runs `task` on the current task, catching any panic.
    pub async fn try_run(&self, task: BoxFuture<'static, ()>, recover: Option<RecoverFn>) {
        if let Err(panic) = AssertUnwindSafe(task).catch_unwind().await {
            self.inner.panics.fetch_add(1, Ordering::Relaxed);
            let reason = panic_message(panic.as_ref());
            error!(%reason, "worker task panicked");
            if let Some(recover) = recover {
                recover(reason);
            }
        }
    }

    /// Stops accepting new work. Tasks already holding a permit run to completion.
    pub fn close(&self) {
        self.inner.permits.close();
    }

    pub fn size(&self) -> usize {
        self.inner.size
    }

    /// Number of tasks currently executing.
    pub fn running(&self) -> i64 {
        self.inner.running.load(Ordering::Relaxed)
    }

    /// Number of tasks that panicked since the pool was created.
    pub fn panics(&self) -> u64 {
        self.inner.panics.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("size", &self.size())
            .field("running", &self.running())
            .field("panics", &self.panics())
            .finish()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::time::Duration;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_panic_is_recovered_and_counted() {
        let pool = WorkerPool::new(4);
        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();
        let recover: RecoverFn = Arc::new(move |reason| *sink.lock() = Some(reason));

        pool.try_run(async { panic!("boom"); }.boxed(), Some(recover))
            .await;

        assert_eq!(pool.panics(), 1);
        assert_eq!(seen.lock().as_deref(), Some("boom"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_is_bounded() {
        let pool = WorkerPool::new(2);
        let peak = Arc::new(AtomicI64::new(0));
        let live = Arc::new(AtomicI64::new(0));
        let mut finished = Vec::new();

        for _ in 0..8 {
            let (tx, rx) = oneshot::channel();
            finished.push(rx);
            let (peak, live) = (peak.clone(), live.clone());
            pool.submit(
                async move {
                    let now = live.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    live.fetch_sub(1, Ordering::SeqCst);
                    let _ = tx.send(());
                }
                .boxed(),
                None,
            );
        }
        for rx in finished {
            rx.await.unwrap();
        }
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }
}
