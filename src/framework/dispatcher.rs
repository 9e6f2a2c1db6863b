//! # Dispatchers
//!
//! A dispatcher decides how a mailbox drain executes. Both strategies share one contract:
//! `schedule(run, recover)` plus a per-drain `throughput` budget.
//!
//! - [`PooledDispatcher`] hands the drain to the node's [`WorkerPool`] and returns
//!   immediately. This is the default.
//! - [`SynchronizedDispatcher`] runs the drain inline on the posting task, still under the
//!   pool's panic guard. Useful when a test needs deterministic ordering.

use crate::framework::error::ActorError;
use crate::framework::workers::{RecoverFn, WorkerPool};
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::fmt::Debug;

/// Default number of messages a drain processes before yielding.
pub const DEFAULT_THROUGHPUT: usize = 50;

#[async_trait]
pub trait Dispatcher: Send + Sync + Debug {
    /// Executes `run`. `recover` is invoked with the panic message if `run` faults.
    async fn schedule(&self, run: BoxFuture<'static, ()>, recover: RecoverFn)
        -> Result<(), ActorError>;

    /// Maximum messages handled per drain before a cooperative yield.
    fn throughput(&self) -> usize;
}

#[derive(Debug, Clone)]
pub struct PooledDispatcher {
    pool: WorkerPool,
    throughput: usize,
}

impl PooledDispatcher {
    pub fn new(pool: WorkerPool, throughput: usize) -> Self {
        Self {
            pool,
            throughput: throughput.max(1),
        }
    }
}

#[async_trait]
impl Dispatcher for PooledDispatcher {
    async fn schedule(
        &self,
        run: BoxFuture<'static, ()>,
        recover: RecoverFn,
    ) -> Result<(), ActorError> {
        self.pool.submit(run, Some(recover));
        Ok(())
    }

    fn throughput(&self) -> usize {
        self.throughput
    }
}

#[derive(Debug, Clone)]
pub struct SynchronizedDispatcher {
    pool: WorkerPool,
    throughput: usize,
}

impl SynchronizedDispatcher {
    pub fn new(pool: WorkerPool, throughput: usize) -> Self {
        Self {
            pool,
            throughput: throughput.max(1),
        }
    }
}

#[async_trait]
impl Dispatcher for SynchronizedDispatcher {
    async fn schedule(
        &self,
        run: BoxFuture<'static, ()>,
        recover: RecoverFn,
    ) -> Result<(), ActorError> {
        self.pool.try_run(run, Some(recover)).await;
        Ok(())
    }

    fn throughput(&self) -> usize {
        self.throughput
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_synchronized_runs_before_returning() {
        let dispatcher = SynchronizedDispatcher::new(WorkerPool::new(1), 0);
        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();
        dispatcher
            .schedule(
                async move { flag.store(true, Ordering::SeqCst) }.boxed(),
                Arc::new(|_| {}),
            )
            .await
            .unwrap();
        assert!(ran.load(Ordering::SeqCst));
        assert_eq!(dispatcher.throughput(), 1);
    }

    #[tokio::test]
    async fn test_synchronized_recovers_panics() {
        let pool = WorkerPool::new(1);
        let dispatcher = SynchronizedDispatcher::new(pool.clone(), DEFAULT_THROUGHPUT);
        let recovered = Arc::new(AtomicBool::new(false));
        let flag = recovered.clone();
        dispatcher
            .schedule(
                async { panic!("drain fault"); }.boxed(),
                Arc::new(move |_| flag.store(true, Ordering::SeqCst)),
            )
            .await
            .unwrap();
        assert!(recovered.load(Ordering::SeqCst));
        assert_eq!(pool.panics(), 1);
    }
}
