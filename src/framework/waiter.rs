//! # Waiter
//!
//! A one-shot, timeout-bounded rendezvous used to implement request/reply.
//!
//! The waiter keeps its own sending half alive, so the only two ways [`Waiter::wait`]
//! can finish are a [`Completer::done`] call or the deadline. A responder that is dropped
//! without answering therefore surfaces as [`ActorError::CallTimeout`] once the deadline
//! passes, never earlier.

use crate::framework::error::ActorError;
use tokio::sync::mpsc;
use tokio::time::{self, Duration, Instant};

/// The waiting half. Not reusable; create one per call.
#[derive(Debug)]
pub struct Waiter<T> {
    tx: mpsc::Sender<T>,
    rx: mpsc::Receiver<T>,
    deadline: Instant,
}

/// The resolving half. Cheap to clone; only the first `done` is delivered.
#[derive(Debug, Clone)]
pub struct Completer<T> {
    tx: mpsc::Sender<T>,
}

impl<T: Send> Waiter<T> {
    /// Creates a waiter whose deadline starts counting now.
    pub fn new(timeout: Duration) -> Self {
        let (tx, rx) = mpsc::channel(1);
        Self {
            tx,
            rx,
            deadline: Instant::now() + timeout,
        }
    }

    pub fn completer(&self) -> Completer<T> {
        Completer {
            tx: self.tx.clone(),
        }
    }

    /// Waits for the first value handed to a [`Completer`], or times out.
    pub async fn wait(mut self) -> Result<T, ActorError> {
        match time::timeout_at(self.deadline, self.rx.recv()).await {
            Ok(Some(value)) => Ok(value),
            // `self.tx` keeps the channel open, so `None` cannot happen before the deadline.
            Ok(None) | Err(_) => Err(ActorError::CallTimeout),
        }
    }
}

impl<T> Completer<T> {
    /// Resolves the waiter. Later calls, and calls after the waiter expired, are no-ops.
    pub fn done(&self, value: T) {
        let _ = self.tx.try_send(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_done_resolves_wait() {
        let waiter = Waiter::new(Duration::from_secs(1));
        let completer = waiter.completer();
        tokio::spawn(async move { completer.done(42) });
        assert_eq!(waiter.wait().await, Ok(42));
    }

    #[tokio::test]
    async fn test_only_first_done_counts() {
        let waiter = Waiter::new(Duration::from_secs(1));
        let completer = waiter.completer();
        completer.done(1);
        completer.done(2);
        completer.done(3);
        assert_eq!(waiter.wait().await, Ok(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_not_before_deadline() {
        let started = Instant::now();
        let waiter: Waiter<u32> = Waiter::new(Duration::from_millis(200));
        assert_eq!(waiter.wait().await, Err(ActorError::CallTimeout));
        assert!(started.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_completer_still_waits_for_deadline() {
        let started = Instant::now();
        let waiter: Waiter<u32> = Waiter::new(Duration::from_millis(50));
        drop(waiter.completer());
        assert_eq!(waiter.wait().await, Err(ActorError::CallTimeout));
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_done_after_expiry_is_noop() {
        let waiter: Waiter<u32> = Waiter::new(Duration::from_millis(1));
        let completer = waiter.completer();
        assert_eq!(waiter.wait().await, Err(ActorError::CallTimeout));
        completer.done(9);
    }
}
