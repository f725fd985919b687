//! Lock-protected executor state and the admission decision.
//!
//! Everything in here runs inside the pool's single critical section. Nothing
//! in this module awaits, spawns, or calls into a task body.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;

use fanout_types::{ConcurrencyLimit, Lifecycle};
use tokio::sync::oneshot;

use crate::SubmitError;

/// Boxed task body future.
pub(crate) type TaskFuture<E> = Pin<Box<dyn Future<Output = Result<(), E>> + Send + 'static>>;

/// A queued unit of work. The future is not created until the job is admitted.
pub(crate) type Job<E> = Box<dyn FnOnce() -> TaskFuture<E> + Send + 'static>;

/// Result of one admission pass.
pub(crate) enum Admission<E> {
    /// The pool already terminated; nothing changes.
    Closed,
    /// `running == limit`.
    AtCapacity,
    /// Jobs popped from the head of the queue. `running` already counts them.
    /// Empty when the queue is drained but work is still in flight.
    Start(Vec<Job<E>>),
    /// Queue empty and nothing running. The termination latch fired on this pass.
    Quiescent,
}

pub(crate) struct PoolState<E> {
    pending: VecDeque<Job<E>>,
    running: usize,
    peak_running: usize,
    lifecycle: Lifecycle,
    /// One-shot termination latch. `take()` is the only way to fire it.
    terminate_tx: Option<oneshot::Sender<()>>,
}

impl<E> PoolState<E> {
    pub(crate) fn new(terminate_tx: oneshot::Sender<()>) -> Self {
        Self {
            pending: VecDeque::new(),
            running: 0,
            peak_running: 0,
            lifecycle: Lifecycle::Idle,
            terminate_tx: Some(terminate_tx),
        }
    }

    pub(crate) fn enqueue(&mut self, job: Job<E>) -> Result<(), SubmitError> {
        if self.lifecycle.is_terminated() {
            return Err(SubmitError::Terminated);
        }
        self.pending.push_back(job);
        self.lifecycle = Lifecycle::Draining;
        Ok(())
    }

    /// Decide how many queued jobs may start now.
    ///
    /// Strict FIFO: jobs leave the queue in the order they were enqueued.
    pub(crate) fn admit(&mut self, limit: ConcurrencyLimit) -> Admission<E> {
        if self.lifecycle.is_terminated() {
            return Admission::Closed;
        }

        let available = limit.get().saturating_sub(self.running);
        if available == 0 {
            return Admission::AtCapacity;
        }

        let mut admitted = Vec::with_capacity(available.min(self.pending.len()));
        for _ in 0..available {
            let Some(job) = self.pending.pop_front() else {
                if self.running == 0 {
                    self.terminate();
                    return Admission::Quiescent;
                }
                break;
            };

            self.running += 1;
            self.peak_running = self.peak_running.max(self.running);
            self.lifecycle = Lifecycle::Draining;
            admitted.push(job);
        }

        debug_assert!(self.running <= limit.get(), "running exceeded limit");
        Admission::Start(admitted)
    }

    /// Record that one admitted job finished.
    pub(crate) fn complete(&mut self) {
        debug_assert!(self.running > 0, "completion without a running job");
        self.running = self.running.saturating_sub(1);
    }

    fn terminate(&mut self) {
        self.lifecycle = Lifecycle::Terminated;
        if let Some(tx) = self.terminate_tx.take() {
            // The receiver lives in `Pool::wait`; if it is gone nobody is listening.
            let _ = tx.send(());
        }
    }

    pub(crate) fn pending(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn running(&self) -> usize {
        self.running
    }

    pub(crate) fn peak_running(&self) -> usize {
        self.peak_running
    }

    pub(crate) fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }
}
