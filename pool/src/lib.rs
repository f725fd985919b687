//! Fanout Pool - bounded-concurrency task executor.
//!
//! # Architecture
//!
//! Callers queue independent tasks on a [`Pool`], then await [`Pool::wait`] to
//! collect one [`Outcome`] per task. At most `limit` tasks run at once.
//!
//! ```text
//! submit() --push--> pending (FIFO) --notify--> recheck
//!                                                  |
//! wait() loop <-------------------------------------+
//!   | recheck  -> admission (pop head, running += 1, spawn worker)
//!   | outcome  -> append to result list
//!   | latch    -> drain channel, return
//!
//! worker: run task -> send outcome -> running -= 1 -> notify recheck
//! ```
//!
//! # Invariants
//!
//! - `pending`, `running` and the lifecycle live behind one mutex. The lock is
//!   never held across a task body or an await point.
//! - Only the collector decides admission; workers release their slot and ask
//!   for a recheck.
//! - Termination is a one-shot latch fired when the queue is empty and nothing
//!   is running. It cannot fire twice.
//!
//! # Lifetime
//!
//! A pool is single-use. `wait` consumes it, so the owner cannot submit again:
//!
//! ```compile_fail
//! # async fn demo() {
//! let pool = fanout_pool::Pool::<()>::new(2);
//! let _ = pool.wait().await;
//! pool.submit(|| async { Ok(()) });
//! # }
//! ```
//!
//! Tasks that need to fan out further capture a [`PoolHandle`]. A handle used
//! after the pool terminated gets [`SubmitError::Terminated`].

mod error;
mod state;
mod worker;


pub use error::SubmitError;
pub use fanout_types::{ConcurrencyLimit, Lifecycle, Outcome, OutcomeSummary};

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{Notify, mpsc, oneshot};

use state::{Admission, Job, PoolState, TaskFuture};

/// Point-in-time view of the pool's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSnapshot {
    pub limit: ConcurrencyLimit,
    pub pending: usize,
    pub running: usize,
    /// Highest `running` value ever observed.
    pub peak_running: usize,
    pub lifecycle: Lifecycle,
}

/// State shared between the owner, handles, and workers.
pub(crate) struct Shared<E> {
    limit: ConcurrencyLimit,
    state: Mutex<PoolState<E>>,
    /// Coalescing "please recheck admission" signal.
    recheck: Notify,
    outcome_tx: mpsc::UnboundedSender<Outcome<E>>,
}

impl<E> Shared<E>
where
    E: Send + 'static,
{
    fn lock(&self) -> MutexGuard<'_, PoolState<E>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn enqueue(&self, job: Job<E>) -> Result<(), SubmitError> {
        self.lock().enqueue(job)?;
        self.recheck.notify_one();
        Ok(())
    }

    /// Admission pass. Spawns whatever the state admits, outside the lock.
    fn check_queue(self: &Arc<Self>) {
        let admission = {
            let mut state = self.lock();
            let admission = state.admit(self.limit);
            if let Admission::Start(jobs) = &admission
                && !jobs.is_empty()
            {
                tracing::debug!(
                    admitted = jobs.len(),
                    running = state.running(),
                    pending = state.pending(),
                    "Admitted queued tasks"
                );
            }
            admission
        };

        match admission {
            Admission::Start(jobs) => {
                for job in jobs {
                    worker::launch(Arc::clone(self), job);
                }
            }
            Admission::Quiescent => tracing::debug!("Pool reached quiescence"),
            Admission::Closed | Admission::AtCapacity => {}
        }
    }

    /// Called by a worker once its task body returned.
    fn finish(&self, outcome: Outcome<E>) {
        if self.outcome_tx.send(outcome).is_err() {
            tracing::trace!("Outcome dropped; pool was discarded without waiting");
        }

        let running = {
            let mut state = self.lock();
            state.complete();
            state.running()
        };
        tracing::trace!(running, "Task finished");

        self.recheck.notify_one();
    }

    fn snapshot(&self) -> PoolSnapshot {
        let state = self.lock();
        PoolSnapshot {
            limit: self.limit,
            pending: state.pending(),
            running: state.running(),
            peak_running: state.peak_running(),
            lifecycle: state.lifecycle(),
        }
    }
}

fn async_job<E, F, Fut>(task: F) -> Job<E>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
{
    Box::new(move || -> TaskFuture<E> { Box::pin(task()) })
}

fn blocking_job<E, F>(task: F) -> Job<E>
where
    F: FnOnce() -> Result<(), E> + Send + 'static,
    E: Send + 'static,
{
    Box::new(move || -> TaskFuture<E> { Box::pin(worker::run_blocking(task)) })
}

/// Bounded-concurrency executor.
///
/// `E` is the error type task bodies return. Task errors never stop the pool;
/// each one is relayed as an [`Outcome::Failure`] from [`Pool::wait`].
pub struct Pool<E> {
    shared: Arc<Shared<E>>,
    outcome_rx: mpsc::UnboundedReceiver<Outcome<E>>,
    terminated_rx: oneshot::Receiver<()>,
}

impl<E> Pool<E>
where
    E: Send + 'static,
{
    /// Create a pool running at most `limit` tasks at once. `0` means `1`.
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self::with_limit(ConcurrencyLimit::new(limit))
    }

    #[must_use]
    pub fn with_limit(limit: ConcurrencyLimit) -> Self {
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        let (terminate_tx, terminated_rx) = oneshot::channel();

        Self {
            shared: Arc::new(Shared {
                limit,
                state: Mutex::new(PoolState::new(terminate_tx)),
                recheck: Notify::new(),
                outcome_tx,
            }),
            outcome_rx,
            terminated_rx,
        }
    }

    #[must_use]
    pub fn limit(&self) -> ConcurrencyLimit {
        self.shared.limit
    }

    /// Queue an async task. Never blocks and never fails.
    ///
    /// The closure is not called until the task is admitted.
    pub fn submit<F, Fut>(&self, task: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
    {
        self.submit_job(async_job(task));
    }

    /// Queue a synchronous task. It runs on the runtime's blocking thread pool
    /// but still occupies one of the pool's `limit` slots while it runs.
    pub fn submit_blocking<F>(&self, task: F)
    where
        F: FnOnce() -> Result<(), E> + Send + 'static,
    {
        self.submit_job(blocking_job(task));
    }

    fn submit_job(&self, job: Job<E>) {
        // Termination only happens inside `wait`, which consumes `self`.
        if let Err(err) = self.shared.enqueue(job) {
            tracing::warn!("Owned pool rejected a submission: {err}");
        }
    }

    /// A cloneable handle for submitting from inside running tasks.
    #[must_use]
    pub fn handle(&self) -> PoolHandle<E> {
        PoolHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> PoolSnapshot {
        self.shared.snapshot()
    }

    /// Run everything queued, including work submitted while waiting, and
    /// return every outcome in completion order.
    ///
    /// Returns once the queue is empty and no task is running. With nothing
    /// submitted it returns an empty list immediately.
    pub async fn wait(self) -> Vec<Outcome<E>> {
        let Self {
            shared,
            mut outcome_rx,
            mut terminated_rx,
        } = self;

        let mut outcomes = Vec::new();
        shared.check_queue();

        loop {
            tokio::select! {
                Some(outcome) = outcome_rx.recv() => outcomes.push(outcome),
                () = shared.recheck.notified() => shared.check_queue(),
                _ = &mut terminated_rx => break,
            }
        }

        // Workers deliver before releasing their slot, so nothing else can
        // arrive once the latch fired.
        while let Ok(outcome) = outcome_rx.try_recv() {
            outcomes.push(outcome);
        }

        tracing::debug!(outcomes = outcomes.len(), "Pool drained");
        outcomes
    }
}

impl<E> fmt::Debug for Pool<E>
where
    E: Send + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("snapshot", &self.snapshot())
            .finish_non_exhaustive()
    }
}

/// Submission handle that tasks capture to queue more work.
pub struct PoolHandle<E> {
    shared: Arc<Shared<E>>,
}

impl<E> Clone for PoolHandle<E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<E> PoolHandle<E>
where
    E: Send + 'static,
{
    /// Queue an async task.
    ///
    /// Fails only after the pool terminated; the task is dropped unrun.
    pub fn submit<F, Fut>(&self, task: F) -> Result<(), SubmitError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
    {
        self.submit_job(async_job(task))
    }

    /// Queue a synchronous task. See [`Pool::submit_blocking`].
    pub fn submit_blocking<F>(&self, task: F) -> Result<(), SubmitError>
    where
        F: FnOnce() -> Result<(), E> + Send + 'static,
    {
        self.submit_job(blocking_job(task))
    }

    fn submit_job(&self, job: Job<E>) -> Result<(), SubmitError> {
        self.shared.enqueue(job).inspect_err(|err| {
            tracing::warn!("Submission rejected: {err}");
        })
    }

    #[must_use]
    pub fn snapshot(&self) -> PoolSnapshot {
        self.shared.snapshot()
    }
}

impl<E> fmt::Debug for PoolHandle<E>
where
    E: Send + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolHandle")
            .field("snapshot", &self.snapshot())
            .finish()
    }
}
