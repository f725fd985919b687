//! Worker launch: one spawned execution context per admitted job.

use std::any::Any;
use std::panic::{AssertUnwindSafe, resume_unwind};
use std::sync::Arc;

use fanout_types::Outcome;
use futures_util::FutureExt;

use crate::Shared;
use crate::state::Job;

/// Spawn `job` onto the current runtime.
///
/// The worker runs the job to completion, delivers its outcome, then hands
/// its slot back to the pool. Outcome delivery happens before the slot is
/// released, so by the time `running` reaches zero every outcome is already
/// in the channel.
pub(crate) fn launch<E>(shared: Arc<Shared<E>>, job: Job<E>)
where
    E: Send + 'static,
{
    tokio::spawn(async move {
        // Constructing the future happens inside the guarded block too; a
        // closure that panics before returning its future is still captured.
        let guarded = AssertUnwindSafe(async move { job().await }).catch_unwind();

        let outcome = match guarded.await {
            Ok(result) => Outcome::from_result(result),
            Err(payload) => {
                let message = panic_payload_to_string(&payload);
                tracing::warn!(panic = %message, "Task panicked");
                Outcome::Panicked(message)
            }
        };

        shared.finish(outcome);
    });
}

/// Run a synchronous task body on the blocking thread pool.
///
/// A panic inside the body is re-raised here so the worker's unwind guard
/// reports it like any other task panic.
pub(crate) async fn run_blocking<F, E>(task: F) -> Result<(), E>
where
    F: FnOnce() -> Result<(), E> + Send + 'static,
    E: Send + 'static,
{
    match tokio::task::spawn_blocking(task).await {
        Ok(result) => result,
        Err(err) => match err.try_into_panic() {
            Ok(payload) => resume_unwind(payload),
            Err(err) => resume_unwind(Box::new(format!("blocking task did not complete: {err}"))),
        },
    }
}

fn panic_payload_to_string(payload: &Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
