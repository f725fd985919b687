use thiserror::Error;

/// Why a submission through a [`PoolHandle`](crate::PoolHandle) was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// The pool already drained and terminated; the task was dropped unrun.
    #[error("pool has terminated; task was not queued")]
    Terminated,
}
