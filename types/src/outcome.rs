//! Per-task outcomes and caller-side summaries.

use std::fmt;

/// The recorded result of running one task.
///
/// Produced exactly once per admitted task, when its execution context finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<E> {
    /// The task body returned `Ok(())`.
    Success,
    /// The task body returned an error; the error is relayed untouched.
    Failure(E),
    /// The task body unwound. Carries the panic message.
    Panicked(String),
}

impl<E> Outcome<E> {
    #[must_use]
    pub fn from_result(result: Result<(), E>) -> Self {
        match result {
            Ok(()) => Outcome::Success,
            Err(err) => Outcome::Failure(err),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }

    #[must_use]
    pub fn is_panic(&self) -> bool {
        matches!(self, Outcome::Panicked(_))
    }

    /// The task's own error, present only for `Failure`.
    ///
    /// `None` does not imply success: a `Panicked` outcome is unsuccessful and
    /// still has no error. Check [`Outcome::is_success`] for that.
    #[must_use]
    pub fn error(&self) -> Option<&E> {
        match self {
            Outcome::Failure(err) => Some(err),
            Outcome::Success | Outcome::Panicked(_) => None,
        }
    }

    #[must_use]
    pub fn into_error(self) -> Option<E> {
        match self {
            Outcome::Failure(err) => Some(err),
            Outcome::Success | Outcome::Panicked(_) => None,
        }
    }

    #[must_use]
    pub fn panic_message(&self) -> Option<&str> {
        match self {
            Outcome::Panicked(message) => Some(message),
            Outcome::Success | Outcome::Failure(_) => None,
        }
    }
}

impl<E> From<Result<(), E>> for Outcome<E> {
    fn from(result: Result<(), E>) -> Self {
        Self::from_result(result)
    }
}

impl<E: fmt::Display> fmt::Display for Outcome<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success => f.write_str("success"),
            Outcome::Failure(err) => write!(f, "failure: {err}"),
            Outcome::Panicked(message) => write!(f, "panicked: {message}"),
        }
    }
}

/// Counts over a collected outcome list.
///
/// The executor never aggregates; callers that want totals build one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OutcomeSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub panicked: usize,
}

impl OutcomeSummary {
    #[must_use]
    pub fn from_outcomes<E>(outcomes: &[Outcome<E>]) -> Self {
        outcomes.iter().fold(Self::default(), |mut summary, outcome| {
            summary.total += 1;
            match outcome {
                Outcome::Success => summary.succeeded += 1,
                Outcome::Failure(_) => summary.failed += 1,
                Outcome::Panicked(_) => summary.panicked += 1,
            }
            summary
        })
    }

    /// Every outcome that was not a success.
    #[must_use]
    pub fn unsuccessful(&self) -> usize {
        self.failed + self.panicked
    }

    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.unsuccessful() == 0
    }
}
