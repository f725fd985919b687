//! Core domain types for Fanout.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! The executor in `fanout-pool` and the driver in `fanout` both build on these.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory

mod limit;
mod outcome;

pub use limit::{ConcurrencyLimit, ParseLimitError};
pub use outcome::{Outcome, OutcomeSummary};

// ============================================================================
// Executor Lifecycle
// ============================================================================

/// Executor state machine.
///
/// ```text
/// Idle --submit/admit--> Draining --quiescent--> Terminated
/// Idle --------------quiescent---------------> Terminated
/// ```
///
/// A pool that never received work skips `Draining`: its first admission pass
/// finds it quiescent. No transition leaves `Terminated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Lifecycle {
    /// Constructed, nothing queued or running yet.
    #[default]
    Idle,
    /// Work is queued or in flight.
    Draining,
    /// Queue empty and nothing running; reached exactly once.
    Terminated,
}

impl Lifecycle {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Lifecycle::Idle => "idle",
            Lifecycle::Draining => "draining",
            Lifecycle::Terminated => "terminated",
        }
    }

    #[must_use]
    pub fn is_terminated(self) -> bool {
        matches!(self, Lifecycle::Terminated)
    }
}

impl std::fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
