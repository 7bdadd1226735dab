// ABOUTME: Terminal outcome and report of an update run.
// ABOUTME: Separates recoverable failures from ones needing manual repair.

use std::fmt;
use std::path::PathBuf;

use crate::diagnostics::Diagnostics;
use crate::types::ServiceName;

use super::error::UpdateError;
use super::state::UpdateState;

/// What is on disk at the site root when a run ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeState {
    /// The run ended before anything was written.
    Untouched,
    /// The new artifact was applied.
    New,
    /// The pre-update tree was restored from the snapshot.
    Restored,
    /// A partial apply that could not be rolled back.
    Inconsistent,
}

impl TreeState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TreeState::Untouched => "untouched",
            TreeState::New => "new",
            TreeState::Restored => "restored",
            TreeState::Inconsistent => "inconsistent",
        }
    }
}

impl fmt::Display for TreeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an update run ended.
#[derive(Debug)]
pub enum UpdateOutcome {
    /// New version running.
    Success,
    /// Update failed but the site is back in a known-good state.
    Failed(UpdateError),
    /// Rollback or final restart failed; an operator has to step in.
    FailedUnrecoverable(UpdateError),
}

impl UpdateOutcome {
    /// Process exit code: 0 success, 1 recoverable failure, 2 unrecoverable.
    pub fn exit_code(&self) -> i32 {
        match self {
            UpdateOutcome::Success => 0,
            UpdateOutcome::Failed(_) => 1,
            UpdateOutcome::FailedUnrecoverable(_) => 2,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, UpdateOutcome::Success)
    }

    pub fn is_unrecoverable(&self) -> bool {
        matches!(self, UpdateOutcome::FailedUnrecoverable(_))
    }

    pub fn error(&self) -> Option<&UpdateError> {
        match self {
            UpdateOutcome::Success => None,
            UpdateOutcome::Failed(e) | UpdateOutcome::FailedUnrecoverable(e) => Some(e),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            UpdateOutcome::Success => "success",
            UpdateOutcome::Failed(_) => "failed",
            UpdateOutcome::FailedUnrecoverable(_) => "failed-unrecoverable",
        }
    }
}

/// Everything an operator needs to know after a run.
#[derive(Debug)]
pub struct UpdateReport {
    pub service: ServiceName,
    pub outcome: UpdateOutcome,
    /// States visited, in order, ending with the terminal state.
    pub history: Vec<UpdateState>,
    pub tree: TreeState,
    /// Snapshot kept on disk for manual recovery.
    pub retained_snapshot: Option<PathBuf>,
    /// A cancellation arrived after the site was stopped and was not honored.
    pub cancel_deferred: bool,
    pub diagnostics: Diagnostics,
}

impl UpdateReport {
    pub fn final_state(&self) -> UpdateState {
        self.history.last().copied().unwrap_or(UpdateState::Idle)
    }

    pub fn exit_code(&self) -> i32 {
        self.outcome.exit_code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_distinguish_outcomes() {
        assert_eq!(UpdateOutcome::Success.exit_code(), 0);
        assert_eq!(UpdateOutcome::Failed(UpdateError::Cancelled).exit_code(), 1);
        assert_eq!(
            UpdateOutcome::FailedUnrecoverable(UpdateError::Cancelled).exit_code(),
            2
        );
    }
}
