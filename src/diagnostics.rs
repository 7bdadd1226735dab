// ABOUTME: Diagnostics accumulator for non-fatal warnings during an update run.
// ABOUTME: Collects warnings that shouldn't change the outcome but should be shown to operators.

/// Collects non-fatal warnings during update operations.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning, auto-logging it via tracing.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!("{}", warning.message);
        self.warnings.push(warning);
    }

    /// Get all collected warnings.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Check if any warnings were collected.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Check for a warning of the given kind.
    pub fn has(&self, kind: WarningKind) -> bool {
        self.warnings.iter().any(|w| w.kind == kind)
    }
}

/// A non-fatal warning collected during an update.
#[derive(Debug, Clone)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    /// Create a lock release warning.
    pub fn lock_release(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::LockRelease,
            message: message.into(),
        }
    }

    /// Create a broken-lock warning.
    pub fn lock_broken(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::LockBroken,
            message: message.into(),
        }
    }

    /// Create a snapshot discard warning.
    pub fn snapshot_discard(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::SnapshotDiscard,
            message: message.into(),
        }
    }

    /// Create a deferred cancellation warning.
    pub fn cancel_deferred(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::CancelDeferred,
            message: message.into(),
        }
    }
}

/// Categories of warnings that can occur during an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// Failed to release the run lock (lock file may remain).
    LockRelease,
    /// A stale, corrupt or forced lock was broken.
    LockBroken,
    /// A snapshot that was no longer needed could not be removed.
    SnapshotDiscard,
    /// Cancellation arrived after the site was stopped and was ignored.
    CancelDeferred,
}
