// ABOUTME: Error types for update runs.
// ABOUTME: One variant per failing stage, with a kind for programmatic handling.

use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::artifact::{ApplyError, BundleError, FetchError};
use crate::host::HostError;
use crate::snapshot::{RestoreError, SnapshotError};

/// Information about who holds a run lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockHolderInfo {
    pub holder: String,
    pub pid: u32,
    pub started_at: DateTime<Utc>,
}

/// Errors that can end or derail an update run.
#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    /// The hosting controller does not know the site.
    #[error("failed to resolve site: {0}")]
    Resolve(HostError),

    /// The resolved root cannot be snapshotted or swapped.
    #[error("site root must be an absolute path with a parent directory: {}", .0.display())]
    InvalidRoot(PathBuf),

    /// Stop or start failed.
    #[error("host error: {0}")]
    Host(HostError),

    /// Start reported success but the site is not serving.
    #[error("site {0} did not come up after start")]
    NotRunning(String),

    #[error("snapshot failed: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("artifact could not be read: {0}")]
    Bundle(#[from] BundleError),

    #[error("artifact entry {} escapes the site root", entry.display())]
    PathTraversal { entry: PathBuf },

    #[error("apply failed: {0}")]
    Apply(ApplyError),

    #[error("restore failed: {0}")]
    Restore(#[from] RestoreError),

    /// Another process holds the run lock.
    #[error("update already running (held by {} pid {} since {})", .0.holder, .0.pid, .0.started_at)]
    LockHeld(LockHolderInfo),

    #[error("lock error: {0}")]
    Lock(String),

    /// Cancelled before the site was stopped.
    #[error("update cancelled before the site was stopped")]
    Cancelled,
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateErrorKind {
    Resolve,
    Host,
    NotRunning,
    Snapshot,
    Fetch,
    PathTraversal,
    Apply,
    Restore,
    LockHeld,
    Lock,
    Cancelled,
}

impl UpdateError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> UpdateErrorKind {
        match self {
            UpdateError::Resolve(_) | UpdateError::InvalidRoot(_) => UpdateErrorKind::Resolve,
            UpdateError::Host(_) => UpdateErrorKind::Host,
            UpdateError::NotRunning(_) => UpdateErrorKind::NotRunning,
            UpdateError::Snapshot(_) => UpdateErrorKind::Snapshot,
            UpdateError::Fetch(_) | UpdateError::Bundle(_) => UpdateErrorKind::Fetch,
            UpdateError::PathTraversal { .. } => UpdateErrorKind::PathTraversal,
            UpdateError::Apply(_) => UpdateErrorKind::Apply,
            UpdateError::Restore(_) => UpdateErrorKind::Restore,
            UpdateError::LockHeld(_) => UpdateErrorKind::LockHeld,
            UpdateError::Lock(_) => UpdateErrorKind::Lock,
            UpdateError::Cancelled => UpdateErrorKind::Cancelled,
        }
    }

    /// Returns lock holder info if this is a LockHeld error.
    pub fn lock_holder_info(&self) -> Option<&LockHolderInfo> {
        match self {
            UpdateError::LockHeld(info) => Some(info),
            _ => None,
        }
    }

    pub(crate) fn lock_held(holder: String, pid: u32, started_at: DateTime<Utc>) -> Self {
        UpdateError::LockHeld(LockHolderInfo {
            holder,
            pid,
            started_at,
        })
    }

    pub(crate) fn lock_error(msg: impl Into<String>) -> Self {
        UpdateError::Lock(msg.into())
    }
}

impl From<ApplyError> for UpdateError {
    fn from(err: ApplyError) -> Self {
        match err {
            ApplyError::PathTraversal { entry } => UpdateError::PathTraversal { entry },
            other => UpdateError::Apply(other),
        }
    }
}
