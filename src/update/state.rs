// ABOUTME: Update state markers for the type state pattern, plus the runtime state enum.
// ABOUTME: Markers carry the snapshot and cause data each stage needs.

use std::fmt;

use crate::snapshot::Snapshot;

use super::error::UpdateError;
use super::outcome::TreeState;

/// Observable state of an update run, recorded in the report history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateState {
    Idle,
    Resolved,
    Stopping,
    Updating,
    RollingBack,
    Starting,
    Running,
    Failed,
}

impl UpdateState {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateState::Idle => "idle",
            UpdateState::Resolved => "resolved",
            UpdateState::Stopping => "stopping",
            UpdateState::Updating => "updating",
            UpdateState::RollingBack => "rolling-back",
            UpdateState::Starting => "starting",
            UpdateState::Running => "running",
            UpdateState::Failed => "failed",
        }
    }
}

impl fmt::Display for UpdateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Links a state marker to its [`UpdateState`].
pub trait RunState {
    const STATE: UpdateState;
}

/// Site resolved, nothing touched yet.
/// Available actions: `snapshot()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Resolved;

/// Snapshot taken, site still serving.
/// Available actions: `stop()`
#[derive(Debug)]
pub struct Stopping {
    pub(crate) snapshot: Snapshot,
}

/// Site stopped, ready for the artifact.
/// Available actions: `apply()`
#[derive(Debug)]
pub struct Updating {
    pub(crate) snapshot: Snapshot,
}

/// Apply failed; the snapshot must be put back.
/// Available actions: `restore()`
#[derive(Debug)]
pub struct RollingBack {
    pub(crate) snapshot: Snapshot,
    pub(crate) cause: UpdateError,
}

/// Tree is in its final shape (new or restored), site still stopped.
/// Available actions: `start()`
#[derive(Debug)]
pub struct Starting {
    pub(crate) snapshot: Snapshot,
    pub(crate) tree: TreeState,
    pub(crate) cause: Option<UpdateError>,
}

/// Site confirmed running again.
/// Available actions: `finish()`
#[derive(Debug)]
pub struct Running {
    pub(crate) snapshot: Snapshot,
    pub(crate) tree: TreeState,
    pub(crate) cause: Option<UpdateError>,
}

impl RunState for Resolved {
    const STATE: UpdateState = UpdateState::Resolved;
}

impl RunState for Stopping {
    const STATE: UpdateState = UpdateState::Stopping;
}

impl RunState for Updating {
    const STATE: UpdateState = UpdateState::Updating;
}

impl RunState for RollingBack {
    const STATE: UpdateState = UpdateState::RollingBack;
}

impl RunState for Starting {
    const STATE: UpdateState = UpdateState::Starting;
}

impl RunState for Running {
    const STATE: UpdateState = UpdateState::Running;
}
