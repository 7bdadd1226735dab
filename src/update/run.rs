// ABOUTME: UpdateRun struct parameterized by state marker, and its transitions.
// ABOUTME: Each transition consumes self and returns the next state, or the old one with the error.

use crate::artifact::{Applier, Bundle};
use crate::host::{HostingController, ServiceRef};
use crate::snapshot::{Snapshot, SnapshotManager};

use super::error::UpdateError;
use super::outcome::TreeState;
use super::state::{
    Resolved, RollingBack, RunState, Running, Starting, Stopping, UpdateState, Updating,
};

/// Result type for transitions that may need cleanup on failure.
pub type TransitionResult<T, S> = Result<UpdateRun<T>, (UpdateRun<S>, UpdateError)>;

/// One update of one site, parameterized by its current state.
///
/// The state type carries the data that only exists from that stage on (the
/// snapshot handle, the rollback cause), so a snapshot can only be restored
/// once one was taken and a site can only be started after it was stopped.
#[derive(Debug)]
pub struct UpdateRun<S> {
    pub(crate) service: ServiceRef,
    pub(crate) history: Vec<UpdateState>,
    pub(crate) state: S,
}

impl UpdateRun<Resolved> {
    /// Start a run for a site the hosting controller has resolved.
    pub fn new(service: ServiceRef) -> Self {
        UpdateRun {
            service,
            history: vec![UpdateState::Idle, UpdateState::Resolved],
            state: Resolved,
        }
    }

    /// Back up the live tree while the site is still serving.
    #[must_use = "update state must be used"]
    pub fn snapshot(self, snapshots: &SnapshotManager) -> TransitionResult<Stopping, Resolved> {
        match snapshots.create(&self.service) {
            Ok(snapshot) => Ok(self.transition(Stopping { snapshot })),
            Err(e) => Err((self, e.into())),
        }
    }
}

/// Move a run from state `from` into `state`, recording the step.
fn advance<T: RunState>(
    service: ServiceRef,
    mut history: Vec<UpdateState>,
    from: UpdateState,
    state: T,
) -> UpdateRun<T> {
    tracing::info!("{}: {} -> {}", service.name, from, T::STATE);
    history.push(T::STATE);
    UpdateRun {
        service,
        history,
        state,
    }
}

impl<S: RunState> UpdateRun<S> {
    fn transition<T: RunState>(self, state: T) -> UpdateRun<T> {
        advance(self.service, self.history, S::STATE, state)
    }

    pub fn service(&self) -> &ServiceRef {
        &self.service
    }

    pub fn state(&self) -> UpdateState {
        S::STATE
    }

    /// States visited so far, including the current one.
    pub fn history(&self) -> &[UpdateState] {
        &self.history
    }

    pub(crate) fn into_history(self) -> Vec<UpdateState> {
        self.history
    }
}

impl UpdateRun<Stopping> {
    pub fn snapshot_handle(&self) -> &Snapshot {
        &self.state.snapshot
    }

    /// Take the site offline.
    #[must_use = "update state must be used"]
    pub async fn stop<H>(self, host: &H) -> TransitionResult<Updating, Stopping>
    where
        H: HostingController + ?Sized,
    {
        match host.stop(&self.service.name).await {
            Ok(()) => {
                let UpdateRun {
                    service,
                    history,
                    state: Stopping { snapshot },
                } = self;
                Ok(advance(
                    service,
                    history,
                    UpdateState::Stopping,
                    Updating { snapshot },
                ))
            }
            Err(e) => Err((self, UpdateError::Host(e))),
        }
    }

    /// Give up before anything was stopped, returning the snapshot to discard.
    pub(crate) fn abandon(self) -> (Snapshot, Vec<UpdateState>) {
        (self.state.snapshot, self.history)
    }
}

impl UpdateRun<Updating> {
    /// Overlay the bundle onto the stopped site.
    ///
    /// On failure the run moves to `RollingBack`; there is no way to skip the
    /// rollback from here.
    pub fn apply(
        self,
        applier: &Applier,
        bundle: &Bundle,
    ) -> Result<UpdateRun<Starting>, UpdateRun<RollingBack>> {
        let result = applier.apply(bundle, &self.service.root);
        let UpdateRun {
            service,
            history,
            state: Updating { snapshot },
        } = self;

        match result {
            Ok(summary) => {
                tracing::info!(
                    "{}: wrote {} file(s) to {}",
                    service.name,
                    summary.files_written,
                    service.root.display()
                );
                Ok(advance(
                    service,
                    history,
                    UpdateState::Updating,
                    Starting {
                        snapshot,
                        tree: TreeState::New,
                        cause: None,
                    },
                ))
            }
            Err(e) => {
                tracing::warn!("{}: apply failed: {}", service.name, e);
                Err(advance(
                    service,
                    history,
                    UpdateState::Updating,
                    RollingBack {
                        snapshot,
                        cause: e.into(),
                    },
                ))
            }
        }
    }
}

impl UpdateRun<RollingBack> {
    pub fn cause(&self) -> &UpdateError {
        &self.state.cause
    }

    /// Put the snapshot back. Attempted exactly once per run.
    #[must_use = "update state must be used"]
    pub fn restore(self, snapshots: &SnapshotManager) -> TransitionResult<Starting, RollingBack> {
        match snapshots.restore(&self.state.snapshot, &self.service.root) {
            Ok(()) => {
                let UpdateRun {
                    service,
                    history,
                    state: RollingBack { snapshot, cause },
                } = self;
                Ok(advance(
                    service,
                    history,
                    UpdateState::RollingBack,
                    Starting {
                        snapshot,
                        tree: TreeState::Restored,
                        cause: Some(cause),
                    },
                ))
            }
            Err(e) => Err((self, e.into())),
        }
    }

    /// The restore failed: hand back the snapshot to retain, the apply error
    /// and the history.
    pub(crate) fn abandon(self) -> (Snapshot, UpdateError, Vec<UpdateState>) {
        (self.state.snapshot, self.state.cause, self.history)
    }
}

impl UpdateRun<Starting> {
    pub fn tree(&self) -> TreeState {
        self.state.tree
    }

    /// Bring the site back and confirm it is serving.
    #[must_use = "update state must be used"]
    pub async fn start<H>(self, host: &H) -> TransitionResult<Running, Starting>
    where
        H: HostingController + ?Sized,
    {
        let name = &self.service.name;
        let confirmed = match host.start(name).await {
            Ok(()) => host.is_running(name).await.map_err(UpdateError::Host),
            Err(e) => Err(UpdateError::Host(e)),
        };

        match confirmed {
            Ok(true) => {
                let UpdateRun {
                    service,
                    history,
                    state:
                        Starting {
                            snapshot,
                            tree,
                            cause,
                        },
                } = self;
                Ok(advance(
                    service,
                    history,
                    UpdateState::Starting,
                    Running {
                        snapshot,
                        tree,
                        cause,
                    },
                ))
            }
            Ok(false) => {
                let err = UpdateError::NotRunning(self.service.name.to_string());
                Err((self, err))
            }
            Err(e) => Err((self, e)),
        }
    }

    pub(crate) fn abandon(self) -> (Snapshot, TreeState, Option<UpdateError>, Vec<UpdateState>) {
        (
            self.state.snapshot,
            self.state.tree,
            self.state.cause,
            self.history,
        )
    }
}

impl UpdateRun<Running> {
    pub fn tree(&self) -> TreeState {
        self.state.tree
    }

    /// Finish the run, returning the snapshot (now safe to discard), the
    /// rollback cause if the old tree was restored, and the history.
    pub fn finish(self) -> (Snapshot, TreeState, Option<UpdateError>, Vec<UpdateState>) {
        (
            self.state.snapshot,
            self.state.tree,
            self.state.cause,
            self.history,
        )
    }
}
