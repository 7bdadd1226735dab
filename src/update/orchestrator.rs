// ABOUTME: Drives one update run from resolve to a terminal outcome.
// ABOUTME: Owns the collaborators, the per-service guard and the snapshot retention policy.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::artifact::{Applier, ArtifactFetcher, Bundle};
use crate::diagnostics::{Diagnostics, Warning};
use crate::fs::FileSystem;
use crate::host::{HostingController, ServiceRef};
use crate::snapshot::{Snapshot, SnapshotManager};
use crate::types::{ArtifactSource, ServiceName};

use super::cancel::CancelToken;
use super::error::UpdateError;
use super::guard::UpdateGuard;
use super::lock::RunLock;
use super::outcome::{TreeState, UpdateOutcome, UpdateReport};
use super::run::UpdateRun;
use super::state::{Resolved, UpdateState};

/// Default bound on fetching an artifact.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(300);

/// Per-call settings for one update.
#[derive(Debug, Clone)]
pub struct UpdateConfig {
    pub service: ServiceName,
    pub artifact: ArtifactSource,
    /// Directory holding snapshot slots and lock files. Defaults to the
    /// parent of the site root.
    pub snapshot_root: Option<PathBuf>,
    pub timeout: Duration,
    /// Break an existing run lock.
    pub force: bool,
}

impl UpdateConfig {
    pub fn new(service: ServiceName, artifact: ArtifactSource) -> Self {
        Self {
            service,
            artifact,
            snapshot_root: None,
            timeout: DEFAULT_FETCH_TIMEOUT,
            force: false,
        }
    }

    pub fn snapshot_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.snapshot_root = Some(dir.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Where snapshots and locks for `service` live.
    pub fn resolve_snapshot_root(&self, service: &ServiceRef) -> Option<PathBuf> {
        self.snapshot_root
            .clone()
            .or_else(|| service.root.parent().map(Path::to_path_buf))
    }
}

/// Runs updates against a hosting controller, an artifact fetcher and a filesystem.
#[derive(Clone)]
pub struct Orchestrator {
    host: Arc<dyn HostingController>,
    fetcher: Arc<dyn ArtifactFetcher>,
    fs: Arc<dyn FileSystem>,
    guard: UpdateGuard,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("guard", &self.guard)
            .finish_non_exhaustive()
    }
}

/// Accumulates the pieces of an [`UpdateReport`] while a run progresses.
struct Tally {
    service: ServiceName,
    diag: Diagnostics,
    cancel_deferred: bool,
}

impl Tally {
    fn report(
        self,
        outcome: UpdateOutcome,
        mut history: Vec<UpdateState>,
        tree: TreeState,
        retained_snapshot: Option<PathBuf>,
    ) -> UpdateReport {
        // A recoverable failure can still end with the old tree running.
        if history.last() != Some(&UpdateState::Running) {
            history.push(UpdateState::Failed);
        }

        UpdateReport {
            service: self.service,
            outcome,
            history,
            tree,
            retained_snapshot,
            cancel_deferred: self.cancel_deferred,
            diagnostics: self.diag,
        }
    }

    /// Failure with the site untouched.
    fn failed_untouched(self, err: UpdateError, history: Vec<UpdateState>) -> UpdateReport {
        tracing::warn!("{}: update aborted, site untouched: {}", self.service, err);
        self.report(
            UpdateOutcome::Failed(err),
            history,
            TreeState::Untouched,
            None,
        )
    }
}

impl Orchestrator {
    pub fn new(
        host: Arc<dyn HostingController>,
        fetcher: Arc<dyn ArtifactFetcher>,
        fs: Arc<dyn FileSystem>,
    ) -> Self {
        Self {
            host,
            fetcher,
            fs,
            guard: UpdateGuard::new(),
        }
    }

    pub fn guard(&self) -> &UpdateGuard {
        &self.guard
    }

    /// Update one site.
    ///
    /// Concurrent calls for the same service wait for each other. The
    /// returned report always describes a terminal state; nothing here panics
    /// or returns early without one.
    pub async fn run_update(&self, config: &UpdateConfig, cancel: &CancelToken) -> UpdateReport {
        let _permit = self.guard.acquire(&config.service).await;

        let mut tally = Tally {
            service: config.service.clone(),
            diag: Diagnostics::default(),
            cancel_deferred: false,
        };
        let idle = vec![UpdateState::Idle];

        let service = match self.host.resolve(&config.service).await {
            Ok(service) => service,
            Err(e) => return tally.failed_untouched(UpdateError::Resolve(e), idle),
        };

        let snapshot_root = match config.resolve_snapshot_root(&service) {
            Some(dir) if service.root.is_absolute() => dir,
            _ => return tally.failed_untouched(UpdateError::InvalidRoot(service.root), idle),
        };

        let lock = match RunLock::acquire(&snapshot_root, &service.name, config.force, &mut tally.diag)
        {
            Ok(lock) => lock,
            Err(e) => return tally.failed_untouched(e, idle),
        };

        let snapshots = SnapshotManager::new(self.fs.clone(), snapshot_root);
        let mut report = self
            .drive(UpdateRun::new(service), config, &snapshots, cancel, tally)
            .await;

        if let Err(e) = lock.release() {
            report
                .diagnostics
                .warn(Warning::lock_release(format!("Failed to release run lock: {}", e)));
        }

        match &report.outcome {
            UpdateOutcome::Success => tracing::info!("{}: update complete", report.service),
            UpdateOutcome::Failed(e) => {
                tracing::warn!("{}: update failed ({} tree): {}", report.service, report.tree, e)
            }
            UpdateOutcome::FailedUnrecoverable(e) => tracing::error!(
                "{}: update failed and needs manual repair ({} tree, snapshot {:?}): {}",
                report.service,
                report.tree,
                report.retained_snapshot,
                e
            ),
        }

        report
    }

    async fn drive(
        &self,
        run: UpdateRun<Resolved>,
        config: &UpdateConfig,
        snapshots: &SnapshotManager,
        cancel: &CancelToken,
        mut tally: Tally,
    ) -> UpdateReport {
        if cancel.is_cancelled() {
            return tally.failed_untouched(UpdateError::Cancelled, run.into_history());
        }

        // Fetch and decode before anything on disk changes.
        let bundle = match self.fetch_bundle(config).await {
            Ok(bundle) => bundle,
            Err(e) => return tally.failed_untouched(e, run.into_history()),
        };

        if cancel.is_cancelled() {
            return tally.failed_untouched(UpdateError::Cancelled, run.into_history());
        }

        let run = match run.snapshot(snapshots) {
            Ok(run) => run,
            Err((run, e)) => return tally.failed_untouched(e, run.into_history()),
        };

        if cancel.is_cancelled() {
            let (snapshot, history) = run.abandon();
            self.discard(snapshots, &snapshot, &mut tally.diag);
            return tally.failed_untouched(UpdateError::Cancelled, history);
        }

        let run = match run.stop(self.host.as_ref()).await {
            Ok(run) => run,
            Err((run, e)) => {
                let (snapshot, history) = run.abandon();
                self.discard(snapshots, &snapshot, &mut tally.diag);
                return tally.failed_untouched(e, history);
            }
        };

        // The site is down from here on: cancellation waits for a terminal state.
        let run = match run.apply(&Applier::new(self.fs.clone()), &bundle) {
            Ok(run) => run,
            Err(rolling_back) => match rolling_back.restore(snapshots) {
                Ok(run) => run,
                Err((run, restore_err)) => {
                    let (snapshot, apply_err, history) = run.abandon();
                    tracing::error!(
                        "{}: rollback after '{}' failed",
                        config.service,
                        apply_err
                    );
                    self.note_deferred_cancel(cancel, &mut tally);
                    return tally.report(
                        UpdateOutcome::FailedUnrecoverable(restore_err),
                        history,
                        TreeState::Inconsistent,
                        Some(snapshot.path),
                    );
                }
            },
        };

        let started = run.start(self.host.as_ref()).await;
        self.note_deferred_cancel(cancel, &mut tally);

        match started {
            Ok(run) => {
                let (snapshot, tree, cause, history) = run.finish();
                match cause {
                    None => {
                        self.discard(snapshots, &snapshot, &mut tally.diag);
                        tally.report(UpdateOutcome::Success, history, tree, None)
                    }
                    // Kept after a rollback for inspection of what went wrong.
                    Some(cause) => tally.report(
                        UpdateOutcome::Failed(cause),
                        history,
                        tree,
                        Some(snapshot.path),
                    ),
                }
            }
            Err((run, e)) => {
                let (snapshot, tree, cause, history) = run.abandon();
                if let Some(cause) = cause {
                    tracing::error!("{}: restart after rollback of '{}' failed", config.service, cause);
                }
                tally.report(
                    UpdateOutcome::FailedUnrecoverable(e),
                    history,
                    tree,
                    Some(snapshot.path),
                )
            }
        }
    }

    async fn fetch_bundle(&self, config: &UpdateConfig) -> Result<Bundle, UpdateError> {
        let bytes = self.fetcher.fetch(&config.artifact, config.timeout).await?;
        let bundle = Bundle::from_bytes(&bytes)?;
        tracing::info!(
            "{}: fetched {} ({} entries, {} bytes)",
            config.service,
            config.artifact,
            bundle.len(),
            bytes.len()
        );
        Ok(bundle)
    }

    fn discard(&self, snapshots: &SnapshotManager, snapshot: &Snapshot, diag: &mut Diagnostics) {
        if let Err(e) = snapshots.discard(snapshot) {
            diag.warn(Warning::snapshot_discard(format!(
                "Snapshot no longer needed but not removed: {}",
                e
            )));
        }
    }

    fn note_deferred_cancel(&self, cancel: &CancelToken, tally: &mut Tally) {
        if cancel.is_cancelled() {
            tally.cancel_deferred = true;
            tally.diag.warn(Warning::cancel_deferred(
                "Cancellation requested after the site was stopped; finished the run first",
            ));
        }
    }
}
