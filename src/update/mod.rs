// ABOUTME: Site update orchestration using the type state pattern.
// ABOUTME: Exports the orchestrator, state markers, errors, outcome and locking types.

mod cancel;
mod error;
mod guard;
mod lock;
mod orchestrator;
mod outcome;
mod run;
mod state;

pub use cancel::CancelToken;
pub use error::{LockHolderInfo, UpdateError, UpdateErrorKind};
pub use guard::{ServicePermit, UpdateGuard};
pub use lock::{LockInfo, RunLock};
pub use orchestrator::{DEFAULT_FETCH_TIMEOUT, Orchestrator, UpdateConfig};
pub use outcome::{TreeState, UpdateOutcome, UpdateReport};
pub use run::{TransitionResult, UpdateRun};
pub use state::{
    Resolved, RollingBack, RunState, Running, Starting, Stopping, UpdateState, Updating,
};
