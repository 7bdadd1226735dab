// ABOUTME: Rollback command implementation.
// ABOUTME: Restores a site from the snapshot kept by an unrecoverable update.

use super::parse_site;
use siteswap::config::Config;
use siteswap::diagnostics::{Diagnostics, Warning};
use siteswap::error::{Error, Result};
use siteswap::fs::LocalFs;
use siteswap::host::HostingController;
use siteswap::output::Output;
use siteswap::snapshot::SnapshotManager;
use siteswap::update::{RunLock, UpdateError};
use std::sync::Arc;

/// Stop the site, restore its retained snapshot, start it, then drop the snapshot.
pub async fn rollback(config: Config, site: &str, mut output: Output) -> Result<()> {
    let name = parse_site(site)?;
    let root = config.site(&name)?.root.clone();
    let dir = config.snapshot_dir(&name)?;

    output.start_timer();
    let mut diag = Diagnostics::default();

    let snapshots = SnapshotManager::new(Arc::new(LocalFs), &dir);
    let snapshot = snapshots
        .locate(&name)
        .ok_or_else(|| Error::NoSnapshot(name.to_string()))?;

    let lock = RunLock::acquire(&dir, &name, false, &mut diag)?;
    let host = config.command_host();

    output.progress(&format!("Rolling back {} from {}", name, snapshot.path.display()));

    output.progress("  → Stopping site...");
    host.stop(&name).await?;

    output.progress("  → Restoring snapshot...");
    snapshots.restore(&snapshot, &root)?;

    output.progress("  → Starting site...");
    host.start(&name).await?;
    if !host.is_running(&name).await? {
        return Err(UpdateError::NotRunning(name.to_string()).into());
    }

    if let Err(e) = snapshots.discard(&snapshot) {
        diag.warn(Warning::snapshot_discard(format!(
            "Failed to discard snapshot {}: {}",
            snapshot.path.display(),
            e
        )));
    }

    if let Err(e) = lock.release() {
        diag.warn(Warning::lock_release(format!("Failed to release run lock: {}", e)));
    }

    for warning in diag.warnings() {
        output.warning(&warning.message);
    }

    output.success(&format!("Rolled back {}", name));
    Ok(())
}
