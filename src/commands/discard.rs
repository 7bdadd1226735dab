// ABOUTME: Discard command implementation.
// ABOUTME: Deletes a site's retained snapshot once an operator no longer needs it.

use super::parse_site;
use siteswap::config::Config;
use siteswap::diagnostics::Diagnostics;
use siteswap::error::{Error, Result};
use siteswap::fs::LocalFs;
use siteswap::output::Output;
use siteswap::snapshot::SnapshotManager;
use siteswap::update::RunLock;
use std::sync::Arc;

pub fn discard(config: Config, site: &str, output: Output) -> Result<()> {
    let name = parse_site(site)?;
    let dir = config.snapshot_dir(&name)?;

    let snapshots = SnapshotManager::new(Arc::new(LocalFs), &dir);
    let snapshot = snapshots
        .locate(&name)
        .ok_or_else(|| Error::NoSnapshot(name.to_string()))?;

    let mut diag = Diagnostics::default();
    let lock = RunLock::acquire(&dir, &name, false, &mut diag)?;
    snapshots.discard(&snapshot)?;
    lock.release()?;

    for warning in diag.warnings() {
        output.warning(&warning.message);
    }
    output.success(&format!("Discarded snapshot {}", snapshot.path.display()));
    Ok(())
}
