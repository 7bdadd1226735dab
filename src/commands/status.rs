// ABOUTME: Status command implementation.
// ABOUTME: Shows each site's root, running state and retained snapshot.

use super::parse_site;
use siteswap::config::Config;
use siteswap::error::Result;
use siteswap::fs::LocalFs;
use siteswap::host::HostingController;
use siteswap::output::Output;
use siteswap::snapshot::SnapshotManager;
use siteswap::types::ServiceName;
use std::sync::Arc;

pub async fn status(config: Config, site: Option<&str>, output: Output) -> Result<()> {
    let names: Vec<ServiceName> = match site {
        Some(site) => {
            let name = parse_site(site)?;
            config.site(&name)?;
            vec![name]
        }
        None => config.sites.keys().cloned().collect(),
    };

    let host = config.command_host();

    for name in &names {
        let site = config.site(name)?;
        let snapshots = SnapshotManager::new(Arc::new(LocalFs), config.snapshot_dir(name)?);

        let running = match host.is_running(name).await {
            Ok(true) => "running".to_string(),
            Ok(false) => "stopped".to_string(),
            Err(e) => format!("unknown ({})", e),
        };
        let snapshot = snapshots
            .locate(name)
            .map(|s| s.path.display().to_string())
            .unwrap_or_else(|| "none".to_string());

        output.success(&format!(
            "{}: root={} state={} snapshot={}",
            name,
            site.root.display(),
            running,
            snapshot
        ));
    }

    Ok(())
}
