// ABOUTME: Update command implementation.
// ABOUTME: Wires the configured host, fetcher and filesystem into the orchestrator.

use super::parse_site;
use siteswap::artifact::HttpFetcher;
use siteswap::config::Config;
use siteswap::error::{Error, Result};
use siteswap::fs::LocalFs;
use siteswap::output::Output;
use siteswap::types::ArtifactSource;
use siteswap::update::{CancelToken, Orchestrator};
use std::sync::Arc;

/// Update one site and return the process exit code.
pub async fn update(
    config: Config,
    site: &str,
    artifact: Option<&str>,
    force: bool,
    mut output: Output,
) -> Result<i32> {
    let name = parse_site(site)?;
    let artifact = artifact
        .map(ArtifactSource::parse)
        .transpose()
        .map_err(|e| Error::InvalidConfig(e.to_string()))?;
    let update_config = config.update_config(&name, artifact, force)?;

    output.start_timer();
    output.progress(&format!(
        "Updating {} from {}",
        name, update_config.artifact
    ));

    let orchestrator = Orchestrator::new(
        Arc::new(config.command_host()),
        Arc::new(HttpFetcher::new()),
        Arc::new(LocalFs),
    );

    let cancel = CancelToken::new();
    let on_signal = cancel.clone();
    let signal = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling update");
            on_signal.cancel();
        }
    });

    let report = orchestrator.run_update(&update_config, &cancel).await;
    signal.abort();

    output.report(&report);
    Ok(report.exit_code())
}
