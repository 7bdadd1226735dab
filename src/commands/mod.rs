// ABOUTME: Command module aggregator for the siteswap CLI.
// ABOUTME: Re-exports the update, status, rollback and discard command handlers.

mod discard;
mod rollback;
mod status;
mod update;

pub use discard::discard;
pub use rollback::rollback;
pub use status::status;
pub use update::update;

use siteswap::config::Config;
use siteswap::error::{Error, Result};
use siteswap::types::ServiceName;
use std::env;
use std::path::Path;

/// Load the config from `path`, or discover it in the working directory.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path),
        None => Config::discover(&env::current_dir()?),
    }
}

fn parse_site(site: &str) -> Result<ServiceName> {
    ServiceName::new(site).map_err(|_| Error::UnknownSite(site.to_string()))
}
