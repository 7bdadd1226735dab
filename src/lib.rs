// ABOUTME: Library root for siteswap - exposes public types for testing.
// ABOUTME: The main binary is in main.rs.

pub mod artifact;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod fs;
pub mod host;
pub mod output;
pub mod snapshot;
pub mod types;
pub mod update;
