// ABOUTME: Artifact fetching, bundle decoding and overlay application.
// ABOUTME: Turns a locator into bytes, bytes into entries, entries into files.

mod apply;
mod bundle;
mod fetch;

pub use apply::{Applier, ApplyError, ApplySummary, resolve_entry_path};
pub use bundle::{Bundle, BundleEntry, BundleError};
pub use fetch::{ArtifactFetcher, FetchError, HttpFetcher};
