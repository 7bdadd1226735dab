// ABOUTME: Test support utilities.
// ABOUTME: Fake host, in-memory fetcher, fault-injecting filesystem and site fixtures.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::Once;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use snafu::IntoError;

use siteswap::artifact::{ArtifactFetcher, FetchError};
use siteswap::fs::{CopySnafu, FileSystem, FsError, LocalFs, WriteSnafu};
use siteswap::host::{HostError, HostingController, ServiceRef};
use siteswap::types::{ArtifactSource, ServiceName};
use siteswap::update::{CancelToken, Orchestrator, UpdateConfig};

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env().add_directive("siteswap=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Build an in-memory tar archive from `(path, contents)` pairs.
#[allow(dead_code)]
pub fn tarball(files: &[(&str, &str)]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (path, contents) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, path, contents.as_bytes())
            .unwrap();
    }
    builder.into_inner().unwrap()
}

/// Gzip-compress `data`.
#[allow(dead_code)]
pub fn gzip(data: &[u8]) -> Vec<u8> {
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Write `files` under `root`, creating parent directories.
#[allow(dead_code)]
pub fn write_tree(root: &Path, files: &[(&str, &str)]) {
    std::fs::create_dir_all(root).unwrap();
    for (path, contents) in files {
        let path = root.join(path);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }
}

/// Read every regular file under `root` into a sorted map of relative path to contents.
#[allow(dead_code)]
pub fn read_tree(root: &Path) -> BTreeMap<String, Vec<u8>> {
    walkdir::WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .map(|entry| entry.unwrap())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| {
            let relative = entry.path().strip_prefix(root).unwrap();
            (
                relative.to_string_lossy().into_owned(),
                std::fs::read(entry.path()).unwrap(),
            )
        })
        .collect()
}

/// Hosting controller that records calls and fails on request.
#[derive(Default)]
pub struct FakeHost {
    sites: Mutex<BTreeMap<ServiceName, PathBuf>>,
    calls: Mutex<Vec<String>>,
    fail_stop: AtomicBool,
    fail_start: AtomicBool,
    stays_down: AtomicBool,
    stop_delay: Mutex<Option<Duration>>,
    cancel_on_stop: Mutex<Option<CancelToken>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

#[allow(dead_code)]
impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_site(self, name: &ServiceName, root: &Path) -> Self {
        self.sites.lock().insert(name.clone(), root.to_path_buf());
        self
    }

    pub fn failing_stop(self) -> Self {
        self.fail_stop.store(true, Ordering::SeqCst);
        self
    }

    pub fn failing_start(self) -> Self {
        self.fail_start.store(true, Ordering::SeqCst);
        self
    }

    /// `start` succeeds but the site never reports running.
    pub fn staying_down(self) -> Self {
        self.stays_down.store(true, Ordering::SeqCst);
        self
    }

    pub fn with_stop_delay(self, delay: Duration) -> Self {
        *self.stop_delay.lock() = Some(delay);
        self
    }

    /// Cancel `token` while the site is being stopped.
    pub fn cancelling_on_stop(self, token: CancelToken) -> Self {
        *self.cancel_on_stop.lock() = Some(token);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Highest number of stops observed in flight at once.
    pub fn max_concurrent_stops(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    fn record(&self, call: &str, name: &ServiceName) {
        self.calls.lock().push(format!("{call} {name}"));
    }
}

#[async_trait]
impl HostingController for FakeHost {
    async fn resolve(&self, name: &ServiceName) -> Result<ServiceRef, HostError> {
        self.record("resolve", name);
        let root = self
            .sites
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| HostError::NotFound(name.to_string()))?;
        Ok(ServiceRef {
            name: name.clone(),
            root,
        })
    }

    async fn stop(&self, name: &ServiceName) -> Result<(), HostError> {
        self.record("stop", name);

        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        let delay = *self.stop_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        if let Some(token) = self.cancel_on_stop.lock().as_ref() {
            token.cancel();
        }

        if self.fail_stop.load(Ordering::SeqCst) {
            return Err(HostError::StopFailed {
                site: name.to_string(),
                reason: "stop refused".to_string(),
            });
        }
        Ok(())
    }

    async fn start(&self, name: &ServiceName) -> Result<(), HostError> {
        self.record("start", name);
        if self.fail_start.load(Ordering::SeqCst) {
            return Err(HostError::StartFailed {
                site: name.to_string(),
                reason: "start refused".to_string(),
            });
        }
        Ok(())
    }

    async fn is_running(&self, name: &ServiceName) -> Result<bool, HostError> {
        self.record("is_running", name);
        Ok(!self.stays_down.load(Ordering::SeqCst))
    }
}

/// Fetcher that serves fixed bytes, or fails.
pub struct StaticFetcher {
    bytes: Option<Vec<u8>>,
    fetches: AtomicUsize,
}

#[allow(dead_code)]
impl StaticFetcher {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes: Some(bytes),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Every fetch fails with HTTP 404.
    pub fn missing() -> Self {
        Self {
            bytes: None,
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ArtifactFetcher for StaticFetcher {
    async fn fetch(&self, source: &ArtifactSource, _timeout: Duration) -> Result<Bytes, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        match &self.bytes {
            Some(bytes) => Ok(Bytes::from(bytes.clone())),
            None => Err(FetchError::Status {
                url: source.to_string(),
                status: 404,
            }),
        }
    }
}

/// LocalFs with injectable failures.
#[derive(Default)]
pub struct FaultyFs {
    fail_write_named: Option<String>,
    fail_copy_from_suffix: Option<String>,
}

#[allow(dead_code)]
impl FaultyFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writing a file with this name fails with a full disk.
    pub fn failing_write(mut self, file_name: &str) -> Self {
        self.fail_write_named = Some(file_name.to_string());
        self
    }

    /// Copying a tree whose source path ends with `suffix` fails.
    pub fn failing_copy_from(mut self, suffix: &str) -> Self {
        self.fail_copy_from_suffix = Some(suffix.to_string());
        self
    }
}

impl FileSystem for FaultyFs {
    fn copy_tree(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        if let Some(suffix) = &self.fail_copy_from_suffix
            && from.to_string_lossy().ends_with(suffix.as_str())
        {
            return Err(CopySnafu {
                from: from.to_path_buf(),
                to: to.to_path_buf(),
            }
            .into_error(io::Error::from(io::ErrorKind::PermissionDenied)));
        }
        LocalFs.copy_tree(from, to)
    }

    fn remove_tree(&self, path: &Path) -> Result<(), FsError> {
        LocalFs.remove_tree(path)
    }

    fn write_file(&self, path: &Path, contents: &[u8]) -> Result<(), FsError> {
        if let Some(name) = &self.fail_write_named
            && path.file_name().is_some_and(|n| n == name.as_str())
        {
            return Err(WriteSnafu {
                path: path.to_path_buf(),
            }
            .into_error(io::Error::from(io::ErrorKind::StorageFull)));
        }
        LocalFs.write_file(path, contents)
    }

    fn make_dirs(&self, path: &Path) -> Result<(), FsError> {
        LocalFs.make_dirs(path)
    }

    fn exists(&self, path: &Path) -> bool {
        LocalFs.exists(path)
    }

    fn is_symlink(&self, path: &Path) -> bool {
        LocalFs.is_symlink(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        LocalFs.rename(from, to)
    }
}

/// A site root inside a temp dir, with the matching update settings.
pub struct Site {
    pub dir: tempfile::TempDir,
    pub name: ServiceName,
    pub root: PathBuf,
}

#[allow(dead_code)]
impl Site {
    pub fn new(name: &str, files: &[(&str, &str)]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("www");
        write_tree(&root, files);
        Self {
            dir,
            name: ServiceName::new(name).unwrap(),
            root,
        }
    }

    pub fn snapshot_root(&self) -> PathBuf {
        self.dir.path().join("snapshots")
    }

    pub fn slot(&self) -> PathBuf {
        self.snapshot_root().join(self.name.snapshot_slot())
    }

    pub fn update_config(&self) -> UpdateConfig {
        UpdateConfig::new(
            self.name.clone(),
            ArtifactSource::parse("https://releases.example.com/site.tar").unwrap(),
        )
        .snapshot_root(self.snapshot_root())
        .timeout(Duration::from_secs(5))
    }

    pub fn host(&self) -> FakeHost {
        FakeHost::new().with_site(&self.name, &self.root)
    }
}

#[allow(dead_code)]
pub fn orchestrator(
    host: Arc<FakeHost>,
    fetcher: Arc<StaticFetcher>,
    fs: Arc<dyn FileSystem>,
) -> Orchestrator {
    Orchestrator::new(host, fetcher, fs)
}
