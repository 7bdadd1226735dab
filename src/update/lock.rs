// ABOUTME: Run lock to prevent concurrent updates of the same site across processes.
// ABOUTME: Uses atomic file creation with lock info stored next to the snapshot slot.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::diagnostics::{Diagnostics, Warning};
use crate::types::ServiceName;

use super::UpdateError;

/// Information about who holds a run lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    /// Hostname of the machine that holds the lock.
    pub holder: String,
    /// Process ID of the lock holder.
    pub pid: u32,
    /// When the lock was acquired.
    pub started_at: DateTime<Utc>,
    /// Site being updated.
    pub service: String,
}

impl LockInfo {
    /// Create new lock info for the current process.
    pub fn new(service: &ServiceName) -> Self {
        Self {
            holder: gethostname::gethostname().to_string_lossy().into_owned(),
            pid: std::process::id(),
            started_at: Utc::now(),
            service: service.to_string(),
        }
    }

    /// Check if this lock is stale (older than 1 hour).
    pub fn is_stale(&self) -> bool {
        Utc::now() - self.started_at >= stale_after()
    }

    /// Path to the lock file for a site.
    pub fn lock_path(dir: &Path, service: &ServiceName) -> PathBuf {
        dir.join(service.lock_file())
    }
}

static STAGING_SEQ: AtomicU64 = AtomicU64::new(0);

fn stale_after() -> chrono::Duration {
    chrono::Duration::hours(1)
}

/// A held run lock. Released explicitly or on drop.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
    released: bool,
}

impl RunLock {
    /// Acquire the run lock for `service` in `dir`.
    ///
    /// The lock info is written to a private file and hard-linked into place,
    /// so the lock file never exists without its contents. Returns `LockHeld`
    /// if another live process holds it. Locks older than one hour are broken
    /// with a warning, as is any lock when `force` is set. An unparsable lock
    /// counts as held until its mtime is older than one hour.
    pub fn acquire(
        dir: &Path,
        service: &ServiceName,
        force: bool,
        diag: &mut Diagnostics,
    ) -> Result<Self, UpdateError> {
        let path = LockInfo::lock_path(dir, service);

        fs::create_dir_all(dir).map_err(|e| {
            UpdateError::lock_error(format!(
                "failed to create lock directory {}: {}",
                dir.display(),
                e
            ))
        })?;

        let lock_json = serde_json::to_string(&LockInfo::new(service))
            .map_err(|e| UpdateError::lock_error(format!("failed to serialize lock: {}", e)))?;

        if Self::try_create(&path, &lock_json)? {
            return Ok(Self {
                path,
                released: false,
            });
        }

        match Self::read_existing(&path) {
            Some(existing) if !force && !existing.is_stale() => {
                return Err(UpdateError::lock_held(
                    existing.holder,
                    existing.pid,
                    existing.started_at,
                ));
            }
            Some(existing) => {
                let reason = if force { "Breaking" } else { "Auto-breaking stale" };
                diag.warn(Warning::lock_broken(format!(
                    "{} lock held by {} (pid {}) since {}",
                    reason, existing.holder, existing.pid, existing.started_at
                )));
            }
            None => match Self::modified_at(&path) {
                Some(modified) if !force && Utc::now() - modified < stale_after() => {
                    return Err(UpdateError::lock_held("unknown".to_string(), 0, modified));
                }
                _ => {
                    diag.warn(Warning::lock_broken(format!(
                        "Lock info at {} unreadable, breaking lock",
                        path.display()
                    )));
                }
            },
        }

        tracing::debug!("Removing stale/forced lock at {}", path.display());
        let _ = fs::remove_file(&path);

        if !Self::try_create(&path, &lock_json)? {
            return Err(UpdateError::lock_error(
                "lock acquired by another process during break",
            ));
        }

        Ok(Self {
            path,
            released: false,
        })
    }

    /// Create the lock file if it does not exist. `Ok(false)` means it did.
    ///
    /// `hard_link` fails if the target exists, which makes publishing the
    /// fully written file atomic.
    fn try_create(path: &Path, contents: &str) -> Result<bool, UpdateError> {
        let attempt = STAGING_SEQ.fetch_add(1, Ordering::Relaxed);
        let staged = path.with_extension(format!("lock.{}-{}.tmp", std::process::id(), attempt));

        let written = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&staged)
            .and_then(|mut file| {
                file.write_all(contents.as_bytes())?;
                file.sync_all()
            });
        if let Err(e) = written {
            let _ = fs::remove_file(&staged);
            return Err(UpdateError::lock_error(format!(
                "failed to write lock {}: {}",
                staged.display(),
                e
            )));
        }

        let linked = fs::hard_link(&staged, path);
        let _ = fs::remove_file(&staged);

        match linked {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(UpdateError::lock_error(format!(
                "failed to create lock {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn read_existing(path: &Path) -> Option<LockInfo> {
        let contents = fs::read_to_string(path).ok()?;
        serde_json::from_str(&contents).ok()
    }

    fn modified_at(path: &Path) -> Option<DateTime<Utc>> {
        let modified = fs::metadata(path).and_then(|m| m.modified()).ok()?;
        Some(DateTime::<Utc>::from(modified))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the lock.
    pub fn release(mut self) -> Result<(), UpdateError> {
        self.released = true;
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(UpdateError::lock_error(format!(
                "failed to remove lock {}: {}",
                self.path.display(),
                e
            ))),
            _ => Ok(()),
        }
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if !self.released {
            let _ = fs::remove_file(&self.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::WarningKind;
    use crate::update::UpdateErrorKind;

    #[test]
    fn lock_info_creates_with_current_host_and_pid() {
        let service = ServiceName::new("test-service").unwrap();
        let info = LockInfo::new(&service);

        assert_eq!(info.service, "test-service");
        assert_eq!(info.pid, std::process::id());
        assert!(!info.holder.is_empty());
    }

    #[test]
    fn lock_path_uses_service_name() {
        let service = ServiceName::new("myapp").unwrap();
        assert_eq!(
            LockInfo::lock_path(Path::new("/var/backups"), &service),
            PathBuf::from("/var/backups/myapp.lock")
        );
    }

    #[test]
    fn old_lock_is_stale() {
        let service = ServiceName::new("test").unwrap();
        let mut info = LockInfo::new(&service);
        assert!(!info.is_stale());
        info.started_at = Utc::now() - chrono::Duration::hours(2);
        assert!(info.is_stale());
    }

    #[test]
    fn second_acquire_is_rejected_until_release() {
        let dir = tempfile::tempdir().unwrap();
        let service = ServiceName::new("app").unwrap();
        let mut diag = Diagnostics::default();

        let lock = RunLock::acquire(dir.path(), &service, false, &mut diag).unwrap();
        let err = RunLock::acquire(dir.path(), &service, false, &mut diag).unwrap_err();
        assert_eq!(err.kind(), UpdateErrorKind::LockHeld);
        assert_eq!(err.lock_holder_info().unwrap().pid, std::process::id());

        lock.release().unwrap();
        let again = RunLock::acquire(dir.path(), &service, false, &mut diag).unwrap();
        assert!(again.path().exists());
        drop(again);
        assert!(!LockInfo::lock_path(dir.path(), &service).exists());
    }

    #[test]
    fn stale_and_corrupt_locks_are_broken() {
        let dir = tempfile::tempdir().unwrap();
        let service = ServiceName::new("app").unwrap();
        let path = LockInfo::lock_path(dir.path(), &service);

        let mut stale = LockInfo::new(&service);
        stale.holder = "old-machine".to_string();
        stale.started_at = Utc::now() - chrono::Duration::hours(2);
        fs::write(&path, serde_json::to_string(&stale).unwrap()).unwrap();

        let mut diag = Diagnostics::default();
        let lock = RunLock::acquire(dir.path(), &service, false, &mut diag).unwrap();
        assert!(diag.has(WarningKind::LockBroken));
        lock.release().unwrap();

        fs::write(&path, "not json").unwrap();
        let two_hours_ago = std::time::SystemTime::now() - std::time::Duration::from_secs(7200);
        fs::File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(two_hours_ago)
            .unwrap();
        let mut diag = Diagnostics::default();
        let lock = RunLock::acquire(dir.path(), &service, false, &mut diag).unwrap();
        assert!(diag.has(WarningKind::LockBroken));
        lock.release().unwrap();
    }

    #[test]
    fn fresh_unreadable_lock_counts_as_held() {
        let dir = tempfile::tempdir().unwrap();
        let service = ServiceName::new("app").unwrap();
        let path = LockInfo::lock_path(dir.path(), &service);
        fs::write(&path, "").unwrap();

        let mut diag = Diagnostics::default();
        let err = RunLock::acquire(dir.path(), &service, false, &mut diag).unwrap_err();
        assert_eq!(err.kind(), UpdateErrorKind::LockHeld);
        assert!(path.exists(), "held lock must not be removed");
        assert!(!diag.has(WarningKind::LockBroken));

        let forced = RunLock::acquire(dir.path(), &service, true, &mut diag).unwrap();
        assert!(diag.has(WarningKind::LockBroken));
        forced.release().unwrap();
    }

    #[test]
    fn published_lock_is_never_empty() {
        let dir = tempfile::tempdir().unwrap();
        let service = ServiceName::new("app").unwrap();
        let mut diag = Diagnostics::default();

        let lock = RunLock::acquire(dir.path(), &service, false, &mut diag).unwrap();
        let contents = fs::read_to_string(lock.path()).unwrap();
        let info: LockInfo = serde_json::from_str(&contents).unwrap();
        assert_eq!(info.service, "app");

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .filter(|name| name.to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "staging file left behind: {:?}", leftovers);
        lock.release().unwrap();
    }

    #[test]
    fn force_breaks_live_lock() {
        let dir = tempfile::tempdir().unwrap();
        let service = ServiceName::new("app").unwrap();
        let mut diag = Diagnostics::default();

        let _held = RunLock::acquire(dir.path(), &service, false, &mut diag).unwrap();
        let forced = RunLock::acquire(dir.path(), &service, true, &mut diag).unwrap();
        assert!(diag.has(WarningKind::LockBroken));
        forced.release().unwrap();
    }
}
