// ABOUTME: FileSystem implementation backed by std::fs and walkdir.
// ABOUTME: Recursive copies preserve directory layout and symlinks.

use std::fs;
use std::path::Path;

use snafu::ResultExt;
use walkdir::WalkDir;

use super::FileSystem;
use super::error::{
    CopySnafu, FsError, MakeDirsSnafu, RemoveSnafu, RenameSnafu, WalkSnafu, WriteSnafu,
};

/// The local disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl FileSystem for LocalFs {
    fn copy_tree(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        fs::create_dir_all(to).context(MakeDirsSnafu { path: to })?;

        for entry in WalkDir::new(from).min_depth(1).sort_by_file_name() {
            let entry = entry.context(WalkSnafu { path: from })?;
            let Ok(relative) = entry.path().strip_prefix(from) else {
                continue;
            };
            let target = to.join(relative);
            let file_type = entry.file_type();

            if file_type.is_dir() {
                fs::create_dir_all(&target).context(MakeDirsSnafu { path: &target })?;
            } else if file_type.is_symlink() {
                copy_symlink(entry.path(), &target)?;
            } else {
                fs::copy(entry.path(), &target).context(CopySnafu {
                    from: entry.path(),
                    to: &target,
                })?;
            }
        }

        Ok(())
    }

    fn remove_tree(&self, path: &Path) -> Result<(), FsError> {
        let metadata = fs::symlink_metadata(path).context(RemoveSnafu { path })?;
        if metadata.is_dir() {
            fs::remove_dir_all(path).context(RemoveSnafu { path })
        } else {
            fs::remove_file(path).context(RemoveSnafu { path })
        }
    }

    fn write_file(&self, path: &Path, contents: &[u8]) -> Result<(), FsError> {
        fs::write(path, contents).context(WriteSnafu { path })
    }

    fn make_dirs(&self, path: &Path) -> Result<(), FsError> {
        fs::create_dir_all(path).context(MakeDirsSnafu { path })
    }

    fn exists(&self, path: &Path) -> bool {
        fs::symlink_metadata(path).is_ok()
    }

    fn is_symlink(&self, path: &Path) -> bool {
        fs::symlink_metadata(path).is_ok_and(|m| m.file_type().is_symlink())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        fs::rename(from, to).context(RenameSnafu { from, to })
    }
}

#[cfg(unix)]
fn copy_symlink(from: &Path, to: &Path) -> Result<(), FsError> {
    let link = fs::read_link(from).context(CopySnafu { from, to })?;
    std::os::unix::fs::symlink(link, to).context(CopySnafu { from, to })
}

#[cfg(not(unix))]
fn copy_symlink(from: &Path, to: &Path) -> Result<(), FsError> {
    fs::copy(from, to).map(|_| ()).context(CopySnafu { from, to })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_tree_copies_nested_files() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(src.join("css")).unwrap();
        fs::write(src.join("index.html"), "<h1>hi</h1>").unwrap();
        fs::write(src.join("css/site.css"), "body{}").unwrap();

        let dst = dir.path().join("dst");
        LocalFs.copy_tree(&src, &dst).unwrap();

        assert_eq!(fs::read_to_string(dst.join("index.html")).unwrap(), "<h1>hi</h1>");
        assert_eq!(fs::read_to_string(dst.join("css/site.css")).unwrap(), "body{}");
    }

    #[test]
    fn remove_tree_reports_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = LocalFs.remove_tree(&dir.path().join("nope")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn copy_tree_from_missing_source_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = LocalFs.copy_tree(&dir.path().join("nope"), &dir.path().join("dst"));
        assert!(result.is_err());
    }
}
