// ABOUTME: Integration tests for overlaying bundles onto a directory.
// ABOUTME: Covers idempotence, overlay semantics and traversal rejection.

mod support;

use std::sync::Arc;

use proptest::prelude::*;
use siteswap::artifact::{Applier, ApplyError, Bundle, BundleEntry, resolve_entry_path};
use siteswap::fs::LocalFs;
use support::{read_tree, write_tree};

fn applier() -> Applier {
    Applier::new(Arc::new(LocalFs))
}

#[test]
fn applying_twice_yields_same_tree() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("www");
    let bundle = Bundle::new(vec![
        BundleEntry::dir("assets"),
        BundleEntry::file("assets/app.css", "body{}"),
        BundleEntry::file("index.html", "hello"),
    ]);

    let first = applier().apply(&bundle, &target).unwrap();
    let after_first = read_tree(&target);
    let second = applier().apply(&bundle, &target).unwrap();

    assert_eq!(read_tree(&target), after_first);
    assert_eq!(first, second);
    assert_eq!(first.files_written, 2);
}

#[test]
fn overlay_keeps_untracked_files() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("www");
    write_tree(&target, &[("uploads/photo.jpg", "jpeg"), ("index.html", "old")]);

    let bundle = Bundle::new(vec![BundleEntry::file("index.html", "new")]);
    applier().apply(&bundle, &target).unwrap();

    let tree = read_tree(&target);
    assert_eq!(tree["index.html"], b"new");
    assert_eq!(tree["uploads/photo.jpg"], b"jpeg");
}

#[test]
fn file_parents_are_created_without_dir_entries() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("www");

    let bundle = Bundle::new(vec![BundleEntry::file("a/b/c.txt", "deep")]);
    applier().apply(&bundle, &target).unwrap();

    assert_eq!(read_tree(&target)["a/b/c.txt"], b"deep");
}

#[test]
fn traversal_anywhere_in_bundle_leaves_target_unmodified() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("www");
    write_tree(&target, &[("index.html", "old")]);
    let before = read_tree(&target);

    let bundle = Bundle::new(vec![
        BundleEntry::file("index.html", "new"),
        BundleEntry::file("ok/../../escape.txt", "evil"),
    ]);
    let err = applier().apply(&bundle, &target).unwrap_err();

    assert!(matches!(err, ApplyError::PathTraversal { .. }));
    assert_eq!(read_tree(&target), before);
    assert!(!dir.path().join("escape.txt").exists());
}

#[cfg(unix)]
#[test]
fn symlinked_directory_in_target_is_not_followed() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("www");
    let outside = dir.path().join("outside");
    write_tree(&target, &[("index.html", "old")]);
    std::fs::create_dir_all(&outside).unwrap();
    std::os::unix::fs::symlink(&outside, target.join("uploads")).unwrap();

    let bundle = Bundle::new(vec![
        BundleEntry::file("index.html", "new"),
        BundleEntry::file("uploads/pwned.txt", "evil"),
    ]);
    let err = applier().apply(&bundle, &target).unwrap_err();

    assert!(matches!(err, ApplyError::PathTraversal { .. }));
    assert!(!outside.join("pwned.txt").exists());
    assert_eq!(std::fs::read_to_string(target.join("index.html")).unwrap(), "old");
}

#[cfg(unix)]
#[test]
fn symlinked_file_in_target_is_not_overwritten() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("www");
    let secret = dir.path().join("secret.txt");
    write_tree(&target, &[]);
    std::fs::write(&secret, "keep").unwrap();
    std::os::unix::fs::symlink(&secret, target.join("config.txt")).unwrap();

    let bundle = Bundle::new(vec![BundleEntry::file("config.txt", "overwritten")]);
    let err = applier().apply(&bundle, &target).unwrap_err();

    assert!(matches!(err, ApplyError::PathTraversal { .. }));
    assert_eq!(std::fs::read_to_string(&secret).unwrap(), "keep");
}

#[test]
fn absolute_entry_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let err = resolve_entry_path(dir.path(), std::path::Path::new("/etc/passwd")).unwrap_err();
    assert!(matches!(err, ApplyError::PathTraversal { .. }));
}

proptest! {
    #[test]
    fn resolved_paths_stay_under_root(parts in prop::collection::vec("[a-z]{1,6}|\\.|\\.\\.", 1..6)) {
        let root = std::path::Path::new("/srv/site");
        let entry: std::path::PathBuf = parts.iter().collect();

        match resolve_entry_path(root, &entry) {
            Ok(resolved) => {
                prop_assert!(resolved.starts_with(root));
                prop_assert!(!parts.iter().any(|p| p == ".."));
            }
            Err(_) => prop_assert!(parts.iter().any(|p| p == "..")),
        }
    }
}
