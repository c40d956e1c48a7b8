//! Custom test assertions for E2E tests

use form_ingest::{DiskFile, FormData};
use std::path::Path;

/// Number of entries in a directory
pub fn dir_entries(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| entries.count())
        .unwrap_or(0)
}

/// Assert that a scratch directory holds no files
pub fn assert_dir_empty(dir: &Path) {
    let leftovers: Vec<_> = std::fs::read_dir(dir)
        .map(|entries| entries.filter_map(|entry| entry.ok()).map(|e| e.path()).collect())
        .unwrap_or_default();
    assert!(leftovers.is_empty(), "files left behind: {leftovers:?}");
}

/// Assert the disk-file invariant: no path iff empty, and the file on disk
/// holds exactly `size` bytes
pub fn assert_disk_file_consistent(file: &DiskFile) {
    match &file.path {
        None => assert_eq!(file.size, 0, "{} has no path but a size", file.filename),
        Some(path) => {
            assert!(file.size > 0, "{} is empty but has a path", file.filename);
            let on_disk = std::fs::metadata(path)
                .unwrap_or_else(|e| panic!("{} missing at {path:?}: {e}", file.filename))
                .len();
            assert_eq!(on_disk, file.size, "size mismatch for {}", file.filename);
        }
    }
}

/// Assert every disk file in a form satisfies [`assert_disk_file_consistent`]
pub fn assert_form_files_consistent(form: &FormData) {
    let files = form.files.as_disk().expect("form was parsed in disk mode");
    for file in files.values() {
        assert_disk_file_consistent(file);
    }
}
