//! Test configuration helpers

use form_ingest::{IngestConfig, StorageMode};
use tempfile::TempDir;

/// Disk-mode config writing into a fresh temp directory
///
/// Keep the returned TempDir alive for the duration of the test.
pub fn disk_config() -> (IngestConfig, TempDir) {
    let temp_dir = TempDir::new().expect("create temp dir");
    let config = IngestConfig {
        storage: StorageMode::Disk,
        output_dir: Some(temp_dir.path().to_path_buf()),
        ..Default::default()
    };
    (config, temp_dir)
}

/// Memory-mode config collecting repeated names
pub fn repeated_memory_config() -> IngestConfig {
    IngestConfig {
        storage: StorageMode::Memory,
        repeated_parts: true,
        ..Default::default()
    }
}
