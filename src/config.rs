//! Configuration types for form-ingest

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where file parts are stored while a body is ingested
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageMode {
    /// Accumulate every file in a growing buffer (default)
    #[default]
    Memory,
    /// Stream every file into a randomly named file in the output directory
    Disk,
}

/// Numeric limits handed to the decoder
///
/// `None` means unlimited. Exceeding any limit fails the whole request with a
/// client error.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    /// Maximum field name length in bytes (default: 100)
    #[serde(default = "default_field_name_size")]
    pub field_name_size: Option<usize>,

    /// Maximum field value length in bytes (default: 1 MiB)
    #[serde(default = "default_field_size")]
    pub field_size: Option<usize>,

    /// Maximum number of non-file fields
    #[serde(default)]
    pub fields: Option<usize>,

    /// Maximum size of a single file in bytes
    #[serde(default)]
    pub file_size: Option<u64>,

    /// Maximum number of file parts
    #[serde(default)]
    pub files: Option<usize>,

    /// Maximum number of parts (fields + files)
    #[serde(default)]
    pub parts: Option<usize>,

    /// Maximum number of header lines per multipart part (default: 2000)
    #[serde(default = "default_header_pairs")]
    pub header_pairs: Option<usize>,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            field_name_size: default_field_name_size(),
            field_size: default_field_size(),
            fields: None,
            file_size: None,
            files: None,
            parts: None,
            header_pairs: default_header_pairs(),
        }
    }
}

/// Options for a single [`parse_form_data_body`](crate::parse_form_data_body) call
///
/// # Example
///
/// ```
/// use form_ingest::{IngestConfig, Limits, StorageMode};
///
/// let config = IngestConfig {
///     storage: StorageMode::Disk,
///     output_dir: Some("uploads".into()),
///     limits: Limits {
///         file_size: Some(1024 * 1024),
///         ..Default::default()
///     },
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Decoder limits
    #[serde(default)]
    pub limits: Limits,

    /// Directory for disk mode files (None = platform temp directory)
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    /// Where file parts are stored (default: memory)
    #[serde(default)]
    pub storage: StorageMode,

    /// Accept repeated field and file names, collecting them in arrival order
    /// (default: false, a repeated name fails the request)
    #[serde(default)]
    pub repeated_parts: bool,

    /// Chunks a file writer may queue before the disk sink pauses the body (default: 16)
    #[serde(default = "default_write_queue_depth")]
    pub write_queue_depth: usize,

    /// Byte limit for [`parse_simple_body`](crate::parse_simple_body) (default: 1 MiB)
    #[serde(default = "default_body_limit")]
    pub body_limit: u64,

    /// Largest declared `Content-Length` the upload route preallocates for
    /// (default: 64 MiB)
    #[serde(default = "default_upload_limit")]
    pub upload_limit: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            limits: Limits::default(),
            output_dir: None,
            storage: StorageMode::default(),
            repeated_parts: false,
            write_queue_depth: default_write_queue_depth(),
            body_limit: default_body_limit(),
            upload_limit: default_upload_limit(),
        }
    }
}

impl IngestConfig {
    /// Check values that would make an ingestion run impossible
    pub fn validate(&self) -> Result<()> {
        if self.write_queue_depth == 0 {
            return Err(Error::Config {
                message: "write_queue_depth must be at least 1".to_string(),
                key: Some("write_queue_depth".to_string()),
            });
        }
        if self.body_limit == 0 {
            return Err(Error::Config {
                message: "body_limit must be greater than 0".to_string(),
                key: Some("body_limit".to_string()),
            });
        }
        if self.upload_limit == 0 {
            return Err(Error::Config {
                message: "upload_limit must be greater than 0".to_string(),
                key: Some("upload_limit".to_string()),
            });
        }
        if let Some(dir) = &self.output_dir
            && dir.as_os_str().is_empty()
        {
            return Err(Error::Config {
                message: "output_dir must not be empty".to_string(),
                key: Some("output_dir".to_string()),
            });
        }
        Ok(())
    }

    /// Directory disk mode writes into
    pub fn scratch_dir(&self) -> PathBuf {
        crate::utils::scratch_dir(self.output_dir.as_deref())
    }
}

fn default_field_name_size() -> Option<usize> {
    Some(100)
}

fn default_field_size() -> Option<usize> {
    Some(1024 * 1024)
}

fn default_header_pairs() -> Option<usize> {
    Some(2000)
}

fn default_write_queue_depth() -> usize {
    16
}

fn default_body_limit() -> u64 {
    1024 * 1024 // 1 MiB
}

fn default_upload_limit() -> u64 {
    64 * 1024 * 1024 // 64 MiB
}
