//! # form-ingest
//!
//! Backpressure-aware ingestion of multipart and urlencoded request bodies.
//!
//! ## Design Philosophy
//!
//! form-ingest is designed to be:
//! - **Bounded** - File parts stream to disk or memory under explicit limits
//! - **Single outcome** - Every call resolves exactly once, however many
//!   failures race each other
//! - **Clean on failure** - A failed or aborted disk-mode run leaves no file behind
//! - **Library-first** - The HTTP adapter is optional glue around plain async functions
//!
//! ## Quick Start
//!
//! ```no_run
//! use form_ingest::{IngestConfig, StorageMode, host, parse_form_data_body};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = IngestConfig {
//!         storage: StorageMode::Disk,
//!         output_dir: Some("uploads".into()),
//!         ..Default::default()
//!     };
//!     config.validate()?;
//!
//!     let (feeder, mut body) = host::channel(16);
//!     tokio::spawn(async move {
//!         let form = b"--X\r\nContent-Disposition: form-data; name=\"f\"; filename=\"a.txt\"\r\n\r\nhi\r\n--X--\r\n";
//!         feeder.send(form.to_vec(), true).await.ok();
//!     });
//!
//!     let form = parse_form_data_body("multipart/form-data; boundary=X", &mut body, &config).await?;
//!     for file in form.files.as_disk().into_iter().flat_map(|files| files.values()) {
//!         println!("{} -> {:?} ({} bytes)", file.filename, file.path, file.size);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Whole-body accumulation
pub mod accumulate;
/// HTTP adapter
pub mod api;
/// Configuration types
pub mod config;
/// Multipart and urlencoded part decoding
mod decoder;
/// Error types
pub mod error;
/// Host body abstraction
pub mod host;
/// Ingestion engine
mod ingest;
/// Core result types
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use accumulate::{BodyBuffer, SimpleBody, accumulate_body, parse_simple_body};
pub use config::{IngestConfig, Limits, StorageMode};
pub use error::{ApiError, CodeClass, Error, ErrorDetail, FormError, Result, ToHttpStatus};
pub use host::{BodyChunk, BodyFeeder, FlowControl, IncomingBody};
pub use ingest::parse_form_data_body;
pub use types::{DiskFile, FileInfo, Files, FormData, MemoryFile, Outcome, PartMap};
