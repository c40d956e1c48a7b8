//! Ingestion engine
//!
//! [`parse_form_data_body`] drives the decoder over one body, routes every
//! part through the [`registry`] into a memory or disk sink, and converges on
//! exactly one [`Outcome`]. Failures in disk mode run the emergency sweep
//! before the outcome is returned, so no file of a failed run is left behind.
//!
//! Submodules:
//! - [`registry`] - naming policy and result maps
//! - [`memory_sink`] / [`disk_sink`] - storage strategies
//! - [`gate`] - pause/resume gate shared by disk writers
//! - [`convergence`] - write-once terminal state
//! - [`cleanup`] - emergency sweep

pub(crate) mod cleanup;
pub(crate) mod convergence;
pub(crate) mod disk_sink;
pub(crate) mod gate;
pub(crate) mod memory_sink;
pub(crate) mod registry;


use crate::config::IngestConfig;
use crate::decoder::{BodyKind, Decoder, Part};
use crate::error::FormError;
use crate::host::IncomingBody;
use crate::types::Outcome;
use convergence::{Convergence, Terminal};
use disk_sink::DiskContext;
use gate::BackpressureGate;
use registry::{FileSlot, Registry};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Parse a multipart or urlencoded body into fields and files.
///
/// Fails with a client error before reading any byte when `content_type` is
/// not supported or lacks a multipart boundary. Otherwise the body is consumed
/// until the decoder closes, a limit or duplicate name is hit, a disk write
/// fails, or the client aborts; whichever happens first decides the outcome.
///
/// In disk mode every file with at least one byte ends up in a randomly named
/// file under [`IngestConfig::scratch_dir`]. The caller owns those files on
/// success. On failure none of them remain.
///
/// # Example
///
/// ```
/// use form_ingest::{IngestConfig, host, parse_form_data_body};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let (feeder, mut body) = host::channel(4);
/// feeder.send("name=ferris&lang=rust", true).await.unwrap();
///
/// let form = parse_form_data_body(
///     "application/x-www-form-urlencoded",
///     &mut body,
///     &IngestConfig::default(),
/// )
/// .await
/// .unwrap();
/// assert_eq!(form.fields.get("name").map(String::as_str), Some("ferris"));
/// # }
/// ```
pub async fn parse_form_data_body(
    content_type: &str,
    body: &mut IncomingBody,
    config: &IngestConfig,
) -> Outcome {
    let kind = BodyKind::from_content_type(content_type)?;

    let control = body.control().clone();
    let convergence = Arc::new(Convergence::new());
    let cancel = CancellationToken::new();
    let mut registry = Registry::new(config.storage, config.repeated_parts);
    let disk = DiskContext {
        dir: config.scratch_dir(),
        queue_depth: config.write_queue_depth,
        file_size: config.limits.file_size,
        gate: BackpressureGate::new(control.clone()),
        convergence: convergence.clone(),
        cancel: cancel.clone(),
    };
    // Declared after the registry so a dropped run cancels every writer
    // before their queues close.
    let abandon = cancel.clone().drop_guard();

    {
        let decoder = Decoder::new(kind, body, &config.limits);
        let run = async {
            match drive(decoder, &mut registry, &disk).await {
                Ok(()) => convergence.close(),
                Err(err) => convergence.fail(err),
            };
        };
        // Dropping the select deregisters the abort listener.
        tokio::select! {
            biased;
            _ = control.aborted() => {
                convergence.fail(FormError::Aborted);
            }
            _ = convergence.resolved() => {}
            _ = run => {}
        }
    }

    let failure = match convergence.terminal() {
        Some(Terminal::Closed) => match registry.incomplete_write() {
            None => {
                abandon.disarm();
                return registry.finish();
            }
            Some(err) => err,
        },
        Some(Terminal::Failed(err)) => err.clone(),
        None => FormError::Malformed("Unexpected end of form".to_string()),
    };

    if !control.is_aborted() {
        control.pause();
    }
    if registry.is_disk() {
        cleanup::emergency_sweep(&mut registry, &convergence, &cancel).await;
    }
    debug!(error = %failure, code_class = %failure.code_class(), "form ingestion failed");
    Err(failure)
}

/// Pull parts until the decoder closes, then wait for every disk write.
async fn drive(
    mut decoder: Decoder<'_>,
    registry: &mut Registry,
    disk: &DiskContext,
) -> Result<(), FormError> {
    let convergence = &disk.convergence;
    while let Some(part) = decoder.next_part().await? {
        if convergence.is_resolved() {
            return Ok(());
        }
        match part {
            Part::Field { name, value } => registry.add_field(name, value)?,
            Part::File {
                name,
                info,
                mut body,
            } => match registry.add_file(name, info)? {
                FileSlot::Memory(file) => {
                    memory_sink::stream_file(&mut body, file, disk.file_size, convergence).await?
                }
                FileSlot::Disk(slot) => disk_sink::stream_file(&mut body, slot, disk).await?,
            },
        }
    }
    let writes: Vec<_> = registry.pending_writes().collect();
    for write in writes {
        write.settle().await;
    }
    Ok(())
}
