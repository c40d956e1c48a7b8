//! Memory sink: a file part accumulated in one growing buffer

use super::convergence::Convergence;
use crate::decoder::FileBody;
use crate::error::FormError;
use crate::types::MemoryFile;
use bytes::BytesMut;

/// Read one file part into `file.contents`.
///
/// On failure the buffer is dropped and `file` keeps empty contents.
pub(crate) async fn stream_file(
    body: &mut FileBody<'_>,
    file: &mut MemoryFile,
    file_size: Option<u64>,
    convergence: &Convergence,
) -> Result<(), FormError> {
    let mut buffer = BytesMut::new();
    while let Some(chunk) = body.chunk().await? {
        if convergence.is_resolved() {
            return Ok(());
        }
        if let Some(max) = file_size
            && (buffer.len() + chunk.len()) as u64 > max
        {
            return Err(FormError::FileTooLarge {
                filename: file.filename.clone(),
            });
        }
        buffer.extend_from_slice(&chunk);
    }
    file.contents = buffer.freeze();
    Ok(())
}
