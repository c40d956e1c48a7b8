//! Whole-body accumulation
//!
//! [`accumulate_body`] collects every byte of a body without looking at its
//! format. [`parse_simple_body`] adds a byte limit and types the result by
//! content type.

use crate::error::FormError;
use crate::host::IncomingBody;
use bytes::{Bytes, BytesMut};
use tracing::debug;

/// Accumulated body bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyBuffer {
    /// Exclusively owned bytes
    Unique(Vec<u8>),
    /// Reference counted bytes, cheap to clone and share across tasks
    Shared(Bytes),
}

impl BodyBuffer {
    fn from_vec(bytes: Vec<u8>, shared: bool) -> Self {
        if shared {
            BodyBuffer::Shared(Bytes::from(bytes))
        } else {
            BodyBuffer::Unique(bytes)
        }
    }

    /// Number of bytes
    pub fn len(&self) -> usize {
        self.as_ref().len()
    }

    /// Whether the buffer holds no bytes (always true after an abort)
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Convert into shareable bytes without copying
    pub fn into_bytes(self) -> Bytes {
        match self {
            BodyBuffer::Unique(bytes) => Bytes::from(bytes),
            BodyBuffer::Shared(bytes) => bytes,
        }
    }
}

impl AsRef<[u8]> for BodyBuffer {
    fn as_ref(&self) -> &[u8] {
        match self {
            BodyBuffer::Unique(bytes) => &bytes[..],
            BodyBuffer::Shared(bytes) => &bytes[..],
        }
    }
}

/// Upfront allocation ceiling for a declared body length
pub const MAX_PREALLOCATION: usize = 16 * 1024 * 1024;

/// Collect a whole body.
///
/// With a nonzero `expected_length` the buffer is allocated once (up to
/// [`MAX_PREALLOCATION`] bytes) and every chunk is copied to its running
/// offset. A shorter body is truncated to the bytes received; a longer one
/// keeps growing. With `expected_length == 0` the
/// buffer grows as chunks arrive.
///
/// An abort discards everything and yields an empty buffer.
pub async fn accumulate_body(
    body: &mut IncomingBody,
    expected_length: usize,
    shared: bool,
) -> BodyBuffer {
    let control = body.control().clone();
    let mut buffer = vec![0u8; expected_length.min(MAX_PREALLOCATION)];
    let mut written = 0usize;

    loop {
        let chunk = tokio::select! {
            biased;
            _ = control.aborted() => {
                debug!(received = written, "body aborted, discarding");
                return BodyBuffer::from_vec(Vec::new(), shared);
            }
            chunk = body.next_chunk() => chunk,
        };
        let Some(chunk) = chunk else {
            break;
        };

        let data = &chunk.data[..];
        let fit = data.len().min(buffer.len().saturating_sub(written));
        buffer[written..written + fit].copy_from_slice(&data[..fit]);
        buffer.extend_from_slice(&data[fit..]);
        written += data.len();

        if chunk.is_last {
            break;
        }
    }

    buffer.truncate(written);
    BodyBuffer::from_vec(buffer, shared)
}

/// Body typed by its content type
#[derive(Debug, Clone, PartialEq)]
pub enum SimpleBody {
    /// `text/plain`
    Text(String),
    /// `application/json`
    Json(serde_json::Value),
    /// Any other content type
    Raw(Bytes),
}

/// Collect a body of at most `limit` bytes and parse it by content type.
///
/// # Example
///
/// ```
/// use form_ingest::{SimpleBody, host, parse_simple_body};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let (feeder, mut body) = host::channel(2);
/// feeder.send("helloworld", true).await.unwrap();
///
/// let parsed = parse_simple_body(&mut body, "text/plain", 10).await.unwrap();
/// assert_eq!(parsed, SimpleBody::Text("helloworld".to_string()));
/// # }
/// ```
pub async fn parse_simple_body(
    body: &mut IncomingBody,
    content_type: &str,
    limit: u64,
) -> Result<SimpleBody, FormError> {
    let control = body.control().clone();
    let mut buffer = BytesMut::new();

    loop {
        let chunk = tokio::select! {
            biased;
            _ = control.aborted() => return Err(FormError::Aborted),
            chunk = body.next_chunk() => chunk,
        };
        let Some(chunk) = chunk else {
            break;
        };
        if (buffer.len() + chunk.data.len()) as u64 > limit {
            debug!(limit, "body exceeds limit");
            control.pause();
            return Err(FormError::BodyTooLarge { limit });
        }
        buffer.extend_from_slice(&chunk.data);
        if chunk.is_last {
            break;
        }
    }

    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match essence.as_str() {
        "text/plain" => String::from_utf8(buffer.to_vec())
            .map(SimpleBody::Text)
            .map_err(|e| FormError::InvalidBody(e.to_string())),
        "application/json" => serde_json::from_slice(&buffer)
            .map(SimpleBody::Json)
            .map_err(|e| FormError::InvalidBody(e.to_string())),
        _ => Ok(SimpleBody::Raw(buffer.freeze())),
    }
}
