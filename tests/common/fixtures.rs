//! Multipart bodies and content generators

use form_ingest::IncomingBody;
use form_ingest::host;

/// Boundary used by every generated multipart body
pub const BOUNDARY: &str = "BOUNDARY";

/// Content type matching [`MultipartBuilder`] output
pub const MULTIPART_CONTENT_TYPE: &str = "multipart/form-data; boundary=BOUNDARY";

/// Builder for multipart/form-data bodies
#[derive(Debug, Default)]
pub struct MultipartBuilder {
    raw: Vec<u8>,
}

impl MultipartBuilder {
    /// Start an empty body
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a plain field
    pub fn field(mut self, name: &str, value: &str) -> Self {
        self.raw.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    /// Append a file part with an explicit content type
    pub fn file(mut self, name: &str, filename: &str, content_type: &str, data: &[u8]) -> Self {
        self.raw.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                 Content-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        self.raw.extend_from_slice(data);
        self.raw.extend_from_slice(b"\r\n");
        self
    }

    /// Body bytes up to (not including) the closing delimiter
    pub fn unterminated(self) -> Vec<u8> {
        self.raw
    }

    /// Finish the body
    pub fn build(mut self) -> Vec<u8> {
        self.raw
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        self.raw
    }
}

/// Deterministic, non-repeating-looking test content of `len` bytes
pub fn generate_content(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| ((i * 31 + seed as usize) % 251) as u8)
        .collect()
}

/// Feed `raw` to a new body in `piece`-sized chunks from a background task
pub fn feed_in_pieces(raw: Vec<u8>, piece: usize) -> IncomingBody {
    let (feeder, body) = host::channel(4);
    tokio::spawn(async move {
        for chunk in raw.chunks(piece.max(1)) {
            if feeder.send(chunk.to_vec(), false).await.is_err() {
                return;
            }
        }
        feeder.finish().await.ok();
    });
    body
}
