//! Part decoder
//!
//! Turns an [`IncomingBody`] into a sequence of [`Part`] events. Multipart
//! bodies go through `multer`; urlencoded bodies are split on `&` as bytes
//! arrive and each pair is decoded with `form_urlencoded`. Count, size and
//! header limits from [`Limits`] are enforced here, so the engine only ever
//! sees parts that are within bounds.

use crate::config::Limits;
use crate::error::FormError;
use crate::host::IncomingBody;
use crate::types::FileInfo;
use crate::utils::client_filename;
use bytes::Bytes;
use futures::stream::{BoxStream, Stream, StreamExt};
use tracing::debug;

const DEFAULT_MIME_TYPE: &str = "text/plain";
const DEFAULT_ENCODING: &str = "7bit";

/// Body formats the decoder understands
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum BodyKind {
    Multipart { boundary: String },
    UrlEncoded,
}

impl BodyKind {
    /// Classify a `Content-Type` header value.
    ///
    /// Fails before any body byte is read.
    pub(crate) fn from_content_type(content_type: &str) -> Result<Self, FormError> {
        let lowered = content_type.trim_start().to_ascii_lowercase();
        if lowered.starts_with("multipart/form-data") {
            let boundary = multer::parse_boundary(content_type).map_err(|e| {
                debug!(content_type, error = %e, "multipart content type without boundary");
                FormError::MissingBoundary
            })?;
            Ok(BodyKind::Multipart { boundary })
        } else if lowered.starts_with("application/x-www-form-urlencoded") {
            Ok(BodyKind::UrlEncoded)
        } else {
            debug!(content_type, "unsupported content type");
            Err(FormError::UnsupportedContentType(content_type.to_string()))
        }
    }
}

/// One decoded part
pub(crate) enum Part<'r> {
    Field {
        name: String,
        value: String,
    },
    File {
        name: String,
        info: FileInfo,
        body: FileBody<'r>,
    },
}

/// Byte stream of one file part.
///
/// Must be read to the end or dropped before the next part is requested.
pub(crate) struct FileBody<'r> {
    field: multer::Field<'r>,
}

impl FileBody<'_> {
    /// Next chunk of file bytes, `None` at the end of the part
    pub(crate) async fn chunk(&mut self) -> Result<Option<Bytes>, FormError> {
        self.field.chunk().await.map_err(malformed)
    }
}

enum Source<'r> {
    Multipart(multer::Multipart<'r>),
    UrlEncoded(PairSplitter<'r>),
}

/// Limit-enforcing part decoder over one body
pub(crate) struct Decoder<'r> {
    source: Source<'r>,
    limits: Limits,
    parts: usize,
    fields: usize,
    files: usize,
}

impl<'r> Decoder<'r> {
    pub(crate) fn new(kind: BodyKind, body: &'r mut IncomingBody, limits: &Limits) -> Self {
        let source = match kind {
            BodyKind::Multipart { boundary } => Source::Multipart(multer::Multipart::new(
                chunks(body).map(Ok::<Bytes, std::io::Error>),
                boundary,
            )),
            BodyKind::UrlEncoded => Source::UrlEncoded(PairSplitter::new(chunks(body).boxed())),
        };
        Self {
            source,
            limits: limits.clone(),
            parts: 0,
            fields: 0,
            files: 0,
        }
    }

    /// Next part in body order, `None` once the body is fully decoded
    pub(crate) async fn next_part(&mut self) -> Result<Option<Part<'r>>, FormError> {
        match &mut self.source {
            Source::Multipart(multipart) => {
                let Some(mut field) = multipart.next_field().await.map_err(malformed)? else {
                    return Ok(None);
                };

                count(&mut self.parts, self.limits.parts)?;
                if let Some(max) = self.limits.header_pairs
                    && field.headers().len() > max
                {
                    return Err(FormError::TooManyHeaderPairs);
                }
                let name = field.name().unwrap_or_default().to_string();
                check_name(&name, self.limits.field_name_size)?;

                match field.file_name().map(client_filename) {
                    Some(filename) => {
                        count(&mut self.files, self.limits.files)?;
                        let mime_type = field
                            .content_type()
                            .map(|mime| mime.essence_str().to_string())
                            .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string());
                        let encoding = field
                            .headers()
                            .get("content-transfer-encoding")
                            .and_then(|value| value.to_str().ok())
                            .map(|value| value.trim().to_ascii_lowercase())
                            .unwrap_or_else(|| DEFAULT_ENCODING.to_string());
                        Ok(Some(Part::File {
                            name,
                            info: FileInfo {
                                filename,
                                mime_type,
                                encoding,
                            },
                            body: FileBody { field },
                        }))
                    }
                    None => {
                        count(&mut self.fields, self.limits.fields)?;
                        let mut value = Vec::new();
                        while let Some(chunk) = field.chunk().await.map_err(malformed)? {
                            if let Some(max) = self.limits.field_size
                                && value.len() + chunk.len() > max
                            {
                                return Err(FormError::FieldTooLarge { name });
                            }
                            value.extend_from_slice(&chunk);
                        }
                        Ok(Some(Part::Field {
                            name,
                            value: String::from_utf8_lossy(&value).into_owned(),
                        }))
                    }
                }
            }
            Source::UrlEncoded(splitter) => {
                let Some((name, value)) = splitter.next_pair(&self.limits).await? else {
                    return Ok(None);
                };
                count(&mut self.parts, self.limits.parts)?;
                count(&mut self.fields, self.limits.fields)?;
                Ok(Some(Part::Field { name, value }))
            }
        }
    }
}

/// Non-empty chunk data of a body, in order
fn chunks(body: &mut IncomingBody) -> impl Stream<Item = Bytes> + Send + '_ {
    futures::stream::unfold(body, |body| async move {
        loop {
            let chunk = body.next_chunk().await?;
            if !chunk.data.is_empty() {
                return Some((chunk.data, body));
            }
        }
    })
}

fn malformed(err: multer::Error) -> FormError {
    FormError::Malformed(err.to_string())
}

/// Bump a counter; the (limit + 1)-th item fails.
fn count(counter: &mut usize, limit: Option<usize>) -> Result<(), FormError> {
    *counter += 1;
    match limit {
        Some(max) if *counter > max => Err(FormError::TooManyParts),
        _ => Ok(()),
    }
}

fn check_name(name: &str, limit: Option<usize>) -> Result<(), FormError> {
    match limit {
        Some(max) if name.len() > max => Err(FormError::FieldNameTooLong { limit: max }),
        _ => Ok(()),
    }
}

/// Incremental `name=value&...` splitter
struct PairSplitter<'r> {
    stream: BoxStream<'r, Bytes>,
    buf: Vec<u8>,
    done: bool,
}

impl<'r> PairSplitter<'r> {
    fn new(stream: BoxStream<'r, Bytes>) -> Self {
        Self {
            stream,
            buf: Vec::new(),
            done: false,
        }
    }

    async fn next_pair(&mut self, limits: &Limits) -> Result<Option<(String, String)>, FormError> {
        loop {
            if let Some(pos) = self.buf.iter().position(|b| *b == b'&') {
                let raw: Vec<u8> = self.buf.drain(..=pos).collect();
                if let Some(pair) = decode_pair(&raw[..pos], limits)? {
                    return Ok(Some(pair));
                }
                continue;
            }
            if self.done {
                if self.buf.is_empty() {
                    return Ok(None);
                }
                let raw = std::mem::take(&mut self.buf);
                return decode_pair(&raw, limits);
            }
            check_raw_pair(&self.buf, limits)?;
            match self.stream.next().await {
                Some(chunk) => self.buf.extend_from_slice(&chunk),
                None => self.done = true,
            }
        }
    }
}

/// Bound the undecoded pair being buffered.
///
/// Percent encoding takes at most three bytes per decoded byte.
fn check_raw_pair(raw: &[u8], limits: &Limits) -> Result<(), FormError> {
    match raw.iter().position(|b| *b == b'=') {
        Some(eq) => match limits.field_size {
            Some(max) if raw.len() - eq - 1 > max.saturating_mul(3) => {
                let name = form_urlencoded_name(&raw[..eq]);
                Err(FormError::FieldTooLarge { name })
            }
            _ => Ok(()),
        },
        None => match limits.field_name_size {
            Some(max) if raw.len() > max.saturating_mul(3) => {
                Err(FormError::FieldNameTooLong { limit: max })
            }
            _ => Ok(()),
        },
    }
}

fn form_urlencoded_name(raw: &[u8]) -> String {
    url::form_urlencoded::parse(raw)
        .next()
        .map(|(name, _)| name.into_owned())
        .unwrap_or_default()
}

fn decode_pair(raw: &[u8], limits: &Limits) -> Result<Option<(String, String)>, FormError> {
    let Some((name, value)) = url::form_urlencoded::parse(raw).next() else {
        return Ok(None);
    };
    check_name(&name, limits.field_name_size)?;
    if let Some(max) = limits.field_size
        && value.len() > max
    {
        return Err(FormError::FieldTooLarge {
            name: name.into_owned(),
        });
    }
    Ok(Some((name.into_owned(), value.into_owned())))
}
