//! Route handlers for the HTTP adapter
//!
//! - [`forms`] - multipart and urlencoded forms through the ingestion engine
//! - [`body`] - whole-body upload and the limited simple body

use crate::host::IncomingBody;
use axum::body::Body;
use axum::http::HeaderMap;
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};

mod body;
mod forms;

pub use body::*;
pub use forms::*;

/// Chunks buffered between the request body and the engine
const BODY_CHANNEL_CAPACITY: usize = 16;

/// `Content-Type` header value, empty when missing or not ASCII
fn content_type(headers: &HeaderMap) -> &str {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

/// `Content-Length` header value, 0 when missing or unparsable
fn content_length(headers: &HeaderMap) -> usize {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok())
        .unwrap_or(0)
}

fn incoming(body: Body) -> IncomingBody {
    IncomingBody::from_stream(body.into_data_stream(), BODY_CHANNEL_CAPACITY)
}
