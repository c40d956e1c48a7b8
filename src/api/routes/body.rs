//! Whole-body handlers.

use super::{content_length, content_type, incoming};
use crate::api::AppState;
use crate::error::FormError;
use crate::{SimpleBody, accumulate_body, parse_simple_body};
use axum::{
    Json,
    body::Body,
    extract::State,
    http::{HeaderMap, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Response of `POST /upload`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivedBytes {
    /// Bytes accumulated (0 when the client aborted)
    pub received_bytes: usize,
}

/// POST /upload - Accumulate a raw body
///
/// A declared `Content-Length` above `upload_limit` is refused before any
/// byte is read.
pub async fn upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Body,
) -> Result<Json<ReceivedBytes>, FormError> {
    let declared = content_length(&headers);
    let limit = state.config.upload_limit;
    if declared as u64 > limit {
        debug!(declared, limit, "declared upload length over limit");
        return Err(FormError::BodyTooLarge { limit });
    }

    let mut body = incoming(body);
    let buffer = accumulate_body(&mut body, declared, false).await;
    Ok(Json(ReceivedBytes {
        received_bytes: buffer.len(),
    }))
}

/// POST /body - Parse a limited body and echo it back
pub async fn echo_body(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Body,
) -> Result<Response, FormError> {
    let mut body = incoming(body);
    let parsed = parse_simple_body(&mut body, content_type(&headers), state.config.body_limit).await?;

    Ok(match parsed {
        SimpleBody::Text(text) => text.into_response(),
        SimpleBody::Json(value) => Json(value).into_response(),
        SimpleBody::Raw(bytes) => (
            [(header::CONTENT_TYPE, "application/octet-stream")],
            bytes,
        )
            .into_response(),
    })
}
