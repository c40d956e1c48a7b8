//! Form handlers: multipart and urlencoded bodies through the ingestion engine.

use super::{content_type, incoming};
use crate::api::AppState;
use crate::config::{IngestConfig, StorageMode};
use crate::error::FormError;
use crate::parse_form_data_body;
use crate::types::FormData;
use axum::{Json, body::Body, extract::State, http::HeaderMap, response::IntoResponse};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

/// Response of the form routes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartsReceived {
    /// Fields plus files in the parsed form
    pub parts_received: usize,
}

/// POST /multipart/disk - Parse a form in disk mode
///
/// The stored files are removed once they are counted.
pub async fn multipart_disk(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Body,
) -> Result<impl IntoResponse, FormError> {
    let config = IngestConfig {
        storage: StorageMode::Disk,
        ..(*state.config).clone()
    };
    let form = ingest(&headers, body, &config).await?;
    remove_stored_files(&form).await;

    Ok(Json(PartsReceived {
        parts_received: form.parts_received(),
    }))
}

/// POST /multipart/memory - Parse a form in memory mode
pub async fn multipart_memory(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Body,
) -> Result<impl IntoResponse, FormError> {
    let config = IngestConfig {
        storage: StorageMode::Memory,
        ..(*state.config).clone()
    };
    let form = ingest(&headers, body, &config).await?;

    Ok(Json(PartsReceived {
        parts_received: form.parts_received(),
    }))
}

async fn ingest(headers: &HeaderMap, body: Body, config: &IngestConfig) -> Result<FormData, FormError> {
    let mut body = incoming(body);
    parse_form_data_body(content_type(headers), &mut body, config).await
}

async fn remove_stored_files(form: &FormData) {
    let Some(files) = form.files.as_disk() else {
        return;
    };
    let paths: Vec<PathBuf> = files.values().filter_map(|file| file.path.clone()).collect();
    for path in paths {
        if let Err(e) = tokio::fs::remove_file(&path).await {
            warn!(path = ?path, error = %e, "failed to remove uploaded file");
        }
    }
}
