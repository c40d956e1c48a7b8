//! Error types for form-ingest
//!
//! This module provides:
//! - [`FormError`], the terminal failure value of an ingestion run
//! - [`CodeClass`], the HTTP status family a failure belongs to
//! - [`Error`], the crate error for operations outside an ingestion run
//! - HTTP status code mapping and a structured JSON error envelope

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for form-ingest operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for operations that are not part of an ingestion outcome
/// (configuration checks, feeding bytes into a body).
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "write_queue_depth")
        key: Option<String>,
    },

    /// The consuming side of a body went away
    #[error("body receiver closed")]
    Closed,

    /// The body was aborted by the client
    #[error("body aborted")]
    Aborted,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// HTTP status family of a failed ingestion.
///
/// Serializes as `"400"` / `"500"`, which is what callers write back as the
/// response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CodeClass {
    /// Bad input from the client, limits, duplicates, aborts
    #[serde(rename = "400")]
    ClientError,
    /// Destination I/O failed
    #[serde(rename = "500")]
    ServerError,
}

impl CodeClass {
    /// Status code string as written on the wire
    pub fn as_str(self) -> &'static str {
        match self {
            CodeClass::ClientError => "400",
            CodeClass::ServerError => "500",
        }
    }

    /// Numeric HTTP status code
    pub fn status_code(self) -> u16 {
        match self {
            CodeClass::ClientError => 400,
            CodeClass::ServerError => 500,
        }
    }
}

impl std::fmt::Display for CodeClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal failure of an ingestion run.
///
/// The `Display` text is the stable message handed back to clients; no
/// internal state crosses this boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    /// Content type is neither multipart nor urlencoded
    #[error("Unsupported content type: {0}")]
    UnsupportedContentType(String),

    /// Multipart content type without a boundary parameter
    #[error("Multipart: Boundary not found")]
    MissingBoundary,

    /// The decoder rejected the body
    #[error("{0}")]
    Malformed(String),

    /// The parts, fields or files count limit was exceeded
    #[error("Too many parts in request")]
    TooManyParts,

    /// A field name is longer than the configured limit
    #[error("Field name is too long. Limit in bytes - {limit}")]
    FieldNameTooLong {
        /// Configured maximum name length in bytes
        limit: usize,
    },

    /// A field value is longer than the configured limit
    #[error("Field {name} is too large")]
    FieldTooLarge {
        /// Name of the offending field
        name: String,
    },

    /// A part carries more header lines than allowed
    #[error("Too many header pairs in part")]
    TooManyHeaderPairs,

    /// A file exceeded the per-file size limit
    #[error("File {filename} is too large")]
    FileTooLarge {
        /// Client supplied filename of the offending file
        filename: String,
    },

    /// A field name was repeated while repeated parts are disabled
    #[error("Field duplicate")]
    DuplicateField {
        /// The repeated field name
        name: String,
    },

    /// A file name was repeated while repeated parts are disabled
    #[error("File duplicate")]
    DuplicateFile {
        /// The repeated part name
        name: String,
    },

    /// Creating or writing a destination file failed
    #[error("{0}")]
    Write(String),

    /// The client aborted the request
    #[error("aborted")]
    Aborted,

    /// A whole body exceeded its byte limit
    #[error("Body is too large. Limit in bytes - {limit}")]
    BodyTooLarge {
        /// Configured limit in bytes
        limit: u64,
    },

    /// A whole body could not be parsed for its content type
    #[error("Invalid body: {0}")]
    InvalidBody(String),
}

impl FormError {
    /// Build a write failure from an I/O error
    pub fn write(err: &std::io::Error) -> Self {
        FormError::Write(err.to_string())
    }

    /// The status family of this failure.
    ///
    /// Only destination I/O is a server error.
    pub fn code_class(&self) -> CodeClass {
        match self {
            FormError::Write(_) => CodeClass::ServerError,
            _ => CodeClass::ClientError,
        }
    }

    /// Whether this failure was caused by a client abort
    pub fn is_aborted(&self) -> bool {
        matches!(self, FormError::Aborted)
    }
}

/// API error response format
///
/// Returned by the HTTP adapter when an ingestion fails.
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "file_too_large",
///     "message": "File cat.png is too large",
///     "details": {
///       "filename": "cat.png"
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "field_duplicate")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for FormError {
    fn status_code(&self) -> u16 {
        self.code_class().status_code()
    }

    fn error_code(&self) -> &str {
        match self {
            FormError::UnsupportedContentType(_) => "unsupported_content_type",
            FormError::MissingBoundary => "missing_boundary",
            FormError::Malformed(_) => "malformed_body",
            FormError::TooManyParts => "too_many_parts",
            FormError::FieldNameTooLong { .. } => "field_name_too_long",
            FormError::FieldTooLarge { .. } => "field_too_large",
            FormError::TooManyHeaderPairs => "too_many_header_pairs",
            FormError::FileTooLarge { .. } => "file_too_large",
            FormError::DuplicateField { .. } => "field_duplicate",
            FormError::DuplicateFile { .. } => "file_duplicate",
            FormError::Write(_) => "write_failed",
            FormError::Aborted => "aborted",
            FormError::BodyTooLarge { .. } => "body_too_large",
            FormError::InvalidBody(_) => "invalid_body",
        }
    }
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            Error::Config { .. } => 500,
            Error::Closed => 500,
            Error::Aborted => 400,
            Error::Io(_) => 500,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Closed => "body_closed",
            Error::Aborted => "aborted",
            Error::Io(_) => "io_error",
        }
    }
}

impl From<&FormError> for ApiError {
    fn from(error: &FormError) -> Self {
        let details = match error {
            FormError::FileTooLarge { filename } => Some(serde_json::json!({
                "filename": filename,
            })),
            FormError::FieldTooLarge { name }
            | FormError::DuplicateField { name }
            | FormError::DuplicateFile { name } => Some(serde_json::json!({
                "name": name,
            })),
            FormError::FieldNameTooLong { limit } => Some(serde_json::json!({
                "limit_bytes": limit,
            })),
            FormError::BodyTooLarge { limit } => Some(serde_json::json!({
                "limit_bytes": limit,
            })),
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code: error.error_code().to_string(),
                message: error.to_string(),
                details,
            },
        }
    }
}

impl From<FormError> for ApiError {
    fn from(error: FormError) -> Self {
        ApiError::from(&error)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    /// Every FormError variant with its expected status and error code.
    fn all_form_errors() -> Vec<(FormError, u16, &'static str)> {
        vec![
            (
                FormError::UnsupportedContentType("text/plain".into()),
                400,
                "unsupported_content_type",
            ),
            (FormError::MissingBoundary, 400, "missing_boundary"),
            (
                FormError::Malformed("Unexpected end of form".into()),
                400,
                "malformed_body",
            ),
            (FormError::TooManyParts, 400, "too_many_parts"),
            (
                FormError::FieldNameTooLong { limit: 100 },
                400,
                "field_name_too_long",
            ),
            (
                FormError::FieldTooLarge { name: "bio".into() },
                400,
                "field_too_large",
            ),
            (FormError::TooManyHeaderPairs, 400, "too_many_header_pairs"),
            (
                FormError::FileTooLarge {
                    filename: "a.bin".into(),
                },
                400,
                "file_too_large",
            ),
            (
                FormError::DuplicateField { name: "a".into() },
                400,
                "field_duplicate",
            ),
            (
                FormError::DuplicateFile { name: "a".into() },
                400,
                "file_duplicate",
            ),
            (FormError::Write("disk full".into()), 500, "write_failed"),
            (FormError::Aborted, 400, "aborted"),
            (FormError::BodyTooLarge { limit: 10 }, 400, "body_too_large"),
            (
                FormError::InvalidBody("expected value".into()),
                400,
                "invalid_body",
            ),
        ]
    }

    #[test]
    fn test_every_form_error_maps_to_expected_status_and_code() {
        for (error, status, code) in all_form_errors() {
            assert_eq!(error.status_code(), status, "status for {error:?}");
            assert_eq!(error.error_code(), code, "code for {error:?}");
        }
    }

    #[test]
    fn test_only_write_failures_are_server_errors() {
        for (error, _, _) in all_form_errors() {
            let expected = if matches!(error, FormError::Write(_)) {
                CodeClass::ServerError
            } else {
                CodeClass::ClientError
            };
            assert_eq!(error.code_class(), expected, "class for {error:?}");
        }
    }

    #[test]
    fn test_messages_are_stable() {
        assert_eq!(
            FormError::DuplicateField { name: "x".into() }.to_string(),
            "Field duplicate"
        );
        assert_eq!(
            FormError::DuplicateFile { name: "x".into() }.to_string(),
            "File duplicate"
        );
        assert_eq!(
            FormError::FileTooLarge {
                filename: "cat.png".into()
            }
            .to_string(),
            "File cat.png is too large"
        );
        assert_eq!(
            FormError::BodyTooLarge { limit: 10 }.to_string(),
            "Body is too large. Limit in bytes - 10"
        );
        assert_eq!(FormError::TooManyParts.to_string(), "Too many parts in request");
        assert_eq!(FormError::Aborted.to_string(), "aborted");
    }

    #[test]
    fn test_write_error_keeps_io_message() {
        let io = std::io::Error::new(std::io::ErrorKind::StorageFull, "no space left");
        let error = FormError::write(&io);
        assert_eq!(error.to_string(), "no space left");
        assert_eq!(error.code_class(), CodeClass::ServerError);
    }

    #[test]
    fn test_code_class_serializes_as_status_string() {
        assert_eq!(
            serde_json::to_string(&CodeClass::ClientError).unwrap(),
            "\"400\""
        );
        assert_eq!(
            serde_json::to_string(&CodeClass::ServerError).unwrap(),
            "\"500\""
        );
        let parsed: CodeClass = serde_json::from_str("\"500\"").unwrap();
        assert_eq!(parsed, CodeClass::ServerError);
        assert_eq!(CodeClass::ClientError.to_string(), "400");
    }

    #[test]
    fn test_api_error_carries_details_for_named_failures() {
        let api: ApiError = FormError::FileTooLarge {
            filename: "cat.png".into(),
        }
        .into();
        assert_eq!(api.error.code, "file_too_large");
        assert_eq!(api.error.message, "File cat.png is too large");
        assert_eq!(api.error.details.unwrap()["filename"], "cat.png");

        let api: ApiError = FormError::Aborted.into();
        assert!(api.error.details.is_none());
        let json = serde_json::to_value(&api).unwrap();
        assert!(json["error"].get("details").is_none());
    }

    #[test]
    fn test_crate_error_status_codes() {
        let config = Error::Config {
            message: "write_queue_depth must be at least 1".into(),
            key: Some("write_queue_depth".into()),
        };
        assert_eq!(config.status_code(), 500);
        assert_eq!(config.error_code(), "config_error");
        assert!(config.to_string().contains("write_queue_depth"));
        assert_eq!(Error::Aborted.status_code(), 400);
        assert_eq!(Error::Closed.error_code(), "body_closed");
    }
}
