// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! JSON response envelopes for CLI output.
//!
//! Every response carries `status` first and a `schema_version`, so
//! consumers can branch on success before reading the payload. Output is
//! deterministic: the same input produces identical bytes.

use std::io::{self, Write};

use serde::Serialize;

use crate::error::{OutputErrorCode, TypecompError};

/// Current schema version for all responses.
pub const SCHEMA_VERSION: &str = "1";

/// Successful response wrapping a command-specific payload.
#[derive(Debug, Clone, Serialize)]
pub struct OkResponse<T> {
    /// Status: "ok".
    pub status: String,
    /// Schema version for compatibility.
    pub schema_version: String,
    #[serde(flatten)]
    pub payload: T,
}

impl<T> OkResponse<T> {
    pub fn new(payload: T) -> Self {
        OkResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            payload,
        }
    }
}

/// Error details for JSON output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorInfo {
    /// Numeric error code, also the process exit code.
    pub code: u8,
    /// Human-readable message.
    pub message: String,
}

impl ErrorInfo {
    pub fn from_error(err: &TypecompError) -> Self {
        ErrorInfo {
            code: OutputErrorCode::from(err).code(),
            message: err.to_string(),
        }
    }
}

/// Error response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Status: "error".
    pub status: String,
    /// Schema version for compatibility.
    pub schema_version: String,
    pub error: ErrorInfo,
}

impl ErrorResponse {
    pub fn from_error(err: &TypecompError) -> Self {
        ErrorResponse {
            status: "error".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            error: ErrorInfo::from_error(err),
        }
    }
}

/// Emit a response as pretty-printed JSON to a writer.
///
/// This is the single output path for the CLI.
pub fn emit_response<T: Serialize>(response: &T, writer: &mut impl Write) -> io::Result<()> {
    let json = serde_json::to_string_pretty(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Payload {
        count: usize,
    }

    #[test]
    fn ok_response_flattens_payload_after_status() {
        let mut out = Vec::new();
        emit_response(&OkResponse::new(Payload { count: 3 }), &mut out).unwrap();
        let json = String::from_utf8(out).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["status"], "ok");
        assert_eq!(value["schema_version"], "1");
        assert_eq!(value["count"], 3);
        assert!(json.find("status").unwrap() < json.find("count").unwrap());
    }

    #[test]
    fn error_response_carries_code() {
        let err = TypecompError::file_not_found("missing.py");
        let response = ErrorResponse::from_error(&err);
        assert_eq!(response.status, "error");
        assert_eq!(response.error.code, 3);
        assert!(response.error.message.contains("missing.py"));
    }
}
