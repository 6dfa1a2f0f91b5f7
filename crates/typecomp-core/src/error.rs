// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Error types and error code constants for typecomp.
//!
//! `TypecompError` is the unified error type that subsystem errors bridge
//! into at the outer surface (the CLI). Engine-internal failures such as parse
//! errors or unreadable files are swallowed close to where they happen and
//! never reach this type; only caller mistakes and I/O at the edges do.
//!
//! ## Error Code Mapping
//!
//! - `2`: Invalid arguments (bad input from caller)
//! - `3`: Resolution errors (file not found)
//! - `10`: Internal errors (bugs, unexpected state)

use std::fmt;

use thiserror::Error;

// ============================================================================
// Output Error Codes
// ============================================================================

/// Stable numeric codes, used as process exit codes by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OutputErrorCode {
    /// Invalid arguments from caller (bad input, malformed request).
    InvalidArguments = 2,
    /// Resolution errors (file not found).
    ResolutionError = 3,
    /// Internal errors (bugs, unexpected state).
    InternalError = 10,
}

impl OutputErrorCode {
    /// Get the numeric code value.
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for OutputErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Unified Error Type
// ============================================================================

/// Unified error type for the outer surface.
#[derive(Debug, Error)]
pub enum TypecompError {
    /// Invalid arguments from caller.
    #[error("invalid arguments: {message}")]
    InvalidArguments { message: String },

    /// File not found.
    #[error("file not found: {path}")]
    FileNotFound { path: String },

    /// Configuration could not be read or parsed.
    #[error("invalid configuration: {message}")]
    Config { message: String },

    /// Internal error (bug or unexpected state).
    #[error("internal error: {message}")]
    InternalError { message: String },
}

impl From<&TypecompError> for OutputErrorCode {
    fn from(err: &TypecompError) -> Self {
        match err {
            TypecompError::InvalidArguments { .. } => OutputErrorCode::InvalidArguments,
            TypecompError::Config { .. } => OutputErrorCode::InvalidArguments,
            TypecompError::FileNotFound { .. } => OutputErrorCode::ResolutionError,
            TypecompError::InternalError { .. } => OutputErrorCode::InternalError,
        }
    }
}

impl From<std::io::Error> for TypecompError {
    fn from(err: std::io::Error) -> Self {
        TypecompError::InternalError {
            message: format!("IO error: {}", err),
        }
    }
}

impl From<crate::settings::SettingsError> for TypecompError {
    fn from(err: crate::settings::SettingsError) -> Self {
        TypecompError::Config {
            message: err.to_string(),
        }
    }
}

impl From<crate::workspace::ScanError> for TypecompError {
    fn from(err: crate::workspace::ScanError) -> Self {
        use crate::workspace::ScanError;
        match err {
            ScanError::RootNotFound { path } => TypecompError::FileNotFound {
                path: path.to_string_lossy().into_owned(),
            },
            ScanError::InvalidPattern { pattern, reason } => TypecompError::InvalidArguments {
                message: format!("invalid glob pattern '{}': {}", pattern, reason),
            },
            ScanError::Walk(walk_err) => TypecompError::InternalError {
                message: format!("workspace walk failed: {}", walk_err),
            },
        }
    }
}

// ============================================================================
// Convenience Constructors
// ============================================================================

impl TypecompError {
    /// Create an invalid arguments error.
    pub fn invalid_args(message: impl Into<String>) -> Self {
        TypecompError::InvalidArguments {
            message: message.into(),
        }
    }

    /// Create a file not found error.
    pub fn file_not_found(path: impl Into<String>) -> Self {
        TypecompError::FileNotFound { path: path.into() }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        TypecompError::InternalError {
            message: message.into(),
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> OutputErrorCode {
        OutputErrorCode::from(self)
    }
}

// ============================================================================
// Tests
// ============================================================================
