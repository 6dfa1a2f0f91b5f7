// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Completion settings.
//!
//! The host owns configuration loading; this module only defines the shape
//! the engine reads, with defaults for every field so a partial JSON object
//! (or none at all) is always valid.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors reading or parsing a settings file.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("cannot read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed settings JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Flags and priorities that shape completion output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompletionSettings {
    /// Insert `Name[$1]` for refinable candidates instead of the bare name.
    pub append_brackets: bool,
    /// Offer symbols discovered in workspace sources.
    pub enable_custom_types: bool,
    /// Offer builtin and typing-module catalog entries.
    pub enable_base_types: bool,
    /// Sort-key prefix for `[custom]` candidates. Lower sorts first.
    pub custom_priority: u8,
    /// Sort-key prefix for `[builtin]` candidates.
    pub builtin_priority: u8,
    /// Sort-key prefix for `[typing]` candidates.
    pub typing_priority: u8,
    /// Glob patterns selecting files for the workspace scan.
    pub include: Vec<String>,
    /// Glob patterns removed from the workspace scan.
    pub exclude: Vec<String>,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        CompletionSettings {
            append_brackets: true,
            enable_custom_types: true,
            enable_base_types: true,
            custom_priority: 0,
            builtin_priority: 1,
            typing_priority: 2,
            include: vec!["**/*.py".to_string()],
            exclude: Vec::new(),
        }
    }
}

impl CompletionSettings {
    /// Parse settings from a JSON object. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a JSON settings file.
    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let text = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }
}
