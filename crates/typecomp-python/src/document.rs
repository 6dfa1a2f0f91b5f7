// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Editor documents as the engine sees them.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use typecomp_core::text::line_text;

/// Stable, URI-like identity of an editor document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(uri: impl Into<String>) -> Self {
        DocumentId(uri.into())
    }

    /// Identity for a file on disk (`file://` URI).
    pub fn from_path(path: &Path) -> Self {
        DocumentId(format!("file://{}", path.display()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An open document: identity, defining file path, full text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: DocumentId,
    pub path: PathBuf,
    pub text: String,
}

impl Document {
    pub fn new(id: DocumentId, path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Document {
            id,
            path: path.into(),
            text: text.into(),
        }
    }

    /// Document for a file path, with a `file://` identity.
    pub fn from_path(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        let path = path.into();
        Document {
            id: DocumentId::from_path(&path),
            path,
            text: text.into(),
        }
    }

    /// Text of 0-indexed line `n`, without terminator.
    pub fn line(&self, n: u32) -> Option<&str> {
        line_text(&self.text, n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_path_builds_file_uri() {
        let doc = Document::from_path("/ws/app.py", "x = 1\n");
        assert_eq!(doc.id.as_str(), "file:///ws/app.py");
        assert_eq!(doc.path, PathBuf::from("/ws/app.py"));
    }

    #[test]
    fn line_accessor() {
        let doc = Document::new(DocumentId::new("untitled:1"), "a.py", "first\r\nsecond\n");
        assert_eq!(doc.line(0), Some("first"));
        assert_eq!(doc.line(1), Some("second"));
        assert_eq!(doc.line(2), Some(""));
        assert_eq!(doc.line(3), None);
    }
}
