// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Common value types shared across the engine.
//!
//! These are the shapes the host editor hands us (positions) and the shapes we
//! hand back (spans and text edits). The engine never applies edits itself.

use serde::{Deserialize, Serialize};

// ============================================================================
// Position
// ============================================================================

/// Editor position: 0-indexed line and 0-indexed character.
///
/// `character` counts Unicode scalar values within the line, matching the way
/// editors report cursor columns.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Position {
    /// Line number (0-indexed).
    pub line: u32,
    /// Character offset within the line (0-indexed).
    pub character: u32,
}

impl Position {
    pub fn new(line: u32, character: u32) -> Self {
        Position { line, character }
    }
}

// ============================================================================
// Span
// ============================================================================

/// Half-open byte range `[start, end)` into a source buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    /// Zero-width span at `offset`, used for pure insertions.
    pub fn empty(offset: usize) -> Self {
        Span {
            start: offset,
            end: offset,
        }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `offset` falls inside the span (end-exclusive).
    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }
}

// ============================================================================
// Text Edit
// ============================================================================

/// A single replacement the host applies to a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextEdit {
    /// Byte range being replaced (empty for insertion).
    pub span: Span,
    /// Replacement text.
    pub new_text: String,
}

impl TextEdit {
    pub fn insert(offset: usize, text: impl Into<String>) -> Self {
        TextEdit {
            span: Span::empty(offset),
            new_text: text.into(),
        }
    }

    pub fn replace(span: Span, text: impl Into<String>) -> Self {
        TextEdit {
            span,
            new_text: text.into(),
        }
    }

    /// Apply this edit to `content`, returning the new buffer.
    ///
    /// Spans past the end of `content` are clamped.
    pub fn apply(&self, content: &str) -> String {
        let start = self.span.start.min(content.len());
        let end = self.span.end.clamp(start, content.len());
        let mut out = String::with_capacity(content.len() + self.new_text.len());
        out.push_str(&content[..start]);
        out.push_str(&self.new_text);
        out.push_str(&content[end..]);
        out
    }
}

// ============================================================================
// Tests
// ============================================================================
