// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Text position utilities for byte offset and line:character conversions.
//!
//! ## Coordinate Conventions
//!
//! - Lines and characters are **0-indexed** (editor protocol convention)
//! - Characters count Unicode scalar values, not bytes
//! - Byte offsets are **0-indexed**
//!
//! Positions past the end of a line clamp to the line end; lines past the end
//! of the buffer clamp to the buffer end.

use crate::types::Position;

// ============================================================================
// Conversions
// ============================================================================

/// Convert a byte offset to a 0-indexed [`Position`].
///
/// Offsets beyond the buffer, or inside a multi-byte character, resolve to
/// the nearest preceding character boundary.
pub fn byte_offset_to_position(content: &str, offset: usize) -> Position {
    let mut line = 0u32;
    let mut character = 0u32;

    for (i, ch) in content.char_indices() {
        if i >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            character = 0;
        } else {
            character += 1;
        }
    }

    Position { line, character }
}

/// Convert a 0-indexed [`Position`] to a byte offset.
pub fn position_to_byte_offset(content: &str, position: Position) -> usize {
    let Some(line_start) = line_start_offset(content, position.line) else {
        return content.len();
    };

    let rest = &content[line_start..];
    let line_len = rest.find('\n').unwrap_or(rest.len());
    let line_text = &rest[..line_len];

    line_text
        .char_indices()
        .nth(position.character as usize)
        .map(|(i, _)| line_start + i)
        .unwrap_or(line_start + line_len)
}

/// Byte offset where 0-indexed `line` begins, or `None` past the last line.
pub fn line_start_offset(content: &str, line: u32) -> Option<usize> {
    if line == 0 {
        return Some(0);
    }
    content
        .match_indices('\n')
        .nth(line as usize - 1)
        .map(|(i, _)| i + 1)
}

/// Text of 0-indexed `line` without its terminator.
pub fn line_text(content: &str, line: u32) -> Option<&str> {
    let start = line_start_offset(content, line)?;
    let rest = &content[start..];
    let end = rest.find('\n').unwrap_or(rest.len());
    Some(rest[..end].trim_end_matches('\r'))
}

/// The part of `position.line` that lies before the cursor.
pub fn line_prefix(content: &str, position: Position) -> &str {
    let Some(start) = line_start_offset(content, position.line) else {
        return "";
    };
    let end = position_to_byte_offset(content, position);
    &content[start..end.max(start)]
}

// ============================================================================
// Tests
// ============================================================================
