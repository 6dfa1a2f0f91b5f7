// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Core infrastructure for typecomp.
//!
//! This crate provides language-agnostic infrastructure:
//! - Error types and error codes
//! - Positions, spans, and text edits
//! - Text position utilities
//! - Completion settings
//! - Workspace file discovery
//! - JSON response envelopes for the CLI

pub mod error;
pub mod output;
pub mod settings;
pub mod text;
pub mod types;
pub mod workspace;
