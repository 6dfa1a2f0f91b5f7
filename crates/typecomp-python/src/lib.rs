//! Python type-symbol extraction and completion engine.
//!
//! This crate provides the completion core for Python type annotations.
//! It includes:
//! - A syntax tree service over tree-sitter's Python grammar
//! - A static catalog of builtin and `typing` types
//! - A declaration analyzer and the file-partitioned symbol registry
//! - A versioned result cache and the completion candidate builder
//! - The [`session::Session`] that ties them to editor events

pub mod cache;
pub mod catalog;
pub mod completion;
pub mod declarations;
pub mod document;
pub mod imports;
pub mod registry;
pub mod session;
pub mod syntax;

pub use completion::{CandidateSource, CompletionCandidate, CompletionRequest, InsertText};
pub use document::{Document, DocumentId};
pub use registry::{RegistryError, TypeRegistry};
pub use session::{ScanSummary, Session, SessionError};
