//! typecomp: type-annotation completions for Python.
//!
//! Parses Python sources, extracts type-like declarations into a
//! file-partitioned registry, and serves cached, ranked completion lists
//! built from that registry plus a static catalog of builtin and `typing`
//! types.

// Core infrastructure - re-exported from typecomp-core
pub use typecomp_core::error;
pub use typecomp_core::output;
pub use typecomp_core::settings;
pub use typecomp_core::text;
pub use typecomp_core::types;
pub use typecomp_core::workspace;

// Completion engine - re-exported from typecomp-python
pub use typecomp_python::cache;
pub use typecomp_python::catalog;
pub use typecomp_python::completion;
pub use typecomp_python::declarations;
pub use typecomp_python::document;
pub use typecomp_python::imports;
pub use typecomp_python::registry;
pub use typecomp_python::session;
pub use typecomp_python::syntax;

// Front door
pub mod cli;
