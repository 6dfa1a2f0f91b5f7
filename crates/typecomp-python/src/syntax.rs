// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Syntax tree service: a thin wrapper over the tree-sitter Python grammar.
//!
//! The service owns at most one tree at a time. Every [`parse`] replaces the
//! previous tree wholesale; there is no incremental re-parse.
//!
//! If the grammar cannot be installed into the parser the service runs as a
//! stub: `parse` still records the source text, but no tree is produced and
//! every query answers empty. Callers never see an error from this module.
//!
//! [`parse`]: SyntaxTreeService::parse

use thiserror::Error;
use tree_sitter::{Node, Parser, Tree};
use typecomp_core::text::position_to_byte_offset;
use typecomp_core::types::Position;

// ============================================================================
// Error Types
// ============================================================================

/// Failure to bring up the grammar. Logged and absorbed into stub mode.
#[derive(Debug, Error)]
pub enum SyntaxError {
    #[error("python grammar unavailable: {0}")]
    GrammarUnavailable(String),
}

// ============================================================================
// Traversal
// ============================================================================

/// What a pre-order visitor wants to happen after seeing a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkControl {
    /// Descend into the node's children.
    Continue,
    /// Move on to the next sibling without visiting children.
    SkipChildren,
    /// End the walk immediately.
    Stop,
}

/// Pre-order walk over `root` and its descendants (named and anonymous).
///
/// The walk never leaves the subtree rooted at `root`.
pub fn walk_preorder<'t>(root: Node<'t>, mut visit: impl FnMut(Node<'t>) -> WalkControl) {
    let mut cursor = root.walk();
    loop {
        match visit(cursor.node()) {
            WalkControl::Stop => return,
            WalkControl::Continue if cursor.goto_first_child() => continue,
            _ => {}
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return;
            }
        }
    }
}

/// Named children of `node`, in source order.
pub fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

/// Children of `node` attached to grammar field `field`, in source order.
pub fn field_children<'t>(node: Node<'t>, field: &str) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children_by_field_name(field, &mut cursor).collect()
}

// ============================================================================
// Syntax Tree Service
// ============================================================================

/// Parses Python source into a syntax tree and answers queries over it.
pub struct SyntaxTreeService {
    parser: Option<Parser>,
    tree: Option<Tree>,
    source: String,
}

impl std::fmt::Debug for SyntaxTreeService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyntaxTreeService")
            .field("stub", &self.is_stub())
            .field("has_tree", &self.tree.is_some())
            .field("source_len", &self.source.len())
            .finish()
    }
}

impl Default for SyntaxTreeService {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntaxTreeService {
    /// Create a service backed by the Python grammar, falling back to a stub
    /// if the grammar cannot be loaded.
    pub fn new() -> Self {
        match python_parser() {
            Ok(parser) => SyntaxTreeService {
                parser: Some(parser),
                tree: None,
                source: String::new(),
            },
            Err(err) => {
                tracing::warn!(error = %err, "syntax service degraded to stub");
                Self::stub()
            }
        }
    }

    /// Create a service with no grammar. Every parse yields an empty tree.
    pub fn stub() -> Self {
        SyntaxTreeService {
            parser: None,
            tree: None,
            source: String::new(),
        }
    }

    /// Whether this service is running without a grammar.
    pub fn is_stub(&self) -> bool {
        self.parser.is_none()
    }

    /// Parse `source`, replacing any previously held tree.
    ///
    /// Returns `true` if a tree was produced. Syntax errors in the source do
    /// not prevent a tree; tree-sitter recovers and marks error nodes.
    pub fn parse(&mut self, source: &str) -> bool {
        self.source.clear();
        self.source.push_str(source);
        self.tree = match self.parser.as_mut() {
            Some(parser) => parser.parse(source, None),
            None => None,
        };
        if self.tree.is_none() && !self.is_stub() {
            tracing::debug!(len = source.len(), "parser returned no tree");
        }
        self.tree.is_some()
    }

    /// Source text of the most recent parse.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Root node of the current tree.
    pub fn root(&self) -> Option<Node<'_>> {
        self.tree.as_ref().map(|tree| tree.root_node())
    }

    /// Verbatim source text covered by `node`.
    pub fn node_text(&self, node: Node<'_>) -> &str {
        node_text(node, &self.source)
    }

    /// Smallest node covering the given editor position.
    pub fn node_at(&self, position: Position) -> Option<Node<'_>> {
        let root = self.root()?;
        let offset = position_to_byte_offset(&self.source, position);
        root.descendant_for_byte_range(offset, offset)
    }

    /// Collect every node under `root` (default: the tree root) satisfying
    /// `predicate`, in pre-order.
    pub fn find_all<'t>(
        &'t self,
        root: Option<Node<'t>>,
        mut predicate: impl FnMut(Node<'t>) -> bool,
    ) -> Vec<Node<'t>> {
        let Some(start) = root.or_else(|| self.root()) else {
            return Vec::new();
        };
        let mut found = Vec::new();
        walk_preorder(start, |node| {
            if predicate(node) {
                found.push(node);
            }
            WalkControl::Continue
        });
        found
    }

    /// Pre-order traversal of the whole tree. No-op when there is no tree.
    pub fn traverse<'t>(&'t self, visit: impl FnMut(Node<'t>) -> WalkControl) {
        if let Some(root) = self.root() {
            walk_preorder(root, visit);
        }
    }
}

/// Verbatim text of `node` within `source`; empty if the span is not valid UTF-8.
pub fn node_text<'s>(node: Node<'_>, source: &'s str) -> &'s str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}

fn python_parser() -> Result<Parser, SyntaxError> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|e| SyntaxError::GrammarUnavailable(e.to_string()))?;
    Ok(parser)
}

// ============================================================================
// Tests
// ============================================================================
