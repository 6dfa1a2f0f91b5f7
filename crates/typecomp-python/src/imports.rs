// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Import bookkeeping for `typing` candidates.
//!
//! Accepting a `[typing]` candidate may require an import. This module reads
//! the document's top-level imports once per parse ([`TypingImports::collect`])
//! and then answers, per name, whether the name is already usable, usable
//! under a qualified spelling, or needs a deferred [`ImportEdit`].
//!
//! The engine never applies edits; it attaches them to candidates and the
//! host applies them when that candidate is accepted.

use std::collections::BTreeMap;

use serde::Serialize;
use tree_sitter::Node;
use typecomp_core::types::TextEdit;

use crate::catalog::is_typing_module;
use crate::syntax::{field_children, named_children, node_text, SyntaxTreeService};

/// Module new imports are written against.
pub const TYPING_MODULE: &str = "typing";

// ============================================================================
// Edits
// ============================================================================

/// Deferred import edit attached to a candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportEdit {
    pub module: String,
    pub name: String,
    pub edits: Vec<TextEdit>,
}

/// How a typing name can be used in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportResolution {
    /// The bare name is already bound.
    AlreadyImported,
    /// Usable under this spelling (`typing.List`, or a `from` alias).
    Qualified(String),
    /// Usable after applying the edit.
    Needs(ImportEdit),
}

// ============================================================================
// Collection
// ============================================================================

/// What a document's top-level imports say about `typing` names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypingImports {
    /// Typing name to the name it is bound under.
    bound: BTreeMap<String, String>,
    /// `from typing import *` present.
    wildcard: bool,
    /// Binding of `import typing` / `import typing as t`.
    module_alias: Option<String>,
    /// Offset just after the last name of the first extendable
    /// `from typing import ...` statement.
    extend_at: Option<usize>,
    /// Offset for a new statement: start of the line after the docstring
    /// and `__future__` imports.
    insert_at: usize,
    /// Whether `insert_at` sits at the end of a file lacking a final newline.
    needs_leading_newline: bool,
}

impl TypingImports {
    /// Read the top-level statements of the service's current tree.
    ///
    /// Without a tree (stub mode) the document looks import-free and edits
    /// insert at offset 0.
    pub fn collect(syntax: &SyntaxTreeService) -> Self {
        let mut imports = TypingImports::default();
        let Some(root) = syntax.root() else {
            return imports;
        };
        let source = syntax.source();

        let mut header_end = None;
        for (index, statement) in named_children(root).into_iter().enumerate() {
            match statement.kind() {
                "expression_statement" if index == 0 && is_docstring(statement) => {
                    header_end = Some(statement.end_byte());
                }
                "future_import_statement" => header_end = Some(statement.end_byte()),
                "import_from_statement" => imports.record_from_import(statement, source),
                "import_statement" => imports.record_import(statement, source),
                _ => {}
            }
        }

        if let Some(end) = header_end {
            match source[end..].find('\n') {
                Some(newline) => imports.insert_at = end + newline + 1,
                None => {
                    imports.insert_at = source.len();
                    imports.needs_leading_newline = true;
                }
            }
        }
        imports
    }

    fn record_from_import(&mut self, statement: Node<'_>, source: &str) {
        let Some(module) = statement.child_by_field_name("module_name") else {
            return;
        };
        if !is_typing_module(node_text(module, source)) {
            return;
        }

        let names = field_children(statement, "name");
        if names.is_empty() {
            self.wildcard |= named_children(statement)
                .iter()
                .any(|child| child.kind() == "wildcard_import");
            return;
        }

        for item in &names {
            if let Some(imported) = imported_name(*item, source) {
                self.bound
                    .insert(imported.name.to_string(), imported.binding().to_string());
            }
        }
        if self.extend_at.is_none() && node_text(module, source) == TYPING_MODULE {
            self.extend_at = names.last().map(|last| last.end_byte());
        }
    }

    fn record_import(&mut self, statement: Node<'_>, source: &str) {
        for item in field_children(statement, "name") {
            let Some(imported) = imported_name(item, source) else {
                continue;
            };
            if imported.name == TYPING_MODULE && self.module_alias.is_none() {
                self.module_alias = Some(imported.binding().to_string());
            }
        }
    }

    /// Decide how `name` (a typing catalog entry) can be used here.
    pub fn resolve(&self, name: &str) -> ImportResolution {
        if let Some(binding) = self.bound.get(name) {
            return if binding == name {
                ImportResolution::AlreadyImported
            } else {
                ImportResolution::Qualified(binding.clone())
            };
        }
        if self.wildcard {
            return ImportResolution::AlreadyImported;
        }
        if let Some(alias) = &self.module_alias {
            return ImportResolution::Qualified(format!("{}.{}", alias, name));
        }

        let edit = match self.extend_at {
            Some(offset) => TextEdit::insert(offset, format!(", {}", name)),
            None => {
                let statement = format!("from {} import {}", TYPING_MODULE, name);
                let text = if self.needs_leading_newline {
                    format!("\n{}\n", statement)
                } else {
                    format!("{}\n", statement)
                };
                TextEdit::insert(self.insert_at, text)
            }
        };
        ImportResolution::Needs(ImportEdit {
            module: TYPING_MODULE.to_string(),
            name: name.to_string(),
            edits: vec![edit],
        })
    }
}

/// One item of an import statement: `name` or `name as alias`.
struct ImportedName<'s> {
    name: &'s str,
    alias: Option<&'s str>,
}

impl<'s> ImportedName<'s> {
    /// Name the import binds in the module namespace.
    fn binding(&self) -> &'s str {
        self.alias.unwrap_or(self.name)
    }
}

fn is_docstring(statement: Node<'_>) -> bool {
    statement
        .named_child(0)
        .is_some_and(|child| child.kind() == "string")
}

fn imported_name<'s>(item: Node<'_>, source: &'s str) -> Option<ImportedName<'s>> {
    match item.kind() {
        "dotted_name" => Some(ImportedName {
            name: node_text(item, source),
            alias: None,
        }),
        "aliased_import" => Some(ImportedName {
            name: node_text(item.child_by_field_name("name")?, source),
            alias: item
                .child_by_field_name("alias")
                .map(|alias| node_text(alias, source)),
        }),
        _ => None,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(source: &str) -> TypingImports {
        let mut syntax = SyntaxTreeService::new();
        syntax.parse(source);
        TypingImports::collect(&syntax)
    }

    fn apply(source: &str, resolution: ImportResolution) -> String {
        let ImportResolution::Needs(edit) = resolution else {
            panic!("expected an edit, got {:?}", resolution);
        };
        assert_eq!(edit.edits.len(), 1);
        edit.edits[0].apply(source)
    }

    mod resolution {
        use super::*;

        #[test]
        fn existing_name_needs_nothing() {
            let imports = collect("from typing import List, Dict\n");
            assert_eq!(imports.resolve("List"), ImportResolution::AlreadyImported);
        }

        #[test]
        fn typing_extensions_names_count() {
            let imports = collect("from typing_extensions import Self\n");
            assert_eq!(imports.resolve("Self"), ImportResolution::AlreadyImported);
        }

        #[test]
        fn aliased_name_uses_alias() {
            let imports = collect("from typing import Optional as Opt\n");
            assert_eq!(
                imports.resolve("Optional"),
                ImportResolution::Qualified("Opt".to_string())
            );
        }

        #[test]
        fn wildcard_covers_everything() {
            let imports = collect("from typing import *\n");
            assert_eq!(imports.resolve("Callable"), ImportResolution::AlreadyImported);
        }

        #[test]
        fn module_import_qualifies() {
            assert_eq!(
                collect("import typing\n").resolve("List"),
                ImportResolution::Qualified("typing.List".to_string())
            );
            assert_eq!(
                collect("import typing as t\n").resolve("List"),
                ImportResolution::Qualified("t.List".to_string())
            );
        }
    }

    mod edits {
        use super::*;

        #[test]
        fn extends_existing_typing_import() {
            let source = "from typing import List\nx: List[int] = []\n";
            let result = apply(source, collect(source).resolve("Dict"));
            assert_eq!(result, "from typing import List, Dict\nx: List[int] = []\n");
        }

        #[test]
        fn extends_parenthesized_import_inside_parens() {
            let source = "from typing import (\n    List,\n    Set\n)\n";
            let result = apply(source, collect(source).resolve("Dict"));
            assert_eq!(result, "from typing import (\n    List,\n    Set, Dict\n)\n");
        }

        #[test]
        fn inserts_at_top_of_plain_file() {
            let source = "import os\n";
            let result = apply(source, collect(source).resolve("Any"));
            assert_eq!(result, "from typing import Any\nimport os\n");
        }

        #[test]
        fn inserts_after_docstring_and_future() {
            let source = "\"\"\"Module doc.\"\"\"\nfrom __future__ import annotations\nimport os\n";
            let result = apply(source, collect(source).resolve("Any"));
            assert_eq!(
                result,
                "\"\"\"Module doc.\"\"\"\nfrom __future__ import annotations\nfrom typing import Any\nimport os\n"
            );
        }

        #[test]
        fn inserts_after_docstring_without_trailing_newline() {
            let source = "\"\"\"Only a docstring.\"\"\"";
            let result = apply(source, collect(source).resolve("Any"));
            assert_eq!(result, "\"\"\"Only a docstring.\"\"\"\nfrom typing import Any\n");
        }

        #[test]
        fn does_not_extend_typing_extensions_import() {
            let source = "from typing_extensions import Self\n";
            let result = apply(source, collect(source).resolve("List"));
            assert_eq!(result, "from typing import List\nfrom typing_extensions import Self\n");
        }

        #[test]
        fn stub_service_inserts_at_start() {
            let mut syntax = SyntaxTreeService::stub();
            syntax.parse("from typing import List\n");
            let imports = TypingImports::collect(&syntax);
            let ImportResolution::Needs(edit) = imports.resolve("List") else {
                panic!("expected edit");
            };
            assert_eq!(edit.edits[0].span.start, 0);
            assert_eq!(edit.module, "typing");
        }
    }
}
