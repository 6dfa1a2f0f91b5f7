// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Declaration analyzer: recognizes type-relevant declarations in a parse tree.
//!
//! # What is Recognized?
//!
//! - **Classes**: `class Foo(Bar, Baz):` with identifier bases
//! - **Protocols**: classes with `Protocol` among their bases, plus the
//!   signatures of the functions defined in their bodies
//! - **Imports**: `import pkg.Foo` (capitalized last segment only) and
//!   `from mod import A, B as C`; imports from `typing` are left to the catalog
//! - **Type aliases**: module-level `Vector = List[float]` where the head is a
//!   refinable catalog type, `X: TypeAlias = ...`, and `type X = ...`
//! - **Type variables**: `T = TypeVar("T", int, str)`
//! - **Literal types**: `Mode = Literal["r", "w"]`
//!
//! # Design
//!
//! One pre-order pass classifies each node into a [`Shape`]; each shape is then
//! lowered into zero or more [`Declaration`]s. Names are taken at face value:
//! no scope resolution, no type checking. A node that lacks the expected
//! children (for example, a class with no name after error recovery) is
//! skipped silently.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use tree_sitter::Node;

use crate::catalog::{is_typing_module, TypeCatalog};
use crate::syntax::{field_children, named_children, node_text, walk_preorder, SyntaxTreeService, WalkControl};

/// Base-class name that marks a class as a protocol.
pub const PROTOCOL_MARKER: &str = "Protocol";

/// Return type recorded for protocol methods without an annotation.
pub const ANY_RETURN: &str = "Any";

/// Qualifier accepted alongside the typing modules in `builtins.dict`.
const BUILTINS_MODULE: &str = "builtins";

// ============================================================================
// Declaration Records
// ============================================================================

/// Parameter names and return annotation of a protocol method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodSignature {
    pub parameters: Vec<String>,
    pub return_type: String,
}

/// A value inside `Literal[...]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum LiteralValue {
    /// String contents without quotes or prefix.
    String(String),
    /// Integer or float, verbatim (including a leading minus).
    Number(String),
    Boolean(bool),
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralValue::String(s) => write!(f, "\"{}\"", s),
            LiteralValue::Number(n) => write!(f, "{}", n),
            LiteralValue::Boolean(true) => write!(f, "True"),
            LiteralValue::Boolean(false) => write!(f, "False"),
        }
    }
}

/// A declaration extracted from one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Declaration {
    Class {
        name: String,
        bases: Vec<String>,
    },
    Protocol {
        name: String,
        methods: BTreeMap<String, MethodSignature>,
    },
    /// `name` is the binding (the alias when present).
    Import {
        name: String,
        original_name: String,
        module: Option<String>,
    },
    TypeAlias {
        name: String,
        original_type: String,
    },
    TypeVariable {
        name: String,
        constraints: Vec<String>,
        bound: Option<String>,
    },
    Literal {
        name: String,
        values: Vec<LiteralValue>,
    },
}

impl Declaration {
    pub fn name(&self) -> &str {
        match self {
            Declaration::Class { name, .. }
            | Declaration::Protocol { name, .. }
            | Declaration::Import { name, .. }
            | Declaration::TypeAlias { name, .. }
            | Declaration::TypeVariable { name, .. }
            | Declaration::Literal { name, .. } => name,
        }
    }
}

// ============================================================================
// Shape Classification
// ============================================================================

/// The closed set of node shapes the analyzer understands.
#[derive(Debug, Clone, Copy)]
enum Shape<'t> {
    ClassDef(Node<'t>),
    Import(Node<'t>),
    FromImport(Node<'t>),
    Assignment {
        target: Node<'t>,
        value: Node<'t>,
        annotation: Option<Node<'t>>,
        module_level: bool,
    },
    TypeStatement(Node<'t>),
}

fn classify(node: Node<'_>) -> Option<Shape<'_>> {
    match node.kind() {
        "class_definition" => Some(Shape::ClassDef(node)),
        "import_statement" => Some(Shape::Import(node)),
        "import_from_statement" => Some(Shape::FromImport(node)),
        "type_alias_statement" => Some(Shape::TypeStatement(node)),
        "assignment" => {
            let target = node.child_by_field_name("left")?;
            if target.kind() != "identifier" {
                return None;
            }
            Some(Shape::Assignment {
                target,
                value: node.child_by_field_name("right")?,
                annotation: node.child_by_field_name("type"),
                module_level: is_module_level(node),
            })
        }
        _ => None,
    }
}

/// `assignment` directly under a top-level expression statement.
fn is_module_level(assignment: Node<'_>) -> bool {
    assignment
        .parent()
        .filter(|p| p.kind() == "expression_statement")
        .and_then(|p| p.parent())
        .is_some_and(|p| p.kind() == "module")
}

// ============================================================================
// Analyzer
// ============================================================================

/// Extract every recognized declaration from the service's current tree.
///
/// Returns an empty list when there is no tree (stub mode).
pub fn analyze(syntax: &SyntaxTreeService) -> Vec<Declaration> {
    let source = syntax.source();
    let catalog = TypeCatalog;
    let mut declarations = Vec::new();

    syntax.traverse(|node| {
        if let Some(shape) = classify(node) {
            lower(shape, source, &catalog, &mut declarations);
        }
        WalkControl::Continue
    });

    declarations
}

fn lower(shape: Shape<'_>, source: &str, catalog: &TypeCatalog, out: &mut Vec<Declaration>) {
    match shape {
        Shape::ClassDef(node) => out.extend(lower_class(node, source)),
        Shape::Import(node) => out.extend(lower_import(node, source)),
        Shape::FromImport(node) => out.extend(lower_from_import(node, source)),
        Shape::TypeStatement(node) => out.extend(lower_type_statement(node, source)),
        Shape::Assignment {
            target,
            value,
            annotation,
            module_level,
        } => out.extend(lower_assignment(
            node_text(target, source),
            value,
            annotation,
            module_level,
            source,
            catalog,
        )),
    }
}

// ============================================================================
// Classes and Protocols
// ============================================================================

fn lower_class(node: Node<'_>, source: &str) -> Option<Declaration> {
    let name = node_text(node.child_by_field_name("name")?, source).to_string();

    let mut bases = Vec::new();
    let mut is_protocol = false;
    if let Some(superclasses) = node.child_by_field_name("superclasses") {
        for base in named_children(superclasses) {
            if head_identifier(base, source) == Some(PROTOCOL_MARKER) {
                is_protocol = true;
            }
            if base.kind() == "identifier" {
                bases.push(node_text(base, source).to_string());
            }
        }
    }

    if is_protocol {
        Some(Declaration::Protocol {
            name,
            methods: protocol_methods(node, source),
        })
    } else {
        Some(Declaration::Class { name, bases })
    }
}

/// Function definitions inside the class body. Nested classes own their
/// own methods and are not descended into.
fn protocol_methods(class: Node<'_>, source: &str) -> BTreeMap<String, MethodSignature> {
    let mut methods = BTreeMap::new();
    let Some(body) = class.child_by_field_name("body") else {
        return methods;
    };

    walk_preorder(body, |node| match node.kind() {
        "class_definition" => WalkControl::SkipChildren,
        "function_definition" => {
            if let Some((name, signature)) = method_signature(node, source) {
                methods.insert(name, signature);
            }
            WalkControl::Continue
        }
        _ => WalkControl::Continue,
    });

    methods
}

fn method_signature(function: Node<'_>, source: &str) -> Option<(String, MethodSignature)> {
    let name = node_text(function.child_by_field_name("name")?, source).to_string();
    let parameters = function
        .child_by_field_name("parameters")
        .map(|params| parameter_names(params, source))
        .unwrap_or_default();
    let return_type = function
        .child_by_field_name("return_type")
        .and_then(|annotation| annotation.child(0))
        .map(|expr| node_text(expr, source).to_string())
        .unwrap_or_else(|| ANY_RETURN.to_string());

    Some((
        name,
        MethodSignature {
            parameters,
            return_type,
        },
    ))
}

fn parameter_names(parameters: Node<'_>, source: &str) -> Vec<String> {
    named_children(parameters)
        .into_iter()
        .filter_map(|param| match param.kind() {
            "identifier" => Some(param),
            "typed_parameter" => named_children(param)
                .into_iter()
                .find(|child| child.kind() == "identifier"),
            "default_parameter" | "typed_default_parameter" => param
                .child_by_field_name("name")
                .filter(|name| name.kind() == "identifier"),
            _ => None,
        })
        .map(|ident| node_text(ident, source).to_string())
        .collect()
}

// ============================================================================
// Imports
// ============================================================================

/// `import a.b.Foo` / `import a.Foo as F`: only capitalized last segments.
fn lower_import(node: Node<'_>, source: &str) -> Vec<Declaration> {
    field_children(node, "name")
        .into_iter()
        .filter_map(|item| {
            let (dotted, alias) = split_aliased(item, source)?;
            let (module, last) = match dotted.rsplit_once('.') {
                Some((module, last)) => (Some(module.to_string()), last),
                None => (None, dotted),
            };
            if !last.chars().next().is_some_and(char::is_uppercase) {
                return None;
            }
            Some(Declaration::Import {
                name: alias.unwrap_or(last).to_string(),
                original_name: last.to_string(),
                module,
            })
        })
        .collect()
}

/// `from mod import A, B as C`: one declaration per imported name.
fn lower_from_import(node: Node<'_>, source: &str) -> Vec<Declaration> {
    let Some(module_node) = node.child_by_field_name("module_name") else {
        return Vec::new();
    };
    let module = node_text(module_node, source);
    if is_typing_module(module) {
        return Vec::new();
    }

    field_children(node, "name")
        .into_iter()
        .filter_map(|item| {
            let (original, alias) = split_aliased(item, source)?;
            Some(Declaration::Import {
                name: alias.unwrap_or(original).to_string(),
                original_name: original.to_string(),
                module: Some(module.to_string()),
            })
        })
        .collect()
}

/// Split a `dotted_name` or `aliased_import` into (dotted text, alias).
fn split_aliased<'s>(item: Node<'_>, source: &'s str) -> Option<(&'s str, Option<&'s str>)> {
    match item.kind() {
        "dotted_name" => Some((node_text(item, source), None)),
        "aliased_import" => {
            let name = node_text(item.child_by_field_name("name")?, source);
            let alias = item
                .child_by_field_name("alias")
                .map(|alias| node_text(alias, source));
            Some((name, alias))
        }
        _ => None,
    }
}

// ============================================================================
// Assignments: TypeVar, Literal, aliases
// ============================================================================

fn lower_assignment(
    name: &str,
    value: Node<'_>,
    annotation: Option<Node<'_>>,
    module_level: bool,
    source: &str,
    catalog: &TypeCatalog,
) -> Option<Declaration> {
    let head = head_identifier(value, source);

    match (value.kind(), head) {
        ("call", Some("TypeVar")) => Some(lower_type_var(name, value, source)),
        ("call" | "subscript", Some("Literal")) => Some(Declaration::Literal {
            name: name.to_string(),
            values: literal_values(value, source),
        }),
        _ if annotation.is_some_and(|a| is_type_alias_annotation(a, source)) => {
            Some(Declaration::TypeAlias {
                name: name.to_string(),
                original_type: node_text(value, source).to_string(),
            })
        }
        ("identifier" | "attribute" | "subscript", Some(head))
            if module_level && catalog.is_refinable(head) =>
        {
            Some(Declaration::TypeAlias {
                name: name.to_string(),
                original_type: node_text(value, source).to_string(),
            })
        }
        _ => None,
    }
}

fn is_type_alias_annotation(annotation: Node<'_>, source: &str) -> bool {
    let text = node_text(annotation, source).trim();
    text == "TypeAlias" || text.ends_with(".TypeAlias")
}

/// Constraints are the identifier positionals after the name literal.
fn lower_type_var(name: &str, call: Node<'_>, source: &str) -> Declaration {
    let mut constraints = Vec::new();
    let mut bound = None;

    if let Some(arguments) = call.child_by_field_name("arguments") {
        let mut positional = 0usize;
        for arg in named_children(arguments) {
            match arg.kind() {
                "keyword_argument" => {
                    let key = arg.child_by_field_name("name").map(|n| node_text(n, source));
                    if key == Some("bound") {
                        bound = arg
                            .child_by_field_name("value")
                            .map(|v| type_reference_text(v, source));
                    }
                }
                "comment" => {}
                kind => {
                    positional += 1;
                    if positional > 1 && kind == "identifier" {
                        constraints.push(node_text(arg, source).to_string());
                    }
                }
            }
        }
    }

    Declaration::TypeVariable {
        name: name.to_string(),
        constraints,
        bound,
    }
}

/// Text of a type reference, unquoting forward references (`bound="Node"`).
fn type_reference_text(node: Node<'_>, source: &str) -> String {
    let text = node_text(node, source);
    if node.kind() == "string" {
        unquote(text).to_string()
    } else {
        text.to_string()
    }
}

fn literal_values(value: Node<'_>, source: &str) -> Vec<LiteralValue> {
    let items = match value.kind() {
        "subscript" => field_children(value, "subscript"),
        _ => value
            .child_by_field_name("arguments")
            .map(named_children)
            .unwrap_or_default(),
    };

    items
        .into_iter()
        .filter_map(|item| literal_value(item, source))
        .collect()
}

fn literal_value(node: Node<'_>, source: &str) -> Option<LiteralValue> {
    let text = node_text(node, source);
    match node.kind() {
        "string" => Some(LiteralValue::String(unquote(text).to_string())),
        "integer" | "float" => Some(LiteralValue::Number(text.to_string())),
        "unary_operator" => {
            let operand = node.child_by_field_name("argument")?;
            matches!(operand.kind(), "integer" | "float")
                .then(|| LiteralValue::Number(text.split_whitespace().collect()))
        }
        "true" => Some(LiteralValue::Boolean(true)),
        "false" => Some(LiteralValue::Boolean(false)),
        _ => None,
    }
}

/// Strip string prefix letters and matching quotes: `b'x'` -> `x`.
fn unquote(raw: &str) -> &str {
    let body = raw.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    for quote in ["\"\"\"", "'''", "\"", "'"] {
        if let Some(inner) = body
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    body
}

// ============================================================================
// PEP 695 `type` statements
// ============================================================================

fn lower_type_statement(node: Node<'_>, source: &str) -> Option<Declaration> {
    // Type parameters may sit between the two sides as their own child.
    let parts = named_children(node);
    let (left, right) = match parts.as_slice() {
        [left, .., right] => (*left, *right),
        _ => return None,
    };

    let name = node_text(left, source)
        .split('[')
        .next()
        .map(str::trim)
        .filter(|name| !name.is_empty())?;

    Some(Declaration::TypeAlias {
        name: name.to_string(),
        original_type: node_text(right, source).to_string(),
    })
}

// ============================================================================
// Helpers
// ============================================================================

/// The identifier naming an expression's head: `List` for `List[int]`,
/// `TypeVar` for `typing.TypeVar("T")`, `Foo` for `Foo`.
///
/// Attribute heads count only under a typing or `builtins` qualifier, so
/// `config.list` has no head.
fn head_identifier<'s>(node: Node<'_>, source: &'s str) -> Option<&'s str> {
    match node.kind() {
        "identifier" => Some(node_text(node, source)),
        "attribute" => {
            let qualifier = node_text(node.child_by_field_name("object")?, source);
            if !(is_typing_module(qualifier) || qualifier == BUILTINS_MODULE) {
                return None;
            }
            node.child_by_field_name("attribute")
                .map(|attr| node_text(attr, source))
        }
        "subscript" => head_identifier(node.child_by_field_name("value")?, source),
        "call" => head_identifier(node.child_by_field_name("function")?, source),
        _ => None,
    }
}

// ============================================================================
// Tests
// ============================================================================
