// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Type symbol registry: the file-partitioned store of discovered symbols.
//!
//! Six category maps, each keyed by `(defining file, name)`. Equal names in
//! different files coexist; shadowing is not resolved. Every successful
//! mutation bumps a single version counter by exactly one, which the result
//! cache compares against its entry stamps.
//!
//! Callers re-analyzing a file must call [`TypeRegistry::remove_all_for_file`]
//! first, otherwise symbols deleted from the source survive in categories the
//! new pass did not repopulate.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use typecomp_core::error::TypecompError;

use crate::declarations::{LiteralValue, MethodSignature};

/// Name the analyzer can produce from `super().__init__` patterns.
const SUPER_SENTINEL: &str = "super";

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("invalid registry input: {field} must not be empty")]
    InvalidInput { field: &'static str },
}

impl From<RegistryError> for TypecompError {
    fn from(err: RegistryError) -> Self {
        TypecompError::InvalidArguments {
            message: err.to_string(),
        }
    }
}

/// Whether the analyzer output `name` is worth inserting.
pub fn is_insertable_name(name: &str) -> bool {
    !name.trim().is_empty() && name != SUPER_SENTINEL
}

// ============================================================================
// Symbol Records
// ============================================================================

/// Registry key: defining file, then symbol name.
pub type SymbolKey = (PathBuf, String);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalClass {
    pub name: String,
    pub file: PathBuf,
    pub base_classes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportedClass {
    /// Binding name: the alias when one was given.
    pub name: String,
    pub file: PathBuf,
    pub original_name: String,
    pub module: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeAlias {
    pub name: String,
    pub file: PathBuf,
    /// Right-hand side, verbatim.
    pub original_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeVariable {
    pub name: String,
    pub file: PathBuf,
    pub constraints: Vec<String>,
    pub bound: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Protocol {
    pub name: String,
    pub file: PathBuf,
    pub methods: BTreeMap<String, MethodSignature>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiteralType {
    pub name: String,
    pub file: PathBuf,
    pub values: Vec<LiteralValue>,
}

/// Registry category of a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolCategory {
    LocalClass,
    ImportedClass,
    TypeAlias,
    TypeVariable,
    Protocol,
    LiteralType,
}

/// Borrowed view of any registry symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeSymbol<'a> {
    LocalClass(&'a LocalClass),
    ImportedClass(&'a ImportedClass),
    TypeAlias(&'a TypeAlias),
    TypeVariable(&'a TypeVariable),
    Protocol(&'a Protocol),
    LiteralType(&'a LiteralType),
}

impl<'a> TypeSymbol<'a> {
    pub fn name(&self) -> &'a str {
        match *self {
            TypeSymbol::LocalClass(s) => &s.name,
            TypeSymbol::ImportedClass(s) => &s.name,
            TypeSymbol::TypeAlias(s) => &s.name,
            TypeSymbol::TypeVariable(s) => &s.name,
            TypeSymbol::Protocol(s) => &s.name,
            TypeSymbol::LiteralType(s) => &s.name,
        }
    }

    pub fn file(&self) -> &'a Path {
        match *self {
            TypeSymbol::LocalClass(s) => &s.file,
            TypeSymbol::ImportedClass(s) => &s.file,
            TypeSymbol::TypeAlias(s) => &s.file,
            TypeSymbol::TypeVariable(s) => &s.file,
            TypeSymbol::Protocol(s) => &s.file,
            TypeSymbol::LiteralType(s) => &s.file,
        }
    }

    pub fn category(&self) -> SymbolCategory {
        match self {
            TypeSymbol::LocalClass(_) => SymbolCategory::LocalClass,
            TypeSymbol::ImportedClass(_) => SymbolCategory::ImportedClass,
            TypeSymbol::TypeAlias(_) => SymbolCategory::TypeAlias,
            TypeSymbol::TypeVariable(_) => SymbolCategory::TypeVariable,
            TypeSymbol::Protocol(_) => SymbolCategory::Protocol,
            TypeSymbol::LiteralType(_) => SymbolCategory::LiteralType,
        }
    }

    /// Whether the symbol is offered with a bracket placeholder.
    ///
    /// Classes with bases are assumed generic-capable, imports always are,
    /// constrained type variables are; everything else is atomic.
    pub fn is_refinable(&self) -> bool {
        match self {
            TypeSymbol::LocalClass(s) => !s.base_classes.is_empty(),
            TypeSymbol::ImportedClass(_) => true,
            TypeSymbol::TypeVariable(s) => !s.constraints.is_empty(),
            TypeSymbol::TypeAlias(_) | TypeSymbol::Protocol(_) | TypeSymbol::LiteralType(_) => {
                false
            }
        }
    }

    /// Human-readable sub-kind description.
    pub fn detail(&self) -> String {
        match self {
            TypeSymbol::LocalClass(s) if s.base_classes.is_empty() => "Local class".to_string(),
            TypeSymbol::LocalClass(s) => {
                format!("Local class extends {}", s.base_classes.join(", "))
            }
            TypeSymbol::ImportedClass(s) => {
                let source = match &s.module {
                    Some(module) => format!("Imported from {}", module),
                    None => "Imported".to_string(),
                };
                if s.original_name != s.name {
                    format!("{} as alias of {}", source, s.original_name)
                } else {
                    source
                }
            }
            TypeSymbol::TypeAlias(s) => format!("Alias for {}", s.original_type),
            TypeSymbol::TypeVariable(s) => match (&s.bound, s.constraints.is_empty()) {
                (Some(bound), _) => format!("TypeVar bound to {}", bound),
                (None, false) => format!("TypeVar bound to {}", s.constraints.join(" | ")),
                (None, true) => "TypeVar".to_string(),
            },
            TypeSymbol::Protocol(s) => match s.methods.len() {
                1 => "Protocol with 1 method".to_string(),
                n => format!("Protocol with {} methods", n),
            },
            TypeSymbol::LiteralType(s) => {
                let values: Vec<String> = s.values.iter().map(ToString::to_string).collect();
                format!("Literal: {}", values.join(" | "))
            }
        }
    }
}

/// Uniform per-file listing row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSymbol {
    pub name: String,
    pub category: SymbolCategory,
    pub is_refinable: bool,
}

/// Owned copy of everything one file contributes, in category then name order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSnapshot {
    pub local_classes: Vec<LocalClass>,
    pub imported_classes: Vec<ImportedClass>,
    pub type_aliases: Vec<TypeAlias>,
    pub type_variables: Vec<TypeVariable>,
    pub protocols: Vec<Protocol>,
    pub literal_types: Vec<LiteralType>,
}

impl FileSnapshot {
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn len(&self) -> usize {
        self.local_classes.len()
            + self.imported_classes.len()
            + self.type_aliases.len()
            + self.type_variables.len()
            + self.protocols.len()
            + self.literal_types.len()
    }
}

// ============================================================================
// Registry
// ============================================================================

/// File-partitioned store of type symbols with a mutation version counter.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    local_classes: BTreeMap<SymbolKey, LocalClass>,
    imported_classes: BTreeMap<SymbolKey, ImportedClass>,
    type_aliases: BTreeMap<SymbolKey, TypeAlias>,
    type_variables: BTreeMap<SymbolKey, TypeVariable>,
    protocols: BTreeMap<SymbolKey, Protocol>,
    literal_types: BTreeMap<SymbolKey, LiteralType>,
    version: u64,
}

fn validate(name: &str, file: &Path) -> Result<SymbolKey, RegistryError> {
    if name.trim().is_empty() {
        return Err(RegistryError::InvalidInput { field: "name" });
    }
    if file.as_os_str().is_empty() {
        return Err(RegistryError::InvalidInput { field: "file_path" });
    }
    Ok((file.to_path_buf(), name.to_string()))
}

/// Values of `map` defined in `file`, in name order.
fn in_file<'a, T>(
    map: &'a BTreeMap<SymbolKey, T>,
    file: &Path,
) -> impl Iterator<Item = &'a T> + 'a {
    let file = file.to_path_buf();
    map.range((file.clone(), String::new())..)
        .take_while(move |((defining, _), _)| *defining == file)
        .map(|(_, value)| value)
}

fn remove_file<T>(map: &mut BTreeMap<SymbolKey, T>, file: &Path) -> usize {
    let before = map.len();
    map.retain(|(defining, _), _| defining != file);
    before - map.len()
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current mutation version. Starts at 0.
    pub fn version(&self) -> u64 {
        self.version
    }

    fn bump(&mut self) {
        self.version += 1;
    }

    // ------------------------------------------------------------------------
    // Upserts
    // ------------------------------------------------------------------------

    pub fn add_local_class(
        &mut self,
        name: &str,
        file: &Path,
        base_classes: Vec<String>,
    ) -> Result<(), RegistryError> {
        let key = validate(name, file)?;
        let symbol = LocalClass {
            name: key.1.clone(),
            file: key.0.clone(),
            base_classes,
        };
        self.local_classes.insert(key, symbol);
        self.bump();
        Ok(())
    }

    /// Register an imported class under its binding `name`.
    pub fn add_imported_class(
        &mut self,
        name: &str,
        file: &Path,
        original_name: &str,
        module: Option<String>,
    ) -> Result<(), RegistryError> {
        let key = validate(name, file)?;
        let symbol = ImportedClass {
            name: key.1.clone(),
            file: key.0.clone(),
            original_name: original_name.to_string(),
            module,
        };
        self.imported_classes.insert(key, symbol);
        self.bump();
        Ok(())
    }

    pub fn add_type_alias(
        &mut self,
        name: &str,
        file: &Path,
        original_type: &str,
    ) -> Result<(), RegistryError> {
        let key = validate(name, file)?;
        let symbol = TypeAlias {
            name: key.1.clone(),
            file: key.0.clone(),
            original_type: original_type.to_string(),
        };
        self.type_aliases.insert(key, symbol);
        self.bump();
        Ok(())
    }

    pub fn add_type_variable(
        &mut self,
        name: &str,
        file: &Path,
        constraints: Vec<String>,
        bound: Option<String>,
    ) -> Result<(), RegistryError> {
        let key = validate(name, file)?;
        let symbol = TypeVariable {
            name: key.1.clone(),
            file: key.0.clone(),
            constraints,
            bound,
        };
        self.type_variables.insert(key, symbol);
        self.bump();
        Ok(())
    }

    pub fn add_protocol(
        &mut self,
        name: &str,
        file: &Path,
        methods: BTreeMap<String, MethodSignature>,
    ) -> Result<(), RegistryError> {
        let key = validate(name, file)?;
        let symbol = Protocol {
            name: key.1.clone(),
            file: key.0.clone(),
            methods,
        };
        self.protocols.insert(key, symbol);
        self.bump();
        Ok(())
    }

    pub fn add_literal_type(
        &mut self,
        name: &str,
        file: &Path,
        values: Vec<LiteralValue>,
    ) -> Result<(), RegistryError> {
        let key = validate(name, file)?;
        let symbol = LiteralType {
            name: key.1.clone(),
            file: key.0.clone(),
            values,
        };
        self.literal_types.insert(key, symbol);
        self.bump();
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Removal
    // ------------------------------------------------------------------------

    /// Remove every symbol defined in `file`, across all categories.
    ///
    /// Bumps the version exactly once, even when nothing matched. Returns the
    /// number of symbols removed.
    pub fn remove_all_for_file(&mut self, file: &Path) -> usize {
        let removed = remove_file(&mut self.local_classes, file)
            + remove_file(&mut self.imported_classes, file)
            + remove_file(&mut self.type_aliases, file)
            + remove_file(&mut self.type_variables, file)
            + remove_file(&mut self.protocols, file)
            + remove_file(&mut self.literal_types, file);
        self.bump();
        tracing::debug!(file = %file.display(), removed, version = self.version, "removed file symbols");
        removed
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// All symbols defined in `file`, category by category, names ascending.
    pub fn symbols_in_file<'a>(&'a self, file: &Path) -> Vec<TypeSymbol<'a>> {
        let mut symbols = Vec::new();
        symbols.extend(in_file(&self.local_classes, file).map(TypeSymbol::LocalClass));
        symbols.extend(in_file(&self.imported_classes, file).map(TypeSymbol::ImportedClass));
        symbols.extend(in_file(&self.type_aliases, file).map(TypeSymbol::TypeAlias));
        symbols.extend(in_file(&self.type_variables, file).map(TypeSymbol::TypeVariable));
        symbols.extend(in_file(&self.protocols, file).map(TypeSymbol::Protocol));
        symbols.extend(in_file(&self.literal_types, file).map(TypeSymbol::LiteralType));
        symbols
    }

    /// Flat `{name, category, isRefinable}` listing for `file`.
    pub fn symbols_for_file(&self, file: &Path) -> Vec<FileSymbol> {
        self.symbols_in_file(file)
            .into_iter()
            .map(|symbol| FileSymbol {
                name: symbol.name().to_string(),
                category: symbol.category(),
                is_refinable: symbol.is_refinable(),
            })
            .collect()
    }

    /// Owned copy of everything `file` contributes.
    pub fn snapshot_for_file(&self, file: &Path) -> FileSnapshot {
        FileSnapshot {
            local_classes: in_file(&self.local_classes, file).cloned().collect(),
            imported_classes: in_file(&self.imported_classes, file).cloned().collect(),
            type_aliases: in_file(&self.type_aliases, file).cloned().collect(),
            type_variables: in_file(&self.type_variables, file).cloned().collect(),
            protocols: in_file(&self.protocols, file).cloned().collect(),
            literal_types: in_file(&self.literal_types, file).cloned().collect(),
        }
    }

    /// Total number of symbols across categories and files.
    pub fn len(&self) -> usize {
        self.local_classes.len()
            + self.imported_classes.len()
            + self.type_aliases.len()
            + self.type_variables.len()
            + self.protocols.len()
            + self.literal_types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn local_classes(&self) -> &BTreeMap<SymbolKey, LocalClass> {
        &self.local_classes
    }

    pub fn imported_classes(&self) -> &BTreeMap<SymbolKey, ImportedClass> {
        &self.imported_classes
    }

    pub fn type_aliases(&self) -> &BTreeMap<SymbolKey, TypeAlias> {
        &self.type_aliases
    }

    pub fn type_variables(&self) -> &BTreeMap<SymbolKey, TypeVariable> {
        &self.type_variables
    }

    pub fn protocols(&self) -> &BTreeMap<SymbolKey, Protocol> {
        &self.protocols
    }

    pub fn literal_types(&self) -> &BTreeMap<SymbolKey, LiteralType> {
        &self.literal_types
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn path(p: &str) -> PathBuf {
        PathBuf::from(p)
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    mod mutation {
        use super::*;

        #[test]
        fn every_add_bumps_version_by_one() {
            let mut registry = TypeRegistry::new();
            let f = path("f.py");
            assert_eq!(registry.version(), 0);

            registry.add_local_class("A", &f, vec![]).unwrap();
            assert_eq!(registry.version(), 1);
            registry.add_imported_class("B", &f, "B", None).unwrap();
            assert_eq!(registry.version(), 2);
            registry.add_type_alias("C", &f, "List[int]").unwrap();
            assert_eq!(registry.version(), 3);
            registry.add_type_variable("T", &f, vec![], None).unwrap();
            assert_eq!(registry.version(), 4);
            registry.add_protocol("P", &f, BTreeMap::new()).unwrap();
            assert_eq!(registry.version(), 5);
            registry.add_literal_type("L", &f, vec![]).unwrap();
            assert_eq!(registry.version(), 6);
        }

        #[test]
        fn upsert_replaces_existing_entry() {
            let mut registry = TypeRegistry::new();
            let f = path("f.py");
            registry.add_local_class("A", &f, strings(&["X"])).unwrap();
            registry.add_local_class("A", &f, strings(&["Y"])).unwrap();

            assert_eq!(registry.local_classes().len(), 1);
            let class = &registry.local_classes()[&(f.clone(), "A".to_string())];
            assert_eq!(class.base_classes, strings(&["Y"]));
            assert_eq!(registry.version(), 2);
        }

        #[test]
        fn invalid_input_is_rejected_without_bump() {
            let mut registry = TypeRegistry::new();
            let err = registry
                .add_local_class("  ", &path("f.py"), vec![])
                .unwrap_err();
            assert_eq!(err, RegistryError::InvalidInput { field: "name" });

            let err = registry.add_type_alias("A", Path::new(""), "x").unwrap_err();
            assert_eq!(err, RegistryError::InvalidInput { field: "file_path" });

            assert_eq!(registry.version(), 0);
            assert!(registry.is_empty());
        }

        #[test]
        fn remove_all_for_file_bumps_once() {
            let mut registry = TypeRegistry::new();
            let f = path("f.py");
            registry.add_local_class("A", &f, vec![]).unwrap();
            registry.add_type_alias("B", &f, "List[int]").unwrap();
            registry.add_literal_type("C", &f, vec![]).unwrap();
            let before = registry.version();

            assert_eq!(registry.remove_all_for_file(&f), 3);
            assert_eq!(registry.version(), before + 1);
            assert!(registry.symbols_for_file(&f).is_empty());
        }

        #[test]
        fn remove_with_no_matches_still_bumps() {
            let mut registry = TypeRegistry::new();
            assert_eq!(registry.remove_all_for_file(&path("none.py")), 0);
            assert_eq!(registry.version(), 1);
        }

        #[test]
        fn removal_is_isolated_per_file() {
            let mut registry = TypeRegistry::new();
            let a = path("a.py");
            let b = path("b.py");
            for file in [&a, &b] {
                registry.add_local_class("Shared", file, vec![]).unwrap();
                registry.add_imported_class("I", file, "I", None).unwrap();
                registry.add_type_alias("V", file, "List[int]").unwrap();
                registry.add_type_variable("T", file, vec![], None).unwrap();
                registry.add_protocol("P", file, BTreeMap::new()).unwrap();
                registry.add_literal_type("L", file, vec![]).unwrap();
            }
            let b_before = registry.snapshot_for_file(&b);

            registry.remove_all_for_file(&a);

            assert!(registry.snapshot_for_file(&a).is_empty());
            assert_eq!(registry.snapshot_for_file(&b), b_before);
            assert_eq!(b_before.len(), 6);
        }
    }

    mod queries {
        use super::*;

        #[test]
        fn refinability_rules() {
            let mut registry = TypeRegistry::new();
            let f = path("f.py");
            registry.add_local_class("Plain", &f, vec![]).unwrap();
            registry.add_local_class("Derived", &f, strings(&["Base"])).unwrap();
            registry.add_imported_class("Imp", &f, "Imp", None).unwrap();
            registry.add_type_alias("Alias", &f, "List[int]").unwrap();
            registry.add_type_variable("T", &f, strings(&["int"]), None).unwrap();
            registry.add_type_variable("U", &f, vec![], None).unwrap();
            registry.add_protocol("P", &f, BTreeMap::new()).unwrap();
            registry.add_literal_type("L", &f, vec![]).unwrap();

            let refinable: BTreeMap<_, _> = registry
                .symbols_for_file(&f)
                .into_iter()
                .map(|s| (s.name, s.is_refinable))
                .collect();
            assert!(!refinable["Plain"]);
            assert!(refinable["Derived"]);
            assert!(refinable["Imp"]);
            assert!(!refinable["Alias"]);
            assert!(refinable["T"]);
            assert!(!refinable["U"]);
            assert!(!refinable["P"]);
            assert!(!refinable["L"]);
        }

        #[test]
        fn symbols_are_ordered_by_category_then_name() {
            let mut registry = TypeRegistry::new();
            let f = path("f.py");
            registry.add_type_alias("Zed", &f, "List[int]").unwrap();
            registry.add_local_class("B", &f, vec![]).unwrap();
            registry.add_local_class("A", &f, vec![]).unwrap();

            let names: Vec<_> = registry
                .symbols_in_file(&f)
                .iter()
                .map(|s| s.name())
                .collect();
            assert_eq!(names, vec!["A", "B", "Zed"]);
        }

        #[test]
        fn file_query_does_not_leak_prefix_paths() {
            let mut registry = TypeRegistry::new();
            registry.add_local_class("A", &path("pkg/a.py"), vec![]).unwrap();
            registry.add_local_class("B", &path("pkg/a.pyi"), vec![]).unwrap();

            let names: Vec<_> = registry
                .symbols_for_file(&path("pkg/a.py"))
                .into_iter()
                .map(|s| s.name)
                .collect();
            assert_eq!(names, vec!["A"]);
        }

        #[test]
        fn category_accessors_span_files() {
            let mut registry = TypeRegistry::new();
            registry.add_local_class("A", &path("a.py"), vec![]).unwrap();
            registry.add_local_class("A", &path("b.py"), vec![]).unwrap();
            assert_eq!(registry.local_classes().len(), 2);
        }
    }

    mod details {
        use super::*;

        #[test]
        fn detail_strings() {
            let f = path("f.py");
            let class = LocalClass {
                name: "Foo".into(),
                file: f.clone(),
                base_classes: strings(&["A", "B"]),
            };
            assert_eq!(TypeSymbol::LocalClass(&class).detail(), "Local class extends A, B");

            let imported = ImportedClass {
                name: "G".into(),
                file: f.clone(),
                original_name: "Group".into(),
                module: Some("models".into()),
            };
            assert_eq!(
                TypeSymbol::ImportedClass(&imported).detail(),
                "Imported from models as alias of Group"
            );

            let tv = TypeVariable {
                name: "T".into(),
                file: f.clone(),
                constraints: strings(&["int", "str"]),
                bound: None,
            };
            assert_eq!(TypeSymbol::TypeVariable(&tv).detail(), "TypeVar bound to int | str");

            let literal = LiteralType {
                name: "Mode".into(),
                file: f,
                values: vec![
                    LiteralValue::String("a".into()),
                    LiteralValue::Number("1".into()),
                ],
            };
            assert_eq!(TypeSymbol::LiteralType(&literal).detail(), "Literal: \"a\" | 1");
        }

        #[test]
        fn insertable_names() {
            assert!(is_insertable_name("Foo"));
            assert!(!is_insertable_name(""));
            assert!(!is_insertable_name("   "));
            assert!(!is_insertable_name("super"));
        }

        #[test]
        fn registry_error_converts_to_invalid_arguments() {
            let err: TypecompError = RegistryError::InvalidInput { field: "name" }.into();
            assert!(matches!(err, TypecompError::InvalidArguments { .. }));
        }
    }
}
