// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Static catalog of builtin and `typing` type names.
//!
//! Each entry records whether the type is *refinable*: whether it accepts
//! type parameters in brackets (`list[int]`, `Dict[str, Any]`). Refinable
//! entries get a bracket snippet on insertion; atomic ones insert bare.

use serde::Serialize;

/// Where a catalog type lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogModule {
    /// Available without import.
    Builtin,
    /// Requires an import from `typing`.
    Typing,
}

/// One catalog type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub name: &'static str,
    pub module: CatalogModule,
    pub refinable: bool,
}

const fn builtin(name: &'static str, refinable: bool) -> CatalogEntry {
    CatalogEntry {
        name,
        module: CatalogModule::Builtin,
        refinable,
    }
}

const fn typing(name: &'static str, refinable: bool) -> CatalogEntry {
    CatalogEntry {
        name,
        module: CatalogModule::Typing,
        refinable,
    }
}

/// Module names whose imports are served from this catalog rather than
/// extracted as custom symbols.
pub const TYPING_MODULES: &[&str] = &["typing", "typing_extensions"];

/// Whether `module` is one of the typing-equivalent modules.
pub fn is_typing_module(module: &str) -> bool {
    TYPING_MODULES.contains(&module)
}

const BUILTINS: &[CatalogEntry] = &[
    builtin("bool", false),
    builtin("bytearray", false),
    builtin("bytes", false),
    builtin("complex", false),
    builtin("dict", true),
    builtin("float", false),
    builtin("frozenset", true),
    builtin("int", false),
    builtin("list", true),
    builtin("memoryview", false),
    builtin("object", false),
    builtin("range", false),
    builtin("set", true),
    builtin("slice", false),
    builtin("str", false),
    builtin("tuple", true),
    builtin("type", true),
];

const TYPING: &[CatalogEntry] = &[
    typing("AbstractSet", true),
    typing("Annotated", true),
    typing("Any", false),
    typing("AnyStr", false),
    typing("AsyncGenerator", true),
    typing("AsyncIterable", true),
    typing("AsyncIterator", true),
    typing("Awaitable", true),
    typing("BinaryIO", false),
    typing("Callable", true),
    typing("ChainMap", true),
    typing("ClassVar", true),
    typing("Collection", true),
    typing("Concatenate", true),
    typing("Container", true),
    typing("ContextManager", true),
    typing("Coroutine", true),
    typing("Counter", true),
    typing("DefaultDict", true),
    typing("Deque", true),
    typing("Dict", true),
    typing("Final", true),
    typing("FrozenSet", true),
    typing("Generator", true),
    typing("Generic", true),
    typing("Hashable", false),
    typing("IO", true),
    typing("ItemsView", true),
    typing("Iterable", true),
    typing("Iterator", true),
    typing("KeysView", true),
    typing("List", true),
    typing("Literal", true),
    typing("LiteralString", false),
    typing("Mapping", true),
    typing("MutableMapping", true),
    typing("MutableSequence", true),
    typing("MutableSet", true),
    typing("NamedTuple", false),
    typing("Never", false),
    typing("NoReturn", false),
    typing("NotRequired", true),
    typing("Optional", true),
    typing("OrderedDict", true),
    typing("Protocol", true),
    typing("Required", true),
    typing("Reversible", true),
    typing("Self", false),
    typing("Sequence", true),
    typing("Set", true),
    typing("Sized", false),
    typing("SupportsAbs", true),
    typing("SupportsBytes", false),
    typing("SupportsFloat", false),
    typing("SupportsIndex", false),
    typing("SupportsInt", false),
    typing("TextIO", false),
    typing("Tuple", true),
    typing("Type", true),
    typing("TypeAlias", false),
    typing("TypeGuard", true),
    typing("TypedDict", false),
    typing("Union", true),
    typing("Unpack", true),
    typing("ValuesView", true),
];

/// Read-only view over the builtin and typing tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeCatalog;

impl TypeCatalog {
    /// Builtin types, alphabetical.
    pub fn builtins(&self) -> &'static [CatalogEntry] {
        BUILTINS
    }

    /// `typing` types, alphabetical.
    pub fn typing(&self) -> &'static [CatalogEntry] {
        TYPING
    }

    /// Look up a name in either table. Builtins win on a (hypothetical) tie.
    pub fn lookup(&self, name: &str) -> Option<&'static CatalogEntry> {
        BUILTINS
            .iter()
            .chain(TYPING.iter())
            .find(|entry| entry.name == name)
    }

    /// Whether `name` is a known type that accepts type parameters.
    pub fn is_refinable(&self, name: &str) -> bool {
        self.lookup(name).is_some_and(|entry| entry.refinable)
    }
}
