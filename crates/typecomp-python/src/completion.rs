// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Completion candidate builder.
//!
//! Produces, in order: custom symbols defined in the requesting file, builtin
//! catalog types, then `typing` catalog types. Each candidate carries a sort
//! key of the form `PPP:Name`, where `PPP` is the configured priority of its
//! source, so hosts that sort by key keep that grouping with alphabetical
//! order inside each group.
//!
//! Building polls a [`CancellationToken`] before every candidate. Once it
//! fires, the candidates accumulated so far are returned as
//! [`Computed::Abandoned`] so the cache does not keep the partial list.

use std::path::Path;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use typecomp_core::settings::CompletionSettings;
use typecomp_core::types::Position;

use crate::cache::Computed;
use crate::catalog::{CatalogEntry, TypeCatalog};
use crate::imports::{ImportEdit, ImportResolution, TypingImports};
use crate::registry::{TypeRegistry, TypeSymbol};

// ============================================================================
// Candidate Types
// ============================================================================

/// Where a candidate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateSource {
    Custom,
    Builtin,
    Typing,
}

impl CandidateSource {
    pub fn tag(&self) -> &'static str {
        match self {
            CandidateSource::Custom => "[custom]",
            CandidateSource::Builtin => "[builtin]",
            CandidateSource::Typing => "[typing]",
        }
    }

    fn priority(&self, settings: &CompletionSettings) -> u8 {
        match self {
            CandidateSource::Custom => settings.custom_priority,
            CandidateSource::Builtin => settings.builtin_priority,
            CandidateSource::Typing => settings.typing_priority,
        }
    }
}

/// Text to insert when it differs from the label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum InsertText {
    Plain(String),
    /// Contains a `$1` tab stop.
    Snippet(String),
}

/// One completion suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionCandidate {
    pub label: String,
    /// Source tag followed by a sub-kind description.
    pub detail: String,
    pub sort_key: String,
    pub source: CandidateSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insert_text: Option<InsertText>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub import_edit: Option<ImportEdit>,
    pub is_refinable: bool,
    pub preselect: bool,
}

/// Editor request context for one completion call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionRequest {
    pub position: Position,
    pub trigger: Option<char>,
    /// Name the caller expects; an exact match is preselected.
    pub target_name: Option<String>,
    /// Skip annotation-context detection.
    pub forced: bool,
}

impl CompletionRequest {
    pub fn at(position: Position) -> Self {
        CompletionRequest {
            position,
            ..Default::default()
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target_name = Some(target.into());
        self
    }

    pub fn forced(mut self) -> Self {
        self.forced = true;
        self
    }

}

/// Cache key of a document's candidate list. Preselection is applied to a
/// copy, so one entry serves every target.
pub const COMPLETIONS_KEY: &str = "completions";

// ============================================================================
// Annotation Context
// ============================================================================

/// Statement keywords whose trailing `:` opens a block.
const BLOCK_KEYWORDS: &[&str] = &[
    "class", "if", "elif", "else", "for", "while", "try", "except", "finally", "with", "lambda",
    "match", "case",
];

#[derive(Debug, Default)]
struct Depths {
    paren: i32,
    square: i32,
    brace: i32,
}

/// Bracket nesting at the end of `text`, ignoring quoted strings.
fn depths(text: &str) -> Depths {
    let mut depths = Depths::default();
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for c in text.chars() {
        if let Some(q) = quote {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                _ if c == q => quote = None,
                _ => {}
            }
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '#' => break,
            '(' => depths.paren += 1,
            ')' => depths.paren -= 1,
            '[' => depths.square += 1,
            ']' => depths.square -= 1,
            '{' => depths.brace += 1,
            '}' => depths.brace -= 1,
            _ => {}
        }
    }
    depths
}

/// Whether the cursor (end of `line_prefix`) sits where a type is expected:
/// after `:` in an annotation, after `->`, after `|` in an annotation, or
/// inside the brackets of a subscript.
pub fn is_annotation_context(line_prefix: &str) -> bool {
    // The partial name being typed does not change the context.
    let head = line_prefix
        .trim_end_matches(|c: char| c.is_alphanumeric() || c == '_' || c == '.')
        .trim_end();
    let statement = head.trim_start();
    let depths = depths(head);
    if depths.brace > 0 || statement.starts_with('#') {
        return false;
    }

    if head.ends_with("->") {
        return true;
    }
    let annotated = statement.contains(':') || statement.contains("->");
    if head.ends_with('[') || (head.ends_with(',') && depths.square > 0) {
        return depths.square > 0 && annotated;
    }
    if head.ends_with('|') {
        return annotated;
    }
    if head.ends_with(':') {
        if statement.split_whitespace().any(|word| word == "lambda") {
            return false;
        }
        let mut words = statement
            .split(|c: char| !(c.is_alphanumeric() || c == '_'))
            .filter(|word| !word.is_empty());
        let mut first_word = words.next().unwrap_or("");
        if first_word == "async" {
            // `async def`, `async for`, `async with`
            first_word = words.next().unwrap_or("");
        }
        if first_word == "def" {
            return depths.paren > 0;
        }
        return !BLOCK_KEYWORDS.contains(&first_word) && depths.square == 0;
    }
    false
}

// ============================================================================
// Builder
// ============================================================================

/// Builds the candidate list for one document.
#[derive(Debug)]
pub struct CompletionBuilder<'a> {
    registry: &'a TypeRegistry,
    settings: &'a CompletionSettings,
    imports: &'a TypingImports,
    catalog: TypeCatalog,
}

impl<'a> CompletionBuilder<'a> {
    pub fn new(
        registry: &'a TypeRegistry,
        settings: &'a CompletionSettings,
        imports: &'a TypingImports,
    ) -> Self {
        CompletionBuilder {
            registry,
            settings,
            imports,
            catalog: TypeCatalog,
        }
    }

    /// Candidates for a document whose defining file is `file`.
    ///
    /// `target` marks the first exact label match as preselected.
    pub fn build(
        &self,
        file: &Path,
        target: Option<&str>,
        cancel: &CancellationToken,
    ) -> Computed<Vec<CompletionCandidate>> {
        self.build_until(file, target, || cancel.is_cancelled())
    }

    /// [`build`](Self::build) with an arbitrary stop condition, polled once
    /// before each candidate.
    fn build_until(
        &self,
        file: &Path,
        target: Option<&str>,
        mut stop: impl FnMut() -> bool,
    ) -> Computed<Vec<CompletionCandidate>> {
        let mut candidates = Vec::new();

        if self.settings.enable_custom_types {
            for symbol in self.registry.symbols_in_file(file) {
                if stop() {
                    return self.abandon(candidates);
                }
                candidates.push(self.custom_candidate(symbol));
            }
        }

        if self.settings.enable_base_types {
            for entry in self.catalog.builtins() {
                if stop() {
                    return self.abandon(candidates);
                }
                candidates.push(self.builtin_candidate(entry));
            }
            for entry in self.catalog.typing() {
                if stop() {
                    return self.abandon(candidates);
                }
                candidates.push(self.typing_candidate(entry));
            }
        }

        if let Some(target) = target {
            mark_preselect(&mut candidates, target);
        }
        tracing::debug!(file = %file.display(), count = candidates.len(), "built completion list");
        Computed::Complete(candidates)
    }

    fn abandon(&self, candidates: Vec<CompletionCandidate>) -> Computed<Vec<CompletionCandidate>> {
        tracing::debug!(count = candidates.len(), "completion cancelled");
        Computed::Abandoned(candidates)
    }

    fn sort_key(&self, source: CandidateSource, label: &str) -> String {
        format!("{:03}:{}", source.priority(self.settings), label)
    }

    /// Snippet for refinable names when brackets are on, else plain text if
    /// the spelling differs from the label.
    fn insert_text(&self, label: &str, spelling: &str, refinable: bool) -> Option<InsertText> {
        if refinable && self.settings.append_brackets {
            Some(InsertText::Snippet(format!("{}[$1]", spelling)))
        } else if spelling != label {
            Some(InsertText::Plain(spelling.to_string()))
        } else {
            None
        }
    }

    fn custom_candidate(&self, symbol: TypeSymbol<'_>) -> CompletionCandidate {
        let label = symbol.name();
        let refinable = symbol.is_refinable();
        CompletionCandidate {
            label: label.to_string(),
            detail: format!("{} {}", CandidateSource::Custom.tag(), symbol.detail()),
            sort_key: self.sort_key(CandidateSource::Custom, label),
            source: CandidateSource::Custom,
            insert_text: self.insert_text(label, label, refinable),
            import_edit: None,
            is_refinable: refinable,
            preselect: false,
        }
    }

    fn builtin_candidate(&self, entry: &CatalogEntry) -> CompletionCandidate {
        CompletionCandidate {
            label: entry.name.to_string(),
            detail: format!("{} builtin type", CandidateSource::Builtin.tag()),
            sort_key: self.sort_key(CandidateSource::Builtin, entry.name),
            source: CandidateSource::Builtin,
            insert_text: self.insert_text(entry.name, entry.name, entry.refinable),
            import_edit: None,
            is_refinable: entry.refinable,
            preselect: false,
        }
    }

    fn typing_candidate(&self, entry: &CatalogEntry) -> CompletionCandidate {
        let (spelling, import_edit) = match self.imports.resolve(entry.name) {
            ImportResolution::AlreadyImported => (entry.name.to_string(), None),
            ImportResolution::Qualified(spelling) => (spelling, None),
            ImportResolution::Needs(edit) => (entry.name.to_string(), Some(edit)),
        };
        CompletionCandidate {
            label: entry.name.to_string(),
            detail: format!("{} typing.{}", CandidateSource::Typing.tag(), entry.name),
            sort_key: self.sort_key(CandidateSource::Typing, entry.name),
            source: CandidateSource::Typing,
            insert_text: self.insert_text(entry.name, &spelling, entry.refinable),
            import_edit,
            is_refinable: entry.refinable,
            preselect: false,
        }
    }
}

/// Preselect the highest-priority exact match for `target`.
pub fn mark_preselect(candidates: &mut [CompletionCandidate], target: &str) {
    let best = candidates
        .iter_mut()
        .filter(|c| c.label == target)
        .min_by(|a, b| a.sort_key.cmp(&b.sort_key));
    if let Some(candidate) = best {
        candidate.preselect = true;
        candidate.sort_key.insert(0, '!');
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn file() -> PathBuf {
        PathBuf::from("/ws/app.py")
    }

    fn registry() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        registry
            .add_local_class("Foo", &file(), vec!["Bar".to_string()])
            .unwrap();
        registry.add_type_alias("Vector", &file(), "List[float]").unwrap();
        registry
            .add_local_class("Elsewhere", Path::new("/ws/other.py"), vec![])
            .unwrap();
        registry
    }

    fn build(
        registry: &TypeRegistry,
        settings: &CompletionSettings,
        imports: &TypingImports,
        target: Option<&str>,
    ) -> Vec<CompletionCandidate> {
        CompletionBuilder::new(registry, settings, imports)
            .build(&file(), target, &CancellationToken::new())
            .into_inner()
    }

    fn find<'c>(candidates: &'c [CompletionCandidate], label: &str) -> &'c CompletionCandidate {
        candidates
            .iter()
            .find(|c| c.label == label)
            .unwrap_or_else(|| panic!("no candidate {label}"))
    }

    mod ordering {
        use super::*;

        #[test]
        fn custom_then_builtin_then_typing() {
            let registry = registry();
            let candidates = build(
                &registry,
                &CompletionSettings::default(),
                &TypingImports::default(),
                None,
            );
            let sources: Vec<_> = candidates.iter().map(|c| c.source).collect();
            let first_builtin = sources
                .iter()
                .position(|s| *s == CandidateSource::Builtin)
                .unwrap();
            let first_typing = sources
                .iter()
                .position(|s| *s == CandidateSource::Typing)
                .unwrap();
            assert!(sources[..first_builtin]
                .iter()
                .all(|s| *s == CandidateSource::Custom));
            assert!(first_builtin < first_typing);
            assert_eq!(first_builtin, 2);
        }

        #[test]
        fn custom_symbols_are_scoped_to_file() {
            let registry = registry();
            let candidates = build(
                &registry,
                &CompletionSettings::default(),
                &TypingImports::default(),
                None,
            );
            assert!(candidates.iter().all(|c| c.label != "Elsewhere"));
        }

        #[test]
        fn sort_keys_use_priorities() {
            let registry = registry();
            let candidates = build(
                &registry,
                &CompletionSettings::default(),
                &TypingImports::default(),
                None,
            );
            assert_eq!(find(&candidates, "Foo").sort_key, "000:Foo");
            assert_eq!(find(&candidates, "int").sort_key, "001:int");
            assert_eq!(find(&candidates, "List").sort_key, "002:List");
        }

        #[test]
        fn sources_can_be_disabled() {
            let registry = registry();
            let settings = CompletionSettings {
                enable_base_types: false,
                ..Default::default()
            };
            let candidates = build(&registry, &settings, &TypingImports::default(), None);
            assert_eq!(candidates.len(), 2);

            let settings = CompletionSettings {
                enable_custom_types: false,
                ..Default::default()
            };
            let candidates = build(&registry, &settings, &TypingImports::default(), None);
            assert!(candidates.iter().all(|c| c.source != CandidateSource::Custom));
        }
    }

    mod insertion {
        use super::*;

        #[test]
        fn refinable_candidates_get_snippets() {
            let registry = registry();
            let candidates = build(
                &registry,
                &CompletionSettings::default(),
                &TypingImports::default(),
                None,
            );
            assert_eq!(
                find(&candidates, "Foo").insert_text,
                Some(InsertText::Snippet("Foo[$1]".to_string()))
            );
            assert_eq!(
                find(&candidates, "list").insert_text,
                Some(InsertText::Snippet("list[$1]".to_string()))
            );
            assert_eq!(find(&candidates, "int").insert_text, None);
            assert_eq!(find(&candidates, "Vector").insert_text, None);
        }

        #[test]
        fn brackets_can_be_disabled() {
            let registry = registry();
            let settings = CompletionSettings {
                append_brackets: false,
                ..Default::default()
            };
            let candidates = build(&registry, &settings, &TypingImports::default(), None);
            assert_eq!(find(&candidates, "Foo").insert_text, None);
            assert!(find(&candidates, "Foo").is_refinable);
        }

        #[test]
        fn typing_candidates_carry_import_edits() {
            let registry = TypeRegistry::new();
            let candidates = build(
                &registry,
                &CompletionSettings::default(),
                &TypingImports::default(),
                None,
            );
            let list = find(&candidates, "List");
            let edit = list.import_edit.as_ref().unwrap();
            assert_eq!(edit.edits[0].new_text, "from typing import List\n");
            assert!(find(&candidates, "int").import_edit.is_none());
        }

        #[test]
        fn details_are_tagged() {
            let registry = registry();
            let candidates = build(
                &registry,
                &CompletionSettings::default(),
                &TypingImports::default(),
                None,
            );
            assert_eq!(find(&candidates, "Foo").detail, "[custom] Local class extends Bar");
            assert_eq!(find(&candidates, "Vector").detail, "[custom] Alias for List[float]");
            assert!(find(&candidates, "str").detail.starts_with("[builtin]"));
            assert!(find(&candidates, "Any").detail.starts_with("[typing]"));
        }
    }

    mod preselect {
        use super::*;

        #[test]
        fn exact_target_is_preselected_once() {
            let mut registry = TypeRegistry::new();
            registry.add_local_class("List", &file(), vec![]).unwrap();
            let candidates = build(
                &registry,
                &CompletionSettings::default(),
                &TypingImports::default(),
                Some("List"),
            );
            let selected: Vec<_> = candidates.iter().filter(|c| c.preselect).collect();
            assert_eq!(selected.len(), 1);
            assert_eq!(selected[0].source, CandidateSource::Custom);
            assert_eq!(selected[0].sort_key, "!000:List");
        }

        #[test]
        fn no_match_selects_nothing() {
            let registry = TypeRegistry::new();
            let candidates = build(
                &registry,
                &CompletionSettings::default(),
                &TypingImports::default(),
                Some("Nope"),
            );
            assert!(candidates.iter().all(|c| !c.preselect));
        }

        #[test]
        fn preselect_marks_a_copy() {
            let registry = registry();
            let list = build(
                &registry,
                &CompletionSettings::default(),
                &TypingImports::default(),
                None,
            );
            let mut targeted = list.clone();
            mark_preselect(&mut targeted, "Foo");
            assert!(find(&targeted, "Foo").preselect);
            assert!(list.iter().all(|c| !c.preselect));
        }
    }

    mod cancellation {
        use super::*;

        #[test]
        fn cancelled_build_is_abandoned() {
            let registry = registry();
            let settings = CompletionSettings::default();
            let imports = TypingImports::default();
            let cancel = CancellationToken::new();
            cancel.cancel();
            let result = CompletionBuilder::new(&registry, &settings, &imports).build(
                &file(),
                None,
                &cancel,
            );
            assert_eq!(result, Computed::Abandoned(vec![]));
        }

        #[test]
        fn cancellation_keeps_candidates_already_built() {
            let registry = registry();
            let settings = CompletionSettings::default();
            let imports = TypingImports::default();
            let custom = registry.symbols_in_file(&file()).len();

            // Stop right after the custom section.
            let mut polls = 0;
            let result = CompletionBuilder::new(&registry, &settings, &imports).build_until(
                &file(),
                None,
                || {
                    polls += 1;
                    polls > custom
                },
            );

            assert!(!result.is_complete());
            let labels: Vec<_> = result.into_inner().into_iter().map(|c| c.label).collect();
            assert_eq!(labels, vec!["Foo", "Vector"]);
        }
    }

    mod context {
        use super::*;

        #[test]
        fn annotation_positions() {
            for prefix in [
                "x: ",
                "x: Li",
                "def f(a: ",
                "def f(a: int, b: ",
                "async def f(a: ",
                "async def f(a: int, b: ",
                "async def f() -> ",
                "def f() -> ",
                "def f() -> Opt",
                "x: Dict[str, ",
                "x: List[",
                "x: int | ",
                "    name: typing.Li",
            ] {
                assert!(is_annotation_context(prefix), "{prefix:?}");
            }
        }

        #[test]
        fn non_annotation_positions() {
            for prefix in [
                "",
                "x = ",
                "def f():",
                "class A:",
                "if x:",
                "for a in b:",
                "async for a in b:",
                "async with lock:",
                "async def f():",
                "d = {'a': ",
                "print(x, ",
                "# x: ",
                "items[",
            ] {
                assert!(!is_annotation_context(prefix), "{prefix:?}");
            }
        }
    }
}
