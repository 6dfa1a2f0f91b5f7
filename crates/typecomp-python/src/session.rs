// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Completion session: owns the registry, the cache, and open documents.
//!
//! Every editor event funnels through [`Session`], which keeps one invariant:
//! the registry reflects exactly the latest parse of each tracked file. Each
//! (re-)analysis removes the file's symbols before inserting the new ones,
//! and every removal bumps the registry version, so cached lists computed
//! before the edit are never served after it.
//!
//! The cache validity stamp is the registry version plus a settings
//! generation, so a settings change also invalidates everything.
//!
//! Mutation takes `&mut self`; a host sharing a session across threads wraps
//! it in a mutex, which makes each registry update and each cache
//! lookup-then-store a single critical section.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use typecomp_core::error::TypecompError;
use typecomp_core::settings::CompletionSettings;
use typecomp_core::text::line_prefix;
use typecomp_core::workspace::{discover_files, FileFilter, ScanError};

use crate::cache::{CacheStats, ResultCache};
use crate::completion::{
    is_annotation_context, mark_preselect, CompletionBuilder, CompletionCandidate,
    CompletionRequest, COMPLETIONS_KEY,
};
use crate::declarations::{analyze, Declaration};
use crate::document::{Document, DocumentId};
use crate::imports::TypingImports;
use crate::registry::{is_insertable_name, FileSymbol, RegistryError, TypeRegistry};
use crate::syntax::SyntaxTreeService;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("unknown document: {0}")]
    UnknownDocument(DocumentId),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Scan(#[from] ScanError),
}

impl From<SessionError> for TypecompError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::UnknownDocument(id) => TypecompError::file_not_found(id.to_string()),
            SessionError::Registry(err) => err.into(),
            SessionError::Scan(err) => err.into(),
        }
    }
}

/// Outcome of a workspace scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    /// Files read and analyzed.
    pub analyzed: usize,
    /// Files that could not be read.
    pub skipped: usize,
}

#[derive(Debug)]
struct DocumentState {
    document: Document,
    imports: TypingImports,
}

// ============================================================================
// Session
// ============================================================================

#[derive(Debug)]
pub struct Session {
    settings: CompletionSettings,
    settings_generation: u64,
    syntax: SyntaxTreeService,
    registry: TypeRegistry,
    cache: ResultCache<Vec<CompletionCandidate>>,
    documents: HashMap<DocumentId, DocumentState>,
    /// Files discovered by the workspace scan or watch notifications.
    workspace_files: BTreeSet<PathBuf>,
}

impl Session {
    pub fn new(settings: CompletionSettings) -> Self {
        Self::with_syntax(settings, SyntaxTreeService::new())
    }

    /// Session over a caller-supplied syntax service (for example a stub).
    pub fn with_syntax(settings: CompletionSettings, syntax: SyntaxTreeService) -> Self {
        Session {
            settings,
            settings_generation: 0,
            syntax,
            registry: TypeRegistry::new(),
            cache: ResultCache::new(),
            documents: HashMap::new(),
            workspace_files: BTreeSet::new(),
        }
    }

    pub fn settings(&self) -> &CompletionSettings {
        &self.settings
    }

    /// Replace the settings. Every cached list becomes stale.
    pub fn update_settings(&mut self, settings: CompletionSettings) {
        self.settings = settings;
        self.settings_generation += 1;
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Direct registry access for hosts that feed symbols themselves.
    pub fn registry_mut(&mut self) -> &mut TypeRegistry {
        &mut self.registry
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn document(&self, id: &DocumentId) -> Option<&Document> {
        self.documents.get(id).map(|state| &state.document)
    }

    pub fn is_tracked(&self, path: &Path) -> bool {
        self.workspace_files.contains(path)
    }

    fn cache_version(&self) -> u64 {
        self.registry.version() + self.settings_generation
    }

    // ------------------------------------------------------------------------
    // Document events
    // ------------------------------------------------------------------------

    /// Start tracking an editor document and analyze its text.
    ///
    /// Returns the number of symbols registered for its file.
    pub fn open_document(&mut self, document: Document) -> Result<usize, SessionError> {
        let (count, imports) = self.analyze_file(&document.path, &document.text)?;
        self.cache.invalidate_document(&document.id);
        self.documents
            .insert(document.id.clone(), DocumentState { document, imports });
        Ok(count)
    }

    /// Replace a document's text and re-analyze it.
    pub fn change_document(
        &mut self,
        id: &DocumentId,
        text: impl Into<String>,
    ) -> Result<usize, SessionError> {
        let text = text.into();
        let path = self
            .documents
            .get(id)
            .map(|state| state.document.path.clone())
            .ok_or_else(|| SessionError::UnknownDocument(id.clone()))?;

        let (count, imports) = self.analyze_file(&path, &text)?;
        if let Some(state) = self.documents.get_mut(id) {
            state.document.text = text;
            state.imports = imports;
        }
        Ok(count)
    }

    /// Stop tracking an editor document.
    ///
    /// Files that are not part of the scanned workspace lose their symbols;
    /// workspace files keep the symbols of their last analysis.
    pub fn close_document(&mut self, id: &DocumentId) -> Result<(), SessionError> {
        let state = self
            .documents
            .remove(id)
            .ok_or_else(|| SessionError::UnknownDocument(id.clone()))?;
        self.cache.invalidate_document(id);
        if !self.is_tracked(&state.document.path) {
            self.registry.remove_all_for_file(&state.document.path);
        }
        Ok(())
    }

    /// A file was deleted from the workspace.
    pub fn delete_file(&mut self, path: &Path) {
        self.workspace_files.remove(path);
        self.registry.remove_all_for_file(path);
        let ids: Vec<DocumentId> = self
            .documents
            .iter()
            .filter(|(_, state)| state.document.path == path)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &ids {
            self.cache.invalidate_document(id);
        }
    }

    /// A watched file appeared on disk.
    pub async fn file_created(&mut self, path: &Path) -> bool {
        self.refresh_file(path).await
    }

    /// A watched file changed on disk.
    pub async fn file_changed(&mut self, path: &Path) -> bool {
        self.refresh_file(path).await
    }

    /// Read `path` and re-analyze it, unless an open editor buffer owns it.
    ///
    /// Returns `true` if the file was analyzed. Unreadable files are skipped.
    async fn refresh_file(&mut self, path: &Path) -> bool {
        self.workspace_files.insert(path.to_path_buf());
        if self.has_open_document(path) {
            tracing::debug!(file = %path.display(), "open buffer is authoritative; disk change ignored");
            return false;
        }
        match tokio::fs::read_to_string(path).await {
            Ok(text) => self.analyze_file(path, &text).is_ok(),
            Err(err) => {
                tracing::debug!(file = %path.display(), error = %err, "skipping unreadable file");
                false
            }
        }
    }

    fn has_open_document(&self, path: &Path) -> bool {
        self.documents
            .values()
            .any(|state| state.document.path == path)
    }

    // ------------------------------------------------------------------------
    // Workspace scan
    // ------------------------------------------------------------------------

    /// Discover and analyze every workspace file selected by the settings'
    /// include/exclude patterns.
    ///
    /// Files are read concurrently and applied as each read completes, in no
    /// particular order. A file that cannot be read is skipped.
    pub async fn scan_workspace(&mut self, root: &Path) -> Result<ScanSummary, SessionError> {
        let filter = FileFilter::new(&self.settings.include, &self.settings.exclude)?;
        let files = discover_files(root, &filter)?;

        let mut reads = JoinSet::new();
        for path in files {
            reads.spawn(async move {
                let text = tokio::fs::read_to_string(&path).await;
                (path, text)
            });
        }

        let mut summary = ScanSummary::default();
        while let Some(joined) = reads.join_next().await {
            let (path, text) = match joined {
                Ok(result) => result,
                Err(err) => {
                    tracing::warn!(error = %err, "scan task failed");
                    summary.skipped += 1;
                    continue;
                }
            };
            match text {
                Ok(text) => {
                    self.workspace_files.insert(path.clone());
                    if self.has_open_document(&path) {
                        continue;
                    }
                    match self.analyze_file(&path, &text) {
                        Ok(_) => summary.analyzed += 1,
                        Err(err) => {
                            tracing::debug!(file = %path.display(), error = %err, "skipping file");
                            summary.skipped += 1;
                        }
                    }
                }
                Err(err) => {
                    tracing::debug!(file = %path.display(), error = %err, "skipping unreadable file");
                    summary.skipped += 1;
                }
            }
        }

        tracing::info!(
            root = %root.display(),
            analyzed = summary.analyzed,
            skipped = summary.skipped,
            symbols = self.registry.len(),
            "workspace scan complete"
        );
        Ok(summary)
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// Completion candidates for an open document.
    ///
    /// Outside an annotation context (and without `forced`) the answer is an
    /// empty list, which is not cached. A cancelled build returns what it had
    /// accumulated and is not cached either.
    ///
    /// Each document caches a single list. A `target_name` preselects on a
    /// copy of it.
    pub fn complete(
        &mut self,
        id: &DocumentId,
        request: &CompletionRequest,
        cancel: &CancellationToken,
    ) -> Result<Arc<Vec<CompletionCandidate>>, SessionError> {
        let version = self.cache_version();
        let state = self
            .documents
            .get(id)
            .ok_or_else(|| SessionError::UnknownDocument(id.clone()))?;

        if !request.forced {
            let prefix = line_prefix(&state.document.text, request.position);
            if !is_annotation_context(prefix) {
                tracing::trace!(document = %id, "not an annotation context");
                return Ok(Arc::new(Vec::new()));
            }
        }

        let builder = CompletionBuilder::new(&self.registry, &self.settings, &state.imports);
        let path = &state.document.path;
        let list = self
            .cache
            .get_or_compute(COMPLETIONS_KEY, id, version, || {
                builder.build(path, None, cancel)
            });

        Ok(match request.target_name.as_deref() {
            Some(target) => {
                let mut candidates = list.as_ref().clone();
                mark_preselect(&mut candidates, target);
                Arc::new(candidates)
            }
            None => list,
        })
    }

    /// Flat listing of the symbols defined in `path`.
    pub fn symbols_for_file(&self, path: &Path) -> Vec<FileSymbol> {
        self.registry.symbols_for_file(path)
    }

    // ------------------------------------------------------------------------
    // Analysis
    // ------------------------------------------------------------------------

    /// Parse `text`, replace the symbols of `path`, and collect its typing
    /// imports.
    fn analyze_file(
        &mut self,
        path: &Path,
        text: &str,
    ) -> Result<(usize, TypingImports), RegistryError> {
        if path.as_os_str().is_empty() {
            return Err(RegistryError::InvalidInput { field: "file_path" });
        }

        self.syntax.parse(text);
        let declarations = analyze(&self.syntax);
        let imports = TypingImports::collect(&self.syntax);

        self.registry.remove_all_for_file(path);
        let mut count = 0;
        for declaration in declarations {
            if !is_insertable_name(declaration.name()) {
                tracing::trace!(name = declaration.name(), "skipping sentinel name");
                continue;
            }
            self.register(path, declaration)?;
            count += 1;
        }

        tracing::debug!(file = %path.display(), symbols = count, version = self.registry.version(), "analyzed file");
        Ok((count, imports))
    }

    fn register(&mut self, path: &Path, declaration: Declaration) -> Result<(), RegistryError> {
        let registry = &mut self.registry;
        match declaration {
            Declaration::Class { name, bases } => registry.add_local_class(&name, path, bases),
            Declaration::Protocol { name, methods } => registry.add_protocol(&name, path, methods),
            Declaration::Import {
                name,
                original_name,
                module,
            } => registry.add_imported_class(&name, path, &original_name, module),
            Declaration::TypeAlias {
                name,
                original_type,
            } => registry.add_type_alias(&name, path, &original_type),
            Declaration::TypeVariable {
                name,
                constraints,
                bound,
            } => registry.add_type_variable(&name, path, constraints, bound),
            Declaration::Literal { name, values } => {
                registry.add_literal_type(&name, path, values)
            }
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(CompletionSettings::default())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use typecomp_core::types::Position;

    fn open(session: &mut Session, path: &str, text: &str) -> DocumentId {
        let document = Document::from_path(path, text);
        let id = document.id.clone();
        session.open_document(document).unwrap();
        id
    }

    #[test]
    fn change_replaces_previous_symbols() {
        let mut session = Session::default();
        let id = open(&mut session, "/ws/a.py", "class Old(Base): ...\nV = List[int]\n");
        session.change_document(&id, "class New: ...\n").unwrap();

        let names: Vec<_> = session
            .symbols_for_file(Path::new("/ws/a.py"))
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["New"]);
    }

    #[test]
    fn close_untracked_document_drops_symbols() {
        let mut session = Session::default();
        let id = open(&mut session, "/ws/a.py", "class A: ...\n");
        session.close_document(&id).unwrap();
        assert!(session.symbols_for_file(Path::new("/ws/a.py")).is_empty());
        assert!(session.document(&id).is_none());
    }

    #[test]
    fn unknown_document_is_an_error() {
        let mut session = Session::default();
        let id = DocumentId::new("file:///missing.py");
        assert!(matches!(
            session.change_document(&id, ""),
            Err(SessionError::UnknownDocument(_))
        ));
        assert!(matches!(
            session.close_document(&id),
            Err(SessionError::UnknownDocument(_))
        ));
    }

    #[test]
    fn empty_path_is_rejected() {
        let mut session = Session::default();
        let err = session
            .open_document(Document::new(DocumentId::new("untitled:1"), "", "class A: ..."))
            .unwrap_err();
        assert!(matches!(err, SessionError::Registry(_)));
        assert_eq!(session.registry().version(), 0);
    }

    #[test]
    fn non_annotation_context_yields_empty_uncached_list() {
        let mut session = Session::default();
        let id = open(&mut session, "/ws/a.py", "x = \n");
        let request = CompletionRequest::at(Position::new(0, 4));
        let list = session
            .complete(&id, &request, &CancellationToken::new())
            .unwrap();
        assert!(list.is_empty());
        assert_eq!(session.cache_stats().misses, 0);
    }

    #[test]
    fn forced_request_ignores_context() {
        let mut session = Session::default();
        let id = open(&mut session, "/ws/a.py", "x = \n");
        let request = CompletionRequest::at(Position::new(0, 4)).forced();
        let list = session
            .complete(&id, &request, &CancellationToken::new())
            .unwrap();
        assert!(!list.is_empty());
    }

    #[test]
    fn settings_update_invalidates_cache() {
        let mut session = Session::default();
        let id = open(&mut session, "/ws/a.py", "x: \n");
        let request = CompletionRequest::at(Position::new(0, 3));
        let cancel = CancellationToken::new();
        let first = session.complete(&id, &request, &cancel).unwrap();

        session.update_settings(CompletionSettings {
            append_brackets: false,
            ..Default::default()
        });
        let second = session.complete(&id, &request, &cancel).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn open_buffer_wins_over_disk_change() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.py");
        std::fs::write(&path, "class Disk: ...\n").unwrap();

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let mut session = Session::default();
        session
            .open_document(Document::from_path(&path, "class Buffer: ...\n"))
            .unwrap();
        assert!(!runtime.block_on(session.file_changed(&path)));

        let names: Vec<_> = session
            .symbols_for_file(&path)
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["Buffer"]);
    }

    #[test]
    fn session_error_maps_to_exit_codes() {
        use typecomp_core::error::OutputErrorCode;
        let err: TypecompError = SessionError::UnknownDocument(DocumentId::new("x")).into();
        assert_eq!(err.error_code(), OutputErrorCode::ResolutionError);
        let err: TypecompError =
            SessionError::Registry(RegistryError::InvalidInput { field: "name" }).into();
        assert_eq!(err.error_code(), OutputErrorCode::InvalidArguments);
    }
}
