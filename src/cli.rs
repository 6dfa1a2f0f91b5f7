// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Command implementations behind the `typecomp` binary.
//!
//! Each command builds a fresh [`Session`], optionally scans a workspace,
//! opens the target file as a document, and returns a serializable response.
//! Printing is left to the binary.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::completion::{CompletionCandidate, CompletionRequest};
use crate::document::{Document, DocumentId};
use crate::error::TypecompError;
use crate::registry::FileSymbol;
use crate::session::{ScanSummary, Session};
use crate::settings::CompletionSettings;
use crate::types::Position;

// ============================================================================
// Responses
// ============================================================================

/// Payload of `typecomp symbols`.
#[derive(Debug, Clone, Serialize)]
pub struct SymbolsResponse {
    pub file: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan: Option<ScanSummary>,
    pub symbols: Vec<FileSymbol>,
}

/// Payload of `typecomp complete`.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionResponse {
    pub file: PathBuf,
    pub position: Position,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan: Option<ScanSummary>,
    pub candidates: Vec<CompletionCandidate>,
}

/// Options shared by every command.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Workspace root to scan before answering.
    pub workspace: Option<PathBuf>,
    /// JSON settings file.
    pub config: Option<PathBuf>,
}

// ============================================================================
// Commands
// ============================================================================

struct Loaded {
    session: Session,
    scan: Option<ScanSummary>,
    id: DocumentId,
    /// Absolute spelling of the requested file, matching scanned paths.
    path: PathBuf,
}

/// Load settings, scan the workspace if asked, and open `file`.
async fn load(file: &Path, options: &SessionOptions) -> Result<Loaded, TypecompError> {
    let settings = match &options.config {
        Some(path) => CompletionSettings::from_file(path)?,
        None => CompletionSettings::default(),
    };
    let mut session = Session::new(settings);

    let scan = match &options.workspace {
        Some(root) => Some(session.scan_workspace(root).await?),
        None => None,
    };

    let not_found = || TypecompError::file_not_found(file.display().to_string());
    let path = std::path::absolute(file).map_err(|_| not_found())?;
    let text = tokio::fs::read_to_string(&path)
        .await
        .map_err(|_| not_found())?;
    let document = Document::from_path(&path, text);
    let id = document.id.clone();
    session.open_document(document)?;

    Ok(Loaded {
        session,
        scan,
        id,
        path,
    })
}

/// List the type symbols defined in `file`.
pub async fn run_symbols(
    file: &Path,
    options: &SessionOptions,
) -> Result<SymbolsResponse, TypecompError> {
    let loaded = load(file, options).await?;
    Ok(SymbolsResponse {
        file: file.to_path_buf(),
        scan: loaded.scan,
        symbols: loaded.session.symbols_for_file(&loaded.path),
    })
}

/// Completion candidates at `request.position` in `file`.
pub async fn run_complete(
    file: &Path,
    request: &CompletionRequest,
    options: &SessionOptions,
) -> Result<CompletionResponse, TypecompError> {
    let mut loaded = load(file, options).await?;
    let candidates =
        loaded
            .session
            .complete(&loaded.id, request, &CancellationToken::new())?;
    Ok(CompletionResponse {
        file: file.to_path_buf(),
        position: request.position,
        scan: loaded.scan,
        candidates: candidates.as_ref().clone(),
    })
}
