//! Loading a directory of plain-text files as [`Document`]s.

use std::fs;
use std::path::Path;

use tracing::debug;
use walkdir::WalkDir;

use crate::document::Document;
use crate::error::{RagError, Result};

/// File extension of corpus documents when none is configured.
pub const DEFAULT_EXTENSION: &str = "txt";

/// Load every `*.{extension}` file directly under `dir`, sorted by file name.
///
/// The file name is the document id. Subdirectories are not descended into.
/// Empty files are returned too; ingestion treats them as ineligible.
///
/// # Errors
///
/// - [`RagError::SourceNotFound`] if `dir` does not exist or is not a directory
/// - [`RagError::Io`] if the directory cannot be listed or a file cannot be
///   read as UTF-8
pub fn load_corpus(dir: impl AsRef<Path>, extension: &str) -> Result<Vec<Document>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(RagError::SourceNotFound { path: dir.to_path_buf() });
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| RagError::Io {
            path: e.path().unwrap_or(dir).to_path_buf(),
            source: e.into(),
        })?;
        if entry.file_type().is_file()
            && entry.path().extension().is_some_and(|ext| ext == extension)
        {
            files.push(entry.into_path());
        }
    }
    files.sort();

    let mut documents = Vec::with_capacity(files.len());
    for path in files {
        let Some(id) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        let text = fs::read_to_string(&path)
            .map_err(|source| RagError::Io { path: path.clone(), source })?;
        debug!(document.id = %id, chars = text.chars().count(), "loaded document");
        documents.push(Document { id, text });
    }
    Ok(documents)
}
