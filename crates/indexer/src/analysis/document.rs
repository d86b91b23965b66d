//! Per-file analysis result.

use super::partition::SymbolPartition;
use super::types::{
    Chunk, DocumentUri, RequireEdge, SearchMode, SearchScope, Symbol, normalize_search_name,
};
use crate::parsing::ast::SourceFile;
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::sync::Arc;

/// How complete a document's index is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DocumentState {
    /// Built from an error-free parse.
    Complete,
    /// Built from the recoverable declarations of a file with syntax errors.
    Degraded,
    /// Created because another file requires it; holds reverse edges only.
    Placeholder,
}

/// Symbol tables, chunk tree and require edges of one file.
///
/// A document is replaced wholesale on every rebuild; only `referenced_by`
/// (owned by other files' builds) is carried from one instance to the next.
#[derive(Debug, Clone)]
pub struct DocumentIndex {
    pub uri: DocumentUri,
    pub state: DocumentState,
    pub(crate) source: SourceFile,
    pub(crate) all: SymbolPartition,
    pub(crate) global: SymbolPartition,
    pub(crate) local: SymbolPartition,
    /// Chunks keyed by name; the file chunk is keyed by the file name.
    pub(crate) chunks: FxHashMap<String, Chunk>,
    pub(crate) file_chunk_name: String,
    pub(crate) requires: Vec<RequireEdge>,
    pub(crate) referenced_by: Vec<DocumentUri>,
}

impl DocumentIndex {
    pub fn placeholder(uri: DocumentUri) -> Self {
        let file_chunk_name = uri.file_name().to_string();
        Self {
            uri,
            state: DocumentState::Placeholder,
            source: SourceFile::default(),
            all: SymbolPartition::new(),
            global: SymbolPartition::new(),
            local: SymbolPartition::new(),
            chunks: FxHashMap::default(),
            file_chunk_name,
            requires: Vec::new(),
            referenced_by: Vec::new(),
        }
    }

    pub fn partition(&self, scope: SearchScope) -> &SymbolPartition {
        match scope {
            SearchScope::All => &self.all,
            SearchScope::Global => &self.global,
            SearchScope::Local => &self.local,
        }
    }

    pub fn search(&self, name: &str, mode: SearchMode, scope: SearchScope) -> Vec<Arc<Symbol>> {
        self.partition(scope)
            .search(&normalize_search_name(name), mode)
    }

    pub fn symbols(&self) -> &[Arc<Symbol>] {
        self.all.symbols()
    }

    pub fn source(&self) -> &SourceFile {
        &self.source
    }

    pub fn requires(&self) -> &[RequireEdge] {
        &self.requires
    }

    pub fn referenced_by(&self) -> &[DocumentUri] {
        &self.referenced_by
    }

    pub fn chunk(&self, name: &str) -> Option<&Chunk> {
        self.chunks.get(name)
    }

    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.values()
    }

    pub fn file_chunk(&self) -> Option<&Chunk> {
        self.chunks.get(&self.file_chunk_name)
    }

    /// The variable this file returns, when it ends in `return <identifier>`.
    pub fn return_name(&self) -> Option<&str> {
        self.file_chunk()
            .and_then(|chunk| chunk.return_name.as_deref())
    }

    pub fn is_local_name(&self, search_name: &str) -> bool {
        self.local.contains(search_name)
    }

    pub(crate) fn add_referenced_by(&mut self, uri: &DocumentUri) {
        if !self.referenced_by.contains(uri) {
            self.referenced_by.push(uri.clone());
        }
    }

    pub(crate) fn remove_referenced_by(&mut self, uri: &DocumentUri) {
        self.referenced_by.retain(|existing| existing != uri);
    }

    /// Function declared on `line`, if any.
    pub fn function_at_line(&self, line: u32) -> Option<&Arc<Symbol>> {
        self.all.symbols().iter().find(|symbol| {
            symbol.kind == super::types::SymbolKind::Function && symbol.start_line() == line
        })
    }
}
