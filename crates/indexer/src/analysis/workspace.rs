//! Registry of document indexes across the three partitions, plus the
//! require-tree search that orders cross-file lookups.
//!
//! ## Search order
//!
//! `search_global_definition` and `search_for_completion` start at the
//! querying file (all of its symbols), then walk the require tree:
//!
//! 1. the file's `require` targets, most recently declared first, recursively;
//! 2. the files that require it (`referenced_by`), most recent first.
//!
//! Other files only contribute their global symbols. A shared visited set and
//! the configured depth cap keep require cycles finite. Definition search
//! stops at the first file that answers; completion concatenates every file
//! it reaches. Both fall back to a scan of every workspace file's globals,
//! and completion finally falls back to the preload partitions.
//!
//! ## Rebuilds
//!
//! A document is replaced wholesale. Its `referenced_by` list is carried
//! over, targets it no longer requires lose the reverse edge, and targets
//! that have never been seen are created on first access.

use super::builder::DocumentBuilder;
use super::document::{DocumentIndex, DocumentState};
use super::types::{
    DocumentUri, IndexPartition, SearchMode, SearchScope, Symbol, module_key,
    normalize_search_name,
};
use crate::error::Result;
use crate::execution::config::AnalysisConfig;
use crate::parsing::processor::LuaParser;
use crate::project::io::read_text_file;
use rustc_hash::{FxHashMap, FxHashSet};
use std::ops::ControlFlow;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

#[derive(Debug)]
pub struct WorkspaceIndex {
    config: AnalysisConfig,
    /// Only used through `&mut self`; the mutex keeps the index `Sync`.
    parser: Mutex<LuaParser>,
    workspace: FxHashMap<DocumentUri, DocumentIndex>,
    stdlib_preload: FxHashMap<DocumentUri, DocumentIndex>,
    user_preload: FxHashMap<DocumentUri, DocumentIndex>,
    /// Module name (file stem) to the first URI registered under it.
    module_cache: FxHashMap<String, DocumentUri>,
}

impl WorkspaceIndex {
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        Ok(Self {
            config,
            parser: Mutex::new(LuaParser::new()?),
            workspace: FxHashMap::default(),
            stdlib_preload: FxHashMap::default(),
            user_preload: FxHashMap::default(),
            module_cache: FxHashMap::default(),
        })
    }

    /// Drops every document and starts over with `config`.
    pub fn init(&mut self, config: AnalysisConfig) {
        self.reset();
        self.config = config;
    }

    pub fn reset(&mut self) {
        self.workspace.clear();
        self.stdlib_preload.clear();
        self.user_preload.clear();
        self.module_cache.clear();
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    fn partition(&self, partition: IndexPartition) -> &FxHashMap<DocumentUri, DocumentIndex> {
        match partition {
            IndexPartition::Workspace => &self.workspace,
            IndexPartition::StdlibPreload => &self.stdlib_preload,
            IndexPartition::UserPreload => &self.user_preload,
        }
    }

    fn partition_mut(
        &mut self,
        partition: IndexPartition,
    ) -> &mut FxHashMap<DocumentUri, DocumentIndex> {
        match partition {
            IndexPartition::Workspace => &mut self.workspace,
            IndexPartition::StdlibPreload => &mut self.stdlib_preload,
            IndexPartition::UserPreload => &mut self.user_preload,
        }
    }

    /// Makes `uri` resolvable by `require`. The first URI registered under a
    /// module name keeps it.
    pub fn register_module(&mut self, uri: &DocumentUri) {
        let module = uri.module_name().to_string();
        match self.module_cache.get(&module) {
            Some(existing) if existing != uri => {
                debug!(
                    module = %module,
                    kept = %existing,
                    ignored = %uri,
                    "Module name collision, keeping first registration"
                );
            }
            Some(_) => {}
            None => {
                self.module_cache.insert(module, uri.clone());
            }
        }
    }

    /// URI a `require` argument resolves to.
    pub fn resolve_module(&self, required: &str) -> Option<&DocumentUri> {
        self.module_cache.get(module_key(required))
    }

    pub fn document(&self, uri: &DocumentUri) -> Option<&DocumentIndex> {
        self.workspace.get(uri)
    }

    pub fn document_in(&self, partition: IndexPartition, uri: &DocumentUri) -> Option<&DocumentIndex> {
        self.partition(partition).get(uri)
    }

    /// Documents of a partition, ordered by URI.
    pub fn documents(&self, partition: IndexPartition) -> Vec<&DocumentIndex> {
        let mut documents: Vec<_> = self.partition(partition).values().collect();
        documents.sort_by(|a, b| a.uri.cmp(&b.uri));
        documents
    }

    pub fn document_count(&self, partition: IndexPartition) -> usize {
        self.partition(partition).len()
    }

    pub fn symbol_count(&self, partition: IndexPartition) -> usize {
        self.partition(partition)
            .values()
            .map(|document| document.symbols().len())
            .sum()
    }

    /// (Re)analyses a workspace file. Without `text` the file is read from
    /// disk.
    pub fn build_or_refresh_document(
        &mut self,
        uri: &DocumentUri,
        text: Option<&str>,
    ) -> Result<DocumentState> {
        self.build_or_refresh_in(IndexPartition::Workspace, uri, text)
    }

    pub fn build_or_refresh_in(
        &mut self,
        partition: IndexPartition,
        uri: &DocumentUri,
        text: Option<&str>,
    ) -> Result<DocumentState> {
        let text = match text {
            Some(text) => text.to_string(),
            None => read_text_file(&uri.to_file_path()?, self.config.max_file_size)?,
        };
        if partition == IndexPartition::Workspace {
            self.register_module(uri);
        }
        let state = self.rebuild(partition, uri, &text)?;

        if partition == IndexPartition::Workspace {
            let mut pending = vec![uri.clone()];
            while let Some(current) = pending.pop() {
                pending.extend(self.link_requires(&current));
            }
        }
        Ok(state)
    }

    /// Replaces one document and returns its resulting state.
    fn rebuild(&mut self, partition: IndexPartition, uri: &DocumentUri, text: &str) -> Result<DocumentState> {
        let outcome = self
            .parser
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .parse(uri.as_str(), text)?;

        let previous = self.partition(partition).get(uri);
        if outcome.is_degraded()
            && let Some(previous) = previous
            && previous.state == DocumentState::Complete
        {
            warn!(uri = %uri, "Syntax errors, keeping previous index");
            return Ok(DocumentState::Complete);
        }
        if outcome.is_degraded() {
            warn!(uri = %uri, "Syntax errors, indexing recoverable declarations only");
        }

        let mut document = DocumentBuilder::build(uri, outcome);
        let state = document.state;
        let previous = self.partition_mut(partition).remove(uri);
        let old_targets = match previous {
            Some(previous) => {
                let targets = self.require_targets(&previous);
                document.referenced_by = previous.referenced_by;
                targets
            }
            None => Vec::new(),
        };
        let new_targets = self.require_targets(&document);
        self.partition_mut(partition).insert(uri.clone(), document);

        if partition == IndexPartition::Workspace {
            for stale in old_targets.iter().filter(|target| !new_targets.contains(target)) {
                if let Some(target) = self.workspace.get_mut(stale) {
                    target.remove_referenced_by(uri);
                }
            }
        }
        Ok(state)
    }

    fn require_targets(&self, document: &DocumentIndex) -> Vec<DocumentUri> {
        document
            .requires()
            .iter()
            .filter_map(|edge| self.resolve_module(&edge.target_module))
            .cloned()
            .collect()
    }

    /// Adds the reverse edge to every resolvable require target of `uri`,
    /// creating targets seen for the first time. Returns the created ones.
    fn link_requires(&mut self, uri: &DocumentUri) -> Vec<DocumentUri> {
        let Some(document) = self.workspace.get(uri) else {
            return Vec::new();
        };
        let targets = self.require_targets(document);

        let mut created = Vec::new();
        for target in targets {
            if !self.workspace.contains_key(&target) {
                if self.load_from_disk(&target) {
                    created.push(target.clone());
                } else {
                    self.workspace
                        .insert(target.clone(), DocumentIndex::placeholder(target.clone()));
                }
            }
            if let Some(document) = self.workspace.get_mut(&target) {
                document.add_referenced_by(uri);
            }
        }
        created
    }

    fn load_from_disk(&mut self, uri: &DocumentUri) -> bool {
        let text = uri
            .to_file_path()
            .map_err(|e| e.to_string())
            .and_then(|path| {
                read_text_file(&path, self.config.max_file_size).map_err(|e| e.reason().to_string())
            });
        match text {
            Ok(text) => match self.rebuild(IndexPartition::Workspace, uri, &text) {
                Ok(_) => true,
                Err(e) => {
                    warn!(uri = %uri, error = %e, "Failed to build required document");
                    false
                }
            },
            Err(reason) => {
                warn!(uri = %uri, reason = %reason, "Required document is unreadable");
                false
            }
        }
    }

    /// Single-file lookup.
    pub fn search_in_doc(
        &self,
        uri: &DocumentUri,
        name: &str,
        mode: SearchMode,
        scope: SearchScope,
    ) -> Vec<Arc<Symbol>> {
        self.workspace
            .get(uri)
            .map(|document| document.search(name, mode, scope))
            .unwrap_or_default()
    }

    /// Definition search: first file on the require tree that answers, then
    /// every workspace file's globals.
    pub fn search_global_definition(
        &self,
        uri: &DocumentUri,
        name: &str,
        mode: SearchMode,
    ) -> Vec<Arc<Symbol>> {
        self.search_definition_with_scope(uri, name, mode, SearchScope::All)
    }

    /// [`search_global_definition`](Self::search_global_definition) with the
    /// querying document searched in `origin_scope`. A use that is not a
    /// visible local passes `Global`, so a same-named local elsewhere in the
    /// file cannot stop the walk.
    pub fn search_definition_with_scope(
        &self,
        uri: &DocumentUri,
        name: &str,
        mode: SearchMode,
        origin_scope: SearchScope,
    ) -> Vec<Arc<Symbol>> {
        let name = normalize_search_name(name);
        let mut found = Vec::new();
        self.walk_require_tree(uri, &mut |document, scope| {
            let scope = if document.uri == *uri { origin_scope } else { scope };
            let symbols = document.search(&name, mode, scope);
            if symbols.is_empty() {
                ControlFlow::Continue(())
            } else {
                found = symbols;
                ControlFlow::Break(())
            }
        });
        if found.is_empty() {
            found = self.search_workspace_globals(&name, mode);
        }
        found
    }

    /// Completion search: everything on the require tree, then workspace
    /// globals, then the preload partitions.
    pub fn search_for_completion(
        &self,
        uri: &DocumentUri,
        name: &str,
        mode: SearchMode,
    ) -> Vec<Arc<Symbol>> {
        let name = normalize_search_name(name);
        let mut found = Vec::new();
        self.walk_require_tree(uri, &mut |document, scope| {
            found.extend(document.search(&name, mode, scope));
            ControlFlow::Continue(())
        });
        if found.is_empty() {
            found = self.search_workspace_globals(&name, mode);
        }
        if found.is_empty() {
            found = self.search_preloads(&name, mode);
        }
        found
    }

    pub fn search_workspace_globals(&self, name: &str, mode: SearchMode) -> Vec<Arc<Symbol>> {
        self.documents(IndexPartition::Workspace)
            .into_iter()
            .flat_map(|document| document.search(name, mode, SearchScope::Global))
            .collect()
    }

    /// Preload stubs are searched whole, locals included.
    pub fn search_preloads(&self, name: &str, mode: SearchMode) -> Vec<Arc<Symbol>> {
        [IndexPartition::StdlibPreload, IndexPartition::UserPreload]
            .into_iter()
            .flat_map(|partition| self.documents(partition))
            .flat_map(|document| document.search(name, mode, SearchScope::All))
            .collect()
    }

    /// Workspace symbol search: every symbol of every workspace document,
    /// locals included, in URI order. Preloads are not searched.
    pub fn search_workspace(&self, query: &str, mode: SearchMode) -> Vec<Arc<Symbol>> {
        let query = normalize_search_name(query);
        let found: Vec<Arc<Symbol>> = self
            .documents(IndexPartition::Workspace)
            .into_iter()
            .flat_map(|document| document.search(&query, mode, SearchScope::All))
            .collect();
        debug!(query = %query, mode = %mode, found = found.len(), "Workspace symbol search");
        found
    }

    /// Visits the querying document (scope `All`) and then the require tree
    /// (scope `Global`) in search order until `visit` breaks.
    pub fn walk_require_tree(
        &self,
        uri: &DocumentUri,
        visit: &mut dyn FnMut(&DocumentIndex, SearchScope) -> ControlFlow<()>,
    ) {
        let mut visited = FxHashSet::default();
        let _ = self.walk_from(uri, 0, &mut visited, visit);
    }

    fn walk_from(
        &self,
        uri: &DocumentUri,
        depth: usize,
        visited: &mut FxHashSet<DocumentUri>,
        visit: &mut dyn FnMut(&DocumentIndex, SearchScope) -> ControlFlow<()>,
    ) -> ControlFlow<()> {
        if depth > self.config.max_require_depth {
            debug!(uri = %uri, depth, "Require tree depth cap reached");
            return ControlFlow::Continue(());
        }
        if !visited.insert(uri.clone()) {
            return ControlFlow::Continue(());
        }
        let Some(document) = self.workspace.get(uri) else {
            return ControlFlow::Continue(());
        };

        let scope = if depth == 0 {
            SearchScope::All
        } else {
            SearchScope::Global
        };
        visit(document, scope)?;

        for edge in document.requires().iter().rev() {
            if let Some(target) = self.resolve_module(&edge.target_module) {
                self.walk_from(target, depth + 1, visited, visit)?;
            }
        }
        for parent in document.referenced_by().iter().rev() {
            self.walk_from(parent, depth + 1, visited, visit)?;
        }
        ControlFlow::Continue(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn uri(name: &str) -> DocumentUri {
        DocumentUri::new(format!("file:///ws/{name}"))
    }

    fn index() -> WorkspaceIndex {
        WorkspaceIndex::new(AnalysisConfig::default()).unwrap()
    }

    fn names(symbols: &[Arc<Symbol>]) -> Vec<String> {
        symbols.iter().map(|s| s.search_name.clone()).collect()
    }

    #[test]
    fn test_register_module_first_wins() {
        let mut index = index();
        index.register_module(&DocumentUri::new("file:///a/util.lua"));
        index.register_module(&DocumentUri::new("file:///b/util.lua"));
        assert_eq!(
            index.resolve_module("util").map(|u| u.as_str()),
            Some("file:///a/util.lua")
        );
        assert_eq!(
            index.resolve_module("lib.util").map(|u| u.as_str()),
            Some("file:///a/util.lua")
        );
    }

    #[test]
    fn test_require_creates_placeholder_with_reverse_edge() {
        let mut index = index();
        index.register_module(&uri("missing.lua"));
        index
            .build_or_refresh_document(&uri("main.lua"), Some("local m = require('missing')\n"))
            .unwrap();

        let target = index.document(&uri("missing.lua")).unwrap();
        assert_eq!(target.state, DocumentState::Placeholder);
        assert_eq!(target.referenced_by(), &[uri("main.lua")]);
    }

    #[test]
    fn test_required_file_is_loaded_from_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("helper.lua");
        std::fs::write(&path, "helper_value = 1\n").unwrap();
        let helper = DocumentUri::from_path(&path);
        let main = DocumentUri::from_path(&dir.path().join("main.lua"));

        let mut index = index();
        index.register_module(&helper);
        index
            .build_or_refresh_document(&main, Some("require('helper')\n"))
            .unwrap();

        let loaded = index.document(&helper).unwrap();
        assert_eq!(loaded.state, DocumentState::Complete);
        assert_eq!(
            names(&index.search_global_definition(&main, "helper_value", SearchMode::ExactlyEqual)),
            vec!["helper_value"]
        );
    }

    #[test]
    fn test_stale_reverse_edges_are_removed() {
        let mut index = index();
        index
            .build_or_refresh_document(&uri("b.lua"), Some("b_value = 1\n"))
            .unwrap();
        index
            .build_or_refresh_document(&uri("a.lua"), Some("require('b')\n"))
            .unwrap();
        assert_eq!(index.document(&uri("b.lua")).unwrap().referenced_by(), &[uri("a.lua")]);

        index
            .build_or_refresh_document(&uri("a.lua"), Some("-- no requires\n"))
            .unwrap();
        assert!(index.document(&uri("b.lua")).unwrap().referenced_by().is_empty());
    }

    #[test]
    fn test_rebuild_keeps_referenced_by() {
        let mut index = index();
        index
            .build_or_refresh_document(&uri("b.lua"), Some("x = 1\n"))
            .unwrap();
        index
            .build_or_refresh_document(&uri("a.lua"), Some("require('b')\n"))
            .unwrap();
        index
            .build_or_refresh_document(&uri("b.lua"), Some("x = 2\ny = 3\n"))
            .unwrap();

        let b = index.document(&uri("b.lua")).unwrap();
        assert_eq!(b.referenced_by(), &[uri("a.lua")]);
        assert_eq!(b.symbols().len(), 2);
    }

    #[test]
    fn test_syntax_error_keeps_complete_index() {
        let mut index = index();
        index
            .build_or_refresh_document(&uri("a.lua"), Some("local good = 1\n"))
            .unwrap();
        let state = index
            .build_or_refresh_document(&uri("a.lua"), Some("local good = = =\n"))
            .unwrap();

        assert_eq!(state, DocumentState::Complete);
        assert_eq!(
            names(&index.search_in_doc(&uri("a.lua"), "good", SearchMode::ExactlyEqual, SearchScope::All)),
            vec!["good"]
        );
    }

    #[test]
    fn test_require_cycle_terminates() {
        let mut index = index();
        index.register_module(&uri("a.lua"));
        index.register_module(&uri("b.lua"));
        index
            .build_or_refresh_document(&uri("a.lua"), Some("require('b')\n"))
            .unwrap();
        index
            .build_or_refresh_document(&uri("b.lua"), Some("require('a')\nshared = 1\n"))
            .unwrap();

        let found = index.search_global_definition(&uri("a.lua"), "shared", SearchMode::ExactlyEqual);
        assert_eq!(names(&found), vec!["shared"]);
        assert!(
            index
                .search_global_definition(&uri("a.lua"), "nothing", SearchMode::ExactlyEqual)
                .is_empty()
        );
    }

    #[test]
    fn test_other_files_only_expose_globals() {
        let mut index = index();
        index
            .build_or_refresh_document(&uri("lib.lua"), Some("local hidden = 1\nvisible = 2\n"))
            .unwrap();
        index
            .build_or_refresh_document(&uri("main.lua"), Some("require('lib')\n"))
            .unwrap();

        let main = uri("main.lua");
        assert!(index.search_global_definition(&main, "hidden", SearchMode::ExactlyEqual).is_empty());
        assert_eq!(
            names(&index.search_global_definition(&main, "visible", SearchMode::ExactlyEqual)),
            vec!["visible"]
        );
    }

    #[test]
    fn test_preloads_are_completion_only() {
        let mut index = index();
        index
            .build_or_refresh_in(
                IndexPartition::StdlibPreload,
                &uri("string.lua"),
                Some("string = {}\nstring.format = function(fmt, ...) end\n"),
            )
            .unwrap();
        index
            .build_or_refresh_document(&uri("main.lua"), Some("local x = 1\n"))
            .unwrap();
        let main = uri("main.lua");

        assert!(
            index
                .search_global_definition(&main, "string.format", SearchMode::ExactlyEqual)
                .is_empty()
        );
        assert_eq!(
            names(&index.search_for_completion(&main, "string.f", SearchMode::PrefixMatch)),
            vec!["string.format"]
        );
    }

    #[test]
    fn test_preload_locals_are_searched() {
        let mut index = index();
        index
            .build_or_refresh_in(
                IndexPartition::StdlibPreload,
                &uri("util.lua"),
                Some("local helper = {}\nhelper.clamp = function(v) end\nreturn helper\n"),
            )
            .unwrap();

        assert_eq!(
            names(&index.search_preloads("helper.c", SearchMode::PrefixMatch)),
            vec!["helper.clamp"]
        );
    }

    #[test]
    fn test_search_workspace_covers_every_document() {
        let mut index = index();
        index
            .build_or_refresh_document(&uri("b.lua"), Some("local function render_list() end\n"))
            .unwrap();
        index
            .build_or_refresh_document(&uri("a.lua"), Some("Renderer = {}\nfunction Renderer:draw() end\n"))
            .unwrap();
        index
            .build_or_refresh_in(
                IndexPartition::StdlibPreload,
                &uri("stub.lua"),
                Some("render_stub = 1\n"),
            )
            .unwrap();

        assert_eq!(
            names(&index.search_workspace("ender", SearchMode::FuzzyMatching)),
            vec!["Renderer", "Renderer.draw", "render_list"]
        );
        assert_eq!(
            names(&index.search_workspace("Renderer:draw", SearchMode::ExactlyEqual)),
            vec!["Renderer.draw"]
        );
        assert!(index.search_workspace("zzz", SearchMode::PrefixMatch).is_empty());
    }

    #[test]
    fn test_global_use_skips_same_named_local_in_origin() {
        let mut index = index();
        index
            .build_or_refresh_document(&uri("lib.lua"), Some("count = 0\n"))
            .unwrap();
        index
            .build_or_refresh_document(&uri("main.lua"), Some("require('lib')\nlocal count = 1\n"))
            .unwrap();
        let main = uri("main.lua");

        let everything = index.search_definition_with_scope(&main, "count", SearchMode::ExactlyEqual, SearchScope::All);
        assert!(everything.iter().all(|symbol| symbol.uri() == &main));
        let globals =
            index.search_definition_with_scope(&main, "count", SearchMode::ExactlyEqual, SearchScope::Global);
        assert_eq!(globals.len(), 1);
        assert_eq!(globals[0].uri(), &uri("lib.lua"));
    }

    #[test]
    fn test_init_resets_everything() {
        let mut index = index();
        index
            .build_or_refresh_document(&uri("a.lua"), Some("a = 1\n"))
            .unwrap();
        index.init(AnalysisConfig {
            max_require_depth: 3,
            ..AnalysisConfig::default()
        });

        assert_eq!(index.document_count(IndexPartition::Workspace), 0);
        assert!(index.resolve_module("a").is_none());
        assert_eq!(index.config().max_require_depth, 3);
    }
}
