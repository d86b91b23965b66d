//! Tag-chain resolution for access paths that direct lookup cannot answer.
//!
//! `resolve_tag_chain("a.b.c", uri)` strips trailing segments one at a time
//! (`a.b`, then `a`). When a stripped prefix names a symbol carrying a tag,
//! the prefix is swapped for whatever the tag points at and the stripped
//! suffix is appended again:
//!
//! | reason          | substitute                                        |
//! |-----------------|---------------------------------------------------|
//! | `UserTag`/`Equal` | the tagged type's symbol (or bare name)         |
//! | `MetaTable`     | `mt.__index`, then the tag of `mt.__index` itself |
//! | `RequireReturn` | the required file's returned variable             |
//! | `CallReturn`    | the callee's returned variable                    |
//!
//! The merged path is looked up again (exactly for definitions, by prefix
//! for completion) and, failing that, resolved recursively. Every
//! `(document, path)` pair is entered at most once per query, and a prefix
//! with more candidates than the configured fan-out only has its first
//! candidate probed.

use super::types::{DocumentUri, SearchMode, SearchScope, Symbol, TagReason, normalize_search_name};
use super::workspace::WorkspaceIndex;
use rustc_hash::FxHashSet;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionPurpose {
    /// Exact lookups; global definition search order.
    Definition,
    /// The final merged path is prefix-matched; completion search order.
    Completion,
}

/// Counters for one inferencer's lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionStats {
    pub queries: usize,
    pub resolved: usize,
    pub cycle_refusals: usize,
    pub fanout_truncations: usize,
}

impl ResolutionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn success_rate(&self) -> f64 {
        if self.queries == 0 {
            0.0
        } else {
            self.resolved as f64 / self.queries as f64
        }
    }
}

/// A path prefix replacement: continue at `name` inside `uri`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Substitution {
    uri: DocumentUri,
    name: String,
}

impl Substitution {
    fn of_symbol(symbol: &Symbol) -> Self {
        Self {
            uri: symbol.uri().clone(),
            name: symbol.search_name.clone(),
        }
    }
}

pub struct TypeInferencer<'a> {
    index: &'a WorkspaceIndex,
    purpose: ResolutionPurpose,
    stats: ResolutionStats,
}

impl<'a> TypeInferencer<'a> {
    pub fn new(index: &'a WorkspaceIndex, purpose: ResolutionPurpose) -> Self {
        Self {
            index,
            purpose,
            stats: ResolutionStats::new(),
        }
    }

    pub fn stats(&self) -> &ResolutionStats {
        &self.stats
    }

    pub fn resolve_tag_chain(&mut self, path: &str, uri: &DocumentUri) -> Vec<Arc<Symbol>> {
        self.stats.queries += 1;
        let path = normalize_search_name(path);
        let mut visited = FxHashSet::default();
        let found = self.resolve_path(uri, &path, &mut visited);
        if !found.is_empty() {
            self.stats.resolved += 1;
        }
        debug!(
            path = %path,
            uri = %uri,
            purpose = ?self.purpose,
            found = found.len(),
            "Resolved tag chain"
        );
        found
    }

    fn resolve_path(
        &mut self,
        uri: &DocumentUri,
        path: &str,
        visited: &mut FxHashSet<(DocumentUri, String)>,
    ) -> Vec<Arc<Symbol>> {
        if !visited.insert((uri.clone(), path.to_string())) {
            self.stats.cycle_refusals += 1;
            trace!(path, uri = %uri, "Refusing to re-enter path");
            return Vec::new();
        }

        let segments: Vec<&str> = path.split('.').collect();
        for cut in (1..segments.len()).rev() {
            let prefix = segments[..cut].join(".");
            let tail = segments[cut..].join(".");

            let mut candidates = self.lookup(uri, &prefix, SearchMode::ExactlyEqual);
            if candidates.is_empty() {
                continue;
            }
            if candidates.len() > self.index.config().max_tag_fanout {
                self.stats.fanout_truncations += 1;
                candidates.truncate(1);
            }

            for candidate in &candidates {
                for substitution in self.substitutions(candidate, visited) {
                    let merged = format!("{}.{tail}", substitution.name);
                    let found = self.merge(&substitution.uri, &merged, visited);
                    if !found.is_empty() {
                        return found;
                    }
                }
            }
        }
        Vec::new()
    }

    /// Looks up a merged path, resolving it further when it has no direct
    /// symbol.
    fn merge(
        &mut self,
        uri: &DocumentUri,
        merged: &str,
        visited: &mut FxHashSet<(DocumentUri, String)>,
    ) -> Vec<Arc<Symbol>> {
        let mode = match self.purpose {
            ResolutionPurpose::Definition => SearchMode::ExactlyEqual,
            ResolutionPurpose::Completion => SearchMode::PrefixMatch,
        };
        let mut found = self.lookup(uri, merged, mode);
        if self.purpose == ResolutionPurpose::Completion {
            // Only siblings of the typed segment, not their members.
            let depth = merged.matches('.').count();
            found.retain(|symbol| symbol.search_name.matches('.').count() == depth);
        }
        if !found.is_empty() {
            return found;
        }
        self.resolve_path(uri, merged, visited)
    }

    /// Where the tag of `symbol` leads, most specific first.
    fn substitutions(
        &mut self,
        symbol: &Arc<Symbol>,
        visited: &mut FxHashSet<(DocumentUri, String)>,
    ) -> Vec<Substitution> {
        let uri = symbol.uri();
        match symbol.tag_reason() {
            Some(TagReason::UserTag | TagReason::Equal) => {
                let Some(tag) = &symbol.tag else {
                    return Vec::new();
                };
                let targets = self.lookup_excluding(uri, &tag.type_name, symbol);
                if targets.is_empty() {
                    vec![Substitution {
                        uri: uri.clone(),
                        name: tag.type_name.clone(),
                    }]
                } else {
                    targets.iter().map(|t| Substitution::of_symbol(t)).collect()
                }
            }
            Some(TagReason::MetaTable) => {
                let Some(tag) = &symbol.tag else {
                    return Vec::new();
                };
                let index_name = format!("{}.__index", tag.type_name);
                let mut substitutions = vec![Substitution {
                    uri: uri.clone(),
                    name: index_name.clone(),
                }];
                for index_symbol in self.lookup_excluding(uri, &index_name, symbol) {
                    if let Some(index_tag) = &index_symbol.tag {
                        substitutions.push(Substitution {
                            uri: index_symbol.uri().clone(),
                            name: index_tag.type_name.clone(),
                        });
                    }
                }
                substitutions
            }
            Some(TagReason::RequireReturn) => {
                let Some(module) = &symbol.require_module else {
                    return Vec::new();
                };
                let Some(target_uri) = self.index.resolve_module(module) else {
                    return Vec::new();
                };
                self.index
                    .document(target_uri)
                    .and_then(|document| document.return_name())
                    .map(|name| Substitution {
                        uri: target_uri.clone(),
                        name: name.to_string(),
                    })
                    .into_iter()
                    .collect()
            }
            Some(TagReason::CallReturn) => {
                let Some(callee) = &symbol.call_return_of else {
                    return Vec::new();
                };
                let mut functions = self.lookup_excluding(uri, callee, symbol);
                if functions.is_empty() {
                    functions = self.resolve_path(uri, callee, visited);
                }
                functions
                    .first()
                    .and_then(|function| {
                        function.return_name().map(|name| Substitution {
                            uri: function.uri().clone(),
                            name: name.to_string(),
                        })
                    })
                    .into_iter()
                    .collect()
            }
            None => Vec::new(),
        }
    }

    /// In-document lookup first, then the purpose's cross-file search.
    fn lookup(&self, uri: &DocumentUri, name: &str, mode: SearchMode) -> Vec<Arc<Symbol>> {
        let found = self.index.search_in_doc(uri, name, mode, SearchScope::All);
        if !found.is_empty() {
            return found;
        }
        match self.purpose {
            ResolutionPurpose::Definition => self.index.search_global_definition(uri, name, mode),
            ResolutionPurpose::Completion => self.index.search_for_completion(uri, name, mode),
        }
    }

    /// Exact lookup that never returns `exclude` itself, so that
    /// `local common = common` does not resolve to its own declaration.
    fn lookup_excluding(&self, uri: &DocumentUri, name: &str, exclude: &Arc<Symbol>) -> Vec<Arc<Symbol>> {
        let without_self = |symbols: Vec<Arc<Symbol>>| -> Vec<Arc<Symbol>> {
            symbols
                .into_iter()
                .filter(|symbol| !Arc::ptr_eq(symbol, exclude))
                .collect()
        };
        let found = without_self(
            self.index
                .search_in_doc(uri, name, SearchMode::ExactlyEqual, SearchScope::All),
        );
        if !found.is_empty() {
            return found;
        }
        let cross_file = match self.purpose {
            ResolutionPurpose::Definition => {
                self.index
                    .search_global_definition(uri, name, SearchMode::ExactlyEqual)
            }
            ResolutionPurpose::Completion => {
                self.index
                    .search_for_completion(uri, name, SearchMode::ExactlyEqual)
            }
        };
        without_self(cross_file)
    }
}

/// Definition-purpose resolution with a throwaway inferencer.
pub fn resolve_tag_chain(index: &WorkspaceIndex, path: &str, uri: &DocumentUri) -> Vec<Arc<Symbol>> {
    TypeInferencer::new(index, ResolutionPurpose::Definition).resolve_tag_chain(path, uri)
}
