//! One symbol subset of a document (all / global / local).
//!
//! Each partition keeps the same symbols three ways, one per search mode:
//! - a name dictionary for `ExactlyEqual` (every value is a list, collisions
//!   are never dropped),
//! - the insertion-ordered array for `FuzzyMatching`,
//! - a prefix trie for `PrefixMatch`.

use super::trie::SymbolTrie;
use super::types::{SearchMode, Symbol};
use regex::RegexBuilder;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct SymbolPartition {
    by_name: FxHashMap<String, SmallVec<[Arc<Symbol>; 1]>>,
    ordered: Vec<Arc<Symbol>>,
    trie: SymbolTrie,
}

impl SymbolPartition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the three views. They are populated one after another, which is
    /// why a document is only published once all of its partitions are done.
    pub fn from_symbols(symbols: &[Arc<Symbol>]) -> Self {
        let mut by_name: FxHashMap<String, SmallVec<[Arc<Symbol>; 1]>> =
            FxHashMap::with_capacity_and_hasher(symbols.len(), Default::default());
        for symbol in symbols {
            by_name
                .entry(symbol.search_name.clone())
                .or_default()
                .push(Arc::clone(symbol));
        }

        let ordered = symbols.to_vec();

        let mut trie = SymbolTrie::new();
        for symbol in symbols {
            trie.insert(Arc::clone(symbol));
        }

        Self {
            by_name,
            ordered,
            trie,
        }
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    pub fn symbols(&self) -> &[Arc<Symbol>] {
        &self.ordered
    }

    pub fn contains(&self, search_name: &str) -> bool {
        self.by_name.contains_key(search_name)
    }

    pub fn trie(&self) -> &SymbolTrie {
        &self.trie
    }

    pub fn search(&self, name: &str, mode: SearchMode) -> Vec<Arc<Symbol>> {
        match mode {
            SearchMode::ExactlyEqual => self
                .by_name
                .get(name)
                .map(|symbols| symbols.to_vec())
                .unwrap_or_default(),
            SearchMode::PrefixMatch => self.trie.search_prefix(name),
            SearchMode::FuzzyMatching => self.search_fuzzy(name),
        }
    }

    /// The query is an unanchored regex tested against search names, so a
    /// plain word is a substring match. A query that is not a valid pattern
    /// is matched literally. Matching ignores case unless the query itself
    /// contains an uppercase letter.
    fn search_fuzzy(&self, query: &str) -> Vec<Arc<Symbol>> {
        let case_sensitive = query.chars().any(char::is_uppercase);
        let build = |pattern: &str| {
            RegexBuilder::new(pattern)
                .case_insensitive(!case_sensitive)
                .build()
        };
        let Ok(regex) = build(query).or_else(|_| build(&regex::escape(query))) else {
            return Vec::new();
        };

        self.ordered
            .iter()
            .filter(|symbol| regex.is_match(&symbol.search_name))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::types::{DocumentUri, SourceLocation, SymbolKind};
    use crate::parsing::ast::{Position, Range};

    fn symbol(name: &str, line: u32) -> Arc<Symbol> {
        Arc::new(Symbol {
            display_name: name.to_string(),
            search_name: name.to_string(),
            original_name: name.to_string(),
            kind: SymbolKind::Variable,
            location: SourceLocation {
                uri: DocumentUri::new("mem://p.lua"),
                range: Range::new(Position::new(line, 0), Position::new(line, 1)),
            },
            is_local: false,
            container_name: "p.lua".to_string(),
            container_chunks: Default::default(),
            function_params: Vec::new(),
            tag: None,
            require_module: None,
            call_return_of: None,
            owned_chunk: None,
        })
    }

    fn partition() -> SymbolPartition {
        SymbolPartition::from_symbols(&[
            symbol("getPlayer", 0),
            symbol("gold", 1),
            symbol("GameState", 2),
            symbol("gold", 3),
        ])
    }

    #[test]
    fn test_exact_keeps_collisions() {
        let partition = partition();
        let found = partition.search("gold", SearchMode::ExactlyEqual);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].start_line(), 1);
        assert_eq!(found[1].start_line(), 3);
    }

    fn fuzzy_names(partition: &SymbolPartition, query: &str) -> Vec<String> {
        partition
            .search(query, SearchMode::FuzzyMatching)
            .iter()
            .map(|s| s.search_name.clone())
            .collect()
    }

    #[test]
    fn test_fuzzy_lowercase_query_ignores_case() {
        let partition = partition();
        assert_eq!(fuzzy_names(&partition, "state"), vec!["GameState"]);
        assert_eq!(fuzzy_names(&partition, "l"), vec!["getPlayer", "gold", "gold"]);
    }

    #[test]
    fn test_fuzzy_is_a_substring_match() {
        let partition = partition();
        assert!(fuzzy_names(&partition, "gs").is_empty());
        assert_eq!(fuzzy_names(&partition, "").len(), 4);
    }

    #[test]
    fn test_fuzzy_uppercase_query_is_case_sensitive() {
        let partition = partition();
        assert_eq!(fuzzy_names(&partition, "Pl"), vec!["getPlayer"]);
        assert!(fuzzy_names(&partition, "PL").is_empty());
    }

    #[test]
    fn test_fuzzy_query_is_a_regex() {
        let partition = partition();
        assert_eq!(fuzzy_names(&partition, "^g.*r$"), vec!["getPlayer"]);
    }

    #[test]
    fn test_fuzzy_invalid_pattern_matches_literally() {
        let partition = SymbolPartition::from_symbols(&[symbol("t[1]", 0), symbol("t1", 1)]);
        assert_eq!(fuzzy_names(&partition, "t["), vec!["t[1]"]);
    }

    #[test]
    fn test_prefix_delegates_to_trie() {
        let partition = partition();
        assert_eq!(partition.search("go", SearchMode::PrefixMatch).len(), 2);
        assert!(partition.contains("GameState"));
        assert_eq!(partition.len(), 4);
    }
}
