//! Character trie over symbol search names, used for prefix completion.
//!
//! Children are kept in a `BTreeMap` so that subtree collection comes back in
//! a stable (lexicographic) order; rebuilding a document with the same text
//! yields the same trie contents and the same query results.

use super::types::Symbol;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Default, Clone)]
struct TrieNode {
    children: BTreeMap<char, TrieNode>,
    symbols: Vec<Arc<Symbol>>,
}

#[derive(Debug, Default, Clone)]
pub struct SymbolTrie {
    root: TrieNode,
    len: usize,
}

impl SymbolTrie {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, symbol: Arc<Symbol>) {
        let mut node = &mut self.root;
        for ch in symbol.search_name.chars() {
            node = node.children.entry(ch).or_default();
        }
        node.symbols.push(symbol);
        self.len += 1;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Every symbol stored at or below the node reached by `prefix`.
    ///
    /// Symbols are listed shortest name first within a branch, so `a` comes
    /// before `a.b`, which comes before `a.b.c`.
    pub fn search_prefix(&self, prefix: &str) -> Vec<Arc<Symbol>> {
        let mut node = &self.root;
        for ch in prefix.chars() {
            match node.children.get(&ch) {
                Some(child) => node = child,
                None => return Vec::new(),
            }
        }

        let mut results = Vec::new();
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            results.extend(current.symbols.iter().cloned());
            stack.extend(current.children.values().rev());
        }
        results
    }

    /// All stored search names, in trie order. Used to compare rebuilds.
    pub fn keys(&self) -> Vec<String> {
        self.search_prefix("")
            .iter()
            .map(|symbol| symbol.search_name.clone())
            .collect()
    }
}
