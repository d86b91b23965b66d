//! Document outline.
//!
//! Symbols declared inside a function body hang under that function's
//! symbol. Dotted members hang under their base symbol when the base is
//! declared in the same chunk, so `local M = {}` / `M.run = ...` nests `run`
//! under `M`.

use crate::analysis::document::DocumentIndex;
use crate::analysis::types::{DocumentUri, Symbol, SymbolKind};
use crate::analysis::workspace::WorkspaceIndex;
use crate::parsing::ast::Range;
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlineNode {
    pub name: String,
    pub detail: String,
    pub kind: SymbolKind,
    pub range: Range,
    pub children: Vec<OutlineNode>,
}

pub fn outline(index: &WorkspaceIndex, uri: &DocumentUri) -> Vec<OutlineNode> {
    index.document(uri).map(document_outline).unwrap_or_default()
}

pub fn document_outline(document: &DocumentIndex) -> Vec<OutlineNode> {
    let symbols = document.symbols();
    let file_chunk = document.file_chunk().map(|chunk| chunk.name.as_str());

    // Function symbol owning each chunk, keyed by chunk name and start line.
    let mut chunk_owner: FxHashMap<(&str, u32), usize> =
        FxHashMap::with_capacity_and_hasher(symbols.len(), Default::default());
    for (i, symbol) in symbols.iter().enumerate() {
        if let Some(chunk) = &symbol.owned_chunk {
            chunk_owner.insert((chunk.name.as_str(), chunk.range.start.line), i);
        }
    }

    let mut parents: Vec<Option<usize>> = Vec::with_capacity(symbols.len());
    let mut member_of_base = vec![false; symbols.len()];
    for (i, symbol) in symbols.iter().enumerate() {
        let base = member_base(symbols, i);
        member_of_base[i] = base.is_some();
        let parent = base.or_else(|| {
            let container = symbol.container_chunks.last()?;
            if Some(container.name.as_ref()) == file_chunk {
                return None;
            }
            chunk_owner
                .get(&(container.name.as_ref(), container.range.start.line))
                .copied()
                .filter(|&owner| owner != i)
        });
        parents.push(parent);
    }

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); symbols.len()];
    let mut roots = Vec::new();
    for (i, parent) in parents.iter().enumerate() {
        match parent {
            Some(parent) => children[*parent].push(i),
            None => roots.push(i),
        }
    }

    roots
        .into_iter()
        .map(|i| build_node(symbols, &children, &member_of_base, i))
        .collect()
}

/// The closest earlier symbol in the same chunk whose name is this one's
/// dotted prefix.
fn member_base(symbols: &[Arc<Symbol>], i: usize) -> Option<usize> {
    let symbol = &symbols[i];
    let (base_name, _) = symbol.search_name.rsplit_once('.')?;
    symbols[..i].iter().rposition(|candidate| {
        candidate.search_name == base_name && candidate.container_chunks == symbol.container_chunks
    })
}

fn build_node(
    symbols: &[Arc<Symbol>],
    children: &[Vec<usize>],
    member_of_base: &[bool],
    i: usize,
) -> OutlineNode {
    let symbol = &symbols[i];
    let name = if member_of_base[i] {
        symbol.original_name.clone()
    } else {
        symbol.search_name.clone()
    };
    OutlineNode {
        name,
        detail: symbol.display_name.clone(),
        kind: symbol.kind,
        range: symbol.location.range,
        children: children[i]
            .iter()
            .map(|&child| build_node(symbols, children, member_of_base, child))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::config::AnalysisConfig;

    fn outline_of(text: &str) -> Vec<OutlineNode> {
        let uri = DocumentUri::new("file:///ws/outline.lua");
        let mut index = WorkspaceIndex::new(AnalysisConfig::default()).unwrap();
        index.build_or_refresh_document(&uri, Some(text)).unwrap();
        outline(&index, &uri)
    }

    fn names(nodes: &[OutlineNode]) -> Vec<&str> {
        nodes.iter().map(|node| node.name.as_str()).collect()
    }

    #[test]
    fn test_function_locals_nest_under_function() {
        let nodes = outline_of("local function run(n)\n  local total = n\nend\nlocal after = 1\n");

        assert_eq!(names(&nodes), vec!["run", "after"]);
        assert_eq!(nodes[0].kind, SymbolKind::Function);
        assert_eq!(names(&nodes[0].children), vec!["n", "total"]);
    }

    #[test]
    fn test_members_nest_under_base() {
        let nodes = outline_of("local M = {}\nM.name = 'm'\nfunction M.start() end\nreturn M\n");

        assert_eq!(names(&nodes), vec!["M"]);
        assert_eq!(names(&nodes[0].children), vec!["name", "start"]);
        assert_eq!(nodes[0].children[1].detail, "function M.start()");
    }

    #[test]
    fn test_methods_carry_self() {
        let nodes = outline_of("local C = {}\nfunction C:go(speed) end\n");
        let method = &nodes[0].children[0];
        assert_eq!(method.name, "go");
        assert_eq!(names(&method.children), vec!["self", "speed"]);
    }

    #[test]
    fn test_unknown_document_is_empty() {
        let index = WorkspaceIndex::new(AnalysisConfig::default()).unwrap();
        assert!(outline(&index, &DocumentUri::new("file:///nowhere.lua")).is_empty());
    }
}
