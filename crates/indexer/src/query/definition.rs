//! Go-to-definition.
//!
//! The name under the cursor is looked up along the require tree first and
//! through the type inferencer second. When the name at the use site is a
//! visible local, the local it actually sees is chosen; otherwise locals of
//! the current file that the use cannot see are skipped.

use crate::analysis::builder::DocumentBuilder;
use crate::analysis::scope_resolver::{is_visible_from, pick_local_definition};
use crate::analysis::type_inference::resolve_tag_chain;
use crate::analysis::types::{ChunkRef, DocumentUri, PositionHit, SearchMode, SearchScope, Symbol};
use crate::analysis::workspace::WorkspaceIndex;
use crate::parsing::ast::Position;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub enum DefinitionTarget {
    Symbol(Arc<Symbol>),
    /// The cursor was on a `require` string; the target is the whole file.
    Module { uri: DocumentUri },
}

pub fn find_definition(
    index: &WorkspaceIndex,
    uri: &DocumentUri,
    position: Position,
) -> Option<DefinitionTarget> {
    let document = index.document(uri)?;
    let hit = DocumentBuilder::find_at_position(document, position)?;

    match hit {
        PositionHit::Require { module, .. } => {
            let target = index.resolve_module(&module);
            debug!(uri = %uri, module = %module, resolved = target.is_some(), "Definition on require");
            target.map(|uri| DefinitionTarget::Module { uri: uri.clone() })
        }
        PositionHit::Symbol {
            search_name,
            range,
            chunk_stack,
            is_local,
        } => {
            let origin_scope = if is_local {
                SearchScope::All
            } else {
                SearchScope::Global
            };
            let mut found = index.search_definition_with_scope(
                uri,
                &search_name,
                SearchMode::ExactlyEqual,
                origin_scope,
            );
            if found.is_empty() && search_name.contains('.') {
                found = resolve_tag_chain(index, &search_name, uri);
            }
            debug!(uri = %uri, name = %search_name, is_local, candidates = found.len(), "Definition lookup");
            let use_site = UseSite {
                uri,
                search_name: &search_name,
                is_local,
                chunk_stack: &chunk_stack,
                line: range.start.line,
            };
            pick_definition(&found, &use_site).map(DefinitionTarget::Symbol)
        }
    }
}

struct UseSite<'a> {
    uri: &'a DocumentUri,
    search_name: &'a str,
    is_local: bool,
    chunk_stack: &'a [ChunkRef],
    line: u32,
}

/// A local use picks among the file's locals by visibility. A global use, or
/// a local one nothing visible answers, skips same-file locals it cannot see
/// and prefers the first global answer.
fn pick_definition(found: &[Arc<Symbol>], site: &UseSite<'_>) -> Option<Arc<Symbol>> {
    if site.is_local {
        let locals: Vec<Arc<Symbol>> = found
            .iter()
            .filter(|symbol| is_same_file_local(symbol, site.uri))
            .cloned()
            .collect();
        if let Some(local) = pick_local_definition(&locals, site.chunk_stack, site.line) {
            return Some(local);
        }
    }

    let reachable: Vec<&Arc<Symbol>> = found
        .iter()
        .filter(|symbol| {
            if !is_same_file_local(symbol, site.uri) {
                return true;
            }
            // A global use never binds to a local spelled the same way.
            (site.is_local || symbol.search_name != site.search_name)
                && is_visible_from(symbol, site.chunk_stack, site.line)
        })
        .collect();
    reachable
        .iter()
        .find(|symbol| !symbol.is_local)
        .or_else(|| reachable.first())
        .map(|symbol| Arc::clone(symbol))
}

fn is_same_file_local(symbol: &Symbol, uri: &DocumentUri) -> bool {
    symbol.is_local && symbol.uri() == uri
}

pub fn function_at_line(index: &WorkspaceIndex, uri: &DocumentUri, line: u32) -> Option<Arc<Symbol>> {
    index.document(uri)?.function_at_line(line).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::config::AnalysisConfig;

    fn uri(name: &str) -> DocumentUri {
        DocumentUri::new(format!("file:///ws/{name}"))
    }

    fn workspace(files: &[(&str, &str)]) -> WorkspaceIndex {
        let mut index = WorkspaceIndex::new(AnalysisConfig::default()).unwrap();
        for (name, _) in files {
            index.register_module(&uri(name));
        }
        for (name, text) in files {
            index.build_or_refresh_document(&uri(name), Some(text)).unwrap();
        }
        index
    }

    fn symbol_at(index: &WorkspaceIndex, file: &str, line: u32, column: u32) -> Arc<Symbol> {
        match find_definition(index, &uri(file), Position::new(line, column)) {
            Some(DefinitionTarget::Symbol(symbol)) => symbol,
            other => panic!("expected a symbol definition, got {other:?}"),
        }
    }

    #[test]
    fn test_shadowing_local_wins_over_global() {
        let index = workspace(&[(
            "shadow.lua",
            "function f() end\nlocal function g()\n  local f = 1\n  return f\nend\nf()\n",
        )]);

        let inner = symbol_at(&index, "shadow.lua", 3, 9);
        assert!(inner.is_local);
        assert_eq!(inner.start_line(), 2);

        let outer = symbol_at(&index, "shadow.lua", 5, 0);
        assert!(!outer.is_local);
        assert_eq!(outer.start_line(), 0);
    }

    #[test]
    fn test_closest_preceding_local_is_chosen() {
        let index = workspace(&[(
            "redecl.lua",
            "local x = 1\nprint(x)\nlocal x = 2\nprint(x)\n",
        )]);
        assert_eq!(symbol_at(&index, "redecl.lua", 1, 6).start_line(), 0);
        assert_eq!(symbol_at(&index, "redecl.lua", 3, 6).start_line(), 2);
    }

    #[test]
    fn test_use_before_local_resolves_to_global() {
        let index = workspace(&[(
            "early.lua",
            "function f() end\nf()\nlocal f = function() end\n",
        )]);
        let symbol = symbol_at(&index, "early.lua", 1, 0);
        assert!(!symbol.is_local);
        assert_eq!(symbol.start_line(), 0);
    }

    #[test]
    fn test_later_local_in_function_does_not_capture_earlier_use() {
        let index = workspace(&[(
            "inner.lua",
            "x = 1\nlocal function g()\n  print(x)\n  local x = 2\n  return x\nend\n",
        )]);
        assert_eq!(symbol_at(&index, "inner.lua", 2, 8).start_line(), 0);
        assert_eq!(symbol_at(&index, "inner.lua", 4, 9).start_line(), 3);
    }

    #[test]
    fn test_use_before_only_local_finds_nothing() {
        let index = workspace(&[("only.lua", "print(y)\nlocal y = 1\n")]);
        assert_eq!(find_definition(&index, &uri("only.lua"), Position::new(0, 6)), None);
    }

    #[test]
    fn test_require_string_jumps_to_module() {
        let index = workspace(&[
            ("util.lua", "local U = {}\nreturn U\n"),
            ("main.lua", "local u = require(\"util\")\n"),
        ]);
        let target = find_definition(&index, &uri("main.lua"), Position::new(0, 20));
        assert_eq!(target, Some(DefinitionTarget::Module { uri: uri("util.lua") }));
    }

    #[test]
    fn test_member_through_require_is_inferred() {
        let index = workspace(&[
            ("shapes.lua", "local S = {}\nfunction S.area(w, h) end\nreturn S\n"),
            ("main.lua", "local shapes = require(\"shapes\")\nshapes.area(1, 2)\n"),
        ]);
        let symbol = symbol_at(&index, "main.lua", 1, 8);
        assert_eq!(symbol.search_name, "S.area");
        assert_eq!(symbol.uri(), &uri("shapes.lua"));
    }

    #[test]
    fn test_global_in_required_file() {
        let index = workspace(&[
            ("config.lua", "Settings = { volume = 3 }\n"),
            ("main.lua", "require(\"config\")\nprint(Settings.volume)\n"),
        ]);
        let symbol = symbol_at(&index, "main.lua", 1, 16);
        assert_eq!(symbol.search_name, "Settings.volume");
        assert_eq!(symbol.uri(), &uri("config.lua"));
    }

    #[test]
    fn test_nothing_under_cursor() {
        let index = workspace(&[("blank.lua", "\n\nlocal a = 1\n")]);
        assert_eq!(find_definition(&index, &uri("blank.lua"), Position::new(0, 0)), None);
        assert_eq!(find_definition(&index, &uri("missing.lua"), Position::new(0, 0)), None);
    }

    #[test]
    fn test_function_at_line() {
        let index = workspace(&[("fns.lua", "local a = 1\nlocal function b() end\n")]);
        assert_eq!(
            function_at_line(&index, &uri("fns.lua"), 1).map(|f| f.search_name.clone()),
            Some("b".to_string())
        );
        assert!(function_at_line(&index, &uri("fns.lua"), 0).is_none());
    }
}
