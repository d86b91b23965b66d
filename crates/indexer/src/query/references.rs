//! Find-references: every place a definition's name is written in the file
//! that declares it.

use super::definition::{DefinitionTarget, find_definition};
use crate::analysis::builder::DocumentBuilder;
use crate::analysis::types::{DocumentUri, SourceLocation, Symbol};
use crate::analysis::workspace::WorkspaceIndex;
use crate::parsing::ast::Position;

/// Resolves the definition under the cursor and lists its references.
/// A cursor on a `require` string has no references.
pub fn find_references(
    index: &WorkspaceIndex,
    uri: &DocumentUri,
    position: Position,
) -> Vec<SourceLocation> {
    match find_definition(index, uri, position) {
        Some(DefinitionTarget::Symbol(symbol)) => references_of(index, &symbol),
        Some(DefinitionTarget::Module { .. }) | None => Vec::new(),
    }
}

pub fn references_of(index: &WorkspaceIndex, symbol: &Symbol) -> Vec<SourceLocation> {
    let Some(document) = index.document(symbol.uri()) else {
        return Vec::new();
    };
    DocumentBuilder::find_references(document, &symbol.search_name)
        .into_iter()
        .map(|range| SourceLocation {
            uri: document.uri.clone(),
            range,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::config::AnalysisConfig;

    fn uri(name: &str) -> DocumentUri {
        DocumentUri::new(format!("file:///ws/{name}"))
    }

    fn lines(locations: &[SourceLocation]) -> Vec<u32> {
        locations.iter().map(|loc| loc.range.start.line).collect()
    }

    #[test]
    fn test_references_cover_declaration_and_uses() {
        let mut index = WorkspaceIndex::new(AnalysisConfig::default()).unwrap();
        index
            .build_or_refresh_document(
                &uri("refs.lua"),
                Some("local count = 0\ncount = count + 1\nprint(count)\nlocal other = 1\n"),
            )
            .unwrap();

        let found = find_references(&index, &uri("refs.lua"), Position::new(2, 7));
        assert_eq!(lines(&found), vec![0, 1, 1, 2]);
        assert!(found.iter().all(|loc| loc.uri == uri("refs.lua")));
    }

    #[test]
    fn test_references_stay_in_defining_file() {
        let mut index = WorkspaceIndex::new(AnalysisConfig::default()).unwrap();
        index.register_module(&uri("lib.lua"));
        index.register_module(&uri("app.lua"));
        index
            .build_or_refresh_document(&uri("lib.lua"), Some("Lib = {}\nLib.run = 1\n"))
            .unwrap();
        index
            .build_or_refresh_document(&uri("app.lua"), Some("require(\"lib\")\nprint(Lib.run)\n"))
            .unwrap();

        let found = find_references(&index, &uri("app.lua"), Position::new(1, 11));
        assert_eq!(lines(&found), vec![1]);
        assert_eq!(found[0].uri, uri("lib.lua"));
    }

    #[test]
    fn test_no_references_for_unknown_name() {
        let mut index = WorkspaceIndex::new(AnalysisConfig::default()).unwrap();
        index
            .build_or_refresh_document(&uri("none.lua"), Some("print(undefined_thing)\n"))
            .unwrap();
        assert!(find_references(&index, &uri("none.lua"), Position::new(0, 8)).is_empty());
    }
}
