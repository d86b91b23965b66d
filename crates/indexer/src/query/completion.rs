//! Completion items for a partially typed access path.
//!
//! `obj:me` is searched as `obj.me`. The whole input is prefix-matched along
//! the require tree; dotted input is additionally resolved through the type
//! inferencer, and then only the last segment is offered as label.

use crate::analysis::type_inference::{ResolutionPurpose, TypeInferencer};
use crate::analysis::types::{DocumentUri, SearchMode, Symbol, SymbolKind, normalize_search_name};
use crate::analysis::workspace::WorkspaceIndex;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CompletionKind {
    Function,
    Variable,
    Snippet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InsertTextFormat {
    PlainText,
    Snippet,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionItem {
    pub label: String,
    pub kind: CompletionKind,
    pub insert_text: String,
    pub detail: String,
    pub insert_text_format: InsertTextFormat,
}

impl CompletionItem {
    fn same_entry(&self, other: &CompletionItem) -> bool {
        self.label == other.label
            && self.kind == other.kind
            && self.insert_text == other.insert_text
            && self.insert_text_format == other.insert_text_format
    }
}

pub fn complete(index: &WorkspaceIndex, uri: &DocumentUri, input: &str) -> Vec<CompletionItem> {
    let input = normalize_search_name(input);
    let dotted = input.contains('.');

    let mut symbols = index.search_for_completion(uri, &input, SearchMode::PrefixMatch);
    if dotted {
        let depth = input.matches('.').count();
        symbols.retain(|symbol| symbol.search_name.matches('.').count() == depth);
        let mut inferencer = TypeInferencer::new(index, ResolutionPurpose::Completion);
        symbols.extend(inferencer.resolve_tag_chain(&input, uri));
    }

    let mut items: Vec<CompletionItem> = Vec::with_capacity(symbols.len());
    for item in symbols.iter().map(|symbol| to_item(symbol, dotted)) {
        if !items.iter().any(|existing| existing.same_entry(&item)) {
            items.push(item);
        }
    }
    items
}

fn to_item(symbol: &Arc<Symbol>, last_segment_only: bool) -> CompletionItem {
    let label = if last_segment_only {
        symbol
            .search_name
            .rsplit('.')
            .next()
            .unwrap_or(&symbol.search_name)
            .to_string()
    } else {
        symbol.search_name.clone()
    };

    match symbol.kind {
        SymbolKind::Function => CompletionItem {
            insert_text: format!("{label}{}", params_snippet(&symbol.function_params)),
            label,
            kind: CompletionKind::Function,
            detail: symbol.display_name.clone(),
            insert_text_format: InsertTextFormat::Snippet,
        },
        SymbolKind::Variable => CompletionItem {
            insert_text: label.clone(),
            label,
            kind: CompletionKind::Variable,
            detail: symbol.display_name.clone(),
            insert_text_format: InsertTextFormat::PlainText,
        },
    }
}

/// `(${1:a}, ${2:b})`
fn params_snippet(params: &[String]) -> String {
    let placeholders: Vec<String> = params
        .iter()
        .enumerate()
        .map(|(i, param)| format!("${{{}:{param}}}", i + 1))
        .collect();
    format!("({})", placeholders.join(", "))
}

/// Items offered after typing `---` on `line`: a documentation block when a
/// function is declared on the next line, an `@type` annotation otherwise.
pub fn complete_comment(index: &WorkspaceIndex, uri: &DocumentUri, line: u32) -> Vec<CompletionItem> {
    let function = index
        .document(uri)
        .and_then(|document| document.function_at_line(line + 1));

    match function {
        Some(function) => vec![
            CompletionItem {
                label: format!("{} comment", function.search_name),
                kind: CompletionKind::Snippet,
                insert_text: doc_comment_snippet(&function.search_name, &function.function_params),
                detail: "Write comments or mark return type for this function.".to_string(),
                insert_text_format: InsertTextFormat::Snippet,
            },
            CompletionItem {
                label: "mark return".to_string(),
                kind: CompletionKind::Snippet,
                insert_text: "@return ".to_string(),
                detail: "Mark return type for this function".to_string(),
                insert_text_format: InsertTextFormat::Snippet,
            },
        ],
        None => vec![CompletionItem {
            label: "@type".to_string(),
            kind: CompletionKind::Snippet,
            insert_text: "@type ${1:Type} ${2:Description}".to_string(),
            detail: "comment var type".to_string(),
            insert_text_format: InsertTextFormat::Snippet,
        }],
    }
}

fn doc_comment_snippet(function_name: &str, params: &[String]) -> String {
    let width = params.iter().map(String::len).max().unwrap_or(0);
    let mut snippet = format!("{function_name} ${{1:Description of the function}}");
    let mut tab = 2;
    for param in params {
        snippet.push_str(&format!(
            "\n---@param {param:<width$} ${{{}:Type}} ${{{}:Description}}",
            tab,
            tab + 1
        ));
        tab += 2;
    }
    snippet.push_str(&format!(
        "\n${{{}:---@return }} ${{{}:Type}} ${{{}:Description}}",
        tab,
        tab + 1,
        tab + 2
    ));
    snippet
}
