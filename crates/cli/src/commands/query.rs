//! Query subcommands. Each one indexes the workspace, runs a single query
//! and prints its result as JSON.

use super::{LoadedWorkspace, print_json};
use crate::cli::{CursorArgs, WorkspaceArgs};
use anyhow::{Result, bail};
use lua_indexer::analysis::type_inference::{ResolutionPurpose, TypeInferencer};
use lua_indexer::analysis::types::{DocumentUri, SearchMode, SearchScope, Symbol};
use lua_indexer::parsing::ast::Position;
use lua_indexer::query::{self, DefinitionTarget};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

const COMMENT_TRIGGER: &str = "---";

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum DefinitionOutput<'a> {
    Symbol { symbol: &'a Symbol },
    Module { uri: &'a DocumentUri },
}

fn symbols(found: &[Arc<Symbol>]) -> Vec<&Symbol> {
    found.iter().map(Arc::as_ref).collect()
}

fn position(cursor: &CursorArgs) -> Position {
    Position::new(cursor.line, cursor.column)
}

pub fn search(
    args: &WorkspaceArgs,
    file: &Path,
    name: &str,
    mode: SearchMode,
    scope: SearchScope,
) -> Result<()> {
    let loaded = LoadedWorkspace::load(args)?;
    let uri = loaded.uri_for(file)?;
    let found = loaded.indexer.index().search_in_doc(&uri, name, mode, scope);
    print_json(&symbols(&found))
}

pub fn workspace_symbols(args: &WorkspaceArgs, query: &str, mode: SearchMode) -> Result<()> {
    let loaded = LoadedWorkspace::load(args)?;
    let found = loaded.indexer.index().search_workspace(query, mode);
    info!(query, found = found.len(), "Workspace symbol search");
    print_json(&symbols(&found))
}

pub fn definition(args: &WorkspaceArgs, cursor: &CursorArgs) -> Result<()> {
    let loaded = LoadedWorkspace::load(args)?;
    let uri = loaded.uri_for(&cursor.file)?;
    let target = query::find_definition(loaded.indexer.index(), &uri, position(cursor));

    let output = match &target {
        Some(DefinitionTarget::Symbol(symbol)) => Some(DefinitionOutput::Symbol {
            symbol: symbol.as_ref(),
        }),
        Some(DefinitionTarget::Module { uri }) => Some(DefinitionOutput::Module { uri }),
        None => None,
    };
    print_json(&output)
}

pub fn references(args: &WorkspaceArgs, cursor: &CursorArgs) -> Result<()> {
    let loaded = LoadedWorkspace::load(args)?;
    let uri = loaded.uri_for(&cursor.file)?;
    let locations = query::find_references(loaded.indexer.index(), &uri, position(cursor));
    print_json(&locations)
}

pub fn complete(args: &WorkspaceArgs, file: &Path, input: &str, line: Option<u32>) -> Result<()> {
    let loaded = LoadedWorkspace::load(args)?;
    let uri = loaded.uri_for(file)?;
    let index = loaded.indexer.index();

    let items = if input.trim() == COMMENT_TRIGGER {
        let Some(line) = line else {
            bail!("Comment completion needs --line");
        };
        query::complete_comment(index, &uri, line)
    } else {
        query::complete(index, &uri, input)
    };
    print_json(&items)
}

pub fn resolve(args: &WorkspaceArgs, file: &Path, path: &str) -> Result<()> {
    let loaded = LoadedWorkspace::load(args)?;
    let uri = loaded.uri_for(file)?;

    let mut inferencer = TypeInferencer::new(loaded.indexer.index(), ResolutionPurpose::Definition);
    let found = inferencer.resolve_tag_chain(path, &uri);
    let stats = inferencer.stats();
    info!(
        path,
        resolved = stats.resolved,
        cycle_refusals = stats.cycle_refusals,
        fanout_truncations = stats.fanout_truncations,
        "Tag chain resolved"
    );
    print_json(&symbols(&found))
}

pub fn outline(args: &WorkspaceArgs, file: &Path) -> Result<()> {
    let loaded = LoadedWorkspace::load(args)?;
    let uri = loaded.uri_for(file)?;
    print_json(&query::outline(loaded.indexer.index(), &uri))
}
