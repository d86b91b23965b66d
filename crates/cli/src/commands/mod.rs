pub mod index;
pub mod query;

use crate::cli::WorkspaceArgs;
use anyhow::{Context, Result};
use lua_indexer::analysis::types::DocumentUri;
use lua_indexer::execution::config::AnalysisConfigBuilder;
use lua_indexer::indexer::{IndexingOutcome, WorkspaceIndexer};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A fully indexed workspace, ready for queries.
pub struct LoadedWorkspace {
    pub root: PathBuf,
    pub indexer: WorkspaceIndexer,
    pub outcome: IndexingOutcome,
}

impl LoadedWorkspace {
    pub fn load(args: &WorkspaceArgs) -> Result<Self> {
        let root = args
            .workspace
            .canonicalize()
            .with_context(|| format!("Workspace not found: {}", args.workspace.display()))?;
        let config = AnalysisConfigBuilder::load(args.config.as_deref())
            .context("Failed to load configuration")?;
        debug!(root = %root.display(), ?config, "Loading workspace");

        let mut indexer = WorkspaceIndexer::new(config)?;
        let outcome = indexer.index_directory(&root)?;
        Ok(Self {
            root,
            indexer,
            outcome,
        })
    }

    /// URI of a file given on the command line, relative to the workspace
    /// root unless absolute.
    pub fn uri_for(&self, file: &Path) -> Result<DocumentUri> {
        let path = if file.is_absolute() {
            file.to_path_buf()
        } else {
            self.root.join(file)
        };
        let path = path
            .canonicalize()
            .with_context(|| format!("File not found: {}", path.display()))?;
        Ok(DocumentUri::from_path(&path))
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    // We're printing results to stdout, so we don't use tracing
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
