use super::{LoadedWorkspace, print_json};
use crate::cli::WorkspaceArgs;
use anyhow::Result;
use lua_indexer::stats::{IndexStatistics, PartitionStatistics};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Serialize)]
struct IndexSummary<'a> {
    workspace_path: &'a str,
    files_processed: usize,
    files_skipped: usize,
    files_errored: usize,
    workspace: &'a PartitionStatistics,
}

impl<'a> IndexSummary<'a> {
    fn from_statistics(statistics: &'a IndexStatistics) -> Self {
        Self {
            workspace_path: &statistics.metadata.workspace_path,
            files_processed: statistics.files_processed,
            files_skipped: statistics.files_skipped,
            files_errored: statistics.files_errored,
            workspace: &statistics.workspace,
        }
    }
}

pub fn run(args: &WorkspaceArgs, stats_output: Option<Option<PathBuf>>) -> Result<()> {
    let loaded = LoadedWorkspace::load(args)?;
    let statistics = &loaded.outcome.statistics;

    info!(
        "Workspace indexing completed in {:.2} seconds",
        statistics.metadata.indexing_duration_seconds
    );

    match stats_output {
        Some(stats_path_option) => {
            if let Some(stats_path) = stats_path_option {
                match statistics.export_to_file(&stats_path) {
                    Ok(_) => info!("Statistics saved to: {}", stats_path.display()),
                    Err(e) => error!("Failed to save statistics: {e}"),
                }
            }
            print_json(statistics)
        }
        None => print_json(&IndexSummary::from_statistics(statistics)),
    }
}
