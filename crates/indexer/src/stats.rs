use crate::analysis::types::IndexPartition;
use crate::analysis::workspace::WorkspaceIndex;
use crate::error::Result;
use crate::parsing::processor::ProcessingResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatisticsMetadata {
    pub luascope_version: String,
    pub timestamp: DateTime<Utc>,
    pub workspace_path: String,
    pub indexing_duration_seconds: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionStatistics {
    pub documents: usize,
    pub symbols: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStatistics {
    pub metadata: StatisticsMetadata,
    pub files_processed: usize,
    pub files_skipped: usize,
    pub files_errored: usize,
    /// Files indexed from a parse with syntax errors.
    pub files_degraded: usize,
    pub require_edges: usize,
    pub workspace: PartitionStatistics,
    pub stdlib_preload: PartitionStatistics,
    pub user_preload: PartitionStatistics,
}

impl IndexStatistics {
    pub fn new(workspace_path: String) -> Self {
        Self {
            metadata: StatisticsMetadata {
                luascope_version: env!("CARGO_PKG_VERSION").to_string(),
                timestamp: Utc::now(),
                workspace_path,
                indexing_duration_seconds: 0.0,
            },
            files_processed: 0,
            files_skipped: 0,
            files_errored: 0,
            files_degraded: 0,
            require_edges: 0,
            workspace: PartitionStatistics::default(),
            stdlib_preload: PartitionStatistics::default(),
            user_preload: PartitionStatistics::default(),
        }
    }

    pub fn record(&mut self, result: &ProcessingResult) {
        match result {
            ProcessingResult::Success(success) => {
                self.files_processed += 1;
                self.require_edges += success.require_count;
                if success.degraded {
                    self.files_degraded += 1;
                }
            }
            ProcessingResult::Skipped(_) => self.files_skipped += 1,
            ProcessingResult::Error(_) => self.files_errored += 1,
        }
    }

    /// Takes the document and symbol counts of every partition.
    pub fn collect_partitions(&mut self, index: &WorkspaceIndex) {
        let count = |partition| PartitionStatistics {
            documents: index.document_count(partition),
            symbols: index.symbol_count(partition),
        };
        self.workspace = count(IndexPartition::Workspace);
        self.stdlib_preload = count(IndexPartition::StdlibPreload);
        self.user_preload = count(IndexPartition::UserPreload);
    }

    pub fn finish(&mut self, duration: Duration) {
        self.metadata.indexing_duration_seconds = duration.as_secs_f64();
    }

    pub fn total_files(&self) -> usize {
        self.files_processed + self.files_skipped + self.files_errored
    }

    pub fn success_rate(&self) -> f64 {
        let total = self.total_files();
        if total == 0 {
            0.0
        } else {
            self.files_processed as f64 / total as f64
        }
    }

    pub fn export_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
