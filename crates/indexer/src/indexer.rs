//! Whole-directory indexing on top of [`WorkspaceIndex`].
//!
//! A scan registers every module name before building anything, so that
//! `require` edges between files of the same scan always resolve regardless
//! of walk order. Preload directories are indexed into their own partitions
//! afterwards.

use crate::analysis::document::DocumentState;
use crate::analysis::types::{DocumentUri, IndexPartition};
use crate::analysis::workspace::WorkspaceIndex;
use crate::error::Result;
use crate::execution::config::AnalysisConfig;
use crate::parsing::processor::{
    ErroredFile, FileProcessingResult, ProcessingResult, ProcessingStage, SkippedFile,
};
use crate::project::io::{ProcessingError, read_text_file};
use crate::project::source::{FileSource, PathFileSource};
use crate::stats::IndexStatistics;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

pub struct IndexingOutcome {
    pub results: Vec<ProcessingResult>,
    pub statistics: IndexStatistics,
}

pub struct WorkspaceIndexer {
    index: WorkspaceIndex,
}

impl WorkspaceIndexer {
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        Ok(Self {
            index: WorkspaceIndex::new(config)?,
        })
    }

    pub fn from_index(index: WorkspaceIndex) -> Self {
        Self { index }
    }

    pub fn index(&self) -> &WorkspaceIndex {
        &self.index
    }

    pub fn index_mut(&mut self) -> &mut WorkspaceIndex {
        &mut self.index
    }

    pub fn into_index(self) -> WorkspaceIndex {
        self.index
    }

    /// Indexes every Lua file below `root`, then the configured preload
    /// directories.
    pub fn index_directory(&mut self, root: &Path) -> Result<IndexingOutcome> {
        let start_time = Instant::now();
        let config = self.index.config().clone();
        info!(
            root = %root.display(),
            max_file_size = config.max_file_size,
            respect_gitignore = config.respect_gitignore,
            "Indexing workspace"
        );

        let mut statistics = IndexStatistics::new(root.to_string_lossy().to_string());
        let source = PathFileSource::from_path(root, &config);
        let mut results = self.index_source(&source, IndexPartition::Workspace);

        let preloads = [
            (IndexPartition::StdlibPreload, config.stdlib_preload_dir.as_ref()),
            (IndexPartition::UserPreload, config.user_preload_dir.as_ref()),
        ];
        for (partition, directory) in preloads {
            let Some(directory) = directory else {
                continue;
            };
            if !directory.is_dir() {
                warn!(dir = %directory.display(), partition = %partition, "Preload directory not found");
                continue;
            }
            let source = PathFileSource::from_path(directory, &config);
            results.extend(self.index_source(&source, partition));
        }

        for result in &results {
            statistics.record(result);
        }
        statistics.collect_partitions(&self.index);
        statistics.finish(start_time.elapsed());

        info!(
            processed = statistics.files_processed,
            skipped = statistics.files_skipped,
            errored = statistics.files_errored,
            degraded = statistics.files_degraded,
            symbols = statistics.workspace.symbols,
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "Indexing finished"
        );
        Ok(IndexingOutcome {
            results,
            statistics,
        })
    }

    /// Indexes the files of `source` into `partition`.
    pub fn index_source<S: FileSource>(
        &mut self,
        source: &S,
        partition: IndexPartition,
    ) -> Vec<ProcessingResult> {
        let files = match source.get_files(self.index.config()) {
            Ok(files) => files,
            Err(e) => {
                warn!(error = %e, partition = %partition, "Failed to list files");
                return Vec::new();
            }
        };

        let uris: Vec<(PathBuf, DocumentUri)> = files
            .into_iter()
            .map(|path| {
                let uri = DocumentUri::from_path(&path);
                (path, uri)
            })
            .collect();
        if partition == IndexPartition::Workspace {
            for (_, uri) in &uris {
                self.index.register_module(uri);
            }
        }

        uris.iter()
            .map(|(path, uri)| self.process_file(path, uri, partition))
            .collect()
    }

    fn process_file(
        &mut self,
        path: &Path,
        uri: &DocumentUri,
        partition: IndexPartition,
    ) -> ProcessingResult {
        let start_time = Instant::now();
        let file_path = path.to_string_lossy().to_string();

        let text = match read_text_file(path, self.index.config().max_file_size) {
            Ok(text) => text,
            Err(ProcessingError::Skipped(file_path, reason)) => {
                debug!(file = %file_path, reason = %reason, "Skipping file");
                return ProcessingResult::Skipped(SkippedFile {
                    file_size: std::fs::metadata(path).ok().map(|m| m.len()),
                    file_path,
                    reason,
                });
            }
            Err(ProcessingError::Error(file_path, error_message)) => {
                warn!(file = %file_path, error = %error_message, "Failed to read file");
                return ProcessingResult::Error(ErroredFile {
                    file_path,
                    error_message,
                    error_stage: ProcessingStage::FileSystem,
                });
            }
        };

        match self.index.build_or_refresh_in(partition, uri, Some(&text)) {
            Ok(_) => {
                let (symbol_count, require_count, degraded) = self
                    .index
                    .document_in(partition, uri)
                    .map(|document| {
                        (
                            document.symbols().len(),
                            document.requires().len(),
                            document.state == DocumentState::Degraded,
                        )
                    })
                    .unwrap_or_default();
                ProcessingResult::Success(FileProcessingResult {
                    file_path,
                    symbol_count,
                    require_count,
                    degraded,
                    duration: start_time.elapsed(),
                })
            }
            Err(e) => {
                warn!(file = %file_path, error = %e, "Failed to index file");
                ProcessingResult::Error(ErroredFile {
                    file_path,
                    error_message: e.to_string(),
                    error_stage: ProcessingStage::Parsing,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::types::SearchMode;
    use std::fs;
    use tempfile::TempDir;
    use tracing_test::traced_test;

    #[test]
    #[traced_test]
    fn test_index_directory_links_requires_and_counts() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.lua"), "local b = require('b')\nreturn b\n").unwrap();
        fs::write(dir.path().join("b.lua"), "B = {}\nfunction B.run() end\nreturn B\n").unwrap();
        fs::write(dir.path().join("broken.lua"), "local x = = 1\nlocal ok = 2\n").unwrap();

        let mut indexer = WorkspaceIndexer::new(AnalysisConfig::default()).unwrap();
        let outcome = indexer.index_directory(dir.path()).unwrap();

        assert_eq!(outcome.results.len(), 3);
        assert!(outcome.results.iter().all(|r| r.is_success()));
        assert_eq!(outcome.statistics.files_processed, 3);
        assert_eq!(outcome.statistics.files_degraded, 1);
        assert_eq!(outcome.statistics.workspace.documents, 3);

        let a = DocumentUri::from_path(&dir.path().join("a.lua"));
        let b = DocumentUri::from_path(&dir.path().join("b.lua"));
        let index = indexer.index();
        assert_eq!(index.document(&b).unwrap().referenced_by(), &[a.clone()]);
        assert_eq!(
            index
                .search_global_definition(&a, "B.run", SearchMode::ExactlyEqual)
                .len(),
            1
        );
        assert!(logs_contain("Indexing finished"));
    }

    #[test]
    fn test_oversize_files_are_skipped() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("big.lua"), "x = 1\n".repeat(100)).unwrap();
        let config = AnalysisConfig {
            max_file_size: 10,
            ..AnalysisConfig::default()
        };

        let mut indexer = WorkspaceIndexer::new(config).unwrap();
        let outcome = indexer.index_directory(dir.path()).unwrap();
        assert_eq!(outcome.statistics.files_skipped, 1);
        assert!(outcome.results[0].is_skipped());
    }

    #[test]
    fn test_preload_directories_fill_their_partitions() {
        let workspace = TempDir::new().unwrap();
        let stubs = TempDir::new().unwrap();
        fs::write(workspace.path().join("main.lua"), "local x = 1\n").unwrap();
        fs::write(stubs.path().join("math.lua"), "math = {}\nmath.floor = function(x) end\n").unwrap();
        let config = AnalysisConfig {
            stdlib_preload_dir: Some(stubs.path().to_path_buf()),
            ..AnalysisConfig::default()
        };

        let mut indexer = WorkspaceIndexer::new(config).unwrap();
        let outcome = indexer.index_directory(workspace.path()).unwrap();
        assert_eq!(outcome.statistics.stdlib_preload.documents, 1);
        // `math`, `math.floor` and its parameter `x`.
        assert_eq!(outcome.statistics.stdlib_preload.symbols, 3);

        let main = DocumentUri::from_path(&workspace.path().join("main.lua"));
        assert_eq!(
            indexer
                .index()
                .search_for_completion(&main, "math.fl", SearchMode::PrefixMatch)
                .len(),
            1
        );
    }
}
