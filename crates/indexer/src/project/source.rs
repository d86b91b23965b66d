use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::execution::config::AnalysisConfig;
use ignore::WalkBuilder;

// File sources decide which Lua files make up a workspace:
//
// - PathFileSource walks a directory tree, the usual case for the CLI and for
//   preload stub directories.
// - ListFileSource takes an explicit list, for hosts that already track the
//   open files themselves.
//
// Both filter by the configured extensions so the indexing loop stays
// agnostic to how files were discovered.

pub trait FileSource {
    type Error: std::fmt::Display + Send + Sync + 'static;

    fn get_files(&self, config: &AnalysisConfig) -> Result<Vec<PathBuf>, Self::Error>;
}

pub struct PathFileSource {
    pub files: Vec<PathBuf>,
}

impl PathFileSource {
    /// Walks `root` in a stable (sorted) order.
    pub fn from_path(root: &Path, config: &AnalysisConfig) -> Self {
        let extensions = supported_extensions(config);
        let mut files: Vec<PathBuf> = WalkBuilder::new(root)
            .hidden(false)
            .git_ignore(config.respect_gitignore)
            .git_global(false)
            .git_exclude(config.respect_gitignore)
            .ignore(config.respect_gitignore)
            .parents(false)
            .require_git(false)
            .build()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
            .map(|entry| entry.into_path())
            .filter(|path| should_process_path(path, &extensions))
            .collect();
        files.sort();
        Self { files }
    }
}

impl FileSource for PathFileSource {
    type Error = &'static str;

    fn get_files(&self, config: &AnalysisConfig) -> Result<Vec<PathBuf>, Self::Error> {
        let extensions = supported_extensions(config);
        Ok(self
            .files
            .iter()
            .filter(|path| should_process_path(path, &extensions))
            .cloned()
            .collect())
    }
}

pub struct ListFileSource {
    pub files: Vec<PathBuf>,
}

impl ListFileSource {
    pub fn new(files: Vec<PathBuf>) -> Self {
        Self { files }
    }
}

impl FileSource for ListFileSource {
    type Error = std::io::Error;

    fn get_files(&self, config: &AnalysisConfig) -> Result<Vec<PathBuf>, Self::Error> {
        let extensions = supported_extensions(config);
        let mut files = Vec::with_capacity(self.files.len());
        for path in &self.files {
            if !path.exists() {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("{} does not exist", path.display()),
                ));
            }
            if should_process_path(path, &extensions) {
                files.push(path.clone());
            }
        }
        Ok(files)
    }
}

fn supported_extensions(config: &AnalysisConfig) -> HashSet<String> {
    config.extensions.iter().cloned().collect()
}

fn should_process_path(path: &Path, supported_extensions: &HashSet<String>) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| supported_extensions.contains(ext))
}
