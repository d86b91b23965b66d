use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_MAX_REQUIRE_DEPTH: usize = 50;
pub const DEFAULT_MAX_TAG_FANOUT: usize = 10;
pub const DEFAULT_MAX_FILE_SIZE: usize = 5_000_000;

/// Tunables for document analysis, workspace search and file discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Maximum recursion depth when walking the require tree.
    pub max_require_depth: usize,
    /// When a tag-chain truncation yields more candidates than this, only the
    /// first one is probed.
    pub max_tag_fanout: usize,
    /// Files larger than this many bytes are skipped during a workspace scan.
    pub max_file_size: usize,
    pub respect_gitignore: bool,
    /// File extensions (without the dot) picked up by the file walker.
    pub extensions: Vec<String>,
    /// Directory with language standard-library stubs (completion only).
    pub stdlib_preload_dir: Option<PathBuf>,
    /// Directory with user-exported native stubs (completion only).
    pub user_preload_dir: Option<PathBuf>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_require_depth: DEFAULT_MAX_REQUIRE_DEPTH,
            max_tag_fanout: DEFAULT_MAX_TAG_FANOUT,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            respect_gitignore: true,
            extensions: vec!["lua".to_string()],
            stdlib_preload_dir: None,
            user_preload_dir: None,
        }
    }
}

impl AnalysisConfig {
    pub fn accepts_extension(&self, extension: &str) -> bool {
        self.extensions.iter().any(|ext| ext == extension)
    }
}

pub struct AnalysisConfigBuilder;

impl AnalysisConfigBuilder {
    pub fn build() -> AnalysisConfig {
        AnalysisConfig::default()
    }

    /// Loads a TOML configuration file; missing keys fall back to defaults.
    pub fn from_file(path: &Path) -> Result<AnalysisConfig> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<AnalysisConfig> {
        Ok(toml::from_str(content)?)
    }

    /// Uses the file when one is given, defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<AnalysisConfig> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::build()),
        }
    }
}
