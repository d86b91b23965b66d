//! Error types for the lua-indexer crate

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for indexer operations
pub type Result<T> = std::result::Result<T, IndexerError>;

/// Errors raised while setting up the engine or touching the file system.
///
/// Queries never return these: a lookup that finds nothing is an empty result.
#[derive(Error, Debug)]
pub enum IndexerError {
    /// IO operations failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Statistics or query results could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration file could not be parsed
    #[error("Invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// The Lua grammar could not be loaded into the parser
    #[error("Failed to load Lua grammar: {0}")]
    LanguageSetup(#[from] tree_sitter::LanguageError),

    /// The parser returned no tree (cancelled or misconfigured)
    #[error("Parser produced no syntax tree for {uri}")]
    ParserUnavailable { uri: String },

    /// A document URI could not be mapped to a file path
    #[error("Not a file URI: {uri}")]
    InvalidUri { uri: String },

    /// A path is outside of anything the indexer can read
    #[error("Failed to read {path:?}: {reason}")]
    Unreadable { path: PathBuf, reason: String },
}
