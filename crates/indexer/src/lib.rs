pub mod analysis;
pub mod error;
pub mod execution;
pub mod indexer;
pub mod parsing;
pub mod project;
pub mod query;
pub mod stats;
