//! Symbol and type resolution engine.
//!
//! - [`builder`] / [`walker`]: one file's symbols, chunks and require edges
//! - [`workspace`]: the three-partition registry and require-tree search
//! - [`type_inference`]: tag-chain resolution back into the workspace
//! - [`scope_resolver`]: shadowed local disambiguation

pub mod builder;
pub mod document;
pub mod partition;
pub mod scope_resolver;
pub mod shared;
pub mod trie;
pub mod type_inference;
pub mod types;
pub mod walker;
pub mod workspace;

pub use builder::DocumentBuilder;
pub use document::{DocumentIndex, DocumentState};
pub use shared::SharedWorkspaceIndex;
pub use type_inference::{ResolutionPurpose, ResolutionStats, TypeInferencer, resolve_tag_chain};
pub use types::{
    Chunk, ChunkRef, DocumentUri, IndexPartition, PositionHit, SearchMode, SearchScope,
    SourceLocation, Symbol, SymbolKind, TagReason,
};
pub use workspace::WorkspaceIndex;
