//! Editor-facing queries over a [`WorkspaceIndex`](crate::analysis::WorkspaceIndex).
//!
//! Each consumer is a set of free functions taking the index by shared
//! reference, so they can run under [`SharedWorkspaceIndex::with_index`](crate::analysis::SharedWorkspaceIndex::with_index).

pub mod completion;
pub mod definition;
pub mod outline;
pub mod references;

pub use completion::{CompletionItem, CompletionKind, InsertTextFormat, complete, complete_comment};
pub use definition::{DefinitionTarget, find_definition, function_at_line};
pub use outline::{OutlineNode, document_outline, outline};
pub use references::{find_references, references_of};
