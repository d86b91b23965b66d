//! Picks the local definition a use site actually sees when several locals
//! share a name (shadowing across nested functions).
//!
//! A local is visible from a use site when its chunk stack is a prefix of the
//! use site's stack and it is declared on or above the use line. Among visible
//! candidates the deepest shared stack wins, and among those the closest
//! declaration above the use line. A use with no visible local gets `None`,
//! so the caller falls through to globals.

use super::types::{ChunkRef, Symbol};
use std::sync::Arc;

/// Number of chunks `candidate` shares with `use_stack`, or `None` when the
/// candidate lives in a chunk the use site is not nested in.
pub fn common_depth(candidate: &Symbol, use_stack: &[ChunkRef]) -> Option<usize> {
    let stack = &candidate.container_chunks;
    if stack.len() > use_stack.len() {
        return None;
    }
    stack
        .iter()
        .zip(use_stack)
        .all(|(declared, used)| declared == used)
        .then_some(stack.len())
}

/// Whether a use at `use_line` inside `use_stack` can see `candidate`.
pub fn is_visible_from(candidate: &Symbol, use_stack: &[ChunkRef], use_line: u32) -> bool {
    candidate.start_line() <= use_line && common_depth(candidate, use_stack).is_some()
}

pub fn pick_local_definition(
    candidates: &[Arc<Symbol>],
    use_stack: &[ChunkRef],
    use_line: u32,
) -> Option<Arc<Symbol>> {
    let visible: Vec<(usize, &Arc<Symbol>)> = candidates
        .iter()
        .filter(|symbol| symbol.is_local && symbol.start_line() <= use_line)
        .filter_map(|symbol| common_depth(symbol, use_stack).map(|depth| (depth, symbol)))
        .collect();
    let deepest = visible.iter().map(|(depth, _)| *depth).max()?;

    visible
        .iter()
        .filter(|(depth, _)| *depth == deepest)
        .min_by_key(|(_, symbol)| use_line - symbol.start_line())
        .map(|(_, symbol)| Arc::clone(symbol))
}
