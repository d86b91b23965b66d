//! Turns a lowered source file into a [`DocumentIndex`].
//!
//! ## Phases
//!
//! 1. **Walk**: [`SymbolWalker`] in build mode declares symbols and chunks
//!    and leaves tag records and call sites behind.
//! 2. **Tag post-pass**: records are applied in a fixed order (`Equal`, then
//!    `MetaTable`, then `UserTag`). A `UserTag` always wins, a later
//!    `MetaTable` overrides an `Equal`.
//! 3. **Call sites**: bound calls mark their receiving declaration as a
//!    `require` result or a call return.
//! 4. **Freeze**: drafts become shared symbols, function symbols receive
//!    their finished chunk, and the three partitions are built.
//!
//! Lookups against an existing document (definition and reference walks)
//! also go through here so they always use the same walker.

use super::document::{DocumentIndex, DocumentState};
use super::partition::SymbolPartition;
use super::types::{
    CallSite, Chunk, CommentTagRecord, DocumentUri, PositionHit, Symbol, SymbolTag, TagReason,
};
use super::walker::{SymbolDraft, SymbolWalker, WalkContext, WalkMode};
use crate::parsing::ast::{Position, Range, SourceFile};
use crate::parsing::processor::ParseOutcome;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::debug;

pub struct DocumentBuilder;

impl DocumentBuilder {
    /// Builds the index of a freshly parsed document.
    pub fn build(uri: &DocumentUri, outcome: ParseOutcome) -> DocumentIndex {
        let state = if outcome.is_degraded() {
            DocumentState::Degraded
        } else {
            DocumentState::Complete
        };
        Self::build_from_source(uri, outcome.into_source_file(), state)
    }

    pub fn build_from_source(
        uri: &DocumentUri,
        source: SourceFile,
        state: DocumentState,
    ) -> DocumentIndex {
        let WalkContext {
            chunks,
            mut symbols,
            requires,
            tag_records,
            call_sites,
            ..
        } = SymbolWalker::new(uri, WalkMode::Build).walk(&source);

        apply_tag_records(&mut symbols, &tag_records);
        apply_call_sites(&mut symbols, &call_sites);

        let frozen: Vec<Arc<Symbol>> = symbols
            .into_iter()
            .map(|draft| {
                let mut symbol = draft.symbol;
                symbol.owned_chunk = draft.owned_chunk.map(|index| chunks[index].clone());
                Arc::new(symbol)
            })
            .collect();

        let (globals, locals): (Vec<_>, Vec<_>) =
            frozen.iter().cloned().partition(|symbol| !symbol.is_local);

        let file_chunk_name = uri.file_name().to_string();
        let mut chunk_map: FxHashMap<String, Chunk> =
            FxHashMap::with_capacity_and_hasher(chunks.len(), Default::default());
        for chunk in chunks {
            chunk_map.insert(chunk.name.clone(), chunk);
        }

        debug!(
            uri = %uri,
            symbols = frozen.len(),
            requires = requires.len(),
            state = ?state,
            "Built document index"
        );

        DocumentIndex {
            uri: uri.clone(),
            state,
            source,
            all: SymbolPartition::from_symbols(&frozen),
            global: SymbolPartition::from_symbols(&globals),
            local: SymbolPartition::from_symbols(&locals),
            chunks: chunk_map,
            file_chunk_name,
            requires,
            referenced_by: Vec::new(),
        }
    }

    /// The name (or `require` string) under `position`, with the chunk stack
    /// at that point.
    pub fn find_at_position(document: &DocumentIndex, position: Position) -> Option<PositionHit> {
        SymbolWalker::new(&document.uri, WalkMode::GetDefine { position })
            .walk(&document.source)
            .hit
    }

    /// Every range in the document whose dotted name equals `search_name`.
    pub fn find_references(document: &DocumentIndex, search_name: &str) -> Vec<Range> {
        SymbolWalker::new(&document.uri, WalkMode::FindRefs { search_name })
            .walk(&document.source)
            .references
    }
}

fn set_tag(draft: &mut SymbolDraft, reason: TagReason, type_name: &str) {
    draft.symbol.tag = Some(SymbolTag {
        reason,
        type_name: type_name.to_string(),
    });
}

fn has_user_tag(draft: &SymbolDraft) -> bool {
    matches!(&draft.symbol.tag, Some(tag) if tag.reason == TagReason::UserTag)
}

fn apply_tag_records(symbols: &mut [SymbolDraft], records: &[CommentTagRecord]) {
    for record in records.iter().filter(|r| r.reason == TagReason::Equal) {
        let Some(bound_name) = &record.bound_name else {
            continue;
        };
        if let Some(draft) = symbols.iter_mut().find(|draft| {
            draft.symbol.start_line() == record.source_line && &draft.symbol.search_name == bound_name
        }) && draft.symbol.tag.is_none()
            && draft.symbol.search_name != record.new_type
        {
            set_tag(draft, TagReason::Equal, &record.new_type);
        }
    }

    for record in records.iter().filter(|r| r.reason == TagReason::MetaTable) {
        let Some(old_type) = &record.old_type else {
            continue;
        };
        // Prefer the latest declaration at or above the call.
        let target = symbols
            .iter()
            .rposition(|draft| {
                &draft.symbol.search_name == old_type
                    && draft.symbol.start_line() <= record.source_line
            })
            .or_else(|| {
                symbols
                    .iter()
                    .position(|draft| &draft.symbol.search_name == old_type)
            });
        if let Some(index) = target
            && !has_user_tag(&symbols[index])
        {
            set_tag(&mut symbols[index], TagReason::MetaTable, &record.new_type);
        }
    }

    for record in records.iter().filter(|r| r.reason == TagReason::UserTag) {
        if let Some(draft) = symbols
            .iter_mut()
            .find(|draft| draft.symbol.start_line() == record.source_line + 1)
        {
            set_tag(draft, TagReason::UserTag, &record.new_type);
        }
    }
}

fn apply_call_sites(symbols: &mut [SymbolDraft], call_sites: &[CallSite]) {
    for site in call_sites {
        let Some(bound_name) = &site.bound_name else {
            continue;
        };
        let Some(draft) = symbols.iter_mut().find(|draft| {
            draft.symbol.start_line() == site.line && &draft.symbol.search_name == bound_name
        }) else {
            continue;
        };
        match &site.required_module {
            Some(module) => draft.symbol.require_module = Some(module.clone()),
            None => draft.symbol.call_return_of = Some(site.callee.clone()),
        }
    }
}
