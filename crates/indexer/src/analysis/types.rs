//! Core data model of the symbol engine: symbols, chunks, tags and the
//! records the builder leaves behind for its post-pass.

use crate::error::{IndexerError, Result};
use crate::parsing::ast::Range;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use strum::{Display, EnumString};

const FILE_SCHEME: &str = "file://";

/// Document identifier.
///
/// Usually a `file://` URI, but any opaque string works for documents that
/// only ever arrive as in-memory text. Cloning is cheap.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentUri(Arc<str>);

impl DocumentUri {
    pub fn new(uri: impl Into<Arc<str>>) -> Self {
        Self(uri.into())
    }

    pub fn from_path(path: &Path) -> Self {
        Self::new(format!("{FILE_SCHEME}{}", path.to_string_lossy()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_file_path(&self) -> Result<PathBuf> {
        match self.0.strip_prefix(FILE_SCHEME) {
            Some(path) => Ok(PathBuf::from(path)),
            None => Err(IndexerError::InvalidUri {
                uri: self.0.to_string(),
            }),
        }
    }

    /// Last path segment, e.g. `player.lua`.
    pub fn file_name(&self) -> &str {
        self.0.rsplit(['/', '\\']).next().unwrap_or(&self.0)
    }

    /// File name without extension; this is the key `require` resolves by.
    pub fn module_name(&self) -> &str {
        let file_name = self.file_name();
        match file_name.rfind('.') {
            Some(dot) if dot > 0 => &file_name[..dot],
            _ => file_name,
        }
    }
}

impl fmt::Display for DocumentUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentUri {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Normalizes an access path: method separators become dots.
pub fn normalize_search_name(name: &str) -> String {
    name.replace(':', ".")
}

/// Reduces a `require` argument to the bare module name used for lookup:
/// `"net.http"` -> `http`, `"lib/json.lua"` -> `json`.
pub fn module_key(required: &str) -> &str {
    let trimmed = required.strip_suffix(".lua").unwrap_or(required);
    trimmed.rsplit(['.', '/', '\\']).next().unwrap_or(trimmed)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum SymbolKind {
    Variable,
    Function,
}

/// Why a symbol's effective type is some other named entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum TagReason {
    /// `---@type T` annotation on the line above the declaration.
    UserTag,
    /// `local a = b` / `a = b.c` propagation.
    Equal,
    /// `setmetatable(a, mt)` delegation through `mt.__index`.
    MetaTable,
    /// `local m = require("m")`, typed by the module's returned variable.
    RequireReturn,
    /// `local x = f()`, typed by `f`'s returned variable.
    CallReturn,
}

/// Tag recorded directly on a symbol (require and call returns live in
/// their own fields).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolTag {
    pub reason: TagReason,
    pub type_name: String,
}

/// Identity of a lexical scope as seen from a symbol: name plus extent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkRef {
    pub name: Arc<str>,
    pub range: Range,
}

/// A lexical scope unit (file top level or a function body).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub name: String,
    pub range: Range,
    /// Variable returned by a single-identifier `return` in this chunk.
    pub return_name: Option<String>,
}

impl Chunk {
    pub fn reference(&self) -> ChunkRef {
        ChunkRef {
            name: self.name.as_str().into(),
            range: self.range,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub uri: DocumentUri,
    pub range: Range,
}

/// One declared name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    /// Human-readable form, e.g. `function Account:deposit(amount)`.
    pub display_name: String,
    /// Canonical dotted path; never contains `:`.
    pub search_name: String,
    /// Last path segment.
    pub original_name: String,
    pub kind: SymbolKind,
    pub location: SourceLocation,
    pub is_local: bool,
    /// Name of the innermost enclosing chunk.
    pub container_name: String,
    /// Enclosing chunks, outermost first.
    pub container_chunks: SmallVec<[ChunkRef; 4]>,
    pub function_params: Vec<String>,
    pub tag: Option<SymbolTag>,
    /// Module name when the value is `require("X")`.
    pub require_module: Option<String>,
    /// Callee name when the value is a call's return.
    pub call_return_of: Option<String>,
    /// Chunk opened by this symbol when it is a function definition.
    pub owned_chunk: Option<Chunk>,
}

impl Symbol {
    pub fn uri(&self) -> &DocumentUri {
        &self.location.uri
    }

    pub fn start_line(&self) -> u32 {
        self.location.range.start.line
    }

    /// The reason the type inferencer would follow for this symbol, in the
    /// order it checks them.
    pub fn tag_reason(&self) -> Option<TagReason> {
        if let Some(tag) = &self.tag {
            return Some(tag.reason);
        }
        if self.require_module.is_some() {
            return Some(TagReason::RequireReturn);
        }
        if self.call_return_of.is_some() {
            return Some(TagReason::CallReturn);
        }
        None
    }

    pub fn return_name(&self) -> Option<&str> {
        self.owned_chunk
            .as_ref()
            .and_then(|chunk| chunk.return_name.as_deref())
    }
}

/// A `require` statement, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequireEdge {
    pub target_module: String,
    pub location: Range,
}

/// Pending annotation applied to a symbol after the walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentTagRecord {
    pub reason: TagReason,
    pub new_type: String,
    /// For `MetaTable`: the name of the object receiving the metatable.
    pub old_type: Option<String>,
    pub source_line: u32,
    /// For `Equal`: the declaration receiving the tag.
    pub bound_name: Option<String>,
}

/// A call seen during the walk; bound ones carry the receiving declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    pub callee: String,
    pub line: u32,
    pub bound_name: Option<String>,
    pub required_module: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum SearchMode {
    #[strum(serialize = "exact", serialize = "exactly_equal")]
    ExactlyEqual,
    #[strum(serialize = "prefix", serialize = "prefix_match")]
    PrefixMatch,
    #[strum(serialize = "fuzzy", serialize = "fuzzy_matching")]
    FuzzyMatching,
}

/// Which symbol subset of a document to search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum SearchScope {
    All,
    Global,
    Local,
}

/// The three document registries of a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum IndexPartition {
    Workspace,
    StdlibPreload,
    UserPreload,
}

/// Where a cursor landed during a definition walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PositionHit {
    /// A name, with the chunk stack at the use site. `is_local` is set when
    /// the first segment of the name is a local visible at that point.
    Symbol {
        search_name: String,
        range: Range,
        chunk_stack: Vec<ChunkRef>,
        is_local: bool,
    },
    /// The string argument of a `require` call.
    Require { module: String, range: Range },
}

impl PositionHit {
    pub fn range(&self) -> Range {
        match self {
            PositionHit::Symbol { range, .. } | PositionHit::Require { range, .. } => *range,
        }
    }
}
