//! Source parsing: tree-sitter Lua grammar in, owned syntax tree out.

pub mod ast;
pub mod lowering;
pub mod processor;

pub use ast::{Position, Range, SourceFile};
pub use processor::{LuaParser, ParseOutcome, ProcessingResult};
