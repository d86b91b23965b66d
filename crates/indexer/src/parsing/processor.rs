use super::ast::SourceFile;
use super::lowering::Lowering;
use crate::error::{IndexerError, Result};
use std::time::Duration;
use tree_sitter::Parser;

/// What the parser produced for one source text.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    /// The text parsed without syntax errors.
    Complete(SourceFile),
    /// The text contained syntax errors; only recoverable top-level
    /// declarations were lowered.
    Degraded(SourceFile),
}

impl ParseOutcome {
    pub fn is_degraded(&self) -> bool {
        matches!(self, ParseOutcome::Degraded(_))
    }

    pub fn source_file(&self) -> &SourceFile {
        match self {
            ParseOutcome::Complete(file) | ParseOutcome::Degraded(file) => file,
        }
    }

    pub fn into_source_file(self) -> SourceFile {
        match self {
            ParseOutcome::Complete(file) | ParseOutcome::Degraded(file) => file,
        }
    }
}

/// Thin wrapper over a tree-sitter parser loaded with the Lua grammar.
pub struct LuaParser {
    parser: Parser,
}

impl LuaParser {
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        parser.set_language(&tree_sitter_lua::LANGUAGE.into())?;
        Ok(Self { parser })
    }

    /// Parses and lowers `text`. `uri` is only used for error reporting.
    pub fn parse(&mut self, uri: &str, text: &str) -> Result<ParseOutcome> {
        let tree = self
            .parser
            .parse(text, None)
            .ok_or_else(|| IndexerError::ParserUnavailable {
                uri: uri.to_string(),
            })?;
        let root = tree.root_node();
        let lowering = Lowering::new(text);
        if root.has_error() {
            Ok(ParseOutcome::Degraded(lowering.lower_degraded(root)))
        } else {
            Ok(ParseOutcome::Complete(lowering.lower_chunk(root)))
        }
    }
}

impl std::fmt::Debug for LuaParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LuaParser").finish_non_exhaustive()
    }
}

/// Represents a file that was skipped during processing
#[derive(Debug, Clone)]
pub struct SkippedFile {
    pub file_path: String,
    pub reason: String,
    pub file_size: Option<u64>,
}

/// Represents a file that encountered an error during processing
#[derive(Debug, Clone)]
pub struct ErroredFile {
    pub file_path: String,
    pub error_message: String,
    pub error_stage: ProcessingStage,
}

/// Represents the stage where processing failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessingStage {
    FileSystem, // Failed to read file metadata or content
    Parsing,    // Failed to obtain a syntax tree
}

/// A file that made it into the index
#[derive(Debug, Clone)]
pub struct FileProcessingResult {
    pub file_path: String,
    pub symbol_count: usize,
    pub require_count: usize,
    pub degraded: bool,
    pub duration: Duration,
}

/// Result of processing a file that can be success, skipped, or error
#[derive(Debug)]
pub enum ProcessingResult {
    Success(FileProcessingResult),
    Skipped(SkippedFile),
    Error(ErroredFile),
}

impl ProcessingResult {
    /// Check if the result is a success
    pub fn is_success(&self) -> bool {
        matches!(self, ProcessingResult::Success(_))
    }

    /// Check if the result is skipped
    pub fn is_skipped(&self) -> bool {
        matches!(self, ProcessingResult::Skipped(_))
    }

    /// Check if the result is an error
    pub fn is_error(&self) -> bool {
        matches!(self, ProcessingResult::Error(_))
    }

    /// Get the file path regardless of result type
    pub fn file_path(&self) -> &str {
        match self {
            ProcessingResult::Success(result) => &result.file_path,
            ProcessingResult::Skipped(skipped) => &skipped.file_path,
            ProcessingResult::Error(errored) => &errored.file_path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::ast::{Expr, Stmt, TableField};

    fn parse(text: &str) -> ParseOutcome {
        LuaParser::new().unwrap().parse("test.lua", text).unwrap()
    }

    #[test]
    fn test_lowers_local_require() {
        let outcome = parse("local M = require(\"mod\")\n");
        assert!(!outcome.is_degraded());

        let file = outcome.source_file();
        match &file.body.statements[0] {
            Stmt::Local { names, values, .. } => {
                assert_eq!(names[0].name, "M");
                match &values[0] {
                    Expr::Call(call) => assert_eq!(call.required_module(), Some("mod")),
                    other => panic!("expected call, got {other:?}"),
                }
            }
            other => panic!("expected local, got {other:?}"),
        }
    }

    #[test]
    fn test_lowers_string_call_require() {
        let outcome = parse("require \"util.strings\"\n");
        match &outcome.source_file().body.statements[0] {
            Stmt::Call(call) => assert_eq!(call.required_module(), Some("util.strings")),
            other => panic!("expected call, got {other:?}"),
        }
    }

    #[test]
    fn test_lowers_method_declaration_and_params() {
        let outcome = parse("function Account:deposit(amount, note)\n  return self\nend\n");
        match &outcome.source_file().body.statements[0] {
            Stmt::Function(decl) => {
                assert!(!decl.is_local);
                assert!(decl.name.is_method_name());
                assert_eq!(decl.name.dotted_name().as_deref(), Some("Account.deposit"));
                let params: Vec<_> = decl.function.params.iter().map(|p| p.name.as_str()).collect();
                assert_eq!(params, vec!["amount", "note"]);
                assert!(matches!(decl.function.body.statements[0], Stmt::Return { .. }));
            }
            other => panic!("expected function, got {other:?}"),
        }
    }

    #[test]
    fn test_lowers_local_function() {
        let outcome = parse("local function helper() end\n");
        match &outcome.source_file().body.statements[0] {
            Stmt::Function(decl) => {
                assert!(decl.is_local);
                assert_eq!(decl.name.dotted_name().as_deref(), Some("helper"));
            }
            other => panic!("expected function, got {other:?}"),
        }
    }

    #[test]
    fn test_lowers_table_fields() {
        let outcome = parse("local t = { a = 1, [\"b\"] = 2, [3] = x, 4 }\n");
        match &outcome.source_file().body.statements[0] {
            Stmt::Local { values, .. } => match &values[0] {
                Expr::Table(table) => {
                    assert_eq!(table.fields.len(), 4);
                    assert!(matches!(&table.fields[0], TableField::Named { key, .. } if key.name == "a"));
                    assert!(matches!(&table.fields[1], TableField::Indexed { key: Expr::String(s), .. } if s.value == "b"));
                    assert!(matches!(&table.fields[2], TableField::Indexed { key: Expr::Number(n, _), .. } if n == "3"));
                    assert!(matches!(&table.fields[3], TableField::Positional { .. }));
                }
                other => panic!("expected table, got {other:?}"),
            },
            other => panic!("expected local, got {other:?}"),
        }
    }

    #[test]
    fn test_collects_comments() {
        let outcome = parse("---@type Account\nlocal acc = nil\n");
        let comments = &outcome.source_file().comments;
        assert_eq!(comments.len(), 1);
        assert!(comments[0].text.starts_with("---@type"));
        assert_eq!(comments[0].range.start.line, 0);
    }

    #[test]
    fn test_control_flow_blocks_are_lowered() {
        let outcome = parse(
            "for i = 1, 10 do local a = i end\nfor k, v in pairs(t) do end\nwhile x do end\nif a then b() elseif c then d() else e() end\n",
        );
        let statements = &outcome.source_file().body.statements;
        assert!(matches!(&statements[0], Stmt::NumericFor { variable, .. } if variable.name == "i"));
        assert!(matches!(&statements[1], Stmt::GenericFor { variables, .. } if variables.len() == 2));
        assert!(matches!(&statements[2], Stmt::While { .. }));
        assert!(matches!(&statements[3], Stmt::If { clauses, .. } if clauses.len() == 3));
    }

    #[test]
    fn test_syntax_error_keeps_top_level_declarations() {
        let outcome = parse("local ok = require(\"a\")\nlocal function f() end\nif then\n");
        assert!(outcome.is_degraded());
        let statements = &outcome.source_file().body.statements;
        assert!(statements.iter().any(|s| matches!(s, Stmt::Local { names, .. } if names[0].name == "ok")));
    }
}
