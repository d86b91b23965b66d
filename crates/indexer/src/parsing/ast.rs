//! Owned syntax tree for Lua sources.
//!
//! The tree-sitter concrete syntax tree is lowered into these types once per
//! analysis so that the symbol walker never touches parser nodes directly and
//! can re-walk a document (definition lookup, reference search) long after
//! the parser state is gone.

use serde::{Deserialize, Serialize};

/// Zero-based line / column position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// Half-open source range; containment checks treat the end as inclusive so
/// a cursor sitting right after an identifier still hits it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, position: Position) -> bool {
        self.start <= position && position <= self.end
    }

    /// Smallest range covering both.
    pub fn cover(&self, other: &Range) -> Range {
        Range {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub text: String,
    pub range: Range,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceFile {
    pub body: Block,
    pub comments: Vec<Comment>,
    pub range: Range,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Block {
    pub statements: Vec<Stmt>,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionBody {
    pub params: Vec<Ident>,
    pub is_vararg: bool,
    pub body: Block,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub is_local: bool,
    /// `Identifier`, or a `Member` chain such as `a.b:c`.
    pub name: Expr,
    pub function: FunctionBody,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallExpr {
    pub callee: Expr,
    pub args: Vec<Expr>,
    pub range: Range,
}

impl CallExpr {
    /// The module name of a `require("x")` / `require "x"` call.
    pub fn required_module(&self) -> Option<&str> {
        match (&self.callee, self.args.as_slice()) {
            (Expr::Identifier(callee), [Expr::String(arg)]) if callee.name == "require" => {
                Some(arg.value.as_str())
            }
            _ => None,
        }
    }

    pub fn is_named(&self, name: &str) -> bool {
        matches!(&self.callee, Expr::Identifier(callee) if callee.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfClause {
    /// `None` for the trailing `else`.
    pub condition: Option<Expr>,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Local {
        names: Vec<Ident>,
        values: Vec<Expr>,
        range: Range,
    },
    Assign {
        targets: Vec<Expr>,
        values: Vec<Expr>,
        range: Range,
    },
    Function(FunctionDecl),
    Call(CallExpr),
    Return {
        values: Vec<Expr>,
        range: Range,
    },
    If {
        clauses: Vec<IfClause>,
        range: Range,
    },
    While {
        condition: Expr,
        body: Block,
        range: Range,
    },
    Repeat {
        body: Block,
        condition: Expr,
        range: Range,
    },
    Do {
        body: Block,
        range: Range,
    },
    NumericFor {
        variable: Ident,
        start: Expr,
        limit: Expr,
        step: Option<Expr>,
        body: Block,
        range: Range,
    },
    GenericFor {
        variables: Vec<Ident>,
        iterators: Vec<Expr>,
        body: Block,
        range: Range,
    },
}

impl Stmt {
    pub fn range(&self) -> Range {
        match self {
            Stmt::Local { range, .. }
            | Stmt::Assign { range, .. }
            | Stmt::Return { range, .. }
            | Stmt::If { range, .. }
            | Stmt::While { range, .. }
            | Stmt::Repeat { range, .. }
            | Stmt::Do { range, .. }
            | Stmt::NumericFor { range, .. }
            | Stmt::GenericFor { range, .. } => *range,
            Stmt::Function(decl) => decl.range,
            Stmt::Call(call) => call.range,
        }
    }
}

/// `.` or `:` between a table and its field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indexer {
    Dot,
    Colon,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StringLit {
    pub value: String,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableField {
    /// `name = value`
    Named { key: Ident, value: Expr },
    /// `[key] = value`
    Indexed { key: Expr, value: Expr },
    /// bare `value`
    Positional { value: Expr },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableConstructor {
    pub fields: Vec<TableField>,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Identifier(Ident),
    Member {
        base: Box<Expr>,
        indexer: Indexer,
        field: Ident,
        range: Range,
    },
    Index {
        base: Box<Expr>,
        index: Box<Expr>,
        range: Range,
    },
    Call(Box<CallExpr>),
    Function(Box<FunctionBody>),
    Table(TableConstructor),
    Binary {
        left: Box<Expr>,
        right: Box<Expr>,
        range: Range,
    },
    Unary {
        operand: Box<Expr>,
        range: Range,
    },
    Paren(Box<Expr>, Range),
    String(StringLit),
    Number(String, Range),
    Literal(Range),
    Vararg(Range),
}

impl Expr {
    pub fn range(&self) -> Range {
        match self {
            Expr::Identifier(ident) => ident.range,
            Expr::Member { range, .. }
            | Expr::Index { range, .. }
            | Expr::Binary { range, .. }
            | Expr::Unary { range, .. }
            | Expr::Paren(_, range)
            | Expr::Number(_, range)
            | Expr::Literal(range)
            | Expr::Vararg(range) => *range,
            Expr::Call(call) => call.range,
            Expr::Function(function) => function.range,
            Expr::Table(table) => table.range,
            Expr::String(lit) => lit.range,
        }
    }

    /// Dotted name of an access chain, `None` for anything that is not a
    /// statically nameable place.
    ///
    /// - `a` -> `a`
    /// - `a.b:c` -> `a.b.c`
    /// - `a["k"]` -> `a.k`
    /// - `a[3]` -> `a[3]`
    pub fn dotted_name(&self) -> Option<String> {
        match self {
            Expr::Identifier(ident) => Some(ident.name.clone()),
            Expr::Member { base, field, .. } => {
                let base = base.dotted_name()?;
                Some(format!("{base}.{}", field.name))
            }
            Expr::Index { base, index, .. } => {
                let base = base.dotted_name()?;
                match index.as_ref() {
                    Expr::String(lit) => Some(format!("{base}.{}", lit.value)),
                    Expr::Number(raw, _) => Some(format!("{base}[{raw}]")),
                    _ => None,
                }
            }
            Expr::Paren(inner, _) => inner.dotted_name(),
            _ => None,
        }
    }

    /// Leftmost identifier of an access chain.
    pub fn root_identifier(&self) -> Option<&Ident> {
        match self {
            Expr::Identifier(ident) => Some(ident),
            Expr::Member { base, .. } | Expr::Index { base, .. } => base.root_identifier(),
            Expr::Paren(inner, _) => inner.root_identifier(),
            _ => None,
        }
    }

    /// Range of the last segment of a name (the field of `a.b`, the key of
    /// `a["b"]`), which is where a cursor has to be to mean this name.
    pub fn name_range(&self) -> Range {
        match self {
            Expr::Member { field, .. } => field.range,
            Expr::Index { index, .. } => index.range(),
            other => other.range(),
        }
    }

    pub fn is_method_name(&self) -> bool {
        matches!(
            self,
            Expr::Member {
                indexer: Indexer::Colon,
                ..
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str, line: u32, col: u32) -> Ident {
        Ident {
            name: name.to_string(),
            range: Range::new(
                Position::new(line, col),
                Position::new(line, col + name.len() as u32),
            ),
        }
    }

    #[test]
    fn test_dotted_name_normalizes_method_indexer() {
        let expr = Expr::Member {
            base: Box::new(Expr::Member {
                base: Box::new(Expr::Identifier(ident("a", 0, 0))),
                indexer: Indexer::Dot,
                field: ident("b", 0, 2),
                range: Range::default(),
            }),
            indexer: Indexer::Colon,
            field: ident("c", 0, 4),
            range: Range::default(),
        };

        assert_eq!(expr.dotted_name().as_deref(), Some("a.b.c"));
        assert_eq!(expr.root_identifier().map(|i| i.name.as_str()), Some("a"));
        assert!(expr.is_method_name());
    }

    #[test]
    fn test_dotted_name_of_index_keys() {
        let base = Box::new(Expr::Identifier(ident("t", 0, 0)));
        let string_key = Expr::Index {
            base: base.clone(),
            index: Box::new(Expr::String(StringLit {
                value: "key".to_string(),
                range: Range::default(),
            })),
            range: Range::default(),
        };
        let number_key = Expr::Index {
            base: base.clone(),
            index: Box::new(Expr::Number("2".to_string(), Range::default())),
            range: Range::default(),
        };
        let dynamic_key = Expr::Index {
            base,
            index: Box::new(Expr::Identifier(ident("k", 0, 2))),
            range: Range::default(),
        };

        assert_eq!(string_key.dotted_name().as_deref(), Some("t.key"));
        assert_eq!(number_key.dotted_name().as_deref(), Some("t[2]"));
        assert_eq!(dynamic_key.dotted_name(), None);
    }

    #[test]
    fn test_range_contains_is_end_inclusive() {
        let range = Range::new(Position::new(1, 4), Position::new(1, 7));
        assert!(range.contains(Position::new(1, 4)));
        assert!(range.contains(Position::new(1, 7)));
        assert!(!range.contains(Position::new(1, 8)));
        assert!(!range.contains(Position::new(0, 5)));
    }
}
