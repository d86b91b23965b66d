//! Lowering of the tree-sitter Lua syntax tree into the owned [`ast`](super::ast).
//!
//! Node shapes that are not understood are skipped as a whole: a statement
//! or expression either lowers completely or not at all, so the walker never
//! sees half-built constructs. Field lookups fall back to named-child order
//! because some grammar releases leave fields unnamed.

use super::ast::{
    Block, CallExpr, Comment, Expr, FunctionBody, FunctionDecl, Ident, IfClause, Indexer,
    Position, Range, SourceFile, Stmt, StringLit, TableConstructor, TableField,
};
use tree_sitter::Node;

/// Node kinds accepted at the top level when the tree contains errors.
const DEGRADED_STATEMENT_KINDS: &[&str] = &[
    "variable_declaration",
    "local_variable_declaration",
    "function_declaration",
    "local_function_declaration",
    "function_call",
    "assignment_statement",
];

pub struct Lowering<'a> {
    source: &'a str,
}

impl<'a> Lowering<'a> {
    pub fn new(source: &'a str) -> Self {
        Self { source }
    }

    /// Lowers a whole, error-free chunk.
    pub fn lower_chunk(&self, root: Node) -> SourceFile {
        SourceFile {
            body: self.lower_block(root),
            comments: self.collect_comments(root),
            range: node_range(root),
        }
    }

    /// Lowers the recoverable parts of a chunk containing syntax errors.
    ///
    /// Only error-free local declarations, function declarations and
    /// `require` statements are kept. They are collected from the root and
    /// from inside ERROR recovery nodes, never from inside other statements.
    pub fn lower_degraded(&self, root: Node) -> SourceFile {
        let mut statements = Vec::new();
        self.collect_degraded(root, &mut statements);
        SourceFile {
            body: Block {
                statements,
                range: node_range(root),
            },
            comments: self.collect_comments(root),
            range: node_range(root),
        }
    }

    fn collect_degraded(&self, node: Node, out: &mut Vec<Stmt>) {
        for child in named_children(node) {
            if child.is_error() {
                self.collect_degraded(child, out);
                continue;
            }
            if child.has_error() || child.is_missing() {
                continue;
            }
            if !DEGRADED_STATEMENT_KINDS.contains(&child.kind()) {
                continue;
            }
            let Some(stmt) = self.lower_statement(child) else {
                continue;
            };
            let keep = match &stmt {
                Stmt::Local { .. } | Stmt::Function(_) => true,
                Stmt::Call(call) => call.required_module().is_some(),
                Stmt::Assign { values, .. } => values
                    .iter()
                    .any(|value| matches!(value, Expr::Call(call) if call.required_module().is_some())),
                _ => false,
            };
            if keep {
                out.push(stmt);
            }
        }
    }

    fn collect_comments(&self, root: Node) -> Vec<Comment> {
        let mut comments = Vec::new();
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if node.kind() == "comment" {
                comments.push(Comment {
                    text: self.text(node).to_string(),
                    range: node_range(node),
                });
                continue;
            }
            stack.extend(all_children(node).into_iter().rev());
        }
        comments.sort_by_key(|comment| comment.range.start);
        comments
    }

    fn lower_block(&self, node: Node) -> Block {
        let statements = named_children(node)
            .into_iter()
            .filter_map(|child| self.lower_statement(child))
            .collect();
        Block {
            statements,
            range: node_range(node),
        }
    }

    fn lower_optional_block(&self, node: Option<Node>, fallback: Range) -> Block {
        match node {
            Some(node) => self.lower_block(node),
            None => Block {
                statements: Vec::new(),
                range: fallback,
            },
        }
    }

    fn lower_statement(&self, node: Node) -> Option<Stmt> {
        if node.is_error() || node.is_missing() {
            return None;
        }
        let range = node_range(node);
        match node.kind() {
            "variable_declaration" | "local_variable_declaration" => self.lower_local(node),
            "assignment_statement" => {
                let (targets, values) = self.lower_assignment_parts(node)?;
                Some(Stmt::Assign {
                    targets,
                    values,
                    range,
                })
            }
            "function_declaration" | "local_function_declaration" | "local_function" => {
                self.lower_function_declaration(node).map(Stmt::Function)
            }
            "function_call" => self.lower_call(node).map(Stmt::Call),
            "return_statement" => {
                let values = match find_child(node, "expression_list") {
                    Some(list) => self.lower_expressions(list),
                    None => self.lower_expressions(node),
                };
                Some(Stmt::Return { values, range })
            }
            "if_statement" => Some(Stmt::If {
                clauses: self.lower_if_clauses(node),
                range,
            }),
            "while_statement" => Some(Stmt::While {
                condition: self.lower_expr(node.child_by_field_name("condition")?)?,
                body: self.lower_optional_block(body_of(node), range),
                range,
            }),
            "repeat_statement" => Some(Stmt::Repeat {
                body: self.lower_optional_block(body_of(node), range),
                condition: self.lower_expr(node.child_by_field_name("condition")?)?,
                range,
            }),
            "do_statement" => Some(Stmt::Do {
                body: self.lower_optional_block(body_of(node), range),
                range,
            }),
            "for_statement" => self.lower_for(node),
            _ => None,
        }
    }

    fn lower_local(&self, node: Node) -> Option<Stmt> {
        let range = node_range(node);
        if let Some(assignment) = find_child(node, "assignment_statement") {
            let list = find_child(assignment, "variable_list")
                .or_else(|| find_child(assignment, "attribute_name_list"))?;
            let names = self.lower_names(list);
            let values = find_child(assignment, "expression_list")
                .map(|values| self.lower_expressions(values))
                .unwrap_or_default();
            return (!names.is_empty()).then_some(Stmt::Local {
                names,
                values,
                range,
            });
        }

        // `local a, b` without values, or grammars that inline the lists.
        let names = match find_child(node, "attribute_name_list")
            .or_else(|| find_child(node, "variable_list"))
        {
            Some(list) => self.lower_names(list),
            None => self.lower_names(node),
        };
        let values = find_child(node, "expression_list")
            .map(|values| self.lower_expressions(values))
            .unwrap_or_default();
        (!names.is_empty()).then_some(Stmt::Local {
            names,
            values,
            range,
        })
    }

    fn lower_assignment_parts(&self, node: Node) -> Option<(Vec<Expr>, Vec<Expr>)> {
        let targets = find_child(node, "variable_list")
            .map(|list| self.lower_expressions(list))
            .unwrap_or_default();
        if targets.is_empty() {
            return None;
        }
        let values = find_child(node, "expression_list")
            .map(|list| self.lower_expressions(list))
            .unwrap_or_default();
        Some((targets, values))
    }

    fn lower_function_declaration(&self, node: Node) -> Option<FunctionDecl> {
        let is_local = node.kind() != "function_declaration"
            || all_children(node)
                .first()
                .is_some_and(|first| first.kind() == "local");
        let name_node = node
            .child_by_field_name("name")
            .or_else(|| named_children(node).into_iter().find(|n| is_name_kind(n.kind())))?;
        let name = self.lower_expr(name_node)?;
        let function = self.lower_function_body(node)?;
        Some(FunctionDecl {
            is_local,
            name,
            function,
            range: node_range(node),
        })
    }

    fn lower_function_body(&self, node: Node) -> Option<FunctionBody> {
        let range = node_range(node);
        let mut params = Vec::new();
        let mut is_vararg = false;
        if let Some(parameters) = node
            .child_by_field_name("parameters")
            .or_else(|| find_child(node, "parameters"))
        {
            for param in named_children(parameters) {
                match param.kind() {
                    "identifier" => params.push(self.ident(param)),
                    "vararg_expression" | "spread" => is_vararg = true,
                    _ => {}
                }
            }
        }
        let body = node
            .child_by_field_name("body")
            .or_else(|| find_child(node, "block"));
        Some(FunctionBody {
            params,
            is_vararg,
            body: self.lower_optional_block(body, range),
            range,
        })
    }

    fn lower_if_clauses(&self, node: Node) -> Vec<IfClause> {
        let range = node_range(node);
        let mut clauses = Vec::new();
        let condition = node
            .child_by_field_name("condition")
            .and_then(|condition| self.lower_expr(condition));
        let consequence = node
            .child_by_field_name("consequence")
            .or_else(|| find_child(node, "block"));
        clauses.push(IfClause {
            condition,
            body: self.lower_optional_block(consequence, range),
        });
        for alternative in named_children(node) {
            match alternative.kind() {
                "elseif_statement" => {
                    let condition = alternative
                        .child_by_field_name("condition")
                        .and_then(|condition| self.lower_expr(condition));
                    let consequence = alternative
                        .child_by_field_name("consequence")
                        .or_else(|| find_child(alternative, "block"));
                    clauses.push(IfClause {
                        condition,
                        body: self.lower_optional_block(consequence, node_range(alternative)),
                    });
                }
                "else_statement" => {
                    clauses.push(IfClause {
                        condition: None,
                        body: self.lower_optional_block(body_of(alternative), node_range(alternative)),
                    });
                }
                _ => {}
            }
        }
        clauses
    }

    fn lower_for(&self, node: Node) -> Option<Stmt> {
        let range = node_range(node);
        let body = self.lower_optional_block(body_of(node), range);
        let clause = node.child_by_field_name("clause").or_else(|| {
            named_children(node).into_iter().find(|child| {
                matches!(child.kind(), "for_generic_clause" | "for_numeric_clause")
            })
        })?;
        match clause.kind() {
            "for_numeric_clause" => {
                let variable = clause
                    .child_by_field_name("name")
                    .or_else(|| find_child(clause, "identifier"))?;
                Some(Stmt::NumericFor {
                    variable: self.ident(variable),
                    start: self.lower_expr(clause.child_by_field_name("start")?)?,
                    limit: self.lower_expr(clause.child_by_field_name("end")?)?,
                    step: clause
                        .child_by_field_name("step")
                        .and_then(|step| self.lower_expr(step)),
                    body,
                    range,
                })
            }
            "for_generic_clause" => {
                let variables = find_child(clause, "variable_list")
                    .map(|list| self.lower_names(list))
                    .unwrap_or_default();
                let iterators = find_child(clause, "expression_list")
                    .map(|list| self.lower_expressions(list))
                    .unwrap_or_default();
                Some(Stmt::GenericFor {
                    variables,
                    iterators,
                    body,
                    range,
                })
            }
            _ => None,
        }
    }

    fn lower_call(&self, node: Node) -> Option<CallExpr> {
        let callee_node = node
            .child_by_field_name("name")
            .or_else(|| named_children(node).into_iter().next())?;
        let callee = self.lower_expr(callee_node)?;
        let args = match node
            .child_by_field_name("arguments")
            .or_else(|| find_child(node, "arguments"))
        {
            Some(arguments) => self.lower_expressions(arguments),
            None => Vec::new(),
        };
        Some(CallExpr {
            callee,
            args,
            range: node_range(node),
        })
    }

    fn lower_table(&self, node: Node) -> TableConstructor {
        let mut fields = Vec::new();
        for field in named_children(node) {
            if field.kind() != "field" {
                continue;
            }
            let value = field
                .child_by_field_name("value")
                .or_else(|| named_children(field).into_iter().last());
            let Some(value) = value.and_then(|value| self.lower_expr(value)) else {
                continue;
            };
            let bracketed = all_children(field)
                .first()
                .is_some_and(|first| first.kind() == "[");
            match field.child_by_field_name("name") {
                Some(key) if bracketed => {
                    if let Some(key) = self.lower_expr(key) {
                        fields.push(TableField::Indexed { key, value });
                    }
                }
                Some(key) if key.kind() == "identifier" => {
                    fields.push(TableField::Named {
                        key: self.ident(key),
                        value,
                    });
                }
                Some(_) => {}
                None => fields.push(TableField::Positional { value }),
            }
        }
        TableConstructor {
            fields,
            range: node_range(node),
        }
    }

    fn lower_names(&self, list: Node) -> Vec<Ident> {
        named_children(list)
            .into_iter()
            .filter(|child| child.kind() == "identifier")
            .map(|child| self.ident(child))
            .collect()
    }

    fn lower_expressions(&self, list: Node) -> Vec<Expr> {
        named_children(list)
            .into_iter()
            .filter(|child| child.kind() != "comment")
            .filter_map(|child| self.lower_expr(child))
            .collect()
    }

    fn lower_expr(&self, node: Node) -> Option<Expr> {
        if node.is_error() || node.is_missing() {
            return None;
        }
        let range = node_range(node);
        let expr = match node.kind() {
            "identifier" => Expr::Identifier(self.ident(node)),
            "dot_index_expression" | "method_index_expression" => {
                let (indexer, field_name) = if node.kind() == "dot_index_expression" {
                    (Indexer::Dot, "field")
                } else {
                    (Indexer::Colon, "method")
                };
                let children = named_children(node);
                let table = node
                    .child_by_field_name("table")
                    .or_else(|| children.first().copied())?;
                let field = node
                    .child_by_field_name(field_name)
                    .or_else(|| children.last().copied())?;
                if field.kind() != "identifier" {
                    return None;
                }
                Expr::Member {
                    base: Box::new(self.lower_expr(table)?),
                    indexer,
                    field: self.ident(field),
                    range,
                }
            }
            "bracket_index_expression" => {
                let children = named_children(node);
                let table = node
                    .child_by_field_name("table")
                    .or_else(|| children.first().copied())?;
                let index = node
                    .child_by_field_name("field")
                    .or_else(|| children.last().copied())?;
                Expr::Index {
                    base: Box::new(self.lower_expr(table)?),
                    index: Box::new(self.lower_expr(index)?),
                    range,
                }
            }
            "function_call" => Expr::Call(Box::new(self.lower_call(node)?)),
            "function_definition" => Expr::Function(Box::new(self.lower_function_body(node)?)),
            "table_constructor" => Expr::Table(self.lower_table(node)),
            "binary_expression" => {
                let children = named_children(node);
                let left = node
                    .child_by_field_name("left")
                    .or_else(|| children.first().copied())?;
                let right = node
                    .child_by_field_name("right")
                    .or_else(|| children.last().copied())?;
                Expr::Binary {
                    left: Box::new(self.lower_expr(left)?),
                    right: Box::new(self.lower_expr(right)?),
                    range,
                }
            }
            "unary_expression" => {
                let operand = node
                    .child_by_field_name("operand")
                    .or_else(|| named_children(node).into_iter().last())?;
                Expr::Unary {
                    operand: Box::new(self.lower_expr(operand)?),
                    range,
                }
            }
            "parenthesized_expression" => {
                let inner = named_children(node).into_iter().next()?;
                Expr::Paren(Box::new(self.lower_expr(inner)?), range)
            }
            "string" => Expr::String(StringLit {
                value: unquote(self.text(node)),
                range,
            }),
            "number" => Expr::Number(self.text(node).to_string(), range),
            "nil" | "true" | "false" => Expr::Literal(range),
            "vararg_expression" => Expr::Vararg(range),
            _ => return None,
        };
        Some(expr)
    }

    fn ident(&self, node: Node) -> Ident {
        Ident {
            name: self.text(node).to_string(),
            range: node_range(node),
        }
    }

    fn text(&self, node: Node) -> &'a str {
        node.utf8_text(self.source.as_bytes()).unwrap_or("")
    }
}

fn is_name_kind(kind: &str) -> bool {
    matches!(
        kind,
        "identifier" | "dot_index_expression" | "method_index_expression"
    )
}

fn body_of(node: Node) -> Option<Node> {
    node.child_by_field_name("body")
        .or_else(|| find_child(node, "block"))
}

fn find_child<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    named_children(node)
        .into_iter()
        .find(|child| child.kind() == kind)
}

fn named_children(node: Node) -> Vec<Node> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

fn all_children(node: Node) -> Vec<Node> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}

fn node_range(node: Node) -> Range {
    let start = node.start_position();
    let end = node.end_position();
    Range::new(
        Position::new(start.row as u32, start.column as u32),
        Position::new(end.row as u32, end.column as u32),
    )
}

/// Strips `"…"`, `'…'` and `[[…]]` / `[==[…]==]` delimiters.
fn unquote(raw: &str) -> String {
    if raw.starts_with('[') {
        let level = raw[1..].chars().take_while(|c| *c == '=').count();
        let open = level + 2;
        let close = level + 2;
        if raw.len() >= open + close {
            return raw[open..raw.len() - close].to_string();
        }
        return String::new();
    }
    let mut chars = raw.chars();
    match (chars.next(), raw.chars().last()) {
        (Some(first), Some(last)) if raw.len() >= 2 && first == last && (first == '"' || first == '\'') => {
            raw[1..raw.len() - 1].to_string()
        }
        _ => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unquote_variants() {
        assert_eq!(unquote("\"mod\""), "mod");
        assert_eq!(unquote("'a.b'"), "a.b");
        assert_eq!(unquote("[[long]]"), "long");
        assert_eq!(unquote("[==[x]]y]==]"), "x]]y");
        assert_eq!(unquote("bare"), "bare");
    }
}
