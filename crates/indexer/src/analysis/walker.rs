//! Mode-parameterised descent over a document's syntax tree.
//!
//! One dispatch table over statement and expression kinds serves three jobs:
//!
//! - [`WalkMode::Build`] declares symbols, chunks, require edges and the
//!   pending tag / call-site records the builder's post-pass applies.
//! - [`WalkMode::GetDefine`] stops at the first name whose last segment
//!   contains the cursor and reports the dotted name accumulated so far.
//! - [`WalkMode::FindRefs`] collects every place whose accumulated dotted name
//!   equals a target search name.
//!
//! Names are computed by the same helpers in every mode, so a lookup walk
//! always sees exactly the names (and chunk stacks) the build walk declared.
//! All mutable state lives in [`WalkContext`]; the walker itself only holds
//! the immutable inputs.

use super::types::{
    CallSite, Chunk, ChunkRef, CommentTagRecord, DocumentUri, PositionHit, RequireEdge,
    SourceLocation, Symbol, SymbolKind, SymbolTag, TagReason, normalize_search_name,
};
use crate::parsing::ast::{
    Block, CallExpr, Comment, Expr, FunctionBody, FunctionDecl, Ident, Indexer, Position, Range,
    SourceFile, Stmt, TableConstructor, TableField,
};
use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashSet;
use smallvec::SmallVec;

/// `---@type Name` with any number of leading dashes.
static TYPE_ANNOTATION: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^-*\s*@type\s+([\p{Alphabetic}_][\w.:]*)(?:\s|$)").ok());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkMode<'q> {
    Build,
    GetDefine { position: Position },
    FindRefs { search_name: &'q str },
}

/// A symbol under construction; the owning chunk is linked by index because
/// its return name is only known once the function body has been walked.
#[derive(Debug, Clone)]
pub struct SymbolDraft {
    pub symbol: Symbol,
    pub owned_chunk: Option<usize>,
}

/// The name a value is being bound to.
#[derive(Debug, Clone)]
struct Binding {
    name: String,
    is_local: bool,
    line: u32,
}

/// Everything a walk accumulates.
#[derive(Debug, Default)]
pub struct WalkContext {
    chunk_stack: Vec<ChunkRef>,
    /// Indexes into `chunks`, parallel to `chunk_stack`.
    open_chunks: Vec<usize>,
    pub chunks: Vec<Chunk>,
    pub symbols: Vec<SymbolDraft>,
    declared: FxHashSet<String>,
    /// Local names visible at the current point, one set per open block.
    scopes: Vec<FxHashSet<String>>,
    pub requires: Vec<RequireEdge>,
    pub tag_records: Vec<CommentTagRecord>,
    pub call_sites: Vec<CallSite>,
    pub hit: Option<PositionHit>,
    pub references: Vec<Range>,
}

impl WalkContext {
    pub fn new() -> Self {
        Self::default()
    }

    fn is_done(&self) -> bool {
        self.hit.is_some()
    }

    fn open_chunk(&mut self, name: String, range: Range) -> usize {
        let chunk = Chunk {
            name,
            range,
            return_name: None,
        };
        self.chunk_stack.push(chunk.reference());
        self.chunks.push(chunk);
        let index = self.chunks.len() - 1;
        self.open_chunks.push(index);
        index
    }

    fn close_chunk(&mut self) {
        self.chunk_stack.pop();
        self.open_chunks.pop();
    }

    fn current_chunk_name(&self) -> String {
        self.chunk_stack
            .last()
            .map(|chunk| chunk.name.to_string())
            .unwrap_or_default()
    }

    fn set_return_name(&mut self, name: &str) {
        if let Some(index) = self.open_chunks.last() {
            self.chunks[*index].return_name = Some(name.to_string());
        }
    }

    fn is_declared(&self, search_name: &str) -> bool {
        self.declared.contains(search_name)
    }

    fn open_scope(&mut self) {
        self.scopes.push(FxHashSet::default());
    }

    fn close_scope(&mut self) {
        self.scopes.pop();
    }

    fn bring_into_scope(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string());
        }
    }

    /// Whether the first segment of `search_name` names a local visible here.
    fn root_is_local(&self, search_name: &str) -> bool {
        let root = search_name
            .split(['.', '['])
            .next()
            .unwrap_or(search_name);
        self.scopes.iter().rev().any(|scope| scope.contains(root))
    }
}

/// What to declare; turned into a [`Symbol`] in build mode.
struct Declaration<'d> {
    search_name: String,
    display_name: String,
    kind: SymbolKind,
    range: Range,
    is_local: bool,
    params: &'d [Ident],
    tag: Option<SymbolTag>,
}

pub struct SymbolWalker<'a, 'q> {
    uri: &'a DocumentUri,
    mode: WalkMode<'q>,
}

impl<'a, 'q> SymbolWalker<'a, 'q> {
    pub fn new(uri: &'a DocumentUri, mode: WalkMode<'q>) -> Self {
        Self { uri, mode }
    }

    pub fn walk(&self, file: &SourceFile) -> WalkContext {
        let mut ctx = WalkContext::new();
        ctx.open_chunk(self.uri.file_name().to_string(), file.range);
        if self.mode == WalkMode::Build {
            record_type_annotations(&file.comments, &mut ctx);
        }
        self.visit_block(&file.body, &mut ctx);
        ctx.close_chunk();
        ctx
    }

    fn is_build(&self) -> bool {
        self.mode == WalkMode::Build
    }

    fn visit_block(&self, block: &Block, ctx: &mut WalkContext) {
        ctx.open_scope();
        for stmt in &block.statements {
            if ctx.is_done() {
                break;
            }
            self.visit_stmt(stmt, ctx);
        }
        ctx.close_scope();
    }

    fn visit_stmt(&self, stmt: &Stmt, ctx: &mut WalkContext) {
        match stmt {
            Stmt::Local { names, values, .. } => self.visit_local(names, values, ctx),
            Stmt::Assign {
                targets, values, ..
            } => self.visit_assign(targets, values, ctx),
            Stmt::Function(decl) => self.visit_function_decl(decl, ctx),
            Stmt::Call(call) => self.visit_call(call, None, ctx),
            Stmt::Return { values, .. } => {
                if let [Expr::Identifier(ident)] = values.as_slice() {
                    ctx.set_return_name(&ident.name);
                }
                for value in values {
                    self.visit_expr(value, ctx);
                }
            }
            Stmt::If { clauses, .. } => {
                for clause in clauses {
                    if let Some(condition) = &clause.condition {
                        self.visit_expr(condition, ctx);
                    }
                    self.visit_block(&clause.body, ctx);
                }
            }
            Stmt::While {
                condition, body, ..
            } => {
                self.visit_expr(condition, ctx);
                self.visit_block(body, ctx);
            }
            Stmt::Repeat {
                body, condition, ..
            } => {
                self.visit_block(body, ctx);
                self.visit_expr(condition, ctx);
            }
            Stmt::Do { body, .. } => self.visit_block(body, ctx),
            Stmt::NumericFor {
                variable,
                start,
                limit,
                step,
                body,
                ..
            } => {
                self.visit_expr(start, ctx);
                self.visit_expr(limit, ctx);
                if let Some(step) = step {
                    self.visit_expr(step, ctx);
                }
                ctx.open_scope();
                self.declare_local_ident(variable, ctx);
                self.visit_block(body, ctx);
                ctx.close_scope();
            }
            Stmt::GenericFor {
                variables,
                iterators,
                body,
                ..
            } => {
                for iterator in iterators {
                    self.visit_expr(iterator, ctx);
                }
                ctx.open_scope();
                for variable in variables {
                    self.declare_local_ident(variable, ctx);
                }
                self.visit_block(body, ctx);
                ctx.close_scope();
            }
        }
    }

    fn visit_local(&self, names: &[Ident], values: &[Expr], ctx: &mut WalkContext) {
        let mut bound = Vec::with_capacity(names.len());
        for (index, name) in names.iter().enumerate() {
            let value = values.get(index);
            let (kind, params, display_name) = match value {
                Some(Expr::Function(function)) => (
                    SymbolKind::Function,
                    function.params.as_slice(),
                    function_display("local function ", &name.name, function),
                ),
                _ => (SymbolKind::Variable, &[][..], format!("local {}", name.name)),
            };
            let symbol_index = self.declare(
                Declaration {
                    search_name: name.name.clone(),
                    display_name,
                    kind,
                    range: name.range,
                    is_local: true,
                    params,
                    tag: None,
                },
                name.range,
                ctx,
            );
            bound.push((
                Binding {
                    name: name.name.clone(),
                    is_local: true,
                    line: name.range.start.line,
                },
                symbol_index,
            ));
        }

        for (index, value) in values.iter().enumerate() {
            if ctx.is_done() {
                return;
            }
            match bound.get(index) {
                Some((binding, symbol_index)) => {
                    let chunk = self.visit_value(value, binding, ctx);
                    link_owned_chunk(ctx, *symbol_index, chunk);
                }
                None => self.visit_expr(value, ctx),
            }
        }
        // `local x = x` reads the outer `x`; the new names start after the
        // whole statement.
        for name in names {
            ctx.bring_into_scope(&name.name);
        }
    }

    fn visit_assign(&self, targets: &[Expr], values: &[Expr], ctx: &mut WalkContext) {
        for (index, target) in targets.iter().enumerate() {
            if ctx.is_done() {
                return;
            }
            self.visit_expr(target, ctx);
            let value = values.get(index);
            let Some(search_name) = target.dotted_name() else {
                if let Some(value) = value {
                    self.visit_expr(value, ctx);
                }
                continue;
            };

            let is_local = ctx.root_is_local(&search_name);
            let mut symbol_index = None;
            if self.is_build() && !ctx.is_declared(&search_name) {
                let (kind, params, display_name) = match value {
                    Some(Expr::Function(function)) => (
                        SymbolKind::Function,
                        function.params.as_slice(),
                        function_display("function ", &search_name, function),
                    ),
                    _ => (SymbolKind::Variable, &[][..], search_name.clone()),
                };
                symbol_index = self.declare(
                    Declaration {
                        search_name: search_name.clone(),
                        display_name,
                        kind,
                        range: target.range(),
                        is_local,
                        params,
                        tag: None,
                    },
                    target.name_range(),
                    ctx,
                );
            }

            if let Some(value) = value {
                let binding = Binding {
                    name: search_name,
                    is_local,
                    line: target.range().start.line,
                };
                let chunk = self.visit_value(value, &binding, ctx);
                link_owned_chunk(ctx, symbol_index, chunk);
            }
        }
        for value in values.iter().skip(targets.len()) {
            self.visit_expr(value, ctx);
        }
    }

    fn visit_function_decl(&self, decl: &FunctionDecl, ctx: &mut WalkContext) {
        // `local function f` is visible inside its own body.
        if decl.is_local
            && let Expr::Identifier(ident) = &decl.name
        {
            ctx.bring_into_scope(&ident.name);
        }
        self.visit_expr(&decl.name, ctx);
        let Some(search_name) = decl.name.dotted_name() else {
            self.visit_function_body(&decl.function, None, None, ctx);
            return;
        };

        let prefix = if decl.is_local {
            "local function "
        } else {
            "function "
        };
        let is_local = decl.is_local
            || (matches!(decl.name, Expr::Member { .. } | Expr::Index { .. })
                && ctx.root_is_local(&search_name));
        let symbol_index = if self.is_build() {
            self.declare(
                Declaration {
                    search_name: search_name.clone(),
                    display_name: function_display(prefix, &source_name(&decl.name), &decl.function),
                    kind: SymbolKind::Function,
                    range: decl.name.range(),
                    is_local,
                    params: &decl.function.params,
                    tag: None,
                },
                decl.name.name_range(),
                ctx,
            )
        } else {
            None
        };

        // `function T:m()` receives an implicit `self` typed as `T`.
        let receiver = match &decl.name {
            Expr::Member {
                base,
                indexer: Indexer::Colon,
                field,
                ..
            } => base.dotted_name().map(|owner| (owner, field.range)),
            _ => None,
        };
        let chunk = self.visit_function_body(
            &decl.function,
            Some(search_name),
            receiver.as_ref(),
            ctx,
        );
        link_owned_chunk(ctx, symbol_index, Some(chunk));
    }

    /// Opens the function's chunk, declares `self` and the parameters inside
    /// it, and walks the body. Returns the chunk index.
    fn visit_function_body(
        &self,
        function: &FunctionBody,
        name: Option<String>,
        receiver: Option<&(String, Range)>,
        ctx: &mut WalkContext,
    ) -> usize {
        let chunk_name =
            name.unwrap_or_else(|| format!("function@{}", function.range.start.line + 1));
        let chunk = ctx.open_chunk(chunk_name, function.range);
        ctx.open_scope();

        if receiver.is_some() {
            ctx.bring_into_scope("self");
        }
        if let Some((owner, range)) = receiver
            && self.is_build()
        {
            self.declare(
                Declaration {
                    search_name: "self".to_string(),
                    display_name: "local self".to_string(),
                    kind: SymbolKind::Variable,
                    range: *range,
                    is_local: true,
                    params: &[],
                    tag: Some(SymbolTag {
                        reason: TagReason::Equal,
                        type_name: owner.clone(),
                    }),
                },
                *range,
                ctx,
            );
        }
        for param in &function.params {
            self.declare_local_ident(param, ctx);
        }
        self.visit_block(&function.body, ctx);
        ctx.close_scope();
        ctx.close_chunk();
        chunk
    }

    /// Walks a value bound to `binding`. Returns the chunk index when the
    /// value is a function.
    fn visit_value(&self, value: &Expr, binding: &Binding, ctx: &mut WalkContext) -> Option<usize> {
        match value {
            Expr::Function(function) => Some(self.visit_function_body(
                function,
                Some(binding.name.clone()),
                None,
                ctx,
            )),
            Expr::Table(table) => {
                self.visit_table(table, Some(binding), ctx);
                None
            }
            Expr::Call(call) => {
                self.visit_call(call, Some(binding), ctx);
                None
            }
            Expr::Paren(inner, _) => self.visit_value(inner, binding, ctx),
            Expr::Identifier(_) | Expr::Member { .. } | Expr::Index { .. } => {
                self.visit_expr(value, ctx);
                if self.is_build()
                    && let Some(source) = value.dotted_name()
                {
                    ctx.tag_records.push(CommentTagRecord {
                        reason: TagReason::Equal,
                        new_type: source,
                        old_type: None,
                        source_line: binding.line,
                        bound_name: Some(binding.name.clone()),
                    });
                }
                None
            }
            other => {
                self.visit_expr(other, ctx);
                None
            }
        }
    }

    fn visit_table(&self, table: &TableConstructor, base: Option<&Binding>, ctx: &mut WalkContext) {
        for field in &table.fields {
            if ctx.is_done() {
                return;
            }
            let (child_name, key_range, value) = match field {
                TableField::Named { key, value } => (
                    base.map(|base| format!("{}.{}", base.name, key.name)),
                    key.range,
                    value,
                ),
                TableField::Indexed { key, value } => {
                    let child_name = base.and_then(|base| match key {
                        Expr::String(lit) => Some(format!("{}.{}", base.name, lit.value)),
                        Expr::Number(raw, _) => Some(format!("{}[{raw}]", base.name)),
                        _ => None,
                    });
                    if child_name.is_none() {
                        self.visit_expr(key, ctx);
                    }
                    (child_name, key.range(), value)
                }
                TableField::Positional { value } => (None, value.range(), value),
            };

            let (Some(child_name), Some(base)) = (child_name, base) else {
                self.visit_expr(value, ctx);
                continue;
            };

            let (kind, params, display_name) = match value {
                Expr::Function(function) => (
                    SymbolKind::Function,
                    function.params.as_slice(),
                    function_display("function ", &child_name, function),
                ),
                _ => (SymbolKind::Variable, &[][..], child_name.clone()),
            };
            let symbol_index = self.declare(
                Declaration {
                    search_name: child_name.clone(),
                    display_name,
                    kind,
                    range: key_range,
                    is_local: base.is_local,
                    params,
                    tag: None,
                },
                key_range,
                ctx,
            );
            let binding = Binding {
                name: child_name,
                is_local: base.is_local,
                line: key_range.start.line,
            };
            let chunk = self.visit_value(value, &binding, ctx);
            link_owned_chunk(ctx, symbol_index, chunk);
        }
    }

    fn visit_call(&self, call: &CallExpr, binding: Option<&Binding>, ctx: &mut WalkContext) {
        self.visit_expr(&call.callee, ctx);
        let required_module = call.required_module();

        if let WalkMode::GetDefine { position } = self.mode
            && let (Some(module), Some(arg)) = (required_module, call.args.first())
            && arg.range().contains(position)
            && ctx.hit.is_none()
        {
            ctx.hit = Some(PositionHit::Require {
                module: module.to_string(),
                range: arg.range(),
            });
            return;
        }

        if self.is_build() {
            self.record_call(call, binding, ctx);
        }

        for arg in &call.args {
            if ctx.is_done() {
                return;
            }
            self.visit_expr(arg, ctx);
        }
    }

    fn record_call(&self, call: &CallExpr, binding: Option<&Binding>, ctx: &mut WalkContext) {
        let required_module = call.required_module();
        if let Some(module) = required_module {
            ctx.requires.push(RequireEdge {
                target_module: module.to_string(),
                location: call.range,
            });
        }

        if call.is_named("setmetatable")
            && let [object, metatable, ..] = call.args.as_slice()
        {
            let old_type = object
                .dotted_name()
                .or_else(|| binding.map(|binding| binding.name.clone()));
            if let (Some(old_type), Some(new_type)) = (old_type, metatable.dotted_name()) {
                ctx.tag_records.push(CommentTagRecord {
                    reason: TagReason::MetaTable,
                    new_type,
                    old_type: Some(old_type),
                    source_line: call.range.start.line,
                    bound_name: None,
                });
                return;
            }
        }

        if let Some(callee) = call.callee.dotted_name() {
            ctx.call_sites.push(CallSite {
                callee,
                line: binding.map_or(call.range.start.line, |binding| binding.line),
                bound_name: binding.map(|binding| binding.name.clone()),
                required_module: required_module.map(str::to_string),
            });
        }
    }

    fn visit_expr(&self, expr: &Expr, ctx: &mut WalkContext) {
        if ctx.is_done() {
            return;
        }
        match expr {
            Expr::Identifier(ident) => {
                let is_local = ctx.root_is_local(&ident.name);
                self.name_site(&ident.name, ident.range, ident.range, is_local, ctx)
            }
            Expr::Member { base, field, range, .. } => {
                self.visit_expr(base, ctx);
                if let Some(name) = expr.dotted_name() {
                    let is_local = ctx.root_is_local(&name);
                    self.name_site(&name, field.range, *range, is_local, ctx);
                }
            }
            Expr::Index { base, index, range } => {
                self.visit_expr(base, ctx);
                match expr.dotted_name() {
                    Some(name) => {
                        let is_local = ctx.root_is_local(&name);
                        self.name_site(&name, index.range(), *range, is_local, ctx)
                    }
                    None => self.visit_expr(index, ctx),
                }
            }
            Expr::Call(call) => self.visit_call(call, None, ctx),
            Expr::Function(function) => {
                self.visit_function_body(function, None, None, ctx);
            }
            Expr::Table(table) => self.visit_table(table, None, ctx),
            Expr::Binary { left, right, .. } => {
                self.visit_expr(left, ctx);
                self.visit_expr(right, ctx);
            }
            Expr::Unary { operand, .. } => self.visit_expr(operand, ctx),
            Expr::Paren(inner, _) => self.visit_expr(inner, ctx),
            Expr::String(_) | Expr::Number(..) | Expr::Literal(_) | Expr::Vararg(_) => {}
        }
    }

    /// A place where `search_name` is written in the source. `hit_range`
    /// is where the cursor must be for definition lookup, `full_range` is
    /// what gets reported.
    fn name_site(
        &self,
        search_name: &str,
        hit_range: Range,
        full_range: Range,
        is_local: bool,
        ctx: &mut WalkContext,
    ) {
        match self.mode {
            WalkMode::Build => {}
            WalkMode::GetDefine { position } => {
                if ctx.hit.is_none() && hit_range.contains(position) {
                    ctx.hit = Some(PositionHit::Symbol {
                        search_name: normalize_search_name(search_name),
                        range: full_range,
                        chunk_stack: ctx.chunk_stack.clone(),
                        is_local,
                    });
                }
            }
            WalkMode::FindRefs { search_name: target } => {
                if search_name == target {
                    ctx.references.push(full_range);
                }
            }
        }
    }

    fn declare_local_ident(&self, ident: &Ident, ctx: &mut WalkContext) {
        ctx.bring_into_scope(&ident.name);
        self.declare(
            Declaration {
                search_name: ident.name.clone(),
                display_name: format!("local {}", ident.name),
                kind: SymbolKind::Variable,
                range: ident.range,
                is_local: true,
                params: &[],
                tag: None,
            },
            ident.range,
            ctx,
        );
    }

    /// Declares a symbol in build mode; in lookup modes the declaration is
    /// just another name site. Returns the draft index when one was created.
    fn declare(&self, declaration: Declaration, site: Range, ctx: &mut WalkContext) -> Option<usize> {
        if !self.is_build() {
            self.name_site(
                &declaration.search_name,
                site,
                declaration.range,
                declaration.is_local,
                ctx,
            );
            return None;
        }

        let search_name = normalize_search_name(&declaration.search_name);
        let original_name = search_name
            .rsplit('.')
            .next()
            .unwrap_or(&search_name)
            .to_string();
        let symbol = Symbol {
            display_name: declaration.display_name,
            search_name: search_name.clone(),
            original_name,
            kind: declaration.kind,
            location: SourceLocation {
                uri: self.uri.clone(),
                range: declaration.range,
            },
            is_local: declaration.is_local,
            container_name: ctx.current_chunk_name(),
            container_chunks: SmallVec::from_vec(ctx.chunk_stack.clone()),
            function_params: declaration
                .params
                .iter()
                .map(|param| param.name.clone())
                .collect(),
            tag: declaration.tag,
            require_module: None,
            call_return_of: None,
            owned_chunk: None,
        };
        ctx.declared.insert(search_name);
        ctx.symbols.push(SymbolDraft {
            symbol,
            owned_chunk: None,
        });
        Some(ctx.symbols.len() - 1)
    }
}

fn link_owned_chunk(ctx: &mut WalkContext, symbol_index: Option<usize>, chunk: Option<usize>) {
    if let (Some(symbol_index), Some(chunk)) = (symbol_index, chunk) {
        ctx.symbols[symbol_index].owned_chunk = Some(chunk);
    }
}

fn parse_type_annotation(comment: &str) -> Option<String> {
    let captures = (*TYPE_ANNOTATION).as_ref()?.captures(comment)?;
    captures.get(1).map(|name| normalize_search_name(name.as_str()))
}

fn record_type_annotations(comments: &[Comment], ctx: &mut WalkContext) {
    for comment in comments {
        if let Some(type_name) = parse_type_annotation(&comment.text) {
            ctx.tag_records.push(CommentTagRecord {
                reason: TagReason::UserTag,
                new_type: type_name,
                old_type: None,
                source_line: comment.range.end.line,
                bound_name: None,
            });
        }
    }
}

/// Source spelling of a declared name, keeping `:` for methods.
fn source_name(expr: &Expr) -> String {
    match expr {
        Expr::Member {
            base,
            indexer,
            field,
            ..
        } => {
            let separator = match indexer {
                Indexer::Dot => '.',
                Indexer::Colon => ':',
            };
            format!("{}{separator}{}", source_name(base), field.name)
        }
        other => other.dotted_name().unwrap_or_default(),
    }
}

fn function_display(prefix: &str, name: &str, function: &FunctionBody) -> String {
    let mut params: Vec<&str> = function.params.iter().map(|p| p.name.as_str()).collect();
    if function.is_vararg {
        params.push("...");
    }
    format!("{prefix}{name}({})", params.join(", "))
}
