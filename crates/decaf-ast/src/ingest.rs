//! JSON ingestion boundary.
//!
//! The external parser hands over a loosely typed JSON tree. Each node is
//! taken apart in turn: the members holding child nodes are removed, and the
//! rest is deserialized into a private `Raw*` mirror (serde does the shape
//! checks: unknown `kind` tags, missing members, wrong member types). The
//! lowering then adds the checks serde cannot express: operator spellings,
//! literal payloads, `void` in value positions and method bodies that are
//! not blocks.
//!
//! Nothing here recurses on the depth of the input. The text is read into a
//! `Value` with serde_json's recursion limit disabled, on a stack grown by
//! `serde_stacker`. That value is then lowered with an explicit work stack
//! and released node by node, never as one deep drop.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

use decaf_core::{Span, Visibility};

use crate::ast::*;

// ============================================================================
// Errors
// ============================================================================

/// A tree rejected at the ingestion boundary.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Not JSON, or JSON whose shape does not match the node schema.
    #[error("malformed syntax tree: {0}")]
    Json(#[from] serde_json::Error),

    /// A member whose value is not acceptable for its node kind.
    #[error("at {span}: {kind}.{member}: {message}")]
    InvalidMember {
        kind: &'static str,
        member: &'static str,
        message: String,
        span: Span,
    },
}

impl IngestError {
    fn invalid(kind: &'static str, member: &'static str, message: impl Into<String>, span: Span) -> Self {
        IngestError::InvalidMember {
            kind,
            member,
            message: message.into(),
            span,
        }
    }

    /// Location of the offending node, when one is known.
    pub fn span(&self) -> Option<Span> {
        match self {
            IngestError::Json(_) => None,
            IngestError::InvalidMember { span, .. } => Some(*span),
        }
    }
}

// ============================================================================
// Entry points
// ============================================================================

/// Parse and validate a JSON syntax tree.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn from_json(text: &str) -> Result<Program, IngestError> {
    let mut json = serde_json::Deserializer::from_str(text);
    json.disable_recursion_limit();
    let value = Value::deserialize(serde_stacker::Deserializer::new(&mut json))?;
    if let Err(err) = json.end() {
        discard(value);
        return Err(err.into());
    }
    from_value(value)
}

/// Validate an already-parsed JSON value.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn from_value(value: Value) -> Result<Program, IngestError> {
    let mut lowering = Lowering::new();
    lowering.program_node(value);
    if let Some(err) = lowering.error {
        return Err(err);
    }
    log::debug!(
        "ingested {} classes ({} statements, {} expressions)",
        lowering.program.classes.len(),
        lowering.program.stmt_count(),
        lowering.program.expr_count()
    );
    Ok(lowering.program)
}

/// Release a value without recursing on its depth.
fn discard(value: Value) {
    let mut stack = vec![value];
    while let Some(value) = stack.pop() {
        match value {
            Value::Array(items) => stack.extend(items),
            Value::Object(members) => stack.extend(members.into_iter().map(|(_, v)| v)),
            _ => {}
        }
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ============================================================================
// Raw schema
// ============================================================================

/// Members holding child nodes; they are taken off a node before the rest
/// is deserialized.
const STMT_CHILDREN: &[&str] = &[
    "stmts", "cond", "then", "else", "init", "update", "body", "value", "expr", "target",
];
const EXPR_CHILDREN: &[&str] = &["lhs", "rhs", "operand", "receiver", "args", "target"];

#[derive(Deserialize)]
struct RawClass {
    name: String,
    #[serde(default)]
    parent: Option<String>,
    #[serde(default)]
    fields: Vec<RawField>,
    #[serde(default)]
    line: u32,
    #[serde(default)]
    col: u32,
}

#[derive(Deserialize)]
struct RawField {
    name: String,
    #[serde(rename = "type")]
    ty: String,
    #[serde(default)]
    visibility: Option<String>,
    #[serde(default, rename = "static")]
    is_static: bool,
    #[serde(default)]
    line: u32,
    #[serde(default)]
    col: u32,
}

#[derive(Deserialize)]
struct RawMethod {
    name: String,
    #[serde(rename = "returnType")]
    return_type: String,
    #[serde(default)]
    params: Vec<RawVar>,
    #[serde(default)]
    visibility: Option<String>,
    #[serde(default, rename = "static")]
    is_static: bool,
    #[serde(default)]
    line: u32,
    #[serde(default)]
    col: u32,
}

/// Shared shape of `Formal` and `VarDecl`.
#[derive(Deserialize)]
struct RawVar {
    name: String,
    #[serde(rename = "type")]
    ty: String,
    #[serde(default)]
    line: u32,
    #[serde(default)]
    col: u32,
}

/// A statement or expression node with its children taken off.
#[derive(Deserialize)]
struct RawNode<K> {
    #[serde(flatten)]
    kind: K,
    #[serde(default)]
    line: u32,
    #[serde(default)]
    col: u32,
}

#[derive(Deserialize)]
#[serde(tag = "kind")]
enum RawStmt {
    Block,
    If,
    While,
    For,
    Return,
    ExprStmt,
    Assign,
    VarDeclStmt { vars: Vec<RawVar> },
    Print,
    Break,
    Continue,
    Skip,
}

#[derive(Deserialize)]
#[serde(tag = "kind")]
enum RawExpr {
    BinaryOp {
        op: String,
    },
    UnaryOp {
        op: String,
    },
    Literal {
        #[serde(rename = "type")]
        ty: String,
        #[serde(default)]
        value: Value,
    },
    Identifier {
        name: String,
    },
    This,
    Super,
    New {
        class: String,
    },
    Call {
        method: String,
    },
    FieldAccess {
        field: String,
    },
    IncDec {
        op: String,
        #[serde(default)]
        prefix: bool,
    },
}

/// Child members taken off one node. A `null` member counts as absent.
struct Children(Vec<(&'static str, Value)>);

impl Children {
    fn take(node: &mut Map<String, Value>, names: &[&'static str]) -> Self {
        Self(
            names
                .iter()
                .filter_map(|&name| node.remove(name).map(|value| (name, value)))
                .collect(),
        )
    }

    fn remove(&mut self, name: &str) -> Option<Value> {
        let at = self.0.iter().position(|(n, _)| *n == name)?;
        let (_, value) = self.0.swap_remove(at);
        if value.is_null() { None } else { Some(value) }
    }

    /// Release members the node's kind has no use for.
    fn discard(self) {
        for (_, value) in self.0 {
            discard(value);
        }
    }
}

// ============================================================================
// Conversion
// ============================================================================

/// One step of lowering a method body. Each node carries the span of its
/// parent, for reporting a node position that holds no node.
enum Task {
    Stmt(Value, Span),
    Expr(Value, Span),
    Finish(Pending),
}

/// A node waiting for its children. Their arena ids are collected on
/// `Lowering::stmts` and `Lowering::exprs` in source order.
enum Pending {
    Block {
        len: usize,
        span: Span,
    },
    If {
        has_else: bool,
        span: Span,
    },
    While(Span),
    For {
        has_init: bool,
        has_cond: bool,
        has_update: bool,
        span: Span,
    },
    Return {
        has_value: bool,
        span: Span,
    },
    ExprStmt(Span),
    Assign(Span),
    Print(Span),
    Binary {
        op: BinaryOp,
        span: Span,
    },
    Unary {
        op: UnaryOp,
        span: Span,
    },
    Call {
        method: String,
        argc: usize,
        has_receiver: bool,
        span: Span,
    },
    FieldAccess {
        field: String,
        span: Span,
    },
    IncDec {
        op: IncDecOp,
        prefix: bool,
        span: Span,
    },
}

struct Lowering {
    program: Program,
    stmts: Vec<StmtId>,
    exprs: Vec<ExprId>,
    /// First rejection. Once set, the rest of the tree is only taken apart.
    error: Option<IngestError>,
}

impl Lowering {
    fn new() -> Self {
        Self {
            program: Program::new(),
            stmts: Vec::new(),
            exprs: Vec::new(),
            error: None,
        }
    }

    fn fail(&mut self, err: IngestError) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }

    fn check<T>(&mut self, result: Result<T, IngestError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.fail(err);
                None
            }
        }
    }

    /// The members of a node, or `None` once lowering has failed.
    fn node(
        &mut self,
        value: Value,
        kind: &'static str,
        parent: Span,
    ) -> Option<Map<String, Value>> {
        if self.error.is_some() {
            discard(value);
            return None;
        }
        match value {
            Value::Object(members) => Some(members),
            other => {
                self.fail(IngestError::invalid(
                    kind,
                    "kind",
                    format!("expected a node object, found {}", describe(&other)),
                    parent,
                ));
                discard(other);
                None
            }
        }
    }

    fn members<T: DeserializeOwned>(&mut self, members: Map<String, Value>) -> Option<T> {
        let result = serde_json::from_value(Value::Object(members)).map_err(IngestError::from);
        self.check(result)
    }

    fn array(
        &mut self,
        value: Option<Value>,
        kind: &'static str,
        member: &'static str,
        span: Span,
    ) -> Vec<Value> {
        match value {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items,
            Some(other) => {
                self.fail(IngestError::invalid(
                    kind,
                    member,
                    format!("expected an array, found {}", describe(&other)),
                    span,
                ));
                discard(other);
                Vec::new()
            }
        }
    }

    fn required(
        &mut self,
        children: &mut Children,
        kind: &'static str,
        member: &'static str,
        span: Span,
    ) -> Option<Value> {
        let value = children.remove(member);
        if value.is_none() {
            self.fail(IngestError::invalid(kind, member, "missing member", span));
        }
        value
    }

    fn program_node(&mut self, value: Value) {
        let Some(mut node) = self.node(value, "Program", Span::default()) else {
            return;
        };
        let classes = node.remove("classes");
        discard(Value::Object(node));
        if classes.is_none() {
            self.fail(IngestError::invalid(
                "Program",
                "classes",
                "missing member",
                Span::default(),
            ));
        }
        for class in self.array(classes, "Program", "classes", Span::default()) {
            if let Some(class) = self.class(class) {
                self.program.classes.push(class);
            }
        }
    }

    fn class(&mut self, value: Value) -> Option<ClassDecl> {
        let mut node = self.node(value, "ClassDecl", Span::default())?;
        let methods = node.remove("methods");
        let mut header = self.members::<RawClass>(node);
        let (span, fields) = match &mut header {
            Some(header) => (
                Span::new(header.line, header.col),
                std::mem::take(&mut header.fields),
            ),
            None => (Span::default(), Vec::new()),
        };
        let fields: Vec<FieldDecl> = fields
            .into_iter()
            .filter_map(|f| self.check(field(f)))
            .collect();
        let methods: Vec<MethodDecl> = self
            .array(methods, "ClassDecl", "methods", span)
            .into_iter()
            .filter_map(|m| self.method(m, span))
            .collect();
        let header = header?;
        if self.error.is_some() {
            return None;
        }
        Some(ClassDecl {
            name: header.name,
            parent: header.parent.map(|p| Ident::new(p, span)),
            fields,
            methods,
            span,
        })
    }

    fn method(&mut self, value: Value, class: Span) -> Option<MethodDecl> {
        let mut node = self.node(value, "MethodDecl", class)?;
        let body = node.remove("body");
        let header = self.members::<RawMethod>(node);
        let span = header
            .as_ref()
            .map_or(class, |header| Span::new(header.line, header.col));
        let body = match body {
            Some(body) if body.get("kind").and_then(Value::as_str) == Some("Block") => {
                self.body(body, span)
            }
            other => {
                self.fail(IngestError::invalid(
                    "MethodDecl",
                    "body",
                    "method body must be a Block",
                    span,
                ));
                if let Some(other) = other {
                    discard(other);
                }
                None
            }
        };
        let header = header?;
        let params: Vec<Formal> = header
            .params
            .into_iter()
            .filter_map(|p| self.check(formal(p)))
            .collect();
        let visibility = self.check(visibility("MethodDecl", header.visibility.as_deref(), span));
        Some(MethodDecl {
            return_type: TypeExpr::parse(&header.return_type, span),
            visibility: visibility?,
            name: header.name,
            params,
            body: body?,
            is_static: header.is_static,
            span,
        })
    }

    /// Lower one statement tree. Children are pushed in reverse so they are
    /// lowered, and land in the arena, in source order.
    fn body(&mut self, value: Value, method: Span) -> Option<StmtId> {
        let mut tasks = vec![Task::Stmt(value, method)];
        while let Some(task) = tasks.pop() {
            match task {
                Task::Stmt(value, parent) => self.open_stmt(value, parent, &mut tasks),
                Task::Expr(value, parent) => self.open_expr(value, parent, &mut tasks),
                Task::Finish(pending) => {
                    if self.error.is_none() && self.finish(pending).is_none() {
                        self.fail(IngestError::invalid(
                            "MethodDecl",
                            "body",
                            "node lowered without its children",
                            method,
                        ));
                    }
                }
            }
        }
        let body = self.stmts.pop();
        self.stmts.clear();
        self.exprs.clear();
        if self.error.is_some() { None } else { body }
    }

    fn open_stmt(&mut self, value: Value, parent: Span, tasks: &mut Vec<Task>) {
        let Some(mut node) = self.node(value, "Stmt", parent) else {
            return;
        };
        let mut children = Children::take(&mut node, STMT_CHILDREN);
        let Some(RawNode { kind, line, col }) = self.members::<RawNode<RawStmt>>(node) else {
            children.discard();
            return;
        };
        let span = Span::new(line, col);
        let stmt = |value| Task::Stmt(value, span);
        let expr = |value| Task::Expr(value, span);
        match kind {
            RawStmt::Block => {
                let stmts = self.array(children.remove("stmts"), "Block", "stmts", span);
                tasks.push(Task::Finish(Pending::Block {
                    len: stmts.len(),
                    span,
                }));
                tasks.extend(stmts.into_iter().rev().map(stmt));
            }
            RawStmt::If => {
                let cond = self.required(&mut children, "If", "cond", span);
                let then = self.required(&mut children, "If", "then", span);
                let else_branch = children.remove("else");
                tasks.push(Task::Finish(Pending::If {
                    has_else: else_branch.is_some(),
                    span,
                }));
                tasks.extend(else_branch.map(stmt));
                tasks.extend(then.map(stmt));
                tasks.extend(cond.map(expr));
            }
            RawStmt::While => {
                let cond = self.required(&mut children, "While", "cond", span);
                let body = self.required(&mut children, "While", "body", span);
                tasks.push(Task::Finish(Pending::While(span)));
                tasks.extend(body.map(stmt));
                tasks.extend(cond.map(expr));
            }
            RawStmt::For => {
                let init = children.remove("init");
                let cond = children.remove("cond");
                let update = children.remove("update");
                let body = self.required(&mut children, "For", "body", span);
                tasks.push(Task::Finish(Pending::For {
                    has_init: init.is_some(),
                    has_cond: cond.is_some(),
                    has_update: update.is_some(),
                    span,
                }));
                tasks.extend(body.map(stmt));
                tasks.extend(update.map(stmt));
                tasks.extend(cond.map(expr));
                tasks.extend(init.map(stmt));
            }
            RawStmt::Return => {
                let value = children.remove("value");
                tasks.push(Task::Finish(Pending::Return {
                    has_value: value.is_some(),
                    span,
                }));
                tasks.extend(value.map(expr));
            }
            RawStmt::ExprStmt => {
                let value = self.required(&mut children, "ExprStmt", "expr", span);
                tasks.push(Task::Finish(Pending::ExprStmt(span)));
                tasks.extend(value.map(expr));
            }
            RawStmt::Assign => {
                let target = self.required(&mut children, "Assign", "target", span);
                let value = self.required(&mut children, "Assign", "value", span);
                tasks.push(Task::Finish(Pending::Assign(span)));
                tasks.extend(value.map(expr));
                tasks.extend(target.map(expr));
            }
            RawStmt::VarDeclStmt { vars } => {
                let vars: Vec<VarDecl> = vars
                    .into_iter()
                    .filter_map(|v| self.check(var_decl(v)))
                    .collect();
                self.leaf_stmt(StmtKind::VarDecl(vars), span);
            }
            RawStmt::Print => {
                let value = self.required(&mut children, "Print", "value", span);
                tasks.push(Task::Finish(Pending::Print(span)));
                tasks.extend(value.map(expr));
            }
            RawStmt::Break => self.leaf_stmt(StmtKind::Break, span),
            RawStmt::Continue => self.leaf_stmt(StmtKind::Continue, span),
            RawStmt::Skip => self.leaf_stmt(StmtKind::Skip, span),
        }
        children.discard();
    }

    fn open_expr(&mut self, value: Value, parent: Span, tasks: &mut Vec<Task>) {
        let Some(mut node) = self.node(value, "Expr", parent) else {
            return;
        };
        let mut children = Children::take(&mut node, EXPR_CHILDREN);
        let Some(RawNode { kind, line, col }) = self.members::<RawNode<RawExpr>>(node) else {
            children.discard();
            return;
        };
        let span = Span::new(line, col);
        let expr = |value| Task::Expr(value, span);
        match kind {
            RawExpr::BinaryOp { op } => {
                let lhs = self.required(&mut children, "BinaryOp", "lhs", span);
                let rhs = self.required(&mut children, "BinaryOp", "rhs", span);
                match BinaryOp::from_symbol(&op) {
                    Some(op) => tasks.push(Task::Finish(Pending::Binary { op, span })),
                    None => self.fail(unknown_operator("BinaryOp", &op, span)),
                }
                tasks.extend(rhs.map(expr));
                tasks.extend(lhs.map(expr));
            }
            RawExpr::UnaryOp { op } => {
                let operand = self.required(&mut children, "UnaryOp", "operand", span);
                match UnaryOp::from_symbol(&op) {
                    Some(op) => tasks.push(Task::Finish(Pending::Unary { op, span })),
                    None => self.fail(unknown_operator("UnaryOp", &op, span)),
                }
                tasks.extend(operand.map(expr));
            }
            RawExpr::Literal { ty, value } => {
                let literal = literal(&ty, &value, span);
                if let Some(literal) = self.check(literal) {
                    self.leaf_expr(ExprKind::Literal(literal), span);
                }
                discard(value);
            }
            RawExpr::Identifier { name } => self.leaf_expr(ExprKind::Identifier(name), span),
            RawExpr::This => self.leaf_expr(ExprKind::This, span),
            RawExpr::Super => self.leaf_expr(ExprKind::Super, span),
            RawExpr::New { class } => self.leaf_expr(ExprKind::New { class }, span),
            RawExpr::Call { method } => {
                let receiver = children.remove("receiver");
                let args = self.array(children.remove("args"), "Call", "args", span);
                tasks.push(Task::Finish(Pending::Call {
                    method,
                    argc: args.len(),
                    has_receiver: receiver.is_some(),
                    span,
                }));
                tasks.extend(args.into_iter().rev().map(expr));
                tasks.extend(receiver.map(expr));
            }
            RawExpr::FieldAccess { field } => {
                let receiver = self.required(&mut children, "FieldAccess", "receiver", span);
                tasks.push(Task::Finish(Pending::FieldAccess { field, span }));
                tasks.extend(receiver.map(expr));
            }
            RawExpr::IncDec { op, prefix } => {
                let target = self.required(&mut children, "IncDec", "target", span);
                match IncDecOp::from_symbol(&op) {
                    Some(op) => tasks.push(Task::Finish(Pending::IncDec { op, prefix, span })),
                    None => self.fail(unknown_operator("IncDec", &op, span)),
                }
                tasks.extend(target.map(expr));
            }
        }
        children.discard();
    }

    /// Build a node from the ids its children left on the result stacks.
    fn finish(&mut self, pending: Pending) -> Option<()> {
        match pending {
            Pending::Block { len, span } => {
                let start = self.stmts.len().checked_sub(len)?;
                let ids = self.stmts.split_off(start);
                self.push_stmt(StmtKind::Block(ids), span);
            }
            Pending::If { has_else, span } => {
                let else_branch = if has_else { Some(self.stmts.pop()?) } else { None };
                let then_branch = self.stmts.pop()?;
                let cond = self.exprs.pop()?;
                self.push_stmt(
                    StmtKind::If {
                        cond,
                        then_branch,
                        else_branch,
                    },
                    span,
                );
            }
            Pending::While(span) => {
                let body = self.stmts.pop()?;
                let cond = self.exprs.pop()?;
                self.push_stmt(StmtKind::While { cond, body }, span);
            }
            Pending::For {
                has_init,
                has_cond,
                has_update,
                span,
            } => {
                let body = self.stmts.pop()?;
                let update = if has_update { Some(self.stmts.pop()?) } else { None };
                let init = if has_init { Some(self.stmts.pop()?) } else { None };
                let cond = if has_cond { Some(self.exprs.pop()?) } else { None };
                self.push_stmt(
                    StmtKind::For {
                        init,
                        cond,
                        update,
                        body,
                    },
                    span,
                );
            }
            Pending::Return { has_value, span } => {
                let value = if has_value { Some(self.exprs.pop()?) } else { None };
                self.push_stmt(StmtKind::Return(value), span);
            }
            Pending::ExprStmt(span) => {
                let expr = self.exprs.pop()?;
                self.push_stmt(StmtKind::Expr(expr), span);
            }
            Pending::Assign(span) => {
                let value = self.exprs.pop()?;
                let target = self.exprs.pop()?;
                self.push_stmt(StmtKind::Assign { target, value }, span);
            }
            Pending::Print(span) => {
                let value = self.exprs.pop()?;
                self.push_stmt(StmtKind::Print(value), span);
            }
            Pending::Binary { op, span } => {
                let rhs = self.exprs.pop()?;
                let lhs = self.exprs.pop()?;
                self.push_expr(ExprKind::Binary { op, lhs, rhs }, span);
            }
            Pending::Unary { op, span } => {
                let operand = self.exprs.pop()?;
                self.push_expr(ExprKind::Unary { op, operand }, span);
            }
            Pending::Call {
                method,
                argc,
                has_receiver,
                span,
            } => {
                let start = self.exprs.len().checked_sub(argc)?;
                let args = self.exprs.split_off(start);
                let receiver = if has_receiver { Some(self.exprs.pop()?) } else { None };
                self.push_expr(
                    ExprKind::Call {
                        receiver,
                        method,
                        args,
                    },
                    span,
                );
            }
            Pending::FieldAccess { field, span } => {
                let receiver = self.exprs.pop()?;
                self.push_expr(ExprKind::FieldAccess { receiver, field }, span);
            }
            Pending::IncDec { op, prefix, span } => {
                let target = self.exprs.pop()?;
                self.push_expr(ExprKind::IncDec { op, prefix, target }, span);
            }
        }
        Some(())
    }

    fn leaf_stmt(&mut self, kind: StmtKind, span: Span) {
        if self.error.is_none() {
            self.push_stmt(kind, span);
        }
    }

    fn leaf_expr(&mut self, kind: ExprKind, span: Span) {
        if self.error.is_none() {
            self.push_expr(kind, span);
        }
    }

    fn push_stmt(&mut self, kind: StmtKind, span: Span) {
        let id = self.program.add_stmt(Stmt::new(kind, span));
        self.stmts.push(id);
    }

    fn push_expr(&mut self, kind: ExprKind, span: Span) {
        let id = self.program.add_expr(Expr::new(kind, span));
        self.exprs.push(id);
    }
}

fn field(raw: RawField) -> Result<FieldDecl, IngestError> {
    let span = Span::new(raw.line, raw.col);
    Ok(FieldDecl {
        ty: value_type("FieldDecl", &raw.ty, span)?,
        visibility: visibility("FieldDecl", raw.visibility.as_deref(), span)?,
        name: raw.name,
        is_static: raw.is_static,
        span,
    })
}

fn formal(raw: RawVar) -> Result<Formal, IngestError> {
    let span = Span::new(raw.line, raw.col);
    Ok(Formal {
        ty: value_type("Formal", &raw.ty, span)?,
        name: raw.name,
        span,
    })
}

fn var_decl(raw: RawVar) -> Result<VarDecl, IngestError> {
    let span = Span::new(raw.line, raw.col);
    Ok(VarDecl {
        ty: value_type("VarDecl", &raw.ty, span)?,
        name: raw.name,
        span,
    })
}

fn unknown_operator(kind: &'static str, op: &str, span: Span) -> IngestError {
    IngestError::invalid(kind, "op", format!("unknown operator '{}'", op), span)
}

/// A type in a value position: anything but `void`.
fn value_type(kind: &'static str, name: &str, span: Span) -> Result<TypeExpr, IngestError> {
    let ty = TypeExpr::parse(name, span);
    if ty.is_void() {
        return Err(IngestError::invalid(kind, "type", "'void' is not a value type", span));
    }
    Ok(ty)
}

fn visibility(
    kind: &'static str,
    name: Option<&str>,
    span: Span,
) -> Result<Visibility, IngestError> {
    match name {
        None => Ok(Visibility::Public),
        Some(name) => Visibility::from_name(name).ok_or_else(|| {
            IngestError::invalid(kind, "visibility", format!("unknown visibility '{}'", name), span)
        }),
    }
}

fn literal(ty: &str, value: &Value, span: Span) -> Result<Literal, IngestError> {
    let bad = |message: String| IngestError::invalid("Literal", "value", message, span);
    match ty {
        "int" => {
            let n = match value {
                Value::Number(n) => n.as_i64(),
                Value::String(s) => s.trim().parse::<i64>().ok(),
                _ => None,
            }
            .ok_or_else(|| bad(format!("expected an integer, found {}", value)))?;
            let n = i32::try_from(n).map_err(|_| bad(format!("integer {} out of range", n)))?;
            Ok(Literal::Int(n))
        }
        "double" | "float" => {
            let x = match value {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            }
            .ok_or_else(|| bad(format!("expected a number, found {}", value)))?;
            Ok(Literal::Double(x))
        }
        "bool" | "boolean" => match value {
            Value::Bool(b) => Ok(Literal::Bool(*b)),
            Value::String(s) if s == "true" => Ok(Literal::Bool(true)),
            Value::String(s) if s == "false" => Ok(Literal::Bool(false)),
            _ => Err(bad(format!("expected a boolean, found {}", value))),
        },
        "string" => match value {
            Value::String(s) => Ok(Literal::String(s.clone())),
            _ => Err(bad(format!("expected a string, found {}", value))),
        },
        "null" => Ok(Literal::Null),
        other => Err(IngestError::invalid(
            "Literal",
            "type",
            format!("unknown literal type '{}'", other),
            span,
        )),
    }
}
