//! Return path verification for non-void methods.
//!
//! [`ReturnChecker`] decides whether control can fall off the end of a method
//! body. A non-void method whose body can complete normally is missing a
//! return on some path.
//!
//! # Example
//!
//! ```ignore
//! let checker = ReturnChecker::new(&program);
//! if checker.can_complete(method.body) {
//!     // Error: not all code paths return a value
//! }
//! ```

use rustc_hash::FxHashMap;

use decaf_ast::{ExprId, ExprKind, Literal, Program, StmtId, StmtKind};

/// Control-flow summary of one statement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Flow {
    /// Control can reach the statement's end.
    completes: bool,
    /// A `break` inside it exits the nearest enclosing loop.
    breaks: bool,
}

impl Flow {
    const NORMAL: Flow = Flow {
        completes: true,
        breaks: false,
    };
    const ABRUPT: Flow = Flow {
        completes: false,
        breaks: false,
    };
}

/// Verifies all code paths return a value.
///
/// The analysis is structural: a `return`, `break` or `continue` ends its
/// path; an `if` completes when either branch does; a loop whose condition is
/// the literal `true` (or absent, for `for`) completes only through a `break`.
/// Any other loop may run zero times and so completes.
pub struct ReturnChecker<'a> {
    program: &'a Program,
}

impl<'a> ReturnChecker<'a> {
    pub fn new(program: &'a Program) -> Self {
        Self { program }
    }

    /// Whether control can reach the end of `body`.
    pub fn can_complete(&self, body: StmtId) -> bool {
        self.flow(body).completes
    }

    /// Iterative postorder over the statement tree.
    fn flow(&self, root: StmtId) -> Flow {
        let mut flows: FxHashMap<StmtId, Flow> = FxHashMap::default();
        let mut stack = vec![(root, false)];

        while let Some((id, visited)) = stack.pop() {
            let stmt = self.program.stmt(id);
            if !visited {
                stack.push((id, true));
                stack.extend(children(&stmt.kind).into_iter().map(|c| (c, false)));
                continue;
            }

            let get = |id: StmtId| flows.get(&id).copied().unwrap_or(Flow::NORMAL);
            let flow = match &stmt.kind {
                StmtKind::Block(stmts) => {
                    // Nothing after a statement that cannot complete is reached.
                    let reached = stmts
                        .iter()
                        .position(|&s| !get(s).completes)
                        .map_or(stmts.len(), |last| last + 1);
                    let reached = &stmts[..reached];
                    Flow {
                        completes: reached.iter().all(|&s| get(s).completes),
                        breaks: reached.iter().any(|&s| get(s).breaks),
                    }
                }
                StmtKind::If {
                    then_branch,
                    else_branch,
                    ..
                } => {
                    let then_flow = get(*then_branch);
                    match else_branch {
                        Some(else_branch) => {
                            let else_flow = get(*else_branch);
                            Flow {
                                completes: then_flow.completes || else_flow.completes,
                                breaks: then_flow.breaks || else_flow.breaks,
                            }
                        }
                        None => Flow {
                            completes: true,
                            breaks: then_flow.breaks,
                        },
                    }
                }
                StmtKind::While { cond, body } => self.loop_flow(Some(*cond), get(*body)),
                StmtKind::For { cond, body, .. } => self.loop_flow(*cond, get(*body)),
                StmtKind::Return(_) | StmtKind::Continue => Flow::ABRUPT,
                StmtKind::Break => Flow {
                    completes: false,
                    breaks: true,
                },
                StmtKind::Expr(_)
                | StmtKind::Assign { .. }
                | StmtKind::VarDecl(_)
                | StmtKind::Print(_)
                | StmtKind::Skip => Flow::NORMAL,
            };
            flows.insert(id, flow);
        }

        flows.get(&root).copied().unwrap_or(Flow::NORMAL)
    }

    /// A loop consumes its body's breaks.
    fn loop_flow(&self, cond: Option<ExprId>, body: Flow) -> Flow {
        let infinite = match cond {
            None => true,
            Some(cond) => matches!(
                self.program.expr(cond).kind,
                ExprKind::Literal(Literal::Bool(true))
            ),
        };
        Flow {
            completes: !infinite || body.breaks,
            breaks: false,
        }
    }
}

/// Nested statements that matter for control flow.
fn children(kind: &StmtKind) -> Vec<StmtId> {
    match kind {
        StmtKind::Block(stmts) => stmts.clone(),
        StmtKind::If {
            then_branch,
            else_branch,
            ..
        } => std::iter::once(*then_branch).chain(*else_branch).collect(),
        StmtKind::While { body, .. } | StmtKind::For { body, .. } => vec![*body],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use decaf_ast::{BinaryOp, ProgramBuilder};

    #[test]
    fn return_at_end_does_not_complete() {
        let mut b = ProgramBuilder::new();
        let one = b.int(1);
        let ret = b.ret(Some(one));
        let body = b.block(vec![ret]);
        let program = b.finish();
        assert!(!ReturnChecker::new(&program).can_complete(body));
    }

    #[test]
    fn empty_body_completes() {
        let mut b = ProgramBuilder::new();
        let body = b.block(vec![]);
        let program = b.finish();
        assert!(ReturnChecker::new(&program).can_complete(body));
    }

    #[test]
    fn if_needs_both_branches() {
        let mut b = ProgramBuilder::new();
        let cond = b.bool(false);
        let one = b.int(1);
        let ret = b.ret(Some(one));
        let only_then = b.if_stmt(cond, ret, None);
        let body = b.block(vec![only_then]);

        let two = b.int(2);
        let ret_else = b.ret(Some(two));
        let both = b.if_stmt(cond, ret, Some(ret_else));
        let full = b.block(vec![both]);
        let program = b.finish();

        let checker = ReturnChecker::new(&program);
        assert!(checker.can_complete(body));
        assert!(!checker.can_complete(full));
    }

    #[test]
    fn infinite_loops_complete_only_through_break() {
        let mut b = ProgramBuilder::new();
        let always = b.bool(true);
        let skip = b.skip();
        let forever = b.while_stmt(always, skip);
        let body = b.block(vec![forever]);

        let brk = b.break_stmt();
        let escapes = b.while_stmt(always, brk);
        let escaping = b.block(vec![escapes]);

        let for_ever = b.for_stmt(None, None, None, skip);
        let for_body = b.block(vec![for_ever]);
        let program = b.finish();

        let checker = ReturnChecker::new(&program);
        assert!(!checker.can_complete(body));
        assert!(checker.can_complete(escaping));
        assert!(!checker.can_complete(for_body));
    }

    #[test]
    fn break_in_nested_loop_does_not_escape_outer() {
        let mut b = ProgramBuilder::new();
        let always = b.bool(true);
        let x = b.ident("x");
        let zero = b.int(0);
        let cond = b.binary(BinaryOp::Greater, x, zero);
        let brk = b.break_stmt();
        let inner = b.while_stmt(cond, brk);
        let outer = b.while_stmt(always, inner);
        let body = b.block(vec![outer]);
        let program = b.finish();

        assert!(!ReturnChecker::new(&program).can_complete(body));
    }

    #[test]
    fn unreachable_break_does_not_end_the_loop() {
        let mut b = ProgramBuilder::new();
        let always = b.bool(true);
        let one = b.int(1);
        let ret = b.ret(Some(one));
        let brk = b.break_stmt();
        let loop_body = b.block(vec![ret, brk]);
        let forever = b.while_stmt(always, loop_body);
        let body = b.block(vec![forever]);

        let brk = b.break_stmt();
        let two = b.int(2);
        let ret = b.ret(Some(two));
        let loop_body = b.block(vec![brk, ret]);
        let escapes = b.while_stmt(always, loop_body);
        let escaping = b.block(vec![escapes]);
        let program = b.finish();

        let checker = ReturnChecker::new(&program);
        assert!(!checker.can_complete(body));
        assert!(checker.can_complete(escaping));
    }
}
