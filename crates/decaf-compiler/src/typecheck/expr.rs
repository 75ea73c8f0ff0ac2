//! Expression typing.
//!
//! Postorder over the expression tree: children are typed before their
//! parent, and each parent consumes its children's [`ExprInfo`]. A child that
//! must be a value goes through [`TypeChecker::value`], which reports class
//! names, `super`, method names and `void` calls used as operands.

use rustc_hash::FxHashMap;

use decaf_ast::{BinaryOp, ExprId, ExprKind, Literal, OpCategory, UnaryOp};
use decaf_core::{ClassId, CompilationError, DataType, PrimitiveKind, Span, Visibility};
use decaf_registry::Symbol;

use super::{ExprInfo, MethodContext, TypeChecker};
use crate::annotations::{CallTarget, Dispatch};

/// How a member access reaches its class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Receiver {
    /// No receiver: the enclosing class.
    Implicit,
    /// A class name: static members only.
    Class,
    /// `super`: the parent's instance members, called directly.
    Super,
    /// An object value: instance members, dispatched virtually.
    Instance,
}

impl TypeChecker<'_> {
    /// Type `root` and every subexpression.
    pub(super) fn check_expr(&mut self, ctx: &MethodContext, root: ExprId) -> Option<ExprInfo> {
        let mut infos: FxHashMap<ExprId, Option<ExprInfo>> = FxHashMap::default();
        let mut stack = vec![(root, false)];

        while let Some((id, visited)) = stack.pop() {
            let expr = self.program.expr(id);
            if !visited {
                stack.push((id, true));
                stack.extend(expr.children().into_iter().rev().map(|c| (c, false)));
                continue;
            }

            let info = self.type_node(ctx, id, &infos);
            if let Some(ExprInfo::Value(ty)) = info {
                self.types.set_type(id, ty);
            }
            infos.insert(id, info);
        }

        infos.get(&root).copied().flatten()
    }

    /// Type `root` and require a non-void value.
    pub(super) fn check_value(&mut self, ctx: &MethodContext, root: ExprId) -> Option<DataType> {
        let info = self.check_expr(ctx, root);
        self.value(root, info)
    }

    /// Convert an expression's info into a usable value type.
    pub(super) fn value(&mut self, id: ExprId, info: Option<ExprInfo>) -> Option<DataType> {
        let span = self.program.expr(id).span;
        match info? {
            ExprInfo::Value(ty) if ty.is_void() => {
                self.error(CompilationError::VoidValue { span });
                None
            }
            ExprInfo::Value(ty) => Some(ty),
            ExprInfo::ClassRef(class) => {
                self.error(CompilationError::NotAValue {
                    role: "class",
                    name: self.registry.class(class).name.clone(),
                    span,
                });
                None
            }
            ExprInfo::Super(_) => {
                self.error(CompilationError::InvalidReceiver {
                    keyword: "super",
                    reason: "can only be used as a call or field receiver",
                    span,
                });
                None
            }
        }
    }

    fn type_node(
        &mut self,
        ctx: &MethodContext,
        id: ExprId,
        infos: &FxHashMap<ExprId, Option<ExprInfo>>,
    ) -> Option<ExprInfo> {
        let program = self.program;
        let expr = program.expr(id);
        let child = |c: &ExprId| infos.get(c).copied().flatten();

        match &expr.kind {
            ExprKind::Literal(literal) => Some(ExprInfo::Value(match literal {
                Literal::Int(_) => DataType::int(),
                Literal::Double(_) => DataType::double(),
                Literal::Bool(_) => DataType::bool(),
                Literal::String(_) => DataType::string(),
                Literal::Null => DataType::Null,
            })),
            ExprKind::Identifier(name) => self.type_identifier(ctx, id, name, expr.span),
            ExprKind::This => Some(ExprInfo::Value(DataType::Class(ctx.class))),
            ExprKind::Super => self.registry.class(ctx.class).parent.map(ExprInfo::Super),
            ExprKind::New { .. } => match self.bindings.symbol(id) {
                Some(Symbol::Class(class)) => Some(ExprInfo::Value(DataType::Class(class))),
                _ => None,
            },
            ExprKind::Unary { op, operand } => {
                let ty = self.value(*operand, child(operand))?;
                self.type_unary(*op, ty, expr.span)
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let lhs_ty = self.value(*lhs, child(lhs));
                let rhs_ty = self.value(*rhs, child(rhs));
                self.type_binary(*op, lhs_ty?, rhs_ty?, expr.span)
            }
            ExprKind::Call {
                receiver,
                method,
                args,
            } => {
                let arg_types: Vec<_> = args
                    .iter()
                    .map(|arg| (*arg, self.value(*arg, child(arg))))
                    .collect();
                let receiver = match receiver {
                    Some(r) => Some(child(r)?),
                    None => None,
                };
                self.type_call(ctx, id, receiver, method, &arg_types, expr.span)
            }
            ExprKind::FieldAccess { receiver, field } => {
                let receiver = child(receiver)?;
                self.type_field_access(ctx, id, receiver, field, expr.span)
            }
            ExprKind::IncDec { op, target, .. } => {
                if !self.is_lvalue(*target) {
                    self.error(CompilationError::NotAssignable {
                        span: program.expr(*target).span,
                    });
                    return None;
                }
                let ty = self.value(*target, child(target))?;
                if !ty.is_numeric() {
                    self.error(CompilationError::OperatorMismatch {
                        op: op.symbol(),
                        message: format!(
                            "requires an int or double operand, found '{}'",
                            self.type_name(ty)
                        ),
                        span: expr.span,
                    });
                    return None;
                }
                Some(ExprInfo::Value(ty))
            }
        }
    }

    // ==========================================================================
    // Names
    // ==========================================================================

    fn type_identifier(
        &mut self,
        ctx: &MethodContext,
        id: ExprId,
        name: &str,
        span: Span,
    ) -> Option<ExprInfo> {
        let registry = self.registry;
        match self.bindings.symbol(id)? {
            Symbol::Variable(var) => Some(ExprInfo::Value(registry.variable(var).ty)),
            Symbol::Field(field) => {
                let entry = registry.field(field);
                if ctx.is_static && !entry.is_static {
                    self.error(CompilationError::StaticContext {
                        message: format!(
                            "instance field '{}' cannot be used in static method '{}'",
                            name,
                            registry.method_path(ctx.method)
                        ),
                        span,
                    });
                    return None;
                }
                self.check_private("field", name, entry.owner, entry.visibility, ctx, span);
                self.types.set_field(id, field);
                Some(ExprInfo::Value(entry.ty))
            }
            Symbol::Method(_) => {
                self.error(CompilationError::NotAValue {
                    role: "method",
                    name: name.to_string(),
                    span,
                });
                None
            }
            Symbol::Class(class) => Some(ExprInfo::ClassRef(class)),
        }
    }

    fn check_private(
        &mut self,
        role: &'static str,
        name: &str,
        owner: ClassId,
        visibility: Visibility,
        ctx: &MethodContext,
        span: Span,
    ) {
        if visibility == Visibility::Private && owner != ctx.class {
            self.error(CompilationError::PrivateMember {
                role,
                name: name.to_string(),
                class: self.registry.class(owner).name.clone(),
                span,
            });
        }
    }

    /// `Identifier` bound to a variable or field, or a field access.
    pub(super) fn is_lvalue(&self, id: ExprId) -> bool {
        match &self.program.expr(id).kind {
            ExprKind::Identifier(_) => matches!(
                self.bindings.symbol(id),
                Some(Symbol::Variable(_) | Symbol::Field(_))
            ),
            ExprKind::FieldAccess { .. } => true,
            _ => false,
        }
    }

    // ==========================================================================
    // Operators
    // ==========================================================================

    fn type_unary(&mut self, op: UnaryOp, ty: DataType, span: Span) -> Option<ExprInfo> {
        let (ok, wanted) = match op {
            UnaryOp::Neg => (ty.is_numeric(), "an int or double operand"),
            UnaryOp::Not => (ty.is_bool(), "a bool operand"),
        };
        if ok {
            return Some(ExprInfo::Value(ty));
        }
        self.error(CompilationError::OperatorMismatch {
            op: op.symbol(),
            message: format!("requires {}, found '{}'", wanted, self.type_name(ty)),
            span,
        });
        None
    }

    fn type_binary(
        &mut self,
        op: BinaryOp,
        lhs: DataType,
        rhs: DataType,
        span: Span,
    ) -> Option<ExprInfo> {
        let result = match op.category() {
            OpCategory::Arithmetic if lhs == rhs && lhs.is_numeric() => Some(lhs),
            OpCategory::Relational if lhs == rhs && lhs.is_numeric() => Some(DataType::bool()),
            OpCategory::Equality if self.comparable(lhs, rhs) => Some(DataType::bool()),
            OpCategory::Logical if lhs.is_bool() && rhs.is_bool() => Some(DataType::bool()),
            _ => None,
        };
        if let Some(ty) = result {
            return Some(ExprInfo::Value(ty));
        }

        let wanted = match op.category() {
            OpCategory::Arithmetic | OpCategory::Relational => "two int or two double operands",
            OpCategory::Equality => "operands of the same or related types",
            OpCategory::Logical => "two bool operands",
        };
        self.error(CompilationError::OperatorMismatch {
            op: op.symbol(),
            message: format!(
                "requires {}, found '{}' and '{}'",
                wanted,
                self.type_name(lhs),
                self.type_name(rhs)
            ),
            span,
        });
        None
    }

    /// Equal primitives, or references where one is assignable to the other.
    fn comparable(&self, lhs: DataType, rhs: DataType) -> bool {
        if lhs.is_reference() && rhs.is_reference() {
            return self.registry.are_related(lhs, rhs);
        }
        lhs == rhs && !lhs.is_void()
    }

    // ==========================================================================
    // Members
    // ==========================================================================

    /// The class a member is looked up in, and how it was reached.
    fn receiver_class(
        &mut self,
        ctx: &MethodContext,
        receiver: Option<ExprInfo>,
        member: &str,
        span: Span,
    ) -> Option<(ClassId, Receiver)> {
        match receiver {
            None => Some((ctx.class, Receiver::Implicit)),
            Some(ExprInfo::ClassRef(class)) => Some((class, Receiver::Class)),
            Some(ExprInfo::Super(parent)) => Some((parent, Receiver::Super)),
            Some(ExprInfo::Value(DataType::Class(class))) => Some((class, Receiver::Instance)),
            Some(ExprInfo::Value(other)) => {
                self.error(CompilationError::NotAnObject {
                    member: member.to_string(),
                    found: self.type_name(other),
                    span,
                });
                None
            }
        }
    }

    fn type_call(
        &mut self,
        ctx: &MethodContext,
        id: ExprId,
        receiver: Option<ExprInfo>,
        name: &str,
        args: &[(ExprId, Option<DataType>)],
        span: Span,
    ) -> Option<ExprInfo> {
        let registry = self.registry;
        let (class, via) = self.receiver_class(ctx, receiver, name, span)?;
        let Some(method) = registry.find_method(class, name) else {
            self.error(CompilationError::UnknownMember {
                class: registry.class(class).name.clone(),
                role: "method",
                name: name.to_string(),
                span,
            });
            return None;
        };
        let entry = registry.method(method);
        let path = registry.method_path(method);

        let static_problem = match via {
            Receiver::Implicit if ctx.is_static && !entry.is_static => Some(format!(
                "instance method '{}' cannot be called from static method '{}'",
                path,
                registry.method_path(ctx.method)
            )),
            Receiver::Class if !entry.is_static => Some(format!(
                "instance method '{}' cannot be called through class '{}'",
                path,
                registry.class(class).name
            )),
            Receiver::Super if entry.is_static => Some(format!(
                "static method '{}' cannot be called through 'super'",
                path
            )),
            Receiver::Instance if entry.is_static => Some(format!(
                "static method '{}' must be called through its class",
                path
            )),
            _ => None,
        };
        if let Some(message) = static_problem {
            self.error(CompilationError::StaticContext { message, span });
        }
        self.check_private("method", name, entry.owner, entry.visibility, ctx, span);

        if args.len() != entry.arity() {
            self.error(CompilationError::ArgumentCount {
                method: path.clone(),
                expected: entry.arity(),
                found: args.len(),
                span,
            });
        } else {
            for (position, ((arg, found), &expected)) in
                args.iter().zip(&entry.param_types).enumerate()
            {
                let Some(found) = *found else { continue };
                if !registry.is_assignable(found, expected) {
                    self.error(CompilationError::ArgumentType {
                        method: path.clone(),
                        position: position + 1,
                        expected: self.type_name(expected),
                        found: self.type_name(found),
                        span: self.program.expr(*arg).span,
                    });
                }
            }
        }

        let dispatch = if entry.is_static {
            Dispatch::Static
        } else if via == Receiver::Super {
            Dispatch::Super
        } else {
            match entry.vtable_slot {
                Some(slot) => Dispatch::Virtual { slot },
                None => {
                    self.error(CompilationError::internal(
                        format!("instance method '{}' has no vtable slot", path),
                        span,
                    ));
                    return None;
                }
            }
        };
        self.types.set_call(id, CallTarget { method, dispatch });
        Some(ExprInfo::Value(entry.return_type))
    }

    fn type_field_access(
        &mut self,
        ctx: &MethodContext,
        id: ExprId,
        receiver: ExprInfo,
        name: &str,
        span: Span,
    ) -> Option<ExprInfo> {
        let registry = self.registry;
        let (class, via) = self.receiver_class(ctx, Some(receiver), name, span)?;
        let Some(field) = registry.find_field(class, name) else {
            self.error(CompilationError::UnknownMember {
                class: registry.class(class).name.clone(),
                role: "field",
                name: name.to_string(),
                span,
            });
            return None;
        };
        let entry = registry.field(field);

        let static_problem = match via {
            Receiver::Class if !entry.is_static => Some(format!(
                "instance field '{}' cannot be accessed through class '{}'",
                name,
                registry.class(class).name
            )),
            Receiver::Super | Receiver::Instance if entry.is_static => Some(format!(
                "static field '{}' must be accessed through its class",
                name
            )),
            _ => None,
        };
        if let Some(message) = static_problem {
            self.error(CompilationError::StaticContext { message, span });
        }
        self.check_private("field", name, entry.owner, entry.visibility, ctx, span);

        self.types.set_field(id, field);
        Some(ExprInfo::Value(entry.ty))
    }
}

/// Primitive kind a `print` of `ty` uses, if printable.
pub(super) fn printable(ty: DataType) -> Option<PrimitiveKind> {
    match ty {
        DataType::Primitive(kind) if kind != PrimitiveKind::Void => Some(kind),
        _ => None,
    }
}
