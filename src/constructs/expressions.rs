//! Expression compilation: AST expressions → typed expression constructs
//!
//! Every function here returns a construct id even on failure; a failed
//! expression compiles to an `Unresolved` node carrying an error note, so
//! sibling subtrees keep being checked and one pass reports many errors.

use super::{
    BinaryOp, Compiler, ConstructId, ConstructKind, ExprKind, Expression, LogicalOp, NoteKind,
    UnaryOp, ValueCategory,
};
use crate::ast;
use crate::entities::{EntityKind, LookupOptions, LookupResult};
use crate::types::{Type, TypeKind};

impl Compiler {
    pub(crate) fn make_expr(
        &mut self,
        ty: Type,
        category: ValueCategory,
        kind: ExprKind,
    ) -> ConstructId {
        self.add_construct(
            ConstructKind::Expr(Expression { ty, category, kind }),
            false,
        )
    }

    /// An `Unresolved` expression carrying one error note
    pub(crate) fn error_expr(&mut self, note: NoteKind) -> ConstructId {
        let id = self.make_expr(Type::void(), ValueCategory::Prvalue, ExprKind::Unresolved);
        self.error(id, note);
        id
    }

    /// Compile one AST expression into a typed expression construct
    pub(crate) fn compile_expression(&mut self, expr: &ast::Expression) -> ConstructId {
        match expr {
            ast::Expression::IntLiteral(v) => {
                self.make_expr(Type::int(), ValueCategory::Prvalue, ExprKind::IntLiteral(*v))
            }
            ast::Expression::DoubleLiteral(v) => self.make_expr(
                Type::double(),
                ValueCategory::Prvalue,
                ExprKind::DoubleLiteral(*v),
            ),
            ast::Expression::CharLiteral(v) => self.make_expr(
                Type::char_(),
                ValueCategory::Prvalue,
                ExprKind::CharLiteral(*v),
            ),
            ast::Expression::BoolLiteral(v) => self.make_expr(
                Type::bool_(),
                ValueCategory::Prvalue,
                ExprKind::BoolLiteral(*v),
            ),
            ast::Expression::StringLiteral(s) => {
                // "hi" has type const char[3]: the characters plus the null
                // terminator, and it designates a static-storage array.
                let ty = Type::bounded_array(Type::char_().with_const(), s.len() + 1);
                self.make_expr(ty, ValueCategory::Lvalue, ExprKind::StringLiteral(s.clone()))
            }
            ast::Expression::NullptrLiteral => self.make_expr(
                Type::pointer_to(Type::void()),
                ValueCategory::Prvalue,
                ExprKind::NullptrLiteral,
            ),
            ast::Expression::Identifier(name) => self.compile_identifier(name),
            ast::Expression::Unary { op, operand } => self.compile_unary(*op, operand),
            ast::Expression::Binary { op, lhs, rhs } => self.compile_binary(*op, lhs, rhs),
            ast::Expression::Logical { op, lhs, rhs } => self.compile_logical(*op, lhs, rhs),
            ast::Expression::Assignment { lhs, rhs } => self.compile_assignment(lhs, rhs),
            ast::Expression::Comma { lhs, rhs } => self.compile_comma(lhs, rhs),
            ast::Expression::Ternary {
                condition,
                then_expr,
                else_expr,
            } => self.compile_ternary(condition, then_expr, else_expr),
            ast::Expression::Subscript { target, index } => self.compile_subscript(target, index),
            ast::Expression::Call { name, args } => self.compile_call_by_name(name, args),
            ast::Expression::MethodCall { object, name, args } => {
                self.compile_method_call(object, name, args)
            }
            ast::Expression::MemberAccess { object, member } => {
                self.compile_member_access(object, member)
            }
        }
    }

    fn compile_identifier(&mut self, name: &str) -> ConstructId {
        match self
            .symbols
            .lookup(self.current_scope, name, LookupOptions::default())
        {
            LookupResult::Variable(entity) => {
                let e = self.symbols.entity(entity);
                // Naming a reference designates its referent.
                let ty = e.ty.strip_reference().clone();
                let mut ty = ty;
                // A member named inside a const method is const.
                if matches!(e.kind, EntityKind::MemberObject { .. }) && self.current_receiver_const
                {
                    ty = ty.with_const();
                }
                self.make_expr(ty, ValueCategory::Lvalue, ExprKind::Identifier(entity))
            }
            LookupResult::Functions(_) => self.error_expr(NoteKind::FunctionNameAsValue),
            LookupResult::Class(_) => self.error_expr(NoteKind::NotAVariable {
                name: name.to_string(),
            }),
            LookupResult::NotFound => self.error_expr(NoteKind::UnknownName {
                name: name.to_string(),
            }),
        }
    }

    fn compile_unary(&mut self, op: ast::UnaryOperator, operand: &ast::Expression) -> ConstructId {
        let operand = self.compile_expression(operand);
        match op {
            ast::UnaryOperator::Deref => {
                let ptr = self.convert_to_prvalue(operand);
                let ty = self.expr_type(ptr);
                match &ty.kind {
                    TypeKind::Pointer(pointee) => {
                        let pointee = (**pointee).clone();
                        let node = self.make_expr(
                            pointee,
                            ValueCategory::Lvalue,
                            ExprKind::Unary {
                                op: UnaryOp::Deref,
                                operand: ptr,
                            },
                        );
                        self.attach(ptr, node);
                        node
                    }
                    _ => {
                        let name = self.type_name(&ty);
                        let node = self.error_expr(NoteKind::DerefNonPointer { ty: name });
                        self.attach(ptr, node);
                        node
                    }
                }
            }
            ast::UnaryOperator::AddrOf => {
                if self.expr_category(operand) != ValueCategory::Lvalue {
                    let node = self.error_expr(NoteKind::AddressOfRvalue);
                    self.attach(operand, node);
                    return node;
                }
                let pointee = self.expr_type(operand);
                let node = self.make_expr(
                    Type::pointer_to(pointee),
                    ValueCategory::Prvalue,
                    ExprKind::Unary {
                        op: UnaryOp::AddrOf,
                        operand,
                    },
                );
                self.attach(operand, node);
                node
            }
            ast::UnaryOperator::Neg => {
                let value = self.convert_to_prvalue(operand);
                let ty = self.expr_type(value);
                let (value, ty) = if ty.is_integral() {
                    let promoted = self.standard_conversion(value, &Type::int());
                    (promoted, Type::int())
                } else if ty.is_floating_point() {
                    (value, ty.cv_unqualified())
                } else {
                    let name = self.type_name(&ty);
                    let node = self.error_expr(NoteKind::InvalidUnaryOperand { ty: name });
                    self.attach(value, node);
                    return node;
                };
                let node = self.make_expr(
                    ty,
                    ValueCategory::Prvalue,
                    ExprKind::Unary {
                        op: UnaryOp::Neg,
                        operand: value,
                    },
                );
                self.attach(value, node);
                node
            }
            ast::UnaryOperator::Not => {
                let value = self.convert_to_bool(operand);
                if !self.conversion_succeeded(value, &Type::bool_()) {
                    let ty = self.expr_type(value);
                    let name = self.type_name(&ty);
                    let node = self.error_expr(NoteKind::NotConvertibleToBool { ty: name });
                    self.attach(value, node);
                    return node;
                }
                let node = self.make_expr(
                    Type::bool_(),
                    ValueCategory::Prvalue,
                    ExprKind::Unary {
                        op: UnaryOp::Not,
                        operand: value,
                    },
                );
                self.attach(value, node);
                node
            }
        }
    }

    fn compile_binary(
        &mut self,
        op: ast::BinaryOperator,
        lhs: &ast::Expression,
        rhs: &ast::Expression,
    ) -> ConstructId {
        let op = match op {
            ast::BinaryOperator::Add => BinaryOp::Add,
            ast::BinaryOperator::Sub => BinaryOp::Sub,
            ast::BinaryOperator::Mul => BinaryOp::Mul,
            ast::BinaryOperator::Div => BinaryOp::Div,
            ast::BinaryOperator::Mod => BinaryOp::Mod,
            ast::BinaryOperator::Eq => BinaryOp::Eq,
            ast::BinaryOperator::Ne => BinaryOp::Ne,
            ast::BinaryOperator::Lt => BinaryOp::Lt,
            ast::BinaryOperator::Le => BinaryOp::Le,
            ast::BinaryOperator::Gt => BinaryOp::Gt,
            ast::BinaryOperator::Ge => BinaryOp::Ge,
        };
        let lhs = self.compile_expression(lhs);
        let rhs = self.compile_expression(rhs);
        let lhs = self.convert_to_prvalue(lhs);
        let rhs = self.convert_to_prvalue(rhs);
        let lt = self.expr_type(lhs);
        let rt = self.expr_type(rhs);

        let is_comparison = matches!(
            op,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        );

        // Pointer arithmetic and pointer comparison.
        if lt.is_pointer() || rt.is_pointer() {
            return self.compile_pointer_binary(op, is_comparison, lhs, rhs);
        }

        if !lt.is_arithmetic() || !rt.is_arithmetic() {
            let lname = self.type_name(&lt);
            let rname = self.type_name(&rt);
            let node = self.error_expr(NoteKind::InvalidBinaryOperands {
                lhs: lname,
                rhs: rname,
            });
            self.attach(lhs, node);
            self.attach(rhs, node);
            return node;
        }

        let (lhs, rhs, common) = self.usual_arithmetic_conversions(lhs, rhs);
        if op == BinaryOp::Mod && !common.is_integral() {
            let name = self.type_name(&common);
            let node = self.error_expr(NoteKind::InvalidBinaryOperands {
                lhs: name.clone(),
                rhs: name,
            });
            self.attach(lhs, node);
            self.attach(rhs, node);
            return node;
        }
        let result_ty = if is_comparison { Type::bool_() } else { common };
        let node = self.make_expr(
            result_ty,
            ValueCategory::Prvalue,
            ExprKind::Binary { op, lhs, rhs },
        );
        self.attach(lhs, node);
        self.attach(rhs, node);
        node
    }

    fn compile_pointer_binary(
        &mut self,
        op: BinaryOp,
        is_comparison: bool,
        lhs: ConstructId,
        rhs: ConstructId,
    ) -> ConstructId {
        let lt = self.expr_type(lhs);
        let rt = self.expr_type(rhs);

        // Null pointer constants adapt to the other operand's pointer type.
        let (lhs, rhs, lt, rt) = if self.is_null_pointer_constant(lhs) && rt.is_pointer() {
            let lhs = self.standard_conversion(lhs, &rt);
            let lt = self.expr_type(lhs);
            (lhs, rhs, lt, rt)
        } else if self.is_null_pointer_constant(rhs) && lt.is_pointer() {
            let rhs = self.standard_conversion(rhs, &lt);
            let rt = self.expr_type(rhs);
            (lhs, rhs, lt, rt)
        } else {
            (lhs, rhs, lt, rt)
        };

        let result = if is_comparison {
            if lt.is_pointer() && rt.is_pointer() && lt.similar(&rt) {
                Some(Type::bool_())
            } else {
                None
            }
        } else {
            match op {
                BinaryOp::Add if lt.is_pointer() && rt.is_integral() => Some(lt.cv_unqualified()),
                BinaryOp::Add if lt.is_integral() && rt.is_pointer() => Some(rt.cv_unqualified()),
                BinaryOp::Sub if lt.is_pointer() && rt.is_integral() => Some(lt.cv_unqualified()),
                BinaryOp::Sub if lt.is_pointer() && rt.is_pointer() && lt.similar(&rt) => {
                    Some(Type::int())
                }
                _ => None,
            }
        };

        match result {
            Some(ty) => {
                let node = self.make_expr(
                    ty,
                    ValueCategory::Prvalue,
                    ExprKind::Binary { op, lhs, rhs },
                );
                self.attach(lhs, node);
                self.attach(rhs, node);
                node
            }
            None => {
                let lname = self.type_name(&lt);
                let rname = self.type_name(&rt);
                let node = self.error_expr(NoteKind::InvalidBinaryOperands {
                    lhs: lname,
                    rhs: rname,
                });
                self.attach(lhs, node);
                self.attach(rhs, node);
                node
            }
        }
    }

    fn compile_logical(
        &mut self,
        op: ast::LogicalOperator,
        lhs: &ast::Expression,
        rhs: &ast::Expression,
    ) -> ConstructId {
        let op = match op {
            ast::LogicalOperator::And => LogicalOp::And,
            ast::LogicalOperator::Or => LogicalOp::Or,
        };
        let lhs = self.compile_expression(lhs);
        let rhs = self.compile_expression(rhs);
        let lhs = self.convert_to_bool(lhs);
        let rhs = self.convert_to_bool(rhs);
        for operand in [lhs, rhs] {
            if !self.conversion_succeeded(operand, &Type::bool_()) {
                let ty = self.expr_type(operand);
                let name = self.type_name(&ty);
                self.error(operand, NoteKind::NotConvertibleToBool { ty: name });
            }
        }
        let node = self.make_expr(
            Type::bool_(),
            ValueCategory::Prvalue,
            ExprKind::Logical { op, lhs, rhs },
        );
        self.attach(lhs, node);
        self.attach(rhs, node);
        node
    }

    fn compile_assignment(&mut self, lhs: &ast::Expression, rhs: &ast::Expression) -> ConstructId {
        let lhs = self.compile_expression(lhs);
        let rhs = self.compile_expression(rhs);
        let lt = self.expr_type(lhs);

        if self.expr_category(lhs) != ValueCategory::Lvalue {
            let node = self.error_expr(NoteKind::AssignToRvalue);
            self.attach(lhs, node);
            self.attach(rhs, node);
            return node;
        }
        if lt.is_const {
            let name = self.type_name(&lt);
            let node = self.error_expr(NoteKind::AssignToConst { ty: name });
            self.attach(lhs, node);
            self.attach(rhs, node);
            return node;
        }
        if !lt.is_atomic() {
            // Class assignment would go through operator=; arrays are not
            // assignable at all.
            let name = self.type_name(&lt);
            let node = self.error_expr(NoteKind::UnsupportedAssignment { ty: name });
            self.attach(lhs, node);
            self.attach(rhs, node);
            return node;
        }

        let value_ty = lt.cv_unqualified();
        let rhs = self.standard_conversion(rhs, &value_ty);
        if !self.conversion_succeeded(rhs, &value_ty) {
            let from = self.expr_type(rhs);
            let from = self.type_name(&from);
            let to = self.type_name(&value_ty);
            let node = self.error_expr(NoteKind::ConversionFailed { from, to });
            self.attach(lhs, node);
            self.attach(rhs, node);
            return node;
        }

        let node = self.make_expr(
            lt,
            ValueCategory::Lvalue,
            ExprKind::Assignment { lhs, rhs },
        );
        self.attach(lhs, node);
        self.attach(rhs, node);
        node
    }

    fn compile_comma(&mut self, lhs: &ast::Expression, rhs: &ast::Expression) -> ConstructId {
        let lhs = self.compile_expression(lhs);
        let rhs = self.compile_expression(rhs);
        let ty = self.expr_type(rhs);
        let category = self.expr_category(rhs);
        let node = self.make_expr(ty, category, ExprKind::Comma { lhs, rhs });
        self.attach(lhs, node);
        self.attach(rhs, node);
        node
    }

    fn compile_ternary(
        &mut self,
        condition: &ast::Expression,
        then_expr: &ast::Expression,
        else_expr: &ast::Expression,
    ) -> ConstructId {
        let condition = self.compile_expression(condition);
        let condition = self.convert_to_bool(condition);
        if !self.conversion_succeeded(condition, &Type::bool_()) {
            let ty = self.expr_type(condition);
            let name = self.type_name(&ty);
            self.error(condition, NoteKind::NotConvertibleToBool { ty: name });
        }
        let then_expr = self.compile_expression(then_expr);
        let else_expr = self.compile_expression(else_expr);

        let tt = self.expr_type(then_expr);
        let et = self.expr_type(else_expr);
        let t_cat = self.expr_category(then_expr);
        let e_cat = self.expr_category(else_expr);

        // Same type and category: keep them (lvalue ternaries stay lvalues).
        let (then_expr, else_expr, ty, category) = if tt.same(&et) && t_cat == e_cat {
            (then_expr, else_expr, tt, t_cat)
        } else {
            let then_expr = self.convert_to_prvalue(then_expr);
            let else_expr = self.convert_to_prvalue(else_expr);
            let tt = self.expr_type(then_expr);
            let et = self.expr_type(else_expr);
            if tt.is_arithmetic() && et.is_arithmetic() {
                let (t, e, common) = self.usual_arithmetic_conversions(then_expr, else_expr);
                (t, e, common, ValueCategory::Prvalue)
            } else {
                let lhs = self.type_name(&tt);
                let rhs = self.type_name(&et);
                let node = self.error_expr(NoteKind::IncompatibleTernaryBranches { lhs, rhs });
                self.attach(condition, node);
                self.attach(then_expr, node);
                self.attach(else_expr, node);
                return node;
            }
        };

        let node = self.make_expr(
            ty,
            category,
            ExprKind::Ternary {
                condition,
                then_expr,
                else_expr,
            },
        );
        self.attach(condition, node);
        self.attach(then_expr, node);
        self.attach(else_expr, node);
        node
    }

    fn compile_subscript(&mut self, target: &ast::Expression, index: &ast::Expression) -> ConstructId {
        let target = self.compile_expression(target);
        let target = self.convert_to_prvalue(target);
        let index = self.compile_expression(index);
        let index = self.standard_conversion(index, &Type::int());

        let tt = self.expr_type(target);
        let pointee = match &tt.kind {
            TypeKind::Pointer(p) => (**p).clone(),
            _ => {
                let name = self.type_name(&tt);
                let node = self.error_expr(NoteKind::SubscriptNonArray { ty: name });
                self.attach(target, node);
                self.attach(index, node);
                return node;
            }
        };
        if !self.conversion_succeeded(index, &Type::int()) {
            let from = self.expr_type(index);
            let from = self.type_name(&from);
            self.error(
                index,
                NoteKind::ConversionFailed {
                    from,
                    to: "int".to_string(),
                },
            );
        }
        let node = self.make_expr(
            pointee,
            ValueCategory::Lvalue,
            ExprKind::Subscript { target, index },
        );
        self.attach(target, node);
        self.attach(index, node);
        node
    }

    fn compile_member_access(&mut self, object: &ast::Expression, member: &str) -> ConstructId {
        let object = self.compile_expression(object);
        let ot = self.expr_type(object);
        let class = match ot.as_class() {
            Some(c) => c,
            None => {
                let name = self.type_name(&ot);
                let node = self.error_expr(NoteKind::NotAVariable {
                    name: format!("{}.{}", name, member),
                });
                self.attach(object, node);
                return node;
            }
        };
        let class_scope = self.symbols.class(class).scope;
        match self.symbols.lookup(
            class_scope,
            member,
            LookupOptions {
                own_scope_only: true,
            },
        ) {
            LookupResult::Variable(entity) => {
                let member_ty = self.symbols.entity(entity).ty.strip_reference().clone();
                // Constness of the object propagates to its members.
                let member_ty = if ot.is_const {
                    member_ty.with_const()
                } else {
                    member_ty
                };
                let node = self.make_expr(
                    member_ty,
                    ValueCategory::Lvalue,
                    ExprKind::MemberAccess {
                        object,
                        member: entity,
                    },
                );
                self.attach(object, node);
                node
            }
            _ => {
                let class_name = self.symbols.class(class).name.clone();
                let node = self.error_expr(NoteKind::UnknownMember {
                    class: class_name,
                    member: member.to_string(),
                });
                self.attach(object, node);
                node
            }
        }
    }
}
