//! The standard conversion pipeline
//!
//! A 3-stage, order-fixed chain applied to a typed expression:
//!
//! 1. lvalue-to-rvalue / array-to-pointer / function-to-pointer
//! 2. exactly one numeric/pointer conversion (pointer upcast, float
//!    promotion, pointer→bool, int↔float, integral promotion/conversion,
//!    null-pointer conversion)
//! 3. qualification conversion
//!
//! Each stage either returns the input unchanged or wraps it in an implicit
//! conversion construct that retains the original as a child (so the view
//! layer can explain what happened). The pipeline itself never raises an
//! error: if no stage matches, the type stays mismatched and the caller
//! reports it.

use super::{
    Compiler, ConstructId, ConstructKind, ExprKind, Expression, ValueCategory,
};
use crate::types::{is_sub_type, Type, TypeKind};

/// The closed set of implicit conversions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    LvalueToRvalue,
    ArrayToPointer,
    FunctionToPointer,
    Qualification,
    IntegralPromotion,
    IntegralConversion,
    FloatingPromotion,
    FloatingConversion,
    IntegralToFloating,
    FloatingToIntegral,
    NullPointer,
    PointerToBool,
    DerivedToBase,
}

impl Compiler {
    /// Wrap `operand` in an implicit conversion node of the given result type
    pub(crate) fn wrap_conversion(
        &mut self,
        operand: ConstructId,
        conv: Conversion,
        ty: Type,
        category: ValueCategory,
    ) -> ConstructId {
        let node = self.add_construct(
            ConstructKind::Expr(Expression {
                ty,
                category,
                kind: ExprKind::Conversion { conv, operand },
            }),
            true,
        );
        self.attach(operand, node);
        node
    }

    /// The type of an expression construct
    pub(crate) fn expr_type(&self, id: ConstructId) -> Type {
        self.expr_ref(id).ty.clone()
    }

    pub(crate) fn expr_category(&self, id: ConstructId) -> ValueCategory {
        self.expr_ref(id).category
    }

    pub(crate) fn expr_ref(&self, id: ConstructId) -> &Expression {
        match &self.constructs[id].kind {
            ConstructKind::Expr(e) => e,
            other => panic!("construct {} is not an expression: {:?}", id, other),
        }
    }

    /// A null pointer constant: `nullptr` or the integer literal `0`
    pub(crate) fn is_null_pointer_constant(&self, id: ConstructId) -> bool {
        matches!(
            self.expr_ref(id).kind,
            ExprKind::NullptrLiteral | ExprKind::IntLiteral(0)
        )
    }

    /// Stage 1: lvalue-to-rvalue, array-to-pointer, function-to-pointer.
    ///
    /// Class lvalues are left alone; class copies go through constructor
    /// selection, not through value conversion.
    pub(crate) fn convert_to_prvalue(&mut self, id: ConstructId) -> ConstructId {
        let e = self.expr_ref(id);
        if e.category == ValueCategory::Prvalue {
            return id;
        }
        let ty = e.ty.clone();
        match &ty.kind {
            TypeKind::BoundedArray(elem, _) | TypeKind::ArrayOfUnknownBound(elem) => {
                let pointer = Type::pointer_to((**elem).clone());
                self.wrap_conversion(id, Conversion::ArrayToPointer, pointer, ValueCategory::Prvalue)
            }
            TypeKind::Function(_) => {
                let pointer = Type::pointer_to(ty.clone());
                self.wrap_conversion(
                    id,
                    Conversion::FunctionToPointer,
                    pointer,
                    ValueCategory::Prvalue,
                )
            }
            TypeKind::Class(_) => id,
            _ => {
                let value_ty = ty.cv_unqualified();
                self.wrap_conversion(
                    id,
                    Conversion::LvalueToRvalue,
                    value_ty,
                    ValueCategory::Prvalue,
                )
            }
        }
    }

    /// The full 3-stage pipeline toward `target`. Returns the (possibly
    /// wrapped) expression; the caller decides whether the remaining type
    /// matches and reports a mismatch if not.
    pub(crate) fn standard_conversion(&mut self, id: ConstructId, target: &Type) -> ConstructId {
        if target.is_reference() {
            // Reference binding is not a value conversion; handled by the
            // initializer machinery.
            return id;
        }
        let null_constant = self.is_null_pointer_constant(id);

        // Stage 1
        let id = if target.is_class() {
            id
        } else {
            self.convert_to_prvalue(id)
        };

        // Stage 2: at most one of the following.
        let ty = self.expr_type(id);
        let id = if ty.cv_unqualified().similar(&target.cv_unqualified()) {
            id
        } else if ty.is_pointer() && target.is_pointer() && self.pointer_upcast_applies(&ty, target)
        {
            self.wrap_conversion(
                id,
                Conversion::DerivedToBase,
                target.cv_unqualified(),
                ValueCategory::Prvalue,
            )
        } else if matches!(ty.kind, TypeKind::Float) && matches!(target.kind, TypeKind::Double) {
            self.wrap_conversion(
                id,
                Conversion::FloatingPromotion,
                Type::double(),
                ValueCategory::Prvalue,
            )
        } else if matches!(ty.kind, TypeKind::Double) && matches!(target.kind, TypeKind::Float) {
            self.wrap_conversion(
                id,
                Conversion::FloatingConversion,
                Type::float(),
                ValueCategory::Prvalue,
            )
        } else if ty.is_pointer() && target.is_bool() {
            self.wrap_conversion(
                id,
                Conversion::PointerToBool,
                Type::bool_(),
                ValueCategory::Prvalue,
            )
        } else if null_constant && target.is_pointer() {
            self.wrap_conversion(
                id,
                Conversion::NullPointer,
                target.cv_unqualified(),
                ValueCategory::Prvalue,
            )
        } else if ty.is_integral() && target.is_floating_point() {
            self.wrap_conversion(
                id,
                Conversion::IntegralToFloating,
                target.cv_unqualified(),
                ValueCategory::Prvalue,
            )
        } else if ty.is_floating_point() && target.is_integral() {
            self.wrap_conversion(
                id,
                Conversion::FloatingToIntegral,
                target.cv_unqualified(),
                ValueCategory::Prvalue,
            )
        } else if ty.is_integral() && target.is_integral() {
            let conv = if matches!(target.kind, TypeKind::Int)
                && matches!(ty.kind, TypeKind::Bool | TypeKind::Char)
            {
                Conversion::IntegralPromotion
            } else {
                Conversion::IntegralConversion
            };
            self.wrap_conversion(id, conv, target.cv_unqualified(), ValueCategory::Prvalue)
        } else {
            id
        };

        // Stage 3
        let ty = self.expr_type(id);
        if !ty.same(target) && ty.is_cv_convertible(target) {
            self.wrap_conversion(
                id,
                Conversion::Qualification,
                target.clone(),
                ValueCategory::Prvalue,
            )
        } else {
            id
        }
    }

    /// Whether the pipeline reached the target type (top-level cv ignored,
    /// as a prvalue's own qualification is immaterial)
    pub(crate) fn conversion_succeeded(&self, id: ConstructId, target: &Type) -> bool {
        if target.is_reference() {
            return true;
        }
        self.expr_type(id)
            .cv_unqualified()
            .same(&target.cv_unqualified())
    }

    fn pointer_upcast_applies(&self, from: &Type, target: &Type) -> bool {
        is_sub_type(
            &from.cv_unqualified(),
            &target.cv_unqualified(),
            &self.symbols,
        )
    }

    /// Contextual conversion to `bool`
    pub(crate) fn convert_to_bool(&mut self, id: ConstructId) -> ConstructId {
        self.standard_conversion(id, &Type::bool_())
    }

    /// Usual arithmetic conversions: bring both operands to a common
    /// arithmetic type (double > float > size_t > int)
    pub(crate) fn usual_arithmetic_conversions(
        &mut self,
        lhs: ConstructId,
        rhs: ConstructId,
    ) -> (ConstructId, ConstructId, Type) {
        let lt = self.expr_type(lhs);
        let rt = self.expr_type(rhs);
        let common = if matches!(lt.kind, TypeKind::Double) || matches!(rt.kind, TypeKind::Double) {
            Type::double()
        } else if matches!(lt.kind, TypeKind::Float) || matches!(rt.kind, TypeKind::Float) {
            Type::float()
        } else if matches!(lt.kind, TypeKind::SizeT) || matches!(rt.kind, TypeKind::SizeT) {
            Type::size_t()
        } else {
            Type::int()
        };
        let lhs = self.standard_conversion(lhs, &common);
        let rhs = self.standard_conversion(rhs, &common);
        (lhs, rhs, common)
    }
}
