//! The C++ type system
//!
//! This module defines [`Type`], the immutable, structurally-comparable value
//! type used everywhere in the engine, plus the derived relations the
//! compilation pipeline needs:
//!
//! - [`Type::same`]: structural identity including cv-qualification
//! - [`Type::similar`]: structural identity ignoring cv-qualification
//! - [`Type::is_cv_convertible`]: qualification-conversion legality
//! - [`is_reference_compatible`] / [`is_sub_type`]: reference binding and
//!   class-hierarchy covariance
//!
//! # Type Sizes
//!
//! Unlike real C++, the engine uses fixed, platform-independent sizes:
//! - `bool`, `char`: 1 byte
//! - `int`, `float`: 4 bytes
//! - `double`, `size_t`, pointers: 8 bytes
//! - arrays and classes: sum of their parts (no padding or alignment)
//!
//! # Immutability
//!
//! Types are value objects. A cv-qualified variant of a type is produced by
//! copy ([`Type::with_const`], [`Type::cv_unqualified`]), never by mutating
//! an existing type in place.

/// Index of a class definition in the compilation's class table
pub type ClassId = usize;

/// Access to the class hierarchy, implemented by the symbol table
///
/// The type system itself stores no class data; derived-to-base checks and
/// class sizes are answered by whoever owns the class definitions.
pub trait ClassHierarchy {
    /// The direct base of `class`, if any
    fn direct_base(&self, class: ClassId) -> Option<ClassId>;

    /// Size of a class in bytes (sum of base and member sizes)
    fn class_size(&self, class: ClassId) -> usize;

    /// Walk the base chain: is `base` a (possibly indirect) base of `derived`?
    fn is_base_of(&self, base: ClassId, derived: ClassId) -> bool {
        let mut current = derived;
        while let Some(b) = self.direct_base(current) {
            if b == base {
                return true;
            }
            current = b;
        }
        false
    }
}

/// The structural part of a type, without cv-qualification
#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    Void,
    Bool,
    Char,
    Int,
    SizeT,
    Float,
    Double,
    Pointer(Box<Type>),
    Reference(Box<Type>),
    BoundedArray(Box<Type>, usize),
    ArrayOfUnknownBound(Box<Type>),
    Class(ClassId),
    Function(Box<FunctionSignature>),
}

/// Signature of a function type: return type, parameter types, and (for
/// non-static member functions) whether the receiver is const
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSignature {
    pub return_type: Type,
    pub params: Vec<Type>,
    pub receiver_const: Option<bool>,
}

/// A C++ type: a [`TypeKind`] plus const/volatile flags
///
/// Every level of a compound type carries its own cv flags, e.g.
/// `const int* const` is `Pointer(const Int)` with `is_const` set on the
/// outer pointer type as well.
#[derive(Debug, Clone, PartialEq)]
pub struct Type {
    pub kind: TypeKind,
    pub is_const: bool,
    pub is_volatile: bool,
}

impl Type {
    pub fn new(kind: TypeKind) -> Self {
        Type {
            kind,
            is_const: false,
            is_volatile: false,
        }
    }

    pub fn void() -> Self {
        Type::new(TypeKind::Void)
    }

    pub fn bool_() -> Self {
        Type::new(TypeKind::Bool)
    }

    pub fn char_() -> Self {
        Type::new(TypeKind::Char)
    }

    pub fn int() -> Self {
        Type::new(TypeKind::Int)
    }

    pub fn size_t() -> Self {
        Type::new(TypeKind::SizeT)
    }

    pub fn float() -> Self {
        Type::new(TypeKind::Float)
    }

    pub fn double() -> Self {
        Type::new(TypeKind::Double)
    }

    pub fn class(id: ClassId) -> Self {
        Type::new(TypeKind::Class(id))
    }

    pub fn pointer_to(pointee: Type) -> Self {
        Type::new(TypeKind::Pointer(Box::new(pointee)))
    }

    pub fn reference_to(referent: Type) -> Self {
        Type::new(TypeKind::Reference(Box::new(referent)))
    }

    pub fn bounded_array(element: Type, length: usize) -> Self {
        Type::new(TypeKind::BoundedArray(Box::new(element), length))
    }

    pub fn array_of_unknown_bound(element: Type) -> Self {
        Type::new(TypeKind::ArrayOfUnknownBound(Box::new(element)))
    }

    pub fn function(sig: FunctionSignature) -> Self {
        Type::new(TypeKind::Function(Box::new(sig)))
    }

    /// Copy of this type with `const` added
    pub fn with_const(mut self) -> Self {
        self.is_const = true;
        self
    }

    /// Copy of this type with `volatile` added
    pub fn with_volatile(mut self) -> Self {
        self.is_volatile = true;
        self
    }

    /// Copy of this type with the outermost cv-qualification removed
    pub fn cv_unqualified(&self) -> Self {
        Type {
            kind: self.kind.clone(),
            is_const: false,
            is_volatile: false,
        }
    }

    /// Copy of this type with the given outermost cv-qualification
    pub fn with_cv(&self, is_const: bool, is_volatile: bool) -> Self {
        Type {
            kind: self.kind.clone(),
            is_const,
            is_volatile,
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self.kind, TypeKind::Void)
    }

    pub fn is_bool(&self) -> bool {
        matches!(self.kind, TypeKind::Bool)
    }

    /// Integral types: `bool`, `char`, `int`, `size_t`
    pub fn is_integral(&self) -> bool {
        matches!(
            self.kind,
            TypeKind::Bool | TypeKind::Char | TypeKind::Int | TypeKind::SizeT
        )
    }

    pub fn is_floating_point(&self) -> bool {
        matches!(self.kind, TypeKind::Float | TypeKind::Double)
    }

    pub fn is_arithmetic(&self) -> bool {
        self.is_integral() || self.is_floating_point()
    }

    /// Atomic types: arithmetic types and pointers (the types whose objects
    /// store a single raw value)
    pub fn is_atomic(&self) -> bool {
        self.is_arithmetic() || self.is_pointer()
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self.kind, TypeKind::Pointer(_))
    }

    pub fn is_reference(&self) -> bool {
        matches!(self.kind, TypeKind::Reference(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(
            self.kind,
            TypeKind::BoundedArray(..) | TypeKind::ArrayOfUnknownBound(_)
        )
    }

    pub fn is_class(&self) -> bool {
        matches!(self.kind, TypeKind::Class(_))
    }

    pub fn is_function(&self) -> bool {
        matches!(self.kind, TypeKind::Function(_))
    }

    /// Object types: everything but void, references, and function types
    pub fn is_object_type(&self) -> bool {
        !self.is_void() && !self.is_reference() && !self.is_function()
    }

    pub fn as_class(&self) -> Option<ClassId> {
        match self.kind {
            TypeKind::Class(id) => Some(id),
            _ => None,
        }
    }

    /// Pointee type of a pointer, referent of a reference
    pub fn pointee(&self) -> Option<&Type> {
        match &self.kind {
            TypeKind::Pointer(t) | TypeKind::Reference(t) => Some(t),
            _ => None,
        }
    }

    /// Element type of an array
    pub fn element_type(&self) -> Option<&Type> {
        match &self.kind {
            TypeKind::BoundedArray(t, _) | TypeKind::ArrayOfUnknownBound(t) => Some(t),
            _ => None,
        }
    }

    /// Length of a bounded array
    pub fn array_length(&self) -> Option<usize> {
        match self.kind {
            TypeKind::BoundedArray(_, n) => Some(n),
            _ => None,
        }
    }

    /// The referent type if this is a reference, otherwise the type itself
    pub fn strip_reference(&self) -> &Type {
        match &self.kind {
            TypeKind::Reference(t) => t,
            _ => self,
        }
    }

    /// Size in bytes under the engine's fixed layout rules
    pub fn size_of(&self, classes: &dyn ClassHierarchy) -> usize {
        match &self.kind {
            TypeKind::Void => 0,
            TypeKind::Bool | TypeKind::Char => 1,
            TypeKind::Int | TypeKind::Float => 4,
            TypeKind::SizeT | TypeKind::Double => 8,
            TypeKind::Pointer(_) | TypeKind::Reference(_) => 8,
            TypeKind::BoundedArray(elem, n) => elem.size_of(classes) * n,
            TypeKind::ArrayOfUnknownBound(_) => 0,
            TypeKind::Class(id) => classes.class_size(*id),
            TypeKind::Function(_) => 0,
        }
    }

    /// Structural identity including cv-qualification at every level
    pub fn same(&self, other: &Type) -> bool {
        self.is_const == other.is_const
            && self.is_volatile == other.is_volatile
            && match (&self.kind, &other.kind) {
                (TypeKind::Pointer(a), TypeKind::Pointer(b)) => a.same(b),
                (TypeKind::Reference(a), TypeKind::Reference(b)) => a.same(b),
                (TypeKind::BoundedArray(a, n), TypeKind::BoundedArray(b, m)) => {
                    n == m && a.same(b)
                }
                (TypeKind::ArrayOfUnknownBound(a), TypeKind::ArrayOfUnknownBound(b)) => a.same(b),
                (TypeKind::Function(a), TypeKind::Function(b)) => {
                    a.receiver_const == b.receiver_const
                        && a.return_type.same(&b.return_type)
                        && a.params.len() == b.params.len()
                        && a.params.iter().zip(&b.params).all(|(x, y)| x.same(y))
                }
                (a, b) => a == b,
            }
    }

    /// Structural identity ignoring cv-qualification at every level
    pub fn similar(&self, other: &Type) -> bool {
        match (&self.kind, &other.kind) {
            (TypeKind::Pointer(a), TypeKind::Pointer(b)) => a.similar(b),
            (TypeKind::Reference(a), TypeKind::Reference(b)) => a.similar(b),
            (TypeKind::BoundedArray(a, n), TypeKind::BoundedArray(b, m)) => {
                n == m && a.similar(b)
            }
            (TypeKind::ArrayOfUnknownBound(a), TypeKind::ArrayOfUnknownBound(b)) => a.similar(b),
            (TypeKind::Function(a), TypeKind::Function(b)) => {
                a.receiver_const == b.receiver_const
                    && a.return_type.similar(&b.return_type)
                    && a.params.len() == b.params.len()
                    && a.params.iter().zip(&b.params).all(|(x, y)| x.similar(y))
            }
            (a, b) => a == b,
        }
    }

    /// More cv-qualified than (or equally qualified as) `other`, at the
    /// outermost level only
    pub fn is_at_least_as_cv_qualified(&self, other: &Type) -> bool {
        (self.is_const || !other.is_const) && (self.is_volatile || !other.is_volatile)
    }

    /// Qualification-conversion legality: `self` is convertible to `other`
    /// iff the two are similar and const is only ever added (monotonically)
    /// along the compound-type chain, disregarding the outermost level.
    pub fn is_cv_convertible(&self, other: &Type) -> bool {
        if !self.similar(other) {
            return false;
        }
        let (mut a, mut b) = (self, other);
        // The outermost level is discarded: a prvalue's own cv is immaterial.
        loop {
            match (a.pointee(), b.pointee()) {
                (Some(pa), Some(pb)) => {
                    if !pb.is_at_least_as_cv_qualified(pa) {
                        return false;
                    }
                    a = pa;
                    b = pb;
                }
                _ => return true,
            }
        }
    }
}

/// `from` refers to the same type as `target`, or to a class derived from it
/// (cv-qualification at the top level ignored)
pub fn is_reference_related(target: &Type, from: &Type, classes: &dyn ClassHierarchy) -> bool {
    let t = target.cv_unqualified();
    let f = from.cv_unqualified();
    if t.same(&f) {
        return true;
    }
    match (t.as_class(), f.as_class()) {
        (Some(base), Some(derived)) => classes.is_base_of(base, derived),
        _ => false,
    }
}

/// A reference to `target` can bind directly to a glvalue of type `from`:
/// reference-related, and `target` at least as cv-qualified as `from`
pub fn is_reference_compatible(target: &Type, from: &Type, classes: &dyn ClassHierarchy) -> bool {
    is_reference_related(target, from, classes) && target.is_at_least_as_cv_qualified(from)
}

/// Class-hierarchy covariance for pointers and references: same
/// cv-qualification, pointee classes related derived-to-base
pub fn is_sub_type(from: &Type, to: &Type, classes: &dyn ClassHierarchy) -> bool {
    if from.same(to) {
        return true;
    }
    let (fp, tp) = match (from.pointee(), to.pointee()) {
        (Some(f), Some(t)) => (f, t),
        _ => return false,
    };
    if from.is_pointer() != to.is_pointer() || from.is_reference() != to.is_reference() {
        return false;
    }
    if fp.is_const != tp.is_const || fp.is_volatile != tp.is_volatile {
        return false;
    }
    match (fp.as_class(), tp.as_class()) {
        (Some(derived), Some(base)) => derived == base || classes.is_base_of(base, derived),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoClasses;
    impl ClassHierarchy for NoClasses {
        fn direct_base(&self, _: ClassId) -> Option<ClassId> {
            None
        }
        fn class_size(&self, _: ClassId) -> usize {
            0
        }
    }

    #[test]
    fn same_is_reflexive_and_structural() {
        let tys = [
            Type::int(),
            Type::char_().with_const(),
            Type::pointer_to(Type::int().with_const()),
            Type::bounded_array(Type::char_(), 5),
            Type::reference_to(Type::double()),
        ];
        for t in &tys {
            assert!(t.same(t));
        }
        assert!(!Type::int().same(&Type::int().with_const()));
        // Stripping cv from an already-unqualified type is the identity.
        let t = Type::int();
        assert!(t.same(&t.with_cv(false, false)));
    }

    #[test]
    fn similar_ignores_cv_at_every_level() {
        let a = Type::pointer_to(Type::int().with_const()).with_const();
        let b = Type::pointer_to(Type::int());
        assert!(a.similar(&b));
        assert!(!a.same(&b));
        assert!(!a.similar(&Type::pointer_to(Type::char_())));
    }

    #[test]
    fn cv_convertible_adds_const_monotonically() {
        // int* -> const int* is fine
        let from = Type::pointer_to(Type::int());
        let to = Type::pointer_to(Type::int().with_const());
        assert!(from.is_cv_convertible(&to));
        // const int* -> int* is not
        assert!(!to.is_cv_convertible(&from));
        // outermost level is discarded
        let from = Type::pointer_to(Type::int()).with_const();
        let to = Type::pointer_to(Type::int());
        assert!(from.is_cv_convertible(&to));
    }

    #[test]
    fn reference_compatibility_respects_cv() {
        let classes = NoClasses;
        assert!(is_reference_compatible(
            &Type::int().with_const(),
            &Type::int(),
            &classes
        ));
        assert!(!is_reference_compatible(
            &Type::int(),
            &Type::int().with_const(),
            &classes
        ));
    }

    #[test]
    fn fixed_sizes() {
        let classes = NoClasses;
        assert_eq!(Type::char_().size_of(&classes), 1);
        assert_eq!(Type::int().size_of(&classes), 4);
        assert_eq!(Type::double().size_of(&classes), 8);
        assert_eq!(Type::pointer_to(Type::void()).size_of(&classes), 8);
        assert_eq!(Type::bounded_array(Type::int(), 3).size_of(&classes), 12);
    }
}
