//! Initializer selection
//!
//! An initializer is picked by a pure function of the target's static type
//! shape (reference, atomic, array, class) crossed with the requested form
//! (default, value, direct, list). Fixed policies:
//!
//! - references can only be direct-initialized; default and value forms are
//!   always ill-formed
//! - array direct initialization is legal only for a `char` array from a
//!   single string literal no longer than the array (null-padded)
//! - class default/value initialization overload-resolves a zero-argument
//!   constructor; direct initialization resolves against the argument types;
//!   list initialization is lowered to direct
//! - list initialization of a reference or atomic target is always rejected

use super::{
    Compiler, ConstructId, ConstructKind, ExprKind, InitForm, InitKind, Initializer, NoteKind,
    ValueCategory,
};
use crate::entities::EntityId;
use crate::types::{is_reference_compatible, ClassId, Type, TypeKind};

impl Compiler {
    /// Build the initializer construct for `target` from already-compiled
    /// argument expressions. Selection failures leave an [`InitKind::IllFormed`]
    /// node carrying the error note; the caller's subtree is poisoned but
    /// compilation continues.
    pub(crate) fn build_initializer(
        &mut self,
        target: EntityId,
        form: InitForm,
        args: Vec<ConstructId>,
    ) -> ConstructId {
        let ty = self.symbols.entity(target).ty.clone();
        self.build_initializer_of_type(target, &ty, form, args)
    }

    /// As [`build_initializer`](Self::build_initializer), but against an
    /// explicit type. Array element initializers reuse the array's entity as
    /// their target: the runtime injects the actual element object when the
    /// aggregate runs.
    fn build_initializer_of_type(
        &mut self,
        target: EntityId,
        ty: &Type,
        form: InitForm,
        args: Vec<ConstructId>,
    ) -> ConstructId {
        let init = self.add_construct(
            ConstructKind::Init(Initializer {
                target,
                form,
                kind: InitKind::IllFormed,
            }),
            false,
        );
        let kind = if ty.is_reference() {
            self.reference_init(init, ty, form, args)
        } else if ty.is_atomic() {
            self.atomic_init(init, ty, form, args)
        } else if let TypeKind::BoundedArray(elem, len) = &ty.kind {
            let elem = (**elem).clone();
            self.array_init(init, target, &elem, *len, form, args)
        } else if let Some(class) = ty.as_class() {
            self.class_init(init, class, form, args)
        } else {
            let name = self.symbols.entity(target).name.clone();
            self.error(init, NoteKind::IncompleteType { name });
            self.attach_all(args, init);
            InitKind::IllFormed
        };
        match &mut self.constructs[init].kind {
            ConstructKind::Init(i) => i.kind = kind,
            _ => unreachable!(),
        }
        init
    }

    fn attach_all(&mut self, args: Vec<ConstructId>, parent: ConstructId) {
        for arg in args {
            self.attach(arg, parent);
        }
    }

    fn reference_init(
        &mut self,
        init: ConstructId,
        ty: &Type,
        form: InitForm,
        args: Vec<ConstructId>,
    ) -> InitKind {
        match form {
            InitForm::Default => {
                self.error(init, NoteKind::ReferenceDefaultInit);
                self.attach_all(args, init);
                InitKind::IllFormed
            }
            InitForm::Value => {
                self.error(init, NoteKind::ReferenceValueInit);
                self.attach_all(args, init);
                InitKind::IllFormed
            }
            InitForm::List => {
                self.error(init, NoteKind::ReferenceListInit);
                self.attach_all(args, init);
                InitKind::IllFormed
            }
            InitForm::Direct => {
                if args.len() != 1 {
                    let target = self.type_name(ty);
                    self.error(init, NoteKind::SingleInitializerRequired { target });
                    self.attach_all(args, init);
                    return InitKind::IllFormed;
                }
                let source = args[0];
                let referent = ty.pointee().expect("reference type has a referent").clone();
                let source_ty = self.expr_type(source);
                let source_cat = self.expr_category(source);

                if source_cat == ValueCategory::Lvalue
                    && is_reference_compatible(&referent, &source_ty, &self.symbols)
                {
                    self.attach(source, init);
                    return InitKind::ReferenceBind { source };
                }

                // A const reference may bind to a materialized temporary
                // holding the converted value.
                if referent.is_const {
                    let value_ty = referent.cv_unqualified();
                    let converted = self.standard_conversion(source, &value_ty);
                    if self.conversion_succeeded(converted, &value_ty) {
                        let temp = self.create_temporary(init, value_ty.clone());
                        let materialized = self.make_expr(
                            value_ty,
                            ValueCategory::Lvalue,
                            ExprKind::MaterializeTemporary {
                                operand: converted,
                                temp,
                            },
                        );
                        self.attach(converted, materialized);
                        self.attach(materialized, init);
                        return InitKind::ReferenceBind {
                            source: materialized,
                        };
                    }
                    self.attach(converted, init);
                } else {
                    self.attach(source, init);
                }
                self.error(
                    init,
                    NoteKind::ReferenceBindFailed {
                        target: self.type_name(ty),
                        from: self.type_name(&source_ty),
                    },
                );
                InitKind::IllFormed
            }
        }
    }

    fn atomic_init(
        &mut self,
        init: ConstructId,
        ty: &Type,
        form: InitForm,
        args: Vec<ConstructId>,
    ) -> InitKind {
        match form {
            InitForm::Default => InitKind::AtomicDefault,
            InitForm::Value => InitKind::AtomicValue,
            InitForm::List => {
                let target = self.type_name(ty);
                self.error(init, NoteKind::AtomicListInit { target });
                self.attach_all(args, init);
                InitKind::IllFormed
            }
            InitForm::Direct => {
                if args.len() != 1 {
                    let target = self.type_name(ty);
                    self.error(init, NoteKind::SingleInitializerRequired { target });
                    self.attach_all(args, init);
                    return InitKind::IllFormed;
                }
                let source = args[0];
                let source_ty = self.expr_type(source);
                let value_ty = ty.cv_unqualified();
                let converted = self.standard_conversion(source, &value_ty);
                self.attach(converted, init);
                if self.conversion_succeeded(converted, &value_ty) {
                    InitKind::AtomicDirect { source: converted }
                } else {
                    self.error(
                        init,
                        NoteKind::ConversionFailed {
                            from: self.type_name(&source_ty),
                            to: self.type_name(ty),
                        },
                    );
                    InitKind::IllFormed
                }
            }
        }
    }

    fn array_init(
        &mut self,
        init: ConstructId,
        target: EntityId,
        elem: &Type,
        len: usize,
        form: InitForm,
        args: Vec<ConstructId>,
    ) -> InitKind {
        match form {
            InitForm::Default | InitForm::Value => {
                let mut elem_inits = Vec::with_capacity(len);
                for _ in 0..len {
                    let child = self.build_initializer_of_type(target, elem, form, Vec::new());
                    self.attach(child, init);
                    elem_inits.push(child);
                }
                InitKind::ArrayAggregate { elem_inits }
            }
            InitForm::Direct => {
                let is_char_array = matches!(elem.kind, TypeKind::Char);
                let literal_len = if args.len() == 1 {
                    match &self.expr_ref(args[0]).kind {
                        ExprKind::StringLiteral(s) => Some(s.len()),
                        _ => None,
                    }
                } else {
                    None
                };
                match literal_len {
                    Some(literal_len) if is_char_array => {
                        let literal = args[0];
                        self.attach(literal, init);
                        if literal_len > len {
                            self.error(
                                init,
                                NoteKind::StringLiteralTooLong {
                                    literal_len,
                                    array_len: len,
                                },
                            );
                            InitKind::IllFormed
                        } else {
                            InitKind::ArrayFromStringLiteral { literal }
                        }
                    }
                    _ => {
                        self.error(init, NoteKind::ArrayDirectInit);
                        self.attach_all(args, init);
                        InitKind::IllFormed
                    }
                }
            }
            InitForm::List => {
                if args.len() > len {
                    self.error(
                        init,
                        NoteKind::TooManyInitializers {
                            supplied: args.len(),
                            capacity: len,
                        },
                    );
                    self.attach_all(args, init);
                    return InitKind::IllFormed;
                }
                let mut elem_inits = Vec::with_capacity(len);
                let supplied = args.len();
                for arg in args {
                    let child =
                        self.build_initializer_of_type(target, elem, InitForm::Direct, vec![arg]);
                    self.attach(child, init);
                    elem_inits.push(child);
                }
                for _ in supplied..len {
                    let child =
                        self.build_initializer_of_type(target, elem, InitForm::Value, Vec::new());
                    self.attach(child, init);
                    elem_inits.push(child);
                }
                InitKind::ArrayAggregate { elem_inits }
            }
        }
    }

    fn class_init(
        &mut self,
        init: ConstructId,
        class: ClassId,
        form: InitForm,
        args: Vec<ConstructId>,
    ) -> InitKind {
        let definition = self.symbols.class(class);
        let class_name = definition.name.clone();
        if !definition.complete {
            self.error(init, NoteKind::IncompleteType { name: class_name });
            self.attach_all(args, init);
            return InitKind::IllFormed;
        }
        let constructors = definition.constructors.clone();

        // Default and value forms select a zero-argument constructor; the
        // list form is lowered to a direct initialization.
        let args = match form {
            InitForm::Default | InitForm::Value => Vec::new(),
            InitForm::Direct | InitForm::List => args,
        };
        let arg_types: Vec<(Type, ValueCategory)> = args
            .iter()
            .map(|&a| (self.expr_type(a), self.expr_category(a)))
            .collect();

        match self.resolve_overload(&constructors, &arg_types) {
            Some(ctor) => {
                let call = self.build_function_call(ctor, args, None);
                self.attach(call, init);
                InitKind::ClassConstructor { call }
            }
            None => {
                self.error(init, NoteKind::NoViableConstructor { class: class_name });
                self.attach_all(args, init);
                InitKind::IllFormed
            }
        }
    }
}
