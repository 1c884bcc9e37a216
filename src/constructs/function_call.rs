//! Function calls and overload resolution
//!
//! Overload resolution is deliberately simple: a candidate is viable when
//! the arity matches and every parameter either is reference-compatible
//! with its argument (reference parameters) or admits a standard conversion
//! from the argument's declared static type. The *first* viable candidate
//! in declaration order wins; no ranking of conversion quality is
//! performed, so ambiguity between equally-good overloads is never
//! detected. The simplification is visible on purpose.

use super::{
    Compiler, ConstructId, ConstructKind, ExprKind, Expression, FunctionCall, InitForm, NoteKind,
    ValueCategory,
};
use crate::ast;
use crate::entities::{
    Entity, EntityId, EntityKind, FunctionInfo, FunctionKind, LookupOptions, LookupResult,
};
use crate::types::{is_reference_compatible, FunctionSignature, Type};

impl Compiler {
    /// Declare the engine-provided functions (currently `assert(bool)`)
    pub(crate) fn declare_builtins(&mut self) {
        let signature = FunctionSignature {
            return_type: Type::void(),
            params: vec![Type::bool_()],
            receiver_const: None,
        };
        let global = self.symbols.global_scope();
        self.symbols
            .declare_function(
                global,
                Entity {
                    name: "assert".to_string(),
                    ty: Type::function(signature.clone()),
                    kind: EntityKind::Function(FunctionInfo {
                        signature,
                        kind: FunctionKind::BuiltinAssert,
                        defined: true,
                    }),
                },
            )
            .expect("builtin declaration cannot conflict in a fresh table");
    }

    /// An auxiliary expression carrying only a type and value category, used
    /// to probe conversions during overload resolution
    pub(crate) fn make_auxiliary(&mut self, ty: Type, category: ValueCategory) -> ConstructId {
        self.add_construct(
            ConstructKind::Expr(Expression {
                ty,
                category,
                kind: ExprKind::Auxiliary,
            }),
            true,
        )
    }

    /// First-viable overload resolution (see module docs). `candidates` is
    /// the overload group in declaration order.
    pub(crate) fn resolve_overload(
        &mut self,
        candidates: &[EntityId],
        args: &[(Type, ValueCategory)],
    ) -> Option<EntityId> {
        'candidates: for &candidate in candidates {
            let signature = self
                .symbols
                .entity(candidate)
                .function_info()
                .signature
                .clone();
            if signature.params.len() != args.len() {
                continue;
            }
            for (param, (arg_ty, arg_cat)) in signature.params.iter().zip(args) {
                if param.is_reference() {
                    let referent = param.pointee().expect("reference type has a referent");
                    if !is_reference_compatible(referent, arg_ty, &self.symbols) {
                        continue 'candidates;
                    }
                } else {
                    let probe = self.make_auxiliary(arg_ty.clone(), *arg_cat);
                    let converted = self.standard_conversion(probe, param);
                    if !self.conversion_succeeded(converted, param) {
                        continue 'candidates;
                    }
                }
            }
            return Some(candidate);
        }
        None
    }

    /// Build a compiled call to `function`.
    ///
    /// Validates arity and receiver const-correctness, then routes every
    /// argument through a `DirectInitializer` against a synthetic parameter
    /// entity so by-value copies and by-reference binding share one
    /// implementation. Registers a temporary return slot for non-void,
    /// non-reference object returns.
    pub(crate) fn build_function_call(
        &mut self,
        function: EntityId,
        arg_exprs: Vec<ConstructId>,
        receiver: Option<ConstructId>,
    ) -> ConstructId {
        let info = self.symbols.entity(function).function_info().clone();
        let name = self.symbols.entity(function).name.clone();

        let call = self.add_construct(
            ConstructKind::Call(FunctionCall {
                function,
                arg_inits: Vec::new(),
                receiver,
                return_slot: None,
            }),
            false,
        );

        if info.signature.params.len() != arg_exprs.len() {
            self.error(
                call,
                NoteKind::ArityMismatch {
                    name,
                    expected: info.signature.params.len(),
                    got: arg_exprs.len(),
                },
            );
            for arg in arg_exprs {
                self.attach(arg, call);
            }
            if let Some(r) = receiver {
                self.attach(r, call);
            }
            return call;
        }

        if let Some(recv) = receiver {
            let recv_ty = self.expr_type(recv);
            if recv_ty.is_const && info.signature.receiver_const == Some(false) {
                self.error(call, NoteKind::ConstReceiver { name: name.clone() });
            }
            self.attach(recv, call);
        }

        let mut arg_inits = Vec::with_capacity(arg_exprs.len());
        for (index, (param_ty, arg)) in info
            .signature
            .params
            .clone()
            .into_iter()
            .zip(arg_exprs)
            .enumerate()
        {
            let kind = if param_ty.is_reference() {
                EntityKind::ParameterByReference { index }
            } else {
                EntityKind::ParameterByValue { index }
            };
            let param_entity = self.symbols.add_entity(Entity {
                name: format!("<{}:param{}>", name, index),
                ty: param_ty,
                kind,
            });
            let init = self.build_initializer(param_entity, InitForm::Direct, vec![arg]);
            self.attach(init, call);
            arg_inits.push(init);
        }

        let return_type = info.signature.return_type.clone();
        let return_slot = if !return_type.is_void() && !return_type.is_reference() {
            Some(self.create_temporary(call, return_type))
        } else {
            None
        };

        match &mut self.constructs[call].kind {
            ConstructKind::Call(fc) => {
                fc.arg_inits = arg_inits;
                fc.return_slot = return_slot;
            }
            _ => unreachable!(),
        }
        call
    }

    /// Compile `name(args...)`: resolve the overload group and wrap the call
    /// in a call expression of the function's return type
    pub(crate) fn compile_call_by_name(
        &mut self,
        name: &str,
        args: &[ast::Expression],
    ) -> ConstructId {
        let group = match self
            .symbols
            .lookup(self.current_scope, name, LookupOptions::default())
        {
            LookupResult::Functions(group) => group,
            LookupResult::NotFound => {
                return self.error_expr(NoteKind::UnknownName {
                    name: name.to_string(),
                })
            }
            _ => {
                return self.error_expr(NoteKind::NotAFunction {
                    name: name.to_string(),
                })
            }
        };

        let arg_exprs: Vec<ConstructId> =
            args.iter().map(|a| self.compile_expression(a)).collect();
        let arg_types: Vec<(Type, ValueCategory)> = arg_exprs
            .iter()
            .map(|&a| (self.expr_type(a), self.expr_category(a)))
            .collect();

        match self.resolve_overload(&group, &arg_types) {
            Some(function) => {
                let call = self.build_function_call(function, arg_exprs, None);
                self.wrap_call_expression(call, function)
            }
            None => {
                let node = self.error_expr(NoteKind::NoMatchingFunction {
                    name: name.to_string(),
                });
                for arg in arg_exprs {
                    self.attach(arg, node);
                }
                node
            }
        }
    }

    /// Compile `object.name(args...)`
    pub(crate) fn compile_method_call(
        &mut self,
        object: &ast::Expression,
        name: &str,
        args: &[ast::Expression],
    ) -> ConstructId {
        let object = self.compile_expression(object);
        let object_ty = self.expr_type(object);
        let class = match object_ty.as_class() {
            Some(c) => c,
            None => {
                let node = self.error_expr(NoteKind::NotAFunction {
                    name: name.to_string(),
                });
                self.attach(object, node);
                return node;
            }
        };
        let class_scope = self.symbols.class(class).scope;
        let group = match self.symbols.lookup(
            class_scope,
            name,
            LookupOptions {
                own_scope_only: true,
            },
        ) {
            LookupResult::Functions(group) => group,
            _ => {
                let class_name = self.symbols.class(class).name.clone();
                let node = self.error_expr(NoteKind::UnknownMember {
                    class: class_name,
                    member: name.to_string(),
                });
                self.attach(object, node);
                return node;
            }
        };

        let arg_exprs: Vec<ConstructId> =
            args.iter().map(|a| self.compile_expression(a)).collect();
        let arg_types: Vec<(Type, ValueCategory)> = arg_exprs
            .iter()
            .map(|&a| (self.expr_type(a), self.expr_category(a)))
            .collect();

        match self.resolve_overload(&group, &arg_types) {
            Some(function) => {
                let call = self.build_function_call(function, arg_exprs, Some(object));
                self.wrap_call_expression(call, function)
            }
            None => {
                let node = self.error_expr(NoteKind::NoMatchingFunction {
                    name: name.to_string(),
                });
                self.attach(object, node);
                for arg in arg_exprs {
                    self.attach(arg, node);
                }
                node
            }
        }
    }

    /// Wrap a call construct in a call expression with the callee's return
    /// type and value category
    fn wrap_call_expression(&mut self, call: ConstructId, function: EntityId) -> ConstructId {
        let return_type = self
            .symbols
            .entity(function)
            .function_info()
            .signature
            .return_type
            .clone();
        let (ty, category) = if return_type.is_reference() {
            (
                return_type.strip_reference().clone(),
                ValueCategory::Lvalue,
            )
        } else {
            (return_type, ValueCategory::Prvalue)
        };
        let node = self.make_expr(ty, category, ExprKind::Call(call));
        self.attach(call, node);
        node
    }

    /// Compile the destructor call used when a deallocator destroys a
    /// class-type object. Returns `None` for non-class types (a plain
    /// deallocation with no call); a class without a destructor is a compile
    /// error, never silently skipped.
    pub(crate) fn build_cleanup_destructor_call(
        &mut self,
        owner: ConstructId,
        ty: &Type,
    ) -> Option<ConstructId> {
        let class = ty.as_class()?;
        match self.symbols.class(class).destructor {
            Some(dtor) => {
                let call = self.build_function_call(dtor, Vec::new(), None);
                self.attach(call, owner);
                Some(call)
            }
            None => {
                let class_name = self.symbols.class(class).name.clone();
                self.error(owner, NoteKind::NoDestructor { class: class_name });
                None
            }
        }
    }

    /// Final pass: every called function must have been linked to a
    /// definition by the end of the unit
    pub(crate) fn check_all_used_functions_defined(&mut self) {
        let mut undefined = Vec::new();
        for (id, construct) in self.constructs.iter().enumerate() {
            if let ConstructKind::Call(fc) = &construct.kind {
                let info = self.symbols.entity(fc.function).function_info();
                if !info.defined {
                    undefined.push((id, self.symbols.entity(fc.function).name.clone()));
                }
            }
        }
        for (id, name) in undefined {
            self.error(id, NoteKind::FunctionNotDefined { name });
        }
    }
}
