//! Statements, function definitions, classes, and the translation unit
//!
//! Compilation is a single pass in declaration order: a name must be declared
//! before it is used, but a function may be declared (body-less) first and
//! defined later. Classes synthesize a default constructor when none is
//! declared and a destructor when none is declared, so every complete class
//! is constructible and destructible.

use super::{
    CompiledFunction, Compiler, ConstructId, ConstructKind, GlobalInit, InitForm, Note, NoteKind,
    ObjectDeallocator, Severity, Statement,
};
use crate::ast;
use crate::entities::{
    Entity, EntityId, EntityKind, FunctionInfo, FunctionKind, LookupOptions, LookupResult, ScopeId,
    ScopeKind,
};
use crate::types::{ClassId, FunctionSignature, Type};
use tracing::trace;

/// Compilation context of the function whose body is being compiled,
/// saved/restored around nested definitions
struct FunctionContext {
    scope: ScopeId,
    return_type: Option<Type>,
    class: Option<ClassId>,
    receiver_const: bool,
    return_entity: Option<EntityId>,
}

impl Compiler {
    fn save_context(&self) -> FunctionContext {
        FunctionContext {
            scope: self.current_scope,
            return_type: self.current_return_type.clone(),
            class: self.current_class,
            receiver_const: self.current_receiver_const,
            return_entity: self.current_return_entity,
        }
    }

    fn restore_context(&mut self, ctx: FunctionContext) {
        self.current_scope = ctx.scope;
        self.current_return_type = ctx.return_type;
        self.current_class = ctx.class;
        self.current_receiver_const = ctx.receiver_const;
        self.current_return_entity = ctx.return_entity;
    }

    /// A diagnostic not attached to any construct
    pub(crate) fn unit_error(&mut self, kind: NoteKind) {
        self.unit_notes.push(Note {
            construct: None,
            severity: Severity::Error,
            kind,
        });
    }

    /// Resolve parser-level type notation against the current scope
    pub(crate) fn resolve_type_spec(&mut self, spec: &ast::TypeSpec) -> Result<Type, NoteKind> {
        Ok(match spec {
            ast::TypeSpec::Void => Type::void(),
            ast::TypeSpec::Bool => Type::bool_(),
            ast::TypeSpec::Char => Type::char_(),
            ast::TypeSpec::Int => Type::int(),
            ast::TypeSpec::SizeT => Type::size_t(),
            ast::TypeSpec::Float => Type::float(),
            ast::TypeSpec::Double => Type::double(),
            ast::TypeSpec::Named(name) => {
                match self
                    .symbols
                    .lookup(self.current_scope, name, LookupOptions::default())
                {
                    LookupResult::Class(entity) => match self.symbols.entity(entity).kind {
                        EntityKind::Class(id) => Type::class(id),
                        _ => unreachable!("class names always resolve to class entities"),
                    },
                    LookupResult::NotFound => {
                        return Err(NoteKind::UnknownName { name: name.clone() })
                    }
                    _ => return Err(NoteKind::NotAClass { name: name.clone() }),
                }
            }
            ast::TypeSpec::Const(inner) => self.resolve_type_spec(inner)?.with_const(),
            ast::TypeSpec::Pointer(inner) => Type::pointer_to(self.resolve_type_spec(inner)?),
            ast::TypeSpec::Reference(inner) => Type::reference_to(self.resolve_type_spec(inner)?),
            ast::TypeSpec::Array(inner, Some(len)) => {
                Type::bounded_array(self.resolve_type_spec(inner)?, *len)
            }
            ast::TypeSpec::Array(inner, None) => {
                Type::array_of_unknown_bound(self.resolve_type_spec(inner)?)
            }
        })
    }

    /// Compile every top-level declaration, best-effort and in order
    pub(crate) fn compile_translation_unit(&mut self, unit: &ast::TranslationUnit) {
        for declaration in &unit.declarations {
            match declaration {
                ast::TopLevelDeclaration::Class(c) => self.compile_class(c),
                ast::TopLevelDeclaration::Function(f) => self.compile_free_function(f),
                ast::TopLevelDeclaration::Global(g) => self.compile_global(g),
            }
        }
    }

    /// `main`: zero parameters, looked up in the global scope only. Its
    /// absence is a unit-level error.
    pub(crate) fn find_main(&mut self) -> Option<EntityId> {
        let found = self.symbols.lookup_exact(
            self.symbols.global_scope(),
            "main",
            &[],
            None,
            LookupOptions {
                own_scope_only: true,
            },
        );
        if found.is_none() {
            self.unit_error(NoteKind::NoMainFunction);
        }
        found
    }

    // ------------------------------------------------------------------
    // Statements

    /// Compile one statement into a statement construct
    pub(crate) fn compile_statement(&mut self, statement: &ast::Statement) -> ConstructId {
        match statement {
            ast::Statement::Expression(e) => {
                let expr = self.compile_expression(e);
                let temp_dealloc = self.seal_full_expression(expr);
                let stmt = self.add_construct(
                    ConstructKind::Stmt(Statement::Expression { expr, temp_dealloc }),
                    false,
                );
                self.attach(expr, stmt);
                if let Some(td) = temp_dealloc {
                    self.attach(td, stmt);
                }
                stmt
            }
            ast::Statement::Declaration(decl) => self.compile_declaration_statement(decl),
            ast::Statement::Return(value) => self.compile_return_statement(value.as_ref()),
            ast::Statement::Block(stmts) => {
                let ctx_scope = self.current_scope;
                self.current_scope =
                    self.symbols
                        .add_scope(ScopeKind::Block, ctx_scope, None);
                let block = self.compile_statements_into_block(stmts);
                self.current_scope = ctx_scope;
                block
            }
        }
    }

    /// Compile a statement list into one block construct, collecting the
    /// locals declared directly in it for scope-exit destruction (in reverse
    /// declaration order). The caller manages the scope.
    pub(crate) fn compile_statements_into_block(
        &mut self,
        stmts: &[ast::Statement],
    ) -> ConstructId {
        self.block_locals.push(Vec::new());
        let compiled: Vec<ConstructId> =
            stmts.iter().map(|s| self.compile_statement(s)).collect();
        let locals = self
            .block_locals
            .pop()
            .expect("block frame pushed above");
        let block = self.add_construct(
            ConstructKind::Stmt(Statement::Block {
                stmts: Vec::new(),
                dealloc: None,
            }),
            false,
        );
        for &stmt in &compiled {
            self.attach(stmt, block);
        }
        let dealloc = self.build_object_deallocator(block, &locals);
        match &mut self.constructs[block].kind {
            ConstructKind::Stmt(Statement::Block { stmts, dealloc: d }) => {
                *stmts = compiled;
                *d = dealloc;
            }
            _ => unreachable!(),
        }
        block
    }

    /// The deallocator destroying `objects` in reverse declaration order;
    /// `None` when there is nothing to destroy
    fn build_object_deallocator(
        &mut self,
        parent: ConstructId,
        objects: &[EntityId],
    ) -> Option<ConstructId> {
        if objects.is_empty() {
            return None;
        }
        let dealloc = self.add_construct(
            ConstructKind::ObjDealloc(ObjectDeallocator {
                objects: Vec::new(),
                destructor_calls: Vec::new(),
            }),
            false,
        );
        let mut destructor_calls = Vec::with_capacity(objects.len());
        for &object in objects {
            let ty = self.symbols.entity(object).ty.clone();
            destructor_calls.push(self.build_cleanup_destructor_call(dealloc, &ty));
        }
        match &mut self.constructs[dealloc].kind {
            ConstructKind::ObjDealloc(od) => {
                od.objects = objects.to_vec();
                od.destructor_calls = destructor_calls;
            }
            _ => unreachable!(),
        }
        self.attach(dealloc, parent);
        Some(dealloc)
    }

    fn compile_declaration_statement(&mut self, decl: &ast::VariableDeclaration) -> ConstructId {
        let ty = match self.resolve_type_spec(&decl.type_spec) {
            Ok(ty) => ty,
            Err(note) => {
                let expr = self.error_expr(note);
                let stmt = self.add_construct(
                    ConstructKind::Stmt(Statement::Expression {
                        expr,
                        temp_dealloc: None,
                    }),
                    false,
                );
                self.attach(expr, stmt);
                return stmt;
            }
        };
        let kind = if ty.is_reference() {
            EntityKind::LocalReference
        } else {
            EntityKind::LocalObject
        };
        let entity = match self.symbols.declare_variable(
            self.current_scope,
            Entity {
                name: decl.name.clone(),
                ty: ty.clone(),
                kind,
            },
        ) {
            Ok(id) => id,
            Err(conflict) => {
                let expr = self.error_expr(NoteKind::Redeclaration(conflict));
                let stmt = self.add_construct(
                    ConstructKind::Stmt(Statement::Expression {
                        expr,
                        temp_dealloc: None,
                    }),
                    false,
                );
                self.attach(expr, stmt);
                return stmt;
            }
        };

        let (form, args) = self.compile_initializer_form(&decl.init);
        let init = self.build_initializer(entity, form, args);
        let temp_dealloc = self.seal_full_expression(init);
        if !ty.is_reference() {
            if let Some(frame) = self.block_locals.last_mut() {
                frame.push(entity);
            }
        }
        let stmt = self.add_construct(
            ConstructKind::Stmt(Statement::Declaration {
                entity,
                init,
                temp_dealloc,
            }),
            false,
        );
        self.attach(init, stmt);
        if let Some(td) = temp_dealloc {
            self.attach(td, stmt);
        }
        stmt
    }

    /// Requested form plus compiled argument expressions
    fn compile_initializer_form(
        &mut self,
        form: &ast::InitializerForm,
    ) -> (InitForm, Vec<ConstructId>) {
        match form {
            ast::InitializerForm::Default => (InitForm::Default, Vec::new()),
            ast::InitializerForm::Value => (InitForm::Value, Vec::new()),
            ast::InitializerForm::Direct(exprs) => (
                InitForm::Direct,
                exprs.iter().map(|e| self.compile_expression(e)).collect(),
            ),
            ast::InitializerForm::List(exprs) => (
                InitForm::List,
                exprs.iter().map(|e| self.compile_expression(e)).collect(),
            ),
        }
    }

    fn compile_return_statement(&mut self, value: Option<&ast::Expression>) -> ConstructId {
        let return_type = self
            .current_return_type
            .clone()
            .expect("return statements only occur inside function bodies");
        let stmt = self.add_construct(
            ConstructKind::Stmt(Statement::Return {
                init: None,
                temp_dealloc: None,
            }),
            false,
        );
        match (return_type.is_void(), value) {
            (true, None) => {}
            (true, Some(e)) => {
                let expr = self.compile_expression(e);
                self.attach(expr, stmt);
                self.error(stmt, NoteKind::ReturnValueInVoidFunction);
            }
            (false, None) => {
                self.error(stmt, NoteKind::MissingReturnValue);
            }
            (false, Some(e)) => {
                let expr = self.compile_expression(e);
                let target = match self.current_return_entity {
                    Some(target) => target,
                    None => {
                        // Reference return: bind a synthetic return-reference
                        // entity to the operand.
                        self.symbols.add_entity(Entity {
                            name: "<return>".to_string(),
                            ty: return_type.clone(),
                            kind: EntityKind::ReturnObject,
                        })
                    }
                };
                let init = self.build_initializer(target, InitForm::Direct, vec![expr]);
                let temp_dealloc = self.seal_full_expression(init);
                self.attach(init, stmt);
                if let Some(td) = temp_dealloc {
                    self.attach(td, stmt);
                }
                match &mut self.constructs[stmt].kind {
                    ConstructKind::Stmt(Statement::Return { init: i, temp_dealloc: t }) => {
                        *i = Some(init);
                        *t = temp_dealloc;
                    }
                    _ => unreachable!(),
                }
            }
        }
        stmt
    }

    // ------------------------------------------------------------------
    // Functions

    fn resolve_parameters(
        &mut self,
        params: &[ast::ParameterDeclaration],
    ) -> Result<Vec<Type>, NoteKind> {
        params
            .iter()
            .map(|p| {
                let ty = self.resolve_type_spec(&p.type_spec)?;
                // Array parameters decay to pointers at the signature level.
                Ok(match ty.element_type() {
                    Some(elem) => Type::pointer_to(elem.clone()),
                    None => ty,
                })
            })
            .collect()
    }

    fn compile_free_function(&mut self, decl: &ast::FunctionDeclaration) {
        let return_type = match self.resolve_type_spec(&decl.return_type) {
            Ok(ty) => ty,
            Err(note) => return self.unit_error(note),
        };
        let params = match self.resolve_parameters(&decl.params) {
            Ok(p) => p,
            Err(note) => return self.unit_error(note),
        };
        let signature = FunctionSignature {
            return_type,
            params,
            receiver_const: None,
        };
        let entity = match self.symbols.declare_function(
            self.symbols.global_scope(),
            Entity {
                name: decl.name.clone(),
                ty: Type::function(signature.clone()),
                kind: EntityKind::Function(FunctionInfo {
                    signature: signature.clone(),
                    kind: FunctionKind::Free,
                    defined: false,
                }),
            },
        ) {
            Ok(id) => id,
            Err(conflict) => return self.unit_error(NoteKind::Redeclaration(conflict)),
        };
        if let Some(body) = &decl.body {
            self.compile_function_definition(entity, &signature, &decl.params, body, None, None);
        }
    }

    /// Compile a function body against its declared entity. For methods and
    /// constructors/destructors `class` carries the receiver context;
    /// constructors additionally pass their member-initializer list.
    fn compile_function_definition(
        &mut self,
        entity: EntityId,
        signature: &FunctionSignature,
        params: &[ast::ParameterDeclaration],
        body: &[ast::Statement],
        class: Option<ClassId>,
        member_initializers: Option<&[(String, Vec<ast::Expression>)]>,
    ) {
        trace!(name = %self.symbols.entity(entity).name, "compiling function body");
        let saved = self.save_context();
        let parent_scope = match class {
            Some(c) => self.symbols.class(c).scope,
            None => self.symbols.global_scope(),
        };
        let scope = self
            .symbols
            .add_scope(ScopeKind::Block, parent_scope, None);
        self.current_scope = scope;
        self.current_class = class;
        self.current_receiver_const = signature.receiver_const == Some(true);
        self.current_return_type = Some(signature.return_type.clone());

        let mut param_entities = Vec::with_capacity(params.len());
        for (index, (param, ty)) in params.iter().zip(&signature.params).enumerate() {
            let kind = if ty.is_reference() {
                EntityKind::ParameterByReference { index }
            } else {
                EntityKind::ParameterByValue { index }
            };
            match self.symbols.declare_variable(
                scope,
                Entity {
                    name: param.name.clone(),
                    ty: ty.clone(),
                    kind,
                },
            ) {
                Ok(id) => param_entities.push(id),
                Err(conflict) => self.unit_error(NoteKind::Redeclaration(conflict)),
            }
        }

        let return_entity = if !signature.return_type.is_void()
            && !signature.return_type.is_reference()
        {
            Some(self.symbols.add_entity(Entity {
                name: "<return>".to_string(),
                ty: signature.return_type.clone(),
                kind: EntityKind::ReturnObject,
            }))
        } else {
            None
        };
        self.current_return_entity = return_entity;

        let is_constructor = matches!(
            self.symbols.entity(entity).function_info().kind,
            FunctionKind::Constructor(_)
        );
        let is_destructor = matches!(
            self.symbols.entity(entity).function_info().kind,
            FunctionKind::Destructor(_)
        );

        let member_inits = if is_constructor {
            self.build_member_initializers(
                class.expect("constructors always carry their class"),
                member_initializers.unwrap_or(&[]),
            )
        } else {
            Vec::new()
        };

        let body = self.compile_statements_into_block(body);

        let member_dealloc = if is_destructor {
            let c = class.expect("destructors always carry their class");
            let definition = self.symbols.class(c);
            // Base subobject first in declaration order, so it is destroyed
            // last when the deallocator runs in reverse.
            let mut objects: Vec<EntityId> = definition.base_entity.into_iter().collect();
            objects.extend(definition.members.iter().copied());
            self.build_object_deallocator(body, &objects)
        } else {
            None
        };

        self.symbols
            .entity_mut(entity)
            .function_info_mut()
            .defined = true;
        self.functions.insert(
            entity,
            CompiledFunction {
                entity,
                params: param_entities,
                return_entity,
                member_inits,
                body,
                member_dealloc,
            },
        );
        self.restore_context(saved);
    }

    /// One initializer per subobject in canonical order: the base subobject,
    /// then data members in declaration order. Subobjects without an entry in
    /// the source initializer list are default-initialized.
    fn build_member_initializers(
        &mut self,
        class: ClassId,
        explicit: &[(String, Vec<ast::Expression>)],
    ) -> Vec<ConstructId> {
        let definition = self.symbols.class(class);
        let base_entity = definition.base_entity;
        let members = definition.members.clone();
        let mut inits = Vec::new();

        if let Some(base) = base_entity {
            let base_name = {
                let base_class = self.symbols.entity(base).ty.as_class();
                base_class.map(|c| self.symbols.class(c).name.clone())
            };
            let explicit_args = base_name.and_then(|name| {
                explicit
                    .iter()
                    .find(|(target, _)| *target == name)
                    .map(|(_, args)| args.clone())
            });
            inits.push(self.build_subobject_initializer(base, explicit_args));
        }
        for member in members {
            let member_name = self.symbols.entity(member).name.clone();
            let explicit_args = explicit
                .iter()
                .find(|(target, _)| *target == member_name)
                .map(|(_, args)| args.clone());
            inits.push(self.build_subobject_initializer(member, explicit_args));
        }
        inits
    }

    /// A declaration-like statement wrapping one subobject initializer, so
    /// member initialization runs through the same stepwise machinery as
    /// local declarations
    fn build_subobject_initializer(
        &mut self,
        target: EntityId,
        explicit_args: Option<Vec<ast::Expression>>,
    ) -> ConstructId {
        let (form, args) = match explicit_args {
            Some(exprs) => (
                InitForm::Direct,
                exprs.iter().map(|e| self.compile_expression(e)).collect(),
            ),
            None => (InitForm::Default, Vec::new()),
        };
        let init = self.build_initializer(target, form, args);
        let temp_dealloc = self.seal_full_expression(init);
        let stmt = self.add_construct(
            ConstructKind::Stmt(Statement::Declaration {
                entity: target,
                init,
                temp_dealloc,
            }),
            false,
        );
        self.attach(init, stmt);
        if let Some(td) = temp_dealloc {
            self.attach(td, stmt);
        }
        stmt
    }

    // ------------------------------------------------------------------
    // Classes

    fn compile_class(&mut self, decl: &ast::ClassDeclaration) {
        let base = match &decl.base {
            Some(name) => match self
                .symbols
                .lookup(self.symbols.global_scope(), name, LookupOptions::default())
            {
                LookupResult::Class(entity) => match self.symbols.entity(entity).kind {
                    EntityKind::Class(id) => Some(id),
                    _ => unreachable!(),
                },
                LookupResult::NotFound => {
                    self.unit_error(NoteKind::UnknownName { name: name.clone() });
                    None
                }
                _ => {
                    self.unit_error(NoteKind::NotAClass { name: name.clone() });
                    None
                }
            },
            None => None,
        };

        let class_id = self.symbols.classes.len();
        let base_scope = base.map(|b| self.symbols.class(b).scope);
        let scope = self.symbols.add_scope(
            ScopeKind::Class(class_id),
            self.symbols.global_scope(),
            base_scope,
        );
        self.symbols.classes.push(crate::entities::ClassDefinition {
            name: decl.name.clone(),
            base,
            scope,
            members: Vec::new(),
            base_entity: None,
            constructors: Vec::new(),
            destructor: None,
            complete: false,
        });
        if let Err(conflict) = self.symbols.declare_class(
            self.symbols.global_scope(),
            Entity {
                name: decl.name.clone(),
                ty: Type::class(class_id),
                kind: EntityKind::Class(class_id),
            },
        ) {
            self.unit_error(NoteKind::Redeclaration(conflict));
            return;
        }

        if let Some(b) = base {
            let base_entity = self.symbols.add_entity(Entity {
                name: "<base>".to_string(),
                ty: Type::class(b),
                kind: EntityKind::BaseSubobject { class: class_id },
            });
            self.symbols.class_mut(class_id).base_entity = Some(base_entity);
        }

        // Object members are indexed by their slot in the object layout,
        // which reference members do not occupy.
        let mut object_index = 0;
        for member in &decl.members {
            let ty = match self.resolve_type_spec(&member.type_spec) {
                Ok(ty) => ty,
                Err(note) => {
                    self.unit_error(note);
                    continue;
                }
            };
            let kind = if ty.is_reference() {
                EntityKind::MemberReference {
                    class: class_id,
                    index: self.symbols.class(class_id).members.len(),
                }
            } else {
                let index = object_index;
                object_index += 1;
                EntityKind::MemberObject {
                    class: class_id,
                    index,
                }
            };
            match self.symbols.declare_variable(
                scope,
                Entity {
                    name: member.name.clone(),
                    ty,
                    kind,
                },
            ) {
                Ok(id) => self.symbols.class_mut(class_id).members.push(id),
                Err(conflict) => self.unit_error(NoteKind::Redeclaration(conflict)),
            }
        }
        self.symbols.class_mut(class_id).complete = true;

        // Declare all special members and methods before compiling any body,
        // so methods can call each other regardless of order.
        let synthesized_default_ctor = decl.constructors.is_empty();
        let constructors: Vec<ast::ConstructorDeclaration> = if synthesized_default_ctor {
            vec![ast::ConstructorDeclaration {
                params: Vec::new(),
                member_initializers: Vec::new(),
                body: Vec::new(),
            }]
        } else {
            decl.constructors.clone()
        };
        let mut ctor_entities = Vec::with_capacity(constructors.len());
        for ctor in &constructors {
            let params = match self.resolve_parameters(&ctor.params) {
                Ok(p) => p,
                Err(note) => {
                    self.unit_error(note);
                    continue;
                }
            };
            let signature = FunctionSignature {
                return_type: Type::void(),
                params,
                receiver_const: None,
            };
            let entity = self.symbols.add_entity(Entity {
                name: decl.name.clone(),
                ty: Type::function(signature.clone()),
                kind: EntityKind::Function(FunctionInfo {
                    signature,
                    kind: FunctionKind::Constructor(class_id),
                    defined: false,
                }),
            });
            self.symbols.class_mut(class_id).constructors.push(entity);
            ctor_entities.push((entity, ctor.clone()));
        }

        let destructor_body = decl
            .destructor
            .as_ref()
            .map(|d| d.body.clone())
            .unwrap_or_default();
        let dtor_signature = FunctionSignature {
            return_type: Type::void(),
            params: Vec::new(),
            receiver_const: None,
        };
        let dtor_entity = self.symbols.add_entity(Entity {
            name: format!("~{}", decl.name),
            ty: Type::function(dtor_signature.clone()),
            kind: EntityKind::Function(FunctionInfo {
                signature: dtor_signature.clone(),
                kind: FunctionKind::Destructor(class_id),
                defined: false,
            }),
        });
        self.symbols.class_mut(class_id).destructor = Some(dtor_entity);

        let mut method_entities = Vec::with_capacity(decl.methods.len());
        for method in &decl.methods {
            let return_type = match self.resolve_type_spec(&method.return_type) {
                Ok(ty) => ty,
                Err(note) => {
                    self.unit_error(note);
                    continue;
                }
            };
            let params = match self.resolve_parameters(&method.params) {
                Ok(p) => p,
                Err(note) => {
                    self.unit_error(note);
                    continue;
                }
            };
            let signature = FunctionSignature {
                return_type,
                params,
                receiver_const: Some(method.is_const),
            };
            match self.symbols.declare_function(
                scope,
                Entity {
                    name: method.name.clone(),
                    ty: Type::function(signature.clone()),
                    kind: EntityKind::Function(FunctionInfo {
                        signature: signature.clone(),
                        kind: FunctionKind::Method(class_id),
                        defined: false,
                    }),
                },
            ) {
                Ok(entity) => method_entities.push((entity, signature, method.clone())),
                Err(conflict) => self.unit_error(NoteKind::Redeclaration(conflict)),
            }
        }

        for (entity, ctor) in ctor_entities {
            let signature = self
                .symbols
                .entity(entity)
                .function_info()
                .signature
                .clone();
            self.compile_function_definition(
                entity,
                &signature,
                &ctor.params,
                &ctor.body,
                Some(class_id),
                Some(&ctor.member_initializers),
            );
        }
        self.compile_function_definition(
            dtor_entity,
            &dtor_signature,
            &[],
            &destructor_body,
            Some(class_id),
            None,
        );
        for (entity, signature, method) in method_entities {
            if let Some(body) = &method.body {
                self.compile_function_definition(
                    entity,
                    &signature,
                    &method.params,
                    body,
                    Some(class_id),
                    None,
                );
            }
        }
    }

    // ------------------------------------------------------------------
    // Globals

    fn compile_global(&mut self, decl: &ast::VariableDeclaration) {
        let ty = match self.resolve_type_spec(&decl.type_spec) {
            Ok(ty) => ty,
            Err(note) => return self.unit_error(note),
        };
        let entity = match self.symbols.declare_variable(
            self.symbols.global_scope(),
            Entity {
                name: decl.name.clone(),
                ty,
                kind: EntityKind::GlobalObject,
            },
        ) {
            Ok(id) => id,
            Err(conflict) => return self.unit_error(NoteKind::Redeclaration(conflict)),
        };
        let (form, args) = self.compile_initializer_form(&decl.init);
        let init = self.build_initializer(entity, form, args);
        let temp_dealloc = self.seal_full_expression(init);
        self.globals.push(GlobalInit {
            entity,
            init,
            temp_dealloc,
        });
    }
}
