//! Entities and scopes: the compile-time symbol table
//!
//! An [`Entity`] is a named, typed thing introduced by a declaration. It never
//! holds a runtime value; during execution the runtime resolves an entity to a
//! concrete object through the active stack frame (see
//! [`crate::runtime`]). Entities live in an arena owned by the compilation,
//! and their stable numeric id is the arena index (used for identity and
//! debugging, never for addressing).
//!
//! Scopes form a tree of namespace/class/block scopes, each owning a mapping
//! from unqualified name to a variable, a class, or a function overload
//! group. Class scopes additionally chain to their base-class scope, searched
//! before the lexical parent.

use crate::types::{ClassHierarchy, ClassId, FunctionSignature, Type};
use rustc_hash::FxHashMap;
use thiserror::Error;

/// Stable entity id: index into the compilation's entity arena
pub type EntityId = usize;

/// Scope id: index into the compilation's scope arena
pub type ScopeId = usize;

/// What kind of function a [`EntityKind::Function`] entity is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    Free,
    Method(ClassId),
    Constructor(ClassId),
    Destructor(ClassId),
    /// The built-in `assert(bool)`; has no body, handled by the engine
    BuiltinAssert,
}

/// Compile-time information about a function entity
#[derive(Debug, Clone)]
pub struct FunctionInfo {
    pub signature: FunctionSignature,
    pub kind: FunctionKind,
    /// Set when a definition has been linked to this declaration
    pub defined: bool,
}

/// The closed set of entity variants
#[derive(Debug, Clone)]
pub enum EntityKind {
    LocalObject,
    LocalReference,
    GlobalObject,
    MemberObject { class: ClassId, index: usize },
    MemberReference { class: ClassId, index: usize },
    /// The base-class subobject of a derived-class object
    BaseSubobject { class: ClassId },
    ReturnObject,
    ParameterByValue { index: usize },
    ParameterByReference { index: usize },
    TemporaryObject,
    Function(FunctionInfo),
    Class(ClassId),
}

/// A named, typed, compile-time thing
#[derive(Debug, Clone)]
pub struct Entity {
    pub name: String,
    pub ty: Type,
    pub kind: EntityKind,
}

impl Entity {
    pub fn function_info(&self) -> &FunctionInfo {
        match &self.kind {
            EntityKind::Function(info) => info,
            _ => panic!("entity '{}' is not a function", self.name),
        }
    }

    pub fn function_info_mut(&mut self) -> &mut FunctionInfo {
        match &mut self.kind {
            EntityKind::Function(info) => info,
            _ => panic!("entity '{}' is not a function", self.name),
        }
    }

    pub fn is_reference_entity(&self) -> bool {
        matches!(
            self.kind,
            EntityKind::LocalReference
                | EntityKind::MemberReference { .. }
                | EntityKind::ParameterByReference { .. }
        )
    }
}

/// A class definition collected during compilation
#[derive(Debug, Clone)]
pub struct ClassDefinition {
    pub name: String,
    pub base: Option<ClassId>,
    pub scope: ScopeId,
    /// Data member entities, in declaration order
    pub members: Vec<EntityId>,
    /// Synthetic entity designating the base subobject, when a base exists
    pub base_entity: Option<EntityId>,
    pub constructors: Vec<EntityId>,
    pub destructor: Option<EntityId>,
    /// False between the class-head and the end of the member list
    pub complete: bool,
}

/// Scope kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Namespace,
    Class(ClassId),
    Block,
}

/// What a name resolves to within one scope
#[derive(Debug, Clone)]
pub enum DeclaredName {
    Variable(EntityId),
    Class(EntityId),
    /// Append-only overload group
    Functions(Vec<EntityId>),
}

/// One scope in the scope tree
#[derive(Debug, Clone)]
pub struct Scope {
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    /// For class scopes: the base class's scope, searched before `parent`
    pub base: Option<ScopeId>,
    names: FxHashMap<String, DeclaredName>,
}

/// Result of an unqualified lookup
#[derive(Debug, Clone)]
pub enum LookupResult {
    Variable(EntityId),
    Class(EntityId),
    /// The whole overload group, in declaration order
    Functions(Vec<EntityId>),
    NotFound,
}

/// Options for [`SymbolTable::lookup`]
#[derive(Debug, Clone, Copy, Default)]
pub struct LookupOptions {
    /// Search only the starting scope (plus base-class chain); do not walk
    /// lexical parents
    pub own_scope_only: bool,
}

/// Errors produced when a declaration cannot merge with an existing name
#[derive(Debug, Clone, Error)]
pub enum DeclarationError {
    #[error("redeclaration of '{name}' as a different kind of entity")]
    KindMismatch { name: String },
    #[error("redeclaration of '{name}' with a different type")]
    TypeMismatch { name: String },
}

/// The symbol table: entity arena, scope tree, and class table
#[derive(Debug, Default)]
pub struct SymbolTable {
    pub entities: Vec<Entity>,
    pub scopes: Vec<Scope>,
    pub classes: Vec<ClassDefinition>,
}

impl SymbolTable {
    /// Create a table with the global namespace scope at index 0
    pub fn new() -> Self {
        let mut table = SymbolTable::default();
        table.scopes.push(Scope {
            kind: ScopeKind::Namespace,
            parent: None,
            base: None,
            names: FxHashMap::default(),
        });
        table
    }

    pub fn global_scope(&self) -> ScopeId {
        0
    }

    pub fn add_entity(&mut self, entity: Entity) -> EntityId {
        self.entities.push(entity);
        self.entities.len() - 1
    }

    pub fn entity(&self, id: EntityId) -> &Entity {
        &self.entities[id]
    }

    pub fn entity_mut(&mut self, id: EntityId) -> &mut Entity {
        &mut self.entities[id]
    }

    pub fn add_scope(&mut self, kind: ScopeKind, parent: ScopeId, base: Option<ScopeId>) -> ScopeId {
        self.scopes.push(Scope {
            kind,
            parent: Some(parent),
            base,
            names: FxHashMap::default(),
        });
        self.scopes.len() - 1
    }

    pub fn class(&self, id: ClassId) -> &ClassDefinition {
        &self.classes[id]
    }

    pub fn class_mut(&mut self, id: ClassId) -> &mut ClassDefinition {
        &mut self.classes[id]
    }

    /// Declare a variable or class-type object name in `scope`.
    ///
    /// Redeclaring the same name with the same type merges into the existing
    /// entity; anything else is a conflict.
    pub fn declare_variable(
        &mut self,
        scope: ScopeId,
        entity: Entity,
    ) -> Result<EntityId, DeclarationError> {
        let name = entity.name.clone();
        match self.scopes[scope].names.get(&name) {
            None => {
                let id = self.add_entity(entity);
                self.scopes[scope]
                    .names
                    .insert(name, DeclaredName::Variable(id));
                Ok(id)
            }
            Some(DeclaredName::Variable(existing)) => {
                if self.entities[*existing].ty.same(&entity.ty) {
                    Ok(*existing)
                } else {
                    Err(DeclarationError::TypeMismatch { name })
                }
            }
            Some(_) => Err(DeclarationError::KindMismatch { name }),
        }
    }

    /// Declare a class name in `scope`
    pub fn declare_class(
        &mut self,
        scope: ScopeId,
        entity: Entity,
    ) -> Result<EntityId, DeclarationError> {
        let name = entity.name.clone();
        match self.scopes[scope].names.get(&name) {
            None => {
                let id = self.add_entity(entity);
                self.scopes[scope]
                    .names
                    .insert(name, DeclaredName::Class(id));
                Ok(id)
            }
            Some(DeclaredName::Class(existing)) => Ok(*existing),
            Some(_) => Err(DeclarationError::KindMismatch { name }),
        }
    }

    /// Declare a function in `scope`, appending to the overload group.
    ///
    /// A redeclaration with an exactly matching signature merges into the
    /// previously declared entity (so a definition binds to its declaration);
    /// a new signature is appended to the group.
    pub fn declare_function(
        &mut self,
        scope: ScopeId,
        entity: Entity,
    ) -> Result<EntityId, DeclarationError> {
        let name = entity.name.clone();
        let sig = entity.function_info().signature.clone();
        let existing_group = match self.scopes[scope].names.get(&name) {
            None => None,
            Some(DeclaredName::Functions(group)) => Some(group.clone()),
            Some(_) => return Err(DeclarationError::KindMismatch { name }),
        };
        if let Some(group) = &existing_group {
            for &candidate in group {
                if signatures_match_exactly(
                    &self.entities[candidate].function_info().signature,
                    &sig,
                ) {
                    return Ok(candidate);
                }
            }
        }
        let id = self.add_entity(entity);
        match self.scopes[scope].names.get_mut(&name) {
            Some(DeclaredName::Functions(group)) => group.push(id),
            None => {
                self.scopes[scope]
                    .names
                    .insert(name, DeclaredName::Functions(vec![id]));
            }
            Some(_) => unreachable!(),
        }
        Ok(id)
    }

    /// Unqualified lookup starting in `scope`.
    ///
    /// Search order: the scope itself, then (for class scopes) the base-class
    /// chain, then the lexical parent, unless suppressed by `options`.
    pub fn lookup(&self, scope: ScopeId, name: &str, options: LookupOptions) -> LookupResult {
        let mut current = Some(scope);
        while let Some(s) = current {
            // Own names, then base-class chain.
            let mut class_chain = Some(s);
            while let Some(cs) = class_chain {
                if let Some(declared) = self.scopes[cs].names.get(name) {
                    return match declared {
                        DeclaredName::Variable(id) => LookupResult::Variable(*id),
                        DeclaredName::Class(id) => LookupResult::Class(*id),
                        DeclaredName::Functions(group) => LookupResult::Functions(group.clone()),
                    };
                }
                class_chain = self.scopes[cs].base;
            }
            if options.own_scope_only {
                break;
            }
            current = self.scopes[s].parent;
        }
        LookupResult::NotFound
    }

    /// "Exact" lookup: resolve a function name to the single previously
    /// declared candidate whose parameter types and receiver constness match
    /// exactly. Used when a definition must bind to a declaration.
    pub fn lookup_exact(
        &self,
        scope: ScopeId,
        name: &str,
        params: &[Type],
        receiver_const: Option<bool>,
        options: LookupOptions,
    ) -> Option<EntityId> {
        match self.lookup(scope, name, options) {
            LookupResult::Functions(group) => group.into_iter().find(|&id| {
                let sig = &self.entities[id].function_info().signature;
                sig.receiver_const == receiver_const
                    && sig.params.len() == params.len()
                    && sig.params.iter().zip(params).all(|(a, b)| a.same(b))
            }),
            _ => None,
        }
    }
}

fn signatures_match_exactly(a: &FunctionSignature, b: &FunctionSignature) -> bool {
    a.receiver_const == b.receiver_const
        && a.params.len() == b.params.len()
        && a.params.iter().zip(&b.params).all(|(x, y)| x.same(y))
}

impl ClassHierarchy for SymbolTable {
    fn direct_base(&self, class: ClassId) -> Option<ClassId> {
        self.classes[class].base
    }

    fn class_size(&self, class: ClassId) -> usize {
        let def = &self.classes[class];
        let base_size = def.base.map_or(0, |b| self.class_size(b));
        let member_size: usize = def
            .members
            .iter()
            .map(|&m| self.entities[m].ty.size_of(self))
            .sum();
        base_size + member_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_fn(name: &str, params: Vec<Type>) -> Entity {
        Entity {
            name: name.to_string(),
            ty: Type::function(FunctionSignature {
                return_type: Type::int(),
                params: params.clone(),
                receiver_const: None,
            }),
            kind: EntityKind::Function(FunctionInfo {
                signature: FunctionSignature {
                    return_type: Type::int(),
                    params,
                    receiver_const: None,
                },
                kind: FunctionKind::Free,
                defined: false,
            }),
        }
    }

    #[test]
    fn overload_group_is_append_only_in_declaration_order() {
        let mut table = SymbolTable::new();
        let g = table.global_scope();
        let f1 = table
            .declare_function(g, int_fn("f", vec![Type::int()]))
            .unwrap();
        let f2 = table
            .declare_function(g, int_fn("f", vec![Type::double()]))
            .unwrap();
        assert_ne!(f1, f2);
        match table.lookup(g, "f", LookupOptions::default()) {
            LookupResult::Functions(group) => assert_eq!(group, vec![f1, f2]),
            other => panic!("expected overload group, got {:?}", other),
        }
    }

    #[test]
    fn redeclaration_merges_exact_signature() {
        let mut table = SymbolTable::new();
        let g = table.global_scope();
        let first = table
            .declare_function(g, int_fn("f", vec![Type::int()]))
            .unwrap();
        let again = table
            .declare_function(g, int_fn("f", vec![Type::int()]))
            .unwrap();
        assert_eq!(first, again);
    }

    #[test]
    fn exact_lookup_filters_by_signature() {
        let mut table = SymbolTable::new();
        let g = table.global_scope();
        let f1 = table
            .declare_function(g, int_fn("f", vec![Type::int()]))
            .unwrap();
        let f2 = table
            .declare_function(g, int_fn("f", vec![Type::double()]))
            .unwrap();
        assert_eq!(
            table.lookup_exact(g, "f", &[Type::double()], None, LookupOptions::default()),
            Some(f2)
        );
        assert_eq!(
            table.lookup_exact(g, "f", &[Type::int()], None, LookupOptions::default()),
            Some(f1)
        );
        assert_eq!(
            table.lookup_exact(g, "f", &[Type::char_()], None, LookupOptions::default()),
            None
        );
    }

    #[test]
    fn block_scope_walks_to_parent() {
        let mut table = SymbolTable::new();
        let g = table.global_scope();
        let x = table
            .declare_variable(
                g,
                Entity {
                    name: "x".to_string(),
                    ty: Type::int(),
                    kind: EntityKind::GlobalObject,
                },
            )
            .unwrap();
        let block = table.add_scope(ScopeKind::Block, g, None);
        match table.lookup(block, "x", LookupOptions::default()) {
            LookupResult::Variable(id) => assert_eq!(id, x),
            other => panic!("expected variable, got {:?}", other),
        }
        match table.lookup(
            block,
            "x",
            LookupOptions {
                own_scope_only: true,
            },
        ) {
            LookupResult::NotFound => {}
            other => panic!("expected not-found, got {:?}", other),
        }
    }
}
