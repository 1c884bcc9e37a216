//! The construct tree: compile-time nodes and the compilation pipeline
//!
//! A construct is a fully-typed, checked node produced from a raw AST node.
//! Constructs live in an arena owned by the [`Compiler`] (and later the
//! [`Program`]); parent links are arena indices used only for note bubbling
//! and temporary-ownership transfer, never for traversal order. Children are
//! created synchronously inside their parent's compilation, top-down.
//!
//! A construct progresses uni-directionally:
//!
//! ```text
//! Created → Attached → (WellTyped | Errored) → FullyCompiled
//! ```
//!
//! It is never un-compiled. [`compile`] is the fallible conversion at the
//! end: either every construct is fully compiled and a [`Program`] exists, or
//! the accumulated error notes are returned and no runtime node can ever be
//! built.
//!
//! Submodules:
//! - [`notes`]: diagnostics
//! - `conversions`: the 3-stage standard conversion pipeline
//! - `expressions`: expression compilation
//! - `function_call`: calls and overload resolution
//! - `initializers`: the target-shape × form initializer matrix
//! - `statements`: statements, functions, classes, translation units

pub mod notes;

mod conversions;
mod expressions;
mod function_call;
mod initializers;
mod statements;

pub use conversions::Conversion;
pub use notes::{Note, NoteKind, Severity};

use crate::ast::TranslationUnit;
use crate::entities::{EntityId, ScopeId, SymbolTable};
use crate::types::{Type, TypeKind};
use rustc_hash::FxHashMap;
use tracing::debug;

/// Index of a construct in the compilation's arena
pub type ConstructId = usize;

/// Value category of an expression construct
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueCategory {
    Lvalue,
    Prvalue,
}

/// Unary operators on compiled expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
    Deref,
    AddrOf,
}

/// Binary (non-short-circuit) operators on compiled expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Short-circuit logical operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

/// A compiled expression: kind plus the type and value category the
/// compilation pipeline established
#[derive(Debug, Clone)]
pub struct Expression {
    pub ty: Type,
    pub category: ValueCategory,
    pub kind: ExprKind,
}

/// The closed set of expression shapes
#[derive(Debug, Clone)]
pub enum ExprKind {
    IntLiteral(i64),
    DoubleLiteral(f64),
    CharLiteral(i8),
    BoolLiteral(bool),
    StringLiteral(String),
    NullptrLiteral,
    Identifier(EntityId),
    /// Placeholder carrying only a type and category; used to probe
    /// conversions during overload resolution
    Auxiliary,
    /// A node that failed to compile; always poisoned
    Unresolved,
    Unary {
        op: UnaryOp,
        operand: ConstructId,
    },
    Binary {
        op: BinaryOp,
        lhs: ConstructId,
        rhs: ConstructId,
    },
    Logical {
        op: LogicalOp,
        lhs: ConstructId,
        rhs: ConstructId,
    },
    Assignment {
        lhs: ConstructId,
        rhs: ConstructId,
    },
    Comma {
        lhs: ConstructId,
        rhs: ConstructId,
    },
    Ternary {
        condition: ConstructId,
        then_expr: ConstructId,
        else_expr: ConstructId,
    },
    Subscript {
        target: ConstructId,
        index: ConstructId,
    },
    MemberAccess {
        object: ConstructId,
        member: EntityId,
    },
    /// Wraps a [`FunctionCall`] construct
    Call(ConstructId),
    /// An implicit conversion retaining the original expression as a child
    Conversion {
        conv: Conversion,
        operand: ConstructId,
    },
    /// Materialization of a prvalue into a temporary object
    MaterializeTemporary {
        operand: ConstructId,
        temp: EntityId,
    },
}

/// A compiled function call (see the four-phase runtime protocol in
/// [`crate::runtime`])
#[derive(Debug, Clone)]
pub struct FunctionCall {
    pub function: EntityId,
    /// One `DirectInitializer` per argument, targeting a synthetic parameter
    /// entity; arguments are never assigned into parameters directly
    pub arg_inits: Vec<ConstructId>,
    /// Receiver expression for method calls made on an object expression.
    /// Constructor/destructor calls leave this `None`; their receiver object
    /// is supplied by the initiating runtime node.
    pub receiver: Option<ConstructId>,
    /// Temporary entity registered as the return slot, for non-void
    /// non-reference object returns
    pub return_slot: Option<EntityId>,
}

/// Requested initializer form, kept for display and event payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitForm {
    Default,
    Value,
    Direct,
    List,
}

/// A compiled initializer: the selected strategy for one target
#[derive(Debug, Clone)]
pub struct Initializer {
    pub target: EntityId,
    pub form: InitForm,
    pub kind: InitKind,
}

/// The selected initialization strategy (a pure function of the target's
/// static type shape and the requested form)
#[derive(Debug, Clone)]
pub enum InitKind {
    /// Bind a reference to the source lvalue
    ReferenceBind { source: ConstructId },
    /// Leave the value indeterminate; lifetime begins anyway
    AtomicDefault,
    /// Zero-initialize
    AtomicValue,
    /// Copy-initialize from a converted source expression
    AtomicDirect { source: ConstructId },
    /// `char[N]` from a single string literal, null-padded
    ArrayFromStringLiteral { literal: ConstructId },
    /// One child initializer per element (list/default/value forms)
    ArrayAggregate { elem_inits: Vec<ConstructId> },
    /// Run the selected constructor against the target object
    ClassConstructor { call: ConstructId },
    /// Selection failed; the construct is poisoned
    IllFormed,
}

/// Destroys the temporaries of one full expression, in reverse registration
/// order, after the full expression's value has been consumed
#[derive(Debug, Clone)]
pub struct TemporaryDeallocator {
    /// Temporary entities in registration order (runtime iterates in reverse)
    pub temporaries: Vec<EntityId>,
    /// Compiled destructor call per temporary (`None` for non-class types)
    pub destructor_calls: Vec<Option<ConstructId>>,
}

/// Destroys named objects (block locals at scope exit, members at the end of
/// a destructor), in reverse declaration order
#[derive(Debug, Clone)]
pub struct ObjectDeallocator {
    /// Entities in declaration order (runtime iterates in reverse)
    pub objects: Vec<EntityId>,
    pub destructor_calls: Vec<Option<ConstructId>>,
}

/// The minimal statement forms needed to make functions executable
#[derive(Debug, Clone)]
pub enum Statement {
    Expression {
        expr: ConstructId,
        temp_dealloc: Option<ConstructId>,
    },
    Declaration {
        entity: EntityId,
        init: ConstructId,
        temp_dealloc: Option<ConstructId>,
    },
    Return {
        init: Option<ConstructId>,
        temp_dealloc: Option<ConstructId>,
    },
    Block {
        stmts: Vec<ConstructId>,
        dealloc: Option<ConstructId>,
    },
}

/// The families of compiled constructs
#[derive(Debug, Clone)]
pub enum ConstructKind {
    Expr(Expression),
    Call(FunctionCall),
    Init(Initializer),
    TempDealloc(TemporaryDeallocator),
    ObjDealloc(ObjectDeallocator),
    Stmt(Statement),
}

/// One node in the construct arena
#[derive(Debug, Clone)]
pub struct Construct {
    pub parent: Option<ConstructId>,
    /// Compiler-generated/auxiliary node; notes bubble past it
    pub implicit: bool,
    /// An error-severity note exists in this subtree
    pub poisoned: bool,
    pub notes: Vec<Note>,
    pub kind: ConstructKind,
}

/// Compilation state, derived from the arena flags (the progression is
/// monotone: a construct is never un-compiled)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileState {
    Created,
    Attached,
    WellTyped,
    Errored,
}

/// A compiled function definition
#[derive(Debug, Clone)]
pub struct CompiledFunction {
    pub entity: EntityId,
    /// Parameter entities of the definition, in order
    pub params: Vec<EntityId>,
    /// Return-object entity (absent for void and reference returns)
    pub return_entity: Option<EntityId>,
    /// Constructor member initializers, in member declaration order
    pub member_inits: Vec<ConstructId>,
    /// The body block statement
    pub body: ConstructId,
    /// Destructor member cleanup, run after the body
    pub member_dealloc: Option<ConstructId>,
}

/// A compiled global-variable initialization, run before `main`
#[derive(Debug, Clone)]
pub struct GlobalInit {
    pub entity: EntityId,
    pub init: ConstructId,
    pub temp_dealloc: Option<ConstructId>,
}

/// A fully compiled, error-free program
///
/// A `Program` exists only when compilation produced no error notes, which is
/// what statically prevents a poisoned construct from ever reaching the
/// runtime.
#[derive(Debug)]
pub struct Program {
    pub constructs: Vec<Construct>,
    pub symbols: SymbolTable,
    pub functions: FxHashMap<EntityId, CompiledFunction>,
    pub globals: Vec<GlobalInit>,
    pub main: EntityId,
    /// The synthesized zero-argument call to `main` the simulation starts
    /// from
    pub main_call: ConstructId,
    /// Deallocator for `main`'s return-slot temporary
    pub main_dealloc: Option<ConstructId>,
}

impl Program {
    pub fn construct(&self, id: ConstructId) -> &Construct {
        &self.constructs[id]
    }

    /// The expression data of a construct; panics if the construct is not an
    /// expression (programmer error, not a user diagnostic)
    pub fn expr(&self, id: ConstructId) -> &Expression {
        match &self.constructs[id].kind {
            ConstructKind::Expr(e) => e,
            other => panic!("construct {} is not an expression: {:?}", id, other),
        }
    }

    pub fn function(&self, entity: EntityId) -> &CompiledFunction {
        self.functions
            .get(&entity)
            .unwrap_or_else(|| panic!("no compiled body for function entity {}", entity))
    }

    /// Start a fresh simulation of this program
    pub fn create_simulation(&self) -> crate::runtime::Simulation<'_> {
        crate::runtime::Simulation::new(self)
    }
}

/// The compilation in progress: construct arena, symbol table, and the
/// bookkeeping for note bubbling and temporary registration
#[derive(Debug)]
pub struct Compiler {
    pub constructs: Vec<Construct>,
    pub symbols: SymbolTable,
    pub functions: FxHashMap<EntityId, CompiledFunction>,
    pub globals: Vec<GlobalInit>,
    /// Unit-level notes not attached to any construct
    pub unit_notes: Vec<Note>,
    /// Temporaries registered against a construct that has not yet been
    /// determined to be (or hand them to) a full expression
    pending_temporaries: FxHashMap<ConstructId, Vec<EntityId>>,
    pub(crate) current_scope: ScopeId,
    pub(crate) current_return_type: Option<Type>,
    pub(crate) current_class: Option<crate::types::ClassId>,
    pub(crate) current_receiver_const: bool,
    pub(crate) current_return_entity: Option<EntityId>,
    /// Locals declared directly in each open block, innermost last
    pub(crate) block_locals: Vec<Vec<EntityId>>,
}

impl Compiler {
    pub fn new() -> Self {
        let mut compiler = Compiler {
            constructs: Vec::new(),
            symbols: SymbolTable::new(),
            functions: FxHashMap::default(),
            globals: Vec::new(),
            unit_notes: Vec::new(),
            pending_temporaries: FxHashMap::default(),
            current_scope: 0,
            current_return_type: None,
            current_class: None,
            current_receiver_const: false,
            current_return_entity: None,
            block_locals: Vec::new(),
        };
        compiler.current_scope = compiler.symbols.global_scope();
        compiler.declare_builtins();
        compiler
    }

    /// Add a new, unattached construct to the arena
    pub(crate) fn add_construct(&mut self, kind: ConstructKind, implicit: bool) -> ConstructId {
        self.constructs.push(Construct {
            parent: None,
            implicit,
            poisoned: false,
            notes: Vec::new(),
            kind,
        });
        self.constructs.len() - 1
    }

    /// Attach `child` to `parent`: sets the back-link and hands the child's
    /// pending temporary registrations up (the nearest enclosing full
    /// expression is found transitively as attachment proceeds upward)
    pub(crate) fn attach(&mut self, child: ConstructId, parent: ConstructId) {
        debug_assert!(self.constructs[child].parent.is_none());
        self.constructs[child].parent = Some(parent);
        if self.constructs[child].poisoned {
            self.poison(parent);
        }
        if let Some(temps) = self.pending_temporaries.remove(&child) {
            if Self::is_full_expression_capable(&self.constructs[parent].kind) {
                self.pending_temporaries
                    .entry(parent)
                    .or_default()
                    .extend(temps);
            } else {
                // The child is itself the full-expression root; the caller
                // (a statement) seals it via `seal_full_expression`.
                self.pending_temporaries.insert(child, temps);
            }
        }
    }

    /// Whether a construct kind can own or hand up temporary registrations
    fn is_full_expression_capable(kind: &ConstructKind) -> bool {
        matches!(
            kind,
            ConstructKind::Expr(_) | ConstructKind::Call(_) | ConstructKind::Init(_)
        )
    }

    /// Attach a note, bubbling to the nearest non-implicit ancestor. An
    /// error-severity note poisons the detecting construct and everything
    /// above it.
    pub(crate) fn add_note(&mut self, construct: ConstructId, severity: Severity, kind: NoteKind) {
        let mut holder = construct;
        while self.constructs[holder].implicit {
            match self.constructs[holder].parent {
                Some(p) => holder = p,
                None => break,
            }
        }
        if severity == Severity::Error {
            self.poison(construct);
        }
        self.constructs[holder].notes.push(Note {
            construct: Some(holder),
            severity,
            kind,
        });
    }

    pub(crate) fn error(&mut self, construct: ConstructId, kind: NoteKind) {
        self.add_note(construct, Severity::Error, kind);
    }

    /// Mark `construct` and all its ancestors as poisoned
    pub(crate) fn poison(&mut self, construct: ConstructId) {
        let mut current = Some(construct);
        while let Some(c) = current {
            if self.constructs[c].poisoned {
                break;
            }
            self.constructs[c].poisoned = true;
            current = self.constructs[c].parent;
        }
    }

    /// A construct is fully compiled iff no error note exists in its subtree
    pub fn is_fully_compiled(&self, construct: ConstructId) -> bool {
        !self.constructs[construct].poisoned
    }

    /// Derived compilation state of one construct
    pub fn compile_state(&self, construct: ConstructId) -> CompileState {
        let c = &self.constructs[construct];
        if c.poisoned {
            CompileState::Errored
        } else if c.parent.is_some() {
            CompileState::WellTyped
        } else {
            CompileState::Created
        }
    }

    /// Register a temporary object against `owner`; the registration is
    /// handed upward on attachment until it reaches the nearest enclosing
    /// full expression
    pub(crate) fn create_temporary(&mut self, owner: ConstructId, ty: Type) -> EntityId {
        let entity = self.symbols.add_entity(crate::entities::Entity {
            name: format!("<temp#{}>", self.symbols.entities.len()),
            ty,
            kind: crate::entities::EntityKind::TemporaryObject,
        });
        self.pending_temporaries
            .entry(owner)
            .or_default()
            .push(entity);
        entity
    }

    /// Freeze the temporaries registered against a full-expression root and
    /// build the `TemporaryDeallocator` responsible for destroying them in
    /// reverse registration order. Returns `None` when the expression created
    /// no temporaries.
    pub(crate) fn seal_full_expression(&mut self, root: ConstructId) -> Option<ConstructId> {
        let temporaries = self.pending_temporaries.remove(&root)?;
        if temporaries.is_empty() {
            return None;
        }
        let mut destructor_calls = Vec::with_capacity(temporaries.len());
        let dealloc = self.add_construct(
            ConstructKind::TempDealloc(TemporaryDeallocator {
                temporaries: Vec::new(),
                destructor_calls: Vec::new(),
            }),
            false,
        );
        for &temp in &temporaries {
            let ty = self.symbols.entity(temp).ty.clone();
            destructor_calls.push(self.build_cleanup_destructor_call(dealloc, &ty));
        }
        match &mut self.constructs[dealloc].kind {
            ConstructKind::TempDealloc(td) => {
                td.temporaries = temporaries;
                td.destructor_calls = destructor_calls;
            }
            _ => unreachable!(),
        }
        Some(dealloc)
    }

    /// Human-readable rendering of a type, used in note messages
    pub(crate) fn type_name(&self, ty: &Type) -> String {
        let mut s = String::new();
        if ty.is_const {
            s.push_str("const ");
        }
        if ty.is_volatile {
            s.push_str("volatile ");
        }
        match &ty.kind {
            TypeKind::Void => s.push_str("void"),
            TypeKind::Bool => s.push_str("bool"),
            TypeKind::Char => s.push_str("char"),
            TypeKind::Int => s.push_str("int"),
            TypeKind::SizeT => s.push_str("size_t"),
            TypeKind::Float => s.push_str("float"),
            TypeKind::Double => s.push_str("double"),
            TypeKind::Pointer(p) => {
                s.push_str(&self.type_name(p));
                s.push('*');
            }
            TypeKind::Reference(r) => {
                s.push_str(&self.type_name(r));
                s.push('&');
            }
            TypeKind::BoundedArray(e, n) => {
                s.push_str(&format!("{}[{}]", self.type_name(e), n));
            }
            TypeKind::ArrayOfUnknownBound(e) => {
                s.push_str(&format!("{}[]", self.type_name(e)));
            }
            TypeKind::Class(id) => s.push_str(&self.symbols.classes[*id].name),
            TypeKind::Function(sig) => {
                let params: Vec<String> = sig.params.iter().map(|p| self.type_name(p)).collect();
                s.push_str(&format!(
                    "{}({})",
                    self.type_name(&sig.return_type),
                    params.join(", ")
                ));
            }
        }
        s
    }

    /// Collect every note in the compilation, construct-attached and
    /// unit-level, in arena order
    pub fn all_notes(&self) -> Vec<Note> {
        let mut notes: Vec<Note> = self
            .constructs
            .iter()
            .flat_map(|c| c.notes.iter().cloned())
            .collect();
        notes.extend(self.unit_notes.iter().cloned());
        notes
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

/// Compile a translation unit into a runnable [`Program`].
///
/// Compilation is best-effort: all top-level declarations are checked even
/// when earlier ones fail, and the error case carries every note found in
/// the pass.
pub fn compile(unit: &TranslationUnit) -> Result<Program, Vec<Note>> {
    let mut compiler = Compiler::new();
    compiler.compile_translation_unit(unit);
    compiler.finish_compiling()
}

impl Compiler {
    /// The fallible conversion from a compilation to a validated program
    pub fn finish_compiling(mut self) -> Result<Program, Vec<Note>> {
        let main = self.find_main();
        let entry = main.map(|m| {
            let call = self.build_function_call(m, Vec::new(), None);
            (call, self.seal_full_expression(call))
        });
        // After the entry call is synthesized, so a bodyless `main` is
        // caught like any other undefined callee.
        self.check_all_used_functions_defined();
        let notes = self.all_notes();
        if notes.iter().any(|n| n.is_error()) {
            debug!(errors = notes.iter().filter(|n| n.is_error()).count(), "compilation failed");
            return Err(notes);
        }
        let (main, (main_call, main_dealloc)) = match (main, entry) {
            (Some(m), Some(e)) => (m, e),
            _ => unreachable!("missing main must have produced an error note"),
        };
        debug!(constructs = self.constructs.len(), "compilation succeeded");
        Ok(Program {
            constructs: self.constructs,
            symbols: self.symbols,
            functions: self.functions,
            globals: self.globals,
            main,
            main_call,
            main_dealloc,
        })
    }
}
