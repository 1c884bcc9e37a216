//! # Introduction
//!
//! An educational C++ semantics engine.  Programs arrive as a small
//! declarative AST, pass through a compilation pipeline that makes every
//! implicit step of the language explicit (conversions, overload selection,
//! initializer strategies, temporary cleanup), and run on a cooperative
//! virtual machine that advances one observable step at a time.
//!
//! ## Pipeline
//!
//! ```text
//! AST → Compiler → Constructs → Program → Simulation → Events
//! ```
//!
//! 1. [`ast`]: the declarative input (translation units, declarations,
//!    statements, expressions).
//! 2. [`types`]: structural types with cv-qualifiers and the conversion
//!    relations built on them.
//! 3. [`entities`]: the symbol table with scopes, named entities, and
//!    classes.
//! 4. [`constructs`]: the compilation pipeline.  [`constructs::compile`]
//!    turns a translation unit into a [`constructs::Program`] or a list of
//!    error notes; diagnostics accumulate on the construct tree as it is
//!    built.
//! 5. [`memory`]: the object model, an arena of typed objects with
//!    explicit lifetimes, frames, and object-tracking pointer values.
//! 6. [`runtime`]: the stepping VM.  [`runtime::Simulation`] executes a
//!    program and reports everything it observes (calls, initializations,
//!    undefined behavior, crashes) as typed events.
//!
//! ## Supported C++ subset
//!
//! Types: `bool`, `char`, `int`, `size_t`, `float`, `double`, pointers,
//! references, fixed-size arrays, classes with single inheritance.
//! Declarations: free functions with overloading, methods, constructors
//! with member initializer lists, destructors, globals, block locals.
//! Initialization: default, value, direct, and list forms, including
//! `char[N]` from string literals.  The built-in `assert` reports a
//! failure event when its argument is false; execution continues.

pub mod ast;
pub mod constructs;
pub mod entities;
pub mod memory;
pub mod runtime;
pub mod types;

pub use constructs::{compile, Note, NoteKind, Program, Severity};
pub use runtime::events::{SimEvent, SimulationListener};
pub use runtime::{SimStatus, Simulation};
