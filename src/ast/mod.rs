//! AST definitions: the input contract with the upstream parser
//!
//! The engine does not parse text. An upstream parser (out of scope here)
//! produces a plain tree of the node shapes below; the construct-compilation
//! pipeline accepts any node whose shape it knows and recursively accepts its
//! declared child fields. Each node reports a `construct_type` tag naming
//! its concrete shape, for diagnostics and front-end display.
//!
//! Tests build these trees directly.

/// A whole translation unit: the root handed to [`crate::compile`]
#[derive(Debug, Clone, Default)]
pub struct TranslationUnit {
    pub declarations: Vec<TopLevelDeclaration>,
}

/// Top-level declarations
#[derive(Debug, Clone)]
pub enum TopLevelDeclaration {
    Class(ClassDeclaration),
    Function(FunctionDeclaration),
    Global(VariableDeclaration),
}

/// A class definition, possibly with a single public base
#[derive(Debug, Clone)]
pub struct ClassDeclaration {
    pub name: String,
    pub base: Option<String>,
    pub members: Vec<MemberDeclaration>,
    pub constructors: Vec<ConstructorDeclaration>,
    pub destructor: Option<DestructorDeclaration>,
    pub methods: Vec<FunctionDeclaration>,
}

/// A non-static data member
#[derive(Debug, Clone)]
pub struct MemberDeclaration {
    pub name: String,
    pub type_spec: TypeSpec,
}

/// A constructor: parameters, member-initializer list, body
#[derive(Debug, Clone)]
pub struct ConstructorDeclaration {
    pub params: Vec<ParameterDeclaration>,
    /// `(member name, arguments)` pairs, in source order
    pub member_initializers: Vec<(String, Vec<Expression>)>,
    pub body: Vec<Statement>,
}

/// A destructor body
#[derive(Debug, Clone)]
pub struct DestructorDeclaration {
    pub body: Vec<Statement>,
}

/// A free function or a method (when nested inside a class declaration)
#[derive(Debug, Clone)]
pub struct FunctionDeclaration {
    pub name: String,
    pub return_type: TypeSpec,
    pub params: Vec<ParameterDeclaration>,
    /// `None` declares without defining; a later declaration may supply the body
    pub body: Option<Vec<Statement>>,
    /// Const-qualified receiver (methods only)
    pub is_const: bool,
}

#[derive(Debug, Clone)]
pub struct ParameterDeclaration {
    pub name: String,
    pub type_spec: TypeSpec,
}

/// A variable declaration with one of the four initializer forms
#[derive(Debug, Clone)]
pub struct VariableDeclaration {
    pub name: String,
    pub type_spec: TypeSpec,
    pub init: InitializerForm,
}

/// The initializer form requested at the declaration site
#[derive(Debug, Clone)]
pub enum InitializerForm {
    /// `T x;`
    Default,
    /// `T x{};` / `T x = T();`
    Value,
    /// `T x(args...)` / `T x = expr;`
    Direct(Vec<Expression>),
    /// `T x{args...};`
    List(Vec<Expression>),
}

/// Parser-level type notation, resolved against the symbol table during
/// compilation (class names are plain strings here)
#[derive(Debug, Clone)]
pub enum TypeSpec {
    Void,
    Bool,
    Char,
    Int,
    SizeT,
    Float,
    Double,
    Named(String),
    Const(Box<TypeSpec>),
    Pointer(Box<TypeSpec>),
    Reference(Box<TypeSpec>),
    Array(Box<TypeSpec>, Option<usize>),
}

/// Statements (the minimal set needed to make functions executable)
#[derive(Debug, Clone)]
pub enum Statement {
    Expression(Expression),
    Declaration(VariableDeclaration),
    Return(Option<Expression>),
    Block(Vec<Statement>),
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
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

/// Short-circuiting logical operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    And,
    Or,
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Neg,    // -x
    Not,    // !x
    Deref,  // *x
    AddrOf, // &x
}

/// Expressions
#[derive(Debug, Clone)]
pub enum Expression {
    IntLiteral(i64),
    DoubleLiteral(f64),
    CharLiteral(i8),
    BoolLiteral(bool),
    StringLiteral(String),
    NullptrLiteral,
    Identifier(String),
    Unary {
        op: UnaryOperator,
        operand: Box<Expression>,
    },
    Binary {
        op: BinaryOperator,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
    Logical {
        op: LogicalOperator,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
    Assignment {
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
    Comma {
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
    Ternary {
        condition: Box<Expression>,
        then_expr: Box<Expression>,
        else_expr: Box<Expression>,
    },
    Subscript {
        target: Box<Expression>,
        index: Box<Expression>,
    },
    Call {
        name: String,
        args: Vec<Expression>,
    },
    MethodCall {
        object: Box<Expression>,
        name: String,
        args: Vec<Expression>,
    },
    MemberAccess {
        object: Box<Expression>,
        member: String,
    },
}

impl Expression {
    /// The tag string discriminating this node shape, as the upstream parser
    /// would emit it
    pub fn construct_type(&self) -> &'static str {
        match self {
            Expression::IntLiteral(_)
            | Expression::DoubleLiteral(_)
            | Expression::CharLiteral(_)
            | Expression::BoolLiteral(_) => "numeric_literal",
            Expression::StringLiteral(_) => "string_literal_expression",
            Expression::NullptrLiteral => "nullptr_expression",
            Expression::Identifier(_) => "identifier_expression",
            Expression::Unary { .. } => "unary_operator_expression",
            Expression::Binary { .. } => "binary_operator_expression",
            Expression::Logical { .. } => "logical_binary_operator_expression",
            Expression::Assignment { .. } => "assignment_expression",
            Expression::Comma { .. } => "comma_expression",
            Expression::Ternary { .. } => "ternary_expression",
            Expression::Subscript { .. } => "subscript_expression",
            Expression::Call { .. } => "function_call_expression",
            Expression::MethodCall { .. } => "member_function_call_expression",
            Expression::MemberAccess { .. } => "dot_expression",
        }
    }
}
