// Compile-time diagnostics for the construct pipeline

use cxxsim::ast::*;
use cxxsim::{compile, NoteKind};

fn main_with(body: Vec<Statement>) -> TranslationUnit {
    TranslationUnit {
        declarations: vec![TopLevelDeclaration::Function(FunctionDeclaration {
            name: "main".into(),
            return_type: TypeSpec::Int,
            params: vec![],
            body: Some(body),
            is_const: false,
        })],
    }
}

fn declare(name: &str, type_spec: TypeSpec, init: InitializerForm) -> Statement {
    Statement::Declaration(VariableDeclaration {
        name: name.into(),
        type_spec,
        init,
    })
}

fn errors_of(unit: &TranslationUnit) -> Vec<NoteKind> {
    compile(unit)
        .expect_err("expected compilation to fail")
        .into_iter()
        .map(|n| n.kind)
        .collect()
}

#[test]
fn test_reference_default_init_is_an_error() {
    let unit = main_with(vec![
        declare(
            "r",
            TypeSpec::Reference(Box::new(TypeSpec::Int)),
            InitializerForm::Default,
        ),
        Statement::Return(Some(Expression::IntLiteral(0))),
    ]);
    let errors = errors_of(&unit);
    assert!(
        errors
            .iter()
            .any(|k| matches!(k, NoteKind::ReferenceDefaultInit)),
        "got: {:?}",
        errors
    );
}

#[test]
fn test_reference_value_init_is_an_error() {
    let unit = main_with(vec![
        declare(
            "r",
            TypeSpec::Reference(Box::new(TypeSpec::Int)),
            InitializerForm::Value,
        ),
        Statement::Return(Some(Expression::IntLiteral(0))),
    ]);
    let errors = errors_of(&unit);
    assert!(errors
        .iter()
        .any(|k| matches!(k, NoteKind::ReferenceValueInit)));
}

#[test]
fn test_string_literal_must_fit_in_char_array() {
    let unit = main_with(vec![
        declare(
            "buf",
            TypeSpec::Array(Box::new(TypeSpec::Char), Some(1)),
            InitializerForm::Direct(vec![Expression::StringLiteral("hi".into())]),
        ),
        Statement::Return(Some(Expression::IntLiteral(0))),
    ]);
    let errors = errors_of(&unit);
    assert!(errors
        .iter()
        .any(|k| matches!(k, NoteKind::StringLiteralTooLong { .. })));
}

#[test]
fn test_string_literal_exact_fit_compiles() {
    // "hi" plus its terminator fills char[3] exactly.
    let unit = main_with(vec![
        declare(
            "buf",
            TypeSpec::Array(Box::new(TypeSpec::Char), Some(3)),
            InitializerForm::Direct(vec![Expression::StringLiteral("hi".into())]),
        ),
        Statement::Return(Some(Expression::IntLiteral(0))),
    ]);
    compile(&unit).expect("exact-fit string literal should compile");
}

#[test]
fn test_too_many_array_initializers() {
    let unit = main_with(vec![
        declare(
            "a",
            TypeSpec::Array(Box::new(TypeSpec::Int), Some(2)),
            InitializerForm::List(vec![
                Expression::IntLiteral(1),
                Expression::IntLiteral(2),
                Expression::IntLiteral(3),
            ]),
        ),
        Statement::Return(Some(Expression::IntLiteral(0))),
    ]);
    let errors = errors_of(&unit);
    assert!(errors
        .iter()
        .any(|k| matches!(k, NoteKind::TooManyInitializers { .. })));
}

#[test]
fn test_missing_main_is_reported() {
    let unit = TranslationUnit::default();
    let errors = errors_of(&unit);
    assert!(errors.iter().any(|k| matches!(k, NoteKind::NoMainFunction)));
}

#[test]
fn test_calling_an_undefined_function_is_reported() {
    let unit = TranslationUnit {
        declarations: vec![
            // Declared but never defined.
            TopLevelDeclaration::Function(FunctionDeclaration {
                name: "f".into(),
                return_type: TypeSpec::Int,
                params: vec![],
                body: None,
                is_const: false,
            }),
            TopLevelDeclaration::Function(FunctionDeclaration {
                name: "main".into(),
                return_type: TypeSpec::Int,
                params: vec![],
                body: Some(vec![Statement::Return(Some(Expression::Call {
                    name: "f".into(),
                    args: vec![],
                }))]),
                is_const: false,
            }),
        ],
    };
    let errors = errors_of(&unit);
    assert!(errors
        .iter()
        .any(|k| matches!(k, NoteKind::FunctionNotDefined { .. })));
}

#[test]
fn test_declared_but_undefined_main_is_reported() {
    // `int main();` with no body anywhere: the synthesized entry call has
    // nothing to run.
    let unit = TranslationUnit {
        declarations: vec![TopLevelDeclaration::Function(FunctionDeclaration {
            name: "main".into(),
            return_type: TypeSpec::Int,
            params: vec![],
            body: None,
            is_const: false,
        })],
    };
    let errors = errors_of(&unit);
    assert!(
        errors
            .iter()
            .any(|k| matches!(k, NoteKind::FunctionNotDefined { .. })),
        "got: {:?}",
        errors
    );
}

#[test]
fn test_no_matching_overload_is_reported() {
    let unit = TranslationUnit {
        declarations: vec![
            TopLevelDeclaration::Function(FunctionDeclaration {
                name: "add".into(),
                return_type: TypeSpec::Int,
                params: vec![
                    ParameterDeclaration {
                        name: "a".into(),
                        type_spec: TypeSpec::Int,
                    },
                    ParameterDeclaration {
                        name: "b".into(),
                        type_spec: TypeSpec::Int,
                    },
                ],
                body: Some(vec![Statement::Return(Some(Expression::IntLiteral(0)))]),
                is_const: false,
            }),
            TopLevelDeclaration::Function(FunctionDeclaration {
                name: "main".into(),
                return_type: TypeSpec::Int,
                params: vec![],
                body: Some(vec![Statement::Return(Some(Expression::Call {
                    name: "add".into(),
                    args: vec![Expression::IntLiteral(1)],
                }))]),
                is_const: false,
            }),
        ],
    };
    let errors = errors_of(&unit);
    assert!(errors
        .iter()
        .any(|k| matches!(k, NoteKind::NoMatchingFunction { .. })));
}

#[test]
fn test_non_const_method_on_const_receiver_is_rejected() {
    let unit = TranslationUnit {
        declarations: vec![
            TopLevelDeclaration::Class(ClassDeclaration {
                name: "C".into(),
                base: None,
                members: vec![],
                constructors: vec![],
                destructor: None,
                methods: vec![FunctionDeclaration {
                    name: "m".into(),
                    return_type: TypeSpec::Void,
                    params: vec![],
                    body: Some(vec![]),
                    is_const: false,
                }],
            }),
            TopLevelDeclaration::Function(FunctionDeclaration {
                name: "main".into(),
                return_type: TypeSpec::Int,
                params: vec![],
                body: Some(vec![
                    declare(
                        "c",
                        TypeSpec::Const(Box::new(TypeSpec::Named("C".into()))),
                        InitializerForm::Value,
                    ),
                    Statement::Expression(Expression::MethodCall {
                        object: Box::new(Expression::Identifier("c".into())),
                        name: "m".into(),
                        args: vec![],
                    }),
                    Statement::Return(Some(Expression::IntLiteral(0))),
                ]),
                is_const: false,
            }),
        ],
    };
    let errors = errors_of(&unit);
    assert!(errors
        .iter()
        .any(|k| matches!(k, NoteKind::ConstReceiver { .. })));
}

#[test]
fn test_returning_a_value_from_void_function_is_rejected() {
    let unit = TranslationUnit {
        declarations: vec![
            TopLevelDeclaration::Function(FunctionDeclaration {
                name: "noisy".into(),
                return_type: TypeSpec::Void,
                params: vec![],
                body: Some(vec![Statement::Return(Some(Expression::IntLiteral(1)))]),
                is_const: false,
            }),
            TopLevelDeclaration::Function(FunctionDeclaration {
                name: "main".into(),
                return_type: TypeSpec::Int,
                params: vec![],
                body: Some(vec![Statement::Return(Some(Expression::IntLiteral(0)))]),
                is_const: false,
            }),
        ],
    };
    let errors = errors_of(&unit);
    assert!(errors
        .iter()
        .any(|k| matches!(k, NoteKind::ReturnValueInVoidFunction)));
}

#[test]
fn test_unknown_identifier_is_reported() {
    let unit = main_with(vec![Statement::Return(Some(Expression::Identifier(
        "ghost".into(),
    )))]);
    let errors = errors_of(&unit);
    assert!(errors
        .iter()
        .any(|k| matches!(k, NoteKind::UnknownName { .. })));
}
