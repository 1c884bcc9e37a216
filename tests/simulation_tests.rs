// End-to-end runs: compile a translation unit, step the simulation to
// completion, and check results and observable events.

use cxxsim::ast::*;
use cxxsim::entities::EntityKind;
use cxxsim::memory::object::StorageKind;
use cxxsim::memory::value::Value;
use cxxsim::memory::ObjectId;
use cxxsim::{compile, Program, SimEvent, SimStatus, Simulation};

const STEP_LIMIT: usize = 100_000;

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

fn function(name: &str, return_type: TypeSpec, params: Vec<(&str, TypeSpec)>, body: Vec<Statement>) -> TopLevelDeclaration {
    TopLevelDeclaration::Function(FunctionDeclaration {
        name: name.into(),
        return_type,
        params: params
            .into_iter()
            .map(|(name, type_spec)| ParameterDeclaration {
                name: name.into(),
                type_spec,
            })
            .collect(),
        body: Some(body),
        is_const: false,
    })
}

fn declare(name: &str, type_spec: TypeSpec, init: InitializerForm) -> Statement {
    Statement::Declaration(VariableDeclaration {
        name: name.into(),
        type_spec,
        init,
    })
}

fn ident(name: &str) -> Expression {
    Expression::Identifier(name.into())
}

fn int(value: i64) -> Expression {
    Expression::IntLiteral(value)
}

fn add(lhs: Expression, rhs: Expression) -> Expression {
    Expression::Binary {
        op: BinaryOperator::Add,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

fn call(name: &str, args: Vec<Expression>) -> Expression {
    Expression::Call {
        name: name.into(),
        args,
    }
}

fn compiled(unit: &TranslationUnit) -> Program {
    match compile(unit) {
        Ok(program) => program,
        Err(notes) => panic!("compilation failed: {:?}", notes),
    }
}

fn run_to_end(program: &Program) -> Simulation<'_> {
    let mut sim = Simulation::new(program);
    sim.run(STEP_LIMIT);
    assert!(sim.is_done(), "simulation did not finish: {:?}", sim);
    sim
}

fn function_entity(program: &Program, name: &str) -> usize {
    program
        .symbols
        .entities
        .iter()
        .position(|e| e.name == name && matches!(e.kind, EntityKind::Function(_)))
        .expect("function entity not found")
}

fn temp_inits(sim: &Simulation<'_>) -> Vec<ObjectId> {
    sim.events()
        .iter()
        .filter_map(|e| match e {
            SimEvent::ObjectInitialized {
                object,
                storage: StorageKind::Temporary,
            } => Some(*object),
            _ => None,
        })
        .collect()
}

fn temp_destroys(sim: &Simulation<'_>) -> Vec<ObjectId> {
    sim.events()
        .iter()
        .filter_map(|e| match e {
            SimEvent::ObjectDestroyed {
                object,
                storage: StorageKind::Temporary,
            } => Some(*object),
            _ => None,
        })
        .collect()
}

#[test]
fn test_simple_arithmetic() {
    let unit = main_with(vec![
        declare("x", TypeSpec::Int, InitializerForm::Direct(vec![int(5)])),
        declare("y", TypeSpec::Int, InitializerForm::Direct(vec![int(10)])),
        Statement::Return(Some(add(ident("x"), ident("y")))),
    ]);
    let program = compiled(&unit);
    let sim = run_to_end(&program);
    assert_eq!(sim.status(), SimStatus::Finished);
    assert_eq!(sim.main_return(), Some(Value::Int(15)));
}

#[test]
fn test_function_call() {
    let unit = TranslationUnit {
        declarations: vec![
            function(
                "add",
                TypeSpec::Int,
                vec![("a", TypeSpec::Int), ("b", TypeSpec::Int)],
                vec![Statement::Return(Some(add(ident("a"), ident("b"))))],
            ),
            function(
                "main",
                TypeSpec::Int,
                vec![],
                vec![Statement::Return(Some(call("add", vec![int(3), int(4)])))],
            ),
        ],
    };
    let program = compiled(&unit);
    let sim = run_to_end(&program);
    assert_eq!(sim.main_return(), Some(Value::Int(7)));
}

#[test]
fn test_call_protocol_event_order() {
    let unit = TranslationUnit {
        declarations: vec![
            function(
                "add",
                TypeSpec::Int,
                vec![("a", TypeSpec::Int), ("b", TypeSpec::Int)],
                vec![Statement::Return(Some(add(ident("a"), ident("b"))))],
            ),
            function(
                "main",
                TypeSpec::Int,
                vec![],
                vec![Statement::Return(Some(call("add", vec![int(3), int(4)])))],
            ),
        ],
    };
    let program = compiled(&unit);
    let add_entity = function_entity(&program, "add");
    let main_entity = program.main;
    let sim = run_to_end(&program);

    let events = sim.events();
    let index_of = |wanted: &SimEvent| {
        events
            .iter()
            .position(|e| e == wanted)
            .unwrap_or_else(|| panic!("missing event {:?}", wanted))
    };
    let main_called = index_of(&SimEvent::Called {
        function: main_entity,
    });
    let add_called = index_of(&SimEvent::Called {
        function: add_entity,
    });
    let add_returned = index_of(&SimEvent::Returned {
        function: add_entity,
    });
    let main_returned = index_of(&SimEvent::Returned {
        function: main_entity,
    });

    assert!(main_called < add_called);
    assert!(add_called < add_returned);
    assert!(add_returned < main_returned);

    // Both parameters are initialized before control enters the function.
    let param_inits = events[..add_called]
        .iter()
        .filter(|e| {
            matches!(
                e,
                SimEvent::ObjectInitialized {
                    storage: StorageKind::Automatic,
                    ..
                }
            )
        })
        .count();
    assert!(param_inits >= 2, "expected parameter inits before the call");
}

#[test]
fn test_overload_resolution_picks_first_viable() {
    // Declaration order decides: the int argument converts to double, so
    // the earlier overload wins even though the later one matches exactly.
    let unit = TranslationUnit {
        declarations: vec![
            function(
                "f",
                TypeSpec::Int,
                vec![("x", TypeSpec::Double)],
                vec![Statement::Return(Some(int(1)))],
            ),
            function(
                "f",
                TypeSpec::Int,
                vec![("x", TypeSpec::Int)],
                vec![Statement::Return(Some(int(2)))],
            ),
            function(
                "main",
                TypeSpec::Int,
                vec![],
                vec![Statement::Return(Some(call("f", vec![int(5)])))],
            ),
        ],
    };
    let program = compiled(&unit);
    let sim = run_to_end(&program);
    assert_eq!(sim.main_return(), Some(Value::Int(1)));
}

#[test]
fn test_globals_initialized_before_main() {
    let unit = TranslationUnit {
        declarations: vec![
            TopLevelDeclaration::Global(VariableDeclaration {
                name: "g".into(),
                type_spec: TypeSpec::Int,
                init: InitializerForm::Direct(vec![int(7)]),
            }),
            function(
                "main",
                TypeSpec::Int,
                vec![],
                vec![Statement::Return(Some(ident("g")))],
            ),
        ],
    };
    let program = compiled(&unit);
    let main_entity = program.main;
    let sim = run_to_end(&program);
    assert_eq!(sim.main_return(), Some(Value::Int(7)));

    let events = sim.events();
    let global_init = events
        .iter()
        .position(|e| {
            matches!(
                e,
                SimEvent::ObjectInitialized {
                    storage: StorageKind::Static,
                    ..
                }
            )
        })
        .expect("global init event");
    let main_called = events
        .iter()
        .position(|e| {
            e == &SimEvent::Called {
                function: main_entity,
            }
        })
        .expect("main call event");
    assert!(global_init < main_called);
}

#[test]
fn test_char_array_from_string_literal() {
    // char buf[5] = "hi"; unspecified elements are null-padded.
    let unit = main_with(vec![
        declare(
            "buf",
            TypeSpec::Array(Box::new(TypeSpec::Char), Some(5)),
            InitializerForm::Direct(vec![Expression::StringLiteral("hi".into())]),
        ),
        Statement::Return(Some(add(
            Expression::Subscript {
                target: Box::new(ident("buf")),
                index: Box::new(int(1)),
            },
            Expression::Subscript {
                target: Box::new(ident("buf")),
                index: Box::new(int(3)),
            },
        ))),
    ]);
    let program = compiled(&unit);
    let sim = run_to_end(&program);
    assert_eq!(sim.status(), SimStatus::Finished);
    // 'i' + '\0'
    assert_eq!(sim.main_return(), Some(Value::Int(105)));
}

#[test]
fn test_temporaries_destroyed_in_reverse_order() {
    let unit = TranslationUnit {
        declarations: vec![
            function(
                "take",
                TypeSpec::Void,
                vec![
                    (
                        "a",
                        TypeSpec::Reference(Box::new(TypeSpec::Const(Box::new(TypeSpec::Int)))),
                    ),
                    (
                        "b",
                        TypeSpec::Reference(Box::new(TypeSpec::Const(Box::new(TypeSpec::Int)))),
                    ),
                ],
                vec![],
            ),
            function(
                "main",
                TypeSpec::Int,
                vec![],
                vec![
                    Statement::Expression(call("take", vec![int(1), int(2)])),
                    Statement::Return(Some(int(0))),
                ],
            ),
        ],
    };
    let program = compiled(&unit);
    let sim = run_to_end(&program);

    // Two argument temporaries plus main's return slot.
    let inits = temp_inits(&sim);
    let destroys = temp_destroys(&sim);
    assert_eq!(inits.len(), 3, "events: {:?}", sim.events());
    assert_eq!(destroys.len(), 3);
    assert_eq!(destroys[0], inits[1], "second temporary dies first");
    assert_eq!(destroys[1], inits[0]);
    assert_eq!(destroys[2], inits[2]);
}

#[test]
fn test_unevaluated_temporaries_are_skipped() {
    // The right operand of && never runs, so neither its argument temporary
    // nor its return slot is ever materialized; cleanup skips them silently.
    let unit = TranslationUnit {
        declarations: vec![
            function(
                "probe",
                TypeSpec::Bool,
                vec![(
                    "x",
                    TypeSpec::Reference(Box::new(TypeSpec::Const(Box::new(TypeSpec::Int)))),
                )],
                vec![Statement::Return(Some(Expression::BoolLiteral(true)))],
            ),
            function(
                "main",
                TypeSpec::Int,
                vec![],
                vec![
                    declare(
                        "b",
                        TypeSpec::Bool,
                        InitializerForm::Direct(vec![Expression::Logical {
                            op: LogicalOperator::And,
                            lhs: Box::new(Expression::BoolLiteral(false)),
                            rhs: Box::new(call("probe", vec![int(1)])),
                        }]),
                    ),
                    Statement::Return(Some(int(0))),
                ],
            ),
        ],
    };
    let program = compiled(&unit);
    let sim = run_to_end(&program);
    assert_eq!(sim.status(), SimStatus::Finished);

    // Only main's own return slot ever exists.
    assert_eq!(temp_inits(&sim).len(), 1, "events: {:?}", sim.events());
    assert_eq!(temp_destroys(&sim).len(), 1);
    assert_eq!(sim.main_return(), Some(Value::Int(0)));
}

#[test]
fn test_reading_a_dead_object_is_undefined() {
    let unit = main_with(vec![
        declare(
            "p",
            TypeSpec::Pointer(Box::new(TypeSpec::Int)),
            InitializerForm::Direct(vec![Expression::NullptrLiteral]),
        ),
        Statement::Block(vec![
            declare("x", TypeSpec::Int, InitializerForm::Direct(vec![int(5)])),
            Statement::Expression(Expression::Assignment {
                lhs: Box::new(ident("p")),
                rhs: Box::new(Expression::Unary {
                    op: UnaryOperator::AddrOf,
                    operand: Box::new(ident("x")),
                }),
            }),
        ]),
        Statement::Return(Some(Expression::Unary {
            op: UnaryOperator::Deref,
            operand: Box::new(ident("p")),
        })),
    ]);
    let program = compiled(&unit);
    let sim = run_to_end(&program);

    // Undefined, not fatal: the run completes and the incident is logged.
    assert_eq!(sim.status(), SimStatus::Finished);
    assert!(sim.events().iter().any(|e| matches!(
        e,
        SimEvent::UndefinedBehavior {
            reason: cxxsim::runtime::events::UbReason::ReadDeadObject,
            ..
        }
    )));
}

#[test]
fn test_reading_uninitialized_is_undefined() {
    let unit = main_with(vec![
        declare("x", TypeSpec::Int, InitializerForm::Default),
        declare("y", TypeSpec::Int, InitializerForm::Direct(vec![ident("x")])),
        Statement::Return(Some(int(0))),
    ]);
    let program = compiled(&unit);
    let sim = run_to_end(&program);
    assert_eq!(sim.status(), SimStatus::Finished);
    assert!(sim.events().iter().any(|e| matches!(
        e,
        SimEvent::UndefinedBehavior {
            reason: cxxsim::runtime::events::UbReason::ReadUninitialized,
            ..
        }
    )));
}

#[test]
fn test_null_dereference_crashes() {
    let unit = main_with(vec![
        declare(
            "p",
            TypeSpec::Pointer(Box::new(TypeSpec::Int)),
            InitializerForm::Direct(vec![Expression::NullptrLiteral]),
        ),
        Statement::Return(Some(Expression::Unary {
            op: UnaryOperator::Deref,
            operand: Box::new(ident("p")),
        })),
    ]);
    let program = compiled(&unit);
    let mut sim = Simulation::new(&program);
    sim.run(STEP_LIMIT);
    assert_eq!(sim.status(), SimStatus::Crashed);
    assert!(sim
        .events()
        .iter()
        .any(|e| matches!(e, SimEvent::Crash { .. })));
}

#[test]
fn test_failed_assert_is_reported_and_execution_continues() {
    // Advisory, like the undefined-behavior events: the failure is logged
    // and the rest of the program still runs.
    let unit = main_with(vec![
        Statement::Expression(call("assert", vec![Expression::BoolLiteral(false)])),
        Statement::Return(Some(int(3))),
    ]);
    let program = compiled(&unit);
    let sim = run_to_end(&program);
    assert_eq!(sim.status(), SimStatus::Finished);
    assert!(sim
        .events()
        .iter()
        .any(|e| matches!(e, SimEvent::AssertionFailure { .. })));
    assert_eq!(sim.main_return(), Some(Value::Int(3)));
}

#[test]
fn test_passing_assert_continues() {
    let unit = main_with(vec![
        Statement::Expression(call("assert", vec![Expression::BoolLiteral(true)])),
        Statement::Return(Some(int(3))),
    ]);
    let program = compiled(&unit);
    let sim = run_to_end(&program);
    assert_eq!(sim.status(), SimStatus::Finished);
    assert_eq!(sim.main_return(), Some(Value::Int(3)));
}

#[test]
fn test_members_destroyed_in_reverse_of_construction() {
    let unit = TranslationUnit {
        declarations: vec![
            TopLevelDeclaration::Class(ClassDeclaration {
                name: "Pair".into(),
                base: None,
                members: vec![
                    MemberDeclaration {
                        name: "a".into(),
                        type_spec: TypeSpec::Int,
                    },
                    MemberDeclaration {
                        name: "b".into(),
                        type_spec: TypeSpec::Int,
                    },
                ],
                constructors: vec![ConstructorDeclaration {
                    params: vec![],
                    member_initializers: vec![
                        ("a".into(), vec![int(1)]),
                        ("b".into(), vec![int(2)]),
                    ],
                    body: vec![],
                }],
                destructor: None,
                methods: vec![],
            }),
            function(
                "main",
                TypeSpec::Int,
                vec![],
                vec![
                    declare("p", TypeSpec::Named("Pair".into()), InitializerForm::Default),
                    Statement::Return(Some(int(0))),
                ],
            ),
        ],
    };
    let program = compiled(&unit);
    let sim = run_to_end(&program);

    let inits: Vec<ObjectId> = sim
        .events()
        .iter()
        .filter_map(|e| match e {
            SimEvent::ObjectInitialized {
                object,
                storage: StorageKind::Automatic | StorageKind::Subobject,
            } => Some(*object),
            _ => None,
        })
        .collect();
    let destroys: Vec<ObjectId> = sim
        .events()
        .iter()
        .filter_map(|e| match e {
            SimEvent::ObjectDestroyed {
                object,
                storage: StorageKind::Automatic | StorageKind::Subobject,
            } => Some(*object),
            _ => None,
        })
        .collect();

    // Members a, b, then the pair itself; teardown runs b, a, then the pair.
    assert_eq!(inits.len(), 3, "events: {:?}", sim.events());
    assert_eq!(destroys, vec![inits[1], inits[0], inits[2]]);
}

#[test]
fn test_methods_mutate_the_receiver() {
    let unit = TranslationUnit {
        declarations: vec![
            TopLevelDeclaration::Class(ClassDeclaration {
                name: "Counter".into(),
                base: None,
                members: vec![MemberDeclaration {
                    name: "n".into(),
                    type_spec: TypeSpec::Int,
                }],
                constructors: vec![ConstructorDeclaration {
                    params: vec![],
                    member_initializers: vec![("n".into(), vec![int(0)])],
                    body: vec![],
                }],
                destructor: None,
                methods: vec![
                    FunctionDeclaration {
                        name: "bump".into(),
                        return_type: TypeSpec::Void,
                        params: vec![],
                        body: Some(vec![Statement::Expression(Expression::Assignment {
                            lhs: Box::new(ident("n")),
                            rhs: Box::new(add(ident("n"), int(1))),
                        })]),
                        is_const: false,
                    },
                    FunctionDeclaration {
                        name: "get".into(),
                        return_type: TypeSpec::Int,
                        params: vec![],
                        body: Some(vec![Statement::Return(Some(ident("n")))]),
                        is_const: true,
                    },
                ],
            }),
            function(
                "main",
                TypeSpec::Int,
                vec![],
                vec![
                    declare(
                        "c",
                        TypeSpec::Named("Counter".into()),
                        InitializerForm::Default,
                    ),
                    Statement::Expression(Expression::MethodCall {
                        object: Box::new(ident("c")),
                        name: "bump".into(),
                        args: vec![],
                    }),
                    Statement::Expression(Expression::MethodCall {
                        object: Box::new(ident("c")),
                        name: "bump".into(),
                        args: vec![],
                    }),
                    Statement::Return(Some(Expression::MethodCall {
                        object: Box::new(ident("c")),
                        name: "get".into(),
                        args: vec![],
                    })),
                ],
            ),
        ],
    };
    let program = compiled(&unit);
    let sim = run_to_end(&program);
    assert_eq!(sim.main_return(), Some(Value::Int(2)));
}

#[test]
fn test_base_subobject_members() {
    let unit = TranslationUnit {
        declarations: vec![
            TopLevelDeclaration::Class(ClassDeclaration {
                name: "Base".into(),
                base: None,
                members: vec![MemberDeclaration {
                    name: "b".into(),
                    type_spec: TypeSpec::Int,
                }],
                constructors: vec![ConstructorDeclaration {
                    params: vec![],
                    member_initializers: vec![("b".into(), vec![int(1)])],
                    body: vec![],
                }],
                destructor: None,
                methods: vec![],
            }),
            TopLevelDeclaration::Class(ClassDeclaration {
                name: "Derived".into(),
                base: Some("Base".into()),
                members: vec![MemberDeclaration {
                    name: "d".into(),
                    type_spec: TypeSpec::Int,
                }],
                constructors: vec![ConstructorDeclaration {
                    params: vec![],
                    member_initializers: vec![
                        ("Base".into(), vec![]),
                        ("d".into(), vec![int(2)]),
                    ],
                    body: vec![],
                }],
                destructor: None,
                methods: vec![],
            }),
            function(
                "main",
                TypeSpec::Int,
                vec![],
                vec![
                    declare(
                        "x",
                        TypeSpec::Named("Derived".into()),
                        InitializerForm::Default,
                    ),
                    Statement::Return(Some(add(
                        Expression::MemberAccess {
                            object: Box::new(ident("x")),
                            member: "b".into(),
                        },
                        Expression::MemberAccess {
                            object: Box::new(ident("x")),
                            member: "d".into(),
                        },
                    ))),
                ],
            ),
        ],
    };
    let program = compiled(&unit);
    let sim = run_to_end(&program);
    assert_eq!(sim.status(), SimStatus::Finished);
    assert_eq!(sim.main_return(), Some(Value::Int(3)));
}

#[test]
fn test_short_circuit_avoids_division_by_zero() {
    // false && (1/0 == 0) never evaluates the division.
    let unit = main_with(vec![
        declare(
            "ok",
            TypeSpec::Bool,
            InitializerForm::Direct(vec![Expression::Logical {
                op: LogicalOperator::And,
                lhs: Box::new(Expression::BoolLiteral(false)),
                rhs: Box::new(Expression::Binary {
                    op: BinaryOperator::Eq,
                    lhs: Box::new(Expression::Binary {
                        op: BinaryOperator::Div,
                        lhs: Box::new(int(1)),
                        rhs: Box::new(int(0)),
                    }),
                    rhs: Box::new(int(0)),
                }),
            }]),
        ),
        Statement::Return(Some(int(0))),
    ]);
    let program = compiled(&unit);
    let sim = run_to_end(&program);
    assert_eq!(sim.status(), SimStatus::Finished);
    assert!(!sim
        .events()
        .iter()
        .any(|e| matches!(e, SimEvent::UndefinedBehavior { .. })));
}

#[test]
fn test_pointer_walk_over_array() {
    // *(a + 2) on int a[3] = {10, 20, 30}
    let unit = main_with(vec![
        declare(
            "a",
            TypeSpec::Array(Box::new(TypeSpec::Int), Some(3)),
            InitializerForm::List(vec![int(10), int(20), int(30)]),
        ),
        Statement::Return(Some(Expression::Unary {
            op: UnaryOperator::Deref,
            operand: Box::new(add(ident("a"), int(2))),
        })),
    ]);
    let program = compiled(&unit);
    let sim = run_to_end(&program);
    assert_eq!(sim.status(), SimStatus::Finished);
    assert_eq!(sim.main_return(), Some(Value::Int(30)));
}

#[test]
fn test_pointer_past_the_end_dereference_is_undefined() {
    let unit = main_with(vec![
        declare(
            "a",
            TypeSpec::Array(Box::new(TypeSpec::Int), Some(2)),
            InitializerForm::List(vec![int(1), int(2)]),
        ),
        Statement::Return(Some(Expression::Unary {
            op: UnaryOperator::Deref,
            operand: Box::new(add(ident("a"), int(2))),
        })),
    ]);
    let program = compiled(&unit);
    let sim = run_to_end(&program);
    // One past the end is a valid pointer but not a valid dereference.
    assert_eq!(sim.status(), SimStatus::Finished);
    assert!(sim.events().iter().any(|e| matches!(
        e,
        SimEvent::UndefinedBehavior {
            reason: cxxsim::runtime::events::UbReason::DereferenceOutOfBounds,
            ..
        }
    )));
}
