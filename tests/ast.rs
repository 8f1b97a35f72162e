//! AST construction tests covering the end-to-end scenarios and the
//! structural properties of the builder: precedence, associativity,
//! sequence flattening and single-child elision.

use neon_lang::{
    ast::{print_ast, AstBuilder, AstNode, BinaryOperator, DataType, NodeKind, UnaryOperator},
    diagnostics::Diagnostics,
    lexer::Lexer,
    loader::StringCodeProvider,
    parser::Parser,
};

fn build(source: &str) -> AstNode {
    let mut diagnostics = Diagnostics::new();
    let lexer = Lexer::new(Box::new(StringCodeProvider::from_source(source)));
    let tree = Parser::new(lexer)
        .create_parse_tree(&mut diagnostics)
        .expect("program should parse");
    let ast = AstBuilder::new()
        .run(tree, &mut diagnostics)
        .expect("AST should build");
    assert!(diagnostics.is_empty(), "unexpected diagnostics: {diagnostics}");
    ast
}

/// Unwraps the statement node the builder puts around a single statement.
fn statement_child(node: &AstNode) -> &AstNode {
    match &node.kind {
        NodeKind::Statement {
            child: Some(child), ..
        } => child,
        other => panic!("expected a statement with a child, found {other:?}"),
    }
}

fn as_integer(node: &AstNode) -> i64 {
    match node.kind {
        NodeKind::IntegerLiteral { value } => value,
        ref other => panic!("expected an integer literal, found {other:?}"),
    }
}

#[test]
fn builds_sum_of_literals() {
    let root = build("1 + 1.5;");
    let NodeKind::BinaryOperation { op, left, right } = &statement_child(&root).kind else {
        panic!("expected a binary operation");
    };

    assert_eq!(*op, BinaryOperator::Add);
    assert_eq!(as_integer(left), 1);
    assert!(matches!(right.kind, NodeKind::FloatLiteral { value } if value == 1.5));
}

#[test]
fn builds_boolean_negation() {
    let root = build("not true;");
    let NodeKind::UnaryOperation { op, child } = &statement_child(&root).kind else {
        panic!("expected a unary operation");
    };

    assert_eq!(*op, UnaryOperator::Not);
    assert!(matches!(child.kind, NodeKind::BoolLiteral { value: true }));
}

#[test]
fn builds_two_statement_program() {
    let root = build("int a = 1 + 1; int b = a + 2;");
    let NodeKind::Sequence { children } = &root.kind else {
        panic!("expected a sequence");
    };
    assert_eq!(children.len(), 2);

    let NodeKind::Assignment { left, right } = &statement_child(&children[0]).kind else {
        panic!("expected an assignment");
    };
    assert!(matches!(
        &left.kind,
        NodeKind::VariableDefinition { name, data_type: DataType::Int } if name == "a"
    ));
    let NodeKind::BinaryOperation { op, .. } = &right.kind else {
        panic!("expected an addition");
    };
    assert_eq!(*op, BinaryOperator::Add);

    let NodeKind::Assignment { left, right } = &statement_child(&children[1]).kind else {
        panic!("expected an assignment");
    };
    assert!(matches!(
        &left.kind,
        NodeKind::VariableDefinition { name, data_type: DataType::Int } if name == "b"
    ));
    let NodeKind::BinaryOperation { left, .. } = &right.kind else {
        panic!("expected an addition");
    };
    assert!(matches!(&left.kind, NodeKind::Variable { name, index: None } if name == "a"));
}

#[test]
fn builds_if_statement_with_empty_bodies() {
    let root = build("if ( true ) { } else { }");
    let NodeKind::IfStatement {
        condition,
        if_body,
        else_body,
    } = &statement_child(&root).kind
    else {
        panic!("expected an if statement");
    };

    assert!(matches!(condition.kind, NodeKind::BoolLiteral { value: true }));
    for body in [if_body, else_body] {
        let body = body.as_ref().expect("both bodies are present");
        assert!(
            matches!(&body.kind, NodeKind::Sequence { children } if children.is_empty()),
            "empty braces become an empty sequence"
        );
    }
}

#[test]
fn builds_empty_function() {
    let root = build("fun helloWorld(int i) int { }");
    let NodeKind::Function {
        name,
        return_type,
        arguments,
        body,
    } = &statement_child(&root).kind
    else {
        panic!("expected a function");
    };

    assert_eq!(name, "helloWorld");
    assert_eq!(*return_type, DataType::Int);
    assert_eq!(arguments.len(), 1);
    assert!(matches!(
        &arguments[0].kind,
        NodeKind::VariableDefinition { name, data_type: DataType::Int } if name == "i"
    ));

    let body = body.as_ref().expect("defined functions carry a body");
    assert!(matches!(&body.kind, NodeKind::Sequence { children } if children.is_empty()));
}

#[test]
fn builds_return_with_call() {
    let root = build("return hello ( ) ;");
    let NodeKind::Statement { is_return, child } = &root.kind else {
        panic!("expected a statement");
    };

    assert!(*is_return);
    let child = child.as_ref().expect("return carries its expression");
    assert!(
        matches!(&child.kind, NodeKind::Call { name, arguments } if name == "hello" && arguments.is_empty())
    );
}

#[test]
fn builds_bare_return() {
    let root = build("return;");
    assert!(matches!(
        &root.kind,
        NodeKind::Statement {
            is_return: true,
            child: None
        }
    ));
}

#[test]
fn subtraction_is_left_associative() {
    let root = build("1 - 2 - 3;");
    let NodeKind::BinaryOperation { op, left, right } = &statement_child(&root).kind else {
        panic!("expected a binary operation");
    };

    assert_eq!(*op, BinaryOperator::Sub);
    assert_eq!(as_integer(right), 3);

    let NodeKind::BinaryOperation { op, left, right } = &left.kind else {
        panic!("expected a nested binary operation");
    };
    assert_eq!(*op, BinaryOperator::Sub);
    assert_eq!(as_integer(left), 1);
    assert_eq!(as_integer(right), 2);
}

#[test]
fn multiplication_binds_tighter_than_addition() {
    let root = build("1 + 2 * 3;");
    let NodeKind::BinaryOperation { op, left, right } = &statement_child(&root).kind else {
        panic!("expected a binary operation");
    };

    assert_eq!(*op, BinaryOperator::Add);
    assert_eq!(as_integer(left), 1);

    let NodeKind::BinaryOperation { op, left, right } = &right.kind else {
        panic!("expected a nested binary operation");
    };
    assert_eq!(*op, BinaryOperator::Mul);
    assert_eq!(as_integer(left), 2);
    assert_eq!(as_integer(right), 3);
}

#[test]
fn negation_binds_looser_than_relation() {
    let root = build("not 1 < 2;");
    let NodeKind::UnaryOperation { op, child } = &statement_child(&root).kind else {
        panic!("expected a unary operation");
    };
    assert_eq!(*op, UnaryOperator::Not);

    let NodeKind::BinaryOperation { op, .. } = &child.kind else {
        panic!("expected a relation under the negation");
    };
    assert_eq!(*op, BinaryOperator::Lt);
}

#[test]
fn parenthesised_factors_disappear() {
    let root = build("(1 + 2) * 3;");
    let NodeKind::BinaryOperation { op, left, .. } = &statement_child(&root).kind else {
        panic!("expected a binary operation");
    };
    assert_eq!(*op, BinaryOperator::Mul);
    assert!(matches!(
        &left.kind,
        NodeKind::BinaryOperation {
            op: BinaryOperator::Add,
            ..
        }
    ));
}

#[test]
fn sequences_are_flattened_and_never_single_child() {
    let root = build("1; 2; 3;");
    let NodeKind::Sequence { children } = &root.kind else {
        panic!("expected a sequence");
    };
    assert_eq!(children.len(), 3);

    fn no_single_child_sequence(node: &AstNode) {
        if let NodeKind::Sequence { children } = &node.kind {
            assert_ne!(children.len(), 1, "single-child sequences must collapse");
            for child in children {
                no_single_child_sequence(child);
            }
        }
    }
    no_single_child_sequence(&root);
}

#[test]
fn single_statement_collapses_to_the_statement() {
    let root = build("1 + 1;");
    assert!(matches!(root.kind, NodeKind::Statement { .. }));
}

#[test]
fn builds_extern_function_without_body() {
    let root = build("extern fun putchar(int c) int");
    let NodeKind::Function {
        name,
        return_type,
        arguments,
        body,
    } = &statement_child(&root).kind
    else {
        panic!("expected a function");
    };

    assert_eq!(name, "putchar");
    assert_eq!(*return_type, DataType::Int);
    assert_eq!(arguments.len(), 1);
    assert!(body.is_none());
}

#[test]
fn builds_for_statement() {
    let root = build("for (int i = 0; i < 3; i = i + 1) { i; }");
    let NodeKind::ForStatement {
        init,
        condition,
        update,
        body,
    } = &statement_child(&root).kind
    else {
        panic!("expected a for statement");
    };

    assert!(matches!(
        &statement_child(init).kind,
        NodeKind::Assignment { .. }
    ));
    assert!(matches!(
        &condition.kind,
        NodeKind::BinaryOperation {
            op: BinaryOperator::Lt,
            ..
        }
    ));
    assert!(matches!(
        &statement_child(update).kind,
        NodeKind::Assignment { .. }
    ));
    assert!(body.is_some());
}

#[test]
fn builds_import_and_type_declaration() {
    let root = build("import \"lib/vectors.ne\"; type Point { int x; int y; };");
    let NodeKind::Sequence { children } = &root.kind else {
        panic!("expected a sequence");
    };

    assert!(matches!(
        &statement_child(&children[0]).kind,
        NodeKind::Import { file_name } if file_name == "lib/vectors.ne"
    ));

    let NodeKind::TypeDeclaration { name, members } = &statement_child(&children[1]).kind else {
        panic!("expected a type declaration");
    };
    assert_eq!(name, "Point");
    assert_eq!(members.len(), 2);
    assert_eq!(members[0].name, "x");
    assert_eq!(members[1].name, "y");
    assert!(members.iter().all(|m| m.data_type == DataType::Int));
}

#[test]
fn builds_array_access_on_both_sides() {
    let root = build("values[0] = values[1];");
    let NodeKind::Assignment { left, right } = &statement_child(&root).kind else {
        panic!("expected an assignment");
    };

    for side in [left, right] {
        assert!(matches!(
            &side.kind,
            NodeKind::Variable { index: Some(_), .. }
        ));
    }
}

#[test]
fn printed_ast_is_stable() {
    let source = "int a = 1; fun main() int { if (a > 0) { return a; } return 0; }";
    let first = print_ast(&build(source));
    let second = print_ast(&build(source));
    assert_eq!(first, second);
    assert!(first.contains("Function(name='main'"));
}
