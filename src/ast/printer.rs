//! Readable renderings of the AST.

use std::fmt::Write;

use super::{AstNode, NodeKind};

/// Indented multi-line description of the AST, one node per line with its
/// essential attributes.
pub fn print_ast(root: &AstNode) -> String {
    let mut out = String::new();
    print_node(root, 0, &mut out);
    out
}

fn print_node(node: &AstNode, depth: usize, out: &mut String) {
    for _ in 0..depth {
        out.push_str("  ");
    }

    match &node.kind {
        NodeKind::Sequence { children } => {
            let _ = writeln!(out, "Sequence(size={})", children.len());
            for child in children {
                print_node(child, depth + 1, out);
            }
        }
        NodeKind::Statement { is_return, child } => {
            let _ = writeln!(out, "Statement(is_return={is_return})");
            if let Some(child) = child {
                print_node(child, depth + 1, out);
            }
        }
        NodeKind::IntegerLiteral { value } => {
            let _ = writeln!(out, "IntegerLiteral(value={value})");
        }
        NodeKind::FloatLiteral { value } => {
            let _ = writeln!(out, "FloatLiteral(value={value})");
        }
        NodeKind::BoolLiteral { value } => {
            let _ = writeln!(out, "BoolLiteral(value={value})");
        }
        NodeKind::Variable { name, index } => {
            let _ = writeln!(out, "Variable(name='{name}')");
            if let Some(index) = index {
                print_node(index, depth + 1, out);
            }
        }
        NodeKind::VariableDefinition { name, data_type } => {
            let _ = writeln!(out, "VariableDefinition(name='{name}', type={data_type})");
        }
        NodeKind::Assignment { left, right } => {
            let _ = writeln!(out, "Assignment");
            print_node(left, depth + 1, out);
            print_node(right, depth + 1, out);
        }
        NodeKind::UnaryOperation { op, child } => {
            let _ = writeln!(out, "UnaryOperation(op={op:?})");
            print_node(child, depth + 1, out);
        }
        NodeKind::BinaryOperation { op, left, right } => {
            let _ = writeln!(out, "BinaryOperation(op={op:?})");
            print_node(left, depth + 1, out);
            print_node(right, depth + 1, out);
        }
        NodeKind::Function {
            name,
            return_type,
            arguments,
            body,
        } => {
            let _ = writeln!(
                out,
                "Function(name='{name}', return_type={return_type}, args={}, extern={})",
                arguments.len(),
                body.is_none()
            );
            for argument in arguments {
                print_node(argument, depth + 1, out);
            }
            if let Some(body) = body {
                print_node(body, depth + 1, out);
            }
        }
        NodeKind::Call { name, arguments } => {
            let _ = writeln!(out, "Call(name='{name}', args={})", arguments.len());
            for argument in arguments {
                print_node(argument, depth + 1, out);
            }
        }
        NodeKind::IfStatement {
            condition,
            if_body,
            else_body,
        } => {
            let _ = writeln!(out, "IfStatement");
            print_node(condition, depth + 1, out);
            if let Some(body) = if_body {
                print_node(body, depth + 1, out);
            }
            if let Some(body) = else_body {
                print_node(body, depth + 1, out);
            }
        }
        NodeKind::ForStatement {
            init,
            condition,
            update,
            body,
        } => {
            let _ = writeln!(out, "ForStatement");
            print_node(init, depth + 1, out);
            print_node(condition, depth + 1, out);
            print_node(update, depth + 1, out);
            if let Some(body) = body {
                print_node(body, depth + 1, out);
            }
        }
        NodeKind::Assert { condition } => {
            let _ = writeln!(out, "Assert");
            print_node(condition, depth + 1, out);
        }
        NodeKind::Import { file_name } => {
            let _ = writeln!(out, "Import(file='{file_name}')");
        }
        NodeKind::TypeDeclaration { name, members } => {
            let _ = writeln!(
                out,
                "TypeDeclaration(name='{name}', members={})",
                members.len()
            );
        }
    }
}

/// Flattens the AST shape into `(depth, kind)` pairs.
pub fn flatten_ast(root: &AstNode) -> Vec<(usize, &'static str)> {
    let mut out = vec![];
    flatten_into(root, 0, &mut out);
    out
}

fn flatten_into<'a>(node: &'a AstNode, depth: usize, out: &mut Vec<(usize, &'static str)>) {
    out.push((depth, node.kind_name()));

    let mut recurse = |child: &'a AstNode| flatten_into(child, depth + 1, out);
    match &node.kind {
        NodeKind::Sequence { children } => children.iter().for_each(recurse),
        NodeKind::Statement { child, .. } => {
            if let Some(child) = child {
                recurse(child);
            }
        }
        NodeKind::Variable { index, .. } => {
            if let Some(index) = index {
                recurse(index);
            }
        }
        NodeKind::Assignment { left, right } => {
            recurse(left);
            recurse(right);
        }
        NodeKind::UnaryOperation { child, .. } => recurse(child),
        NodeKind::BinaryOperation { left, right, .. } => {
            recurse(left);
            recurse(right);
        }
        NodeKind::Function {
            arguments, body, ..
        } => {
            arguments.iter().for_each(&mut recurse);
            if let Some(body) = body {
                recurse(body);
            }
        }
        NodeKind::Call { arguments, .. } => arguments.iter().for_each(recurse),
        NodeKind::IfStatement {
            condition,
            if_body,
            else_body,
        } => {
            recurse(condition);
            if let Some(body) = if_body {
                recurse(body);
            }
            if let Some(body) = else_body {
                recurse(body);
            }
        }
        NodeKind::ForStatement {
            init,
            condition,
            update,
            body,
        } => {
            recurse(init);
            recurse(condition);
            recurse(update);
            if let Some(body) = body {
                recurse(body);
            }
        }
        NodeKind::Assert { condition } => recurse(condition),
        _ => {}
    }
}

/// Renders the AST shape as a pair list that can be pasted into a test.
pub fn print_ast_test_case(root: &AstNode) -> String {
    let mut out = String::new();
    for (depth, kind) in flatten_ast(root) {
        let _ = writeln!(out, "({depth}, \"{kind}\"),");
    }
    out
}

/// Compact single-line rendering of an expression, used for assert messages.
pub fn print_expression(node: &AstNode) -> String {
    match &node.kind {
        NodeKind::IntegerLiteral { value } => value.to_string(),
        NodeKind::FloatLiteral { value } => value.to_string(),
        NodeKind::BoolLiteral { value } => value.to_string(),
        NodeKind::Variable { name, index } => match index {
            Some(index) => format!("{name}[{}]", print_expression(index)),
            None => name.clone(),
        },
        NodeKind::UnaryOperation { child, .. } => {
            format!("not {}", print_expression(child))
        }
        NodeKind::BinaryOperation { op, left, right } => {
            format!(
                "{} {op} {}",
                print_expression(left),
                print_expression(right)
            )
        }
        NodeKind::Call { name, arguments } => {
            let arguments: Vec<String> = arguments.iter().map(print_expression).collect();
            format!("{name}({})", arguments.join(", "))
        }
        _ => String::new(),
    }
}
