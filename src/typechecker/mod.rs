//! Type analysis.
//!
//! A single pass over the AST resolves a [`DataType`] for every
//! expression-bearing node and records it in a side map keyed by node id.
//! Mismatches are reported to the diagnostics collector and analysis keeps
//! going, so one pass surfaces as many problems as possible.

mod scope;

pub use scope::Scope;

use std::collections::HashMap;

use log::debug;

use crate::{
    ast::{AstNode, DataType, NodeId, NodeKind, UnaryOperator},
    diagnostics::Diagnostics,
};

/// Resolved type per AST node. Populated by the analyser, consumed by the IR
/// generator.
pub type TypeMap = HashMap<NodeId, DataType>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSignature {
    pub return_type: DataType,
    pub parameters: Vec<DataType>,
}

#[derive(Default)]
pub struct TypeAnalyser {
    types: TypeMap,
    functions: HashMap<String, FunctionSignature>,
    scope: Scope,
}

impl TypeAnalyser {
    pub fn new() -> Self {
        Self {
            types: TypeMap::new(),
            functions: HashMap::new(),
            scope: Scope::new(),
        }
    }

    pub fn run(mut self, root: &AstNode, diagnostics: &mut Diagnostics) -> TypeMap {
        debug!("type analysis started");
        self.collect_functions(root);
        self.visit(root, diagnostics);
        debug_assert_eq!(self.scope.depth(), 1, "scope stack must be balanced");
        debug!("type analysis finished, {} nodes typed", self.types.len());
        self.types
    }

    /// Records every function signature of the module up front so calls
    /// resolve independently of definition order.
    fn collect_functions(&mut self, node: &AstNode) {
        match &node.kind {
            NodeKind::Sequence { children } => {
                for child in children {
                    self.collect_functions(child);
                }
            }
            NodeKind::Statement {
                child: Some(child), ..
            } => self.collect_functions(child),
            NodeKind::Function {
                name,
                return_type,
                arguments,
                ..
            } => {
                let parameters = arguments
                    .iter()
                    .filter_map(|argument| match &argument.kind {
                        NodeKind::VariableDefinition { data_type, .. } => Some(*data_type),
                        _ => None,
                    })
                    .collect();
                self.functions.insert(
                    name.clone(),
                    FunctionSignature {
                        return_type: *return_type,
                        parameters,
                    },
                );
            }
            _ => {}
        }
    }

    fn record(&mut self, node: &AstNode, data_type: DataType) -> Option<DataType> {
        self.types.insert(node.id, data_type);
        Some(data_type)
    }

    fn visit(&mut self, node: &AstNode, diagnostics: &mut Diagnostics) -> Option<DataType> {
        match &node.kind {
            NodeKind::Sequence { children } => {
                for child in children {
                    self.visit(child, diagnostics);
                }
                None
            }
            NodeKind::Statement { child, .. } => {
                let child_type = child.as_ref().and_then(|c| self.visit(c, diagnostics))?;
                self.record(node, child_type)
            }
            NodeKind::IntegerLiteral { .. } => self.record(node, DataType::Int),
            NodeKind::FloatLiteral { .. } => self.record(node, DataType::Float),
            NodeKind::BoolLiteral { .. } => self.record(node, DataType::Bool),
            NodeKind::Variable { name, index } => {
                if let Some(index) = index {
                    self.visit(index, diagnostics);
                    diagnostics.report(format!(
                        "array indexing on '{name}' is not supported yet"
                    ));
                }
                match self.scope.get_variable(name) {
                    Some(data_type) => self.record(node, data_type),
                    None => {
                        diagnostics.report(format!("undefined variable '{name}'"));
                        None
                    }
                }
            }
            NodeKind::VariableDefinition { name, data_type } => {
                self.scope.add_variable(name, *data_type);
                self.record(node, *data_type)
            }
            NodeKind::Assignment { left, right } => {
                let right_type = self.visit(right, diagnostics);
                let left_type = self.visit(left, diagnostics);
                let (Some(left_type), Some(right_type)) = (left_type, right_type) else {
                    return None;
                };
                if left_type != right_type {
                    diagnostics.report(format!(
                        "assignment type mismatch: {left_type} = {right_type}"
                    ));
                    return None;
                }
                self.record(node, left_type)
            }
            NodeKind::UnaryOperation { op, child } => {
                let child_type = self.visit(child, diagnostics)?;
                match op {
                    UnaryOperator::Not if child_type == DataType::Bool => {
                        self.record(node, DataType::Bool)
                    }
                    UnaryOperator::Not => {
                        diagnostics.report(format!(
                            "operand of 'not' must be bool, found {child_type}"
                        ));
                        None
                    }
                }
            }
            NodeKind::BinaryOperation { op, left, right } => {
                let left_type = self.visit(left, diagnostics);
                let right_type = self.visit(right, diagnostics);
                let (Some(left_type), Some(right_type)) = (left_type, right_type) else {
                    return None;
                };

                if left_type != right_type {
                    diagnostics.report(format!(
                        "binary operation type mismatch: {left_type} {op} {right_type}"
                    ));
                    return None;
                }

                if op.is_arithmetic() {
                    return self.record(node, left_type);
                }
                if op.is_relational() {
                    return self.record(node, DataType::Bool);
                }
                if op.is_logical() {
                    // logical operators work on booleans only
                    if left_type != DataType::Bool {
                        diagnostics.report(format!(
                            "operands of '{op}' must be bool, found {left_type}"
                        ));
                        return None;
                    }
                    return self.record(node, DataType::Bool);
                }
                None
            }
            NodeKind::Call { name, arguments } => {
                let argument_types: Vec<Option<DataType>> = arguments
                    .iter()
                    .map(|argument| self.visit(argument, diagnostics))
                    .collect();

                let Some(signature) = self.functions.get(name).cloned() else {
                    diagnostics.report(format!("undefined function '{name}'"));
                    return None;
                };

                if argument_types.len() != signature.parameters.len() {
                    diagnostics.report(format!(
                        "'{name}' expects {} arguments, found {}",
                        signature.parameters.len(),
                        argument_types.len()
                    ));
                } else {
                    for (argument, expected) in argument_types.iter().zip(&signature.parameters) {
                        if argument.is_some_and(|found| found != *expected) {
                            diagnostics.report(format!(
                                "argument type mismatch in call to '{name}'"
                            ));
                        }
                    }
                }

                self.record(node, signature.return_type)
            }
            NodeKind::Function {
                name,
                return_type,
                arguments,
                body,
            } => {
                let parameters = arguments
                    .iter()
                    .filter_map(|argument| match &argument.kind {
                        NodeKind::VariableDefinition { data_type, .. } => Some(*data_type),
                        _ => None,
                    })
                    .collect();
                // recorded before the body so recursive calls resolve
                self.functions.insert(
                    name.clone(),
                    FunctionSignature {
                        return_type: *return_type,
                        parameters,
                    },
                );

                if let Some(body) = body {
                    self.scope.enter_scope();
                    for argument in arguments {
                        self.visit(argument, diagnostics);
                    }
                    self.visit(body, diagnostics);
                    self.scope.exit_scope();
                }
                None
            }
            NodeKind::IfStatement {
                condition,
                if_body,
                else_body,
            } => {
                self.check_condition(condition, "if", diagnostics);
                if let Some(body) = if_body {
                    self.scope.enter_scope();
                    self.visit(body, diagnostics);
                    self.scope.exit_scope();
                }
                if let Some(body) = else_body {
                    self.scope.enter_scope();
                    self.visit(body, diagnostics);
                    self.scope.exit_scope();
                }
                None
            }
            NodeKind::ForStatement {
                init,
                condition,
                update,
                body,
            } => {
                self.scope.enter_scope();
                self.visit(init, diagnostics);
                self.check_condition(condition, "for", diagnostics);
                self.visit(update, diagnostics);
                if let Some(body) = body {
                    self.visit(body, diagnostics);
                }
                self.scope.exit_scope();
                None
            }
            NodeKind::Assert { condition } => {
                self.check_condition(condition, "assert", diagnostics);
                None
            }
            NodeKind::Import { .. } | NodeKind::TypeDeclaration { .. } => None,
        }
    }

    fn check_condition(
        &mut self,
        condition: &AstNode,
        construct: &str,
        diagnostics: &mut Diagnostics,
    ) {
        if let Some(found) = self.visit(condition, diagnostics) {
            if found != DataType::Bool {
                diagnostics.report(format!(
                    "condition of '{construct}' must be bool, found {found}"
                ));
            }
        }
    }
}
