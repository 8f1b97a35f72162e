//! Lowering of expression nodes.

use inkwell::{
    values::{BasicMetadataValueEnum, BasicValueEnum},
    FloatPredicate, IntPredicate,
};

use crate::{
    ast::{AstNode, BinaryOperator, DataType, NodeKind, UnaryOperator},
    diagnostics::Diagnostics,
};

use super::IrGenerator;

impl<'ctx, 'a> IrGenerator<'ctx, 'a> {
    pub(super) fn visit_literal(&mut self, node: &AstNode, _diagnostics: &mut Diagnostics) {
        let value = match node.kind {
            NodeKind::IntegerLiteral { value } => self
                .context
                .i64_type()
                .const_int(value as u64, true)
                .into(),
            NodeKind::FloatLiteral { value } => {
                self.context.f64_type().const_float(value).into()
            }
            NodeKind::BoolLiteral { value } => self
                .context
                .bool_type()
                .const_int(u64::from(value), false)
                .into(),
            _ => return,
        };
        self.values.insert(node.id, value);
    }

    pub(super) fn visit_variable(&mut self, node: &AstNode, diagnostics: &mut Diagnostics) {
        let NodeKind::Variable { name, index } = &node.kind else {
            return;
        };
        if index.is_some() {
            diagnostics.report(format!(
                "array indexing on '{name}' is not supported yet"
            ));
            return;
        }

        let Some(slot) = self.find_variable(name) else {
            diagnostics.report(format!("undefined variable '{name}'"));
            return;
        };
        let Some(data_type) = self.types.get(&node.id) else {
            diagnostics.report(format!("no resolved type for variable '{name}'"));
            return;
        };
        let Some(_pointee) = self.basic_type(*data_type) else {
            return;
        };

        if let Ok(value) = self.builder.build_load(slot, name) {
            self.values.insert(node.id, value);
        }
    }

    pub(super) fn visit_unary_operation(
        &mut self,
        node: &AstNode,
        diagnostics: &mut Diagnostics,
    ) {
        let NodeKind::UnaryOperation { op, child } = &node.kind else {
            return;
        };

        self.visit(child, diagnostics);
        let Some(value) = self.values.get(&child.id) else {
            return;
        };

        match op {
            UnaryOperator::Not => {
                // not on i1 is a xor with 1
                let one = self.context.bool_type().const_int(1, false);
                if let Ok(result) = self.builder.build_xor(value.into_int_value(), one, "not") {
                    self.values.insert(node.id, result.into());
                }
            }
        }
    }

    pub(super) fn visit_binary_operation(
        &mut self,
        node: &AstNode,
        diagnostics: &mut Diagnostics,
    ) {
        let NodeKind::BinaryOperation { op, left, right } = &node.kind else {
            return;
        };

        self.visit(left, diagnostics);
        self.visit(right, diagnostics);

        let (Some(left_value), Some(right_value)) =
            (self.values.get(&left.id), self.values.get(&right.id))
        else {
            return;
        };
        let (left_value, right_value) = (*left_value, *right_value);

        // both sides have the same type after analysis; the operand type
        // picks between the integer and floating point instruction families
        let Some(operand_type) = self
            .types
            .get(&left.id)
            .or_else(|| self.types.get(&right.id))
            .copied()
        else {
            diagnostics.report("no resolved operand type for binary operation");
            return;
        };

        let result: Option<BasicValueEnum<'ctx>> = match operand_type {
            DataType::Float => {
                let lhs = left_value.into_float_value();
                let rhs = right_value.into_float_value();
                match op {
                    BinaryOperator::Add => {
                        self.builder.build_float_add(lhs, rhs, "").ok().map(Into::into)
                    }
                    BinaryOperator::Sub => {
                        self.builder.build_float_sub(lhs, rhs, "").ok().map(Into::into)
                    }
                    BinaryOperator::Mul => {
                        self.builder.build_float_mul(lhs, rhs, "").ok().map(Into::into)
                    }
                    BinaryOperator::Div => {
                        self.builder.build_float_div(lhs, rhs, "").ok().map(Into::into)
                    }
                    _ => float_predicate_of(*op).and_then(|predicate| {
                        self.builder
                            .build_float_compare(predicate, lhs, rhs, "")
                            .ok()
                            .map(Into::into)
                    }),
                }
            }
            DataType::Int | DataType::Bool => {
                let lhs = left_value.into_int_value();
                let rhs = right_value.into_int_value();
                match op {
                    BinaryOperator::Add => {
                        self.builder.build_int_add(lhs, rhs, "").ok().map(Into::into)
                    }
                    BinaryOperator::Sub => {
                        self.builder.build_int_sub(lhs, rhs, "").ok().map(Into::into)
                    }
                    BinaryOperator::Mul => {
                        self.builder.build_int_mul(lhs, rhs, "").ok().map(Into::into)
                    }
                    BinaryOperator::Div => self
                        .builder
                        .build_int_signed_div(lhs, rhs, "")
                        .ok()
                        .map(Into::into),
                    // logical operators evaluate both sides; no short circuit
                    BinaryOperator::And => {
                        self.builder.build_and(lhs, rhs, "").ok().map(Into::into)
                    }
                    BinaryOperator::Or => {
                        self.builder.build_or(lhs, rhs, "").ok().map(Into::into)
                    }
                    _ => int_predicate_of(*op).and_then(|predicate| {
                        self.builder
                            .build_int_compare(predicate, lhs, rhs, "")
                            .ok()
                            .map(Into::into)
                    }),
                }
            }
            DataType::Void => None,
        };

        match result {
            Some(value) => {
                self.values.insert(node.id, value);
            }
            None => diagnostics.report(format!(
                "binary operation '{op}' is not supported for {operand_type} operands"
            )),
        }
    }

    pub(super) fn visit_call(&mut self, node: &AstNode, diagnostics: &mut Diagnostics) {
        let NodeKind::Call { name, arguments } = &node.kind else {
            return;
        };

        let mut argument_values: Vec<BasicMetadataValueEnum<'ctx>> = vec![];
        for argument in arguments {
            self.visit(argument, diagnostics);
            let Some(value) = self.values.get(&argument.id) else {
                diagnostics.report(format!(
                    "argument of call to '{name}' produced no value"
                ));
                return;
            };
            argument_values.push((*value).into());
        }

        let Some((function, _)) = self.functions.get(name).copied() else {
            diagnostics.report(format!("undefined function '{name}'"));
            return;
        };

        let Ok(call) = self.builder.build_call(function, &argument_values, "") else {
            return;
        };
        if let Some(value) = call.try_as_basic_value().left() {
            self.values.insert(node.id, value);
        }
    }
}

fn int_predicate_of(op: BinaryOperator) -> Option<IntPredicate> {
    match op {
        BinaryOperator::Eq => Some(IntPredicate::EQ),
        BinaryOperator::Neq => Some(IntPredicate::NE),
        BinaryOperator::Lt => Some(IntPredicate::SLT),
        BinaryOperator::Le => Some(IntPredicate::SLE),
        BinaryOperator::Gt => Some(IntPredicate::SGT),
        BinaryOperator::Ge => Some(IntPredicate::SGE),
        _ => None,
    }
}

fn float_predicate_of(op: BinaryOperator) -> Option<FloatPredicate> {
    match op {
        BinaryOperator::Eq => Some(FloatPredicate::OEQ),
        BinaryOperator::Neq => Some(FloatPredicate::ONE),
        BinaryOperator::Lt => Some(FloatPredicate::OLT),
        BinaryOperator::Le => Some(FloatPredicate::OLE),
        BinaryOperator::Gt => Some(FloatPredicate::OGT),
        BinaryOperator::Ge => Some(FloatPredicate::OGE),
        _ => None,
    }
}
