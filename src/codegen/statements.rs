//! Lowering of statements, control flow and function definitions.

use inkwell::values::{BasicMetadataValueEnum, PointerValue};

use crate::{
    ast::{print_expression, AstNode, DataType, NodeKind},
    diagnostics::Diagnostics,
};

use super::IrGenerator;

impl<'ctx, 'a> IrGenerator<'ctx, 'a> {
    pub(super) fn visit_sequence(&mut self, node: &AstNode, diagnostics: &mut Diagnostics) {
        let NodeKind::Sequence { children } = &node.kind else {
            return;
        };

        for child in children {
            self.visit(child, diagnostics);
        }

        if let Some(value) = children.last().and_then(|last| self.values.get(&last.id).copied()) {
            self.values.insert(node.id, value);
        }
    }

    pub(super) fn visit_statement(&mut self, node: &AstNode, diagnostics: &mut Diagnostics) {
        let NodeKind::Statement { is_return, child } = &node.kind else {
            return;
        };

        let value = match child {
            Some(child) => {
                self.visit(child, diagnostics);
                self.values.get(&child.id).copied()
            }
            None => None,
        };

        if *is_return && self.current_block().is_some() {
            let _ = match &value {
                Some(value) => self.builder.build_return(Some(value)),
                None => self.builder.build_return(None),
            };
        }
        if let Some(value) = value {
            self.values.insert(node.id, value);
        }
    }

    pub(super) fn visit_variable_definition(
        &mut self,
        node: &AstNode,
        diagnostics: &mut Diagnostics,
    ) {
        let NodeKind::VariableDefinition { name, data_type } = &node.kind else {
            return;
        };

        let Some(basic_type) = self.basic_type(*data_type) else {
            diagnostics.report(format!("variable '{name}' cannot have type void"));
            return;
        };

        // module-level definitions become globals with a zero initializer
        if self.is_global_scope && self.scope_depth() == 1 {
            if let Some(existing) = self.globals.get(name) {
                if existing != data_type {
                    diagnostics.report(format!(
                        "global '{name}' is already declared with type {existing}"
                    ));
                }
                return;
            }

            let global = self.module.add_global(basic_type, None, name);
            match self.const_zero(*data_type) {
                Some(zero) => global.set_initializer(&zero),
                None => {}
            }

            let pointer = global.as_pointer_value();
            self.globals.insert(name.clone(), *data_type);
            self.bind_variable(name, pointer);
            self.values.insert(node.id, pointer.into());
            return;
        }

        // locals are always allocated in the entry block; the slot stays
        // undefined until the first assignment
        let Some(slot) = self.create_entry_block_alloca(basic_type, name) else {
            diagnostics.report(format!("no function context for variable '{name}'"));
            return;
        };
        self.bind_variable(name, slot);
        self.values.insert(node.id, slot.into());
    }

    pub(super) fn visit_assignment(&mut self, node: &AstNode, diagnostics: &mut Diagnostics) {
        let NodeKind::Assignment { left, right } = &node.kind else {
            return;
        };

        self.visit(right, diagnostics);
        let Some(value) = self.values.get(&right.id).copied() else {
            return;
        };
        let Some(target) = self.address_of(left, diagnostics) else {
            return;
        };

        let _ = self.builder.build_store(target, value);
        self.values.insert(node.id, value);
    }

    /// Lowers an assignment target to the address to store into.
    fn address_of(
        &mut self,
        node: &AstNode,
        diagnostics: &mut Diagnostics,
    ) -> Option<PointerValue<'ctx>> {
        match &node.kind {
            NodeKind::VariableDefinition { .. } => {
                self.visit_variable_definition(node, diagnostics);
                self.values
                    .get(&node.id)
                    .map(|value| value.into_pointer_value())
            }
            NodeKind::Variable { name, index: None } => {
                let slot = self.find_variable(name);
                if slot.is_none() {
                    diagnostics.report(format!("undefined variable '{name}'"));
                }
                slot
            }
            NodeKind::Variable {
                name,
                index: Some(_),
            } => {
                diagnostics.report(format!(
                    "array indexing on '{name}' is not supported yet"
                ));
                None
            }
            _ => {
                diagnostics.report("invalid assignment target");
                None
            }
        }
    }

    pub(super) fn visit_function(&mut self, node: &AstNode, diagnostics: &mut Diagnostics) {
        let NodeKind::Function {
            name,
            return_type,
            arguments,
            body,
        } = &node.kind
        else {
            return;
        };

        // extern declarations carry no body and were declared up front
        let Some(body) = body else {
            return;
        };

        let parameters: Vec<DataType> = arguments
            .iter()
            .filter_map(|argument| match &argument.kind {
                NodeKind::VariableDefinition { data_type, .. } => Some(*data_type),
                _ => None,
            })
            .collect();
        let function = self.get_or_create_function(name, *return_type, &parameters);

        let saved_block = self.current_block();
        let saved_global_scope = self.is_global_scope;
        self.is_global_scope = false;

        let entry = self.context.append_basic_block(function, "entry");
        self.builder.position_at_end(entry);

        self.with_scope(|generator| {
            for (index, argument) in arguments.iter().enumerate() {
                let NodeKind::VariableDefinition { name, data_type } = &argument.kind else {
                    continue;
                };
                let Some(basic_type) = generator.basic_type(*data_type) else {
                    diagnostics.report(format!("parameter '{name}' cannot have type void"));
                    continue;
                };
                let Some(slot) = generator.create_entry_block_alloca(basic_type, name) else {
                    continue;
                };
                if let Some(value) = function.get_nth_param(index as u32) {
                    let _ = generator.builder.build_store(slot, value);
                }
                generator.bind_variable(name, slot);
                generator.values.insert(argument.id, slot.into());
            }

            generator.visit(body, diagnostics);
        });

        self.finalize_function(*return_type);

        self.is_global_scope = saved_global_scope;
        if let Some(block) = saved_block {
            self.builder.position_at_end(block);
        }
    }

    /// Three fresh blocks per if statement: `then`, `else` and `if_merge`.
    /// A branch that textually ends in a return does not jump to the merge
    /// block.
    pub(super) fn visit_if_statement(&mut self, node: &AstNode, diagnostics: &mut Diagnostics) {
        let NodeKind::IfStatement {
            condition,
            if_body,
            else_body,
        } = &node.kind
        else {
            return;
        };

        self.visit(condition, diagnostics);
        let Some(condition_value) = self.values.get(&condition.id).copied() else {
            return;
        };

        let Some(function) = self.current_block().and_then(|block| block.get_parent()) else {
            return;
        };
        let then_block = self.context.append_basic_block(function, "then");
        let else_block = self.context.append_basic_block(function, "else");
        let merge_block = self.context.append_basic_block(function, "if_merge");

        let _ = self.builder.build_conditional_branch(
            condition_value.into_int_value(),
            then_block,
            else_block,
        );

        self.builder.position_at_end(then_block);
        if let Some(body) = if_body {
            self.with_scope(|generator| generator.visit(body, diagnostics));
        }
        if !branch_ends_in_return(if_body) {
            let _ = self.builder.build_unconditional_branch(merge_block);
        }

        self.builder.position_at_end(else_block);
        if let Some(body) = else_body {
            self.with_scope(|generator| generator.visit(body, diagnostics));
        }
        if !branch_ends_in_return(else_body) {
            let _ = self.builder.build_unconditional_branch(merge_block);
        }

        self.builder.position_at_end(merge_block);
    }

    pub(super) fn visit_for_statement(&mut self, node: &AstNode, diagnostics: &mut Diagnostics) {
        let NodeKind::ForStatement {
            init,
            condition,
            update,
            body,
        } = &node.kind
        else {
            return;
        };

        let Some(function) = self.current_block().and_then(|block| block.get_parent()) else {
            return;
        };

        let header_block = self.context.append_basic_block(function, "loop_header");
        let body_block = self.context.append_basic_block(function, "loop_body");
        let exit_block = self.context.append_basic_block(function, "loop_exit");

        self.with_scope(|generator| {
            generator.visit(init, diagnostics);
            let _ = generator.builder.build_unconditional_branch(header_block);

            generator.builder.position_at_end(header_block);
            generator.visit(condition, diagnostics);
            let Some(condition_value) = generator.values.get(&condition.id).copied() else {
                return;
            };
            let _ = generator.builder.build_conditional_branch(
                condition_value.into_int_value(),
                body_block,
                exit_block,
            );

            generator.builder.position_at_end(body_block);
            if let Some(body) = body {
                generator.visit(body, diagnostics);
            }
            generator.visit(update, diagnostics);
            let _ = generator.builder.build_unconditional_branch(header_block);
        });

        self.builder.position_at_end(exit_block);
    }

    /// An assert is an if whose failure path prints the violated condition
    /// and exits the process with status 1.
    pub(super) fn visit_assert(&mut self, node: &AstNode, diagnostics: &mut Diagnostics) {
        let NodeKind::Assert { condition } = &node.kind else {
            return;
        };

        self.visit(condition, diagnostics);
        let Some(condition_value) = self.values.get(&condition.id).copied() else {
            return;
        };

        let Some(function) = self.current_block().and_then(|block| block.get_parent()) else {
            return;
        };
        let then_block = self.context.append_basic_block(function, "then");
        let else_block = self.context.append_basic_block(function, "else");
        let merge_block = self.context.append_basic_block(function, "if_merge");

        let _ = self.builder.build_conditional_branch(
            condition_value.into_int_value(),
            then_block,
            else_block,
        );

        self.builder.position_at_end(then_block);
        let _ = self.builder.build_unconditional_branch(merge_block);

        self.builder.position_at_end(else_block);
        self.emit_assert_failure(condition, diagnostics);
        let _ = self.builder.build_unconditional_branch(merge_block);

        self.builder.position_at_end(merge_block);
    }

    fn emit_assert_failure(&mut self, condition: &AstNode, diagnostics: &mut Diagnostics) {
        if let NodeKind::BinaryOperation { op, left, right } = &condition.kind {
            let left_format = self.format_specifier(left);
            let right_format = self.format_specifier(right);
            let format = format!("> assert %s\nE assert %{left_format}{op}%{right_format}\n");

            let format_pointer = self.builder.build_global_string_ptr(&format, "assert_format");
            let condition_pointer = self
                .builder
                .build_global_string_ptr(&print_expression(condition), "assert_condition");
            let (Ok(format_pointer), Ok(condition_pointer)) =
                (format_pointer, condition_pointer)
            else {
                return;
            };

            let (Some(left_value), Some(right_value)) =
                (self.values.get(&left.id), self.values.get(&right.id))
            else {
                diagnostics.report("assert operands produced no value");
                return;
            };

            let arguments: Vec<BasicMetadataValueEnum<'ctx>> = vec![
                format_pointer.as_pointer_value().into(),
                condition_pointer.as_pointer_value().into(),
                (*left_value).into(),
                (*right_value).into(),
            ];
            if let Some(printf) = self.stdlib_function("printf") {
                let _ = self.builder.build_call(printf, &arguments, "");
            }
        }

        if let Some(exit) = self.stdlib_function("exit") {
            let status = self.context.i32_type().const_int(1, false);
            let _ = self.builder.build_call(exit, &[status.into()], "");
        }
    }

    fn format_specifier(&self, node: &AstNode) -> &'static str {
        match self.types.get(&node.id) {
            Some(DataType::Int) => "ld",
            Some(DataType::Float) => "f",
            _ => "d",
        }
    }
}

fn branch_ends_in_return(body: &Option<Box<AstNode>>) -> bool {
    body.as_ref().is_some_and(|body| body.ends_in_return())
}
