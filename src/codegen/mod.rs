//! LLVM IR generation.
//!
//! The generator walks the typed AST and emits SSA instructions through an
//! [`inkwell`] builder into one LLVM module per compilation unit. Local
//! variables become entry-block allocas, control flow becomes explicit basic
//! blocks, and statements outside any function are wrapped into a synthetic
//! global constructor.

mod expressions;
mod statements;

use std::collections::HashMap;

use inkwell::{
    basic_block::BasicBlock,
    builder::Builder,
    context::Context,
    module::Module,
    types::{BasicType, BasicTypeEnum},
    values::{BasicValueEnum, FunctionValue, PointerValue},
    AddressSpace,
};
use log::debug;

use crate::{
    ast::{AstNode, DataType, NodeId, NodeKind},
    diagnostics::Diagnostics,
    typechecker::TypeMap,
};

pub struct IrGenerator<'ctx, 'a> {
    context: &'ctx Context,
    pub module: Module<'ctx>,
    builder: Builder<'ctx>,
    types: &'a TypeMap,
    /// Innermost-last stack of name-to-slot bindings. The outermost frame is
    /// the module scope holding globals.
    scopes: Vec<HashMap<String, PointerValue<'ctx>>>,
    /// Declared globals with their source type, for duplicate detection.
    globals: HashMap<String, DataType>,
    /// Functions known to the module, with their return type.
    functions: HashMap<String, (FunctionValue<'ctx>, DataType)>,
    /// Values produced by already-lowered nodes, keyed by node id.
    values: HashMap<NodeId, BasicValueEnum<'ctx>>,
    is_global_scope: bool,
}

impl<'ctx, 'a> IrGenerator<'ctx, 'a> {
    pub fn new(context: &'ctx Context, module_name: &str, types: &'a TypeMap) -> Self {
        Self {
            context,
            module: context.create_module(module_name),
            builder: context.create_builder(),
            types,
            scopes: vec![HashMap::new()],
            globals: HashMap::new(),
            functions: HashMap::new(),
            values: HashMap::new(),
            is_global_scope: false,
        }
    }

    /// Lowers a whole module. Top-level statements that are not function
    /// definitions end up in the global constructor.
    pub fn run(&mut self, root: &AstNode, diagnostics: &mut Diagnostics) {
        debug!("IR generation started for '{}'", self.module_name());

        self.declare_functions(root);

        let top_level: Vec<&AstNode> = match &root.kind {
            NodeKind::Sequence { children } => children.iter().collect(),
            _ => vec![root],
        };

        let needs_ctor = top_level.iter().any(|node| !is_declaration_only(node));
        let ctor = needs_ctor.then(|| {
            let ctor = self.get_or_create_function("__ctor", DataType::Void, &[]);
            // internal linkage keeps the constructors of linked modules apart
            ctor.as_global_value()
                .set_linkage(inkwell::module::Linkage::Internal);
            let entry = self.context.append_basic_block(ctor, "entry");
            self.builder.position_at_end(entry);
            self.is_global_scope = true;
            ctor
        });

        for node in top_level {
            self.visit(node, diagnostics);
        }

        if let Some(ctor) = ctor {
            self.finalize_function(DataType::Void);
            self.setup_global_initialization(ctor);
            self.is_global_scope = false;
        }

        debug!("IR generation finished for '{}'", self.module_name());
    }

    fn module_name(&self) -> String {
        self.module.get_name().to_string_lossy().into_owned()
    }

    /// Hands the finished IR container over to the driver.
    pub fn into_module(self) -> Module<'ctx> {
        self.module
    }

    fn visit(&mut self, node: &AstNode, diagnostics: &mut Diagnostics) {
        match &node.kind {
            NodeKind::Sequence { .. } => self.visit_sequence(node, diagnostics),
            NodeKind::Statement { .. } => self.visit_statement(node, diagnostics),
            NodeKind::IntegerLiteral { .. }
            | NodeKind::FloatLiteral { .. }
            | NodeKind::BoolLiteral { .. } => self.visit_literal(node, diagnostics),
            NodeKind::Variable { .. } => self.visit_variable(node, diagnostics),
            NodeKind::VariableDefinition { .. } => {
                self.visit_variable_definition(node, diagnostics)
            }
            NodeKind::Assignment { .. } => self.visit_assignment(node, diagnostics),
            NodeKind::UnaryOperation { .. } => self.visit_unary_operation(node, diagnostics),
            NodeKind::BinaryOperation { .. } => self.visit_binary_operation(node, diagnostics),
            NodeKind::Function { .. } => self.visit_function(node, diagnostics),
            NodeKind::Call { .. } => self.visit_call(node, diagnostics),
            NodeKind::IfStatement { .. } => self.visit_if_statement(node, diagnostics),
            NodeKind::ForStatement { .. } => self.visit_for_statement(node, diagnostics),
            NodeKind::Assert { .. } => self.visit_assert(node, diagnostics),
            NodeKind::Import { .. } | NodeKind::TypeDeclaration { .. } => {}
        }
    }

    /// Registers every function of the module up front so that calls resolve
    /// independently of definition order.
    fn declare_functions(&mut self, node: &AstNode) {
        match &node.kind {
            NodeKind::Sequence { children } => {
                for child in children {
                    self.declare_functions(child);
                }
            }
            NodeKind::Statement {
                child: Some(child), ..
            } => self.declare_functions(child),
            NodeKind::Function {
                name,
                return_type,
                arguments,
                ..
            } => {
                let parameters: Vec<DataType> = arguments
                    .iter()
                    .filter_map(|argument| match &argument.kind {
                        NodeKind::VariableDefinition { data_type, .. } => Some(*data_type),
                        _ => None,
                    })
                    .collect();
                self.get_or_create_function(name, *return_type, &parameters);
            }
            _ => {}
        }
    }

    fn get_or_create_function(
        &mut self,
        name: &str,
        return_type: DataType,
        parameters: &[DataType],
    ) -> FunctionValue<'ctx> {
        if let Some((function, _)) = self.functions.get(name) {
            return *function;
        }

        let parameter_types: Vec<_> = parameters
            .iter()
            .filter_map(|parameter| self.basic_type(*parameter).map(Into::into))
            .collect();
        let function_type = match self.basic_type(return_type) {
            Some(basic) => basic.fn_type(&parameter_types, false),
            None => self.context.void_type().fn_type(&parameter_types, false),
        };

        let function = self.module.add_function(name, function_type, None);
        self.functions
            .insert(name.to_owned(), (function, return_type));
        function
    }

    fn basic_type(&self, data_type: DataType) -> Option<BasicTypeEnum<'ctx>> {
        match data_type {
            DataType::Void => None,
            DataType::Int => Some(self.context.i64_type().into()),
            DataType::Float => Some(self.context.f64_type().into()),
            DataType::Bool => Some(self.context.bool_type().into()),
        }
    }

    fn const_zero(&self, data_type: DataType) -> Option<BasicValueEnum<'ctx>> {
        match data_type {
            DataType::Void => None,
            DataType::Int => Some(self.context.i64_type().const_zero().into()),
            DataType::Float => Some(self.context.f64_type().const_zero().into()),
            DataType::Bool => Some(self.context.bool_type().const_zero().into()),
        }
    }

    /// Runs `f` inside a freshly pushed scope; the scope is popped on every
    /// exit path.
    fn with_scope<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.scopes.push(HashMap::new());
        let result = f(self);
        self.scopes.pop();
        result
    }

    pub fn scope_depth(&self) -> usize {
        self.scopes.len()
    }

    fn bind_variable(&mut self, name: impl ToString, slot: PointerValue<'ctx>) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), slot);
        }
    }

    fn find_variable(&self, name: &str) -> Option<PointerValue<'ctx>> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).copied())
    }

    /// Allocates a stack slot in the entry block of the current function,
    /// regardless of where the builder currently sits.
    fn create_entry_block_alloca(
        &self,
        data_type: BasicTypeEnum<'ctx>,
        name: &str,
    ) -> Option<PointerValue<'ctx>> {
        let function = self.builder.get_insert_block()?.get_parent()?;
        let entry = function.get_first_basic_block()?;

        let temporary = self.context.create_builder();
        match entry.get_first_instruction() {
            Some(first) => temporary.position_before(&first),
            None => temporary.position_at_end(entry),
        }
        temporary.build_alloca(data_type, name).ok()
    }

    fn current_block(&self) -> Option<BasicBlock<'ctx>> {
        self.builder.get_insert_block()
    }

    fn current_block_is_open(&self) -> bool {
        self.current_block()
            .is_some_and(|block| block.get_terminator().is_none())
    }

    /// Emits the default return for a function whose last block is still
    /// open: zero for int, 0.0 for float, false for bool, plain return for
    /// void.
    fn finalize_function(&mut self, return_type: DataType) {
        if !self.current_block_is_open() {
            return;
        }
        match self.const_zero(return_type) {
            Some(zero) => {
                let _ = self.builder.build_return(Some(&zero));
            }
            None => {
                let _ = self.builder.build_return(None);
            }
        }
    }

    /// Registers `function` in `llvm.global_ctors` so the runtime executes it
    /// before `main`.
    fn setup_global_initialization(&mut self, function: FunctionValue<'ctx>) {
        let fn_ptr_type = function.get_type().ptr_type(AddressSpace::default());
        let data_ptr_type = self.context.i8_type().ptr_type(AddressSpace::default());
        let entry_type = self.context.struct_type(
            &[
                self.context.i32_type().into(),
                fn_ptr_type.into(),
                data_ptr_type.into(),
            ],
            false,
        );

        let priority = self.context.i32_type().const_int(65535, false);
        let function_pointer = function.as_global_value().as_pointer_value();
        let entry = entry_type.const_named_struct(&[
            priority.into(),
            function_pointer.into(),
            data_ptr_type.const_null().into(),
        ]);

        let ctors = self
            .module
            .add_global(entry_type.array_type(1), None, "llvm.global_ctors");
        ctors.set_linkage(inkwell::module::Linkage::Appending);
        ctors.set_initializer(&entry_type.const_array(&[entry]));
    }

    /// Returns the declaration of a C standard library helper used by the
    /// assert lowering.
    fn stdlib_function(&mut self, name: &str) -> Option<FunctionValue<'ctx>> {
        if let Some(function) = self.module.get_function(name) {
            return Some(function);
        }

        let function_type = match name {
            "printf" => {
                let ptr_type = self.context.i8_type().ptr_type(AddressSpace::default());
                self.context.i32_type().fn_type(&[ptr_type.into()], true)
            }
            "exit" => self
                .context
                .void_type()
                .fn_type(&[self.context.i32_type().into()], false),
            _ => return None,
        };
        Some(self.module.add_function(name, function_type, None))
    }
}

fn is_declaration_only(node: &AstNode) -> bool {
    match &node.kind {
        NodeKind::Function { .. }
        | NodeKind::Import { .. }
        | NodeKind::TypeDeclaration { .. } => true,
        NodeKind::Statement {
            child: Some(child), ..
        } => is_declaration_only(child),
        NodeKind::Statement { child: None, .. } => true,
        _ => false,
    }
}
