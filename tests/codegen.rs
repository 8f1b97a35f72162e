//! IR generation tests: basic-block structure of the control-flow lowerings,
//! entry-block allocation, default returns and the global initialiser.

use inkwell::{context::Context, values::InstructionOpcode};
use neon_lang::{
    ast::AstBuilder,
    codegen::IrGenerator,
    diagnostics::Diagnostics,
    lexer::Lexer,
    loader::StringCodeProvider,
    parser::Parser,
    typechecker::TypeAnalyser,
};

fn lower<'ctx>(context: &'ctx Context, source: &str) -> inkwell::module::Module<'ctx> {
    let mut diagnostics = Diagnostics::new();
    let lexer = Lexer::new(Box::new(StringCodeProvider::from_source(source)));
    let tree = Parser::new(lexer)
        .create_parse_tree(&mut diagnostics)
        .expect("program should parse");
    let ast = AstBuilder::new()
        .run(tree, &mut diagnostics)
        .expect("AST should build");
    let types = TypeAnalyser::new().run(&ast, &mut diagnostics);

    let mut generator = IrGenerator::new(context, "test", &types);
    generator.run(&ast, &mut diagnostics);
    assert_eq!(generator.scope_depth(), 1, "scope stack must be balanced");
    assert!(diagnostics.is_empty(), "unexpected diagnostics: {diagnostics}");

    let module = generator.into_module();
    module
        .verify()
        .unwrap_or_else(|message| panic!("module does not verify: {message}"));
    module
}

#[test]
fn if_statement_creates_three_blocks() {
    let context = Context::create();
    let module = lower(
        &context,
        "fun f(bool c) int { if (c) { } else { } return 1; }",
    );

    let function = module.get_function("f").expect("f is defined");
    // entry plus then, else and if_merge
    assert_eq!(function.count_basic_blocks(), 4);

    let names: Vec<String> = function
        .get_basic_blocks()
        .iter()
        .map(|block| block.get_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["entry", "then", "else", "if_merge"]);
}

#[test]
fn empty_if_branches_only_jump_to_merge() {
    let context = Context::create();
    let module = lower(
        &context,
        "fun f(bool c) int { if (c) { } else { } return 1; }",
    );

    let function = module.get_function("f").expect("f is defined");
    for block in function.get_basic_blocks() {
        let name = block.get_name().to_string_lossy().into_owned();
        if name == "then" || name == "else" {
            let terminator = block.get_terminator().expect("branch is terminated");
            assert_eq!(terminator.get_opcode(), InstructionOpcode::Br);
            assert_eq!(block.get_first_instruction(), block.get_terminator());
        }
    }
}

#[test]
fn for_statement_creates_three_blocks() {
    let context = Context::create();
    let module = lower(
        &context,
        "fun f() int { for (int i = 0; i < 10; i = i + 1) { } return 0; }",
    );

    let function = module.get_function("f").expect("f is defined");
    let names: Vec<String> = function
        .get_basic_blocks()
        .iter()
        .map(|block| block.get_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        vec!["entry", "loop_header", "loop_body", "loop_exit"]
    );
}

#[test]
fn all_allocas_live_in_the_entry_block() {
    let context = Context::create();
    let module = lower(
        &context,
        "fun f(int a) int {
             int b = a;
             for (int i = 0; i < 10; i = i + 1) {
                 int c = b;
                 b = c + i;
             }
             return b;
         }",
    );

    let function = module.get_function("f").expect("f is defined");
    for block in function.get_basic_blocks() {
        let name = block.get_name().to_string_lossy().into_owned();
        let mut allocas = 0;
        let mut instruction = block.get_first_instruction();
        while let Some(current) = instruction {
            if current.get_opcode() == InstructionOpcode::Alloca {
                allocas += 1;
            }
            instruction = current.get_next_instruction();
        }

        if name == "entry" {
            // a, b, i and c
            assert_eq!(allocas, 4);
        } else {
            assert_eq!(allocas, 0, "no allocas outside the entry block ({name})");
        }
    }
}

#[test]
fn empty_function_gets_default_return() {
    let context = Context::create();
    let module = lower(&context, "fun helloWorld(int i) int { }");

    let function = module.get_function("helloWorld").expect("defined");
    assert_eq!(function.count_params(), 1);
    assert!(function.get_type().get_return_type().is_some());
    assert_eq!(function.count_basic_blocks(), 1);

    let entry = function.get_first_basic_block().expect("entry exists");
    let terminator = entry.get_terminator().expect("entry is terminated");
    assert_eq!(terminator.get_opcode(), InstructionOpcode::Return);
}

#[test]
fn function_signature_maps_int_to_i64() {
    let context = Context::create();
    let module = lower(&context, "fun helloWorld(int i) int { }");

    let function = module.get_function("helloWorld").expect("defined");
    let fn_type = function.get_type();
    assert_eq!(fn_type.get_return_type(), Some(context.i64_type().into()));
    assert_eq!(
        fn_type.get_param_types(),
        vec![context.i64_type().into()]
    );
}

#[test]
fn void_function_returns_void() {
    let context = Context::create();
    let module = lower(&context, "fun nothing() void { }");

    let function = module.get_function("nothing").expect("defined");
    assert!(function.get_type().get_return_type().is_none());
}

#[test]
fn top_level_statements_build_a_global_constructor() {
    let context = Context::create();
    let module = lower(&context, "int counter = 0; counter = counter + 1;");

    assert!(module.get_function("__ctor").is_some());
    assert!(module.get_global("llvm.global_ctors").is_some());
    let global = module.get_global("counter").expect("global exists");
    assert!(global.get_initializer().is_some(), "globals are zeroed");
}

#[test]
fn function_only_module_has_no_constructor() {
    let context = Context::create();
    let module = lower(&context, "fun f() int { return 1; }");

    assert!(module.get_function("__ctor").is_none());
    assert!(module.get_global("llvm.global_ctors").is_none());
}

#[test]
fn assert_lowering_calls_printf_and_exit() {
    let context = Context::create();
    let module = lower(&context, "int a = 1; assert a < 2;");

    assert!(module.get_function("printf").is_some());
    assert!(module.get_function("exit").is_some());

    let ctor = module.get_function("__ctor").expect("ctor exists");
    let names: Vec<String> = ctor
        .get_basic_blocks()
        .iter()
        .map(|block| block.get_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["entry", "then", "else", "if_merge"]);
}

#[test]
fn extern_function_is_declared_without_body() {
    let context = Context::create();
    let module = lower(
        &context,
        "extern fun putchar(int c) int fun main() int { putchar(72); return 0; }",
    );

    let putchar = module.get_function("putchar").expect("declared");
    assert_eq!(putchar.count_basic_blocks(), 0);
    assert!(module.get_function("main").is_some());
}

#[test]
fn call_before_definition_resolves() {
    let context = Context::create();
    let module = lower(
        &context,
        "fun main() int { return one(); } fun one() int { return 1; }",
    );

    assert!(module.get_function("one").is_some());
    assert!(module.get_function("main").is_some());
}

#[test]
fn return_in_branch_suppresses_merge_jump() {
    let context = Context::create();
    let module = lower(
        &context,
        "fun f(bool c) int { if (c) { return 1; } else { } return 0; }",
    );

    let function = module.get_function("f").expect("defined");
    for block in function.get_basic_blocks() {
        if block.get_name().to_string_lossy() == "then" {
            let terminator = block.get_terminator().expect("terminated");
            assert_eq!(terminator.get_opcode(), InstructionOpcode::Return);
        }
    }
}

#[test]
fn eager_logical_operators_emit_and_or() {
    let context = Context::create();
    let module = lower(&context, "fun f(bool a, bool b) bool { return a and b or a; }");

    let function = module.get_function("f").expect("defined");
    // no extra control flow: both operands evaluate, then a single and/or
    assert_eq!(function.count_basic_blocks(), 1);
}
