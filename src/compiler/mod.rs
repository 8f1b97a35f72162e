//! The compilation driver.
//!
//! One [`Program`] owns the work queue of source files and the list of
//! compiled modules. Each file runs through the full pipeline (lex, parse,
//! AST, imports, types, IR); imports push new files onto the queue. Once the
//! queue drains, all per-module IR containers are linked in insertion order,
//! verified and written out as a single object file.

use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, bail, Context as _};
use inkwell::{
    context::Context,
    module::Module as LlvmModule,
    targets::{CodeModel, FileType, InitializationConfig, RelocMode, Target, TargetMachine},
    OptimizationLevel,
};
use log::{debug, error, info};

use crate::{
    ast::{print_ast, print_ast_test_case, AstBuilder, AstNode, ImportFinder, TypeFinder},
    codegen::IrGenerator,
    diagnostics::Diagnostics,
    lexer::Lexer,
    loader::FileCodeProvider,
    parser::{print_parse_tree, print_parse_tree_test_case, Parser},
    typechecker::{TypeAnalyser, TypeMap},
};

pub struct CompiledModule<'ctx> {
    pub path: PathBuf,
    pub ast: Option<AstNode>,
    pub types: TypeMap,
    pub llvm_module: LlvmModule<'ctx>,
    pub diagnostics: Diagnostics,
}

pub struct Program<'ctx> {
    context: &'ctx Context,
    verbose: bool,
    main_file: PathBuf,
    modules: Vec<CompiledModule<'ctx>>,
    uncompiled: Vec<PathBuf>,
    seen: HashSet<PathBuf>,
}

impl<'ctx> Program<'ctx> {
    pub fn new(context: &'ctx Context, main_file: PathBuf, verbose: bool) -> Self {
        let main_file = fs::canonicalize(&main_file).unwrap_or(main_file);
        Self {
            context,
            verbose,
            main_file: main_file.clone(),
            modules: vec![],
            uncompiled: vec![main_file],
            seen: HashSet::new(),
        }
    }

    /// Default object file path: the program name with an `.o` extension.
    pub fn object_file_path(&self) -> PathBuf {
        self.main_file.with_extension("o")
    }

    /// Drains the work queue. Returns an error when any module collected
    /// diagnostics; nothing is emitted in that case.
    pub fn compile(&mut self) -> anyhow::Result<()> {
        while let Some(path) = self.uncompiled.pop() {
            if !self.seen.insert(path.clone()) {
                continue;
            }
            info!("compiling {}", path.display());
            let module = self.compile_module(&path)?;

            for message in module.diagnostics.messages() {
                error!("{}: {message}", path.display());
            }
            self.modules.push(module);
        }

        let failed: Vec<&CompiledModule> = self
            .modules
            .iter()
            .filter(|module| !module.diagnostics.is_empty())
            .collect();
        if !failed.is_empty() {
            bail!(
                "compilation failed with {} diagnostics in {} module(s)",
                failed.iter().map(|m| m.diagnostics.len()).sum::<usize>(),
                failed.len()
            );
        }

        Ok(())
    }

    fn compile_module(&mut self, path: &Path) -> anyhow::Result<CompiledModule<'ctx>> {
        let mut diagnostics = Diagnostics::new();

        let provider = FileCodeProvider::new(path)
            .with_context(|| format!("could not read '{}'", path.display()))?;
        let lexer = Lexer::new(Box::new(provider));
        let mut parser = Parser::new(lexer);

        let module_name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "module".to_owned());

        let parse_tree = match parser.create_parse_tree(&mut diagnostics) {
            Ok(tree) => tree,
            Err(parse_error) => {
                diagnostics.report(parse_error.to_string());
                return Ok(CompiledModule {
                    path: path.to_path_buf(),
                    ast: None,
                    types: TypeMap::new(),
                    llvm_module: self.context.create_module(&module_name),
                    diagnostics,
                });
            }
        };

        if self.verbose {
            println!("{}", print_parse_tree(&parse_tree));
            println!("{}", print_parse_tree_test_case(&parse_tree));
        }

        let ast = AstBuilder::new().run(parse_tree, &mut diagnostics);
        let Some(ast) = ast else {
            diagnostics.report("no AST could be constructed");
            return Ok(CompiledModule {
                path: path.to_path_buf(),
                ast: None,
                types: TypeMap::new(),
                llvm_module: self.context.create_module(&module_name),
                diagnostics,
            });
        };

        if self.verbose {
            println!("{}", print_ast(&ast));
            println!("{}", print_ast_test_case(&ast));
        }

        let directory = path.parent().unwrap_or(Path::new("."));
        let mut import_finder = ImportFinder::new(directory);
        import_finder.run(&ast);
        for import in import_finder.imports {
            if !self.seen.contains(&import) {
                debug!("queueing import {}", import.display());
                self.uncompiled.push(import);
            }
        }

        let mut type_finder = TypeFinder::new();
        type_finder.run(&ast);
        for composite in &type_finder.types {
            debug!(
                "declared type '{}' with {} members",
                composite.name,
                composite.members.len()
            );
        }

        let types = TypeAnalyser::new().run(&ast, &mut diagnostics);

        let mut generator = IrGenerator::new(self.context, &module_name, &types);
        generator.run(&ast, &mut diagnostics);
        let llvm_module = generator.into_module();

        if self.verbose {
            println!("{}", llvm_module.print_to_string().to_string());
        }

        Ok(CompiledModule {
            path: path.to_path_buf(),
            ast: Some(ast),
            types,
            llvm_module,
            diagnostics,
        })
    }

    /// Links the per-module IR containers in insertion order, verifies the
    /// merged module and writes one relocatable object file.
    pub fn write_object_file(&mut self, output: &Path) -> anyhow::Result<()> {
        Target::initialize_native(&InitializationConfig::default())
            .map_err(|message| anyhow!("could not initialise native target: {message}"))?;

        let triple = TargetMachine::get_default_triple();
        let target = Target::from_triple(&triple)
            .map_err(|message| anyhow!("could not resolve target: {message}"))?;
        let machine = target
            .create_target_machine(
                &triple,
                "generic",
                "",
                OptimizationLevel::None,
                RelocMode::Default,
                CodeModel::Default,
            )
            .ok_or_else(|| anyhow!("could not create target machine"))?;

        let merged = self.context.create_module("program");
        merged.set_triple(&triple);
        merged.set_data_layout(&machine.get_target_data().get_data_layout());

        for module in self.modules.drain(..) {
            module.llvm_module.set_triple(&triple);
            module
                .llvm_module
                .set_data_layout(&machine.get_target_data().get_data_layout());
            merged
                .link_in_module(module.llvm_module)
                .map_err(|message| {
                    anyhow!("could not link '{}': {message}", module.path.display())
                })?;
        }

        generate_dummy_main(self.context, &merged);

        merged
            .verify()
            .map_err(|message| anyhow!("IR verification failed: {message}"))?;

        machine
            .write_to_file(&merged, FileType::Object, output)
            .map_err(|message| anyhow!("could not write object file: {message}"))?;
        info!("wrote {}", output.display());

        Ok(())
    }
}

/// Synthesises `main` returning 0 when the linked program does not define
/// one, so the object file always links into a runnable executable.
fn generate_dummy_main<'ctx>(context: &'ctx Context, module: &LlvmModule<'ctx>) {
    if module.get_function("main").is_some() {
        return;
    }

    let main = module.add_function("main", context.i64_type().fn_type(&[], false), None);
    let entry = context.append_basic_block(main, "entry");
    let builder = context.create_builder();
    builder.position_at_end(entry);
    let zero = context.i64_type().const_zero();
    let _ = builder.build_return(Some(&zero));
}
