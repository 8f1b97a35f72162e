//! End-to-end driver tests: import resolution, module linking and object
//! file emission.

use std::{env, fs, path::PathBuf};

use inkwell::context::Context;
use neon_lang::compiler::Program;

fn testdata(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("testdata")
        .join(name)
}

#[test]
fn compiles_program_with_imports() {
    let context = Context::create();
    let mut program = Program::new(&context, testdata("main.ne"), false);
    program.compile().expect("program should compile");
}

#[test]
fn emits_an_object_file() {
    let context = Context::create();
    let mut program = Program::new(&context, testdata("main.ne"), false);
    program.compile().expect("program should compile");

    let output = env::temp_dir().join("neon-compile-test.o");
    let _ = fs::remove_file(&output);
    program
        .write_object_file(&output)
        .expect("object file should be written");

    let metadata = fs::metadata(&output).expect("object file exists");
    assert!(metadata.len() > 0);
    let _ = fs::remove_file(&output);
}

#[test]
fn type_errors_fail_the_compilation() {
    let context = Context::create();
    let mut program = Program::new(&context, testdata("broken.ne"), false);
    let error = program.compile().expect_err("compilation should fail");
    assert!(error.to_string().contains("diagnostics"));
}

#[test]
fn missing_file_is_an_error() {
    let context = Context::create();
    let mut program = Program::new(&context, testdata("does-not-exist.ne"), false);
    assert!(program.compile().is_err());
}

#[test]
fn default_object_path_derives_from_the_program_name() {
    let context = Context::create();
    let program = Program::new(&context, testdata("main.ne"), false);
    assert_eq!(
        program.object_file_path().file_name().unwrap(),
        "main.o"
    );
}
