//! novac-drv - Compiler Driver
//!
//! Orchestrates the pipeline: read source, lex, parse, lower to HIR, lower
//! to MIR, generate LLVM IR, then emit or JIT-execute. Each stage owns its
//! diagnostics; the driver aggregates them in stage order and decides
//! whether to continue. Stages always hand a structurally valid (if
//! incomplete) IR downstream, so one invocation can report many errors.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _, Result};
use inkwell::context::Context;

use novac_gen::LlvmCodeGen;
use novac_hir::HirModule;
use novac_lex::{Lexer, Token};
use novac_mir::MirModule;
use novac_par::{Parser, Program};

/// What the driver should produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmitKind {
    Tokens,
    Ast,
    Hir,
    Mir,
    LlvmIr,
    Bitcode,
    Assembly,
    Object,
    Executable,
}

impl Default for EmitKind {
    fn default() -> Self {
        EmitKind::Executable
    }
}

/// Driver configuration for one invocation.
#[derive(Debug, Clone)]
pub struct Config {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    /// Optimization level 0-3.
    pub opt_level: u32,
    pub emit: EmitKind,
    pub verbose: bool,
    /// JIT-execute instead of emitting.
    pub run: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            output: None,
            opt_level: 2,
            emit: EmitKind::Executable,
            verbose: false,
            run: false,
        }
    }
}

/// The products of the front and middle of the pipeline, plus aggregated
/// diagnostics in stage order.
pub struct Compilation {
    pub tokens: Vec<Token>,
    pub program: Program,
    pub hir: HirModule,
    pub mir: MirModule,
    /// Rendered diagnostics: lexer and parser first in source order, then
    /// HIR and MIR lowering in function-declaration order.
    pub diagnostics: Vec<String>,
    pub error_count: usize,
}

impl Compilation {
    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }
}

/// Run the pipeline through MIR. Never fails on source errors; read the
/// diagnostics to decide whether to continue to code generation.
pub fn compile_to_mir(filename: &str, source: &str) -> Compilation {
    let module_name = Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("main")
        .to_string();

    let mut lexer = Lexer::new(filename, source);
    let tokens = lexer.all_tokens().to_vec();

    // Parser::new drains the lexer's diagnostics so they come out first.
    let mut parser = Parser::new(lexer);
    let program = parser.parse_program();
    let mut diagnostics = parser.errors();
    let mut error_count = parser.handler().error_count();

    let (hir, hir_diags) = novac_hir::generate_hir(&program, &module_name);
    for diag in &hir_diags {
        if diag.level == novac_util::Level::Error {
            error_count += 1;
        }
        diagnostics.push(diag.to_string());
    }

    let (mir, mir_diags) = novac_mir::generate_mir(&hir, &module_name);
    for diag in &mir_diags {
        if diag.level == novac_util::Level::Error {
            error_count += 1;
        }
        diagnostics.push(diag.to_string());
    }

    Compilation {
        tokens,
        program,
        hir,
        mir,
        diagnostics,
        error_count,
    }
}

/// The driver proper: reads the input, runs the pipeline, and produces the
/// configured output. Returns the process exit code.
pub struct Compiler {
    config: Config,
}

impl Compiler {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn run(&self) -> Result<i32> {
        let source = fs::read_to_string(&self.config.input)
            .with_context(|| format!("cannot read {}", self.config.input.display()))?;
        let filename = self.config.input.display().to_string();

        let compilation = compile_to_mir(&filename, &source);
        for diagnostic in &compilation.diagnostics {
            if self.config.verbose || diagnostic.contains("error:") {
                eprintln!("{}", diagnostic);
            }
        }
        if compilation.has_errors() {
            bail!("compilation failed with {} errors", compilation.error_count);
        }

        match self.config.emit {
            EmitKind::Tokens => {
                for token in &compilation.tokens {
                    println!("{}", token);
                }
                return Ok(0);
            }
            EmitKind::Ast => {
                println!("{:#?}", compilation.program.ast);
                return Ok(0);
            }
            EmitKind::Hir => {
                print!("{}", compilation.hir);
                return Ok(0);
            }
            EmitKind::Mir => {
                print!("{}", compilation.mir);
                return Ok(0);
            }
            _ => {}
        }

        // LLVM stages. The context outlives the code generator.
        let context = Context::create();
        let module_name = compilation.mir.name.to_string();
        let mut codegen = LlvmCodeGen::new(&context, &module_name);
        codegen
            .generate(&compilation.mir)
            .context("LLVM code generation failed")?;
        if self.config.opt_level > 0 {
            codegen.run_optimization_passes(self.config.opt_level)?;
        }

        if self.config.run {
            let exit = codegen.execute_main()?;
            return Ok(exit);
        }

        let output = self.output_path();
        match self.config.emit {
            EmitKind::LlvmIr => codegen.emit_llvm_ir(&output)?,
            EmitKind::Bitcode => codegen.emit_bitcode(&output)?,
            EmitKind::Assembly => codegen.emit_assembly(&output)?,
            EmitKind::Object => codegen.emit_object(&output)?,
            EmitKind::Executable => codegen.emit_executable(&output)?,
            _ => unreachable!("front-end emit kinds handled above"),
        }
        if self.config.verbose {
            eprintln!("wrote {}", output.display());
        }
        Ok(0)
    }

    fn output_path(&self) -> PathBuf {
        if let Some(output) = &self.config.output {
            return output.clone();
        }
        let extension = match self.config.emit {
            EmitKind::LlvmIr => "ll",
            EmitKind::Bitcode => "bc",
            EmitKind::Assembly => "s",
            EmitKind::Object => "o",
            _ => "out",
        };
        self.config.input.with_extension(extension)
    }
}
