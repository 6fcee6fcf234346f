//! The `novac` command-line interface.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Result};

use novac_drv::{Compiler, Config, EmitKind};

const USAGE: &str = "\
Nova Compiler - TypeScript/JavaScript AOT compiler via LLVM

Usage: novac <command> [options] <input>

Commands:
  compile    Compile source to native code (default)
  run        JIT compile and run

Options:
  -o <file>           Output file
  -O<level>           Optimization level (0-3) [default: 2]
  --emit-tokens       Print the token stream
  --emit-ast          Print the AST
  --emit-hir          Print HIR
  --emit-mir          Print MIR
  --emit-llvm         Emit LLVM IR (.ll)
  --emit-bc           Emit bitcode (.bc)
  --emit-asm          Emit assembly (.s)
  --emit-obj          Emit object file (.o)
  --verbose           Verbose output
  --version           Show version
  --help              Show this help message

Examples:
  novac compile hello.ts -o hello
  novac compile app.ts -O3 --emit-llvm
  novac run script.ts
";

fn parse_args(args: &[String]) -> Result<Config> {
    let mut config = Config::default();
    let mut rest = args;

    match rest.first().map(String::as_str) {
        Some("compile") => {
            rest = &rest[1..];
        }
        Some("run") => {
            config.run = true;
            rest = &rest[1..];
        }
        _ => {}
    }

    let mut i = 0;
    while i < rest.len() {
        let arg = &rest[i];
        match arg.as_str() {
            "-o" => {
                i += 1;
                match rest.get(i) {
                    Some(path) => config.output = Some(PathBuf::from(path)),
                    None => bail!("-o requires an argument"),
                }
            }
            "--emit-tokens" => config.emit = EmitKind::Tokens,
            "--emit-ast" => config.emit = EmitKind::Ast,
            "--emit-hir" => config.emit = EmitKind::Hir,
            "--emit-mir" => config.emit = EmitKind::Mir,
            "--emit-llvm" => config.emit = EmitKind::LlvmIr,
            "--emit-bc" => config.emit = EmitKind::Bitcode,
            "--emit-asm" => config.emit = EmitKind::Assembly,
            "--emit-obj" => config.emit = EmitKind::Object,
            "--verbose" => config.verbose = true,
            _ if arg.starts_with("-O") => {
                config.opt_level = arg[2..]
                    .parse()
                    .map_err(|_| anyhow::anyhow!("invalid optimization level '{}'", arg))?;
                if config.opt_level > 3 {
                    bail!("optimization level must be 0-3");
                }
            }
            _ if arg.starts_with('-') => bail!("unknown option '{}'", arg),
            _ => {
                if !config.input.as_os_str().is_empty() {
                    bail!("multiple input files are not supported");
                }
                config.input = PathBuf::from(arg);
            }
        }
        i += 1;
    }

    if config.input.as_os_str().is_empty() {
        bail!("no input file");
    }
    Ok(config)
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.is_empty() || args.iter().any(|a| a == "--help" || a == "-h") {
        print!("{}", USAGE);
        return ExitCode::from(if args.is_empty() { 1 } else { 0 });
    }
    if args.iter().any(|a| a == "--version" || a == "-v") {
        println!("novac {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    let config = match parse_args(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::from(3);
        }
    };

    match Compiler::new(config).run() {
        Ok(code) => ExitCode::from(code.clamp(0, 255) as u8),
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
