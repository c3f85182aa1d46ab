use std::process::ExitCode;
use std::rc::Rc;

use wisp::Source;

fn main() -> ExitCode {
    let mut path = None;
    let mut disassemble = false;
    let mut trace = false;

    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--disassemble" => disassemble = true,
            "--trace" => trace = true,
            other => path = Some(other.to_string()),
        }
    }

    let path = match path {
        Some(p) => p,
        None => {
            eprintln!("Usage: wisp <source-file> [--disassemble] [--trace]");
            return ExitCode::from(2);
        }
    };

    let source = match Source::path(&path) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("error: could not read '{}': {}", path, e);
            return ExitCode::from(2);
        }
    };

    if disassemble {
        let function = match wisp::compile(Rc::clone(&source)) {
            Ok(function) => function,
            Err(diagnostics) => {
                for diagnostic in &diagnostics {
                    eprintln!("{}", diagnostic);
                }
                return ExitCode::from(1);
            }
        };
        eprint!("{}", wisp::disasm::disassemble(&function));
    }

    match wisp::run(source, trace) {
        Ok(()) => ExitCode::SUCCESS,
        Err(report) => {
            eprintln!("{}", report);
            ExitCode::from(1)
        }
    }
}
