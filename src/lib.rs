//! # Wisp
//! This crate contains the core of Wisp, a small Lisp-family language:
//! a single-pass compiler from S-expressions straight to bytecode, and
//! the stack-based VM that runs it.
//!
//! ## Embedding Wisp in Rust
//! Add wisp to your `Cargo.toml`, then:
//! ```no_run
//! use wisp::Source;
//!
//! let source = Source::source("(display (+ 1 2))");
//! match wisp::run(source, false) {
//!     Ok(()) => {}
//!     Err(report) => eprintln!("{}", report),
//! }
//! ```
//!
//! ## Overview of the pipeline
//! Source code is represented as a [`Source`], owning the program text
//! and the path it came from. Regions of source are marked with
//! [`Span`]s, which carry a reference-counted pointer back to the
//! `Source` they index into rather than the text itself.
//!
//! Compilation is one pass: the lexer (`compiler::lex`) turns a
//! `Source` into a token stream, the parser (`compiler::parse`) turns
//! that into an S-expression tree (`compiler::ast::Ast`), and the
//! emitter (`compiler::emit`) walks that tree once, producing an
//! [`ObjFunction`] directly -- there is no separate intermediate
//! representation between the AST and bytecode. Lexical scope
//! resolution (locals, upvalues, globals) happens during this same
//! walk, tracked by `compiler::scope`.
//!
//! Every stage can report [`Diagnostic`]s; compilation keeps going
//! after an error to surface as many as it can, but a program with any
//! diagnostics is never handed to the VM.
//!
//! Execution is handled by [`VM`], a fetch-decode-execute loop over
//! the compiled [`ObjFunction`]. Running can raise a [`Trace`], a
//! runtime error with the span of the instruction that caused it.

pub mod common;
pub mod compiler;
pub mod disasm;
pub mod vm;

use std::rc::Rc;

pub use common::error::{CompileError, Diagnostic, RuntimeError, Trace};
pub use common::function::ObjFunction;
pub use common::source::Source;
pub use common::span::{Span, Spanned};
pub use common::value::Value;
pub use vm::vm::VM;

/// Everything that can go wrong compiling and running a program,
/// flattened into one type so a CLI driver has a single thing to
/// render.
#[derive(Debug)]
pub enum Report {
    Compile(Vec<Diagnostic>),
    Runtime(Trace),
}

impl std::fmt::Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Report::Compile(diagnostics) => {
                for (i, diagnostic) in diagnostics.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    writeln!(f, "{}", diagnostic)?;
                }
                Ok(())
            }
            Report::Runtime(trace) => write!(f, "{}", trace),
        }
    }
}

/// Compiles a [`Source`], returning the diagnostics instead of the
/// function if compilation failed.
pub fn compile(source: Rc<Source>) -> Result<ObjFunction, Vec<Diagnostic>> {
    let (function, diagnostics) = compiler::emit::compile(source);
    if diagnostics.is_empty() {
        Ok(function)
    } else {
        Err(diagnostics)
    }
}

/// Compiles and runs a [`Source`] in one step. `trace` enables the
/// VM's per-instruction execution log on stderr.
pub fn run(source: Rc<Source>, trace: bool) -> Result<(), Report> {
    let function = compile(source).map_err(Report::Compile)?;
    let mut vm = VM::new(function);
    vm.run(trace).map_err(Report::Runtime)
}
