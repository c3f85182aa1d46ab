//! The three error taxonomies: lexical/parse, compile, and runtime.
//! Each carries a `Span` and renders through the same
//! `<file>:<line>:<col>: error: <message>` shape, mirroring the
//! teacher's split between a front-end `Syntax` error and a VM
//! `Trace` error, but with a typed reason instead of a free string so
//! tests can match on error *kind*.

use std::fmt;

use crate::common::span::Span;

/// Front-end error: raised by the lexer or the parser/compiler. Both
/// share the "report, then keep going to find more errors, but refuse
/// to execute" recovery policy from spec.md's error handling design.
#[derive(Debug, Clone, PartialEq)]
pub enum CompileError {
    UnterminatedString,
    UnknownCharacter(char),
    UnexpectedToken { expected: String, found: String },
    UnexpectedEof,
    DottedPairMissingHead,
    ElseNotLast,
    DuplicateDefinition(String),
    TooManyLocals,
    TooManyUpvalues,
    ChunkTooLarge,
    ArityMismatch { form: String, expected: String, found: usize },
    MalformedForm(String),
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::UnterminatedString => write!(f, "unterminated string literal"),
            CompileError::UnknownCharacter(c) => write!(f, "unexpected character '{}'", c),
            CompileError::UnexpectedToken { expected, found } => {
                write!(f, "expected {}, found {}", expected, found)
            }
            CompileError::UnexpectedEof => write!(f, "unexpected end of input"),
            CompileError::DottedPairMissingHead => write!(f, "dotted pair is missing a head expression"),
            CompileError::ElseNotLast => write!(f, "'else' clause must be the last clause of 'cond'"),
            CompileError::DuplicateDefinition(name) => {
                write!(f, "duplicate definition '{}' in this scope", name)
            }
            CompileError::TooManyLocals => write!(f, "too many local variables in one function"),
            CompileError::TooManyUpvalues => write!(f, "too many captured variables in one function"),
            CompileError::ChunkTooLarge => write!(f, "function body is too large to compile (jump target overflow)"),
            CompileError::ArityMismatch { form, expected, found } => {
                write!(f, "'{}' expects {} argument(s), found {}", form, expected, found)
            }
            CompileError::MalformedForm(what) => write!(f, "malformed {}", what),
        }
    }
}

/// A compile-time (or lex/parse-time) diagnostic with its source
/// location attached.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub error: CompileError,
    pub span: Span,
}

impl Diagnostic {
    pub fn new(error: CompileError, span: Span) -> Diagnostic {
        Diagnostic { error, span }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        render(f, &self.span, &self.error.to_string())
    }
}

/// Raised by the VM; execution aborts as soon as one is produced.
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeError {
    TypeMismatch { expected: &'static str, found: &'static str },
    DivisionByZero,
    NotCallable(&'static str),
    ArityMismatch { expected: u8, found: usize },
    UndefinedGlobal(String),
    UndefinedGlobalAssign(String),
    StackOverflow,
    FrameOverflow,
    IoError(String),
    NotAPair,
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::TypeMismatch { expected, found } => {
                write!(f, "expected {}, found {}", expected, found)
            }
            RuntimeError::DivisionByZero => write!(f, "Division by zero"),
            RuntimeError::NotCallable(found) => write!(f, "value of type {} is not callable", found),
            RuntimeError::ArityMismatch { expected, found } => {
                write!(f, "expected {} argument(s), found {}", expected, found)
            }
            RuntimeError::UndefinedGlobal(name) => write!(f, "Undefined variable '{}'", name),
            RuntimeError::UndefinedGlobalAssign(name) => {
                write!(f, "cannot set! undefined variable '{}'", name)
            }
            RuntimeError::StackOverflow => write!(f, "value stack overflow"),
            RuntimeError::FrameOverflow => write!(f, "call frame overflow"),
            RuntimeError::IoError(msg) => write!(f, "I/O error: {}", msg),
            RuntimeError::NotAPair => write!(f, "expected a pair"),
        }
    }
}

/// A runtime diagnostic: the error plus the span of the instruction
/// that raised it (recovered from the chunk's per-instruction span
/// table) and the instruction index, for trace printing.
#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    pub error: RuntimeError,
    pub span: Span,
    pub ip: usize,
}

impl Trace {
    pub fn new(error: RuntimeError, span: Span, ip: usize) -> Trace {
        Trace { error, span, ip }
    }
}

impl fmt::Display for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        render(f, &self.span, &self.error.to_string())
    }
}

/// Shared diagnostic renderer: `<file>:<line>:<col>: error: <message>`,
/// followed by the source line and a caret when the span has one.
fn render(f: &mut fmt::Formatter<'_>, span: &Span, message: &str) -> fmt::Result {
    if span.is_empty() {
        return write!(f, "error: {}", message);
    }
    let (line, col) = span.start_line_col();
    writeln!(f, "{}:{}:{}: error: {}", span.source_name(), line, col, message)?;
    if let Some(text) = span.source_line() {
        writeln!(f, "{}", text)?;
        write!(f, "{}^", " ".repeat(col.saturating_sub(1)))?;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::common::source::Source;

    #[test]
    fn renders_location_and_caret() {
        let source = Source::source("(foo)");
        let span = Span::new(&source, 1, 3);
        let diag = Diagnostic::new(CompileError::UnexpectedEof, span);
        let rendered = format!("{}", diag);
        assert!(rendered.starts_with("<anonymous>:1:2: error:"));
        assert!(rendered.contains("(foo)"));
    }
}
