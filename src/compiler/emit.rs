//! The single-pass compiler: walks the parsed `Ast` once, emitting
//! bytecode directly into a stack of `Frame`s (one per nested
//! `lambda`) with no intermediate tree representation.

use std::rc::Rc;

use crate::common::chunk::MAX_INSTRUCTIONS;
use crate::common::error::{CompileError, Diagnostic};
use crate::common::function::ObjFunction;
use crate::common::opcode::Opcode;
use crate::common::source::Source;
use crate::common::span::{Span, Spanned};
use crate::common::value::Value;
use crate::compiler::ast::Ast;
use crate::compiler::lex::lex;
use crate::compiler::parse::parse;
use crate::compiler::scope::{resolve_local, resolve_upvalue, Frame, LocalVar};
use crate::compiler::token::{Token, TokenKind};

/// The builtins the compiler dispatches straight to an opcode instead
/// of a general `CALL`, exactly as listed in the component design.
const BUILTINS: &[&str] = &[
    "+", "-", "*", "/", "=", "<", ">", "<=", ">=", "!=", "display", "newline", "read", "read-line",
    "cons", "car", "cdr",
];

/// Compiles a whole program into its implicit top-level function.
/// Lex/parse/compile errors are all collected into one list; the
/// `HALT` instruction is always emitted so a caller can disassemble
/// (or even run, at its own risk) a program that failed to compile
/// cleanly, but the returned diagnostics are what should gate
/// execution.
pub fn compile(source: Rc<Source>) -> (ObjFunction, Vec<Diagnostic>) {
    let (tokens, lex_errors) = lex(source);
    let (forms, parse_errors) = parse(tokens);

    let mut compiler = Compiler {
        frames: vec![Frame::new(ObjFunction::new(None, 0))],
        errors: lex_errors,
    };
    compiler.errors.extend(parse_errors);

    for form in &forms {
        compiler.compile_statement(form);
        let span = form.span.clone();
        compiler.emit(Opcode::Pop, 0, span);
    }

    let halt_span = forms.last().map(|f| f.span.clone()).unwrap_or_else(Span::empty);
    compiler.emit(Opcode::Halt, 0, halt_span);

    let function = compiler.frames.pop().expect("top-level frame").function;
    (function, compiler.errors)
}

struct Compiler {
    frames: Vec<Frame>,
    errors: Vec<Diagnostic>,
}

impl Compiler {
    fn current_frame(&self) -> &Frame {
        self.frames.last().expect("at least one frame")
    }

    fn current_frame_mut(&mut self) -> &mut Frame {
        self.frames.last_mut().expect("at least one frame")
    }

    fn error(&mut self, error: CompileError, span: Span) {
        self.errors.push(Diagnostic::new(error, span));
    }

    fn emit(&mut self, opcode: Opcode, operand: u16, span: Span) -> usize {
        let chunk = &mut self.current_frame_mut().function.chunk;
        if chunk.len() >= MAX_INSTRUCTIONS {
            self.error(CompileError::ChunkTooLarge, span.clone());
        }
        self.current_frame_mut().function.chunk.emit(opcode, operand, span)
    }

    fn emit_constant(&mut self, value: Value, span: Span) {
        let idx = self.current_frame_mut().function.chunk.add_constant(value);
        self.emit(Opcode::Constant, idx as u16, span);
    }

    fn patch_jump(&mut self, index: usize) {
        let target = self.current_frame().function.chunk.len() as u16;
        self.current_frame_mut().function.chunk.patch_jump(index, target);
    }

    /// Compiles one body statement. Returns `true` if the statement was
    /// a `define` that installed a fresh local -- its value is already
    /// permanently in place as that local's stack slot, so the caller
    /// must never emit a `POP` for it, no matter its position in the
    /// body.
    fn compile_statement(&mut self, stmt: &Spanned<Ast>) -> bool {
        if let Some(elements) = stmt.item.elements() {
            if let Some(first) = elements.first() {
                if matches!(&first.item, Ast::Atom(Token { kind: TokenKind::Define, .. })) {
                    return self.compile_define(&elements[1..], stmt.span.clone());
                }
            }
        }
        self.compile_expr(stmt);
        false
    }

    /// Compiles a sequence of body expressions, leaving exactly one
    /// value on the stack: `nil` for an empty body, otherwise the last
    /// statement's value (popping every earlier one that isn't a fresh
    /// local declaration).
    fn compile_body(&mut self, body: &[&Spanned<Ast>], span: Span) {
        if body.is_empty() {
            self.emit_constant(Value::Nil, span);
            return;
        }
        let last = body.len() - 1;
        for (i, stmt) in body.iter().enumerate() {
            let is_fresh_local = self.compile_statement(stmt);
            if i != last && !is_fresh_local {
                self.emit(Opcode::Pop, 0, stmt.span.clone());
            }
        }
    }

    fn compile_define(&mut self, rest: &[&Spanned<Ast>], span: Span) -> bool {
        let name = match rest.first().map(|s| &s.item) {
            Some(Ast::Atom(Token { kind: TokenKind::Identifier(name), .. })) => name.clone(),
            _ => {
                self.error(CompileError::MalformedForm("define: expected a name".to_string()), span.clone());
                self.emit_constant(Value::Nil, span);
                return false;
            }
        };

        if rest.len() != 2 {
            self.error(
                CompileError::ArityMismatch { form: "define".to_string(), expected: "2".to_string(), found: rest.len() },
                span.clone(),
            );
        }

        match rest.get(1) {
            Some(expr) => self.compile_expr(expr),
            None => self.emit_constant(Value::Nil, span.clone()),
        }

        if self.frames.len() == 1 {
            let idx = self.current_frame_mut().function.chunk.add_constant(Value::string(name));
            self.emit(Opcode::DefineGlobal, idx as u16, span);
            return false;
        }

        let frame_idx = self.frames.len() - 1;
        if let Some(slot) = resolve_local(&self.frames[frame_idx], &name) {
            self.emit(Opcode::SetLocal, slot, span);
            return false;
        }
        match resolve_upvalue(&mut self.frames, frame_idx, &name) {
            Ok(Some(index)) => {
                self.emit(Opcode::SetUpvalue, index, span);
                false
            }
            Ok(None) => {
                self.current_frame_mut().locals.push(LocalVar { name, captured: false });
                true
            }
            Err(err) => {
                self.error(err, span);
                false
            }
        }
    }

    fn compile_expr(&mut self, node: &Spanned<Ast>) {
        match &node.item {
            Ast::Nil => self.emit_constant(Value::Nil, node.span.clone()),
            Ast::Atom(token) => self.compile_atom(token, node.span.clone()),
            Ast::List(..) => self.compile_list(node),
        }
    }

    fn compile_atom(&mut self, token: &Token, span: Span) {
        match &token.kind {
            TokenKind::Number(n) => self.emit_constant(Value::Number(*n), span),
            TokenKind::Str(s) => self.emit_constant(Value::string(s.clone()), span),
            TokenKind::True => self.emit_constant(Value::Bool(true), span),
            TokenKind::False => self.emit_constant(Value::Bool(false), span),
            TokenKind::Identifier(name) => self.compile_identifier(name, span),
            other => {
                self.error(CompileError::MalformedForm(format!("use of reserved word {} as a value", other)), span.clone());
                self.emit_constant(Value::Nil, span);
            }
        }
    }

    fn compile_identifier(&mut self, name: &str, span: Span) {
        let frame_idx = self.frames.len() - 1;
        if let Some(slot) = resolve_local(&self.frames[frame_idx], name) {
            self.emit(Opcode::GetLocal, slot, span);
            return;
        }
        match resolve_upvalue(&mut self.frames, frame_idx, name) {
            Ok(Some(index)) => {
                self.emit(Opcode::GetUpvalue, index, span);
            }
            Ok(None) => {
                let idx = self.current_frame_mut().function.chunk.add_constant(Value::string(name));
                self.emit(Opcode::GetGlobal, idx as u16, span);
            }
            Err(err) => self.error(err, span),
        }
    }

    fn compile_list(&mut self, node: &Spanned<Ast>) {
        let elements = match node.item.elements() {
            Some(e) => e,
            None => {
                self.error(CompileError::MalformedForm("dotted pair used as a form".to_string()), node.span.clone());
                self.emit_constant(Value::Nil, node.span.clone());
                return;
            }
        };
        let head = elements[0];
        let args = &elements[1..];

        if let Ast::Atom(token) = &head.item {
            match &token.kind {
                TokenKind::If => return self.compile_if(args, node.span.clone()),
                TokenKind::Define => {
                    self.compile_define(args, node.span.clone());
                    return;
                }
                TokenKind::Lambda => return self.compile_lambda(args, node.span.clone()),
                TokenKind::Cond => return self.compile_cond(args, node.span.clone()),
                TokenKind::And => return self.compile_and(args, node.span.clone()),
                TokenKind::Or => return self.compile_or(args, node.span.clone()),
                TokenKind::QuoteWord => return self.compile_quote(args, node.span.clone()),
                TokenKind::Identifier(name) if BUILTINS.contains(&name.as_str()) => {
                    return self.compile_builtin(name.clone(), args, node.span.clone());
                }
                TokenKind::Let
                | TokenKind::LetStar
                | TokenKind::Letrec
                | TokenKind::LetrecStar
                | TokenKind::Case
                | TokenKind::Begin
                | TokenKind::When
                | TokenKind::Unless
                | TokenKind::Do
                | TokenKind::Delay
                | TokenKind::SetBang
                | TokenKind::Quasiquote
                | TokenKind::UnquoteWord
                | TokenKind::Else => {
                    self.error(
                        CompileError::MalformedForm(format!("use of reserved word {} as a form", token.kind)),
                        head.span.clone(),
                    );
                    self.emit_constant(Value::Nil, node.span.clone());
                    return;
                }
                _ => {}
            }
        }

        self.compile_call(head, args, node.span.clone());
    }

    fn compile_call(&mut self, head: &Spanned<Ast>, args: &[&Spanned<Ast>], span: Span) {
        self.compile_expr(head);
        for arg in args {
            self.compile_expr(arg);
        }
        self.emit(Opcode::Call, args.len() as u16, span);
    }

    fn compile_if(&mut self, args: &[&Spanned<Ast>], span: Span) {
        if args.len() < 2 || args.len() > 3 {
            self.error(
                CompileError::ArityMismatch { form: "if".to_string(), expected: "2 or 3".to_string(), found: args.len() },
                span.clone(),
            );
            self.emit_constant(Value::Nil, span);
            return;
        }

        self.compile_expr(args[0]);
        let jump_false = self.emit(Opcode::JumpIfFalse, 0, span.clone());
        self.compile_expr(args[1]);
        let jump_end = self.emit(Opcode::Jump, 0, span.clone());
        self.patch_jump(jump_false);
        if args.len() == 3 {
            self.compile_expr(args[2]);
        } else {
            self.emit_constant(Value::Nil, span);
        }
        self.patch_jump(jump_end);
    }

    fn compile_cond(&mut self, clauses: &[&Spanned<Ast>], span: Span) {
        let mut exit_jumps = Vec::new();
        let mut else_seen = false;

        for (i, clause) in clauses.iter().enumerate() {
            let parts = match clause.item.elements() {
                Some(p) if !p.is_empty() => p,
                _ => {
                    self.error(CompileError::MalformedForm("cond clause".to_string()), clause.span.clone());
                    continue;
                }
            };
            let test = parts[0];
            let body = &parts[1..];
            let is_else = matches!(&test.item, Ast::Atom(Token { kind: TokenKind::Else, .. }));

            if is_else {
                if i != clauses.len() - 1 {
                    self.error(CompileError::ElseNotLast, test.span.clone());
                }
                else_seen = true;
                self.compile_body(body, clause.span.clone());
            } else {
                self.compile_expr(test);
                let jump_false = self.emit(Opcode::JumpIfFalse, 0, test.span.clone());
                self.compile_body(body, clause.span.clone());
                exit_jumps.push(self.emit(Opcode::Jump, 0, clause.span.clone()));
                self.patch_jump(jump_false);
            }
        }

        if !else_seen {
            self.emit_constant(Value::Nil, span);
        }
        for jump in exit_jumps {
            self.patch_jump(jump);
        }
    }

    fn compile_and(&mut self, args: &[&Spanned<Ast>], span: Span) {
        if args.is_empty() {
            self.emit_constant(Value::Bool(true), span);
            return;
        }
        let last = args.len() - 1;
        let mut patches = Vec::new();
        for (i, arg) in args.iter().enumerate() {
            self.compile_expr(arg);
            if i != last {
                patches.push(self.emit(Opcode::JumpIfFalseOrPop, 0, arg.span.clone()));
            }
        }
        for jump in patches {
            self.patch_jump(jump);
        }
    }

    fn compile_or(&mut self, args: &[&Spanned<Ast>], span: Span) {
        if args.is_empty() {
            self.emit_constant(Value::Bool(false), span);
            return;
        }
        let last = args.len() - 1;
        let mut patches = Vec::new();
        for (i, arg) in args.iter().enumerate() {
            self.compile_expr(arg);
            if i != last {
                patches.push(self.emit(Opcode::JumpIfTrueOrPop, 0, arg.span.clone()));
            }
        }
        for jump in patches {
            self.patch_jump(jump);
        }
    }

    fn compile_quote(&mut self, args: &[&Spanned<Ast>], span: Span) {
        if args.len() != 1 {
            self.error(
                CompileError::ArityMismatch { form: "quote".to_string(), expected: "1".to_string(), found: args.len() },
                span.clone(),
            );
            self.emit_constant(Value::Nil, span);
            return;
        }
        let value = ast_to_value(args[0]);
        self.emit_constant(value, span);
    }

    fn compile_lambda(&mut self, rest: &[&Spanned<Ast>], span: Span) {
        if rest.is_empty() {
            self.error(
                CompileError::ArityMismatch { form: "lambda".to_string(), expected: "at least 1".to_string(), found: 0 },
                span.clone(),
            );
            self.emit_constant(Value::Nil, span);
            return;
        }

        let params = match rest[0].item.elements() {
            Some(p) => p,
            None => {
                self.error(CompileError::MalformedForm("lambda parameter list must be a proper list".to_string()), rest[0].span.clone());
                self.emit_constant(Value::Nil, span);
                return;
            }
        };

        let mut names = Vec::with_capacity(params.len());
        for param in &params {
            match &param.item {
                Ast::Atom(Token { kind: TokenKind::Identifier(name), .. }) => names.push(name.clone()),
                _ => self.error(CompileError::MalformedForm("lambda parameter must be an identifier".to_string()), param.span.clone()),
            }
        }
        if names.len() > u8::MAX as usize {
            self.error(CompileError::TooManyLocals, rest[0].span.clone());
        }
        let arity = names.len() as u8;
        let body = &rest[1..];

        self.frames.push(Frame::new(ObjFunction::new(None, arity)));
        self.current_frame_mut().locals.push(LocalVar { name: String::new(), captured: false });
        for name in names {
            self.current_frame_mut().locals.push(LocalVar { name, captured: false });
        }

        self.compile_body(body, span.clone());
        self.emit(Opcode::Return, 0, span.clone());

        let finished = self.frames.pop().expect("lambda frame");
        let mut function = finished.function;
        function.upvalue_count = finished.upvalues.len() as u16;

        let const_idx = self.current_frame_mut().function.chunk.add_constant(Value::Function(Rc::new(function)));
        self.emit(Opcode::Closure, const_idx as u16, span.clone());

        for upvalue in finished.upvalues {
            let opcode = if upvalue.is_local { Opcode::GetLocal } else { Opcode::GetUpvalue };
            self.emit(opcode, upvalue.index, span.clone());
        }
    }

    fn compile_builtin(&mut self, name: String, args: &[&Spanned<Ast>], span: Span) {
        match name.as_str() {
            "+" => self.compile_fold(args, 0.0, Opcode::Add, span),
            "*" => self.compile_fold(args, 1.0, Opcode::Mul, span),
            "-" => self.compile_fold_unary(args, 0.0, Opcode::Sub, "-", span),
            "/" => self.compile_fold_unary(args, 1.0, Opcode::Div, "/", span),
            "=" => self.compile_comparison(args, Opcode::Equal, "=", span),
            "!=" => self.compile_comparison(args, Opcode::NotEqual, "!=", span),
            "<" => self.compile_comparison(args, Opcode::Less, "<", span),
            ">" => self.compile_comparison(args, Opcode::Greater, ">", span),
            "<=" => self.compile_comparison(args, Opcode::LessEqual, "<=", span),
            ">=" => self.compile_comparison(args, Opcode::GreaterEqual, ">=", span),
            "cons" => self.compile_fixed_arity(args, 2, Opcode::Cons, "cons", span),
            "car" => self.compile_fixed_arity(args, 1, Opcode::Car, "car", span),
            "cdr" => self.compile_fixed_arity(args, 1, Opcode::Cdr, "cdr", span),
            "display" => self.compile_fixed_arity(args, 1, Opcode::Display, "display", span),
            "newline" => self.compile_fixed_arity(args, 0, Opcode::Newline, "newline", span),
            "read" => self.compile_fixed_arity(args, 0, Opcode::Read, "read", span),
            "read-line" => self.compile_fixed_arity(args, 0, Opcode::ReadLine, "read-line", span),
            _ => unreachable!("dispatched a non-builtin name {}", name),
        }
    }

    fn compile_fold(&mut self, args: &[&Spanned<Ast>], identity: f64, op: Opcode, span: Span) {
        if args.is_empty() {
            self.emit_constant(Value::Number(identity), span);
            return;
        }
        self.compile_expr(args[0]);
        for arg in &args[1..] {
            self.compile_expr(arg);
            self.emit(op, 0, arg.span.clone());
        }
    }

    fn compile_fold_unary(&mut self, args: &[&Spanned<Ast>], identity: f64, op: Opcode, form: &str, span: Span) {
        if args.is_empty() {
            self.error(
                CompileError::ArityMismatch { form: form.to_string(), expected: "at least 1".to_string(), found: 0 },
                span.clone(),
            );
            self.emit_constant(Value::Nil, span);
            return;
        }
        if args.len() == 1 {
            self.emit_constant(Value::Number(identity), span.clone());
            self.compile_expr(args[0]);
            self.emit(op, 0, span);
            return;
        }
        self.compile_expr(args[0]);
        for arg in &args[1..] {
            self.compile_expr(arg);
            self.emit(op, 0, arg.span.clone());
        }
    }

    fn compile_comparison(&mut self, args: &[&Spanned<Ast>], op: Opcode, form: &str, span: Span) {
        if args.len() != 2 {
            self.error(
                CompileError::ArityMismatch { form: form.to_string(), expected: "2".to_string(), found: args.len() },
                span.clone(),
            );
            self.emit_constant(Value::Bool(false), span);
            return;
        }
        self.compile_expr(args[0]);
        self.compile_expr(args[1]);
        self.emit(op, 0, span);
    }

    fn compile_fixed_arity(&mut self, args: &[&Spanned<Ast>], expected: usize, op: Opcode, form: &str, span: Span) {
        if args.len() != expected {
            self.error(
                CompileError::ArityMismatch { form: form.to_string(), expected: expected.to_string(), found: args.len() },
                span.clone(),
            );
            self.emit_constant(Value::Nil, span);
            return;
        }
        for arg in args {
            self.compile_expr(arg);
        }
        self.emit(op, 0, span);
    }
}

/// Converts a quoted AST node into the `Value` it denotes, without
/// evaluating it: atoms become literals or symbol strings, lists
/// become chains of heap pairs.
fn ast_to_value(node: &Spanned<Ast>) -> Value {
    match &node.item {
        Ast::Nil => Value::Nil,
        Ast::Atom(token) => match &token.kind {
            TokenKind::Number(n) => Value::Number(*n),
            TokenKind::Str(s) => Value::string(s.clone()),
            TokenKind::True => Value::Bool(true),
            TokenKind::False => Value::Bool(false),
            _ => Value::string(token.lexeme.clone()),
        },
        Ast::List(car, cdr) => Value::cons(ast_to_value(car), ast_to_value(cdr)),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::common::source::Source;

    fn compile_ok(src: &str) -> ObjFunction {
        let (function, errors) = compile(Source::source(src));
        assert!(errors.is_empty(), "unexpected compile errors: {:?}", errors);
        function
    }

    fn opcodes(function: &ObjFunction) -> Vec<Opcode> {
        function.chunk.instructions.iter().map(|i| i.opcode).collect()
    }

    #[test]
    fn compiles_arithmetic() {
        let function = compile_ok("(+ 1 2)");
        assert_eq!(
            opcodes(&function),
            vec![Opcode::Constant, Opcode::Constant, Opcode::Add, Opcode::Pop, Opcode::Halt]
        );
    }

    #[test]
    fn compiles_global_define() {
        let function = compile_ok("(define x 5)");
        assert!(opcodes(&function).contains(&Opcode::DefineGlobal));
    }

    #[test]
    fn if_emits_two_jumps() {
        let function = compile_ok("(if #t 1 2)");
        let ops = opcodes(&function);
        assert!(ops.contains(&Opcode::JumpIfFalse));
        assert!(ops.contains(&Opcode::Jump));
    }

    #[test]
    fn if_without_else_uses_nil() {
        let function = compile_ok("(if #f 1)");
        assert_eq!(function.chunk.constants.last(), Some(&Value::Nil));
    }

    #[test]
    fn lambda_emits_closure_and_upvalue_descriptors() {
        let function = compile_ok("(lambda (n) (lambda () n))");
        let ops = opcodes(&function);
        assert!(ops.contains(&Opcode::Closure));
    }

    #[test]
    fn and_short_circuits_with_jump_if_false_or_pop() {
        let function = compile_ok("(and 1 2 3)");
        assert!(opcodes(&function).contains(&Opcode::JumpIfFalseOrPop));
    }

    #[test]
    fn or_short_circuits_with_jump_if_true_or_pop() {
        let function = compile_ok("(or 1 2 3)");
        assert!(opcodes(&function).contains(&Opcode::JumpIfTrueOrPop));
    }

    #[test]
    fn quote_interns_a_pair_constant() {
        let function = compile_ok("(quote (1 2))");
        assert!(function.chunk.constants.iter().any(|c| matches!(c, Value::Pair(_))));
    }

    #[test]
    fn variadic_plus_with_no_args_is_zero() {
        let function = compile_ok("(+)");
        assert_eq!(function.chunk.constants[0], Value::Number(0.0));
    }

    #[test]
    fn variadic_times_with_no_args_is_one() {
        let function = compile_ok("(*)");
        assert_eq!(function.chunk.constants[0], Value::Number(1.0));
    }

    #[test]
    fn unary_minus_is_negation() {
        let function = compile_ok("(- 5)");
        assert_eq!(opcodes(&function), vec![Opcode::Constant, Opcode::Constant, Opcode::Sub, Opcode::Pop, Opcode::Halt]);
    }

    #[test]
    fn comparison_wrong_arity_is_a_compile_error() {
        let (_, errors) = compile(Source::source("(< 1 2 3)"));
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0].error, CompileError::ArityMismatch { .. }));
    }

    #[test]
    fn else_not_last_is_a_compile_error() {
        let (_, errors) = compile(Source::source("(cond (else 1) (#t 2))"));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].error, CompileError::ElseNotLast);
    }

    #[test]
    fn empty_cond_yields_nil() {
        let function = compile_ok("(cond)");
        assert_eq!(function.chunk.constants.last(), Some(&Value::Nil));
    }

    #[test]
    fn reserved_word_as_form_head_is_an_error() {
        let (_, errors) = compile(Source::source("(let ((x 1)) x)"));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn local_define_of_fresh_name_does_not_pop() {
        // (lambda () (define n 0) n) -- if the fresh local were popped
        // the final bare `n` would resolve as an undefined global.
        let function = compile_ok("(lambda () (define n 0) n)");
        let inner = function
            .chunk
            .constants
            .iter()
            .find_map(|c| if let Value::Function(f) = c { Some(f) } else { None })
            .expect("inner function constant");
        assert!(!opcodes(inner).contains(&Opcode::GetGlobal));
    }

    #[test]
    fn halt_is_always_emitted_even_with_errors() {
        let (function, errors) = compile(Source::source("(< 1)"));
        assert!(!errors.is_empty());
        assert_eq!(opcodes(&function).last(), Some(&Opcode::Halt));
    }

    mod props {
        use proptest::prelude::*;

        use super::*;

        fn jumpy_leaf(n: u32) -> impl Strategy<Value = String> {
            prop_oneof![
                Just("1".to_string()),
                Just("(+ 1 n)".replace('n', &n.to_string())),
            ]
        }

        fn jumpy_form() -> impl Strategy<Value = String> {
            let leaf = jumpy_leaf(2).boxed();
            leaf.prop_recursive(4, 32, 4, |inner| {
                prop_oneof![
                    (inner.clone(), inner.clone(), inner.clone())
                        .prop_map(|(c, t, e)| format!("(if {} {} {})", c, t, e)),
                    prop::collection::vec(inner.clone(), 1..4)
                        .prop_map(|clauses| {
                            let body = clauses
                                .iter()
                                .map(|c| format!("({} {})", c, c))
                                .collect::<Vec<_>>()
                                .join(" ");
                            format!("(cond {})", body)
                        }),
                    prop::collection::vec(inner.clone(), 0..4)
                        .prop_map(|xs| format!("(and {})", xs.join(" "))),
                    prop::collection::vec(inner, 0..4)
                        .prop_map(|xs| format!("(or {})", xs.join(" "))),
                ]
            })
        }

        // Every jump instruction's operand must land on a valid
        // instruction index within the same chunk, no matter how deeply
        // `if`/`cond`/`and`/`or` are nested into one another.
        proptest! {
            #[test]
            fn jump_targets_stay_in_bounds(src in jumpy_form()) {
                let (function, errors) = compile(Source::source(&src));
                prop_assert!(errors.is_empty(), "unexpected errors compiling {}: {:?}", src, errors);
                let len = function.chunk.instructions.len();
                for instr in &function.chunk.instructions {
                    if matches!(
                        instr.opcode,
                        Opcode::Jump
                            | Opcode::JumpIfFalse
                            | Opcode::JumpIfFalseOrPop
                            | Opcode::JumpIfTrueOrPop
                    ) {
                        prop_assert!((instr.operand as usize) < len);
                    }
                }
            }
        }
    }
}
