//! The parser: a straightforward recursive-descent reader with one
//! token of lookahead, turning the flat token stream into the
//! S-expression `Ast`. `'expr` is desugared to `(quote expr)` right
//! here, since by the time the compiler sees the tree the two are
//! indistinguishable.

use crate::common::error::{CompileError, Diagnostic};
use crate::common::span::{Span, Spanned};
use crate::compiler::ast::Ast;
use crate::compiler::token::{Token, TokenKind};

pub fn parse(tokens: Vec<Spanned<Token>>) -> (Vec<Spanned<Ast>>, Vec<Diagnostic>) {
    let mut parser = Parser { tokens, index: 0, errors: Vec::new() };
    let mut forms = Vec::new();
    while !parser.at_eof() {
        match parser.expr() {
            Ok(form) => forms.push(form),
            Err(()) => parser.synchronize(),
        }
    }
    (forms, parser.errors)
}

struct Parser {
    tokens: Vec<Spanned<Token>>,
    index: usize,
    errors: Vec<Diagnostic>,
}

impl Parser {
    fn peek(&self) -> &Spanned<Token> {
        &self.tokens[self.index.min(self.tokens.len() - 1)]
    }

    fn at_eof(&self) -> bool {
        self.peek().item.kind == TokenKind::Eof
    }

    fn advance(&mut self) -> Spanned<Token> {
        let token = self.tokens[self.index.min(self.tokens.len() - 1)].clone();
        if self.index < self.tokens.len() - 1 {
            self.index += 1;
        }
        token
    }

    fn error(&mut self, error: CompileError) {
        self.errors.push(Diagnostic::new(error, self.peek().span.clone()));
    }

    /// Skips tokens until the next `(` or end of input, so one
    /// malformed form doesn't hide every error after it.
    fn synchronize(&mut self) {
        if self.at_eof() {
            return;
        }
        self.advance();
        while !self.at_eof() && self.peek().item.kind != TokenKind::LParen {
            self.advance();
        }
    }

    fn expr(&mut self) -> Result<Spanned<Ast>, ()> {
        match &self.peek().item.kind {
            TokenKind::LParen => self.list(),
            TokenKind::QuoteMark => self.quote_shortcut(),
            TokenKind::RParen => {
                self.error(CompileError::UnexpectedToken {
                    expected: "an expression".to_string(),
                    found: self.peek().item.kind.to_string(),
                });
                Err(())
            }
            TokenKind::Eof => {
                self.error(CompileError::UnexpectedEof);
                Err(())
            }
            _ => {
                let token = self.advance();
                Ok(Spanned::new(Ast::Atom(token.item), token.span))
            }
        }
    }

    fn quote_shortcut(&mut self) -> Result<Spanned<Ast>, ()> {
        let quote = self.advance();
        let quoted = self.expr()?;
        let span = Span::combine(&quote.span, &quoted.span);
        let quote_symbol = Spanned::new(
            Ast::Atom(Token::new(TokenKind::QuoteWord, "quote")),
            quote.span.clone(),
        );
        let tail = Spanned::new(Ast::cons(quoted, Spanned::new(Ast::Nil, Span::empty())), span.clone());
        Ok(Spanned::new(Ast::cons(quote_symbol, tail), span))
    }

    fn list(&mut self) -> Result<Spanned<Ast>, ()> {
        let open = self.advance(); // '('
        let mut elements = Vec::new();
        let mut tail = None;

        loop {
            match &self.peek().item.kind {
                TokenKind::RParen => break,
                TokenKind::Eof => {
                    self.error(CompileError::UnexpectedEof);
                    return Err(());
                }
                TokenKind::Dot => {
                    self.advance();
                    if elements.is_empty() {
                        self.error(CompileError::DottedPairMissingHead);
                        return Err(());
                    }
                    tail = Some(self.expr()?);
                    break;
                }
                _ => elements.push(self.expr()?),
            }
        }

        if self.peek().item.kind != TokenKind::RParen {
            self.error(CompileError::UnexpectedToken {
                expected: "')'".to_string(),
                found: self.peek().item.kind.to_string(),
            });
            return Err(());
        }
        let close = self.advance();
        let span = Span::combine(&open.span, &close.span);

        let mut result = tail.unwrap_or_else(|| Spanned::new(Ast::Nil, close.span.clone()));
        for element in elements.into_iter().rev() {
            let combined = Span::combine(&element.span, &result.span);
            result = Spanned::new(Ast::cons(element, result), combined);
        }
        Ok(Spanned::new(result.item, span))
    }
}
