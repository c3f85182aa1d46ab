//! Turns a `Source` into a flat `Vec<Spanned<Token>>`. The lexer is a
//! single forward pass over a `CharSource`: no backtracking, one
//! character of pushback for the handful of rules that need to peek
//! past a digit or a sign.

use std::rc::Rc;

use crate::common::error::{CompileError, Diagnostic};
use crate::common::source::{CharSource, Source};
use crate::common::span::{Span, Spanned};
use crate::compiler::token::{keyword, Token, TokenKind};

pub fn lex(source: Rc<Source>) -> (Vec<Spanned<Token>>, Vec<Diagnostic>) {
    let mut lexer = Lexer { chars: CharSource::new(source), errors: Vec::new() };
    let mut tokens = Vec::new();
    loop {
        lexer.skip_trivia();
        let start = lexer.chars.offset();
        match lexer.next_token(start) {
            Some(token) => {
                let span = Span::new(&lexer.chars.source, start, lexer.chars.offset() - start);
                let eof = token.kind == TokenKind::Eof;
                tokens.push(Spanned::new(token, span));
                if eof {
                    break;
                }
            }
            None => {
                // an error was recorded and at least one char was consumed
                // by the failing rule, so the loop always makes progress.
                if lexer.chars.is_at_end() {
                    let span = Span::new(&lexer.chars.source, lexer.chars.offset(), 0);
                    tokens.push(Spanned::new(Token::new(TokenKind::Eof, ""), span));
                    break;
                }
            }
        }
    }
    (tokens, lexer.errors)
}

struct Lexer {
    chars: CharSource,
    errors: Vec<Diagnostic>,
}

impl Lexer {
    fn skip_trivia(&mut self) {
        loop {
            match self.chars.peek() {
                Some(c) if c.is_whitespace() => { self.chars.advance(); }
                Some(';') => {
                    while let Some(c) = self.chars.peek() {
                        if c == '\n' { break; }
                        self.chars.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn error(&mut self, error: CompileError, start: usize) {
        let span = Span::new(&self.chars.source, start, (self.chars.offset() - start).max(1));
        self.errors.push(Diagnostic::new(error, span));
    }

    fn next_token(&mut self, start: usize) -> Option<Token> {
        let c = match self.chars.peek() {
            None => return Some(Token::new(TokenKind::Eof, "")),
            Some(c) => c,
        };

        match c {
            '(' => { self.chars.advance(); Some(Token::new(TokenKind::LParen, "(")) }
            ')' => { self.chars.advance(); Some(Token::new(TokenKind::RParen, ")")) }
            '.' if !Self::starts_number(self.chars.peek_next()) => {
                self.chars.advance();
                Some(Token::new(TokenKind::Dot, "."))
            }
            '\'' => { self.chars.advance(); Some(Token::new(TokenKind::QuoteMark, "'")) }
            '`' => { self.chars.advance(); Some(Token::new(TokenKind::Backquote, "`")) }
            ',' => { self.chars.advance(); Some(Token::new(TokenKind::Comma, ",")) }
            '"' => self.string(start),
            '#' => self.hash_literal(start),
            c if c == '-' || c == '+' || c.is_ascii_digit() => self.number_or_identifier(start),
            _ => self.identifier(start),
        }
    }

    fn starts_number(c: Option<char>) -> bool {
        matches!(c, Some(c) if c.is_ascii_digit())
    }

    fn string(&mut self, start: usize) -> Option<Token> {
        self.chars.advance(); // opening quote
        let mut value = String::new();
        loop {
            match self.chars.advance() {
                None => {
                    self.error(CompileError::UnterminatedString, start);
                    return None;
                }
                Some('"') => return Some(Token::new(TokenKind::Str(value.clone()), value)),
                Some('\\') => match self.chars.advance() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some('"') => value.push('"'),
                    Some('\\') => value.push('\\'),
                    Some(other) => value.push(other),
                    None => {
                        self.error(CompileError::UnterminatedString, start);
                        return None;
                    }
                },
                Some(c) => value.push(c),
            }
        }
    }

    fn hash_literal(&mut self, start: usize) -> Option<Token> {
        self.chars.advance(); // '#'
        match self.chars.peek() {
            Some('t') => { self.chars.advance(); Some(Token::new(TokenKind::True, "#t")) }
            Some('f') => { self.chars.advance(); Some(Token::new(TokenKind::False, "#f")) }
            Some(c) => {
                self.chars.advance();
                self.error(CompileError::UnknownCharacter(c), start);
                None
            }
            None => {
                self.error(CompileError::UnexpectedEof, start);
                None
            }
        }
    }

    fn number_or_identifier(&mut self, start: usize) -> Option<Token> {
        let sign = matches!(self.chars.peek(), Some('-') | Some('+'));
        if sign && !Self::starts_number(self.chars.peek_next()) {
            return self.identifier(start);
        }

        let mut lexeme = String::new();
        if sign {
            lexeme.push(self.chars.advance().unwrap());
        }
        while let Some(c) = self.chars.peek() {
            if c.is_ascii_digit() {
                lexeme.push(c);
                self.chars.advance();
            } else {
                break;
            }
        }
        if self.chars.peek() == Some('.') && Self::starts_number(self.chars.peek_next()) {
            lexeme.push(self.chars.advance().unwrap());
            while let Some(c) = self.chars.peek() {
                if c.is_ascii_digit() {
                    lexeme.push(c);
                    self.chars.advance();
                } else {
                    break;
                }
            }
        }

        match lexeme.parse::<f64>() {
            Ok(n) => Some(Token::new(TokenKind::Number(n), lexeme)),
            Err(_) => {
                self.error(CompileError::MalformedForm("number literal".to_string()), start);
                None
            }
        }
    }

    fn identifier(&mut self, start: usize) -> Option<Token> {
        let mut lexeme = String::new();
        while let Some(c) = self.chars.peek() {
            if is_delimiter(c) {
                break;
            }
            lexeme.push(c);
            self.chars.advance();
        }
        if lexeme.is_empty() {
            let c = self.chars.advance().unwrap();
            self.error(CompileError::UnknownCharacter(c), start);
            return None;
        }
        let kind = keyword(&lexeme).unwrap_or_else(|| TokenKind::Identifier(lexeme.clone()));
        Some(Token::new(kind, lexeme))
    }
}

fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || matches!(c, '(' | ')' | '\'' | '`' | ',' | ';' | '"')
}

#[cfg(test)]
mod test {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let (tokens, errors) = lex(Source::source(src));
        assert!(errors.is_empty(), "unexpected lex errors: {:?}", errors);
        tokens.into_iter().map(|t| t.item.kind).collect()
    }

    #[test]
    fn lex_empty() {
        assert_eq!(kinds(""), vec![TokenKind::Eof]);
    }

    #[test]
    fn lex_parens_and_atoms() {
        assert_eq!(
            kinds("(+ 1 2)"),
            vec![
                TokenKind::LParen,
                TokenKind::Identifier("+".to_string()),
                TokenKind::Number(1.0),
                TokenKind::Number(2.0),
                TokenKind::RParen,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lex_negative_number_vs_minus() {
        assert_eq!(kinds("-5"), vec![TokenKind::Number(-5.0), TokenKind::Eof]);
        assert_eq!(
            kinds("(- 5)"),
            vec![
                TokenKind::LParen,
                TokenKind::Identifier("-".to_string()),
                TokenKind::Number(5.0),
                TokenKind::RParen,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lex_booleans_and_keywords() {
        assert_eq!(
            kinds("(if #t 1 #f)"),
            vec![
                TokenKind::LParen,
                TokenKind::If,
                TokenKind::True,
                TokenKind::Number(1.0),
                TokenKind::False,
                TokenKind::RParen,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lex_string_with_escapes() {
        assert_eq!(
            kinds(r#""a\nb""#),
            vec![TokenKind::Str("a\nb".to_string()), TokenKind::Eof]
        );
    }

    #[test]
    fn lex_quote_shortcut() {
        assert_eq!(
            kinds("'x"),
            vec![TokenKind::QuoteMark, TokenKind::Identifier("x".to_string()), TokenKind::Eof]
        );
    }

    #[test]
    fn lex_comment_is_skipped() {
        assert_eq!(kinds("; hello\n42"), vec![TokenKind::Number(42.0), TokenKind::Eof]);
    }

    #[test]
    fn unterminated_string_reports_error() {
        let (_, errors) = lex(Source::source("\"abc"));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].error, CompileError::UnterminatedString);
    }

    #[test]
    fn dotted_pair_dot_is_its_own_token() {
        assert_eq!(
            kinds("(a . b)"),
            vec![
                TokenKind::LParen,
                TokenKind::Identifier("a".to_string()),
                TokenKind::Dot,
                TokenKind::Identifier("b".to_string()),
                TokenKind::RParen,
                TokenKind::Eof,
            ]
        );
    }

    mod props {
        use proptest::prelude::*;

        use super::*;

        proptest! {
            #[test]
            fn doesnt_crash(s in "\\PC*") {
                let (_, _) = lex(Source::source(&s));
            }

            #[test]
            fn always_ends_in_a_single_eof(s in "\\PC*") {
                let (tokens, _) = lex(Source::source(&s));
                prop_assert!(tokens.last().map_or(false, |t| t.item.kind == TokenKind::Eof));
                prop_assert_eq!(
                    tokens.iter().filter(|t| t.item.kind == TokenKind::Eof).count(),
                    1
                );
            }

            #[test]
            fn balanced_parens_lex_without_error(depth in 0usize..20) {
                let src = "(".repeat(depth) + &")".repeat(depth);
                let (_, errors) = lex(Source::source(&src));
                prop_assert!(errors.is_empty());
            }
        }
    }
}
