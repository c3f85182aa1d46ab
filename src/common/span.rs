//! `Span` refers to a section of a `Source`, much like a `&str` but
//! carrying a reference to the `Source` it came from rather than the
//! bytes themselves, so it can be used for error reporting without
//! fighting the borrow checker.

use std::fmt::{Display, Formatter, Result};
use std::rc::Rc;

use crate::common::source::Source;

/// A region of a `Source`, given as a byte offset and a length.
/// Every token and AST node carries one of these.
#[derive(Debug, Clone)]
pub struct Span {
    source: Option<Rc<Source>>,
    offset: usize,
    length: usize,
}

impl PartialEq for Span {
    fn eq(&self, other: &Span) -> bool {
        self.offset == other.offset
            && self.length == other.length
            && match (&self.source, &other.source) {
                (Some(a), Some(b)) => Rc::ptr_eq(a, b),
                (None, None) => true,
                _ => false,
            }
    }
}
impl Eq for Span {}

impl Span {
    pub fn new(source: &Rc<Source>, offset: usize, length: usize) -> Span {
        Span { source: Some(Rc::clone(source)), offset, length }
    }

    /// A `Span` that points at a single character.
    pub fn point(source: &Rc<Source>, offset: usize) -> Span {
        Span { source: Some(Rc::clone(source)), offset, length: 1 }
    }

    /// An empty span with no source; combining it with anything yields
    /// the other span untouched.
    pub fn empty() -> Span {
        Span { source: None, offset: 0, length: 0 }
    }

    pub fn is_empty(&self) -> bool { self.source.is_none() }

    /// The smallest span that covers both `a` and `b`.
    pub fn combine(a: &Span, b: &Span) -> Span {
        if a.is_empty() { return b.clone(); }
        if b.is_empty() { return a.clone(); }

        if a.source != b.source {
            panic!("can't combine two spans with different sources");
        }

        let offset = a.offset.min(b.offset);
        let end = (a.offset + a.length).max(b.offset + b.length);
        Span::new(a.source.as_ref().unwrap(), offset, end - offset)
    }

    /// Folds `combine` over a list of spans, in source order.
    pub fn join(spans: &[Span]) -> Span {
        let mut iter = spans.iter();
        let first = match iter.next() {
            Some(s) => s.clone(),
            None => return Span::empty(),
        };
        iter.fold(first, |acc, s| Span::combine(&acc, s))
    }

    pub fn contents(&self) -> String {
        if self.is_empty() {
            return String::new();
        }
        let contents = &self.source.as_ref().unwrap().contents;
        contents.chars().skip(self.offset).take(self.length).collect()
    }

    /// 1-based (line, column) of the first character of this span.
    pub fn start_line_col(&self) -> (usize, usize) {
        if self.is_empty() {
            return (1, 1);
        }
        let contents = &self.source.as_ref().unwrap().contents;
        let mut line = 1;
        let mut col = 1;
        for c in contents.chars().take(self.offset) {
            if c == '\n' {
                line += 1;
                col = 1;
            } else {
                col += 1;
            }
        }
        (line, col)
    }

    /// The full text of the line the span starts on, if the span has a
    /// source, used to print the caret diagnostic.
    pub fn source_line(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        let (line, _) = self.start_line_col();
        self.source.as_ref().unwrap().contents.lines().nth(line - 1).map(str::to_string)
    }

    pub fn source_name(&self) -> String {
        match &self.source {
            Some(s) => s.name(),
            None => "<anonymous>".to_string(),
        }
    }
}

impl Display for Span {
    /// Renders the `<file>:<line>:<col>` location plus the source line
    /// and a caret underneath the offending text.
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        if self.is_empty() {
            return write!(f, "<unknown location>");
        }
        let (line, col) = self.start_line_col();
        writeln!(f, "{}:{}:{}", self.source_name(), line, col)?;
        if let Some(text) = self.source_line() {
            writeln!(f, "{}", text)?;
            let caret_len = self.length.max(1);
            write!(f, "{}{}", " ".repeat(col - 1), "^".repeat(caret_len))?;
        }
        Ok(())
    }
}

/// Wraps a value with the `Span` it was parsed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spanned<T> {
    pub item: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(item: T, span: Span) -> Spanned<T> {
        Spanned { item, span }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn combination() {
        let source = Source::source("heck, that's awesome");
        let a = Span::new(&source, 0, 5);
        let b = Span::new(&source, 11, 2);
        assert_eq!(Span::combine(&a, &b), Span::new(&source, 0, 13));
    }

    #[test]
    fn join_spans() {
        let source = Source::source("hello, this is some text!");
        let spans = vec![
            Span::new(&source, 0, 8),
            Span::new(&source, 7, 5),
            Span::new(&source, 12, 4),
        ];
        let result = Span::new(&source, 0, 16);
        assert_eq!(Span::join(&spans).contents(), result.contents());
    }

    #[test]
    fn line_col() {
        let source = Source::source("first\nsecond\nthird");
        let span = Span::new(&source, 6, 6);
        assert_eq!(span.start_line_col(), (2, 1));
        assert_eq!(span.source_line(), Some("second".to_string()));
    }
}
