//! Owns the text of a program along with the path it came from.
//! A `Source` is shared (via `Rc`) by every `Span` that points into it,
//! so spans stay cheap to clone while still being able to print the
//! line of code they refer to.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// A single unit of source code, either loaded from a file or built
/// in-memory (e.g. for tests or a future REPL).
#[derive(Debug, Eq, PartialEq)]
pub struct Source {
    pub path: Option<PathBuf>,
    pub contents: String,
}

impl Source {
    /// Reads a file from disk into a `Source`.
    pub fn path<P: AsRef<Path>>(path: P) -> Result<Rc<Source>, std::io::Error> {
        let contents = fs::read_to_string(&path)?;
        Ok(Rc::new(Source { path: Some(path.as_ref().to_path_buf()), contents }))
    }

    /// Wraps a raw string as an anonymous `Source`, for tests and embedding.
    pub fn source(contents: &str) -> Rc<Source> {
        Rc::new(Source { path: None, contents: contents.to_string() })
    }

    /// The name used when rendering diagnostics: the path if there is one,
    /// else a placeholder.
    pub fn name(&self) -> String {
        match &self.path {
            Some(p) => p.display().to_string(),
            None => "<anonymous>".to_string(),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A buffered character cursor over a `Source`'s contents, with one
/// character of unget and line/column tracking. This is the "character
/// source" the lexer is built on top of: all module-level lexer state
/// (position, line, column, the sticky error flag) lives here as a
/// single owned object threaded through the pipeline.
pub struct CharSource {
    pub source: Rc<Source>,
    chars: Vec<char>,
    offset: usize,
    line: usize,
    col: usize,
}

impl CharSource {
    pub fn new(source: Rc<Source>) -> CharSource {
        let chars = source.contents.chars().collect();
        CharSource { source, chars, offset: 0, line: 1, col: 1 }
    }

    /// Current line, 1-based.
    pub fn line(&self) -> usize { self.line }

    /// Current column, 1-based.
    pub fn col(&self) -> usize { self.col }

    /// Current byte/char offset into the source, used to build `Span`s.
    pub fn offset(&self) -> usize { self.offset }

    pub fn is_at_end(&self) -> bool { self.offset >= self.chars.len() }

    /// Look at the current character without consuming it.
    pub fn peek(&self) -> Option<char> {
        self.chars.get(self.offset).copied()
    }

    /// Look one character past the current one.
    pub fn peek_next(&self) -> Option<char> {
        self.chars.get(self.offset + 1).copied()
    }

    /// Consume and return the current character, advancing line/column.
    pub fn advance(&mut self) -> Option<char> {
        let c = self.chars.get(self.offset).copied()?;
        self.offset += 1;
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    /// Unget one character: rewinds the offset. Only ever called to undo
    /// the single lookahead character a lexer rule consumed to decide it
    /// didn't want it, so a naive line/column rewind (col -= 1, never
    /// crossing a line boundary) is sufficient in practice.
    pub fn unget(&mut self) {
        if self.offset > 0 {
            self.offset -= 1;
            if self.col > 1 {
                self.col -= 1;
            }
        }
    }
}
