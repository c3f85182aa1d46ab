//! The parse tree the parser builds straight from tokens: every form
//! is an S-expression, so the tree is shaped like the data it would
//! produce if `quote`d -- a chain of cons cells terminated by `Nil`,
//! with atoms at the leaves. There is no separate "list of forms"
//! variant; a parenthesized form IS a `List` chain.

use crate::common::span::Spanned;
use crate::compiler::token::Token;

#[derive(Debug, Clone, PartialEq)]
pub enum Ast {
    Atom(Token),
    /// `car` . `cdr`, exactly like a runtime pair. A proper list ends
    /// its chain in `Nil`; a dotted pair ends it in another `Atom`.
    List(Box<Spanned<Ast>>, Box<Spanned<Ast>>),
    Nil,
}

impl Ast {
    pub fn cons(car: Spanned<Ast>, cdr: Spanned<Ast>) -> Ast {
        Ast::List(Box::new(car), Box::new(cdr))
    }

    /// Walks a proper-list chain into a `Vec` of its elements. Returns
    /// `None` if the chain is dotted (its tail is neither `Nil` nor
    /// another `List`).
    pub fn elements(&self) -> Option<Vec<&Spanned<Ast>>> {
        let mut items = Vec::new();
        let mut current = self;
        loop {
            match current {
                Ast::Nil => return Some(items),
                Ast::List(car, cdr) => {
                    items.push(car.as_ref());
                    current = &cdr.item;
                }
                Ast::Atom(_) => return None,
            }
        }
    }
}
