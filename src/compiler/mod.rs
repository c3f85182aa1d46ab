// Each step in the compiler pipeline turns one datatype into another,
// all in a single pass -- there is no separate intermediate tree
// between parsing and bytecode:
// ~> Source (string)
// -> Tokens          : lex.rs
// -> AST             : parse.rs
// -> Bytecode        : emit.rs, using scope.rs to resolve names
// ~> Run (result)    : vm

pub mod token;
pub mod ast;
pub mod lex;
pub mod parse;
pub mod scope;
pub mod emit;
