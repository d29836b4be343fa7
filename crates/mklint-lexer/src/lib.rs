//! mklint lexer: logical lines and variable references.

pub mod lexer;
pub mod lines;
pub mod token;

pub use lexer::{parse_name_with_mods, parse_varref, tokenize};
pub use lines::{AssignOp, Assignment, Directive, Include, LineKind, MkLine, MkLines};
pub use token::{Token, Tokens};
