//! mklint parser: turns the text of conditional directives into condition trees.

mod parser;

pub use parser::{parse_condition, CondParser, ParseFailure};
