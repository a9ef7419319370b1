//! Expression lexer: source text to tokens, plus the balanced scanner
//! shared by the expression and variable-path parsers.

pub mod lexer;
pub mod scan;
pub mod token;

pub use lexer::Lexer;
pub use scan::{find_closing_bracket, scan_arguments, ArgumentList};
pub use token::{Token, TokenKind};
