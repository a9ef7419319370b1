//! Events compiler parsers: math/string expressions and variable paths.
//!
//! Both parsers are event-driven: they report what they recognize to a
//! visitor instead of building a tree, and stop at the first error.

mod parse_expr;
mod parser;
mod variable;

pub use parse_expr::{CallArgument, Call, ExprEvent, ExpressionParser, ParsedExpression};
pub use parser::MAX_NESTING;
pub use variable::{write_path, ParsedPath, PathEvent, VariablePathParser};
