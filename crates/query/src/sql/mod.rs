//! SQL statement generation.
//!
//! - [`StatementCompiler`] - turns a criteria set into listing and deletion statements
//! - [`Statement`] - statement text with positional parameters
//! - [`PlaceholderStyle`] - driver placeholder conventions for [`Statement::rebind`]

mod compiler;
mod statement;

pub use compiler::StatementCompiler;
pub use statement::{PLACEHOLDER, PlaceholderStyle, SqlFragment, Statement};
