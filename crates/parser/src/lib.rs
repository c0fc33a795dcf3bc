//! Go front end for gomorph.
//!
//! - Lexer uses Logos and implements Go semicolon insertion.
//! - A recursive-descent parser builds an arena AST whose ids double as
//!   parent links, so rewriting a node in place rewires every reference.
//! - `printer` renders the AST back to gofmt-shaped source.
//! - `check` is a package-level type checker producing per-file facts.
//! - `cursor` walks expressions mutably with parent and slot information.

pub mod ast;
pub mod check;
pub mod cursor;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod parser_support;
pub mod position;
pub mod printer;
pub mod walk;

// Re-exports for convenience
pub use check::{check_file, check_package, TypeInfo};
pub use cursor::{walk_exprs, walk_stmt_exprs, Cursor, Flow, Slot};
pub use error::{Diag, ParseFailure};
pub use lexer::Lexer;
pub use parser::{parse_file, parse_str};
pub use position::{FileId, FileSet, Position};
pub use printer::{print_expr, print_file, print_stmt, print_type};
