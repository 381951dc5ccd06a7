//! Tasklang – typed syntax trees for a small task-description language
//!
//! Source text is read into generic s-expression data ([`Value`]) and then
//! transformed into an [`AstNode`] tree:
//! - Special forms (`def`, `let`, `if`, `fn`, `do`, `parallel`, `join`,
//!   `log-step`) are recognised by their leading symbol and shape-checked
//! - Other lists become generic calls; vectors and plain maps stay literal
//! - Maps with `:id` and `:plan` become [`Task`]s whose plan is fully parsed
//! - Failures are structured [`ParseError`]s carrying the offending fragment
//!
//! Type checking, execution and capability enforcement consume these trees
//! and live elsewhere.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

/// AST node definitions and constructors.
pub mod ast;
/// Output configuration.
pub mod config;
/// Reader, transform and top-level error types.
pub mod error;
/// Generic value to AST transformer and string/file entry points.
pub mod parser;
/// S-expression reader.
pub mod reader;
/// Rendering of trees and values.
pub mod render;
/// Generic nested data model.
pub mod value;

pub use ast::{
    AstNode, DefExpr, FnExpr, IfExpr, JoinExpr, LetBinding, LetExpr, LogEntry, LogStepExpr,
    Opaque, ParallelBinding, ParallelExpr, SpecialForm, Symbol, Task,
};
pub use config::{OutputConfig, OutputFormat};
pub use error::{Error, ParseError, ParseErrorKind, ReadError, Result};
pub use parser::{
    ParseResult, is_task_map, parse_all, parse_file, parse_log_entry, parse_str,
    task_log_entries, transform,
};
pub use render::{render, render_value};
pub use value::{Value, ValueMap};

/// Current version of the tasklang crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
