//! # wdlfront
//!
//! Front-end for the Workflow Description Language (WDL): a multi-version
//! parser (draft-2, 1.0, 2.0), a type checker, and an expression/declaration
//! evaluator.
//!
//! The pipeline is `source text -> CST -> AST -> typed AST -> values`:
//! [`parser::parse_document`] builds a concrete syntax tree for the detected
//! language version, [`tree::lower`] flattens it into the version-neutral AST,
//! [`tree::Document::typecheck`] annotates every expression with its inferred
//! type, and the evaluator turns typed expressions into runtime [`Value`]s and
//! materialized command strings.

pub mod env;
pub mod error;
pub mod expr;
pub mod loader;
pub mod parser;
pub mod source;
pub mod stdlib;
pub mod tree;
pub mod types;
pub mod value;

pub use env::{Binding, Bindings};
pub use error::{ErrorCollector, SourcePosition, WdlError};
pub use expr::{BinaryOperator, Expression, StringPart, UnaryOperator};
pub use loader::Loader;
pub use parser::Version;
pub use source::{FileSourceReader, SourceReader};
pub use stdlib::StdLib;
pub use tree::{
    Call, Conditional, Declaration, Document, Scatter, Task, Workflow, WorkflowElement,
};
pub use types::Type;
pub use value::Value;
