//! Error types and source position tracking.
//!
//! Every diagnostic the front-end produces is a [`WdlError`]. Syntax and
//! import errors are fatal for the document; type errors accumulate through
//! an [`ErrorCollector`] so one checking pass can report many diagnostics;
//! evaluation errors abort the current evaluation only.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Source span carried by every syntactic element and most errors.
///
/// Lines and columns are 1-based; end columns are exclusive. `uri` is the
/// name the document was loaded or imported under (possibly relative) and
/// `abspath` the canonicalized form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourcePosition {
    pub uri: String,
    pub abspath: String,
    pub line: u32,
    pub column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl SourcePosition {
    pub fn new(
        uri: String,
        abspath: String,
        line: u32,
        column: u32,
        end_line: u32,
        end_column: u32,
    ) -> Self {
        Self {
            uri,
            abspath,
            line,
            column,
            end_line,
            end_column,
        }
    }

    /// A placeholder position for errors raised outside any document.
    pub fn unknown() -> Self {
        Self::new(String::new(), String::new(), 0, 0, 0, 0)
    }
}

/// All errors produced by parsing, checking, and evaluating WDL.
#[derive(Error, Debug)]
pub enum WdlError {
    /// Tokenization or grammar violation. Fatal for the document.
    #[error("syntax error: {message}")]
    Syntax {
        pos: SourcePosition,
        message: String,
        wdl_version: String,
    },

    /// Unresolved or cyclic import. Fatal.
    #[error("import error: {message}")]
    Import {
        pos: SourcePosition,
        message: String,
        #[source]
        cause: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// General static-checking failure (accumulated, not fatal per occurrence).
    #[error("validation error: {message}")]
    Validation { pos: SourcePosition, message: String },

    /// Expression type does not coerce to the required type.
    #[error("expected {expected} instead of {actual}")]
    StaticTypeMismatch {
        pos: SourcePosition,
        expected: String,
        actual: String,
        message: String,
    },

    /// Identifier not bound in the scope chain.
    #[error("unknown identifier {name}")]
    UnknownIdentifier { pos: SourcePosition, name: String },

    /// No stdlib function of this name.
    #[error("no such function: {name}")]
    NoSuchFunction { pos: SourcePosition, name: String },

    /// No overload of a stdlib function accepts the argument types.
    #[error("{function} cannot be applied to ({actual})")]
    NoSuchOverload {
        pos: SourcePosition,
        function: String,
        actual: String,
    },

    /// Wrong number of arguments to a stdlib function.
    #[error("{function} expects {expected} argument(s)")]
    WrongArity {
        pos: SourcePosition,
        function: String,
        expected: usize,
    },

    /// Member access on a struct/object/call/pair that lacks the member.
    #[error("no such member '{member}'")]
    NoSuchMember { pos: SourcePosition, member: String },

    /// Call target is not a known task or workflow.
    #[error("no such task/workflow: {name}")]
    NoSuchTask { pos: SourcePosition, name: String },

    /// Call supplies an input the callee does not declare, or omits a
    /// required one.
    #[error("no such input {name}")]
    NoSuchInput { pos: SourcePosition, name: String },

    /// Redeclaration of a name visible in the current or an enclosing scope.
    #[error("multiple definitions: {message}")]
    MultipleDefinitions { pos: SourcePosition, message: String },

    /// Circular struct definitions or import cycles detected mid-resolution.
    #[error("circular dependencies involving {name}")]
    CircularDependencies { pos: SourcePosition, name: String },

    /// Several validation errors reported together, sorted by position.
    #[error("{count} validation errors")]
    MultipleValidation {
        exceptions: Vec<WdlError>,
        count: usize,
    },

    /// Failure while evaluating an expression or declaration.
    #[error("evaluation error: {message}")]
    Eval { pos: SourcePosition, message: String },

    /// Integer division or modulo by zero.
    #[error("division by zero")]
    DivisionByZero { pos: SourcePosition },

    /// Array index out of bounds.
    #[error("array index out of bounds")]
    OutOfBounds { pos: SourcePosition },

    /// Empty array bound to an `Array[T]+` declaration.
    #[error("empty array for Array+ declaration")]
    EmptyArray { pos: SourcePosition },

    /// Null encountered where a non-optional value is required.
    #[error("null value")]
    NullValue { pos: SourcePosition },

    /// Runtime failure inside a stdlib implementation (I/O, bad content).
    #[error("runtime error: {message}")]
    Runtime { message: String },

    /// Malformed input bindings supplied to the evaluator.
    #[error("input error: {message}")]
    Input { message: String },

    /// Invariant violation: a node or value that should not exist at this
    /// stage. Carries the unexpected kind for debugging. Fatal.
    #[error("internal error on {node_kind}: {message}")]
    Internal {
        pos: Option<SourcePosition>,
        node_kind: String,
        message: String,
    },
}

impl WdlError {
    /// The error kind tag used in the caller-facing envelope.
    pub fn kind(&self) -> &'static str {
        match self {
            WdlError::Syntax { .. } => "SyntaxError",
            WdlError::Import { .. } | WdlError::CircularDependencies { .. } => "ImportError",
            WdlError::Validation { .. }
            | WdlError::StaticTypeMismatch { .. }
            | WdlError::UnknownIdentifier { .. }
            | WdlError::NoSuchFunction { .. }
            | WdlError::NoSuchOverload { .. }
            | WdlError::WrongArity { .. }
            | WdlError::NoSuchMember { .. }
            | WdlError::NoSuchTask { .. }
            | WdlError::NoSuchInput { .. }
            | WdlError::MultipleDefinitions { .. }
            | WdlError::MultipleValidation { .. } => "TypeError",
            WdlError::Eval { .. }
            | WdlError::DivisionByZero { .. }
            | WdlError::OutOfBounds { .. }
            | WdlError::EmptyArray { .. }
            | WdlError::NullValue { .. }
            | WdlError::Runtime { .. }
            | WdlError::Input { .. } => "EvalError",
            WdlError::Internal { .. } => "InternalError",
        }
    }

    /// The offending span, when one is available.
    pub fn source_position(&self) -> Option<&SourcePosition> {
        match self {
            WdlError::Syntax { pos, .. }
            | WdlError::Import { pos, .. }
            | WdlError::Validation { pos, .. }
            | WdlError::StaticTypeMismatch { pos, .. }
            | WdlError::UnknownIdentifier { pos, .. }
            | WdlError::NoSuchFunction { pos, .. }
            | WdlError::NoSuchOverload { pos, .. }
            | WdlError::WrongArity { pos, .. }
            | WdlError::NoSuchMember { pos, .. }
            | WdlError::NoSuchTask { pos, .. }
            | WdlError::NoSuchInput { pos, .. }
            | WdlError::MultipleDefinitions { pos, .. }
            | WdlError::CircularDependencies { pos, .. }
            | WdlError::Eval { pos, .. }
            | WdlError::DivisionByZero { pos }
            | WdlError::OutOfBounds { pos }
            | WdlError::EmptyArray { pos }
            | WdlError::NullValue { pos } => Some(pos),
            WdlError::Internal { pos, .. } => pos.as_ref(),
            _ => None,
        }
    }

    pub fn syntax(pos: SourcePosition, message: impl Into<String>, wdl_version: &str) -> Self {
        WdlError::Syntax {
            pos,
            message: message.into(),
            wdl_version: wdl_version.to_string(),
        }
    }

    pub fn import(pos: SourcePosition, uri: &str, detail: Option<String>) -> Self {
        let message = match detail {
            Some(d) => format!("failed to import {}: {}", uri, d),
            None => format!("failed to import {}", uri),
        };
        WdlError::Import {
            pos,
            message,
            cause: None,
        }
    }

    pub fn validation(pos: SourcePosition, message: impl Into<String>) -> Self {
        WdlError::Validation {
            pos,
            message: message.into(),
        }
    }

    /// A type mismatch with the hints the checker can offer.
    pub fn type_mismatch(pos: SourcePosition, expected: String, actual: String) -> Self {
        let mut message = format!("expected {} instead of {}", expected, actual);
        if expected == "Int" && actual == "Float" {
            message += "; perhaps try floor(), ceil(), or round()";
        } else if actual.trim_end_matches('?') == expected {
            message += "; to coerce T? into T, try select_first";
        }
        WdlError::StaticTypeMismatch {
            pos,
            expected,
            actual,
            message,
        }
    }

    pub fn eval(pos: SourcePosition, message: impl Into<String>) -> Self {
        WdlError::Eval {
            pos,
            message: message.into(),
        }
    }

    pub fn internal(pos: Option<SourcePosition>, node_kind: &str, message: impl Into<String>) -> Self {
        WdlError::Internal {
            pos,
            node_kind: node_kind.to_string(),
            message: message.into(),
        }
    }

    /// Combine accumulated validation errors, sorted by source position.
    pub fn multiple_validation(mut exceptions: Vec<WdlError>) -> Self {
        exceptions.sort_by(|a, b| match (a.source_position(), b.source_position()) {
            (Some(pa), Some(pb)) => pa.cmp(pb),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
        let count = exceptions.len();
        WdlError::MultipleValidation { exceptions, count }
    }
}

/// Caller-facing error envelope: `{ kind, span?, message, sourceUri }`.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelope {
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<SourcePosition>,
    pub message: String,
    pub source_uri: String,
}

impl From<&WdlError> for ErrorEnvelope {
    fn from(err: &WdlError) -> Self {
        let span = err.source_position().cloned();
        let source_uri = span.as_ref().map(|p| p.uri.clone()).unwrap_or_default();
        ErrorEnvelope {
            kind: err.kind(),
            span,
            message: err.to_string(),
            source_uri,
        }
    }
}

/// Collects validation errors so checking can continue past the first
/// failure and report every diagnostic in one pass.
#[derive(Default)]
pub struct ErrorCollector {
    exceptions: Vec<WdlError>,
}

impl ErrorCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run a fallible step, capturing its error. Returns the result on
    /// success, `None` if an error was captured.
    pub fn try_with<T, F>(&mut self, f: F) -> Option<T>
    where
        F: FnOnce() -> Result<T, WdlError>,
    {
        match f() {
            Ok(value) => Some(value),
            Err(error) => {
                self.append(error);
                None
            }
        }
    }

    pub fn append(&mut self, error: WdlError) {
        match error {
            WdlError::MultipleValidation { exceptions, .. } => self.exceptions.extend(exceptions),
            other => self.exceptions.push(other),
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.exceptions.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.exceptions.len()
    }

    /// Raise the collected errors, if any.
    pub fn finish(self) -> Result<(), WdlError> {
        match self.exceptions.len() {
            0 => Ok(()),
            1 => Err(self.exceptions.into_iter().next().unwrap()),
            _ => Err(WdlError::multiple_validation(self.exceptions)),
        }
    }
}

/// Trait for nodes that carry a source position.
pub trait HasSourcePosition {
    fn source_position(&self) -> &SourcePosition;
}
