//! Concrete syntax tree.
//!
//! The CST mirrors the surface grammar of one document: every node carries
//! its span, string literals and command bodies keep their fragment
//! structure, placeholder options are still named options, and meta-section
//! values are still expressions. Version-specific productions (`Directory`,
//! `hints`, draft-2 bare declarations) appear only when the corresponding
//! version grammar emitted them. Lowering to the version-neutral AST lives
//! in [`crate::tree::lower`].

use super::Version;
use crate::error::SourcePosition;
use crate::expr::{BinaryOperator, UnaryOperator};
use crate::source::CommentMap;

/// A parsed document plus its comment map.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub pos: SourcePosition,
    pub version: Version,
    /// Span of the `version` directive; absent for draft-2 documents that
    /// omit it.
    pub version_pos: Option<SourcePosition>,
    pub imports: Vec<Import>,
    pub structs: Vec<StructDef>,
    pub tasks: Vec<Task>,
    pub workflow: Option<Workflow>,
    pub comments: CommentMap,
    pub uri: String,
    pub abspath: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Import {
    pub pos: SourcePosition,
    pub uri: String,
    pub namespace: Option<String>,
    /// `alias Old as New` pairs.
    pub aliases: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructDef {
    pub pos: SourcePosition,
    pub name: String,
    pub members: Vec<Decl>,
}

/// A type as written, before struct resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeExpr {
    pub pos: SourcePosition,
    pub kind: TypeExprKind,
    pub optional: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeExprKind {
    Boolean,
    Int,
    Float,
    String,
    File,
    /// WDL >= 2.0 only.
    Directory,
    Object,
    Array {
        item: Box<TypeExpr>,
        nonempty: bool,
    },
    Map {
        key: Box<TypeExpr>,
        value: Box<TypeExpr>,
    },
    Pair {
        left: Box<TypeExpr>,
        right: Box<TypeExpr>,
    },
    /// A struct name.
    Named(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Decl {
    pub pos: SourcePosition,
    pub decl_type: TypeExpr,
    pub name: String,
    pub expr: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub pos: SourcePosition,
    pub name: String,
    /// `input {}` section; `None` for draft-2 documents, whose inputs are
    /// the bare declarations before the command.
    pub inputs: Option<Vec<Decl>>,
    /// Declarations outside the input section.
    pub postinputs: Vec<Decl>,
    pub command: CommandSection,
    pub outputs: Vec<Decl>,
    pub runtime: Vec<(String, Expr)>,
    /// WDL >= 2.0 only.
    pub hints: Vec<(String, Expr)>,
    pub meta: Option<MetaSection>,
    pub parameter_meta: Option<MetaSection>,
}

/// Command body: ordered text fragments and placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandSection {
    pub pos: SourcePosition,
    pub parts: Vec<StringPiece>,
    pub heredoc: bool,
}

/// One fragment of an interpolated string or command body.
#[derive(Debug, Clone, PartialEq)]
pub enum StringPiece {
    Text { text: String, pos: SourcePosition },
    Placeholder(Placeholder),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Placeholder {
    pub pos: SourcePosition,
    /// `true=`/`false=`/`default=`/`sep=`, in written order.
    pub options: Vec<PlaceholderOption>,
    pub expr: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaceholderOption {
    pub pos: SourcePosition,
    pub name: String,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Workflow {
    pub pos: SourcePosition,
    pub name: String,
    pub inputs: Option<Vec<Decl>>,
    pub body: Vec<WorkflowNode>,
    pub outputs: Vec<Decl>,
    pub meta: Option<MetaSection>,
    pub parameter_meta: Option<MetaSection>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowNode {
    Decl(Decl),
    Call(Call),
    Scatter(Scatter),
    Conditional(Conditional),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub pos: SourcePosition,
    /// Possibly namespaced (`lib.align`).
    pub target: String,
    pub alias: Option<String>,
    /// `after` dependencies (WDL >= 2.0).
    pub afters: Vec<String>,
    pub inputs: Vec<(String, Expr)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scatter {
    pub pos: SourcePosition,
    pub variable: String,
    pub expr: Expr,
    pub body: Vec<WorkflowNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Conditional {
    pub pos: SourcePosition,
    pub expr: Expr,
    pub body: Vec<WorkflowNode>,
}

/// `meta` / `parameter_meta`. Values are parsed with the expression grammar
/// and restricted to literals during lowering.
#[derive(Debug, Clone, PartialEq)]
pub struct MetaSection {
    pub pos: SourcePosition,
    pub entries: Vec<(String, Expr)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub pos: SourcePosition,
    pub kind: ExprKind,
}

impl Expr {
    pub fn new(pos: SourcePosition, kind: ExprKind) -> Self {
        Self { pos, kind }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Boolean(bool),
    Int(i64),
    Float(f64),
    None,
    String {
        parts: Vec<StringPiece>,
    },
    Array(Vec<Expr>),
    Pair {
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Map {
        pairs: Vec<(Expr, Expr)>,
    },
    /// `object { ... }`, or `StructName { ... }` in WDL >= 2.0.
    Object {
        type_name: Option<String>,
        members: Vec<(String, Expr)>,
    },
    Ident(String),
    At {
        expr: Box<Expr>,
        index: Box<Expr>,
    },
    GetName {
        expr: Box<Expr>,
        field: String,
    },
    Apply {
        name: String,
        args: Vec<Expr>,
    },
    IfThenElse {
        condition: Box<Expr>,
        when_true: Box<Expr>,
        when_false: Box<Expr>,
    },
    Unary {
        op: UnaryOperator,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOperator,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}
