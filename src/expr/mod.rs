//! WDL expressions: literals, collections, arithmetic, comparisons,
//! conditionals, string interpolation, placeholders, and stdlib calls.
//!
//! [`Expression`] is the version-neutral AST node. After type checking,
//! every node carries its inferred type, every `Apply` carries the resolved
//! stdlib prototype, and implicit coercions appear as explicit
//! [`Expression::Coerce`] wrappers, so downstream consumers never re-derive
//! typing decisions.

use crate::error::{HasSourcePosition, SourcePosition};
use crate::stdlib::FunctionSignature;
use crate::types::Type;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod eval;
pub mod typecheck;

/// One fragment of an interpolated string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StringPart {
    Text(String),
    Placeholder(Box<Expression>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    And,
    Or,
}

impl BinaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::Less => "<",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::Greater => ">",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::And => "&&",
            BinaryOperator::Or => "||",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOperator {
    Not,
    Negate,
}

/// A WDL expression AST node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    Boolean {
        pos: SourcePosition,
        value: bool,
        inferred_type: Option<Type>,
    },

    Int {
        pos: SourcePosition,
        value: i64,
        inferred_type: Option<Type>,
    },

    Float {
        pos: SourcePosition,
        value: f64,
        inferred_type: Option<Type>,
    },

    /// `None`.
    Null {
        pos: SourcePosition,
        inferred_type: Option<Type>,
    },

    /// String literal; a literal without interpolation is a single `Text`
    /// part.
    String {
        pos: SourcePosition,
        parts: Vec<StringPart>,
        inferred_type: Option<Type>,
    },

    Array {
        pos: SourcePosition,
        items: Vec<Expression>,
        inferred_type: Option<Type>,
    },

    Pair {
        pos: SourcePosition,
        left: Box<Expression>,
        right: Box<Expression>,
        inferred_type: Option<Type>,
    },

    Map {
        pos: SourcePosition,
        pairs: Vec<(Expression, Expression)>,
        inferred_type: Option<Type>,
    },

    /// `object { ... }` literal, or a struct literal when `type_name` is
    /// present (WDL >= 2.0).
    Object {
        pos: SourcePosition,
        type_name: Option<String>,
        members: Vec<(String, Expression)>,
        inferred_type: Option<Type>,
    },

    Ident {
        pos: SourcePosition,
        name: String,
        inferred_type: Option<Type>,
    },

    /// Index access `expr[index]`.
    At {
        pos: SourcePosition,
        expr: Box<Expression>,
        index: Box<Expression>,
        inferred_type: Option<Type>,
    },

    /// Member access `expr.field` on structs, objects, call outputs, and
    /// pairs.
    GetName {
        pos: SourcePosition,
        expr: Box<Expression>,
        field: String,
        inferred_type: Option<Type>,
    },

    IfThenElse {
        pos: SourcePosition,
        condition: Box<Expression>,
        true_expr: Box<Expression>,
        false_expr: Box<Expression>,
        inferred_type: Option<Type>,
    },

    /// Stdlib call; `prototype` is filled by the checker with the resolved
    /// overload.
    Apply {
        pos: SourcePosition,
        function_name: String,
        arguments: Vec<Expression>,
        prototype: Option<FunctionSignature>,
        inferred_type: Option<Type>,
    },

    BinaryOp {
        pos: SourcePosition,
        op: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
        inferred_type: Option<Type>,
    },

    UnaryOp {
        pos: SourcePosition,
        op: UnaryOperator,
        operand: Box<Expression>,
        inferred_type: Option<Type>,
    },

    /// `~{true="y" false="n" cond}`: a Boolean condition choosing between
    /// two same-typed branches.
    PlaceholderTrueFalse {
        pos: SourcePosition,
        condition: Box<Expression>,
        when_true: Box<Expression>,
        when_false: Box<Expression>,
        inferred_type: Option<Type>,
    },

    /// `~{default="x" maybe}`: substitute the default when the optional
    /// value is null.
    PlaceholderDefault {
        pos: SourcePosition,
        default: Box<Expression>,
        value: Box<Expression>,
        inferred_type: Option<Type>,
    },

    /// `~{sep=", " xs}`: join a string-coercible array.
    PlaceholderSep {
        pos: SourcePosition,
        separator: Box<Expression>,
        array: Box<Expression>,
        inferred_type: Option<Type>,
    },

    /// An implicit coercion made explicit by the checker.
    Coerce {
        pos: SourcePosition,
        expr: Box<Expression>,
        target: Type,
    },
}

impl Expression {
    pub fn boolean(pos: SourcePosition, value: bool) -> Self {
        Expression::Boolean {
            pos,
            value,
            inferred_type: None,
        }
    }

    pub fn int(pos: SourcePosition, value: i64) -> Self {
        Expression::Int {
            pos,
            value,
            inferred_type: None,
        }
    }

    pub fn float(pos: SourcePosition, value: f64) -> Self {
        Expression::Float {
            pos,
            value,
            inferred_type: None,
        }
    }

    pub fn null(pos: SourcePosition) -> Self {
        Expression::Null {
            pos,
            inferred_type: None,
        }
    }

    pub fn string(pos: SourcePosition, parts: Vec<StringPart>) -> Self {
        Expression::String {
            pos,
            parts,
            inferred_type: None,
        }
    }

    pub fn string_literal(pos: SourcePosition, text: String) -> Self {
        Expression::string(pos, vec![StringPart::Text(text)])
    }

    pub fn array(pos: SourcePosition, items: Vec<Expression>) -> Self {
        Expression::Array {
            pos,
            items,
            inferred_type: None,
        }
    }

    pub fn pair(pos: SourcePosition, left: Expression, right: Expression) -> Self {
        Expression::Pair {
            pos,
            left: Box::new(left),
            right: Box::new(right),
            inferred_type: None,
        }
    }

    pub fn map(pos: SourcePosition, pairs: Vec<(Expression, Expression)>) -> Self {
        Expression::Map {
            pos,
            pairs,
            inferred_type: None,
        }
    }

    pub fn object(
        pos: SourcePosition,
        type_name: Option<String>,
        members: Vec<(String, Expression)>,
    ) -> Self {
        Expression::Object {
            pos,
            type_name,
            members,
            inferred_type: None,
        }
    }

    pub fn ident(pos: SourcePosition, name: String) -> Self {
        Expression::Ident {
            pos,
            name,
            inferred_type: None,
        }
    }

    pub fn at(pos: SourcePosition, expr: Expression, index: Expression) -> Self {
        Expression::At {
            pos,
            expr: Box::new(expr),
            index: Box::new(index),
            inferred_type: None,
        }
    }

    pub fn get_name(pos: SourcePosition, expr: Expression, field: String) -> Self {
        Expression::GetName {
            pos,
            expr: Box::new(expr),
            field,
            inferred_type: None,
        }
    }

    pub fn if_then_else(
        pos: SourcePosition,
        condition: Expression,
        true_expr: Expression,
        false_expr: Expression,
    ) -> Self {
        Expression::IfThenElse {
            pos,
            condition: Box::new(condition),
            true_expr: Box::new(true_expr),
            false_expr: Box::new(false_expr),
            inferred_type: None,
        }
    }

    pub fn apply(pos: SourcePosition, function_name: String, arguments: Vec<Expression>) -> Self {
        Expression::Apply {
            pos,
            function_name,
            arguments,
            prototype: None,
            inferred_type: None,
        }
    }

    pub fn binary_op(
        pos: SourcePosition,
        op: BinaryOperator,
        left: Expression,
        right: Expression,
    ) -> Self {
        Expression::BinaryOp {
            pos,
            op,
            left: Box::new(left),
            right: Box::new(right),
            inferred_type: None,
        }
    }

    pub fn unary_op(pos: SourcePosition, op: UnaryOperator, operand: Expression) -> Self {
        Expression::UnaryOp {
            pos,
            op,
            operand: Box::new(operand),
            inferred_type: None,
        }
    }

    /// Wrap with an explicit coercion when the target differs from the
    /// inferred type; identity coercions are not materialized.
    pub fn coerce_to(self, target: Type) -> Expression {
        if self.get_type() == Some(&target) {
            return self;
        }
        let pos = self.pos().clone();
        Expression::Coerce {
            pos,
            expr: Box::new(self),
            target,
        }
    }

    pub fn pos(&self) -> &SourcePosition {
        match self {
            Expression::Boolean { pos, .. }
            | Expression::Int { pos, .. }
            | Expression::Float { pos, .. }
            | Expression::Null { pos, .. }
            | Expression::String { pos, .. }
            | Expression::Array { pos, .. }
            | Expression::Pair { pos, .. }
            | Expression::Map { pos, .. }
            | Expression::Object { pos, .. }
            | Expression::Ident { pos, .. }
            | Expression::At { pos, .. }
            | Expression::GetName { pos, .. }
            | Expression::IfThenElse { pos, .. }
            | Expression::Apply { pos, .. }
            | Expression::BinaryOp { pos, .. }
            | Expression::UnaryOp { pos, .. }
            | Expression::PlaceholderTrueFalse { pos, .. }
            | Expression::PlaceholderDefault { pos, .. }
            | Expression::PlaceholderSep { pos, .. }
            | Expression::Coerce { pos, .. } => pos,
        }
    }

    /// The type inference stored on this node, if inference has run.
    pub fn get_type(&self) -> Option<&Type> {
        match self {
            Expression::Boolean { inferred_type, .. }
            | Expression::Int { inferred_type, .. }
            | Expression::Float { inferred_type, .. }
            | Expression::Null { inferred_type, .. }
            | Expression::String { inferred_type, .. }
            | Expression::Array { inferred_type, .. }
            | Expression::Pair { inferred_type, .. }
            | Expression::Map { inferred_type, .. }
            | Expression::Object { inferred_type, .. }
            | Expression::Ident { inferred_type, .. }
            | Expression::At { inferred_type, .. }
            | Expression::GetName { inferred_type, .. }
            | Expression::IfThenElse { inferred_type, .. }
            | Expression::Apply { inferred_type, .. }
            | Expression::BinaryOp { inferred_type, .. }
            | Expression::UnaryOp { inferred_type, .. }
            | Expression::PlaceholderTrueFalse { inferred_type, .. }
            | Expression::PlaceholderDefault { inferred_type, .. }
            | Expression::PlaceholderSep { inferred_type, .. } => inferred_type.as_ref(),
            Expression::Coerce { target, .. } => Some(target),
        }
    }

    pub(crate) fn set_type(&mut self, ty: Type) {
        match self {
            Expression::Boolean { inferred_type, .. }
            | Expression::Int { inferred_type, .. }
            | Expression::Float { inferred_type, .. }
            | Expression::Null { inferred_type, .. }
            | Expression::String { inferred_type, .. }
            | Expression::Array { inferred_type, .. }
            | Expression::Pair { inferred_type, .. }
            | Expression::Map { inferred_type, .. }
            | Expression::Object { inferred_type, .. }
            | Expression::Ident { inferred_type, .. }
            | Expression::At { inferred_type, .. }
            | Expression::GetName { inferred_type, .. }
            | Expression::IfThenElse { inferred_type, .. }
            | Expression::Apply { inferred_type, .. }
            | Expression::BinaryOp { inferred_type, .. }
            | Expression::UnaryOp { inferred_type, .. }
            | Expression::PlaceholderTrueFalse { inferred_type, .. }
            | Expression::PlaceholderDefault { inferred_type, .. }
            | Expression::PlaceholderSep { inferred_type, .. } => *inferred_type = Some(ty),
            Expression::Coerce { .. } => {}
        }
    }

    /// Direct child expressions, in source order.
    pub fn children(&self) -> Vec<&Expression> {
        let mut out = Vec::new();
        match self {
            Expression::String { parts, .. } => {
                for part in parts {
                    if let StringPart::Placeholder(expr) = part {
                        out.push(expr.as_ref());
                    }
                }
            }
            Expression::Array { items, .. } => out.extend(items.iter()),
            Expression::Pair { left, right, .. } => {
                out.push(left);
                out.push(right);
            }
            Expression::Map { pairs, .. } => {
                for (k, v) in pairs {
                    out.push(k);
                    out.push(v);
                }
            }
            Expression::Object { members, .. } => {
                out.extend(members.iter().map(|(_, e)| e));
            }
            Expression::At { expr, index, .. } => {
                out.push(expr);
                out.push(index);
            }
            Expression::GetName { expr, .. } => out.push(expr),
            Expression::IfThenElse {
                condition,
                true_expr,
                false_expr,
                ..
            } => {
                out.push(condition);
                out.push(true_expr);
                out.push(false_expr);
            }
            Expression::Apply { arguments, .. } => out.extend(arguments.iter()),
            Expression::BinaryOp { left, right, .. } => {
                out.push(left);
                out.push(right);
            }
            Expression::UnaryOp { operand, .. } => out.push(operand),
            Expression::PlaceholderTrueFalse {
                condition,
                when_true,
                when_false,
                ..
            } => {
                out.push(when_true);
                out.push(when_false);
                out.push(condition);
            }
            Expression::PlaceholderDefault { default, value, .. } => {
                out.push(default);
                out.push(value);
            }
            Expression::PlaceholderSep { separator, array, .. } => {
                out.push(separator);
                out.push(array);
            }
            Expression::Coerce { expr, .. } => out.push(expr),
            _ => {}
        }
        out
    }

    /// The constant value of a literal expression, if it is one.
    pub fn literal(&self) -> Option<crate::value::Value> {
        use crate::value::Value;
        match self {
            Expression::Boolean { value, .. } => Some(Value::boolean(*value)),
            Expression::Int { value, .. } => Some(Value::int(*value)),
            Expression::Float { value, .. } => Some(Value::float(*value)),
            Expression::Null { .. } => Some(Value::null()),
            Expression::String { parts, .. } => {
                let mut text = String::new();
                for part in parts {
                    match part {
                        StringPart::Text(t) => text.push_str(t),
                        StringPart::Placeholder(_) => return None,
                    }
                }
                Some(Value::string(text))
            }
            _ => None,
        }
    }
}

impl HasSourcePosition for Expression {
    fn source_position(&self) -> &SourcePosition {
        self.pos()
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Boolean { value, .. } => {
                write!(f, "{}", if *value { "true" } else { "false" })
            }
            Expression::Int { value, .. } => write!(f, "{}", value),
            Expression::Float { value, .. } => write!(f, "{}", value),
            Expression::Null { .. } => write!(f, "None"),
            Expression::String { parts, .. } => {
                write!(f, "\"")?;
                for part in parts {
                    match part {
                        StringPart::Text(text) => write!(f, "{}", text)?,
                        StringPart::Placeholder(expr) => write!(f, "~{{{}}}", expr)?,
                    }
                }
                write!(f, "\"")
            }
            Expression::Array { items, .. } => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Expression::Pair { left, right, .. } => write!(f, "({}, {})", left, right),
            Expression::Map { pairs, .. } => {
                write!(f, "{{")?;
                for (i, (k, v)) in pairs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
            Expression::Object {
                type_name, members, ..
            } => {
                write!(f, "{} {{", type_name.as_deref().unwrap_or("object"))?;
                for (i, (name, expr)) in members.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", name, expr)?;
                }
                write!(f, "}}")
            }
            Expression::Ident { name, .. } => write!(f, "{}", name),
            Expression::At { expr, index, .. } => write!(f, "{}[{}]", expr, index),
            Expression::GetName { expr, field, .. } => write!(f, "{}.{}", expr, field),
            Expression::IfThenElse {
                condition,
                true_expr,
                false_expr,
                ..
            } => write!(f, "if {} then {} else {}", condition, true_expr, false_expr),
            Expression::Apply {
                function_name,
                arguments,
                ..
            } => {
                write!(f, "{}(", function_name)?;
                for (i, arg) in arguments.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Expression::BinaryOp { op, left, right, .. } => {
                write!(f, "{} {} {}", left, op.symbol(), right)
            }
            Expression::UnaryOp { op, operand, .. } => {
                let symbol = match op {
                    UnaryOperator::Not => "!",
                    UnaryOperator::Negate => "-",
                };
                write!(f, "{}{}", symbol, operand)
            }
            Expression::PlaceholderTrueFalse {
                condition,
                when_true,
                when_false,
                ..
            } => write!(
                f,
                "true={} false={} {}",
                when_true, when_false, condition
            ),
            Expression::PlaceholderDefault { default, value, .. } => {
                write!(f, "default={} {}", default, value)
            }
            Expression::PlaceholderSep { separator, array, .. } => {
                write!(f, "sep={} {}", separator, array)
            }
            Expression::Coerce { expr, .. } => write!(f, "{}", expr),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn pos() -> SourcePosition {
        SourcePosition::new("t.wdl".to_string(), "/t.wdl".to_string(), 1, 1, 1, 2)
    }

    #[test]
    fn test_literals() {
        assert_eq!(
            Expression::boolean(pos(), true).literal(),
            Some(Value::boolean(true))
        );
        assert_eq!(Expression::int(pos(), 42).literal(), Some(Value::int(42)));
        assert_eq!(
            Expression::string_literal(pos(), "hi".to_string()).literal(),
            Some(Value::string("hi".to_string()))
        );
        // Interpolated strings are not literals.
        let interpolated = Expression::string(
            pos(),
            vec![StringPart::Placeholder(Box::new(Expression::ident(
                pos(),
                "x".to_string(),
            )))],
        );
        assert_eq!(interpolated.literal(), None);
    }

    #[test]
    fn test_display() {
        let sum = Expression::binary_op(
            pos(),
            BinaryOperator::Add,
            Expression::int(pos(), 1),
            Expression::int(pos(), 2),
        );
        assert_eq!(sum.to_string(), "1 + 2");

        let access = Expression::get_name(pos(), Expression::ident(pos(), "p".to_string()), "a".to_string());
        assert_eq!(access.to_string(), "p.a");

        let cond = Expression::if_then_else(
            pos(),
            Expression::boolean(pos(), true),
            Expression::int(pos(), 1),
            Expression::int(pos(), 2),
        );
        assert_eq!(cond.to_string(), "if true then 1 else 2");
    }

    #[test]
    fn test_coerce_wrapper_display_transparent() {
        let mut inner = Expression::int(pos(), 3);
        inner.set_type(crate::types::Type::int(false));
        let coerced = inner.coerce_to(crate::types::Type::float(false));
        assert_eq!(coerced.to_string(), "3");
        assert!(matches!(coerced, Expression::Coerce { .. }));
        assert_eq!(coerced.get_type(), Some(&crate::types::Type::float(false)));
    }

    #[test]
    fn test_coerce_identity_not_materialized() {
        let mut inner = Expression::int(pos(), 3);
        inner.set_type(crate::types::Type::int(false));
        let same = inner.coerce_to(crate::types::Type::int(false));
        assert!(matches!(same, Expression::Int { .. }));
    }

    #[test]
    fn test_children_order() {
        let expr = Expression::at(
            pos(),
            Expression::ident(pos(), "xs".to_string()),
            Expression::int(pos(), 0),
        );
        let kinds: Vec<bool> = expr
            .children()
            .iter()
            .map(|c| matches!(c, Expression::Ident { .. }))
            .collect();
        assert_eq!(kinds, vec![true, false]);
    }
}
