//! Expression evaluation.
//!
//! `eval` is a pure function of the expression, the value environment, and
//! the standard library (whose I/O goes through the injected file access).
//! Coercions elaborated by the checker are applied where the `Coerce`
//! wrappers sit, so promotion decisions made at inference time are exactly
//! the ones replayed here.

use super::{BinaryOperator, Expression, StringPart, UnaryOperator};
use crate::env::Bindings;
use crate::error::WdlError;
use crate::expr::typecheck::operator_name;
use crate::stdlib::StdLib;
use crate::types::Type;
use crate::value::Value;
use indexmap::IndexMap;

impl Expression {
    pub fn eval(&self, env: &Bindings<Value>, stdlib: &StdLib) -> Result<Value, WdlError> {
        match self {
            Expression::Boolean { value, .. } => Ok(Value::boolean(*value)),
            Expression::Int { value, .. } => Ok(Value::int(*value)),
            Expression::Float { value, .. } => Ok(Value::float(*value)),
            Expression::Null { .. } => Ok(Value::null()),

            Expression::String { parts, .. } => {
                let mut text = String::new();
                for part in parts {
                    match part {
                        StringPart::Text(chunk) => text.push_str(chunk),
                        StringPart::Placeholder(expr) => {
                            text.push_str(&placeholder_text(expr, env, stdlib)?)
                        }
                    }
                }
                Ok(Value::string(text))
            }

            Expression::Array { items, .. } => {
                let values: Vec<Value> = items
                    .iter()
                    .map(|item| item.eval(env, stdlib))
                    .collect::<Result<_, _>>()?;
                let item_type = self
                    .get_type()
                    .and_then(|t| match t {
                        Type::Array { item_type, .. } => Some(item_type.as_ref().clone()),
                        _ => None,
                    })
                    .or_else(|| values.first().map(|v| v.wdl_type().clone()))
                    .unwrap_or_else(Type::any);
                Ok(Value::array(item_type, values))
            }

            Expression::Pair { left, right, .. } => {
                let left = left.eval(env, stdlib)?;
                let right = right.eval(env, stdlib)?;
                Ok(Value::pair(
                    left.wdl_type().clone(),
                    right.wdl_type().clone(),
                    left,
                    right,
                ))
            }

            Expression::Map { pairs, .. } => {
                let mut out = Vec::with_capacity(pairs.len());
                for (k, v) in pairs {
                    out.push((k.eval(env, stdlib)?, v.eval(env, stdlib)?));
                }
                let (key_type, value_type) = match out.first() {
                    Some((k, v)) => (k.wdl_type().clone(), v.wdl_type().clone()),
                    None => (Type::any(), Type::any()),
                };
                Ok(Value::map(key_type, value_type, out))
            }

            Expression::Object { members, .. } => {
                let mut values = IndexMap::new();
                for (name, expr) in members {
                    values.insert(name.clone(), expr.eval(env, stdlib)?);
                }
                match self.get_type() {
                    // A typed struct literal fills optional members and
                    // checks required ones.
                    Some(struct_type @ Type::StructInstance { .. }) => {
                        Value::struct_value(struct_type.clone(), values)
                            .map_err(|e| reposition(e, self))
                    }
                    _ => {
                        let member_types: IndexMap<String, Type> = values
                            .iter()
                            .map(|(k, v)| (k.clone(), v.wdl_type().clone()))
                            .collect();
                        Ok(Value::struct_value_unchecked(
                            Type::object(member_types),
                            values,
                        ))
                    }
                }
            }

            Expression::Ident { pos, name, .. } => env.resolve(name).cloned().ok_or_else(|| {
                WdlError::eval(pos.clone(), format!("no binding for {}", name))
            }),

            Expression::At {
                pos, expr, index, ..
            } => {
                let container = expr.eval(env, stdlib)?;
                let key = index.eval(env, stdlib)?;
                match (&container, &key) {
                    (Value::Array { values, .. }, Value::Int { value: i, .. }) => {
                        if *i < 0 || (*i as usize) >= values.len() {
                            return Err(WdlError::OutOfBounds { pos: pos.clone() });
                        }
                        Ok(values[*i as usize].clone())
                    }
                    (Value::Map { pairs, .. }, key) => {
                        for (map_key, map_value) in pairs {
                            if map_key.equals(key).unwrap_or(false) {
                                return Ok(map_value.clone());
                            }
                        }
                        Err(WdlError::eval(
                            pos.clone(),
                            format!("map has no key {}", key),
                        ))
                    }
                    (container, _) => Err(WdlError::eval(
                        pos.clone(),
                        format!("cannot index into {}", container.wdl_type()),
                    )),
                }
            }

            Expression::GetName {
                pos, expr, field, ..
            } => {
                // Compound keys ("call_alias.output") bound whole in the
                // environment win over member access.
                if let Expression::Ident { name, .. } = expr.as_ref() {
                    if let Some(value) = env.resolve(&format!("{}.{}", name, field)) {
                        return Ok(value.clone());
                    }
                }
                let container = expr.eval(env, stdlib)?;
                match &container {
                    Value::Pair { left, right, .. } => {
                        match field.to_ascii_lowercase().as_str() {
                            "left" => Ok(left.as_ref().clone()),
                            "right" => Ok(right.as_ref().clone()),
                            other => Err(WdlError::eval(
                                pos.clone(),
                                format!("pair has no member '{}'", other),
                            )),
                        }
                    }
                    Value::Struct { members, .. } => {
                        members.get(field).cloned().ok_or_else(|| {
                            WdlError::eval(pos.clone(), format!("no such member '{}'", field))
                        })
                    }
                    other => Err(WdlError::eval(
                        pos.clone(),
                        format!("cannot access member of {}", other.wdl_type()),
                    )),
                }
            }

            Expression::IfThenElse {
                condition,
                true_expr,
                false_expr,
                ..
            } => {
                let chosen = if eval_condition(condition, env, stdlib)? {
                    true_expr
                } else {
                    false_expr
                };
                chosen.eval(env, stdlib)
            }

            Expression::Apply {
                pos,
                function_name,
                arguments,
                ..
            } => {
                let args: Vec<Value> = arguments
                    .iter()
                    .map(|arg| arg.eval(env, stdlib))
                    .collect::<Result<_, _>>()?;
                stdlib
                    .call(function_name, pos, &args)
                    .map_err(|e| reposition(e, self))
            }

            Expression::BinaryOp {
                pos, op, left, right, ..
            } => {
                // Logic operators short-circuit.
                match op {
                    BinaryOperator::And => {
                        if !eval_condition(left, env, stdlib)? {
                            return Ok(Value::boolean(false));
                        }
                        return Ok(Value::boolean(eval_condition(right, env, stdlib)?));
                    }
                    BinaryOperator::Or => {
                        if eval_condition(left, env, stdlib)? {
                            return Ok(Value::boolean(true));
                        }
                        return Ok(Value::boolean(eval_condition(right, env, stdlib)?));
                    }
                    _ => {}
                }
                let args = [left.eval(env, stdlib)?, right.eval(env, stdlib)?];
                stdlib
                    .call(operator_name(*op), pos, &args)
                    .map_err(|e| reposition(e, self))
            }

            Expression::UnaryOp {
                pos, op, operand, ..
            } => {
                let name = match op {
                    UnaryOperator::Not => "_not",
                    UnaryOperator::Negate => "_neg",
                };
                let args = [operand.eval(env, stdlib)?];
                stdlib.call(name, pos, &args).map_err(|e| reposition(e, self))
            }

            Expression::PlaceholderTrueFalse {
                condition,
                when_true,
                when_false,
                ..
            } => {
                let chosen = if eval_condition(condition, env, stdlib)? {
                    when_true
                } else {
                    when_false
                };
                let value = chosen.eval(env, stdlib)?;
                Ok(Value::string(value.canonical_string()))
            }

            Expression::PlaceholderDefault { default, value, .. } => {
                let inner = value.eval(env, stdlib)?;
                if inner.is_null() {
                    let fallback = default.eval(env, stdlib)?;
                    Ok(Value::string(fallback.canonical_string()))
                } else {
                    Ok(Value::string(inner.canonical_string()))
                }
            }

            Expression::PlaceholderSep {
                pos,
                separator,
                array,
                ..
            } => {
                let separator = separator.eval(env, stdlib)?.canonical_string();
                let collection = array.eval(env, stdlib)?;
                if collection.is_null() {
                    // A null optional array passes through for an outer
                    // default= to catch.
                    return Ok(Value::null());
                }
                let Some(values) = collection.as_array() else {
                    return Err(WdlError::eval(
                        pos.clone(),
                        format!("sep= applies to an array, not {}", collection.wdl_type()),
                    ));
                };
                let joined = values
                    .iter()
                    .map(|v| v.canonical_string())
                    .collect::<Vec<_>>()
                    .join(&separator);
                Ok(Value::string(joined))
            }

            Expression::Coerce { pos, expr, target } => {
                let value = expr.eval(env, stdlib)?;
                value.coerce(target).map_err(|e| match e {
                    WdlError::NullValue { .. } => WdlError::NullValue { pos: pos.clone() },
                    WdlError::EmptyArray { .. } => WdlError::EmptyArray { pos: pos.clone() },
                    other => WdlError::eval(pos.clone(), other.to_string()),
                })
            }
        }
    }
}

fn eval_condition(
    expr: &Expression,
    env: &Bindings<Value>,
    stdlib: &StdLib,
) -> Result<bool, WdlError> {
    let value = expr.eval(env, stdlib)?;
    value.as_bool().ok_or_else(|| {
        WdlError::eval(
            expr.pos().clone(),
            format!("expected Boolean, got {}", value.wdl_type()),
        )
    })
}

/// The string a placeholder contributes to its enclosing string/command:
/// null renders as empty.
pub(crate) fn placeholder_text(
    expr: &Expression,
    env: &Bindings<Value>,
    stdlib: &StdLib,
) -> Result<String, WdlError> {
    let value = expr.eval(env, stdlib)?;
    Ok(match value {
        Value::Null => String::new(),
        other => other.canonical_string(),
    })
}

/// Attach the expression's span to errors raised inside stdlib bodies.
fn reposition(error: WdlError, expr: &Expression) -> WdlError {
    match error {
        WdlError::Runtime { message } | WdlError::Input { message } => {
            WdlError::eval(expr.pos().clone(), message)
        }
        positioned => positioned,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::typecheck::StructTable;
    use crate::parser::Version;

    fn eval_with(source: &str, env: &Bindings<Value>, types: &Bindings<Type>) -> Result<Value, WdlError> {
        let mut stream =
            crate::parser::token_stream::TokenStream::new(source, "t.wdl", "/t.wdl", Version::V1_0);
        let cst = crate::parser::expressions::parse_expression(&mut stream).unwrap();
        let mut expr = crate::tree::lower::lower_expr(cst, Version::V1_0).unwrap();
        let stdlib = StdLib::new(Version::V1_0);
        expr.infer_type(types, &stdlib, &StructTable::new())?;
        expr.eval(env, &stdlib)
    }

    fn eval(source: &str) -> Result<Value, WdlError> {
        eval_with(source, &Bindings::new(), &Bindings::new())
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval("1 + 2 * 3").unwrap().as_int(), Some(7));
        assert_eq!(eval("(1 + 2) * 3").unwrap().as_int(), Some(9));
        assert_eq!(eval("7 % 3").unwrap().as_int(), Some(1));
        assert_eq!(eval("1 + 0.5").unwrap().as_float(), Some(1.5));
        assert_eq!(eval("-(3)").unwrap().as_int(), Some(-3));
    }

    #[test]
    fn test_division_by_zero_positioned() {
        let err = eval("10 / 0").unwrap_err();
        match err {
            WdlError::DivisionByZero { pos } => assert_eq!(pos.line, 1),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_short_circuit() {
        // The right side would divide by zero if evaluated.
        assert_eq!(
            eval("false && 1 / 0 == 1").unwrap().as_bool(),
            Some(false)
        );
        assert_eq!(eval("true || 1 / 0 == 1").unwrap().as_bool(), Some(true));
    }

    #[test]
    fn test_string_interpolation() {
        let env = Bindings::new().bind("name".to_string(), Value::string("world".to_string()), None);
        let types = Bindings::new().bind("name".to_string(), Type::string(false), None);
        let out = eval_with("\"hello ~{name}!\"", &env, &types).unwrap();
        assert_eq!(out.as_string(), Some("hello world!"));
    }

    #[test]
    fn test_null_placeholder_renders_empty() {
        let env = Bindings::new().bind("maybe".to_string(), Value::null(), None);
        let types = Bindings::new().bind("maybe".to_string(), Type::string(true), None);
        let out = eval_with("\"[~{maybe}]\"", &env, &types).unwrap();
        assert_eq!(out.as_string(), Some("[]"));
    }

    #[test]
    fn test_indexing_and_bounds() {
        assert_eq!(eval("[10, 20, 30][1]").unwrap().as_int(), Some(20));
        assert!(matches!(
            eval("[10, 20][5]"),
            Err(WdlError::OutOfBounds { .. })
        ));
        assert_eq!(eval("{\"a\": 1, \"b\": 2}[\"b\"]").unwrap().as_int(), Some(2));
        assert!(eval("{\"a\": 1}[\"z\"]").is_err());
    }

    #[test]
    fn test_pair_access() {
        assert_eq!(eval("(1, \"x\").left").unwrap().as_int(), Some(1));
        assert_eq!(eval("(1, \"x\").Right").unwrap().as_string(), Some("x"));
    }

    #[test]
    fn test_if_then_else() {
        assert_eq!(eval("if 2 > 1 then \"a\" else \"b\"").unwrap().as_string(), Some("a"));
        // Branch coercion applies: the result is Float in both arms.
        let v = eval("if false then 1 else 2.5").unwrap();
        assert_eq!(v.as_float(), Some(2.5));
        let v = eval("if true then 1 else 2.5").unwrap();
        assert!(matches!(v, Value::Float { .. }));
    }

    #[test]
    fn test_apply() {
        assert_eq!(eval("length([1, 2, 3])").unwrap().as_int(), Some(3));
        assert_eq!(eval("select_first([None, 5])").unwrap().as_int(), Some(5));
        assert_eq!(eval("floor(2.9)").unwrap().as_int(), Some(2));
    }

    #[test]
    fn test_object_literal() {
        let value = eval("object { a: 7, b: \"x\" }").unwrap();
        let members = value.as_struct().unwrap();
        assert_eq!(members.get("a").unwrap().as_int(), Some(7));
    }

    #[test]
    fn test_determinism() {
        let env = Bindings::new().bind(
            "xs".to_string(),
            Value::array(Type::int(false), vec![Value::int(3), Value::int(1)]),
            None,
        );
        let types = Bindings::new().bind(
            "xs".to_string(),
            Type::array(Type::int(false), false, true),
            None,
        );
        let first = eval_with("xs[0] * 10 + length(xs)", &env, &types).unwrap();
        let second = eval_with("xs[0] * 10 + length(xs)", &env, &types).unwrap();
        assert!(first.equals(&second).unwrap());
    }

    #[test]
    fn test_missing_binding_is_eval_error() {
        // Bypass the checker: evaluate an unresolved identifier directly.
        let expr = Expression::ident(crate::error::SourcePosition::unknown(), "ghost".to_string());
        let stdlib = StdLib::new(Version::V1_0);
        assert!(matches!(
            expr.eval(&Bindings::new(), &stdlib),
            Err(WdlError::Eval { .. })
        ));
    }
}
