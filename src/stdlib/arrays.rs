//! Array manipulation functions. Most of these are polymorphic, so they
//! implement [`Function`] directly and compute their return type from the
//! argument types.

use super::{create_static_function, Function, FunctionSignature, StdLib};
use crate::error::{SourcePosition, WdlError};
use crate::types::{unify_types, Type};
use crate::value::Value;

fn item_type(ty: &Type) -> Option<&Type> {
    match ty {
        Type::Array { item_type, .. } => Some(item_type),
        _ => None,
    }
}

fn expect_array<'a>(
    pos: &SourcePosition,
    name: &str,
    value: &'a Value,
) -> Result<&'a [Value], WdlError> {
    value.as_array().ok_or_else(|| {
        WdlError::eval(
            pos.clone(),
            format!("{}() expects an array, got {}", name, value.wdl_type()),
        )
    })
}

/// A polymorphic function defined by a pair of closures.
struct PolyFunction {
    name: &'static str,
    arity: usize,
    infer: fn(&SourcePosition, &[Type]) -> Result<FunctionSignature, WdlError>,
    eval: fn(&SourcePosition, &[Value], &StdLib) -> Result<Value, WdlError>,
}

impl Function for PolyFunction {
    fn name(&self) -> &str {
        self.name
    }

    fn infer_type(
        &self,
        pos: &SourcePosition,
        arg_types: &[Type],
    ) -> Result<FunctionSignature, WdlError> {
        if arg_types.len() != self.arity {
            return Err(arity_error(pos, self.name, self.arity));
        }
        (self.infer)(pos, arg_types)
    }

    fn eval(
        &self,
        pos: &SourcePosition,
        args: &[Value],
        stdlib: &StdLib,
    ) -> Result<Value, WdlError> {
        if args.len() != self.arity {
            return Err(arity_error(pos, self.name, self.arity));
        }
        (self.eval)(pos, args, stdlib)
    }
}

fn arity_error(pos: &SourcePosition, name: &str, expected: usize) -> WdlError {
    WdlError::WrongArity {
        pos: pos.clone(),
        function: name.to_string(),
        expected,
    }
}

fn overload_error(pos: &SourcePosition, name: &str, arg_types: &[Type]) -> WdlError {
    WdlError::NoSuchOverload {
        pos: pos.clone(),
        function: name.to_string(),
        actual: arg_types
            .iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .join(", "),
    }
}

/// `length(Array[X]) -> Int`; also measures maps and strings.
pub fn length() -> Box<dyn Function> {
    Box::new(PolyFunction {
        name: "length",
        arity: 1,
        infer: |pos, arg_types| {
            let [arg] = arg_types else {
                return Err(arity_error(pos, "length", 1));
            };
            match arg {
                Type::Array { .. }
                | Type::Map { .. }
                | Type::String { .. }
                | Type::Object { .. }
                | Type::Any { .. } => Ok(FunctionSignature::new(
                    "length",
                    vec![arg.clone()],
                    Type::int(false),
                )),
                _ => Err(overload_error(pos, "length", arg_types)),
            }
        },
        eval: |pos, args, _| match &args[0] {
            Value::Array { values, .. } => Ok(Value::int(values.len() as i64)),
            Value::Map { pairs, .. } => Ok(Value::int(pairs.len() as i64)),
            Value::String { value, .. } => Ok(Value::int(value.chars().count() as i64)),
            Value::Struct { members, .. } => Ok(Value::int(members.len() as i64)),
            other => Err(WdlError::eval(
                pos.clone(),
                format!("length() cannot measure {}", other.wdl_type()),
            )),
        },
    })
}

/// `range(n) -> [0, 1, ..., n-1]`.
pub fn range() -> Box<dyn Function> {
    create_static_function(
        "range",
        vec![(
            vec![Type::int(false)],
            Type::array(Type::int(false), false, false),
        )],
        |args, _| {
            let n = args[0].as_int().unwrap_or(0);
            if n < 0 {
                return Err(WdlError::Runtime {
                    message: "range() expects a non-negative count".to_string(),
                });
            }
            Ok(Value::array(
                Type::int(false),
                (0..n).map(Value::int).collect(),
            ))
        },
    )
}

/// `select_first(Array[X?]) -> X`: first non-null element.
pub fn select_first() -> Box<dyn Function> {
    Box::new(PolyFunction {
        name: "select_first",
        arity: 1,
        infer: |pos, arg_types| {
            let [arg] = arg_types else {
                return Err(arity_error(pos, "select_first", 1));
            };
            let Some(item) = item_type(arg) else {
                return Err(overload_error(pos, "select_first", arg_types));
            };
            Ok(FunctionSignature::new(
                "select_first",
                vec![arg.clone()],
                item.clone().with_optional(false),
            ))
        },
        eval: |pos, args, _| {
            let values = expect_array(pos, "select_first", &args[0])?;
            values
                .iter()
                .find(|v| !v.is_null())
                .cloned()
                .ok_or_else(|| {
                    WdlError::eval(
                        pos.clone(),
                        "select_first() found no non-null element".to_string(),
                    )
                })
        },
    })
}

/// `select_all(Array[X?]) -> Array[X]`: the non-null elements.
pub fn select_all() -> Box<dyn Function> {
    Box::new(PolyFunction {
        name: "select_all",
        arity: 1,
        infer: |pos, arg_types| {
            let [arg] = arg_types else {
                return Err(arity_error(pos, "select_all", 1));
            };
            let Some(item) = item_type(arg) else {
                return Err(overload_error(pos, "select_all", arg_types));
            };
            Ok(FunctionSignature::new(
                "select_all",
                vec![arg.clone()],
                Type::array(item.clone().with_optional(false), false, false),
            ))
        },
        eval: |pos, args, _| {
            let values = expect_array(pos, "select_all", &args[0])?;
            let kept: Vec<Value> = values.iter().filter(|v| !v.is_null()).cloned().collect();
            let item = kept
                .first()
                .map(|v| v.wdl_type().clone())
                .unwrap_or_else(Type::any);
            Ok(Value::array(item, kept))
        },
    })
}

/// `flatten(Array[Array[X]]) -> Array[X]`.
pub fn flatten() -> Box<dyn Function> {
    Box::new(PolyFunction {
        name: "flatten",
        arity: 1,
        infer: |pos, arg_types| {
            let [arg] = arg_types else {
                return Err(arity_error(pos, "flatten", 1));
            };
            let Some(inner) = item_type(arg).and_then(item_type) else {
                return Err(overload_error(pos, "flatten", arg_types));
            };
            Ok(FunctionSignature::new(
                "flatten",
                vec![arg.clone()],
                Type::array(inner.clone(), false, false),
            ))
        },
        eval: |pos, args, _| {
            let rows = expect_array(pos, "flatten", &args[0])?;
            let mut out = Vec::new();
            for row in rows {
                out.extend(expect_array(pos, "flatten", row)?.iter().cloned());
            }
            let item = out
                .first()
                .map(|v| v.wdl_type().clone())
                .unwrap_or_else(Type::any);
            Ok(Value::array(item, out))
        },
    })
}

/// `transpose(Array[Array[X]]) -> Array[Array[X]]`; rows must be equal
/// length.
pub fn transpose() -> Box<dyn Function> {
    Box::new(PolyFunction {
        name: "transpose",
        arity: 1,
        infer: |pos, arg_types| {
            let [arg] = arg_types else {
                return Err(arity_error(pos, "transpose", 1));
            };
            if item_type(arg).and_then(item_type).is_none() {
                return Err(overload_error(pos, "transpose", arg_types));
            }
            Ok(FunctionSignature::new(
                "transpose",
                vec![arg.clone()],
                arg.clone(),
            ))
        },
        eval: |pos, args, _| {
            let rows = expect_array(pos, "transpose", &args[0])?;
            if rows.is_empty() {
                return Ok(Value::array(
                    Type::array(Type::any(), false, false),
                    vec![],
                ));
            }
            let width = expect_array(pos, "transpose", &rows[0])?.len();
            let mut columns: Vec<Vec<Value>> = vec![Vec::new(); width];
            for row in rows {
                let row = expect_array(pos, "transpose", row)?;
                if row.len() != width {
                    return Err(WdlError::eval(
                        pos.clone(),
                        "transpose() requires rows of equal length".to_string(),
                    ));
                }
                for (column, value) in columns.iter_mut().zip(row) {
                    column.push(value.clone());
                }
            }
            let item = columns
                .first()
                .and_then(|c| c.first())
                .map(|v| v.wdl_type().clone())
                .unwrap_or_else(Type::any);
            Ok(Value::array(
                Type::array(item.clone(), false, false),
                columns
                    .into_iter()
                    .map(|c| Value::array(item.clone(), c))
                    .collect(),
            ))
        },
    })
}

fn pairwise_infer(
    name: &'static str,
) -> fn(&SourcePosition, &[Type]) -> Result<FunctionSignature, WdlError> {
    // zip and cross share a shape: (Array[X], Array[Y]) -> Array[Pair[X,Y]].
    match name {
        "zip" => |pos, arg_types| pairwise_signature(pos, "zip", arg_types),
        _ => |pos, arg_types| pairwise_signature(pos, "cross", arg_types),
    }
}

fn pairwise_signature(
    pos: &SourcePosition,
    name: &str,
    arg_types: &[Type],
) -> Result<FunctionSignature, WdlError> {
    let [left, right] = arg_types else {
        return Err(arity_error(pos, name, 2));
    };
    let (Some(x), Some(y)) = (item_type(left), item_type(right)) else {
        return Err(overload_error(pos, name, arg_types));
    };
    Ok(FunctionSignature::new(
        name,
        vec![left.clone(), right.clone()],
        Type::array(Type::pair(x.clone(), y.clone(), false), false, false),
    ))
}

/// `zip(Array[X], Array[Y]) -> Array[Pair[X,Y]]`, elementwise.
pub fn zip() -> Box<dyn Function> {
    Box::new(PolyFunction {
        name: "zip",
        arity: 2,
        infer: pairwise_infer("zip"),
        eval: |pos, args, _| {
            let left = expect_array(pos, "zip", &args[0])?;
            let right = expect_array(pos, "zip", &args[1])?;
            if left.len() != right.len() {
                return Err(WdlError::eval(
                    pos.clone(),
                    format!(
                        "zip() arrays differ in length ({} vs {})",
                        left.len(),
                        right.len()
                    ),
                ));
            }
            let pairs: Vec<Value> = left
                .iter()
                .zip(right)
                .map(|(l, r)| {
                    Value::pair(
                        l.wdl_type().clone(),
                        r.wdl_type().clone(),
                        l.clone(),
                        r.clone(),
                    )
                })
                .collect();
            let item = pairs
                .first()
                .map(|v| v.wdl_type().clone())
                .unwrap_or_else(|| Type::pair(Type::any(), Type::any(), false));
            Ok(Value::array(item, pairs))
        },
    })
}

/// `cross(Array[X], Array[Y]) -> Array[Pair[X,Y]]`, the cartesian product
/// in row-major order.
pub fn cross() -> Box<dyn Function> {
    Box::new(PolyFunction {
        name: "cross",
        arity: 2,
        infer: pairwise_infer("cross"),
        eval: |pos, args, _| {
            let left = expect_array(pos, "cross", &args[0])?;
            let right = expect_array(pos, "cross", &args[1])?;
            let mut pairs = Vec::with_capacity(left.len() * right.len());
            for l in left {
                for r in right {
                    pairs.push(Value::pair(
                        l.wdl_type().clone(),
                        r.wdl_type().clone(),
                        l.clone(),
                        r.clone(),
                    ));
                }
            }
            let item = pairs
                .first()
                .map(|v| v.wdl_type().clone())
                .unwrap_or_else(|| Type::pair(Type::any(), Type::any(), false));
            Ok(Value::array(item, pairs))
        },
    })
}

/// `prefix(String, Array[X]) -> Array[String]` where X stringifies.
pub fn prefix() -> Box<dyn Function> {
    create_static_function(
        "prefix",
        vec![(
            vec![
                Type::string(false),
                Type::array(Type::string(false), false, false),
            ],
            Type::array(Type::string(false), false, false),
        )],
        |args, _| {
            let prefix = args[0].as_string().unwrap_or_default().to_string();
            let values = args[1].as_array().unwrap_or_default();
            Ok(Value::array(
                Type::string(false),
                values
                    .iter()
                    .map(|v| Value::string(format!("{}{}", prefix, v.canonical_string())))
                    .collect(),
            ))
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Version;

    fn lib() -> StdLib {
        StdLib::new(Version::V1_0)
    }

    fn pos() -> SourcePosition {
        SourcePosition::unknown()
    }

    fn ints(values: &[i64]) -> Value {
        Value::array(Type::int(false), values.iter().copied().map(Value::int).collect())
    }

    #[test]
    fn test_length_and_range() {
        let lib = lib();
        assert_eq!(
            lib.call("length", &pos(), &[ints(&[1, 2, 3])]).unwrap().as_int(),
            Some(3)
        );
        let r = lib.call("range", &pos(), &[Value::int(3)]).unwrap();
        assert_eq!(r, ints(&[0, 1, 2]));
        assert!(lib.call("range", &pos(), &[Value::int(-1)]).is_err());
    }

    #[test]
    fn test_select() {
        let lib = lib();
        let with_nulls = Value::array(
            Type::int(true),
            vec![Value::null(), Value::int(7), Value::null(), Value::int(9)],
        );
        assert_eq!(
            lib.call("select_first", &pos(), &[with_nulls.clone()])
                .unwrap()
                .as_int(),
            Some(7)
        );
        let all = lib.call("select_all", &pos(), &[with_nulls]).unwrap();
        assert_eq!(all, ints(&[7, 9]));

        let only_nulls = Value::array(Type::int(true), vec![Value::null()]);
        assert!(lib.call("select_first", &pos(), &[only_nulls]).is_err());
    }

    #[test]
    fn test_select_first_infers_non_optional() {
        let function = select_first();
        let sig = function
            .infer_type(&pos(), &[Type::array(Type::int(true), false, true)])
            .unwrap();
        assert_eq!(sig.return_type, Type::int(false));
    }

    #[test]
    fn test_flatten_and_transpose() {
        let lib = lib();
        let nested = Value::array(
            Type::array(Type::int(false), false, true),
            vec![ints(&[1, 2]), ints(&[3, 4])],
        );
        assert_eq!(
            lib.call("flatten", &pos(), &[nested.clone()]).unwrap(),
            ints(&[1, 2, 3, 4])
        );

        let transposed = lib.call("transpose", &pos(), &[nested]).unwrap();
        let rows = transposed.as_array().unwrap();
        assert_eq!(rows[0], ints(&[1, 3]));
        assert_eq!(rows[1], ints(&[2, 4]));

        let ragged = Value::array(
            Type::array(Type::int(false), false, true),
            vec![ints(&[1, 2]), ints(&[3])],
        );
        assert!(lib.call("transpose", &pos(), &[ragged]).is_err());
    }

    #[test]
    fn test_zip_and_cross() {
        let lib = lib();
        let zipped = lib
            .call("zip", &pos(), &[ints(&[1, 2]), ints(&[10, 20])])
            .unwrap();
        assert_eq!(zipped.as_array().unwrap().len(), 2);
        assert!(lib
            .call("zip", &pos(), &[ints(&[1]), ints(&[1, 2])])
            .is_err());

        let crossed = lib
            .call("cross", &pos(), &[ints(&[1, 2]), ints(&[10, 20, 30])])
            .unwrap();
        assert_eq!(crossed.as_array().unwrap().len(), 6);
    }

    #[test]
    fn test_prefix() {
        let lib = lib();
        let out = lib
            .call(
                "prefix",
                &pos(),
                &[Value::string("-i ".to_string()), ints(&[1, 2])],
            )
            .unwrap();
        let values = out.as_array().unwrap();
        assert_eq!(values[0].as_string(), Some("-i 1"));
        assert_eq!(values[1].as_string(), Some("-i 2"));
    }
}
