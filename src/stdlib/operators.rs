//! Binary and unary operators, registered in the function table under
//! `_`-prefixed names so expression evaluation dispatches them like any
//! other stdlib call.

use super::{Function, FunctionSignature, StdLib};
use crate::error::{SourcePosition, WdlError};
use crate::types::Type;
use crate::value::Value;
use std::cmp::Ordering;

pub fn all() -> Vec<Box<dyn Function>> {
    vec![
        Box::new(AddOperator),
        arithmetic("_sub", |l, r| l.checked_sub(r), |l, r| l - r),
        arithmetic("_mul", |l, r| l.checked_mul(r), |l, r| l * r),
        arithmetic("_div", |l, r| l.checked_div(r), |l, r| l / r),
        arithmetic("_rem", |l, r| l.checked_rem(r), |l, r| l % r),
        comparison("_eqeq", |o| o == Ordering::Equal, true),
        comparison("_neq", |o| o != Ordering::Equal, true),
        comparison("_lt", |o| o == Ordering::Less, false),
        comparison("_lte", |o| o != Ordering::Greater, false),
        comparison("_gt", |o| o == Ordering::Greater, false),
        comparison("_gte", |o| o != Ordering::Less, false),
        Box::new(LogicalOperator {
            name: "_and",
            apply: |l, r| l && r,
        }),
        Box::new(LogicalOperator {
            name: "_or",
            apply: |l, r| l || r,
        }),
        Box::new(NotOperator),
        Box::new(NegateOperator),
    ]
}

fn is_numeric(ty: &Type) -> bool {
    matches!(ty, Type::Int { .. } | Type::Float { .. } | Type::Any { .. })
}

fn numeric_result(left: &Type, right: &Type) -> Type {
    if matches!(left, Type::Float { .. }) || matches!(right, Type::Float { .. }) {
        Type::float(false)
    } else {
        Type::int(false)
    }
}

// ----------------------------------------------------------------- arithmetic

/// `- * / %`: Int op Int -> Int (checked; division/modulo by zero is an
/// error), anything mixed with Float -> Float.
struct ArithmeticOperator {
    name: &'static str,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
}

fn arithmetic(
    name: &'static str,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Box<dyn Function> {
    Box::new(ArithmeticOperator {
        name,
        int_op,
        float_op,
    })
}

impl Function for ArithmeticOperator {
    fn name(&self) -> &str {
        self.name
    }

    fn infer_type(
        &self,
        pos: &SourcePosition,
        arg_types: &[Type],
    ) -> Result<FunctionSignature, WdlError> {
        let [left, right] = arg_types else {
            return Err(WdlError::WrongArity {
                pos: pos.clone(),
                function: self.name.to_string(),
                expected: 2,
            });
        };
        if !is_numeric(left) || !is_numeric(right) {
            return Err(WdlError::validation(
                pos.clone(),
                format!("non-numeric operand to {}: {} and {}", self.name, left, right),
            ));
        }
        let result = numeric_result(left, right);
        Ok(FunctionSignature::new(
            self.name,
            vec![left.clone(), right.clone()],
            result,
        ))
    }

    fn eval(
        &self,
        pos: &SourcePosition,
        args: &[Value],
        _stdlib: &StdLib,
    ) -> Result<Value, WdlError> {
        if args.len() != 2 {
            return Err(WdlError::eval(
                pos.clone(),
                format!("{} expects 2 operands", self.name()),
            ));
        }
        match (&args[0], &args[1]) {
            (Value::Int { value: l, .. }, Value::Int { value: r, .. }) => {
                if *r == 0 && matches!(self.name, "_div" | "_rem") {
                    return Err(WdlError::DivisionByZero { pos: pos.clone() });
                }
                (self.int_op)(*l, *r).map(Value::int).ok_or_else(|| {
                    WdlError::eval(pos.clone(), format!("integer overflow in {}", self.name))
                })
            }
            (l, r) => {
                let (Some(l), Some(r)) = (l.as_float(), r.as_float()) else {
                    return Err(WdlError::eval(
                        pos.clone(),
                        format!("non-numeric operand to {}", self.name),
                    ));
                };
                // A zero denominator is an error for floats too, not inf/NaN.
                if r == 0.0 && matches!(self.name, "_div" | "_rem") {
                    return Err(WdlError::DivisionByZero { pos: pos.clone() });
                }
                Ok(Value::float((self.float_op)(l, r)))
            }
        }
    }
}

// ------------------------------------------------------------------------ add

/// `+` also concatenates when either side is a string or file.
struct AddOperator;

impl Function for AddOperator {
    fn name(&self) -> &str {
        "_add"
    }

    fn infer_type(
        &self,
        pos: &SourcePosition,
        arg_types: &[Type],
    ) -> Result<FunctionSignature, WdlError> {
        let [left, right] = arg_types else {
            return Err(WdlError::WrongArity {
                pos: pos.clone(),
                function: "_add".to_string(),
                expected: 2,
            });
        };
        let stringy = |t: &Type| matches!(t, Type::String { .. } | Type::File { .. });
        if stringy(left) || stringy(right) {
            let ok = |t: &Type| t.coerces(&Type::string(false), true);
            if !ok(left) || !ok(right) {
                return Err(WdlError::validation(
                    pos.clone(),
                    format!("cannot concatenate {} and {}", left, right),
                ));
            }
            let result = if matches!(left, Type::File { .. }) || matches!(right, Type::File { .. })
            {
                Type::file(false)
            } else {
                Type::string(false)
            };
            return Ok(FunctionSignature::new(
                "_add",
                vec![left.clone(), right.clone()],
                result,
            ));
        }
        if !is_numeric(left) || !is_numeric(right) {
            return Err(WdlError::validation(
                pos.clone(),
                format!("cannot add {} and {}", left, right),
            ));
        }
        Ok(FunctionSignature::new(
            "_add",
            vec![left.clone(), right.clone()],
            numeric_result(left, right),
        ))
    }

    fn eval(
        &self,
        pos: &SourcePosition,
        args: &[Value],
        _stdlib: &StdLib,
    ) -> Result<Value, WdlError> {
        if args.len() != 2 {
            return Err(WdlError::eval(
                pos.clone(),
                format!("{} expects 2 operands", self.name()),
            ));
        }
        let stringy = |v: &Value| {
            matches!(
                v,
                Value::String { .. } | Value::File { .. } | Value::Directory { .. }
            )
        };
        match (&args[0], &args[1]) {
            (l, r) if stringy(l) || stringy(r) => {
                let text = format!("{}{}", l.canonical_string(), r.canonical_string());
                if matches!(l, Value::File { .. }) || matches!(r, Value::File { .. }) {
                    Ok(Value::file(text))
                } else {
                    Ok(Value::string(text))
                }
            }
            (Value::Int { value: l, .. }, Value::Int { value: r, .. }) => {
                l.checked_add(*r).map(Value::int).ok_or_else(|| {
                    WdlError::eval(pos.clone(), "integer overflow in +".to_string())
                })
            }
            (l, r) => {
                let (Some(l), Some(r)) = (l.as_float(), r.as_float()) else {
                    return Err(WdlError::eval(
                        pos.clone(),
                        "cannot add the given operands".to_string(),
                    ));
                };
                Ok(Value::float(l + r))
            }
        }
    }
}

// ----------------------------------------------------------------- comparison

struct ComparisonOperator {
    name: &'static str,
    accept: fn(Ordering) -> bool,
    /// Equality admits compound operands; ordering only primitives.
    equality: bool,
}

fn comparison(
    name: &'static str,
    accept: fn(Ordering) -> bool,
    equality: bool,
) -> Box<dyn Function> {
    Box::new(ComparisonOperator {
        name,
        accept,
        equality,
    })
}

/// Ordering of primitive values: numeric cross-type, strings and files
/// lexicographic, false < true.
fn order_values(pos: &SourcePosition, left: &Value, right: &Value) -> Result<Ordering, WdlError> {
    match (left, right) {
        (Value::Int { value: l, .. }, Value::Int { value: r, .. }) => Ok(l.cmp(r)),
        (l, r) if l.as_float().is_some() && r.as_float().is_some() => {
            let (l, r) = (l.as_float().unwrap(), r.as_float().unwrap());
            l.partial_cmp(&r).ok_or_else(|| {
                WdlError::eval(pos.clone(), "NaN is not comparable".to_string())
            })
        }
        (l, r) if l.as_string().is_some() && r.as_string().is_some() => {
            Ok(l.as_string().unwrap().cmp(r.as_string().unwrap()))
        }
        (Value::Boolean { value: l, .. }, Value::Boolean { value: r, .. }) => Ok(l.cmp(r)),
        (l, r) => Err(WdlError::eval(
            pos.clone(),
            format!("cannot order {} and {}", l.wdl_type(), r.wdl_type()),
        )),
    }
}

impl Function for ComparisonOperator {
    fn name(&self) -> &str {
        self.name
    }

    fn infer_type(
        &self,
        pos: &SourcePosition,
        arg_types: &[Type],
    ) -> Result<FunctionSignature, WdlError> {
        let [left, right] = arg_types else {
            return Err(WdlError::WrongArity {
                pos: pos.clone(),
                function: self.name.to_string(),
                expected: 2,
            });
        };
        let ok = if self.equality {
            left.equatable(right, false)
        } else {
            left.comparable(right, true)
        };
        if !ok {
            return Err(WdlError::validation(
                pos.clone(),
                format!("cannot compare {} with {}", left, right),
            ));
        }
        Ok(FunctionSignature::new(
            self.name,
            vec![left.clone(), right.clone()],
            Type::boolean(false),
        ))
    }

    fn eval(
        &self,
        pos: &SourcePosition,
        args: &[Value],
        _stdlib: &StdLib,
    ) -> Result<Value, WdlError> {
        if args.len() != 2 {
            return Err(WdlError::eval(
                pos.clone(),
                format!("{} expects 2 operands", self.name()),
            ));
        }
        let ordering = if self.equality {
            // Structural equality; any unequal outcome ranks as Less so the
            // accept predicate distinguishes == from !=.
            if args[0].equals(&args[1])? {
                Ordering::Equal
            } else {
                Ordering::Less
            }
        } else {
            order_values(pos, &args[0], &args[1])?
        };
        Ok(Value::boolean((self.accept)(ordering)))
    }
}

// -------------------------------------------------------------------- logical

struct LogicalOperator {
    name: &'static str,
    apply: fn(bool, bool) -> bool,
}

impl Function for LogicalOperator {
    fn name(&self) -> &str {
        self.name
    }

    fn infer_type(
        &self,
        pos: &SourcePosition,
        arg_types: &[Type],
    ) -> Result<FunctionSignature, WdlError> {
        let [left, right] = arg_types else {
            return Err(WdlError::WrongArity {
                pos: pos.clone(),
                function: self.name.to_string(),
                expected: 2,
            });
        };
        for ty in [left, right] {
            if !ty.coerces(&Type::boolean(false), true) {
                return Err(WdlError::validation(
                    pos.clone(),
                    format!("operand of {} must be Boolean, not {}", self.name, ty),
                ));
            }
        }
        Ok(FunctionSignature::new(
            self.name,
            vec![Type::boolean(false), Type::boolean(false)],
            Type::boolean(false),
        ))
    }

    fn eval(
        &self,
        pos: &SourcePosition,
        args: &[Value],
        _stdlib: &StdLib,
    ) -> Result<Value, WdlError> {
        if args.len() != 2 {
            return Err(WdlError::eval(
                pos.clone(),
                format!("{} expects 2 operands", self.name()),
            ));
        }
        match (args[0].as_bool(), args[1].as_bool()) {
            (Some(l), Some(r)) => Ok(Value::boolean((self.apply)(l, r))),
            _ => Err(WdlError::eval(
                pos.clone(),
                format!("operands of {} must be Boolean", self.name),
            )),
        }
    }
}

struct NotOperator;

impl Function for NotOperator {
    fn name(&self) -> &str {
        "_not"
    }

    fn infer_type(
        &self,
        pos: &SourcePosition,
        arg_types: &[Type],
    ) -> Result<FunctionSignature, WdlError> {
        let [operand] = arg_types else {
            return Err(WdlError::WrongArity {
                pos: pos.clone(),
                function: "_not".to_string(),
                expected: 1,
            });
        };
        if !operand.coerces(&Type::boolean(false), true) {
            return Err(WdlError::validation(
                pos.clone(),
                format!("operand of ! must be Boolean, not {}", operand),
            ));
        }
        Ok(FunctionSignature::new(
            "_not",
            vec![Type::boolean(false)],
            Type::boolean(false),
        ))
    }

    fn eval(
        &self,
        pos: &SourcePosition,
        args: &[Value],
        _stdlib: &StdLib,
    ) -> Result<Value, WdlError> {
        if args.len() != 1 {
            return Err(WdlError::eval(
                pos.clone(),
                format!("{} expects 1 operand", self.name()),
            ));
        }
        args[0]
            .as_bool()
            .map(|b| Value::boolean(!b))
            .ok_or_else(|| WdlError::eval(pos.clone(), "operand of ! must be Boolean".to_string()))
    }
}

struct NegateOperator;

impl Function for NegateOperator {
    fn name(&self) -> &str {
        "_neg"
    }

    fn infer_type(
        &self,
        pos: &SourcePosition,
        arg_types: &[Type],
    ) -> Result<FunctionSignature, WdlError> {
        let [operand] = arg_types else {
            return Err(WdlError::WrongArity {
                pos: pos.clone(),
                function: "_neg".to_string(),
                expected: 1,
            });
        };
        if !is_numeric(operand) {
            return Err(WdlError::validation(
                pos.clone(),
                format!("operand of unary - must be numeric, not {}", operand),
            ));
        }
        let result = if matches!(operand, Type::Float { .. }) {
            Type::float(false)
        } else {
            Type::int(false)
        };
        Ok(FunctionSignature::new("_neg", vec![operand.clone()], result))
    }

    fn eval(
        &self,
        pos: &SourcePosition,
        args: &[Value],
        _stdlib: &StdLib,
    ) -> Result<Value, WdlError> {
        if args.len() != 1 {
            return Err(WdlError::eval(
                pos.clone(),
                format!("{} expects 1 operand", self.name()),
            ));
        }
        match &args[0] {
            Value::Int { value, .. } => Ok(Value::int(-value)),
            Value::Float { value, .. } => Ok(Value::float(-value)),
            other => Err(WdlError::eval(
                pos.clone(),
                format!("cannot negate {}", other.wdl_type()),
            )),
        }
    }
}
