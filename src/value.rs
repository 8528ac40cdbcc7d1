//! Runtime WDL values.
//!
//! Each value carries its data and its WDL type. Values are immutable once
//! produced by evaluation and carry no source span; errors raised while
//! operating on them are positioned by the evaluating expression.

use crate::error::{SourcePosition, WdlError};
use crate::types::Type;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::fmt;

/// A WDL runtime value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// `None`; also the content of an unset optional.
    Null,

    Boolean { value: bool, wdl_type: Type },

    Int { value: i64, wdl_type: Type },

    Float { value: f64, wdl_type: Type },

    String { value: String, wdl_type: Type },

    File { value: String, wdl_type: Type },

    Directory { value: String, wdl_type: Type },

    Array { values: Vec<Value>, wdl_type: Type },

    /// Key/value entries in source order.
    Map {
        pairs: Vec<(Value, Value)>,
        wdl_type: Type,
    },

    Pair {
        left: Box<Value>,
        right: Box<Value>,
        wdl_type: Type,
    },

    /// A struct, object literal, or call-outputs namespace; which one is
    /// recorded in `wdl_type`.
    Struct {
        members: IndexMap<String, Value>,
        wdl_type: Type,
    },
}

static NULL_TYPE: Lazy<Type> = Lazy::new(Type::none);

impl Value {
    pub fn null() -> Self {
        Value::Null
    }

    pub fn boolean(value: bool) -> Self {
        Value::Boolean {
            value,
            wdl_type: Type::boolean(false),
        }
    }

    pub fn int(value: i64) -> Self {
        Value::Int {
            value,
            wdl_type: Type::int(false),
        }
    }

    pub fn float(value: f64) -> Self {
        Value::Float {
            value,
            wdl_type: Type::float(false),
        }
    }

    pub fn string(value: String) -> Self {
        Value::String {
            value,
            wdl_type: Type::string(false),
        }
    }

    pub fn file(value: String) -> Self {
        Value::File {
            value,
            wdl_type: Type::file(false),
        }
    }

    pub fn directory(value: String) -> Self {
        Value::Directory {
            value,
            wdl_type: Type::directory(false),
        }
    }

    pub fn array(item_type: Type, values: Vec<Value>) -> Self {
        let nonempty = !values.is_empty();
        Value::Array {
            values,
            wdl_type: Type::array(item_type, false, nonempty),
        }
    }

    pub fn map(key_type: Type, value_type: Type, pairs: Vec<(Value, Value)>) -> Self {
        Value::Map {
            pairs,
            wdl_type: Type::map(key_type, value_type, false),
        }
    }

    pub fn pair(left_type: Type, right_type: Type, left: Value, right: Value) -> Self {
        Value::Pair {
            left: Box::new(left),
            right: Box::new(right),
            wdl_type: Type::pair(left_type, right_type, false),
        }
    }

    /// A struct value; omitted optional members are filled with `Null`,
    /// and a missing required member is an error.
    pub fn struct_value(
        struct_type: Type,
        mut members: IndexMap<String, Value>,
    ) -> Result<Self, WdlError> {
        if let Type::StructInstance {
            members: Some(member_types),
            ..
        } = &struct_type
        {
            for (name, member_type) in member_types {
                if !members.contains_key(name) {
                    if member_type.is_optional() {
                        members.insert(name.clone(), Value::null());
                    } else {
                        return Err(WdlError::validation(
                            SourcePosition::unknown(),
                            format!("missing required struct member {}", name),
                        ));
                    }
                }
            }
        }
        Ok(Value::Struct {
            members,
            wdl_type: struct_type,
        })
    }

    /// A struct/object value without member validation.
    pub fn struct_value_unchecked(struct_type: Type, members: IndexMap<String, Value>) -> Self {
        Value::Struct {
            members,
            wdl_type: struct_type,
        }
    }

    pub fn wdl_type(&self) -> &Type {
        match self {
            Value::Null => &NULL_TYPE,
            Value::Boolean { wdl_type, .. }
            | Value::Int { wdl_type, .. }
            | Value::Float { wdl_type, .. }
            | Value::String { wdl_type, .. }
            | Value::File { wdl_type, .. }
            | Value::Directory { wdl_type, .. }
            | Value::Array { wdl_type, .. }
            | Value::Map { wdl_type, .. }
            | Value::Pair { wdl_type, .. }
            | Value::Struct { wdl_type, .. } => wdl_type,
        }
    }

    /// Build a value from JSON, inferring types per the external interface
    /// mapping (numbers split into Int/Float, objects become object values).
    pub fn from_json(json: JsonValue) -> Self {
        match json {
            JsonValue::Null => Value::null(),
            JsonValue::Bool(b) => Value::boolean(b),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::int(i)
                } else {
                    Value::float(n.as_f64().unwrap_or(0.0))
                }
            }
            JsonValue::String(s) => Value::string(s),
            JsonValue::Array(items) => {
                let values: Vec<Value> = items.into_iter().map(Value::from_json).collect();
                let item_type = values
                    .first()
                    .map(|v| v.wdl_type().clone())
                    .unwrap_or_else(Type::any);
                Value::array(item_type, values)
            }
            JsonValue::Object(fields) => {
                let members: IndexMap<String, Value> = fields
                    .into_iter()
                    .map(|(k, v)| (k, Value::from_json(v)))
                    .collect();
                let member_types: IndexMap<String, Type> = members
                    .iter()
                    .map(|(k, v)| (k.clone(), v.wdl_type().clone()))
                    .collect();
                Value::struct_value_unchecked(Type::object(member_types), members)
            }
        }
    }

    /// Build a value from JSON and coerce it to `ty`.
    pub fn from_json_with_type(ty: &Type, json: JsonValue) -> Result<Self, WdlError> {
        Value::from_json(json).coerce(ty)
    }

    /// Serialize per the external interface mapping: Int/Float to numbers,
    /// Map to an object with stringified keys, Pair to `{left,right}`.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::Boolean { value, .. } => JsonValue::Bool(*value),
            Value::Int { value, .. } => JsonValue::Number((*value).into()),
            Value::Float { value, .. } => {
                JsonValue::Number(serde_json::Number::from_f64(*value).unwrap_or_else(|| 0.into()))
            }
            Value::String { value, .. }
            | Value::File { value, .. }
            | Value::Directory { value, .. } => JsonValue::String(value.clone()),
            Value::Array { values, .. } => {
                JsonValue::Array(values.iter().map(|v| v.to_json()).collect())
            }
            Value::Map { pairs, .. } => {
                let mut fields = JsonMap::new();
                for (k, v) in pairs {
                    fields.insert(k.canonical_string(), v.to_json());
                }
                JsonValue::Object(fields)
            }
            Value::Pair { left, right, .. } => {
                let mut fields = JsonMap::new();
                fields.insert("left".to_string(), left.to_json());
                fields.insert("right".to_string(), right.to_json());
                JsonValue::Object(fields)
            }
            Value::Struct { members, .. } => JsonValue::Object(
                members
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }

    /// The canonical string form used for command materialization:
    /// base-10 numerals, `true`/`false`, raw path/string text.
    pub fn canonical_string(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Boolean { value, .. } => {
                if *value {
                    "true".to_string()
                } else {
                    "false".to_string()
                }
            }
            Value::Int { value, .. } => value.to_string(),
            Value::Float { value, .. } => format_float(*value),
            Value::String { value, .. }
            | Value::File { value, .. }
            | Value::Directory { value, .. } => value.clone(),
            other => other.to_string(),
        }
    }

    /// Coerce this value to `desired`, recursively for compound values.
    pub fn coerce(&self, desired: &Type) -> Result<Value, WdlError> {
        if self.wdl_type() == desired {
            return Ok(self.clone());
        }
        match self {
            Value::Array { .. } => self.coerce_array(desired),
            Value::Map { .. } => self.coerce_map(desired),
            Value::Pair { .. } => self.coerce_pair(desired),
            Value::Struct { .. } => self.coerce_struct(desired),
            _ => self.coerce_base(desired),
        }
    }

    fn coerce_base(&self, desired: &Type) -> Result<Value, WdlError> {
        if let Type::String { .. } = desired {
            if matches!(self, Value::Null) && desired.is_optional() {
                return Ok(self.clone());
            }
            if !matches!(self, Value::Null) {
                return Ok(Value::string(self.canonical_string()));
            }
        }

        match (self, desired) {
            (Value::Null, ty) => {
                if ty.is_optional() || matches!(ty, Type::Any { .. }) {
                    Ok(self.clone())
                } else {
                    Err(WdlError::NullValue {
                        pos: SourcePosition::unknown(),
                    })
                }
            }
            (Value::Int { value, .. }, Type::Float { .. }) => Ok(Value::float(*value as f64)),
            (Value::String { value, .. }, Type::File { .. }) => Ok(Value::file(value.clone())),
            (Value::String { value, .. }, Type::Directory { .. }) => {
                Ok(Value::directory(value.clone()))
            }
            (Value::File { value, .. }, Type::String { .. }) => Ok(Value::string(value.clone())),
            // Lenient runtime parses, for JSON/file-content inputs.
            (Value::String { value, .. }, Type::Int { .. }) => {
                value.trim().parse::<i64>().map(Value::int).map_err(|_| {
                    WdlError::eval(
                        SourcePosition::unknown(),
                        format!("cannot coerce '{}' to Int", value),
                    )
                })
            }
            (Value::String { value, .. }, Type::Float { .. }) => {
                value.trim().parse::<f64>().map(Value::float).map_err(|_| {
                    WdlError::eval(
                        SourcePosition::unknown(),
                        format!("cannot coerce '{}' to Float", value),
                    )
                })
            }
            _ if self.wdl_type().coerces(desired, true) => Ok(self.clone()),
            _ => Err(WdlError::eval(
                SourcePosition::unknown(),
                format!("cannot coerce {} to {}", self.wdl_type(), desired),
            )),
        }
    }

    fn coerce_array(&self, desired: &Type) -> Result<Value, WdlError> {
        let Value::Array { values, .. } = self else {
            return Err(WdlError::internal(None, "Value::Array", "coerce_array on non-array"));
        };
        match desired {
            Type::Array {
                item_type, nonempty, ..
            } => {
                if *nonempty && values.is_empty() {
                    return Err(WdlError::EmptyArray {
                        pos: SourcePosition::unknown(),
                    });
                }
                let coerced: Result<Vec<_>, _> = values.iter().map(|v| v.coerce(item_type)).collect();
                let mut out = Value::array(item_type.as_ref().clone(), coerced?);
                if let Value::Array { wdl_type, .. } = &mut out {
                    *wdl_type = wdl_type.clone().with_nonempty(*nonempty);
                }
                Ok(out)
            }
            _ => self.coerce_base(desired),
        }
    }

    fn coerce_map(&self, desired: &Type) -> Result<Value, WdlError> {
        let Value::Map { pairs, .. } = self else {
            return Err(WdlError::internal(None, "Value::Map", "coerce_map on non-map"));
        };
        match desired {
            Type::Map {
                key_type,
                value_type,
                ..
            } => {
                let coerced: Result<Vec<_>, _> = pairs
                    .iter()
                    .map(|(k, v)| Ok((k.coerce(key_type)?, v.coerce(value_type)?)))
                    .collect();
                Ok(Value::map(
                    key_type.as_ref().clone(),
                    value_type.as_ref().clone(),
                    coerced?,
                ))
            }
            Type::StructInstance {
                members: Some(member_types),
                ..
            } => {
                let mut members = IndexMap::new();
                for (key, value) in pairs {
                    let name = key.canonical_string();
                    match member_types.get(&name) {
                        Some(member_type) => {
                            members.insert(name, value.coerce(member_type)?);
                        }
                        None => {
                            return Err(WdlError::validation(
                                SourcePosition::unknown(),
                                format!("map key {} does not name a struct member", name),
                            ))
                        }
                    }
                }
                Value::struct_value(desired.clone(), members)
            }
            _ => self.coerce_base(desired),
        }
    }

    fn coerce_pair(&self, desired: &Type) -> Result<Value, WdlError> {
        let Value::Pair { left, right, .. } = self else {
            return Err(WdlError::internal(None, "Value::Pair", "coerce_pair on non-pair"));
        };
        match desired {
            Type::Pair {
                left_type,
                right_type,
                ..
            } => Ok(Value::pair(
                left_type.as_ref().clone(),
                right_type.as_ref().clone(),
                left.coerce(left_type)?,
                right.coerce(right_type)?,
            )),
            _ => self.coerce_base(desired),
        }
    }

    fn coerce_struct(&self, desired: &Type) -> Result<Value, WdlError> {
        let Value::Struct { members, .. } = self else {
            return Err(WdlError::internal(None, "Value::Struct", "coerce_struct on non-struct"));
        };
        match desired {
            Type::StructInstance {
                members: member_types,
                ..
            } => {
                let mut coerced = IndexMap::new();
                match member_types {
                    Some(member_types) => {
                        for (name, member_type) in member_types {
                            match members.get(name) {
                                Some(value) => {
                                    coerced.insert(name.clone(), value.coerce(member_type)?);
                                }
                                None if member_type.is_optional() => {
                                    coerced.insert(name.clone(), Value::null());
                                }
                                None => {
                                    return Err(WdlError::validation(
                                        SourcePosition::unknown(),
                                        format!("missing required struct member {}", name),
                                    ))
                                }
                            }
                        }
                    }
                    None => coerced = members.clone(),
                }
                Value::struct_value(desired.clone(), coerced)
            }
            Type::Object {
                members: member_types,
                ..
            } => {
                let mut coerced = IndexMap::new();
                if member_types.is_empty() {
                    coerced = members.clone();
                } else {
                    for (name, member_type) in member_types {
                        match members.get(name) {
                            Some(value) => {
                                coerced.insert(name.clone(), value.coerce(member_type)?);
                            }
                            None if member_type.is_optional() => {
                                coerced.insert(name.clone(), Value::null());
                            }
                            None => {
                                return Err(WdlError::validation(
                                    SourcePosition::unknown(),
                                    format!("missing required object member {}", name),
                                ))
                            }
                        }
                    }
                }
                Ok(Value::struct_value_unchecked(desired.clone(), coerced))
            }
            Type::Map {
                key_type,
                value_type,
                ..
            } => {
                let pairs: Result<Vec<_>, _> = members
                    .iter()
                    .map(|(k, v)| {
                        Ok((
                            Value::string(k.clone()).coerce(key_type)?,
                            v.coerce(value_type)?,
                        ))
                    })
                    .collect();
                Ok(Value::map(
                    key_type.as_ref().clone(),
                    value_type.as_ref().clone(),
                    pairs?,
                ))
            }
            _ => self.coerce_base(desired),
        }
    }

    /// Structural equality. Int and Float cross-compare numerically, files
    /// compare as strings, maps compare as key/value sets regardless of
    /// entry order, and struct/object values compare by field name.
    pub fn equals(&self, other: &Value) -> Result<bool, WdlError> {
        if !self.wdl_type().equatable(other.wdl_type(), false) {
            return Err(WdlError::validation(
                SourcePosition::unknown(),
                format!("cannot compare {} with {}", self.wdl_type(), other.wdl_type()),
            ));
        }
        Ok(self.equals_inner(other))
    }

    fn equals_inner(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean { value: a, .. }, Value::Boolean { value: b, .. }) => a == b,
            (Value::Int { value: a, .. }, Value::Int { value: b, .. }) => a == b,
            (Value::Float { value: a, .. }, Value::Float { value: b, .. }) => a == b,
            (Value::Int { value: a, .. }, Value::Float { value: b, .. }) => (*a as f64) == *b,
            (Value::Float { value: a, .. }, Value::Int { value: b, .. }) => *a == (*b as f64),
            (
                Value::String { value: a, .. } | Value::File { value: a, .. } | Value::Directory { value: a, .. },
                Value::String { value: b, .. } | Value::File { value: b, .. } | Value::Directory { value: b, .. },
            ) => a == b,
            (Value::Array { values: a, .. }, Value::Array { values: b, .. }) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.equals_inner(y))
            }
            (
                Value::Pair { left: al, right: ar, .. },
                Value::Pair { left: bl, right: br, .. },
            ) => al.equals_inner(bl) && ar.equals_inner(br),
            (Value::Map { pairs: a, .. }, Value::Map { pairs: b, .. }) => {
                // Order-independent: same size, and every entry of `a` has a
                // matching key in `b` with an equal value.
                a.len() == b.len()
                    && a.iter().all(|(ak, av)| {
                        b.iter()
                            .any(|(bk, bv)| ak.equals_inner(bk) && av.equals_inner(bv))
                    })
            }
            (Value::Struct { members: a, .. }, Value::Struct { members: b, .. }) => {
                a.len() == b.len()
                    && a.iter()
                        .all(|(name, av)| b.get(name).is_some_and(|bv| av.equals_inner(bv)))
            }
            _ => false,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean { value, .. } => Some(*value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int { value, .. } => Some(*value),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float { value, .. } => Some(*value),
            Value::Int { value, .. } => Some(*value as f64),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            Value::String { value, .. }
            | Value::File { value, .. }
            | Value::Directory { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array { values, .. } => Some(values),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Struct { members, .. } => Some(members),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

/// Base-10 float rendering; whole values keep one fractional digit so they
/// read back as floats.
fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "None"),
            Value::Boolean { .. } | Value::Int { .. } | Value::Float { .. } => {
                write!(f, "{}", self.canonical_string())
            }
            Value::String { value, .. }
            | Value::File { value, .. }
            | Value::Directory { value, .. } => write!(f, "\"{}\"", value),
            Value::Array { values, .. } => {
                let items: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", items.join(", "))
            }
            Value::Map { pairs, .. } => {
                let items: Vec<String> =
                    pairs.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
                write!(f, "{{{}}}", items.join(", "))
            }
            Value::Pair { left, right, .. } => write!(f, "({}, {})", left, right),
            Value::Struct { members, .. } => {
                let items: Vec<String> = members
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k, v))
                    .collect();
                write!(f, "{{{}}}", items.join(", "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_creation_and_accessors() {
        assert_eq!(Value::boolean(true).as_bool(), Some(true));
        assert_eq!(Value::int(42).as_int(), Some(42));
        assert_eq!(Value::int(42).as_float(), Some(42.0));
        assert_eq!(Value::string("hi".to_string()).as_string(), Some("hi"));
        assert!(Value::null().is_null());
    }

    #[test]
    fn test_canonical_strings() {
        assert_eq!(Value::int(3).canonical_string(), "3");
        assert_eq!(Value::float(3.0).canonical_string(), "3.0");
        assert_eq!(Value::float(2.5).canonical_string(), "2.5");
        assert_eq!(Value::boolean(false).canonical_string(), "false");
        assert_eq!(Value::file("a/b.txt".to_string()).canonical_string(), "a/b.txt");
    }

    #[test]
    fn test_json_round_trip() {
        let array = Value::array(Type::int(false), vec![Value::int(1), Value::int(2)]);
        assert_eq!(array.to_json(), json!([1, 2]));

        let from = Value::from_json(json!({"name": "x", "n": 3, "ok": true}));
        let members = from.as_struct().unwrap();
        assert_eq!(members.get("name").unwrap().as_string(), Some("x"));
        assert_eq!(members.get("n").unwrap().as_int(), Some(3));
        assert_eq!(members.get("ok").unwrap().as_bool(), Some(true));
    }

    #[test]
    fn test_from_json_with_type() {
        let value = Value::from_json_with_type(
            &Type::array(Type::float(false), false, false),
            json!([1, 2.5]),
        )
        .unwrap();
        let items = value.as_array().unwrap();
        assert_eq!(items[0].as_float(), Some(1.0));
        assert!(matches!(items[0], Value::Float { .. }));

        assert!(Value::from_json_with_type(&Type::int(false), json!("oops")).is_err());
    }

    #[test]
    fn test_map_json_stringifies_keys() {
        let map = Value::map(
            Type::int(false),
            Type::string(false),
            vec![(Value::int(1), Value::string("one".to_string()))],
        );
        assert_eq!(map.to_json(), json!({"1": "one"}));
    }

    #[test]
    fn test_pair_json() {
        let pair = Value::pair(
            Type::int(false),
            Type::string(false),
            Value::int(42),
            Value::string("x".to_string()),
        );
        assert_eq!(pair.to_json(), json!({"left": 42, "right": "x"}));
    }

    #[test]
    fn test_coercions() {
        assert_eq!(
            Value::int(42).coerce(&Type::float(false)).unwrap().as_float(),
            Some(42.0)
        );
        assert_eq!(
            Value::int(42).coerce(&Type::string(false)).unwrap().as_string(),
            Some("42")
        );
        assert!(matches!(
            Value::string("p.txt".to_string()).coerce(&Type::file(false)).unwrap(),
            Value::File { .. }
        ));
        assert!(Value::null().coerce(&Type::int(true)).is_ok());
        assert!(Value::null().coerce(&Type::int(false)).is_err());
    }

    #[test]
    fn test_array_coercion_and_nonempty() {
        let ints = Value::array(Type::int(false), vec![Value::int(1), Value::int(2)]);
        let floats = ints.coerce(&Type::array(Type::float(false), false, false)).unwrap();
        assert_eq!(floats.as_array().unwrap()[0].as_float(), Some(1.0));

        let empty = Value::array(Type::int(false), vec![]);
        assert!(matches!(
            empty.coerce(&Type::array(Type::int(false), false, true)),
            Err(WdlError::EmptyArray { .. })
        ));
    }

    #[test]
    fn test_equality_numeric_and_string() {
        assert!(Value::int(42).equals(&Value::int(42)).unwrap());
        assert!(Value::int(42).equals(&Value::float(42.0)).unwrap());
        assert!(!Value::int(42).equals(&Value::int(43)).unwrap());
        assert!(Value::file("x".to_string())
            .equals(&Value::string("x".to_string()))
            .unwrap());
        assert!(Value::int(1).equals(&Value::boolean(true)).is_err());
    }

    #[test]
    fn test_map_equality_order_independent() {
        let forward = Value::map(
            Type::string(false),
            Type::int(false),
            vec![
                (Value::string("a".to_string()), Value::int(1)),
                (Value::string("b".to_string()), Value::int(2)),
            ],
        );
        let backward = Value::map(
            Type::string(false),
            Type::int(false),
            vec![
                (Value::string("b".to_string()), Value::int(2)),
                (Value::string("a".to_string()), Value::int(1)),
            ],
        );
        assert!(forward.equals(&backward).unwrap());

        let different = Value::map(
            Type::string(false),
            Type::int(false),
            vec![
                (Value::string("a".to_string()), Value::int(1)),
                (Value::string("b".to_string()), Value::int(3)),
            ],
        );
        assert!(!forward.equals(&different).unwrap());
    }

    #[test]
    fn test_struct_member_fill() {
        let mut member_types = IndexMap::new();
        member_types.insert("a".to_string(), Type::int(false));
        member_types.insert("b".to_string(), Type::string(true));
        let struct_type = Type::StructInstance {
            type_name: "S".to_string(),
            members: Some(member_types),
            optional: false,
        };

        let mut members = IndexMap::new();
        members.insert("a".to_string(), Value::int(7));
        let value = Value::struct_value(struct_type.clone(), members).unwrap();
        assert!(value.as_struct().unwrap().get("b").unwrap().is_null());

        assert!(Value::struct_value(struct_type, IndexMap::new()).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::int(42).to_string(), "42");
        assert_eq!(Value::string("hi".to_string()).to_string(), "\"hi\"");
        assert_eq!(Value::null().to_string(), "None");
        let arr = Value::array(Type::int(false), vec![Value::int(1), Value::int(2)]);
        assert_eq!(arr.to_string(), "[1, 2]");
    }
}
