//! The WDL type lattice.
//!
//! WDL has atomic types (`Int`, `Boolean`, `String`, ...) and parametric
//! types (`Array[String]`, `Map[String,Array[Float]]`, `Pair[Int,File]`).
//! Each type is an immutable instance of [`Type`].
//!
//! Coercion is a directional relation:
//! 1. `Int` coerces to `Float` and `String`
//! 2. `Float` and `Boolean` coerce to `String`
//! 3. `String` coerces to `File` and `Directory` (questionable outside
//!    output sections)
//! 4. `File` coerces to `String`
//! 5. `T` coerces to `T?` but not the reverse
//! 6. `Array[T]+` coerces to `Array[T]`; element/key/value/component
//!    positions are covariant
//! 7. `Object` coerces to any struct whose members are pairwise coercible
//!
//! Optionality is a flag on every variant, so a doubly-optional type is
//! unrepresentable: `T??` flattens on construction.

use crate::error::{SourcePosition, WdlError};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// A WDL type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Type {
    /// Top of the lattice; also the placeholder for empty literals and
    /// unresolvable nodes. `Any?` (optional) is the type of `None`.
    Any { optional: bool },

    Boolean { optional: bool },

    Int { optional: bool },

    Float { optional: bool },

    String { optional: bool },

    /// A filesystem path.
    File { optional: bool },

    /// A directory path (WDL >= 2.0).
    Directory { optional: bool },

    Array {
        item_type: Box<Type>,
        optional: bool,
        nonempty: bool,
    },

    Map {
        key_type: Box<Type>,
        value_type: Box<Type>,
        optional: bool,
        /// String keys observed on a map literal; lets the literal coerce
        /// to a struct with those members.
        literal_keys: Option<HashSet<String>>,
    },

    Pair {
        left_type: Box<Type>,
        right_type: Box<Type>,
        optional: bool,
    },

    /// A named struct. `members` is `None` until the checker resolves the
    /// name against the document's struct definitions.
    StructInstance {
        type_name: String,
        members: Option<IndexMap<String, Type>>,
        optional: bool,
    },

    /// An anonymous member bag: `object { ... }` literals, and call outputs
    /// (`is_call_output`) bound under the call's alias.
    Object {
        members: IndexMap<String, Type>,
        is_call_output: bool,
    },
}

impl Type {
    pub fn any() -> Self {
        Type::Any { optional: false }
    }

    /// The type of `None` (optional Any).
    pub fn none() -> Self {
        Type::Any { optional: true }
    }

    pub fn boolean(optional: bool) -> Self {
        Type::Boolean { optional }
    }

    pub fn int(optional: bool) -> Self {
        Type::Int { optional }
    }

    pub fn float(optional: bool) -> Self {
        Type::Float { optional }
    }

    pub fn string(optional: bool) -> Self {
        Type::String { optional }
    }

    pub fn file(optional: bool) -> Self {
        Type::File { optional }
    }

    pub fn directory(optional: bool) -> Self {
        Type::Directory { optional }
    }

    pub fn array(item_type: Type, optional: bool, nonempty: bool) -> Self {
        Type::Array {
            item_type: Box::new(item_type),
            optional,
            nonempty,
        }
    }

    pub fn map(key_type: Type, value_type: Type, optional: bool) -> Self {
        Type::Map {
            key_type: Box::new(key_type),
            value_type: Box::new(value_type),
            optional,
            literal_keys: None,
        }
    }

    pub fn map_with_keys(
        key_type: Type,
        value_type: Type,
        optional: bool,
        literal_keys: HashSet<String>,
    ) -> Self {
        Type::Map {
            key_type: Box::new(key_type),
            value_type: Box::new(value_type),
            optional,
            literal_keys: Some(literal_keys),
        }
    }

    pub fn pair(left_type: Type, right_type: Type, optional: bool) -> Self {
        Type::Pair {
            left_type: Box::new(left_type),
            right_type: Box::new(right_type),
            optional,
        }
    }

    pub fn struct_instance(type_name: String, optional: bool) -> Self {
        Type::StructInstance {
            type_name,
            members: None,
            optional,
        }
    }

    pub fn object(members: IndexMap<String, Type>) -> Self {
        Type::Object {
            members,
            is_call_output: false,
        }
    }

    /// The outputs namespace of a resolved call.
    pub fn call_output(members: IndexMap<String, Type>) -> Self {
        Type::Object {
            members,
            is_call_output: true,
        }
    }

    pub fn is_optional(&self) -> bool {
        match self {
            Type::Any { optional }
            | Type::Boolean { optional }
            | Type::Int { optional }
            | Type::Float { optional }
            | Type::String { optional }
            | Type::File { optional }
            | Type::Directory { optional }
            | Type::Array { optional, .. }
            | Type::Map { optional, .. }
            | Type::Pair { optional, .. }
            | Type::StructInstance { optional, .. } => *optional,
            Type::Object { .. } => false,
        }
    }

    pub fn is_nonempty(&self) -> bool {
        matches!(self, Type::Array { nonempty: true, .. })
    }

    /// Copy with the optional flag replaced. Setting `true` on an already
    /// optional type is a no-op: optionals flatten.
    pub fn with_optional(mut self, optional: bool) -> Self {
        match &mut self {
            Type::Any { optional: opt }
            | Type::Boolean { optional: opt }
            | Type::Int { optional: opt }
            | Type::Float { optional: opt }
            | Type::String { optional: opt }
            | Type::File { optional: opt }
            | Type::Directory { optional: opt }
            | Type::Array { optional: opt, .. }
            | Type::Map { optional: opt, .. }
            | Type::Pair { optional: opt, .. }
            | Type::StructInstance { optional: opt, .. } => *opt = optional,
            Type::Object { .. } => {}
        }
        self
    }

    pub fn with_nonempty(mut self, nonempty: bool) -> Self {
        if let Type::Array { nonempty: ne, .. } = &mut self {
            *ne = nonempty;
        }
        self
    }

    /// Immediate type parameters (array item, map key/value, pair sides,
    /// struct/object members).
    pub fn parameters(&self) -> Vec<&Type> {
        match self {
            Type::Array { item_type, .. } => vec![item_type],
            Type::Map {
                key_type,
                value_type,
                ..
            } => vec![key_type, value_type],
            Type::Pair {
                left_type,
                right_type,
                ..
            } => vec![left_type, right_type],
            Type::StructInstance {
                members: Some(m), ..
            } => m.values().collect(),
            Type::Object { members, .. } => members.values().collect(),
            _ => vec![],
        }
    }

    /// Whether `self` coerces to `rhs`. With `check_quant`, an optional
    /// source may not feed a non-optional target.
    pub fn coerces(&self, rhs: &Type, check_quant: bool) -> bool {
        self.check_coercion(rhs, check_quant).is_ok()
    }

    /// `String -> File/Directory` is admitted but questionable outside task
    /// output sections; the checker warns on it.
    pub fn questionable_coercion(&self, rhs: &Type) -> bool {
        matches!(
            (self, rhs),
            (Type::String { .. }, Type::File { .. }) | (Type::String { .. }, Type::Directory { .. })
        )
    }

    /// Check the coercion `self -> rhs`, with a detailed error on failure.
    pub fn check_coercion(&self, rhs: &Type, check_quant: bool) -> Result<(), WdlError> {
        // Any coerces both ways (modulo optionality).
        if matches!(self, Type::Any { .. }) || matches!(rhs, Type::Any { .. }) {
            return self.check_optional(rhs, check_quant);
        }

        match (self, rhs) {
            (Type::Boolean { .. }, Type::Boolean { .. })
            | (Type::Int { .. }, Type::Int { .. })
            | (Type::Float { .. }, Type::Float { .. })
            | (Type::String { .. }, Type::String { .. })
            | (Type::File { .. }, Type::File { .. })
            | (Type::Directory { .. }, Type::Directory { .. }) => {
                self.check_optional(rhs, check_quant)
            }

            (Type::Int { .. }, Type::Float { .. }) => self.check_optional(rhs, check_quant),

            (
                Type::Boolean { .. } | Type::Int { .. } | Type::Float { .. } | Type::File { .. },
                Type::String { .. },
            ) => self.check_optional(rhs, check_quant),

            (Type::String { .. }, Type::File { .. } | Type::Directory { .. }) => {
                self.check_optional(rhs, check_quant)
            }

            (
                Type::Array {
                    item_type: lhs_item,
                    ..
                },
                Type::Array {
                    item_type: rhs_item,
                    ..
                },
            ) => {
                lhs_item.check_coercion(rhs_item, check_quant)?;
                self.check_optional(rhs, check_quant)
            }

            (
                Type::Map {
                    key_type: lhs_k,
                    value_type: lhs_v,
                    literal_keys,
                    ..
                },
                _,
            ) => match rhs {
                Type::Map {
                    key_type: rhs_k,
                    value_type: rhs_v,
                    ..
                } => {
                    lhs_k.check_coercion(rhs_k, check_quant)?;
                    lhs_v.check_coercion(rhs_v, check_quant)?;
                    self.check_optional(rhs, check_quant)
                }
                // A map literal with known string keys may initialize a struct.
                Type::StructInstance {
                    members: Some(struct_members),
                    ..
                } => match literal_keys {
                    Some(keys) => {
                        self.check_struct_members(keys, lhs_v, struct_members, check_quant)
                    }
                    None => Err(coercion_failure(self, rhs)),
                },
                Type::Object { members, .. } => {
                    lhs_k.check_coercion(&Type::string(false), check_quant)?;
                    for member_type in members.values() {
                        lhs_v.check_coercion(member_type, check_quant)?;
                    }
                    Ok(())
                }
                _ => Err(coercion_failure(self, rhs)),
            },

            (
                Type::Pair {
                    left_type: lhs_l,
                    right_type: lhs_r,
                    ..
                },
                Type::Pair {
                    left_type: rhs_l,
                    right_type: rhs_r,
                    ..
                },
            ) => {
                lhs_l.check_coercion(rhs_l, check_quant)?;
                lhs_r.check_coercion(rhs_r, check_quant)?;
                self.check_optional(rhs, check_quant)
            }

            (
                Type::StructInstance {
                    type_name: lhs_name,
                    members: lhs_members,
                    ..
                },
                Type::StructInstance {
                    type_name: rhs_name,
                    members: rhs_members,
                    ..
                },
            ) => {
                // Struct identity is structural: same member names and types.
                if let (Some(lhs_m), Some(rhs_m)) = (lhs_members, rhs_members) {
                    if struct_type_id(lhs_m) != struct_type_id(rhs_m) {
                        return Err(WdlError::type_mismatch(
                            SourcePosition::unknown(),
                            rhs_name.clone(),
                            lhs_name.clone(),
                        ));
                    }
                }
                self.check_optional(rhs, check_quant)
            }

            (
                Type::Object { members, .. },
                Type::StructInstance {
                    members: Some(struct_members),
                    ..
                },
            ) => {
                let keys: HashSet<String> = members.keys().cloned().collect();
                for (name, member_type) in members {
                    if let Some(target) = struct_members.get(name) {
                        member_type.check_coercion(target, check_quant)?;
                    }
                }
                self.check_struct_members(&keys, &Type::any(), struct_members, check_quant)
            }

            (
                Type::Object { members, .. },
                Type::Map {
                    key_type,
                    value_type,
                    ..
                },
            ) => {
                Type::string(false).check_coercion(key_type, check_quant)?;
                for member_type in members.values() {
                    member_type.check_coercion(value_type, check_quant)?;
                }
                Ok(())
            }

            (
                Type::Object {
                    members: lhs_members,
                    ..
                },
                Type::Object {
                    members: rhs_members,
                    ..
                },
            ) => {
                for (name, rhs_type) in rhs_members {
                    match lhs_members.get(name) {
                        Some(lhs_type) => lhs_type.check_coercion(rhs_type, check_quant)?,
                        None => {
                            return Err(WdlError::validation(
                                SourcePosition::unknown(),
                                format!("object missing required member {}", name),
                            ))
                        }
                    }
                }
                Ok(())
            }

            _ => Err(coercion_failure(self, rhs)),
        }
    }

    fn check_optional(&self, rhs: &Type, check_quant: bool) -> Result<(), WdlError> {
        if check_quant && self.is_optional() && !rhs.is_optional() && !matches!(rhs, Type::Any { .. })
        {
            Err(WdlError::type_mismatch(
                SourcePosition::unknown(),
                rhs.to_string(),
                self.to_string(),
            ))
        } else {
            Ok(())
        }
    }

    fn check_struct_members(
        &self,
        literal_keys: &HashSet<String>,
        value_type: &Type,
        struct_members: &IndexMap<String, Type>,
        check_quant: bool,
    ) -> Result<(), WdlError> {
        let missing: Vec<&String> = struct_members
            .iter()
            .filter(|(name, ty)| !ty.is_optional() && !literal_keys.contains(*name))
            .map(|(name, _)| name)
            .collect();
        if !missing.is_empty() {
            return Err(WdlError::validation(
                SourcePosition::unknown(),
                format!(
                    "missing non-optional struct member(s): {}",
                    missing
                        .iter()
                        .map(|s| s.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            ));
        }
        for key in literal_keys {
            if let Some(member_type) = struct_members.get(key) {
                value_type.check_coercion(member_type, check_quant)?;
            }
        }
        Ok(())
    }

    /// Whether values of these types can be compared with `==`/`!=`.
    pub fn equatable(&self, rhs: &Type, compound: bool) -> bool {
        let _ = compound;
        match (self, rhs) {
            (Type::Any { .. }, _) | (_, Type::Any { .. }) => true,

            (Type::Int { .. }, Type::Float { .. }) | (Type::Float { .. }, Type::Int { .. }) => true,

            // File values substitute as strings.
            (Type::File { .. }, Type::String { .. }) | (Type::String { .. }, Type::File { .. }) => {
                true
            }

            (Type::Boolean { .. }, Type::Boolean { .. })
            | (Type::Int { .. }, Type::Int { .. })
            | (Type::Float { .. }, Type::Float { .. })
            | (Type::String { .. }, Type::String { .. })
            | (Type::File { .. }, Type::File { .. })
            | (Type::Directory { .. }, Type::Directory { .. }) => true,

            (Type::Array { item_type: a, .. }, Type::Array { item_type: b, .. }) => {
                a.equatable(b, true)
            }
            (
                Type::Map {
                    key_type: ak,
                    value_type: av,
                    ..
                },
                Type::Map {
                    key_type: bk,
                    value_type: bv,
                    ..
                },
            ) => ak.equatable(bk, true) && av.equatable(bv, true),
            (
                Type::Pair {
                    left_type: al,
                    right_type: ar,
                    ..
                },
                Type::Pair {
                    left_type: bl,
                    right_type: br,
                    ..
                },
            ) => al.equatable(bl, true) && ar.equatable(br, true),
            (
                Type::StructInstance {
                    members: Some(a), ..
                },
                Type::StructInstance {
                    members: Some(b), ..
                },
            ) => struct_type_id(a) == struct_type_id(b),
            // Objects equate structurally by field name.
            (Type::Object { members: a, .. }, Type::Object { members: b, .. }) => {
                a.len() == b.len()
                    && a.iter()
                        .all(|(name, ty)| b.get(name).is_some_and(|other| ty.equatable(other, true)))
            }
            _ => false,
        }
    }

    /// Whether values of these types can be ordered with `<`, `<=`, `>`, `>=`.
    pub fn comparable(&self, rhs: &Type, check_quant: bool) -> bool {
        if check_quant && (self.is_optional() || rhs.is_optional()) {
            return false;
        }
        match (self, rhs) {
            (Type::Int { .. } | Type::Float { .. }, Type::Int { .. } | Type::Float { .. }) => true,
            (Type::String { .. }, Type::String { .. }) => true,
            (Type::File { .. }, Type::File { .. }) => true,
            (Type::Boolean { .. }, Type::Boolean { .. }) => true,
            _ => false,
        }
    }

    /// Replace unresolved struct names with their member maps, recursively.
    pub fn resolve_structs(
        &self,
        typedefs: &IndexMap<String, IndexMap<String, Type>>,
    ) -> Result<Type, WdlError> {
        match self {
            Type::StructInstance {
                type_name,
                members: None,
                optional,
            } => match typedefs.get(type_name) {
                Some(members) => Ok(Type::StructInstance {
                    type_name: type_name.clone(),
                    members: Some(members.clone()),
                    optional: *optional,
                }),
                None => Err(WdlError::validation(
                    SourcePosition::unknown(),
                    format!("unknown struct type {}", type_name),
                )),
            },
            Type::Array {
                item_type,
                optional,
                nonempty,
            } => Ok(Type::Array {
                item_type: Box::new(item_type.resolve_structs(typedefs)?),
                optional: *optional,
                nonempty: *nonempty,
            }),
            Type::Map {
                key_type,
                value_type,
                optional,
                literal_keys,
            } => Ok(Type::Map {
                key_type: Box::new(key_type.resolve_structs(typedefs)?),
                value_type: Box::new(value_type.resolve_structs(typedefs)?),
                optional: *optional,
                literal_keys: literal_keys.clone(),
            }),
            Type::Pair {
                left_type,
                right_type,
                optional,
            } => Ok(Type::Pair {
                left_type: Box::new(left_type.resolve_structs(typedefs)?),
                right_type: Box::new(right_type.resolve_structs(typedefs)?),
                optional: *optional,
            }),
            _ => Ok(self.clone()),
        }
    }
}

fn coercion_failure(lhs: &Type, rhs: &Type) -> WdlError {
    WdlError::type_mismatch(SourcePosition::unknown(), rhs.to_string(), lhs.to_string())
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let base = match self {
            Type::Any { optional: true } => "None".to_string(),
            Type::Any { .. } => "Any".to_string(),
            Type::Boolean { .. } => "Boolean".to_string(),
            Type::Int { .. } => "Int".to_string(),
            Type::Float { .. } => "Float".to_string(),
            Type::String { .. } => "String".to_string(),
            Type::File { .. } => "File".to_string(),
            Type::Directory { .. } => "Directory".to_string(),
            Type::Array {
                item_type, nonempty, ..
            } => format!("Array[{}]{}", item_type, if *nonempty { "+" } else { "" }),
            Type::Map {
                key_type,
                value_type,
                ..
            } => format!("Map[{},{}]", key_type, value_type),
            Type::Pair {
                left_type,
                right_type,
                ..
            } => format!("Pair[{},{}]", left_type, right_type),
            Type::StructInstance { type_name, .. } => type_name.clone(),
            Type::Object { members, .. } => {
                let mut fields: Vec<String> =
                    members.iter().map(|(k, v)| format!("{} : {}", k, v)).collect();
                fields.sort();
                format!("object({})", fields.join(", "))
            }
        };
        let suffix = if self.is_optional() && !matches!(self, Type::Any { optional: true }) {
            "?"
        } else {
            ""
        };
        write!(f, "{}{}", base, suffix)
    }
}

/// Canonical identity of a struct, independent of member order.
pub fn struct_type_id(members: &IndexMap<String, Type>) -> String {
    let mut fields: Vec<String> = members
        .iter()
        .map(|(name, ty)| {
            let type_str = if let Type::StructInstance {
                members: Some(nested),
                ..
            } = ty
            {
                format!(
                    "{}{}",
                    struct_type_id(nested),
                    if ty.is_optional() { "?" } else { "" }
                )
            } else {
                ty.to_string()
            };
            format!("{} : {}", name, type_str)
        })
        .collect();
    fields.sort();
    format!("struct({})", fields.join(", "))
}

/// Least upper bound of `types` under coercion; `Any` if none exists.
///
/// With `force_string`, a set with no other upper bound but where every
/// member stringifies unifies to `String` (placeholder contexts).
pub fn unify_types(types: Vec<&Type>, check_quant: bool, force_string: bool) -> Type {
    if types.is_empty() {
        return Type::any();
    }

    // Seed with the first type that is not String/Any so Int+Float can
    // promote before a String forces concatenation semantics.
    let mut unified = (*types
        .iter()
        .find(|t| !matches!(t, Type::String { .. } | Type::Any { .. }))
        .unwrap_or(&types[0]))
    .clone();

    let mut optional = false;
    let mut all_nonempty = true;
    let mut all_stringifiable = true;

    for ty in &types {
        if ty.is_optional() {
            optional = true;
        }
        if !ty.is_nonempty() {
            all_nonempty = false;
        }
        if !ty.coerces(&Type::string(true), check_quant) {
            all_stringifiable = false;
        }
        if matches!((&unified, ty), (Type::Int { .. }, Type::Float { .. })) {
            unified = Type::float(false);
        }
        if matches!(ty, Type::String { .. })
            && !matches!(
                &unified,
                Type::Array { .. } | Type::Pair { .. } | Type::Map { .. }
            )
        {
            unified = Type::string(false);
        }
    }

    if matches!(&unified, Type::Array { .. }) {
        unified = unified.with_nonempty(all_nonempty);
    }
    unified = unified.with_optional(optional);

    if types.iter().all(|ty| ty.coerces(&unified, check_quant)) {
        return unified;
    }

    // The seeded guess failed; try each input type itself as the bound so
    // the result does not depend on argument order.
    let mut candidates: Vec<Type> = types
        .iter()
        .map(|ty| (*ty).clone().with_optional(optional))
        .filter(|candidate| types.iter().all(|ty| ty.coerces(candidate, check_quant)))
        .collect();
    candidates.sort_by_key(|c| c.to_string());
    if let Some(best) = candidates
        .iter()
        .find(|c| candidates.iter().all(|other| c.coerces(other, check_quant)))
    {
        return best.clone();
    }

    if force_string && all_stringifiable {
        return Type::string(optional);
    }
    Type::any()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Type::int(false).to_string(), "Int");
        assert_eq!(Type::int(true).to_string(), "Int?");
        assert_eq!(
            Type::array(Type::int(false), false, true).to_string(),
            "Array[Int]+"
        );
        assert_eq!(
            Type::map(Type::string(false), Type::float(false), true).to_string(),
            "Map[String,Float]?"
        );
        assert_eq!(
            Type::pair(Type::int(false), Type::string(false), false).to_string(),
            "Pair[Int,String]"
        );
        assert_eq!(Type::none().to_string(), "None");
    }

    #[test]
    fn test_primitive_lattice() {
        let int = Type::int(false);
        let float = Type::float(false);
        let string = Type::string(false);
        let boolean = Type::boolean(false);
        let file = Type::file(false);

        assert!(int.coerces(&float, true));
        assert!(int.coerces(&string, true));
        assert!(float.coerces(&string, true));
        assert!(boolean.coerces(&string, true));
        assert!(file.coerces(&string, true));
        assert!(string.coerces(&file, true));
        assert!(string.coerces(&Type::directory(false), true));

        // Not admitted statically.
        assert!(!float.coerces(&int, true));
        assert!(!string.coerces(&int, true));
        assert!(!string.coerces(&float, true));
        assert!(!string.coerces(&boolean, true));
    }

    #[test]
    fn test_reflexive() {
        for ty in [
            Type::boolean(false),
            Type::int(false),
            Type::float(false),
            Type::string(false),
            Type::file(false),
            Type::directory(false),
            Type::array(Type::int(false), false, false),
            Type::map(Type::string(false), Type::int(false), false),
            Type::pair(Type::int(false), Type::float(false), false),
        ] {
            assert!(ty.coerces(&ty, true), "{} not reflexive", ty);
        }
    }

    #[test]
    fn test_transitive_int_string() {
        // Int -> Float and Float -> String imply Int -> String.
        let int = Type::int(false);
        assert!(int.coerces(&Type::float(false), true));
        assert!(Type::float(false).coerces(&Type::string(false), true));
        assert!(int.coerces(&Type::string(false), true));
    }

    #[test]
    fn test_optional_quantifier() {
        let int = Type::int(false);
        let opt_int = Type::int(true);
        assert!(int.coerces(&opt_int, true));
        assert!(!opt_int.coerces(&int, true));
        assert!(opt_int.coerces(&int, false));
    }

    #[test]
    fn test_double_optional_flattens() {
        let opt = Type::int(true).with_optional(true);
        assert_eq!(opt, Type::int(true));
    }

    #[test]
    fn test_array_covariance_and_nonempty() {
        let plus = Type::array(Type::int(false), false, true);
        let plain = Type::array(Type::int(false), false, false);
        let floats = Type::array(Type::float(false), false, false);
        assert!(plus.coerces(&plain, true));
        assert!(plain.coerces(&floats, true));
        assert!(!floats.coerces(&plain, true));
    }

    #[test]
    fn test_map_pair_covariance() {
        let m1 = Type::map(Type::string(false), Type::int(false), false);
        let m2 = Type::map(Type::string(false), Type::float(false), false);
        assert!(m1.coerces(&m2, true));
        assert!(!m2.coerces(&m1, true));

        let p1 = Type::pair(Type::int(false), Type::int(false), false);
        let p2 = Type::pair(Type::float(false), Type::string(false), false);
        assert!(p1.coerces(&p2, true));
    }

    #[test]
    fn test_object_to_struct() {
        let mut struct_members = IndexMap::new();
        struct_members.insert("a".to_string(), Type::int(false));
        struct_members.insert("b".to_string(), Type::string(true));
        let person = Type::StructInstance {
            type_name: "P".to_string(),
            members: Some(struct_members),
            optional: false,
        };

        let mut object_members = IndexMap::new();
        object_members.insert("a".to_string(), Type::int(false));
        let obj = Type::object(object_members);
        // b is optional so it may be omitted.
        assert!(obj.coerces(&person, true));

        let empty = Type::object(IndexMap::new());
        assert!(!empty.coerces(&person, true));
    }

    #[test]
    fn test_questionable_coercion() {
        assert!(Type::string(false).questionable_coercion(&Type::file(false)));
        assert!(!Type::int(false).questionable_coercion(&Type::string(false)));
    }

    #[test]
    fn test_unify_symmetry() {
        let int = Type::int(false);
        let float = Type::float(false);
        let ab = unify_types(vec![&int, &float], true, false);
        let ba = unify_types(vec![&float, &int], true, false);
        assert_eq!(ab, ba);
        assert!(matches!(ab, Type::Float { .. }));
    }

    #[test]
    fn test_unify_optional_and_string() {
        let int = Type::int(false);
        let opt_int = Type::int(true);
        let unified = unify_types(vec![&int, &opt_int], true, false);
        assert_eq!(unified, Type::int(true));

        let boolean = Type::boolean(false);
        let forced = unify_types(vec![&int, &boolean], true, true);
        assert!(matches!(forced, Type::String { .. }));
        let unforced = unify_types(vec![&int, &boolean], true, false);
        assert!(matches!(unforced, Type::Any { .. }));
    }

    #[test]
    fn test_equatable() {
        assert!(Type::int(false).equatable(&Type::float(false), false));
        assert!(Type::file(false).equatable(&Type::string(false), false));
        assert!(!Type::int(false).equatable(&Type::boolean(false), false));
        let a1 = Type::array(Type::int(false), false, false);
        let a2 = Type::array(Type::float(false), false, true);
        assert!(a1.equatable(&a2, false));
    }

    #[test]
    fn test_comparable() {
        assert!(Type::int(false).comparable(&Type::float(false), true));
        assert!(Type::string(false).comparable(&Type::string(false), true));
        assert!(!Type::int(true).comparable(&Type::int(false), true));
        assert!(Type::int(true).comparable(&Type::int(false), false));
        assert!(!Type::array(Type::int(false), false, false)
            .comparable(&Type::array(Type::int(false), false, false), true));
    }

    #[test]
    fn test_struct_identity_order_independent() {
        let mut a = IndexMap::new();
        a.insert("x".to_string(), Type::int(false));
        a.insert("y".to_string(), Type::string(false));
        let mut b = IndexMap::new();
        b.insert("y".to_string(), Type::string(false));
        b.insert("x".to_string(), Type::int(false));
        assert_eq!(struct_type_id(&a), struct_type_id(&b));
    }

    #[test]
    fn test_resolve_structs() {
        let mut members = IndexMap::new();
        members.insert("n".to_string(), Type::int(false));
        let mut typedefs = IndexMap::new();
        typedefs.insert("Counts".to_string(), members.clone());

        let unresolved = Type::array(Type::struct_instance("Counts".to_string(), false), false, false);
        let resolved = unresolved.resolve_structs(&typedefs).unwrap();
        match resolved {
            Type::Array { item_type, .. } => match *item_type {
                Type::StructInstance { members: Some(m), .. } => {
                    assert_eq!(m, members)
                }
                other => panic!("unexpected {}", other),
            },
            other => panic!("unexpected {}", other),
        }

        assert!(Type::struct_instance("Missing".to_string(), false)
            .resolve_structs(&typedefs)
            .is_err());
    }
}
