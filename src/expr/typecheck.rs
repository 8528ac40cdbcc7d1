//! Expression type inference.
//!
//! `infer_type` walks the expression bottom-up, annotating every node with
//! its type. Child failures are collected rather than short-circuiting: a
//! failed child reads as `Any` so the rest of the expression can still be
//! examined, and the combined error list is returned after the node has
//! been annotated.

use super::{BinaryOperator, Expression, StringPart, UnaryOperator};
use crate::env::Bindings;
use crate::error::{ErrorCollector, SourcePosition, WdlError};
use crate::stdlib::StdLib;
use crate::types::{unify_types, Type};
use indexmap::IndexMap;
use std::collections::HashSet;

/// Fully-resolved struct definitions of the enclosing document.
pub type StructTable = IndexMap<String, IndexMap<String, Type>>;

impl Expression {
    /// Infer and store this expression's type.
    pub fn infer_type(
        &mut self,
        type_env: &Bindings<Type>,
        stdlib: &StdLib,
        structs: &StructTable,
    ) -> Result<Type, WdlError> {
        let mut errors = ErrorCollector::new();
        self.infer_children(type_env, stdlib, structs, &mut errors);

        let ty = self.infer_own_type(type_env, stdlib, structs, &mut errors);
        self.set_type(ty.clone());
        errors.finish()?;
        Ok(ty)
    }

    fn infer_children(
        &mut self,
        type_env: &Bindings<Type>,
        stdlib: &StdLib,
        structs: &StructTable,
        errors: &mut ErrorCollector,
    ) {
        let mut infer = |child: &mut Expression, errors: &mut ErrorCollector| {
            errors.try_with(|| child.infer_type(type_env, stdlib, structs));
        };
        match self {
            Expression::String { parts, .. } => {
                for part in parts {
                    if let StringPart::Placeholder(expr) = part {
                        infer(expr, errors);
                    }
                }
            }
            Expression::Array { items, .. } => {
                for item in items {
                    infer(item, errors);
                }
            }
            Expression::Pair { left, right, .. } => {
                infer(left, errors);
                infer(right, errors);
            }
            Expression::Map { pairs, .. } => {
                for (k, v) in pairs {
                    infer(k, errors);
                    infer(v, errors);
                }
            }
            Expression::Object { members, .. } => {
                for (_, expr) in members {
                    infer(expr, errors);
                }
            }
            Expression::At { expr, index, .. } => {
                infer(expr, errors);
                infer(index, errors);
            }
            Expression::GetName { expr, .. } => infer(expr, errors),
            Expression::IfThenElse {
                condition,
                true_expr,
                false_expr,
                ..
            } => {
                infer(condition, errors);
                infer(true_expr, errors);
                infer(false_expr, errors);
            }
            Expression::Apply { arguments, .. } => {
                for arg in arguments {
                    infer(arg, errors);
                }
            }
            Expression::BinaryOp { left, right, .. } => {
                infer(left, errors);
                infer(right, errors);
            }
            Expression::UnaryOp { operand, .. } => infer(operand, errors),
            Expression::PlaceholderTrueFalse {
                condition,
                when_true,
                when_false,
                ..
            } => {
                infer(when_true, errors);
                infer(when_false, errors);
                infer(condition, errors);
            }
            Expression::PlaceholderDefault { default, value, .. } => {
                infer(default, errors);
                infer(value, errors);
            }
            Expression::PlaceholderSep {
                separator, array, ..
            } => {
                infer(separator, errors);
                infer(array, errors);
            }
            Expression::Coerce { expr, .. } => infer(expr, errors),
            _ => {}
        }
    }

    fn infer_own_type(
        &mut self,
        type_env: &Bindings<Type>,
        stdlib: &StdLib,
        structs: &StructTable,
        errors: &mut ErrorCollector,
    ) -> Type {
        let child_type =
            |e: &Expression| -> Type { e.get_type().cloned().unwrap_or_else(Type::any) };

        match self {
            Expression::Boolean { .. } => Type::boolean(false),
            Expression::Int { .. } => Type::int(false),
            Expression::Float { .. } => Type::float(false),
            Expression::Null { .. } => Type::none(),
            Expression::String { .. } => Type::string(false),

            Expression::Array { pos, items, .. } => {
                if items.is_empty() {
                    return Type::array(Type::any(), false, false);
                }
                let item_types: Vec<&Type> =
                    items.iter().filter_map(|item| item.get_type()).collect();
                let unified = unify_types(item_types.clone(), true, false);
                if matches!(unified, Type::Any { .. })
                    && !item_types.iter().any(|t| matches!(t, Type::Any { .. }))
                {
                    errors.append(WdlError::validation(
                        pos.clone(),
                        "array items have inconsistent types".to_string(),
                    ));
                }
                Type::array(unified, false, true)
            }

            Expression::Pair { left, right, .. } => {
                Type::pair(child_type(left), child_type(right), false)
            }

            Expression::Map { pairs, .. } => {
                if pairs.is_empty() {
                    return Type::map(Type::any(), Type::any(), false);
                }
                let key_types: Vec<&Type> = pairs.iter().filter_map(|(k, _)| k.get_type()).collect();
                let value_types: Vec<&Type> =
                    pairs.iter().filter_map(|(_, v)| v.get_type()).collect();
                let key_type = unify_types(key_types, true, false);
                let value_type = unify_types(value_types, true, false);

                // String-literal keys let the literal later coerce to a
                // struct with those members.
                let literal_keys: Option<HashSet<String>> = pairs
                    .iter()
                    .map(|(k, _)| match k {
                        Expression::String { parts, .. } => match parts.as_slice() {
                            [StringPart::Text(text)] => Some(text.clone()),
                            _ => None,
                        },
                        _ => None,
                    })
                    .collect();
                match literal_keys {
                    Some(keys) => Type::map_with_keys(key_type, value_type, false, keys),
                    None => Type::map(key_type, value_type, false),
                }
            }

            Expression::Object {
                pos,
                type_name,
                members,
                ..
            } => {
                let member_types: IndexMap<String, Type> = members
                    .iter()
                    .map(|(name, expr)| (name.clone(), child_type(expr)))
                    .collect();
                match type_name {
                    Some(name) => match structs.get(name) {
                        Some(struct_members) => Type::StructInstance {
                            type_name: name.clone(),
                            members: Some(struct_members.clone()),
                            optional: false,
                        },
                        None => {
                            errors.append(WdlError::validation(
                                pos.clone(),
                                format!("unknown struct type {}", name),
                            ));
                            Type::any()
                        }
                    },
                    None => Type::object(member_types),
                }
            }

            Expression::Ident { pos, name, .. } => match type_env.resolve(name) {
                Some(ty) => ty.clone(),
                None => {
                    errors.append(WdlError::UnknownIdentifier {
                        pos: pos.clone(),
                        name: name.clone(),
                    });
                    Type::any()
                }
            },

            Expression::At {
                pos, expr, index, ..
            } => {
                let index_type = child_type(index);
                let container = child_type(expr);
                match &container {
                    Type::Array { item_type, .. } => {
                        if !index_type.coerces(&Type::int(false), true) {
                            errors.append(WdlError::type_mismatch(
                                index.pos().clone(),
                                "Int".to_string(),
                                index_type.to_string(),
                            ));
                        }
                        item_type.as_ref().clone()
                    }
                    Type::Map {
                        key_type,
                        value_type,
                        ..
                    } => {
                        if !index_type.coerces(key_type, true) {
                            errors.append(WdlError::type_mismatch(
                                index.pos().clone(),
                                key_type.to_string(),
                                index_type.to_string(),
                            ));
                        }
                        value_type.as_ref().clone()
                    }
                    Type::Any { .. } => Type::any(),
                    other => {
                        errors.append(WdlError::validation(
                            pos.clone(),
                            format!("cannot index into {}", other),
                        ));
                        Type::any()
                    }
                }
            }

            Expression::GetName {
                pos, expr, field, ..
            } => {
                // Compound keys ("call_alias.output" bound whole) win over
                // member access.
                if let Expression::Ident { name, .. } = expr.as_ref() {
                    if let Some(ty) = type_env.resolve(&format!("{}.{}", name, field)) {
                        return ty.clone();
                    }
                }
                let container = child_type(expr);
                member_type(&container, field, pos, errors)
            }

            Expression::IfThenElse {
                pos,
                condition,
                true_expr,
                false_expr,
                ..
            } => {
                let cond_type = child_type(condition);
                if !cond_type.coerces(&Type::boolean(false), true) {
                    errors.append(WdlError::type_mismatch(
                        condition.pos().clone(),
                        "Boolean".to_string(),
                        cond_type.to_string(),
                    ));
                }
                let true_type = child_type(true_expr);
                let false_type = child_type(false_expr);
                let unified = unify_types(vec![&true_type, &false_type], true, false);
                if matches!(unified, Type::Any { .. })
                    && !matches!(true_type, Type::Any { .. })
                    && !matches!(false_type, Type::Any { .. })
                {
                    errors.append(WdlError::validation(
                        pos.clone(),
                        format!(
                            "if/else branches have incompatible types {} and {}",
                            true_type, false_type
                        ),
                    ));
                    return Type::any();
                }
                coerce_in_place(true_expr, &unified);
                coerce_in_place(false_expr, &unified);
                unified
            }

            Expression::Apply {
                pos,
                function_name,
                arguments,
                prototype,
                ..
            } => {
                let arg_types: Vec<Type> = arguments.iter().map(child_type).collect();
                match stdlib.resolve(function_name, pos, &arg_types) {
                    Ok(signature) => {
                        for (arg, param) in arguments.iter_mut().zip(&signature.param_types) {
                            if !matches!(param, Type::Any { .. }) {
                                coerce_in_place(arg, param);
                            }
                        }
                        let return_type = signature.return_type.clone();
                        *prototype = Some(signature);
                        return_type
                    }
                    Err(error) => {
                        errors.append(error);
                        Type::any()
                    }
                }
            }

            Expression::BinaryOp {
                pos, op, left, right, ..
            } => {
                let arg_types = [child_type(left), child_type(right)];
                match stdlib.resolve(operator_name(*op), pos, &arg_types) {
                    Ok(signature) => signature.return_type,
                    Err(error) => {
                        errors.append(error);
                        Type::any()
                    }
                }
            }

            Expression::UnaryOp {
                pos, op, operand, ..
            } => {
                let name = match op {
                    UnaryOperator::Not => "_not",
                    UnaryOperator::Negate => "_neg",
                };
                match stdlib.resolve(name, pos, &[child_type(operand)]) {
                    Ok(signature) => signature.return_type,
                    Err(error) => {
                        errors.append(error);
                        Type::any()
                    }
                }
            }

            Expression::PlaceholderTrueFalse {
                condition,
                when_true,
                when_false,
                ..
            } => {
                let cond_type = child_type(condition);
                if !cond_type.coerces(&Type::boolean(false), true) {
                    errors.append(WdlError::type_mismatch(
                        condition.pos().clone(),
                        "Boolean".to_string(),
                        cond_type.to_string(),
                    ));
                }
                for branch in [&mut *when_true, &mut *when_false] {
                    let branch_type = child_type(branch);
                    if !branch_type.coerces(&Type::string(false), true) {
                        errors.append(WdlError::type_mismatch(
                            branch.pos().clone(),
                            "String".to_string(),
                            branch_type.to_string(),
                        ));
                    }
                }
                Type::string(false)
            }

            Expression::PlaceholderDefault {
                pos,
                default,
                value,
                ..
            } => {
                let value_type = child_type(value);
                let inner_placeholder = matches!(
                    value.as_ref(),
                    Expression::PlaceholderSep { .. } | Expression::PlaceholderTrueFalse { .. }
                );
                if !value_type.is_optional()
                    && !matches!(value_type, Type::Any { .. })
                    && !inner_placeholder
                {
                    errors.append(WdlError::validation(
                        pos.clone(),
                        format!(
                            "default= applies to an optional value, not {}",
                            value_type
                        ),
                    ));
                }
                let default_type = child_type(default);
                let inner = value_type.clone().with_optional(false);
                if !default_type.coerces(&inner, false)
                    && !default_type.coerces(&Type::string(false), true)
                {
                    errors.append(WdlError::type_mismatch(
                        default.pos().clone(),
                        inner.to_string(),
                        default_type.to_string(),
                    ));
                }
                Type::string(false)
            }

            Expression::PlaceholderSep {
                pos,
                separator,
                array,
                ..
            } => {
                let separator_type = child_type(separator);
                if !separator_type.coerces(&Type::string(false), true) {
                    errors.append(WdlError::type_mismatch(
                        separator.pos().clone(),
                        "String".to_string(),
                        separator_type.to_string(),
                    ));
                }
                let array_type = child_type(array);
                match &array_type {
                    Type::Array { item_type, .. } => {
                        if !item_type.coerces(&Type::string(false), false) {
                            errors.append(WdlError::type_mismatch(
                                array.pos().clone(),
                                "Array[String]".to_string(),
                                array_type.to_string(),
                            ));
                        }
                    }
                    Type::Any { .. } => {}
                    other => {
                        errors.append(WdlError::validation(
                            pos.clone(),
                            format!("sep= applies to an array, not {}", other),
                        ));
                    }
                }
                Type::string(false)
            }

            Expression::Coerce { target, .. } => target.clone(),
        }
    }
}

/// Member access typing over structs, objects, call outputs, and pairs.
fn member_type(
    container: &Type,
    field: &str,
    pos: &SourcePosition,
    errors: &mut ErrorCollector,
) -> Type {
    match container {
        Type::Pair {
            left_type,
            right_type,
            ..
        } => match field.to_ascii_lowercase().as_str() {
            "left" => left_type.as_ref().clone(),
            "right" => right_type.as_ref().clone(),
            _ => {
                errors.append(WdlError::NoSuchMember {
                    pos: pos.clone(),
                    member: field.to_string(),
                });
                Type::any()
            }
        },
        Type::StructInstance {
            members: Some(members),
            ..
        }
        | Type::Object { members, .. } => match members.get(field) {
            Some(ty) => ty.clone(),
            None => {
                errors.append(WdlError::NoSuchMember {
                    pos: pos.clone(),
                    member: field.to_string(),
                });
                Type::any()
            }
        },
        Type::StructInstance { members: None, .. } | Type::Any { .. } => Type::any(),
        other => {
            errors.append(WdlError::validation(
                pos.clone(),
                format!("member access applies to structs, objects, calls, and pairs, not {}", other),
            ));
            Type::any()
        }
    }
}

pub(crate) fn operator_name(op: BinaryOperator) -> &'static str {
    match op {
        BinaryOperator::Add => "_add",
        BinaryOperator::Subtract => "_sub",
        BinaryOperator::Multiply => "_mul",
        BinaryOperator::Divide => "_div",
        BinaryOperator::Modulo => "_rem",
        BinaryOperator::Equal => "_eqeq",
        BinaryOperator::NotEqual => "_neq",
        BinaryOperator::Less => "_lt",
        BinaryOperator::LessEqual => "_lte",
        BinaryOperator::Greater => "_gt",
        BinaryOperator::GreaterEqual => "_gte",
        BinaryOperator::And => "_and",
        BinaryOperator::Or => "_or",
    }
}

/// Wrap `slot` with an explicit coercion to `target` when its inferred type
/// differs; identity and Any targets are left alone.
pub(crate) fn coerce_in_place(slot: &mut Expression, target: &Type) {
    if matches!(target, Type::Any { .. }) || slot.get_type() == Some(target) {
        return;
    }
    let pos = slot.pos().clone();
    let inner = std::mem::replace(slot, Expression::null(pos.clone()));
    *slot = Expression::Coerce {
        pos,
        expr: Box::new(inner),
        target: target.clone(),
    };
}
