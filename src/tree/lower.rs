//! CST -> AST lowering.
//!
//! A pure structural pass: spans are propagated untouched, ordered
//! containers keep source order, placeholder options become dedicated
//! expression wrappers, and meta-section values are re-typed from the
//! expression grammar into plain JSON-shaped literals.

use super::{
    Call, CommandSection, Conditional, Declaration, Document, ImportDoc, Scatter, StructTypeDef,
    Task, Workflow, WorkflowElement,
};
use crate::error::WdlError;
use crate::expr::{Expression, StringPart};
use crate::parser::cst;
use crate::parser::Version;
use crate::types::Type;
use indexmap::IndexMap;
use serde_json::Value as JsonValue;

/// Lower a parsed document into the version-neutral AST.
pub fn lower_document(doc: cst::Document) -> Result<Document, WdlError> {
    let version = doc.version;
    log::trace!("lowering {} ({} tasks)", doc.uri, doc.tasks.len());

    let imports = doc
        .imports
        .into_iter()
        .map(|import| ImportDoc::new(import.pos, import.uri, import.namespace, import.aliases))
        .collect();

    let structs = doc
        .structs
        .into_iter()
        .map(|s| lower_struct(s, version))
        .collect::<Result<Vec<_>, _>>()?;

    let tasks = doc
        .tasks
        .into_iter()
        .map(|t| lower_task(t, version))
        .collect::<Result<Vec<_>, _>>()?;

    let workflow = doc
        .workflow
        .map(|w| lower_workflow(w, version))
        .transpose()?;

    Ok(Document {
        pos: doc.pos,
        version,
        imports,
        struct_typedefs: structs,
        tasks,
        workflow,
        comments: doc.comments,
        uri: doc.uri,
        abspath: doc.abspath,
    })
}

fn lower_struct(def: cst::StructDef, version: Version) -> Result<StructTypeDef, WdlError> {
    let mut members = IndexMap::new();
    for member in def.members {
        if members
            .insert(member.name.clone(), lower_type(&member.decl_type))
            .is_some()
        {
            return Err(WdlError::syntax(
                member.pos,
                format!("duplicate struct member {}", member.name),
                version.as_str(),
            ));
        }
    }
    Ok(StructTypeDef {
        pos: def.pos,
        name: def.name,
        members,
        imported: false,
    })
}

fn lower_task(task: cst::Task, version: Version) -> Result<Task, WdlError> {
    Ok(Task {
        pos: task.pos,
        name: task.name,
        inputs: lower_decls(task.inputs.unwrap_or_default(), version)?,
        postinputs: lower_decls(task.postinputs, version)?,
        command: lower_command(task.command, version)?,
        outputs: lower_decls(task.outputs, version)?,
        runtime: lower_keyed_exprs(task.runtime, version)?,
        hints: lower_keyed_exprs(task.hints, version)?,
        meta: lower_meta(task.meta, version)?,
        parameter_meta: lower_meta(task.parameter_meta, version)?,
        effective_version: version,
    })
}

fn lower_workflow(workflow: cst::Workflow, version: Version) -> Result<Workflow, WdlError> {
    Ok(Workflow {
        pos: workflow.pos,
        name: workflow.name,
        inputs: lower_decls(workflow.inputs.unwrap_or_default(), version)?,
        body: workflow
            .body
            .into_iter()
            .map(|node| lower_node(node, version))
            .collect::<Result<Vec<_>, _>>()?,
        outputs: lower_decls(workflow.outputs, version)?,
        meta: lower_meta(workflow.meta, version)?,
        parameter_meta: lower_meta(workflow.parameter_meta, version)?,
        effective_version: version,
        complete_calls: None,
        type_env: None,
    })
}

fn lower_node(node: cst::WorkflowNode, version: Version) -> Result<WorkflowElement, WdlError> {
    Ok(match node {
        cst::WorkflowNode::Decl(decl) => WorkflowElement::Declaration(lower_decl(decl, version)?),
        cst::WorkflowNode::Call(call) => {
            let mut inputs = IndexMap::new();
            for (name, expr) in call.inputs {
                if inputs.insert(name.clone(), lower_expr(expr, version)?).is_some() {
                    return Err(WdlError::syntax(
                        call.pos,
                        format!("duplicate call input {}", name),
                        version.as_str(),
                    ));
                }
            }
            WorkflowElement::Call(Call {
                pos: call.pos,
                target: call.target,
                alias: call.alias,
                afters: call.afters,
                inputs,
                callee: None,
            })
        }
        cst::WorkflowNode::Scatter(scatter) => WorkflowElement::Scatter(Box::new(Scatter {
            pos: scatter.pos,
            variable: scatter.variable,
            expr: lower_expr(scatter.expr, version)?,
            body: scatter
                .body
                .into_iter()
                .map(|n| lower_node(n, version))
                .collect::<Result<Vec<_>, _>>()?,
        })),
        cst::WorkflowNode::Conditional(cond) => {
            WorkflowElement::Conditional(Box::new(Conditional {
                pos: cond.pos,
                expr: lower_expr(cond.expr, version)?,
                body: cond
                    .body
                    .into_iter()
                    .map(|n| lower_node(n, version))
                    .collect::<Result<Vec<_>, _>>()?,
            }))
        }
    })
}

fn lower_decls(decls: Vec<cst::Decl>, version: Version) -> Result<Vec<Declaration>, WdlError> {
    decls.into_iter().map(|d| lower_decl(d, version)).collect()
}

fn lower_decl(decl: cst::Decl, version: Version) -> Result<Declaration, WdlError> {
    Ok(Declaration {
        pos: decl.pos,
        decl_type: lower_type(&decl.decl_type),
        name: decl.name,
        expr: decl.expr.map(|e| lower_expr(e, version)).transpose()?,
    })
}

/// Written types to semantic types. Unknown names become unresolved struct
/// instances; the checker resolves or rejects them.
pub fn lower_type(ty: &cst::TypeExpr) -> Type {
    let optional = ty.optional;
    match &ty.kind {
        cst::TypeExprKind::Boolean => Type::boolean(optional),
        cst::TypeExprKind::Int => Type::int(optional),
        cst::TypeExprKind::Float => Type::float(optional),
        cst::TypeExprKind::String => Type::string(optional),
        cst::TypeExprKind::File => Type::file(optional),
        cst::TypeExprKind::Directory => Type::directory(optional),
        cst::TypeExprKind::Object => Type::object(IndexMap::new()),
        cst::TypeExprKind::Array { item, nonempty } => {
            Type::array(lower_type(item), optional, *nonempty)
        }
        cst::TypeExprKind::Map { key, value } => {
            Type::map(lower_type(key), lower_type(value), optional)
        }
        cst::TypeExprKind::Pair { left, right } => {
            Type::pair(lower_type(left), lower_type(right), optional)
        }
        cst::TypeExprKind::Named(name) => Type::struct_instance(name.clone(), optional),
    }
}

fn lower_command(command: cst::CommandSection, version: Version) -> Result<CommandSection, WdlError> {
    let parts = command
        .parts
        .into_iter()
        .map(|piece| lower_string_piece(piece, version))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(CommandSection {
        pos: command.pos,
        parts,
    })
}

fn lower_string_piece(piece: cst::StringPiece, version: Version) -> Result<StringPart, WdlError> {
    Ok(match piece {
        cst::StringPiece::Text { text, .. } => StringPart::Text(text),
        cst::StringPiece::Placeholder(ph) => {
            StringPart::Placeholder(Box::new(lower_placeholder(ph, version)?))
        }
    })
}

/// Lower a placeholder, turning its options into wrapper expressions:
/// `true=`/`false=` into a Boolean branch, `sep=` into an array join, and
/// `default=` (outermost) into null substitution.
fn lower_placeholder(ph: cst::Placeholder, version: Version) -> Result<Expression, WdlError> {
    let pos = ph.pos.clone();
    let mut when_true = None;
    let mut when_false = None;
    let mut separator = None;
    let mut default = None;

    for option in ph.options {
        let value = lower_expr(option.value, version)?;
        let slot = match option.name.as_str() {
            "true" => &mut when_true,
            "false" => &mut when_false,
            "sep" => &mut separator,
            "default" => &mut default,
            other => {
                return Err(WdlError::syntax(
                    option.pos,
                    format!("unknown placeholder option '{}'", other),
                    version.as_str(),
                ))
            }
        };
        if slot.replace(value).is_some() {
            return Err(WdlError::syntax(
                option.pos,
                format!("duplicate placeholder option '{}'", option.name),
                version.as_str(),
            ));
        }
    }

    let mut expr = lower_expr(ph.expr, version)?;

    match (when_true, when_false) {
        (Some(when_true), Some(when_false)) => {
            if separator.is_some() {
                return Err(WdlError::syntax(
                    pos,
                    "placeholder cannot combine sep= with true=/false=".to_string(),
                    version.as_str(),
                ));
            }
            expr = Expression::PlaceholderTrueFalse {
                pos: pos.clone(),
                condition: Box::new(expr),
                when_true: Box::new(when_true),
                when_false: Box::new(when_false),
                inferred_type: None,
            };
        }
        (None, None) => {}
        _ => {
            return Err(WdlError::syntax(
                pos,
                "placeholder options true= and false= must be given together".to_string(),
                version.as_str(),
            ))
        }
    }

    if let Some(separator) = separator {
        expr = Expression::PlaceholderSep {
            pos: pos.clone(),
            separator: Box::new(separator),
            array: Box::new(expr),
            inferred_type: None,
        };
    }

    if let Some(default) = default {
        expr = Expression::PlaceholderDefault {
            pos,
            default: Box::new(default),
            value: Box::new(expr),
            inferred_type: None,
        };
    }

    Ok(expr)
}

pub fn lower_expr(expr: cst::Expr, version: Version) -> Result<Expression, WdlError> {
    let pos = expr.pos;
    Ok(match expr.kind {
        cst::ExprKind::Boolean(value) => Expression::boolean(pos, value),
        cst::ExprKind::Int(value) => Expression::int(pos, value),
        cst::ExprKind::Float(value) => Expression::float(pos, value),
        cst::ExprKind::None => Expression::null(pos),
        cst::ExprKind::String { parts } => {
            let parts = parts
                .into_iter()
                .map(|piece| lower_string_piece(piece, version))
                .collect::<Result<Vec<_>, _>>()?;
            Expression::string(pos, parts)
        }
        cst::ExprKind::Array(items) => Expression::array(
            pos,
            items
                .into_iter()
                .map(|item| lower_expr(item, version))
                .collect::<Result<Vec<_>, _>>()?,
        ),
        cst::ExprKind::Pair { left, right } => Expression::pair(
            pos,
            lower_expr(*left, version)?,
            lower_expr(*right, version)?,
        ),
        cst::ExprKind::Map { pairs } => Expression::map(
            pos,
            pairs
                .into_iter()
                .map(|(k, v)| Ok((lower_expr(k, version)?, lower_expr(v, version)?)))
                .collect::<Result<Vec<_>, WdlError>>()?,
        ),
        cst::ExprKind::Object { type_name, members } => Expression::object(
            pos,
            type_name,
            members
                .into_iter()
                .map(|(name, value)| Ok((name, lower_expr(value, version)?)))
                .collect::<Result<Vec<_>, WdlError>>()?,
        ),
        cst::ExprKind::Ident(name) => Expression::ident(pos, name),
        cst::ExprKind::At { expr, index } => Expression::at(
            pos,
            lower_expr(*expr, version)?,
            lower_expr(*index, version)?,
        ),
        cst::ExprKind::GetName { expr, field } => {
            Expression::get_name(pos, lower_expr(*expr, version)?, field)
        }
        cst::ExprKind::Apply { name, args } => Expression::apply(
            pos,
            name,
            args.into_iter()
                .map(|arg| lower_expr(arg, version))
                .collect::<Result<Vec<_>, _>>()?,
        ),
        cst::ExprKind::IfThenElse {
            condition,
            when_true,
            when_false,
        } => Expression::if_then_else(
            pos,
            lower_expr(*condition, version)?,
            lower_expr(*when_true, version)?,
            lower_expr(*when_false, version)?,
        ),
        cst::ExprKind::Unary { op, operand } => {
            Expression::unary_op(pos, op, lower_expr(*operand, version)?)
        }
        cst::ExprKind::Binary { op, left, right } => Expression::binary_op(
            pos,
            op,
            lower_expr(*left, version)?,
            lower_expr(*right, version)?,
        ),
    })
}

fn lower_keyed_exprs(
    entries: Vec<(String, cst::Expr)>,
    version: Version,
) -> Result<IndexMap<String, Expression>, WdlError> {
    let mut out = IndexMap::new();
    for (name, expr) in entries {
        out.insert(name, lower_expr(expr, version)?);
    }
    Ok(out)
}

fn lower_meta(
    section: Option<cst::MetaSection>,
    version: Version,
) -> Result<IndexMap<String, JsonValue>, WdlError> {
    let mut out = IndexMap::new();
    if let Some(section) = section {
        for (name, value) in section.entries {
            out.insert(name, lower_meta_value(value, version)?);
        }
    }
    Ok(out)
}

/// Re-type a meta value from the expression grammar into the restricted
/// literal sum. The only identifier admitted is `null`.
fn lower_meta_value(expr: cst::Expr, version: Version) -> Result<JsonValue, WdlError> {
    let pos = expr.pos;
    match expr.kind {
        cst::ExprKind::None => Ok(JsonValue::Null),
        cst::ExprKind::Ident(name) if name == "null" => Ok(JsonValue::Null),
        cst::ExprKind::Boolean(value) => Ok(JsonValue::Bool(value)),
        cst::ExprKind::Int(value) => Ok(JsonValue::Number(value.into())),
        cst::ExprKind::Float(value) => Ok(serde_json::Number::from_f64(value)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null)),
        cst::ExprKind::Unary {
            op: crate::expr::UnaryOperator::Negate,
            operand,
        } => match lower_meta_value(*operand, version)? {
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(JsonValue::Number((-i).into()))
                } else {
                    Ok(serde_json::Number::from_f64(-n.as_f64().unwrap_or(0.0))
                        .map(JsonValue::Number)
                        .unwrap_or(JsonValue::Null))
                }
            }
            _ => Err(WdlError::syntax(
                pos,
                "meta values may only negate numbers".to_string(),
                version.as_str(),
            )),
        },
        cst::ExprKind::String { parts } => {
            let mut text = String::new();
            for part in parts {
                match part {
                    cst::StringPiece::Text { text: t, .. } => text.push_str(&t),
                    cst::StringPiece::Placeholder(_) => {
                        return Err(WdlError::syntax(
                            pos,
                            "placeholders are not allowed in meta values".to_string(),
                            version.as_str(),
                        ))
                    }
                }
            }
            Ok(JsonValue::String(text))
        }
        cst::ExprKind::Array(items) => Ok(JsonValue::Array(
            items
                .into_iter()
                .map(|item| lower_meta_value(item, version))
                .collect::<Result<Vec<_>, _>>()?,
        )),
        cst::ExprKind::Object { members, .. } => {
            let mut fields = serde_json::Map::new();
            for (name, value) in members {
                fields.insert(name, lower_meta_value(value, version)?);
            }
            Ok(JsonValue::Object(fields))
        }
        // `{ key: value }` in meta position is an object, not a map; keys
        // must be identifiers or strings.
        cst::ExprKind::Map { pairs } => {
            let mut fields = serde_json::Map::new();
            for (key, value) in pairs {
                let name = match key.kind {
                    cst::ExprKind::Ident(name) => name,
                    cst::ExprKind::String { parts } => match parts.as_slice() {
                        [cst::StringPiece::Text { text, .. }] => text.clone(),
                        _ => {
                            return Err(WdlError::syntax(
                                key.pos,
                                "meta object keys must be plain names".to_string(),
                                version.as_str(),
                            ))
                        }
                    },
                    _ => {
                        return Err(WdlError::syntax(
                            key.pos,
                            "meta object keys must be plain names".to_string(),
                            version.as_str(),
                        ))
                    }
                };
                fields.insert(name, lower_meta_value(value, version)?);
            }
            Ok(JsonValue::Object(fields))
        }
        cst::ExprKind::Ident(name) => Err(WdlError::syntax(
            pos,
            format!("identifier '{}' is not allowed in a meta value", name),
            version.as_str(),
        )),
        _ => Err(WdlError::syntax(
            pos,
            "meta values must be literals".to_string(),
            version.as_str(),
        )),
    }
}
