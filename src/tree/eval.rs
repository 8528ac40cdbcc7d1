//! Declaration and command evaluation.
//!
//! Declarations thread an immutable context left-to-right; rebinding is
//! forbidden. The command template materializes by evaluating each fragment
//! to its canonical string and dedenting the concatenation.

use super::{CommandSection, Conditional, Declaration, Scatter, Task, WorkflowElement};
use crate::env::Bindings;
use crate::error::WdlError;
use crate::expr::eval::placeholder_text;
use crate::expr::StringPart;
use crate::stdlib::StdLib;
use crate::types::Type;
use crate::value::Value;

/// Evaluate declarations in order, producing the extended context.
///
/// A binding already present in `env` (a caller-supplied input) wins over
/// the declaration's default expression; an unbound non-optional
/// declaration without a default is an input error.
pub fn apply_declarations(
    decls: &[Declaration],
    env: &Bindings<Value>,
    stdlib: &StdLib,
) -> Result<Bindings<Value>, WdlError> {
    let mut ctx = env.clone();
    for decl in decls {
        let value = match ctx.resolve(&decl.name) {
            Some(supplied) => supplied.coerce(&decl.decl_type).map_err(|e| {
                WdlError::Input {
                    message: format!("input {}: {}", decl.name, e),
                }
            })?,
            None => match &decl.expr {
                Some(expr) => expr.eval(&ctx, stdlib)?,
                None if decl.decl_type.is_optional() => Value::null(),
                None => {
                    return Err(WdlError::Input {
                        message: format!("no input value for {}", decl.name),
                    })
                }
            },
        };
        ctx = bind_fresh(ctx, &decl.name, value, env)?;
    }
    Ok(ctx)
}

/// Evaluate a workflow body's declarations, scatters, and conditionals.
/// Calls cannot be evaluated here; executing tasks belongs to the runner.
pub fn apply_elements(
    elements: &[WorkflowElement],
    env: &Bindings<Value>,
    stdlib: &StdLib,
) -> Result<Bindings<Value>, WdlError> {
    let mut ctx = env.clone();
    for element in elements {
        match element {
            WorkflowElement::Declaration(decl) => {
                let value = match (&decl.expr, ctx.resolve(&decl.name)) {
                    (_, Some(supplied)) => supplied.coerce(&decl.decl_type).map_err(|e| {
                        WdlError::Input {
                            message: format!("input {}: {}", decl.name, e),
                        }
                    })?,
                    (Some(expr), None) => expr.eval(&ctx, stdlib)?,
                    (None, None) if decl.decl_type.is_optional() => Value::null(),
                    (None, None) => {
                        return Err(WdlError::Input {
                            message: format!("no input value for {}", decl.name),
                        })
                    }
                };
                ctx = bind_fresh(ctx, &decl.name, value, env)?;
            }
            WorkflowElement::Scatter(scatter) => {
                ctx = apply_scatter(scatter, ctx, stdlib)?;
            }
            WorkflowElement::Conditional(conditional) => {
                ctx = apply_conditional(conditional, ctx, stdlib)?;
            }
            WorkflowElement::Call(call) => {
                return Err(WdlError::eval(
                    call.pos.clone(),
                    format!(
                        "call {} cannot be evaluated without a task executor",
                        call.name()
                    ),
                ));
            }
        }
    }
    Ok(ctx)
}

/// Evaluate the scatter body once per collection element and gather each
/// binding the body produced into an array in the outer context.
fn apply_scatter(
    scatter: &Scatter,
    ctx: Bindings<Value>,
    stdlib: &StdLib,
) -> Result<Bindings<Value>, WdlError> {
    let collection = scatter.expr.eval(&ctx, stdlib)?;
    let Some(items) = collection.as_array() else {
        return Err(WdlError::eval(
            scatter.expr.pos().clone(),
            format!("scatter collection must be an array, not {}", collection.wdl_type()),
        ));
    };

    let mut gathered: Vec<(String, Vec<Value>)> = Vec::new();
    for item in items {
        let iteration_env = ctx.clone().bind(
            scatter.variable.clone(),
            item.clone(),
            Some("scatter".to_string()),
        );
        let base = iteration_env.clone();
        let result = apply_elements(&scatter.body, &iteration_env, stdlib)?;
        let added = result.bindings_since(&base);
        // bindings_since reports newest first; keep declaration order.
        for (index, (name, value)) in added.into_iter().rev().enumerate() {
            match gathered.iter_mut().find(|(n, _)| *n == name) {
                Some((_, values)) => values.push(value),
                None => {
                    debug_assert_eq!(index, gathered.len());
                    gathered.push((name, vec![value]));
                }
            }
        }
    }

    let mut out = ctx;
    if items.is_empty() {
        // No iterations ran; gather empty arrays for the names the body
        // declares.
        for name in declared_names(&scatter.body) {
            out = out.bind(name, Value::array(Type::any(), vec![]), Some("scatter".to_string()));
        }
        return Ok(out);
    }
    for (name, values) in gathered {
        let item_type = values
            .first()
            .map(|v| v.wdl_type().clone())
            .unwrap_or_else(Type::any);
        out = out.bind(
            name,
            Value::array(item_type, values),
            Some("scatter".to_string()),
        );
    }
    Ok(out)
}

/// Evaluate the conditional body when the gate holds; otherwise bind null
/// for every name the body would have produced.
fn apply_conditional(
    conditional: &Conditional,
    ctx: Bindings<Value>,
    stdlib: &StdLib,
) -> Result<Bindings<Value>, WdlError> {
    let gate = conditional.expr.eval(&ctx, stdlib)?;
    let Some(gate) = gate.as_bool() else {
        return Err(WdlError::eval(
            conditional.expr.pos().clone(),
            format!("conditional gate must be Boolean, not {}", gate.wdl_type()),
        ));
    };

    let mut out = ctx.clone();
    if gate {
        let base = ctx.clone();
        let result = apply_elements(&conditional.body, &ctx, stdlib)?;
        for (name, value) in result.bindings_since(&base).into_iter().rev() {
            out = out.bind(name, value, Some("if".to_string()));
        }
    } else {
        for name in declared_names(&conditional.body) {
            out = out.bind(name, Value::null(), Some("if".to_string()));
        }
    }
    Ok(out)
}

/// Names a body introduces into its enclosing scope, in declaration order.
fn declared_names(elements: &[WorkflowElement]) -> Vec<String> {
    let mut names = Vec::new();
    for element in elements {
        match element {
            WorkflowElement::Declaration(decl) => names.push(decl.name.clone()),
            WorkflowElement::Scatter(scatter) => names.extend(declared_names(&scatter.body)),
            WorkflowElement::Conditional(conditional) => {
                names.extend(declared_names(&conditional.body))
            }
            WorkflowElement::Call(call) => names.push(call.name().to_string()),
        }
    }
    names
}

fn bind_fresh(
    ctx: Bindings<Value>,
    name: &str,
    value: Value,
    inputs: &Bindings<Value>,
) -> Result<Bindings<Value>, WdlError> {
    // Rebinding is forbidden; the only name already present may be the
    // caller-supplied input being materialized.
    if ctx.has_binding(name) && !inputs.has_binding(name) {
        return Err(WdlError::Input {
            message: format!("{} is already bound", name),
        });
    }
    Ok(ctx.bind(name.to_string(), value, None))
}

/// Materialize a command: evaluate each fragment to its canonical string,
/// concatenate, dedent.
pub fn apply_command(
    command: &CommandSection,
    env: &Bindings<Value>,
    stdlib: &StdLib,
) -> Result<String, WdlError> {
    let mut text = String::new();
    for part in &command.parts {
        match part {
            StringPart::Text(chunk) => text.push_str(chunk),
            StringPart::Placeholder(expr) => text.push_str(&placeholder_text(expr, env, stdlib)?),
        }
    }
    Ok(dedent(&text))
}

impl Task {
    /// Evaluate inputs and declarations against `inputs`, then materialize
    /// the command string.
    pub fn materialize_command(
        &self,
        inputs: &Bindings<Value>,
        stdlib: &StdLib,
    ) -> Result<String, WdlError> {
        let ctx = apply_declarations(&self.inputs, inputs, stdlib)?;
        let ctx = apply_declarations(&self.postinputs, &ctx, stdlib)?;
        apply_command(&self.command, &ctx, stdlib)
    }
}

/// Strip the minimum leading whitespace of the non-blank lines (ignoring a
/// blank first/last line), then trim one leading and one trailing blank
/// line. Tabs count as two columns when checking for uneven indentation.
pub fn dedent(text: &str) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    if lines.is_empty() {
        return String::new();
    }

    let blank = |line: &str| line.trim().is_empty();

    let mut min_indent: Option<(usize, usize)> = None;
    let mut saw_tabs = false;
    let mut saw_spaces = false;
    for line in &lines {
        if blank(line) {
            continue;
        }
        let leading: Vec<char> = line.chars().take_while(|c| *c == ' ' || *c == '\t').collect();
        saw_tabs |= leading.contains(&'\t');
        saw_spaces |= leading.contains(&' ');
        // Tabs count double so mixed indentation compares by column.
        let columns: usize = leading.iter().map(|c| if *c == '\t' { 2 } else { 1 }).sum();
        if min_indent.map_or(true, |(c, _)| columns < c) {
            min_indent = Some((columns, leading.len()));
        }
    }
    let width = min_indent.map(|(_, chars)| chars).unwrap_or(0);
    if saw_tabs && saw_spaces {
        log::warn!("command mixes tabs and spaces in its indentation");
    }

    let mut dedented: Vec<String> = lines
        .iter()
        .map(|line| {
            if blank(line) {
                String::new()
            } else {
                line.chars().skip(width).collect()
            }
        })
        .collect();

    if dedented.first().is_some_and(|l| l.is_empty()) {
        dedented.remove(0);
    }
    if dedented.last().is_some_and(|l| l.is_empty()) {
        dedented.pop();
    }
    dedented.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Version;
    use crate::tree::lower::lower_document;
    use crate::tree::Document;

    fn checked(source: &str) -> Document {
        let mut doc =
            lower_document(crate::parser::parse_document(source, "t.wdl").unwrap()).unwrap();
        doc.typecheck().unwrap();
        doc
    }

    fn stdlib() -> StdLib {
        StdLib::new(Version::V1_0)
    }

    #[test]
    fn test_declaration_threading() {
        let doc = checked(
            r#"version 1.0
workflow w {
  Int x = 3
  Float y = x
  Float z = y * 2.0
}"#,
        );
        let workflow = doc.workflow.unwrap();
        let ctx = apply_elements(&workflow.body, &Bindings::new(), &stdlib()).unwrap();
        assert_eq!(ctx.resolve("x"), Some(&Value::int(3)));
        assert_eq!(ctx.resolve("y"), Some(&Value::float(3.0)));
        assert_eq!(ctx.resolve("z"), Some(&Value::float(6.0)));
    }

    #[test]
    fn test_inputs_override_defaults() {
        let doc = checked(
            r#"version 1.0
task t {
  input {
    Int n = 1
  }
  command {
    echo ~{n}
  }
}"#,
        );
        let inputs = Bindings::new().bind("n".to_string(), Value::int(9), None);
        let command = doc.tasks[0].materialize_command(&inputs, &stdlib()).unwrap();
        assert_eq!(command, "echo 9");
    }

    #[test]
    fn test_missing_required_input() {
        let doc = checked(
            r#"version 1.0
task t {
  input {
    Int n
  }
  command { echo ~{n} }
}"#,
        );
        assert!(matches!(
            doc.tasks[0].materialize_command(&Bindings::new(), &stdlib()),
            Err(WdlError::Input { .. })
        ));
    }

    #[test]
    fn test_scatter_evaluation() {
        let doc = checked(
            r#"version 1.0
workflow w {
  scatter (i in [1, 2, 3]) {
    Int y = i + 1
  }
}"#,
        );
        let workflow = doc.workflow.unwrap();
        let ctx = apply_elements(&workflow.body, &Bindings::new(), &stdlib()).unwrap();
        let y = ctx.resolve("y").unwrap();
        assert_eq!(
            *y,
            Value::array(
                Type::int(false),
                vec![Value::int(2), Value::int(3), Value::int(4)]
            )
        );
        assert!(!ctx.has_binding("i"));
    }

    #[test]
    fn test_conditional_evaluation() {
        let source = |gate: &str| {
            format!(
                r#"version 1.0
workflow w {{
  Boolean go = {}
  if (go) {{
    Int a = 7
  }}
}}"#,
                gate
            )
        };
        let doc = checked(&source("true"));
        let ctx = apply_elements(&doc.workflow.unwrap().body, &Bindings::new(), &stdlib()).unwrap();
        assert_eq!(ctx.resolve("a"), Some(&Value::int(7)));

        let doc = checked(&source("false"));
        let ctx = apply_elements(&doc.workflow.unwrap().body, &Bindings::new(), &stdlib()).unwrap();
        assert_eq!(ctx.resolve("a"), Some(&Value::null()));
    }

    #[test]
    fn test_placeholder_sep_in_command() {
        let doc = checked(
            r#"version 1.0
task t {
  input {
    Array[Int] a = [1, 2, 3]
  }
  command {
    echo ~{sep=", " a}
  }
}"#,
        );
        let command = doc.tasks[0]
            .materialize_command(&Bindings::new(), &stdlib())
            .unwrap();
        assert_eq!(command, "echo 1, 2, 3");
    }

    #[test]
    fn test_command_dedent() {
        let doc = checked(
            "version 1.0\ntask t {\n  command <<<\n    python <<CODE\n    import os\n    CODE\n  >>>\n}",
        );
        let command = doc.tasks[0]
            .materialize_command(&Bindings::new(), &stdlib())
            .unwrap();
        assert_eq!(command, "python <<CODE\nimport os\nCODE");
    }

    #[test]
    fn test_dedent_rules() {
        assert_eq!(dedent("  a\n    b\n  c"), "a\n  b\nc");
        // Blank interior lines do not affect the minimum.
        assert_eq!(dedent("  a\n\n  b"), "a\n\nb");
        // One leading and one trailing blank line are trimmed.
        assert_eq!(dedent("\n  a\n"), "a");
    }

    #[test]
    fn test_dedent_idempotent() {
        for case in ["  a\n    b", "\n    x\n      y\n", "plain", ""] {
            let once = dedent(case);
            assert_eq!(dedent(&once), once, "not idempotent for {:?}", case);
        }
    }
}
