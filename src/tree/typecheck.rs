//! Document, task, and workflow type checking.
//!
//! Scopes thread left-to-right: each declaration sees everything before it
//! and nothing after. Scatter bodies see the iterator; the outer scope sees
//! the body's bindings wrapped in `Array` (the iterator itself is not
//! exported). Conditional bodies export their bindings wrapped in
//! `Optional`. Type errors accumulate so one pass reports every diagnostic;
//! structural failures (unknown struct, cyclic structs) abort.

use super::{
    CalleeSignature, Call, Conditional, Declaration, Document, Scatter, Task, Workflow,
    WorkflowElement,
};
use crate::env::Bindings;
use crate::error::{ErrorCollector, SourcePosition, WdlError};
use crate::expr::typecheck::{coerce_in_place, StructTable};
use crate::stdlib::{LocalFileAccess, StdLib};
use crate::types::Type;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::collections::HashSet;

impl Declaration {
    /// Resolve the declared type, check the bound expression against it,
    /// and make the implicit coercion explicit.
    fn typecheck(
        &mut self,
        type_env: &Bindings<Type>,
        stdlib: &StdLib,
        structs: &StructTable,
        errors: &mut ErrorCollector,
        in_output_section: bool,
    ) {
        match self.decl_type.resolve_structs(structs) {
            Ok(resolved) => self.decl_type = resolved,
            Err(_) => {
                errors.append(WdlError::validation(
                    self.pos.clone(),
                    format!("unknown type in declaration of {}", self.name),
                ));
                return;
            }
        }

        let Some(expr) = self.expr.as_mut() else {
            return;
        };
        let Some(inferred) = errors.try_with(|| expr.infer_type(type_env, stdlib, structs)) else {
            return;
        };
        if inferred.check_coercion(&self.decl_type, true).is_err() {
            errors.append(WdlError::type_mismatch(
                expr.pos().clone(),
                self.decl_type.to_string(),
                inferred.to_string(),
            ));
            return;
        }
        if inferred.questionable_coercion(&self.decl_type) && !in_output_section {
            log::warn!(
                "{}:{}: coercing String to {} outside an output section",
                self.pos.uri,
                self.pos.line,
                self.decl_type
            );
        }
        coerce_in_place(expr, &self.decl_type);
    }

    /// Bind this declaration, rejecting redeclaration of a visible name.
    fn bind(
        &self,
        type_env: Bindings<Type>,
        errors: &mut ErrorCollector,
        provenance: &str,
    ) -> Bindings<Type> {
        if type_env.has_binding(&self.name) || type_env.has_namespace(&self.name) {
            errors.append(WdlError::MultipleDefinitions {
                pos: self.pos.clone(),
                message: format!("{} is already declared in this scope", self.name),
            });
            return type_env;
        }
        type_env.bind(
            self.name.clone(),
            self.decl_type.clone(),
            Some(provenance.to_string()),
        )
    }
}

impl Task {
    pub fn typecheck(&mut self, structs: &StructTable) -> Result<(), WdlError> {
        log::debug!("typechecking task {}", self.name);
        let stdlib = StdLib::new(self.effective_version);
        let output_stdlib = StdLib::with_file_access(
            self.effective_version,
            Box::new(LocalFileAccess::new(std::path::PathBuf::from("."))),
            true,
        );
        let mut errors = ErrorCollector::new();
        let mut type_env: Bindings<Type> = Bindings::new();

        for input in &mut self.inputs {
            input.typecheck(&type_env, &stdlib, structs, &mut errors, false);
            type_env = input.bind(type_env, &mut errors, "input");
        }
        for decl in &mut self.postinputs {
            decl.typecheck(&type_env, &stdlib, structs, &mut errors, false);
            type_env = decl.bind(type_env, &mut errors, "decl");
        }

        for part in &mut self.command.parts {
            if let crate::expr::StringPart::Placeholder(expr) = part {
                errors.try_with(|| expr.infer_type(&type_env, &stdlib, structs));
            }
        }

        for expr in self.runtime.values_mut() {
            errors.try_with(|| expr.infer_type(&type_env, &stdlib, structs));
        }
        for expr in self.hints.values_mut() {
            errors.try_with(|| expr.infer_type(&type_env, &stdlib, structs));
        }

        for output in &mut self.outputs {
            output.typecheck(&type_env, &output_stdlib, structs, &mut errors, true);
            type_env = output.bind(type_env, &mut errors, "output");
        }

        errors.finish()
    }

    fn callee_signature(&self) -> CalleeSignature {
        CalleeSignature {
            inputs: self
                .available_inputs()
                .iter()
                .map(|d| {
                    (
                        d.name.clone(),
                        (d.decl_type.clone(), d.expr.is_some()),
                    )
                })
                .collect(),
            outputs: self
                .outputs
                .iter()
                .map(|d| (d.name.clone(), d.decl_type.clone()))
                .collect(),
        }
    }
}

impl Workflow {
    pub fn typecheck(
        &mut self,
        structs: &StructTable,
        callables: &HashMap<String, CalleeSignature>,
    ) -> Result<(), WdlError> {
        log::debug!("typechecking workflow {}", self.name);
        let stdlib = StdLib::new(self.effective_version);
        let mut errors = ErrorCollector::new();
        let mut type_env: Bindings<Type> = Bindings::new();
        let mut complete_calls = true;

        for input in &mut self.inputs {
            input.typecheck(&type_env, &stdlib, structs, &mut errors, false);
            type_env = input.bind(type_env, &mut errors, "input");
        }

        for element in &mut self.body {
            typecheck_element(
                element,
                &mut type_env,
                &stdlib,
                structs,
                callables,
                &mut errors,
                &mut complete_calls,
            );
        }

        for output in &mut self.outputs {
            output.typecheck(&type_env, &stdlib, structs, &mut errors, true);
            type_env = output.bind(type_env, &mut errors, "output");
        }

        self.complete_calls = Some(complete_calls);
        self.type_env = Some(type_env);
        errors.finish()
    }

    fn callee_signature(&self) -> CalleeSignature {
        CalleeSignature {
            inputs: self
                .available_inputs()
                .iter()
                .map(|d| (d.name.clone(), (d.decl_type.clone(), d.expr.is_some())))
                .collect(),
            outputs: self
                .outputs
                .iter()
                .map(|d| (d.name.clone(), d.decl_type.clone()))
                .collect(),
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn typecheck_element(
    element: &mut WorkflowElement,
    type_env: &mut Bindings<Type>,
    stdlib: &StdLib,
    structs: &StructTable,
    callables: &HashMap<String, CalleeSignature>,
    errors: &mut ErrorCollector,
    complete_calls: &mut bool,
) {
    match element {
        WorkflowElement::Declaration(decl) => {
            decl.typecheck(type_env, stdlib, structs, errors, false);
            *type_env = decl.bind(type_env.clone(), errors, "decl");
        }
        WorkflowElement::Call(call) => {
            typecheck_call(call, type_env, stdlib, structs, callables, errors, complete_calls)
        }
        WorkflowElement::Scatter(scatter) => {
            typecheck_scatter(scatter, type_env, stdlib, structs, callables, errors, complete_calls)
        }
        WorkflowElement::Conditional(conditional) => typecheck_conditional(
            conditional,
            type_env,
            stdlib,
            structs,
            callables,
            errors,
            complete_calls,
        ),
    }
}

fn typecheck_call(
    call: &mut Call,
    type_env: &mut Bindings<Type>,
    stdlib: &StdLib,
    structs: &StructTable,
    callables: &HashMap<String, CalleeSignature>,
    errors: &mut ErrorCollector,
    complete_calls: &mut bool,
) {
    let Some(callee) = callables.get(&call.target).cloned() else {
        errors.append(WdlError::NoSuchTask {
            pos: call.pos.clone(),
            name: call.target.clone(),
        });
        *complete_calls = false;
        return;
    };

    for after in &call.afters {
        if !type_env.has_binding(after) && !type_env.has_namespace(after) {
            errors.append(WdlError::UnknownIdentifier {
                pos: call.pos.clone(),
                name: after.clone(),
            });
        }
    }

    for (name, expr) in call.inputs.iter_mut() {
        let Some((input_type, _)) = callee.inputs.get(name) else {
            errors.append(WdlError::NoSuchInput {
                pos: expr.pos().clone(),
                name: name.clone(),
            });
            continue;
        };
        let Some(inferred) = errors.try_with(|| expr.infer_type(type_env, stdlib, structs)) else {
            continue;
        };
        if inferred.check_coercion(input_type, true).is_err() {
            errors.append(WdlError::type_mismatch(
                expr.pos().clone(),
                input_type.to_string(),
                inferred.to_string(),
            ));
            continue;
        }
        coerce_in_place(expr, input_type);
    }

    for (name, (input_type, has_default)) in &callee.inputs {
        let supplied = call.inputs.contains_key(name);
        if !supplied && !has_default && !input_type.is_optional() {
            errors.append(WdlError::NoSuchInput {
                pos: call.pos.clone(),
                name: format!("{} (required by {})", name, call.target),
            });
            *complete_calls = false;
        }
    }

    let call_name = call.name().to_string();
    if type_env.has_binding(&call_name) || type_env.has_namespace(&call_name) {
        errors.append(WdlError::MultipleDefinitions {
            pos: call.pos.clone(),
            message: format!("call name {} collides with an existing declaration", call_name),
        });
    } else {
        *type_env = type_env.bind(
            call_name,
            Type::call_output(callee.outputs.clone()),
            Some("call".to_string()),
        );
    }
    call.callee = Some(callee);
}

fn typecheck_scatter(
    scatter: &mut Scatter,
    type_env: &mut Bindings<Type>,
    stdlib: &StdLib,
    structs: &StructTable,
    callables: &HashMap<String, CalleeSignature>,
    errors: &mut ErrorCollector,
    complete_calls: &mut bool,
) {
    let collection_type = errors
        .try_with(|| scatter.expr.infer_type(type_env, stdlib, structs))
        .unwrap_or_else(Type::any);

    let (item_type, source_nonempty) = match &collection_type {
        Type::Array {
            item_type, nonempty, ..
        } => (item_type.as_ref().clone(), *nonempty),
        Type::Any { .. } => (Type::any(), false),
        other => {
            errors.append(WdlError::validation(
                scatter.expr.pos().clone(),
                format!("scatter collection must be an array, not {}", other),
            ));
            (Type::any(), false)
        }
    };

    if type_env.has_binding(&scatter.variable) {
        errors.append(WdlError::MultipleDefinitions {
            pos: scatter.pos.clone(),
            message: format!(
                "scatter variable {} shadows an existing declaration",
                scatter.variable
            ),
        });
    }

    let mut scatter_env = type_env.clone().bind(
        scatter.variable.clone(),
        item_type,
        Some("scatter".to_string()),
    );
    let base_env = scatter_env.clone();

    for element in &mut scatter.body {
        typecheck_element(
            element,
            &mut scatter_env,
            stdlib,
            structs,
            callables,
            errors,
            complete_calls,
        );
    }

    // Export the body's bindings as arrays; the iterator stays private.
    let added = scatter_env.bindings_since(&base_env);
    for (name, ty) in added.into_iter().rev() {
        *type_env = type_env.bind(
            name,
            Type::array(ty, false, source_nonempty),
            Some("scatter".to_string()),
        );
    }
}

fn typecheck_conditional(
    conditional: &mut Conditional,
    type_env: &mut Bindings<Type>,
    stdlib: &StdLib,
    structs: &StructTable,
    callables: &HashMap<String, CalleeSignature>,
    errors: &mut ErrorCollector,
    complete_calls: &mut bool,
) {
    if let Some(cond_type) =
        errors.try_with(|| conditional.expr.infer_type(type_env, stdlib, structs))
    {
        if !cond_type.coerces(&Type::boolean(false), true) {
            errors.append(WdlError::type_mismatch(
                conditional.expr.pos().clone(),
                "Boolean".to_string(),
                cond_type.to_string(),
            ));
        }
    }

    let mut cond_env = type_env.clone();
    let base_env = cond_env.clone();

    for element in &mut conditional.body {
        typecheck_element(
            element,
            &mut cond_env,
            stdlib,
            structs,
            callables,
            errors,
            complete_calls,
        );
    }

    // Export the body's bindings as optionals.
    let added = cond_env.bindings_since(&base_env);
    for (name, ty) in added.into_iter().rev() {
        *type_env = type_env.bind(
            name,
            ty.with_optional(true),
            Some("if".to_string()),
        );
    }
}

impl Document {
    /// Type check the whole document: structs, then tasks, then the
    /// workflow with call resolution. Returns the accumulated error list.
    pub fn typecheck(&mut self) -> Result<(), WdlError> {
        log::debug!("typechecking document {}", self.uri);
        self.check_import_namespaces()?;
        self.check_struct_collisions()?;
        let structs = resolve_struct_defs(&mut self.struct_typedefs)?;

        let mut errors = ErrorCollector::new();
        for task in &mut self.tasks {
            errors.try_with(|| task.typecheck(&structs));
        }

        let callables = self.callables();
        if let Some(workflow) = &mut self.workflow {
            errors.try_with(|| workflow.typecheck(&structs, &callables));
        }
        errors.finish()
    }

    /// Callable targets visible to this document's workflow: local tasks by
    /// name, imported tasks and workflows under their namespace.
    fn callables(&self) -> HashMap<String, CalleeSignature> {
        let mut callables = HashMap::new();
        for task in &self.tasks {
            callables.insert(task.name.clone(), task.callee_signature());
        }
        for import in &self.imports {
            let Some(doc) = &import.doc else { continue };
            for task in &doc.tasks {
                callables.insert(
                    format!("{}.{}", import.namespace, task.name),
                    task.callee_signature(),
                );
            }
            if let Some(workflow) = &doc.workflow {
                // A subworkflow is callable only with complete calls and an
                // output section.
                if workflow.complete_calls.unwrap_or(false) && !workflow.outputs.is_empty() {
                    callables.insert(
                        format!("{}.{}", import.namespace, workflow.name),
                        workflow.callee_signature(),
                    );
                }
            }
        }
        callables
    }

    fn check_import_namespaces(&self) -> Result<(), WdlError> {
        let mut seen = HashSet::new();
        for import in &self.imports {
            if !seen.insert(&import.namespace) {
                return Err(WdlError::MultipleDefinitions {
                    pos: import.pos.clone(),
                    message: format!("multiple imports with namespace {}", import.namespace),
                });
            }
        }
        Ok(())
    }

    fn check_struct_collisions(&self) -> Result<(), WdlError> {
        let mut seen: HashMap<&str, &super::StructTypeDef> = HashMap::new();
        for def in &self.struct_typedefs {
            if let Some(existing) = seen.get(def.name.as_str()) {
                if existing.type_id() != def.type_id() {
                    return Err(WdlError::MultipleDefinitions {
                        pos: def.pos.clone(),
                        message: format!(
                            "struct {} defined twice with different members",
                            def.name
                        ),
                    });
                }
            } else {
                seen.insert(&def.name, def);
            }
        }
        Ok(())
    }
}

/// Resolve struct member types recursively, rejecting definition cycles.
/// Returns the fully-resolved table used by all later inference.
pub fn resolve_struct_defs(
    defs: &mut [super::StructTypeDef],
) -> Result<StructTable, WdlError> {
    let raw: StructTable = defs
        .iter()
        .map(|d| (d.name.clone(), d.members.clone()))
        .collect();
    let positions: HashMap<String, SourcePosition> = defs
        .iter()
        .map(|d| (d.name.clone(), d.pos.clone()))
        .collect();

    fn resolve_name(
        name: &str,
        raw: &StructTable,
        resolved: &mut StructTable,
        resolving: &mut HashSet<String>,
        positions: &HashMap<String, SourcePosition>,
    ) -> Result<(), WdlError> {
        if resolved.contains_key(name) {
            return Ok(());
        }
        if !resolving.insert(name.to_string()) {
            let pos = positions
                .get(name)
                .cloned()
                .unwrap_or_else(SourcePosition::unknown);
            return Err(WdlError::CircularDependencies {
                pos,
                name: name.to_string(),
            });
        }
        let Some(members) = raw.get(name).cloned() else {
            resolving.remove(name);
            return Ok(()); // unknown names surface at the use site
        };
        let mut out = IndexMap::new();
        for (member_name, member_type) in members {
            for referenced in referenced_structs(&member_type) {
                resolve_name(&referenced, raw, resolved, resolving, positions)?;
            }
            let deep = member_type
                .resolve_structs(resolved)
                .unwrap_or(member_type);
            out.insert(member_name, deep);
        }
        resolving.remove(name);
        resolved.insert(name.to_string(), out);
        Ok(())
    }

    let mut resolved = StructTable::new();
    let mut resolving = HashSet::new();
    let names: Vec<String> = raw.keys().cloned().collect();
    for name in names {
        resolve_name(&name, &raw, &mut resolved, &mut resolving, &positions)?;
    }

    for def in defs.iter_mut() {
        if let Some(members) = resolved.get(&def.name) {
            def.members = members.clone();
        }
    }
    Ok(resolved)
}

/// Struct names referenced by a type, one level deep into parameters.
fn referenced_structs(ty: &Type) -> Vec<String> {
    match ty {
        Type::StructInstance { type_name, .. } => vec![type_name.clone()],
        _ => ty
            .parameters()
            .iter()
            .flat_map(|p| referenced_structs(p))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;
    use crate::tree::lower::lower_document;

    fn check(source: &str) -> Result<Document, WdlError> {
        let mut doc = lower_document(parser::parse_document(source, "t.wdl")?)?;
        doc.typecheck()?;
        Ok(doc)
    }

    #[test]
    fn test_declaration_coercion_elaborated() {
        let doc = check(
            r#"version 1.0
workflow w {
  Int x = 3
  Float y = x
}"#,
        )
        .unwrap();
        let workflow = doc.workflow.unwrap();
        let WorkflowElement::Declaration(y) = &workflow.body[1] else {
            panic!("expected declaration")
        };
        assert!(matches!(
            y.expr.as_ref().unwrap(),
            crate::expr::Expression::Coerce { .. }
        ));
    }

    #[test]
    fn test_use_before_define() {
        assert!(check(
            r#"version 1.0
workflow w {
  Int y = x
  Int x = 1
}"#,
        )
        .is_err());
    }

    #[test]
    fn test_redeclaration_rejected() {
        assert!(check(
            r#"version 1.0
workflow w {
  Int x = 1
  Int x = 2
}"#,
        )
        .is_err());
    }

    #[test]
    fn test_nested_shadowing_rejected() {
        assert!(check(
            r#"version 1.0
workflow w {
  Int x = 1
  scatter (i in [1]) {
    Int x = 2
  }
}"#,
        )
        .is_err());
    }

    #[test]
    fn test_scatter_shape() {
        let doc = check(
            r#"version 1.0
workflow w {
  scatter (i in [1, 2, 3]) {
    Int y = i + 1
  }
}"#,
        )
        .unwrap();
        let env = doc.workflow.unwrap().type_env.unwrap();
        assert_eq!(
            env.resolve("y"),
            Some(&Type::array(Type::int(false), false, true))
        );
        // The iterator is not exported.
        assert!(!env.has_binding("i"));
    }

    #[test]
    fn test_conditional_shape_and_nesting() {
        let doc = check(
            r#"version 1.0
workflow w {
  Boolean go = true
  if (go) {
    Int a = 1
    scatter (i in [1, 2]) {
      Int b = i
    }
  }
  scatter (j in [1]) {
    if (go) {
      Int c = j
    }
  }
}"#,
        )
        .unwrap();
        let env = doc.workflow.unwrap().type_env.unwrap();
        assert_eq!(env.resolve("a"), Some(&Type::int(true)));
        // scatter inside conditional: Optional(Array(Int)).
        assert_eq!(
            env.resolve("b"),
            Some(&Type::array(Type::int(false), false, true).with_optional(true))
        );
        // conditional inside scatter: Array(Optional(Int)); the scatter
        // source is a non-empty literal.
        assert_eq!(
            env.resolve("c"),
            Some(&Type::array(Type::int(true), false, true))
        );
    }

    #[test]
    fn test_task_and_call_checking() {
        let doc = check(
            r#"version 1.0
task add_one {
  input {
    Int n
    Int bump = 1
  }
  command { echo ~{n + bump} }
  output {
    Int out = n + bump
  }
}
workflow w {
  call add_one { input: n = 5 }
  output {
    Int result = add_one.out
  }
}"#,
        )
        .unwrap();
        let workflow = doc.workflow.unwrap();
        assert_eq!(workflow.complete_calls, Some(true));
        let env = workflow.type_env.unwrap();
        assert_eq!(env.resolve("result"), Some(&Type::int(false)));
    }

    #[test]
    fn test_call_missing_required_input() {
        assert!(check(
            r#"version 1.0
task consume {
  input {
    Int n
  }
  command { echo ~{n} }
}
workflow w {
  call consume
}"#,
        )
        .is_err());
    }

    #[test]
    fn test_call_unknown_input_and_target() {
        assert!(check(
            r#"version 1.0
task consume {
  input { Int n }
  command { }
}
workflow w {
  call consume { input: n = 1, bogus = 2 }
}"#,
        )
        .is_err());

        assert!(check(
            r#"version 1.0
workflow w {
  call missing_task
}"#,
        )
        .is_err());
    }

    #[test]
    fn test_struct_access() {
        let doc = check(
            r#"version 1.0
struct P {
  Int a
}
workflow w {
  P p = object { a: 7 }
  Int q = p.a
}"#,
        )
        .unwrap();
        let env = doc.workflow.unwrap().type_env.unwrap();
        assert_eq!(env.resolve("q"), Some(&Type::int(false)));
    }

    #[test]
    fn test_struct_missing_member_access() {
        assert!(check(
            r#"version 1.0
struct P {
  Int a
}
workflow w {
  P p = object { a: 7 }
  Int q = p.b
}"#,
        )
        .is_err());
    }

    #[test]
    fn test_nested_struct_resolution() {
        let doc = check(
            r#"version 1.0
struct Inner {
  Int n
}
struct Outer {
  Inner inner
}
workflow w {
  Outer o = object { inner: object { n: 1 } }
  Int n = o.inner.n
}"#,
        )
        .unwrap();
        let env = doc.workflow.unwrap().type_env.unwrap();
        assert_eq!(env.resolve("n"), Some(&Type::int(false)));
    }

    #[test]
    fn test_cyclic_structs_rejected() {
        assert!(matches!(
            check(
                r#"version 1.0
struct A {
  B b
}
struct B {
  A a
}
workflow w { }"#,
            ),
            Err(WdlError::CircularDependencies { .. })
        ));
    }

    #[test]
    fn test_multiple_diagnostics_in_one_pass() {
        let err = check(
            r#"version 1.0
workflow w {
  Int a = missing_one
  Int b = missing_two
}"#,
        )
        .unwrap_err();
        match err {
            WdlError::MultipleValidation { count, .. } => assert!(count >= 2),
            other => panic!("unexpected {:?}", other),
        }
    }
}
