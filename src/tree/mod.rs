//! Version-neutral AST for documents, tasks, and workflows.
//!
//! Every version's CST lowers into these nodes ([`lower`]), which are what
//! the type checker annotates ([`typecheck`]) and the evaluator consumes
//! ([`eval`]). Ordered containers preserve source order throughout.

use crate::env::Bindings;
use crate::error::{HasSourcePosition, SourcePosition};
use crate::expr::{Expression, StringPart};
use crate::parser::Version;
use crate::source::CommentMap;
use crate::types::Type;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

pub mod eval;
pub mod lower;
pub mod typecheck;

/// A named struct definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructTypeDef {
    pub pos: SourcePosition,
    pub name: String,
    pub members: IndexMap<String, Type>,
    /// Set when the definition was stitched in from an imported document.
    pub imported: bool,
}

impl StructTypeDef {
    /// Canonical identity: two structs with the same id are interchangeable.
    pub fn type_id(&self) -> String {
        crate::types::struct_type_id(&self.members)
    }
}

/// A value declaration in a task, workflow, or section body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Declaration {
    pub pos: SourcePosition,
    pub decl_type: Type,
    pub name: String,
    pub expr: Option<Expression>,
}

impl HasSourcePosition for Declaration {
    fn source_position(&self) -> &SourcePosition {
        &self.pos
    }
}

/// The command template of a task: ordered text fragments and interpolated
/// expressions, before dedenting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandSection {
    pub pos: SourcePosition,
    pub parts: Vec<StringPart>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub pos: SourcePosition,
    pub name: String,
    /// `input {}` declarations. Empty for draft-2 tasks, whose inputs are
    /// the `postinputs` without defaults.
    pub inputs: Vec<Declaration>,
    /// Declarations outside the input section.
    pub postinputs: Vec<Declaration>,
    pub command: CommandSection,
    pub outputs: Vec<Declaration>,
    pub runtime: IndexMap<String, Expression>,
    pub hints: IndexMap<String, Expression>,
    pub meta: IndexMap<String, JsonValue>,
    pub parameter_meta: IndexMap<String, JsonValue>,
    pub effective_version: Version,
}

impl Task {
    /// The declarations callers may bind.
    pub fn available_inputs(&self) -> &[Declaration] {
        if !self.inputs.is_empty() {
            &self.inputs
        } else {
            &self.postinputs
        }
    }

    /// Unbound, non-optional inputs; a call must supply these.
    pub fn required_inputs(&self) -> Vec<&Declaration> {
        self.available_inputs()
            .iter()
            .filter(|d| d.expr.is_none() && !d.decl_type.is_optional())
            .collect()
    }

    pub fn find_input(&self, name: &str) -> Option<&Declaration> {
        self.available_inputs().iter().find(|d| d.name == name)
    }
}

impl HasSourcePosition for Task {
    fn source_position(&self) -> &SourcePosition {
        &self.pos
    }
}

/// Input and output surface of a call's resolved target, captured at
/// resolution time so checking does not hold a reference into another
/// document.
#[derive(Debug, Clone, PartialEq)]
pub struct CalleeSignature {
    /// input name -> (type, has_default)
    pub inputs: IndexMap<String, (Type, bool)>,
    pub outputs: IndexMap<String, Type>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Call {
    pub pos: SourcePosition,
    /// Task or workflow name, possibly namespaced (`lib.align`).
    pub target: String,
    pub alias: Option<String>,
    pub afters: Vec<String>,
    pub inputs: IndexMap<String, Expression>,
    /// Filled during type checking.
    #[serde(skip)]
    pub callee: Option<CalleeSignature>,
}

impl Call {
    /// The name the call's outputs are bound under.
    pub fn name(&self) -> &str {
        match &self.alias {
            Some(alias) => alias,
            None => self.target.rsplit('.').next().unwrap_or(&self.target),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scatter {
    pub pos: SourcePosition,
    pub variable: String,
    pub expr: Expression,
    pub body: Vec<WorkflowElement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conditional {
    pub pos: SourcePosition,
    pub expr: Expression,
    pub body: Vec<WorkflowElement>,
}

/// One element of a workflow body, in source order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WorkflowElement {
    Declaration(Declaration),
    Call(Call),
    Scatter(Box<Scatter>),
    Conditional(Box<Conditional>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub pos: SourcePosition,
    pub name: String,
    pub inputs: Vec<Declaration>,
    pub body: Vec<WorkflowElement>,
    pub outputs: Vec<Declaration>,
    pub meta: IndexMap<String, JsonValue>,
    pub parameter_meta: IndexMap<String, JsonValue>,
    pub effective_version: Version,
    /// Whether every call in the body has its required inputs supplied,
    /// decided during type checking; a subworkflow must also have outputs
    /// to be callable.
    pub complete_calls: Option<bool>,
    /// Top-level symbol table left behind by type checking.
    #[serde(skip)]
    pub type_env: Option<Bindings<Type>>,
}

impl Workflow {
    /// Declarations callers may bind: the input section, or for draft-2
    /// the unbound top-level body declarations.
    pub fn available_inputs(&self) -> Vec<&Declaration> {
        if !self.inputs.is_empty() {
            return self.inputs.iter().collect();
        }
        self.body
            .iter()
            .filter_map(|element| match element {
                WorkflowElement::Declaration(d) if d.expr.is_none() => Some(d),
                _ => None,
            })
            .collect()
    }

    pub fn required_inputs(&self) -> Vec<&Declaration> {
        self.available_inputs()
            .into_iter()
            .filter(|d| d.expr.is_none() && !d.decl_type.is_optional())
            .collect()
    }
}

impl PartialEq for Workflow {
    fn eq(&self, other: &Self) -> bool {
        // type_env is derived state.
        self.pos == other.pos
            && self.name == other.name
            && self.inputs == other.inputs
            && self.body == other.body
            && self.outputs == other.outputs
            && self.meta == other.meta
            && self.parameter_meta == other.parameter_meta
            && self.effective_version == other.effective_version
            && self.complete_calls == other.complete_calls
    }
}

/// An import statement; `doc` is filled by the loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportDoc {
    pub pos: SourcePosition,
    pub uri: String,
    pub namespace: String,
    /// `alias Old as New` pairs.
    pub aliases: Vec<(String, String)>,
    #[serde(skip)]
    pub doc: Option<Box<Document>>,
}

impl ImportDoc {
    pub fn new(
        pos: SourcePosition,
        uri: String,
        namespace: Option<String>,
        aliases: Vec<(String, String)>,
    ) -> Self {
        let namespace = namespace.unwrap_or_else(|| infer_namespace(&uri));
        Self {
            pos,
            uri,
            namespace,
            aliases,
            doc: None,
        }
    }
}

/// Default namespace of an import: the file stem of its URI.
fn infer_namespace(uri: &str) -> String {
    let mut ns = uri;
    if let Some(slash) = ns.rfind('/') {
        ns = &ns[slash + 1..];
    }
    if let Some(query) = ns.find('?') {
        ns = &ns[..query];
    }
    if let Some(dot) = ns.rfind('.') {
        ns = &ns[..dot];
    }
    ns.to_string()
}

/// A lowered WDL document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub pos: SourcePosition,
    pub version: Version,
    pub imports: Vec<ImportDoc>,
    pub struct_typedefs: Vec<StructTypeDef>,
    pub tasks: Vec<Task>,
    pub workflow: Option<Workflow>,
    pub comments: CommentMap,
    pub uri: String,
    pub abspath: String,
}

impl Document {
    pub fn find_task(&self, name: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.name == name)
    }

    pub fn find_struct(&self, name: &str) -> Option<&StructTypeDef> {
        self.struct_typedefs.iter().find(|s| s.name == name)
    }

    /// Struct definitions as a name -> members map for type resolution.
    pub fn struct_table(&self) -> IndexMap<String, IndexMap<String, Type>> {
        self.struct_typedefs
            .iter()
            .map(|s| (s.name.clone(), s.members.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos() -> SourcePosition {
        SourcePosition::new("t.wdl".to_string(), "/t.wdl".to_string(), 1, 1, 1, 2)
    }

    fn decl(name: &str, ty: Type, bound: bool) -> Declaration {
        Declaration {
            pos: pos(),
            decl_type: ty,
            name: name.to_string(),
            expr: bound.then(|| Expression::int(pos(), 1)),
        }
    }

    fn bare_task(inputs: Vec<Declaration>, postinputs: Vec<Declaration>) -> Task {
        Task {
            pos: pos(),
            name: "t".to_string(),
            inputs,
            postinputs,
            command: CommandSection {
                pos: pos(),
                parts: vec![],
            },
            outputs: vec![],
            runtime: IndexMap::new(),
            hints: IndexMap::new(),
            meta: IndexMap::new(),
            parameter_meta: IndexMap::new(),
            effective_version: Version::V1_0,
        }
    }

    #[test]
    fn test_task_required_inputs() {
        let task = bare_task(
            vec![
                decl("a", Type::int(false), false),
                decl("b", Type::int(true), false),
                decl("c", Type::int(false), true),
            ],
            vec![],
        );
        let required: Vec<&str> = task.required_inputs().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(required, vec!["a"]);
    }

    #[test]
    fn test_draft2_task_inputs_are_postinputs() {
        let task = bare_task(vec![], vec![decl("x", Type::file(false), false)]);
        assert_eq!(task.available_inputs().len(), 1);
        assert_eq!(task.available_inputs()[0].name, "x");
    }

    #[test]
    fn test_workflow_inputs() {
        let workflow = Workflow {
            pos: pos(),
            name: "w".to_string(),
            inputs: vec![],
            body: vec![
                WorkflowElement::Declaration(decl("r", Type::file(false), false)),
                WorkflowElement::Declaration(decl("n", Type::int(false), true)),
            ],
            outputs: vec![],
            meta: IndexMap::new(),
            parameter_meta: IndexMap::new(),
            effective_version: Version::Draft2,
            complete_calls: None,
            type_env: None,
        };
        // Draft-2 form: unbound top-level declarations are the inputs.
        let available: Vec<&str> = workflow
            .available_inputs()
            .iter()
            .map(|d| d.name.as_str())
            .collect();
        assert_eq!(available, vec!["r"]);
        assert_eq!(workflow.required_inputs().len(), 1);
    }

    #[test]
    fn test_call_name() {
        let call = Call {
            pos: pos(),
            target: "lib.align".to_string(),
            alias: None,
            afters: vec![],
            inputs: IndexMap::new(),
            callee: None,
        };
        assert_eq!(call.name(), "align");

        let aliased = Call {
            alias: Some("map".to_string()),
            ..call
        };
        assert_eq!(aliased.name(), "map");
    }

    #[test]
    fn test_infer_namespace() {
        assert_eq!(infer_namespace("lib/tasks.wdl"), "tasks");
        assert_eq!(infer_namespace("https://host/a/b.wdl?x=1"), "b");
        assert_eq!(infer_namespace("plain.wdl"), "plain");
    }
}
