//! End-to-end tests over the full pipeline: source text -> CST -> AST ->
//! typed AST -> values / command strings.

use wdlfront::env::Bindings;
use wdlfront::error::WdlError;
use wdlfront::parser::{self, Version};
use wdlfront::stdlib::StdLib;
use wdlfront::tree::eval::{apply_elements, dedent};
use wdlfront::tree::lower::lower_document;
use wdlfront::tree::{Document, WorkflowElement};
use wdlfront::types::Type;
use wdlfront::value::Value;

fn check(source: &str) -> Result<Document, WdlError> {
    let mut doc = lower_document(parser::parse_document(source, "test.wdl")?)?;
    doc.typecheck()?;
    Ok(doc)
}

fn stdlib() -> StdLib {
    StdLib::new(Version::V1_0)
}

fn eval_workflow(doc: &Document) -> Bindings<Value> {
    apply_elements(
        &doc.workflow.as_ref().unwrap().body,
        &Bindings::new(),
        &stdlib(),
    )
    .unwrap()
}

#[test]
fn declaration_coercion() {
    // Int x = 3 ; Float y = x : both typecheck, y evaluates to 3.0.
    let doc = check(
        r#"version 1.0
workflow w {
  Int x = 3
  Float y = x
}"#,
    )
    .unwrap();
    let env = doc.workflow.as_ref().unwrap().type_env.as_ref().unwrap();
    assert_eq!(env.resolve("x"), Some(&Type::int(false)));
    assert_eq!(env.resolve("y"), Some(&Type::float(false)));

    let ctx = eval_workflow(&doc);
    assert_eq!(ctx.resolve("y"), Some(&Value::float(3.0)));
}

#[test]
fn division_by_zero_at_eval_time() {
    // Inference succeeds; evaluation reports the division's span.
    let doc = check(
        r#"version 1.0
workflow w {
  Int z = 10 / 0
}"#,
    )
    .unwrap();
    let err = apply_elements(
        &doc.workflow.as_ref().unwrap().body,
        &Bindings::new(),
        &stdlib(),
    )
    .unwrap_err();
    match err {
        WdlError::DivisionByZero { pos } => {
            assert_eq!(pos.line, 3);
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn scatter_shape_and_values() {
    let doc = check(
        r#"version 1.0
workflow w {
  scatter (i in [1, 2, 3]) {
    Int y = i + 1
  }
}"#,
    )
    .unwrap();
    // Outer scope sees y: Array[Int]+ (the collection is a non-empty
    // literal); the iterator is not exported.
    let env = doc.workflow.as_ref().unwrap().type_env.as_ref().unwrap();
    assert_eq!(
        env.resolve("y"),
        Some(&Type::array(Type::int(false), false, true))
    );
    assert!(!env.has_binding("i"));

    let ctx = eval_workflow(&doc);
    assert_eq!(
        ctx.resolve("y"),
        Some(&Value::array(
            Type::int(false),
            vec![Value::int(2), Value::int(3), Value::int(4)]
        ))
    );
}

#[test]
fn placeholder_sep_materialization() {
    let doc = check(
        r#"version 1.0
task t {
  input {
    Array[Int] a = [1, 2, 3]
  }
  command {
    echo ~{sep=", " a}
  }
}"#,
    )
    .unwrap();
    let command = doc.tasks[0]
        .materialize_command(&Bindings::new(), &stdlib())
        .unwrap();
    assert_eq!(command, "echo 1, 2, 3");
}

#[test]
fn command_dedent() {
    let doc = check(
        "version 1.0\ntask t {\n  command <<<\n    python <<CODE\n    import os\n    CODE\n  >>>\n}",
    )
    .unwrap();
    let command = doc.tasks[0]
        .materialize_command(&Bindings::new(), &stdlib())
        .unwrap();
    assert_eq!(command, "python <<CODE\nimport os\nCODE");
}

#[test]
fn struct_access() {
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
    let ctx = eval_workflow(&doc);
    assert_eq!(ctx.resolve("q"), Some(&Value::int(7)));

    // Accessing a missing member is a static error.
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
fn draft2_and_v2_dialects() {
    // No version directive: draft-2, bare task inputs, ${} placeholders.
    let doc = check(
        "task greet {\n  String who\n  command {\n    echo hello ${who}\n  }\n}",
    )
    .unwrap();
    assert_eq!(doc.version, Version::Draft2);
    let inputs = Bindings::new().bind(
        "who".to_string(),
        Value::string("world".to_string()),
        None,
    );
    let command = doc.tasks[0].materialize_command(&inputs, &stdlib()).unwrap();
    assert_eq!(command, "echo hello world");

    // 2.0: Directory type and hints section parse.
    let doc = check(
        r#"version 2.0
task stage {
  input {
    Directory work
  }
  command <<<
    ls ~{work}
  >>>
  hints {
    max_retries: 2
  }
}"#,
    )
    .unwrap();
    assert_eq!(doc.version, Version::V2_0);
    assert_eq!(doc.tasks[0].hints.len(), 1);

    // Directory is not available before 2.0.
    assert!(check(
        "version 1.0\ntask t {\n  input { Directory d }\n  command { }\n}"
    )
    .is_err());
}

#[test]
fn conditional_wrapping_and_evaluation() {
    let doc = check(
        r#"version 1.0
workflow w {
  Boolean go = false
  if (go) {
    Int a = 1
  }
  Int b = if defined(a) then 1 else 0
}"#,
    )
    .unwrap();
    let env = doc.workflow.as_ref().unwrap().type_env.as_ref().unwrap();
    assert_eq!(env.resolve("a"), Some(&Type::int(true)));

    let ctx = eval_workflow(&doc);
    assert_eq!(ctx.resolve("a"), Some(&Value::null()));
    assert_eq!(ctx.resolve("b"), Some(&Value::int(0)));
}

#[test]
fn typed_ast_carries_prototypes_and_coercions() {
    let doc = check(
        r#"version 1.0
workflow w {
  Float n = length([1, 2])
}"#,
    )
    .unwrap();
    let WorkflowElement::Declaration(decl) = &doc.workflow.as_ref().unwrap().body[0] else {
        panic!("expected declaration")
    };
    // Int result of length() is wrapped to the declared Float.
    let wdlfront::expr::Expression::Coerce { expr, target, .. } = decl.expr.as_ref().unwrap()
    else {
        panic!("expected coercion wrapper")
    };
    assert_eq!(*target, Type::float(false));
    match expr.as_ref() {
        wdlfront::expr::Expression::Apply { prototype, .. } => {
            let prototype = prototype.as_ref().unwrap();
            assert_eq!(prototype.name, "length");
            assert_eq!(prototype.return_type, Type::int(false));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn error_accumulation_reports_all_diagnostics() {
    let err = check(
        r#"version 1.0
workflow w {
  Int a = nope_one
  Int b = nope_two
  Boolean c = 1 && true
}"#,
    )
    .unwrap_err();
    match err {
        WdlError::MultipleValidation { count, exceptions } => {
            assert!(count >= 3, "only {} diagnostics: {:?}", count, exceptions);
            // Sorted by source position.
            let lines: Vec<u32> = exceptions
                .iter()
                .filter_map(|e| e.source_position().map(|p| p.line))
                .collect();
            let mut sorted = lines.clone();
            sorted.sort();
            assert_eq!(lines, sorted);
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn meta_sections_survive_lowering() {
    let doc = check(
        r#"version 1.0
task t {
  command { }
  meta {
    author: "someone"
    version: null
  }
  parameter_meta {
    n: { help: "a count" }
  }
}"#,
    )
    .unwrap();
    let task = &doc.tasks[0];
    assert_eq!(task.meta["author"], serde_json::json!("someone"));
    assert_eq!(task.meta["version"], serde_json::Value::Null);
    assert_eq!(task.parameter_meta["n"]["help"], serde_json::json!("a count"));
}

#[test]
fn dedent_is_idempotent() {
    for case in [
        "    python <<CODE\n    import os\n    CODE",
        "\n  a\n    b\n",
        "no indent",
        "",
        "\t tab\n\t\ttabs",
    ] {
        let once = dedent(case);
        assert_eq!(dedent(&once), once, "dedent not idempotent for {:?}", case);
    }
}

#[test]
fn value_json_interface() {
    let doc = check(
        r#"version 1.0
workflow w {
  Map[String, Int] counts = {"a": 1, "b": 2}
  Pair[Int, String] p = (1, "x")
  Array[Float] xs = [1.5, 2.5]
}"#,
    )
    .unwrap();
    let ctx = eval_workflow(&doc);
    assert_eq!(
        ctx.resolve("counts").unwrap().to_json(),
        serde_json::json!({"a": 1, "b": 2})
    );
    assert_eq!(
        ctx.resolve("p").unwrap().to_json(),
        serde_json::json!({"left": 1, "right": "x"})
    );
    assert_eq!(
        ctx.resolve("xs").unwrap().to_json(),
        serde_json::json!([1.5, 2.5])
    );
}
