//! The WDL standard library.
//!
//! Functions are prototype records in a registry, not methods: each entry
//! knows its overloaded signatures and how to evaluate itself on values.
//! The checker resolves a call to one [`FunctionSignature`] via
//! [`StdLib::resolve`]; the evaluator dispatches through [`StdLib::call`].
//! Binary and unary operators live in the same registry under `_`-prefixed
//! names. I/O-bearing functions (`read_*`, `write_*`, `size`, `glob`,
//! `stdout`, `stderr`) never touch the filesystem directly; they go through
//! the injected [`FileAccess`].

use crate::error::{SourcePosition, WdlError};
use crate::parser::Version;
use crate::types::Type;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

pub mod arrays;
pub mod io;
pub mod math;
pub mod operators;
pub mod strings;
pub mod types;

/// A resolved function prototype, recorded on `Apply` nodes by the checker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionSignature {
    pub name: String,
    pub param_types: Vec<Type>,
    pub return_type: Type,
}

impl FunctionSignature {
    pub fn new(name: impl Into<String>, param_types: Vec<Type>, return_type: Type) -> Self {
        Self {
            name: name.into(),
            param_types,
            return_type,
        }
    }
}

impl std::fmt::Display for FunctionSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let params: Vec<String> = self.param_types.iter().map(|t| t.to_string()).collect();
        write!(f, "{}({}) -> {}", self.name, params.join(", "), self.return_type)
    }
}

/// One standard-library function (or operator).
pub trait Function: Send + Sync {
    fn name(&self) -> &str;

    /// Resolve the prototype for the given argument types, or explain why
    /// none applies.
    fn infer_type(
        &self,
        pos: &SourcePosition,
        arg_types: &[Type],
    ) -> Result<FunctionSignature, WdlError>;

    /// Evaluate on already-evaluated argument values.
    fn eval(
        &self,
        pos: &SourcePosition,
        args: &[Value],
        stdlib: &StdLib,
    ) -> Result<Value, WdlError>;
}

/// File access injected into I/O-bearing stdlib functions.
pub trait FileAccess: Send + Sync {
    fn read_string(&self, path: &str) -> Result<String, WdlError>;

    /// Write `content` to a fresh file and return its path.
    fn write_string(&self, content: &str) -> Result<String, WdlError>;

    fn size(&self, path: &str) -> Result<f64, WdlError>;

    fn glob(&self, pattern: &str) -> Result<Vec<String>, WdlError>;

    /// Path of the captured standard output of the current task attempt.
    fn stdout_path(&self) -> Result<String, WdlError>;

    fn stderr_path(&self) -> Result<String, WdlError>;
}

/// Filesystem-backed [`FileAccess`] rooted in one directory.
pub struct LocalFileAccess {
    root: PathBuf,
}

impl LocalFileAccess {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let p = PathBuf::from(path);
        if p.is_absolute() {
            p
        } else {
            self.root.join(p)
        }
    }
}

impl FileAccess for LocalFileAccess {
    fn read_string(&self, path: &str) -> Result<String, WdlError> {
        std::fs::read_to_string(self.resolve(path)).map_err(|e| WdlError::Runtime {
            message: format!("failed to read {}: {}", path, e),
        })
    }

    fn write_string(&self, content: &str) -> Result<String, WdlError> {
        use std::io::Write;
        let dir = self.root.join("write_");
        std::fs::create_dir_all(&dir).map_err(|e| WdlError::Runtime {
            message: format!("failed to create {}: {}", dir.display(), e),
        })?;
        let mut file = tempfile::Builder::new()
            .prefix("wdl")
            .tempfile_in(&dir)
            .map_err(|e| WdlError::Runtime {
                message: format!("failed to create temporary file: {}", e),
            })?;
        file.write_all(content.as_bytes())
            .map_err(|e| WdlError::Runtime {
                message: format!("failed to write temporary file: {}", e),
            })?;
        let (_, path) = file.keep().map_err(|e| WdlError::Runtime {
            message: format!("failed to persist temporary file: {}", e),
        })?;
        Ok(path.to_string_lossy().into_owned())
    }

    fn size(&self, path: &str) -> Result<f64, WdlError> {
        let metadata = std::fs::metadata(self.resolve(path)).map_err(|e| WdlError::Runtime {
            message: format!("failed to stat {}: {}", path, e),
        })?;
        Ok(metadata.len() as f64)
    }

    fn glob(&self, pattern: &str) -> Result<Vec<String>, WdlError> {
        // Shell-style globbing over one directory level; enough for the
        // common `glob("*.txt")` patterns.
        let (dir, file_pattern) = match pattern.rsplit_once('/') {
            Some((d, f)) => (self.root.join(d), f.to_string()),
            None => (self.root.clone(), pattern.to_string()),
        };
        let regex = glob_to_regex(&file_pattern)?;
        let mut matches = Vec::new();
        let entries = std::fs::read_dir(&dir).map_err(|e| WdlError::Runtime {
            message: format!("failed to list {}: {}", dir.display(), e),
        })?;
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            if regex.is_match(&name) {
                matches.push(entry.path().to_string_lossy().into_owned());
            }
        }
        matches.sort();
        Ok(matches)
    }

    fn stdout_path(&self) -> Result<String, WdlError> {
        Ok(self.root.join("stdout.txt").to_string_lossy().into_owned())
    }

    fn stderr_path(&self) -> Result<String, WdlError> {
        Ok(self.root.join("stderr.txt").to_string_lossy().into_owned())
    }
}

fn glob_to_regex(pattern: &str) -> Result<regex::Regex, WdlError> {
    let mut out = String::from("^");
    for c in pattern.chars() {
        match c {
            '*' => out.push_str("[^/]*"),
            '?' => out.push_str("[^/]"),
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }
    out.push('$');
    regex::Regex::new(&out).map_err(|e| WdlError::Runtime {
        message: format!("bad glob pattern {}: {}", pattern, e),
    })
}

/// The function registry for one WDL version and evaluation context.
pub struct StdLib {
    functions: HashMap<String, Box<dyn Function>>,
    version: Version,
    file_access: Box<dyn FileAccess>,
    /// stdout/stderr/glob resolve only inside task output sections.
    task_output_context: bool,
}

impl StdLib {
    pub fn new(version: Version) -> Self {
        Self::with_file_access(
            version,
            Box::new(LocalFileAccess::new(PathBuf::from("."))),
            false,
        )
    }

    pub fn with_file_access(
        version: Version,
        file_access: Box<dyn FileAccess>,
        task_output_context: bool,
    ) -> Self {
        let mut stdlib = StdLib {
            functions: HashMap::new(),
            version,
            file_access,
            task_output_context,
        };
        stdlib.register_builtins();
        stdlib
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn file_access(&self) -> &dyn FileAccess {
        self.file_access.as_ref()
    }

    pub fn task_output_context(&self) -> bool {
        self.task_output_context
    }

    fn register_builtins(&mut self) {
        // Operators.
        for function in operators::all() {
            self.register(function);
        }
        // Math.
        self.register(math::floor());
        self.register(math::ceil());
        self.register(math::round());
        // Arrays.
        self.register(arrays::length());
        self.register(arrays::range());
        self.register(arrays::select_first());
        self.register(arrays::select_all());
        self.register(arrays::flatten());
        self.register(arrays::transpose());
        self.register(arrays::zip());
        self.register(arrays::cross());
        self.register(arrays::prefix());
        // Strings.
        self.register(strings::sub());
        self.register(strings::basename());
        self.register(strings::sep());
        // Type inspection.
        self.register(types::defined());
        // I/O.
        self.register(io::size());
        self.register(io::glob_fn());
        self.register(io::stdout());
        self.register(io::stderr());
        self.register(io::read_lines());
        self.register(io::read_tsv());
        self.register(io::read_map());
        self.register(io::read_string());
        self.register(io::read_int());
        self.register(io::read_float());
        self.register(io::read_boolean());
        self.register(io::read_json());
        self.register(io::write_lines());
        self.register(io::write_tsv());
        self.register(io::write_map());
        self.register(io::write_json());
    }

    fn register(&mut self, function: Box<dyn Function>) {
        self.functions.insert(function.name().to_string(), function);
    }

    /// Replace or add a function (for embedders extending the library).
    pub fn add_function(&mut self, function: Box<dyn Function>) {
        self.register(function);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Function> {
        self.functions.get(name).map(|f| f.as_ref())
    }

    /// Resolve a call to a prototype.
    pub fn resolve(
        &self,
        name: &str,
        pos: &SourcePosition,
        arg_types: &[Type],
    ) -> Result<FunctionSignature, WdlError> {
        let Some(function) = self.get(name) else {
            return Err(WdlError::NoSuchFunction {
                pos: pos.clone(),
                name: name.to_string(),
            });
        };
        if matches!(name, "stdout" | "stderr" | "glob") && !self.task_output_context {
            return Err(WdlError::validation(
                pos.clone(),
                format!("{}() is only available in task output sections", name),
            ));
        }
        function.infer_type(pos, arg_types)
    }

    /// Evaluate a call on argument values.
    pub fn call(
        &self,
        name: &str,
        pos: &SourcePosition,
        args: &[Value],
    ) -> Result<Value, WdlError> {
        let Some(function) = self.get(name) else {
            return Err(WdlError::NoSuchFunction {
                pos: pos.clone(),
                name: name.to_string(),
            });
        };
        function.eval(pos, args, self)
    }
}

/// A function defined by a fixed table of overloads and one value-level
/// body. Resolution picks the overload whose parameters all accept the
/// argument types under coercion, preferring the most specific; a tie
/// between different result types is an ambiguity error.
pub struct StaticFunction {
    name: String,
    overloads: Vec<(Vec<Type>, Type)>,
    body: Box<dyn Fn(&[Value], &StdLib) -> Result<Value, WdlError> + Send + Sync>,
}

pub fn create_static_function<F>(
    name: impl Into<String>,
    overloads: Vec<(Vec<Type>, Type)>,
    body: F,
) -> Box<dyn Function>
where
    F: Fn(&[Value], &StdLib) -> Result<Value, WdlError> + Send + Sync + 'static,
{
    Box::new(StaticFunction {
        name: name.into(),
        overloads,
        body: Box::new(body),
    })
}

/// Exact-type matches, used to order candidate overloads.
fn specificity(params: &[Type], arg_types: &[Type]) -> usize {
    params
        .iter()
        .zip(arg_types)
        .filter(|(param, arg)| param == arg)
        .count()
}

impl Function for StaticFunction {
    fn name(&self) -> &str {
        &self.name
    }

    fn infer_type(
        &self,
        pos: &SourcePosition,
        arg_types: &[Type],
    ) -> Result<FunctionSignature, WdlError> {
        if !self.overloads.iter().any(|(p, _)| p.len() == arg_types.len()) {
            return Err(WdlError::WrongArity {
                pos: pos.clone(),
                function: self.name.clone(),
                expected: self.overloads[0].0.len(),
            });
        }

        let candidates: Vec<(Vec<Type>, Type)> = self
            .overloads
            .iter()
            .filter(|(params, _)| {
                params.len() == arg_types.len()
                    && arg_types
                        .iter()
                        .zip(params.iter())
                        .all(|(arg, param)| arg.coerces(param, true))
            })
            .cloned()
            .collect();

        let Some(best_score) = candidates
            .iter()
            .map(|(params, _)| specificity(params, arg_types))
            .max()
        else {
            return Err(WdlError::NoSuchOverload {
                pos: pos.clone(),
                function: self.name.clone(),
                actual: arg_types
                    .iter()
                    .map(|t| t.to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        };

        let tied: Vec<&(Vec<Type>, Type)> = candidates
            .iter()
            .filter(|(params, _)| specificity(params, arg_types) == best_score)
            .collect();
        let (params, ret) = tied[0];
        if tied.len() > 1 && tied.iter().any(|(_, other)| other != ret) {
            return Err(WdlError::validation(
                pos.clone(),
                format!("ambiguous call to {}", self.name),
            ));
        }
        Ok(FunctionSignature::new(
            self.name.clone(),
            params.clone(),
            ret.clone(),
        ))
    }

    fn eval(
        &self,
        pos: &SourcePosition,
        args: &[Value],
        stdlib: &StdLib,
    ) -> Result<Value, WdlError> {
        let arg_types: Vec<Type> = args.iter().map(|a| a.wdl_type().clone()).collect();
        let signature = self.infer_type(pos, &arg_types)?;
        let coerced: Vec<Value> = args
            .iter()
            .zip(&signature.param_types)
            .map(|(arg, param)| arg.coerce(param))
            .collect::<Result<_, _>>()?;
        (self.body)(&coerced, stdlib)
    }
}
