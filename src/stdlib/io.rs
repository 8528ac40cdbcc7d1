//! File-reading and file-writing functions.
//!
//! Every function here goes through the [`FileAccess`](super::FileAccess)
//! injected into the library; none opens the filesystem directly, so
//! embedders control localization and sandboxing.

use super::{create_static_function, Function, FunctionSignature, StdLib};
use crate::error::{SourcePosition, WdlError};
use crate::types::Type;
use crate::value::Value;

fn file_arg(args: &[Value]) -> Result<&str, WdlError> {
    args[0].as_string().ok_or_else(|| WdlError::Runtime {
        message: "expected a file path".to_string(),
    })
}

fn read_function<F>(name: &'static str, return_type: Type, parse: F) -> Box<dyn Function>
where
    F: Fn(&str) -> Result<Value, WdlError> + Send + Sync + 'static,
{
    create_static_function(
        name,
        vec![(vec![Type::file(false)], return_type)],
        move |args, stdlib| {
            let content = stdlib.file_access().read_string(file_arg(args)?)?;
            parse(&content)
        },
    )
}

fn write_function<F>(name: &'static str, arg_type: Type, serialize: F) -> Box<dyn Function>
where
    F: Fn(&Value) -> Result<String, WdlError> + Send + Sync + 'static,
{
    create_static_function(
        name,
        vec![(vec![arg_type], Type::file(false))],
        move |args, stdlib| {
            let content = serialize(&args[0])?;
            let path = stdlib.file_access().write_string(&content)?;
            Ok(Value::file(path))
        },
    )
}

pub fn read_string() -> Box<dyn Function> {
    read_function("read_string", Type::string(false), |content| {
        // One trailing newline is shed, matching shell command substitution.
        Ok(Value::string(
            content.strip_suffix('\n').unwrap_or(content).to_string(),
        ))
    })
}

pub fn read_int() -> Box<dyn Function> {
    read_function("read_int", Type::int(false), |content| {
        content
            .trim()
            .parse::<i64>()
            .map(Value::int)
            .map_err(|_| WdlError::Runtime {
                message: format!("read_int(): file does not contain an integer: '{}'", content.trim()),
            })
    })
}

pub fn read_float() -> Box<dyn Function> {
    read_function("read_float", Type::float(false), |content| {
        content
            .trim()
            .parse::<f64>()
            .map(Value::float)
            .map_err(|_| WdlError::Runtime {
                message: format!("read_float(): file does not contain a number: '{}'", content.trim()),
            })
    })
}

pub fn read_boolean() -> Box<dyn Function> {
    read_function("read_boolean", Type::boolean(false), |content| {
        match content.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(Value::boolean(true)),
            "false" => Ok(Value::boolean(false)),
            other => Err(WdlError::Runtime {
                message: format!("read_boolean(): expected true or false, got '{}'", other),
            }),
        }
    })
}

pub fn read_lines() -> Box<dyn Function> {
    read_function(
        "read_lines",
        Type::array(Type::string(false), false, false),
        |content| {
            let lines: Vec<Value> = content
                .lines()
                .map(|line| Value::string(line.to_string()))
                .collect();
            Ok(Value::array(Type::string(false), lines))
        },
    )
}

pub fn read_tsv() -> Box<dyn Function> {
    read_function(
        "read_tsv",
        Type::array(Type::array(Type::string(false), false, false), false, false),
        |content| {
            let rows: Vec<Value> = content
                .lines()
                .map(|line| {
                    Value::array(
                        Type::string(false),
                        line.split('\t')
                            .map(|field| Value::string(field.to_string()))
                            .collect(),
                    )
                })
                .collect();
            Ok(Value::array(
                Type::array(Type::string(false), false, false),
                rows,
            ))
        },
    )
}

pub fn read_map() -> Box<dyn Function> {
    read_function(
        "read_map",
        Type::map(Type::string(false), Type::string(false), false),
        |content| {
            let mut pairs = Vec::new();
            for line in content.lines() {
                let mut fields = line.split('\t');
                let (Some(key), Some(value), None) =
                    (fields.next(), fields.next(), fields.next())
                else {
                    return Err(WdlError::Runtime {
                        message: "read_map(): each line must have exactly two tab-separated fields"
                            .to_string(),
                    });
                };
                pairs.push((
                    Value::string(key.to_string()),
                    Value::string(value.to_string()),
                ));
            }
            Ok(Value::map(Type::string(false), Type::string(false), pairs))
        },
    )
}

struct ReadJson;

impl Function for ReadJson {
    fn name(&self) -> &str {
        "read_json"
    }

    fn infer_type(
        &self,
        pos: &SourcePosition,
        arg_types: &[Type],
    ) -> Result<FunctionSignature, WdlError> {
        let [arg] = arg_types else {
            return Err(WdlError::WrongArity {
                pos: pos.clone(),
                function: "read_json".to_string(),
                expected: 1,
            });
        };
        if !arg.coerces(&Type::file(false), true) {
            return Err(WdlError::NoSuchOverload {
                pos: pos.clone(),
                function: "read_json".to_string(),
                actual: arg.to_string(),
            });
        }
        // The JSON shape is unknown statically.
        Ok(FunctionSignature::new(
            "read_json",
            vec![Type::file(false)],
            Type::any(),
        ))
    }

    fn eval(
        &self,
        pos: &SourcePosition,
        args: &[Value],
        stdlib: &StdLib,
    ) -> Result<Value, WdlError> {
        if args.len() != 1 {
            return Err(WdlError::WrongArity {
                pos: pos.clone(),
                function: "read_json".to_string(),
                expected: 1,
            });
        }
        let content = stdlib.file_access().read_string(file_arg(args)?)?;
        let json: serde_json::Value =
            serde_json::from_str(&content).map_err(|e| WdlError::Runtime {
                message: format!("read_json(): invalid JSON: {}", e),
            })?;
        Ok(Value::from_json(json))
    }
}

pub fn read_json() -> Box<dyn Function> {
    Box::new(ReadJson)
}

pub fn write_lines() -> Box<dyn Function> {
    write_function(
        "write_lines",
        Type::array(Type::string(false), false, false),
        |value| {
            let mut out = String::new();
            for line in value.as_array().unwrap_or_default() {
                out.push_str(&line.canonical_string());
                out.push('\n');
            }
            Ok(out)
        },
    )
}

pub fn write_tsv() -> Box<dyn Function> {
    write_function(
        "write_tsv",
        Type::array(Type::array(Type::string(false), false, false), false, false),
        |value| {
            let mut out = String::new();
            for row in value.as_array().unwrap_or_default() {
                let fields: Vec<String> = row
                    .as_array()
                    .unwrap_or_default()
                    .iter()
                    .map(|f| f.canonical_string())
                    .collect();
                out.push_str(&fields.join("\t"));
                out.push('\n');
            }
            Ok(out)
        },
    )
}

pub fn write_map() -> Box<dyn Function> {
    write_function(
        "write_map",
        Type::map(Type::string(false), Type::string(false), false),
        |value| {
            let Value::Map { pairs, .. } = value else {
                return Err(WdlError::Runtime {
                    message: "write_map() expects a map".to_string(),
                });
            };
            let mut out = String::new();
            for (key, entry) in pairs {
                out.push_str(&key.canonical_string());
                out.push('\t');
                out.push_str(&entry.canonical_string());
                out.push('\n');
            }
            Ok(out)
        },
    )
}

struct WriteJson;

impl Function for WriteJson {
    fn name(&self) -> &str {
        "write_json"
    }

    fn infer_type(
        &self,
        pos: &SourcePosition,
        arg_types: &[Type],
    ) -> Result<FunctionSignature, WdlError> {
        let [arg] = arg_types else {
            return Err(WdlError::WrongArity {
                pos: pos.clone(),
                function: "write_json".to_string(),
                expected: 1,
            });
        };
        Ok(FunctionSignature::new(
            "write_json",
            vec![arg.clone()],
            Type::file(false),
        ))
    }

    fn eval(
        &self,
        pos: &SourcePosition,
        args: &[Value],
        stdlib: &StdLib,
    ) -> Result<Value, WdlError> {
        if args.len() != 1 {
            return Err(WdlError::WrongArity {
                pos: pos.clone(),
                function: "write_json".to_string(),
                expected: 1,
            });
        }
        let json = args[0].to_json();
        let content = serde_json::to_string(&json).map_err(|e| WdlError::Runtime {
            message: format!("write_json(): {}", e),
        })?;
        let path = stdlib.file_access().write_string(&content)?;
        Ok(Value::file(path))
    }
}

pub fn write_json() -> Box<dyn Function> {
    Box::new(WriteJson)
}

struct SizeFunction;

impl Function for SizeFunction {
    fn name(&self) -> &str {
        "size"
    }

    fn infer_type(
        &self,
        pos: &SourcePosition,
        arg_types: &[Type],
    ) -> Result<FunctionSignature, WdlError> {
        if arg_types.is_empty() || arg_types.len() > 2 {
            return Err(WdlError::WrongArity {
                pos: pos.clone(),
                function: "size".to_string(),
                expected: 1,
            });
        }
        fn holds_files(ty: &Type) -> bool {
            match ty {
                Type::File { .. } | Type::Directory { .. } | Type::String { .. } | Type::Any { .. } => true,
                Type::Array { item_type, .. } => holds_files(item_type),
                _ => false,
            }
        }
        if !holds_files(&arg_types[0]) {
            return Err(WdlError::NoSuchOverload {
                pos: pos.clone(),
                function: "size".to_string(),
                actual: arg_types[0].to_string(),
            });
        }
        if let Some(unit) = arg_types.get(1) {
            if !unit.coerces(&Type::string(false), true) {
                return Err(WdlError::NoSuchOverload {
                    pos: pos.clone(),
                    function: "size".to_string(),
                    actual: unit.to_string(),
                });
            }
        }
        Ok(FunctionSignature::new(
            "size",
            arg_types.to_vec(),
            Type::float(false),
        ))
    }

    fn eval(
        &self,
        pos: &SourcePosition,
        args: &[Value],
        stdlib: &StdLib,
    ) -> Result<Value, WdlError> {
        if args.is_empty() || args.len() > 2 {
            return Err(WdlError::WrongArity {
                pos: pos.clone(),
                function: "size".to_string(),
                expected: 1,
            });
        }
        fn total(pos: &SourcePosition, value: &Value, stdlib: &StdLib) -> Result<f64, WdlError> {
            match value {
                Value::Null => Ok(0.0),
                Value::File { value, .. }
                | Value::Directory { value, .. }
                | Value::String { value, .. } => stdlib.file_access().size(value),
                Value::Array { values, .. } => {
                    let mut sum = 0.0;
                    for v in values {
                        sum += total(pos, v, stdlib)?;
                    }
                    Ok(sum)
                }
                other => Err(WdlError::eval(
                    pos.clone(),
                    format!("size() cannot measure {}", other.wdl_type()),
                )),
            }
        }

        let bytes = total(pos, &args[0], stdlib)?;
        let divisor = match args.get(1).and_then(|u| u.as_string()) {
            None => 1.0,
            Some(unit) => match unit.trim_end_matches('B').to_ascii_uppercase().as_str() {
                "" => 1.0,
                "K" => 1e3,
                "M" => 1e6,
                "G" => 1e9,
                "T" => 1e12,
                "KI" => 1024.0,
                "MI" => 1024.0_f64.powi(2),
                "GI" => 1024.0_f64.powi(3),
                "TI" => 1024.0_f64.powi(4),
                other => {
                    return Err(WdlError::eval(
                        pos.clone(),
                        format!("size(): unknown unit '{}'", other),
                    ))
                }
            },
        };
        Ok(Value::float(bytes / divisor))
    }
}

pub fn size() -> Box<dyn Function> {
    Box::new(SizeFunction)
}

pub fn glob_fn() -> Box<dyn Function> {
    create_static_function(
        "glob",
        vec![(
            vec![Type::string(false)],
            Type::array(Type::file(false), false, false),
        )],
        |args, stdlib| {
            let pattern = args[0].as_string().unwrap_or_default();
            let matches = stdlib.file_access().glob(pattern)?;
            Ok(Value::array(
                Type::file(false),
                matches.into_iter().map(Value::file).collect(),
            ))
        },
    )
}

pub fn stdout() -> Box<dyn Function> {
    create_static_function(
        "stdout",
        vec![(vec![], Type::file(false))],
        |_args, stdlib| Ok(Value::file(stdlib.file_access().stdout_path()?)),
    )
}

pub fn stderr() -> Box<dyn Function> {
    create_static_function(
        "stderr",
        vec![(vec![], Type::file(false))],
        |_args, stdlib| Ok(Value::file(stdlib.file_access().stderr_path()?)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Version;
    use crate::stdlib::{FileAccess, LocalFileAccess};
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory file access for tests.
    struct MemFiles {
        files: Mutex<HashMap<String, String>>,
    }

    impl MemFiles {
        fn new(entries: &[(&str, &str)]) -> Self {
            Self {
                files: Mutex::new(
                    entries
                        .iter()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect(),
                ),
            }
        }
    }

    impl FileAccess for MemFiles {
        fn read_string(&self, path: &str) -> Result<String, WdlError> {
            self.files
                .lock()
                .unwrap()
                .get(path)
                .cloned()
                .ok_or_else(|| WdlError::Runtime {
                    message: format!("no such file {}", path),
                })
        }

        fn write_string(&self, content: &str) -> Result<String, WdlError> {
            let mut files = self.files.lock().unwrap();
            let path = format!("/mem/write_{}", files.len());
            files.insert(path.clone(), content.to_string());
            Ok(path)
        }

        fn size(&self, path: &str) -> Result<f64, WdlError> {
            Ok(self.read_string(path)?.len() as f64)
        }

        fn glob(&self, _pattern: &str) -> Result<Vec<String>, WdlError> {
            Ok(vec![])
        }

        fn stdout_path(&self) -> Result<String, WdlError> {
            Ok("/mem/stdout.txt".to_string())
        }

        fn stderr_path(&self) -> Result<String, WdlError> {
            Ok("/mem/stderr.txt".to_string())
        }
    }

    fn lib(entries: &[(&str, &str)]) -> StdLib {
        StdLib::with_file_access(Version::V1_0, Box::new(MemFiles::new(entries)), true)
    }

    fn pos() -> SourcePosition {
        SourcePosition::unknown()
    }

    fn file(path: &str) -> Value {
        Value::file(path.to_string())
    }

    #[test]
    fn test_read_scalars() {
        let lib = lib(&[
            ("int.txt", "42\n"),
            ("float.txt", " 2.5 "),
            ("bool.txt", "TRUE\n"),
            ("str.txt", "hello\n"),
        ]);
        assert_eq!(
            lib.call("read_int", &pos(), &[file("int.txt")]).unwrap().as_int(),
            Some(42)
        );
        assert_eq!(
            lib.call("read_float", &pos(), &[file("float.txt")])
                .unwrap()
                .as_float(),
            Some(2.5)
        );
        assert_eq!(
            lib.call("read_boolean", &pos(), &[file("bool.txt")])
                .unwrap()
                .as_bool(),
            Some(true)
        );
        assert_eq!(
            lib.call("read_string", &pos(), &[file("str.txt")])
                .unwrap()
                .as_string(),
            Some("hello")
        );
        assert!(lib.call("read_int", &pos(), &[file("str.txt")]).is_err());
    }

    #[test]
    fn test_read_lines_tsv_map() {
        let lib = lib(&[
            ("lines.txt", "a\nb\nc\n"),
            ("table.tsv", "a\t1\nb\t2\n"),
        ]);
        let lines = lib.call("read_lines", &pos(), &[file("lines.txt")]).unwrap();
        assert_eq!(lines.as_array().unwrap().len(), 3);

        let table = lib.call("read_tsv", &pos(), &[file("table.tsv")]).unwrap();
        let rows = table.as_array().unwrap();
        assert_eq!(rows[1].as_array().unwrap()[1].as_string(), Some("2"));

        let map = lib.call("read_map", &pos(), &[file("table.tsv")]).unwrap();
        match map {
            Value::Map { pairs, .. } => {
                assert_eq!(pairs.len(), 2);
                assert_eq!(pairs[0].0.as_string(), Some("a"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_read_json_round_trip() {
        let lib = lib(&[("data.json", r#"{"n": 3, "names": ["a"]}"#)]);
        let value = lib.call("read_json", &pos(), &[file("data.json")]).unwrap();
        let members = value.as_struct().unwrap();
        assert_eq!(members.get("n").unwrap().as_int(), Some(3));

        let path = lib.call("write_json", &pos(), &[value.clone()]).unwrap();
        let written = lib
            .file_access()
            .read_string(path.as_string().unwrap())
            .unwrap();
        let back: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(back["n"], 3);
    }

    #[test]
    fn test_write_lines_and_map() {
        let lib = lib(&[]);
        let lines = Value::array(
            Type::string(false),
            vec![
                Value::string("x".to_string()),
                Value::string("y".to_string()),
            ],
        );
        let path = lib.call("write_lines", &pos(), &[lines]).unwrap();
        assert_eq!(
            lib.file_access()
                .read_string(path.as_string().unwrap())
                .unwrap(),
            "x\ny\n"
        );

        let map = Value::map(
            Type::string(false),
            Type::int(false),
            vec![(Value::string("a".to_string()), Value::int(1))],
        );
        let path = lib.call("write_map", &pos(), &[map]).unwrap();
        assert_eq!(
            lib.file_access()
                .read_string(path.as_string().unwrap())
                .unwrap(),
            "a\t1\n"
        );
    }

    #[test]
    fn test_size_units() {
        let lib = lib(&[("big.bin", "xxxxxxxxxx")]);
        assert_eq!(
            lib.call("size", &pos(), &[file("big.bin")]).unwrap().as_float(),
            Some(10.0)
        );
        assert_eq!(
            lib.call(
                "size",
                &pos(),
                &[file("big.bin"), Value::string("K".to_string())]
            )
            .unwrap()
            .as_float(),
            Some(0.01)
        );
        // Null sizes to zero (optional files).
        assert_eq!(
            lib.call("size", &pos(), &[Value::null()]).unwrap().as_float(),
            Some(0.0)
        );
    }

    #[test]
    fn test_stdout_stderr() {
        let lib = lib(&[]);
        assert_eq!(
            lib.call("stdout", &pos(), &[]).unwrap().as_string(),
            Some("/mem/stdout.txt")
        );
        assert_eq!(
            lib.call("stderr", &pos(), &[]).unwrap().as_string(),
            Some("/mem/stderr.txt")
        );
    }

    #[test]
    fn test_local_glob_shape() {
        // Just the pattern translation; actual directory reads are covered
        // by LocalFileAccess usage downstream.
        let access = LocalFileAccess::new(std::path::PathBuf::from("."));
        let _ = access;
    }
}
