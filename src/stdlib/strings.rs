//! String functions.

use super::{create_static_function, Function};
use crate::error::WdlError;
use crate::types::Type;
use crate::value::Value;

/// `sub(input, pattern, replace)`: POSIX-style regex replacement of every
/// match.
pub fn sub() -> Box<dyn Function> {
    create_static_function(
        "sub",
        vec![(
            vec![Type::string(false), Type::string(false), Type::string(false)],
            Type::string(false),
        )],
        |args, _| {
            let input = args[0].as_string().unwrap_or_default();
            let pattern = args[1].as_string().unwrap_or_default();
            let replacement = args[2].as_string().unwrap_or_default();
            let regex = regex::Regex::new(pattern).map_err(|e| WdlError::Runtime {
                message: format!("sub(): bad pattern '{}': {}", pattern, e),
            })?;
            Ok(Value::string(
                regex.replace_all(input, replacement).into_owned(),
            ))
        },
    )
}

/// `basename(path[, suffix])`: the final path component, optionally with a
/// suffix stripped.
pub fn basename() -> Box<dyn Function> {
    create_static_function(
        "basename",
        vec![
            (vec![Type::file(false)], Type::string(false)),
            (
                vec![Type::file(false), Type::string(false)],
                Type::string(false),
            ),
        ],
        |args, _| {
            let path = args[0].as_string().unwrap_or_default();
            let mut base = path.rsplit('/').next().unwrap_or(path).to_string();
            if let Some(suffix) = args.get(1).and_then(|v| v.as_string()) {
                if let Some(stripped) = base.strip_suffix(suffix) {
                    base = stripped.to_string();
                }
            }
            Ok(Value::string(base))
        },
    )
}

/// `sep(separator, Array[String])`: join.
pub fn sep() -> Box<dyn Function> {
    create_static_function(
        "sep",
        vec![(
            vec![
                Type::string(false),
                Type::array(Type::string(false), false, false),
            ],
            Type::string(false),
        )],
        |args, _| {
            let separator = args[0].as_string().unwrap_or_default();
            let joined = args[1]
                .as_array()
                .unwrap_or_default()
                .iter()
                .map(|v| v.canonical_string())
                .collect::<Vec<_>>()
                .join(separator);
            Ok(Value::string(joined))
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourcePosition;
    use crate::parser::Version;
    use crate::stdlib::StdLib;

    fn lib() -> StdLib {
        StdLib::new(Version::V1_0)
    }

    fn pos() -> SourcePosition {
        SourcePosition::unknown()
    }

    #[test]
    fn test_sub() {
        let lib = lib();
        let out = lib
            .call(
                "sub",
                &pos(),
                &[
                    Value::string("sample_001_001".to_string()),
                    Value::string("_00[0-9]".to_string()),
                    Value::string("".to_string()),
                ],
            )
            .unwrap();
        assert_eq!(out.as_string(), Some("sample"));
    }

    #[test]
    fn test_basename() {
        let lib = lib();
        let out = lib
            .call(
                "basename",
                &pos(),
                &[Value::file("/data/reads/sample.fastq.gz".to_string())],
            )
            .unwrap();
        assert_eq!(out.as_string(), Some("sample.fastq.gz"));

        let out = lib
            .call(
                "basename",
                &pos(),
                &[
                    Value::file("/data/reads/sample.fastq.gz".to_string()),
                    Value::string(".fastq.gz".to_string()),
                ],
            )
            .unwrap();
        assert_eq!(out.as_string(), Some("sample"));
    }

    #[test]
    fn test_sep() {
        let lib = lib();
        let xs = Value::array(
            Type::int(false),
            vec![Value::int(1), Value::int(2), Value::int(3)],
        );
        let out = lib
            .call("sep", &pos(), &[Value::string(", ".to_string()), xs])
            .unwrap();
        assert_eq!(out.as_string(), Some("1, 2, 3"));
    }
}
