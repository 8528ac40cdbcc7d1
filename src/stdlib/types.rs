//! Type-inspection functions.

use super::{Function, FunctionSignature, StdLib};
use crate::error::{SourcePosition, WdlError};
use crate::types::Type;
use crate::value::Value;

struct DefinedFunction;

impl Function for DefinedFunction {
    fn name(&self) -> &str {
        "defined"
    }

    fn infer_type(
        &self,
        pos: &SourcePosition,
        arg_types: &[Type],
    ) -> Result<FunctionSignature, WdlError> {
        let [arg] = arg_types else {
            return Err(WdlError::WrongArity {
                pos: pos.clone(),
                function: "defined".to_string(),
                expected: 1,
            });
        };
        Ok(FunctionSignature::new(
            "defined",
            vec![arg.clone()],
            Type::boolean(false),
        ))
    }

    fn eval(
        &self,
        pos: &SourcePosition,
        args: &[Value],
        _stdlib: &StdLib,
    ) -> Result<Value, WdlError> {
        if args.len() != 1 {
            return Err(WdlError::WrongArity {
                pos: pos.clone(),
                function: "defined".to_string(),
                expected: 1,
            });
        }
        Ok(Value::boolean(!args[0].is_null()))
    }
}

/// `defined(X?) -> Boolean`: whether an optional value is set.
pub fn defined() -> Box<dyn Function> {
    Box::new(DefinedFunction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Version;

    #[test]
    fn test_defined() {
        let lib = StdLib::new(Version::V1_0);
        let pos = SourcePosition::unknown();
        assert_eq!(
            lib.call("defined", &pos, &[Value::null()]).unwrap().as_bool(),
            Some(false)
        );
        assert_eq!(
            lib.call("defined", &pos, &[Value::int(1)]).unwrap().as_bool(),
            Some(true)
        );
    }
}
