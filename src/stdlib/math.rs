//! Numeric functions.

use super::{create_static_function, Function};
use crate::types::Type;
use crate::value::Value;
use crate::error::WdlError;

pub fn floor() -> Box<dyn Function> {
    rounding("floor", f64::floor)
}

pub fn ceil() -> Box<dyn Function> {
    rounding("ceil", f64::ceil)
}

pub fn round() -> Box<dyn Function> {
    rounding("round", f64::round)
}

fn rounding(name: &'static str, op: fn(f64) -> f64) -> Box<dyn Function> {
    create_static_function(
        name,
        vec![(vec![Type::float(false)], Type::int(false))],
        move |args, _| {
            let x = args[0].as_float().ok_or_else(|| WdlError::Runtime {
                message: format!("{}() expects a numeric argument", name),
            })?;
            Ok(Value::int(op(x) as i64))
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourcePosition;
    use crate::parser::Version;
    use crate::stdlib::StdLib;

    #[test]
    fn test_rounding() {
        let lib = StdLib::new(Version::V1_0);
        let pos = SourcePosition::unknown();
        assert_eq!(
            lib.call("floor", &pos, &[Value::float(2.7)]).unwrap().as_int(),
            Some(2)
        );
        assert_eq!(
            lib.call("ceil", &pos, &[Value::float(2.1)]).unwrap().as_int(),
            Some(3)
        );
        assert_eq!(
            lib.call("round", &pos, &[Value::float(2.5)]).unwrap().as_int(),
            Some(3)
        );
        // Int coerces to Float.
        assert_eq!(
            lib.call("floor", &pos, &[Value::int(4)]).unwrap().as_int(),
            Some(4)
        );
    }
}
