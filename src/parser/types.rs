//! Type-expression grammar.

use super::cst::{TypeExpr, TypeExprKind};
use super::expressions::ParseResult;
use super::token_stream::TokenStream;
use super::tokens::Token;
use super::Version;

/// Parse a type as written: base type, parameters, `+` nonempty quantifier
/// on arrays, `?` optional quantifier.
pub fn parse_type_expr(stream: &mut TokenStream) -> ParseResult<TypeExpr> {
    let pos = stream.current_position();
    let (name, name_pos) = stream.expect_identifier()?;

    let kind = match name.as_str() {
        "Boolean" => TypeExprKind::Boolean,
        "Int" => TypeExprKind::Int,
        "Float" => TypeExprKind::Float,
        "String" => TypeExprKind::String,
        "File" => TypeExprKind::File,
        "Directory" => {
            if stream.version() != Version::V2_0 {
                return Err(stream.syntax_error_at(
                    name_pos,
                    format!(
                        "Directory type requires WDL 2.0 (document is {})",
                        stream.version().as_str()
                    ),
                ));
            }
            TypeExprKind::Directory
        }
        "Object" => TypeExprKind::Object,
        "Array" => {
            stream.expect(Token::LeftBracket)?;
            let item = parse_type_expr(stream)?;
            stream.expect(Token::RightBracket)?;
            let nonempty = if matches!(stream.peek_token(), Some(Token::Plus)) {
                stream.next();
                true
            } else {
                false
            };
            TypeExprKind::Array {
                item: Box::new(item),
                nonempty,
            }
        }
        "Map" => {
            stream.expect(Token::LeftBracket)?;
            let key = parse_type_expr(stream)?;
            stream.expect(Token::Comma)?;
            let value = parse_type_expr(stream)?;
            stream.expect(Token::RightBracket)?;
            TypeExprKind::Map {
                key: Box::new(key),
                value: Box::new(value),
            }
        }
        "Pair" => {
            stream.expect(Token::LeftBracket)?;
            let left = parse_type_expr(stream)?;
            stream.expect(Token::Comma)?;
            let right = parse_type_expr(stream)?;
            stream.expect(Token::RightBracket)?;
            TypeExprKind::Pair {
                left: Box::new(left),
                right: Box::new(right),
            }
        }
        _ => TypeExprKind::Named(name),
    };

    let mut optional = false;
    while matches!(stream.peek_token(), Some(Token::Question)) {
        let question = stream.next().unwrap();
        if optional {
            // T?? either flattens or is rejected, per parser options.
            if stream.strict_double_optional {
                return Err(stream.syntax_error_at(
                    question.pos,
                    "doubly-optional type".to_string(),
                ));
            }
        }
        optional = true;
    }

    Ok(TypeExpr {
        pos,
        kind,
        optional,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str, version: Version) -> ParseResult<TypeExpr> {
        let mut stream = TokenStream::new(source, "t.wdl", "/t.wdl", version);
        parse_type_expr(&mut stream)
    }

    #[test]
    fn test_primitives() {
        assert!(matches!(
            parse("Int", Version::V1_0).unwrap().kind,
            TypeExprKind::Int
        ));
        let opt = parse("String?", Version::V1_0).unwrap();
        assert!(opt.optional);
    }

    #[test]
    fn test_compound() {
        let arr = parse("Array[File]+", Version::V1_0).unwrap();
        match arr.kind {
            TypeExprKind::Array { nonempty, .. } => assert!(nonempty),
            other => panic!("unexpected {:?}", other),
        }

        let map = parse("Map[String, Array[Int]]", Version::V1_0).unwrap();
        assert!(matches!(map.kind, TypeExprKind::Map { .. }));

        let pair = parse("Pair[Int, Float]?", Version::V1_0).unwrap();
        assert!(pair.optional);
        assert!(matches!(pair.kind, TypeExprKind::Pair { .. }));
    }

    #[test]
    fn test_struct_name() {
        let named = parse("SampleSheet", Version::V1_0).unwrap();
        assert!(matches!(named.kind, TypeExprKind::Named(n) if n == "SampleSheet"));
    }

    #[test]
    fn test_directory_version_gate() {
        assert!(parse("Directory", Version::V1_0).is_err());
        assert!(parse("Directory", Version::V2_0).is_ok());
    }

    #[test]
    fn test_double_optional_flattens_by_default() {
        let ty = parse("Int??", Version::V1_0).unwrap();
        assert!(ty.optional);

        let mut stream = TokenStream::new("Int??", "t.wdl", "/t.wdl", Version::V1_0);
        stream.strict_double_optional = true;
        assert!(parse_type_expr(&mut stream).is_err());
    }
}
