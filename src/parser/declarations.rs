//! Declaration grammar: `Type name [= expr]`.

use super::cst::Decl;
use super::expressions::{parse_expression, ParseResult};
use super::token_stream::TokenStream;
use super::tokens::Token;
use super::types::parse_type_expr;

pub fn parse_decl(stream: &mut TokenStream) -> ParseResult<Decl> {
    let pos = stream.current_position();
    let decl_type = parse_type_expr(stream)?;
    let (name, _) = stream.expect_identifier()?;

    let expr = if matches!(stream.peek_token(), Some(Token::Assign)) {
        stream.next();
        Some(parse_expression(stream)?)
    } else {
        None
    };

    Ok(Decl {
        pos,
        decl_type,
        name,
        expr,
    })
}

/// Declarations inside `input {}` / `output {}` / struct bodies, up to the
/// closing brace (which is left unconsumed).
pub fn parse_decl_block(stream: &mut TokenStream) -> ParseResult<Vec<Decl>> {
    let mut decls = Vec::new();
    while !matches!(stream.peek_token(), Some(Token::RightBrace) | None) {
        decls.push(parse_decl(stream)?);
    }
    Ok(decls)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::cst::TypeExprKind;
    use crate::parser::Version;

    fn parse(source: &str) -> Decl {
        let mut stream = TokenStream::new(source, "t.wdl", "/t.wdl", Version::V1_0);
        parse_decl(&mut stream).unwrap()
    }

    #[test]
    fn test_unbound() {
        let decl = parse("File reads");
        assert_eq!(decl.name, "reads");
        assert!(decl.expr.is_none());
        assert!(matches!(decl.decl_type.kind, TypeExprKind::File));
    }

    #[test]
    fn test_bound() {
        let decl = parse("Int threads = 4");
        assert_eq!(decl.name, "threads");
        assert!(decl.expr.is_some());
    }

    #[test]
    fn test_block() {
        let mut stream = TokenStream::new(
            "Int a = 1\nString b\n}",
            "t.wdl",
            "/t.wdl",
            Version::V1_0,
        );
        let decls = parse_decl_block(&mut stream).unwrap();
        assert_eq!(decls.len(), 2);
        assert_eq!(decls[0].name, "a");
        assert_eq!(decls[1].name, "b");
    }
}
