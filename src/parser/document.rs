//! Document-level grammar: version directive, imports, structs, tasks,
//! workflow.

use super::cst::{Document, Import, StructDef};
use super::declarations::parse_decl_block;
use super::expressions::{parse_string_expr, ParseResult};
use super::tasks::{parse_task, parse_workflow};
use super::token_stream::TokenStream;
use super::tokens::Token;
use super::Version;
use crate::parser::cst::{ExprKind, StringPiece};

pub fn parse_document(
    stream: &mut TokenStream,
    uri: &str,
    abspath: &str,
) -> ParseResult<Document> {
    let pos = stream.current_position();
    let version_pos = parse_version_directive(stream)?;

    let mut imports = Vec::new();
    let mut structs = Vec::new();
    let mut tasks = Vec::new();
    let mut workflow = None;

    loop {
        match stream.peek_token() {
            None => break,
            Some(Token::Keyword(kw)) => match kw.as_str() {
                "import" => imports.push(parse_import(stream)?),
                "struct" => structs.push(parse_struct(stream)?),
                "task" => tasks.push(parse_task(stream)?),
                "workflow" => {
                    if workflow.is_some() {
                        return Err(stream.syntax_error("a document may define at most one workflow"));
                    }
                    workflow = Some(parse_workflow(stream)?);
                }
                other => {
                    let message = format!("unexpected keyword '{}' at document level", other);
                    return Err(stream.syntax_error(message));
                }
            },
            Some(other) => {
                let message = format!("unexpected {} at document level", other.describe());
                return Err(stream.syntax_error(message));
            }
        }
    }

    Ok(Document {
        pos,
        version: stream.version(),
        version_pos,
        imports,
        structs,
        tasks,
        workflow,
        comments: stream.take_comments(),
        uri: uri.to_string(),
        abspath: abspath.to_string(),
    })
}

/// The version value itself was detected before tokenization; here the
/// directive's tokens are consumed and its span recorded. `draft-2` lexes
/// as three tokens (`draft`, `-`, `2`).
fn parse_version_directive(stream: &mut TokenStream) -> ParseResult<Option<crate::error::SourcePosition>> {
    if !matches!(stream.peek_token(), Some(Token::Keyword(kw)) if kw == "version") {
        return Ok(None);
    }
    let start = stream.next().unwrap().pos;
    let mut end = match stream.next() {
        Some(t)
            if matches!(
                t.token,
                Token::FloatLiteral(_) | Token::IntLiteral(_) | Token::Identifier(_)
            ) =>
        {
            t.pos
        }
        _ => return Err(stream.syntax_error("expected version number after 'version'")),
    };
    if matches!(stream.peek_token(), Some(Token::Minus)) {
        stream.next();
        match stream.next() {
            Some(t) if matches!(t.token, Token::IntLiteral(_)) => end = t.pos,
            _ => return Err(stream.syntax_error("malformed version directive")),
        }
    }
    Ok(Some(crate::error::SourcePosition::new(
        start.uri,
        start.abspath,
        start.line,
        start.column,
        end.end_line,
        end.end_column,
    )))
}

/// `import "uri" [as namespace] [alias Old as New]*`.
fn parse_import(stream: &mut TokenStream) -> ParseResult<Import> {
    let pos = stream.current_position();
    stream.expect_keyword("import")?;

    let uri_expr = parse_string_expr(stream)?;
    let uri = match uri_expr.kind {
        ExprKind::String { parts } => match parts.as_slice() {
            [StringPiece::Text { text, .. }] => text.clone(),
            _ => {
                return Err(stream.syntax_error_at(
                    uri_expr.pos,
                    "import URI must be a plain string".to_string(),
                ))
            }
        },
        _ => {
            return Err(stream.syntax_error_at(
                uri_expr.pos,
                "expected string literal for import URI".to_string(),
            ))
        }
    };

    let namespace = if matches!(stream.peek_token(), Some(Token::Keyword(kw)) if kw == "as") {
        stream.next();
        Some(stream.expect_identifier()?.0)
    } else {
        None
    };

    let mut aliases = Vec::new();
    while matches!(stream.peek_token(), Some(Token::Keyword(kw)) if kw == "alias") {
        stream.next();
        let (original, _) = stream.expect_identifier()?;
        stream.expect_keyword("as")?;
        let (renamed, _) = stream.expect_identifier()?;
        aliases.push((original, renamed));
    }

    Ok(Import {
        pos,
        uri,
        namespace,
        aliases,
    })
}

/// `struct Name { Type member ... }`. Members carry no default expressions.
fn parse_struct(stream: &mut TokenStream) -> ParseResult<StructDef> {
    let pos = stream.current_position();
    stream.expect_keyword("struct")?;
    let (name, _) = stream.expect_identifier()?;
    stream.expect(Token::LeftBrace)?;
    let members = parse_decl_block(stream)?;
    stream.expect(Token::RightBrace)?;

    for member in &members {
        if member.expr.is_some() {
            return Err(stream.syntax_error_at(
                member.pos.clone(),
                format!("struct member {} may not have a default expression", member.name),
            ));
        }
    }

    Ok(StructDef { pos, name, members })
}
