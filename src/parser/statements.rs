//! Workflow body grammar: calls, scatter, and conditional sections.

use super::cst::{Call, Conditional, Scatter, WorkflowNode};
use super::declarations::parse_decl;
use super::expressions::{parse_expression, ParseResult};
use super::token_stream::TokenStream;
use super::tokens::Token;
use super::Version;

/// One element of a workflow (or section) body.
pub fn parse_workflow_node(stream: &mut TokenStream) -> ParseResult<WorkflowNode> {
    match stream.peek_token() {
        Some(Token::Keyword(kw)) if kw == "call" => Ok(WorkflowNode::Call(parse_call(stream)?)),
        Some(Token::Keyword(kw)) if kw == "scatter" => {
            Ok(WorkflowNode::Scatter(parse_scatter(stream)?))
        }
        Some(Token::Keyword(kw)) if kw == "if" => {
            Ok(WorkflowNode::Conditional(parse_conditional(stream)?))
        }
        Some(Token::Identifier(_)) => Ok(WorkflowNode::Decl(parse_decl(stream)?)),
        Some(other) => {
            let message = format!(
                "expected declaration, call, scatter, or if, found {}",
                other.describe()
            );
            Err(stream.syntax_error(message))
        }
        None => Err(stream.syntax_error("unexpected end of input in workflow body")),
    }
}

/// Section body: `{ element* }`.
pub fn parse_body(stream: &mut TokenStream) -> ParseResult<Vec<WorkflowNode>> {
    stream.expect(Token::LeftBrace)?;
    let mut body = Vec::new();
    while !matches!(stream.peek_token(), Some(Token::RightBrace) | None) {
        body.push(parse_workflow_node(stream)?);
    }
    stream.expect(Token::RightBrace)?;
    Ok(body)
}

pub fn parse_call(stream: &mut TokenStream) -> ParseResult<Call> {
    let pos = stream.current_position();
    stream.expect_keyword("call")?;

    let (mut target, _) = stream.expect_identifier()?;
    while matches!(stream.peek_token(), Some(Token::Dot)) {
        stream.next();
        let (part, _) = stream.expect_identifier()?;
        target.push('.');
        target.push_str(&part);
    }

    let alias = if matches!(stream.peek_token(), Some(Token::Keyword(kw)) if kw == "as") {
        stream.next();
        Some(stream.expect_identifier()?.0)
    } else {
        None
    };

    let mut afters = Vec::new();
    while matches!(stream.peek_token(), Some(Token::Keyword(kw)) if kw == "after") {
        if stream.version() != Version::V2_0 {
            return Err(stream.syntax_error("call 'after' requires WDL 2.0"));
        }
        stream.next();
        afters.push(stream.expect_identifier()?.0);
    }

    let mut inputs = Vec::new();
    if matches!(stream.peek_token(), Some(Token::LeftBrace)) {
        stream.next();
        // The `input:` introducer is mandatory before 2.0, optional after.
        if matches!(stream.peek_token(), Some(Token::Keyword(kw)) if kw == "input") {
            stream.next();
            stream.expect(Token::Colon)?;
        }
        while !matches!(stream.peek_token(), Some(Token::RightBrace) | None) {
            let (name, name_pos) = stream.expect_identifier()?;
            let expr = if matches!(stream.peek_token(), Some(Token::Assign)) {
                stream.next();
                parse_expression(stream)?
            } else {
                // `x` shorthand for `x = x`.
                super::cst::Expr::new(name_pos, super::cst::ExprKind::Ident(name.clone()))
            };
            inputs.push((name, expr));
            if matches!(stream.peek_token(), Some(Token::Comma)) {
                stream.next();
            }
        }
        stream.expect(Token::RightBrace)?;
    }

    Ok(Call {
        pos,
        target,
        alias,
        afters,
        inputs,
    })
}

pub fn parse_scatter(stream: &mut TokenStream) -> ParseResult<Scatter> {
    let pos = stream.current_position();
    stream.expect_keyword("scatter")?;
    stream.expect(Token::LeftParen)?;
    let (variable, _) = stream.expect_identifier()?;
    stream.expect_keyword("in")?;
    let expr = parse_expression(stream)?;
    stream.expect(Token::RightParen)?;
    let body = parse_body(stream)?;

    Ok(Scatter {
        pos,
        variable,
        expr,
        body,
    })
}

pub fn parse_conditional(stream: &mut TokenStream) -> ParseResult<Conditional> {
    let pos = stream.current_position();
    stream.expect_keyword("if")?;
    stream.expect(Token::LeftParen)?;
    let expr = parse_expression(stream)?;
    stream.expect(Token::RightParen)?;
    let body = parse_body(stream)?;

    Ok(Conditional { pos, expr, body })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream(source: &str) -> TokenStream {
        TokenStream::new(source, "t.wdl", "/t.wdl", Version::V1_0)
    }

    #[test]
    fn test_plain_call() {
        let call = parse_call(&mut stream("call align")).unwrap();
        assert_eq!(call.target, "align");
        assert!(call.alias.is_none());
        assert!(call.inputs.is_empty());
    }

    #[test]
    fn test_namespaced_call_with_alias_and_inputs() {
        let call = parse_call(&mut stream(
            "call lib.align as map_reads { input: reads = r1, threads = 4 }",
        ))
        .unwrap();
        assert_eq!(call.target, "lib.align");
        assert_eq!(call.alias.as_deref(), Some("map_reads"));
        assert_eq!(call.inputs.len(), 2);
        assert_eq!(call.inputs[0].0, "reads");
    }

    #[test]
    fn test_call_input_shorthand() {
        let call = parse_call(&mut stream("call align { input: reads }")).unwrap();
        assert_eq!(call.inputs.len(), 1);
        assert!(matches!(
            &call.inputs[0].1.kind,
            super::super::cst::ExprKind::Ident(n) if n == "reads"
        ));
    }

    #[test]
    fn test_call_after_is_v2_only() {
        assert!(parse_call(&mut stream("call b after a")).is_err());
        let mut v2 = TokenStream::new("call b after a", "t.wdl", "/t.wdl", Version::V2_0);
        let call = parse_call(&mut v2).unwrap();
        assert_eq!(call.afters, vec!["a".to_string()]);
    }

    #[test]
    fn test_scatter() {
        let scatter = parse_scatter(&mut stream("scatter (i in [1,2,3]) { Int y = i + 1 }")).unwrap();
        assert_eq!(scatter.variable, "i");
        assert_eq!(scatter.body.len(), 1);
        assert!(matches!(scatter.body[0], WorkflowNode::Decl(_)));
    }

    #[test]
    fn test_conditional_with_nested_scatter() {
        let cond = parse_conditional(&mut stream(
            "if (go) { scatter (x in xs) { call consume { input: x = x } } }",
        ))
        .unwrap();
        assert_eq!(cond.body.len(), 1);
        assert!(matches!(cond.body[0], WorkflowNode::Scatter(_)));
    }
}
