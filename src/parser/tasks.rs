//! Task and workflow grammar, including command sections and meta blocks.

use super::cst::{CommandSection, Decl, MetaSection, StringPiece, Task, Workflow, WorkflowNode};
use super::declarations::parse_decl_block;
use super::expressions::{parse_expression, parse_placeholder, ParseResult};
use super::statements::parse_workflow_node;
use super::token_stream::TokenStream;
use super::tokens::Token;
use super::Version;
use crate::parser::cst::Expr;

pub fn parse_task(stream: &mut TokenStream) -> ParseResult<Task> {
    let pos = stream.current_position();
    stream.expect_keyword("task")?;
    let (name, _) = stream.expect_identifier()?;
    stream.expect(Token::LeftBrace)?;

    let mut inputs: Option<Vec<Decl>> = None;
    let mut postinputs: Vec<Decl> = Vec::new();
    let mut command: Option<CommandSection> = None;
    let mut outputs: Vec<Decl> = Vec::new();
    let mut runtime: Vec<(String, Expr)> = Vec::new();
    let mut hints: Vec<(String, Expr)> = Vec::new();
    let mut meta: Option<MetaSection> = None;
    let mut parameter_meta: Option<MetaSection> = None;

    loop {
        match stream.peek_token() {
            Some(Token::RightBrace) => {
                stream.next();
                break;
            }
            Some(Token::Keyword(kw)) => match kw.as_str() {
                "input" => {
                    if stream.version() == Version::Draft2 {
                        return Err(stream
                            .syntax_error("input sections require WDL 1.0; draft-2 tasks declare inputs directly"));
                    }
                    if inputs.is_some() {
                        return Err(stream.syntax_error("duplicate input section"));
                    }
                    stream.next();
                    stream.expect(Token::LeftBrace)?;
                    inputs = Some(parse_decl_block(stream)?);
                    stream.expect(Token::RightBrace)?;
                }
                "command" => {
                    if command.is_some() {
                        return Err(stream.syntax_error("duplicate command section"));
                    }
                    command = Some(parse_command_section(stream)?);
                }
                "output" => {
                    stream.next();
                    stream.expect(Token::LeftBrace)?;
                    outputs = parse_decl_block(stream)?;
                    stream.expect(Token::RightBrace)?;
                }
                "runtime" => {
                    stream.next();
                    runtime = parse_keyed_exprs(stream)?;
                }
                "hints" => {
                    stream.next();
                    hints = parse_keyed_exprs(stream)?;
                }
                "meta" => {
                    stream.next();
                    meta = Some(parse_meta_section(stream)?);
                }
                "parameter_meta" => {
                    stream.next();
                    parameter_meta = Some(parse_meta_section(stream)?);
                }
                other => {
                    let message = format!("unexpected keyword '{}' in task", other);
                    return Err(stream.syntax_error(message));
                }
            },
            Some(Token::Identifier(_)) => {
                postinputs.push(super::declarations::parse_decl(stream)?);
            }
            Some(other) => {
                let message = format!("unexpected {} in task", other.describe());
                return Err(stream.syntax_error(message));
            }
            None => return Err(stream.syntax_error("unterminated task")),
        }
    }

    let Some(command) = command else {
        return Err(stream.syntax_error_at(pos, format!("task {} has no command section", name)));
    };

    Ok(Task {
        pos,
        name,
        inputs,
        postinputs,
        command,
        outputs,
        runtime,
        hints,
        meta,
        parameter_meta,
    })
}

pub fn parse_workflow(stream: &mut TokenStream) -> ParseResult<Workflow> {
    let pos = stream.current_position();
    stream.expect_keyword("workflow")?;
    let (name, _) = stream.expect_identifier()?;
    stream.expect(Token::LeftBrace)?;

    let mut inputs: Option<Vec<Decl>> = None;
    let mut body: Vec<WorkflowNode> = Vec::new();
    let mut outputs: Vec<Decl> = Vec::new();
    let mut meta: Option<MetaSection> = None;
    let mut parameter_meta: Option<MetaSection> = None;

    loop {
        match stream.peek_token() {
            Some(Token::RightBrace) => {
                stream.next();
                break;
            }
            Some(Token::Keyword(kw)) => match kw.as_str() {
                "input" => {
                    if stream.version() == Version::Draft2 {
                        return Err(stream.syntax_error(
                            "input sections require WDL 1.0; draft-2 workflows declare inputs directly",
                        ));
                    }
                    if inputs.is_some() {
                        return Err(stream.syntax_error("duplicate input section"));
                    }
                    stream.next();
                    stream.expect(Token::LeftBrace)?;
                    inputs = Some(parse_decl_block(stream)?);
                    stream.expect(Token::RightBrace)?;
                }
                "output" => {
                    stream.next();
                    stream.expect(Token::LeftBrace)?;
                    outputs = parse_decl_block(stream)?;
                    stream.expect(Token::RightBrace)?;
                }
                "meta" => {
                    stream.next();
                    meta = Some(parse_meta_section(stream)?);
                }
                "parameter_meta" => {
                    stream.next();
                    parameter_meta = Some(parse_meta_section(stream)?);
                }
                _ => body.push(parse_workflow_node(stream)?),
            },
            Some(_) => body.push(parse_workflow_node(stream)?),
            None => return Err(stream.syntax_error("unterminated workflow")),
        }
    }

    Ok(Workflow {
        pos,
        name,
        inputs,
        body,
        outputs,
        meta,
        parameter_meta,
    })
}

/// Command body: `command { ... }` or `command <<< ... >>>`, producing an
/// ordered sequence of text fragments and placeholders. Inside heredocs,
/// `${` is shell text; inside brace commands both `~{` and `${` open
/// placeholders.
pub fn parse_command_section(stream: &mut TokenStream) -> ParseResult<CommandSection> {
    let pos = stream.current_position();
    stream.expect_keyword("command")?;

    let heredoc = match stream.next() {
        Some(t) => match t.token {
            Token::LeftBrace => false,
            Token::HeredocStart => true,
            other => {
                return Err(stream.syntax_error_at(
                    t.pos,
                    format!("expected {{ or <<< after command, found {}", other.describe()),
                ))
            }
        },
        None => return Err(stream.syntax_error("expected command body")),
    };

    stream.enter_command_mode();
    let mut parts: Vec<StringPiece> = Vec::new();
    let mut text = String::new();
    let mut text_pos = stream.current_position();

    let flush = |parts: &mut Vec<StringPiece>, text: &mut String, pos: &crate::error::SourcePosition| {
        if !text.is_empty() {
            parts.push(StringPiece::Text {
                text: std::mem::take(text),
                pos: pos.clone(),
            });
        }
    };

    loop {
        let Some(token) = stream.next() else {
            return Err(stream.syntax_error("unterminated command section"));
        };
        match token.token {
            Token::CommandText(chunk) => {
                if text.is_empty() {
                    text_pos = token.pos;
                }
                text.push_str(&chunk);
            }
            Token::TildeBrace => {
                flush(&mut parts, &mut text, &text_pos);
                let placeholder = parse_placeholder(stream, token.pos)?;
                parts.push(StringPiece::Placeholder(placeholder));
            }
            Token::DollarBrace => {
                if heredoc {
                    if text.is_empty() {
                        text_pos = token.pos;
                    }
                    text.push_str("${");
                } else {
                    flush(&mut parts, &mut text, &text_pos);
                    let placeholder = parse_placeholder(stream, token.pos)?;
                    parts.push(StringPiece::Placeholder(placeholder));
                }
            }
            Token::RightBrace => {
                if heredoc {
                    if text.is_empty() {
                        text_pos = token.pos;
                    }
                    text.push('}');
                } else {
                    flush(&mut parts, &mut text, &text_pos);
                    break;
                }
            }
            Token::HeredocEnd => {
                if heredoc {
                    flush(&mut parts, &mut text, &text_pos);
                    break;
                } else {
                    if text.is_empty() {
                        text_pos = token.pos;
                    }
                    text.push_str(">>>");
                }
            }
            other => {
                return Err(stream.syntax_error_at(
                    token.pos,
                    format!("unexpected {} in command section", other.describe()),
                ))
            }
        }
    }
    stream.pop_mode();

    Ok(CommandSection {
        pos,
        parts,
        heredoc,
    })
}

/// `runtime`/`hints`: `{ (name : expr)* }`.
fn parse_keyed_exprs(stream: &mut TokenStream) -> ParseResult<Vec<(String, Expr)>> {
    stream.expect(Token::LeftBrace)?;
    let mut entries = Vec::new();
    while !matches!(stream.peek_token(), Some(Token::RightBrace) | None) {
        let name = parse_member_name(stream)?;
        stream.expect(Token::Colon)?;
        let expr = parse_expression(stream)?;
        entries.push((name, expr));
        if matches!(stream.peek_token(), Some(Token::Comma)) {
            stream.next();
        }
    }
    stream.expect(Token::RightBrace)?;
    Ok(entries)
}

/// `meta` / `parameter_meta` body. Values use the expression grammar here;
/// lowering restricts them to literals.
pub fn parse_meta_section(stream: &mut TokenStream) -> ParseResult<MetaSection> {
    let pos = stream.current_position();
    stream.expect(Token::LeftBrace)?;
    let mut entries = Vec::new();
    while !matches!(stream.peek_token(), Some(Token::RightBrace) | None) {
        let name = parse_member_name(stream)?;
        stream.expect(Token::Colon)?;
        let value = parse_expression(stream)?;
        entries.push((name, value));
        if matches!(stream.peek_token(), Some(Token::Comma)) {
            stream.next();
        }
    }
    stream.expect(Token::RightBrace)?;
    Ok(MetaSection { pos, entries })
}

/// Meta/runtime keys may collide with keywords (`input`, `output`, ...).
fn parse_member_name(stream: &mut TokenStream) -> ParseResult<String> {
    match stream.next() {
        Some(t) => match t.token {
            Token::Identifier(name) | Token::Keyword(name) => Ok(name),
            other => Err(stream.syntax_error_at(
                t.pos,
                format!("expected name, found {}", other.describe()),
            )),
        },
        None => Err(stream.syntax_error("expected name")),
    }
}
