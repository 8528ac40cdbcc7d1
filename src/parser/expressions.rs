//! Expression grammar: precedence climbing over the token stream.

use super::cst::{Expr, ExprKind, Placeholder, PlaceholderOption, StringPiece};
use super::token_stream::TokenStream;
use super::tokens::Token;
use super::Version;
use crate::error::WdlError;
use crate::expr::{BinaryOperator, UnaryOperator};

pub type ParseResult<T> = Result<T, WdlError>;

fn precedence(token: &Token) -> Option<u8> {
    match token {
        Token::Or => Some(1),
        Token::And => Some(2),
        Token::Equal | Token::NotEqual => Some(3),
        Token::Less | Token::LessEqual | Token::Greater | Token::GreaterEqual => Some(4),
        Token::Plus | Token::Minus => Some(5),
        Token::Star | Token::Slash | Token::Percent => Some(6),
        _ => None,
    }
}

fn binary_op(token: &Token) -> Option<BinaryOperator> {
    match token {
        Token::Plus => Some(BinaryOperator::Add),
        Token::Minus => Some(BinaryOperator::Subtract),
        Token::Star => Some(BinaryOperator::Multiply),
        Token::Slash => Some(BinaryOperator::Divide),
        Token::Percent => Some(BinaryOperator::Modulo),
        Token::Equal => Some(BinaryOperator::Equal),
        Token::NotEqual => Some(BinaryOperator::NotEqual),
        Token::Less => Some(BinaryOperator::Less),
        Token::LessEqual => Some(BinaryOperator::LessEqual),
        Token::Greater => Some(BinaryOperator::Greater),
        Token::GreaterEqual => Some(BinaryOperator::GreaterEqual),
        Token::And => Some(BinaryOperator::And),
        Token::Or => Some(BinaryOperator::Or),
        _ => None,
    }
}

/// Any expression. `if ... then ... else ...` binds loosest.
pub fn parse_expression(stream: &mut TokenStream) -> ParseResult<Expr> {
    if matches!(stream.peek_token(), Some(Token::Keyword(k)) if k == "if") {
        let pos = stream.current_position();
        stream.expect_keyword("if")?;
        let condition = parse_expression(stream)?;
        stream.expect_keyword("then")?;
        let when_true = parse_expression(stream)?;
        stream.expect_keyword("else")?;
        let when_false = parse_expression(stream)?;
        return Ok(Expr::new(
            pos,
            ExprKind::IfThenElse {
                condition: Box::new(condition),
                when_true: Box::new(when_true),
                when_false: Box::new(when_false),
            },
        ));
    }
    parse_binary_expr(stream, 1)
}

pub fn parse_binary_expr(stream: &mut TokenStream, min_precedence: u8) -> ParseResult<Expr> {
    let mut left = parse_unary_expr(stream)?;

    loop {
        let prec = match stream.peek_token().and_then(precedence) {
            Some(p) if p >= min_precedence => p,
            _ => break,
        };
        let op = match stream.peek_token().and_then(binary_op) {
            Some(op) => {
                stream.next();
                op
            }
            None => break,
        };
        let pos = left.pos.clone();
        let right = parse_binary_expr(stream, prec + 1)?;
        left = Expr::new(
            pos,
            ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
        );
    }

    Ok(left)
}

pub fn parse_unary_expr(stream: &mut TokenStream) -> ParseResult<Expr> {
    let pos = stream.current_position();
    let op = match stream.peek_token() {
        Some(Token::Not) => {
            stream.next();
            Some(UnaryOperator::Not)
        }
        Some(Token::Minus) => {
            stream.next();
            Some(UnaryOperator::Negate)
        }
        _ => None,
    };
    match op {
        Some(op) => {
            let operand = parse_unary_expr(stream)?;
            Ok(Expr::new(
                pos,
                ExprKind::Unary {
                    op,
                    operand: Box::new(operand),
                },
            ))
        }
        None => parse_postfix_expr(stream),
    }
}

/// Postfix chain: member access, indexing, function application.
pub fn parse_postfix_expr(stream: &mut TokenStream) -> ParseResult<Expr> {
    let mut expr = parse_primary_expr(stream)?;

    loop {
        match stream.peek_token() {
            Some(Token::Dot) => {
                stream.next();
                let (field, _) = stream.expect_identifier()?;
                let pos = expr.pos.clone();
                expr = Expr::new(
                    pos,
                    ExprKind::GetName {
                        expr: Box::new(expr),
                        field,
                    },
                );
            }
            Some(Token::LeftBracket) => {
                stream.next();
                let index = parse_expression(stream)?;
                stream.expect(Token::RightBracket)?;
                let pos = expr.pos.clone();
                expr = Expr::new(
                    pos,
                    ExprKind::At {
                        expr: Box::new(expr),
                        index: Box::new(index),
                    },
                );
            }
            Some(Token::LeftParen) => {
                // Only identifiers apply; `(f)(x)` is not WDL.
                let ExprKind::Ident(name) = expr.kind else {
                    return Err(stream.syntax_error("only function names can be applied"));
                };
                let pos = expr.pos;
                stream.next();
                let mut args = Vec::new();
                if !matches!(stream.peek_token(), Some(Token::RightParen)) {
                    loop {
                        args.push(parse_expression(stream)?);
                        if matches!(stream.peek_token(), Some(Token::Comma)) {
                            stream.next();
                        } else {
                            break;
                        }
                    }
                }
                stream.expect(Token::RightParen)?;
                expr = Expr::new(pos, ExprKind::Apply { name, args });
            }
            _ => break,
        }
    }

    Ok(expr)
}

pub fn parse_primary_expr(stream: &mut TokenStream) -> ParseResult<Expr> {
    let pos = stream.current_position();
    let Some(token) = stream.peek_token() else {
        return Err(stream.syntax_error("unexpected end of input in expression"));
    };

    match token.clone() {
        Token::IntLiteral(value) => {
            stream.next();
            Ok(Expr::new(pos, ExprKind::Int(value)))
        }
        Token::FloatLiteral(value) => {
            stream.next();
            Ok(Expr::new(pos, ExprKind::Float(value)))
        }
        Token::BoolLiteral(value) => {
            stream.next();
            Ok(Expr::new(pos, ExprKind::Boolean(value)))
        }
        Token::NoneLiteral => {
            stream.next();
            Ok(Expr::new(pos, ExprKind::None))
        }
        Token::SingleQuote | Token::DoubleQuote => parse_string_expr(stream),
        Token::LeftParen => {
            stream.next();
            let first = parse_expression(stream)?;
            if matches!(stream.peek_token(), Some(Token::Comma)) {
                stream.next();
                let second = parse_expression(stream)?;
                stream.expect(Token::RightParen)?;
                Ok(Expr::new(
                    pos,
                    ExprKind::Pair {
                        left: Box::new(first),
                        right: Box::new(second),
                    },
                ))
            } else {
                stream.expect(Token::RightParen)?;
                Ok(first)
            }
        }
        Token::LeftBracket => parse_array_literal(stream),
        Token::LeftBrace => parse_map_literal(stream),
        Token::Keyword(kw) if kw == "object" => {
            stream.next();
            let members = parse_member_list(stream)?;
            Ok(Expr::new(
                pos,
                ExprKind::Object {
                    type_name: None,
                    members,
                },
            ))
        }
        Token::Identifier(name) => {
            // `StructName { ... }` literals exist from 2.0.
            if stream.version() == Version::V2_0
                && matches!(stream.peek_ahead(1), Some(Token::LeftBrace))
            {
                stream.next();
                let members = parse_member_list(stream)?;
                return Ok(Expr::new(
                    pos,
                    ExprKind::Object {
                        type_name: Some(name),
                        members,
                    },
                ));
            }
            stream.next();
            Ok(Expr::new(pos, ExprKind::Ident(name)))
        }
        other => Err(stream.syntax_error(format!(
            "unexpected {} in expression",
            other.describe()
        ))),
    }
}

fn parse_array_literal(stream: &mut TokenStream) -> ParseResult<Expr> {
    let pos = stream.current_position();
    stream.expect(Token::LeftBracket)?;
    let mut items = Vec::new();
    if !matches!(stream.peek_token(), Some(Token::RightBracket)) {
        loop {
            items.push(parse_expression(stream)?);
            if matches!(stream.peek_token(), Some(Token::Comma)) {
                stream.next();
                // Trailing comma.
                if matches!(stream.peek_token(), Some(Token::RightBracket)) {
                    break;
                }
            } else {
                break;
            }
        }
    }
    stream.expect(Token::RightBracket)?;
    Ok(Expr::new(pos, ExprKind::Array(items)))
}

fn parse_map_literal(stream: &mut TokenStream) -> ParseResult<Expr> {
    let pos = stream.current_position();
    stream.expect(Token::LeftBrace)?;
    let mut pairs = Vec::new();
    if !matches!(stream.peek_token(), Some(Token::RightBrace)) {
        loop {
            let key = parse_expression(stream)?;
            stream.expect(Token::Colon)?;
            let value = parse_expression(stream)?;
            pairs.push((key, value));
            if matches!(stream.peek_token(), Some(Token::Comma)) {
                stream.next();
                if matches!(stream.peek_token(), Some(Token::RightBrace)) {
                    break;
                }
            } else {
                break;
            }
        }
    }
    stream.expect(Token::RightBrace)?;
    Ok(Expr::new(pos, ExprKind::Map { pairs }))
}

/// `{ name: expr, ... }` member list of object/struct literals.
fn parse_member_list(stream: &mut TokenStream) -> ParseResult<Vec<(String, Expr)>> {
    stream.expect(Token::LeftBrace)?;
    let mut members = Vec::new();
    if !matches!(stream.peek_token(), Some(Token::RightBrace)) {
        loop {
            let name = match stream.next() {
                Some(t) => match t.token {
                    Token::Identifier(name) | Token::Keyword(name) => name,
                    other => {
                        return Err(stream.syntax_error_at(
                            t.pos,
                            format!("expected member name, found {}", other.describe()),
                        ))
                    }
                },
                None => return Err(stream.syntax_error("expected member name")),
            };
            stream.expect(Token::Colon)?;
            let value = parse_expression(stream)?;
            members.push((name, value));
            if matches!(stream.peek_token(), Some(Token::Comma)) {
                stream.next();
                if matches!(stream.peek_token(), Some(Token::RightBrace)) {
                    break;
                }
            } else {
                break;
            }
        }
    }
    stream.expect(Token::RightBrace)?;
    Ok(members)
}

/// Interpolated string literal. The opening quote has not been consumed.
pub fn parse_string_expr(stream: &mut TokenStream) -> ParseResult<Expr> {
    let pos = stream.current_position();
    let double = match stream.next() {
        Some(t) => match t.token {
            Token::DoubleQuote => true,
            Token::SingleQuote => false,
            other => {
                return Err(stream.syntax_error_at(
                    t.pos,
                    format!("expected string literal, found {}", other.describe()),
                ))
            }
        },
        None => return Err(stream.syntax_error("expected string literal")),
    };

    stream.enter_string_mode(double);
    let mut parts: Vec<StringPiece> = Vec::new();
    let mut text = String::new();
    let mut text_pos = stream.current_position();

    loop {
        let Some(token) = stream.next() else {
            return Err(stream.syntax_error("unterminated string literal"));
        };
        match token.token {
            Token::StringText(chunk) => {
                if text.is_empty() {
                    text_pos = token.pos;
                }
                text.push_str(&chunk);
            }
            Token::TildeBrace | Token::DollarBrace => {
                if !text.is_empty() {
                    parts.push(StringPiece::Text {
                        text: std::mem::take(&mut text),
                        pos: text_pos.clone(),
                    });
                }
                let placeholder = parse_placeholder(stream, token.pos)?;
                parts.push(StringPiece::Placeholder(placeholder));
            }
            Token::SingleQuote | Token::DoubleQuote => {
                if !text.is_empty() {
                    parts.push(StringPiece::Text {
                        text: std::mem::take(&mut text),
                        pos: text_pos.clone(),
                    });
                }
                break;
            }
            other => {
                return Err(stream.syntax_error_at(
                    token.pos,
                    format!("unexpected {} in string literal", other.describe()),
                ))
            }
        }
    }
    stream.pop_mode();

    // A literal with no interpolation is a single text fragment.
    if parts.is_empty() {
        parts.push(StringPiece::Text {
            text: String::new(),
            pos: pos.clone(),
        });
    }
    Ok(Expr::new(pos, ExprKind::String { parts }))
}

/// Placeholder body after `~{`/`${`: options in any order, then the
/// expression, then `}`. The stream is in command or string mode; the
/// interior tokenizes as ordinary WDL.
pub fn parse_placeholder(
    stream: &mut TokenStream,
    pos: crate::error::SourcePosition,
) -> ParseResult<Placeholder> {
    stream.enter_normal_mode();

    let mut options = Vec::new();
    loop {
        // An option is a name followed by `=`; a bare `true`, `sep`, or
        // `default` is an ordinary expression.
        if !matches!(stream.peek_ahead(1), Some(Token::Assign)) {
            break;
        }
        let name = match stream.peek_token() {
            Some(Token::Identifier(name)) if name == "sep" || name == "default" => name.clone(),
            Some(Token::BoolLiteral(flag)) => flag.to_string(),
            _ => break,
        };
        let option_pos = stream.current_position();
        stream.next();
        stream.expect(Token::Assign)?;
        let value = parse_primary_expr(stream)?;
        options.push(PlaceholderOption {
            pos: option_pos,
            name,
            value,
        });
    }

    let expr = parse_expression(stream)?;
    stream.expect(Token::RightBrace)?;
    stream.pop_mode();

    Ok(Placeholder { pos, options, expr })
}
