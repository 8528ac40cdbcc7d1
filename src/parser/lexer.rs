//! Stateful lexer for WDL.
//!
//! Tokenization is mode-dependent: inside command bodies and string
//! literals, whitespace is significant and nearly everything is text, while
//! placeholder interiors (`~{ ... }`) tokenize as ordinary WDL. The lexer
//! keeps a mode stack that the parser pushes and pops as it crosses those
//! boundaries.

use super::tokens::Token;
use super::Version;
use crate::parser::keywords::is_keyword;
use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{anychar, char, digit1, line_ending, satisfy},
    combinator::{map, opt, recognize, value},
    multi::many0_count,
    sequence::{pair, preceded, tuple},
    IResult,
};
use nom_locate::LocatedSpan;

pub type Span<'a> = LocatedSpan<&'a str>;

/// Lexer mode, stacked as the parser crosses string/command boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexerMode {
    /// Ordinary WDL code (including placeholder interiors).
    Normal,
    /// Inside `command { ... }` or `command <<< ... >>>`.
    Command,
    /// Inside a quoted string literal.
    InString { double: bool },
}

/// Mode stack shared with the token stream.
#[derive(Debug, Clone)]
pub struct Lexer {
    mode_stack: Vec<LexerMode>,
    version: Version,
}

impl Lexer {
    pub fn new(version: Version) -> Self {
        Self {
            mode_stack: vec![LexerMode::Normal],
            version,
        }
    }

    pub fn current_mode(&self) -> LexerMode {
        *self.mode_stack.last().unwrap_or(&LexerMode::Normal)
    }

    pub fn push_mode(&mut self, mode: LexerMode) {
        self.mode_stack.push(mode);
    }

    pub fn pop_mode(&mut self) -> Option<LexerMode> {
        if self.mode_stack.len() > 1 {
            self.mode_stack.pop()
        } else {
            None
        }
    }

    /// Lex one token from `input` according to the current mode.
    pub fn next_token<'a>(&self, input: Span<'a>) -> IResult<Span<'a>, Token> {
        match self.current_mode() {
            LexerMode::Normal => normal_token(self.version)(input),
            LexerMode::Command => command_mode_token(input),
            LexerMode::InString { double } => string_mode_token(double)(input),
        }
    }
}

// ---------------------------------------------------------------- normal mode

pub fn whitespace(input: Span) -> IResult<Span, Token> {
    map(take_while1(|c: char| c == ' ' || c == '\t' || c == '\r'), |s: Span| {
        Token::Whitespace(s.fragment().to_string())
    })(input)
}

pub fn newline(input: Span) -> IResult<Span, Token> {
    value(Token::Newline, line_ending)(input)
}

pub fn comment(input: Span) -> IResult<Span, Token> {
    map(
        recognize(preceded(char('#'), take_while(|c: char| c != '\n' && c != '\r'))),
        |s: Span| Token::Comment(s.fragment().to_string()),
    )(input)
}

/// Unsigned numeric literal; float before int so `3.14` never lexes as `3`.
/// Negation is the unary minus operator.
pub fn number(input: Span) -> IResult<Span, Token> {
    let float = map(
        recognize(tuple((
            digit1,
            char('.'),
            digit1,
            opt(tuple((
                alt((char('e'), char('E'))),
                opt(alt((char('+'), char('-')))),
                digit1,
            ))),
        ))),
        |s: Span| Token::FloatLiteral(s.fragment().parse::<f64>().unwrap_or(0.0)),
    );
    let exp_float = map(
        recognize(tuple((
            digit1,
            alt((char('e'), char('E'))),
            opt(alt((char('+'), char('-')))),
            digit1,
        ))),
        |s: Span| Token::FloatLiteral(s.fragment().parse::<f64>().unwrap_or(0.0)),
    );
    let int = map(digit1, |s: Span| {
        Token::IntLiteral(s.fragment().parse::<i64>().unwrap_or(0))
    });
    alt((float, exp_float, int))(input)
}

/// Identifier, keyword, or word-shaped literal (`true`, `false`, `None`).
pub fn word(version: Version) -> impl Fn(Span) -> IResult<Span, Token> {
    move |input: Span| {
        let (rest, span) = recognize(pair(
            satisfy(|c: char| c.is_ascii_alphabetic() || c == '_'),
            many0_count(satisfy(|c: char| c.is_ascii_alphanumeric() || c == '_')),
        ))(input)?;
        let text = *span.fragment();
        let token = match text {
            "true" => Token::BoolLiteral(true),
            "false" => Token::BoolLiteral(false),
            "None" => Token::NoneLiteral,
            _ if is_keyword(text, version) => Token::Keyword(text.to_string()),
            _ => Token::Identifier(text.to_string()),
        };
        Ok((rest, token))
    }
}

pub fn operator(input: Span) -> IResult<Span, Token> {
    alt((
        value(Token::HeredocStart, tag("<<<")),
        value(Token::Equal, tag("==")),
        value(Token::NotEqual, tag("!=")),
        value(Token::LessEqual, tag("<=")),
        value(Token::GreaterEqual, tag(">=")),
        value(Token::And, tag("&&")),
        value(Token::Or, tag("||")),
        value(Token::Plus, char('+')),
        value(Token::Minus, char('-')),
        value(Token::Star, char('*')),
        value(Token::Slash, char('/')),
        value(Token::Percent, char('%')),
        value(Token::Less, char('<')),
        value(Token::Greater, char('>')),
        value(Token::Not, char('!')),
        value(Token::Assign, char('=')),
    ))(input)
}

pub fn delimiter(input: Span) -> IResult<Span, Token> {
    alt((
        value(Token::LeftParen, char('(')),
        value(Token::RightParen, char(')')),
        value(Token::LeftBracket, char('[')),
        value(Token::RightBracket, char(']')),
        value(Token::LeftBrace, char('{')),
        value(Token::RightBrace, char('}')),
        value(Token::Comma, char(',')),
        value(Token::Dot, char('.')),
        value(Token::Colon, char(':')),
        value(Token::Question, char('?')),
        value(Token::SingleQuote, char('\'')),
        value(Token::DoubleQuote, char('"')),
    ))(input)
}

pub fn normal_token(version: Version) -> impl Fn(Span) -> IResult<Span, Token> {
    move |input: Span| {
        alt((
            whitespace,
            newline,
            comment,
            number,
            word(version),
            operator,
            delimiter,
        ))(input)
    }
}

// --------------------------------------------------------------- command mode

/// Text run in a command body, stopping at characters that might open a
/// placeholder or close the section.
fn command_text(input: Span) -> IResult<Span, Token> {
    map(
        take_while1(|c: char| !matches!(c, '}' | '~' | '$' | '>')),
        |s: Span| Token::CommandText(s.fragment().to_string()),
    )(input)
}

pub fn command_mode_token(input: Span) -> IResult<Span, Token> {
    alt((
        value(Token::TildeBrace, tag("~{")),
        value(Token::DollarBrace, tag("${")),
        value(Token::HeredocEnd, tag(">>>")),
        value(Token::RightBrace, char('}')),
        // Bare ~, $, > are shell text.
        map(alt((char('~'), char('$'), char('>'))), |c| {
            Token::CommandText(c.to_string())
        }),
        command_text,
    ))(input)
}

// ---------------------------------------------------------------- string mode

/// Decode one backslash escape; unrecognized escapes are kept verbatim.
fn string_escape(input: Span) -> IResult<Span, Token> {
    let (rest, (_, escaped)) = pair(char('\\'), anychar)(input)?;
    let decoded = match escaped {
        'n' => "\n".to_string(),
        't' => "\t".to_string(),
        'r' => "\r".to_string(),
        '\\' => "\\".to_string(),
        '\'' => "'".to_string(),
        '"' => "\"".to_string(),
        '~' => "~".to_string(),
        '$' => "$".to_string(),
        other => format!("\\{}", other),
    };
    Ok((rest, Token::StringText(decoded)))
}

pub fn string_mode_token(double: bool) -> impl Fn(Span) -> IResult<Span, Token> {
    move |input: Span| {
        let quote = if double { '"' } else { '\'' };
        let end_quote = value(
            if double {
                Token::DoubleQuote
            } else {
                Token::SingleQuote
            },
            char(quote),
        );
        alt((
            end_quote,
            value(Token::TildeBrace, tag("~{")),
            value(Token::DollarBrace, tag("${")),
            string_escape,
            map(alt((char('~'), char('$'))), |c| {
                Token::StringText(c.to_string())
            }),
            map(
                take_while1(move |c: char| {
                    c != quote && c != '~' && c != '$' && c != '\\' && c != '\n'
                }),
                |s: Span| Token::StringText(s.fragment().to_string()),
            ),
        ))(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(input: &str, version: Version) -> Token {
        normal_token(version)(Span::new(input)).unwrap().1
    }

    #[test]
    fn test_mode_stack() {
        let mut lexer = Lexer::new(Version::V1_0);
        assert_eq!(lexer.current_mode(), LexerMode::Normal);
        lexer.push_mode(LexerMode::Command);
        assert_eq!(lexer.current_mode(), LexerMode::Command);
        lexer.push_mode(LexerMode::Normal);
        lexer.pop_mode();
        assert_eq!(lexer.current_mode(), LexerMode::Command);
        lexer.pop_mode();
        assert_eq!(lexer.current_mode(), LexerMode::Normal);
        // The base mode cannot be popped.
        assert!(lexer.pop_mode().is_none());
    }

    #[test]
    fn test_numbers() {
        assert_eq!(lex("42", Version::V1_0), Token::IntLiteral(42));
        assert_eq!(lex("3.14", Version::V1_0), Token::FloatLiteral(3.14));
        assert_eq!(lex("2.5e3", Version::V1_0), Token::FloatLiteral(2500.0));
        assert_eq!(lex("1e3", Version::V1_0), Token::FloatLiteral(1000.0));
    }

    #[test]
    fn test_words() {
        assert_eq!(lex("task", Version::V1_0), Token::Keyword("task".to_string()));
        assert_eq!(
            lex("my_var", Version::V1_0),
            Token::Identifier("my_var".to_string())
        );
        assert_eq!(lex("true", Version::V1_0), Token::BoolLiteral(true));
        assert_eq!(lex("None", Version::V1_0), Token::NoneLiteral);
        // Word boundary: "trueish" is an identifier, not `true` + "ish".
        assert_eq!(
            lex("trueish", Version::V1_0),
            Token::Identifier("trueish".to_string())
        );
        // `hints` is reserved only from 2.0.
        assert_eq!(
            lex("hints", Version::V1_0),
            Token::Identifier("hints".to_string())
        );
        assert_eq!(lex("hints", Version::V2_0), Token::Keyword("hints".to_string()));
    }

    #[test]
    fn test_operators() {
        assert_eq!(lex("==", Version::V1_0), Token::Equal);
        assert_eq!(lex("<=", Version::V1_0), Token::LessEqual);
        assert_eq!(lex("<<<", Version::V1_0), Token::HeredocStart);
        assert_eq!(lex("&&", Version::V1_0), Token::And);
        assert_eq!(lex("<", Version::V1_0), Token::Less);
    }

    #[test]
    fn test_command_mode() {
        let (rest, token) = command_mode_token(Span::new("echo hi ~{x}")).unwrap();
        assert_eq!(token, Token::CommandText("echo hi ".to_string()));
        let (rest, token) = command_mode_token(rest).unwrap();
        assert_eq!(token, Token::TildeBrace);
        assert_eq!(*rest.fragment(), "x}");

        // Bare $ is shell text.
        let (_, token) = command_mode_token(Span::new("$(pwd)")).unwrap();
        assert_eq!(token, Token::CommandText("$".to_string()));

        let (_, token) = command_mode_token(Span::new(">>>")).unwrap();
        assert_eq!(token, Token::HeredocEnd);
    }

    #[test]
    fn test_string_mode() {
        let tokenizer = string_mode_token(true);
        let (rest, token) = tokenizer(Span::new("hello ~{name}\"")).unwrap();
        assert_eq!(token, Token::StringText("hello ".to_string()));
        let (_, token) = tokenizer(rest).unwrap();
        assert_eq!(token, Token::TildeBrace);

        let (_, token) = tokenizer(Span::new("\\n")).unwrap();
        assert_eq!(token, Token::StringText("\n".to_string()));

        let (_, token) = tokenizer(Span::new("\"rest")).unwrap();
        assert_eq!(token, Token::DoubleQuote);
    }
}
