//! Token definitions for the WDL lexer.

use crate::error::SourcePosition;

/// A lexical token. Which tokens can appear depends on the lexer mode:
/// `StringText`/`CommandText` only occur inside string literals and command
/// bodies, where whitespace and newlines are significant and preserved.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Trivia (skipped outside command/string modes)
    Whitespace(String),
    Newline,
    Comment(String),

    // Literals
    IntLiteral(i64),
    FloatLiteral(f64),
    BoolLiteral(bool),
    NoneLiteral,

    // Words
    Identifier(String),
    Keyword(String),

    // String delimiters and content
    SingleQuote,
    DoubleQuote,
    StringText(String),

    // Command delimiters and content
    HeredocStart,
    HeredocEnd,
    CommandText(String),

    // Placeholder openers
    TildeBrace,
    DollarBrace,

    // Operators
    Equal,
    NotEqual,
    LessEqual,
    GreaterEqual,
    And,
    Or,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Less,
    Greater,
    Not,
    Assign,

    // Delimiters
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    LeftBrace,
    RightBrace,

    // Punctuation
    Comma,
    Dot,
    Colon,
    Question,
}

impl Token {
    /// Trivia tokens are invisible to the grammar in normal mode.
    pub fn is_trivia(&self) -> bool {
        matches!(
            self,
            Token::Whitespace(_) | Token::Newline | Token::Comment(_)
        )
    }

    /// Short description for syntax error messages.
    pub fn describe(&self) -> String {
        match self {
            Token::Whitespace(_) => "whitespace".to_string(),
            Token::Newline => "newline".to_string(),
            Token::Comment(_) => "comment".to_string(),
            Token::IntLiteral(n) => format!("integer {}", n),
            Token::FloatLiteral(f) => format!("float {}", f),
            Token::BoolLiteral(b) => format!("{}", b),
            Token::NoneLiteral => "None".to_string(),
            Token::Identifier(name) => format!("identifier '{}'", name),
            Token::Keyword(word) => format!("keyword '{}'", word),
            Token::SingleQuote => "'".to_string(),
            Token::DoubleQuote => "\"".to_string(),
            Token::StringText(_) => "string text".to_string(),
            Token::HeredocStart => "<<<".to_string(),
            Token::HeredocEnd => ">>>".to_string(),
            Token::CommandText(_) => "command text".to_string(),
            Token::TildeBrace => "~{".to_string(),
            Token::DollarBrace => "${".to_string(),
            Token::Equal => "==".to_string(),
            Token::NotEqual => "!=".to_string(),
            Token::LessEqual => "<=".to_string(),
            Token::GreaterEqual => ">=".to_string(),
            Token::And => "&&".to_string(),
            Token::Or => "||".to_string(),
            Token::Plus => "+".to_string(),
            Token::Minus => "-".to_string(),
            Token::Star => "*".to_string(),
            Token::Slash => "/".to_string(),
            Token::Percent => "%".to_string(),
            Token::Less => "<".to_string(),
            Token::Greater => ">".to_string(),
            Token::Not => "!".to_string(),
            Token::Assign => "=".to_string(),
            Token::LeftParen => "(".to_string(),
            Token::RightParen => ")".to_string(),
            Token::LeftBracket => "[".to_string(),
            Token::RightBracket => "]".to_string(),
            Token::LeftBrace => "{".to_string(),
            Token::RightBrace => "}".to_string(),
            Token::Comma => ",".to_string(),
            Token::Dot => ".".to_string(),
            Token::Colon => ":".to_string(),
            Token::Question => "?".to_string(),
        }
    }
}

/// A token together with its source span.
#[derive(Debug, Clone, PartialEq)]
pub struct LocatedToken {
    pub token: Token,
    pub pos: SourcePosition,
}

impl LocatedToken {
    pub fn new(token: Token, pos: SourcePosition) -> Self {
        Self { token, pos }
    }
}
