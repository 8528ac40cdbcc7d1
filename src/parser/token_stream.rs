//! Lazily tokenized stream over one document.
//!
//! Tokens are produced on demand so the parser can switch lexer modes at
//! string and command boundaries. The stream tracks line/column itself
//! (1-based, end-exclusive columns), skips trivia in normal mode while
//! recording comments into the document's [`CommentMap`], and offers
//! two-token lookahead for the few productions that need it (placeholder
//! options).

use super::lexer::{Lexer, LexerMode, Span};
use super::tokens::{LocatedToken, Token};
use super::Version;
use crate::error::{SourcePosition, WdlError};
use crate::source::{Comment, CommentMap};
use std::collections::VecDeque;

pub struct TokenStream {
    source: String,
    uri: String,
    abspath: String,
    version: Version,
    byte_pos: usize,
    line: u32,
    column: u32,
    lexer: Lexer,
    pending: VecDeque<LocatedToken>,
    comments: CommentMap,
    last_content_line: u32,
    /// Reject a written `T??` instead of flattening it.
    pub strict_double_optional: bool,
}

impl TokenStream {
    pub fn new(source: &str, uri: &str, abspath: &str, version: Version) -> Self {
        Self {
            source: source.to_string(),
            uri: uri.to_string(),
            abspath: abspath.to_string(),
            version,
            byte_pos: 0,
            line: 1,
            column: 1,
            lexer: Lexer::new(version),
            pending: VecDeque::new(),
            comments: CommentMap::new(),
            last_content_line: 0,
            strict_double_optional: false,
        }
    }

    pub fn version(&self) -> Version {
        self.version
    }

    /// Position of the next token, or of the cursor at EOF.
    pub fn current_position(&mut self) -> SourcePosition {
        if let Some(token) = self.peek() {
            return token.pos.clone();
        }
        SourcePosition::new(
            self.uri.clone(),
            self.abspath.clone(),
            self.line,
            self.column,
            self.line,
            self.column,
        )
    }

    fn position_at_cursor(&self) -> SourcePosition {
        SourcePosition::new(
            self.uri.clone(),
            self.abspath.clone(),
            self.line,
            self.column,
            self.line,
            self.column,
        )
    }

    /// Produce one more token from the source, skipping trivia in normal
    /// mode and recording comments.
    fn generate(&mut self) -> Result<Option<LocatedToken>, WdlError> {
        loop {
            if self.byte_pos >= self.source.len() {
                return Ok(None);
            }
            let rest = &self.source[self.byte_pos..];
            let (remaining, token) = match self.lexer.next_token(Span::new(rest)) {
                Ok(ok) => ok,
                Err(_) => {
                    let snippet: String = rest.chars().take(10).collect();
                    return Err(self.syntax_error_at(
                        self.position_at_cursor(),
                        format!("unexpected character(s) at '{}'", snippet),
                    ));
                }
            };
            let consumed = rest.len() - remaining.fragment().len();
            if consumed == 0 {
                return Err(self.syntax_error_at(
                    self.position_at_cursor(),
                    "lexer made no progress".to_string(),
                ));
            }

            let start_line = self.line;
            let start_column = self.column;
            for c in rest[..consumed].chars() {
                if c == '\n' {
                    self.line += 1;
                    self.column = 1;
                } else {
                    self.column += 1;
                }
            }
            self.byte_pos += consumed;

            let pos = SourcePosition::new(
                self.uri.clone(),
                self.abspath.clone(),
                start_line,
                start_column,
                self.line,
                self.column,
            );

            if self.lexer.current_mode() == LexerMode::Normal && token.is_trivia() {
                if let Token::Comment(text) = &token {
                    let own_line = start_line != self.last_content_line;
                    self.comments.insert(Comment::new(text.clone(), pos, own_line));
                }
                continue;
            }

            self.last_content_line = start_line;
            return Ok(Some(LocatedToken::new(token, pos)));
        }
    }

    fn fill_pending(&mut self, count: usize) {
        while self.pending.len() < count {
            match self.generate() {
                Ok(Some(token)) => self.pending.push_back(token),
                Ok(None) | Err(_) => break,
            }
        }
    }

    pub fn peek(&mut self) -> Option<&LocatedToken> {
        self.fill_pending(1);
        self.pending.front()
    }

    pub fn peek_token(&mut self) -> Option<&Token> {
        self.peek().map(|t| &t.token)
    }

    /// Look `n` tokens past the current one (n = 1 is the token after next).
    pub fn peek_ahead(&mut self, n: usize) -> Option<&Token> {
        self.fill_pending(n + 1);
        self.pending.get(n).map(|t| &t.token)
    }

    pub fn next(&mut self) -> Option<LocatedToken> {
        self.fill_pending(1);
        self.pending.pop_front()
    }

    pub fn is_eof(&mut self) -> bool {
        self.peek().is_none()
    }

    /// Consume the next token, which must equal `expected`.
    pub fn expect(&mut self, expected: Token) -> Result<LocatedToken, WdlError> {
        match self.next() {
            Some(found) if found.token == expected => Ok(found),
            Some(found) => Err(self.syntax_error_at(
                found.pos,
                format!("expected {}, found {}", expected.describe(), found.token.describe()),
            )),
            None => Err(self.syntax_error_at(
                self.position_at_cursor(),
                format!("expected {}, found end of input", expected.describe()),
            )),
        }
    }

    /// Consume a specific keyword.
    pub fn expect_keyword(&mut self, word: &str) -> Result<LocatedToken, WdlError> {
        match self.next() {
            Some(found) if matches!(&found.token, Token::Keyword(k) if k == word) => Ok(found),
            Some(found) => Err(self.syntax_error_at(
                found.pos,
                format!("expected keyword '{}', found {}", word, found.token.describe()),
            )),
            None => Err(self.syntax_error_at(
                self.position_at_cursor(),
                format!("expected keyword '{}', found end of input", word),
            )),
        }
    }

    /// Consume an identifier, returning its name and span.
    pub fn expect_identifier(&mut self) -> Result<(String, SourcePosition), WdlError> {
        match self.next() {
            Some(LocatedToken {
                token: Token::Identifier(name),
                pos,
            }) => Ok((name, pos)),
            Some(found) => Err(self.syntax_error_at(
                found.pos,
                format!("expected identifier, found {}", found.token.describe()),
            )),
            None => Err(self.syntax_error_at(
                self.position_at_cursor(),
                "expected identifier, found end of input".to_string(),
            )),
        }
    }

    // Mode switches are only legal at points where the grammar holds no
    // lookahead; the opening delimiter has always just been consumed.

    pub fn enter_command_mode(&mut self) {
        debug_assert!(self.pending.is_empty());
        self.lexer.push_mode(LexerMode::Command);
    }

    pub fn enter_string_mode(&mut self, double: bool) {
        debug_assert!(self.pending.is_empty());
        self.lexer.push_mode(LexerMode::InString { double });
    }

    pub fn enter_normal_mode(&mut self) {
        debug_assert!(self.pending.is_empty());
        self.lexer.push_mode(LexerMode::Normal);
    }

    pub fn pop_mode(&mut self) {
        debug_assert!(self.pending.is_empty());
        self.lexer.pop_mode();
    }

    pub fn syntax_error(&mut self, message: impl Into<String>) -> WdlError {
        let pos = self.current_position();
        self.syntax_error_at(pos, message.into())
    }

    pub fn syntax_error_at(&self, pos: SourcePosition, message: String) -> WdlError {
        WdlError::syntax(pos, message, self.version.as_str())
    }

    /// Hand the collected comments to the document being built.
    pub fn take_comments(&mut self) -> CommentMap {
        std::mem::take(&mut self.comments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream(source: &str) -> TokenStream {
        TokenStream::new(source, "t.wdl", "/t.wdl", Version::V1_0)
    }

    #[test]
    fn test_trivia_skipped_and_positions_tracked() {
        let mut s = stream("x  =\n  42");
        let x = s.next().unwrap();
        assert_eq!(x.token, Token::Identifier("x".to_string()));
        assert_eq!((x.pos.line, x.pos.column), (1, 1));
        let eq = s.next().unwrap();
        assert_eq!(eq.token, Token::Assign);
        assert_eq!((eq.pos.line, eq.pos.column), (1, 4));
        let n = s.next().unwrap();
        assert_eq!(n.token, Token::IntLiteral(42));
        assert_eq!((n.pos.line, n.pos.column), (2, 3));
        assert_eq!((n.pos.end_line, n.pos.end_column), (2, 5));
        assert!(s.is_eof());
    }

    #[test]
    fn test_comment_collection() {
        let mut s = stream("# leading\nInt x = 1  # trailing\n## preformatted\n");
        while s.next().is_some() {}
        let comments = s.take_comments();
        assert_eq!(comments.len(), 3);
        let leading = comments.get(1).unwrap();
        assert!(leading.own_line);
        assert!(!leading.preformatted);
        let trailing = comments.get(2).unwrap();
        assert!(!trailing.own_line);
        let pre = comments.get(3).unwrap();
        assert!(pre.preformatted);
    }

    #[test]
    fn test_peek_ahead() {
        let mut s = stream("sep = \",\"");
        assert!(matches!(s.peek_token(), Some(Token::Identifier(n)) if n == "sep"));
        assert!(matches!(s.peek_ahead(1), Some(Token::Assign)));
        // Peeking does not consume.
        assert!(matches!(s.next().unwrap().token, Token::Identifier(_)));
        assert!(matches!(s.next().unwrap().token, Token::Assign));
    }

    #[test]
    fn test_expect() {
        let mut s = stream(": x");
        assert!(s.expect(Token::Colon).is_ok());
        assert!(s.expect(Token::Comma).is_err());
    }

    #[test]
    fn test_command_mode_preserves_whitespace() {
        let mut s = stream("{  echo hi\n}");
        s.expect(Token::LeftBrace).unwrap();
        s.enter_command_mode();
        let text = s.next().unwrap();
        assert_eq!(text.token, Token::CommandText("  echo hi\n".to_string()));
        let close = s.next().unwrap();
        assert_eq!(close.token, Token::RightBrace);
        s.pop_mode();
        assert!(s.is_eof());
    }

    #[test]
    fn test_string_mode_round_trip() {
        let mut s = stream("\"a~{x}b\"");
        s.expect(Token::DoubleQuote).unwrap();
        s.enter_string_mode(true);
        assert_eq!(s.next().unwrap().token, Token::StringText("a".to_string()));
        assert_eq!(s.next().unwrap().token, Token::TildeBrace);
        s.enter_normal_mode();
        assert_eq!(s.next().unwrap().token, Token::Identifier("x".to_string()));
        assert_eq!(s.next().unwrap().token, Token::RightBrace);
        s.pop_mode();
        assert_eq!(s.next().unwrap().token, Token::StringText("b".to_string()));
        assert_eq!(s.next().unwrap().token, Token::DoubleQuote);
        s.pop_mode();
        assert!(s.is_eof());
    }
}
