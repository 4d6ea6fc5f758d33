//! Base token parser providing common helper methods for T-SQL parsing.
//!
//! The statement, expression, routine and DDL parsers all hold a
//! `TokenParser` and delegate token navigation to it:
//!
//! ```ignore
//! let mut base = TokenParser::new(tokens);
//! base.expect_word("SELECT")?;
//! let name = base.parse_object_name()?;
//! ```

use super::ast::{ObjectName, Position, SourceSpan};
use super::lexer::{Token, TokenKind};
use crate::error::ParseError;

/// Token cursor over a single statement's tokens
pub struct TokenParser {
    tokens: Vec<Token>,
    pos: usize,
}

impl TokenParser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    // ========================================================================
    // Position and state
    // ========================================================================

    #[inline]
    pub fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn set_pos(&mut self, pos: usize) {
        self.pos = pos.min(self.tokens.len());
    }

    #[inline]
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    // ========================================================================
    // Token access
    // ========================================================================

    #[inline]
    pub fn current_token(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    /// Peek at a token at an offset from the current position
    #[inline]
    pub fn peek(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    /// Token before the current position
    #[inline]
    pub fn previous(&self) -> Option<&Token> {
        self.pos.checked_sub(1).and_then(|p| self.tokens.get(p))
    }

    #[inline]
    pub fn advance(&mut self) {
        if !self.is_at_end() {
            self.pos += 1;
        }
    }

    /// Consume and return the current token
    pub fn next_token(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.advance();
        token
    }

    /// Position of the current token, or just past the last token at end
    pub fn current_position(&self) -> Position {
        match self.current_token() {
            Some(t) => t.position,
            None => self.tokens.last().map(|t| t.end).unwrap_or_default(),
        }
    }

    /// End of the most recently consumed token
    pub fn previous_end(&self) -> Position {
        self.previous().map(|t| t.end).unwrap_or_default()
    }

    /// Span from `start` to the end of the most recently consumed token
    pub fn span_from(&self, start: Position) -> SourceSpan {
        SourceSpan::new(start, self.previous_end().max(start))
    }

    // ========================================================================
    // Token type checks
    // ========================================================================

    /// Check if the current token is an unquoted word (case-insensitive)
    #[inline]
    pub fn check_word(&self, word: &str) -> bool {
        self.current_token().is_some_and(|t| t.is_word(word))
    }

    /// Check if the token at `offset` is an unquoted word (case-insensitive)
    #[inline]
    pub fn check_word_at(&self, offset: usize, word: &str) -> bool {
        self.peek(offset).is_some_and(|t| t.is_word(word))
    }

    #[inline]
    pub fn check_any_word(&self, words: &[&str]) -> bool {
        words.iter().any(|w| self.check_word(w))
    }

    #[inline]
    pub fn check_punct(&self, punct: &str) -> bool {
        self.current_token().is_some_and(|t| t.is_punct(punct))
    }

    #[inline]
    pub fn check_operator(&self, op: &str) -> bool {
        self.current_token().is_some_and(|t| t.is_operator(op))
    }

    #[inline]
    pub fn check_kind(&self, kind: TokenKind) -> bool {
        self.current_token().is_some_and(|t| t.kind == kind)
    }

    // ========================================================================
    // Consume-if-present
    // ========================================================================

    /// Advance past `word` if it is next
    pub fn consume_word(&mut self, word: &str) -> bool {
        if self.check_word(word) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub fn consume_punct(&mut self, punct: &str) -> bool {
        if self.check_punct(punct) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub fn consume_operator(&mut self, op: &str) -> bool {
        if self.check_operator(op) {
            self.advance();
            true
        } else {
            false
        }
    }

    // ========================================================================
    // Expect methods (check and advance, or fail)
    // ========================================================================

    pub fn expect_word(&mut self, word: &str) -> Result<(), ParseError> {
        if self.consume_word(word) {
            Ok(())
        } else {
            Err(self.error(format!("expected {}", word)))
        }
    }

    pub fn expect_punct(&mut self, punct: &str) -> Result<(), ParseError> {
        if self.consume_punct(punct) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", punct)))
        }
    }

    /// Build a ParseError naming the current token
    pub fn error(&self, message: impl Into<String>) -> ParseError {
        let message = message.into();
        match self.current_token() {
            Some(token) => ParseError {
                message: format!("{}, found '{}'", message, token.lexeme),
                token: Some(token.lexeme.clone()),
                position: token.position,
            },
            None => ParseError {
                message: format!("{}, found end of statement", message),
                token: None,
                position: self.current_position(),
            },
        }
    }

    // ========================================================================
    // Identifier parsing
    // ========================================================================

    /// Parse an identifier (bracketed or unbracketed). Reserved keywords are
    /// rejected unless `allow_keywords` is set.
    pub fn parse_identifier_with(&mut self, allow_keywords: bool) -> Result<String, ParseError> {
        match self.current_token() {
            Some(t) if t.is_identifier() || (allow_keywords && t.kind == TokenKind::Keyword) => {
                let name = t.lexeme.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.error("expected identifier")),
        }
    }

    pub fn parse_identifier(&mut self) -> Result<String, ParseError> {
        self.parse_identifier_with(false)
    }

    /// Parse a dotted name of up to four parts, keeping schema and object.
    /// Temp tables and table variables are accepted as single-part names.
    pub fn parse_object_name(&mut self) -> Result<ObjectName, ParseError> {
        let mut parts = Vec::new();

        match self.current_token() {
            Some(t) if t.kind == TokenKind::Variable => {
                let name = t.lexeme.clone();
                self.advance();
                return Ok(ObjectName::new(None, &name));
            }
            _ => parts.push(self.parse_identifier()?),
        }

        while self.check_punct(".") && parts.len() < 4 {
            self.advance();
            // `db..table` leaves the schema empty
            if self.check_punct(".") {
                parts.push(String::new());
                continue;
            }
            parts.push(self.parse_identifier_with(true)?);
        }

        let name = parts.pop().unwrap_or_default();
        let schema = parts.pop().filter(|s| !s.is_empty());
        Ok(ObjectName { schema, name })
    }

    /// Parse a comma-separated identifier list in parentheses, ignoring
    /// ASC/DESC modifiers: `(a, b DESC)`
    pub fn parse_column_list(&mut self) -> Result<Vec<String>, ParseError> {
        self.expect_punct("(")?;
        let mut columns = Vec::new();
        loop {
            columns.push(self.parse_identifier_with(true)?);
            if !self.consume_word("ASC") {
                self.consume_word("DESC");
            }
            if self.consume_punct(",") {
                continue;
            }
            self.expect_punct(")")?;
            break;
        }
        Ok(columns)
    }

    // ========================================================================
    // Data type parsing
    // ========================================================================

    /// Parse a data type such as `INT`, `NVARCHAR(MAX)`, `DECIMAL(18, 2)` or
    /// `[dbo].[MyType]`, returning upper-cased canonical text.
    pub fn parse_data_type(&mut self) -> Result<String, ParseError> {
        let name = self.parse_object_name()?;
        let mut text = name.name.to_uppercase();

        // DOUBLE PRECISION / CHAR VARYING style two-word types
        if self.check_word("PRECISION") || self.check_word("VARYING") {
            if let Some(t) = self.next_token() {
                text.push(' ');
                text.push_str(&t.lexeme.to_uppercase());
            }
        }

        if self.check_punct("(") {
            self.advance();
            let mut args = Vec::new();
            while let Some(t) = self.current_token() {
                if t.is_punct(")") {
                    break;
                }
                if !t.is_punct(",") {
                    args.push(t.lexeme.to_uppercase());
                }
                self.advance();
            }
            self.expect_punct(")")?;
            text = format!("{}({})", text, args.join(", "));
        }

        Ok(text)
    }

    // ========================================================================
    // Utility methods
    // ========================================================================

    /// Skip a parenthesized group, handling nesting. Position must be at `(`.
    pub fn skip_parenthesized(&mut self) {
        if !self.check_punct("(") {
            return;
        }

        let mut depth = 0usize;
        while let Some(t) = self.current_token() {
            if t.is_punct("(") {
                depth += 1;
            } else if t.is_punct(")") {
                depth -= 1;
                if depth == 0 {
                    self.advance();
                    return;
                }
            }
            self.advance();
        }
    }

    /// Advance to the first top-level occurrence of any of `words`, or the end
    pub fn skip_to_any_word(&mut self, words: &[&str]) {
        let mut depth = 0usize;
        while let Some(t) = self.current_token() {
            if t.is_punct("(") {
                depth += 1;
            } else if t.is_punct(")") {
                depth = depth.saturating_sub(1);
            } else if depth == 0 && words.iter().any(|w| t.is_word(w)) {
                return;
            }
            self.advance();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::lexer::tokenize;

    fn parser(sql: &str) -> TokenParser {
        TokenParser::new(tokenize(sql, 1).unwrap())
    }

    #[test]
    fn test_is_at_end() {
        let mut parser = parser("A");
        assert!(!parser.is_at_end());
        parser.advance();
        assert!(parser.is_at_end());
    }

    #[test]
    fn test_check_word_is_case_insensitive() {
        let parser = parser("select");
        assert!(parser.check_word("SELECT"));
        assert!(parser.check_word("Select"));
        assert!(!parser.check_word("FROM"));
    }

    #[test]
    fn test_expect_word_reports_offending_token() {
        let mut parser = parser("UPDATE t");
        let err = parser.expect_word("SELECT").unwrap_err();
        assert_eq!(err.token.as_deref(), Some("UPDATE"));
        assert_eq!(err.position, Position::new(1, 1));
    }

    #[test]
    fn test_parse_object_name_schema_qualified() {
        let mut parser = parser("[dbo].[Users]");
        let name = parser.parse_object_name().unwrap();
        assert_eq!(name, ObjectName::new(Some("dbo"), "Users"));
    }

    #[test]
    fn test_parse_object_name_four_part() {
        let mut parser = parser("Srv.SalesDb.sales.Orders");
        let name = parser.parse_object_name().unwrap();
        assert_eq!(name, ObjectName::new(Some("sales"), "Orders"));
    }

    #[test]
    fn test_parse_object_name_unqualified() {
        let mut parser = parser("Users");
        let name = parser.parse_object_name().unwrap();
        assert_eq!(name, ObjectName::new(None, "Users"));
    }

    #[test]
    fn test_parse_data_type_with_arguments() {
        let mut parser = parser("decimal(18, 2)");
        assert_eq!(parser.parse_data_type().unwrap(), "DECIMAL(18, 2)");

        let mut parser = self::parser("nvarchar(max)");
        assert_eq!(parser.parse_data_type().unwrap(), "NVARCHAR(MAX)");
    }

    #[test]
    fn test_parse_column_list_ignores_sort_order() {
        let mut parser = parser("([A], B DESC, C ASC)");
        assert_eq!(parser.parse_column_list().unwrap(), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_skip_parenthesized() {
        let mut parser = parser("(a, (b, c), d) rest");
        parser.skip_parenthesized();
        assert!(parser.check_word("rest"));
    }

    #[test]
    fn test_skip_to_any_word_ignores_nested() {
        let mut parser = parser("a (WHERE) b WHERE c");
        parser.skip_to_any_word(&["WHERE"]);
        assert!(parser.check_word("WHERE"));
        assert_eq!(parser.pos(), 5);
    }
}
