//! T-SQL lexer
//!
//! Tokenization is delegated to the sqlparser MS SQL tokenizer; its output is
//! converted into the analyzer's own immutable [`Token`] records with
//! whitespace and comments dropped and positions made absolute within the
//! source file.

use sqlparser::dialect::MsSqlDialect;
use sqlparser::tokenizer::{Token as RawToken, TokenWithSpan, Tokenizer};

use super::ast::{Position, SourceSpan};
use crate::error::ParseError;

/// Words the parser treats as reserved. Everything else is an identifier, so
/// column names such as `Name` or `Date` never collide with syntax.
const RESERVED_WORDS: &[&str] = &[
    "ALL", "ALTER", "AND", "APPLY", "AS", "ASC", "BEGIN", "BETWEEN", "BY", "CASE", "CHECK",
    "CLUSTERED", "COMMIT", "CONSTRAINT", "CREATE", "CROSS", "DECLARE", "DEFAULT", "DELETE",
    "DESC", "DISTINCT", "DROP", "ELSE", "END", "EXCEPT", "EXEC", "EXECUTE", "EXISTS", "FETCH",
    "FOR", "FOREIGN", "FROM", "FULL", "FUNCTION", "GROUP", "HAVING", "IF", "IN", "INCLUDE",
    "INDEX", "INNER", "INSERT", "INTERSECT", "INTO", "IS", "JOIN", "KEY", "LEFT", "LIKE",
    "MERGE", "NONCLUSTERED", "NOT", "NULL", "OFFSET", "ON", "OPTION", "OR", "ORDER", "OUTER",
    "OUTPUT", "OVER", "PRIMARY", "PRINT", "PROC", "PROCEDURE", "RAISERROR", "REFERENCES",
    "RETURN", "RIGHT", "ROLLBACK", "SELECT", "SET", "TABLE", "THEN", "TOP", "TRIGGER",
    "TRUNCATE", "UNION", "UNIQUE", "UPDATE", "USE", "USING", "VALUES", "VIEW", "WHEN", "WHERE",
    "WHILE", "WITH",
];

/// Literal token flavours
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    Number,
    String,
    /// `N'...'`
    NationalString,
}

/// Token classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Keyword,
    Identifier,
    /// `[name]` or `"name"`; never matches a keyword
    QuotedIdentifier,
    /// `@name` / `@@NAME`
    Variable,
    Operator,
    Literal(LiteralKind),
    Punctuation,
}

/// A lexed token. String literals hold their unquoted content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub position: Position,
    pub end: Position,
}

impl Token {
    /// Case-insensitive match against an unquoted word
    #[inline]
    pub fn is_word(&self, word: &str) -> bool {
        matches!(self.kind, TokenKind::Keyword | TokenKind::Identifier)
            && self.lexeme.eq_ignore_ascii_case(word)
    }

    /// Any name-like token: keyword, identifier or quoted identifier
    #[inline]
    pub fn is_name(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Keyword | TokenKind::Identifier | TokenKind::QuotedIdentifier
        )
    }

    /// Identifier usable as an alias or column name without quoting
    #[inline]
    pub fn is_identifier(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Identifier | TokenKind::QuotedIdentifier
        )
    }

    #[inline]
    pub fn is_punct(&self, punct: &str) -> bool {
        self.kind == TokenKind::Punctuation && self.lexeme == punct
    }

    #[inline]
    pub fn is_operator(&self, op: &str) -> bool {
        self.kind == TokenKind::Operator && self.lexeme == op
    }

    pub fn span(&self) -> SourceSpan {
        SourceSpan::new(self.position, self.end)
    }
}

/// Tokenize T-SQL text. `first_line` is the 1-based line of the first
/// character of `sql` within its file.
pub fn tokenize(sql: &str, first_line: usize) -> Result<Vec<Token>, ParseError> {
    let dialect = MsSqlDialect {};
    let raw = Tokenizer::new(&dialect, sql)
        .tokenize_with_location()
        .map_err(|e| ParseError {
            message: e.message.clone(),
            token: None,
            position: Position::new(
                e.location.line as usize + first_line.saturating_sub(1),
                e.location.column as usize,
            ),
        })?;

    Ok(convert_tokens(&raw, first_line))
}

fn convert_tokens(raw: &[TokenWithSpan], first_line: usize) -> Vec<Token> {
    let line_offset = first_line.saturating_sub(1);
    let to_position = |loc: &sqlparser::tokenizer::Location| {
        Position::new(loc.line as usize + line_offset, loc.column as usize)
    };

    let mut tokens: Vec<Token> = Vec::with_capacity(raw.len() / 2 + 1);
    let mut iter = raw.iter().peekable();

    while let Some(tws) = iter.next() {
        let position = to_position(&tws.span.start);
        let end = to_position(&tws.span.end);
        let (kind, lexeme) = match &tws.token {
            RawToken::Whitespace(_) | RawToken::EOF => continue,
            RawToken::Word(w) => {
                if w.quote_style.is_some() {
                    (TokenKind::QuotedIdentifier, w.value.clone())
                } else if w.value.starts_with('@') {
                    (TokenKind::Variable, w.value.clone())
                } else if is_reserved(&w.value) {
                    (TokenKind::Keyword, w.value.clone())
                } else {
                    (TokenKind::Identifier, w.value.clone())
                }
            }
            // Some dialect paths emit `@` separately from the name that follows
            RawToken::AtSign => {
                let following = iter.peek().and_then(|next| match &next.token {
                    RawToken::Word(w) if w.quote_style.is_none() => {
                        Some((format!("@{}", w.value), to_position(&next.span.end)))
                    }
                    _ => None,
                });
                if let Some((lexeme, end)) = following {
                    iter.next();
                    tokens.push(Token {
                        kind: TokenKind::Variable,
                        lexeme,
                        position,
                        end,
                    });
                    continue;
                }
                (TokenKind::Operator, "@".to_string())
            }
            RawToken::Number(n, _) => (TokenKind::Literal(LiteralKind::Number), n.clone()),
            RawToken::SingleQuotedString(s) => (TokenKind::Literal(LiteralKind::String), s.clone()),
            RawToken::NationalStringLiteral(s) => {
                (TokenKind::Literal(LiteralKind::NationalString), s.clone())
            }
            RawToken::HexStringLiteral(s) => {
                (TokenKind::Literal(LiteralKind::Number), format!("0x{}", s))
            }
            RawToken::DoubleQuotedString(s) => (TokenKind::QuotedIdentifier, s.clone()),
            RawToken::Comma => (TokenKind::Punctuation, ",".to_string()),
            RawToken::Period => (TokenKind::Punctuation, ".".to_string()),
            RawToken::LParen => (TokenKind::Punctuation, "(".to_string()),
            RawToken::RParen => (TokenKind::Punctuation, ")".to_string()),
            RawToken::SemiColon => (TokenKind::Punctuation, ";".to_string()),
            RawToken::Neq => (TokenKind::Operator, "<>".to_string()),
            other => (TokenKind::Operator, other.to_string()),
        };

        tokens.push(Token {
            kind,
            lexeme,
            position,
            end,
        });
    }

    tokens
}

fn is_reserved(word: &str) -> bool {
    RESERVED_WORDS
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(word))
}
