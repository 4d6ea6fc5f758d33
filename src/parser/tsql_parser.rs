//! T-SQL script parsing: GO batches, statement segmentation and the file driver

use std::ops::Range;
use std::path::{Path, PathBuf};

use anyhow::Result;
use rayon::prelude::*;
use tracing::{debug, warn};

use super::ast::{Position, SourceSpan, Statement};
use super::lexer::{tokenize, Token, TokenKind};
use super::statement_parser::StatementParser;
use crate::error::ParseError;
use crate::input::read_file_with_encoding_fallback;

/// A statement with its source location. Parse failures are kept per
/// statement so one bad statement never hides the rest of the file.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedStatement {
    /// 1-based ordinal of the statement within its file
    pub index: usize,
    /// 1-based ordinal of the GO batch within its file
    pub batch: usize,
    /// Source file path
    pub source_file: PathBuf,
    pub span: SourceSpan,
    /// Original SQL text of the statement
    pub sql_text: String,
    pub parsed: std::result::Result<Statement, ParseError>,
}

/// Keywords that start a new statement at parenthesis depth 0
const STATEMENT_STARTERS: &[&str] = &[
    "SELECT", "INSERT", "UPDATE", "DELETE", "MERGE", "WITH", "CREATE", "ALTER", "DROP",
    "DECLARE", "SET", "EXEC", "EXECUTE", "BEGIN", "END", "COMMIT", "ROLLBACK", "SAVE", "IF",
    "ELSE", "WHILE", "PRINT", "RETURN", "TRUNCATE", "THROW", "RAISERROR", "USE", "BREAK",
    "CONTINUE", "GOTO", "WAITFOR", "FETCH", "OPEN", "CLOSE", "DEALLOCATE", "GRANT", "DENY",
    "REVOKE",
];

/// Minimum number of files to benefit from parallel processing.
/// Below this threshold, sequential processing is faster due to rayon overhead.
const PARALLEL_THRESHOLD: usize = 8;

/// Parse multiple SQL files, using parallel processing for larger file sets.
/// Statements come back in input file order.
pub fn parse_sql_files(files: &[PathBuf]) -> Result<Vec<ParsedStatement>> {
    let mut all_statements = Vec::with_capacity(files.len() * 4);

    if files.len() >= PARALLEL_THRESHOLD {
        let results: Vec<Result<Vec<ParsedStatement>>> =
            files.par_iter().map(|file| parse_sql_file(file)).collect();

        for result in results {
            all_statements.extend(result?);
        }
    } else {
        for file in files {
            all_statements.extend(parse_sql_file(file)?);
        }
    }

    Ok(all_statements)
}

/// Parse a single SQL file
pub fn parse_sql_file(path: &Path) -> Result<Vec<ParsedStatement>> {
    let content = read_file_with_encoding_fallback(path)?;
    Ok(parse_sql(path, &content))
}

/// Parse SQL text. Never fails: tokenizer and parser errors are attached to
/// the statements (or batch) they occur in.
pub fn parse_sql(source_file: &Path, content: &str) -> Vec<ParsedStatement> {
    // Strip UTF-8 BOM if present
    let content = content.strip_prefix('\u{FEFF}').unwrap_or(content);
    let mut statements = Vec::new();

    let mut batch_number = 0;
    for batch in split_batches(content) {
        if batch.content.trim().is_empty() {
            continue;
        }
        batch_number += 1;

        let tokens = match tokenize(batch.content, batch.start_line) {
            Ok(tokens) => tokens,
            Err(err) => {
                warn!(
                    file = %source_file.display(),
                    line = err.position.line,
                    "Tokenizer error: {}",
                    err.message
                );
                let line_count = batch.content.lines().count().max(1);
                statements.push(ParsedStatement {
                    index: statements.len() + 1,
                    batch: batch_number,
                    source_file: source_file.to_path_buf(),
                    span: SourceSpan::new(
                        Position::new(batch.start_line, 1),
                        Position::new(batch.start_line + line_count - 1, 1),
                    ),
                    sql_text: batch.content.trim().to_string(),
                    parsed: Err(err),
                });
                continue;
            }
        };

        for range in split_statements(&tokens) {
            let segment = &tokens[range];
            let (Some(first), Some(last)) = (segment.first(), segment.last()) else {
                continue;
            };
            let span = SourceSpan::new(first.position, last.end);
            let parsed = StatementParser::new(segment.to_vec()).parse_complete();

            match &parsed {
                Ok(statement) => debug!(
                    file = %source_file.display(),
                    line = span.start.line,
                    kind = statement.kind_name(),
                    "Parsed statement"
                ),
                Err(err) => debug!(
                    file = %source_file.display(),
                    line = err.position.line,
                    "Parse error: {}",
                    err
                ),
            }

            statements.push(ParsedStatement {
                index: statements.len() + 1,
                batch: batch_number,
                source_file: source_file.to_path_buf(),
                span,
                sql_text: slice_span(batch.content, batch.start_line, span),
                parsed,
            });
        }
    }

    statements
}

/// Cut the text covered by `span` out of a batch starting at `first_line`
fn slice_span(content: &str, first_line: usize, span: SourceSpan) -> String {
    let mut out = String::new();
    for (offset, line) in content.lines().enumerate() {
        let number = first_line + offset;
        if number < span.start.line {
            continue;
        }
        if number > span.end.line {
            break;
        }
        if number > span.start.line {
            out.push('\n');
        }
        let from = if number == span.start.line {
            span.start.column.saturating_sub(1)
        } else {
            0
        };
        let to = if number == span.end.line {
            span.end.column.saturating_sub(1)
        } else {
            usize::MAX
        };
        out.extend(line.chars().skip(from).take(to.saturating_sub(from)));
    }
    out
}

// ============================================================================
// Statement segmentation
// ============================================================================

/// Statement currently being accumulated by [`split_statements`]
struct OpenStatement {
    start: usize,
    leader: String,
    /// Main statement of a CTE once seen, otherwise the leader
    effective: String,
    source_seen: bool,
    set_seen: bool,
    cte_main_seen: bool,
}

impl OpenStatement {
    fn new(start: usize, leader: String) -> Self {
        Self {
            start,
            effective: leader.clone(),
            leader,
            source_seen: false,
            set_seen: false,
            cte_main_seen: false,
        }
    }

    /// Whether the starter keyword at `i` continues this statement
    fn absorbs(&mut self, tokens: &[Token], i: usize) -> bool {
        let word = tokens[i].lexeme.to_ascii_uppercase();
        let prev = i.checked_sub(1).and_then(|p| tokens.get(p));
        let prev_is = |w: &str| prev.is_some_and(|t| t.is_word(w));

        if word == "SELECT"
            && (prev_is("UNION") || prev_is("ALL") || prev_is("EXCEPT") || prev_is("INTERSECT"))
        {
            return true;
        }

        match self.leader.as_str() {
            "WITH"
                if !self.cte_main_seen
                    && matches!(
                        word.as_str(),
                        "SELECT" | "INSERT" | "UPDATE" | "DELETE" | "MERGE"
                    ) =>
            {
                self.cte_main_seen = true;
                self.effective = word;
                return true;
            }
            "GRANT" | "DENY" | "REVOKE"
                if matches!(
                    word.as_str(),
                    "SELECT" | "INSERT" | "UPDATE" | "DELETE" | "EXEC" | "EXECUTE" | "ALTER"
                        | "CREATE"
                ) =>
            {
                return true;
            }
            "DECLARE" if word == "SELECT" && prev_is("FOR") => return true,
            "RETURN" if word == "SELECT" && prev_is("RETURN") => return true,
            _ => {}
        }

        match self.effective.as_str() {
            "INSERT" if !self.source_seen && matches!(word.as_str(), "SELECT" | "EXEC" | "EXECUTE") => {
                self.source_seen = true;
                true
            }
            "UPDATE" if !self.set_seen && word == "SET" => {
                self.set_seen = true;
                true
            }
            "MERGE" => matches!(word.as_str(), "SET" | "INSERT" | "UPDATE" | "DELETE"),
            _ => false,
        }
    }
}

/// Split a batch's tokens into top-level statement ranges. Trailing
/// semicolons are not part of any range.
pub(crate) fn split_statements(tokens: &[Token]) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut current: Option<OpenStatement> = None;
    let mut depth = 0usize;
    let mut case_depth = 0usize;
    let mut i = 0;

    while i < tokens.len() {
        let token = &tokens[i];

        if depth == 0 && token.is_punct(";") {
            if let Some(open) = current.take() {
                ranges.push(open.start..i);
            }
            case_depth = 0;
            i += 1;
            continue;
        }

        let boundary = match current.as_mut() {
            None => true,
            Some(open) => {
                depth == 0
                    && case_depth == 0
                    && starts_statement(tokens, i)
                    && !open.absorbs(tokens, i)
            }
        };

        if boundary {
            if let Some(open) = current.take() {
                ranges.push(open.start..i);
            }
            depth = 0;
            case_depth = 0;

            if let Some(len) = control_length(tokens, i) {
                ranges.push(i..i + len);
                i += len;
                continue;
            }
            if takes_rest_of_batch(tokens, i) {
                let mut end = tokens.len();
                while end > i + 1 && tokens[end - 1].is_punct(";") {
                    end -= 1;
                }
                ranges.push(i..end);
                return ranges;
            }
            current = Some(OpenStatement::new(i, token.lexeme.to_ascii_uppercase()));
        }

        if token.is_punct("(") {
            depth += 1;
        } else if token.is_punct(")") {
            depth = depth.saturating_sub(1);
        } else if token.is_word("CASE") {
            case_depth += 1;
        } else if token.is_word("END") && case_depth > 0 {
            case_depth -= 1;
        }
        i += 1;
    }

    if let Some(open) = current {
        ranges.push(open.start..tokens.len());
    }
    ranges
}

fn is_starter_word(token: &Token) -> bool {
    STATEMENT_STARTERS.iter().any(|w| token.is_word(w))
}

fn starts_statement(tokens: &[Token], i: usize) -> bool {
    let token = &tokens[i];
    if !is_starter_word(token) {
        return false;
    }
    let next = tokens.get(i + 1);
    let prev = i.checked_sub(1).and_then(|p| tokens.get(p));

    match token.lexeme.to_ascii_uppercase().as_str() {
        "WITH" => {
            // CTE form: WITH name AS (...) or WITH name (cols) AS (...)
            next.is_some_and(|t| t.is_identifier())
                && tokens
                    .get(i + 2)
                    .is_some_and(|t| t.is_word("AS") || t.is_punct("("))
        }
        "SAVE" => next.is_some_and(|t| t.is_word("TRAN") || t.is_word("TRANSACTION")),
        // OFFSET ... ROWS FETCH NEXT ... is part of ORDER BY
        "FETCH" => !prev.is_some_and(|t| t.is_word("ROWS") || t.is_word("ROW")),
        "OPEN" | "CLOSE" | "DEALLOCATE" => {
            next.is_some_and(|t| t.is_identifier() || t.kind == TokenKind::Variable)
                && tokens
                    .get(i + 2)
                    .map_or(true, |t| t.is_punct(";") || is_starter_word(t))
        }
        _ => true,
    }
}

/// Length of a self-terminating control segment starting at `i`
fn control_length(tokens: &[Token], i: usize) -> Option<usize> {
    let token = &tokens[i];
    let at = |offset: usize, word: &str| tokens.get(i + offset).is_some_and(|t| t.is_word(word));
    // Optional transaction name after BEGIN TRAN / COMMIT / ROLLBACK
    let name_len = |offset: usize| {
        usize::from(tokens.get(i + offset).is_some_and(|t| {
            t.kind == TokenKind::Variable || (t.is_identifier() && !is_starter_word(t))
        }))
    };

    if token.is_word("BEGIN") {
        if at(1, "TRY") || at(1, "CATCH") {
            return Some(2);
        }
        if at(1, "TRAN") || at(1, "TRANSACTION") {
            return Some(2 + name_len(2));
        }
        if at(1, "DISTRIBUTED") {
            return Some(3 + name_len(3));
        }
        return Some(1);
    }
    if token.is_word("END") {
        if at(1, "TRY") || at(1, "CATCH") {
            return Some(2);
        }
        return Some(1);
    }
    if token.is_word("COMMIT") || token.is_word("ROLLBACK") {
        let mut len = 1;
        if at(1, "TRAN") || at(1, "TRANSACTION") || at(1, "WORK") {
            len += 1;
        }
        return Some(len + name_len(len));
    }
    if token.is_word("SAVE") && (at(1, "TRAN") || at(1, "TRANSACTION")) {
        return Some(2 + name_len(2));
    }
    if token.is_word("ELSE") || token.is_word("BREAK") || token.is_word("CONTINUE") {
        return Some(1);
    }
    None
}

/// CREATE [OR ALTER] / ALTER of a procedure, function, view or trigger owns
/// the rest of the batch
fn takes_rest_of_batch(tokens: &[Token], i: usize) -> bool {
    let mut j = i;
    if tokens[j].is_word("CREATE") {
        j += 1;
        if tokens.get(j).is_some_and(|t| t.is_word("OR"))
            && tokens.get(j + 1).is_some_and(|t| t.is_word("ALTER"))
        {
            j += 2;
        }
    } else if tokens[j].is_word("ALTER") {
        j += 1;
    } else {
        return false;
    }
    tokens.get(j).is_some_and(|t| {
        ["PROC", "PROCEDURE", "FUNCTION", "VIEW", "TRIGGER"]
            .iter()
            .any(|w| t.is_word(w))
    })
}

// ============================================================================
// Batch splitting
// ============================================================================

/// A batch of SQL with its starting line number in the original file
struct Batch<'a> {
    content: &'a str,
    /// 1-based line number where this batch starts
    start_line: usize,
}

/// Split SQL content into batches on lines holding only `GO` (or `GO;`)
fn split_batches(content: &str) -> Vec<Batch<'_>> {
    let mut batches = Vec::new();
    let mut current_pos = 0;
    let mut batch_start = 0;
    let mut current_line = 1;
    let mut batch_start_line = 1;

    for line in content.lines() {
        let trimmed = line.trim();
        let line_end = current_pos + line.len();
        let next_pos = if content[line_end..].starts_with("\r\n") {
            line_end + 2
        } else if content[line_end..].starts_with('\n') {
            line_end + 1
        } else {
            line_end
        };

        if trimmed.eq_ignore_ascii_case("go") || trimmed.eq_ignore_ascii_case("go;") {
            if current_pos > batch_start {
                batches.push(Batch {
                    content: &content[batch_start..current_pos],
                    start_line: batch_start_line,
                });
            }
            batch_start = next_pos;
            batch_start_line = current_line + 1;
        }

        current_pos = next_pos;
        current_line += 1;
    }

    if batch_start < content.len() {
        batches.push(Batch {
            content: &content[batch_start..],
            start_line: batch_start_line,
        });
    }

    batches
}
