//! Token-based routine definition parsing for T-SQL
//!
//! ## Supported Syntax
//!
//! ```sql
//! CREATE [OR ALTER] PROC[EDURE] [schema].[name] @p1 TYPE = default, @p2 TYPE OUTPUT
//!     [WITH RECOMPILE | EXECUTE AS ...] AS body
//! ALTER PROC[EDURE] [schema].[name] ... AS body
//! CREATE [OR ALTER] FUNCTION [schema].[name] (@p TYPE) RETURNS type | TABLE | @t TABLE (...)
//!     [WITH SCHEMABINDING] AS body
//! ```
//!
//! The body is split into statements and assembled into blocks, with
//! `BEGIN TRY ... END TRY BEGIN CATCH ... END CATCH` pairs kept together so
//! transaction checks can see which statements are protected. A body
//! statement that fails to parse is recorded in place and does not stop the
//! rest of the body from being analysed.

use super::ast::{
    BodyItem, Position, ProcedureDef, RoutineKind, SourceSpan, StatementNode, VariableDecl,
};
use super::lexer::{Token, TokenKind};
use super::statement_parser::StatementParser;
use super::tsql_parser::split_statements;
use crate::error::ParseError;

impl StatementParser {
    /// Parse a routine definition. Position must be at PROC, PROCEDURE or FUNCTION.
    pub(super) fn parse_routine(&mut self, kind: RoutineKind) -> Result<ProcedureDef, ParseError> {
        self.base.advance();

        let name_start = self.base.current_position();
        let name = self.base.parse_object_name()?;
        let name_span = self.base.span_from(name_start);

        // Numbered procedures: usp_Name;2
        if self.base.check_punct(";")
            && self
                .base
                .peek(1)
                .is_some_and(|t| matches!(t.kind, TokenKind::Literal(_)))
        {
            self.base.advance();
            self.base.advance();
        }

        let parameters = self.parse_routine_parameters()?;

        if kind == RoutineKind::Function {
            self.base.expect_word("RETURNS")?;
        }
        self.skip_to_body_as();
        self.base.expect_word("AS")?;

        let body_tokens = self.base.tokens()[self.base.pos()..].to_vec();
        self.skip_rest();

        Ok(ProcedureDef {
            kind,
            name,
            parameters,
            body: build_body(&body_tokens),
            name_span,
        })
    }

    /// Parameter list, parenthesized (functions) or bare (procedures)
    fn parse_routine_parameters(&mut self) -> Result<Vec<VariableDecl>, ParseError> {
        let parenthesized = self.base.consume_punct("(");
        let mut parameters = Vec::new();

        while self.base.check_kind(TokenKind::Variable) {
            let mut param = self.parse_variable_decl()?;
            loop {
                if self.base.consume_word("OUTPUT") || self.base.consume_word("OUT") {
                    param.output = true;
                } else if !self.base.consume_word("READONLY") {
                    break;
                }
            }
            parameters.push(param);
            if !self.base.consume_punct(",") {
                break;
            }
        }

        if parenthesized {
            self.base.expect_punct(")")?;
        }
        Ok(parameters)
    }

    /// Skip RETURNS clauses and WITH options up to the top-level `AS` that
    /// opens the body. `EXECUTE AS <principal>` is not that `AS`.
    fn skip_to_body_as(&mut self) {
        let mut depth = 0usize;
        while let Some(t) = self.base.current_token() {
            if t.is_punct("(") {
                depth += 1;
            } else if t.is_punct(")") {
                depth = depth.saturating_sub(1);
            } else if depth == 0 {
                if (t.is_word("EXECUTE") || t.is_word("EXEC")) && self.base.check_word_at(1, "AS")
                {
                    self.base.advance();
                    self.base.advance();
                    self.base.advance();
                    continue;
                }
                if t.is_word("AS") {
                    return;
                }
            }
            self.base.advance();
        }
    }
}

/// Open block while assembling a body
enum Frame {
    Block {
        items: Vec<BodyItem>,
    },
    Try {
        items: Vec<BodyItem>,
        start: Position,
    },
    Catch {
        try_block: Vec<BodyItem>,
        items: Vec<BodyItem>,
        start: Position,
    },
}

impl Frame {
    fn items_mut(&mut self) -> &mut Vec<BodyItem> {
        match self {
            Frame::Block { items } | Frame::Try { items, .. } | Frame::Catch { items, .. } => items,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment {
    BeginTry,
    EndTry,
    BeginCatch,
    EndCatch,
    BeginBlock,
    EndBlock,
    Statement,
}

fn classify(tokens: &[Token]) -> Segment {
    let first = tokens.first();
    let second = tokens.get(1);
    let is = |t: Option<&Token>, w: &str| t.is_some_and(|t| t.is_word(w));

    if is(first, "BEGIN") {
        if is(second, "TRY") {
            return Segment::BeginTry;
        }
        if is(second, "CATCH") {
            return Segment::BeginCatch;
        }
        if second.is_none() {
            return Segment::BeginBlock;
        }
    }
    if is(first, "END") {
        if is(second, "TRY") {
            return Segment::EndTry;
        }
        if is(second, "CATCH") {
            return Segment::EndCatch;
        }
        if second.is_none() {
            return Segment::EndBlock;
        }
    }
    Segment::Statement
}

struct BodyBuilder {
    root: Vec<BodyItem>,
    stack: Vec<Frame>,
    /// Finished TRY block waiting for its CATCH
    pending_try: Option<(Vec<BodyItem>, Position)>,
}

impl BodyBuilder {
    fn new() -> Self {
        Self {
            root: Vec::new(),
            stack: Vec::new(),
            pending_try: None,
        }
    }

    fn push(&mut self, item: BodyItem) {
        match self.stack.last_mut() {
            Some(frame) => frame.items_mut().push(item),
            None => self.root.push(item),
        }
    }

    /// A TRY block without a CATCH still counts as a block
    fn flush_pending_try(&mut self, end: Position) {
        if let Some((try_block, start)) = self.pending_try.take() {
            self.push(BodyItem::TryCatch {
                try_block,
                catch_block: Vec::new(),
                span: SourceSpan::new(start, end),
            });
        }
    }

    fn segment(&mut self, tokens: &[Token]) {
        let (Some(first), Some(last)) = (tokens.first(), tokens.last()) else {
            return;
        };
        let start = first.position;
        let end = last.end;
        let kind = classify(tokens);

        if kind != Segment::BeginCatch {
            self.flush_pending_try(start);
        }

        match kind {
            Segment::BeginTry => self.stack.push(Frame::Try {
                items: Vec::new(),
                start,
            }),
            Segment::BeginBlock => self.stack.push(Frame::Block { items: Vec::new() }),
            Segment::BeginCatch => {
                let (try_block, try_start) = self.pending_try.take().unwrap_or((Vec::new(), start));
                self.stack.push(Frame::Catch {
                    try_block,
                    items: Vec::new(),
                    start: try_start,
                });
            }
            Segment::EndTry => match self.stack.pop() {
                Some(Frame::Try { items, start }) => self.pending_try = Some((items, start)),
                Some(other) => self.close(other, end),
                None => {}
            },
            Segment::EndCatch | Segment::EndBlock => {
                if let Some(frame) = self.stack.pop() {
                    self.close(frame, end);
                }
            }
            Segment::Statement => {
                let item = match StatementParser::new(tokens.to_vec()).parse_complete() {
                    Ok(statement) => BodyItem::Statement(StatementNode {
                        statement,
                        span: SourceSpan::new(start, end),
                    }),
                    Err(err) => BodyItem::Invalid(err),
                };
                self.push(item);
            }
        }
    }

    fn close(&mut self, frame: Frame, end: Position) {
        let item = match frame {
            Frame::Block { items } => BodyItem::Block(items),
            Frame::Try { items, start } => BodyItem::TryCatch {
                try_block: items,
                catch_block: Vec::new(),
                span: SourceSpan::new(start, end),
            },
            Frame::Catch {
                try_block,
                items,
                start,
            } => BodyItem::TryCatch {
                try_block,
                catch_block: items,
                span: SourceSpan::new(start, end),
            },
        };
        self.push(item);
    }

    fn finish(mut self, end: Position) -> Vec<BodyItem> {
        self.flush_pending_try(end);
        while let Some(frame) = self.stack.pop() {
            self.close(frame, end);
        }
        self.root
    }
}

/// Assemble routine body tokens into structured body items
pub(super) fn build_body(tokens: &[Token]) -> Vec<BodyItem> {
    let mut builder = BodyBuilder::new();
    for range in split_statements(tokens) {
        builder.segment(&tokens[range]);
    }
    let end = tokens.last().map(|t| t.end).unwrap_or_default();
    builder.finish(end)
}
