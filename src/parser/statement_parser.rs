//! Statement parser for the DML subset: SELECT, INSERT, UPDATE, DELETE, EXEC,
//! DECLARE, SET and transaction control.
//!
//! Routines and DDL are parsed by `impl StatementParser` blocks in
//! `procedure_parser.rs` and `ddl_parser.rs`; expressions live in
//! `expression_parser.rs`.

use super::ast::{
    Assignment, Delete, Exec, ExecTarget, Insert, InsertSource, Join, JoinKind, ObjectName,
    OrderByExpr, Select, SelectItem, SetOperation, SetOperator, Statement, TableFactor,
    TableWithJoins, TransactionControl, Update, VariableDecl,
};
use super::lexer::{Token, TokenKind};
use super::token_parser_base::TokenParser;
use crate::error::ParseError;

/// Statement keywords that are recognised but carry nothing to analyse
const PASSTHROUGH_KEYWORDS: &[&str] = &[
    "IF", "ELSE", "WHILE", "PRINT", "RETURN", "TRUNCATE", "THROW", "RAISERROR", "USE", "DROP",
    "BREAK", "CONTINUE", "GOTO", "WAITFOR", "OPEN", "CLOSE", "DEALLOCATE", "FETCH", "GRANT",
    "DENY", "REVOKE", "BEGIN", "END",
];

/// Legacy hints that may follow a table without `WITH`
const LEGACY_HINTS: &[&str] = &[
    "NOLOCK",
    "READUNCOMMITTED",
    "HOLDLOCK",
    "UPDLOCK",
    "ROWLOCK",
    "TABLOCK",
    "TABLOCKX",
    "PAGLOCK",
    "READPAST",
    "XLOCK",
];

/// Deepest expression or subquery nesting accepted before giving up
const MAX_NESTING_DEPTH: usize = 48;

/// Parser for one statement's tokens
pub struct StatementParser {
    pub(super) base: TokenParser,
    /// Current expression/subquery nesting
    depth: usize,
}

impl StatementParser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            base: TokenParser::new(tokens),
            depth: 0,
        }
    }

    /// Run `parse` one nesting level deeper, failing past [`MAX_NESTING_DEPTH`]
    pub(super) fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(self.base.error("expression nested too deeply"));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    /// Parse a single statement and require that every token is consumed
    pub fn parse_complete(&mut self) -> Result<Statement, ParseError> {
        let statement = self.parse_statement()?;
        while self.base.consume_punct(";") {}
        if !self.base.is_at_end() {
            return Err(self.base.error("unexpected token after statement"));
        }
        Ok(statement)
    }

    pub(super) fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        let leader = match self.base.current_token() {
            Some(t) if matches!(t.kind, TokenKind::Keyword | TokenKind::Identifier) => {
                t.lexeme.to_ascii_uppercase()
            }
            _ => return Err(self.base.error("expected statement")),
        };

        match leader.as_str() {
            "SELECT" => Ok(Statement::Select(Box::new(self.parse_select()?))),
            "INSERT" => Ok(Statement::Insert(Box::new(self.parse_insert()?))),
            "UPDATE" => Ok(Statement::Update(Box::new(self.parse_update()?))),
            "DELETE" => Ok(Statement::Delete(Box::new(self.parse_delete()?))),
            "EXEC" | "EXECUTE" => Ok(Statement::Exec(self.parse_exec()?)),
            "DECLARE" => self.parse_declare(),
            "SET" => self.parse_set(),
            "CREATE" | "ALTER" => self.parse_create_or_alter(),
            "BEGIN" if self.is_transaction_word(1) || self.base.check_word_at(1, "DISTRIBUTED") => {
                Ok(self.parse_transaction(TransactionControl::Begin))
            }
            "COMMIT" => Ok(self.parse_transaction(TransactionControl::Commit)),
            "ROLLBACK" => Ok(self.parse_transaction(TransactionControl::Rollback)),
            "SAVE" if self.is_transaction_word(1) => {
                Ok(self.parse_transaction(TransactionControl::Save))
            }
            "WITH" => Ok(self.unsupported("CTE")),
            "MERGE" => Ok(self.unsupported("MERGE")),
            "RETURN" => self.parse_return(),
            keyword if PASSTHROUGH_KEYWORDS.contains(&keyword) => {
                self.skip_rest();
                Ok(Statement::Other { keyword: leader })
            }
            _ => Err(self.base.error("unrecognized statement")),
        }
    }

    fn is_transaction_word(&self, offset: usize) -> bool {
        self.base.check_word_at(offset, "TRAN") || self.base.check_word_at(offset, "TRANSACTION")
    }

    pub(super) fn skip_rest(&mut self) {
        let len = self.base.tokens().len();
        self.base.set_pos(len);
    }

    pub(super) fn unsupported(&mut self, construct: &str) -> Statement {
        self.skip_rest();
        Statement::Unsupported {
            construct: construct.to_string(),
        }
    }

    fn parse_transaction(&mut self, control: TransactionControl) -> Statement {
        self.skip_rest();
        Statement::Transaction(control)
    }

    /// `RETURN (SELECT ...)` in inline functions is analysed as the query
    fn parse_return(&mut self) -> Result<Statement, ParseError> {
        self.base.expect_word("RETURN")?;
        if self.base.check_word("SELECT") {
            return Ok(Statement::Select(Box::new(self.parse_select()?)));
        }
        if self.base.check_punct("(") && self.base.check_word_at(1, "SELECT") {
            self.base.advance();
            let select = self.parse_select()?;
            self.base.expect_punct(")")?;
            return Ok(Statement::Select(Box::new(select)));
        }
        self.skip_rest();
        Ok(Statement::Other {
            keyword: "RETURN".to_string(),
        })
    }

    // ========================================================================
    // SELECT
    // ========================================================================

    pub(super) fn parse_select(&mut self) -> Result<Select, ParseError> {
        self.nested(Self::parse_select_body)
    }

    fn parse_select_body(&mut self) -> Result<Select, ParseError> {
        let start = self.base.current_position();
        self.base.expect_word("SELECT")?;

        let distinct = self.base.consume_word("DISTINCT");
        if !distinct {
            self.base.consume_word("ALL");
        }
        let top = self.parse_top()?;
        let projection = self.parse_select_items()?;

        let into = if self.base.consume_word("INTO") {
            Some(self.base.parse_object_name()?)
        } else {
            None
        };

        let from = if self.base.consume_word("FROM") {
            self.parse_from_list()?
        } else {
            Vec::new()
        };

        let selection = if self.base.consume_word("WHERE") {
            Some(self.parse_expr()?)
        } else {
            None
        };

        let mut group_by = Vec::new();
        if self.base.check_word("GROUP") && self.base.check_word_at(1, "BY") {
            self.base.advance();
            self.base.advance();
            group_by = self.parse_expr_list()?;
            if self.base.check_word("WITH")
                && (self.base.check_word_at(1, "ROLLUP") || self.base.check_word_at(1, "CUBE"))
            {
                self.base.advance();
                self.base.advance();
            }
        }

        let having = if self.base.consume_word("HAVING") {
            Some(self.parse_expr()?)
        } else {
            None
        };

        let mut order_by = Vec::new();
        if self.base.check_word("ORDER") && self.base.check_word_at(1, "BY") {
            self.base.advance();
            self.base.advance();
            order_by = self.parse_order_by_list()?;
            self.skip_offset_fetch()?;
        }

        // FOR XML / FOR JSON shaping has no bearing on data access
        if self.base.check_word("FOR") {
            self.skip_until_query_end();
        }

        let set_operation = self.parse_set_operation()?;

        if self.base.check_word("OPTION") && self.base.peek(1).is_some_and(|t| t.is_punct("(")) {
            self.base.advance();
            self.base.skip_parenthesized();
        }

        Ok(Select {
            distinct,
            top,
            projection,
            into,
            from,
            selection,
            group_by,
            having,
            order_by,
            set_operation,
            span: self.base.span_from(start),
        })
    }

    fn parse_set_operation(&mut self) -> Result<Option<Box<SetOperation>>, ParseError> {
        let operator = if self.base.check_word("UNION") {
            SetOperator::Union
        } else if self.base.check_word("EXCEPT") {
            SetOperator::Except
        } else if self.base.check_word("INTERSECT") {
            SetOperator::Intersect
        } else {
            return Ok(None);
        };
        self.base.advance();
        let all = self.base.consume_word("ALL");

        let right = if self.base.consume_punct("(") {
            let select = self.parse_select()?;
            self.base.expect_punct(")")?;
            select
        } else {
            self.parse_select()?
        };

        Ok(Some(Box::new(SetOperation {
            operator,
            all,
            right,
        })))
    }

    /// `TOP n`, `TOP (expr)` with optional PERCENT / WITH TIES
    fn parse_top(&mut self) -> Result<Option<super::ast::Expr>, ParseError> {
        if !self.base.consume_word("TOP") {
            return Ok(None);
        }
        let expr = if self.base.consume_punct("(") {
            let e = self.parse_expr()?;
            self.base.expect_punct(")")?;
            e
        } else {
            self.parse_primary_for_top()?
        };
        self.base.consume_word("PERCENT");
        if self.base.check_word("WITH") && self.base.check_word_at(1, "TIES") {
            self.base.advance();
            self.base.advance();
        }
        Ok(Some(expr))
    }

    fn parse_primary_for_top(&mut self) -> Result<super::ast::Expr, ParseError> {
        use super::ast::{Expr, Literal, LiteralValueKind};
        match self.base.next_token() {
            Some(t) if t.kind == TokenKind::Literal(super::lexer::LiteralKind::Number) => {
                Ok(Expr::Literal(Literal {
                    kind: LiteralValueKind::Number,
                    value: t.lexeme,
                }))
            }
            Some(t) if t.kind == TokenKind::Variable => Ok(Expr::Variable(t.lexeme)),
            _ => Err(self.base.error("expected TOP count")),
        }
    }

    fn parse_select_items(&mut self) -> Result<Vec<SelectItem>, ParseError> {
        let mut items = Vec::new();
        loop {
            items.push(self.parse_select_item()?);
            if !self.base.consume_punct(",") {
                break;
            }
        }
        Ok(items)
    }

    fn parse_select_item(&mut self) -> Result<SelectItem, ParseError> {
        let start = self.base.current_position();

        if self.base.check_operator("*") {
            self.base.advance();
            return Ok(SelectItem::Wildcard {
                qualifier: None,
                span: self.base.span_from(start),
            });
        }

        // alias.* and schema.table.*
        if let Some(qualifier) = self.wildcard_qualifier() {
            return Ok(SelectItem::Wildcard {
                qualifier: Some(qualifier),
                span: self.base.span_from(start),
            });
        }

        // `Alias = expr` and `@var = expr`
        let assigns = self
            .base
            .current_token()
            .is_some_and(|t| t.is_identifier() || t.kind == TokenKind::Variable)
            && self.base.peek(1).is_some_and(|t| t.is_operator("="));
        if assigns {
            let alias = self.base.next_token().map(|t| t.lexeme);
            self.base.advance();
            let expr = self.parse_expr()?;
            return Ok(SelectItem::Expr { expr, alias });
        }

        let expr = self.parse_expr()?;
        let alias = self.parse_column_alias()?;
        Ok(SelectItem::Expr { expr, alias })
    }

    /// Consume `name(.name)*.*` and return the last name before `*`
    fn wildcard_qualifier(&mut self) -> Option<String> {
        let (qualifier, resume) = {
            let tokens = self.base.tokens();
            let mut i = self.base.pos();
            loop {
                let t = tokens.get(i)?;
                if !t.is_identifier() || !tokens.get(i + 1).is_some_and(|t| t.is_punct(".")) {
                    return None;
                }
                if tokens.get(i + 2).is_some_and(|t| t.is_operator("*")) {
                    break (t.lexeme.clone(), i + 3);
                }
                i += 2;
            }
        };
        self.base.set_pos(resume);
        Some(qualifier)
    }

    /// `AS alias`, bare `alias`, or `AS 'alias'`
    fn parse_column_alias(&mut self) -> Result<Option<String>, ParseError> {
        if self.base.consume_word("AS") {
            return match self.base.current_token() {
                Some(t) if matches!(t.kind, TokenKind::Literal(_)) || t.is_name() => {
                    Ok(self.base.next_token().map(|t| t.lexeme))
                }
                _ => Err(self.base.error("expected alias")),
            };
        }
        if self
            .base
            .current_token()
            .is_some_and(|t| t.is_identifier() || t.kind == TokenKind::Literal(super::lexer::LiteralKind::String))
        {
            return Ok(self.base.next_token().map(|t| t.lexeme));
        }
        Ok(None)
    }

    fn parse_order_by_list(&mut self) -> Result<Vec<OrderByExpr>, ParseError> {
        let mut items = Vec::new();
        loop {
            let expr = self.parse_expr()?;
            let descending = if self.base.consume_word("DESC") {
                true
            } else {
                self.base.consume_word("ASC");
                false
            };
            items.push(OrderByExpr { expr, descending });
            if !self.base.consume_punct(",") {
                break;
            }
        }
        Ok(items)
    }

    /// `OFFSET n ROWS [FETCH NEXT m ROWS ONLY]`
    fn skip_offset_fetch(&mut self) -> Result<(), ParseError> {
        if !self.base.consume_word("OFFSET") {
            return Ok(());
        }
        self.parse_expr()?;
        if !self.base.consume_word("ROWS") {
            self.base.consume_word("ROW");
        }
        if self.base.consume_word("FETCH") {
            if !self.base.consume_word("NEXT") {
                self.base.consume_word("FIRST");
            }
            self.parse_expr()?;
            if !self.base.consume_word("ROWS") {
                self.base.consume_word("ROW");
            }
            self.base.expect_word("ONLY")?;
        }
        Ok(())
    }

    /// Skip to the closing paren of the enclosing subquery, a set operator,
    /// OPTION, or the end of the statement
    fn skip_until_query_end(&mut self) {
        let mut depth = 0usize;
        while let Some(t) = self.base.current_token() {
            if t.is_punct("(") {
                depth += 1;
            } else if t.is_punct(")") {
                if depth == 0 {
                    return;
                }
                depth -= 1;
            } else if depth == 0
                && ["UNION", "EXCEPT", "INTERSECT", "OPTION"]
                    .iter()
                    .any(|w| t.is_word(w))
            {
                return;
            } else if depth == 0 && t.is_punct(";") {
                return;
            }
            self.base.advance();
        }
    }

    // ========================================================================
    // FROM
    // ========================================================================

    pub(super) fn parse_from_list(&mut self) -> Result<Vec<TableWithJoins>, ParseError> {
        let mut list = vec![self.parse_table_with_joins()?];
        while self.base.consume_punct(",") {
            list.push(self.parse_table_with_joins()?);
        }
        Ok(list)
    }

    fn parse_table_with_joins(&mut self) -> Result<TableWithJoins, ParseError> {
        let relation = self.parse_table_factor()?;
        let mut joins = Vec::new();

        while let Some(kind) = self.parse_join_kind()? {
            let relation = self.parse_table_factor()?;
            let on = match kind {
                JoinKind::Cross | JoinKind::CrossApply | JoinKind::OuterApply => None,
                _ => {
                    self.base.expect_word("ON")?;
                    Some(self.parse_expr()?)
                }
            };
            joins.push(Join { kind, relation, on });
        }

        Ok(TableWithJoins { relation, joins })
    }

    /// Consume a join operator if one is next
    fn parse_join_kind(&mut self) -> Result<Option<JoinKind>, ParseError> {
        let kind = if self.base.check_word("JOIN") {
            JoinKind::Inner
        } else if self.base.check_word("INNER") {
            self.base.advance();
            JoinKind::Inner
        } else if self.base.check_word("LEFT") {
            self.base.advance();
            self.base.consume_word("OUTER");
            JoinKind::LeftOuter
        } else if self.base.check_word("RIGHT") {
            self.base.advance();
            self.base.consume_word("OUTER");
            JoinKind::RightOuter
        } else if self.base.check_word("FULL") {
            self.base.advance();
            self.base.consume_word("OUTER");
            JoinKind::FullOuter
        } else if self.base.check_word("CROSS") {
            self.base.advance();
            if self.base.consume_word("APPLY") {
                return Ok(Some(JoinKind::CrossApply));
            }
            JoinKind::Cross
        } else if self.base.check_word("OUTER") && self.base.check_word_at(1, "APPLY") {
            self.base.advance();
            self.base.advance();
            return Ok(Some(JoinKind::OuterApply));
        } else {
            return Ok(None);
        };

        // Join hints: INNER HASH JOIN, LEFT LOOP JOIN, ...
        if self.base.check_any_word(&["HASH", "LOOP", "MERGE", "REMOTE"]) {
            self.base.advance();
        }
        self.base.expect_word("JOIN")?;
        Ok(Some(kind))
    }

    fn parse_table_factor(&mut self) -> Result<TableFactor, ParseError> {
        if self.base.check_punct("(") {
            if !self.base.check_word_at(1, "SELECT") {
                return Err(self.base.error("parenthesized joins are not supported"));
            }
            self.base.advance();
            let subquery = self.parse_select()?;
            self.base.expect_punct(")")?;
            let alias = self.parse_table_alias()?;
            if self.base.check_punct("(") {
                // derived column list: AS d(a, b)
                self.base.skip_parenthesized();
            }
            return Ok(TableFactor::Derived {
                subquery: Box::new(subquery),
                alias,
            });
        }

        let start = self.base.current_position();
        let name = self.base.parse_object_name()?;

        if self.base.check_punct("(") && !self.is_legacy_hint_group() {
            let call = self.parse_table_function(name, start)?;
            let alias = self.parse_table_alias()?;
            return Ok(TableFactor::Function { call, alias });
        }

        let span = self.base.span_from(start);
        let mut hints = self.parse_legacy_hints();
        let alias = self.parse_table_alias()?;
        hints.extend(self.parse_table_hints()?);
        if hints.is_empty() {
            hints = self.parse_legacy_hints();
        }

        Ok(TableFactor::Table {
            name,
            alias,
            hints,
            span,
        })
    }

    fn parse_table_function(
        &mut self,
        name: ObjectName,
        start: super::ast::Position,
    ) -> Result<super::ast::FunctionCall, ParseError> {
        self.base.expect_punct("(")?;
        let args = if self.base.check_punct(")") {
            Vec::new()
        } else {
            self.parse_expr_list()?
        };
        self.base.expect_punct(")")?;
        Ok(super::ast::FunctionCall {
            name,
            args,
            distinct: false,
            windowed: false,
            span: self.base.span_from(start),
        })
    }

    fn parse_table_alias(&mut self) -> Result<Option<String>, ParseError> {
        if self.base.consume_word("AS") {
            return Ok(Some(self.base.parse_identifier()?));
        }
        if self.base.current_token().is_some_and(|t| t.is_identifier()) {
            return Ok(Some(self.base.parse_identifier()?));
        }
        Ok(None)
    }

    /// `WITH (NOLOCK, INDEX(IX_x))`
    pub(super) fn parse_table_hints(&mut self) -> Result<Vec<String>, ParseError> {
        if !(self.base.check_word("WITH") && self.base.peek(1).is_some_and(|t| t.is_punct("(")))
        {
            return Ok(Vec::new());
        }
        self.base.advance();
        self.base.expect_punct("(")?;
        let mut hints = Vec::new();
        while let Some(t) = self.base.current_token() {
            if t.is_punct(")") {
                break;
            }
            if t.is_punct(",") {
                self.base.advance();
                continue;
            }
            if t.is_punct("(") {
                self.base.skip_parenthesized();
                continue;
            }
            if t.is_operator("=") {
                // INDEX = IX_x
                self.base.advance();
                self.base.advance();
                continue;
            }
            hints.push(t.lexeme.to_ascii_uppercase());
            self.base.advance();
        }
        self.base.expect_punct(")")?;
        Ok(hints)
    }

    fn is_legacy_hint_group(&self) -> bool {
        self.base.check_punct("(")
            && self
                .base
                .peek(1)
                .is_some_and(|t| LEGACY_HINTS.iter().any(|h| t.is_word(h)))
    }

    /// `(NOLOCK)` without `WITH`
    fn parse_legacy_hints(&mut self) -> Vec<String> {
        if !self.is_legacy_hint_group() {
            return Vec::new();
        }
        self.base.advance();
        let mut hints = Vec::new();
        while let Some(t) = self.base.current_token() {
            if t.is_punct(")") {
                self.base.advance();
                break;
            }
            if !t.is_punct(",") {
                hints.push(t.lexeme.to_ascii_uppercase());
            }
            self.base.advance();
        }
        hints
    }

    // ========================================================================
    // INSERT / UPDATE / DELETE
    // ========================================================================

    fn skip_top_clause(&mut self) -> Result<(), ParseError> {
        self.parse_top().map(|_| ())
    }

    fn parse_insert(&mut self) -> Result<Insert, ParseError> {
        let start = self.base.current_position();
        self.base.expect_word("INSERT")?;
        self.skip_top_clause()?;
        self.base.consume_word("INTO");
        let table = self.base.parse_object_name()?;
        self.parse_table_hints()?;

        let columns = if self.base.check_punct("(") {
            self.base.parse_column_list()?
        } else {
            Vec::new()
        };

        if self.base.check_word("OUTPUT") {
            self.base
                .skip_to_any_word(&["VALUES", "SELECT", "EXEC", "EXECUTE", "DEFAULT"]);
        }

        let source = if self.base.consume_word("VALUES") {
            let mut rows = Vec::new();
            loop {
                self.base.expect_punct("(")?;
                rows.push(self.parse_expr_list()?);
                self.base.expect_punct(")")?;
                if !self.base.consume_punct(",") {
                    break;
                }
            }
            InsertSource::Values(rows)
        } else if self.base.check_word("SELECT") {
            InsertSource::Query(Box::new(self.parse_select()?))
        } else if self.base.check_word("EXEC") || self.base.check_word("EXECUTE") {
            InsertSource::Exec(self.parse_exec()?)
        } else if self.base.consume_word("DEFAULT") {
            self.base.expect_word("VALUES")?;
            InsertSource::DefaultValues
        } else {
            return Err(self.base.error("expected VALUES, SELECT or EXEC"));
        };

        Ok(Insert {
            table,
            columns,
            source,
            span: self.base.span_from(start),
        })
    }

    fn parse_update(&mut self) -> Result<Update, ParseError> {
        let start = self.base.current_position();
        self.base.expect_word("UPDATE")?;
        self.skip_top_clause()?;
        let target = self.base.parse_object_name()?;
        let mut target_hints = self.parse_table_hints()?;
        target_hints.extend(self.parse_legacy_hints());

        self.base.expect_word("SET")?;
        let mut assignments = Vec::new();
        loop {
            assignments.push(self.parse_assignment()?);
            if !self.base.consume_punct(",") {
                break;
            }
        }

        if self.base.check_word("OUTPUT") {
            self.base.skip_to_any_word(&["FROM", "WHERE", "OPTION"]);
        }

        let from = if self.base.consume_word("FROM") {
            self.parse_from_list()?
        } else {
            Vec::new()
        };
        let selection = self.parse_where()?;
        self.skip_query_option();

        Ok(Update {
            target,
            target_hints,
            assignments,
            from,
            selection,
            span: self.base.span_from(start),
        })
    }

    fn parse_assignment(&mut self) -> Result<Assignment, ParseError> {
        let target = match self.base.current_token() {
            Some(t) if t.kind == TokenKind::Variable => {
                let name = t.lexeme.clone();
                self.base.advance();
                name
            }
            _ => {
                // alias.Column keeps only the column
                let name = self.base.parse_object_name()?;
                name.name
            }
        };

        self.expect_assignment_operator()?;

        // SET @x = Col = expr
        if self.base.current_token().is_some_and(|t| t.is_identifier())
            && self.base.peek(1).is_some_and(|t| t.is_operator("="))
        {
            self.base.advance();
            self.base.advance();
        }

        let value = self.parse_expr()?;
        Ok(Assignment { target, value })
    }

    /// `=` or a compound operator such as `+=`
    pub(super) fn expect_assignment_operator(&mut self) -> Result<(), ParseError> {
        if self.base.consume_operator("=") {
            return Ok(());
        }
        let compound = self.base.current_token().is_some_and(|t| {
            t.kind == TokenKind::Operator && t.lexeme.len() == 2 && t.lexeme.ends_with('=')
        });
        if compound {
            self.base.advance();
            return Ok(());
        }
        let split_compound = self.base.current_token().is_some_and(|t| {
            t.kind == TokenKind::Operator && ["+", "-", "*", "/", "%", "&", "|", "^"].contains(&t.lexeme.as_str())
        }) && self.base.peek(1).is_some_and(|t| t.is_operator("="));
        if split_compound {
            self.base.advance();
            self.base.advance();
            return Ok(());
        }
        Err(self.base.error("expected '='"))
    }

    fn parse_delete(&mut self) -> Result<Delete, ParseError> {
        let start = self.base.current_position();
        self.base.expect_word("DELETE")?;
        self.skip_top_clause()?;
        self.base.consume_word("FROM");
        let target = self.base.parse_object_name()?;
        self.parse_table_hints()?;
        self.parse_legacy_hints();

        if self.base.check_word("OUTPUT") {
            self.base.skip_to_any_word(&["FROM", "WHERE", "OPTION"]);
        }

        let from = if self.base.consume_word("FROM") {
            self.parse_from_list()?
        } else {
            Vec::new()
        };
        let selection = self.parse_where()?;
        self.skip_query_option();

        Ok(Delete {
            target,
            from,
            selection,
            span: self.base.span_from(start),
        })
    }

    fn parse_where(&mut self) -> Result<Option<super::ast::Expr>, ParseError> {
        if self.base.consume_word("WHERE") {
            Ok(Some(self.parse_expr()?))
        } else {
            Ok(None)
        }
    }

    fn skip_query_option(&mut self) {
        if self.base.check_word("OPTION") && self.base.peek(1).is_some_and(|t| t.is_punct("(")) {
            self.base.advance();
            self.base.skip_parenthesized();
        }
    }

    // ========================================================================
    // EXEC / DECLARE / SET
    // ========================================================================

    pub(super) fn parse_exec(&mut self) -> Result<Exec, ParseError> {
        let start = self.base.current_position();
        if !self.base.consume_word("EXEC") {
            self.base.expect_word("EXECUTE")?;
        }

        if self.base.consume_punct("(") {
            let expr = self.parse_expr()?;
            self.base.expect_punct(")")?;
            // EXEC ('...') AT linked_server
            if self.base.consume_word("AT") {
                self.base.parse_identifier()?;
            }
            return Ok(Exec {
                target: ExecTarget::Dynamic(expr),
                span: self.base.span_from(start),
            });
        }

        // EXEC @rc = dbo.usp_Name
        if self.base.check_kind(TokenKind::Variable)
            && self.base.peek(1).is_some_and(|t| t.is_operator("="))
        {
            self.base.advance();
            self.base.advance();
        }

        let name = self.base.parse_object_name()?;
        let mut arguments = Vec::new();
        while !self.base.is_at_end() && !self.base.check_punct(";") && !self.base.check_word("WITH")
        {
            // named argument: @p = value
            if self.base.check_kind(TokenKind::Variable)
                && self.base.peek(1).is_some_and(|t| t.is_operator("="))
            {
                self.base.advance();
                self.base.advance();
            }
            if self.base.consume_word("DEFAULT") {
                arguments.push(super::ast::Expr::Literal(super::ast::Literal {
                    kind: super::ast::LiteralValueKind::Null,
                    value: "DEFAULT".to_string(),
                }));
            } else {
                arguments.push(self.parse_expr()?);
            }
            if !self.base.consume_word("OUTPUT") {
                self.base.consume_word("OUT");
            }
            if !self.base.consume_punct(",") {
                break;
            }
        }
        if self.base.check_word("WITH") {
            self.skip_rest();
        }

        Ok(Exec {
            target: ExecTarget::Procedure { name, arguments },
            span: self.base.span_from(start),
        })
    }

    fn parse_declare(&mut self) -> Result<Statement, ParseError> {
        self.base.expect_word("DECLARE")?;

        // DECLARE name CURSOR FOR SELECT ...
        if self.base.check_kind(TokenKind::Identifier) {
            self.skip_rest();
            return Ok(Statement::Other {
                keyword: "DECLARE CURSOR".to_string(),
            });
        }

        let mut decls = Vec::new();
        loop {
            decls.push(self.parse_variable_decl()?);
            if !self.base.consume_punct(",") {
                break;
            }
        }
        Ok(Statement::Declare(decls))
    }

    /// `@name [AS] type [= default]`; table variables keep `TABLE` as their type
    pub(super) fn parse_variable_decl(&mut self) -> Result<VariableDecl, ParseError> {
        let name = match self.base.current_token() {
            Some(t) if t.kind == TokenKind::Variable => t.lexeme.clone(),
            _ => return Err(self.base.error("expected variable name")),
        };
        self.base.advance();
        self.base.consume_word("AS");

        let data_type = if self.base.consume_word("TABLE") {
            self.base.skip_parenthesized();
            "TABLE".to_string()
        } else if self.base.consume_word("CURSOR") {
            self.skip_rest();
            "CURSOR".to_string()
        } else {
            self.base.parse_data_type()?
        };

        let default = if self.base.consume_operator("=") {
            Some(self.parse_expr()?)
        } else {
            None
        };

        Ok(VariableDecl {
            name,
            data_type,
            default,
            output: false,
        })
    }

    fn parse_set(&mut self) -> Result<Statement, ParseError> {
        self.base.expect_word("SET")?;

        if let Some(t) = self.base.current_token() {
            if t.kind == TokenKind::Variable {
                let variable = t.lexeme.clone();
                self.base.advance();
                self.expect_assignment_operator()?;
                let value = self.parse_expr()?;
                return Ok(Statement::SetVariable { variable, value });
            }
        }

        if self.base.consume_word("TRANSACTION") {
            self.base.expect_word("ISOLATION")?;
            self.base.expect_word("LEVEL")?;
            let value = self.collect_words();
            return Ok(Statement::SetOption {
                option: "TRANSACTION ISOLATION LEVEL".to_string(),
                value,
            });
        }

        let mut words: Vec<String> = Vec::new();
        while let Some(t) = self.base.current_token() {
            if t.is_punct(";") {
                break;
            }
            if !t.is_punct(",") {
                words.push(t.lexeme.to_ascii_uppercase());
            }
            self.base.advance();
        }
        let value = words.pop().unwrap_or_default();
        if words.is_empty() {
            return Err(self.base.error("expected SET option"));
        }
        Ok(Statement::SetOption {
            option: words.join(", "),
            value,
        })
    }

    fn collect_words(&mut self) -> String {
        let mut words = Vec::new();
        while let Some(t) = self.base.current_token() {
            if t.is_punct(";") {
                break;
            }
            words.push(t.lexeme.to_ascii_uppercase());
            self.base.advance();
        }
        words.join(" ")
    }
}
