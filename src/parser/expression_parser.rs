//! Expression and predicate parsing
//!
//! Precedence, lowest first: OR, AND, NOT, comparison / IS / IN / BETWEEN /
//! LIKE, additive and bitwise, multiplicative, unary, primary.

use super::ast::{
    BinaryOperator, ColumnRef, Expr, FunctionCall, Literal, LiteralValueKind, ObjectName,
    UnaryOperator,
};
use super::lexer::{LiteralKind, TokenKind};
use super::statement_parser::StatementParser;
use crate::error::ParseError;

/// Functions whose first argument is a date part keyword rather than an expression
const DATE_PART_FUNCTIONS: &[&str] = &[
    "DATEADD",
    "DATEDIFF",
    "DATEDIFF_BIG",
    "DATEPART",
    "DATENAME",
    "DATETRUNC",
    "DATE_BUCKET",
];

impl StatementParser {
    pub(super) fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.nested(Self::parse_or)
    }

    pub(super) fn parse_expr_list(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut exprs = vec![self.parse_expr()?];
        while self.base.consume_punct(",") {
            exprs.push(self.parse_expr()?);
        }
        Ok(exprs)
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and()?;
        while self.base.consume_word("OR") {
            let right = self.parse_and()?;
            left = binary(left, BinaryOperator::Or, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_not()?;
        while self.base.consume_word("AND") {
            let right = self.parse_not()?;
            left = binary(left, BinaryOperator::And, right);
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, ParseError> {
        if self.base.consume_word("NOT") {
            let inner = self.nested(Self::parse_not)?;
            return Ok(Expr::Unary {
                op: UnaryOperator::Not,
                expr: Box::new(inner),
            });
        }
        self.parse_predicate()
    }

    fn parse_predicate(&mut self) -> Result<Expr, ParseError> {
        let left = self.parse_additive()?;

        if let Some(op) = self.comparison_operator() {
            let right = self.parse_additive()?;
            return Ok(binary(left, op, right));
        }

        if self.base.check_word("IS") {
            self.base.advance();
            let negated = self.base.consume_word("NOT");
            self.base.expect_word("NULL")?;
            return Ok(Expr::IsNull {
                expr: Box::new(left),
                negated,
            });
        }

        let negated = if self.base.check_word("NOT")
            && (self.base.check_word_at(1, "IN")
                || self.base.check_word_at(1, "BETWEEN")
                || self.base.check_word_at(1, "LIKE"))
        {
            self.base.advance();
            true
        } else {
            false
        };

        if self.base.consume_word("BETWEEN") {
            let low = self.parse_additive()?;
            self.base.expect_word("AND")?;
            let high = self.parse_additive()?;
            return Ok(Expr::Between {
                expr: Box::new(left),
                low: Box::new(low),
                high: Box::new(high),
                negated,
            });
        }

        if self.base.consume_word("IN") {
            self.base.expect_punct("(")?;
            if self.base.check_word("SELECT") {
                let subquery = self.parse_select()?;
                self.base.expect_punct(")")?;
                return Ok(Expr::InSubquery {
                    expr: Box::new(left),
                    subquery: Box::new(subquery),
                    negated,
                });
            }
            let list = self.parse_expr_list()?;
            self.base.expect_punct(")")?;
            return Ok(Expr::InList {
                expr: Box::new(left),
                list,
                negated,
            });
        }

        if self.base.consume_word("LIKE") {
            let pattern = self.parse_additive()?;
            if self.base.consume_word("ESCAPE") {
                self.parse_additive()?;
            }
            return Ok(Expr::Like {
                expr: Box::new(left),
                pattern: Box::new(pattern),
                negated,
            });
        }

        if negated {
            return Err(self.base.error("expected IN, BETWEEN or LIKE after NOT"));
        }

        Ok(left)
    }

    /// Consume a comparison operator if one is next
    fn comparison_operator(&mut self) -> Option<BinaryOperator> {
        let token = self.base.current_token()?;
        if token.kind != TokenKind::Operator {
            return None;
        }
        let op = match token.lexeme.as_str() {
            "=" => BinaryOperator::Eq,
            "<>" => BinaryOperator::NotEq,
            "<" => BinaryOperator::Lt,
            "<=" => BinaryOperator::LtEq,
            ">" => BinaryOperator::Gt,
            ">=" => BinaryOperator::GtEq,
            _ => return None,
        };
        self.base.advance();
        Some(op)
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.base.current_token() {
                Some(t) if t.is_operator("+") => BinaryOperator::Plus,
                Some(t) if t.is_operator("-") => BinaryOperator::Minus,
                Some(t) if t.is_operator("&") => BinaryOperator::BitwiseAnd,
                Some(t) if t.is_operator("|") => BinaryOperator::BitwiseOr,
                Some(t) if t.is_operator("^") => BinaryOperator::BitwiseXor,
                _ => break,
            };
            self.base.advance();
            let right = self.parse_multiplicative()?;
            left = binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.base.current_token() {
                Some(t) if t.is_operator("*") => BinaryOperator::Multiply,
                Some(t) if t.is_operator("/") => BinaryOperator::Divide,
                Some(t) if t.is_operator("%") => BinaryOperator::Modulo,
                _ => break,
            };
            self.base.advance();
            let right = self.parse_unary()?;
            left = binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let op = match self.base.current_token() {
            Some(t) if t.is_operator("-") => UnaryOperator::Minus,
            Some(t) if t.is_operator("+") => UnaryOperator::Plus,
            Some(t) if t.is_operator("~") => UnaryOperator::BitwiseNot,
            _ => return self.parse_primary(),
        };
        self.base.advance();
        let inner = self.nested(Self::parse_unary)?;
        // Fold `-180` into a literal so date arithmetic stays readable
        if let (UnaryOperator::Minus, Expr::Literal(lit)) = (op, &inner) {
            if lit.kind == LiteralValueKind::Number {
                return Ok(Expr::Literal(Literal {
                    kind: LiteralValueKind::Number,
                    value: format!("-{}", lit.value),
                }));
            }
        }
        Ok(Expr::Unary {
            op,
            expr: Box::new(inner),
        })
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let token = match self.base.current_token() {
            Some(t) => t.clone(),
            None => return Err(self.base.error("expected expression")),
        };

        match token.kind {
            TokenKind::Literal(kind) => {
                self.base.advance();
                let kind = match kind {
                    LiteralKind::Number => LiteralValueKind::Number,
                    LiteralKind::String => LiteralValueKind::String,
                    LiteralKind::NationalString => LiteralValueKind::NationalString,
                };
                Ok(Expr::Literal(Literal {
                    kind,
                    value: token.lexeme,
                }))
            }
            TokenKind::Variable => {
                self.base.advance();
                Ok(Expr::Variable(token.lexeme))
            }
            TokenKind::Punctuation if token.lexeme == "(" => {
                self.base.advance();
                if self.base.check_word("SELECT") {
                    let subquery = self.parse_select()?;
                    self.base.expect_punct(")")?;
                    return Ok(Expr::Subquery(Box::new(subquery)));
                }
                let inner = self.parse_expr()?;
                self.base.expect_punct(")")?;
                Ok(Expr::Nested(Box::new(inner)))
            }
            TokenKind::Operator if token.lexeme == "*" => {
                self.base.advance();
                Ok(Expr::Wildcard)
            }
            TokenKind::Keyword => self.parse_keyword_primary(&token.lexeme),
            TokenKind::Identifier | TokenKind::QuotedIdentifier => self.parse_name_primary(),
            _ => Err(self.base.error("expected expression")),
        }
    }

    fn parse_keyword_primary(&mut self, keyword: &str) -> Result<Expr, ParseError> {
        match keyword.to_ascii_uppercase().as_str() {
            "NULL" => {
                self.base.advance();
                Ok(Expr::Literal(Literal {
                    kind: LiteralValueKind::Null,
                    value: "NULL".to_string(),
                }))
            }
            "CASE" => self.parse_case(),
            "EXISTS" => {
                self.base.advance();
                self.base.expect_punct("(")?;
                let subquery = self.parse_select()?;
                self.base.expect_punct(")")?;
                Ok(Expr::Exists {
                    subquery: Box::new(subquery),
                    negated: false,
                })
            }
            // LEFT(...) / RIGHT(...) are string functions outside of joins
            "LEFT" | "RIGHT" if self.base.peek(1).is_some_and(|t| t.is_punct("(")) => {
                let start = self.base.current_position();
                let name = self.base.next_token().map(|t| t.lexeme).unwrap_or_default();
                self.parse_function_call(ObjectName::new(None, &name), start)
            }
            _ => Err(self.base.error("unexpected keyword in expression")),
        }
    }

    /// Column reference, qualified column reference or function call
    fn parse_name_primary(&mut self) -> Result<Expr, ParseError> {
        let start = self.base.current_position();
        let mut parts = vec![self.base.parse_identifier()?];
        while self.base.check_punct(".")
            && self.base.peek(1).is_some_and(|t| t.is_name())
        {
            self.base.advance();
            parts.push(self.base.parse_identifier_with(true)?);
        }

        if self.base.check_punct("(") {
            let name = parts.pop().unwrap_or_default();
            let schema = parts.pop();
            return self.parse_function_call(ObjectName { schema, name }, start);
        }

        let name = parts.pop().unwrap_or_default();
        let qualifier = parts.pop();
        Ok(Expr::Column(ColumnRef {
            qualifier,
            name,
            span: self.base.span_from(start),
        }))
    }

    /// Parse the argument list and trailing OVER / WITHIN GROUP clauses.
    /// Position must be at `(`.
    fn parse_function_call(
        &mut self,
        name: ObjectName,
        start: super::ast::Position,
    ) -> Result<Expr, ParseError> {
        let upper = name.name.to_ascii_uppercase();
        self.base.expect_punct("(")?;

        if name.schema.is_none() {
            match upper.as_str() {
                "CAST" | "TRY_CAST" => {
                    let expr = self.parse_expr()?;
                    self.base.expect_word("AS")?;
                    let data_type = self.base.parse_data_type()?;
                    self.base.expect_punct(")")?;
                    return Ok(Expr::Cast {
                        function: upper,
                        expr: Box::new(expr),
                        data_type,
                    });
                }
                "CONVERT" | "TRY_CONVERT" => {
                    let data_type = self.base.parse_data_type()?;
                    self.base.expect_punct(",")?;
                    let expr = self.parse_expr()?;
                    if self.base.consume_punct(",") {
                        self.parse_expr()?;
                    }
                    self.base.expect_punct(")")?;
                    return Ok(Expr::Cast {
                        function: upper,
                        expr: Box::new(expr),
                        data_type,
                    });
                }
                _ => {}
            }
        }

        let mut args = Vec::new();
        let mut distinct = false;
        if !self.base.check_punct(")") {
            if self.base.consume_word("DISTINCT") {
                distinct = true;
            } else {
                self.base.consume_word("ALL");
            }

            if DATE_PART_FUNCTIONS.contains(&upper.as_str()) && name.schema.is_none() {
                let part = self.base.parse_identifier_with(true)?;
                args.push(Expr::Literal(Literal {
                    kind: LiteralValueKind::DatePart,
                    value: part.to_ascii_uppercase(),
                }));
                if self.base.consume_punct(",") {
                    args.extend(self.parse_expr_list()?);
                }
            } else {
                args = self.parse_expr_list()?;
            }
        }
        self.base.expect_punct(")")?;

        if self.base.consume_word("WITHIN") {
            self.base.expect_word("GROUP")?;
            self.base.skip_parenthesized();
        }

        let windowed = if self.base.consume_word("OVER") {
            self.base.skip_parenthesized();
            true
        } else {
            false
        };

        Ok(Expr::Function(FunctionCall {
            name,
            args,
            distinct,
            windowed,
            span: self.base.span_from(start),
        }))
    }

    fn parse_case(&mut self) -> Result<Expr, ParseError> {
        self.base.expect_word("CASE")?;
        let operand = if self.base.check_word("WHEN") {
            None
        } else {
            Some(Box::new(self.parse_expr()?))
        };

        let mut branches = Vec::new();
        while self.base.consume_word("WHEN") {
            let condition = self.parse_expr()?;
            self.base.expect_word("THEN")?;
            let result = self.parse_expr()?;
            branches.push((condition, result));
        }
        if branches.is_empty() {
            return Err(self.base.error("expected WHEN"));
        }

        let else_result = if self.base.consume_word("ELSE") {
            Some(Box::new(self.parse_expr()?))
        } else {
            None
        };
        self.base.expect_word("END")?;

        Ok(Expr::Case {
            operand,
            branches,
            else_result,
        })
    }
}

fn binary(left: Expr, op: BinaryOperator, right: Expr) -> Expr {
    Expr::Binary {
        left: Box::new(left),
        op,
        right: Box::new(right),
    }
}
