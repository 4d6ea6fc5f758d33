//! NOLOCK_HINT, MISSING_TRANSACTION_WRAPPER, UNFILTERED_MODIFICATION

use super::{factors_in, statements_of, Finding, RuleContext};
use crate::parser::{
    table_factors, BodyItem, ProcedureDef, RoutineKind, Statement, TableFactor,
    TransactionControl,
};

const DIRTY_READ_HINTS: &[&str] = &["NOLOCK", "READUNCOMMITTED"];

const TRANSACTION_TEMPLATE: &str = "BEGIN TRY
    BEGIN TRANSACTION;
    -- data modifications
    COMMIT TRANSACTION;
END TRY
BEGIN CATCH
    IF @@TRANCOUNT > 0 ROLLBACK TRANSACTION;
    THROW;
END CATCH";

pub(super) fn nolock_hint(ctx: &RuleContext) -> Vec<Finding> {
    let mut findings = Vec::new();
    for statement in statements_of(ctx.statement) {
        for factor in factors_in(statement) {
            if let TableFactor::Table {
                name, hints, span, ..
            } = factor
            {
                if let Some(hint) = hints.iter().find(|h| DIRTY_READ_HINTS.contains(&h.as_str())) {
                    findings.push(
                        Finding::new(*span)
                            .arg("what", format!("Table hint {} on {}", hint, name))
                            .fix(format!("Remove the {} hint", hint)),
                    );
                }
            }
        }

        match statement {
            Statement::Update(update) => {
                if let Some(hint) = update
                    .target_hints
                    .iter()
                    .find(|h| DIRTY_READ_HINTS.contains(&h.as_str()))
                {
                    findings.push(
                        Finding::new(update.span)
                            .arg("what", format!("Table hint {} on {}", hint, update.target)),
                    );
                }
            }
            Statement::SetOption { option, value }
                if option.eq_ignore_ascii_case("TRANSACTION ISOLATION LEVEL")
                    && value.to_ascii_uppercase().contains("UNCOMMITTED") =>
            {
                findings.push(
                    Finding::new(ctx.span)
                        .arg("what", "Isolation level READ UNCOMMITTED")
                        .fix("SET TRANSACTION ISOLATION LEVEL READ COMMITTED"),
                );
            }
            _ => {}
        }
    }
    findings
}

/// Sequential walk state over a routine body
#[derive(Default)]
struct TransactionWalk {
    open_transactions: usize,
    modifications: usize,
    unprotected: usize,
}

impl TransactionWalk {
    fn walk(&mut self, items: &[BodyItem], in_try: bool) {
        for item in items {
            match item {
                BodyItem::Statement(node) => match &node.statement {
                    Statement::Transaction(TransactionControl::Begin) => self.open_transactions += 1,
                    Statement::Transaction(TransactionControl::Commit) => {
                        self.open_transactions = self.open_transactions.saturating_sub(1)
                    }
                    Statement::Transaction(TransactionControl::Rollback) => self.open_transactions = 0,
                    statement if statement.is_mutation() => {
                        self.modifications += 1;
                        if self.open_transactions == 0 || !in_try {
                            self.unprotected += 1;
                        }
                    }
                    _ => {}
                },
                BodyItem::Block(inner) => self.walk(inner, in_try),
                // CATCH handlers are not counted
                BodyItem::TryCatch { try_block, .. } => self.walk(try_block, true),
                BodyItem::Invalid(_) => {}
            }
        }
    }
}

fn unprotected_modifications(def: &ProcedureDef) -> Option<usize> {
    let mut walk = TransactionWalk::default();
    walk.walk(&def.body, false);
    (walk.modifications >= 2 && walk.unprotected > 0).then_some(walk.modifications)
}

pub(super) fn missing_transaction_wrapper(ctx: &RuleContext) -> Vec<Finding> {
    let Statement::ProcedureDef(def) = ctx.statement else {
        return Vec::new();
    };
    if def.kind != RoutineKind::Procedure {
        return Vec::new();
    }
    match unprotected_modifications(def) {
        Some(count) => vec![Finding::new(def.name_span)
            .arg("procedure", def.name.to_string())
            .arg("count", count.to_string())
            .fix(TRANSACTION_TEMPLATE)],
        None => Vec::new(),
    }
}

pub(super) fn unfiltered_modification(ctx: &RuleContext) -> Vec<Finding> {
    let mut findings = Vec::new();
    for statement in statements_of(ctx.statement) {
        let (kind, target, from, selection, span) = match statement {
            Statement::Update(u) => ("UPDATE", &u.target, &u.from, &u.selection, u.span),
            Statement::Delete(d) => ("DELETE", &d.target, &d.from, &d.selection, d.span),
            _ => continue,
        };
        if selection.is_none() && table_factors(from).len() < 2 && !target.is_temporary() {
            findings.push(
                Finding::new(span)
                    .arg("statement", kind)
                    .arg("table", target.to_string())
                    .fix(format!("Add a WHERE clause to the {}", kind)),
            );
        }
    }
    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{tokenize, StatementParser};

    fn routine(sql: &str) -> ProcedureDef {
        let tokens = tokenize(sql, 1).unwrap();
        match StatementParser::new(tokens).parse_complete().unwrap() {
            Statement::ProcedureDef(def) => *def,
            other => panic!("expected routine, got {:?}", other),
        }
    }

    #[test]
    fn test_two_updates_without_transaction() {
        let def = routine(
            "CREATE PROCEDURE dbo.usp_Move_Stock AS BEGIN \
             UPDATE dbo.Stock SET Qty = Qty - 1 WHERE Id = 1; \
             UPDATE dbo.Stock SET Qty = Qty + 1 WHERE Id = 2; END",
        );
        assert_eq!(unprotected_modifications(&def), Some(2));
    }

    #[test]
    fn test_transaction_inside_try_is_protected() {
        let def = routine(
            "CREATE PROCEDURE dbo.usp_Move_Stock AS BEGIN \
             BEGIN TRY BEGIN TRAN; \
             UPDATE dbo.Stock SET Qty = Qty - 1 WHERE Id = 1; \
             UPDATE dbo.Stock SET Qty = Qty + 1 WHERE Id = 2; \
             COMMIT; END TRY \
             BEGIN CATCH IF @@TRANCOUNT > 0 ROLLBACK; \
             INSERT INTO dbo.ErrorLog (Message) VALUES (ERROR_MESSAGE()); THROW; END CATCH END",
        );
        assert_eq!(unprotected_modifications(&def), None);
    }

    #[test]
    fn test_transaction_without_try_is_not_enough() {
        let def = routine(
            "CREATE PROCEDURE dbo.usp_Move_Stock AS BEGIN TRAN; \
             UPDATE dbo.Stock SET Qty = 0 WHERE Id = 1; \
             DELETE FROM dbo.Stock WHERE Id = 2; COMMIT;",
        );
        assert_eq!(unprotected_modifications(&def), Some(2));
    }

    #[test]
    fn test_single_modification_is_fine() {
        let def = routine("CREATE PROCEDURE dbo.usp_Touch_Stock AS UPDATE dbo.Stock SET Qty = 0 WHERE Id = 1;");
        assert_eq!(unprotected_modifications(&def), None);
    }
}
