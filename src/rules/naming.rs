//! NAMING_CONVENTION

use once_cell::sync::Lazy;
use regex::Regex;

use super::{Finding, RuleContext};
use crate::parser::{SourceSpan, Statement, TableConstraint};

static PASCAL_CASE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[A-Z][a-z0-9]*)+$").expect("Invalid naming regex"));
static PROCEDURE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^usp_(?:[A-Z][a-z0-9]*)+_(?:[A-Z][a-z0-9]*)+$").expect("Invalid naming regex")
});
static FUNCTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^u?fn_(?:[A-Z][a-z0-9]*)+$").expect("Invalid naming regex"));
static VIEW: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^vw_(?:[A-Z][a-z0-9]*)+$").expect("Invalid naming regex"));
static INDEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:IX|UX|PK|UQ)_\w+$").expect("Invalid naming regex"));

const PASCAL_SINGULAR: &str = "PascalCase and singular";
const PASCAL: &str = "PascalCase";

/// Last PascalCase word ends in a plural `s` (`Orders`, but not `Status`
/// or `Address`)
fn looks_plural(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.ends_with('s')
        && !["ss", "us", "is", "ics"]
            .iter()
            .any(|suffix| lower.ends_with(suffix))
}

pub fn is_table_name_valid(name: &str) -> bool {
    PASCAL_CASE.is_match(name) && !looks_plural(name)
}

pub fn is_column_name_valid(name: &str) -> bool {
    PASCAL_CASE.is_match(name)
}

fn finding(kind: &str, name: &str, expected: &str, span: SourceSpan) -> Finding {
    Finding::new(span)
        .arg("kind", kind)
        .arg("name", name)
        .arg("expected", expected)
}

pub(super) fn naming_convention(ctx: &RuleContext) -> Vec<Finding> {
    let mut findings = Vec::new();
    match ctx.statement {
        Statement::CreateTable(create) => {
            // Temp tables and table variables are scratch objects
            if !create.name.is_temporary() && !is_table_name_valid(&create.name.name) {
                findings.push(finding("Table", &create.name.name, PASCAL_SINGULAR, create.name_span));
            }
            for column in &create.columns {
                if !is_column_name_valid(&column.name) {
                    findings.push(finding("Column", &column.name, PASCAL, column.span));
                }
            }
            let inline = create.columns.iter().filter_map(|c| c.inline_constraint.as_ref());
            for constraint in create.constraints.iter().chain(inline) {
                if let Some(name) = constraint_name(constraint) {
                    if !INDEX.is_match(name) {
                        findings.push(finding(
                            "Constraint",
                            name,
                            "prefixed with PK_, UQ_, UX_ or IX_",
                            create.name_span,
                        ));
                    }
                }
            }
        }
        Statement::CreateIndex(index) => {
            if !INDEX.is_match(&index.name) {
                findings.push(finding(
                    "Index",
                    &index.name,
                    "prefixed with IX_, UX_, PK_ or UQ_",
                    index.name_span,
                ));
            }
        }
        Statement::CreateView(view) => {
            if !VIEW.is_match(&view.name.name) {
                findings.push(finding(
                    "View",
                    &view.name.name,
                    "vw_ followed by PascalCase",
                    view.name_span,
                ));
            }
        }
        Statement::ProcedureDef(def) => {
            let (kind, pattern, expected) = match def.kind {
                crate::parser::RoutineKind::Procedure => {
                    ("Procedure", &*PROCEDURE, "usp_Action_Entity")
                }
                crate::parser::RoutineKind::Function => {
                    ("Function", &*FUNCTION, "fn_ or ufn_ followed by PascalCase")
                }
            };
            if !pattern.is_match(&def.name.name) {
                findings.push(finding(kind, &def.name.name, expected, def.name_span));
            }
        }
        _ => {}
    }
    findings
}

fn constraint_name(constraint: &TableConstraint) -> Option<&str> {
    match constraint {
        TableConstraint::PrimaryKey { name, .. } | TableConstraint::Unique { name, .. } => {
            name.as_deref()
        }
        TableConstraint::Index { name, .. } => Some(name),
        TableConstraint::Other => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_names() {
        assert!(is_table_name_valid("Employee"));
        assert!(is_table_name_valid("OrderStatus"));
        assert!(is_table_name_valid("CustomerAddress"));
        assert!(!is_table_name_valid("employee_data"));
        assert!(!is_table_name_valid("Employees"));
        assert!(!is_table_name_valid("Order_Line"));
    }

    #[test]
    fn test_routine_and_index_patterns() {
        assert!(PROCEDURE.is_match("usp_Get_Customer"));
        assert!(PROCEDURE.is_match("usp_Update_OrderStatus"));
        assert!(!PROCEDURE.is_match("GetCustomer"));
        assert!(!PROCEDURE.is_match("sp_GetCustomer"));
        assert!(FUNCTION.is_match("fn_Score"));
        assert!(FUNCTION.is_match("ufn_GetAge"));
        assert!(!FUNCTION.is_match("GetAge"));
        assert!(VIEW.is_match("vw_ActiveCustomer"));
        assert!(INDEX.is_match("IX_Orders_OrderDate"));
        assert!(!INDEX.is_match("OrdersByDate"));
        assert!(is_column_name_valid("CustomerID"));
        assert!(!is_column_name_valid("customer_id"));
    }
}
