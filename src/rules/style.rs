//! SELECT_STAR, MISSING_NOCOUNT

use super::{selects_in, statements_of, Finding, RuleContext};
use crate::catalog::Catalog;
use crate::parser::{
    table_factors, RoutineKind, Select, SelectItem, SourceSpan, Statement, TableFactor,
};

/// First `*` / `t.*` projection among a statement's selects, EXISTS subqueries excluded
fn first_wildcard(statement: &Statement) -> Option<(&Select, Option<&str>, SourceSpan)> {
    selects_in(statement, false).into_iter().find_map(|select| {
        select.projection.iter().find_map(|item| match item {
            SelectItem::Wildcard { qualifier, span } => Some((select, qualifier.as_deref(), *span)),
            SelectItem::Expr { .. } => None,
        })
    })
}

fn factor_label(factor: &TableFactor) -> String {
    match factor {
        TableFactor::Table { name, .. } => name.to_string(),
        TableFactor::Derived { alias, .. } => alias.clone().unwrap_or_else(|| "derived table".to_string()),
        TableFactor::Function { call, .. } => call.name.to_string(),
    }
}

fn matches_qualifier(factor: &TableFactor, qualifier: &str) -> bool {
    match (factor.alias(), factor) {
        (Some(alias), _) => alias.eq_ignore_ascii_case(qualifier),
        (None, TableFactor::Table { name, .. }) => name.name.eq_ignore_ascii_case(qualifier),
        _ => false,
    }
}

/// Explicit column list for the expanded sources, when all of them are catalog tables
fn column_list(sources: &[&TableFactor], catalog: &Catalog) -> Option<String> {
    let mut columns = Vec::new();
    for factor in sources {
        let TableFactor::Table { name, alias, .. } = factor else {
            return None;
        };
        let table = catalog.resolve_object(name)?;
        let prefix = if sources.len() > 1 {
            format!("{}.", alias.as_deref().unwrap_or(&name.name))
        } else {
            String::new()
        };
        columns.extend(table.columns.iter().map(|c| format!("{}{}", prefix, c.name)));
    }
    (!columns.is_empty()).then(|| format!("SELECT {}", columns.join(", ")))
}

pub(super) fn select_star(ctx: &RuleContext) -> Vec<Finding> {
    let mut findings = Vec::new();
    for statement in statements_of(ctx.statement) {
        let Some((select, qualifier, span)) = first_wildcard(statement) else {
            continue;
        };
        let factors = table_factors(&select.from);
        let sources: Vec<&TableFactor> = match qualifier {
            Some(q) => factors.into_iter().filter(|f| matches_qualifier(f, q)).collect(),
            None => factors,
        };
        let source = if sources.is_empty() {
            qualifier.unwrap_or("the query").to_string()
        } else {
            sources.iter().map(|f| factor_label(f)).collect::<Vec<_>>().join(", ")
        };

        let mut finding = Finding::new(span).arg("source", source);
        finding.fix = column_list(&sources, ctx.catalog);
        findings.push(finding);
    }
    findings
}

pub(super) fn missing_nocount(ctx: &RuleContext) -> Vec<Finding> {
    let Statement::ProcedureDef(def) = ctx.statement else {
        return Vec::new();
    };
    if def.kind != RoutineKind::Procedure {
        return Vec::new();
    }
    let has_nocount = def.statements().iter().any(|node| {
        matches!(&node.statement, Statement::SetOption { option, value }
            if option.split(", ").any(|o| o == "NOCOUNT") && value.eq_ignore_ascii_case("ON"))
    });
    if has_nocount {
        return Vec::new();
    }
    vec![Finding::new(def.name_span)
        .arg("procedure", def.name.to_string())
        .fix("SET NOCOUNT ON;")]
}
