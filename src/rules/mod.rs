//! Rule catalog and evaluation
//!
//! Rules are plain records in [`RULES`]: metadata plus a pure check
//! function. The engine runs every enabled rule once per statement and
//! renders each finding through the rule's message template.

mod engine;
mod naming;
mod sargability;
mod security;
mod style;
mod transaction;

use crate::catalog::Catalog;
use crate::config::RuleConfig;
use crate::diagnostic::{Category, Severity};
use crate::parser::{
    expr_subqueries, table_factors, InsertSource, Select, SourceSpan, Statement, TableFactor,
    TableWithJoins,
};
use crate::profile::{QueryProfile, VariableEnv};
use crate::runtime::RuntimeStats;

pub use engine::{engine_diagnostics, evaluate, parse_error_diagnostic};

/// Everything a rule may look at
pub struct RuleContext<'a> {
    pub statement: &'a Statement,
    pub span: SourceSpan,
    pub profile: &'a QueryProfile,
    /// Variables declared earlier in the batch
    pub variables: &'a VariableEnv,
    pub catalog: &'a Catalog,
    pub runtime: Option<&'a RuntimeStats>,
    pub config: &'a RuleConfig,
}

/// One rule hit, before severity and message rendering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub span: SourceSpan,
    /// Values for the rule's `{placeholders}`
    pub args: Vec<(&'static str, String)>,
    pub fix: Option<String>,
    /// Raise to error regardless of the configured severity
    pub escalate: bool,
}

impl Finding {
    pub fn new(span: SourceSpan) -> Self {
        Self {
            span,
            args: Vec::new(),
            fix: None,
            escalate: false,
        }
    }

    pub fn arg(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.args.push((name, value.into()));
        self
    }

    pub fn fix(mut self, fix: impl Into<String>) -> Self {
        self.fix = Some(fix.into());
        self
    }
}

/// A rule record
pub struct Rule {
    pub id: &'static str,
    pub category: Category,
    pub default_severity: Severity,
    pub description: &'static str,
    pub message: &'static str,
    pub check: fn(&RuleContext) -> Vec<Finding>,
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule").field("id", &self.id).finish()
    }
}

/// The rule catalog
pub static RULES: &[Rule] = &[
    Rule {
        id: "SELECT_STAR",
        category: Category::Style,
        default_severity: Severity::Warning,
        description: "A projection uses * instead of an explicit column list",
        message: "SELECT * returns every column of {source}; list the columns explicitly",
        check: style::select_star,
    },
    Rule {
        id: "NON_SARGABLE_PREDICATE",
        category: Category::Sargability,
        default_severity: Severity::Warning,
        description: "A predicate column is wrapped in a function, arithmetic or conversion",
        message: "Predicate on {column} cannot use an index seek: {reason}",
        check: sargability::non_sargable_predicate,
    },
    Rule {
        id: "NOLOCK_HINT",
        category: Category::Transaction,
        default_severity: Severity::Warning,
        description: "NOLOCK / READUNCOMMITTED hint or READ UNCOMMITTED isolation level",
        message: "{what} allows dirty reads",
        check: transaction::nolock_hint,
    },
    Rule {
        id: "SCALAR_FUNCTION_IN_PREDICATE",
        category: Category::Sargability,
        default_severity: Severity::Warning,
        description: "A user-defined scalar function is invoked per row",
        message: "User-defined scalar function {function} is invoked in the {clause}",
        check: sargability::scalar_function,
    },
    Rule {
        id: "MISSING_TRANSACTION_WRAPPER",
        category: Category::Transaction,
        default_severity: Severity::Error,
        description: "A procedure modifies data in several statements outside an explicit transaction with TRY/CATCH",
        message: "Procedure {procedure} runs {count} data modifications without BEGIN TRAN ... COMMIT inside TRY/CATCH",
        check: transaction::missing_transaction_wrapper,
    },
    Rule {
        id: "NAMING_CONVENTION",
        category: Category::Naming,
        default_severity: Severity::Info,
        description: "Object name does not follow the naming conventions",
        message: "{kind} name '{name}' should be {expected}",
        check: naming::naming_convention,
    },
    Rule {
        id: "IMPLICIT_CONVERSION",
        category: Category::Sargability,
        default_severity: Severity::Warning,
        description: "Comparison operands have different type families",
        message: "Comparison {expression} converts between {left} and {right}",
        check: sargability::implicit_conversion,
    },
    Rule {
        id: "DYNAMIC_SQL",
        category: Category::Security,
        default_severity: Severity::Warning,
        description: "Dynamic SQL built by string concatenation",
        message: "Dynamic SQL executed through {target} is built by concatenation",
        check: security::dynamic_sql,
    },
    Rule {
        id: "MISSING_NOCOUNT",
        category: Category::Style,
        default_severity: Severity::Info,
        description: "Procedure body lacks SET NOCOUNT ON",
        message: "Procedure {procedure} does not SET NOCOUNT ON",
        check: style::missing_nocount,
    },
    Rule {
        id: "UNFILTERED_MODIFICATION",
        category: Category::Transaction,
        default_severity: Severity::Warning,
        description: "UPDATE or DELETE without WHERE clause or joined FROM",
        message: "{statement} on {table} affects every row",
        check: transaction::unfiltered_modification,
    },
];

pub fn find_rule(id: &str) -> Option<&'static Rule> {
    RULES.iter().find(|r| r.id.eq_ignore_ascii_case(id))
}

/// Replace `{name}` placeholders with finding arguments
pub(crate) fn render_message(template: &str, args: &[(&'static str, String)]) -> String {
    let mut message = template.to_string();
    for (name, value) in args {
        message = message.replace(&format!("{{{}}}", name), value);
    }
    message
}

// ============================================================================
// Statement traversal shared by the rules
// ============================================================================

/// The statement itself, or every body statement of a routine
pub(crate) fn statements_of(statement: &Statement) -> Vec<&Statement> {
    match statement {
        Statement::ProcedureDef(def) => def.statements().into_iter().map(|n| &n.statement).collect(),
        other => vec![other],
    }
}

/// Every SELECT inside a statement (set-operation branches, derived tables
/// and subqueries), optionally skipping EXISTS subqueries
pub(crate) fn selects_in(statement: &Statement, include_exists: bool) -> Vec<&Select> {
    let mut roots: Vec<&Select> = Vec::new();
    match statement {
        Statement::Select(select) => roots.push(select),
        Statement::CreateView(view) => roots.push(&view.query),
        Statement::Insert(insert) => {
            if let InsertSource::Query(select) = &insert.source {
                roots.push(select);
            }
            if let InsertSource::Values(rows) = &insert.source {
                for expr in rows.iter().flatten() {
                    roots.extend(expr_subqueries(expr, include_exists));
                }
            }
        }
        Statement::Update(update) => {
            roots.extend(from_selects(&update.from, include_exists));
            for assignment in &update.assignments {
                roots.extend(expr_subqueries(&assignment.value, include_exists));
            }
            if let Some(selection) = &update.selection {
                roots.extend(expr_subqueries(selection, include_exists));
            }
        }
        Statement::Delete(delete) => {
            roots.extend(from_selects(&delete.from, include_exists));
            if let Some(selection) = &delete.selection {
                roots.extend(expr_subqueries(selection, include_exists));
            }
        }
        Statement::SetVariable { value, .. } => roots.extend(expr_subqueries(value, include_exists)),
        _ => {}
    }

    let mut out = Vec::new();
    for root in roots {
        out.extend(root.all_selects(include_exists));
    }
    out
}

fn from_selects(from: &[TableWithJoins], include_exists: bool) -> Vec<&Select> {
    let mut out = Vec::new();
    for twj in from {
        for join in &twj.joins {
            if let Some(on) = &join.on {
                out.extend(expr_subqueries(on, include_exists));
            }
        }
    }
    for factor in table_factors(from) {
        if let TableFactor::Derived { subquery, .. } = factor {
            out.push(subquery.as_ref());
        }
    }
    out
}

/// Every table factor referenced by a statement, including DML FROM lists
pub(crate) fn factors_in(statement: &Statement) -> Vec<&TableFactor> {
    let mut out = Vec::new();
    for select in selects_in(statement, true) {
        out.extend(table_factors(&select.from));
    }
    match statement {
        Statement::Update(update) => out.extend(table_factors(&update.from)),
        Statement::Delete(delete) => out.extend(table_factors(&delete.from)),
        _ => {}
    }
    out
}
