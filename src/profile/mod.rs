//! Query profiles: the normalized facts rules and the index advisor work from
//!
//! A profile records which tables a statement touches and how it uses their
//! columns: predicate columns by comparison kind, join, grouping, ordering
//! and projection columns, aggregates, non-SARGable predicates and implicit
//! conversions.

mod extractor;
mod scope;
mod typing;
mod variables;

use std::fmt;

use serde::Serialize;

pub use extractor::{extract_profile, extract_profile_with};
pub use typing::{family_of_type, TypeFamily};
pub use variables::VariableEnv;

use crate::parser::SourceSpan;

/// How a predicate constrains its column
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonKind {
    /// `=`, `IN (...)`, `IS NULL`
    Equality,
    /// `<`, `<=`, `>`, `>=`, `BETWEEN`, prefix `LIKE`
    Range,
    /// `<>`, `NOT IN`, `IS NOT NULL`
    Inequality,
}

/// Why a predicate column cannot be used for an index seek
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NonSargableReason {
    FunctionWrap { function: String },
    Arithmetic { operator: String },
    TypeMismatch { column_type: String, operand_type: String },
    LeadingWildcard,
}

impl fmt::Display for NonSargableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NonSargableReason::FunctionWrap { function } => {
                write!(f, "wrapped in function {}", function)
            }
            NonSargableReason::Arithmetic { operator } => {
                write!(f, "used in arithmetic ({})", operator)
            }
            NonSargableReason::TypeMismatch {
                column_type,
                operand_type,
            } => write!(
                f,
                "implicitly converted from {} to {}",
                column_type, operand_type
            ),
            NonSargableReason::LeadingWildcard => write!(f, "LIKE pattern starts with a wildcard"),
        }
    }
}

/// Clause a function call or column appears in
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Clause {
    Select,
    Where,
    Join,
    GroupBy,
    Having,
    OrderBy,
    Set,
    Values,
    Other,
}

impl Clause {
    pub fn name(&self) -> &'static str {
        match self {
            Clause::Select => "SELECT list",
            Clause::Where => "WHERE",
            Clause::Join => "JOIN",
            Clause::GroupBy => "GROUP BY",
            Clause::Having => "HAVING",
            Clause::OrderBy => "ORDER BY",
            Clause::Set => "SET",
            Clause::Values => "VALUES",
            Clause::Other => "statement",
        }
    }
}

/// A column of a catalog table, as `schema.table` plus column name
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ColumnKey {
    pub table: String,
    pub column: String,
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.column)
    }
}

/// Column usage of one table instance in a FROM clause or DML target.
/// Predicate lists hold AND-connected predicates only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableAccess {
    pub schema: String,
    pub table: String,
    pub alias: Option<String>,
    pub equality_columns: Vec<String>,
    pub range_columns: Vec<String>,
    pub inequality_columns: Vec<String>,
    pub join_columns: Vec<String>,
    pub group_by_columns: Vec<String>,
    pub order_by_columns: Vec<String>,
    pub projected_columns: Vec<String>,
    pub aggregate_columns: Vec<String>,
    pub uses_wildcard: bool,
}

impl TableAccess {
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.table)
    }

    pub fn has_predicates(&self) -> bool {
        !self.equality_columns.is_empty() || !self.range_columns.is_empty()
    }
}

/// Push `column` unless already present (case-insensitive)
pub(crate) fn push_unique(list: &mut Vec<String>, column: &str) {
    if !list.iter().any(|c| c.eq_ignore_ascii_case(column)) {
        list.push(column.to_string());
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredicateUse {
    pub column: ColumnKey,
    pub kind: ComparisonKind,
    /// Sits under an OR (or a negated compound), so it cannot drive a seek alone
    pub disjunctive: bool,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonSargableUse {
    /// `None` when the column belongs to a temp table or derived source
    pub column: Option<ColumnKey>,
    /// Column as written
    pub column_text: String,
    pub reason: NonSargableReason,
    /// Rendered comparison operand
    pub expression: String,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImplicitConversion {
    pub column: Option<ColumnKey>,
    pub expression: String,
    pub left: TypeFamily,
    pub right: TypeFamily,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateUse {
    pub function: String,
    pub distinct: bool,
    /// Rendered call, e.g. `AVG(o.Price * o.Quantity)`
    pub expression: String,
    pub input_columns: Vec<ColumnKey>,
    pub span: SourceSpan,
}

/// Call site of a user-defined scalar function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UdfCall {
    pub name: String,
    pub clause: Clause,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReferenceKind {
    Table,
    Column,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedReference {
    pub kind: ReferenceKind,
    pub name: String,
    pub span: SourceSpan,
}

/// Everything the rules and the advisor need to know about one statement
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryProfile {
    /// Touched catalog tables (`schema.table`) in first-use order
    pub tables: Vec<String>,
    pub accesses: Vec<TableAccess>,
    pub predicates: Vec<PredicateUse>,
    /// Column-to-column equalities between two table instances
    pub joins: Vec<(ColumnKey, ColumnKey)>,
    pub group_by: Vec<ColumnKey>,
    pub order_by: Vec<ColumnKey>,
    pub non_sargable: Vec<NonSargableUse>,
    pub implicit_conversions: Vec<ImplicitConversion>,
    pub aggregates: Vec<AggregateUse>,
    pub udf_calls: Vec<UdfCall>,
    pub unresolved: Vec<UnresolvedReference>,
}

impl QueryProfile {
    /// Accesses of one table, matched case-insensitively on `schema.table`
    pub fn accesses_of<'a>(&'a self, table: &'a str) -> impl Iterator<Item = &'a TableAccess> + 'a {
        self.accesses
            .iter()
            .filter(move |a| a.qualified_name().eq_ignore_ascii_case(table))
    }
}
