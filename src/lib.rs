//! rust-sqladvisor: static analysis and index advice for T-SQL
//!
//! SQL files are parsed statement by statement, each statement is profiled
//! against a schema catalog, checked by the rule engine and handed to the
//! index advisor. No database connection is involved.

pub mod advisor;
pub mod catalog;
pub mod config;
pub mod diagnostic;
pub mod error;
pub mod input;
pub mod parser;
pub mod profile;
pub mod report;
pub mod rules;
pub mod runtime;

use std::path::{Path, PathBuf};

use anyhow::Result;
use rayon::prelude::*;
use tracing::{debug, info};

pub use advisor::KeyPriority;
pub use catalog::Catalog;
pub use config::RuleConfig;
pub use diagnostic::{Diagnostic, Severity};
pub use error::AdvisorError;
pub use report::{AnalysisReport, StatementReport};
pub use runtime::RuntimeStatsSet;

use parser::ParsedStatement;
use profile::VariableEnv;

/// Statement count above which analysis runs on the rayon pool
const PARALLEL_THRESHOLD: usize = 8;

/// Options shared by every statement of a run
#[derive(Debug, Clone, Default)]
pub struct AnalysisOptions {
    pub rules: RuleConfig,
    pub key_priority: KeyPriority,
    /// Measured runtime statistics, matched by file and statement ordinal
    pub stats: Option<RuntimeStatsSet>,
}

/// Analyze SQL text held in memory. `name` labels the source in the report.
pub fn analyze_source(
    name: &str,
    sql: &str,
    catalog: &Catalog,
    options: &AnalysisOptions,
) -> AnalysisReport {
    let statements = parser::parse_sql(Path::new(name), sql);
    AnalysisReport::new(analyze_statements(&statements, catalog, options))
}

/// Analyze SQL files. Fails only when a file cannot be read.
pub fn analyze_files(
    files: &[PathBuf],
    catalog: &Catalog,
    options: &AnalysisOptions,
) -> Result<AnalysisReport> {
    info!(files = files.len(), tables = catalog.len(), "Analyzing SQL files");
    let statements = parser::parse_sql_files(files)?;
    info!(statements = statements.len(), "Parsed SQL statements");
    Ok(AnalysisReport::new(analyze_statements(
        &statements,
        catalog,
        options,
    )))
}

fn analyze_statements(
    statements: &[ParsedStatement],
    catalog: &Catalog,
    options: &AnalysisOptions,
) -> Vec<StatementReport> {
    let variables = batch_variables(statements);
    if statements.len() >= PARALLEL_THRESHOLD {
        statements
            .par_iter()
            .zip(variables.par_iter())
            .map(|(s, v)| analyze_statement(s, v, catalog, options))
            .collect()
    } else {
        statements
            .iter()
            .zip(&variables)
            .map(|(s, v)| analyze_statement(s, v, catalog, options))
            .collect()
    }
}

/// Variables in scope before each statement: whatever earlier statements of
/// the same file and GO batch declared or assigned
fn batch_variables(statements: &[ParsedStatement]) -> Vec<VariableEnv> {
    let mut envs = Vec::with_capacity(statements.len());
    let mut current = VariableEnv::new();
    let mut previous: Option<&ParsedStatement> = None;

    for statement in statements {
        let same_batch = previous
            .is_some_and(|p| p.source_file == statement.source_file && p.batch == statement.batch);
        if !same_batch {
            current = VariableEnv::new();
        }
        envs.push(current.clone());
        if let Ok(parsed) = &statement.parsed {
            current.apply(parsed);
        }
        previous = Some(statement);
    }
    envs
}

/// Run the rule engine and the index advisor on one parsed statement
pub fn analyze_statement(
    parsed: &ParsedStatement,
    variables: &VariableEnv,
    catalog: &Catalog,
    options: &AnalysisOptions,
) -> StatementReport {
    let file = parsed.source_file.display().to_string();
    let config = &options.rules;

    let statement = match &parsed.parsed {
        Ok(statement) => statement,
        Err(err) => {
            debug!(file = %file, statement = parsed.index, "Skipping unparsable statement: {}", err);
            return StatementReport::new(
                file,
                parsed.index,
                parsed.span,
                "INVALID",
                rules::parse_error_diagnostic(err, parsed.span, config)
                    .into_iter()
                    .collect(),
                Default::default(),
            );
        }
    };

    let profile = profile::extract_profile_with(statement, catalog, variables);
    let runtime = options
        .stats
        .as_ref()
        .and_then(|stats| stats.lookup(&parsed.source_file, parsed.index));

    let mut diagnostics = rules::evaluate(
        statement,
        parsed.span,
        &profile,
        variables,
        catalog,
        runtime,
        config,
    );
    diagnostics.extend(rules::engine_diagnostics(statement, parsed.span, &profile, config));
    let advice = advisor::recommend_with(&profile, catalog, &options.key_priority);

    debug!(
        file = %file,
        statement = parsed.index,
        kind = statement.kind_name(),
        diagnostics = diagnostics.len(),
        recommendations = advice.recommendations.len(),
        "Analyzed statement"
    );

    StatementReport::new(
        file,
        parsed.index,
        parsed.span,
        statement.kind_name(),
        diagnostics,
        advice,
    )
}
