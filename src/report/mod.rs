//! Diagnostics aggregation and report rendering
//!
//! Each statement's rule diagnostics, engine diagnostics and index advice
//! are collected into a [`StatementReport`]; the run is an
//! [`AnalysisReport`] with a summary. Rendering is deterministic: the same
//! input always yields the same bytes.

mod json;
mod text;

use std::cmp::Reverse;
use std::str::FromStr;

use serde::Serialize;

use crate::advisor::{merge_recommendations, AdvisorReport, CoveredCandidate, IndexRecommendation};
use crate::diagnostic::{Diagnostic, Severity};
use crate::parser::SourceSpan;

pub use json::render_json;
pub use text::render_text;

/// Output format for the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown format '{}' (expected text or json)", other)),
        }
    }
}

/// Everything reported for one statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatementReport {
    pub file: String,
    /// 1-based ordinal within the file
    pub index: usize,
    pub span: SourceSpan,
    pub kind: String,
    pub diagnostics: Vec<Diagnostic>,
    pub recommendations: Vec<IndexRecommendation>,
    pub covered: Vec<CoveredCandidate>,
}

impl StatementReport {
    pub fn new(
        file: impl Into<String>,
        index: usize,
        span: SourceSpan,
        kind: impl Into<String>,
        diagnostics: Vec<Diagnostic>,
        advice: AdvisorReport,
    ) -> Self {
        Self {
            file: file.into(),
            index,
            span,
            kind: kind.into(),
            diagnostics: aggregate_diagnostics(diagnostics),
            recommendations: advice.recommendations,
            covered: advice.covered,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty() && self.recommendations.is_empty() && self.covered.is_empty()
    }
}

/// Remove exact duplicates and order by severity (highest first), then
/// position, rule id and message
pub fn aggregate_diagnostics(mut diagnostics: Vec<Diagnostic>) -> Vec<Diagnostic> {
    diagnostics.sort_by(|a, b| {
        let key = |d: &Diagnostic| {
            (
                Reverse(d.severity),
                d.span.start,
                d.rule_id.clone(),
                d.message.clone(),
                d.span.end,
                d.suggested_fix.clone(),
                d.category,
            )
        };
        key(a).cmp(&key(b))
    });
    diagnostics.dedup();
    diagnostics
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub files: usize,
    pub statements: usize,
    pub errors: usize,
    pub warnings: usize,
    pub infos: usize,
    /// Recommendations consolidated across all statements
    pub recommendations: Vec<IndexRecommendation>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnalysisReport {
    pub statements: Vec<StatementReport>,
    pub summary: Summary,
}

impl AnalysisReport {
    /// Build the run report; statements are expected in input order
    pub fn new(statements: Vec<StatementReport>) -> Self {
        let mut summary = Summary {
            statements: statements.len(),
            ..Default::default()
        };

        let mut files: Vec<&str> = statements.iter().map(|s| s.file.as_str()).collect();
        files.sort_unstable();
        files.dedup();
        summary.files = files.len();

        for diagnostic in statements.iter().flat_map(|s| &s.diagnostics) {
            match diagnostic.severity {
                Severity::Error => summary.errors += 1,
                Severity::Warning => summary.warnings += 1,
                Severity::Info => summary.infos += 1,
            }
        }
        summary.recommendations = merge_recommendations(
            statements
                .iter()
                .flat_map(|s| s.recommendations.iter().cloned())
                .collect(),
        );

        Self {
            statements,
            summary,
        }
    }

    pub fn max_severity(&self) -> Option<Severity> {
        self.statements
            .iter()
            .flat_map(|s| &s.diagnostics)
            .map(|d| d.severity)
            .max()
    }

    /// True when some diagnostic is at or above `threshold`; `None` never fails
    pub fn fails_at(&self, threshold: Option<Severity>) -> bool {
        match (threshold, self.max_severity()) {
            (Some(threshold), Some(max)) => max >= threshold,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Position;

    fn diag(rule: &str, severity: Severity, line: usize, message: &str) -> Diagnostic {
        let at = Position::new(line, 1);
        Diagnostic::new(rule, severity, SourceSpan::new(at, at), message)
    }

    #[test]
    fn test_aggregate_sorts_and_dedupes() {
        let sorted = aggregate_diagnostics(vec![
            diag("NAMING_CONVENTION", Severity::Info, 1, "b"),
            diag("SELECT_STAR", Severity::Warning, 5, "a"),
            diag("NON_SARGABLE_PREDICATE", Severity::Warning, 2, "a"),
            diag("SELECT_STAR", Severity::Warning, 5, "a"),
            diag("MISSING_TRANSACTION_WRAPPER", Severity::Error, 9, "c"),
        ]);
        let ids: Vec<&str> = sorted.iter().map(|d| d.rule_id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "MISSING_TRANSACTION_WRAPPER",
                "NON_SARGABLE_PREDICATE",
                "SELECT_STAR",
                "NAMING_CONVENTION"
            ]
        );
    }

    #[test]
    fn test_summary_and_fail_threshold() {
        let statement = StatementReport::new(
            "a.sql",
            1,
            SourceSpan::default(),
            "SELECT",
            vec![
                diag("SELECT_STAR", Severity::Warning, 1, "x"),
                diag("NAMING_CONVENTION", Severity::Info, 1, "y"),
            ],
            AdvisorReport::default(),
        );
        let report = AnalysisReport::new(vec![statement]);
        assert_eq!(report.summary.files, 1);
        assert_eq!(report.summary.warnings, 1);
        assert_eq!(report.summary.infos, 1);
        assert!(report.fails_at(Some(Severity::Warning)));
        assert!(!report.fails_at(Some(Severity::Error)));
        assert!(!report.fails_at(None));
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("xml".parse::<OutputFormat>().is_err());
    }
}
