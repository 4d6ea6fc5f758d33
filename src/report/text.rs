//! Human-readable report

use super::{AnalysisReport, StatementReport};
use crate::advisor::Purpose;

fn plural(count: usize, word: &str) -> String {
    if count == 1 {
        format!("{} {}", count, word)
    } else {
        format!("{} {}s", count, word)
    }
}

fn purposes(list: &[Purpose]) -> String {
    list.iter().map(|p| p.as_str()).collect::<Vec<_>>().join(", ")
}

fn statement_lines(statement: &StatementReport, lines: &mut Vec<String>) {
    lines.push(format!(
        "{}: statement {} ({}, lines {}-{})",
        statement.file,
        statement.index,
        statement.kind,
        statement.span.start.line,
        statement.span.end.line
    ));

    for d in &statement.diagnostics {
        lines.push(format!(
            "  {}:{}: {} [{}] {}",
            d.span.start.line, d.span.start.column, d.severity, d.rule_id, d.message
        ));
        if let Some(fix) = &d.suggested_fix {
            let mut fix_lines = fix.lines();
            if let Some(first) = fix_lines.next() {
                lines.push(format!("      fix: {}", first));
            }
            for rest in fix_lines {
                lines.push(format!("           {}", rest));
            }
        }
    }

    for rec in &statement.recommendations {
        lines.push(format!("  index ({}): {}", purposes(&rec.purposes), rec.create_statement));
    }

    for note in &statement.covered {
        let mut line = format!(
            "  covered: {}.{} ({}) is served by {}",
            note.schema,
            note.table,
            note.key_columns.join(", "),
            note.existing_index
        );
        if !note.uncovered_columns.is_empty() {
            line.push_str(&format!(
                "; not included: {}",
                note.uncovered_columns.join(", ")
            ));
        }
        lines.push(line);
    }
}

/// Render the report as plain text. Statements without findings are omitted.
pub fn render_text(report: &AnalysisReport) -> String {
    let mut lines: Vec<String> = Vec::new();

    for statement in report.statements.iter().filter(|s| !s.is_clean()) {
        statement_lines(statement, &mut lines);
        lines.push(String::new());
    }

    let summary = &report.summary;
    lines.push(format!(
        "Analyzed {} and {}: {}, {}, {}",
        plural(summary.files, "file"),
        plural(summary.statements, "statement"),
        plural(summary.errors, "error"),
        plural(summary.warnings, "warning"),
        plural(summary.infos, "info")
    ));

    if !summary.recommendations.is_empty() {
        lines.push(String::new());
        lines.push(format!(
            "Index recommendations ({}):",
            summary.recommendations.len()
        ));
        for rec in &summary.recommendations {
            lines.push(format!("  {}", rec.create_statement));
        }
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}
