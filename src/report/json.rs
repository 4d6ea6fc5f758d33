//! JSON report

use super::AnalysisReport;

/// Render the report as pretty-printed JSON
pub fn render_json(report: &AnalysisReport) -> Result<String, serde_json::Error> {
    let mut out = serde_json::to_string_pretty(report)?;
    out.push('\n');
    Ok(out)
}
