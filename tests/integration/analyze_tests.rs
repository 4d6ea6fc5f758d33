//! Integration tests for analyzing SQL files on disk

use pretty_assertions::assert_eq;

use rust_sqladvisor::catalog::load_schema_file;
use rust_sqladvisor::input::collect_sql_files;
use rust_sqladvisor::report::{render_json, render_text};
use rust_sqladvisor::runtime::load_stats_file;
use rust_sqladvisor::{analyze_files, AdvisorError, AnalysisOptions, Severity};

use crate::common::{file_name, TestContext};

const ORDERS_SQL: &str = "SELECT OrderID FROM dbo.Orders WHERE YEAR(OrderDate) = 2024;\n\
SELECT ProductName FROM dbo.Orders WHERE CustomerID = @id;\n";

const CUSTOMERS_SQL: &str = "SELECT * FROM dbo.Customers WHERE City = N'Oslo';\n";

fn write_project(ctx: &TestContext) {
    ctx.write("queries/orders.sql", ORDERS_SQL);
    ctx.write("queries/reports/customers.sql", CUSTOMERS_SQL);
    ctx.write("queries/bin/generated.sql", "SELECT * FROM dbo.Orders;");
    ctx.write("queries/notes.txt", "not sql");
}

#[test]
fn test_analyze_directory() {
    let ctx = TestContext::new();
    write_project(&ctx);
    let catalog = load_schema_file(&ctx.sample_schema()).unwrap();

    let files = collect_sql_files(&[ctx.path("queries").to_string_lossy().into_owned()]).unwrap();
    let names: Vec<String> = files.iter().map(|f| file_name(f)).collect();
    assert_eq!(names, vec!["orders.sql", "customers.sql"]);

    let report = analyze_files(&files, &catalog, &AnalysisOptions::default()).unwrap();
    assert_eq!(report.summary.files, 2);
    assert_eq!(report.summary.statements, 3);
    assert_eq!(report.summary.errors, 0);
    // NON_SARGABLE_PREDICATE in orders.sql, SELECT_STAR in customers.sql
    assert_eq!(report.summary.warnings, 2);
    assert_eq!(report.max_severity(), Some(Severity::Warning));
    assert!(!report.fails_at(Some(Severity::Error)));
    assert!(report.fails_at(Some(Severity::Warning)));
    assert!(!report.fails_at(None));
}

#[test]
fn test_analyze_glob_pattern() {
    let ctx = TestContext::new();
    write_project(&ctx);
    let pattern = format!("{}/queries/*.sql", ctx.root.display());
    let files = collect_sql_files(&[pattern]).unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(file_name(&files[0]), "orders.sql");

    let err = collect_sql_files(&[format!("{}/none/*.sql", ctx.root.display())]).unwrap_err();
    assert!(matches!(err, AdvisorError::NoInputFiles { .. }));
}

#[test]
fn test_runtime_stats_match_file_and_ordinal() {
    let ctx = TestContext::new();
    let orders = ctx.write("queries/orders.sql", ORDERS_SQL);
    let stats = ctx.write(
        "stats.json",
        r#"[
  {"file": "queries/orders.sql", "statement": 1, "logical_reads": 250000, "cpu_millis": 900},
  {"file": "queries/orders.sql", "statement": 2, "logical_reads": 12}
]"#,
    );
    let catalog = load_schema_file(&ctx.sample_schema()).unwrap();
    let options = AnalysisOptions {
        stats: Some(load_stats_file(&stats).unwrap()),
        ..Default::default()
    };

    let report = analyze_files(&[orders], &catalog, &options).unwrap();
    let first = &report.statements[0];
    assert_eq!(first.diagnostics[0].rule_id, "NON_SARGABLE_PREDICATE");
    assert_eq!(first.diagnostics[0].severity, Severity::Error);
    assert_eq!(report.summary.errors, 1);
}

#[test]
fn test_unreadable_stats_file() {
    let ctx = TestContext::new();
    let err = load_stats_file(&ctx.path("missing.json")).unwrap_err();
    assert!(matches!(err, AdvisorError::StatsFileReadError { .. }));

    let bad = ctx.write("stats.json", "{ not json");
    let err = load_stats_file(&bad).unwrap_err();
    assert!(matches!(err, AdvisorError::Config(_)));
}

#[test]
fn test_parse_errors_do_not_stop_the_file() {
    let ctx = TestContext::new();
    let file = ctx.write(
        "broken.sql",
        "SELECT Name FROM dbo.Customers WHERE CustomerID = 1;\nSELECT FROM WHERE;\nDELETE FROM dbo.Orders;\n",
    );
    let catalog = load_schema_file(&ctx.sample_schema()).unwrap();
    let report = analyze_files(&[file], &catalog, &AnalysisOptions::default()).unwrap();

    assert_eq!(report.statements.len(), 3);
    assert_eq!(report.statements[1].kind, "INVALID");
    assert_eq!(report.statements[1].diagnostics[0].rule_id, "PARSE_ERROR");
    assert_eq!(
        report.statements[2].diagnostics[0].rule_id,
        "UNFILTERED_MODIFICATION"
    );
}

#[test]
fn test_json_report_shape() {
    let ctx = TestContext::new();
    let file = ctx.write("customers.sql", CUSTOMERS_SQL);
    let catalog = load_schema_file(&ctx.sample_schema()).unwrap();
    let report = analyze_files(&[file], &catalog, &AnalysisOptions::default()).unwrap();

    let json: serde_json::Value = serde_json::from_str(&render_json(&report).unwrap()).unwrap();
    let statement = &json["statements"][0];
    assert_eq!(statement["index"], 1);
    assert_eq!(statement["diagnostics"][0]["rule_id"], "SELECT_STAR");
    assert_eq!(statement["diagnostics"][0]["severity"], "warning");
    assert_eq!(
        statement["recommendations"][0]["name"],
        "IX_Customers_City"
    );
    assert_eq!(json["summary"]["warnings"], 1);
}

#[test]
fn test_text_report_lists_findings_and_summary() {
    let ctx = TestContext::new();
    let file = ctx.write("customers.sql", CUSTOMERS_SQL);
    let catalog = load_schema_file(&ctx.sample_schema()).unwrap();
    let report = analyze_files(&[file], &catalog, &AnalysisOptions::default()).unwrap();

    let text = render_text(&report);
    assert!(text.contains("[SELECT_STAR]"), "{}", text);
    assert!(text.contains("CREATE NONCLUSTERED INDEX [IX_Customers_City]"), "{}", text);
    assert!(text.contains("Analyzed 1 file and 1 statement: 0 errors, 1 warning, 0 infos"), "{}", text);
    assert_eq!(render_text(&report), text);
}
