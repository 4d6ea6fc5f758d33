//! Tests for the rust-sqladvisor binary: exit status and output streams

use std::process::{Command, Output};

use crate::common::TestContext;

const UNWRAPPED_PROCEDURE: &str = r#"
CREATE PROCEDURE dbo.usp_Move_Stock
    @From INT,
    @To INT
AS
BEGIN
    SET NOCOUNT ON;
    UPDATE dbo.Stock SET Qty = Qty - 1 WHERE StockID = @From;
    UPDATE dbo.Stock SET Qty = Qty + 1 WHERE StockID = @To;
END
"#;

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_rust-sqladvisor"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to run rust-sqladvisor")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_clean_run_exits_zero() {
    let ctx = TestContext::new();
    let schema = ctx.sample_schema();
    let query = ctx.write("q.sql", "SELECT Name FROM dbo.Customers WHERE Age = 40;");

    let output = run(&[
        "analyze",
        query.to_str().unwrap(),
        "--schema",
        schema.to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(0), "{}", stdout(&output));
    assert!(stdout(&output).contains("IX_Customers_Age"));
}

#[test]
fn test_error_diagnostic_exits_one() {
    let ctx = TestContext::new();
    let schema = ctx.sample_schema();
    let procedure = ctx.write("usp_Move_Stock.sql", UNWRAPPED_PROCEDURE);

    let output = run(&[
        "analyze",
        procedure.to_str().unwrap(),
        "-s",
        schema.to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).contains("[MISSING_TRANSACTION_WRAPPER]"));

    let output = run(&[
        "analyze",
        procedure.to_str().unwrap(),
        "-s",
        schema.to_str().unwrap(),
        "--fail-on",
        "none",
    ]);
    assert_eq!(output.status.code(), Some(0));

    let output = run(&[
        "analyze",
        procedure.to_str().unwrap(),
        "-s",
        schema.to_str().unwrap(),
        "--severity",
        "MISSING_TRANSACTION_WRAPPER=warning",
    ]);
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn test_fatal_errors_exit_two() {
    let ctx = TestContext::new();
    let query = ctx.write("q.sql", "SELECT 1;");

    let output = run(&[
        "analyze",
        query.to_str().unwrap(),
        "--schema",
        ctx.path("missing.sql").to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Error:"));
    assert!(output.stdout.is_empty());

    let output = run(&[
        "analyze",
        query.to_str().unwrap(),
        "--schema",
        ctx.sample_schema().to_str().unwrap(),
        "--disable",
        "NO_SUCH_RULE",
    ]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_json_format() {
    let ctx = TestContext::new();
    let schema = ctx.sample_schema();
    let query = ctx.write("q.sql", "SELECT * FROM dbo.Orders;");

    let output = run(&[
        "analyze",
        query.to_str().unwrap(),
        "--schema",
        schema.to_str().unwrap(),
        "--format",
        "json",
    ]);
    assert_eq!(output.status.code(), Some(0));
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["summary"]["statements"], 1);
    assert_eq!(json["statements"][0]["diagnostics"][0]["rule_id"], "SELECT_STAR");
}

#[test]
fn test_rules_command_lists_catalog() {
    let output = run(&["rules"]);
    assert_eq!(output.status.code(), Some(0));
    let text = stdout(&output);
    for id in ["SELECT_STAR", "NON_SARGABLE_PREDICATE", "UNFILTERED_MODIFICATION"] {
        assert!(text.contains(id), "missing {} in\n{}", id, text);
    }
}
