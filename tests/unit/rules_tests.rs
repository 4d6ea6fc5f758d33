//! Unit tests for the rule engine, run through `analyze_source`

use pretty_assertions::assert_eq;

use rust_sqladvisor::config::RuleConfig;
use rust_sqladvisor::diagnostic::{Category, Severity};
use rust_sqladvisor::runtime::{RuntimeStats, RuntimeStatsSet, StatsEntry};
use rust_sqladvisor::{analyze_source, AnalysisOptions};

use crate::common::{analyze, hits, sample_catalog};

const WORKED_EXAMPLE: &str = r#"
SELECT c.City, AVG(o.Price * o.Quantity) AS AvgOrderValue
FROM Orders o
JOIN Customers c ON o.CustomerID = c.CustomerID
WHERE o.OrderDate > DATEADD(DAY, -180, GETDATE())
GROUP BY c.City;
"#;

// ============================================================================
// SELECT_STAR
// ============================================================================

#[test]
fn test_select_star_once_per_statement_at_any_depth() {
    let report = analyze(
        "SELECT * FROM (SELECT * FROM (SELECT * FROM dbo.Orders) AS a) AS b;\n\
         SELECT Name FROM dbo.Customers;",
    );
    let star = hits(&report, "SELECT_STAR");
    assert_eq!(star.len(), 1);
    assert_eq!(star[0].severity, Severity::Warning);
    assert_eq!(star[0].category, Some(Category::Style));
}

#[test]
fn test_select_star_in_procedure_counts_per_statement() {
    let report = analyze(
        "CREATE PROCEDURE dbo.usp_List_Order AS BEGIN SET NOCOUNT ON; \
         SELECT * FROM dbo.Orders; SELECT * FROM dbo.Customers; END",
    );
    assert_eq!(hits(&report, "SELECT_STAR").len(), 2);
}

// ============================================================================
// NON_SARGABLE_PREDICATE / IMPLICIT_CONVERSION / SCALAR_FUNCTION_IN_PREDICATE
// ============================================================================

#[test]
fn test_function_wrapped_column_is_flagged() {
    for function in ["YEAR", "UPPER", "LTRIM", "ISNULL"] {
        let sql = if function == "ISNULL" {
            "SELECT Name FROM dbo.Customers WHERE ISNULL(City, '') = 'Oslo'".to_string()
        } else {
            format!("SELECT Name FROM dbo.Customers WHERE {}(City) = 'x'", function)
        };
        let report = analyze(&sql);
        let found = hits(&report, "NON_SARGABLE_PREDICATE");
        assert_eq!(found.len(), 1, "{} should make City non-SARGable", function);
        assert!(found[0].message.contains("dbo.Customers.City"), "{}", found[0].message);
    }
}

#[test]
fn test_plain_comparison_is_sargable() {
    let report = analyze(WORKED_EXAMPLE);
    assert!(hits(&report, "NON_SARGABLE_PREDICATE").is_empty());
    assert!(hits(&report, "SELECT_STAR").is_empty());
    assert!(hits(&report, "IMPLICIT_CONVERSION").is_empty());
}

#[test]
fn test_leading_wildcard_like() {
    let report = analyze("SELECT Name FROM dbo.Customers WHERE Name LIKE '%son'");
    let found = hits(&report, "NON_SARGABLE_PREDICATE");
    assert_eq!(found.len(), 1);
    assert!(found[0].suggested_fix.is_none());

    let report = analyze("SELECT Name FROM dbo.Customers WHERE Name LIKE 'Jo%'");
    assert!(hits(&report, "NON_SARGABLE_PREDICATE").is_empty());
}

#[test]
fn test_runtime_stats_escalate_to_error() {
    let sql = "SELECT Name FROM dbo.Customers WHERE YEAR(Age) = 1990";
    let stats = RuntimeStatsSet::new(vec![StatsEntry {
        file: None,
        statement: 1,
        stats: RuntimeStats {
            logical_reads: 50_000,
            cpu_millis: 120,
            elapsed_millis: 300,
        },
    }]);
    let options = AnalysisOptions {
        stats: Some(stats),
        ..Default::default()
    };
    let report = analyze_source("test.sql", sql, &sample_catalog(), &options);
    let found = hits(&report, "NON_SARGABLE_PREDICATE");
    assert_eq!(found[0].severity, Severity::Error);

    let options = AnalysisOptions {
        rules: RuleConfig::from_args(&[], &[], Some(100_000)).unwrap(),
        ..options
    };
    let report = analyze_source("test.sql", sql, &sample_catalog(), &options);
    assert_eq!(hits(&report, "NON_SARGABLE_PREDICATE")[0].severity, Severity::Warning);
}

#[test]
fn test_implicit_conversion_on_varchar_column() {
    let report = analyze("SELECT OrderID FROM dbo.Orders WHERE Code = N'ABC'");
    let found = hits(&report, "IMPLICIT_CONVERSION");
    assert_eq!(found.len(), 1);
    assert_eq!(
        found[0].message,
        "Comparison Code = N'ABC' converts between varchar and nvarchar"
    );
    // The column side is converted, so the predicate is not SARGable either
    assert_eq!(hits(&report, "NON_SARGABLE_PREDICATE").len(), 1);
}

#[test]
fn test_scalar_udf_in_where() {
    let report = analyze("SELECT Name FROM dbo.Customers WHERE dbo.fn_Score(CustomerID) > 10");
    let found = hits(&report, "SCALAR_FUNCTION_IN_PREDICATE");
    assert_eq!(found.len(), 1);
    assert!(found[0].message.contains("dbo.fn_Score"));
}

// ============================================================================
// Transactions and modifications
// ============================================================================

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

const WRAPPED_PROCEDURE: &str = r#"
CREATE PROCEDURE dbo.usp_Move_Stock
    @From INT,
    @To INT
AS
BEGIN
    SET NOCOUNT ON;
    BEGIN TRY
        BEGIN TRAN;
        UPDATE dbo.Stock SET Qty = Qty - 1 WHERE StockID = @From;
        UPDATE dbo.Stock SET Qty = Qty + 1 WHERE StockID = @To;
        COMMIT;
    END TRY
    BEGIN CATCH
        IF @@TRANCOUNT > 0 ROLLBACK;
        INSERT INTO dbo.ErrorLog (Message) VALUES (ERROR_MESSAGE());
        THROW;
    END CATCH
END
"#;

#[test]
fn test_missing_transaction_wrapper() {
    let report = analyze(UNWRAPPED_PROCEDURE);
    let found = hits(&report, "MISSING_TRANSACTION_WRAPPER");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].severity, Severity::Error);
    assert!(found[0].message.contains("2 data modifications"));
    assert!(found[0].suggested_fix.as_deref().unwrap().contains("BEGIN CATCH"));
}

#[test]
fn test_transaction_wrapper_removes_finding() {
    let report = analyze(WRAPPED_PROCEDURE);
    assert!(hits(&report, "MISSING_TRANSACTION_WRAPPER").is_empty());
    assert!(hits(&report, "MISSING_NOCOUNT").is_empty());
}

#[test]
fn test_unfiltered_modification() {
    let report = analyze("DELETE FROM dbo.Orders;\nUPDATE dbo.Stock SET Qty = 0;");
    let found = hits(&report, "UNFILTERED_MODIFICATION");
    assert_eq!(found.len(), 2);
    assert_eq!(found[0].message, "DELETE on dbo.Orders affects every row");

    let report = analyze(
        "UPDATE s SET Qty = 0 FROM dbo.Stock s JOIN dbo.Orders o ON o.ProductName = s.ProductName",
    );
    assert!(hits(&report, "UNFILTERED_MODIFICATION").is_empty());
}

#[test]
fn test_nolock_hint_and_isolation_level() {
    let report = analyze(
        "SELECT o.OrderID FROM dbo.Orders o WITH (NOLOCK) JOIN dbo.Customers c (READUNCOMMITTED) ON c.CustomerID = o.CustomerID;\n\
         SET TRANSACTION ISOLATION LEVEL READ UNCOMMITTED;",
    );
    assert_eq!(hits(&report, "NOLOCK_HINT").len(), 3);
}

// ============================================================================
// Naming, security, style
// ============================================================================

#[test]
fn test_naming_convention_tables() {
    let report = analyze("CREATE TABLE employee_data (EmployeeID INT);\nCREATE TABLE Employee (EmployeeID INT);");
    let found = hits(&report, "NAMING_CONVENTION");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].severity, Severity::Info);
    assert!(found[0].message.contains("employee_data"));
}

#[test]
fn test_naming_convention_routines() {
    let report = analyze("CREATE PROCEDURE GetCustomers AS SET NOCOUNT ON;");
    assert_eq!(hits(&report, "NAMING_CONVENTION").len(), 1);
    let report = analyze("CREATE PROCEDURE dbo.usp_Get_Customer AS SET NOCOUNT ON;");
    assert!(hits(&report, "NAMING_CONVENTION").is_empty());
}

#[test]
fn test_dynamic_sql() {
    let report = analyze(
        "CREATE PROCEDURE dbo.usp_Search_Customer @City NVARCHAR(50) AS BEGIN \
         SET NOCOUNT ON; \
         DECLARE @sql NVARCHAR(MAX) = N'SELECT Name FROM dbo.Customers WHERE City = ''' + @City + N''''; \
         EXEC (@sql); END",
    );
    let found = hits(&report, "DYNAMIC_SQL");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].category, Some(Category::Security));
}

#[test]
fn test_missing_nocount() {
    let report = analyze("CREATE PROCEDURE dbo.usp_Get_Customer AS SELECT Name FROM dbo.Customers;");
    assert_eq!(hits(&report, "MISSING_NOCOUNT").len(), 1);
}

// ============================================================================
// Engine diagnostics and configuration
// ============================================================================

#[test]
fn test_engine_diagnostics() {
    let report = analyze(
        "SELECT FROM WHERE;\n\
         WITH x AS (SELECT 1 AS n) SELECT n FROM x;\n\
         SELECT Nme FROM dbo.Customers;\n\
         SELECT Id FROM dbo.Missing;",
    );
    assert_eq!(hits(&report, "PARSE_ERROR").len(), 1);
    assert_eq!(hits(&report, "PARSE_ERROR")[0].severity, Severity::Error);
    assert_eq!(hits(&report, "UNSUPPORTED_CONSTRUCT").len(), 1);
    let unresolved = hits(&report, "UNRESOLVED_REFERENCE");
    assert_eq!(unresolved.len(), 2);
    assert!(unresolved.iter().all(|d| d.severity == Severity::Warning));
}

#[test]
fn test_rules_can_be_disabled_and_overridden() {
    let rules = RuleConfig::from_args(
        &["select_star".to_string()],
        &["UNFILTERED_MODIFICATION=error".to_string()],
        None,
    )
    .unwrap();
    let options = AnalysisOptions {
        rules,
        ..Default::default()
    };
    let report = analyze_source(
        "test.sql",
        "SELECT * FROM dbo.Orders;\nDELETE FROM dbo.Orders;",
        &sample_catalog(),
        &options,
    );
    assert!(hits(&report, "SELECT_STAR").is_empty());
    assert_eq!(hits(&report, "UNFILTERED_MODIFICATION")[0].severity, Severity::Error);
}

#[test]
fn test_unknown_rule_is_config_error() {
    assert!(RuleConfig::from_args(&["NOT_A_RULE".to_string()], &[], None).is_err());
    assert!(RuleConfig::from_args(&[], &["SELECT_STAR=loud".to_string()], None).is_err());
    assert!(RuleConfig::from_args(&[], &["SELECT_STAR".to_string()], None).is_err());
}

#[test]
fn test_analysis_is_deterministic() {
    let sql = format!("{}\n{}\n{}", WORKED_EXAMPLE, UNWRAPPED_PROCEDURE.replace("END\n", "END\nGO\n"), "SELECT * FROM dbo.Orders WHERE YEAR(OrderDate) = 2024;");
    let first = analyze(&sql);
    let second = analyze(&sql);
    assert_eq!(first, second);
    assert_eq!(
        rust_sqladvisor::report::render_json(&first).unwrap(),
        rust_sqladvisor::report::render_json(&second).unwrap()
    );
}

// ============================================================================
// Variables carried across a batch
// ============================================================================

#[test]
fn test_dynamic_sql_built_in_earlier_statement() {
    let report = analyze(
        r#"
DECLARE @sql NVARCHAR(MAX) = N'SELECT * FROM dbo.Orders WHERE Code = ''' + @in + '''';
EXEC (@sql);
"#,
    );
    let found = hits(&report, "DYNAMIC_SQL");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].span.start.line, 3);
}

#[test]
fn test_declared_variable_type_reaches_later_statement() {
    let report = analyze(
        "DECLARE @c NVARCHAR(10) = N'x';\nSELECT OrderID FROM dbo.Orders WHERE Code = @c;",
    );
    assert_eq!(hits(&report, "IMPLICIT_CONVERSION").len(), 1);
    let found = hits(&report, "NON_SARGABLE_PREDICATE");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].span.start.line, 2);
}

#[test]
fn test_variables_do_not_cross_go() {
    let report = analyze(
        "DECLARE @c NVARCHAR(10) = N'x';\nGO\nSELECT OrderID FROM dbo.Orders WHERE Code = @c;",
    );
    assert!(hits(&report, "IMPLICIT_CONVERSION").is_empty());
}

#[test]
fn test_varchar_literal_against_nvarchar_column_is_clean() {
    let report = analyze("SELECT CustomerID FROM dbo.Customers WHERE Name = 'John'");
    assert!(hits(&report, "IMPLICIT_CONVERSION").is_empty());
    assert!(hits(&report, "NON_SARGABLE_PREDICATE").is_empty());
}
