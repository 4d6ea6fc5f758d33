//! Unit tests for index advice, run through `analyze_source`

use pretty_assertions::assert_eq;

use rust_sqladvisor::advisor::{KeySource, Purpose};
use rust_sqladvisor::{analyze_source, AnalysisOptions, KeyPriority};

use crate::common::{analyze, sample_catalog};

#[test]
fn test_worked_example_recommendation() {
    let report = analyze(
        r#"
SELECT c.City, AVG(o.Price * o.Quantity) AS AvgOrderValue
FROM Orders o
JOIN Customers c ON o.CustomerID = c.CustomerID
WHERE o.OrderDate > DATEADD(DAY, -180, GETDATE())
GROUP BY c.City;
"#,
    );
    let statement = &report.statements[0];
    assert_eq!(statement.recommendations.len(), 1);

    let rec = &statement.recommendations[0];
    assert_eq!(rec.name, "IX_Orders_OrderDate");
    assert_eq!(rec.included_columns, vec!["CustomerID", "Price", "Quantity"]);
    assert_eq!(rec.purposes, vec![Purpose::Predicate, Purpose::Covering]);

    // The join key on Customers is the clustered primary key
    assert_eq!(statement.covered.len(), 1);
    assert_eq!(statement.covered[0].existing_index, "PK_Customers");

    assert_eq!(report.summary.recommendations, statement.recommendations);
}

#[test]
fn test_summary_merges_prefix_compatible_statements() {
    let report = analyze(
        "SELECT ProductName FROM dbo.Orders WHERE CustomerID = @id;\n\
         SELECT Quantity FROM dbo.Orders WHERE CustomerID = @id AND OrderDate > '2024-01-01';",
    );
    assert_eq!(report.statements[0].recommendations[0].key_columns, vec!["CustomerID"]);
    assert_eq!(
        report.statements[1].recommendations[0].key_columns,
        vec!["CustomerID", "OrderDate"]
    );

    assert_eq!(report.summary.recommendations.len(), 1);
    let merged = &report.summary.recommendations[0];
    assert_eq!(merged.key_columns, vec!["CustomerID", "OrderDate"]);
    assert_eq!(merged.included_columns, vec!["ProductName", "Quantity"]);
    assert_eq!(
        merged.create_statement,
        "CREATE NONCLUSTERED INDEX [IX_Orders_CustomerID_OrderDate] ON [dbo].[Orders] \
         ([CustomerID], [OrderDate]) INCLUDE ([ProductName], [Quantity]);"
    );
}

#[test]
fn test_incompatible_keys_stay_separate() {
    let report = analyze(
        "SELECT Name FROM dbo.Customers WHERE City = 'Oslo';\n\
         SELECT Name FROM dbo.Customers WHERE Age = 30;",
    );
    let keys: Vec<_> = report
        .summary
        .recommendations
        .iter()
        .map(|r| r.key_columns.clone())
        .collect();
    assert_eq!(keys, vec![vec!["Age".to_string()], vec!["City".to_string()]]);
}

#[test]
fn test_existing_index_reports_uncovered_columns() {
    let report = analyze("SELECT Name, Age FROM dbo.Customers WHERE CustomerID = 7");
    let statement = &report.statements[0];
    assert!(statement.recommendations.is_empty());
    // Clustered indexes carry every column
    assert_eq!(statement.covered[0].existing_index, "PK_Customers");
    assert!(statement.covered[0].uncovered_columns.is_empty());
}

#[test]
fn test_order_by_priority_is_configurable() {
    let sql = "SELECT Name FROM dbo.Customers WHERE City = 'Oslo' ORDER BY Age";
    let default = analyze(sql);
    assert_eq!(
        default.statements[0].recommendations[0].key_columns,
        vec!["City", "Age"]
    );

    let options = AnalysisOptions {
        key_priority: KeyPriority {
            order: vec![KeySource::OrderBy, KeySource::Equality],
        },
        ..Default::default()
    };
    let custom = analyze_source("test.sql", sql, &sample_catalog(), &options);
    assert_eq!(
        custom.statements[0].recommendations[0].key_columns,
        vec!["Age", "City"]
    );
}

#[test]
fn test_unknown_tables_get_no_advice() {
    let report = analyze("SELECT Total FROM dbo.Invoice WHERE InvoiceID = 1");
    assert!(report.statements[0].recommendations.is_empty());
    assert!(report.statements[0].covered.is_empty());
}

#[test]
fn test_advice_is_deterministic() {
    let sql = "SELECT o.ProductName, c.Name FROM dbo.Orders o \
               JOIN dbo.Customers c ON c.CustomerID = o.CustomerID \
               WHERE o.Quantity > 3 AND c.City = 'Bergen' ORDER BY o.OrderDate";
    let first = analyze(sql);
    for _ in 0..5 {
        assert_eq!(analyze(sql), first);
    }
}
