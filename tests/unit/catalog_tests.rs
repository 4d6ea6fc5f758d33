//! Unit tests for schema catalog loading

use rust_sqladvisor::catalog::{load_schema_file, Catalog, SchemaSource};
use rust_sqladvisor::error::{AdvisorError, SchemaError};

use crate::common::{sample_catalog, TestContext, SAMPLE_SCHEMA};

#[test]
fn test_sample_schema_loads() {
    let catalog = sample_catalog();
    assert_eq!(catalog.len(), 4);

    let orders = catalog.resolve_table(None, "orders").expect("Orders should resolve");
    assert_eq!(orders.qualified_name(), "dbo.Orders");
    assert_eq!(orders.column("price").map(|c| c.data_type.as_str()), Some("DECIMAL(10, 2)"));
    let pk = orders.primary_key.as_ref().expect("Orders should have a primary key");
    assert_eq!(pk.name, "PK_Orders");
    assert!(pk.clustered);

    // Inline PRIMARY KEY gets a generated name
    let stock = catalog.resolve_table(Some("dbo"), "Stock").unwrap();
    assert_eq!(stock.primary_key.as_ref().unwrap().name, "PK_Stock");
}

#[test]
fn test_indexes_covering_uses_leading_prefix() {
    let ddl = format!(
        "{}\nCREATE INDEX IX_Orders_CustomerID_OrderDate ON dbo.Orders (CustomerID, OrderDate);",
        SAMPLE_SCHEMA
    );
    let catalog = Catalog::load(&SchemaSource::Ddl(ddl)).unwrap();
    let orders = catalog.resolve_table(None, "Orders").unwrap();

    let covering = catalog.indexes_covering(orders, &["CustomerID".to_string()]);
    assert_eq!(covering.len(), 1);
    assert_eq!(covering[0].name, "IX_Orders_CustomerID_OrderDate");
    assert!(catalog
        .indexes_covering(orders, &["OrderDate".to_string()])
        .is_empty());
}

#[test]
fn test_load_ddl_and_snapshot_files() {
    let ctx = TestContext::new();
    let ddl = ctx.sample_schema();
    assert_eq!(load_schema_file(&ddl).unwrap().len(), 4);

    let snapshot = ctx.write(
        "schema.JSON",
        r#"{
  "tables": [
    {
      "schema": "sales",
      "name": "Invoice",
      "columns": [
        { "name": "InvoiceID", "type": "int", "nullable": false },
        { "name": "Total", "type": "money" }
      ],
      "primary_key": ["InvoiceID"],
      "indexes": [
        { "name": "IX_Invoice_Total", "columns": ["Total"] }
      ]
    }
  ]
}"#,
    );
    let catalog = load_schema_file(&snapshot).unwrap();
    let invoice = catalog.resolve_table(None, "Invoice").expect("unique non-dbo table resolves");
    assert_eq!(invoice.schema, "sales");
    assert_eq!(invoice.column("Total").unwrap().data_type, "MONEY");
    assert_eq!(invoice.indexes[0].name, "IX_Invoice_Total");
}

#[test]
fn test_missing_schema_file() {
    let ctx = TestContext::new();
    let err = load_schema_file(&ctx.path("nope.sql")).unwrap_err();
    assert!(matches!(err, AdvisorError::SchemaFileReadError { .. }));
}

#[test]
fn test_schema_errors_are_fatal() {
    let duplicate = "CREATE TABLE dbo.A (Id INT);\nCREATE TABLE dbo.A (Id INT);";
    let err = Catalog::load(&SchemaSource::Ddl(duplicate.to_string())).unwrap_err();
    assert_eq!(err.code(), "SCHEMA_CONFLICT");

    let missing = "CREATE INDEX IX_B_Id ON dbo.B (Id);";
    let err = Catalog::load(&SchemaSource::Ddl(missing.to_string())).unwrap_err();
    assert!(matches!(err, SchemaError::MissingTable { .. }));

    let bad_column = "CREATE TABLE dbo.A (Id INT);\nCREATE INDEX IX_A_Name ON dbo.A (Name);";
    let err = Catalog::load(&SchemaSource::Ddl(bad_column.to_string())).unwrap_err();
    assert!(matches!(err, SchemaError::MissingColumn { .. }));

    let err = Catalog::load(&SchemaSource::Snapshot("{ \"tables\": 3 }".to_string())).unwrap_err();
    assert_eq!(err.code(), "SCHEMA_INVALID");
}
