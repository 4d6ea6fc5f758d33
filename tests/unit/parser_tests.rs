//! Unit tests for T-SQL script parsing
//!
//! Batches, statement segmentation, per-statement error recovery and the
//! statement shapes the analyzer depends on.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use rust_sqladvisor::parser::{
    parse_sql, parse_sql_file, BodyItem, ExecTarget, Expr, JoinKind, RoutineKind, SelectItem,
    Statement, TableConstraint, TableFactor,
};

/// Helper to create a temp SQL file with content
fn create_sql_file(content: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::with_suffix(".sql").unwrap();
    file.write_all(content).unwrap();
    file.flush().unwrap();
    file
}

fn parse(sql: &str) -> Vec<rust_sqladvisor::parser::ParsedStatement> {
    parse_sql(Path::new("test.sql"), sql)
}

fn single(sql: &str) -> Statement {
    let statements = parse(sql);
    assert_eq!(statements.len(), 1, "Expected exactly one statement in {:?}", sql);
    statements
        .into_iter()
        .next()
        .unwrap()
        .parsed
        .unwrap_or_else(|e| panic!("Failed to parse {:?}: {}", sql, e))
}

// ============================================================================
// Batch and Statement Splitting
// ============================================================================

#[test]
fn test_split_batches_basic() {
    let file = create_sql_file(b"CREATE TABLE t1 (id INT)\nGO\nCREATE TABLE t2 (id INT)");

    let statements = parse_sql_file(file.path()).unwrap();
    assert_eq!(statements.len(), 2, "Expected 2 statements from 2 batches");
    assert_eq!(statements[1].span.start.line, 3);
}

#[test]
fn test_split_batches_case_insensitive_go() {
    let sql = "SELECT 1\ngo\nSELECT 2\nGO\nSELECT 3\nGo";
    assert_eq!(parse(sql).len(), 3, "GO should be case-insensitive");
}

#[test]
fn test_statements_without_separators() {
    let sql = "SELECT Name FROM dbo.Customers\nUPDATE dbo.Stock SET Qty = 0 WHERE StockID = 1\nDELETE FROM dbo.Orders WHERE OrderID = 7";
    let statements = parse(sql);
    assert_eq!(statements.len(), 3);
    assert_eq!(
        statements.iter().map(|s| s.index).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    assert!(statements[1].sql_text.starts_with("UPDATE"));
}

#[test]
fn test_insert_select_stays_one_statement() {
    let statements = parse("INSERT INTO dbo.Archive (Id) SELECT OrderID FROM dbo.Orders;");
    assert_eq!(statements.len(), 1);
    assert!(matches!(statements[0].parsed, Ok(Statement::Insert(_))));
}

#[test]
fn test_union_stays_one_statement() {
    let stmt = single("SELECT Name FROM dbo.Customers UNION ALL SELECT ProductName FROM dbo.Orders");
    let Statement::Select(select) = stmt else {
        panic!("Expected SELECT");
    };
    assert_eq!(select.branches().len(), 2);
}

#[test]
fn test_parse_error_is_isolated() {
    let statements = parse("SELECT Name FROM dbo.Customers;\nSELECT FROM WHERE;\nSELECT City FROM dbo.Customers;");
    assert_eq!(statements.len(), 3);
    assert!(statements[0].parsed.is_ok());
    let err = statements[1].parsed.as_ref().unwrap_err();
    assert_eq!(err.position.line, 2);
    assert!(statements[2].parsed.is_ok());
}

#[test]
fn test_windows_1252_file() {
    // "Café" encoded as Windows-1252
    let file = create_sql_file(b"SELECT 'Caf\xe9' AS Name");
    let statements = parse_sql_file(file.path()).unwrap();
    assert_eq!(statements.len(), 1);
    assert!(statements[0].sql_text.contains("Café"));
}

// ============================================================================
// Query Shapes
// ============================================================================

#[test]
fn test_select_with_joins_and_hints() {
    let stmt = single(
        "SELECT o.OrderID, c.Name FROM dbo.Orders o WITH (NOLOCK) \
         LEFT JOIN dbo.Customers AS c ON c.CustomerID = o.CustomerID \
         WHERE o.Quantity > 5 ORDER BY o.OrderDate DESC",
    );
    let Statement::Select(select) = stmt else {
        panic!("Expected SELECT");
    };
    let TableFactor::Table { name, alias, hints, .. } = &select.from[0].relation else {
        panic!("Expected table factor");
    };
    assert_eq!(name.to_string(), "dbo.Orders");
    assert_eq!(alias.as_deref(), Some("o"));
    assert_eq!(hints, &vec!["NOLOCK".to_string()]);
    assert_eq!(select.from[0].joins[0].kind, JoinKind::LeftOuter);
    assert!(select.order_by[0].descending);
}

#[test]
fn test_qualified_wildcard() {
    let Statement::Select(select) = single("SELECT c.* FROM dbo.Customers c") else {
        panic!("Expected SELECT");
    };
    assert!(matches!(
        &select.projection[0],
        SelectItem::Wildcard { qualifier: Some(q), .. } if q == "c"
    ));
}

#[test]
fn test_cte_is_unsupported() {
    let stmt = single("WITH recent AS (SELECT * FROM dbo.Orders) SELECT * FROM recent");
    assert!(matches!(stmt, Statement::Unsupported { construct } if construct == "CTE"));
}

#[test]
fn test_dynamic_exec() {
    let stmt = single("EXEC ('SELECT * FROM ' + @table)");
    let Statement::Exec(exec) = stmt else {
        panic!("Expected EXEC");
    };
    assert!(matches!(exec.target, ExecTarget::Dynamic(Expr::Binary { .. })));
}

// ============================================================================
// DDL
// ============================================================================

#[test]
fn test_create_table_constraints() {
    let stmt = single(
        r#"
CREATE TABLE [dbo].[Account] (
    [AccountID] INT IDENTITY(1, 1) NOT NULL,
    [Email] NVARCHAR(255) NOT NULL UNIQUE,
    [CreatedAt] DATETIME2 NOT NULL DEFAULT GETDATE(),
    CONSTRAINT [PK_Account] PRIMARY KEY CLUSTERED ([AccountID]),
    CONSTRAINT [CK_Account_Email] CHECK ([Email] <> '')
);
"#,
    );
    let Statement::CreateTable(table) = stmt else {
        panic!("Expected CREATE TABLE");
    };
    assert_eq!(table.name.to_string(), "dbo.Account");
    assert_eq!(table.columns.len(), 3);
    assert!(!table.columns[0].nullable);
    assert!(matches!(
        table.columns[1].inline_constraint,
        Some(TableConstraint::Unique { .. })
    ));
    assert!(matches!(
        &table.constraints[0],
        TableConstraint::PrimaryKey { name: Some(n), clustered: true, .. } if n == "PK_Account"
    ));
    assert_eq!(table.constraints[1], TableConstraint::Other);
}

#[test]
fn test_create_index_with_include() {
    let stmt = single(
        "CREATE NONCLUSTERED INDEX [IX_Orders_OrderDate] ON [dbo].[Orders] ([OrderDate] DESC) INCLUDE ([Price], [Quantity])",
    );
    let Statement::CreateIndex(index) = stmt else {
        panic!("Expected CREATE INDEX");
    };
    assert_eq!(index.columns, vec!["OrderDate"]);
    assert_eq!(index.included_columns, vec!["Price", "Quantity"]);
    assert!(!index.clustered);
}

// ============================================================================
// Routines
// ============================================================================

#[test]
fn test_procedure_takes_rest_of_batch() {
    let sql = r#"
CREATE PROCEDURE dbo.usp_Get_Customer
    @CustomerID INT,
    @Total INT OUTPUT
AS
BEGIN
    SET NOCOUNT ON;
    SELECT Name FROM dbo.Customers WHERE CustomerID = @CustomerID;
    SELECT @Total = COUNT(*) FROM dbo.Orders WHERE CustomerID = @CustomerID;
END
GO
SELECT 1
"#;
    let statements = parse(sql);
    assert_eq!(statements.len(), 2);
    let Ok(Statement::ProcedureDef(def)) = &statements[0].parsed else {
        panic!("Expected procedure, got {:?}", statements[0].parsed);
    };
    assert_eq!(def.kind, RoutineKind::Procedure);
    assert_eq!(def.parameters.len(), 2);
    assert!(def.parameters[1].output);
    assert_eq!(def.statements().len(), 3);
}

#[test]
fn test_procedure_body_try_catch() {
    let sql = r#"
CREATE PROCEDURE dbo.usp_Move_Stock
AS
BEGIN
    BEGIN TRY
        BEGIN TRANSACTION;
        UPDATE dbo.Stock SET Qty = Qty - 1 WHERE StockID = 1;
        COMMIT TRANSACTION;
    END TRY
    BEGIN CATCH
        ROLLBACK TRANSACTION;
    END CATCH
END
"#;
    let Statement::ProcedureDef(def) = single(sql) else {
        panic!("Expected procedure");
    };
    let BodyItem::Block(items) = &def.body[0] else {
        panic!("Expected BEGIN ... END block, got {:?}", def.body[0]);
    };
    let BodyItem::TryCatch {
        try_block,
        catch_block,
        ..
    } = &items[0]
    else {
        panic!("Expected TRY/CATCH, got {:?}", items[0]);
    };
    assert_eq!(try_block.len(), 3);
    assert_eq!(catch_block.len(), 1);
}

#[test]
fn test_bad_body_statement_keeps_procedure() {
    let sql = "CREATE PROCEDURE dbo.usp_Do_Work AS BEGIN SELECT FROM; UPDATE dbo.Stock SET Qty = 0 WHERE StockID = 1; END";
    let Statement::ProcedureDef(def) = single(sql) else {
        panic!("Expected procedure");
    };
    assert_eq!(def.invalid_items().len(), 1);
    assert_eq!(def.statements().len(), 1);
}

#[test]
fn test_deep_nesting_is_a_parse_error() {
    let depth = 2000;
    let sql = format!(
        "SELECT Name FROM dbo.Customers WHERE Age = {}1{};\nSELECT City FROM dbo.Customers;\nSELECT 1 WHERE {}1 = 1;",
        "(".repeat(depth),
        ")".repeat(depth),
        "NOT ".repeat(depth)
    );
    let statements = parse(&sql);
    assert_eq!(statements.len(), 3);

    let err = statements[0].parsed.as_ref().unwrap_err();
    assert!(err.message.starts_with("expression nested too deeply"), "{}", err);
    assert!(statements[1].parsed.is_ok());
    assert!(statements[2].parsed.is_err());
}

#[test]
fn test_moderate_nesting_parses() {
    let sql = format!(
        "SELECT Name FROM dbo.Customers WHERE Age = {}1{}",
        "(".repeat(20),
        ")".repeat(20)
    );
    single(&sql);
}

#[test]
fn test_batch_ordinals() {
    let statements = parse("DECLARE @a INT = 1;\nSELECT @a;\nGO\nSELECT 2;");
    assert_eq!(
        statements.iter().map(|s| s.batch).collect::<Vec<_>>(),
        vec![1, 1, 2]
    );
}
