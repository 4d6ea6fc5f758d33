//! Pipeline benchmarks for rust-sqladvisor
//!
//! Measures:
//! - Script parsing
//! - Full analysis (profile, rules, advisor) of a parsed script
//! - File-based analysis including the parallel path
//!
//! Run with: cargo bench
//! Compare against baseline: cargo bench -- --save-baseline before
//!                          (make changes)
//!                          cargo bench -- --baseline before

use std::path::{Path, PathBuf};

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rust_sqladvisor::catalog::SchemaSource;
use rust_sqladvisor::{analyze_files, analyze_source, parser, AnalysisOptions, Catalog};
use tempfile::TempDir;

const SCHEMA: &str = r#"
CREATE TABLE dbo.Customers (
    CustomerID INT NOT NULL,
    Name NVARCHAR(100) NOT NULL,
    City NVARCHAR(50) NULL,
    Age INT NULL,
    CONSTRAINT PK_Customers PRIMARY KEY CLUSTERED (CustomerID)
);
GO
CREATE TABLE dbo.Orders (
    OrderID INT NOT NULL,
    CustomerID INT NOT NULL,
    ProductName NVARCHAR(100) NULL,
    Quantity INT NOT NULL,
    Price DECIMAL(10, 2) NOT NULL,
    OrderDate DATETIME NOT NULL,
    CONSTRAINT PK_Orders PRIMARY KEY CLUSTERED (OrderID)
);
GO
"#;

/// A script mixing queries, modifications and a procedure, repeated `copies` times
fn generate_script(copies: usize) -> String {
    let mut sql = String::new();
    for i in 0..copies {
        sql.push_str(&format!(
            r#"
SELECT c.City, AVG(o.Price * o.Quantity) AS AvgOrderValue
FROM Orders o
JOIN Customers c ON o.CustomerID = c.CustomerID
WHERE o.OrderDate > DATEADD(DAY, -{days}, GETDATE())
GROUP BY c.City;
SELECT * FROM dbo.Customers WHERE YEAR(Age) = {i} OR Name LIKE '%son';
UPDATE dbo.Orders SET Quantity = Quantity + 1 WHERE OrderID = {i};
GO
CREATE PROCEDURE dbo.usp_Get_Orders_{i}
    @CustomerID INT
AS
BEGIN
    SELECT OrderID, OrderDate FROM dbo.Orders WITH (NOLOCK)
    WHERE CustomerID = @CustomerID ORDER BY OrderDate DESC;
    DELETE FROM dbo.Orders WHERE CustomerID = @CustomerID AND Quantity = 0;
END
GO
"#,
            days = 30 + i,
            i = i
        ));
    }
    sql
}

fn catalog() -> Catalog {
    Catalog::load(&SchemaSource::Ddl(SCHEMA.to_string())).unwrap()
}

fn bench_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("sql_parsing");

    for copies in [10, 100] {
        let sql = generate_script(copies);
        group.throughput(Throughput::Bytes(sql.len() as u64));
        group.bench_function(BenchmarkId::new("script", copies), |b| {
            b.iter(|| parser::parse_sql(Path::new("bench.sql"), black_box(&sql)))
        });
    }

    group.finish();
}

fn bench_analysis(c: &mut Criterion) {
    let mut group = c.benchmark_group("analysis");
    let catalog = catalog();
    let options = AnalysisOptions::default();

    for copies in [1, 10, 100] {
        let sql = generate_script(copies);
        group.bench_function(BenchmarkId::new("analyze_source", copies), |b| {
            b.iter(|| analyze_source("bench.sql", black_box(&sql), &catalog, &options))
        });
    }

    group.finish();
}

fn bench_files(c: &mut Criterion) {
    let mut group = c.benchmark_group("file_analysis");
    let catalog = catalog();
    let options = AnalysisOptions::default();

    let temp_dir = TempDir::new().unwrap();
    let files: Vec<PathBuf> = (0..32)
        .map(|i| {
            let path = temp_dir.path().join(format!("script_{:02}.sql", i));
            std::fs::write(&path, generate_script(4)).unwrap();
            path
        })
        .collect();

    group.bench_function(BenchmarkId::new("analyze_files", files.len()), |b| {
        b.iter(|| analyze_files(black_box(&files), &catalog, &options).unwrap())
    });

    group.finish();
}

criterion_group!(benches, bench_parsing, bench_analysis, bench_files);
criterion_main!(benches);
