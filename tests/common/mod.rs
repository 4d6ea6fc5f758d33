//! Common test utilities for rust-sqladvisor tests

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use rust_sqladvisor::catalog::SchemaSource;
use rust_sqladvisor::{analyze_source, AnalysisOptions, AnalysisReport, Catalog, Diagnostic};

/// Schema shared by most tests: the worked-example tables plus a few
/// tables used by procedure tests
pub const SAMPLE_SCHEMA: &str = r#"
CREATE TABLE [dbo].[Customers] (
    [CustomerID] INT NOT NULL,
    [Name] NVARCHAR(100) NOT NULL,
    [City] NVARCHAR(50) NULL,
    [Age] INT NULL,
    CONSTRAINT [PK_Customers] PRIMARY KEY CLUSTERED ([CustomerID])
);
GO

CREATE TABLE [dbo].[Orders] (
    [OrderID] INT NOT NULL,
    [CustomerID] INT NOT NULL,
    [ProductName] NVARCHAR(100) NULL,
    [Quantity] INT NOT NULL,
    [Price] DECIMAL(10, 2) NOT NULL,
    [OrderDate] DATETIME NOT NULL,
    [Code] VARCHAR(20) NULL,
    CONSTRAINT [PK_Orders] PRIMARY KEY CLUSTERED ([OrderID])
);
GO

CREATE TABLE [dbo].[Stock] (
    [StockID] INT NOT NULL PRIMARY KEY,
    [ProductName] NVARCHAR(100) NOT NULL,
    [Qty] INT NOT NULL
);
GO

CREATE TABLE [dbo].[ErrorLog] (
    [ErrorLogID] INT IDENTITY(1, 1) NOT NULL PRIMARY KEY,
    [Message] NVARCHAR(4000) NULL
);
GO
"#;

/// Test context with a temporary directory for isolated file-based tests
pub struct TestContext {
    /// Kept to prevent temp directory cleanup until TestContext is dropped
    _temp_dir: TempDir,
    pub root: PathBuf,
}

impl TestContext {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path().to_path_buf();
        Self {
            _temp_dir: temp_dir,
            root,
        }
    }

    /// Write `content` to `relative` under the context root, creating parents
    pub fn write(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create directory");
        }
        fs::write(&path, content).expect("Failed to write file");
        path
    }

    /// Write the sample schema as DDL and return its path
    pub fn sample_schema(&self) -> PathBuf {
        self.write("schema.sql", SAMPLE_SCHEMA)
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }
}

pub fn sample_catalog() -> Catalog {
    Catalog::load(&SchemaSource::Ddl(SAMPLE_SCHEMA.to_string())).expect("Sample schema should load")
}

/// Analyze inline SQL against the sample schema with default options
pub fn analyze(sql: &str) -> AnalysisReport {
    analyze_source("test.sql", sql, &sample_catalog(), &AnalysisOptions::default())
}

/// Every diagnostic with the given rule id
pub fn hits<'a>(report: &'a AnalysisReport, rule_id: &str) -> Vec<&'a Diagnostic> {
    report
        .statements
        .iter()
        .flat_map(|s| &s.diagnostics)
        .filter(|d| d.rule_id == rule_id)
        .collect()
}

pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
