//! Catalog element types

use serde::Serialize;

/// A table column
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: String,
    /// Upper-cased declared type, e.g. `NVARCHAR(50)`; empty for computed columns
    pub data_type: String,
    pub nullable: bool,
}

/// An index, unique constraint or primary key
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Index {
    pub name: String,
    /// Key columns in key order
    pub columns: Vec<String>,
    pub included_columns: Vec<String>,
    pub unique: bool,
    pub clustered: bool,
    pub is_primary_key: bool,
}

impl Index {
    /// True when the first `columns.len()` key columns equal `columns`, in order
    pub fn has_leading_key(&self, columns: &[String]) -> bool {
        columns.len() <= self.columns.len()
            && self
                .columns
                .iter()
                .zip(columns)
                .all(|(a, b)| a.eq_ignore_ascii_case(b))
    }

    /// Key or included column (a clustered index covers every column)
    pub fn covers_column(&self, column: &str) -> bool {
        self.clustered
            || self
                .columns
                .iter()
                .chain(&self.included_columns)
                .any(|c| c.eq_ignore_ascii_case(column))
    }
}

/// A table with its columns, primary key and secondary indexes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Table {
    pub schema: String,
    pub name: String,
    pub columns: Vec<Column>,
    pub primary_key: Option<Index>,
    pub indexes: Vec<Index>,
}

impl Table {
    pub fn new(schema: &str, name: &str) -> Self {
        Self {
            schema: schema.to_string(),
            name: name.to_string(),
            columns: Vec::new(),
            primary_key: None,
            indexes: Vec::new(),
        }
    }

    /// `schema.name`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }

    /// Case-insensitive column lookup
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Primary key first, then secondary indexes in declaration order
    pub fn all_indexes(&self) -> impl Iterator<Item = &Index> {
        self.primary_key.iter().chain(self.indexes.iter())
    }
}
