//! Schema catalog: tables, columns, keys and indexes
//!
//! Built once per run from DDL or a JSON snapshot and shared read-only by
//! every analysis worker.

mod loader;
mod snapshot;
mod types;

use std::collections::BTreeMap;

pub use loader::{load_schema_file, SchemaSource};
pub use snapshot::{ColumnSnapshot, IndexSnapshot, SchemaSnapshot, TableSnapshot};
pub use types::{Column, Index, Table};

use crate::error::SchemaError;
use crate::parser::ObjectName;

/// Schema used for unqualified names
pub const DEFAULT_SCHEMA: &str = "dbo";

/// Outcome of resolving a column reference against a table name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution<'a> {
    Column {
        table: &'a Table,
        column: &'a Column,
    },
    UnresolvedTable,
    UnresolvedColumn {
        table: &'a Table,
    },
}

/// Case-insensitive table catalog
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    /// Keyed by lower-cased (schema, name)
    tables: BTreeMap<(String, String), Table>,
}

fn key(schema: &str, name: &str) -> (String, String) {
    (schema.to_lowercase(), name.to_lowercase())
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from DDL text or a JSON snapshot
    pub fn load(source: &SchemaSource) -> Result<Self, SchemaError> {
        match source {
            SchemaSource::Ddl(sql) => loader::catalog_from_ddl(sql),
            SchemaSource::Snapshot(json) => snapshot::catalog_from_json(json),
        }
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Tables ordered by schema then name
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    /// Add a table, rejecting duplicate tables and duplicate columns
    pub fn add_table(&mut self, table: Table) -> Result<(), SchemaError> {
        let k = key(&table.schema, &table.name);
        if self.tables.contains_key(&k) {
            return Err(SchemaError::DuplicateTable {
                table: table.qualified_name(),
            });
        }
        for (i, column) in table.columns.iter().enumerate() {
            if table.columns[..i]
                .iter()
                .any(|c| c.name.eq_ignore_ascii_case(&column.name))
            {
                return Err(SchemaError::DuplicateColumn {
                    table: table.qualified_name(),
                    column: column.name.clone(),
                });
            }
        }
        self.tables.insert(k, table);
        Ok(())
    }

    /// Attach an index or key to an existing table. Primary keys replace any
    /// previous key and make their columns NOT NULL.
    pub fn add_index(&mut self, table: &ObjectName, index: Index) -> Result<(), SchemaError> {
        let missing = || SchemaError::MissingTable {
            object: index.name.clone(),
            table: table.to_string(),
        };
        let k = self
            .resolve_object(table)
            .map(|t| key(&t.schema, &t.name))
            .ok_or_else(missing)?;
        let entry = self.tables.get_mut(&k).ok_or_else(missing)?;

        for column in index.columns.iter().chain(&index.included_columns) {
            if entry.column(column).is_none() {
                return Err(SchemaError::MissingColumn {
                    object: index.name.clone(),
                    table: entry.qualified_name(),
                    column: column.clone(),
                });
            }
        }

        if index.is_primary_key {
            for column in entry.columns.iter_mut() {
                if index.columns.iter().any(|c| c.eq_ignore_ascii_case(&column.name)) {
                    column.nullable = false;
                }
            }
            entry.primary_key = Some(index);
        } else {
            entry.indexes.push(index);
        }
        Ok(())
    }

    /// Look a table up by name. Unqualified names prefer `dbo`, then a
    /// table with that name in exactly one other schema.
    pub fn resolve_table(&self, schema: Option<&str>, name: &str) -> Option<&Table> {
        if let Some(schema) = schema {
            return self.tables.get(&key(schema, name));
        }
        if let Some(table) = self.tables.get(&key(DEFAULT_SCHEMA, name)) {
            return Some(table);
        }
        let mut matches = self
            .tables
            .values()
            .filter(|t| t.name.eq_ignore_ascii_case(name));
        match (matches.next(), matches.next()) {
            (Some(table), None) => Some(table),
            _ => None,
        }
    }

    pub fn resolve_object(&self, name: &ObjectName) -> Option<&Table> {
        self.resolve_table(name.schema.as_deref(), &name.name)
    }

    /// Resolve `column` on the table called `table`
    pub fn resolve_column(&self, table: &ObjectName, column: &str) -> Resolution<'_> {
        match self.resolve_object(table) {
            None => Resolution::UnresolvedTable,
            Some(t) => match t.column(column) {
                Some(c) => Resolution::Column {
                    table: t,
                    column: c,
                },
                None => Resolution::UnresolvedColumn { table: t },
            },
        }
    }

    /// Existing indexes (primary key included) whose leading key columns
    /// equal `columns` in order
    pub fn indexes_covering<'a>(&self, table: &'a Table, columns: &[String]) -> Vec<&'a Index> {
        if columns.is_empty() {
            return Vec::new();
        }
        table
            .all_indexes()
            .filter(|index| index.has_leading_key(columns))
            .collect()
    }
}
