//! JSON schema snapshots
//!
//! ```json
//! {"tables": [{"schema": "dbo", "name": "Orders",
//!   "columns": [{"name": "OrderID", "type": "INT", "nullable": false}],
//!   "primary_key": ["OrderID"],
//!   "indexes": [{"name": "IX_Orders_Date", "columns": ["OrderDate"],
//!                "included_columns": ["Price"], "unique": false}]}]}
//! ```

use serde::{Deserialize, Serialize};

use super::types::{Column, Index, Table};
use super::{Catalog, DEFAULT_SCHEMA};
use crate::error::SchemaError;
use crate::parser::ObjectName;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaSnapshot {
    #[serde(default)]
    pub tables: Vec<TableSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSnapshot {
    #[serde(default = "default_schema")]
    pub schema: String,
    pub name: String,
    #[serde(default)]
    pub columns: Vec<ColumnSnapshot>,
    #[serde(default)]
    pub primary_key: Vec<String>,
    #[serde(default)]
    pub primary_key_name: Option<String>,
    #[serde(default = "default_true")]
    pub primary_key_clustered: bool,
    #[serde(default)]
    pub indexes: Vec<IndexSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSnapshot {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    #[serde(default = "default_true")]
    pub nullable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub name: String,
    pub columns: Vec<String>,
    #[serde(default)]
    pub included_columns: Vec<String>,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub clustered: bool,
}

fn default_schema() -> String {
    DEFAULT_SCHEMA.to_string()
}

fn default_true() -> bool {
    true
}

pub(super) fn catalog_from_json(json: &str) -> Result<Catalog, SchemaError> {
    let snapshot: SchemaSnapshot =
        serde_json::from_str(json).map_err(|e| SchemaError::Invalid {
            message: format!("malformed snapshot: {}", e),
        })?;
    catalog_from_snapshot(snapshot)
}

pub(super) fn catalog_from_snapshot(snapshot: SchemaSnapshot) -> Result<Catalog, SchemaError> {
    let mut catalog = Catalog::new();

    for table in &snapshot.tables {
        let mut entry = Table::new(&table.schema, &table.name);
        entry.columns = table
            .columns
            .iter()
            .map(|c| Column {
                name: c.name.clone(),
                data_type: c.data_type.to_uppercase(),
                nullable: c.nullable,
            })
            .collect();
        catalog.add_table(entry)?;
    }

    for table in snapshot.tables {
        let name = ObjectName::new(Some(&table.schema), &table.name);
        if !table.primary_key.is_empty() {
            let pk_name = table
                .primary_key_name
                .unwrap_or_else(|| format!("PK_{}", table.name));
            catalog.add_index(
                &name,
                Index {
                    name: pk_name,
                    columns: table.primary_key,
                    included_columns: Vec::new(),
                    unique: true,
                    clustered: table.primary_key_clustered,
                    is_primary_key: true,
                },
            )?;
        }
        for index in table.indexes {
            catalog.add_index(
                &name,
                Index {
                    name: index.name,
                    columns: index.columns,
                    included_columns: index.included_columns,
                    unique: index.unique,
                    clustered: index.clustered,
                    is_primary_key: false,
                },
            )?;
        }
    }

    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_round_trip_into_catalog() {
        let json = r#"{"tables": [{"name": "Customers",
            "columns": [{"name": "CustomerID", "type": "int", "nullable": false},
                        {"name": "Name", "type": "nvarchar(100)"}],
            "primary_key": ["CustomerID"],
            "indexes": [{"name": "IX_Customers_Name", "columns": ["Name"]}]}]}"#;
        let catalog = catalog_from_json(json).unwrap();
        let table = catalog.resolve_table(None, "customers").unwrap();
        assert_eq!(table.schema, "dbo");
        assert_eq!(table.columns[1].data_type, "NVARCHAR(100)");
        assert!(table.columns[1].nullable);
        let pk = table.primary_key.as_ref().unwrap();
        assert_eq!(pk.name, "PK_Customers");
        assert!(pk.clustered);
        assert_eq!(table.indexes.len(), 1);
    }

    #[test]
    fn test_malformed_snapshot_is_invalid() {
        let err = catalog_from_json("{\"tables\": [{}]}").unwrap_err();
        assert_eq!(err.code(), "SCHEMA_INVALID");
    }

    #[test]
    fn test_snapshot_index_on_unknown_column() {
        let json = r#"{"tables": [{"name": "T", "columns": [{"name": "A", "type": "INT"}],
            "indexes": [{"name": "IX_T_B", "columns": ["B"]}]}]}"#;
        let err = catalog_from_json(json).unwrap_err();
        assert_eq!(err.code(), "SCHEMA_MISSING_COLUMN");
    }
}
