//! Catalog construction from DDL scripts

use std::path::Path;

use tracing::{debug, info, warn};

use super::types::{Column, Index, Table};
use super::{Catalog, DEFAULT_SCHEMA};
use crate::error::{AdvisorError, SchemaError};
use crate::parser::{parse_sql, ColumnDef, ObjectName, ParsedStatement, Statement, TableConstraint};

/// Where schema metadata comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaSource {
    /// CREATE TABLE / CREATE INDEX / ALTER TABLE script
    Ddl(String),
    /// JSON snapshot, see [`super::SchemaSnapshot`]
    Snapshot(String),
}

/// Read a schema file. Files ending in `.json` are snapshots; anything else
/// is treated as a DDL script.
pub fn load_schema_file(path: &Path) -> Result<Catalog, AdvisorError> {
    let text = std::fs::read_to_string(path).map_err(|e| AdvisorError::SchemaFileReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    let is_snapshot = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let source = if is_snapshot {
        SchemaSource::Snapshot(text)
    } else {
        SchemaSource::Ddl(text)
    };

    let catalog = Catalog::load(&source)?;
    info!(
        file = %path.display(),
        tables = catalog.len(),
        "Loaded schema catalog"
    );
    Ok(catalog)
}

/// Statements that define catalog objects. A parse failure on one of these
/// makes the schema unusable; anything else in the script is skipped.
fn is_definition(statement: &ParsedStatement) -> bool {
    let head = statement.sql_text.trim_start();
    ["CREATE", "ALTER"].iter().any(|kw| {
        head.len() >= kw.len()
            && head.is_char_boundary(kw.len())
            && head[..kw.len()].eq_ignore_ascii_case(kw)
    })
}

pub(super) fn catalog_from_ddl(sql: &str) -> Result<Catalog, SchemaError> {
    let statements = parse_sql(Path::new("<schema>"), sql);
    let mut catalog = Catalog::new();
    let mut pending = Vec::new();

    // Tables first so that indexes may precede their table in the script
    for statement in &statements {
        match &statement.parsed {
            Ok(Statement::CreateTable(create)) => {
                let (table, keys) = table_from_definition(&create.name, &create.columns, &create.constraints);
                catalog.add_table(table)?;
                pending.extend(keys.into_iter().map(|k| (create.name.clone(), k)));
            }
            Ok(Statement::CreateIndex(create)) => pending.push((
                create.table.clone(),
                Index {
                    name: create.name.clone(),
                    columns: create.columns.clone(),
                    included_columns: create.included_columns.clone(),
                    unique: create.unique,
                    clustered: create.clustered,
                    is_primary_key: false,
                },
            )),
            Ok(Statement::AlterTable(alter)) => {
                if let Some(index) = alter
                    .add_constraint
                    .as_ref()
                    .and_then(|c| constraint_index(&alter.table, c))
                {
                    pending.push((alter.table.clone(), index));
                }
            }
            Ok(other) => debug!(kind = other.kind_name(), "Ignoring schema statement"),
            Err(err) if is_definition(statement) => {
                return Err(SchemaError::Invalid {
                    message: err.to_string(),
                })
            }
            Err(err) => warn!("Skipping unparseable schema statement: {}", err),
        }
    }

    for (table, index) in pending {
        catalog.add_index(&table, index)?;
    }

    Ok(catalog)
}

fn table_from_definition(
    name: &ObjectName,
    columns: &[ColumnDef],
    constraints: &[TableConstraint],
) -> (Table, Vec<Index>) {
    let schema = name.schema.as_deref().unwrap_or(DEFAULT_SCHEMA);
    let mut table = Table::new(schema, &name.name);
    let mut keys = Vec::new();

    for def in columns {
        table.columns.push(Column {
            name: def.name.clone(),
            data_type: def.data_type.clone(),
            nullable: def.nullable,
        });
        if let Some(constraint) = &def.inline_constraint {
            if let Some(index) = constraint_index(name, constraint) {
                keys.push(index);
            }
        }
    }
    keys.extend(constraints.iter().filter_map(|c| constraint_index(name, c)));

    (table, keys)
}

/// Index equivalent of a key or index constraint. Unnamed keys get the
/// names SQL Server tooling conventionally generates.
fn constraint_index(table: &ObjectName, constraint: &TableConstraint) -> Option<Index> {
    match constraint {
        TableConstraint::PrimaryKey {
            name,
            columns,
            clustered,
        } => Some(Index {
            name: name.clone().unwrap_or_else(|| format!("PK_{}", table.name)),
            columns: columns.clone(),
            included_columns: Vec::new(),
            unique: true,
            clustered: *clustered,
            is_primary_key: true,
        }),
        TableConstraint::Unique {
            name,
            columns,
            clustered,
        } => Some(Index {
            name: name
                .clone()
                .unwrap_or_else(|| format!("UQ_{}_{}", table.name, columns.join("_"))),
            columns: columns.clone(),
            included_columns: Vec::new(),
            unique: true,
            clustered: *clustered,
            is_primary_key: false,
        }),
        TableConstraint::Index {
            name,
            columns,
            included_columns,
            unique,
            clustered,
        } => Some(Index {
            name: name.clone(),
            columns: columns.clone(),
            included_columns: included_columns.clone(),
            unique: *unique,
            clustered: *clustered,
            is_primary_key: false,
        }),
        TableConstraint::Other => None,
    }
}
