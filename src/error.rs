//! Error types for rust-sqladvisor

use std::path::PathBuf;
use thiserror::Error;

use crate::parser::Position;

/// Errors that abort a run
#[derive(Error, Debug)]
pub enum AdvisorError {
    #[error("Failed to read SQL file: {path}")]
    SqlFileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read schema file: {path}")]
    SchemaFileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read runtime stats file: {path}")]
    StatsFileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid input pattern '{pattern}': {message}")]
    InvalidInputPattern { pattern: String, message: String },

    #[error("No SQL files found for input: {input}")]
    NoInputFiles { input: String },

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// A statement that could not be parsed. Recovered per statement: the rest
/// of the file is still analysed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} (line {}, column {})", position.line, position.column)]
pub struct ParseError {
    pub message: String,
    /// Offending token text, `None` at end of input
    pub token: Option<String>,
    pub position: Position,
}

/// Schema catalog construction failures; fatal for the whole run
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Duplicate table definition: {table}")]
    DuplicateTable { table: String },

    #[error("Duplicate column {column} in table {table}")]
    DuplicateColumn { table: String, column: String },

    #[error("{object} references unknown table {table}")]
    MissingTable { object: String, table: String },

    #[error("{object} references unknown column {column} on table {table}")]
    MissingColumn {
        object: String,
        table: String,
        column: String,
    },

    #[error("Invalid schema: {message}")]
    Invalid { message: String },
}

impl SchemaError {
    /// Stable diagnostic code
    pub fn code(&self) -> &'static str {
        match self {
            SchemaError::DuplicateTable { .. } | SchemaError::DuplicateColumn { .. } => {
                "SCHEMA_CONFLICT"
            }
            SchemaError::MissingTable { .. } => "SCHEMA_MISSING_TABLE",
            SchemaError::MissingColumn { .. } => "SCHEMA_MISSING_COLUMN",
            SchemaError::Invalid { .. } => "SCHEMA_INVALID",
        }
    }
}

/// Invalid rule configuration or runtime statistics; reported before analysis starts
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Unknown rule id: {rule}")]
    UnknownRule { rule: String },

    #[error("Invalid severity '{value}' (expected info, warning or error)")]
    InvalidSeverity { value: String },

    #[error("Invalid severity override '{value}' (expected RULE=LEVEL)")]
    InvalidOverride { value: String },

    #[error("Invalid runtime stats in {path}: {message}")]
    InvalidStats { path: PathBuf, message: String },
}
