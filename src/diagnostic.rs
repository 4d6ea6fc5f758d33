//! Diagnostic records shared by the rule engine and the report

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::ConfigError;
use crate::parser::SourceSpan;

/// Diagnostic severity, ordered `Info < Warning < Error`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "info" => Ok(Severity::Info),
            "warning" | "warn" => Ok(Severity::Warning),
            "error" => Ok(Severity::Error),
            _ => Err(ConfigError::InvalidSeverity {
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Naming,
    Sargability,
    Transaction,
    Security,
    Style,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Naming => "naming",
            Category::Sargability => "sargability",
            Category::Transaction => "transaction",
            Category::Security => "security",
            Category::Style => "style",
        }
    }
}

/// Machine-readable codes of diagnostics raised by the engine itself
pub mod codes {
    pub const PARSE_ERROR: &str = "PARSE_ERROR";
    pub const UNSUPPORTED_CONSTRUCT: &str = "UNSUPPORTED_CONSTRUCT";
    pub const UNRESOLVED_REFERENCE: &str = "UNRESOLVED_REFERENCE";

    pub const ALL: &[&str] = &[PARSE_ERROR, UNSUPPORTED_CONSTRUCT, UNRESOLVED_REFERENCE];
}

/// A single finding attached to a statement
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Diagnostic {
    pub rule_id: String,
    pub severity: Severity,
    /// `None` for engine diagnostics
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    pub span: SourceSpan,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_fix: Option<String>,
}

impl Diagnostic {
    pub fn new(rule_id: impl Into<String>, severity: Severity, span: SourceSpan, message: impl Into<String>) -> Self {
        Self {
            rule_id: rule_id.into(),
            severity,
            category: None,
            span,
            message: message.into(),
            suggested_fix: None,
        }
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_fix(mut self, fix: impl Into<String>) -> Self {
        self.suggested_fix = Some(fix.into());
        self
    }
}
