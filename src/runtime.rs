//! Runtime statistics attached to statements
//!
//! ```json
//! [{"file": "queries/orders.sql", "statement": 1, "logical_reads": 52000,
//!   "cpu_millis": 310, "elapsed_millis": 420}]
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{AdvisorError, ConfigError};

/// Measured cost of one statement execution
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeStats {
    pub logical_reads: u64,
    #[serde(default)]
    pub cpu_millis: u64,
    #[serde(default)]
    pub elapsed_millis: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsEntry {
    /// Matches any file when absent
    #[serde(default)]
    pub file: Option<String>,
    /// 1-based statement ordinal within the file
    pub statement: usize,
    #[serde(flatten)]
    pub stats: RuntimeStats,
}

/// All statistics loaded for a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeStatsSet {
    entries: Vec<StatsEntry>,
}

impl RuntimeStatsSet {
    pub fn new(entries: Vec<StatsEntry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stats for a statement. An entry naming the file wins over one
    /// without a file.
    pub fn lookup(&self, file: &Path, statement: usize) -> Option<&RuntimeStats> {
        let candidates = || self.entries.iter().filter(|e| e.statement == statement);
        candidates()
            .find(|e| {
                e.file
                    .as_deref()
                    .is_some_and(|f| file == Path::new(f) || file.ends_with(f))
            })
            .or_else(|| candidates().find(|e| e.file.is_none()))
            .map(|e| &e.stats)
    }

    pub fn parse(json: &str, path: &Path) -> Result<Self, ConfigError> {
        let entries: Vec<StatsEntry> =
            serde_json::from_str(json).map_err(|e| ConfigError::InvalidStats {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        if let Some(bad) = entries.iter().find(|e| e.statement == 0) {
            return Err(ConfigError::InvalidStats {
                path: path.to_path_buf(),
                message: format!(
                    "statement ordinals start at 1 (file {})",
                    bad.file.as_deref().unwrap_or("*")
                ),
            });
        }
        Ok(Self::new(entries))
    }
}

/// Read and validate a runtime statistics file
pub fn load_stats_file(path: &Path) -> Result<RuntimeStatsSet, AdvisorError> {
    let json = std::fs::read_to_string(path).map_err(|e| AdvisorError::StatsFileReadError {
        path: PathBuf::from(path),
        source: e,
    })?;
    let stats = RuntimeStatsSet::parse(&json, path)?;
    info!(file = %path.display(), entries = stats.len(), "Loaded runtime stats");
    Ok(stats)
}
