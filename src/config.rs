//! Rule configuration: disabled rules, severity overrides, thresholds

use std::collections::{BTreeMap, BTreeSet};

use crate::diagnostic::{codes, Severity};
use crate::error::ConfigError;
use crate::rules::RULES;

/// Logical reads above which a non-SARGable predicate becomes an error
pub const DEFAULT_LOGICAL_READS_THRESHOLD: u64 = 10_000;

/// Per-rule configuration supplied by the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleConfig {
    disabled: BTreeSet<String>,
    severity_overrides: BTreeMap<String, Severity>,
    pub logical_reads_threshold: u64,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            disabled: BTreeSet::new(),
            severity_overrides: BTreeMap::new(),
            logical_reads_threshold: DEFAULT_LOGICAL_READS_THRESHOLD,
        }
    }
}

/// Canonical id for a rule or engine diagnostic code
fn known_id(id: &str) -> Result<String, ConfigError> {
    let upper = id.trim().to_ascii_uppercase();
    let known = RULES.iter().any(|r| r.id == upper) || codes::ALL.contains(&upper.as_str());
    if known {
        Ok(upper)
    } else {
        Err(ConfigError::UnknownRule {
            rule: id.to_string(),
        })
    }
}

impl RuleConfig {
    /// Build from CLI-style inputs: rule ids to disable and `RULE=LEVEL`
    /// overrides.
    pub fn from_args(
        disable: &[String],
        overrides: &[String],
        logical_reads_threshold: Option<u64>,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        for id in disable {
            config.disable(id)?;
        }
        for entry in overrides {
            let (rule, level) = entry
                .split_once('=')
                .ok_or_else(|| ConfigError::InvalidOverride {
                    value: entry.clone(),
                })?;
            config.set_severity(rule, level.parse()?)?;
        }
        if let Some(threshold) = logical_reads_threshold {
            config.logical_reads_threshold = threshold;
        }
        Ok(config)
    }

    pub fn disable(&mut self, rule: &str) -> Result<(), ConfigError> {
        self.disabled.insert(known_id(rule)?);
        Ok(())
    }

    pub fn set_severity(&mut self, rule: &str, severity: Severity) -> Result<(), ConfigError> {
        self.severity_overrides.insert(known_id(rule)?, severity);
        Ok(())
    }

    pub fn is_enabled(&self, rule: &str) -> bool {
        !self.disabled.contains(rule)
    }

    /// Caller override, else the default
    pub fn severity(&self, rule: &str, default: Severity) -> Severity {
        self.severity_overrides.get(rule).copied().unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_args() {
        let config = RuleConfig::from_args(
            &["select_star".to_string()],
            &["NAMING_CONVENTION=warning".to_string()],
            Some(500),
        )
        .unwrap();
        assert!(!config.is_enabled("SELECT_STAR"));
        assert!(config.is_enabled("NOLOCK_HINT"));
        assert_eq!(
            config.severity("NAMING_CONVENTION", Severity::Info),
            Severity::Warning
        );
        assert_eq!(config.severity("NOLOCK_HINT", Severity::Warning), Severity::Warning);
        assert_eq!(config.logical_reads_threshold, 500);
    }

    #[test]
    fn test_engine_codes_are_configurable() {
        let config =
            RuleConfig::from_args(&["UNRESOLVED_REFERENCE".to_string()], &[], None).unwrap();
        assert!(!config.is_enabled("UNRESOLVED_REFERENCE"));
    }

    #[test]
    fn test_config_errors() {
        assert!(matches!(
            RuleConfig::from_args(&["NO_SUCH_RULE".to_string()], &[], None),
            Err(ConfigError::UnknownRule { .. })
        ));
        assert!(matches!(
            RuleConfig::from_args(&[], &["SELECT_STAR".to_string()], None),
            Err(ConfigError::InvalidOverride { .. })
        ));
        assert!(matches!(
            RuleConfig::from_args(&[], &["SELECT_STAR=loud".to_string()], None),
            Err(ConfigError::InvalidSeverity { .. })
        ));
    }
}
