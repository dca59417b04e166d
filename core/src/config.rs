use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{NfrError, NfrResult};

/// Average month length used wherever a "month" becomes a day count.
pub const AVG_DAYS_PER_MONTH: f64 = 30.44;

// ── Matching ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchConfig {
    /// Full names seen on at least this many contracts are excluded
    /// from the Name + Postcode rule.
    pub common_name_threshold: usize,
    /// Sentinel phone numbers upstream systems use for "no phone on file".
    /// Compared after stripping everything but digits.
    pub placeholder_phones: Vec<String>,
    pub customer_id_prefix: String,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            common_name_threshold: 5,
            placeholder_phones: vec![
                "00000000000".into(),
                "01111111111".into(),
                "01234567890".into(),
                "07000000000".into(),
                "07777777777".into(),
                "99999999999".into(),
            ],
            customer_id_prefix: "CUST-".into(),
        }
    }
}

// ── Retention ──────────────────────────────────────────────────────

/// A named lookup range relative to a closed contract's end date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionWindow {
    pub label: String,
    pub backward_days: i64,
    pub forward_days: i64,
}

impl RetentionWindow {
    pub fn new(label: &str, backward_days: i64, forward_days: i64) -> Self {
        Self { label: label.to_string(), backward_days, forward_days }
    }

    /// `true` when a start date `offset_days` after the end date
    /// (negative = before) lies inside this window, bounds inclusive.
    pub fn contains_offset(&self, offset_days: i64) -> bool {
        offset_days >= -self.backward_days && offset_days <= self.forward_days
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionConfig {
    /// How far before the end date a successor may start and still count
    /// as a candidate.
    pub lookback_days: i64,
    pub windows: Vec<RetentionWindow>,
    /// Evaluate customers on the rayon pool instead of sequentially.
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

fn default_parallel() -> bool {
    true
}

impl RetentionConfig {
    /// Outer candidate bound behind the end date (`LOOKBACK`). Windows
    /// reaching further back are clamped to it.
    pub fn outer_backward_days(&self) -> i64 {
        self.lookback_days
    }

    /// Outer candidate bound after the end date (`MAX_WINDOW`).
    pub fn outer_forward_days(&self) -> i64 {
        self.windows.iter().map(|w| w.forward_days).max().unwrap_or(0)
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        let lookback = months_to_days(6);
        Self {
            lookback_days: lookback,
            windows: vec![
                RetentionWindow::new("nfr_3m", lookback, months_to_days(3)),
                RetentionWindow::new("nfr_6m", lookback, months_to_days(6)),
                RetentionWindow::new("nfr_12m", lookback, months_to_days(12)),
                RetentionWindow::new("nfr_18m", lookback, months_to_days(18)),
            ],
            parallel: true,
        }
    }
}

/// Whole months to days using the average month length, rounded.
pub fn months_to_days(months: u32) -> i64 {
    (months as f64 * AVG_DAYS_PER_MONTH).round() as i64
}

// ── Top level ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NfrConfig {
    #[serde(default)]
    pub matching: MatchConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
}

impl NfrConfig {
    /// Built-in defaults. Tests and the runner (without `--config`) use this.
    pub fn standard() -> Self {
        Self::default()
    }

    /// Load and validate a JSON config file.
    pub fn load(path: &str) -> NfrResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: NfrConfig = serde_json::from_str(&content)?;
        config.validate()?;
        log::debug!(
            "config: loaded {path} ({} windows, common-name threshold {})",
            config.retention.windows.len(),
            config.matching.common_name_threshold,
        );
        Ok(config)
    }

    pub fn validate(&self) -> NfrResult<()> {
        if self.matching.common_name_threshold == 0 {
            return Err(NfrError::config("common_name_threshold must be at least 1"));
        }
        if self.retention.lookback_days < 0 {
            return Err(NfrError::config("lookback_days must not be negative"));
        }
        if self.retention.windows.is_empty() {
            return Err(NfrError::config("at least one retention window is required"));
        }

        let mut seen = HashSet::new();
        for w in &self.retention.windows {
            if w.label.trim().is_empty() {
                return Err(NfrError::config("retention window label must not be empty"));
            }
            if !seen.insert(w.label.as_str()) {
                return Err(NfrError::config(format!(
                    "duplicate retention window label '{}'",
                    w.label
                )));
            }
            if w.backward_days < 0 || w.forward_days < 0 {
                return Err(NfrError::config(format!(
                    "retention window '{}' has a negative day offset",
                    w.label
                )));
            }
            if w.backward_days > self.retention.lookback_days {
                log::warn!(
                    "config: window '{}' reaches {} days back, clamped to lookback {}",
                    w.label,
                    w.backward_days,
                    self.retention.lookback_days,
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_config_is_valid() {
        let config = NfrConfig::standard();
        config.validate().unwrap();
        assert_eq!(config.retention.lookback_days, 183);
        assert_eq!(config.retention.outer_forward_days(), 548);
        assert_eq!(config.matching.common_name_threshold, 5);
    }

    #[test]
    fn duplicate_window_labels_are_rejected() {
        let mut config = NfrConfig::standard();
        config.retention.windows.push(RetentionWindow::new("nfr_6m", 10, 10));
        assert!(matches!(config.validate(), Err(NfrError::Config { .. })));
    }

    #[test]
    fn empty_windows_are_rejected() {
        let mut config = NfrConfig::standard();
        config.retention.windows.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn outer_backward_bound_is_the_lookback() {
        let mut config = NfrConfig::standard();
        config.retention.windows.push(RetentionWindow::new("wide_back", 400, 30));
        config.validate().unwrap();
        assert_eq!(config.retention.outer_backward_days(), 183);
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let w = RetentionWindow::new("w", 10, 30);
        assert!(w.contains_offset(30));
        assert!(w.contains_offset(-10));
        assert!(!w.contains_offset(31));
        assert!(!w.contains_offset(-11));
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let json = r#"{ "matching": { "common_name_threshold": 3,
                        "placeholder_phones": [], "customer_id_prefix": "C" } }"#;
        let config: NfrConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.matching.common_name_threshold, 3);
        assert_eq!(config.retention.windows.len(), 4);
    }
}
