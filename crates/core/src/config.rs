//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into core
//! services as `Arc<CoreConfig>`. Services never read environment variables while
//! handling a request.

use crate::constants::{
    DEFAULT_CRITICAL_STAY_DAYS, DEFAULT_LONG_STAY_DAYS, DEFAULT_OVERDUE_STEPS_HIGH,
};
use crate::{WardError, WardResult};
use std::path::{Path, PathBuf};

/// Thresholds used by the alert engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AlertThresholds {
    /// Stays longer than this many whole days raise `long_stay`.
    pub long_stay_days: i64,
    /// Stays longer than this many whole days make `long_stay` critical.
    pub critical_stay_days: i64,
    /// Overdue step totals above this make `overdue_step` high severity.
    pub overdue_steps_high: u32,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            long_stay_days: DEFAULT_LONG_STAY_DAYS,
            critical_stay_days: DEFAULT_CRITICAL_STAY_DAYS,
            overdue_steps_high: DEFAULT_OVERDUE_STEPS_HIGH,
        }
    }
}

impl AlertThresholds {
    /// Checks the thresholds are usable.
    ///
    /// # Errors
    ///
    /// Returns [`WardError::ConfigurationError`] if a stay threshold is negative or the
    /// critical threshold does not exceed the long-stay threshold.
    pub fn validate(&self) -> WardResult<()> {
        if self.long_stay_days < 0 {
            return Err(WardError::ConfigurationError(
                "long_stay_days cannot be negative".into(),
            ));
        }
        if self.critical_stay_days <= self.long_stay_days {
            return Err(WardError::ConfigurationError(format!(
                "critical_stay_days ({}) must exceed long_stay_days ({})",
                self.critical_stay_days, self.long_stay_days
            )));
        }
        Ok(())
    }
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: PathBuf,
    thresholds: AlertThresholds,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`WardError::ConfigurationError`] if the thresholds are inconsistent.
    pub fn new(data_dir: PathBuf, thresholds: AlertThresholds) -> WardResult<Self> {
        thresholds.validate()?;
        Ok(Self {
            data_dir,
            thresholds,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn thresholds(&self) -> AlertThresholds {
        self.thresholds
    }
}

/// Build [`AlertThresholds`] from optional raw values (typically environment variables).
///
/// `None`, empty or whitespace-only values fall back to the defaults.
///
/// # Errors
///
/// Returns [`WardError::ConfigurationError`] if a value is not a number or the resulting
/// thresholds are inconsistent.
pub fn alert_thresholds_from_env_values(
    long_stay_days: Option<String>,
    critical_stay_days: Option<String>,
    overdue_steps_high: Option<String>,
) -> WardResult<AlertThresholds> {
    fn parse<T: std::str::FromStr>(name: &str, value: Option<String>) -> WardResult<Option<T>> {
        let value = value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        value
            .map(|v| {
                v.parse::<T>().map_err(|_| {
                    WardError::ConfigurationError(format!("{name} is not a valid number: '{v}'"))
                })
            })
            .transpose()
    }

    let defaults = AlertThresholds::default();
    let thresholds = AlertThresholds {
        long_stay_days: parse("WARD_LONG_STAY_DAYS", long_stay_days)?
            .unwrap_or(defaults.long_stay_days),
        critical_stay_days: parse("WARD_CRITICAL_STAY_DAYS", critical_stay_days)?
            .unwrap_or(defaults.critical_stay_days),
        overdue_steps_high: parse("WARD_OVERDUE_STEPS_HIGH", overdue_steps_high)?
            .unwrap_or(defaults.overdue_steps_high),
    };
    thresholds.validate()?;
    Ok(thresholds)
}
