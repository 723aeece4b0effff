//! Runtime configuration for the egg hunt.
//!
//! Every field has a default so hosts can pass a partial JSON object (or
//! nothing at all) from JavaScript.

use serde::Deserialize;
use thiserror::Error;

/// Storage key used when the host does not override it.
pub const DEFAULT_STORAGE_KEY: &str = "portfolio_easter_eggs";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Birthday greeting settings (month is 1-12).
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct BirthdayConfig {
    pub name: String,
    pub month: u32,
    pub day: u32,
}

impl Default for BirthdayConfig {
    fn default() -> Self {
        Self {
            name: "Ken".to_string(),
            month: 12,
            day: 14,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct EggConfig {
    pub storage_key: String,
    /// Logo clicks needed to trigger the click-burst egg.
    pub click_threshold: u32,
    /// Quiet period after the first click before the count is dropped (ms).
    pub click_window_ms: f64,
    /// How long the secret message stays up before counting restarts (ms).
    pub click_display_ms: f64,
    pub birthday: BirthdayConfig,
    /// Name shown in the terminal banner and `about` output.
    pub owner: String,
}

impl Default for EggConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            click_threshold: 5,
            click_window_ms: 2_000.0,
            click_display_ms: 3_000.0,
            birthday: BirthdayConfig::default(),
            owner: "Ken".to_string(),
        }
    }
}

impl EggConfig {
    /// Parse and validate a JSON config. Missing fields take their defaults.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: EggConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage_key.trim().is_empty() {
            return Err(ConfigError::Invalid("storage_key must not be empty".into()));
        }
        if self.click_threshold == 0 {
            return Err(ConfigError::Invalid("click_threshold must be at least 1".into()));
        }
        if !(self.click_window_ms > 0.0 && self.click_window_ms.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "click_window_ms must be positive, got {}",
                self.click_window_ms
            )));
        }
        if !(self.click_display_ms >= 0.0 && self.click_display_ms.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "click_display_ms must be non-negative, got {}",
                self.click_display_ms
            )));
        }
        let last_day = match self.birthday.month {
            2 => 29,
            4 | 6 | 9 | 11 => 30,
            1..=12 => 31,
            _ => 0,
        };
        if !(1..=last_day).contains(&self.birthday.day) {
            return Err(ConfigError::Invalid(format!(
                "birthday {}/{} is not a calendar date",
                self.birthday.month, self.birthday.day
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = EggConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.storage_key, DEFAULT_STORAGE_KEY);
        assert_eq!(cfg.click_threshold, 5);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let cfg = EggConfig::from_json(r#"{ "click_threshold": 3, "birthday": { "day": 2 } }"#)
            .unwrap();
        assert_eq!(cfg.click_threshold, 3);
        assert_eq!(cfg.birthday.month, 12);
        assert_eq!(cfg.birthday.day, 2);
        assert_eq!(cfg.owner, "Ken");
    }

    #[test]
    fn test_rejects_zero_threshold() {
        let err = EggConfig::from_json(r#"{ "click_threshold": 0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_bad_birthday_and_garbage() {
        assert!(matches!(
            EggConfig::from_json(r#"{ "birthday": { "month": 13 } }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(EggConfig::from_json("not json"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_birthday_day_must_exist_in_month() {
        for (month, day) in [(2, 30), (2, 31), (4, 31), (6, 31), (9, 31), (11, 31), (1, 0)] {
            let raw = format!(r#"{{ "birthday": {{ "month": {month}, "day": {day} }} }}"#);
            assert!(
                matches!(EggConfig::from_json(&raw), Err(ConfigError::Invalid(_))),
                "{month}/{day} accepted"
            );
        }
        for (month, day) in [(2, 29), (4, 30), (12, 31), (1, 1)] {
            let raw = format!(r#"{{ "birthday": {{ "month": {month}, "day": {day} }} }}"#);
            assert!(EggConfig::from_json(&raw).is_ok(), "{month}/{day} rejected");
        }
    }
}
