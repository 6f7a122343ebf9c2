use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::error::Error;

pub const DEFAULT_FONT_NAME: &str = "Times New Roman";
pub const DEFAULT_FONT_SIZE: f64 = 12.0;
pub const DEFAULT_LINE_SPACING: f64 = 1.5;
pub const DEFAULT_MARGIN_LEFT: f64 = 4.0;
pub const DEFAULT_MARGIN_RIGHT: f64 = 3.0;
pub const DEFAULT_MARGIN_TOP: f64 = 3.0;
pub const DEFAULT_MARGIN_BOTTOM: f64 = 3.0;
pub const DEFAULT_MARGIN_TOLERANCE: f64 = 0.1;

/// The formatting policy for one check run. Built once, never mutated while
/// files are being checked.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RuleConfig {
    pub font_name: String,
    pub font_size: f64,
    pub line_spacing: f64,
    pub margin_left: f64,
    pub margin_right: f64,
    pub margin_top: f64,
    pub margin_bottom: f64,
    pub margin_tolerance: f64,
}

impl Default for RuleConfig {
    fn default() -> Self {
        RuleConfig {
            font_name: DEFAULT_FONT_NAME.to_string(),
            font_size: DEFAULT_FONT_SIZE,
            line_spacing: DEFAULT_LINE_SPACING,
            margin_left: DEFAULT_MARGIN_LEFT,
            margin_right: DEFAULT_MARGIN_RIGHT,
            margin_top: DEFAULT_MARGIN_TOP,
            margin_bottom: DEFAULT_MARGIN_BOTTOM,
            margin_tolerance: DEFAULT_MARGIN_TOLERANCE,
        }
    }
}

/// A stored setting that could not be used as its declared type.
#[derive(Clone, Debug, PartialEq)]
pub struct CoercionWarning {
    pub key: String,
    pub raw: String,
    pub fallback: String,
}

impl fmt::Display for CoercionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "setting '{}' has unusable value {}; using default {}",
            self.key, self.raw, self.fallback
        )
    }
}

#[derive(Clone, Copy)]
enum Bound {
    Positive,
    NonNegative,
}

impl Bound {
    fn accepts(self, v: f64) -> bool {
        v.is_finite()
            && match self {
                Bound::Positive => v > 0.0,
                Bound::NonNegative => v >= 0.0,
            }
    }
}

/// Persisted key/value settings, as written by a settings dialog or by hand.
#[derive(Clone, Debug, Default)]
pub struct Settings {
    values: toml::Table,
}

impl Settings {
    pub fn new() -> Self {
        Settings::default()
    }

    pub fn from_toml_str(s: &str) -> Result<Settings, Error> {
        let values: toml::Table = toml::from_str(s)?;
        Ok(Settings { values })
    }

    pub fn load(path: &Path) -> Result<Settings, Error> {
        let content = std::fs::read_to_string(path)?;
        Settings::from_toml_str(&content)
    }

    pub fn set(&mut self, key: &str, value: impl Into<toml::Value>) {
        self.values.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&toml::Value> {
        self.values.get(key)
    }

    /// Whether debug-level logging was requested (`extensive_logging`).
    pub fn extensive_logging(&self) -> bool {
        match self.get("extensive_logging") {
            Some(toml::Value::Boolean(b)) => *b,
            Some(toml::Value::Integer(i)) => *i != 0,
            Some(toml::Value::String(s)) => {
                matches!(s.to_ascii_lowercase().as_str(), "true" | "1" | "t" | "y" | "yes")
            }
            _ => false,
        }
    }

    fn string_or(&self, key: &str, default: &str, warnings: &mut Vec<CoercionWarning>) -> String {
        match self.get(key) {
            None => default.to_string(),
            Some(toml::Value::String(s)) if !s.trim().is_empty() => s.clone(),
            Some(other) => {
                warnings.push(CoercionWarning {
                    key: key.to_string(),
                    raw: other.to_string(),
                    fallback: format!("\"{default}\""),
                });
                default.to_string()
            }
        }
    }

    fn float_or(
        &self,
        key: &str,
        default: f64,
        bound: Bound,
        warnings: &mut Vec<CoercionWarning>,
    ) -> f64 {
        let Some(value) = self.get(key) else {
            return default;
        };
        let parsed = match value {
            toml::Value::Float(f) => Some(*f),
            toml::Value::Integer(i) => Some(*i as f64),
            toml::Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        match parsed {
            Some(v) if bound.accepts(v) => v,
            _ => {
                warnings.push(CoercionWarning {
                    key: key.to_string(),
                    raw: value.to_string(),
                    fallback: default.to_string(),
                });
                default
            }
        }
    }
}

impl RuleConfig {
    /// Resolve every rule from `settings`, falling back to the documented
    /// default for missing or unusable values.
    pub fn resolve(settings: &Settings) -> (RuleConfig, Vec<CoercionWarning>) {
        let mut warnings = Vec::new();
        let config = RuleConfig {
            font_name: settings.string_or("font_name", DEFAULT_FONT_NAME, &mut warnings),
            font_size: settings.float_or("font_size", DEFAULT_FONT_SIZE, Bound::Positive, &mut warnings),
            line_spacing: settings.float_or(
                "line_spacing",
                DEFAULT_LINE_SPACING,
                Bound::Positive,
                &mut warnings,
            ),
            margin_left: settings.float_or("margin_left", DEFAULT_MARGIN_LEFT, Bound::Positive, &mut warnings),
            margin_right: settings.float_or(
                "margin_right",
                DEFAULT_MARGIN_RIGHT,
                Bound::Positive,
                &mut warnings,
            ),
            margin_top: settings.float_or("margin_top", DEFAULT_MARGIN_TOP, Bound::Positive, &mut warnings),
            margin_bottom: settings.float_or(
                "margin_bottom",
                DEFAULT_MARGIN_BOTTOM,
                Bound::Positive,
                &mut warnings,
            ),
            margin_tolerance: settings.float_or(
                "margin_tolerance",
                DEFAULT_MARGIN_TOLERANCE,
                Bound::NonNegative,
                &mut warnings,
            ),
        };
        (config, warnings)
    }

    /// Like [`RuleConfig::resolve`], logging each fallback instead of
    /// returning it.
    pub fn from_settings(settings: &Settings) -> RuleConfig {
        let (config, warnings) = RuleConfig::resolve(settings);
        for w in &warnings {
            log::warn!("{w}");
        }
        log::debug!("rules: {config:?}");
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_settings_give_defaults() {
        let (config, warnings) = RuleConfig::resolve(&Settings::new());
        assert_eq!(config, RuleConfig::default());
        assert!(warnings.is_empty());
    }

    #[test]
    fn numeric_strings_and_integers_are_accepted() {
        let settings = Settings::from_toml_str(
            r#"
            font_name = "Arial"
            font_size = 11
            line_spacing = "2.0"
            margin_left = 3.5
            "#,
        )
        .unwrap();
        let (config, warnings) = RuleConfig::resolve(&settings);
        assert!(warnings.is_empty());
        assert_eq!(config.font_name, "Arial");
        assert_eq!(config.font_size, 11.0);
        assert_eq!(config.line_spacing, 2.0);
        assert_eq!(config.margin_left, 3.5);
        assert_eq!(config.margin_right, DEFAULT_MARGIN_RIGHT);
    }

    #[test]
    fn malformed_values_fall_back_with_warning() {
        let mut settings = Settings::new();
        settings.set("font_size", "twelve");
        settings.set("margin_tolerance", -1.0);
        settings.set("margin_top", true);
        settings.set("font_name", 42);
        let (config, warnings) = RuleConfig::resolve(&settings);
        assert_eq!(config, RuleConfig::default());
        let keys: Vec<&str> = warnings.iter().map(|w| w.key.as_str()).collect();
        assert_eq!(keys, ["font_name", "font_size", "margin_top", "margin_tolerance"]);
    }

    #[test]
    fn zero_tolerance_is_valid() {
        let mut settings = Settings::new();
        settings.set("margin_tolerance", 0.0);
        let (config, warnings) = RuleConfig::resolve(&settings);
        assert_eq!(config.margin_tolerance, 0.0);
        assert!(warnings.is_empty());
    }

    #[test]
    fn extensive_logging_flag() {
        let mut settings = Settings::new();
        assert!(!settings.extensive_logging());
        settings.set("extensive_logging", "yes");
        assert!(settings.extensive_logging());
        settings.set("extensive_logging", false);
        assert!(!settings.extensive_logging());
    }
}
