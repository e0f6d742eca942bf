//! # Engine Configuration
//!
//! Defaults applied at the input boundary and numbering formats.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     BATIDOC_DEFAULT_UNIT=m²                                            │
//! │     BATIDOC_INVOICE_PREFIX=FA                                          │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     path given on the command line                                     │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     unit "u", VAT 20 %, "Section 1", DEV / FAC yearly series           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [defaults]
//! unit = "u"
//! tax_rate = "20"
//! section_name = "Section 1"
//!
//! [numbering.quote]
//! prefix = "DEV"
//! padding = 4
//! reset = "yearly"
//!
//! [numbering.invoice]
//! prefix = "FAC"
//! padding = 4
//! reset = "yearly"
//! ```

use std::path::Path;

use batidoc_core::validation::validate_section_name;
use batidoc_core::{NormalizeDefaults, Rate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{ServiceError, ServiceResult};

// =============================================================================
// Reset Period
// =============================================================================

/// When a numbering counter starts over at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetPeriod {
    /// One counter forever: `FAC-0042`.
    Never,
    /// One counter per calendar year: `FAC-2026-0042`.
    #[default]
    Yearly,
    /// One counter per month: `FAC-2026-03-0042`.
    Monthly,
}

impl std::fmt::Display for ResetPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResetPeriod::Never => write!(f, "never"),
            ResetPeriod::Yearly => write!(f, "yearly"),
            ResetPeriod::Monthly => write!(f, "monthly"),
        }
    }
}

impl std::str::FromStr for ResetPeriod {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "never" | "none" => Ok(ResetPeriod::Never),
            "yearly" | "year" => Ok(ResetPeriod::Yearly),
            "monthly" | "month" => Ok(ResetPeriod::Monthly),
            other => Err(ServiceError::InvalidConfig(format!(
                "Unknown reset period: '{}'. Valid options: never, yearly, monthly",
                other
            ))),
        }
    }
}

// =============================================================================
// Numbering
// =============================================================================

/// Format of one reference series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberingFormat {
    pub prefix: String,

    /// Minimum digits of the counter.
    #[serde(default = "default_padding")]
    pub padding: usize,

    #[serde(default)]
    pub reset: ResetPeriod,
}

fn default_padding() -> usize {
    4
}

impl NumberingFormat {
    pub fn new(prefix: impl Into<String>) -> Self {
        NumberingFormat {
            prefix: prefix.into(),
            padding: default_padding(),
            reset: ResetPeriod::default(),
        }
    }

    fn validate(&self, series: &str) -> ServiceResult<()> {
        if self.prefix.is_empty()
            || !self
                .prefix
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(ServiceError::InvalidConfig(format!(
                "{} prefix must be non-empty ASCII letters or digits, got '{}'",
                series, self.prefix
            )));
        }
        if !(1..=10).contains(&self.padding) {
            return Err(ServiceError::InvalidConfig(format!(
                "{} padding must be between 1 and 10, got {}",
                series, self.padding
            )));
        }
        Ok(())
    }
}

/// Reference series for each document type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberingSettings {
    #[serde(default = "default_quote_format")]
    pub quote: NumberingFormat,

    #[serde(default = "default_invoice_format")]
    pub invoice: NumberingFormat,
}

fn default_quote_format() -> NumberingFormat {
    NumberingFormat::new("DEV")
}

fn default_invoice_format() -> NumberingFormat {
    NumberingFormat::new("FAC")
}

impl Default for NumberingSettings {
    fn default() -> Self {
        NumberingSettings {
            quote: default_quote_format(),
            invoice: default_invoice_format(),
        }
    }
}

// =============================================================================
// Document Defaults
// =============================================================================

/// Values filled in when incoming documents leave a field out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentDefaults {
    #[serde(default = "default_unit")]
    pub unit: String,

    /// VAT percentage (`20`, `10`, `5.5`).
    #[serde(default = "default_tax_rate")]
    pub tax_rate: Decimal,

    /// Name of the section created when leaving direct mode.
    #[serde(default = "default_section_name")]
    pub section_name: String,
}

fn default_unit() -> String {
    batidoc_core::DEFAULT_UNIT.to_string()
}

fn default_tax_rate() -> Decimal {
    batidoc_core::DEFAULT_TAX_RATE.percent()
}

fn default_section_name() -> String {
    batidoc_core::DEFAULT_SECTION_NAME.to_string()
}

impl Default for DocumentDefaults {
    fn default() -> Self {
        DocumentDefaults {
            unit: default_unit(),
            tax_rate: default_tax_rate(),
            section_name: default_section_name(),
        }
    }
}

// =============================================================================
// Engine Configuration
// =============================================================================

/// Complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub defaults: DocumentDefaults,

    #[serde(default)]
    pub numbering: NumberingSettings,
}

impl EngineConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file, if a path is given and exists
    /// 3. `BATIDOC_*` environment variables
    pub fn load(config_path: Option<&Path>) -> ServiceResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path {
            if path.exists() {
                info!(?path, "Loading engine config from file");
                let contents = std::fs::read_to_string(path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<&Path>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load engine config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ServiceResult<()> {
        if self.defaults.unit.trim().is_empty() {
            return Err(ServiceError::InvalidConfig(
                "default unit must not be empty".into(),
            ));
        }

        Rate::from_percent(self.defaults.tax_rate)
            .map_err(|e| ServiceError::InvalidConfig(format!("default tax rate: {}", e)))?;

        if self.defaults.section_name.trim().is_empty() {
            return Err(ServiceError::InvalidConfig(
                "default section name must not be empty".into(),
            ));
        }
        validate_section_name(&self.defaults.section_name)
            .map_err(|e| ServiceError::InvalidConfig(e.to_string()))?;

        self.numbering.quote.validate("quote")?;
        self.numbering.invoice.validate("invoice")?;

        if self.numbering.quote.prefix == self.numbering.invoice.prefix {
            return Err(ServiceError::InvalidConfig(format!(
                "quote and invoice series share the prefix '{}'",
                self.numbering.quote.prefix
            )));
        }

        Ok(())
    }

    /// Defaults handed to the input normalizer.
    pub fn normalize_defaults(&self) -> ServiceResult<NormalizeDefaults> {
        let tax_rate = Rate::from_percent(self.defaults.tax_rate)
            .map_err(|e| ServiceError::InvalidConfig(format!("default tax rate: {}", e)))?;
        Ok(NormalizeDefaults {
            unit: self.defaults.unit.clone(),
            tax_rate,
            section_name: self.defaults.section_name.clone(),
        })
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(unit) = var("BATIDOC_DEFAULT_UNIT") {
            debug!(unit = %unit, "Overriding default unit from environment");
            self.defaults.unit = unit;
        }

        if let Some(rate) = var("BATIDOC_DEFAULT_TAX_RATE") {
            match rate.parse::<Decimal>() {
                Ok(parsed) => self.defaults.tax_rate = parsed,
                Err(_) => warn!(rate = %rate, "Unparseable tax rate in environment"),
            }
        }

        if let Some(name) = var("BATIDOC_SECTION_NAME") {
            self.defaults.section_name = name;
        }

        if let Some(prefix) = var("BATIDOC_QUOTE_PREFIX") {
            self.numbering.quote.prefix = prefix;
        }

        if let Some(prefix) = var("BATIDOC_INVOICE_PREFIX") {
            self.numbering.invoice.prefix = prefix;
        }

        if let Some(padding) = var("BATIDOC_NUMBER_PADDING") {
            if let Ok(p) = padding.parse::<usize>() {
                self.numbering.quote.padding = p;
                self.numbering.invoice.padding = p;
            }
        }

        if let Some(reset) = var("BATIDOC_NUMBER_RESET") {
            match reset.parse::<ResetPeriod>() {
                Ok(period) => {
                    debug!(reset = %period, "Overriding numbering reset from environment");
                    self.numbering.quote.reset = period;
                    self.numbering.invoice.reset = period;
                }
                Err(_) => warn!(reset = %reset, "Unknown reset period in environment"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.defaults.unit, "u");
        assert_eq!(config.defaults.tax_rate, dec!(20));
        assert_eq!(config.defaults.section_name, "Section 1");
        assert_eq!(config.numbering.quote.prefix, "DEV");
        assert_eq!(config.numbering.invoice.prefix, "FAC");
        assert_eq!(config.numbering.invoice.reset, ResetPeriod::Yearly);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: EngineConfig = toml::from_str(
            r#"
            [defaults]
            tax_rate = "10"

            [numbering.invoice]
            prefix = "FA"
            reset = "monthly"
            "#,
        )
        .unwrap();

        assert_eq!(config.defaults.tax_rate, dec!(10));
        assert_eq!(config.defaults.unit, "u");
        assert_eq!(config.numbering.invoice.prefix, "FA");
        assert_eq!(config.numbering.invoice.padding, 4);
        assert_eq!(config.numbering.invoice.reset, ResetPeriod::Monthly);
        assert_eq!(config.numbering.quote.prefix, "DEV");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = EngineConfig::default();
        config.defaults.tax_rate = dec!(120);
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.numbering.invoice.prefix = "FAC 2".into();
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.numbering.quote.padding = 0;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.numbering.quote.prefix = "FAC".into();
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.defaults.unit = " ".into();
        assert!(matches!(config.validate(), Err(ServiceError::InvalidConfig(_))));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("BATIDOC_DEFAULT_UNIT", "m²"),
            ("BATIDOC_DEFAULT_TAX_RATE", "5.5"),
            ("BATIDOC_INVOICE_PREFIX", "FA"),
            ("BATIDOC_NUMBER_PADDING", "6"),
            ("BATIDOC_NUMBER_RESET", "never"),
        ]
        .into_iter()
        .collect();

        let mut config = EngineConfig::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.defaults.unit, "m²");
        assert_eq!(config.defaults.tax_rate, dec!(5.5));
        assert_eq!(config.numbering.invoice.prefix, "FA");
        assert_eq!(config.numbering.quote.padding, 6);
        assert_eq!(config.numbering.invoice.reset, ResetPeriod::Never);
        assert_eq!(
            config.normalize_defaults().unwrap().tax_rate,
            Rate::from_bps(550)
        );
    }

    #[test]
    fn test_bad_override_is_ignored() {
        let mut config = EngineConfig::default();
        config.apply_overrides(|key| (key == "BATIDOC_NUMBER_RESET").then(|| "weekly".to_string()));
        assert_eq!(config.numbering.quote.reset, ResetPeriod::Yearly);
    }

    #[test]
    fn test_reset_period_parsing() {
        assert_eq!("yearly".parse::<ResetPeriod>().unwrap(), ResetPeriod::Yearly);
        assert_eq!("Monthly".parse::<ResetPeriod>().unwrap(), ResetPeriod::Monthly);
        assert_eq!("none".parse::<ResetPeriod>().unwrap(), ResetPeriod::Never);
        assert!("weekly".parse::<ResetPeriod>().is_err());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let path = Path::new("/nonexistent/batidoc.toml");
        let config = EngineConfig::load_or_default(Some(path));
        assert_eq!(config.numbering.invoice.prefix, EngineConfig::default().numbering.invoice.prefix);
    }

    #[test]
    fn test_toml_serialization() {
        let toml_str = toml::to_string_pretty(&EngineConfig::default()).unwrap();
        assert!(toml_str.contains("[defaults]"));
        assert!(toml_str.contains("[numbering.quote]"));
    }
}
