//! Runtime configuration.
//!
//! Sources, later ones overriding earlier ones: built-in defaults, an optional
//! `splitter.toml` (or the file passed in), then `SPLITTER_*` environment
//! variables.

use crate::engine::DEFAULT_ROUNDING_TOLERANCE;
use crate::money::Money;
use config::{Config, ConfigError, Environment, File as ConfigFile};
use log::warn;
use serde::Deserialize;
use std::path::Path;

/// Default base name of the configuration file.
pub const CONFIG_FILE_NAME: &str = "splitter";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SplitterConfig {
    /// Allowed gap between summed individual totals and the assigned subtotal
    /// before a rounding note is emitted.
    pub rounding_tolerance: f64,

    /// Lines with more units than this are not expanded.
    pub max_units_per_line: u32,

    /// Prefix for amounts in the report.
    pub currency_symbol: String,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        SplitterConfig {
            rounding_tolerance: 0.01,
            max_units_per_line: 10_000,
            currency_symbol: String::new(),
        }
    }
}

impl SplitterConfig {
    /// Rounding tolerance as money. Negative or non-finite values fall back to
    /// the default.
    pub fn tolerance(&self) -> Money {
        match Money::from_f64(self.rounding_tolerance) {
            Some(tolerance) if !tolerance.is_negative() => tolerance,
            _ => {
                warn!(
                    "Ignoring invalid rounding_tolerance {}, using {}",
                    self.rounding_tolerance, DEFAULT_ROUNDING_TOLERANCE
                );
                DEFAULT_ROUNDING_TOLERANCE
            }
        }
    }
}

/// Loads configuration from `path` (or `splitter.toml` in the working
/// directory when `None`) and the environment.
pub fn load_configuration(path: Option<&Path>) -> Result<SplitterConfig, ConfigError> {
    let defaults = SplitterConfig::default();
    let file = match path {
        Some(path) => ConfigFile::from(path).required(true),
        None => ConfigFile::with_name(CONFIG_FILE_NAME).required(false),
    };

    Config::builder()
        .set_default("rounding_tolerance", defaults.rounding_tolerance)?
        .set_default("max_units_per_line", i64::from(defaults.max_units_per_line))?
        .set_default("currency_symbol", defaults.currency_symbol)?
        .add_source(file)
        .add_source(Environment::with_prefix("SPLITTER").try_parsing(true))
        .build()?
        .try_deserialize::<SplitterConfig>()
}
