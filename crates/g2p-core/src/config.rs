//! TOML configuration for alignment and decoding.
//!
//! - [`Config::default`] holds the stock settings, which the embedded
//!   [`DEFAULT_CONFIG_TOML`] spells out key by key
//! - [`Config::from_toml_str`] parses and validates user-supplied settings;
//!   missing keys fall back to the defaults

use serde::Deserialize;

use crate::CoreError;
use crate::options::GramOptions;

pub const DEFAULT_CONFIG_TOML: &str = include_str!("default_config.toml");

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub alignment: GramOptions,
    pub decoder: DecoderOptions,
}

/// Tuning knobs of the compiled transducer and its search.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DecoderOptions {
    /// N-shortest-paths beam used when more than one result is requested.
    pub nbest_beam: usize,
    /// Cost substituted for non-finite model weights.
    pub clamp_weight: f32,
    /// Cost of the arcs that keep cluster constituents reachable.
    pub fallback_weight: f32,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            nbest_beam: 500,
            clamp_weight: 999.0,
            fallback_weight: 99.0,
        }
    }
}

impl DecoderOptions {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.nbest_beam == 0 {
            return Err(CoreError::InvalidOption {
                field: "decoder.nbest_beam",
                reason: "must be positive".to_string(),
            });
        }
        if !(self.clamp_weight.is_finite() && self.clamp_weight > 0.0) {
            return Err(CoreError::InvalidOption {
                field: "decoder.clamp_weight",
                reason: format!("must be positive and finite, got {}", self.clamp_weight),
            });
        }
        if !(self.fallback_weight.is_finite() && self.fallback_weight > 0.0) {
            return Err(CoreError::InvalidOption {
                field: "decoder.fallback_weight",
                reason: format!("must be positive and finite, got {}", self.fallback_weight),
            });
        }
        if self.fallback_weight >= self.clamp_weight {
            return Err(CoreError::InvalidOption {
                field: "decoder.fallback_weight",
                reason: format!(
                    "{} must be smaller than clamp_weight ({})",
                    self.fallback_weight, self.clamp_weight
                ),
            });
        }
        Ok(())
    }
}

impl Config {
    pub fn from_toml_str(toml_str: &str) -> Result<Self, CoreError> {
        let config: Config =
            toml::from_str(toml_str).map_err(|e| CoreError::ConfigParse(e.to_string()))?;
        config.alignment.validate()?;
        config.decoder.validate()?;
        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            alignment: GramOptions::default(),
            decoder: DecoderOptions::default(),
        }
    }
}
