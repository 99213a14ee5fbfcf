//! # Engine Configuration
//!
//! Tunable numeric parameters of the cascade, confidence and output
//! layers. Every field has a default from [`primitives`](crate::primitives),
//! so a data pack only needs to name the values it overrides.

use serde::{Deserialize, Serialize};

use crate::CascadeError;
use crate::primitives::{
    DEFAULT_TOP_FINDINGS, DEFAULT_TOP_SUGGESTIONS, DEPTH_DECAY, FLAGGED_FACTOR, FRAGILE_PENALTY,
    INCONSISTENT_FACTOR, INVALID_FACTOR, MAX_ITERATIONS, MODERATE_PENALTY,
};

/// Engine parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Hard cap on cascade passes.
    pub max_iterations: usize,
    /// Confidence discount per cascade level beyond the first.
    pub depth_decay: f64,
    pub moderate_penalty: f64,
    pub fragile_penalty: f64,
    /// Consistency factor when validation status is `review_recommended`.
    pub flagged_factor: f64,
    pub inconsistent_factor: f64,
    pub invalid_factor: f64,
    /// Confidence boost when a value sits within 2 SD of its prior.
    pub prior_boost: f64,
    /// Discount when a value sits between 2 and 3 SD from its prior.
    pub prior_mild_discount: f64,
    /// Discount when a value sits beyond 3 SD from its prior.
    pub prior_strong_discount: f64,
    pub top_findings: usize,
    pub top_suggestions: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_iterations: MAX_ITERATIONS,
            depth_decay: DEPTH_DECAY,
            moderate_penalty: MODERATE_PENALTY,
            fragile_penalty: FRAGILE_PENALTY,
            flagged_factor: FLAGGED_FACTOR,
            inconsistent_factor: INCONSISTENT_FACTOR,
            invalid_factor: INVALID_FACTOR,
            prior_boost: 1.02,
            prior_mild_discount: 0.95,
            prior_strong_discount: 0.85,
            top_findings: DEFAULT_TOP_FINDINGS,
            top_suggestions: DEFAULT_TOP_SUGGESTIONS,
        }
    }
}

impl EngineConfig {
    /// Check every parameter's range.
    ///
    /// # Errors
    /// Returns `CascadeError::InvalidConfig` naming the first bad field.
    pub fn validate(&self) -> Result<(), CascadeError> {
        if self.max_iterations == 0 {
            return Err(CascadeError::InvalidConfig(
                "max_iterations must be at least 1".to_string(),
            ));
        }

        let unit_factors = [
            ("depth_decay", self.depth_decay),
            ("moderate_penalty", self.moderate_penalty),
            ("fragile_penalty", self.fragile_penalty),
            ("flagged_factor", self.flagged_factor),
            ("inconsistent_factor", self.inconsistent_factor),
            ("invalid_factor", self.invalid_factor),
            ("prior_mild_discount", self.prior_mild_discount),
            ("prior_strong_discount", self.prior_strong_discount),
        ];
        for (name, factor) in unit_factors {
            if !(factor > 0.0 && factor <= 1.0) {
                return Err(CascadeError::InvalidConfig(format!(
                    "{} must be in (0, 1], got {}",
                    name, factor
                )));
            }
        }

        if !(1.0..=1.5).contains(&self.prior_boost) {
            return Err(CascadeError::InvalidConfig(format!(
                "prior_boost must be in [1, 1.5], got {}",
                self.prior_boost
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_iterations_rejected() {
        let config = EngineConfig {
            max_iterations: 0,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn factor_out_of_range_rejected() {
        let config = EngineConfig {
            invalid_factor: 1.4,
            ..EngineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(CascadeError::InvalidConfig(msg)) if msg.contains("invalid_factor")
        ));
    }

    #[test]
    fn nan_factor_rejected() {
        let config = EngineConfig {
            depth_decay: f64::NAN,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_overrides_keep_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"max_iterations": 5}"#).expect("parse");
        assert_eq!(config.max_iterations, 5);
        assert_eq!(config.depth_decay, DEPTH_DECAY);
    }
}
