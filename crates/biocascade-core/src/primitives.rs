//! # Innate Primitives
//!
//! Hardcoded defaults and limits for the biocascade core.
//!
//! The engine starts with fixed logic and immutable registries. These
//! constants are compiled into the binary; the tunable ones are only
//! defaults for [`EngineConfig`](crate::EngineConfig) and may be overridden
//! by a data pack at start-up.

// =============================================================================
// RESERVED INPUT KEYS
// =============================================================================

/// Reserved key carrying the patient's age in years.
pub const AGE_KEY: &str = "age";

/// Reserved key carrying the sex flag consumed by sex-specific formulas.
pub const SEX_KEY: &str = "is_female";

// =============================================================================
// CASCADE
// =============================================================================

/// Hard cap on cascade passes.
///
/// The loop normally stops at a fixpoint long before this.
pub const MAX_ITERATIONS: usize = 20;

// =============================================================================
// CONFIDENCE DEFAULTS
// =============================================================================

/// Multiplicative discount per cascade level beyond the first.
pub const DEPTH_DECAY: f64 = 0.95;

/// Sensitivity penalty for formulas classified as moderate.
pub const MODERATE_PENALTY: f64 = 0.97;

/// Sensitivity penalty for formulas evaluated near a singularity.
pub const FRAGILE_PENALTY: f64 = 0.85;

/// Consistency factor applied when validation recommends review.
pub const FLAGGED_FACTOR: f64 = 0.90;

/// Consistency factor applied when validation finds an inconsistency.
pub const INCONSISTENT_FACTOR: f64 = 0.75;

/// Consistency factor applied when validation finds an impossibility.
pub const INVALID_FACTOR: f64 = 0.60;

// =============================================================================
// OUTPUT
// =============================================================================

/// Default number of prioritized findings returned.
pub const DEFAULT_TOP_FINDINGS: usize = 10;

/// Default number of suggestions returned.
pub const DEFAULT_TOP_SUGGESTIONS: usize = 10;

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum length for biomarker names.
///
/// Longer names are rejected by the Ingestor and reported as malformed.
pub const MAX_NAME_LENGTH: usize = 128;

/// Maximum number of fields accepted in one input map.
///
/// Fields beyond this (in key order) are rejected and reported.
pub const MAX_INPUT_FIELDS: usize = 512;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consistency_factors_are_ordered() {
        assert!(FLAGGED_FACTOR > INCONSISTENT_FACTOR);
        assert!(INCONSISTENT_FACTOR > INVALID_FACTOR);
        assert!(INVALID_FACTOR > 0.0);
    }

    #[test]
    fn sensitivity_penalties_are_ordered() {
        assert!(MODERATE_PENALTY > FRAGILE_PENALTY);
        assert!(MODERATE_PENALTY <= 1.0);
    }
}
