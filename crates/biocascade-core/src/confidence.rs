//! # Confidence Module
//!
//! Two-pass confidence scoring for derived values.
//!
//! - Pass 1 runs right after the cascade: base confidence, discounted per
//!   cascade level, by formula sensitivity and by the weakest derived
//!   input, then nudged by how typical the value is for the patient's
//!   age/sex stratum
//! - Pass 2 runs after constraint validation: the whole-panel consistency
//!   status scales every record, and the score is clamped to `[0, 1]`
//!
//! Evidence grade and reliability class are derived from the same record.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::cascade::Derivation;
use crate::config::EngineConfig;
use crate::constraints::ValidationStatus;
use crate::priors::PriorLookup;
use crate::PatientContext;

/// Score at or above which a record is `high` reliability.
pub const HIGH_RELIABILITY: f64 = 0.85;
/// Score at or above which a record is at least `moderate`.
pub const MODERATE_RELIABILITY: f64 = 0.70;
/// Score at or above which a record is at least `low`.
pub const LOW_RELIABILITY: f64 = 0.50;

/// Numerical sensitivity of a formula at the inputs it was evaluated on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SensitivityClass {
    Stable,
    Moderate,
    Fragile,
}

/// Strength of the evidence behind a derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceGrade {
    /// Candidate carries a citation.
    PeerReviewed,
    /// Uncited, every input was measured (depth 1).
    DirectCalculation,
    /// Uncited, at least one input was itself derived.
    CascadeInference,
}

/// Panel-level consistency as seen from one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsistencyStatus {
    Consistent,
    Flagged,
    Inconsistent,
    Invalid,
}

impl From<ValidationStatus> for ConsistencyStatus {
    fn from(status: ValidationStatus) -> Self {
        match status {
            ValidationStatus::Valid => ConsistencyStatus::Consistent,
            ValidationStatus::ReviewRecommended => ConsistencyStatus::Flagged,
            ValidationStatus::Inconsistent => ConsistencyStatus::Inconsistent,
            ValidationStatus::Invalid => ConsistencyStatus::Invalid,
        }
    }
}

/// Coarse reliability bucket of a final score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReliabilityClass {
    Unreliable,
    Low,
    Moderate,
    High,
}

impl ReliabilityClass {
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score >= HIGH_RELIABILITY {
            ReliabilityClass::High
        } else if score >= MODERATE_RELIABILITY {
            ReliabilityClass::Moderate
        } else if score >= LOW_RELIABILITY {
            ReliabilityClass::Low
        } else {
            ReliabilityClass::Unreliable
        }
    }
}

/// Confidence attached to one derived value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfidenceRecord {
    /// Final score in `[0, 1]`.
    pub score: f64,
    /// Pass-1 score before the consistency factor and clamping.
    pub raw_score: f64,
    pub evidence_grade: EvidenceGrade,
    pub sensitivity: SensitivityClass,
    pub consistency: ConsistencyStatus,
    /// Cascade level (1 = every input was measured).
    pub depth: usize,
    /// Lowest pass-1 score among derived inputs (1.0 when all were measured).
    pub input_reliability: f64,
    pub reliability: ReliabilityClass,
    /// Absolute z-score against the population prior, when one exists.
    pub prior_z: Option<f64>,
}

impl ConfidenceRecord {
    /// Check if the record is `high` or `moderate` reliability.
    #[must_use]
    pub fn is_reliable(&self) -> bool {
        self.reliability >= ReliabilityClass::Moderate
    }
}

/// Applies both confidence passes under one engine configuration.
pub struct ConfidencePropagator<'a> {
    config: &'a EngineConfig,
    priors: &'a dyn PriorLookup,
}

impl<'a> ConfidencePropagator<'a> {
    #[must_use]
    pub fn new(config: &'a EngineConfig, priors: &'a dyn PriorLookup) -> Self {
        Self { config, priors }
    }

    /// Pass 1 over a whole cascade, in firing order.
    ///
    /// A derivation always fires after the derivations it consumes, so the
    /// score of every derived input is known when its consumer is scored.
    #[must_use]
    pub fn initial_pass(
        &self,
        derivations: &[Derivation],
        context: &PatientContext,
    ) -> Vec<ConfidenceRecord> {
        let mut scores: BTreeMap<&'static str, f64> = BTreeMap::new();
        derivations
            .iter()
            .map(|derivation| {
                let input_reliability = derivation
                    .inputs
                    .iter()
                    .filter_map(|input| scores.get(input).copied())
                    .fold(1.0, f64::min);
                let record = self.initial(derivation, context, input_reliability);
                scores.insert(derivation.target, record.score);
                record
            })
            .collect()
    }

    /// Pass 1: score a fresh derivation.
    ///
    /// `raw = base × decay^(depth-1) × sensitivity × input reliability × prior factor`.
    /// The record starts out `consistent`; pass 2 settles that.
    #[must_use]
    pub fn initial(
        &self,
        derivation: &Derivation,
        context: &PatientContext,
        input_reliability: f64,
    ) -> ConfidenceRecord {
        let depth = derivation.depth.max(1);
        let decay = self.config.depth_decay.powi(depth_exponent(depth));

        let sensitivity = match derivation.sensitivity {
            SensitivityClass::Stable => 1.0,
            SensitivityClass::Moderate => self.config.moderate_penalty,
            SensitivityClass::Fragile => self.config.fragile_penalty,
        };

        let prior_z = derivation.value.as_number().and_then(|value| {
            self.priors
                .prior(derivation.target, context)
                .map(|prior| prior.z_score(value))
        });
        let prior_factor = prior_z.map_or(1.0, |z| self.prior_factor(z));

        let input_reliability = input_reliability.clamp(0.0, 1.0);
        let raw_score =
            derivation.base_confidence * decay * sensitivity * input_reliability * prior_factor;

        let evidence_grade = if derivation.citation.is_some() {
            EvidenceGrade::PeerReviewed
        } else if depth == 1 {
            EvidenceGrade::DirectCalculation
        } else {
            EvidenceGrade::CascadeInference
        };

        let score = raw_score.clamp(0.0, 1.0);
        ConfidenceRecord {
            score,
            raw_score,
            evidence_grade,
            sensitivity: derivation.sensitivity,
            consistency: ConsistencyStatus::Consistent,
            depth,
            input_reliability,
            reliability: ReliabilityClass::from_score(score),
            prior_z,
        }
    }

    /// Pass 2: apply the panel's validation status and clamp.
    pub fn finalize(&self, record: &mut ConfidenceRecord, status: ValidationStatus) {
        let factor = match status {
            ValidationStatus::Valid => 1.0,
            ValidationStatus::ReviewRecommended => self.config.flagged_factor,
            ValidationStatus::Inconsistent => self.config.inconsistent_factor,
            ValidationStatus::Invalid => self.config.invalid_factor,
        };
        record.score = (record.raw_score * factor).clamp(0.0, 1.0);
        record.consistency = status.into();
        record.reliability = ReliabilityClass::from_score(record.score);
    }

    fn prior_factor(&self, z: f64) -> f64 {
        if z <= 2.0 {
            self.config.prior_boost
        } else if z <= 3.0 {
            self.config.prior_mild_discount
        } else {
            self.config.prior_strong_discount
        }
    }
}

fn depth_exponent(depth: usize) -> i32 {
    i32::try_from(depth - 1).unwrap_or(i32::MAX)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::priors::PriorTable;
    use crate::Value;

    fn derivation(target: &'static str, value: f64, depth: usize) -> Derivation {
        Derivation {
            target,
            value: Value::Number(value),
            method: "m",
            iteration: 1,
            depth,
            inputs: vec!["a"],
            base_confidence: 0.90,
            citation: None,
            sensitivity: SensitivityClass::Stable,
        }
    }

    fn no_context() -> PatientContext {
        PatientContext::default()
    }

    #[test]
    fn reliability_boundaries() {
        assert_eq!(ReliabilityClass::from_score(0.85), ReliabilityClass::High);
        assert_eq!(ReliabilityClass::from_score(0.849), ReliabilityClass::Moderate);
        assert_eq!(ReliabilityClass::from_score(0.70), ReliabilityClass::Moderate);
        assert_eq!(ReliabilityClass::from_score(0.50), ReliabilityClass::Low);
        assert_eq!(ReliabilityClass::from_score(0.49), ReliabilityClass::Unreliable);
    }

    #[test]
    fn depth_decay_applies_per_level() {
        let config = EngineConfig::default();
        let priors = PriorTable::new();
        let propagator = ConfidencePropagator::new(&config, &priors);

        let first = propagator.initial(&derivation("x", 1.0, 1), &no_context(), 1.0);
        let third = propagator.initial(&derivation("x", 1.0, 3), &no_context(), 1.0);

        assert!((first.raw_score - 0.90).abs() < 1e-12);
        assert!((third.raw_score - 0.90 * 0.95 * 0.95).abs() < 1e-12);
        assert_eq!(third.depth, 3);
    }

    #[test]
    fn evidence_grade_selection() {
        let config = EngineConfig::default();
        let priors = PriorTable::new();
        let propagator = ConfidencePropagator::new(&config, &priors);

        let direct = propagator.initial(&derivation("x", 1.0, 1), &no_context(), 1.0);
        let cascade = propagator.initial(&derivation("x", 1.0, 2), &no_context(), 1.0);
        let mut cited = derivation("x", 1.0, 2);
        cited.citation = Some("friedewald_1972");
        let cited = propagator.initial(&cited, &no_context(), 1.0);

        assert_eq!(direct.evidence_grade, EvidenceGrade::DirectCalculation);
        assert_eq!(cascade.evidence_grade, EvidenceGrade::CascadeInference);
        assert_eq!(cited.evidence_grade, EvidenceGrade::PeerReviewed);
    }

    #[test]
    fn weak_input_caps_child_score() {
        let config = EngineConfig::default();
        let priors = PriorTable::new();
        let propagator = ConfidencePropagator::new(&config, &priors);

        let record = propagator.initial(&derivation("x", 1.0, 2), &no_context(), 0.60);
        assert!((record.raw_score - 0.90 * 0.95 * 0.60).abs() < 1e-12);
        assert!((record.input_reliability - 0.60).abs() < 1e-12);
    }

    #[test]
    fn initial_pass_chains_parent_scores() {
        let config = EngineConfig::default();
        let priors = PriorTable::new();
        let propagator = ConfidencePropagator::new(&config, &priors);

        let mut parent = derivation("a", 1.0, 1);
        parent.base_confidence = 0.70;
        let mut child = derivation("b", 1.0, 2);
        child.inputs = vec!["a", "measured"];

        let records = propagator.initial_pass(&[parent, child], &no_context());
        assert!((records[0].score - 0.70).abs() < 1e-12);
        assert!((records[0].input_reliability - 1.0).abs() < 1e-12);
        assert!((records[1].input_reliability - 0.70).abs() < 1e-12);
        assert!((records[1].raw_score - 0.90 * 0.95 * 0.70).abs() < 1e-12);
        assert!(records[1].score <= records[0].score);
    }

    #[test]
    fn fragile_formula_penalized() {
        let config = EngineConfig::default();
        let priors = PriorTable::new();
        let propagator = ConfidencePropagator::new(&config, &priors);

        let mut fragile = derivation("x", 1.0, 1);
        fragile.sensitivity = SensitivityClass::Fragile;
        let record = propagator.initial(&fragile, &no_context(), 1.0);
        assert!((record.raw_score - 0.90 * 0.85).abs() < 1e-12);
    }

    #[test]
    fn prior_factor_bands() {
        let config = EngineConfig::default();
        let priors = PriorTable::builtin();
        let propagator = ConfidencePropagator::new(&config, &priors);

        // ldl prior: mean 115, sd 35
        let score_at =
            |value: f64| propagator.initial(&derivation("ldl", value, 1), &no_context(), 1.0);
        let typical = score_at(120.0);
        let unusual = score_at(115.0 + 2.5 * 35.0);
        let extreme = score_at(115.0 + 4.0 * 35.0);

        assert!((typical.raw_score - 0.90 * 1.02).abs() < 1e-12);
        assert!((unusual.raw_score - 0.90 * 0.95).abs() < 1e-12);
        assert!((extreme.raw_score - 0.90 * 0.85).abs() < 1e-12);
        assert!(typical.prior_z.is_some());
    }

    #[test]
    fn missing_prior_is_neutral() {
        let config = EngineConfig::default();
        let priors = PriorTable::builtin();
        let propagator = ConfidencePropagator::new(&config, &priors);

        let record = propagator.initial(&derivation("castelli_1", 4.0, 1), &no_context(), 1.0);
        assert!(record.prior_z.is_none());
        assert!((record.raw_score - 0.90).abs() < 1e-12);
    }

    #[test]
    fn finalize_applies_status_and_clamps() {
        let config = EngineConfig::default();
        let priors = PriorTable::new();
        let propagator = ConfidencePropagator::new(&config, &priors);

        let mut record = propagator.initial(&derivation("x", 1.0, 1), &no_context(), 1.0);
        record.raw_score = 1.2;
        propagator.finalize(&mut record, ValidationStatus::Valid);
        assert_eq!(record.score, 1.0);

        propagator.finalize(&mut record, ValidationStatus::Invalid);
        assert!((record.score - 0.72).abs() < 1e-12);
        assert_eq!(record.consistency, ConsistencyStatus::Invalid);
        assert_eq!(record.reliability, ReliabilityClass::Moderate);
    }

    #[test]
    fn finalize_is_idempotent() {
        let config = EngineConfig::default();
        let priors = PriorTable::new();
        let propagator = ConfidencePropagator::new(&config, &priors);

        let mut record = propagator.initial(&derivation("x", 1.0, 1), &no_context(), 1.0);
        propagator.finalize(&mut record, ValidationStatus::Inconsistent);
        let once = record.clone();
        propagator.finalize(&mut record, ValidationStatus::Inconsistent);
        assert_eq!(once, record);
    }
}
