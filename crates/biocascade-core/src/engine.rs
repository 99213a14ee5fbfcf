//! # Engine
//!
//! Single entry point for one analysis run.
//!
//! Control flow: ingest → cascade → confidence pass 1 → constraint
//! validation → confidence pass 2 → state classification →
//! prioritization and suggestions. Every stage is pure; the only shared
//! state is the immutable [`Registry`] behind an `Arc`.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::cascade::CascadeEvaluator;
use crate::citations::Citation;
use crate::confidence::{ConfidencePropagator, ConfidenceRecord};
use crate::constraints::{ConstraintValidator, ValidationReport};
use crate::ingestor::Ingestor;
use crate::prioritizer::{Finding, Suggestion, prioritize, suggest};
use crate::registry::Registry;
use crate::rules::Interpretation;
use crate::states::{StateAssessment, StateClassifier};
use crate::{Provenance, Value, ValueMap};

/// One derived value with its provenance and confidence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivationRecord {
    pub target: String,
    pub value: Value,
    pub unit: String,
    pub method: String,
    /// 1-based cascade pass.
    pub iteration: usize,
    /// Distance from the direct inputs (1 = every input was measured).
    pub depth: usize,
    pub inputs: Vec<String>,
    pub confidence: ConfidenceRecord,
    pub citation: Option<Citation>,
    pub interpretation: Option<Interpretation>,
}

/// Counters describing one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub direct_inputs: usize,
    pub derived: usize,
    pub iterations: usize,
    pub fixpoint_reached: bool,
}

/// Full output of [`Engine::analyze`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    /// Direct inputs plus every derived value.
    pub values: ValueMap,
    /// Source of every entry in `values`.
    pub provenance: BTreeMap<String, Provenance>,
    pub derivations: Vec<DerivationRecord>,
    pub validation: ValidationReport,
    pub states: BTreeMap<String, StateAssessment>,
    pub findings: Vec<Finding>,
    pub suggestions: Vec<Suggestion>,
    pub summary: RunSummary,
}

/// Output size overrides for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputLimits {
    pub top_findings: Option<usize>,
    pub top_suggestions: Option<usize>,
}

/// Cascade inference engine over a shared registry.
#[derive(Debug, Clone)]
pub struct Engine {
    registry: Arc<Registry>,
}

impl Engine {
    #[must_use]
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Analyze a panel with the configured output sizes.
    #[must_use]
    pub fn analyze(&self, input: &ValueMap) -> AnalysisResult {
        self.analyze_with(input, OutputLimits::default())
    }

    /// Analyze a panel.
    ///
    /// Never fails: malformed inputs, implausible values and formula
    /// failures all surface inside the result.
    #[must_use]
    pub fn analyze_with(&self, input: &ValueMap, limits: OutputLimits) -> AnalysisResult {
        let registry = self.registry.as_ref();
        let config = registry.config();

        let intake = Ingestor::sanitize(input);
        let direct = intake.accepted;
        let outcome =
            CascadeEvaluator::new(registry.rules(), config.max_iterations).run(direct.clone());

        // Pass 1
        let context = outcome.values.context();
        let propagator = ConfidencePropagator::new(config, registry.priors());
        let confidences = propagator.initial_pass(&outcome.derivations, &context);
        let mut derivations: Vec<DerivationRecord> = outcome
            .derivations
            .iter()
            .zip(confidences)
            .map(|(d, confidence)| {
                let rule = registry.rules().get(d.target);
                DerivationRecord {
                    target: d.target.to_string(),
                    value: d.value.clone(),
                    unit: rule.map_or_else(String::new, |r| r.unit.to_string()),
                    method: d.method.to_string(),
                    iteration: d.iteration,
                    depth: d.depth,
                    inputs: d.inputs.iter().map(|s| (*s).to_string()).collect(),
                    confidence,
                    citation: d
                        .citation
                        .and_then(|key| registry.citations().get(key))
                        .cloned(),
                    interpretation: rule.and_then(|r| r.interpretation(&d.value)),
                }
            })
            .collect();

        let validation = ConstraintValidator::new(registry.bounds(), registry.constraints())
            .validate(&direct, &outcome.values, intake.rejected);

        // Pass 2
        for record in &mut derivations {
            propagator.finalize(&mut record.confidence, validation.status);
        }

        let states = StateClassifier::new(registry.states()).classify(&outcome.values);

        let findings = prioritize(
            &derivations,
            registry.rules(),
            &states,
            registry.states(),
            limits.top_findings.unwrap_or(config.top_findings),
        );
        let suggestions = suggest(
            registry.rules(),
            &outcome.values,
            limits.top_suggestions.unwrap_or(config.top_suggestions),
        );

        let provenance: BTreeMap<String, Provenance> = direct
            .keys()
            .map(|name| (name.to_string(), Provenance::Direct))
            .chain(
                derivations
                    .iter()
                    .map(|d| (d.target.clone(), Provenance::Derived)),
            )
            .collect();

        let summary = RunSummary {
            direct_inputs: direct.len(),
            derived: derivations.len(),
            iterations: outcome.iterations,
            fixpoint_reached: outcome.fixpoint_reached,
        };

        tracing::debug!(
            direct_inputs = summary.direct_inputs,
            derived = summary.derived,
            iterations = summary.iterations,
            status = ?validation.status,
            "analysis complete"
        );

        AnalysisResult {
            values: outcome.values,
            provenance,
            derivations,
            validation,
            states,
            findings,
            suggestions,
            summary,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
