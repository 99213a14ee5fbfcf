//! # Rule Registry
//!
//! Immutable map from target name to an ordered list of candidate
//! derivation rules.
//!
//! - Registration order of targets is the cascade's scan order
//! - Candidate order within a target is the tie-break: the first
//!   satisfiable candidate wins
//! - Formulas are plain function pointers stored on each candidate, so a
//!   rule's logic lives next to its metadata
//!
//! The registry is validated once when it is built and is never mutated
//! afterwards.

mod catalog;
pub mod formulas;

use serde::Serialize;
use std::collections::BTreeMap;

use crate::confidence::SensitivityClass;
use crate::{CascadeError, Value, ValueMap};

pub use catalog::builtin_rules;

// =============================================================================
// FUNCTION TYPES
// =============================================================================

/// A pure formula over the current value map.
///
/// `None`, or a value that is not [`Value::is_defined`], means
/// "not computable" and the candidate is skipped.
pub type Formula = fn(&ValueMap) -> Option<Value>;

/// Applicability predicate gating a candidate.
pub type Applicability = fn(&ValueMap) -> bool;

/// Interprets a derived value for reporting and prioritization.
pub type Interpreter = fn(&Value) -> Option<Interpretation>;

// =============================================================================
// INTERPRETATION
// =============================================================================

/// Human-readable interpretation of a derived value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Interpretation {
    /// Short classification (e.g. "borderline_high").
    pub label: String,
    /// One-line explanation.
    pub note: String,
    /// Whether the value warrants attention.
    pub concerning: bool,
}

impl Interpretation {
    #[must_use]
    pub fn new(label: &str, note: &str, concerning: bool) -> Self {
        Self {
            label: label.to_string(),
            note: note.to_string(),
            concerning,
        }
    }
}

// =============================================================================
// SENSITIVITY PROFILE
// =============================================================================

/// Numerical sensitivity of a formula.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SensitivityProfile {
    /// Sums, differences and products of inputs.
    Stable,
    /// Powers, logs and ratios away from any singularity.
    Moderate,
    /// Division or log by `input`; fragile while `|input| < threshold`.
    NearZero {
        input: &'static str,
        threshold: f64,
    },
}

impl SensitivityProfile {
    /// Classify the formula's sensitivity at the given values.
    #[must_use]
    pub fn classify(&self, values: &ValueMap) -> SensitivityClass {
        match *self {
            SensitivityProfile::Stable => SensitivityClass::Stable,
            SensitivityProfile::Moderate => SensitivityClass::Moderate,
            SensitivityProfile::NearZero { input, threshold } => match values.number(input) {
                Some(x) if x.abs() >= threshold => SensitivityClass::Moderate,
                _ => SensitivityClass::Fragile,
            },
        }
    }
}

// =============================================================================
// RULE CANDIDATE
// =============================================================================

/// One way of deriving a target.
#[derive(Debug, Clone)]
pub struct RuleCandidate {
    /// Formula / method identifier reported on derivation records.
    pub method: &'static str,
    /// Inputs that must all be present before the candidate is tried.
    pub required_inputs: &'static [&'static str],
    /// Optional gate evaluated after the presence check.
    pub applicable: Option<Applicability>,
    /// Required inputs the gate reads.
    pub gate_inputs: &'static [&'static str],
    pub formula: Formula,
    /// Base confidence in `[0, 1]`.
    pub base_confidence: f64,
    /// Citation key into the citation index.
    pub citation: Option<&'static str>,
    pub sensitivity: SensitivityProfile,
}

impl RuleCandidate {
    /// Create a candidate with no gate, no citation and a stable profile.
    #[must_use]
    pub fn new(
        method: &'static str,
        required_inputs: &'static [&'static str],
        formula: Formula,
        base_confidence: f64,
    ) -> Self {
        Self {
            method,
            required_inputs,
            applicable: None,
            gate_inputs: &[],
            formula,
            base_confidence,
            citation: None,
            sensitivity: SensitivityProfile::Stable,
        }
    }

    /// Gate the candidate on `predicate`, which reads only `reads`.
    #[must_use]
    pub fn when(mut self, reads: &'static [&'static str], predicate: Applicability) -> Self {
        self.applicable = Some(predicate);
        self.gate_inputs = reads;
        self
    }

    #[must_use]
    pub fn cited(mut self, key: &'static str) -> Self {
        self.citation = Some(key);
        self
    }

    #[must_use]
    pub fn sensitivity(mut self, profile: SensitivityProfile) -> Self {
        self.sensitivity = profile;
        self
    }

    /// Required inputs absent from `values`, in declaration order.
    #[must_use]
    pub fn missing_inputs(&self, values: &ValueMap) -> Vec<&'static str> {
        self.required_inputs
            .iter()
            .copied()
            .filter(|name| !values.contains(name))
            .collect()
    }

    /// Check whether the gate already rejects `values`.
    ///
    /// `true` only when every input the gate reads is present and the
    /// predicate fails, so no further measurement can make it pass.
    #[must_use]
    pub fn ruled_out(&self, values: &ValueMap) -> bool {
        self.applicable.is_some_and(|applicable| {
            values.contains_all(self.gate_inputs) && !applicable(values)
        })
    }

    /// Try to fire the candidate.
    ///
    /// Returns a value only when every required input is present, the
    /// applicability predicate (if any) holds, and the formula produces a
    /// defined value.
    #[must_use]
    pub fn evaluate(&self, values: &ValueMap) -> Option<Value> {
        if !values.contains_all(self.required_inputs) {
            return None;
        }
        if let Some(applicable) = self.applicable
            && !applicable(values)
        {
            return None;
        }
        (self.formula)(values).filter(Value::is_defined)
    }
}

// =============================================================================
// INFERENCE RULE
// =============================================================================

/// A derivable target and its ordered candidates.
#[derive(Debug, Clone)]
pub struct InferenceRule {
    pub target: &'static str,
    pub unit: &'static str,
    /// Novel / high-value output, weighted up by the prioritizer.
    pub high_value: bool,
    pub interpret: Option<Interpreter>,
    pub candidates: Vec<RuleCandidate>,
}

impl InferenceRule {
    #[must_use]
    pub fn new(target: &'static str, unit: &'static str) -> Self {
        Self {
            target,
            unit,
            high_value: false,
            interpret: None,
            candidates: Vec::new(),
        }
    }

    #[must_use]
    pub fn high_value(mut self) -> Self {
        self.high_value = true;
        self
    }

    #[must_use]
    pub fn interpreted_by(mut self, interpreter: Interpreter) -> Self {
        self.interpret = Some(interpreter);
        self
    }

    #[must_use]
    pub fn candidate(mut self, candidate: RuleCandidate) -> Self {
        self.candidates.push(candidate);
        self
    }

    /// Interpret a value produced for this target.
    #[must_use]
    pub fn interpretation(&self, value: &Value) -> Option<Interpretation> {
        self.interpret.and_then(|f| f(value))
    }
}

// =============================================================================
// RULE REGISTRY
// =============================================================================

/// Validated, ordered set of inference rules.
#[derive(Debug, Clone)]
pub struct RuleRegistry {
    rules: Vec<InferenceRule>,
    index: BTreeMap<&'static str, usize>,
}

impl RuleRegistry {
    /// Build a registry, validating every entry.
    ///
    /// # Errors
    /// Returns `CascadeError` if a target is empty or duplicated, has no
    /// candidates, requires itself, or declares a base confidence outside
    /// `[0, 1]`.
    pub fn new(rules: Vec<InferenceRule>) -> Result<Self, CascadeError> {
        let mut index = BTreeMap::new();

        for (position, rule) in rules.iter().enumerate() {
            validate_rule(rule)?;
            if index.insert(rule.target, position).is_some() {
                return Err(CascadeError::DuplicateEntry {
                    kind: "rule target",
                    name: rule.target.to_string(),
                });
            }
        }

        Ok(Self { rules, index })
    }

    /// The built-in rule catalog.
    pub fn builtin() -> Result<Self, CascadeError> {
        Self::new(builtin_rules())
    }

    /// Rules in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &InferenceRule> {
        self.rules.iter()
    }

    #[must_use]
    pub fn get(&self, target: &str) -> Option<&InferenceRule> {
        self.index.get(target).map(|&i| &self.rules[i])
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Every citation key referenced by any candidate.
    pub fn citation_keys(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.rules.iter().flat_map(|rule| {
            rule.candidates
                .iter()
                .filter_map(move |c| c.citation.map(|key| (rule.target, key)))
        })
    }
}

fn validate_rule(rule: &InferenceRule) -> Result<(), CascadeError> {
    let invalid = |reason: String| CascadeError::InvalidRule {
        target: rule.target.to_string(),
        reason,
    };

    if rule.target.trim().is_empty() {
        return Err(invalid("target name is empty".to_string()));
    }
    if rule.candidates.is_empty() {
        return Err(invalid("no candidate rules".to_string()));
    }

    for candidate in &rule.candidates {
        if candidate.required_inputs.contains(&rule.target) {
            return Err(invalid(format!(
                "candidate '{}' requires its own target",
                candidate.method
            )));
        }
        if let Some(input) = candidate
            .gate_inputs
            .iter()
            .copied()
            .find(|input| !candidate.required_inputs.contains(input))
        {
            return Err(invalid(format!(
                "candidate '{}' gate reads '{}', which is not a required input",
                candidate.method, input
            )));
        }
        if !(0.0..=1.0).contains(&candidate.base_confidence) {
            return Err(invalid(format!(
                "candidate '{}' base confidence {} outside [0, 1]",
                candidate.method, candidate.base_confidence
            )));
        }
    }

    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
