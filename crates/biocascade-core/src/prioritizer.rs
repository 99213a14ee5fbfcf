//! # Output Prioritizer
//!
//! Ranks derived values for presentation and proposes the single
//! measurements that would unlock the most new derivations.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::engine::DerivationRecord;
use crate::rules::{Interpretation, RuleRegistry};
use crate::states::{StateAssessment, StateCatalog};
use crate::{Value, ValueMap};

/// Weight of the high-value marker.
pub const HIGH_VALUE_WEIGHT: f64 = 50.0;
/// Weight of a citation.
pub const CITATION_WEIGHT: f64 = 5.0;
/// Weight of the final confidence score.
pub const CONFIDENCE_WEIGHT: f64 = 20.0;
/// Weight of a concerning interpretation or state.
pub const CONCERNING_WEIGHT: f64 = 40.0;

/// A ranked derived value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Finding {
    pub target: String,
    pub value: Value,
    pub method: String,
    pub priority: f64,
    pub confidence: f64,
    pub high_value: bool,
    pub concerning: bool,
    /// Human-readable reasons the finding ranks where it does.
    pub reasons: Vec<String>,
    pub interpretation: Option<Interpretation>,
}

/// A single measurement that would enable a derivation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    pub target: String,
    pub missing_input: String,
    /// Base confidence of the best candidate the input would enable.
    pub confidence: f64,
    pub rationale: String,
    /// Every underived target with a candidate this input alone would
    /// make eligible. Candidates whose gate already fails are excluded.
    pub unlocks: Vec<String>,
}

/// Rank derivations by priority, highest first, keeping `top_n`.
///
/// Ties keep derivation order.
#[must_use]
pub fn prioritize(
    derivations: &[DerivationRecord],
    rules: &RuleRegistry,
    states: &BTreeMap<String, StateAssessment>,
    catalog: &StateCatalog,
    top_n: usize,
) -> Vec<Finding> {
    let concerning_signals = concerning_signals(states, catalog);

    let mut findings: Vec<Finding> = derivations
        .iter()
        .map(|record| {
            let high_value = rules.get(&record.target).is_some_and(|r| r.high_value);
            let cited = record.citation.is_some();
            let interpretation_concerning =
                record.interpretation.as_ref().is_some_and(|i| i.concerning);
            let state_concerning = concerning_signals.contains(record.target.as_str());
            let concerning = interpretation_concerning || state_concerning;
            let confidence = record.confidence.score;

            let mut reasons = Vec::new();
            if high_value {
                reasons.push("high-value derived marker".to_string());
            }
            if cited {
                reasons.push("peer-reviewed formula".to_string());
            }
            if interpretation_concerning {
                reasons.push("value outside reference range".to_string());
            }
            if state_concerning {
                reasons.push("signal of a concerning physiological state".to_string());
            }

            let priority = HIGH_VALUE_WEIGHT * indicator(high_value)
                + CITATION_WEIGHT * indicator(cited)
                + CONFIDENCE_WEIGHT * confidence
                + CONCERNING_WEIGHT * indicator(concerning);

            Finding {
                target: record.target.clone(),
                value: record.value.clone(),
                method: record.method.clone(),
                priority,
                confidence,
                high_value,
                concerning,
                reasons,
                interpretation: record.interpretation.clone(),
            }
        })
        .collect();

    findings.sort_by(|a, b| b.priority.total_cmp(&a.priority));
    findings.truncate(top_n);
    findings
}

/// Propose single missing inputs, highest confidence first, keeping `top_n`.
///
/// One suggestion per (target, missing input) pair. Candidates whose
/// gate already fails on the known values are skipped. Ties keep
/// registration order.
#[must_use]
pub fn suggest(rules: &RuleRegistry, values: &ValueMap, top_n: usize) -> Vec<Suggestion> {
    // (target, input) -> best (confidence, method); insertion order kept separately
    let mut best: BTreeMap<(&str, &str), (f64, &str)> = BTreeMap::new();
    let mut order: Vec<(&str, &str)> = Vec::new();
    let mut unlocks: BTreeMap<&str, Vec<&str>> = BTreeMap::new();

    for rule in rules.iter().filter(|r| !values.contains(r.target)) {
        for candidate in rule.candidates.iter().filter(|c| !c.ruled_out(values)) {
            let missing = candidate.missing_inputs(values);
            let &[input] = missing.as_slice() else {
                continue;
            };

            let targets = unlocks.entry(input).or_default();
            if !targets.contains(&rule.target) {
                targets.push(rule.target);
            }

            let key = (rule.target, input);
            match best.get_mut(&key) {
                Some(entry) => {
                    if candidate.base_confidence > entry.0 {
                        *entry = (candidate.base_confidence, candidate.method);
                    }
                }
                None => {
                    best.insert(key, (candidate.base_confidence, candidate.method));
                    order.push(key);
                }
            }
        }
    }

    let mut suggestions: Vec<Suggestion> = order
        .into_iter()
        .filter_map(|key| {
            let (confidence, method) = *best.get(&key)?;
            let (target, input) = key;
            let unlocked: Vec<String> = unlocks
                .get(input)
                .map(|ts| ts.iter().map(|t| (*t).to_string()).collect())
                .unwrap_or_default();

            let rationale = if unlocked.len() > 1 {
                format!(
                    "Measuring {} enables {} via {} and unlocks {}",
                    input,
                    target,
                    method,
                    unlocked.join(", ")
                )
            } else {
                format!("Measuring {} enables {} via {}", input, target, method)
            };

            Some(Suggestion {
                target: target.to_string(),
                missing_input: input.to_string(),
                confidence,
                rationale,
                unlocks: unlocked,
            })
        })
        .collect();

    suggestions.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    suggestions.truncate(top_n);
    suggestions
}

fn indicator(flag: bool) -> f64 {
    if flag { 1.0 } else { 0.0 }
}

/// Signals of every evaluated state whose label is concerning.
fn concerning_signals<'a>(
    states: &BTreeMap<String, StateAssessment>,
    catalog: &'a StateCatalog,
) -> BTreeSet<&'a str> {
    catalog
        .iter()
        .filter(|def| {
            states
                .get(def.id)
                .and_then(StateAssessment::reading)
                .is_some_and(|reading| reading.concerning)
        })
        .flat_map(|def| def.signals())
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================
