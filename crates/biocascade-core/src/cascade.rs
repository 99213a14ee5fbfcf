//! # Cascade Evaluator
//!
//! Drives the fixpoint loop over the rule registry.
//!
//! Each pass scans every target not yet in the value map, in registration
//! order, and fires the first satisfiable candidate. Results are written
//! immediately, so a target derived early in a pass can feed a later
//! target in the same pass. A pass that derives nothing is a fixpoint and
//! ends the loop; the iteration cap only bounds pathological registries.
//!
//! Each derivation also records its depth: one more than the deepest
//! derived value among its inputs, with direct inputs at depth 0. Depth
//! is independent of the pass in which a target happened to fire.
//!
//! The loop is an explicit worklist over the (finite, monotonically
//! shrinking) set of underived targets, so termination does not depend
//! on recursion depth or a dependency graph.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::confidence::SensitivityClass;
use crate::rules::RuleRegistry;
use crate::{Value, ValueMap};

/// A value produced by one cascade step, before confidence scoring.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Derivation {
    pub target: &'static str,
    pub value: Value,
    pub method: &'static str,
    /// 1-based pass in which the target was derived.
    pub iteration: usize,
    /// Distance from the direct inputs (1 = computed from inputs only).
    pub depth: usize,
    pub inputs: Vec<&'static str>,
    pub base_confidence: f64,
    pub citation: Option<&'static str>,
    /// Sensitivity of the formula at the inputs it was evaluated on.
    pub sensitivity: SensitivityClass,
}

/// Result of running the cascade to a fixpoint (or the cap).
#[derive(Debug, Clone, PartialEq)]
pub struct CascadeOutcome {
    /// Inputs plus every derived value.
    pub values: ValueMap,
    /// Derivations in the order they fired.
    pub derivations: Vec<Derivation>,
    /// Passes executed, including the final empty pass.
    pub iterations: usize,
    /// `false` only when the cap stopped a pass that was still deriving.
    pub fixpoint_reached: bool,
}

/// Fixpoint evaluator over a rule registry.
pub struct CascadeEvaluator<'a> {
    rules: &'a RuleRegistry,
    max_iterations: usize,
}

impl<'a> CascadeEvaluator<'a> {
    #[must_use]
    pub fn new(rules: &'a RuleRegistry, max_iterations: usize) -> Self {
        Self {
            rules,
            max_iterations,
        }
    }

    /// Run the cascade over `inputs`.
    ///
    /// Inputs are never overwritten; a target already present in the
    /// input map is never derived.
    #[must_use]
    pub fn run(&self, inputs: ValueMap) -> CascadeOutcome {
        let mut values = inputs;
        let mut derivations = Vec::new();
        let mut depths: BTreeMap<&'static str, usize> = BTreeMap::new();
        let mut iterations = 0;
        let mut fixpoint_reached = false;

        for iteration in 1..=self.max_iterations {
            iterations = iteration;
            let before = derivations.len();

            for rule in self.rules.iter() {
                if values.contains(rule.target) {
                    continue;
                }

                let fired = rule
                    .candidates
                    .iter()
                    .find_map(|c| c.evaluate(&values).map(|value| (c, value)));

                if let Some((candidate, value)) = fired {
                    let sensitivity = candidate.sensitivity.classify(&values);
                    let depth = 1 + candidate
                        .required_inputs
                        .iter()
                        .filter_map(|input| depths.get(input).copied())
                        .max()
                        .unwrap_or(0);
                    tracing::trace!(
                        target_name = rule.target,
                        method = candidate.method,
                        iteration,
                        depth,
                        "derived"
                    );
                    depths.insert(rule.target, depth);
                    values.insert_new(rule.target, value.clone());
                    derivations.push(Derivation {
                        target: rule.target,
                        value,
                        method: candidate.method,
                        iteration,
                        depth,
                        inputs: candidate.required_inputs.to_vec(),
                        base_confidence: candidate.base_confidence,
                        citation: candidate.citation,
                        sensitivity,
                    });
                }
            }

            let derived = derivations.len() - before;
            tracing::debug!(iteration, derived, "cascade pass complete");

            if derived == 0 {
                fixpoint_reached = true;
                break;
            }
        }

        if !fixpoint_reached {
            tracing::warn!(
                max_iterations = self.max_iterations,
                "cascade stopped at iteration cap before reaching a fixpoint"
            );
        }

        CascadeOutcome {
            values,
            derivations,
            iterations,
            fixpoint_reached,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{InferenceRule, RuleCandidate};

    fn values(pairs: &[(&str, f64)]) -> ValueMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::Number(*v)))
            .collect()
    }

    fn builtin() -> RuleRegistry {
        RuleRegistry::builtin().expect("builtin rules")
    }

    fn a_plus_one(v: &ValueMap) -> Option<Value> {
        Some(Value::Number(v.number("a")? + 1.0))
    }

    fn b_plus_one(v: &ValueMap) -> Option<Value> {
        Some(Value::Number(v.number("b")? + 1.0))
    }

    fn c_plus_one(v: &ValueMap) -> Option<Value> {
        Some(Value::Number(v.number("c")? + 1.0))
    }

    fn constant_ten(_: &ValueMap) -> Option<Value> {
        Some(Value::Number(10.0))
    }

    fn constant_twenty(_: &ValueMap) -> Option<Value> {
        Some(Value::Number(20.0))
    }

    /// Chain registered in reverse dependency order: d <- c <- b <- a.
    fn reversed_chain() -> RuleRegistry {
        RuleRegistry::new(vec![
            InferenceRule::new("d", "")
                .candidate(RuleCandidate::new("c1", &["c"], c_plus_one, 0.9)),
            InferenceRule::new("c", "")
                .candidate(RuleCandidate::new("b1", &["b"], b_plus_one, 0.9)),
            InferenceRule::new("b", "")
                .candidate(RuleCandidate::new("a1", &["a"], a_plus_one, 0.9)),
        ])
        .expect("registry")
    }

    #[test]
    fn lipid_panel_derivations() {
        let rules = builtin();
        let outcome = CascadeEvaluator::new(&rules, 20).run(values(&[
            ("total_cholesterol", 220.0),
            ("hdl", 42.0),
            ("triglycerides", 185.0),
        ]));

        assert!(outcome.fixpoint_reached);
        assert_eq!(outcome.values.number("ldl"), Some(141.0));
        assert_eq!(outcome.values.number("non_hdl"), Some(178.0));
        let castelli = outcome.values.number("castelli_1").expect("castelli_1");
        assert!((castelli - 5.238).abs() < 0.01);
    }

    #[test]
    fn first_satisfiable_candidate_wins() {
        let rules = RuleRegistry::new(vec![
            InferenceRule::new("x", "")
                .candidate(RuleCandidate::new("first", &["a"], constant_ten, 0.5))
                .candidate(RuleCandidate::new("second", &["a"], constant_twenty, 0.99)),
        ])
        .expect("registry");

        let outcome = CascadeEvaluator::new(&rules, 20).run(values(&[("a", 1.0)]));
        assert_eq!(outcome.values.number("x"), Some(10.0));
        assert_eq!(outcome.derivations[0].method, "first");
    }

    #[test]
    fn reverse_registration_needs_one_pass_per_level() {
        let rules = reversed_chain();
        let outcome = CascadeEvaluator::new(&rules, 20).run(values(&[("a", 0.0)]));

        let by_target: Vec<_> = outcome
            .derivations
            .iter()
            .map(|d| (d.target, d.iteration, d.depth))
            .collect();
        assert_eq!(by_target, vec![("b", 1, 1), ("c", 2, 2), ("d", 3, 3)]);
        assert_eq!(outcome.values.number("d"), Some(3.0));
        // Three productive passes plus the empty one.
        assert_eq!(outcome.iterations, 4);
        assert!(outcome.fixpoint_reached);
    }

    #[test]
    fn depth_counts_derived_inputs_not_passes() {
        let rules = builtin();
        let outcome = CascadeEvaluator::new(&rules, 20).run(values(&[
            ("total_cholesterol", 220.0),
            ("hdl", 42.0),
            ("triglycerides", 185.0),
            ("creatinine", 1.0),
        ]));

        let depth_of = |target: &str| {
            outcome
                .derivations
                .iter()
                .find(|d| d.target == target)
                .map(|d| (d.iteration, d.depth))
        };
        assert_eq!(depth_of("ldl"), Some((1, 1)));
        assert_eq!(depth_of("apob_estimated"), Some((1, 2)));
        assert_eq!(depth_of("egfr"), Some((1, 1)));
        assert_eq!(depth_of("ckd_stage"), Some((1, 2)));
    }

    #[test]
    fn iteration_cap_stops_loop() {
        let rules = reversed_chain();
        let outcome = CascadeEvaluator::new(&rules, 2).run(values(&[("a", 0.0)]));

        assert_eq!(outcome.iterations, 2);
        assert!(!outcome.fixpoint_reached);
        assert!(outcome.values.contains("c"));
        assert!(!outcome.values.contains("d"));
    }

    #[test]
    fn inputs_are_never_overwritten() {
        let rules = builtin();
        let outcome = CascadeEvaluator::new(&rules, 20).run(values(&[
            ("total_cholesterol", 220.0),
            ("hdl", 42.0),
            ("triglycerides", 185.0),
            ("ldl", 150.0),
        ]));

        assert_eq!(outcome.values.number("ldl"), Some(150.0));
        assert!(outcome.derivations.iter().all(|d| d.target != "ldl"));
    }

    #[test]
    fn high_triglycerides_block_ldl() {
        let rules = builtin();
        let outcome = CascadeEvaluator::new(&rules, 20).run(values(&[
            ("total_cholesterol", 220.0),
            ("hdl", 42.0),
            ("triglycerides", 450.0),
        ]));

        assert!(!outcome.values.contains("ldl"));
        assert!(outcome.values.contains("non_hdl"));
    }

    #[test]
    fn empty_input_reaches_fixpoint_immediately() {
        let rules = builtin();
        let outcome = CascadeEvaluator::new(&rules, 20).run(ValueMap::new());
        assert!(outcome.derivations.is_empty());
        assert_eq!(outcome.iterations, 1);
        assert!(outcome.fixpoint_reached);
    }

    #[test]
    fn fragile_sensitivity_recorded() {
        let rules = builtin();
        let outcome = CascadeEvaluator::new(&rules, 20)
            .run(values(&[("total_cholesterol", 180.0), ("hdl", 12.0)]));

        let castelli = outcome
            .derivations
            .iter()
            .find(|d| d.target == "castelli_1")
            .expect("castelli_1");
        assert_eq!(castelli.sensitivity, SensitivityClass::Fragile);
    }
}
