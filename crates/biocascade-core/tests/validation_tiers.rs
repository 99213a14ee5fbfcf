//! # Validation Tier Tests (T0-T3)
//!
//! If ANY tier fails, the engine is INVALID.
//!
//! ## Tiers
//! - T0: Input Integrity
//! - T1: Single-Level Derivation
//! - T2: Multi-Level Cascade and Suggestions
//! - T3: Consistency Validation and Confidence

use biocascade_core::{
    AnalysisResult, DerivationRecord, Engine, EvidenceGrade, FindingKind, Registry,
    ReliabilityClass, Severity, StateAssessment, ValidationStatus, Value, ValueMap,
};
use std::sync::Arc;

fn engine() -> Engine {
    Engine::new(Arc::new(Registry::builtin().expect("registry")))
}

fn panel(pairs: &[(&str, Value)]) -> ValueMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn n(x: f64) -> Value {
    Value::Number(x)
}

fn derivation<'a>(result: &'a AnalysisResult, target: &str) -> &'a DerivationRecord {
    result
        .derivations
        .iter()
        .find(|d| d.target == target)
        .expect("target derived")
}

// =============================================================================
// TIER T0: INPUT INTEGRITY
// =============================================================================

mod t0_input_integrity {
    use super::*;

    /// T0.1: Direct inputs survive unmodified.
    #[test]
    fn direct_inputs_unmodified() {
        let input = panel(&[("hdl", n(42.0)), ("age", n(45.0)), ("is_female", Value::Flag(true))]);
        let result = engine().analyze(&input);

        for (name, value) in input.iter() {
            assert_eq!(result.values.get(name), Some(value));
        }
    }

    /// T0.2: Non-finite inputs are rejected and reported, not fatal.
    #[test]
    fn non_finite_input_reported() {
        let input = panel(&[("hdl", n(f64::INFINITY)), ("total_cholesterol", n(200.0))]);
        let result = engine().analyze(&input);

        assert!(!result.values.contains("hdl"));
        let finding = result
            .validation
            .violations
            .iter()
            .find(|f| f.kind == FindingKind::MalformedInput)
            .expect("malformed finding");
        assert_eq!(finding.fields, vec!["hdl".to_string()]);
        assert_eq!(result.validation.status, ValidationStatus::Invalid);
    }

    /// T0.3: Out-of-bounds input yields exactly one error for that field.
    #[test]
    fn out_of_bounds_input_localized() {
        let input = panel(&[
            ("total_cholesterol", n(220.0)),
            ("hdl", n(42.0)),
            ("triglycerides", n(185.0)),
            ("fasting_glucose", n(2000.0)),
        ]);
        let result = engine().analyze(&input);

        let bound_findings: Vec<_> = result
            .validation
            .violations
            .iter()
            .filter(|f| f.kind == FindingKind::Bound)
            .collect();
        assert_eq!(bound_findings.len(), 1);
        assert_eq!(bound_findings[0].fields, vec!["fasting_glucose".to_string()]);
        assert_eq!(bound_findings[0].severity, Severity::Error);
    }

    /// T0.4: Identical input produces byte-identical output.
    #[test]
    fn analysis_is_idempotent() {
        let input = panel(&[
            ("total_cholesterol", n(220.0)),
            ("hdl", n(42.0)),
            ("triglycerides", n(185.0)),
            ("fasting_glucose", n(104.0)),
            ("fasting_insulin", n(14.0)),
            ("creatinine", n(1.1)),
            ("age", n(45.0)),
            ("is_female", Value::Flag(false)),
        ]);
        let engine = engine();
        let first = serde_json::to_string(&engine.analyze(&input)).expect("serialize");
        let second = serde_json::to_string(&engine.analyze(&input)).expect("serialize");
        assert_eq!(first, second);
    }
}

// =============================================================================
// TIER T1: SINGLE-LEVEL DERIVATION
// =============================================================================

mod t1_single_level {
    use super::*;

    /// T1.1: Lipid panel derives LDL, non-HDL and Castelli I.
    #[test]
    fn lipid_cascade() {
        let result = engine().analyze(&panel(&[
            ("total_cholesterol", n(220.0)),
            ("hdl", n(42.0)),
            ("triglycerides", n(185.0)),
        ]));

        let ldl = derivation(&result, "ldl");
        assert_eq!(ldl.value, n(141.0));
        assert_eq!(ldl.method, "friedewald");
        assert_eq!(ldl.iteration, 1);
        assert_eq!(ldl.confidence.evidence_grade, EvidenceGrade::PeerReviewed);

        assert_eq!(derivation(&result, "non_hdl").value, n(178.0));
        let castelli = derivation(&result, "castelli_1").value.as_number().expect("number");
        assert!((castelli - 5.238).abs() < 0.01);
    }

    /// T1.2: Male above the creatinine knot selects the matching CKD-EPI branch.
    #[test]
    fn ckd_epi_male_branch() {
        let result = engine().analyze(&panel(&[
            ("creatinine", n(1.1)),
            ("age", n(45.0)),
            ("is_female", Value::Flag(false)),
        ]));

        let egfr = derivation(&result, "egfr");
        assert_eq!(egfr.method, "ckd_epi_2021_male_high");
        let value = egfr.value.as_number().expect("number");
        assert!((value - 84.37).abs() < 0.05, "egfr = {}", value);
    }

    /// T1.3: Numeric 0/1 is accepted for the sex flag.
    #[test]
    fn numeric_sex_flag() {
        let result = engine().analyze(&panel(&[
            ("creatinine", n(0.6)),
            ("age", n(30.0)),
            ("is_female", n(1.0)),
        ]));
        assert_eq!(derivation(&result, "egfr").method, "ckd_epi_2021_female_low");
    }

    /// T1.4: Without age/sex the population-average fallback fires.
    #[test]
    fn egfr_fallback_without_context() {
        let result = engine().analyze(&panel(&[("creatinine", n(1.0))]));
        let egfr = derivation(&result, "egfr");
        assert_eq!(egfr.method, "ckd_epi_population_average");
        assert_eq!(egfr.confidence.evidence_grade, EvidenceGrade::DirectCalculation);
    }

    /// T1.5: TG >= 400 blocks every LDL candidate but not non-HDL.
    #[test]
    fn high_triglycerides_block_ldl() {
        let result = engine().analyze(&panel(&[
            ("total_cholesterol", n(220.0)),
            ("hdl", n(42.0)),
            ("triglycerides", n(450.0)),
        ]));

        assert!(!result.values.contains("ldl"));
        assert!(result.values.contains("non_hdl"));
        assert!(!result.values.contains("castelli_2"));
    }
}

// =============================================================================
// TIER T2: MULTI-LEVEL CASCADE AND SUGGESTIONS
// =============================================================================

mod t2_cascade {
    use super::*;

    /// T2.1: A target can consume a value derived earlier in the same pass.
    #[test]
    fn chained_derivations() {
        let result = engine().analyze(&panel(&[
            ("total_cholesterol", n(220.0)),
            ("hdl", n(42.0)),
            ("triglycerides", n(185.0)),
        ]));

        // castelli_2 needs ldl, which is derived earlier in the same pass
        let castelli_2 = derivation(&result, "castelli_2");
        assert_eq!(castelli_2.iteration, 1);

        assert!(result.summary.fixpoint_reached);
        assert!(result.summary.iterations >= 2);
    }

    /// T2.2: Renal chain derives stage from derived eGFR.
    #[test]
    fn renal_chain() {
        let result = engine().analyze(&panel(&[
            ("creatinine", n(1.1)),
            ("age", n(45.0)),
            ("is_female", Value::Flag(false)),
        ]));
        let stage = derivation(&result, "ckd_stage");
        assert_eq!(stage.value, Value::Label("G2".to_string()));
    }

    /// T2.3: Missing HDL is suggested and names everything it unlocks.
    #[test]
    fn missing_hdl_suggestion() {
        let result = engine().analyze_with(
            &panel(&[("total_cholesterol", n(220.0)), ("triglycerides", n(185.0))]),
            biocascade_core::OutputLimits {
                top_findings: None,
                top_suggestions: Some(50),
            },
        );

        assert!(!result.values.contains("ldl"));
        let ldl = result
            .suggestions
            .iter()
            .find(|s| s.target == "ldl")
            .expect("ldl suggestion");
        assert_eq!(ldl.missing_input, "hdl");
        for target in ["ldl", "non_hdl", "castelli_1"] {
            assert!(ldl.unlocks.iter().any(|t| t == target));
            assert!(ldl.rationale.contains(target));
        }
    }

    /// T2.4: Coverage accounting holds.
    #[test]
    fn coverage_accounting() {
        let input = panel(&[
            ("total_cholesterol", n(220.0)),
            ("hdl", n(42.0)),
            ("triglycerides", n(185.0)),
            ("fasting_glucose", n(104.0)),
        ]);
        let result = engine().analyze(&input);
        assert_eq!(
            result.values.len(),
            result.summary.direct_inputs + result.derivations.len()
        );
    }

    /// T2.5: States with all required signals are evaluated.
    #[test]
    fn lipid_state_evaluated() {
        let result = engine().analyze(&panel(&[
            ("total_cholesterol", n(220.0)),
            ("hdl", n(42.0)),
            ("triglycerides", n(185.0)),
        ]));
        let lipid = result.states.get("lipid_transport").expect("lipid state");
        let reading = lipid.reading().expect("evaluated");
        assert!(reading.confidence > 0.40 && reading.confidence <= 1.0);

        assert!(matches!(
            result.states.get("renal_filtration"),
            Some(StateAssessment::NotEvaluated { missing }) if missing == &vec!["egfr".to_string()]
        ));
    }
}

// =============================================================================
// TIER T3: CONSISTENCY VALIDATION AND CONFIDENCE
// =============================================================================

mod t3_consistency {
    use super::*;

    /// T3.1: eGFR/creatinine contradiction invalidates the panel and
    /// discounts every derivation.
    #[test]
    fn egfr_creatinine_contradiction() {
        let result = engine().analyze(&panel(&[("egfr", n(95.0)), ("creatinine", n(1.6))]));

        assert_eq!(result.validation.status, ValidationStatus::Invalid);
        let flag = result
            .validation
            .flags
            .iter()
            .find(|f| f.rule_id == "egfr_creatinine_coherence")
            .expect("flag");
        assert_eq!(flag.severity, Severity::Impossible);

        assert!(!result.derivations.is_empty());
        for record in &result.derivations {
            let expected = (record.confidence.raw_score * 0.60).clamp(0.0, 1.0);
            assert!((record.confidence.score - expected).abs() < 1e-12);
        }

        let stage = derivation(&result, "ckd_stage");
        assert!((stage.confidence.score - 0.54).abs() < 1e-9);
        assert_eq!(stage.confidence.reliability, ReliabilityClass::Low);
    }

    /// T3.2: Consistent panel keeps the pass-1 score.
    #[test]
    fn valid_panel_keeps_raw_score() {
        let result = engine().analyze(&panel(&[
            ("total_cholesterol", n(220.0)),
            ("hdl", n(42.0)),
            ("triglycerides", n(185.0)),
        ]));
        assert_eq!(result.validation.status, ValidationStatus::Valid);
        for record in &result.derivations {
            assert_eq!(record.confidence.score, record.confidence.raw_score.clamp(0.0, 1.0));
        }
    }

    /// T3.3: Confidence scores stay in [0, 1].
    #[test]
    fn confidence_bounds() {
        let result = engine().analyze(&panel(&[
            ("total_cholesterol", n(180.0)),
            ("hdl", n(12.0)),
            ("triglycerides", n(90.0)),
            ("fasting_glucose", n(90.0)),
            ("fasting_insulin", n(1.0)),
        ]));
        for record in &result.derivations {
            assert!((0.0..=1.0).contains(&record.confidence.score));
        }
    }

    /// T3.4: Mutual-exclusion findings are reported as such.
    #[test]
    fn iron_contradiction() {
        let result = engine().analyze(&panel(&[
            ("ferritin", n(10.0)),
            ("iron", n(200.0)),
            ("tibc", n(300.0)),
        ]));
        // transferrin saturation 66.7% derived from iron/tibc
        let flag = result
            .validation
            .flags
            .iter()
            .find(|f| f.rule_id == "iron_status_contradiction")
            .expect("flag");
        assert_eq!(flag.kind, FindingKind::MutualExclusion);
        assert_eq!(result.validation.status, ValidationStatus::Inconsistent);
    }
}
