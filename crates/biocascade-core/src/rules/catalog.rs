//! Built-in rule catalog.
//!
//! Target order here is the cascade's scan order, and candidate order is
//! the tie-break when more than one candidate is satisfiable. Alternative
//! formulas for the same target (e.g. Friedewald before Sampson for LDL)
//! are resolved by this order alone; there is no clinical precedence model.

use super::formulas as f;
use super::{InferenceRule, RuleCandidate, SensitivityProfile};

const fn near_zero(input: &'static str, threshold: f64) -> SensitivityProfile {
    SensitivityProfile::NearZero { input, threshold }
}

/// The built-in inference rules, in registration order.
#[must_use]
pub fn builtin_rules() -> Vec<InferenceRule> {
    let mut rules = lipid_rules();
    rules.extend(glycemic_rules());
    rules.extend(renal_rules());
    rules.extend(other_rules());
    rules
}

fn lipid_rules() -> Vec<InferenceRule> {
    vec![
        InferenceRule::new("vldl", "mg/dL")
            .candidate(RuleCandidate::new("tg_div_5", &["triglycerides"], f::vldl_from_tg, 0.85)),
        InferenceRule::new("ldl", "mg/dL")
            .interpreted_by(f::interpret_ldl)
            .candidate(
                RuleCandidate::new(
                    "friedewald",
                    &["total_cholesterol", "hdl", "triglycerides"],
                    f::friedewald_ldl,
                    0.90,
                )
                .when(&["triglycerides"], f::tg_below_400)
                .cited("friedewald_1972"),
            )
            .candidate(
                RuleCandidate::new(
                    "sampson_nih",
                    &["total_cholesterol", "hdl", "triglycerides"],
                    f::sampson_ldl,
                    0.85,
                )
                .when(&["triglycerides"], f::tg_below_400)
                .cited("sampson_2020")
                .sensitivity(SensitivityProfile::Moderate),
            ),
        InferenceRule::new("non_hdl", "mg/dL").candidate(RuleCandidate::new(
            "tc_minus_hdl",
            &["total_cholesterol", "hdl"],
            f::non_hdl,
            0.95,
        )),
        InferenceRule::new("castelli_1", "ratio").candidate(
            RuleCandidate::new("tc_hdl", &["total_cholesterol", "hdl"], f::castelli_1, 0.90)
                .sensitivity(near_zero("hdl", 20.0)),
        ),
        InferenceRule::new("castelli_2", "ratio").candidate(
            RuleCandidate::new("ldl_hdl", &["ldl", "hdl"], f::castelli_2, 0.90)
                .sensitivity(near_zero("hdl", 20.0)),
        ),
        InferenceRule::new("tg_hdl_ratio", "ratio")
            .interpreted_by(f::interpret_tg_hdl)
            .candidate(
                RuleCandidate::new("ratio", &["triglycerides", "hdl"], f::tg_hdl_ratio, 0.95)
                    .cited("mclaughlin_2003")
                    .sensitivity(near_zero("hdl", 20.0)),
            ),
        InferenceRule::new("atherogenic_index", "index")
            .high_value()
            .interpreted_by(f::interpret_aip)
            .candidate(
                RuleCandidate::new("aip", &["triglycerides", "hdl"], f::atherogenic_index, 0.85)
                    .cited("dobiasova_2001")
                    .sensitivity(near_zero("hdl", 20.0)),
            ),
        InferenceRule::new("remnant_cholesterol", "mg/dL")
            .high_value()
            .candidate(RuleCandidate::new(
                "direct",
                &["total_cholesterol", "ldl", "hdl"],
                f::remnant_direct,
                0.95,
            ))
            .candidate(RuleCandidate::new(
                "tg_approx",
                &["triglycerides"],
                f::remnant_from_tg,
                0.70,
            )),
        InferenceRule::new("apob_estimated", "mg/dL")
            .high_value()
            .candidate(RuleCandidate::new("ldl_regression", &["ldl"], f::apob_from_ldl, 0.75)),
    ]
}

fn glycemic_rules() -> Vec<InferenceRule> {
    vec![
        InferenceRule::new("hba1c_estimated", "%")
            .interpreted_by(f::interpret_hba1c)
            .candidate(
                RuleCandidate::new("gmi", &["mean_glucose"], f::gmi, 0.85).cited("bergenstal_2018"),
            )
            .candidate(RuleCandidate::new(
                "fg_proxy",
                &["fasting_glucose"],
                f::hba1c_from_fasting_glucose,
                0.60,
            )),
        InferenceRule::new("mean_glucose_estimated", "mg/dL")
            .candidate(RuleCandidate::new("eag", &["hba1c"], f::eag, 0.88).cited("nathan_2008")),
        InferenceRule::new("homa_ir", "index")
            .high_value()
            .interpreted_by(f::interpret_homa)
            .candidate(
                RuleCandidate::new(
                    "homa_ir",
                    &["fasting_glucose", "fasting_insulin"],
                    f::homa_ir,
                    0.90,
                )
                .cited("matthews_1985"),
            ),
        InferenceRule::new("quicki", "index").candidate(
            RuleCandidate::new("quicki", &["fasting_glucose", "fasting_insulin"], f::quicki, 0.85)
                .cited("katz_2000")
                .sensitivity(near_zero("fasting_insulin", 2.0)),
        ),
        InferenceRule::new("tyg_index", "index").high_value().candidate(
            RuleCandidate::new("tyg", &["triglycerides", "fasting_glucose"], f::tyg, 0.85)
                .cited("simental_2008")
                .sensitivity(SensitivityProfile::Moderate),
        ),
        InferenceRule::new("insulin_resistance_score", "index")
            .high_value()
            .candidate(RuleCandidate::new(
                "homa_ir",
                &["fasting_glucose", "fasting_insulin"],
                f::homa_ir,
                0.90,
            ))
            .candidate(
                RuleCandidate::new("tg_hdl", &["triglycerides", "hdl"], f::ir_from_tg_hdl, 0.75)
                    .sensitivity(near_zero("hdl", 20.0)),
            )
            .candidate(
                RuleCandidate::new("tyg", &["fasting_glucose", "triglycerides"], f::tyg, 0.80)
                    .sensitivity(SensitivityProfile::Moderate),
            ),
    ]
}

fn renal_rules() -> Vec<InferenceRule> {
    const EGFR_INPUTS: &[&str] = &["creatinine", "age", "is_female"];

    let ckd_epi = |method: &'static str, predicate: super::Applicability| {
        RuleCandidate::new(method, EGFR_INPUTS, f::ckd_epi_2021, 0.95)
            .when(&["creatinine", "is_female"], predicate)
            .cited("inker_2021")
            .sensitivity(SensitivityProfile::Moderate)
    };

    vec![
        InferenceRule::new("egfr", "mL/min/1.73m²")
            .high_value()
            .interpreted_by(f::interpret_egfr)
            .candidate(ckd_epi("ckd_epi_2021_female_low", f::female_at_or_below_knot))
            .candidate(ckd_epi("ckd_epi_2021_female_high", f::female_above_knot))
            .candidate(ckd_epi("ckd_epi_2021_male_low", f::male_at_or_below_knot))
            .candidate(ckd_epi("ckd_epi_2021_male_high", f::male_above_knot))
            .candidate(
                RuleCandidate::new(
                    "ckd_epi_population_average",
                    &["creatinine"],
                    f::egfr_population_average,
                    0.70,
                )
                .sensitivity(near_zero("creatinine", 0.2)),
            ),
        InferenceRule::new("ckd_stage", "category")
            .interpreted_by(f::interpret_ckd_stage)
            .candidate(
                RuleCandidate::new("kdigo_gfr_category", &["egfr"], f::ckd_stage, 0.90)
                    .cited("kdigo_2012"),
            ),
        InferenceRule::new("bun_creatinine_ratio", "ratio").candidate(
            RuleCandidate::new("ratio", &["bun", "creatinine"], f::bun_creatinine_ratio, 0.90)
                .sensitivity(near_zero("creatinine", 0.3)),
        ),
    ]
}

fn other_rules() -> Vec<InferenceRule> {
    vec![
        InferenceRule::new("bmi", "kg/m²")
            .interpreted_by(f::interpret_bmi)
            .candidate(
                RuleCandidate::new("wt_ht", &["weight_kg", "height_cm"], f::bmi, 0.99)
                    .sensitivity(near_zero("height_cm", 100.0)),
            ),
        InferenceRule::new("liver_fibrosis_score", "index")
            .high_value()
            .interpreted_by(f::interpret_fib4)
            .candidate(
                RuleCandidate::new("fib4", &["age", "ast", "alt", "platelets"], f::fib4, 0.85)
                    .cited("sterling_2006")
                    .sensitivity(near_zero("platelets", 50.0)),
            ),
        InferenceRule::new("ast_alt_ratio", "ratio").candidate(
            RuleCandidate::new("de_ritis", &["ast", "alt"], f::ast_alt_ratio, 0.90)
                .sensitivity(near_zero("alt", 5.0)),
        ),
        InferenceRule::new("anion_gap", "mmol/L").candidate(RuleCandidate::new(
            "na_minus_cl_hco3",
            &["sodium", "chloride", "bicarbonate"],
            f::anion_gap,
            0.95,
        )),
        InferenceRule::new("corrected_calcium", "mg/dL").candidate(
            RuleCandidate::new(
                "payne",
                &["calcium", "albumin"],
                f::corrected_calcium,
                0.90,
            )
            .cited("payne_1973"),
        ),
        InferenceRule::new("transferrin_saturation", "%")
            .interpreted_by(f::interpret_transferrin_saturation)
            .candidate(
                RuleCandidate::new(
                    "iron_over_tibc",
                    &["iron", "tibc"],
                    f::transferrin_saturation,
                    0.95,
                )
                .sensitivity(near_zero("tibc", 150.0)),
            ),
    ]
}
