//! # Formula Executor
//!
//! Pure formula functions referenced by rule candidates, plus the
//! applicability predicates and interpreters of the built-in catalog.
//!
//! Formulas return `None` for an unmet precondition. Division by zero and
//! logs of non-positive numbers produce non-finite results, which the
//! cascade rejects the same way.

use crate::primitives::{AGE_KEY, SEX_KEY};
use crate::rules::Interpretation;
use crate::{Value, ValueMap};

fn num(v: &ValueMap, name: &str) -> Option<f64> {
    v.number(name)
}

fn number(x: f64) -> Option<Value> {
    Some(Value::Number(x))
}

fn positive(x: f64) -> Option<Value> {
    (x > 0.0).then_some(Value::Number(x))
}

// =============================================================================
// LIPIDS
// =============================================================================

/// VLDL cholesterol as TG / 5.
pub fn vldl_from_tg(v: &ValueMap) -> Option<Value> {
    number(num(v, "triglycerides")? / 5.0)
}

/// Friedewald LDL. Undefined at TG >= 400 mg/dL.
pub fn friedewald_ldl(v: &ValueMap) -> Option<Value> {
    let tc = num(v, "total_cholesterol")?;
    let hdl = num(v, "hdl")?;
    let tg = num(v, "triglycerides")?;
    if tg >= 400.0 {
        return None;
    }
    positive(tc - hdl - tg / 5.0)
}

/// Sampson (NIH) LDL equation.
pub fn sampson_ldl(v: &ValueMap) -> Option<Value> {
    let tc = num(v, "total_cholesterol")?;
    let hdl = num(v, "hdl")?;
    let tg = num(v, "triglycerides")?;
    let non_hdl = tc - hdl;
    positive(
        tc / 0.948 - hdl / 0.971 - (tg / 8.56 + tg * non_hdl / 2140.0 - tg * tg / 16100.0) - 9.44,
    )
}

pub fn tg_below_400(v: &ValueMap) -> bool {
    num(v, "triglycerides").is_some_and(|tg| tg < 400.0)
}

pub fn non_hdl(v: &ValueMap) -> Option<Value> {
    number(num(v, "total_cholesterol")? - num(v, "hdl")?)
}

pub fn castelli_1(v: &ValueMap) -> Option<Value> {
    number(num(v, "total_cholesterol")? / num(v, "hdl")?)
}

pub fn castelli_2(v: &ValueMap) -> Option<Value> {
    number(num(v, "ldl")? / num(v, "hdl")?)
}

pub fn tg_hdl_ratio(v: &ValueMap) -> Option<Value> {
    number(num(v, "triglycerides")? / num(v, "hdl")?)
}

/// Atherogenic index of plasma: log10(TG/HDL) in mmol/L.
pub fn atherogenic_index(v: &ValueMap) -> Option<Value> {
    let tg_mmol = num(v, "triglycerides")? / 88.57;
    let hdl_mmol = num(v, "hdl")? / 38.67;
    number((tg_mmol / hdl_mmol).log10())
}

pub fn remnant_direct(v: &ValueMap) -> Option<Value> {
    number(num(v, "total_cholesterol")? - num(v, "ldl")? - num(v, "hdl")?)
}

pub fn remnant_from_tg(v: &ValueMap) -> Option<Value> {
    number(num(v, "triglycerides")? / 5.0)
}

pub fn apob_from_ldl(v: &ValueMap) -> Option<Value> {
    positive(num(v, "ldl")? * 0.9)
}

// =============================================================================
// GLYCEMIC
// =============================================================================

/// Glucose management indicator from mean glucose.
pub fn gmi(v: &ValueMap) -> Option<Value> {
    number(3.31 + 0.02392 * num(v, "mean_glucose")?)
}

pub fn hba1c_from_fasting_glucose(v: &ValueMap) -> Option<Value> {
    number(2.0 + num(v, "fasting_glucose")? / 35.0)
}

/// Estimated average glucose from HbA1c.
pub fn eag(v: &ValueMap) -> Option<Value> {
    positive(28.7 * num(v, "hba1c")? - 46.7)
}

pub fn homa_ir(v: &ValueMap) -> Option<Value> {
    number(num(v, "fasting_glucose")? * num(v, "fasting_insulin")? / 405.0)
}

pub fn quicki(v: &ValueMap) -> Option<Value> {
    let insulin = num(v, "fasting_insulin")?;
    let glucose = num(v, "fasting_glucose")?;
    number(1.0 / (insulin.log10() + glucose.log10()))
}

/// Triglyceride-glucose index.
pub fn tyg(v: &ValueMap) -> Option<Value> {
    number((num(v, "triglycerides")? * num(v, "fasting_glucose")? / 2.0).ln())
}

/// TG/HDL surrogate scaled onto the HOMA range, capped at 10.
pub fn ir_from_tg_hdl(v: &ValueMap) -> Option<Value> {
    number((num(v, "triglycerides")? / num(v, "hdl")? / 0.4).min(10.0))
}

// =============================================================================
// RENAL
// =============================================================================

fn is_female(v: &ValueMap) -> Option<bool> {
    v.flag(SEX_KEY)
}

pub fn female_at_or_below_knot(v: &ValueMap) -> bool {
    is_female(v) == Some(true) && num(v, "creatinine").is_some_and(|cr| cr <= 0.7)
}

pub fn female_above_knot(v: &ValueMap) -> bool {
    is_female(v) == Some(true) && num(v, "creatinine").is_some_and(|cr| cr > 0.7)
}

pub fn male_at_or_below_knot(v: &ValueMap) -> bool {
    is_female(v) == Some(false) && num(v, "creatinine").is_some_and(|cr| cr <= 0.9)
}

pub fn male_above_knot(v: &ValueMap) -> bool {
    is_female(v) == Some(false) && num(v, "creatinine").is_some_and(|cr| cr > 0.9)
}

/// CKD-EPI 2021 race-free creatinine equation.
pub fn ckd_epi_2021(v: &ValueMap) -> Option<Value> {
    let cr = num(v, "creatinine")?;
    let age = num(v, AGE_KEY)?;
    let female = is_female(v)?;

    let (kappa, alpha, sex_factor) = if female {
        (0.7, -0.241, 1.012)
    } else {
        (0.9, -0.302, 1.0)
    };
    let scaled = cr / kappa;
    let exponent = if scaled <= 1.0 { alpha } else { -1.200 };

    positive(142.0 * scaled.powf(exponent) * 0.9938_f64.powf(age) * sex_factor)
}

/// Sex- and age-agnostic eGFR approximation (mid-knot, age 50).
pub fn egfr_population_average(v: &ValueMap) -> Option<Value> {
    let cr = num(v, "creatinine")?;
    positive(142.0 * (cr / 0.8).powf(-0.8) * 0.9938_f64.powi(50))
}

/// KDIGO GFR category.
pub fn ckd_stage(v: &ValueMap) -> Option<Value> {
    let egfr = num(v, "egfr")?;
    if egfr < 0.0 {
        return None;
    }
    let stage = match egfr {
        x if x >= 90.0 => "G1",
        x if x >= 60.0 => "G2",
        x if x >= 45.0 => "G3a",
        x if x >= 30.0 => "G3b",
        x if x >= 15.0 => "G4",
        _ => "G5",
    };
    Some(Value::Label(stage.to_string()))
}

pub fn bun_creatinine_ratio(v: &ValueMap) -> Option<Value> {
    number(num(v, "bun")? / num(v, "creatinine")?)
}

// =============================================================================
// ANTHROPOMETRIC, HEPATIC, ELECTROLYTES, IRON
// =============================================================================

pub fn bmi(v: &ValueMap) -> Option<Value> {
    let metres = num(v, "height_cm")? / 100.0;
    number(num(v, "weight_kg")? / (metres * metres))
}

/// FIB-4 index.
pub fn fib4(v: &ValueMap) -> Option<Value> {
    let age = num(v, AGE_KEY)?;
    let ast = num(v, "ast")?;
    let alt = num(v, "alt")?;
    let platelets = num(v, "platelets")?;
    number(age * ast / (platelets * alt.sqrt()))
}

pub fn ast_alt_ratio(v: &ValueMap) -> Option<Value> {
    number(num(v, "ast")? / num(v, "alt")?)
}

pub fn anion_gap(v: &ValueMap) -> Option<Value> {
    number(num(v, "sodium")? - (num(v, "chloride")? + num(v, "bicarbonate")?))
}

/// Calcium corrected for albumin (Payne).
pub fn corrected_calcium(v: &ValueMap) -> Option<Value> {
    number(num(v, "calcium")? + 0.8 * (4.0 - num(v, "albumin")?))
}

pub fn transferrin_saturation(v: &ValueMap) -> Option<Value> {
    number(num(v, "iron")? / num(v, "tibc")? * 100.0)
}

// =============================================================================
// INTERPRETERS
// =============================================================================

pub fn interpret_ldl(value: &Value) -> Option<Interpretation> {
    let ldl = value.as_number()?;
    Some(match ldl {
        x if x >= 190.0 => Interpretation::new("very_high", "LDL at or above 190 mg/dL", true),
        x if x >= 160.0 => Interpretation::new("high", "LDL 160-189 mg/dL", true),
        x if x >= 130.0 => Interpretation::new("borderline_high", "LDL 130-159 mg/dL", false),
        x if x >= 100.0 => Interpretation::new("near_optimal", "LDL 100-129 mg/dL", false),
        _ => Interpretation::new("optimal", "LDL below 100 mg/dL", false),
    })
}

pub fn interpret_tg_hdl(value: &Value) -> Option<Interpretation> {
    let ratio = value.as_number()?;
    Some(if ratio >= 3.5 {
        Interpretation::new("elevated", "TG/HDL at or above 3.5 suggests insulin resistance", true)
    } else {
        Interpretation::new("normal", "TG/HDL below 3.5", false)
    })
}

pub fn interpret_aip(value: &Value) -> Option<Interpretation> {
    let aip = value.as_number()?;
    Some(match aip {
        x if x > 0.24 => Interpretation::new("high_risk", "AIP above 0.24", true),
        x if x >= 0.11 => Interpretation::new("intermediate_risk", "AIP 0.11-0.24", false),
        _ => Interpretation::new("low_risk", "AIP below 0.11", false),
    })
}

pub fn interpret_hba1c(value: &Value) -> Option<Interpretation> {
    let a1c = value.as_number()?;
    Some(match a1c {
        x if x >= 6.5 => Interpretation::new("diabetic_range", "HbA1c at or above 6.5%", true),
        x if x >= 5.7 => Interpretation::new("prediabetic_range", "HbA1c 5.7-6.4%", true),
        _ => Interpretation::new("normal", "HbA1c below 5.7%", false),
    })
}

pub fn interpret_homa(value: &Value) -> Option<Interpretation> {
    let homa = value.as_number()?;
    Some(match homa {
        x if x >= 2.9 => Interpretation::new("insulin_resistant", "HOMA-IR at or above 2.9", true),
        x if x >= 1.9 => Interpretation::new("early_resistance", "HOMA-IR 1.9-2.9", false),
        _ => Interpretation::new("insulin_sensitive", "HOMA-IR below 1.9", false),
    })
}

pub fn interpret_egfr(value: &Value) -> Option<Interpretation> {
    let egfr = value.as_number()?;
    Some(match egfr {
        x if x >= 90.0 => Interpretation::new("normal", "eGFR at or above 90", false),
        x if x >= 60.0 => Interpretation::new("mildly_reduced", "eGFR 60-89", false),
        x if x >= 30.0 => Interpretation::new("moderately_reduced", "eGFR 30-59", true),
        _ => Interpretation::new("severely_reduced", "eGFR below 30", true),
    })
}

pub fn interpret_ckd_stage(value: &Value) -> Option<Interpretation> {
    let stage = value.as_label()?;
    let concerning = !matches!(stage, "G1" | "G2");
    Some(Interpretation::new(
        stage,
        &format!("KDIGO GFR category {}", stage),
        concerning,
    ))
}

pub fn interpret_bmi(value: &Value) -> Option<Interpretation> {
    let bmi = value.as_number()?;
    Some(match bmi {
        x if x >= 30.0 => Interpretation::new("obese", "BMI at or above 30", true),
        x if x >= 25.0 => Interpretation::new("overweight", "BMI 25-29.9", false),
        x if x >= 18.5 => Interpretation::new("normal", "BMI 18.5-24.9", false),
        _ => Interpretation::new("underweight", "BMI below 18.5", true),
    })
}

pub fn interpret_fib4(value: &Value) -> Option<Interpretation> {
    let fib4 = value.as_number()?;
    Some(match fib4 {
        x if x > 2.67 => Interpretation::new("high_risk", "FIB-4 above 2.67", true),
        x if x >= 1.3 => Interpretation::new("indeterminate", "FIB-4 1.3-2.67", true),
        _ => Interpretation::new("low_risk", "FIB-4 below 1.3", false),
    })
}

pub fn interpret_transferrin_saturation(value: &Value) -> Option<Interpretation> {
    let tsat = value.as_number()?;
    Some(match tsat {
        x if x > 50.0 => Interpretation::new("elevated", "Transferrin saturation above 50%", true),
        x if x < 16.0 => Interpretation::new("low", "Transferrin saturation below 16%", true),
        _ => Interpretation::new("normal", "Transferrin saturation 16-50%", false),
    })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, f64)]) -> ValueMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::Number(*v)))
            .collect()
    }

    fn as_num(v: Option<Value>) -> f64 {
        v.and_then(|v| v.as_number()).expect("numeric result")
    }

    #[test]
    fn friedewald_matches_hand_calculation() {
        let v = values(&[
            ("total_cholesterol", 220.0),
            ("hdl", 42.0),
            ("triglycerides", 185.0),
        ]);
        assert!((as_num(friedewald_ldl(&v)) - 141.0).abs() < 1e-9);
    }

    #[test]
    fn friedewald_undefined_at_high_tg() {
        let v = values(&[
            ("total_cholesterol", 220.0),
            ("hdl", 42.0),
            ("triglycerides", 450.0),
        ]);
        assert!(friedewald_ldl(&v).is_none());
        assert!(!tg_below_400(&v));
    }

    #[test]
    fn ckd_epi_male_above_knot() {
        let mut v = values(&[("creatinine", 1.1), ("age", 45.0)]);
        v.insert_new("is_female", Value::Flag(false));
        assert!(male_above_knot(&v));
        assert!(!male_at_or_below_knot(&v));
        let egfr = as_num(ckd_epi_2021(&v));
        assert!((egfr - 84.3).abs() < 1.0, "egfr = {}", egfr);
    }

    #[test]
    fn ckd_epi_requires_sex() {
        let v = values(&[("creatinine", 1.1), ("age", 45.0)]);
        assert!(ckd_epi_2021(&v).is_none());
        assert!(!male_above_knot(&v));
    }

    #[test]
    fn ckd_stage_bands() {
        assert_eq!(ckd_stage(&values(&[("egfr", 95.0)])), Some(Value::Label("G1".into())));
        assert_eq!(ckd_stage(&values(&[("egfr", 50.0)])), Some(Value::Label("G3a".into())));
        assert_eq!(ckd_stage(&values(&[("egfr", 10.0)])), Some(Value::Label("G5".into())));
    }

    #[test]
    fn division_by_zero_is_not_finite() {
        let v = values(&[("total_cholesterol", 200.0), ("hdl", 0.0)]);
        let result = castelli_1(&v);
        assert!(!result.is_some_and(|v| v.is_defined()));
    }

    #[test]
    fn log_of_non_positive_is_not_finite() {
        let v = values(&[("triglycerides", 0.0), ("fasting_glucose", 90.0)]);
        assert!(!tyg(&v).is_some_and(|v| v.is_defined()));
    }

    #[test]
    fn interpreters_flag_concerning_values() {
        assert!(interpret_ldl(&Value::Number(170.0)).is_some_and(|i| i.concerning));
        assert!(!interpret_ldl(&Value::Number(90.0)).is_some_and(|i| i.concerning));
        assert!(interpret_ckd_stage(&Value::Label("G4".into())).is_some_and(|i| i.concerning));
        assert!(interpret_egfr(&Value::Label("G4".into())).is_none());
    }
}
