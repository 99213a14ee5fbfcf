//! Built-in physiological state catalog.

use super::{
    GlycemicLabel, HepaticLabel, IronLabel, LipidLabel, PhysiologicalStateDefinition, RenalLabel,
    ScoreBand, ScoreCard, StateLabel,
};
use crate::ValueMap;

/// The built-in states, in reporting order.
#[must_use]
pub fn builtin_states() -> Vec<PhysiologicalStateDefinition> {
    vec![
        glycemic_regulation(),
        lipid_transport(),
        renal_filtration(),
        hepatic_strain(),
        iron_homeostasis(),
    ]
}

/// First present value among `names`.
fn first_number(values: &ValueMap, names: &[&str]) -> Option<f64> {
    names.iter().find_map(|name| values.number(name))
}

fn band(
    min_score: f64,
    label: StateLabel,
    lab_anchor: &'static str,
    actions: &'static [&'static str],
    concerning: bool,
) -> ScoreBand {
    ScoreBand {
        min_score,
        label,
        lab_anchor,
        actions,
        concerning,
    }
}

// =============================================================================
// GLYCEMIC
// =============================================================================

fn glycemic_regulation() -> PhysiologicalStateDefinition {
    use GlycemicLabel as L;
    PhysiologicalStateDefinition {
        id: "glycemic_regulation",
        description: "Fasting and long-term glucose control with insulin sensitivity",
        required: &["fasting_glucose"],
        supporting: &["hba1c", "homa_ir", "tyg_index", "fasting_insulin"],
        bands: vec![
            band(
                85.0,
                StateLabel::Glycemic(L::Optimal),
                "Fasting glucose < 100 mg/dL, HbA1c < 5.7%",
                &["Maintain current habits", "Recheck fasting glucose annually"],
                false,
            ),
            band(
                65.0,
                StateLabel::Glycemic(L::Compensated),
                "Glucose near range with early insulin resistance markers",
                &["Increase physical activity", "Recheck HbA1c in 6 months"],
                false,
            ),
            band(
                40.0,
                StateLabel::Glycemic(L::Impaired),
                "Fasting glucose 100-125 mg/dL or HbA1c 5.7-6.4%",
                &[
                    "Discuss prediabetes screening with a clinician",
                    "Add fasting insulin to next panel",
                ],
                true,
            ),
            band(
                0.0,
                StateLabel::Glycemic(L::Dysregulated),
                "Fasting glucose >= 126 mg/dL or HbA1c >= 6.5%",
                &["Seek clinical evaluation for diabetes", "Confirm with repeat testing"],
                true,
            ),
        ],
        score: score_glycemic,
    }
}

fn score_glycemic(v: &ValueMap) -> ScoreCard {
    let mut card = ScoreCard::new();

    if let Some(fg) = v.number("fasting_glucose") {
        if fg >= 126.0 {
            card.deduct(40.0, format!("fasting glucose {:.0} mg/dL in diabetic range", fg));
        } else if fg >= 100.0 {
            card.deduct(20.0, format!("fasting glucose {:.0} mg/dL impaired", fg));
        } else if fg < 70.0 {
            card.deduct(15.0, format!("fasting glucose {:.0} mg/dL below 70", fg));
        }
    }
    if let Some(a1c) = first_number(v, &["hba1c", "hba1c_estimated"]) {
        if a1c >= 6.5 {
            card.deduct(25.0, format!("HbA1c {:.1}% in diabetic range", a1c));
        } else if a1c >= 5.7 {
            card.deduct(10.0, format!("HbA1c {:.1}% in prediabetic range", a1c));
        }
    }
    if let Some(homa) = v.number("homa_ir")
        && homa >= 2.9
    {
        card.deduct(15.0, format!("HOMA-IR {:.1} indicates insulin resistance", homa));
    }
    if let Some(tyg) = v.number("tyg_index")
        && tyg >= 8.8
    {
        card.deduct(10.0, format!("TyG index {:.2} elevated", tyg));
    }

    card
}

// =============================================================================
// LIPID
// =============================================================================

fn lipid_transport() -> PhysiologicalStateDefinition {
    use LipidLabel as L;
    PhysiologicalStateDefinition {
        id: "lipid_transport",
        description: "Atherogenic burden of circulating lipoproteins",
        required: &["total_cholesterol", "hdl"],
        supporting: &[
            "ldl",
            "triglycerides",
            "non_hdl",
            "atherogenic_index",
            "apob_estimated",
        ],
        bands: vec![
            band(
                80.0,
                StateLabel::Lipid(L::Favorable),
                "LDL < 130 mg/dL, HDL >= 40 mg/dL, TG < 150 mg/dL",
                &["Maintain current habits"],
                false,
            ),
            band(
                60.0,
                StateLabel::Lipid(L::Borderline),
                "LDL 130-159 mg/dL or TG 150-199 mg/dL",
                &["Review dietary saturated fat", "Repeat lipid panel in 6-12 months"],
                false,
            ),
            band(
                35.0,
                StateLabel::Lipid(L::Atherogenic),
                "LDL >= 160 mg/dL or TG >= 200 mg/dL with low HDL",
                &["Discuss cardiovascular risk with a clinician", "Consider ApoB measurement"],
                true,
            ),
            band(
                0.0,
                StateLabel::Lipid(L::HighRisk),
                "LDL >= 190 mg/dL or TG >= 500 mg/dL",
                &["Seek clinical lipid evaluation", "Screen for familial hypercholesterolemia"],
                true,
            ),
        ],
        score: score_lipid,
    }
}

fn score_lipid(v: &ValueMap) -> ScoreCard {
    let mut card = ScoreCard::new();

    if let Some(ldl) = v.number("ldl") {
        if ldl >= 190.0 {
            card.deduct(35.0, format!("LDL {:.0} mg/dL very high", ldl));
        } else if ldl >= 160.0 {
            card.deduct(25.0, format!("LDL {:.0} mg/dL high", ldl));
        } else if ldl >= 130.0 {
            card.deduct(10.0, format!("LDL {:.0} mg/dL borderline high", ldl));
        }
    }
    if let Some(hdl) = v.number("hdl")
        && hdl < 40.0
    {
        card.deduct(15.0, format!("HDL {:.0} mg/dL low", hdl));
    }
    if let Some(tg) = v.number("triglycerides") {
        if tg >= 500.0 {
            card.deduct(30.0, format!("triglycerides {:.0} mg/dL very high", tg));
        } else if tg >= 200.0 {
            card.deduct(20.0, format!("triglycerides {:.0} mg/dL high", tg));
        } else if tg >= 150.0 {
            card.deduct(10.0, format!("triglycerides {:.0} mg/dL borderline", tg));
        }
    }
    if let Some(non_hdl) = v.number("non_hdl")
        && non_hdl >= 190.0
    {
        card.deduct(10.0, format!("non-HDL {:.0} mg/dL high", non_hdl));
    }
    if let Some(aip) = v.number("atherogenic_index")
        && aip > 0.24
    {
        card.deduct(10.0, format!("atherogenic index {:.2} high risk", aip));
    }

    card
}

// =============================================================================
// RENAL
// =============================================================================

fn renal_filtration() -> PhysiologicalStateDefinition {
    use RenalLabel as L;
    PhysiologicalStateDefinition {
        id: "renal_filtration",
        description: "Glomerular filtration capacity",
        required: &["egfr"],
        supporting: &["creatinine", "bun_creatinine_ratio", "age"],
        bands: vec![
            band(
                85.0,
                StateLabel::Renal(L::Preserved),
                "eGFR >= 90 mL/min/1.73m² (KDIGO G1)",
                &["No action needed"],
                false,
            ),
            band(
                65.0,
                StateLabel::Renal(L::MildlyReduced),
                "eGFR 60-89 mL/min/1.73m² (KDIGO G2)",
                &["Recheck eGFR annually", "Check urine albumin-to-creatinine ratio"],
                false,
            ),
            band(
                40.0,
                StateLabel::Renal(L::ModeratelyReduced),
                "eGFR 30-59 mL/min/1.73m² (KDIGO G3)",
                &["Discuss kidney function with a clinician", "Review nephrotoxic medications"],
                true,
            ),
            band(
                0.0,
                StateLabel::Renal(L::SeverelyReduced),
                "eGFR < 30 mL/min/1.73m² (KDIGO G4-G5)",
                &["Seek nephrology evaluation"],
                true,
            ),
        ],
        score: score_renal,
    }
}

fn score_renal(v: &ValueMap) -> ScoreCard {
    let mut card = ScoreCard::new();

    if let Some(egfr) = v.number("egfr") {
        let penalty = if egfr < 15.0 {
            Some(70.0)
        } else if egfr < 30.0 {
            Some(55.0)
        } else if egfr < 45.0 {
            Some(40.0)
        } else if egfr < 60.0 {
            Some(30.0)
        } else if egfr < 90.0 {
            Some(10.0)
        } else {
            None
        };
        if let Some(points) = penalty {
            card.deduct(points, format!("eGFR {:.0} mL/min/1.73m² below 90", egfr));
        }
    }
    if let Some(ratio) = v.number("bun_creatinine_ratio")
        && ratio > 20.0
    {
        card.deduct(10.0, format!("BUN/creatinine ratio {:.1} suggests prerenal pattern", ratio));
    }

    card
}

// =============================================================================
// HEPATIC
// =============================================================================

fn hepatic_strain() -> PhysiologicalStateDefinition {
    use HepaticLabel as L;
    PhysiologicalStateDefinition {
        id: "hepatic_strain",
        description: "Hepatocellular injury and fibrosis risk",
        required: &["alt", "ast"],
        supporting: &["liver_fibrosis_score", "ast_alt_ratio", "platelets"],
        bands: vec![
            band(
                85.0,
                StateLabel::Hepatic(L::Quiescent),
                "ALT and AST <= 40 U/L",
                &["No action needed"],
                false,
            ),
            band(
                65.0,
                StateLabel::Hepatic(L::Reactive),
                "Mild transaminase elevation",
                &["Limit alcohol", "Repeat liver panel in 3 months"],
                false,
            ),
            band(
                40.0,
                StateLabel::Hepatic(L::Strained),
                "Transaminases > 3x upper limit or indeterminate FIB-4",
                &["Discuss liver enzymes with a clinician", "Consider hepatic ultrasound"],
                true,
            ),
            band(
                0.0,
                StateLabel::Hepatic(L::FibroticRisk),
                "FIB-4 > 2.67 or marked transaminase elevation",
                &["Seek hepatology evaluation", "Consider elastography"],
                true,
            ),
        ],
        score: score_hepatic,
    }
}

fn score_hepatic(v: &ValueMap) -> ScoreCard {
    let mut card = ScoreCard::new();

    if let Some(alt) = v.number("alt") {
        if alt > 120.0 {
            card.deduct(30.0, format!("ALT {:.0} U/L above 3x upper limit", alt));
        } else if alt > 40.0 {
            card.deduct(15.0, format!("ALT {:.0} U/L elevated", alt));
        }
    }
    if let Some(ast) = v.number("ast") {
        if ast > 120.0 {
            card.deduct(25.0, format!("AST {:.0} U/L above 3x upper limit", ast));
        } else if ast > 40.0 {
            card.deduct(10.0, format!("AST {:.0} U/L elevated", ast));
        }
    }
    if let Some(fib4) = v.number("liver_fibrosis_score") {
        if fib4 > 2.67 {
            card.deduct(35.0, format!("FIB-4 {:.2} suggests advanced fibrosis", fib4));
        } else if fib4 >= 1.3 {
            card.deduct(15.0, format!("FIB-4 {:.2} indeterminate", fib4));
        }
    }
    if let Some(ratio) = v.number("ast_alt_ratio")
        && ratio > 2.0
    {
        card.deduct(10.0, format!("AST/ALT ratio {:.2} above 2", ratio));
    }
    if let Some(platelets) = v.number("platelets")
        && platelets < 150.0
    {
        card.deduct(10.0, format!("platelets {:.0} ×10⁹/L low", platelets));
    }

    card
}

// =============================================================================
// IRON
// =============================================================================

fn iron_homeostasis() -> PhysiologicalStateDefinition {
    use IronLabel as L;
    PhysiologicalStateDefinition {
        id: "iron_homeostasis",
        description: "Iron stores and transport saturation",
        required: &["ferritin"],
        supporting: &["transferrin_saturation", "iron", "crp"],
        bands: vec![
            band(
                80.0,
                StateLabel::Iron(L::Balanced),
                "Ferritin 30-300 ng/mL, transferrin saturation 16-50%",
                &["No action needed"],
                false,
            ),
            band(
                60.0,
                StateLabel::Iron(L::Borderline),
                "Ferritin 15-30 ng/mL or mildly abnormal saturation",
                &["Review dietary iron intake", "Recheck ferritin in 3 months"],
                false,
            ),
            band(
                35.0,
                StateLabel::Iron(L::Disturbed),
                "Ferritin < 15 or > 300 ng/mL with abnormal saturation",
                &["Discuss iron studies with a clinician"],
                true,
            ),
            band(
                0.0,
                StateLabel::Iron(L::Severe),
                "Depleted stores or overload pattern",
                &["Seek clinical evaluation for iron deficiency or overload"],
                true,
            ),
        ],
        score: score_iron,
    }
}

fn score_iron(v: &ValueMap) -> ScoreCard {
    let mut card = ScoreCard::new();

    if let Some(ferritin) = v.number("ferritin") {
        if ferritin < 15.0 {
            card.deduct(40.0, format!("ferritin {:.0} ng/mL depleted", ferritin));
        } else if ferritin < 30.0 {
            card.deduct(20.0, format!("ferritin {:.0} ng/mL low", ferritin));
        } else if ferritin > 500.0 {
            card.deduct(30.0, format!("ferritin {:.0} ng/mL markedly high", ferritin));
        } else if ferritin > 300.0 {
            card.deduct(15.0, format!("ferritin {:.0} ng/mL high", ferritin));
        }
    }
    if let Some(tsat) = v.number("transferrin_saturation") {
        if tsat < 16.0 {
            card.deduct(20.0, format!("transferrin saturation {:.0}% low", tsat));
        } else if tsat > 50.0 {
            card.deduct(25.0, format!("transferrin saturation {:.0}% high", tsat));
        }
    }
    if let Some(crp) = v.number("crp")
        && crp > 10.0
    {
        card.deduct(10.0, format!("CRP {:.1} mg/L; ferritin may be inflated", crp));
    }

    card
}
