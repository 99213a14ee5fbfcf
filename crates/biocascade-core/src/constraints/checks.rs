//! Cross-field consistency checks.
//!
//! A check names the fields it reads and runs only once all of them are
//! present in the merged map. Its predicate returns `None` when the panel
//! is consistent.

use serde::Serialize;
use std::collections::BTreeSet;

use super::{ConstraintFinding, FindingKind, Severity};
use crate::{CascadeError, ValueMap};

/// Predicate over the merged map. `Some` carries severity and message.
pub type CheckFn = fn(&ValueMap) -> Option<(Severity, String)>;

/// Directional relationships versus states that cannot co-occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    Directional,
    MutualExclusion,
}

impl From<CheckKind> for FindingKind {
    fn from(kind: CheckKind) -> Self {
        match kind {
            CheckKind::Directional => FindingKind::Directional,
            CheckKind::MutualExclusion => FindingKind::MutualExclusion,
        }
    }
}

/// One named consistency check.
#[derive(Debug, Clone)]
pub struct ConsistencyCheck {
    pub id: &'static str,
    pub kind: CheckKind,
    pub fields: &'static [&'static str],
    pub description: &'static str,
    pub predicate: CheckFn,
}

impl ConsistencyCheck {
    /// Run the predicate, assuming every field is present.
    #[must_use]
    pub fn run(&self, values: &ValueMap) -> Option<ConstraintFinding> {
        (self.predicate)(values).map(|(severity, message)| ConstraintFinding {
            rule_id: self.id.to_string(),
            kind: self.kind.into(),
            severity,
            message,
            fields: self.fields.iter().map(|f| (*f).to_string()).collect(),
        })
    }
}

/// Validated list of consistency checks, in evaluation order.
#[derive(Debug, Clone)]
pub struct ConstraintCatalog {
    checks: Vec<ConsistencyCheck>,
}

impl ConstraintCatalog {
    /// Build a catalog, rejecting duplicate ids and checks without fields.
    pub fn new(checks: Vec<ConsistencyCheck>) -> Result<Self, CascadeError> {
        let mut seen = BTreeSet::new();
        for check in &checks {
            if check.fields.is_empty() {
                return Err(CascadeError::InvalidConfig(format!(
                    "consistency check '{}' names no fields",
                    check.id
                )));
            }
            if !seen.insert(check.id) {
                return Err(CascadeError::DuplicateEntry {
                    kind: "consistency check",
                    name: check.id.to_string(),
                });
            }
        }
        Ok(Self { checks })
    }

    pub fn builtin() -> Result<Self, CascadeError> {
        Self::new(builtin_checks())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConsistencyCheck> {
        self.checks.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.checks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }
}

fn builtin_checks() -> Vec<ConsistencyCheck> {
    vec![
        ConsistencyCheck {
            id: "egfr_creatinine_coherence",
            kind: CheckKind::Directional,
            fields: &["egfr", "creatinine"],
            description: "eGFR moves inversely with serum creatinine",
            predicate: egfr_creatinine_coherence,
        },
        ConsistencyCheck {
            id: "lipid_fraction_ordering",
            kind: CheckKind::Directional,
            fields: &["ldl", "total_cholesterol"],
            description: "LDL is a fraction of total cholesterol",
            predicate: lipid_fraction_ordering,
        },
        ConsistencyCheck {
            id: "hdl_total_ordering",
            kind: CheckKind::Directional,
            fields: &["hdl", "total_cholesterol"],
            description: "HDL is a fraction of total cholesterol",
            predicate: hdl_total_ordering,
        },
        ConsistencyCheck {
            id: "glycemic_marker_agreement",
            kind: CheckKind::Directional,
            fields: &["hba1c", "mean_glucose"],
            description: "HbA1c tracks average glucose (ADAG regression)",
            predicate: glycemic_marker_agreement,
        },
        ConsistencyCheck {
            id: "insulin_resistance_concordance",
            kind: CheckKind::Directional,
            fields: &["homa_ir", "tg_hdl_ratio"],
            description: "HOMA-IR and TG/HDL usually agree on insulin resistance",
            predicate: insulin_resistance_concordance,
        },
        ConsistencyCheck {
            id: "thyroid_axis_contradiction",
            kind: CheckKind::MutualExclusion,
            fields: &["tsh", "free_t4"],
            description: "Markedly high TSH excludes high free T4 outside rare pathology",
            predicate: thyroid_axis_contradiction,
        },
        ConsistencyCheck {
            id: "iron_status_contradiction",
            kind: CheckKind::MutualExclusion,
            fields: &["ferritin", "transferrin_saturation"],
            description: "Depleted iron stores exclude iron overload saturation",
            predicate: iron_status_contradiction,
        },
    ]
}

// =============================================================================
// PREDICATES
// =============================================================================

fn egfr_creatinine_coherence(v: &ValueMap) -> Option<(Severity, String)> {
    let egfr = v.number("egfr")?;
    let cr = v.number("creatinine")?;

    if egfr >= 90.0 && cr >= 1.5 {
        Some((
            Severity::Impossible,
            format!("eGFR {:.0} cannot coexist with creatinine {:.2} mg/dL", egfr, cr),
        ))
    } else if egfr > 90.0 && cr > 1.2 {
        Some((
            Severity::Inconsistent,
            format!("eGFR {:.0} is high for creatinine {:.2} mg/dL", egfr, cr),
        ))
    } else if egfr < 30.0 && cr < 1.0 {
        Some((
            Severity::Inconsistent,
            format!("eGFR {:.0} is severely reduced with normal creatinine {:.2} mg/dL", egfr, cr),
        ))
    } else if egfr < 60.0 && cr < 0.7 {
        Some((
            Severity::Warning,
            format!("eGFR {:.0} is reduced with low creatinine {:.2} mg/dL", egfr, cr),
        ))
    } else {
        None
    }
}

fn lipid_fraction_ordering(v: &ValueMap) -> Option<(Severity, String)> {
    let ldl = v.number("ldl")?;
    let tc = v.number("total_cholesterol")?;
    (ldl >= tc).then(|| {
        (
            Severity::Impossible,
            format!("LDL {:.0} is not below total cholesterol {:.0}", ldl, tc),
        )
    })
}

fn hdl_total_ordering(v: &ValueMap) -> Option<(Severity, String)> {
    let hdl = v.number("hdl")?;
    let tc = v.number("total_cholesterol")?;
    (hdl >= tc).then(|| {
        (
            Severity::Impossible,
            format!("HDL {:.0} is not below total cholesterol {:.0}", hdl, tc),
        )
    })
}

fn glycemic_marker_agreement(v: &ValueMap) -> Option<(Severity, String)> {
    let a1c = v.number("hba1c")?;
    let glucose = v.number("mean_glucose")?;
    let expected = 28.7 * a1c - 46.7;
    if expected <= 0.0 {
        return None;
    }

    let deviation = (glucose - expected).abs() / expected;
    let severity = if deviation > 0.40 {
        Severity::Inconsistent
    } else if deviation > 0.20 {
        Severity::Warning
    } else {
        return None;
    };

    Some((
        severity,
        format!(
            "HbA1c {:.1}% implies ~{:.0} mg/dL average glucose, got {:.0} ({:.0}% deviation)",
            a1c,
            expected,
            glucose,
            deviation * 100.0
        ),
    ))
}

fn insulin_resistance_concordance(v: &ValueMap) -> Option<(Severity, String)> {
    let homa = v.number("homa_ir")?;
    let ratio = v.number("tg_hdl_ratio")?;

    if homa >= 2.9 && ratio < 1.0 {
        Some((
            Severity::Warning,
            format!("HOMA-IR {:.1} is elevated while TG/HDL {:.2} is low", homa, ratio),
        ))
    } else if homa < 1.0 && ratio >= 5.0 {
        Some((
            Severity::Warning,
            format!("TG/HDL {:.2} is high while HOMA-IR {:.1} is low", ratio, homa),
        ))
    } else {
        None
    }
}

fn thyroid_axis_contradiction(v: &ValueMap) -> Option<(Severity, String)> {
    let tsh = v.number("tsh")?;
    let ft4 = v.number("free_t4")?;
    (tsh > 10.0 && ft4 > 2.0).then(|| {
        (
            Severity::Inconsistent,
            format!("TSH {:.1} mIU/L with free T4 {:.2} ng/dL", tsh, ft4),
        )
    })
}

fn iron_status_contradiction(v: &ValueMap) -> Option<(Severity, String)> {
    let ferritin = v.number("ferritin")?;
    let tsat = v.number("transferrin_saturation")?;
    (ferritin < 15.0 && tsat > 50.0).then(|| {
        (
            Severity::Inconsistent,
            format!("ferritin {:.0} ng/mL with transferrin saturation {:.0}%", ferritin, tsat),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Value;

    fn values(pairs: &[(&str, f64)]) -> ValueMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::Number(*v)))
            .collect()
    }

    fn severity(check: CheckFn, pairs: &[(&str, f64)]) -> Option<Severity> {
        check(&values(pairs)).map(|(s, _)| s)
    }

    #[test]
    fn builtin_catalog_is_valid() {
        let catalog = ConstraintCatalog::builtin().expect("catalog");
        assert_eq!(catalog.len(), 7);
    }

    #[test]
    fn duplicate_check_rejected() {
        let mut checks = builtin_checks();
        checks.push(checks[0].clone());
        assert!(ConstraintCatalog::new(checks).is_err());
    }

    #[test]
    fn egfr_creatinine_tiers() {
        let f = egfr_creatinine_coherence;
        assert_eq!(
            severity(f, &[("egfr", 95.0), ("creatinine", 1.6)]),
            Some(Severity::Impossible)
        );
        assert_eq!(
            severity(f, &[("egfr", 95.0), ("creatinine", 1.3)]),
            Some(Severity::Inconsistent)
        );
        assert_eq!(
            severity(f, &[("egfr", 25.0), ("creatinine", 0.9)]),
            Some(Severity::Inconsistent)
        );
        assert_eq!(
            severity(f, &[("egfr", 55.0), ("creatinine", 0.6)]),
            Some(Severity::Warning)
        );
        assert_eq!(severity(f, &[("egfr", 95.0), ("creatinine", 0.9)]), None);
        assert_eq!(severity(f, &[("egfr", 45.0), ("creatinine", 1.8)]), None);
    }

    #[test]
    fn lipid_ordering() {
        assert_eq!(
            severity(lipid_fraction_ordering, &[("ldl", 230.0), ("total_cholesterol", 220.0)]),
            Some(Severity::Impossible)
        );
        assert_eq!(
            severity(hdl_total_ordering, &[("hdl", 42.0), ("total_cholesterol", 220.0)]),
            None
        );
    }

    #[test]
    fn glycemic_agreement_thresholds() {
        // 28.7 * 6.0 - 46.7 = 125.5
        let f = glycemic_marker_agreement;
        assert_eq!(severity(f, &[("hba1c", 6.0), ("mean_glucose", 130.0)]), None);
        assert_eq!(
            severity(f, &[("hba1c", 6.0), ("mean_glucose", 160.0)]),
            Some(Severity::Warning)
        );
        assert_eq!(
            severity(f, &[("hba1c", 6.0), ("mean_glucose", 200.0)]),
            Some(Severity::Inconsistent)
        );
    }

    #[test]
    fn mutual_exclusions() {
        assert_eq!(
            severity(thyroid_axis_contradiction, &[("tsh", 15.0), ("free_t4", 2.5)]),
            Some(Severity::Inconsistent)
        );
        let iron = iron_status_contradiction;
        assert_eq!(
            severity(iron, &[("ferritin", 10.0), ("transferrin_saturation", 60.0)]),
            Some(Severity::Inconsistent)
        );
        assert_eq!(
            severity(iron, &[("ferritin", 80.0), ("transferrin_saturation", 60.0)]),
            None
        );
    }

    #[test]
    fn finding_carries_check_metadata() {
        let catalog = ConstraintCatalog::builtin().expect("catalog");
        let check = catalog
            .iter()
            .find(|c| c.id == "thyroid_axis_contradiction")
            .expect("check");
        let finding = check
            .run(&values(&[("tsh", 15.0), ("free_t4", 2.5)]))
            .expect("finding");
        assert_eq!(finding.kind, FindingKind::MutualExclusion);
        assert_eq!(finding.fields, vec!["tsh".to_string(), "free_t4".to_string()]);
    }
}
