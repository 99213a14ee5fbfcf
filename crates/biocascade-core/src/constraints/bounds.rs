//! Physiological plausibility bounds for direct inputs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{ConstraintFinding, FindingKind, Severity};
use crate::{CascadeError, Value};

/// Inclusive plausibility range for one biomarker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bound {
    pub min: f64,
    pub max: f64,
    pub unit: String,
}

impl Bound {
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }
}

/// A bound as written in a data pack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BoundSpec {
    pub biomarker: String,
    pub min: f64,
    pub max: f64,
    #[serde(default)]
    pub unit: String,
}

/// Bounds keyed by biomarker name.
#[derive(Debug, Clone, Default)]
pub struct BoundsTable {
    bounds: BTreeMap<String, Bound>,
}

impl BoundsTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in adult plausibility ranges.
    #[must_use]
    pub fn builtin() -> Self {
        let rows: &[(&str, f64, f64, &str)] = &[
            ("age", 0.0, 120.0, "years"),
            ("total_cholesterol", 50.0, 700.0, "mg/dL"),
            ("hdl", 5.0, 200.0, "mg/dL"),
            ("ldl", 5.0, 500.0, "mg/dL"),
            ("triglycerides", 10.0, 5000.0, "mg/dL"),
            ("fasting_glucose", 20.0, 800.0, "mg/dL"),
            ("mean_glucose", 40.0, 600.0, "mg/dL"),
            ("fasting_insulin", 0.5, 300.0, "µIU/mL"),
            ("hba1c", 3.0, 20.0, "%"),
            ("creatinine", 0.1, 20.0, "mg/dL"),
            ("egfr", 1.0, 200.0, "mL/min/1.73m²"),
            ("bun", 1.0, 200.0, "mg/dL"),
            ("alt", 1.0, 5000.0, "U/L"),
            ("ast", 1.0, 5000.0, "U/L"),
            ("platelets", 5.0, 1500.0, "10⁹/L"),
            ("albumin", 1.0, 6.5, "g/dL"),
            ("calcium", 4.0, 16.0, "mg/dL"),
            ("sodium", 100.0, 180.0, "mmol/L"),
            ("chloride", 60.0, 140.0, "mmol/L"),
            ("bicarbonate", 5.0, 50.0, "mmol/L"),
            ("iron", 5.0, 500.0, "µg/dL"),
            ("tibc", 100.0, 700.0, "µg/dL"),
            ("ferritin", 1.0, 10000.0, "ng/mL"),
            ("tsh", 0.005, 100.0, "mIU/L"),
            ("free_t4", 0.1, 8.0, "ng/dL"),
            ("crp", 0.0, 500.0, "mg/L"),
            ("weight_kg", 20.0, 400.0, "kg"),
            ("height_cm", 100.0, 250.0, "cm"),
        ];

        let bounds = rows
            .iter()
            .map(|&(name, min, max, unit)| {
                (
                    name.to_string(),
                    Bound {
                        min,
                        max,
                        unit: unit.to_string(),
                    },
                )
            })
            .collect();
        Self { bounds }
    }

    /// Add or replace a bound.
    ///
    /// # Errors
    /// Returns `CascadeError::InvalidConfig` for an empty name, non-finite
    /// limits, or `min >= max`.
    pub fn upsert(&mut self, spec: BoundSpec) -> Result<(), CascadeError> {
        if spec.biomarker.trim().is_empty() {
            return Err(CascadeError::InvalidConfig(
                "bound has an empty biomarker name".to_string(),
            ));
        }
        if !spec.min.is_finite() || !spec.max.is_finite() || spec.min >= spec.max {
            return Err(CascadeError::InvalidConfig(format!(
                "bound for '{}' needs finite min < max, got [{}, {}]",
                spec.biomarker, spec.min, spec.max
            )));
        }
        self.bounds.insert(
            spec.biomarker,
            Bound {
                min: spec.min,
                max: spec.max,
                unit: spec.unit,
            },
        );
        Ok(())
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Bound> {
        self.bounds.get(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bounds.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }

    /// Check one direct input; at most one finding per field.
    #[must_use]
    pub fn check(&self, name: &str, value: &Value) -> Option<ConstraintFinding> {
        let bound = self.bounds.get(name)?;

        let message = match value {
            Value::Number(x) if bound.contains(*x) => return None,
            Value::Number(x) => format!(
                "{} = {} {} outside plausible range [{}, {}]",
                name, x, bound.unit, bound.min, bound.max
            ),
            other => format!("{} expects a number, got '{}'", name, other),
        };

        Some(ConstraintFinding {
            rule_id: name.to_string(),
            kind: FindingKind::Bound,
            severity: Severity::Error,
            message,
            fields: vec![name.to_string()],
        })
    }
}
