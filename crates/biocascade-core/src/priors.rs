//! # Population Priors
//!
//! Age/sex-stratified population means and standard deviations.
//!
//! Priors only ever nudge a confidence score through a z-score; they are
//! never required for a derivation to fire. The lookup is a trait so a
//! caller can plug in its own reference tables, with [`PriorTable`] as the
//! in-memory implementation loaded from the built-in strata and the data
//! pack.

use serde::{Deserialize, Serialize};

use crate::{CascadeError, PatientContext, Sex};

/// Age used for stratum matching when the caller did not supply one.
pub const DEFAULT_PRIOR_AGE: f64 = 40.0;

/// Population mean and standard deviation for one stratum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prior {
    pub mean: f64,
    pub sd: f64,
}

impl Prior {
    /// Absolute z-score of `value` against this prior.
    #[must_use]
    pub fn z_score(&self, value: f64) -> f64 {
        ((value - self.mean) / self.sd).abs()
    }
}

/// Source of population priors.
///
/// Implementations must be pure and `Send + Sync`: the engine shares one
/// lookup across concurrent analyses.
pub trait PriorLookup: Send + Sync {
    /// Prior for `biomarker` in the stratum matching `context`, if any.
    fn prior(&self, biomarker: &str, context: &PatientContext) -> Option<Prior>;
}

// =============================================================================
// PRIOR TABLE
// =============================================================================

/// One stratum row of a prior table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorEntry {
    pub biomarker: String,
    /// `None` matches either sex.
    #[serde(default)]
    pub sex: Option<Sex>,
    pub age_min: f64,
    pub age_max: f64,
    pub mean: f64,
    pub sd: f64,
}

impl PriorEntry {
    fn new(biomarker: &str, sex: Option<Sex>, ages: (f64, f64), mean: f64, sd: f64) -> Self {
        Self {
            biomarker: biomarker.to_string(),
            sex,
            age_min: ages.0,
            age_max: ages.1,
            mean,
            sd,
        }
    }

    fn covers(&self, age: f64) -> bool {
        self.age_min <= age && age <= self.age_max
    }

    fn validate(&self) -> Result<(), CascadeError> {
        let finite = [self.age_min, self.age_max, self.mean, self.sd]
            .iter()
            .all(|x| x.is_finite());
        if self.biomarker.trim().is_empty() || !finite {
            return Err(CascadeError::InvalidConfig(format!(
                "prior for '{}' has an empty name or non-finite field",
                self.biomarker
            )));
        }
        if self.sd <= 0.0 || self.age_min > self.age_max {
            return Err(CascadeError::InvalidConfig(format!(
                "prior for '{}' needs sd > 0 and age_min <= age_max",
                self.biomarker
            )));
        }
        Ok(())
    }
}

/// In-memory stratified prior table.
///
/// Lookup prefers a sex-specific stratum and falls back to a
/// sex-agnostic one. Later entries shadow earlier ones for the same
/// stratum, which is how data pack rows override built-in rows.
#[derive(Debug, Clone, Default)]
pub struct PriorTable {
    entries: Vec<PriorEntry>,
}

impl PriorTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in adult reference strata.
    #[must_use]
    pub fn builtin() -> Self {
        const ADULT: (f64, f64) = (18.0, 120.0);
        let female = Some(Sex::Female);
        let male = Some(Sex::Male);

        Self {
            entries: vec![
                PriorEntry::new("total_cholesterol", None, ADULT, 195.0, 40.0),
                PriorEntry::new("ldl", None, ADULT, 115.0, 35.0),
                PriorEntry::new("hdl", female, ADULT, 60.0, 15.0),
                PriorEntry::new("hdl", male, ADULT, 48.0, 13.0),
                PriorEntry::new("triglycerides", None, ADULT, 130.0, 80.0),
                PriorEntry::new("non_hdl", None, ADULT, 140.0, 40.0),
                PriorEntry::new("egfr", None, (18.0, 39.0), 110.0, 15.0),
                PriorEntry::new("egfr", None, (40.0, 59.0), 95.0, 15.0),
                PriorEntry::new("egfr", None, (60.0, 120.0), 78.0, 18.0),
                PriorEntry::new("bmi", None, ADULT, 28.0, 6.0),
                PriorEntry::new("hba1c_estimated", None, ADULT, 5.5, 0.6),
                PriorEntry::new("homa_ir", None, ADULT, 2.0, 1.2),
                PriorEntry::new("fasting_glucose", None, ADULT, 98.0, 15.0),
            ],
        }
    }

    /// Append a validated entry.
    pub fn insert(&mut self, entry: PriorEntry) -> Result<(), CascadeError> {
        entry.validate()?;
        self.entries.push(entry);
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PriorLookup for PriorTable {
    fn prior(&self, biomarker: &str, context: &PatientContext) -> Option<Prior> {
        let age = context.age.unwrap_or(DEFAULT_PRIOR_AGE);
        let matching = |sex: Option<Sex>| {
            self.entries
                .iter()
                .rev()
                .find(|e| e.biomarker == biomarker && e.sex == sex && e.covers(age))
        };

        context
            .sex
            .and_then(|sex| matching(Some(sex)))
            .or_else(|| matching(None))
            .map(|e| Prior {
                mean: e.mean,
                sd: e.sd,
            })
    }
}
