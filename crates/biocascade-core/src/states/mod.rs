//! # Physiological States
//!
//! Latent-state classification over the merged value map.
//!
//! Each state scores from 100 downward, one fixed penalty per threshold
//! crossed, and maps the clamped score onto ordered bands. Labels are
//! closed per-domain enums; a state whose required signals are absent is
//! reported as not evaluated rather than guessed.

mod catalog;

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::{CascadeError, ValueMap};

pub use catalog::builtin_states;

// =============================================================================
// LABELS
// =============================================================================

macro_rules! state_labels {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            #[must_use]
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }
    };
}

state_labels!(
    /// Glycemic regulation labels.
    GlycemicLabel {
        Optimal => "optimal",
        Compensated => "compensated",
        Impaired => "impaired",
        Dysregulated => "dysregulated",
    }
);

state_labels!(
    /// Lipid transport labels.
    LipidLabel {
        Favorable => "favorable",
        Borderline => "borderline",
        Atherogenic => "atherogenic",
        HighRisk => "high_risk",
    }
);

state_labels!(
    /// Renal filtration labels.
    RenalLabel {
        Preserved => "preserved",
        MildlyReduced => "mildly_reduced",
        ModeratelyReduced => "moderately_reduced",
        SeverelyReduced => "severely_reduced",
    }
);

state_labels!(
    /// Hepatic strain labels.
    HepaticLabel {
        Quiescent => "quiescent",
        Reactive => "reactive",
        Strained => "strained",
        FibroticRisk => "fibrotic_risk",
    }
);

state_labels!(
    /// Iron homeostasis labels.
    IronLabel {
        Balanced => "balanced",
        Borderline => "borderline",
        Disturbed => "disturbed",
        Severe => "severe",
    }
);

/// A state label tagged with its domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "domain", content = "label", rename_all = "snake_case")]
pub enum StateLabel {
    Glycemic(GlycemicLabel),
    Lipid(LipidLabel),
    Renal(RenalLabel),
    Hepatic(HepaticLabel),
    Iron(IronLabel),
}

impl StateLabel {
    #[must_use]
    pub fn domain(&self) -> &'static str {
        match self {
            StateLabel::Glycemic(_) => "glycemic",
            StateLabel::Lipid(_) => "lipid",
            StateLabel::Renal(_) => "renal",
            StateLabel::Hepatic(_) => "hepatic",
            StateLabel::Iron(_) => "iron",
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            StateLabel::Glycemic(l) => l.as_str(),
            StateLabel::Lipid(l) => l.as_str(),
            StateLabel::Renal(l) => l.as_str(),
            StateLabel::Hepatic(l) => l.as_str(),
            StateLabel::Iron(l) => l.as_str(),
        }
    }
}

impl fmt::Display for StateLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// DEFINITIONS
// =============================================================================

/// Score accumulator handed to a state's scoring function.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreCard {
    pub score: f64,
    pub factors: Vec<String>,
}

impl ScoreCard {
    #[must_use]
    pub fn new() -> Self {
        Self {
            score: 100.0,
            factors: Vec::new(),
        }
    }

    /// Subtract `points`, recording why.
    pub fn deduct(&mut self, points: f64, factor: impl Into<String>) {
        self.score -= points;
        self.factors.push(factor.into());
    }
}

impl Default for ScoreCard {
    fn default() -> Self {
        Self::new()
    }
}

/// Scoring function of a state.
pub type Scorer = fn(&ValueMap) -> ScoreCard;

/// A score band. Bands are listed from the highest lower bound down.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreBand {
    pub min_score: f64,
    pub label: StateLabel,
    pub lab_anchor: &'static str,
    pub actions: &'static [&'static str],
    pub concerning: bool,
}

/// One latent physiological state.
#[derive(Debug, Clone)]
pub struct PhysiologicalStateDefinition {
    pub id: &'static str,
    pub description: &'static str,
    pub required: &'static [&'static str],
    pub supporting: &'static [&'static str],
    pub bands: Vec<ScoreBand>,
    pub score: Scorer,
}

impl PhysiologicalStateDefinition {
    /// Every signal the state reads.
    pub fn signals(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.required.iter().chain(self.supporting.iter()).copied()
    }

    fn validate(&self) -> Result<(), CascadeError> {
        let invalid = |reason: &str| {
            CascadeError::InvalidConfig(format!("state '{}': {}", self.id, reason))
        };

        if self.id.trim().is_empty() {
            return Err(invalid("empty id"));
        }
        if self.required.is_empty() {
            return Err(invalid("no required signals"));
        }
        let Some(last) = self.bands.last() else {
            return Err(invalid("no score bands"));
        };
        if last.min_score > 0.0 {
            return Err(invalid("lowest band must start at or below 0"));
        }
        if self
            .bands
            .windows(2)
            .any(|pair| pair[0].min_score <= pair[1].min_score)
        {
            return Err(invalid("bands must be in strictly descending order"));
        }
        Ok(())
    }

    fn band_for(&self, score: f64) -> Option<&ScoreBand> {
        self.bands
            .iter()
            .find(|band| score >= band.min_score)
            .or_else(|| self.bands.last())
    }

    /// Distance to the nearest interior band edge, scaled to `[0, 1]`.
    fn boundary_margin(&self, score: f64) -> f64 {
        let edges = &self.bands[..self.bands.len().saturating_sub(1)];
        edges
            .iter()
            .map(|band| (score - band.min_score).abs())
            .min_by(f64::total_cmp)
            .map_or(1.0, |distance| (distance / 10.0).min(1.0))
    }

    /// Fraction of supporting signals present.
    fn coverage(&self, values: &ValueMap) -> f64 {
        if self.supporting.is_empty() {
            return 1.0;
        }
        let present = self.supporting.iter().filter(|s| values.contains(s)).count();
        present as f64 / self.supporting.len() as f64
    }
}

// =============================================================================
// ASSESSMENTS
// =============================================================================

/// An evaluated state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateReading {
    pub label: StateLabel,
    pub score: f64,
    pub confidence: f64,
    pub concerning: bool,
    pub factors: Vec<String>,
    pub lab_anchor: String,
    pub recommended_actions: Vec<String>,
    /// Required and supporting signals that were present.
    pub signals_used: Vec<String>,
}

/// Outcome for one state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StateAssessment {
    Evaluated(StateReading),
    NotEvaluated { missing: Vec<String> },
}

impl StateAssessment {
    #[must_use]
    pub fn reading(&self) -> Option<&StateReading> {
        match self {
            StateAssessment::Evaluated(reading) => Some(reading),
            StateAssessment::NotEvaluated { .. } => None,
        }
    }
}

/// Validated set of state definitions.
#[derive(Debug, Clone)]
pub struct StateCatalog {
    states: Vec<PhysiologicalStateDefinition>,
}

impl StateCatalog {
    /// Build a catalog.
    ///
    /// # Errors
    /// Returns `CascadeError` on duplicate ids, missing required signals,
    /// or malformed band lists.
    pub fn new(states: Vec<PhysiologicalStateDefinition>) -> Result<Self, CascadeError> {
        let mut seen = BTreeSet::new();
        for state in &states {
            state.validate()?;
            if !seen.insert(state.id) {
                return Err(CascadeError::DuplicateEntry {
                    kind: "state",
                    name: state.id.to_string(),
                });
            }
        }
        Ok(Self { states })
    }

    pub fn builtin() -> Result<Self, CascadeError> {
        Self::new(builtin_states())
    }

    pub fn iter(&self) -> impl Iterator<Item = &PhysiologicalStateDefinition> {
        self.states.iter()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&PhysiologicalStateDefinition> {
        self.states.iter().find(|s| s.id == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

/// Classifies every catalog state against a value map.
pub struct StateClassifier<'a> {
    catalog: &'a StateCatalog,
}

impl<'a> StateClassifier<'a> {
    #[must_use]
    pub fn new(catalog: &'a StateCatalog) -> Self {
        Self { catalog }
    }

    /// Assess every state, keyed by state id.
    #[must_use]
    pub fn classify(&self, values: &ValueMap) -> BTreeMap<String, StateAssessment> {
        self.catalog
            .iter()
            .map(|state| (state.id.to_string(), Self::assess(state, values)))
            .collect()
    }

    /// Assess one state.
    #[must_use]
    pub fn assess(state: &PhysiologicalStateDefinition, values: &ValueMap) -> StateAssessment {
        let missing: Vec<String> = state
            .required
            .iter()
            .filter(|name| !values.contains(name))
            .map(|name| (*name).to_string())
            .collect();
        if !missing.is_empty() {
            return StateAssessment::NotEvaluated { missing };
        }

        let card = (state.score)(values);
        let score = card.score.clamp(0.0, 100.0);
        let Some(band) = state.band_for(score) else {
            return StateAssessment::NotEvaluated {
                missing: Vec::new(),
            };
        };

        let confidence = (0.40
            + 0.35 * state.coverage(values)
            + 0.25 * state.boundary_margin(score))
        .clamp(0.0, 1.0);

        tracing::trace!(state = state.id, score, label = %band.label, "state evaluated");

        StateAssessment::Evaluated(StateReading {
            label: band.label,
            score,
            confidence,
            concerning: band.concerning,
            factors: card.factors,
            lab_anchor: band.lab_anchor.to_string(),
            recommended_actions: band.actions.iter().map(|a| (*a).to_string()).collect(),
            signals_used: state
                .signals()
                .filter(|s| values.contains(s))
                .map(str::to_string)
                .collect(),
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================

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

    fn flat(_: &ValueMap) -> ScoreCard {
        let mut card = ScoreCard::new();
        card.deduct(22.0, "fixed deduction");
        card
    }

    fn test_state() -> PhysiologicalStateDefinition {
        PhysiologicalStateDefinition {
            id: "test_state",
            description: "",
            required: &["a"],
            supporting: &["b", "c"],
            bands: vec![
                ScoreBand {
                    min_score: 80.0,
                    label: StateLabel::Iron(IronLabel::Balanced),
                    lab_anchor: "",
                    actions: &[],
                    concerning: false,
                },
                ScoreBand {
                    min_score: 0.0,
                    label: StateLabel::Iron(IronLabel::Severe),
                    lab_anchor: "",
                    actions: &["act"],
                    concerning: true,
                },
            ],
            score: flat,
        }
    }

    #[test]
    fn builtin_catalog_is_valid() {
        let catalog = StateCatalog::builtin().expect("catalog");
        assert_eq!(catalog.len(), 5);
        assert!(catalog.get("renal_filtration").is_some());
    }

    #[test]
    fn missing_required_signal_not_evaluated() {
        let assessment = StateClassifier::assess(&test_state(), &values(&[("b", 1.0)]));
        assert_eq!(
            assessment,
            StateAssessment::NotEvaluated {
                missing: vec!["a".to_string()]
            }
        );
    }

    #[test]
    fn confidence_formula() {
        // score 78, nearest interior edge 80 -> margin 0.2; coverage 1/2
        let reading = StateClassifier::assess(&test_state(), &values(&[("a", 1.0), ("b", 1.0)]))
            .reading()
            .cloned()
            .expect("evaluated");
        assert_eq!(reading.score, 78.0);
        assert_eq!(reading.label, StateLabel::Iron(IronLabel::Severe));
        let expected = 0.40 + 0.35 * 0.5 + 0.25 * 0.2;
        assert!((reading.confidence - expected).abs() < 1e-12);
        assert!(reading.concerning);
        assert_eq!(reading.factors, vec!["fixed deduction".to_string()]);
        assert_eq!(reading.signals_used, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn bands_out_of_order_rejected() {
        let mut state = test_state();
        state.bands.reverse();
        assert!(StateCatalog::new(vec![state]).is_err());
    }

    #[test]
    fn duplicate_state_rejected() {
        assert!(StateCatalog::new(vec![test_state(), test_state()]).is_err());
    }

    #[test]
    fn label_serializes_with_domain() {
        let json = serde_json::to_string(&StateLabel::Renal(RenalLabel::MildlyReduced))
            .expect("serialize");
        assert_eq!(json, r#"{"domain":"renal","label":"mildly_reduced"}"#);
    }
}
