//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API. The analysis
//! result itself is serialized straight from
//! [`AnalysisResult`](biocascade_core::AnalysisResult).

use biocascade_core::states::PhysiologicalStateDefinition;
use biocascade_core::{InferenceRule, OutputLimits, Registry, RuleCandidate};
use serde::{Deserialize, Serialize};

/// Upper limit for the `top_n` query parameter.
pub const MAX_TOP_N: usize = 100;

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Version of the applied data pack, if any.
    pub pack_version: Option<String>,
}

impl HealthResponse {
    #[must_use]
    pub fn for_registry(registry: &Registry) -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            pack_version: registry.pack_version().map(str::to_string),
        }
    }
}

// =============================================================================
// RULES RESPONSE
// =============================================================================

/// One candidate method of a rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateSummary {
    pub method: String,
    pub required_inputs: Vec<String>,
    pub base_confidence: f64,
    pub citation: Option<String>,
    pub conditional: bool,
}

impl From<&RuleCandidate> for CandidateSummary {
    fn from(candidate: &RuleCandidate) -> Self {
        Self {
            method: candidate.method.to_string(),
            required_inputs: candidate
                .required_inputs
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            base_confidence: candidate.base_confidence,
            citation: candidate.citation.map(str::to_string),
            conditional: candidate.applicable.is_some(),
        }
    }
}

/// One derivable target and its candidates in priority order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSummary {
    pub target: String,
    pub unit: String,
    pub high_value: bool,
    pub candidates: Vec<CandidateSummary>,
}

impl From<&InferenceRule> for RuleSummary {
    fn from(rule: &InferenceRule) -> Self {
        Self {
            target: rule.target.to_string(),
            unit: rule.unit.to_string(),
            high_value: rule.high_value,
            candidates: rule.candidates.iter().map(CandidateSummary::from).collect(),
        }
    }
}

/// Rule registry listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesResponse {
    pub count: usize,
    pub rules: Vec<RuleSummary>,
}

impl RulesResponse {
    #[must_use]
    pub fn for_registry(registry: &Registry) -> Self {
        let rules: Vec<RuleSummary> = registry.rules().iter().map(RuleSummary::from).collect();
        Self {
            count: rules.len(),
            rules,
        }
    }
}

// =============================================================================
// STATES RESPONSE
// =============================================================================

/// One latent physiological state definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSummary {
    pub id: String,
    pub description: String,
    pub required: Vec<String>,
    pub supporting: Vec<String>,
    /// Possible labels, best band first.
    pub labels: Vec<String>,
}

impl From<&PhysiologicalStateDefinition> for StateSummary {
    fn from(state: &PhysiologicalStateDefinition) -> Self {
        Self {
            id: state.id.to_string(),
            description: state.description.to_string(),
            required: state.required.iter().map(|s| (*s).to_string()).collect(),
            supporting: state.supporting.iter().map(|s| (*s).to_string()).collect(),
            labels: state
                .bands
                .iter()
                .map(|band| band.label.as_str().to_string())
                .collect(),
        }
    }
}

/// State catalog listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatesResponse {
    pub count: usize,
    pub states: Vec<StateSummary>,
}

impl StatesResponse {
    #[must_use]
    pub fn for_registry(registry: &Registry) -> Self {
        let states: Vec<StateSummary> =
            registry.states().iter().map(StateSummary::from).collect();
        Self {
            count: states.len(),
            states,
        }
    }
}

// =============================================================================
// ANALYZE QUERY
// =============================================================================

/// Query parameters of `POST /analyze`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AnalyzeQuery {
    /// Overrides both the findings and suggestions sizes.
    pub top_n: Option<usize>,
}

impl AnalyzeQuery {
    /// Convert to output limits, clamping `top_n` to [`MAX_TOP_N`].
    #[must_use]
    pub fn limits(&self) -> OutputLimits {
        let top_n = self.top_n.map(|n| n.min(MAX_TOP_N));
        OutputLimits {
            top_findings: top_n,
            top_suggestions: top_n,
        }
    }
}

// =============================================================================
// ERROR RESPONSE
// =============================================================================

/// JSON error body for 4xx/5xx responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
