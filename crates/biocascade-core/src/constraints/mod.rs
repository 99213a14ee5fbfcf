//! # Constraint Validation
//!
//! Checks a panel for plausibility and internal consistency.
//!
//! - Bounds apply to user-supplied inputs only, one finding per field
//! - Directional and mutual-exclusion checks apply to the merged
//!   (input + derived) map and run only when every field they name is
//!   present
//! - Ingest-time rejections arrive as `malformed_input` findings
//!
//! The overall status is decided by the worst severity present.

mod bounds;
mod checks;

use serde::Serialize;

use crate::ValueMap;

pub use bounds::{Bound, BoundSpec, BoundsTable};
pub use checks::{CheckKind, ConsistencyCheck, ConstraintCatalog};

/// Severity of a single finding. Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Inconsistent,
    Error,
    Impossible,
}

/// What produced a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    /// Input outside its physiological bounds.
    Bound,
    /// Input rejected at ingest.
    MalformedInput,
    Directional,
    MutualExclusion,
}

/// One constraint finding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstraintFinding {
    /// Bound field name, check id, or `malformed_input`.
    pub rule_id: String,
    pub kind: FindingKind,
    pub severity: Severity,
    pub message: String,
    /// Fields the finding is about.
    pub fields: Vec<String>,
}

impl ConstraintFinding {
    /// An ingest-time rejection of `field`.
    #[must_use]
    pub fn malformed(field: &str, reason: &str) -> Self {
        Self {
            rule_id: "malformed_input".to_string(),
            kind: FindingKind::MalformedInput,
            severity: Severity::Error,
            message: format!("input '{}' rejected: {}", field, reason),
            fields: vec![field.to_string()],
        }
    }
}

/// Overall panel status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Valid,
    ReviewRecommended,
    Inconsistent,
    Invalid,
}

impl ValidationStatus {
    /// Status implied by the worst severity present.
    #[must_use]
    pub fn from_worst(worst: Option<Severity>) -> Self {
        match worst {
            None => ValidationStatus::Valid,
            Some(Severity::Warning) => ValidationStatus::ReviewRecommended,
            Some(Severity::Inconsistent) => ValidationStatus::Inconsistent,
            Some(Severity::Error | Severity::Impossible) => ValidationStatus::Invalid,
        }
    }
}

/// Result of validating a panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub status: ValidationStatus,
    /// Bound violations and malformed inputs.
    pub violations: Vec<ConstraintFinding>,
    /// Directional and mutual-exclusion findings.
    pub flags: Vec<ConstraintFinding>,
    /// Consistency checks whose fields were all present.
    pub checks_run: usize,
}

impl ValidationReport {
    /// All findings, violations first.
    pub fn findings(&self) -> impl Iterator<Item = &ConstraintFinding> {
        self.violations.iter().chain(self.flags.iter())
    }

    #[must_use]
    pub fn worst_severity(&self) -> Option<Severity> {
        self.findings().map(|f| f.severity).max()
    }
}

/// Runs bounds and consistency checks against one panel.
pub struct ConstraintValidator<'a> {
    bounds: &'a BoundsTable,
    checks: &'a ConstraintCatalog,
}

impl<'a> ConstraintValidator<'a> {
    #[must_use]
    pub fn new(bounds: &'a BoundsTable, checks: &'a ConstraintCatalog) -> Self {
        Self { bounds, checks }
    }

    /// Validate a panel.
    ///
    /// `direct` holds the sanitized user inputs, `merged` the same inputs
    /// plus every derived value, and `rejected` the ingest findings.
    #[must_use]
    pub fn validate(
        &self,
        direct: &ValueMap,
        merged: &ValueMap,
        rejected: Vec<ConstraintFinding>,
    ) -> ValidationReport {
        let mut violations = rejected;
        for (name, value) in direct.iter() {
            if let Some(finding) = self.bounds.check(name, value) {
                violations.push(finding);
            }
        }

        let mut flags = Vec::new();
        let mut checks_run = 0;
        for check in self.checks.iter() {
            if !merged.contains_all(check.fields) {
                continue;
            }
            checks_run += 1;
            if let Some(finding) = check.run(merged) {
                flags.push(finding);
            }
        }

        let worst = violations
            .iter()
            .chain(flags.iter())
            .map(|f| f.severity)
            .max();
        let status = ValidationStatus::from_worst(worst);

        tracing::debug!(
            violations = violations.len(),
            flags = flags.len(),
            checks_run,
            ?status,
            "constraint validation complete"
        );

        ValidationReport {
            status,
            violations,
            flags,
            checks_run,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
