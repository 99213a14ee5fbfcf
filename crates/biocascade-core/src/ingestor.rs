//! # Ingestor Module
//!
//! Input sanitization for one analysis run.
//!
//! - Reject malformed entries instead of failing the run
//! - Every rejection becomes a `malformed_input` finding
//! - No unit conversion, renaming or enrichment

use crate::constraints::{ConstraintFinding, FindingKind, Severity};
use crate::primitives::{AGE_KEY, MAX_INPUT_FIELDS, MAX_NAME_LENGTH, SEX_KEY};
use crate::{Value, ValueMap};

/// Sanitized input and the entries rejected on the way in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Intake {
    pub accepted: ValueMap,
    pub rejected: Vec<ConstraintFinding>,
}

/// The Ingestor turns a raw input map into the engine's direct inputs.
pub struct Ingestor;

impl Ingestor {
    /// Validate a single entry.
    ///
    /// An entry is valid if:
    /// - the name is non-blank and within `MAX_NAME_LENGTH`
    /// - the value is defined (finite number, non-empty label)
    /// - reserved keys carry the right type (`age` a number,
    ///   `is_female` a flag or 0/1)
    ///
    /// Returns the rejection reason on failure.
    pub fn validate_entry(name: &str, value: &Value) -> Result<(), &'static str> {
        if name.trim().is_empty() {
            return Err("name is empty");
        }
        if name.len() > MAX_NAME_LENGTH {
            return Err("name exceeds maximum length");
        }
        if !value.is_defined() {
            return Err("value is not finite");
        }

        match name {
            AGE_KEY if !matches!(value, Value::Number(_)) => Err("age must be a number"),
            SEX_KEY => match value {
                Value::Flag(_) => Ok(()),
                Value::Number(x) if *x == 0.0 || *x == 1.0 => Ok(()),
                _ => Err("is_female must be a boolean or 0/1"),
            },
            _ => Ok(()),
        }
    }

    /// Sanitize a raw input map.
    ///
    /// Fields beyond `MAX_INPUT_FIELDS` (in key order) are dropped and
    /// reported together in one finding.
    #[must_use]
    pub fn sanitize(input: &ValueMap) -> Intake {
        let mut intake = Intake::default();
        let mut overflow = Vec::new();

        for (position, (name, value)) in input.iter().enumerate() {
            if position >= MAX_INPUT_FIELDS {
                overflow.push(name.clone());
                continue;
            }
            match Self::validate_entry(name, value) {
                Ok(()) => {
                    intake.accepted.insert_new(name.clone(), value.clone());
                }
                Err(reason) => {
                    tracing::debug!(field = %name, reason, "input rejected");
                    intake
                        .rejected
                        .push(ConstraintFinding::malformed(&display_name(name), reason));
                }
            }
        }

        if !overflow.is_empty() {
            let finding = ConstraintFinding {
                rule_id: "malformed_input".to_string(),
                kind: FindingKind::MalformedInput,
                severity: Severity::Error,
                message: format!(
                    "{} fields beyond the limit of {} were ignored",
                    overflow.len(),
                    MAX_INPUT_FIELDS
                ),
                fields: overflow,
            };
            intake.rejected.push(finding);
        }

        intake
    }
}

/// Over-long names are truncated in findings so reports stay bounded.
fn display_name(name: &str) -> String {
    if name.len() <= MAX_NAME_LENGTH {
        return name.to_string();
    }
    let mut end = MAX_NAME_LENGTH;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &name[..end])
}

// =============================================================================
// TESTS
// =============================================================================
