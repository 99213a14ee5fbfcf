//! # Core Type Definitions
//!
//! This module contains the value-level types shared by every stage of the
//! cascade pipeline:
//! - Biomarker values and the per-run value map (`Value`, `ValueMap`)
//! - Provenance and patient context (`Provenance`, `Sex`, `PatientContext`)
//! - Error types (`CascadeError`)
//!
//! ## Determinism Guarantees
//!
//! - `ValueMap` is backed by a `BTreeMap`, so iteration and serialization
//!   order are stable across runs.
//! - Numeric values are plain `f64`; non-finite numbers never enter a map
//!   (the `Ingestor` rejects them and the cascade refuses to store them).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::primitives::{AGE_KEY, SEX_KEY};

// =============================================================================
// VALUE
// =============================================================================

/// A single biomarker value.
///
/// Serialized untagged, so JSON input can be a plain number, a boolean,
/// or a string label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Continuous measurement or derived quantity.
    Number(f64),
    /// Boolean flag (e.g. `is_female`).
    Flag(bool),
    /// Categorical result (e.g. a CKD stage).
    Label(String),
}

impl Value {
    /// Numeric view of the value.
    ///
    /// Flags read as `1.0`/`0.0`; labels have no numeric view.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Flag(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Label(_) => None,
        }
    }

    /// Boolean view of the value.
    ///
    /// Numbers are truthy when non-zero.
    #[must_use]
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Value::Flag(b) => Some(*b),
            Value::Number(n) => Some(*n != 0.0),
            Value::Label(_) => None,
        }
    }

    #[must_use]
    pub fn as_label(&self) -> Option<&str> {
        match self {
            Value::Label(s) => Some(s),
            _ => None,
        }
    }

    /// A value is defined when it can be stored in a value map.
    ///
    /// Non-finite numbers and empty labels are treated as "not computable".
    #[must_use]
    pub fn is_defined(&self) -> bool {
        match self {
            Value::Number(n) => n.is_finite(),
            Value::Flag(_) => true,
            Value::Label(s) => !s.is_empty(),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Flag(b)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{:.2}", n),
            Value::Flag(b) => write!(f, "{}", b),
            Value::Label(s) => f.write_str(s),
        }
    }
}

// =============================================================================
// VALUE MAP
// =============================================================================

/// The merged (input + derived) value map for a single run.
///
/// Insertion is write-once: `insert_new` refuses to overwrite an existing
/// entry, which is what keeps every target derived at most once.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValueMap(BTreeMap<String, Value>);

impl ValueMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value only if the name is not yet present.
    ///
    /// Returns `true` when the value was stored.
    pub fn insert_new(&mut self, name: impl Into<String>, value: Value) -> bool {
        use std::collections::btree_map::Entry;

        match self.0.entry(name.into()) {
            Entry::Vacant(slot) => {
                slot.insert(value);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Numeric value for `name`, if present and numeric.
    #[must_use]
    pub fn number(&self, name: &str) -> Option<f64> {
        self.0.get(name).and_then(Value::as_number)
    }

    /// Boolean value for `name`, if present and flag-like.
    #[must_use]
    pub fn flag(&self, name: &str) -> Option<bool> {
        self.0.get(name).and_then(Value::as_flag)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Check that every name in `names` is present.
    #[must_use]
    pub fn contains_all(&self, names: &[&str]) -> bool {
        names.iter().all(|n| self.0.contains_key(*n))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// Patient context (age, sex) read from the reserved keys.
    #[must_use]
    pub fn context(&self) -> PatientContext {
        PatientContext {
            age: self.number(AGE_KEY),
            sex: self.flag(SEX_KEY).map(Sex::from_is_female),
        }
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for ValueMap {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl From<BTreeMap<String, Value>> for ValueMap {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self(map)
    }
}

// =============================================================================
// PROVENANCE & PATIENT CONTEXT
// =============================================================================

/// Where a value in the final map came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Supplied by the caller.
    Direct,
    /// Produced by a rule during the cascade.
    Derived,
}

/// Biological sex, as consumed by sex-specific formulas and prior strata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    Female,
    Male,
}

impl Sex {
    #[must_use]
    pub fn from_is_female(is_female: bool) -> Self {
        if is_female { Sex::Female } else { Sex::Male }
    }
}

/// Age and sex for a run, when the caller supplied them.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PatientContext {
    pub age: Option<f64>,
    pub sex: Option<Sex>,
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur while building or loading biocascade registries.
///
/// - Analysis itself never fails; these only surface at start-up
/// - Use `Result<T, CascadeError>` for fallible construction paths
#[derive(Debug, Error)]
pub enum CascadeError {
    /// A configuration value or data pack entry is invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A rule registry entry is malformed.
    #[error("Invalid rule for '{target}': {reason}")]
    InvalidRule { target: String, reason: String },

    /// The same key was registered twice.
    #[error("Duplicate {kind}: {name}")]
    DuplicateEntry { kind: &'static str, name: String },

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_map_is_write_once() {
        let mut map = ValueMap::new();
        assert!(map.insert_new("hdl", Value::Number(42.0)));
        assert!(!map.insert_new("hdl", Value::Number(99.0)));
        assert_eq!(map.number("hdl"), Some(42.0));
    }

    #[test]
    fn value_map_deterministic_ordering() {
        let map: ValueMap = [
            ("triglycerides", Value::Number(150.0)),
            ("age", Value::Number(40.0)),
            ("hdl", Value::Number(50.0)),
        ]
        .into_iter()
        .collect();

        let keys: Vec<_> = map.keys().cloned().collect();
        assert_eq!(keys, vec!["age", "hdl", "triglycerides"]);
    }

    #[test]
    fn flags_read_as_numbers_and_back() {
        assert_eq!(Value::Flag(true).as_number(), Some(1.0));
        assert_eq!(Value::Number(0.0).as_flag(), Some(false));
        assert_eq!(Value::Label("G2".into()).as_number(), None);
    }

    #[test]
    fn non_finite_numbers_are_undefined() {
        assert!(!Value::Number(f64::NAN).is_defined());
        assert!(!Value::Number(f64::INFINITY).is_defined());
        assert!(Value::Number(-3.5).is_defined());
        assert!(!Value::Label(String::new()).is_defined());
    }

    #[test]
    fn context_reads_reserved_keys() {
        let map: ValueMap = [("age", Value::Number(45.0)), ("is_female", Value::Flag(true))]
            .into_iter()
            .collect();
        let ctx = map.context();
        assert_eq!(ctx.age, Some(45.0));
        assert_eq!(ctx.sex, Some(Sex::Female));
    }

    #[test]
    fn untagged_json_values() {
        let map: ValueMap =
            serde_json::from_str(r#"{"hdl": 42, "is_female": false, "stage": "G2"}"#)
                .expect("parse");
        assert_eq!(map.get("hdl"), Some(&Value::Number(42.0)));
        assert_eq!(map.get("is_female"), Some(&Value::Flag(false)));
        assert_eq!(map.get("stage"), Some(&Value::Label("G2".into())));
    }
}
