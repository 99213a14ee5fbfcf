//! # biocascade-core
//!
//! The deterministic cascade inference engine for biocascade - THE LOGIC.
//!
//! Given a partial set of named biomarker values, the engine derives every
//! value its rule registry can reach, scores each derivation, checks the
//! panel for plausibility and internal consistency, classifies latent
//! physiological states and ranks what matters most.
//!
//! ## Architectural Constraints
//!
//! The CORE:
//! - Is stateless across invocations; registries are built once and
//!   never mutated
//! - Never fails on biomarker data; problems surface as findings
//! - Has NO async, NO network and NO I/O (pure Rust)

// =============================================================================
// MODULES
// =============================================================================

pub mod cascade;
pub mod citations;
pub mod confidence;
pub mod config;
pub mod constraints;
pub mod engine;
pub mod ingestor;
pub mod primitives;
pub mod prioritizer;
pub mod priors;
pub mod registry;
pub mod rules;
pub mod states;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{CascadeError, PatientContext, Provenance, Sex, Value, ValueMap};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use cascade::{CascadeEvaluator, CascadeOutcome, Derivation};
pub use citations::{Citation, CitationIndex};
pub use confidence::{
    ConfidencePropagator, ConfidenceRecord, ConsistencyStatus, EvidenceGrade, ReliabilityClass,
    SensitivityClass,
};
pub use config::EngineConfig;
pub use constraints::{
    ConstraintFinding, ConstraintValidator, FindingKind, Severity, ValidationReport,
    ValidationStatus,
};
pub use engine::{AnalysisResult, DerivationRecord, Engine, OutputLimits, RunSummary};
pub use ingestor::{Ingestor, Intake};
pub use prioritizer::{Finding, Suggestion};
pub use priors::{Prior, PriorEntry, PriorLookup, PriorTable};
pub use registry::{DataPack, Registry, RegistryBuilder};
pub use rules::{InferenceRule, Interpretation, RuleCandidate, RuleRegistry, SensitivityProfile};
pub use states::{StateAssessment, StateCatalog, StateClassifier, StateLabel, StateReading};
