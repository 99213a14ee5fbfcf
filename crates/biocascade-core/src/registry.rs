//! # Registries
//!
//! Everything an [`Engine`](crate::Engine) reads, built and validated once
//! at start-up and immutable afterwards.
//!
//! A [`RegistryBuilder`] starts from the built-in catalogs, optionally
//! applies a [`DataPack`], and fails fast on any inconsistency (dangling
//! citation keys, bad bounds, malformed state bands, out-of-range engine
//! settings).

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::citations::{Citation, CitationIndex};
use crate::constraints::{BoundSpec, BoundsTable, ConstraintCatalog};
use crate::priors::{PriorEntry, PriorLookup, PriorTable};
use crate::rules::{InferenceRule, RuleRegistry, builtin_rules};
use crate::states::{PhysiologicalStateDefinition, StateCatalog, builtin_states};
use crate::{CascadeError, EngineConfig};

// =============================================================================
// DATA PACK
// =============================================================================

/// Versioned data overriding or extending the built-in registries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DataPack {
    pub version: String,
    #[serde(default)]
    pub engine: Option<EngineConfig>,
    /// Added or replacing bounds.
    #[serde(default)]
    pub bounds: Vec<BoundSpec>,
    /// Additional citations; keys must be new.
    #[serde(default)]
    pub citations: Vec<Citation>,
    /// Additional prior strata; they shadow built-in strata.
    #[serde(default)]
    pub priors: Vec<PriorEntry>,
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Validated, immutable registries shared by every analysis.
pub struct Registry {
    rules: RuleRegistry,
    citations: CitationIndex,
    bounds: BoundsTable,
    constraints: ConstraintCatalog,
    states: StateCatalog,
    priors: Box<dyn PriorLookup>,
    config: EngineConfig,
    pack_version: Option<String>,
}

impl Registry {
    /// Built-in registries with default settings.
    pub fn builtin() -> Result<Self, CascadeError> {
        RegistryBuilder::new().build()
    }

    #[must_use]
    pub fn rules(&self) -> &RuleRegistry {
        &self.rules
    }

    #[must_use]
    pub fn citations(&self) -> &CitationIndex {
        &self.citations
    }

    #[must_use]
    pub fn bounds(&self) -> &BoundsTable {
        &self.bounds
    }

    #[must_use]
    pub fn constraints(&self) -> &ConstraintCatalog {
        &self.constraints
    }

    #[must_use]
    pub fn states(&self) -> &StateCatalog {
        &self.states
    }

    #[must_use]
    pub fn priors(&self) -> &dyn PriorLookup {
        self.priors.as_ref()
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Version of the applied data pack, if any.
    #[must_use]
    pub fn pack_version(&self) -> Option<&str> {
        self.pack_version.as_deref()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("rules", &self.rules.len())
            .field("citations", &self.citations.len())
            .field("bounds", &self.bounds.len())
            .field("constraints", &self.constraints.len())
            .field("states", &self.states.len())
            .field("config", &self.config)
            .field("pack_version", &self.pack_version)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// BUILDER
// =============================================================================

/// Assembles and validates a [`Registry`].
pub struct RegistryBuilder {
    rules: Vec<InferenceRule>,
    citations: CitationIndex,
    bounds: BoundsTable,
    states: Vec<PhysiologicalStateDefinition>,
    prior_table: PriorTable,
    custom_priors: Option<Box<dyn PriorLookup>>,
    config: EngineConfig,
    pack_version: Option<String>,
}

impl RegistryBuilder {
    /// Start from the built-in catalogs.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rules: builtin_rules(),
            citations: CitationIndex::builtin(),
            bounds: BoundsTable::builtin(),
            states: builtin_states(),
            prior_table: PriorTable::builtin(),
            custom_priors: None,
            config: EngineConfig::default(),
            pack_version: None,
        }
    }

    /// Replace the rule catalog.
    #[must_use]
    pub fn with_rules(mut self, rules: Vec<InferenceRule>) -> Self {
        self.rules = rules;
        self
    }

    /// Replace the state catalog.
    #[must_use]
    pub fn with_states(mut self, states: Vec<PhysiologicalStateDefinition>) -> Self {
        self.states = states;
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a caller-supplied prior source instead of the prior table.
    #[must_use]
    pub fn with_priors(mut self, priors: Box<dyn PriorLookup>) -> Self {
        self.custom_priors = Some(priors);
        self
    }

    /// Apply a data pack.
    ///
    /// # Errors
    /// Returns `CascadeError` on an empty version, a duplicate citation
    /// key, or an invalid bound or prior row.
    pub fn with_pack(mut self, pack: DataPack) -> Result<Self, CascadeError> {
        if pack.version.trim().is_empty() {
            return Err(CascadeError::InvalidConfig(
                "data pack version is empty".to_string(),
            ));
        }

        if let Some(config) = pack.engine {
            self.config = config;
        }
        for bound in pack.bounds {
            self.bounds.upsert(bound)?;
        }
        for citation in pack.citations {
            self.citations.insert(citation)?;
        }
        for prior in pack.priors {
            self.prior_table.insert(prior)?;
        }

        tracing::debug!(version = %pack.version, "data pack applied");
        self.pack_version = Some(pack.version);
        Ok(self)
    }

    /// Validate everything and freeze the registry.
    ///
    /// # Errors
    /// Returns the first `CascadeError` found.
    pub fn build(self) -> Result<Registry, CascadeError> {
        self.config.validate()?;
        let rules = RuleRegistry::new(self.rules)?;

        for (target, key) in rules.citation_keys() {
            if !self.citations.contains(key) {
                return Err(CascadeError::InvalidRule {
                    target: target.to_string(),
                    reason: format!("unknown citation key '{}'", key),
                });
            }
        }

        let states = StateCatalog::new(self.states)?;
        let constraints = ConstraintCatalog::builtin()?;
        let priors = self
            .custom_priors
            .unwrap_or_else(|| Box::new(self.prior_table));

        tracing::info!(
            rules = rules.len(),
            states = states.len(),
            bounds = self.bounds.len(),
            citations = self.citations.len(),
            "registries built"
        );

        Ok(Registry {
            rules,
            citations: self.citations,
            bounds: self.bounds,
            constraints,
            states,
            priors,
            config: self.config,
            pack_version: self.pack_version,
        })
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// TESTS
// =============================================================================
