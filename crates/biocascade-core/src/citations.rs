//! # Citation Index
//!
//! Read-only bibliography keyed by the citation keys carried on rule
//! candidates. A derivation whose candidate is cited is graded
//! `peer_reviewed`, and the resolved citation travels with the record.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::CascadeError;

/// A single bibliography entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub key: String,
    pub authors: String,
    pub title: String,
    pub source: String,
    pub year: u16,
}

impl Citation {
    fn new(key: &str, authors: &str, title: &str, source: &str, year: u16) -> Self {
        Self {
            key: key.to_string(),
            authors: authors.to_string(),
            title: title.to_string(),
            source: source.to_string(),
            year,
        }
    }

    /// Short "Authors (year)" form used in rationales and CLI output.
    #[must_use]
    pub fn short(&self) -> String {
        format!("{} ({})", self.authors, self.year)
    }
}

/// Citations keyed by their key.
#[derive(Debug, Clone, Default)]
pub struct CitationIndex {
    entries: BTreeMap<String, Citation>,
}

impl CitationIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bibliography for the built-in rule catalog.
    #[must_use]
    pub fn builtin() -> Self {
        let mut index = Self::new();
        for citation in builtin_citations() {
            index.entries.insert(citation.key.clone(), citation);
        }
        index
    }

    /// Add a citation, rejecting empty or duplicate keys.
    pub fn insert(&mut self, citation: Citation) -> Result<(), CascadeError> {
        if citation.key.trim().is_empty() {
            return Err(CascadeError::InvalidConfig(
                "citation key is empty".to_string(),
            ));
        }
        if self.entries.contains_key(&citation.key) {
            return Err(CascadeError::DuplicateEntry {
                kind: "citation",
                name: citation.key,
            });
        }
        self.entries.insert(citation.key.clone(), citation);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Citation> {
        self.entries.get(key)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
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

fn builtin_citations() -> Vec<Citation> {
    vec![
        Citation::new(
            "friedewald_1972",
            "Friedewald WT, Levy RI, Fredrickson DS",
            "Estimation of the concentration of low-density lipoprotein cholesterol in plasma",
            "Clin Chem",
            1972,
        ),
        Citation::new(
            "sampson_2020",
            "Sampson M, Ling C, Sun Q, et al.",
            "A new equation for calculation of low-density lipoprotein cholesterol",
            "JAMA Cardiol",
            2020,
        ),
        Citation::new(
            "mclaughlin_2003",
            "McLaughlin T, Abbasi F, Cheal K, et al.",
            "Use of metabolic markers to identify overweight individuals who are insulin resistant",
            "Ann Intern Med",
            2003,
        ),
        Citation::new(
            "dobiasova_2001",
            "Dobiasova M, Frohlich J",
            "The plasma parameter log(TG/HDL-C) as an atherogenic index",
            "Clin Biochem",
            2001,
        ),
        Citation::new(
            "bergenstal_2018",
            "Bergenstal RM, Beck RW, Close KL, et al.",
            "Glucose management indicator (GMI)",
            "Diabetes Care",
            2018,
        ),
        Citation::new(
            "nathan_2008",
            "Nathan DM, Kuenen J, Borg R, et al.",
            "Translating the A1C assay into estimated average glucose values",
            "Diabetes Care",
            2008,
        ),
        Citation::new(
            "matthews_1985",
            "Matthews DR, Hosker JP, Rudenski AS, et al.",
            "Homeostasis model assessment: insulin resistance and beta-cell function",
            "Diabetologia",
            1985,
        ),
        Citation::new(
            "katz_2000",
            "Katz A, Nambi SS, Mather K, et al.",
            "Quantitative insulin sensitivity check index",
            "J Clin Endocrinol Metab",
            2000,
        ),
        Citation::new(
            "simental_2008",
            "Simental-Mendia LE, Rodriguez-Moran M, Guerrero-Romero F",
            "The product of fasting glucose and triglycerides as surrogate for identifying \
             insulin resistance",
            "Metab Syndr Relat Disord",
            2008,
        ),
        Citation::new(
            "inker_2021",
            "Inker LA, Eneanya ND, Coresh J, et al.",
            "New creatinine- and cystatin C-based equations to estimate GFR without race",
            "N Engl J Med",
            2021,
        ),
        Citation::new(
            "kdigo_2012",
            "KDIGO CKD Work Group",
            "Clinical practice guideline for the evaluation and management of \
             chronic kidney disease",
            "Kidney Int Suppl",
            2013,
        ),
        Citation::new(
            "sterling_2006",
            "Sterling RK, Lissen E, Clumeck N, et al.",
            "Development of a simple noninvasive index to predict significant fibrosis",
            "Hepatology",
            2006,
        ),
        Citation::new(
            "payne_1973",
            "Payne RB, Little AJ, Williams RB, Milner JR",
            "Interpretation of serum calcium in patients with abnormal serum proteins",
            "Br Med J",
            1973,
        ),
    ]
}
