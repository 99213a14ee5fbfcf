//! # biocascade
//!
//! Library half of the biocascade binary: the HTTP API, the CLI and the
//! data pack loader. Exposed as a library so integration tests can drive
//! the router directly.

pub mod api;
pub mod cli;
pub mod config;
