//! # Data Pack Loading
//!
//! Resolves, reads and applies the optional TOML data pack, then freezes
//! the registries into a shared [`Engine`].
//!
//! ## Resolution order
//!
//! 1. `--config <path>` on the command line
//! 2. `BIOCASCADE_CONFIG` environment variable
//! 3. Built-in registries only

use biocascade_core::{CascadeError, DataPack, Engine, RegistryBuilder};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Environment variable naming the data pack file.
pub const CONFIG_ENV: &str = "BIOCASCADE_CONFIG";

/// Maximum data pack size (4 MB).
const MAX_PACK_FILE_SIZE: u64 = 4 * 1024 * 1024;

/// Maximum analysis input file size (1 MB), matching the HTTP body limit.
pub const MAX_INPUT_FILE_SIZE: u64 = 1024 * 1024;

// =============================================================================
// FILE HELPERS
// =============================================================================

/// Canonicalize `path` and ensure it names a regular file.
pub fn validate_file_path(path: &Path) -> Result<PathBuf, CascadeError> {
    let canonical = path.canonicalize().map_err(|e| {
        CascadeError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(CascadeError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Read a file as UTF-8 after checking it exists and is under `max_size`.
pub fn read_bounded(path: &Path, max_size: u64) -> Result<String, CascadeError> {
    let path = validate_file_path(path)?;
    let metadata = std::fs::metadata(&path)
        .map_err(|e| CascadeError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(CascadeError::SerializationError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }

    std::fs::read_to_string(&path)
        .map_err(|e| CascadeError::IoError(format!("Failed to read '{}': {}", path.display(), e)))
}

// =============================================================================
// DATA PACK
// =============================================================================

/// Pick the data pack path from the CLI flag or the environment.
#[must_use]
pub fn resolve_pack_path(flag: Option<&Path>) -> Option<PathBuf> {
    flag.map(Path::to_path_buf).or_else(|| {
        std::env::var(CONFIG_ENV)
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
    })
}

/// Parse a data pack from TOML text.
pub fn parse_pack(text: &str) -> Result<DataPack, CascadeError> {
    toml::from_str(text)
        .map_err(|e| CascadeError::SerializationError(format!("Invalid data pack: {}", e)))
}

/// Read and parse a data pack file.
pub fn load_pack(path: &Path) -> Result<DataPack, CascadeError> {
    let text = read_bounded(path, MAX_PACK_FILE_SIZE)?;
    let pack = parse_pack(&text)?;
    tracing::info!(path = %path.display(), version = %pack.version, "data pack loaded");
    Ok(pack)
}

/// Build the shared engine, applying the data pack at `pack_path` if any.
pub fn build_engine(pack_path: Option<&Path>) -> Result<Arc<Engine>, CascadeError> {
    let mut builder = RegistryBuilder::new();
    if let Some(path) = pack_path {
        builder = builder.with_pack(load_pack(path)?)?;
    }
    let registry = builder.build()?;
    Ok(Arc::new(Engine::new(Arc::new(registry))))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const PACK: &str = r#"
version = "2026.1"

[engine]
max_iterations = 12
top_findings = 5

[[bounds]]
biomarker = "vitamin_d"
min = 4.0
max = 150.0
unit = "ng/mL"
"#;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(contents.as_bytes()).expect("write");
        file
    }

    #[test]
    fn test_parse_pack() {
        let pack = parse_pack(PACK).expect("parse");
        assert_eq!(pack.version, "2026.1");
        assert_eq!(pack.engine.as_ref().map(|e| e.max_iterations), Some(12));
        assert_eq!(pack.bounds.len(), 1);
    }

    #[test]
    fn test_parse_pack_rejects_unknown_fields() {
        let result = parse_pack("version = \"1\"\nunknown_table = 3\n");
        assert!(matches!(result, Err(CascadeError::SerializationError(_))));
    }

    #[test]
    fn test_build_engine_with_pack() {
        let file = write_temp(PACK);
        let engine = build_engine(Some(file.path())).expect("engine");
        let registry = engine.registry();
        assert_eq!(registry.pack_version(), Some("2026.1"));
        assert_eq!(registry.config().max_iterations, 12);
        assert!(registry.bounds().get("vitamin_d").is_some());
    }

    #[test]
    fn test_build_engine_without_pack() {
        let engine = build_engine(None).expect("engine");
        assert_eq!(engine.registry().pack_version(), None);
    }

    #[test]
    fn test_missing_pack_is_io_error() {
        let result = build_engine(Some(Path::new("/nonexistent/pack.toml")));
        assert!(matches!(result, Err(CascadeError::IoError(_))));
    }

    #[test]
    fn test_empty_version_rejected() {
        let file = write_temp("version = \"  \"\n");
        assert!(matches!(
            build_engine(Some(file.path())),
            Err(CascadeError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_resolve_prefers_flag() {
        let flag = Path::new("from-flag.toml");
        assert_eq!(resolve_pack_path(Some(flag)), Some(flag.to_path_buf()));
    }

    #[test]
    fn test_read_bounded_rejects_large_file() {
        let file = write_temp(&"x".repeat(64));
        let result = read_bounded(file.path(), 16);
        assert!(matches!(result, Err(CascadeError::SerializationError(_))));
    }
}
