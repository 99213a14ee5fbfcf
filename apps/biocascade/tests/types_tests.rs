//! Unit tests for API types serialization/deserialization.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use biocascade::api::{
    AnalyzeQuery, ErrorResponse, HealthResponse, MAX_TOP_N, RuleSummary, RulesResponse,
    StateSummary, StatesResponse,
};
use biocascade_core::Registry;

// =============================================================================
// HEALTH RESPONSE TESTS
// =============================================================================

#[test]
fn test_health_response_for_builtin_registry() {
    let registry = Registry::builtin().unwrap();
    let health = HealthResponse::for_registry(&registry);
    assert_eq!(health.status, "ok");
    assert!(!health.version.is_empty());
    assert!(health.pack_version.is_none());
}

#[test]
fn test_health_response_serialization() {
    let health = HealthResponse {
        status: "ok".to_string(),
        version: "0.4.2".to_string(),
        pack_version: Some("2026.1".to_string()),
    };

    let json = serde_json::to_string(&health).unwrap();
    assert!(json.contains("\"status\":\"ok\""));
    assert!(json.contains("\"version\":\"0.4.2\""));
    assert!(json.contains("\"pack_version\":\"2026.1\""));
}

#[test]
fn test_health_response_deserialization() {
    let json = r#"{"status":"ok","version":"1.0.0","pack_version":null}"#;
    let health: HealthResponse = serde_json::from_str(json).unwrap();

    assert_eq!(health.version, "1.0.0");
    assert!(health.pack_version.is_none());
}

// =============================================================================
// RULES / STATES RESPONSE TESTS
// =============================================================================

#[test]
fn test_rules_response_covers_registry() {
    let registry = Registry::builtin().unwrap();
    let response = RulesResponse::for_registry(&registry);

    assert_eq!(response.count, registry.rules().len());
    assert!(response.rules.iter().all(|r| !r.candidates.is_empty()));
}

#[test]
fn test_conditional_candidate_marked() {
    let registry = Registry::builtin().unwrap();
    let egfr = registry.rules().get("egfr").unwrap();
    let summary = RuleSummary::from(egfr);

    // The sex-specific CKD-EPI branches are gated on applicability
    assert!(summary.candidates.iter().any(|c| c.conditional));
    assert!(summary.candidates.iter().all(|c| c.base_confidence > 0.0));
}

#[test]
fn test_rule_summary_roundtrip() {
    let registry = Registry::builtin().unwrap();
    let summary = RuleSummary::from(registry.rules().get("ldl").unwrap());

    let json = serde_json::to_string(&summary).unwrap();
    let back: RuleSummary = serde_json::from_str(&json).unwrap();
    assert_eq!(back.target, "ldl");
    assert_eq!(back.candidates.len(), summary.candidates.len());
}

#[test]
fn test_states_response_labels() {
    let registry = Registry::builtin().unwrap();
    let response = StatesResponse::for_registry(&registry);

    assert_eq!(response.count, registry.states().len());
    let glycemic: &StateSummary = response
        .states
        .iter()
        .find(|s| s.id == "glycemic_regulation")
        .unwrap();
    assert!(!glycemic.labels.is_empty());
    assert!(!glycemic.required.is_empty());
}

// =============================================================================
// ANALYZE QUERY TESTS
// =============================================================================

#[test]
fn test_analyze_query_default_limits() {
    let limits = AnalyzeQuery::default().limits();
    assert_eq!(limits.top_findings, None);
    assert_eq!(limits.top_suggestions, None);
}

#[test]
fn test_analyze_query_clamps_top_n() {
    let limits = AnalyzeQuery {
        top_n: Some(MAX_TOP_N * 10),
    }
    .limits();
    assert_eq!(limits.top_findings, Some(MAX_TOP_N));
    assert_eq!(limits.top_suggestions, Some(MAX_TOP_N));
}

#[test]
fn test_analyze_query_deserialization() {
    let query: AnalyzeQuery = serde_json::from_str(r#"{"top_n":3}"#).unwrap();
    assert_eq!(query.top_n, Some(3));
}

// =============================================================================
// ERROR RESPONSE TESTS
// =============================================================================

#[test]
fn test_error_response_serialization() {
    let json = serde_json::to_string(&ErrorResponse::new("bad input")).unwrap();
    assert_eq!(json, r#"{"error":"bad input"}"#);
}
