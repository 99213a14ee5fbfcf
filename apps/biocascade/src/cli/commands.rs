//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::api::{self, MAX_TOP_N, RulesResponse, StatesResponse};
use crate::config::{MAX_INPUT_FILE_SIZE, read_bounded};
use biocascade_core::{
    AnalysisResult, CascadeError, Engine, OutputLimits, StateAssessment, ValueMap,
};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

/// Print `value` as pretty JSON on stdout.
fn print_json<T: Serialize>(value: &T) -> Result<(), CascadeError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| CascadeError::SerializationError(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(engine: Arc<Engine>, host: &str, port: u16) -> Result<(), CascadeError> {
    let registry = engine.registry();

    println!("biocascade Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Host:      {}", host);
    println!("  Port:      {}", port);
    println!(
        "  Data pack: {}",
        registry.pack_version().unwrap_or("(built-in)")
    );
    println!("  Rules:     {}", registry.rules().len());
    println!("  States:    {}", registry.states().len());
    println!();
    println!("Endpoints:");
    println!("  POST /analyze - Analyze a biomarker panel");
    println!("  GET  /rules   - List derivable targets");
    println!("  GET  /states  - List state definitions");
    println!("  GET  /health  - Health check");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let addr = format!("{}:{}", host, port);
    api::run_server(&addr, engine).await
}

// =============================================================================
// ANALYZE COMMAND
// =============================================================================

/// Parse an input panel from JSON text.
pub fn parse_panel(text: &str) -> Result<ValueMap, CascadeError> {
    serde_json::from_str(text)
        .map_err(|e| CascadeError::SerializationError(format!("Invalid input map: {}", e)))
}

/// Analyze a panel read from `file`.
pub fn cmd_analyze(
    engine: &Engine,
    json_mode: bool,
    verbose: bool,
    file: &Path,
    top_n: Option<usize>,
) -> Result<(), CascadeError> {
    tracing::info!("Analyzing panel from {:?}", file);

    let panel = parse_panel(&read_bounded(file, MAX_INPUT_FILE_SIZE)?)?;
    let top_n = top_n.map(|n| n.min(MAX_TOP_N));
    let result = engine.analyze_with(
        &panel,
        OutputLimits {
            top_findings: top_n,
            top_suggestions: top_n,
        },
    );

    if json_mode {
        return print_json(&result);
    }

    print_report(&result, verbose);
    Ok(())
}

/// Human-readable report of one analysis.
fn print_report(result: &AnalysisResult, verbose: bool) {
    let summary = &result.summary;

    println!("biocascade Analysis");
    println!("===================");
    println!("Direct inputs: {}", summary.direct_inputs);
    println!("Derived:       {}", summary.derived);
    println!(
        "Iterations:    {}{}",
        summary.iterations,
        if summary.fixpoint_reached {
            ""
        } else {
            " (cap reached)"
        }
    );
    println!("Validation:    {:?}", result.validation.status);
    if let Some(worst) = result.validation.worst_severity() {
        println!("Worst finding: {:?}", worst);
    }
    println!();

    if !result.validation.violations.is_empty() || !result.validation.flags.is_empty() {
        println!("Consistency:");
        for finding in result.validation.findings() {
            println!(
                "  [{:?}] {}: {}",
                finding.severity, finding.rule_id, finding.message
            );
        }
        println!();
    }

    println!("Derivations:");
    for record in &result.derivations {
        println!(
            "  {:<28} {:>10} {:<12} via {:<24} conf {:.2} ({:?}){}",
            record.target,
            record.value.to_string(),
            record.unit,
            record.method,
            record.confidence.score,
            record.confidence.reliability,
            if record.confidence.is_reliable() { "" } else { "  ?" }
        );
        if verbose {
            println!(
                "      inputs: {} (depth {})",
                record.inputs.join(", "),
                record.depth
            );
            if let Some(citation) = &record.citation {
                println!("      source: {}", citation.short());
            }
        }
    }
    println!();

    println!("States:");
    for (id, assessment) in &result.states {
        match assessment {
            StateAssessment::Evaluated(reading) => {
                println!(
                    "  {:<20} {:<24} score {:>5.1} conf {:.2}{}",
                    id,
                    reading.label,
                    reading.score,
                    reading.confidence,
                    if reading.concerning { "  !" } else { "" }
                );
                if verbose {
                    for factor in &reading.factors {
                        println!("      - {}", factor);
                    }
                }
            }
            StateAssessment::NotEvaluated { missing } => {
                println!("  {:<20} not evaluated (missing: {})", id, missing.join(", "));
            }
        }
    }
    println!();

    if !result.findings.is_empty() {
        println!("Top Findings:");
        for (rank, finding) in result.findings.iter().enumerate() {
            println!(
                "  {:>2}. {:<28} {:>10}  priority {:.1}",
                rank + 1,
                finding.target,
                finding.value.to_string(),
                finding.priority
            );
            if verbose && !finding.reasons.is_empty() {
                println!("      {}", finding.reasons.join("; "));
            }
        }
        println!();
    }

    if !result.suggestions.is_empty() {
        println!("Suggested Tests:");
        for suggestion in &result.suggestions {
            println!(
                "  - measure {:<24} unlocks {}",
                suggestion.missing_input,
                suggestion.unlocks.join(", ")
            );
        }
    }
}

// =============================================================================
// REGISTRY COMMANDS
// =============================================================================

/// List derivable targets.
pub fn cmd_rules(engine: &Engine, json_mode: bool) -> Result<(), CascadeError> {
    let response = RulesResponse::for_registry(engine.registry());

    if json_mode {
        return print_json(&response);
    }

    println!("biocascade Rules ({})", response.count);
    println!("================");
    for rule in &response.rules {
        println!(
            "{} [{}]{}",
            rule.target,
            rule.unit,
            if rule.high_value { " *" } else { "" }
        );
        for candidate in &rule.candidates {
            println!(
                "  {:<24} conf {:.2}  needs {}",
                candidate.method,
                candidate.base_confidence,
                candidate.required_inputs.join(", ")
            );
        }
    }

    Ok(())
}

/// List state definitions.
pub fn cmd_states(engine: &Engine, json_mode: bool) -> Result<(), CascadeError> {
    let response = StatesResponse::for_registry(engine.registry());

    if json_mode {
        return print_json(&response);
    }

    println!("biocascade States ({})", response.count);
    println!("=================");
    for state in &response.states {
        println!("{} - {}", state.id, state.description);
        println!("  requires:   {}", state.required.join(", "));
        if !state.supporting.is_empty() {
            println!("  supporting: {}", state.supporting.join(", "));
        }
        println!("  labels:     {}", state.labels.join(" > "));
    }

    Ok(())
}

// =============================================================================
// CHECK COMMAND
// =============================================================================

/// Report the validated registries.
///
/// Reaching this point means the data pack (if any) already passed
/// validation in [`build_engine`](crate::config::build_engine).
pub fn cmd_check(
    engine: &Engine,
    pack_path: Option<&Path>,
    json_mode: bool,
) -> Result<(), CascadeError> {
    let registry = engine.registry();

    if json_mode {
        let output = serde_json::json!({
            "valid": true,
            "pack_path": pack_path.map(|p| p.to_string_lossy().to_string()),
            "pack_version": registry.pack_version(),
            "rules": registry.rules().len(),
            "states": registry.states().len(),
            "bounds": registry.bounds().len(),
            "constraints": registry.constraints().len(),
            "citations": registry.citations().len(),
            "max_iterations": registry.config().max_iterations,
        });
        return print_json(&output);
    }

    println!("biocascade Registry Check");
    println!("=========================");
    match pack_path {
        Some(path) => println!(
            "Data pack:   {:?} (version {})",
            path,
            registry.pack_version().unwrap_or("?")
        ),
        None => println!("Data pack:   none (built-in registries)"),
    }
    println!();
    println!("Rules:       {}", registry.rules().len());
    println!("States:      {}", registry.states().len());
    println!("Bounds:      {}", registry.bounds().len());
    println!("Constraints: {}", registry.constraints().len());
    println!("Citations:   {}", registry.citations().len());
    println!("Max passes:  {}", registry.config().max_iterations);
    println!();
    println!("OK");

    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
