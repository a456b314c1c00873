use crate::catalog::LoadedCatalog;
use crate::classifier::{classify_detailed, Classification};
use crate::config::Config;
use crate::engine::{recommend, CandidateTrace, Recommendation};
use crate::error::Result;
use crate::files::ChangeSummary;
use crate::git::{GitProbe, GitState};
use serde::Serialize;
use std::path::Path;

/// Everything one invocation computed, in render order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub state: GitState,
    pub classification: Classification,
    pub changes: ChangeSummary,
    pub recommendations: Vec<Recommendation>,
    pub trace: Vec<CandidateTrace>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Classify and recommend for an already-probed state. Pure.
pub fn analyze_state(state: GitState, loaded: &LoadedCatalog, config: &Config) -> Report {
    let classification = classify_detailed(&state, config);
    let changes = ChangeSummary::from_paths(state.changed_paths());
    let outcome = recommend(&classification, &changes, &loaded.catalog, config);

    let mut warnings: Vec<String> = loaded
        .warnings
        .iter()
        .map(|w| format!("metadata entry '{}': {}", w.entry, w.message))
        .collect();
    warnings.extend(outcome.warnings);

    Report {
        state,
        classification,
        changes,
        recommendations: outcome.recommendations,
        trace: outcome.trace,
        warnings,
    }
}

pub fn analyze(
    probe: &dyn GitProbe,
    root: &Path,
    loaded: &LoadedCatalog,
    config: &Config,
) -> Result<Report> {
    let state = probe.probe(root)?;
    let report = analyze_state(state, loaded, config);
    tracing::info!(
        phase = %report.classification.phase,
        rule = %report.classification.rule,
        recommendations = report.recommendations.len(),
        "analysis complete"
    );
    Ok(report)
}
