use crate::catalog::{Catalog, CommandDescriptor};
use crate::classifier::Classification;
use crate::config::Config;
use crate::files::ChangeSummary;
use crate::types::{per_mille, Confidence, Evidence, FileCategory};
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};

/// Paths quoted per category in reasoning strings.
const SAMPLE_PATHS: usize = 3;

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub command: CommandDescriptor,
    pub confidence: Confidence,
    pub reasoning: String,
    pub time_estimate: String,
}

impl Recommendation {
    pub fn name(&self) -> &str {
        &self.command.name
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    Phase,
    Signal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateStatus {
    Included,
    /// Not present in the catalog.
    MissingDescriptor,
    /// Scored below the recommendation limit.
    Truncated,
}

impl CandidateStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CandidateStatus::Included => "included",
            CandidateStatus::MissingDescriptor => "missing from catalog",
            CandidateStatus::Truncated => "truncated",
        }
    }
}

/// How one candidate was scored. Weights are per-mille.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateTrace {
    pub command: String,
    pub source: CandidateSource,
    pub base: i32,
    pub bonus: i32,
    pub penalty: i32,
    pub score: Confidence,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub signals: Vec<FileCategory>,
    pub status: CandidateStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Outcome {
    pub recommendations: Vec<Recommendation>,
    pub trace: Vec<CandidateTrace>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

// ---------------------------------------------------------------------------
// Candidate pool
// ---------------------------------------------------------------------------

struct Pooled {
    source: CandidateSource,
    base: i32,
    reason: String,
    signals: BTreeSet<FileCategory>,
}

/// Phase-table entries plus file-signal entries, keyed by command name.
fn build_pool(
    classification: &Classification,
    summary: &ChangeSummary,
    config: &Config,
) -> BTreeMap<String, Pooled> {
    let mut pool: BTreeMap<String, Pooled> = BTreeMap::new();

    for c in config.candidates_for(classification.phase) {
        let base = per_mille(c.confidence);
        match pool.get_mut(&c.command) {
            Some(p) if p.base >= base => {}
            Some(p) => {
                p.base = base;
                p.reason = c.reason.clone();
            }
            None => {
                pool.insert(
                    c.command.clone(),
                    Pooled {
                        source: CandidateSource::Phase,
                        base,
                        reason: c.reason.clone(),
                        signals: BTreeSet::new(),
                    },
                );
            }
        }
    }

    for signal in config.signals.iter().filter(|s| summary.has(s.category)) {
        let base = per_mille(signal.confidence);
        let entry = pool.entry(signal.command.clone()).or_insert_with(|| Pooled {
            source: CandidateSource::Signal,
            base,
            reason: signal.reason.clone(),
            signals: BTreeSet::new(),
        });
        entry.signals.insert(signal.category);
        if entry.source == CandidateSource::Signal && base > entry.base {
            entry.base = base;
            entry.reason = signal.reason.clone();
        }
    }

    pool
}

// ---------------------------------------------------------------------------
// Reasoning
// ---------------------------------------------------------------------------

fn sample(paths: &[String]) -> String {
    let mut shown: Vec<String> = paths.iter().take(SAMPLE_PATHS).cloned().collect();
    let rest = paths.len().saturating_sub(SAMPLE_PATHS);
    if rest > 0 {
        shown.push(format!("and {rest} more"));
    }
    shown.join(", ")
}

fn reasoning(
    pooled: &Pooled,
    classification: &Classification,
    summary: &ChangeSummary,
    penalized: bool,
) -> String {
    let mut parts = Vec::new();
    match pooled.source {
        CandidateSource::Phase => parts.push(format!(
            "{} ({} phase: {})",
            pooled.reason, classification.phase, classification.reason
        )),
        CandidateSource::Signal => parts.push(pooled.reason.clone()),
    }
    for category in &pooled.signals {
        let paths = summary.paths(*category);
        parts.push(format!(
            "{} {category} file(s) changed: {}",
            paths.len(),
            sample(paths)
        ));
    }
    if penalized {
        parts.push("confidence lowered because the phase was inferred from weak evidence".to_string());
    }
    parts.join("; ")
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Score, filter, and rank candidate commands for a classified phase.
///
/// Candidates whose command is missing from the catalog are skipped with a
/// warning. An empty result is valid and not an error.
pub fn recommend(
    classification: &Classification,
    summary: &ChangeSummary,
    catalog: &Catalog,
    config: &Config,
) -> Outcome {
    let bonus_weight = per_mille(config.scoring.signal_bonus);
    let penalty_weight = match classification.evidence {
        Evidence::Weak => per_mille(config.scoring.weak_evidence_penalty),
        Evidence::Strong => 0,
    };

    let mut scored: Vec<(String, Pooled, i32, Confidence)> = build_pool(classification, summary, config)
        .into_iter()
        .map(|(command, pooled)| {
            let bonus = if pooled.source == CandidateSource::Phase && !pooled.signals.is_empty() {
                bonus_weight
            } else {
                0
            };
            let score = Confidence::from_per_mille(pooled.base + bonus - penalty_weight);
            (command, pooled, bonus, score)
        })
        .collect();
    scored.sort_by(|a, b| (Reverse(a.3), &a.0).cmp(&(Reverse(b.3), &b.0)));

    let limit = config.thresholds.max_recommendations;
    let mut outcome = Outcome::default();
    for (command, pooled, bonus, score) in scored {
        let status = match catalog.get(&command) {
            None => {
                tracing::warn!(%command, "recommended command is not in the catalog; skipping");
                outcome
                    .warnings
                    .push(format!("command '{command}' is not in the catalog; skipped"));
                CandidateStatus::MissingDescriptor
            }
            Some(_) if outcome.recommendations.len() >= limit => CandidateStatus::Truncated,
            Some(descriptor) => {
                outcome.recommendations.push(Recommendation {
                    command: descriptor.clone(),
                    confidence: score,
                    reasoning: reasoning(&pooled, classification, summary, penalty_weight > 0),
                    time_estimate: descriptor.time_estimate.clone(),
                });
                CandidateStatus::Included
            }
        };
        outcome.trace.push(CandidateTrace {
            command,
            source: pooled.source,
            base: pooled.base,
            bonus,
            penalty: penalty_weight,
            score,
            signals: pooled.signals.into_iter().collect(),
            status,
        });
    }

    if outcome.recommendations.is_empty() {
        tracing::info!(
            phase = %classification.phase,
            candidates = outcome.trace.len(),
            "no recommendations for this phase"
        );
    }
    outcome
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
