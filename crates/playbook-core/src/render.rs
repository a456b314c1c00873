//! Markdown rendering of a [`Report`].
//!
//! Rendering is a pure function of the report and config, so equal inputs
//! always produce byte-identical text.

use crate::analyze::Report;
use crate::config::{Config, CONFIG_FILE};
use crate::engine::{CandidateSource, CandidateStatus};
use crate::types::{Evidence, FileCategory, WorkflowPhase};

const RULE_WIDTH: usize = 50;

fn heading(out: &mut Vec<String>, title: &str) {
    out.push(format!("# {title}"));
    out.push("━".repeat(RULE_WIDTH));
    out.push(String::new());
}

/// Fixed-width text table. Trailing padding is trimmed.
pub fn table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }
    }

    let line = |cells: Vec<String>| -> String {
        let padded: Vec<String> = cells
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let w = widths.get(i).copied().unwrap_or(0);
                format!("{cell:w$}")
            })
            .collect();
        padded.join("  ").trim_end().to_string()
    };

    let mut lines = vec![line(headers.iter().map(|h| h.to_string()).collect())];
    lines.push(line(widths.iter().map(|&w| "-".repeat(w)).collect()));
    for row in rows {
        lines.push(line(row.clone()));
    }
    lines.join("\n")
}

fn weight(per_mille: i32) -> String {
    format!("{:.2}", f64::from(per_mille) / 1000.0)
}

fn commits_line(report: &Report) -> String {
    let state = &report.state;
    let on_base = state.base_ref.as_deref() == Some(state.branch.as_str());
    match (&state.last_tag, &state.base_ref) {
        (Some(tag), _) => format!("{} since tag `{tag}`", state.commit_count),
        (None, Some(base)) if !on_base => format!("{} ahead of `{base}`", state.commit_count),
        _ => format!("{}", state.commit_count),
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

fn current_state(out: &mut Vec<String>, report: &Report) {
    heading(out, "Current Work State");
    out.push(format!("**Branch**: `{}`", report.state.branch));
    out.push(format!("**Phase**: {}", report.classification.phase));
    let changed = report.state.changed_paths().len();
    if changed == 0 {
        out.push("**Changes**: None (clean working directory)".to_string());
    } else {
        out.push(format!(
            "**Changes**: {changed} file(s) changed ({})",
            report.changes.describe()
        ));
    }
    out.push(format!("**Commits**: {}", commits_line(report)));
    out.push(String::new());
}

fn recommendations(out: &mut Vec<String>, report: &Report, config: &Config) {
    heading(out, "Recommended Next Steps");
    if report.recommendations.is_empty() {
        let phase = report.classification.phase;
        let all_missing = report
            .trace
            .iter()
            .all(|t| t.status == CandidateStatus::MissingDescriptor);
        if report.trace.is_empty() {
            out.push(format!(
                "No recommendations for the {phase} phase: no candidate commands are configured for it."
            ));
            out.push(format!(
                "Add commands for {phase} under `phases` in {CONFIG_FILE}."
            ));
        } else if all_missing {
            out.push(format!(
                "No recommendations for the {phase} phase: none of its candidate commands are in the catalog."
            ));
            out.push("Regenerate the metadata file or add commands for this phase to the config.".to_string());
        } else {
            out.push(format!(
                "No recommendations for the {phase} phase: the recommendation limit is {}.",
                config.thresholds.max_recommendations
            ));
            out.push("Raise `--limit` or `thresholds.max_recommendations` to see candidates.".to_string());
        }
        out.push(String::new());
        return;
    }
    for (idx, rec) in report.recommendations.iter().enumerate() {
        out.push(format!(
            "{}. **`/{}`** - {}",
            idx + 1,
            rec.name(),
            rec.command.title
        ));
        out.push(format!("   - {}", rec.reasoning));
        out.push(format!(
            "   - Confidence: {} | Time: {}",
            rec.confidence, rec.time_estimate
        ));
        out.push(String::new());
    }
}

fn why(out: &mut Vec<String>, report: &Report, config: &Config) {
    if report.recommendations.is_empty() {
        return;
    }
    let c = &report.classification;
    let changes = &report.changes;
    let state = &report.state;

    heading(out, "Why These Commands?");
    out.push(format!("- {} phase (rule `{}`): {}", c.phase, c.rule, c.reason));
    if changes.has(FileCategory::Tests) && changes.has(FileCategory::Source) {
        out.push("- Both source and test files changed: run the full development cycle".to_string());
    }
    if state.commit_count >= config.thresholds.finalize_commits {
        out.push(format!(
            "- {} commits: time to organize and prepare for integration",
            state.commit_count
        ));
    }
    if c.phase == WorkflowPhase::Finalize && !state.has_unstaged() {
        out.push("- No unstaged work left: ready to commit and open a PR".to_string());
    }
    if changes.has(FileCategory::Docs) {
        out.push(format!(
            "- Documentation updated ({} file(s)): ensure clarity and completeness",
            changes.paths(FileCategory::Docs).len()
        ));
    }
    if changes.has(FileCategory::Ci) {
        out.push("- CI/CD modified: review deployment impact".to_string());
    }
    if c.evidence == Evidence::Weak {
        out.push("- Phase inferred from weak evidence: confidences are lowered".to_string());
    }
    out.push(String::new());
}

fn tips(out: &mut Vec<String>, verbose: bool) {
    heading(out, "Tips");
    if !verbose {
        out.push("- Run `playbook-next --verbose` for the full scoring trace".to_string());
    }
    out.push("- Run `playbook-next --json` for machine-readable output".to_string());
    out.push("- Return here after each step for updated recommendations".to_string());
    out.push(String::new());
}

fn git_details(out: &mut Vec<String>, report: &Report) {
    let state = &report.state;
    heading(out, "Git State");
    let mut rows = vec![
        vec!["branch".to_string(), state.branch.clone()],
        vec![
            "base ref".to_string(),
            state.base_ref.clone().unwrap_or_else(|| "(none)".to_string()),
        ],
        vec![
            "last tag".to_string(),
            state.last_tag.clone().unwrap_or_else(|| "(none)".to_string()),
        ],
        vec!["commit count".to_string(), state.commit_count.to_string()],
        vec![
            "files vs base".to_string(),
            state.files_vs_base.len().to_string(),
        ],
    ];
    if let Some(up) = &state.upstream {
        rows.push(vec![
            "upstream".to_string(),
            format!("{} (ahead {}, behind {})", up.name, up.ahead, up.behind),
        ]);
    }
    if let Some(pr) = &state.pr_ref {
        rows.push(vec!["review ref".to_string(), pr.clone()]);
    }
    out.push(table(&["FIELD", "VALUE"], &rows));
    out.push(String::new());

    if !state.recent_commits.is_empty() {
        out.push("Recent commits:".to_string());
        for commit in &state.recent_commits {
            out.push(format!("- {commit}"));
        }
        out.push(String::new());
    }

    if !state.changed_files.is_empty() {
        out.push("Changed files:".to_string());
        for f in &state.changed_files {
            let area = if f.staged { "staged" } else { "working tree" };
            out.push(format!("- {} ({}, {area})", f.path, f.status));
        }
        out.push(String::new());
    }
}

fn classification_details(out: &mut Vec<String>, report: &Report) {
    let c = &report.classification;
    heading(out, "Classification");
    out.push(format!("**Phase**: {}", c.phase));
    out.push(format!("**Rule**: `{}`", c.rule));
    out.push(format!("**Evidence**: {}", c.evidence.as_str()));
    out.push(format!("**Reason**: {}", c.reason));
    out.push(String::new());

    if !report.changes.is_empty() {
        out.push("Changes by category:".to_string());
        for category in report.changes.present() {
            out.push(format!(
                "- {category}: {}",
                report.changes.paths(category).join(", ")
            ));
        }
        if !report.changes.uncategorized.is_empty() {
            out.push(format!("- other: {}", report.changes.uncategorized.join(", ")));
        }
        out.push(String::new());
    }
}

fn scoring_trace(out: &mut Vec<String>, report: &Report) {
    heading(out, "Scoring Trace");
    if report.trace.is_empty() {
        out.push("No candidate commands for this phase.".to_string());
        out.push(String::new());
        return;
    }
    let rows: Vec<Vec<String>> = report
        .trace
        .iter()
        .map(|t| {
            let source = match t.source {
                CandidateSource::Phase => "phase",
                CandidateSource::Signal => "signal",
            };
            vec![
                t.command.clone(),
                source.to_string(),
                weight(t.base),
                format!("+{}", weight(t.bonus)),
                format!("-{}", weight(t.penalty)),
                weight(i32::from(t.score.per_mille())),
                t.status.as_str().to_string(),
            ]
        })
        .collect();
    out.push(table(
        &["COMMAND", "SOURCE", "BASE", "BONUS", "PENALTY", "FINAL", "STATUS"],
        &rows,
    ));
    out.push(String::new());
}

fn warnings(out: &mut Vec<String>, report: &Report) {
    if report.warnings.is_empty() {
        return;
    }
    heading(out, "Warnings");
    for w in &report.warnings {
        out.push(format!("- {w}"));
    }
    out.push(String::new());
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

pub fn concise(report: &Report, config: &Config) -> String {
    let mut out = Vec::new();
    current_state(&mut out, report);
    recommendations(&mut out, report, config);
    why(&mut out, report, config);
    tips(&mut out, false);
    out.join("\n")
}

/// Concise output plus the git state, classification, and scoring trace.
pub fn verbose(report: &Report, config: &Config) -> String {
    let mut out = Vec::new();
    current_state(&mut out, report);
    git_details(&mut out, report);
    classification_details(&mut out, report);
    scoring_trace(&mut out, report);
    recommendations(&mut out, report, config);
    why(&mut out, report, config);
    warnings(&mut out, report);
    tips(&mut out, true);
    out.join("\n")
}

pub fn markdown(report: &Report, config: &Config, verbose_trace: bool) -> String {
    if verbose_trace {
        verbose(report, config)
    } else {
        concise(report, config)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
