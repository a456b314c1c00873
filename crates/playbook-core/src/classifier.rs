use crate::config::Config;
use crate::git::GitState;
use crate::rules::default_rules;
use crate::types::{Evidence, WorkflowPhase};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// PhaseContext
// ---------------------------------------------------------------------------

pub struct PhaseContext<'a> {
    pub state: &'a GitState,
    pub config: &'a Config,
}

impl PhaseContext<'_> {
    /// On an integration branch (configured base name or the resolved base ref).
    pub fn on_base(&self) -> bool {
        let branch = self.state.branch.as_str();
        self.config.branches.is_base(branch) || self.state.base_ref.as_deref() == Some(branch)
    }

    pub fn on_release_branch(&self) -> bool {
        self.config.branches.is_release(&self.state.branch)
    }

    pub fn work_prefix(&self) -> Option<&str> {
        self.config.branches.work_prefix(&self.state.branch)
    }

    pub fn finalize_threshold(&self) -> u32 {
        self.config.thresholds.finalize_commits
    }

    /// Where the commit count is measured from, for reasoning strings.
    pub fn count_origin(&self) -> String {
        if self.on_base() {
            match &self.state.last_tag {
                Some(tag) => format!("since tag `{tag}`"),
                None => "since the first commit (no tags)".to_string(),
            }
        } else {
            match &self.state.base_ref {
                Some(base) => format!("ahead of `{base}`"),
                None => "in recent history (no base ref found)".to_string(),
            }
        }
    }

    pub fn commits_phrase(&self) -> String {
        format!(
            "{} commit(s) {}",
            self.state.commit_count,
            self.count_origin()
        )
    }
}

// ---------------------------------------------------------------------------
// Classification (output)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub phase: WorkflowPhase,
    pub evidence: Evidence,
    /// Id of the rule that fired.
    pub rule: String,
    pub reason: String,
}

// ---------------------------------------------------------------------------
// Rule
// ---------------------------------------------------------------------------

/// A fn-pointer rule, evaluated in priority order.
pub struct Rule {
    pub id: &'static str,
    pub phase: WorkflowPhase,
    pub condition: fn(&PhaseContext) -> bool,
    pub evidence: fn(&PhaseContext) -> Evidence,
    pub reason: fn(&PhaseContext) -> String,
}

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

pub struct Classifier {
    rules: Vec<Rule>,
}

impl Classifier {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn classify(&self, ctx: &PhaseContext) -> Classification {
        for rule in &self.rules {
            if (rule.condition)(ctx) {
                return Classification {
                    phase: rule.phase,
                    evidence: (rule.evidence)(ctx),
                    rule: rule.id.to_string(),
                    reason: (rule.reason)(ctx),
                };
            }
        }

        // Only reachable with a custom rule set that has no catch-all.
        Classification {
            phase: WorkflowPhase::Finalize,
            evidence: Evidence::Weak,
            rule: "fallback".to_string(),
            reason: format!(
                "no rule matched branch `{}` with {}",
                ctx.state.branch,
                ctx.commits_phrase()
            ),
        }
    }
}

/// Classify with the default rule set.
pub fn classify_detailed(state: &GitState, config: &Config) -> Classification {
    let ctx = PhaseContext { state, config };
    Classifier::new(default_rules()).classify(&ctx)
}

pub fn classify(state: &GitState, config: &Config) -> WorkflowPhase {
    classify_detailed(state, config).phase
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
