use crate::classifier::{PhaseContext, Rule};
use crate::types::{Evidence, WorkflowPhase};
use regex::Regex;
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Helper macros for concise rule definitions
// ---------------------------------------------------------------------------

macro_rules! rule {
    (
        id: $id:expr,
        phase: $phase:expr,
        condition: $cond:expr,
        reason: $reason:expr
        $(, evidence: $ev:expr)?
    ) => {
        Rule {
            id: $id,
            phase: $phase,
            condition: $cond,
            reason: $reason,
            evidence: {
                #[allow(unused_assignments, unused_mut)]
                let mut v: fn(&PhaseContext) -> Evidence = branch_evidence;
                $(v = $ev;)?
                v
            },
        }
    };
}

// ---------------------------------------------------------------------------
// Condition helpers
// ---------------------------------------------------------------------------

/// A detached HEAD carries no branch intent, so any phase is a guess.
fn branch_evidence(ctx: &PhaseContext) -> Evidence {
    if ctx.state.is_detached() {
        Evidence::Weak
    } else {
        Evidence::Strong
    }
}

fn is_clean(ctx: &PhaseContext) -> bool {
    ctx.state.is_clean()
}

fn is_editing(ctx: &PhaseContext) -> bool {
    ctx.state.has_unstaged()
}

fn has_commits(ctx: &PhaseContext) -> bool {
    ctx.state.commit_count > 0
}

fn below_threshold(ctx: &PhaseContext) -> bool {
    ctx.state.commit_count < ctx.finalize_threshold()
}

fn pushed_and_in_sync(ctx: &PhaseContext) -> bool {
    ctx.state.upstream.as_ref().is_some_and(|u| u.ahead == 0)
}

fn changes_phrase(ctx: &PhaseContext) -> String {
    format!("{} working-tree change(s)", ctx.state.changed_paths().len())
}

static BRANCH_RE: OnceLock<Regex> = OnceLock::new();

fn branch_re() -> &'static Regex {
    BRANCH_RE.get_or_init(|| Regex::new(r"^(?P<kind>[A-Za-z0-9_.-]+)/(?P<topic>.+)$").unwrap())
}

/// `feature/auth` -> `Some(("feature", "auth"))`.
pub fn split_branch(branch: &str) -> Option<(&str, &str)> {
    let caps = branch_re().captures(branch)?;
    Some((caps.name("kind")?.as_str(), caps.name("topic")?.as_str()))
}

fn branch_label(ctx: &PhaseContext) -> String {
    let branch = &ctx.state.branch;
    match split_branch(branch) {
        Some((kind, topic)) if ctx.work_prefix().is_some() => {
            format!("{kind} branch `{branch}` (topic `{topic}`)")
        }
        _ if ctx.state.is_detached() => "detached HEAD".to_string(),
        _ => format!("branch `{branch}`"),
    }
}

fn finalize_message(ctx: &PhaseContext) -> String {
    let threshold = ctx.finalize_threshold();
    let state = ctx.state;
    if state.commit_count >= threshold {
        let mut msg = format!(
            "{} has {}, at or above the finalize threshold {threshold}",
            branch_label(ctx),
            ctx.commits_phrase()
        );
        if let Some(upstream) = state.upstream.as_ref().filter(|u| u.ahead > 0) {
            msg.push_str(&format!(
                "; {} commit(s) not yet pushed to `{}`",
                upstream.ahead, upstream.name
            ));
        }
        msg
    } else if state.has_staged() && !state.has_unstaged() {
        format!(
            "all {} change(s) on {} are staged, ready to commit ({})",
            state.changed_paths().len(),
            branch_label(ctx),
            ctx.commits_phrase()
        )
    } else {
        format!(
            "{} is clean with {}; work looks ready to wrap up",
            branch_label(ctx),
            ctx.commits_phrase()
        )
    }
}

// ---------------------------------------------------------------------------
// Default rule table (first match wins)
// ---------------------------------------------------------------------------

pub fn default_rules() -> Vec<Rule> {
    vec![
        // 1. Clean integration or release branch with unreleased commits
        rule! {
            id: "release_branch",
            phase: WorkflowPhase::Release,
            condition: |ctx| (ctx.on_base() || ctx.on_release_branch()) && is_clean(ctx) && has_commits(ctx),
            reason: |ctx| format!(
                "on `{}` with a clean working tree and {}",
                ctx.state.branch,
                ctx.commits_phrase()
            )
        },
        // 2. Branch tracks a pull/merge request ref
        rule! {
            id: "review_pr_ref",
            phase: WorkflowPhase::Review,
            condition: |ctx| ctx.state.pr_ref.is_some(),
            reason: |ctx| format!(
                "{} tracks review ref `{}`",
                branch_label(ctx),
                ctx.state.pr_ref.as_deref().unwrap_or_default()
            ),
            evidence: |_| Evidence::Strong
        },
        // 3. Pushed, clean, nothing unpushed: probably waiting on review
        rule! {
            id: "review_pushed",
            phase: WorkflowPhase::Review,
            condition: |ctx| !ctx.on_base() && is_clean(ctx) && has_commits(ctx) && pushed_and_in_sync(ctx),
            reason: |ctx| format!(
                "{} is clean with {} and fully pushed to `{}`; review inferred from push state only",
                branch_label(ctx),
                ctx.commits_phrase(),
                ctx.state.upstream.as_ref().map(|u| u.name.as_str()).unwrap_or_default()
            ),
            evidence: |_| Evidence::Weak
        },
        // 4. Nothing committed, nothing changed
        rule! {
            id: "start",
            phase: WorkflowPhase::Start,
            condition: |ctx| !has_commits(ctx) && is_clean(ctx),
            reason: |ctx| format!(
                "{} has 0 commits {} and a clean working tree",
                branch_label(ctx),
                ctx.count_origin()
            )
        },
        // 5. Work-prefixed branch with edits: naming beats the commit count
        rule! {
            id: "work_branch_editing",
            phase: WorkflowPhase::Develop,
            condition: |ctx| ctx.work_prefix().is_some() && is_editing(ctx),
            reason: |ctx| {
                let mut msg = format!(
                    "{} has {} and {}",
                    branch_label(ctx),
                    changes_phrase(ctx),
                    ctx.commits_phrase()
                );
                if !below_threshold(ctx) {
                    msg.push_str(&format!(
                        "; branch naming takes precedence over the finalize threshold {}",
                        ctx.finalize_threshold()
                    ));
                }
                msg
            }
        },
        // 6. Few commits, active edits
        rule! {
            id: "develop",
            phase: WorkflowPhase::Develop,
            condition: |ctx| below_threshold(ctx) && is_editing(ctx),
            reason: |ctx| format!(
                "{} has {} (below finalize threshold {}) and {}",
                branch_label(ctx),
                ctx.commits_phrase(),
                ctx.finalize_threshold(),
                changes_phrase(ctx)
            )
        },
        // 7. Everything else is wrapping up
        rule! {
            id: "finalize",
            phase: WorkflowPhase::Finalize,
            condition: |_| true,
            reason: finalize_message
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_conventional_branches() {
        assert_eq!(split_branch("feature/auth"), Some(("feature", "auth")));
        assert_eq!(split_branch("fix/api/timeout"), Some(("fix", "api/timeout")));
        assert_eq!(split_branch("main"), None);
        assert_eq!(split_branch("feature/"), None);
    }

    #[test]
    fn rule_ids_are_unique_and_end_with_catch_all() {
        let rules = default_rules();
        let mut ids: Vec<_> = rules.iter().map(|r| r.id).collect();
        assert_eq!(ids.last(), Some(&"finalize"));
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), rules.len());
    }
}
