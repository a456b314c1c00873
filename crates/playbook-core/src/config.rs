use crate::error::{PlaybookError, Result};
use crate::types::{FileCategory, WorkflowPhase};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE: &str = ".playbook-next.yaml";

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thresholds {
    /// Commit count at which a branch is considered ready to finalize.
    #[serde(default = "default_finalize_commits")]
    pub finalize_commits: u32,
    #[serde(default = "default_git_timeout_secs")]
    pub git_timeout_secs: u64,
    /// Upper bound for `git log --oneline -N`.
    #[serde(default = "default_log_limit")]
    pub log_limit: u32,
    #[serde(default = "default_max_recommendations")]
    pub max_recommendations: usize,
}

fn default_finalize_commits() -> u32 {
    5
}

fn default_git_timeout_secs() -> u64 {
    5
}

fn default_log_limit() -> u32 {
    10
}

fn default_max_recommendations() -> usize {
    4
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            finalize_commits: default_finalize_commits(),
            git_timeout_secs: default_git_timeout_secs(),
            log_limit: default_log_limit(),
            max_recommendations: default_max_recommendations(),
        }
    }
}

// ---------------------------------------------------------------------------
// ScoringConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Added when a changed-file category reinforces a candidate.
    #[serde(default = "default_signal_bonus")]
    pub signal_bonus: f64,
    /// Subtracted when the phase was inferred heuristically.
    #[serde(default = "default_weak_evidence_penalty")]
    pub weak_evidence_penalty: f64,
}

fn default_signal_bonus() -> f64 {
    0.05
}

fn default_weak_evidence_penalty() -> f64 {
    0.15
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            signal_bonus: default_signal_bonus(),
            weak_evidence_penalty: default_weak_evidence_penalty(),
        }
    }
}

// ---------------------------------------------------------------------------
// BranchConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchConfig {
    /// Integration branches, in base-ref detection order.
    #[serde(default = "default_base_branches")]
    pub base: Vec<String>,
    #[serde(default = "default_work_prefixes")]
    pub work_prefixes: Vec<String>,
    #[serde(default = "default_release_prefixes")]
    pub release_prefixes: Vec<String>,
}

fn default_base_branches() -> Vec<String> {
    vec!["main".to_string(), "master".to_string()]
}

fn default_work_prefixes() -> Vec<String> {
    ["feature/", "feat/", "fix/", "bugfix/", "refactor/", "chore/"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_release_prefixes() -> Vec<String> {
    vec!["release/".to_string()]
}

impl Default for BranchConfig {
    fn default() -> Self {
        Self {
            base: default_base_branches(),
            work_prefixes: default_work_prefixes(),
            release_prefixes: default_release_prefixes(),
        }
    }
}

impl BranchConfig {
    pub fn is_base(&self, branch: &str) -> bool {
        self.base.iter().any(|b| b == branch)
    }

    pub fn is_release(&self, branch: &str) -> bool {
        self.release_prefixes.iter().any(|p| branch.starts_with(p.as_str()))
    }

    /// The matching work prefix, if the branch follows a work naming convention.
    pub fn work_prefix(&self, branch: &str) -> Option<&str> {
        self.work_prefixes
            .iter()
            .find(|p| branch.starts_with(p.as_str()) && branch.len() > p.len())
            .map(|p| p.as_str())
    }
}

// ---------------------------------------------------------------------------
// Candidate / SignalRule
// ---------------------------------------------------------------------------

/// One entry of the phase -> command table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub command: String,
    pub confidence: f64,
    pub reason: String,
}

impl Candidate {
    fn new(command: &str, confidence: f64, reason: &str) -> Self {
        Self {
            command: command.to_string(),
            confidence,
            reason: reason.to_string(),
        }
    }
}

/// A changed-file category that suggests (and reinforces) a command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRule {
    pub category: FileCategory,
    pub command: String,
    pub confidence: f64,
    pub reason: String,
}

fn default_phase_table() -> BTreeMap<WorkflowPhase, Vec<Candidate>> {
    let mut m = BTreeMap::new();
    m.insert(
        WorkflowPhase::Start,
        vec![Candidate::new(
            "pb-start",
            0.95,
            "Begin feature work on the new branch",
        )],
    );
    m.insert(
        WorkflowPhase::Develop,
        vec![
            Candidate::new("pb-cycle", 0.90, "Iterate on changes and get peer feedback"),
            Candidate::new("pb-testing", 0.85, "Verify test coverage matches code changes"),
        ],
    );
    m.insert(
        WorkflowPhase::Finalize,
        vec![
            Candidate::new("pb-commit", 0.90, "Organize work into logical commits"),
            Candidate::new("pb-pr", 0.90, "Create a pull request for integration"),
        ],
    );
    m.insert(
        WorkflowPhase::Review,
        vec![
            Candidate::new("pb-review-code", 0.95, "Review code logic and patterns"),
            Candidate::new("pb-review-tests", 0.85, "Verify test coverage and quality"),
            Candidate::new("pb-security", 0.75, "Check security implications"),
        ],
    );
    m.insert(
        WorkflowPhase::Release,
        vec![
            Candidate::new("pb-release", 0.90, "Prepare for production release"),
            Candidate::new("pb-deployment", 0.80, "Plan deployment strategy"),
        ],
    );
    m
}

fn default_signals() -> Vec<SignalRule> {
    vec![
        SignalRule {
            category: FileCategory::Tests,
            command: "pb-testing".to_string(),
            confidence: 0.88,
            reason: "Test files changed, verify coverage".to_string(),
        },
        SignalRule {
            category: FileCategory::Docs,
            command: "pb-documentation".to_string(),
            confidence: 0.75,
            reason: "Documentation changed, ensure clarity".to_string(),
        },
        SignalRule {
            category: FileCategory::Ci,
            command: "pb-deployment".to_string(),
            confidence: 0.70,
            reason: "CI/CD workflow modified, review deployment impact".to_string(),
        },
    ]
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub branches: BranchConfig,
    #[serde(default = "default_phase_table")]
    pub phases: BTreeMap<WorkflowPhase, Vec<Candidate>>,
    #[serde(default = "default_signals")]
    pub signals: Vec<SignalRule>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            scoring: ScoringConfig::default(),
            branches: BranchConfig::default(),
            phases: default_phase_table(),
            signals: default_signals(),
        }
    }
}

impl Config {
    pub fn candidates_for(&self, phase: WorkflowPhase) -> &[Candidate] {
        self.phases.get(&phase).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn git_timeout(&self) -> Duration {
        Duration::from_secs(self.thresholds.git_timeout_secs)
    }

    pub fn path(root: &Path) -> PathBuf {
        root.join(CONFIG_FILE)
    }

    /// Load `explicit` if given (it must exist), otherwise `<root>/.playbook-next.yaml`
    /// when present, otherwise the built-in defaults.
    pub fn load(root: &Path, explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(p) => {
                if !p.exists() {
                    return Err(PlaybookError::InvalidConfig {
                        path: p.to_path_buf(),
                        reason: "file does not exist".to_string(),
                    });
                }
                p.to_path_buf()
            }
            None => {
                let p = Self::path(root);
                if !p.exists() {
                    tracing::debug!("no {} found, using defaults", CONFIG_FILE);
                    return Ok(Self::default());
                }
                p
            }
        };
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config =
            serde_yaml::from_str(&data).map_err(|e| PlaybookError::InvalidConfig {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(cfg)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.thresholds.finalize_commits == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "thresholds.finalize_commits is 0: DEVELOP can never be reached"
                    .to_string(),
            });
        }

        if self.thresholds.git_timeout_secs == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "thresholds.git_timeout_secs is 0: every git call would time out"
                    .to_string(),
            });
        }

        if self.thresholds.max_recommendations == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "thresholds.max_recommendations is 0: no recommendations will be shown"
                    .to_string(),
            });
        }

        if self.branches.base.is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "branches.base is empty: base ref can only come from --base-ref"
                    .to_string(),
            });
        }

        for phase in WorkflowPhase::all() {
            if self.candidates_for(*phase).is_empty() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("phase {phase} has no candidate commands"),
                });
            }
        }

        for (phase, candidates) in &self.phases {
            let mut seen = BTreeSet::new();
            for c in candidates {
                check_entry(
                    &mut warnings,
                    &format!("phases.{phase}"),
                    &c.command,
                    c.confidence,
                );
                if !seen.insert(c.command.as_str()) {
                    warnings.push(ConfigWarning {
                        level: WarnLevel::Warning,
                        message: format!(
                            "phases.{phase} lists '{}' more than once",
                            c.command
                        ),
                    });
                }
            }
        }

        for s in &self.signals {
            check_entry(
                &mut warnings,
                &format!("signals.{}", s.category),
                &s.command,
                s.confidence,
            );
        }

        for (name, value) in [
            ("scoring.signal_bonus", self.scoring.signal_bonus),
            ("scoring.weak_evidence_penalty", self.scoring.weak_evidence_penalty),
        ] {
            if !(0.0..=0.4).contains(&value) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("{name}={value} is outside [0.0, 0.4]"),
                });
            }
        }

        warnings
    }
}

fn check_entry(warnings: &mut Vec<ConfigWarning>, section: &str, command: &str, confidence: f64) {
    if command.trim().is_empty() {
        warnings.push(ConfigWarning {
            level: WarnLevel::Error,
            message: format!("{section} has an entry with an empty command"),
        });
    }
    if !(0.6..=1.0).contains(&confidence) {
        warnings.push(ConfigWarning {
            level: WarnLevel::Warning,
            message: format!(
                "{section} '{command}' has confidence {confidence} outside [0.6, 1.0] \
                 (it will be clamped)"
            ),
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let yaml = serde_yaml::to_string(&cfg).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.thresholds.finalize_commits, 5);
        assert_eq!(parsed.phases.len(), 5);
        assert_eq!(parsed.signals.len(), 3);
    }

    #[test]
    fn empty_yaml_uses_defaults() {
        let cfg: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(cfg.thresholds.git_timeout_secs, 5);
        assert_eq!(cfg.thresholds.log_limit, 10);
        assert_eq!(cfg.thresholds.max_recommendations, 4);
        assert_eq!(cfg.branches.base, vec!["main", "master"]);
        assert_eq!(cfg.candidates_for(WorkflowPhase::Start)[0].command, "pb-start");
    }

    #[test]
    fn partial_thresholds_keep_other_defaults() {
        let yaml = "thresholds:\n  finalize_commits: 8\n";
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.thresholds.finalize_commits, 8);
        assert_eq!(cfg.thresholds.git_timeout_secs, 5);
    }

    #[test]
    fn phase_table_override() {
        let yaml = r#"
phases:
  START:
    - command: pb-kickoff
      confidence: 0.9
      reason: "Kick off"
"#;
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.candidates_for(WorkflowPhase::Start)[0].command, "pb-kickoff");
        assert!(cfg.candidates_for(WorkflowPhase::Release).is_empty());
    }

    #[test]
    fn branch_helpers() {
        let b = BranchConfig::default();
        assert!(b.is_base("main"));
        assert!(!b.is_base("feature/main"));
        assert!(b.is_release("release/1.2"));
        assert_eq!(b.work_prefix("feature/auth"), Some("feature/"));
        assert_eq!(b.work_prefix("feature/"), None);
        assert_eq!(b.work_prefix("spike-auth"), None);
    }

    #[test]
    fn load_missing_default_file_returns_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg = Config::load(dir.path(), None).unwrap();
        assert_eq!(cfg.thresholds.finalize_commits, 5);
    }

    #[test]
    fn load_missing_explicit_file_fails() {
        let dir = TempDir::new().unwrap();
        let err = Config::load(dir.path(), Some(&dir.path().join("nope.yaml"))).unwrap_err();
        assert!(matches!(err, PlaybookError::InvalidConfig { .. }));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn load_reads_root_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "thresholds:\n  git_timeout_secs: 2\n",
        )
        .unwrap();
        let cfg = Config::load(dir.path(), None).unwrap();
        assert_eq!(cfg.git_timeout(), Duration::from_secs(2));
    }

    #[test]
    fn load_malformed_yaml_is_invalid_config() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "thresholds: [oops").unwrap();
        let err = Config::load(dir.path(), None).unwrap_err();
        assert!(matches!(err, PlaybookError::InvalidConfig { .. }));
    }

    #[test]
    fn validate_default_config_no_warnings() {
        assert!(Config::default().validate().is_empty());
    }

    #[test]
    fn validate_zero_threshold_is_error() {
        let mut cfg = Config::default();
        cfg.thresholds.finalize_commits = 0;
        let warnings = cfg.validate();
        assert!(warnings
            .iter()
            .any(|w| w.level == WarnLevel::Error && w.message.contains("finalize_commits")));
    }

    #[test]
    fn validate_out_of_range_confidence() {
        let mut cfg = Config::default();
        cfg.phases
            .get_mut(&WorkflowPhase::Develop)
            .unwrap()
            .push(Candidate::new("pb-debug", 0.4, "Debug"));
        let warnings = cfg.validate();
        assert!(warnings
            .iter()
            .any(|w| w.message.contains("pb-debug") && w.message.contains("outside [0.6, 1.0]")));
    }

    #[test]
    fn validate_duplicate_and_empty_commands() {
        let mut cfg = Config::default();
        let develop = cfg.phases.get_mut(&WorkflowPhase::Develop).unwrap();
        develop.push(Candidate::new("pb-cycle", 0.8, "again"));
        develop.push(Candidate::new("  ", 0.8, "blank"));
        let warnings = cfg.validate();
        assert!(warnings.iter().any(|w| w.message.contains("more than once")));
        assert!(warnings.iter().any(|w| w.message.contains("empty command")));
    }

    #[test]
    fn validate_missing_phase_entries() {
        let mut cfg = Config::default();
        cfg.phases.remove(&WorkflowPhase::Review);
        let warnings = cfg.validate();
        assert!(warnings
            .iter()
            .any(|w| w.message == "phase REVIEW has no candidate commands"));
    }
}
