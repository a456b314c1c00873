use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

// ---------------------------------------------------------------------------
// WorkflowPhase
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowPhase {
    Start,
    Develop,
    Finalize,
    Review,
    Release,
}

impl WorkflowPhase {
    pub fn all() -> &'static [WorkflowPhase] {
        &[
            WorkflowPhase::Start,
            WorkflowPhase::Develop,
            WorkflowPhase::Finalize,
            WorkflowPhase::Review,
            WorkflowPhase::Release,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowPhase::Start => "START",
            WorkflowPhase::Develop => "DEVELOP",
            WorkflowPhase::Finalize => "FINALIZE",
            WorkflowPhase::Review => "REVIEW",
            WorkflowPhase::Release => "RELEASE",
        }
    }
}

impl fmt::Display for WorkflowPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Evidence
// ---------------------------------------------------------------------------

/// How directly the observed git state supports a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Evidence {
    /// An explicit signal: branch naming, a tracked PR ref, a clean base branch.
    Strong,
    /// Inferred from counts or remote sync state alone.
    Weak,
}

impl Evidence {
    pub fn as_str(self) -> &'static str {
        match self {
            Evidence::Strong => "strong",
            Evidence::Weak => "weak",
        }
    }
}

// ---------------------------------------------------------------------------
// Confidence
// ---------------------------------------------------------------------------

/// A recommendation confidence, stored as integer per-mille so ordering and
/// ties are exact. Always within [0.6, 1.0].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Confidence(u16);

impl Confidence {
    pub const MIN_PER_MILLE: u16 = 600;
    pub const MAX_PER_MILLE: u16 = 1000;

    pub const FLOOR: Confidence = Confidence(Self::MIN_PER_MILLE);
    pub const CEILING: Confidence = Confidence(Self::MAX_PER_MILLE);

    /// Clamp an arbitrary per-mille score into the valid range.
    pub fn from_per_mille(score: i32) -> Self {
        let clamped = score.clamp(Self::MIN_PER_MILLE as i32, Self::MAX_PER_MILLE as i32);
        Confidence(clamped as u16)
    }

    pub fn from_f64(value: f64) -> Self {
        Self::from_per_mille(per_mille(value))
    }

    pub fn per_mille(self) -> u16 {
        self.0
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.0) / 1000.0
    }

    /// Whole-number percentage, rounded half up.
    pub fn percent(self) -> u16 {
        (self.0 + 5) / 10
    }
}

/// Convert a configured fractional weight (e.g. `0.05`) to per-mille.
pub fn per_mille(value: f64) -> i32 {
    (value * 1000.0).round() as i32
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.percent())
    }
}

impl Serialize for Confidence {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

// ---------------------------------------------------------------------------
// FileCategory
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    Tests,
    Docs,
    Source,
    Config,
    Ci,
}

impl FileCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            FileCategory::Tests => "tests",
            FileCategory::Docs => "docs",
            FileCategory::Source => "source",
            FileCategory::Config => "config",
            FileCategory::Ci => "ci",
        }
    }
}

impl fmt::Display for FileCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ChangeStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeStatus {
    Modified,
    Added,
    Deleted,
    Renamed,
    Copied,
    Untracked,
    Unmerged,
}

impl ChangeStatus {
    /// Map one porcelain v1 status letter.
    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'M' | 'T' => Some(ChangeStatus::Modified),
            'A' => Some(ChangeStatus::Added),
            'D' => Some(ChangeStatus::Deleted),
            'R' => Some(ChangeStatus::Renamed),
            'C' => Some(ChangeStatus::Copied),
            '?' => Some(ChangeStatus::Untracked),
            'U' => Some(ChangeStatus::Unmerged),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ChangeStatus::Modified => "modified",
            ChangeStatus::Added => "added",
            ChangeStatus::Deleted => "deleted",
            ChangeStatus::Renamed => "renamed",
            ChangeStatus::Copied => "copied",
            ChangeStatus::Untracked => "untracked",
            ChangeStatus::Unmerged => "unmerged",
        }
    }
}

impl fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tier
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tier {
    #[serde(rename = "XS")]
    Xs,
    S,
    M,
    L,
}

impl Tier {
    pub fn parse(s: &str) -> Option<Tier> {
        match s.trim().to_ascii_uppercase().as_str() {
            "XS" => Some(Tier::Xs),
            "S" => Some(Tier::S),
            "M" => Some(Tier::M),
            "L" => Some(Tier::L),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Xs => "XS",
            Tier::S => "S",
            Tier::M => "M",
            Tier::L => "L",
        }
    }

    pub fn time_estimate(self) -> &'static str {
        match self {
            Tier::Xs => "5 min",
            Tier::S => "10 min",
            Tier::M => "25 min",
            Tier::L => "45 min",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
