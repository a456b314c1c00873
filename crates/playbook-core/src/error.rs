use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlaybookError {
    #[error("git unavailable: {0} (run playbook-next inside a git repository)")]
    GitUnavailable(String),

    #[error("git command failed: `{command}`: {reason}")]
    GitCommandFailed { command: String, reason: String },

    #[error(
        "metadata file not found: {} (run the playbook metadata extraction tool first)",
        .0.display()
    )]
    MetadataNotFound(PathBuf),

    #[error("metadata invalid: {0}")]
    MetadataInvalid(String),

    #[error("invalid config {}: {reason}", path.display())]
    InvalidConfig { path: PathBuf, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl PlaybookError {
    /// Process exit code for this error when it reaches the CLI boundary.
    pub fn exit_code(&self) -> i32 {
        match self {
            PlaybookError::GitUnavailable(_) | PlaybookError::GitCommandFailed { .. } => 1,
            PlaybookError::MetadataNotFound(_) | PlaybookError::MetadataInvalid(_) => 2,
            _ => 3,
        }
    }

    pub(crate) fn git_failed(command: impl Into<String>, reason: impl Into<String>) -> Self {
        PlaybookError::GitCommandFailed {
            command: command.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PlaybookError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_taxonomy() {
        assert_eq!(PlaybookError::GitUnavailable("no git".into()).exit_code(), 1);
        assert_eq!(PlaybookError::git_failed("git status", "boom").exit_code(), 1);
        assert_eq!(
            PlaybookError::MetadataNotFound(PathBuf::from("x.json")).exit_code(),
            2
        );
        assert_eq!(PlaybookError::MetadataInvalid("empty".into()).exit_code(), 2);
        assert_eq!(
            PlaybookError::InvalidConfig {
                path: PathBuf::from(".playbook-next.yaml"),
                reason: "bad yaml".into(),
            }
            .exit_code(),
            3
        );
    }

    #[test]
    fn git_failure_names_command() {
        let err = PlaybookError::git_failed("git status --porcelain", "timed out after 5s");
        let msg = err.to_string();
        assert!(msg.contains("git status --porcelain"));
        assert!(msg.contains("timed out"));
    }

    #[test]
    fn missing_metadata_suggests_extraction() {
        let err = PlaybookError::MetadataNotFound(PathBuf::from(".playbook-metadata.json"));
        assert!(err.to_string().contains("extraction"));
    }
}
