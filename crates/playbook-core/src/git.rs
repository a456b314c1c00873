//! Read-only snapshot of repository state.
//!
//! All git access goes through [`GitProbe`], so classification and scoring can
//! be tested against fabricated [`GitState`] values. [`GitCli`] is the real
//! implementation: every subprocess runs with a hard timeout and a timeout is
//! a failure, never retried.

use crate::config::Config;
use crate::error::{PlaybookError, Result};
use crate::types::ChangeStatus;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    process::Command,
    runtime::Runtime,
    time::timeout,
};

const DETACHED: &str = "HEAD";
const PR_REF_PREFIXES: &[&str] = &["refs/pull/", "refs/merge-requests/"];

/// `git describe` with no reachable tag.
const NO_TAG: &[&str] = &["no names found", "no tags can describe"];
/// `@{u}` on a branch without a usable upstream.
const NO_UPSTREAM: &[&str] = &[
    "no upstream configured",
    "no such branch",
    "upstream branch",
    "does not point to a branch",
];

// ---------------------------------------------------------------------------
// GitState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangedFile {
    pub path: String,
    pub status: ChangeStatus,
    /// True for index (staged) changes, false for working-tree changes.
    pub staged: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Upstream {
    pub name: String,
    pub ahead: u32,
    pub behind: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GitState {
    /// Current branch, or `HEAD` when detached.
    pub branch: String,
    pub changed_files: Vec<ChangedFile>,
    /// Commits ahead of the base ref, or since the last tag on a base branch.
    pub commit_count: u32,
    /// `git log --oneline` lines, newest first.
    pub recent_commits: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_tag: Option<String>,
    /// Paths changed on this branch relative to the base ref.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files_vs_base: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream: Option<Upstream>,
    /// Pull-request ref the branch tracks (`refs/pull/<n>/head`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pr_ref: Option<String>,
}

impl GitState {
    pub fn is_clean(&self) -> bool {
        self.changed_files.is_empty()
    }

    /// Working-tree edits or untracked files.
    pub fn has_unstaged(&self) -> bool {
        self.changed_files.iter().any(|f| !f.staged)
    }

    pub fn has_staged(&self) -> bool {
        self.changed_files.iter().any(|f| f.staged)
    }

    pub fn is_detached(&self) -> bool {
        self.branch == DETACHED
    }

    /// Distinct changed paths, sorted.
    pub fn changed_paths(&self) -> Vec<&str> {
        let set: BTreeSet<&str> = self.changed_files.iter().map(|f| f.path.as_str()).collect();
        set.into_iter().collect()
    }
}

// ---------------------------------------------------------------------------
// GitProbe
// ---------------------------------------------------------------------------

pub trait GitProbe {
    fn probe(&self, root: &Path) -> Result<GitState>;
}

// ---------------------------------------------------------------------------
// GitCli
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct GitCli {
    timeout: Duration,
    log_limit: u32,
    base_candidates: Vec<String>,
    base_override: Option<String>,
    binary: Option<PathBuf>,
}

struct GitOutput {
    success: bool,
    stdout: String,
    stderr: String,
}

impl GitCli {
    pub fn new(config: &Config, base_override: Option<String>) -> Self {
        Self {
            timeout: config.git_timeout(),
            log_limit: config.thresholds.log_limit,
            base_candidates: config.branches.base.clone(),
            base_override,
            binary: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Use a specific git executable instead of looking it up on `PATH`.
    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = Some(binary.into());
        self
    }

    fn git_binary(&self) -> Result<PathBuf> {
        match &self.binary {
            Some(b) => Ok(b.clone()),
            None => which::which("git").map_err(|_| {
                PlaybookError::GitUnavailable("git binary not found on PATH".to_string())
            }),
        }
    }
}

impl GitProbe for GitCli {
    fn probe(&self, root: &Path) -> Result<GitState> {
        if !root.is_dir() {
            return Err(PlaybookError::GitUnavailable(format!(
                "{} does not exist or is not a directory",
                root.display()
            )));
        }
        Session::open(self, root)?.snapshot()
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// State for one snapshot: the resolved git binary, the root, and the runtime
/// that drives the subprocesses. Each command finishes before the next starts.
struct Session<'a> {
    cli: &'a GitCli,
    root: &'a Path,
    git: PathBuf,
    runtime: Runtime,
}

impl<'a> Session<'a> {
    fn open(cli: &'a GitCli, root: &'a Path) -> Result<Self> {
        let git = cli.git_binary()?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(Self { cli, root, git, runtime })
    }

    fn run(&self, args: &[&str]) -> Result<GitOutput> {
        self.runtime
            .block_on(run_git(&self.git, self.root, args, self.cli.timeout))
    }

    /// Run and require a zero exit status.
    fn run_ok(&self, args: &[&str]) -> Result<String> {
        let out = self.run(args)?;
        if out.success {
            Ok(out.stdout)
        } else {
            let reason = if out.stderr.is_empty() {
                "exited with a non-zero status".to_string()
            } else {
                out.stderr
            };
            Err(PlaybookError::git_failed(format!("git {}", args.join(" ")), reason))
        }
    }

    /// Run a lookup that may legitimately find nothing. A failure counts as
    /// "absent" only when git is silent or names one of `absent`; any other
    /// failure is an error.
    fn run_optional(&self, args: &[&str], absent: &[&str]) -> Result<Option<String>> {
        let out = self.run(args)?;
        if out.success {
            let text = out.stdout.trim().to_string();
            return Ok(if text.is_empty() { None } else { Some(text) });
        }
        if is_absence(&out.stderr, absent) {
            return Ok(None);
        }
        Err(PlaybookError::git_failed(format!("git {}", args.join(" ")), out.stderr))
    }

    fn verify(&self, spec: &str) -> Result<bool> {
        Ok(self
            .run_optional(&["rev-parse", "--verify", "--quiet", spec], &[])?
            .is_some())
    }

    fn ensure_work_tree(&self) -> Result<()> {
        let args = ["rev-parse", "--is-inside-work-tree"];
        let out = self.run(&args)?;
        if out.success && out.stdout.trim() == "true" {
            return Ok(());
        }
        if out.success || out.stderr.to_lowercase().contains("not a git repository") {
            return Err(PlaybookError::GitUnavailable(format!(
                "{} is not inside a git work tree",
                self.root.display()
            )));
        }
        Err(PlaybookError::git_failed(format!("git {}", args.join(" ")), out.stderr))
    }

    fn resolve_base(&self) -> Result<Option<String>> {
        if let Some(explicit) = &self.cli.base_override {
            let spec = format!("{explicit}^{{commit}}");
            if self.verify(&spec)? {
                return Ok(Some(explicit.clone()));
            }
            return Err(PlaybookError::git_failed(
                format!("git rev-parse --verify --quiet {spec}"),
                format!("base ref '{explicit}' does not exist"),
            ));
        }
        for name in &self.cli.base_candidates {
            for candidate in [format!("refs/heads/{name}"), format!("refs/remotes/origin/{name}")] {
                if self.verify(&candidate)? {
                    let short = candidate
                        .trim_start_matches("refs/heads/")
                        .trim_start_matches("refs/remotes/")
                        .to_string();
                    return Ok(Some(short));
                }
            }
        }
        Ok(None)
    }

    fn count(&self, range: &str) -> Result<u32> {
        let out = self.run_ok(&["rev-list", "--count", range])?;
        out.trim().parse::<u32>().map_err(|e| {
            PlaybookError::git_failed(format!("git rev-list --count {range}"), e.to_string())
        })
    }

    fn upstream(&self) -> Result<Option<Upstream>> {
        let Some(name) = self.run_optional(
            &["rev-parse", "--abbrev-ref", "--symbolic-full-name", "@{u}"],
            NO_UPSTREAM,
        )?
        else {
            return Ok(None);
        };
        let counts = self.run_ok(&["rev-list", "--left-right", "--count", "@{u}...HEAD"])?;
        let (behind, ahead) = parse_left_right(&counts).ok_or_else(|| {
            PlaybookError::git_failed(
                "git rev-list --left-right --count @{u}...HEAD",
                format!("unexpected output '{}'", counts.trim()),
            )
        })?;
        Ok(Some(Upstream { name, ahead, behind }))
    }

    fn snapshot(&self) -> Result<GitState> {
        self.ensure_work_tree()?;

        let branch = self.run_ok(&["branch", "--show-current"])?.trim().to_string();
        let branch = if branch.is_empty() {
            DETACHED.to_string()
        } else {
            branch
        };

        let status = self.run_ok(&["status", "--porcelain", "--untracked-files=all"])?;
        let changed_files = parse_porcelain(&status);

        if !self.verify("HEAD")? {
            tracing::debug!("repository has no commits yet");
            return Ok(GitState {
                branch,
                changed_files,
                ..GitState::default()
            });
        }

        let limit = format!("-{}", self.cli.log_limit.max(1));
        let log = self.run_ok(&["log", "--oneline", &limit])?;
        let recent_commits: Vec<String> = log
            .lines()
            .map(str::trim_end)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();

        let base_ref = self.resolve_base()?;
        let on_base = self.cli.base_candidates.iter().any(|b| *b == branch)
            || base_ref.as_deref() == Some(branch.as_str());

        let mut last_tag = None;
        let mut files_vs_base = Vec::new();
        let commit_count = if on_base {
            last_tag = self.run_optional(&["describe", "--tags", "--abbrev=0"], NO_TAG)?;
            match &last_tag {
                Some(tag) => self.count(&format!("{tag}..HEAD"))?,
                None => self.count("HEAD")?,
            }
        } else if let Some(base) = &base_ref {
            let diff = self.run_ok(&["diff", "--name-only", &format!("{base}...HEAD")])?;
            files_vs_base = diff
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect();
            self.count(&format!("{base}..HEAD"))?
        } else {
            tracing::debug!("no base ref found, using bounded log length as commit count");
            recent_commits.len() as u32
        };

        let upstream = if branch == DETACHED {
            None
        } else {
            self.upstream()?
        };

        let pr_ref = if branch == DETACHED {
            None
        } else {
            self.run_optional(&["config", "--get", &format!("branch.{branch}.merge")], &[])?
                .filter(|r| PR_REF_PREFIXES.iter().any(|p| r.starts_with(p)))
        };

        let state = GitState {
            branch,
            changed_files,
            commit_count,
            recent_commits,
            base_ref,
            last_tag,
            files_vs_base,
            upstream,
            pr_ref,
        };
        tracing::info!(
            branch = %state.branch,
            commits = state.commit_count,
            changed = state.changed_files.len(),
            "probed git state"
        );
        Ok(state)
    }
}

async fn run_git(git: &Path, root: &Path, args: &[&str], limit: Duration) -> Result<GitOutput> {
    let command = format!("git {}", args.join(" "));
    tracing::debug!(%command, "running");

    let mut child = Command::new(git)
        .args(args)
        .current_dir(root)
        .env("GIT_TERMINAL_PROMPT", "0")
        .env("LC_ALL", "C")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => PlaybookError::GitUnavailable(format!(
                "git binary {} could not be started",
                git.display()
            )),
            _ => PlaybookError::git_failed(&command, e.to_string()),
        })?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let finished = async {
        let (status, out, err) = tokio::join!(child.wait(), read_pipe(stdout), read_pipe(stderr));
        Ok::<_, std::io::Error>((status?, out?, err?))
    };
    let outcome = timeout(limit, finished).await;

    match outcome {
        Ok(Ok((status, stdout, stderr))) => Ok(GitOutput {
            success: status.success(),
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
        }),
        Ok(Err(e)) => Err(PlaybookError::git_failed(&command, e.to_string())),
        Err(_elapsed) => {
            let _ = child.kill().await;
            let _ = child.wait().await;
            tracing::warn!(%command, "git command timed out");
            Err(PlaybookError::git_failed(&command, format!("timed out after {limit:?}")))
        }
    }
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(mut p) = pipe {
        p.read_to_end(&mut buf).await?;
    }
    Ok(buf)
}

/// Whether a failed lookup's stderr means "nothing there".
fn is_absence(stderr: &str, markers: &[&str]) -> bool {
    let stderr = stderr.trim().to_ascii_lowercase();
    stderr.is_empty() || markers.iter().any(|m| stderr.contains(m))
}

// ---------------------------------------------------------------------------
// Parsers
// ---------------------------------------------------------------------------

/// Parse `git status --porcelain` (v1). A path with both index and
/// working-tree changes yields two entries.
pub fn parse_porcelain(output: &str) -> Vec<ChangedFile> {
    let mut files = Vec::new();
    for line in output.lines() {
        let line = line.trim_end();
        if line.len() < 4 {
            continue;
        }
        let mut codes = line.chars();
        let (Some(x), Some(y)) = (codes.next(), codes.next()) else {
            continue;
        };
        let raw_path = &line[3..];
        // Only renames and copies carry an `orig -> new` pair.
        let is_move = matches!(x, 'R' | 'C') || matches!(y, 'R' | 'C');
        let path = match raw_path.split_once(" -> ") {
            Some((_, to)) if is_move => to,
            _ => raw_path,
        };
        let path = unquote(path);

        if x == '?' && y == '?' {
            files.push(ChangedFile {
                path,
                status: ChangeStatus::Untracked,
                staged: false,
            });
            continue;
        }
        if x == '!' {
            continue;
        }
        if let Some(status) = ChangeStatus::from_code(x) {
            files.push(ChangedFile {
                path: path.clone(),
                status,
                staged: true,
            });
        }
        if let Some(status) = ChangeStatus::from_code(y) {
            files.push(ChangedFile {
                path,
                status,
                staged: false,
            });
        }
    }
    files
}

/// Undo git's C-style path quoting: `"caf\303\251.md"` -> `café.md`.
fn unquote(path: &str) -> String {
    let Some(inner) = path.strip_prefix('"').and_then(|p| p.strip_suffix('"')) else {
        return path.to_string();
    };
    let mut bytes = Vec::with_capacity(inner.len());
    let mut it = inner.bytes().peekable();
    while let Some(b) = it.next() {
        if b != b'\\' {
            bytes.push(b);
            continue;
        }
        match it.next() {
            Some(b'a') => bytes.push(0x07),
            Some(b'b') => bytes.push(0x08),
            Some(b'f') => bytes.push(0x0c),
            Some(b'n') => bytes.push(b'\n'),
            Some(b'r') => bytes.push(b'\r'),
            Some(b't') => bytes.push(b'\t'),
            Some(b'v') => bytes.push(0x0b),
            Some(d @ b'0'..=b'7') => {
                let mut value = u32::from(d - b'0');
                for _ in 0..2 {
                    match it.peek() {
                        Some(&n @ b'0'..=b'7') => {
                            value = value * 8 + u32::from(n - b'0');
                            it.next();
                        }
                        _ => break,
                    }
                }
                bytes.push((value & 0xff) as u8);
            }
            Some(other) => bytes.push(other),
            None => bytes.push(b'\\'),
        }
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Parse `rev-list --left-right --count A...B` into `(left, right)`.
pub fn parse_left_right(output: &str) -> Option<(u32, u32)> {
    let mut parts = output.split_whitespace();
    let left = parts.next()?.parse().ok()?;
    let right = parts.next()?.parse().ok()?;
    Some((left, right))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;
    use tempfile::TempDir;

    #[test]
    fn porcelain_staged_unstaged_untracked() {
        let out = "M  src/lib.rs\n M README.md\nMM both.rs\n?? new.txt\nA  added.rs\n D gone.rs\n";
        let files = parse_porcelain(out);
        assert_eq!(
            files,
            vec![
                ChangedFile { path: "src/lib.rs".into(), status: ChangeStatus::Modified, staged: true },
                ChangedFile { path: "README.md".into(), status: ChangeStatus::Modified, staged: false },
                ChangedFile { path: "both.rs".into(), status: ChangeStatus::Modified, staged: true },
                ChangedFile { path: "both.rs".into(), status: ChangeStatus::Modified, staged: false },
                ChangedFile { path: "new.txt".into(), status: ChangeStatus::Untracked, staged: false },
                ChangedFile { path: "added.rs".into(), status: ChangeStatus::Added, staged: true },
                ChangedFile { path: "gone.rs".into(), status: ChangeStatus::Deleted, staged: false },
            ]
        );
    }

    #[test]
    fn porcelain_rename_and_quoted() {
        let files = parse_porcelain("R  old.rs -> new.rs\n?? \"with space.md\"\n");
        assert_eq!(files[0].path, "new.rs");
        assert_eq!(files[0].status, ChangeStatus::Renamed);
        assert_eq!(files[1].path, "with space.md");
    }

    #[test]
    fn porcelain_decodes_octal_escapes() {
        let files = parse_porcelain("?? \"caf\\303\\251.md\"\n M \"tab\\there.txt\"\n");
        assert_eq!(files[0].path, "caf\u{e9}.md");
        assert_eq!(files[0].status, ChangeStatus::Untracked);
        assert_eq!(files[1].path, "tab\there.txt");
    }

    #[test]
    fn porcelain_arrow_only_splits_renames() {
        let files = parse_porcelain("?? notes -> todo.txt\n M a -> b.md\nC  src.rs -> copy.rs\n");
        assert_eq!(files[0].path, "notes -> todo.txt");
        assert_eq!(files[0].status, ChangeStatus::Untracked);
        assert_eq!(files[1].path, "a -> b.md");
        assert_eq!(files[2].path, "copy.rs");
    }

    #[test]
    fn porcelain_quoted_rename_target() {
        let files = parse_porcelain("R  old.rs -> \"n\\303\\251w.rs\"\n");
        assert_eq!(files[0].path, "n\u{e9}w.rs");
    }

    #[test]
    fn unquote_leaves_plain_paths_alone() {
        assert_eq!(unquote("src/main.rs"), "src/main.rs");
        assert_eq!(unquote("\"a\\\\b\\\"c\""), "a\\b\"c");
    }

    #[test]
    fn absence_requires_silence_or_known_message() {
        assert!(is_absence("", &[]));
        assert!(is_absence("fatal: No names found, cannot describe anything.", NO_TAG));
        assert!(is_absence("fatal: no upstream configured for branch 'x'", NO_UPSTREAM));
        assert!(!is_absence("fatal: bad object HEAD", NO_TAG));
        assert!(!is_absence("error: could not lock config file", &[]));
    }

    #[test]
    fn porcelain_empty() {
        assert!(parse_porcelain("").is_empty());
        assert!(parse_porcelain("\n\n").is_empty());
    }

    #[test]
    fn left_right_counts() {
        assert_eq!(parse_left_right("2\t5\n"), Some((2, 5)));
        assert_eq!(parse_left_right("garbage"), None);
    }

    #[test]
    fn state_helpers() {
        let state = GitState {
            branch: "feature/x".into(),
            changed_files: parse_porcelain("M  a.rs\n?? b.rs\n M a.rs\n"),
            ..GitState::default()
        };
        assert!(!state.is_clean());
        assert!(state.has_staged());
        assert!(state.has_unstaged());
        assert_eq!(state.changed_paths(), vec!["a.rs", "b.rs"]);
        assert!(!state.is_detached());
    }

    // -- real git ------------------------------------------------------------

    fn git_available() -> bool {
        which::which("git").is_ok()
    }

    fn git(dir: &Path, args: &[&str]) {
        let status = Command::new("git")
            .args(["-c", "user.name=Test", "-c", "user.email=test@example.com"])
            .args(["-c", "commit.gpgsign=false", "-c", "tag.gpgsign=false"])
            .args(args)
            .current_dir(dir)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .unwrap();
        assert!(status.success(), "git {args:?} failed");
    }

    fn commit(dir: &Path, file: &str, msg: &str) {
        std::fs::write(dir.join(file), msg).unwrap();
        git(dir, &["add", file]);
        git(dir, &["commit", "-q", "-m", msg]);
    }

    fn init_repo() -> TempDir {
        let dir = TempDir::new().unwrap();
        git(dir.path(), &["init", "-q"]);
        git(dir.path(), &["symbolic-ref", "HEAD", "refs/heads/main"]);
        dir
    }

    fn cli() -> GitCli {
        GitCli::new(&Config::default(), None)
    }

    #[test]
    fn probe_outside_repo_is_unavailable() {
        if !git_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        let err = cli().probe(dir.path()).unwrap_err();
        assert!(matches!(err, PlaybookError::GitUnavailable(_)), "{err}");
    }

    #[test]
    fn probe_empty_repo() {
        if !git_available() {
            return;
        }
        let dir = init_repo();
        let state = cli().probe(dir.path()).unwrap();
        assert_eq!(state.branch, "main");
        assert_eq!(state.commit_count, 0);
        assert!(state.is_clean());
    }

    #[test]
    fn probe_feature_branch_counts_against_main() {
        if !git_available() {
            return;
        }
        let dir = init_repo();
        commit(dir.path(), "README.md", "init");
        git(dir.path(), &["checkout", "-q", "-b", "feature/auth"]);
        commit(dir.path(), "auth.py", "add auth");
        commit(dir.path(), "test_auth.py", "add tests");
        std::fs::write(dir.path().join("auth.py"), "changed").unwrap();

        let state = cli().probe(dir.path()).unwrap();
        assert_eq!(state.branch, "feature/auth");
        assert_eq!(state.base_ref.as_deref(), Some("main"));
        assert_eq!(state.commit_count, 2);
        assert_eq!(state.files_vs_base, vec!["auth.py", "test_auth.py"]);
        assert_eq!(state.recent_commits.len(), 3);
        assert!(state.has_unstaged());
        assert!(state.upstream.is_none());
    }

    #[test]
    fn probe_main_counts_since_tag() {
        if !git_available() {
            return;
        }
        let dir = init_repo();
        commit(dir.path(), "a.txt", "one");
        git(dir.path(), &["tag", "v0.1.0"]);
        commit(dir.path(), "b.txt", "two");
        commit(dir.path(), "c.txt", "three");

        let state = cli().probe(dir.path()).unwrap();
        assert_eq!(state.last_tag.as_deref(), Some("v0.1.0"));
        assert_eq!(state.commit_count, 2);
        assert!(state.is_clean());
    }

    #[test]
    fn probe_main_without_tag_counts_all_commits() {
        if !git_available() {
            return;
        }
        let dir = init_repo();
        commit(dir.path(), "a.txt", "one");
        commit(dir.path(), "b.txt", "two");

        let state = cli().probe(dir.path()).unwrap();
        assert_eq!(state.last_tag, None);
        assert_eq!(state.commit_count, 2);
        assert_eq!(state.upstream, None);
        assert_eq!(state.pr_ref, None);
    }

    #[test]
    fn probe_unknown_base_override_fails() {
        if !git_available() {
            return;
        }
        let dir = init_repo();
        commit(dir.path(), "a.txt", "one");
        let err = GitCli::new(&Config::default(), Some("develop".into()))
            .probe(dir.path())
            .unwrap_err();
        assert!(matches!(err, PlaybookError::GitCommandFailed { .. }));
        assert!(err.to_string().contains("develop"));
    }

    #[test]
    fn missing_binary_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let err = cli()
            .with_binary(dir.path().join("no-such-git"))
            .probe(dir.path())
            .unwrap_err();
        assert!(matches!(err, PlaybookError::GitUnavailable(_)));
    }

    #[test]
    fn missing_root_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let err = cli()
            .with_binary(dir.path().join("no-such-git"))
            .probe(&dir.path().join("gone"))
            .unwrap_err();
        match err {
            PlaybookError::GitUnavailable(msg) => assert!(msg.contains("does not exist"), "{msg}"),
            other => panic!("expected GitUnavailable, got {other}"),
        }
    }

    #[test]
    fn file_root_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("plain.txt");
        std::fs::write(&file, "x").unwrap();
        let err = cli().probe(&file).unwrap_err();
        assert!(matches!(err, PlaybookError::GitUnavailable(_)), "{err}");
    }

    // -- fake git ------------------------------------------------------------

    #[cfg(unix)]
    fn fake_git(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("git");
        std::fs::write(&path, format!("#!/bin/sh\n{body}")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[test]
    fn hanging_git_times_out() {
        let dir = TempDir::new().unwrap();
        let fake = fake_git(dir.path(), "exec sleep 10\n");

        let started = std::time::Instant::now();
        let err = cli()
            .with_binary(&fake)
            .with_timeout(Duration::from_millis(300))
            .probe(dir.path())
            .unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(5));
        match err {
            PlaybookError::GitCommandFailed { command, reason } => {
                assert_eq!(command, "git rev-parse --is-inside-work-tree");
                assert!(reason.contains("timed out"), "{reason}");
            }
            other => panic!("expected GitCommandFailed, got {other}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn broken_describe_is_an_error_not_a_missing_tag() {
        let dir = TempDir::new().unwrap();
        let fake = fake_git(
            dir.path(),
            r#"case "$1" in
  rev-parse)
    case "$2" in
      --is-inside-work-tree) echo true ;;
      *) echo 1111111111111111111111111111111111111111 ;;
    esac ;;
  branch) echo main ;;
  status) ;;
  log) echo "1111111 init" ;;
  describe) echo "fatal: unable to read tree 2222222" >&2; exit 128 ;;
  *) exit 1 ;;
esac
"#,
        );

        let err = cli().with_binary(&fake).probe(dir.path()).unwrap_err();
        match err {
            PlaybookError::GitCommandFailed { command, reason } => {
                assert_eq!(command, "git describe --tags --abbrev=0");
                assert!(reason.contains("unable to read tree"), "{reason}");
            }
            other => panic!("expected GitCommandFailed, got {other}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn broken_upstream_lookup_is_an_error() {
        let dir = TempDir::new().unwrap();
        let fake = fake_git(
            dir.path(),
            r#"case "$1 $2" in
  "rev-parse --is-inside-work-tree") echo true ;;
  "rev-parse --verify") echo 1111111111111111111111111111111111111111 ;;
  "rev-parse --abbrev-ref") echo "fatal: bad revision '@{u}'" >&2; exit 128 ;;
  "branch --show-current") echo feature/x ;;
  "log --oneline") echo "1111111 init" ;;
  "diff --name-only") echo src/lib.rs ;;
  "rev-list --count") echo 1 ;;
  *) ;;
esac
"#,
        );

        let err = cli().with_binary(&fake).probe(dir.path()).unwrap_err();
        match err {
            PlaybookError::GitCommandFailed { command, reason } => {
                assert_eq!(command, "git rev-parse --abbrev-ref --symbolic-full-name @{u}");
                assert!(reason.contains("bad revision"), "{reason}");
            }
            other => panic!("expected GitCommandFailed, got {other}"),
        }
    }
}
