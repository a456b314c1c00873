use crate::types::FileCategory;
use serde::Serialize;
use std::collections::BTreeMap;

const TEST_DIRS: &[&str] = &["test", "tests", "spec", "specs", "__tests__", "testdata", "e2e"];
const DOC_DIRS: &[&str] = &["docs", "doc"];
const DOC_EXTS: &[&str] = &["md", "mdx", "rst", "adoc"];
const CI_PREFIXES: &[&str] = &[".github/workflows/", ".circleci/", ".buildkite/"];
const CI_FILES: &[&str] = &[".gitlab-ci.yml", "Jenkinsfile", "azure-pipelines.yml"];
const SOURCE_EXTS: &[&str] = &[
    "py", "ts", "tsx", "js", "jsx", "go", "rs", "java", "kt", "rb", "c", "cc", "cpp", "h",
    "hpp", "cs", "swift", "php", "scala",
];
const CONFIG_FILES: &[&str] = &[
    "Dockerfile",
    "Makefile",
    "docker-compose.yml",
    "docker-compose.yaml",
    "package.json",
    "pyproject.toml",
    "go.mod",
    "Cargo.toml",
    "requirements.txt",
];
const CONFIG_EXTS: &[&str] = &["toml", "yaml", "yml", "ini", "cfg", "json"];

/// Categorize one repository-relative path (`/`-separated, as git prints it).
///
/// Checks run in order tests, docs, ci, source, config; the first hit wins.
pub fn categorize(path: &str) -> Option<FileCategory> {
    let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
    let file_name = parts.last().copied()?;
    let dirs = &parts[..parts.len() - 1];
    let (stem, ext) = match file_name.rsplit_once('.') {
        Some((s, e)) if !s.is_empty() => (s, e.to_ascii_lowercase()),
        _ => (file_name, String::new()),
    };

    if is_test(dirs, stem) {
        return Some(FileCategory::Tests);
    }
    if dirs.iter().any(|d| DOC_DIRS.contains(d)) || DOC_EXTS.contains(&ext.as_str()) {
        return Some(FileCategory::Docs);
    }
    if CI_PREFIXES.iter().any(|p| path.starts_with(p)) || CI_FILES.contains(&file_name) {
        return Some(FileCategory::Ci);
    }
    if SOURCE_EXTS.contains(&ext.as_str()) {
        return Some(FileCategory::Source);
    }
    if CONFIG_FILES.contains(&file_name) || CONFIG_EXTS.contains(&ext.as_str()) {
        return Some(FileCategory::Config);
    }
    None
}

fn is_test(dirs: &[&str], stem: &str) -> bool {
    let stem = stem.to_ascii_lowercase();
    dirs.iter().any(|d| TEST_DIRS.contains(&d.to_ascii_lowercase().as_str()))
        || stem.starts_with("test_")
        || stem.ends_with("_test")
        || stem.ends_with("_spec")
        || stem.ends_with(".test")
        || stem.ends_with(".spec")
}

// ---------------------------------------------------------------------------
// ChangeSummary
// ---------------------------------------------------------------------------

/// Changed paths grouped by category. Categories and paths are kept sorted
/// so rendering is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChangeSummary {
    pub categories: BTreeMap<FileCategory, Vec<String>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub uncategorized: Vec<String>,
}

impl ChangeSummary {
    pub fn from_paths<'a>(paths: impl IntoIterator<Item = &'a str>) -> Self {
        let mut summary = ChangeSummary::default();
        for path in paths {
            match categorize(path) {
                Some(cat) => summary
                    .categories
                    .entry(cat)
                    .or_default()
                    .push(path.to_string()),
                None => summary.uncategorized.push(path.to_string()),
            }
        }
        for paths in summary.categories.values_mut() {
            paths.sort();
            paths.dedup();
        }
        summary.uncategorized.sort();
        summary.uncategorized.dedup();
        summary
    }

    pub fn has(&self, category: FileCategory) -> bool {
        self.categories.get(&category).is_some_and(|v| !v.is_empty())
    }

    pub fn paths(&self, category: FileCategory) -> &[String] {
        self.categories
            .get(&category)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn present(&self) -> impl Iterator<Item = FileCategory> + '_ {
        self.categories
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(c, _)| *c)
    }

    pub fn total(&self) -> usize {
        self.categories.values().map(Vec::len).sum::<usize>() + self.uncategorized.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// `"source: 1, tests: 1"`
    pub fn describe(&self) -> String {
        let mut parts: Vec<String> = self
            .categories
            .iter()
            .map(|(c, v)| format!("{c}: {}", v.len()))
            .collect();
        if !self.uncategorized.is_empty() {
            parts.push(format!("other: {}", self.uncategorized.len()));
        }
        parts.join(", ")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_files() {
        for p in ["src/main.py", "lib/utils.ts", "app.js", "crates/core/src/lib.rs"] {
            assert_eq!(categorize(p), Some(FileCategory::Source), "{p}");
        }
    }

    #[test]
    fn test_files() {
        for p in [
            "tests/test_main.py",
            "spec/utils.spec.ts",
            "src/auth_test.go",
            "web/__tests__/App.tsx",
            "pkg/login.test.js",
        ] {
            assert_eq!(categorize(p), Some(FileCategory::Tests), "{p}");
        }
    }

    #[test]
    fn substring_test_is_not_a_test() {
        assert_eq!(categorize("src/latest.rs"), Some(FileCategory::Source));
        assert_eq!(categorize("src/contest/mod.rs"), Some(FileCategory::Source));
    }

    #[test]
    fn doc_files() {
        assert_eq!(categorize("docs/guide.md"), Some(FileCategory::Docs));
        assert_eq!(categorize("README.md"), Some(FileCategory::Docs));
        assert_eq!(categorize("docs/diagram.png"), Some(FileCategory::Docs));
    }

    #[test]
    fn ci_files() {
        assert_eq!(categorize(".github/workflows/test.yml"), Some(FileCategory::Ci));
        assert_eq!(categorize(".gitlab-ci.yml"), Some(FileCategory::Ci));
    }

    #[test]
    fn config_files() {
        for p in ["Dockerfile", "package.json", "pyproject.toml", "deploy/values.yaml"] {
            assert_eq!(categorize(p), Some(FileCategory::Config), "{p}");
        }
    }

    #[test]
    fn unknown_files() {
        assert_eq!(categorize("assets/logo.png"), None);
        assert_eq!(categorize(""), None);
    }

    #[test]
    fn summary_groups_and_sorts() {
        let s = ChangeSummary::from_paths([
            "tests/test_b.py",
            "src/main.py",
            "tests/test_a.py",
            "logo.png",
            "src/main.py",
        ]);
        assert_eq!(s.paths(FileCategory::Tests), ["tests/test_a.py", "tests/test_b.py"]);
        assert_eq!(s.paths(FileCategory::Source), ["src/main.py"]);
        assert_eq!(s.uncategorized, ["logo.png"]);
        assert_eq!(s.total(), 4);
        assert!(s.has(FileCategory::Tests));
        assert!(!s.has(FileCategory::Docs));
        assert_eq!(
            s.present().collect::<Vec<_>>(),
            vec![FileCategory::Tests, FileCategory::Source]
        );
        assert_eq!(s.describe(), "tests: 2, source: 1, other: 1");
    }

    #[test]
    fn empty_summary() {
        let s = ChangeSummary::from_paths(std::iter::empty());
        assert!(s.is_empty());
        assert_eq!(s.describe(), "");
    }
}
