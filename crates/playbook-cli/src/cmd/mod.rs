pub mod catalog;
pub mod config;
pub mod next;

use playbook_core::catalog::METADATA_FILE;
use std::path::{Path, PathBuf};

/// The catalog path: `--metadata` when given, else `<root>/.playbook-metadata.json`.
pub fn metadata_path(root: &Path, explicit: Option<&Path>) -> PathBuf {
    match explicit {
        Some(p) => p.to_path_buf(),
        None => root.join(METADATA_FILE),
    }
}
