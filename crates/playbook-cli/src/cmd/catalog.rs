use crate::cmd::metadata_path;
use crate::output::{print_json, print_table};
use anyhow::Context;
use playbook_core::catalog::{self, CommandDescriptor};
use std::path::Path;

pub fn run(
    root: &Path,
    metadata: Option<&Path>,
    category: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let path = metadata_path(root, metadata);
    let loaded = catalog::load(&path)
        .with_context(|| format!("failed to load command catalog {}", path.display()))?;

    let commands: Vec<&CommandDescriptor> = loaded
        .catalog
        .iter()
        .filter(|c| category.map_or(true, |want| c.category.eq_ignore_ascii_case(want)))
        .collect();

    if json {
        let value = serde_json::json!({
            "commands": commands,
            "warnings": loaded.warnings,
        });
        return print_json(&value);
    }

    if commands.is_empty() {
        match category {
            Some(c) => println!("No commands in category '{c}'."),
            None => println!("The catalog is empty."),
        }
        return Ok(());
    }

    let rows: Vec<Vec<String>> = commands
        .iter()
        .map(|c| {
            vec![
                c.name.clone(),
                c.category.clone(),
                c.tier.map(|t| t.to_string()).unwrap_or_else(|| "-".to_string()),
                c.time_estimate.clone(),
                c.title.clone(),
            ]
        })
        .collect();
    print_table(&["NAME", "CATEGORY", "TIER", "TIME", "TITLE"], &rows);

    if !loaded.warnings.is_empty() {
        println!();
        println!("{} metadata warning(s); run with --verbose or --json for details.", loaded.warnings.len());
    }
    Ok(())
}
