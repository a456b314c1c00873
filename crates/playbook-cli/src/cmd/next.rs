use crate::cmd::metadata_path;
use crate::output::print_json;
use anyhow::Context;
use playbook_core::{analyze::analyze, catalog, config::Config, git::GitCli, render};
use std::path::Path;

pub struct NextArgs<'a> {
    pub metadata: Option<&'a Path>,
    pub config_path: Option<&'a Path>,
    pub base_ref: Option<String>,
    pub limit: Option<u32>,
    pub verbose: bool,
}

pub fn run(root: &Path, args: &NextArgs, json: bool) -> anyhow::Result<()> {
    let mut config = Config::load(root, args.config_path).context("failed to load config")?;
    if let Some(limit) = args.limit {
        config.thresholds.max_recommendations = limit as usize;
    }

    // The catalog is loaded before git is touched so a missing file fails fast.
    let path = metadata_path(root, args.metadata);
    let loaded = catalog::load(&path)
        .with_context(|| format!("failed to load command catalog {}", path.display()))?;

    let probe = GitCli::new(&config, args.base_ref.clone());
    let report =
        analyze(&probe, root, &loaded, &config).context("failed to read git state")?;

    if json {
        print_json(&report)?;
    } else {
        println!("{}", render::markdown(&report, &config, args.verbose));
    }
    Ok(())
}
