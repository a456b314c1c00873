mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::config::ConfigSubcommand;
use playbook_core::PlaybookError;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "playbook-next",
    about = "Recommend the next playbook command from the current git state",
    version,
    propagate_version = true
)]
struct Cli {
    /// Repository root (default: auto-detect from .git)
    #[arg(long, global = true, env = "PLAYBOOK_ROOT")]
    root: Option<PathBuf>,

    /// Command catalog (default: <root>/.playbook-metadata.json)
    #[arg(long, global = true, env = "PLAYBOOK_METADATA")]
    metadata: Option<PathBuf>,

    /// Config file (default: <root>/.playbook-next.yaml)
    #[arg(long = "config", global = true, value_name = "PATH")]
    config_path: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Show the git state and scoring trace, and log at info level
    #[arg(long, global = true, short = 'v')]
    verbose: bool,

    /// Ref to measure the branch against (default: main, then master)
    #[arg(long, value_name = "REF")]
    base_ref: Option<String>,

    /// Maximum number of recommendations
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    limit: Option<u32>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show or validate the effective configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },

    /// List the commands in the metadata catalog
    Catalog {
        /// Only list commands in this category
        #[arg(long)]
        category: Option<String>,
    },
}

/// Exit code for the first playbook error in the chain; 3 for anything else.
fn exit_code(e: &anyhow::Error) -> i32 {
    e.chain()
        .find_map(|cause| cause.downcast_ref::<PlaybookError>())
        .map(PlaybookError::exit_code)
        .unwrap_or(3)
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());
    let config_path = cli.config_path.as_deref();
    let metadata = cli.metadata.as_deref();

    let result = match cli.command {
        None => cmd::next::run(
            &root,
            &cmd::next::NextArgs {
                metadata,
                config_path,
                base_ref: cli.base_ref,
                limit: cli.limit,
                verbose: cli.verbose,
            },
            cli.json,
        ),
        Some(Commands::Config { subcommand }) => {
            cmd::config::run(&root, config_path, subcommand, cli.json)
        }
        Some(Commands::Catalog { category }) => {
            cmd::catalog::run(&root, metadata, category.as_deref(), cli.json)
        }
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(exit_code(&e));
    }
}
