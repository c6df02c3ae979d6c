//! evsync CLI

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use evs_sync::{DEFAULT_BAD_THRESHOLD, SideInput, SyncConfig, SyncOptions, SyncSession};
use evs_viz::SyncPlotsArtifact;

#[derive(Parser)]
#[command(name = "evsync")]
#[command(about = "evsync - event synchronization and branch diffing between two event datasets")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Synchronize two datasets and diff the configured branches
    Sync {
        /// Sync config (id branches + comparison entries)
        #[arg(long)]
        config: PathBuf,

        /// Channel name
        #[arg(long)]
        channel: String,

        /// Sample name
        #[arg(long)]
        sample: String,

        /// Group label per dataset (exactly two)
        #[arg(long = "group", num_args = 1.., required = true)]
        groups: Vec<String>,

        /// Input file per dataset (`.root` or `.json`)
        #[arg(long = "file", num_args = 1.., required = true)]
        files: Vec<PathBuf>,

        /// Tree name per dataset
        #[arg(long = "tree", num_args = 1.., required = true)]
        trees: Vec<String>,

        /// Pre-selection per dataset (at most two; missing ones keep every row)
        #[arg(long = "pre-selection", num_args = 1..)]
        pre_selections: Vec<String>,

        /// Relative difference above which floating point values are reported
        #[arg(long, default_value_t = DEFAULT_BAD_THRESHOLD)]
        bad_threshold: f64,

        /// Output directory for the plots artifact
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },

    /// Same comparison with a "mine" vs "other group" argument layout
    PrintSyncPlots {
        /// Sync config (id branches + comparison entries)
        #[arg(long)]
        config: PathBuf,

        /// Channel name
        #[arg(long)]
        channel: String,

        /// Sample name
        #[arg(long)]
        sample: String,

        /// Own group label
        #[arg(long)]
        my_group: String,

        /// Own input file
        #[arg(long)]
        my_file: PathBuf,

        /// Own tree name
        #[arg(long)]
        my_tree: String,

        /// Own pre-selection
        #[arg(long, default_value = "")]
        my_pre_selection: String,

        /// Other group label
        #[arg(long)]
        group: String,

        /// Other group's input file
        #[arg(long)]
        group_file: PathBuf,

        /// Other group's tree name
        #[arg(long)]
        group_tree: String,

        /// Other group's pre-selection
        #[arg(long, default_value = "")]
        group_pre_selection: String,

        /// Relative difference above which floating point values are reported
        #[arg(long, default_value_t = DEFAULT_BAD_THRESHOLD)]
        bad_threshold: f64,

        /// Output directory for the plots artifact
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match dispatch(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("ERROR: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn dispatch(command: Commands) -> Result<()> {
    match command {
        Commands::Sync {
            config,
            channel,
            sample,
            groups,
            files,
            trees,
            pre_selections,
            bad_threshold,
            output,
        } => {
            let inputs = SideInput::from_lists(&groups, &files, &trees, &pre_selections)?;
            let options = SyncOptions { channel, sample, bad_threshold };
            cmd_sync(&config, options, inputs, &output)
        }
        Commands::PrintSyncPlots {
            config,
            channel,
            sample,
            my_group,
            my_file,
            my_tree,
            my_pre_selection,
            group,
            group_file,
            group_tree,
            group_pre_selection,
            bad_threshold,
            output,
        } => {
            let inputs = [
                SideInput {
                    group: my_group,
                    file: my_file,
                    tree: my_tree,
                    pre_selection: my_pre_selection,
                },
                SideInput {
                    group,
                    file: group_file,
                    tree: group_tree,
                    pre_selection: group_pre_selection,
                },
            ];
            let options = SyncOptions { channel, sample, bad_threshold };
            cmd_sync(&config, options, inputs, &output)
        }
    }
}

fn cmd_sync(
    config_path: &Path,
    options: SyncOptions,
    inputs: [SideInput; 2],
    output_dir: &Path,
) -> Result<()> {
    if !(options.bad_threshold.is_finite() && options.bad_threshold >= 0.0) {
        anyhow::bail!("bad threshold must be a non-negative number, got {}", options.bad_threshold);
    }
    let config = SyncConfig::from_file(config_path)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let session = SyncSession::open(config, options, inputs, &mut out)?;
    let report = session.run(&mut out, &mut std::io::stderr())?;
    out.flush()?;

    let artifact = SyncPlotsArtifact::from_report(&report)?;
    let path = output_dir.join(artifact.file_name());
    write_json(&path, &artifact)?;
    tracing::info!(
        path = %path.display(),
        pages = artifact.pages.len(),
        skipped = artifact.skipped.len(),
        "wrote sync plots"
    );
    Ok(())
}

fn write_json(path: &Path, value: &impl serde::Serialize) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    std::fs::write(path, serde_json::to_string_pretty(value)?)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
