//! Binary entry point for octopus.
//!
//! Builds a pipeline from a configuration file and translates, trains,
//! records samples, or inspects components from the command line.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::multiple_crate_versions)]

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use octopus::config::checkpoint_path;
use octopus::observability;
use octopus::{
    ComponentKind, MemorySample, Mode, Pipeline, PipelineConfig, PipelineFactory, Registry,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Octopus - configuration-driven translation pipeline.
#[derive(Parser)]
#[command(name = "octopus")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the pipeline configuration file.
    #[arg(short, long, global = true, env = "OCTOPUS_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Translate one text.
    Translate {
        /// Text to translate.
        #[arg(short, long)]
        text: String,

        /// Surrounding context.
        #[arg(long, default_value = "")]
        context: String,

        /// Checkpoint to load before translating.
        ///
        /// Defaults to `models/<config-stem>.ckpt` when that file exists.
        #[arg(long)]
        checkpoint: Option<PathBuf>,

        /// Run subnets concurrently.
        #[arg(long)]
        concurrent: bool,
    },

    /// Feed a training data file into every subnet's memory and save a checkpoint.
    Train {
        /// JSON array of `{"src", "tgt", "context"?}` objects.
        #[arg(short, long)]
        data: PathBuf,

        /// Where to write the checkpoint. Default: `models/<config-stem>.ckpt`.
        #[arg(long)]
        checkpoint: Option<PathBuf>,
    },

    /// Append samples to every subnet's memory log.
    Remember {
        /// JSON array of `{"src", "tgt", "context"?}` objects.
        #[arg(short, long, conflicts_with = "file")]
        samples: Option<String>,

        /// File holding the JSON array.
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Show the most recent samples of one subnet.
    Recall {
        /// Subnet index in pipeline order.
        #[arg(short, long, default_value = "0")]
        unit: usize,

        /// Number of samples.
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,
    },

    /// List registered components.
    Components {
        /// Only list one kind: adapter, subnet, or coordinator.
        #[arg(short, long)]
        kind: Option<String>,
    },

    /// Validate the configuration and assemble the pipeline.
    Check,
}

/// Main entry point.
#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if let Err(e) = observability::init_from_env(cli.verbose) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    match run_command(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        },
    }
}

/// Runs the selected command.
async fn run_command(cli: Cli) -> Result<()> {
    let registry = Registry::global();

    match cli.command {
        Commands::Translate {
            text,
            context,
            checkpoint,
            concurrent,
        } => {
            let (config_path, config) = load_config(cli.config.as_deref())?;
            let checkpoint = checkpoint.or_else(|| {
                Some(checkpoint_path(&config_path)).filter(|path| path.exists())
            });
            cmd_translate(registry, &config, &text, &context, checkpoint, concurrent).await
        },
        Commands::Train { data, checkpoint } => {
            let (config_path, config) = load_config(cli.config.as_deref())?;
            let checkpoint = checkpoint.unwrap_or_else(|| checkpoint_path(&config_path));
            cmd_train(registry, &config, &data, &checkpoint)
        },
        Commands::Remember { samples, file } => {
            let (_, config) = load_config(cli.config.as_deref())?;
            cmd_remember(registry, &config, samples, file)
        },
        Commands::Recall { unit, limit } => {
            let (_, config) = load_config(cli.config.as_deref())?;
            cmd_recall(registry, &config, unit, limit)
        },
        Commands::Components { kind } => cmd_components(registry, kind),
        Commands::Check => {
            let (_, config) = load_config(cli.config.as_deref())?;
            cmd_check(registry, &config)
        },
    }
}

/// Loads configuration from `path` or the default locations, returning the
/// file it came from.
fn load_config(path: Option<&Path>) -> Result<(PathBuf, PipelineConfig)> {
    if let Some(path) = path {
        let config = PipelineConfig::load_from_file(path)
            .with_context(|| format!("loading {}", path.display()))?;
        return Ok((path.to_path_buf(), config));
    }
    match PipelineConfig::load_default()? {
        Some(found) => Ok(found),
        None => bail!(
            "no configuration found; pass --config or create one of: {}",
            PipelineConfig::default_paths()
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

fn build(registry: &Registry, config: &PipelineConfig) -> Result<Pipeline> {
    PipelineFactory::new(registry)
        .build(config)
        .context("assembling pipeline")
}

async fn cmd_translate(
    registry: &Registry,
    config: &PipelineConfig,
    text: &str,
    context: &str,
    checkpoint: Option<PathBuf>,
    concurrent: bool,
) -> Result<()> {
    let mut pipeline = build(registry, config)?;
    if let Some(path) = checkpoint {
        pipeline
            .load(&path)
            .with_context(|| format!("loading checkpoint {}", path.display()))?;
    }
    pipeline.set_mode(Mode::Inference);

    let output = if concurrent {
        pipeline.translate_concurrent(text, context).await?
    } else {
        pipeline.translate(text, context)?
    };
    println!("{output}");
    Ok(())
}

fn cmd_train(
    registry: &Registry,
    config: &PipelineConfig,
    data: &Path,
    checkpoint: &Path,
) -> Result<()> {
    let samples = read_samples(data)?;

    let mut pipeline = build(registry, config)?;
    pipeline.set_mode(Mode::Training);
    pipeline.update_memory(&samples)?;
    pipeline
        .save(checkpoint)
        .with_context(|| format!("saving checkpoint {}", checkpoint.display()))?;
    println!(
        "Trained on {} sample(s); checkpoint saved to {}",
        samples.len(),
        checkpoint.display()
    );
    Ok(())
}

/// Reads a JSON array of samples from a file.
fn read_samples(path: &Path) -> Result<Vec<MemorySample>> {
    let json =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&json).context("parsing samples as a JSON array")
}

fn cmd_remember(
    registry: &Registry,
    config: &PipelineConfig,
    samples: Option<String>,
    file: Option<PathBuf>,
) -> Result<()> {
    let samples: Vec<MemorySample> = match (samples, file) {
        (Some(inline), _) => {
            serde_json::from_str(&inline).context("parsing samples as a JSON array")?
        },
        (None, Some(path)) => read_samples(&path)?,
        (None, None) => bail!("pass --samples or --file"),
    };

    let pipeline = build(registry, config)?;
    pipeline.update_memory(&samples)?;
    println!(
        "Recorded {} sample(s) in {} subnet(s)",
        samples.len(),
        pipeline.subnet_count()
    );
    Ok(())
}

fn cmd_recall(
    registry: &Registry,
    config: &PipelineConfig,
    unit: usize,
    limit: usize,
) -> Result<()> {
    let pipeline = build(registry, config)?;
    for sample in pipeline.recent_memory(unit, limit)? {
        println!("{}", serde_json::to_string(&sample)?);
    }
    Ok(())
}

fn cmd_components(registry: &Registry, kind: Option<String>) -> Result<()> {
    let kinds = match kind.as_deref() {
        Some(name) => match ComponentKind::parse(name) {
            Some(kind) => vec![kind],
            None => bail!("unknown component kind '{name}'"),
        },
        None => ComponentKind::all().to_vec(),
    };
    for kind in kinds {
        println!("{kind}:");
        for name in registry.available(kind) {
            println!("  {name}");
        }
    }
    Ok(())
}

fn cmd_check(registry: &Registry, config: &PipelineConfig) -> Result<()> {
    let pipeline = build(registry, config)?;
    println!("domain:      {}", pipeline.domain());
    println!(
        "adapters:    {} -> {}",
        config.adapters.source, config.adapters.target
    );
    for (index, (name, path)) in pipeline
        .subnet_names()
        .into_iter()
        .zip(pipeline.memory_paths())
        .enumerate()
    {
        let location = path.map_or_else(|| "in memory".to_string(), |p| p.display().to_string());
        println!("subnet[{index}]:   {name} ({location})");
    }
    println!("coordinator: {}", pipeline.fuser().name());
    Ok(())
}
