use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use tracing::{error, info};

use survey_pipeline::config::PipelineConfig;
use survey_pipeline::logging;
use survey_pipeline::pipeline::{Pipeline, PipelineOutcome, StageReport};
use survey_pipeline::progress::ProgressUpdate;
use survey_pipeline::scoring;

#[derive(Parser)]
#[command(name = "survey_pipeline")]
#[command(about = "Cleans downloaded survey report workbooks into demographic probability tables")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, global = true, default_value = "survey_pipeline.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run all twelve cleaning stages over the selected files
    Transform {
        /// Directory the file paths are relative to
        #[arg(long)]
        base_dir: Option<PathBuf>,
        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
        /// Report paths relative to the base directory
        #[arg(required = true)]
        files: Vec<String>,
    },
    /// Print the transformability score of report workbooks
    Score {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Run a single stage by name
    Stage {
        /// Stage name, e.g. remove_sheets or transpose
        name: String,
        #[arg(long)]
        base_dir: Option<PathBuf>,
        #[arg(required = true)]
        files: Vec<String>,
    },
}

fn load_config(path: &Path, base_dir: Option<PathBuf>) -> anyhow::Result<PipelineConfig> {
    let mut config = PipelineConfig::load(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?
        .with_env_overrides();
    if let Some(dir) = base_dir {
        config.base_dir = dir;
    }
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn run_transform(config: PipelineConfig, files: Vec<String>, json: bool) -> anyhow::Result<()> {
    println!("🚀 Running transformation pipeline on {} files...", files.len());

    let (tx, rx) = mpsc::channel::<ProgressUpdate>();
    let worker = thread::spawn(move || {
        let pipeline = Pipeline::new(config);
        pipeline.run(&files, &tx)
    });

    // The channel closes once the worker drops its sender
    for update in rx {
        println!("[{:>3}%] {}", update.percent, update.status);
    }

    let outcome = match worker.join() {
        Ok(result) => result.context("Pipeline run failed")?,
        Err(_) => bail!("Pipeline worker thread panicked"),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_outcome(&outcome);
    }
    Ok(())
}

fn print_report(report: &StageReport) {
    println!(
        "   {}: {} selected, {} processed, {} skipped, {} excluded, {} errors",
        report.stage,
        report.input_count,
        report.processed.len(),
        report.skipped.len(),
        report.excluded.len(),
        report.errors.len()
    );
    for failure in &report.errors {
        println!("      ❌ {}: {}", failure.path, failure.message);
    }
}

fn print_outcome(outcome: &PipelineOutcome) {
    println!("\n📊 Run {}", outcome.run_id);
    for report in &outcome.reports {
        print_report(report);
    }
    if let Some(stage) = &outcome.halted_at {
        println!("⚠️  Stopped after '{}': no files left to process", stage);
    }
    for (path, table) in &outcome.tables {
        println!(
            "✅ {} ({} options, {} rows)",
            path,
            table.options.len(),
            table.rows.len()
        );
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (base_dir, command_needs_dirs) = match &cli.command {
        Commands::Transform { base_dir, .. } | Commands::Stage { base_dir, .. } => {
            (base_dir.clone(), true)
        }
        Commands::Score { .. } => (None, false),
    };
    let config = load_config(&cli.config, base_dir)?;
    let _guard = logging::init_logging(&config.log_dir);
    if command_needs_dirs {
        info!(base_dir = %config.base_dir.display(), "Configuration loaded");
    }

    match cli.command {
        Commands::Transform { files, json, .. } => run_transform(config, files, json)?,
        Commands::Score { files } => {
            let selection = scoring::score_selection(&files);
            for (path, value) in &selection.files {
                println!("   {} → {:.1}%", path.display(), value * 100.0);
            }
            println!("📈 Transformability: {}", selection);
        }
        Commands::Stage { name, files, .. } => {
            let pipeline = Pipeline::new(config);
            match pipeline.run_stage(&name, &files) {
                Ok(report) => {
                    print_report(&report);
                    for path in &report.output {
                        println!("   → {}", path);
                    }
                }
                Err(e) => {
                    error!("Stage '{}' failed: {}", name, e);
                    return Err(e).context(format!("Stage '{}' failed", name));
                }
            }
        }
    }
    Ok(())
}
