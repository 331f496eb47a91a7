//! Captioner - resumable caption, burn and trim pipeline
//!
//! Entry point: parses arguments, sets up logging, loads configuration and dispatches to
//! the batch driver or the record administration commands.

use anyhow::{Context, Result};
use clap::Parser;
use std::time::Duration;
use tracing::{info, Level};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use captioner::batch::BatchDriver;
use captioner::cli::{Args, BatchArgs, ClipsAction, Commands, ConfigAction};
use captioner::config::Config;
use captioner::fingerprint::fingerprint_file;
use captioner::pipeline::{Pipeline, PipelineOptions};
use captioner::prompt::TerminalPrompt;
use captioner::report::{clip_table, records_table};
use captioner::stage::{ScriptStageRunner, TimeWindow};
use captioner::store::{ClipStore, SqliteClipStore};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_logging(args.verbose)?;

    let config = Config::load(args.config.as_deref())?;

    match args.command {
        Commands::Batch(batch) => run_batch(config, batch, args.verbose).await?,
        Commands::Clips { action } => {
            let store = SqliteClipStore::open(&config.database.path)?;
            match action {
                ClipsAction::List { all, json } => {
                    let records = store.list(all)?;
                    if json {
                        println!("{}", serde_json::to_string_pretty(&records)?);
                    } else if records.is_empty() {
                        println!("No clip records found.");
                    } else {
                        println!("\n{}", records_table(&records));
                    }
                }
                ClipsAction::Show { id } => {
                    let record = store.get_by_id(id)?;
                    println!("\n{}", clip_table(&record));
                }
                ClipsAction::Delete { id } => {
                    store.soft_delete(id)?;
                    println!("Deleted clip record {}", id);
                }
            }
        }
        Commands::Fingerprint { file } => {
            let fingerprint = fingerprint_file(&file)?;
            println!("{}  {}", fingerprint, file.display());
        }
        Commands::Config { action } => match action {
            ConfigAction::Init { output, force } => {
                if output.exists() && !force {
                    anyhow::bail!("{} already exists, pass --force to overwrite", output.display());
                }
                Config::default().save_to_file(&output)?;
                println!("Wrote default configuration to {}", output.display());
            }
        },
    }

    Ok(())
}

/// Merge batch flags over the config file into the options every clip is processed with
fn pipeline_options(config: &Config, batch: &BatchArgs) -> Result<PipelineOptions> {
    let pipeline = &config.pipeline;
    let window = TimeWindow::new(
        batch.start_time.unwrap_or(pipeline.start_time),
        batch.end_time.unwrap_or(pipeline.end_time),
    )?;

    Ok(PipelineOptions {
        output_dir: batch.output.clone(),
        model: batch.model.clone().unwrap_or_else(|| pipeline.model.clone()),
        window,
        width: batch.width.unwrap_or(pipeline.width),
        height: batch.height.unwrap_or(pipeline.height),
        fade_duration: batch.fade_duration.unwrap_or(pipeline.fade_duration),
        interactive: !batch.no_interact,
        skip_captions: batch.skip_captions_gen,
        skip_video: batch.skip_video_gen,
    })
}

async fn run_batch(config: Config, batch: BatchArgs, verbose: bool) -> Result<()> {
    let options = pipeline_options(&config, &batch)?;
    info!(
        "Batch: audio {}, video {}, output {}, window {}s-{}s, model {}",
        batch.audio_path.display(),
        batch.video_path.display(),
        options.output_dir.display(),
        options.window.start,
        options.window.end,
        options.model
    );

    let store = SqliteClipStore::open(&config.database.path)
        .with_context(|| format!("opening clip store {}", config.database.path.display()))?;
    let runner = ScriptStageRunner::new(config.scripts.clone(), verbose);

    let mut pipeline = Pipeline::new(&runner, &store, &options);
    if options.interactive {
        let timeout = Duration::from_secs(config.pipeline.pause_timeout_secs);
        pipeline = pipeline.with_checkpoint(Box::new(TerminalPrompt::stdin(timeout)?));
    }

    let mut driver = BatchDriver::new(pipeline, &store, rand::thread_rng());
    let report = driver.run(&batch.audio_path, &batch.video_path).await?;

    info!(
        "Captioner batch completed: {} of {} clips done",
        report.completed(),
        report.clips.len() + report.rejected.len()
    );
    Ok(())
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<()> {
    let log_dir = std::env::current_dir()?.join(".captioner").join("log");
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = rolling::daily(&log_dir, "captioner.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);
    // The writer must outlive every span, so the guard lives until exit.
    std::mem::forget(guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!(
        "Logging initialized - console: {}, file: {}",
        log_level,
        log_dir.join("captioner.log").display()
    );
    Ok(())
}
