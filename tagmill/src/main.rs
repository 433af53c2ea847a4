//! Tagmill - round-robin multi-endpoint batch tagger
//!
//! CLI entry point for cleaning and tagging record tables.

use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use tracing::debug;

use tagmill::cli::{Cli, Command};
use tagmill::config::Config;
use tagmill::dataset::{self, Cleaner, Record};
use tagmill::dispatch::Task;
use tagmill::pool::EndpointPool;
use tagmill::prompt;
use tagmill::scheduler::BatchScheduler;

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    setup_logging(cli.log_level.as_deref(), config.log_level.as_deref()).context("Failed to setup logging")?;
    debug!(?cli.command, "main: starting");

    match cli.command {
        Command::Clean { input, output } => run_clean(&input, &output),
        Command::Tag { input, output } => run_tag(&config, &input, &output).await,
    }
}

fn run_clean(input: &Path, output: &Path) -> Result<()> {
    let cleaner = Cleaner::new()?;
    let records: Vec<Record> = dataset::read_records(input)?;
    let count = records.len();

    let cleaned: Vec<Record> = records.into_iter().map(|r| cleaner.clean(r)).collect();
    dataset::write_records(output, &cleaned)?;

    println!("{} Cleaned {} records → {}", "✓".green(), count, output.display());
    Ok(())
}

async fn run_tag(config: &Config, input: &Path, output: &Path) -> Result<()> {
    config.validate()?;
    let pool = Arc::new(EndpointPool::from_config(config)?);

    let records: Vec<Record> = dataset::read_records(input)?;
    let tasks: Vec<Task> = records
        .iter()
        .enumerate()
        .map(|(index, record)| Task {
            index,
            prompt: prompt::tag_prompt(record),
        })
        .collect();

    let scheduler = BatchScheduler::new(pool, config.call_interval(), config.max_attempts);
    let results = scheduler.run_batch(tasks).await;

    let failures = results.values().filter(|value| value.is_none()).count();
    let tags: Vec<Vec<String>> = (0..records.len())
        .map(|index| {
            results
                .get(&index)
                .and_then(|value| value.as_deref())
                .map(prompt::parse_tags)
                .unwrap_or_default()
        })
        .collect();

    let count = records.len();
    let tagged = dataset::merge_tags(records, tags);
    dataset::write_records(output, &tagged)?;

    if failures > 0 {
        println!(
            "{} Tagged {} records, {} gave up after {} attempts → {}",
            "⚠".yellow(),
            count,
            failures,
            config.max_attempts,
            output.display()
        );
    } else {
        println!("{} Tagged {} records → {}", "✓".green(), count, output.display());
    }

    Ok(())
}
