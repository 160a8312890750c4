use clap::{Parser, Subcommand};
use hubmeta::config::Config;
use hubmeta::error::{HubmetaError, Result};
use hubmeta::hub::{list_model_ids, HubClient};
use hubmeta::models::{cache_key, format_bytes, CacheEntry, GitFetcher, Pipeline, RecordCache};
use hubmeta::{BatchDriver, ErrorLog};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hubmeta")]
#[command(about = "Fetch and cache Hugging Face model metadata", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the record cache directory
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List models for the configured tasks and cache their metadata (default)
    Run,
    /// Cache metadata for the given model ids
    Fetch {
        #[arg(required = true)]
        model_ids: Vec<String>,
    },
    /// Print the model ids the hub lists for the configured tasks
    Ids,
    /// Print the cached record for a model
    Show { model_id: String },
    /// List empty cache placeholders left by failed or interrupted runs
    Placeholders {
        /// Delete them so the next run retries those models
        #[arg(long)]
        clear: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    if let Some(dir) = cli.cache_dir {
        config.cache.dir = dir;
    }

    match cli.command {
        None | Some(Commands::Run) => {
            let hub = HubClient::new(&config.hub)?;
            let model_ids = list_model_ids(&hub, &config.hub.tasks).await?;
            tracing::info!(count = model_ids.len(), "Collected model ids");
            run_batch(&config, hub, &model_ids).await
        }
        Some(Commands::Fetch { model_ids }) => {
            let hub = HubClient::new(&config.hub)?;
            run_batch(&config, hub, &model_ids).await
        }
        Some(Commands::Ids) => {
            let hub = HubClient::new(&config.hub)?;
            for id in list_model_ids(&hub, &config.hub.tasks).await? {
                println!("{id}");
            }
            Ok(())
        }
        Some(Commands::Show { model_id }) => show_record(&config, &model_id),
        Some(Commands::Placeholders { clear }) => placeholders(&config, clear),
    }
}

async fn run_batch(config: &Config, hub: HubClient, model_ids: &[String]) -> Result<()> {
    let fetcher = GitFetcher::new(&config.fetch.git, hub.endpoint())?;
    let pipeline = Pipeline::new(
        RecordCache::new(&config.cache.dir),
        config.work_root(),
        hub,
        fetcher,
    );
    let driver = BatchDriver::new(pipeline, ErrorLog::new(&config.cache.error_log));

    let progress = ProgressBar::new(model_ids.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let summary = driver.run(model_ids, &progress).await?;
    progress.finish_and_clear();

    println!(
        "Processed {} models: {} stored, {} already cached, {} failed",
        summary.total(),
        summary.succeeded,
        summary.skipped,
        summary.failed
    );
    if summary.failed > 0 {
        println!("Failures logged to {}", config.cache.error_log.display());
    }

    Ok(())
}

fn show_record(config: &Config, model_id: &str) -> Result<()> {
    let cache = RecordCache::new(&config.cache.dir);
    let key = cache_key(model_id);

    let entry = cache.load(key).map_err(|e| {
        HubmetaError::Cache(format!(
            "Failed to read {}: {e}",
            cache.record_path(key).display()
        ))
    })?;

    match entry {
        CacheEntry::Missing => println!("{model_id} is not cached"),
        CacheEntry::Placeholder => println!(
            "{model_id} is reserved but has no record (failed or interrupted run).\nClear it with: hubmeta placeholders --clear"
        ),
        CacheEntry::Record(record) => {
            println!("Model:     {}", record.pretrained_model_name);
            println!(
                "Size:      {} ({} bytes)",
                format_bytes(record.size_bytes),
                record.size_bytes
            );
            println!("Downloads: {}", record.downloads);
            println!();
            println!("{}", record.description);
        }
    }

    Ok(())
}

fn placeholders(config: &Config, clear: bool) -> Result<()> {
    let cache = RecordCache::new(&config.cache.dir);

    let paths = if clear {
        cache.clear_placeholders()?
    } else {
        cache.placeholders()?
    };

    for path in &paths {
        println!("{}", path.display());
    }

    if clear {
        println!("✓ Cleared {} placeholders", paths.len());
    } else if !paths.is_empty() {
        println!("{} placeholders; remove with: hubmeta placeholders --clear", paths.len());
    }

    Ok(())
}
