//! tubecrawl CLI
//!
//! Local execution entry point.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tubecrawl::{
    error::{AppError, Result},
    models::{ChannelRef, Config, JobStatus, Limits},
    pipeline::{self, EnrichmentManager},
    platform::YoutubePlatform,
    storage::{LocalStorage, SnapshotStore},
};

/// tubecrawl - Channel Catalog Crawler
#[derive(Parser, Debug)]
#[command(
    name = "tubecrawl",
    version,
    about = "Crawl public video catalogs and backfill per-video detail"
)]
struct Cli {
    /// Path to storage directory containing config.toml and library.json
    #[arg(short, long, default_value = "storage")]
    storage_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl channels into a collection
    Crawl {
        /// Collection to store the snapshots in
        collection: String,

        /// Channels as @handle, channel id or URL
        #[arg(required = true)]
        channels: Vec<String>,

        #[command(flatten)]
        limits: LimitArgs,

        /// Start detail backfill once the crawl is stored
        #[arg(long)]
        enrich: bool,
    },

    /// Backfill publish dates and descriptions for a collection
    Enrich {
        collection: String,
    },

    /// Validate configuration files
    Validate,

    /// Show stored collections
    Info {
        /// Only show this collection, with per-channel detail
        collection: Option<String>,
    },
}

/// Overrides for the `[limits]` config section.
#[derive(Args, Debug)]
struct LimitArgs {
    /// Maximum Videos + Streams items per channel
    #[arg(long)]
    count_limit: Option<usize>,

    /// Stop at the first item older than this many days (enables Streams)
    #[arg(long)]
    max_age_days: Option<u32>,

    /// Skip items shorter than this many seconds
    #[arg(long)]
    min_length_secs: Option<u32>,

    /// Maximum Shorts per channel (0 disables)
    #[arg(long)]
    shorts_limit: Option<usize>,
}

impl LimitArgs {
    fn apply(&self, limits: &Limits) -> Limits {
        Limits {
            count_limit: self.count_limit.or(limits.count_limit),
            max_age_days: self.max_age_days.or(limits.max_age_days),
            min_length_secs: self.min_length_secs.or(limits.min_length_secs),
            shorts_limit: self.shorts_limit.unwrap_or(limits.shorts_limit),
        }
    }
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Run the backfill for one collection to completion.
async fn run_enrichment(
    config: &Config,
    platform: Arc<YoutubePlatform>,
    storage: Arc<LocalStorage>,
    collection: &str,
) -> Result<()> {
    let manager = EnrichmentManager::new(platform, storage, config.enrichment.clone());
    manager.start(collection);
    let job = manager.wait(collection).await;
    manager.shutdown().await;

    log::info!(
        "Enrichment {:?}: {} enriched, {} skipped, {} failed of {}",
        job.status,
        job.enriched_count,
        job.skipped_count,
        job.failed_count,
        job.total
    );

    match job.status {
        JobStatus::Complete => Ok(()),
        JobStatus::RateLimited => {
            log::warn!("Rate limited by the platform. Run 'enrich' again later to resume.");
            Ok(())
        }
        _ => Err(AppError::crawl(
            collection,
            job.error.unwrap_or_else(|| "enrichment did not finish".into()),
        )),
    }
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    log::info!("tubecrawl starting...");

    // Load configuration
    let storage = Arc::new(LocalStorage::new(&cli.storage_dir));
    let config = Config::load_or_default(storage.config_path());

    log::info!("Loaded configuration from {}", cli.storage_dir.display());

    match cli.command {
        Command::Crawl {
            collection,
            channels,
            limits,
            enrich,
        } => {
            config.validate()?;
            let limits = limits.apply(&config.limits);
            let refs = channels
                .iter()
                .map(|c| c.parse::<ChannelRef>())
                .collect::<Result<Vec<_>>>()?;

            let platform = Arc::new(YoutubePlatform::new(&config.crawler)?);
            let snapshots =
                pipeline::build_snapshots(platform.as_ref(), &config.crawler, &refs, &limits).await;
            if snapshots.is_empty() {
                return Err(AppError::crawl(&collection, "no channel could be crawled"));
            }

            let mut library = storage.load().await?;
            let count = snapshots.len();
            for snapshot in snapshots {
                if !snapshot.is_complete() {
                    log::warn!(
                        "Snapshot of {} is partial; see its source summaries",
                        snapshot.channel.title
                    );
                }
                library.upsert_snapshot(&collection, snapshot);
            }
            storage.save(&library).await?;
            log::info!(
                "Stored {} of {} channels in '{}'",
                count,
                refs.len(),
                collection
            );

            if enrich {
                run_enrichment(&config, platform, storage, &collection).await?;
            }
        }

        Command::Enrich { collection } => {
            config.validate()?;
            let platform = Arc::new(YoutubePlatform::new(&config.crawler)?);
            run_enrichment(&config, platform, storage, &collection).await?;
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK");

            let library = storage.load().await?;
            log::info!("✓ Library OK ({} collections)", library.collections.len());

            log::info!("All validations passed!");
        }

        Command::Info { collection } => {
            log::info!("Storage directory: {}", cli.storage_dir.display());
            let library = storage.load().await?;

            if library.collections.is_empty() {
                log::info!("No collections stored yet.");
            }

            for (name, stored) in &library.collections {
                if collection.as_deref().is_some_and(|c| c != name.as_str()) {
                    continue;
                }
                log::info!(
                    "{}: {} channels, {} items, {} awaiting enrichment",
                    name,
                    stored.channels.len(),
                    stored.item_count(),
                    stored.pending_enrichment()
                );
                if collection.is_none() {
                    continue;
                }
                for snapshot in &stored.channels {
                    log::info!(
                        "  {} ({} items, fetched {})",
                        snapshot.channel.title,
                        snapshot.videos.len(),
                        snapshot.fetched_at
                    );
                    for source in &snapshot.sources {
                        log::info!(
                            "    {}: {} accepted, {} skipped, {}",
                            source.source,
                            source.accepted,
                            source.skipped,
                            source
                                .error
                                .clone()
                                .or_else(|| source.stop_reason.map(|r| format!("{r:?}")))
                                .unwrap_or_default()
                        );
                    }
                }
            }
        }
    }

    log::info!("Done!");

    Ok(())
}
