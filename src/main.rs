use anyhow::Result;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use stock_scanner::plugins::sinks::{ConsoleSink, JsonLinesSink, LogSink};
use stock_scanner::utils::logging::init_tracing;
use stock_scanner::{
    AppConfig, ChangeDetector, EventSink, HttpFetcher, MatchPolicy, PollScheduler, ScannerRegistry,
    SearchPattern, Selection, SnapshotStore,
};

/// Watch online stores for a product and report stock and price changes.
#[derive(Parser, Debug)]
#[command(name = "stockscan", version, about)]
struct Cli {
    /// Search pattern; prefix a term with '-' to exclude it (options go first)
    #[arg(required_unless_present_any = ["list_stores", "dump_config"], allow_hyphen_values = true)]
    pattern: Vec<String>,

    /// Comma-separated store keys, or "all"
    #[arg(short, long, default_value = "all")]
    stores: Selection,

    /// Seconds to wait between cycles
    #[arg(short, long)]
    interval: Option<u64>,

    /// Configuration file (defaults to stockscan.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Snapshot file used to remember products across restarts
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// keywords, tokens or phrase
    #[arg(long)]
    match_policy: Option<MatchPolicy>,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,

    /// Print events as JSON lines
    #[arg(long)]
    json: bool,

    /// Also print a summary line after every cycle
    #[arg(short, long)]
    verbose: bool,

    /// List the available stores and exit
    #[arg(long)]
    list_stores: bool,

    /// Print the effective configuration and exit
    #[arg(long)]
    dump_config: bool,
}

impl Cli {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(interval) = self.interval {
            config.scheduler.interval_secs = interval;
        }
        if let Some(path) = &self.snapshot {
            config.persistence.snapshot_path = Some(path.clone());
        }
        if let Some(policy) = self.match_policy {
            config.search.match_policy = policy;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    cli.apply(&mut config);
    config.validate()?;

    if cli.dump_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    let _guard = init_tracing(&config.logging)?;

    let registry = ScannerRegistry::with_default_scanners(&config.scanner)?;
    if cli.list_stores {
        for scanner in registry.scanners() {
            println!("{:<14} {:<16} {:?}", scanner.key(), scanner.name(), scanner.capability());
        }
        return Ok(());
    }

    if config.metrics.enabled {
        PrometheusBuilder::new()
            .with_http_listener(([0, 0, 0, 0], config.metrics.port))
            .install()?;
        info!(port = config.metrics.port, "Prometheus exporter listening");
    }

    let pattern = SearchPattern::parse(&cli.pattern.join(" "), config.search.match_policy)?;
    let scanners = registry.select(&cli.stores)?;

    let snapshots = config.persistence.snapshot_path.clone().map(SnapshotStore::new);
    let detector = snapshots
        .as_ref()
        .map(|store| ChangeDetector::from_snapshots(store.load_or_empty()))
        .unwrap_or_default();

    let output: Arc<dyn EventSink> = if cli.json {
        Arc::new(JsonLinesSink::new(std::io::stdout()))
    } else if cli.verbose {
        Arc::new(ConsoleSink::new().with_cycle_summaries())
    } else {
        Arc::new(ConsoleSink::new())
    };

    let fetcher = HttpFetcher::new(config.scanner.clone())?;
    let scheduler = Arc::new(
        PollScheduler::new(config.scheduler.clone(), fetcher, scanners, pattern)
            .with_concurrency(config.scanner.max_concurrent_scans)
            .with_detector(detector)
            .with_sink(output)
            .with_sink(Arc::new(LogSink::new())),
    );

    info!("Starting stockscan...");

    if cli.once {
        scheduler.run_cycle().await?;
    } else {
        let mut handle = scheduler.start()?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                info!("Shutting down...");
                scheduler.stop();
                handle.await?;
            }
            result = &mut handle => result?,
        }
    }

    if let Some(store) = snapshots {
        store.save(&scheduler.export_snapshots().await)?;
        info!(path = %store.path().display(), "Snapshots saved");
    }

    Ok(())
}
