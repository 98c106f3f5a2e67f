// Integration tests for stockscan
// These tests run real store scanners and the scheduler against local mock servers

pub mod scanner_tests;
pub mod scheduler_tests;

use std::sync::Arc;
use stock_scanner::{
    config::{SchedulerConfig, ScraperConfig},
    models::{ChangeEvent, CycleReport, MatchPolicy, ScanFailure, SearchPattern},
    plugins::{ScannerDescriptor, SinkMessage, sinks::ChannelSink},
    HttpFetcher, PollScheduler,
};
use tokio::sync::mpsc::UnboundedReceiver;
use url::Url;
use wiremock::MockServer;

pub const LDLC_LISTING: &str = r#"
    <div class="listing-product"><ul>
      <li class="pdt-item">
        <h3 class="title-3"><a href="/fiche/PB00394561.html">Gigabyte GeForce RTX 3080 GAMING OC</a></h3>
        <div class="stock-web"><span class="stock stock-9">Rupture</span></div>
        <div class="price">869€95</div>
      </li>
    </ul></div>
"#;

pub const LDLC_LISTING_RESTOCKED: &str = r#"
    <div class="listing-product"><ul>
      <li class="pdt-item">
        <h3 class="title-3"><a href="/fiche/PB00394561.html">Gigabyte GeForce RTX 3080 GAMING OC</a></h3>
        <div class="stock-web"><span class="stock stock-1">En stock</span></div>
        <div class="price">869€95</div>
      </li>
    </ul></div>
"#;

/// Test scraper settings: fast timeouts, no retries
pub fn get_test_scraper_config() -> ScraperConfig {
    ScraperConfig {
        request_timeout_secs: 5,
        retry_attempts: 0,
        retry_delay_ms: 10,
        user_agent: "stockscan-test/1.0".to_string(),
        ..ScraperConfig::default()
    }
}

pub fn get_test_scheduler_config() -> SchedulerConfig {
    SchedulerConfig {
        interval_secs: 3600,
        scan_timeout_secs: 5,
    }
}

pub fn test_pattern(text: &str) -> SearchPattern {
    SearchPattern::parse(text, MatchPolicy::Keywords).expect("test pattern is valid")
}

pub fn server_url(server: &MockServer) -> Url {
    Url::parse(&server.uri()).expect("mock server URI is valid")
}

/// Scheduler over `scanners` with a channel sink attached
pub fn create_test_scheduler(
    scanners: Vec<ScannerDescriptor>,
    pattern: &str,
) -> anyhow::Result<(Arc<PollScheduler>, UnboundedReceiver<SinkMessage>)> {
    let fetcher = HttpFetcher::new(get_test_scraper_config())?;
    let (sink, receiver) = ChannelSink::new();
    let scheduler = PollScheduler::new(get_test_scheduler_config(), fetcher, scanners, test_pattern(pattern))
        .with_sink(Arc::new(sink));
    Ok((Arc::new(scheduler), receiver))
}

/// Everything the sink has received so far, split by kind
#[derive(Debug, Default)]
pub struct Received {
    pub changes: Vec<ChangeEvent>,
    pub failures: Vec<ScanFailure>,
    pub reports: Vec<CycleReport>,
}

pub fn drain(receiver: &mut UnboundedReceiver<SinkMessage>) -> Received {
    let mut received = Received::default();
    while let Ok(message) = receiver.try_recv() {
        match message {
            SinkMessage::Change { event } => received.changes.push(event),
            SinkMessage::Failure { failure } => received.failures.push(failure),
            SinkMessage::CycleComplete { report } => received.reports.push(report),
        }
    }
    received
}

/// Helper to wait for async operations
pub async fn wait_for_condition<F, Fut>(mut condition: F, timeout_seconds: u64) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let start = std::time::Instant::now();
    let timeout = std::time::Duration::from_secs(timeout_seconds);

    while start.elapsed() < timeout {
        if condition().await {
            return true;
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }

    false
}
