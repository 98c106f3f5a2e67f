use super::*;
use std::time::Duration;
use stock_scanner::models::Availability;
use stock_scanner::plugins::scanners::{DummyOutcome, DummyScanner, LdlcScanner, NvidiaScanner};
use stock_scanner::utils::error::FailureKind;
use stock_scanner::{ChangeDetector, ScanOutcome, ScannerRegistry, SchedulerState, Selection, SnapshotStore};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

async fn ldlc_server(bodies: &[&str]) -> MockServer {
    let server = MockServer::start().await;
    let (last, first) = bodies.split_last().expect("at least one body");
    for body in first {
        Mock::given(method("GET"))
            .and(path("/recherche/rtx+3080/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(*body))
            .up_to_n_times(1)
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/recherche/rtx+3080/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(*last))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_broken_store_does_not_block_others() -> anyhow::Result<()> {
    let ldlc = ldlc_server(&[LDLC_LISTING]).await;
    let nvidia = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&nvidia)
        .await;

    let (scheduler, mut receiver) = create_test_scheduler(
        vec![
            ScannerDescriptor::new(NvidiaScanner::with_base_url(server_url(&nvidia))),
            ScannerDescriptor::new(LdlcScanner::with_base_url(server_url(&ldlc))),
        ],
        "rtx 3080",
    )?;

    let report = scheduler.run_cycle().await?;
    assert_eq!(report.scanners_run, 2);
    assert_eq!(report.scanners_failed, 1);
    assert_eq!(report.events_emitted, 1);

    let received = drain(&mut receiver);
    assert_eq!(received.changes.len(), 1);
    assert_eq!(received.changes[0].store_key(), "ldlc");
    assert_eq!(received.failures.len(), 1);
    assert_eq!(received.failures[0].store_key, "nvidia");
    assert_eq!(received.failures[0].kind, FailureKind::Fetch);
    assert_eq!(received.reports.len(), 1);

    let statuses = scheduler.statuses().await;
    assert_eq!(statuses[0].store_key, "nvidia");
    assert_eq!(statuses[0].last_outcome, Some(ScanOutcome::Error));
    assert_eq!(statuses[1].last_outcome, Some(ScanOutcome::Unavailable));
    assert_eq!(statuses[1].watched_items, 1);

    Ok(())
}

#[tokio::test]
async fn test_restock_is_reported_once() -> anyhow::Result<()> {
    let ldlc = ldlc_server(&[LDLC_LISTING, LDLC_LISTING_RESTOCKED]).await;
    let (scheduler, mut receiver) = create_test_scheduler(
        vec![ScannerDescriptor::new(LdlcScanner::with_base_url(server_url(&ldlc)))],
        "rtx 3080",
    )?;

    scheduler.run_cycle().await?;
    let first = drain(&mut receiver);
    assert_eq!(first.changes[0].kind(), "first_seen");
    assert!(!first.changes[0].is_restock());

    scheduler.run_cycle().await?;
    let second = drain(&mut receiver);
    assert_eq!(second.changes.len(), 1);
    assert_eq!(second.changes[0].kind(), "stock_changed");
    assert!(second.changes[0].is_restock());

    scheduler.run_cycle().await?;
    assert!(drain(&mut receiver).changes.is_empty());

    let statuses = scheduler.statuses().await;
    assert_eq!(statuses[0].last_outcome, Some(ScanOutcome::InStock));
    assert!(statuses[0].last_in_stock.is_some());

    Ok(())
}

#[tokio::test]
async fn test_snapshots_survive_restart() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let store = SnapshotStore::new(dir.path().join("snapshots.json"));
    let ldlc = ldlc_server(&[LDLC_LISTING]).await;

    let (scheduler, mut receiver) = create_test_scheduler(
        vec![ScannerDescriptor::new(LdlcScanner::with_base_url(server_url(&ldlc)))],
        "rtx 3080",
    )?;
    scheduler.run_cycle().await?;
    assert_eq!(drain(&mut receiver).changes.len(), 1);
    store.save(&scheduler.export_snapshots().await)?;

    let fetcher = HttpFetcher::new(get_test_scraper_config())?;
    let (sink, mut receiver) = ChannelSink::new();
    let restarted = PollScheduler::new(
        get_test_scheduler_config(),
        fetcher,
        vec![ScannerDescriptor::new(LdlcScanner::with_base_url(server_url(&ldlc)))],
        test_pattern("rtx 3080"),
    )
    .with_detector(ChangeDetector::from_snapshots(store.load()?))
    .with_sink(Arc::new(sink));

    let report = restarted.run_cycle().await?;
    assert_eq!(report.records_seen, 1);
    assert_eq!(report.events_emitted, 0);
    assert!(drain(&mut receiver).changes.is_empty());

    let snapshots = restarted.export_snapshots().await;
    let record = snapshots["ldlc"]
        .get("ldlc:gigabytegeforcertx3080gamingoc")
        .expect("record restored");
    assert_eq!(record.availability, Availability::OutOfStock);

    Ok(())
}

#[tokio::test]
async fn test_dummy_store_through_registry() -> anyhow::Result<()> {
    let mut config = get_test_scraper_config();
    config.include_dummy = true;

    let registry = ScannerRegistry::with_default_scanners(&config)?;
    let scanners = registry.select(&Selection::parse("dummy")?)?;
    assert_eq!(scanners.len(), 1);

    let (scheduler, mut receiver) = create_test_scheduler(scanners, "rtx 3080")?;

    // Default script: in stock, unavailable, fetch error.
    scheduler.run_cycle().await?;
    scheduler.run_cycle().await?;
    scheduler.run_cycle().await?;

    let received = drain(&mut receiver);
    let kinds: Vec<&str> = received.changes.iter().map(|e| e.kind()).collect();
    assert_eq!(kinds, vec!["first_seen", "stock_changed"]);
    assert_eq!(received.failures.len(), 1);
    assert!(received.failures[0].is_transient());
    assert_eq!(received.reports.len(), 3);

    Ok(())
}

#[tokio::test]
async fn test_repeated_parse_errors_are_counted() -> anyhow::Result<()> {
    let scanner = DummyScanner::new(vec![DummyOutcome::ParseError]);
    let (scheduler, mut receiver) =
        create_test_scheduler(vec![ScannerDescriptor::new(scanner)], "rtx 3080")?;

    for _ in 0..3 {
        scheduler.run_cycle().await?;
    }

    let received = drain(&mut receiver);
    let streaks: Vec<u32> = received.failures.iter().map(|f| f.consecutive_failures).collect();
    assert_eq!(streaks, vec![1, 2, 3]);
    assert!(received.failures.iter().all(|f| f.kind == FailureKind::Parse));

    scheduler.clear_errors().await;
    assert_eq!(scheduler.statuses().await[0].consecutive_failures, 0);

    Ok(())
}

#[tokio::test]
async fn test_scheduler_loop_lifecycle() -> anyhow::Result<()> {
    let scanner = DummyScanner::new(vec![DummyOutcome::InStock]);
    let (scheduler, mut receiver) =
        create_test_scheduler(vec![ScannerDescriptor::new(scanner)], "rtx 3080")?;

    let handle = scheduler.start()?;
    assert_eq!(scheduler.state(), SchedulerState::Running);

    let first_cycle = wait_for_condition(
        || {
            let scheduler = Arc::clone(&scheduler);
            async move { scheduler.statuses().await[0].last_scan.is_some() }
        },
        5,
    )
    .await;
    assert!(first_cycle, "first cycle should run without waiting for the interval");

    scheduler.trigger_now();
    tokio::time::sleep(Duration::from_millis(200)).await;

    scheduler.stop();
    tokio::time::timeout(Duration::from_secs(5), handle).await??;
    assert_eq!(scheduler.state(), SchedulerState::Stopped);

    let received = drain(&mut receiver);
    assert!(received.reports.len() >= 2);
    assert_eq!(received.changes.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_stop_abandons_slow_store() -> anyhow::Result<()> {
    let ldlc = ldlc_server(&[LDLC_LISTING]).await;
    let slow = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(30)))
        .mount(&slow)
        .await;

    let (scheduler, mut receiver) = create_test_scheduler(
        vec![
            ScannerDescriptor::new(NvidiaScanner::with_base_url(server_url(&slow))),
            ScannerDescriptor::new(LdlcScanner::with_base_url(server_url(&ldlc))),
        ],
        "rtx 3080",
    )?;

    let handle = scheduler.start()?;
    tokio::time::sleep(Duration::from_millis(500)).await;
    scheduler.stop();
    tokio::time::timeout(Duration::from_secs(5), handle).await??;

    let received = drain(&mut receiver);
    assert_eq!(received.reports.len(), 1);
    assert!(received.reports[0].cancelled);
    assert_eq!(received.reports[0].scanners_run, 1);
    assert!(received.failures.is_empty());

    // LDLC answered before the stop, so its results are kept.
    let snapshots = scheduler.export_snapshots().await;
    assert!(snapshots.contains_key("ldlc"));
    assert!(!snapshots.contains_key("nvidia"));

    Ok(())
}
