use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, Notify, RwLock, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::SchedulerConfig;
use crate::detector::ChangeDetector;
use crate::fetcher::HttpFetcher;
use crate::models::{ChangeEvent, CycleReport, ProductRecord, ScanFailure, SearchPattern, SnapshotMap};
use crate::normalizer::Normalizer;
use crate::plugins::traits::{EventSink, ScannerDescriptor};
use crate::utils::error::{AppError, FailureKind, ScanError};

const DEFAULT_CONCURRENCY: usize = 8;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    Idle,
    Running,
    Stopped,
}

/// Result of a scanner's most recent scan, as shown to the user.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScanOutcome {
    InStock,
    Unavailable,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScannerStatus {
    pub store_key: String,
    pub store_name: String,
    pub user_url: String,
    pub last_scan: Option<DateTime<Utc>>,
    pub last_outcome: Option<ScanOutcome>,
    pub last_in_stock: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
    pub last_error: Option<String>,
    pub last_failure_kind: Option<FailureKind>,
    pub watched_items: usize,
}

impl ScannerStatus {
    fn new(scanner: &ScannerDescriptor, pattern: &SearchPattern) -> Self {
        Self {
            store_key: scanner.key().to_string(),
            store_name: scanner.name().to_string(),
            user_url: scanner.user_url(pattern),
            last_scan: None,
            last_outcome: None,
            last_in_stock: None,
            consecutive_failures: 0,
            last_error: None,
            last_failure_kind: None,
            watched_items: 0,
        }
    }
}

/// Drives scan cycles over the selected scanners.
///
/// IDLE -> RUNNING on [`start`](Self::start), -> STOPPED on
/// [`stop`](Self::stop). The first cycle runs immediately; each following
/// one starts `interval` after the previous one finished. A failing scanner
/// only produces a failure notification.
pub struct PollScheduler {
    config: SchedulerConfig,
    concurrency: usize,
    fetcher: HttpFetcher,
    scanners: Vec<ScannerDescriptor>,
    pattern: SearchPattern,
    normalizer: Normalizer,
    detector: Mutex<ChangeDetector>,
    sinks: Vec<Arc<dyn EventSink>>,
    statuses: RwLock<HashMap<String, ScannerStatus>>,
    state: watch::Sender<SchedulerState>,
    wake: Notify,
    cycle_lock: Mutex<()>,
    cycles: AtomicU64,
}

impl PollScheduler {
    pub fn new(
        config: SchedulerConfig,
        fetcher: HttpFetcher,
        scanners: Vec<ScannerDescriptor>,
        pattern: SearchPattern,
    ) -> Self {
        let normalizer = scanners.iter().fold(Normalizer::new(), |normalizer, scanner| {
            normalizer.with_store(scanner.key(), scanner.store_rules())
        });
        let statuses = scanners
            .iter()
            .map(|s| (s.key().to_string(), ScannerStatus::new(s, &pattern)))
            .collect();
        let (state, _) = watch::channel(SchedulerState::Idle);

        Self {
            config,
            concurrency: DEFAULT_CONCURRENCY,
            fetcher,
            scanners,
            pattern,
            normalizer,
            detector: Mutex::new(ChangeDetector::new()),
            sinks: Vec::new(),
            statuses: RwLock::new(statuses),
            state,
            wake: Notify::new(),
            cycle_lock: Mutex::new(()),
            cycles: AtomicU64::new(0),
        }
    }

    /// Start from an existing detector, e.g. one restored from disk.
    pub fn with_detector(mut self, detector: ChangeDetector) -> Self {
        self.detector = Mutex::new(detector);
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Scanners fetched in parallel within one cycle.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    pub fn scanners(&self) -> &[ScannerDescriptor] {
        &self.scanners
    }

    pub fn pattern(&self) -> &SearchPattern {
        &self.pattern
    }

    /// Names of the attached sinks, in attachment order.
    pub fn sink_names(&self) -> Vec<&'static str> {
        self.sinks.iter().map(|sink| sink.name()).collect()
    }

    /// Spawn the polling loop. Only valid from IDLE.
    pub fn start(self: &Arc<Self>) -> Result<JoinHandle<()>, AppError> {
        if self.scanners.is_empty() {
            return Err(AppError::InvalidState("no scanners selected".to_string()));
        }

        let mut started = false;
        self.state.send_if_modified(|state| {
            if *state == SchedulerState::Idle {
                *state = SchedulerState::Running;
                started = true;
            }
            started
        });
        if !started {
            return Err(AppError::InvalidState(format!(
                "cannot start scheduler in state {:?}",
                self.state()
            )));
        }

        tracing::info!(
            scanners = self.scanners.len(),
            pattern = %self.pattern,
            interval_secs = self.config.interval_secs,
            sinks = ?self.sink_names(),
            "Scheduler started"
        );

        let scheduler = Arc::clone(self);
        Ok(tokio::spawn(async move { scheduler.run_loop().await }))
    }

    /// Move to STOPPED. Scanners still in flight are abandoned; results
    /// already collected in the current cycle are kept.
    pub fn stop(&self) {
        let changed = self.state.send_if_modified(|state| {
            if *state == SchedulerState::Stopped {
                false
            } else {
                *state = SchedulerState::Stopped;
                true
            }
        });
        if changed {
            tracing::info!("Scheduler stopping");
        }
    }

    /// Skip the rest of the current wait and poll again now.
    pub fn trigger_now(&self) {
        self.wake.notify_one();
    }

    /// Run one cycle outside the loop. Serialized with the loop's cycles.
    pub async fn run_cycle(&self) -> Result<CycleReport, AppError> {
        if self.state() == SchedulerState::Stopped {
            return Err(AppError::InvalidState("scheduler is stopped".to_string()));
        }
        Ok(self.execute_cycle().await)
    }

    /// Per-scanner status, in selection order.
    pub async fn statuses(&self) -> Vec<ScannerStatus> {
        let statuses = self.statuses.read().await;
        self.scanners
            .iter()
            .filter_map(|s| statuses.get(s.key()).cloned())
            .collect()
    }

    pub async fn clear_errors(&self) {
        let mut statuses = self.statuses.write().await;
        for status in statuses.values_mut() {
            status.consecutive_failures = 0;
            status.last_error = None;
            status.last_failure_kind = None;
            if status.last_outcome == Some(ScanOutcome::Error) {
                status.last_outcome = None;
            }
        }
    }

    /// Copy of the detector's snapshots, for persistence.
    pub async fn export_snapshots(&self) -> SnapshotMap {
        self.detector.lock().await.export()
    }

    async fn run_loop(self: Arc<Self>) {
        let mut state = self.state.subscribe();

        loop {
            if self.state() == SchedulerState::Stopped {
                break;
            }

            self.execute_cycle().await;

            if self.state() == SchedulerState::Stopped {
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.interval()) => {}
                _ = self.wake.notified() => {
                    tracing::debug!("Cycle triggered manually");
                }
                _ = wait_stopped(&mut state) => {}
            }
        }

        tracing::info!(cycles = self.cycles.load(Ordering::SeqCst), "Scheduler stopped");
    }

    async fn execute_cycle(&self) -> CycleReport {
        let _cycle = self.cycle_lock.lock().await;
        let cycle = self.cycles.fetch_add(1, Ordering::SeqCst) + 1;
        let started_at = Utc::now();
        let start = Instant::now();

        tracing::debug!(cycle, scanners = self.scanners.len(), "Starting scan cycle");

        let mut results: Vec<(usize, Result<Vec<ProductRecord>, ScanError>)> = Vec::new();
        let mut cancelled = false;
        {
            let pending: Vec<_> = self
                .scanners
                .iter()
                .enumerate()
                .map(|(index, scanner)| async move { (index, self.scan_one(scanner).await) })
                .collect();
            let mut scans = stream::iter(pending).buffer_unordered(self.concurrency);
            let mut state = self.state.subscribe();

            loop {
                tokio::select! {
                    next = scans.next() => match next {
                        Some(result) => results.push(result),
                        None => break,
                    },
                    _ = wait_stopped(&mut state) => {
                        cancelled = true;
                        break;
                    }
                }
            }
        }
        results.sort_by_key(|(index, _)| *index);

        if cancelled {
            tracing::info!(
                cycle,
                completed = results.len(),
                abandoned = self.scanners.len() - results.len(),
                "Cycle cancelled"
            );
        }

        let mut report = CycleReport {
            cycle,
            started_at,
            duration_ms: 0,
            scanners_run: results.len(),
            scanners_failed: 0,
            records_seen: 0,
            events_emitted: 0,
            cancelled,
        };

        let mut detector = self.detector.lock().await;
        for (index, result) in results {
            let scanner = &self.scanners[index];
            match result {
                Ok(records) => {
                    report.records_seen += records.len();
                    let watched = records.len();
                    let in_stock = records.iter().any(ProductRecord::is_in_stock);
                    let events = detector.update(scanner.key(), records);

                    self.record_success(scanner, in_stock, watched).await;
                    report.events_emitted += events.len();
                    self.emit_changes(&events);
                }
                Err(error) => {
                    report.scanners_failed += 1;
                    let failure = self.record_failure(scanner, &error).await;
                    self.emit_failure(&failure);
                }
            }
        }
        drop(detector);

        let elapsed = start.elapsed();
        report.duration_ms = elapsed.as_millis() as u64;
        histogram!("stockscan_cycle_duration_seconds").record(elapsed.as_secs_f64());

        tracing::info!(
            cycle,
            scanners = report.scanners_run,
            failed = report.scanners_failed,
            records = report.records_seen,
            events = report.events_emitted,
            duration_ms = report.duration_ms,
            "Scan cycle complete"
        );

        for sink in &self.sinks {
            sink.on_cycle_complete(&report);
        }
        report
    }

    async fn scan_one(&self, scanner: &ScannerDescriptor) -> Result<Vec<ProductRecord>, ScanError> {
        let timeout = self.config.scan_timeout();
        let start = Instant::now();

        let result = match tokio::time::timeout(
            timeout,
            scanner.scan(&self.fetcher, &self.pattern, &self.normalizer),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(ScanError::Timeout {
                seconds: timeout.as_secs(),
            }),
        };

        let outcome = match &result {
            Ok(_) => "ok",
            Err(e) => match e.kind() {
                FailureKind::Fetch => "fetch_error",
                FailureKind::Parse => "parse_error",
                FailureKind::Timeout => "timeout",
            },
        };
        counter!("stockscan_scans_total", "store" => scanner.key().to_string(), "outcome" => outcome)
            .increment(1);
        histogram!("stockscan_scan_duration_seconds", "store" => scanner.key().to_string())
            .record(start.elapsed().as_secs_f64());

        result
    }

    async fn record_success(&self, scanner: &ScannerDescriptor, in_stock: bool, watched: usize) {
        let now = Utc::now();
        let mut statuses = self.statuses.write().await;
        if let Some(status) = statuses.get_mut(scanner.key()) {
            status.last_scan = Some(now);
            status.consecutive_failures = 0;
            status.last_error = None;
            status.last_failure_kind = None;
            status.watched_items = watched;
            if in_stock {
                status.last_outcome = Some(ScanOutcome::InStock);
                status.last_in_stock = Some(now);
            } else {
                status.last_outcome = Some(ScanOutcome::Unavailable);
            }
        }
    }

    async fn record_failure(&self, scanner: &ScannerDescriptor, error: &ScanError) -> ScanFailure {
        let mut statuses = self.statuses.write().await;
        let consecutive = match statuses.get_mut(scanner.key()) {
            Some(status) => {
                status.last_scan = Some(Utc::now());
                status.last_outcome = Some(ScanOutcome::Error);
                status.consecutive_failures += 1;
                status.last_error = Some(error.to_string());
                status.last_failure_kind = Some(error.kind());
                status.consecutive_failures
            }
            None => 1,
        };
        drop(statuses);

        tracing::debug!(store = scanner.key(), consecutive, kind = ?error.kind(), "Scan failed: {}", error);

        ScanFailure::from_error(scanner.key(), scanner.name(), error, consecutive)
    }

    fn emit_changes(&self, events: &[ChangeEvent]) {
        for event in events {
            counter!("stockscan_change_events_total", "kind" => event.kind()).increment(1);
            for sink in &self.sinks {
                sink.on_change(event);
            }
        }
    }

    fn emit_failure(&self, failure: &ScanFailure) {
        for sink in &self.sinks {
            sink.on_failure(failure);
        }
    }
}

/// Resolves once the state is STOPPED (or the sender is gone).
async fn wait_stopped(state: &mut watch::Receiver<SchedulerState>) {
    loop {
        let stopped = *state.borrow_and_update() == SchedulerState::Stopped;
        if stopped || state.changed().await.is_err() {
            return;
        }
    }
}
