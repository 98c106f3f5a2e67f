use crate::models::{ChangeEvent, CycleReport, ScanFailure};
use crate::plugins::traits::EventSink;
use crate::utils::error::FailureKind;

/// Reports everything through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl LogSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogSink {
    fn name(&self) -> &'static str {
        "log"
    }

    fn on_change(&self, event: &ChangeEvent) {
        let record = event.current();
        tracing::info!(
            store = %record.store_key,
            kind = event.kind(),
            title = %record.title,
            availability = %record.availability,
            price = ?record.price.as_ref().map(|p| p.to_string()),
            restock = event.is_restock(),
            "product change"
        );
    }

    fn on_failure(&self, failure: &ScanFailure) {
        match failure.kind {
            FailureKind::Parse => tracing::error!(
                store = %failure.store_key,
                consecutive = failure.consecutive_failures,
                "scanner needs maintenance: {}",
                failure.message
            ),
            FailureKind::Fetch | FailureKind::Timeout => tracing::warn!(
                store = %failure.store_key,
                kind = %failure.kind,
                consecutive = failure.consecutive_failures,
                "scan failed, will retry: {}",
                failure.message
            ),
        }
    }

    fn on_cycle_complete(&self, report: &CycleReport) {
        tracing::debug!(
            cycle = report.cycle,
            scanners = report.scanners_run,
            failed = report.scanners_failed,
            records = report.records_seen,
            events = report.events_emitted,
            duration_ms = report.duration_ms,
            cancelled = report.cancelled,
            "cycle complete"
        );
    }
}
