use crate::models::{ChangeEvent, CycleReport, Price, ScanFailure};
use crate::plugins::traits::EventSink;
use crate::utils::error::FailureKind;

/// Human-readable lines on stdout.
#[derive(Debug, Clone, Default)]
pub struct ConsoleSink {
    show_cycles: bool,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also print a summary line after every cycle.
    pub fn with_cycle_summaries(mut self) -> Self {
        self.show_cycles = true;
        self
    }

    pub fn format_change(event: &ChangeEvent) -> String {
        match event {
            ChangeEvent::FirstSeen { record } => format!(
                "[{}] NEW    {} | {} | {} | {}",
                record.store_key,
                record.title,
                record.availability,
                format_price(record.price.as_ref()),
                record.url
            ),
            ChangeEvent::StockChanged { old, new } => format!(
                "[{}] STOCK  {} | {} -> {} | {}",
                new.store_key, new.title, old.availability, new.availability, new.url
            ),
            ChangeEvent::PriceChanged { old, new } => format!(
                "[{}] PRICE  {} | {} -> {} | {}",
                new.store_key,
                new.title,
                format_price(old.price.as_ref()),
                format_price(new.price.as_ref()),
                new.url
            ),
        }
    }

    /// Parse failures need a scanner fix; fetch failures and timeouts
    /// usually clear up on their own.
    pub fn format_failure(failure: &ScanFailure) -> String {
        let advice = match failure.kind {
            FailureKind::Parse => "scanner needs maintenance",
            FailureKind::Fetch | FailureKind::Timeout => "will retry",
        };
        let streak = if failure.consecutive_failures > 1 {
            format!(" ({} in a row)", failure.consecutive_failures)
        } else {
            String::new()
        };
        format!(
            "[{}] {}: {}{}: {}",
            failure.store_key, failure.kind, advice, streak, failure.message
        )
    }

    pub fn format_cycle(report: &CycleReport) -> String {
        format!(
            "cycle {}: {} scanners, {} failed, {} records, {} events in {}ms{}",
            report.cycle,
            report.scanners_run,
            report.scanners_failed,
            report.records_seen,
            report.events_emitted,
            report.duration_ms,
            if report.cancelled { " (cancelled)" } else { "" }
        )
    }
}

fn format_price(price: Option<&Price>) -> String {
    price.map(|p| p.to_string()).unwrap_or_else(|| "no price".to_string())
}

impl EventSink for ConsoleSink {
    fn name(&self) -> &'static str {
        "console"
    }

    fn on_change(&self, event: &ChangeEvent) {
        println!("{}", Self::format_change(event));
    }

    fn on_failure(&self, failure: &ScanFailure) {
        eprintln!("{}", Self::format_failure(failure));
    }

    fn on_cycle_complete(&self, report: &CycleReport) {
        if self.show_cycles {
            println!("{}", Self::format_cycle(report));
        }
    }
}
