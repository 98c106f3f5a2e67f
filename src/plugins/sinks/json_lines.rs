use std::io::Write;
use std::sync::Mutex;

use crate::models::{ChangeEvent, CycleReport, ScanFailure};
use crate::plugins::traits::{EventSink, SinkMessage};

/// One JSON object per line on any writer (stdout, a file, a pipe).
pub struct JsonLinesSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self, message: &SinkMessage) {
        let line = match serde_json::to_string(message) {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!("Failed to serialize sink message: {}", e);
                return;
            }
        };

        let mut writer = self
            .writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Err(e) = writeln!(writer, "{}", line).and_then(|_| writer.flush()) {
            tracing::warn!("Failed to write JSON line: {}", e);
        }
    }
}

impl<W: Write + Send> EventSink for JsonLinesSink<W> {
    fn name(&self) -> &'static str {
        "json-lines"
    }

    fn on_change(&self, event: &ChangeEvent) {
        self.write(&SinkMessage::Change {
            event: event.clone(),
        });
    }

    fn on_failure(&self, failure: &ScanFailure) {
        self.write(&SinkMessage::Failure {
            failure: failure.clone(),
        });
    }

    fn on_cycle_complete(&self, report: &CycleReport) {
        self.write(&SinkMessage::CycleComplete {
            report: report.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Availability, ProductRecord};
    use chrono::Utc;

    #[test]
    fn test_writes_one_object_per_line() {
        let sink = JsonLinesSink::new(Vec::new());
        let record = ProductRecord {
            store_key: "ldlc".to_string(),
            title: "RTX 3080".to_string(),
            availability: Availability::InStock,
            price: None,
            url: "https://www.ldlc.com/".to_string(),
            observed_at: Utc::now(),
        };
        sink.on_change(&ChangeEvent::FirstSeen { record });
        sink.on_cycle_complete(&CycleReport {
            cycle: 1,
            started_at: Utc::now(),
            duration_ms: 12,
            scanners_run: 1,
            scanners_failed: 0,
            records_seen: 1,
            events_emitted: 1,
            cancelled: false,
        });

        let output = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<serde_json::Value> = output
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["message"], "change");
        assert_eq!(lines[0]["event"]["type"], "first_seen");
        assert_eq!(lines[1]["message"], "cycle_complete");
        assert_eq!(lines[1]["report"]["cycle"], 1);
    }
}
