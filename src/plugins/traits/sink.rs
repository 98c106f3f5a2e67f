use serde::{Deserialize, Serialize};

use crate::models::{ChangeEvent, CycleReport, ScanFailure};

/// Everything the core reports to front ends, as one message type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "message", rename_all = "snake_case")]
pub enum SinkMessage {
    Change { event: ChangeEvent },
    Failure { failure: ScanFailure },
    CycleComplete { report: CycleReport },
}

/// Trait for front ends consuming scheduler output (console, GUI, logs).
///
/// Calls are made from the scheduler task and must return promptly; hand
/// slow work off to another task.
#[cfg_attr(test, mockall::automock)]
pub trait EventSink: Send + Sync {
    fn name(&self) -> &'static str;

    fn on_change(&self, event: &ChangeEvent);
    fn on_failure(&self, failure: &ScanFailure);
    fn on_cycle_complete(&self, _report: &CycleReport) {}
}
