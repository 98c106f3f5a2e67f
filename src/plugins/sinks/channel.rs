use tokio::sync::mpsc;

use crate::models::{ChangeEvent, CycleReport, ScanFailure};
use crate::plugins::traits::{EventSink, SinkMessage};

/// Forwards everything to an unbounded channel, for front ends that run
/// their own event loop. Sending never blocks the scheduler.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<SinkMessage>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SinkMessage>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    fn send(&self, message: SinkMessage) {
        if self.sender.send(message).is_err() {
            tracing::trace!("channel sink receiver dropped");
        }
    }
}

impl EventSink for ChannelSink {
    fn name(&self) -> &'static str {
        "channel"
    }

    fn on_change(&self, event: &ChangeEvent) {
        self.send(SinkMessage::Change {
            event: event.clone(),
        });
    }

    fn on_failure(&self, failure: &ScanFailure) {
        self.send(SinkMessage::Failure {
            failure: failure.clone(),
        });
    }

    fn on_cycle_complete(&self, report: &CycleReport) {
        self.send(SinkMessage::CycleComplete {
            report: report.clone(),
        });
    }
}
