pub mod scanner;
pub mod sink;

pub use scanner::{Capability, ScannerDescriptor, ScannerPlugin};
pub use sink::{EventSink, SinkMessage};

#[cfg(test)]
pub use sink::MockEventSink;
