pub mod manager;
pub mod scanners;
pub mod sinks;
pub mod traits;

pub use manager::{ScannerRegistry, Selection};
pub use traits::{Capability, EventSink, ScannerDescriptor, ScannerPlugin, SinkMessage};
