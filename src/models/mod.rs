pub mod event;
pub mod pattern;
pub mod product;
pub mod snapshot;

pub use event::{ChangeEvent, CycleReport, ScanFailure};
pub use pattern::{MatchPolicy, SearchPattern};
pub use product::{Availability, Price, ProductRecord, RawListing, identity_key};
pub use snapshot::{ScanSnapshot, SnapshotMap};
