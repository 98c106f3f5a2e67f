pub mod config;
pub mod detector;
pub mod fetcher;
pub mod html;
pub mod models;
pub mod normalizer;
pub mod persistence;
pub mod plugins;
pub mod scheduler;
pub mod utils;

// Re-export commonly used types
pub use config::AppConfig;
pub use detector::ChangeDetector;
pub use fetcher::HttpFetcher;
pub use models::{ChangeEvent, CycleReport, MatchPolicy, ProductRecord, ScanFailure, SearchPattern};
pub use persistence::SnapshotStore;
pub use plugins::{EventSink, ScannerRegistry, Selection};
pub use scheduler::{PollScheduler, ScanOutcome, ScannerStatus, SchedulerState};
pub use utils::error::{AppError, ScanError};

pub type Result<T> = std::result::Result<T, AppError>;
