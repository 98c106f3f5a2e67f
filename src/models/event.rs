use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::product::ProductRecord;
use crate::utils::error::{FailureKind, ScanError};

/// A discrete change the detector found between two polls.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChangeEvent {
    FirstSeen {
        record: ProductRecord,
    },
    StockChanged {
        old: ProductRecord,
        new: ProductRecord,
    },
    PriceChanged {
        old: ProductRecord,
        new: ProductRecord,
    },
}

impl ChangeEvent {
    /// The record as observed in the current cycle.
    pub fn current(&self) -> &ProductRecord {
        match self {
            ChangeEvent::FirstSeen { record } => record,
            ChangeEvent::StockChanged { new, .. } | ChangeEvent::PriceChanged { new, .. } => new,
        }
    }

    pub fn store_key(&self) -> &str {
        &self.current().store_key
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ChangeEvent::FirstSeen { .. } => "first_seen",
            ChangeEvent::StockChanged { .. } => "stock_changed",
            ChangeEvent::PriceChanged { .. } => "price_changed",
        }
    }

    /// True when the product went (or first appeared) in stock.
    pub fn is_restock(&self) -> bool {
        match self {
            ChangeEvent::FirstSeen { record } => record.is_in_stock(),
            ChangeEvent::StockChanged { old, new } => !old.is_in_stock() && new.is_in_stock(),
            ChangeEvent::PriceChanged { .. } => false,
        }
    }
}

/// A scanner that failed during a cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScanFailure {
    pub store_key: String,
    pub store_name: String,
    pub kind: FailureKind,
    pub message: String,
    pub consecutive_failures: u32,
    pub occurred_at: DateTime<Utc>,
}

impl ScanFailure {
    pub fn from_error(
        store_key: &str,
        store_name: &str,
        error: &ScanError,
        consecutive_failures: u32,
    ) -> Self {
        Self {
            store_key: store_key.to_string(),
            store_name: store_name.to_string(),
            kind: error.kind(),
            message: error.to_string(),
            consecutive_failures,
            occurred_at: Utc::now(),
        }
    }

    /// Whether retrying on the next cycle can be expected to help.
    pub fn is_transient(&self) -> bool {
        self.kind != FailureKind::Parse
    }
}

/// Summary of one scheduler cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CycleReport {
    pub cycle: u64,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub scanners_run: usize,
    pub scanners_failed: usize,
    pub records_seen: usize,
    pub events_emitted: usize,
    pub cancelled: bool,
}
