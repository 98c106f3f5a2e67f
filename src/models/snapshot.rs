use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::product::ProductRecord;

/// Latest record per identity key for one store.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct ScanSnapshot {
    records: BTreeMap<String, ProductRecord>,
}

impl ScanSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, identity_key: &str) -> Option<&ProductRecord> {
        self.records.get(identity_key)
    }

    /// Store `record` under its identity key, returning the record it replaced.
    pub fn upsert(&mut self, record: ProductRecord) -> Option<ProductRecord> {
        self.records.insert(record.identity_key(), record)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Rebuild with keys recomputed from each record.
    pub fn rekeyed(self) -> Self {
        let mut snapshot = ScanSnapshot::new();
        for record in self.records.into_values() {
            snapshot.upsert(record);
        }
        snapshot
    }
}

/// Every store's snapshot, keyed by store key.
pub type SnapshotMap = BTreeMap<String, ScanSnapshot>;
