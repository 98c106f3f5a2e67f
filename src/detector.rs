use std::collections::HashMap;

use crate::models::{ChangeEvent, ProductRecord, ScanSnapshot, SnapshotMap};

/// Diffs each poll against the previous one, per store.
///
/// Owns every store's snapshot. Products missing from a poll keep their
/// last record, so a flaky scrape never shows up as a change.
#[derive(Debug, Clone, Default)]
pub struct ChangeDetector {
    snapshots: SnapshotMap,
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume from previously saved snapshots.
    pub fn from_snapshots(snapshots: SnapshotMap) -> Self {
        Self { snapshots }
    }

    /// Apply one store's records from the current cycle and return what
    /// changed. Duplicate identity keys within `records` collapse to the
    /// last one.
    pub fn update(&mut self, store_key: &str, records: Vec<ProductRecord>) -> Vec<ChangeEvent> {
        let snapshot = self.snapshots.entry(store_key.to_string()).or_default();
        let mut events = Vec::new();

        for record in dedupe(records) {
            let Some(old) = snapshot.upsert(record.clone()) else {
                events.push(ChangeEvent::FirstSeen { record });
                continue;
            };

            if old.availability != record.availability {
                events.push(ChangeEvent::StockChanged {
                    old: old.clone(),
                    new: record.clone(),
                });
            }
            if old.price != record.price {
                events.push(ChangeEvent::PriceChanged { old, new: record });
            }
        }

        if !events.is_empty() {
            tracing::debug!(store = store_key, events = events.len(), "changes detected");
        }
        events
    }

    pub fn snapshot(&self, store_key: &str) -> Option<&ScanSnapshot> {
        self.snapshots.get(store_key)
    }

    pub fn record(&self, store_key: &str, identity_key: &str) -> Option<&ProductRecord> {
        self.snapshots.get(store_key)?.get(identity_key)
    }

    /// Copy of every snapshot, for persistence.
    pub fn export(&self) -> SnapshotMap {
        self.snapshots.clone()
    }

    /// Total records across all stores.
    pub fn len(&self) -> usize {
        self.snapshots.values().map(ScanSnapshot::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Later duplicates replace earlier ones in place.
fn dedupe(records: Vec<ProductRecord>) -> Vec<ProductRecord> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut unique: Vec<ProductRecord> = Vec::with_capacity(records.len());

    for record in records {
        let key = record.identity_key();
        match positions.get(&key) {
            Some(&index) => unique[index] = record,
            None => {
                positions.insert(key, unique.len());
                unique.push(record);
            }
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Availability, Price};
    use chrono::Utc;
    use rstest::rstest;
    use rust_decimal::Decimal;

    fn record(title: &str, availability: Availability, price: Option<Price>) -> ProductRecord {
        ProductRecord {
            store_key: "nvidia".to_string(),
            title: title.to_string(),
            availability,
            price,
            url: "https://store.nvidia.com/".to_string(),
            observed_at: Utc::now(),
        }
    }

    fn usd(cents: i64) -> Option<Price> {
        Some(Price::new(Decimal::new(cents, 2), "USD"))
    }

    #[test]
    fn test_first_occurrence_emits_first_seen_only() {
        let mut detector = ChangeDetector::new();
        let events = detector.update(
            "nvidia",
            vec![
                record("RTX 3070 Ti", Availability::OutOfStock, None),
                record("RTX 3080", Availability::InStock, usd(71900)),
            ],
        );

        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| matches!(e, ChangeEvent::FirstSeen { .. })));
        assert_eq!(detector.len(), 2);
    }

    #[test]
    fn test_unchanged_results_are_idempotent() {
        let mut detector = ChangeDetector::new();
        let records = vec![record("RTX 3080", Availability::InStock, usd(71900))];

        assert_eq!(detector.update("nvidia", records.clone()).len(), 1);
        assert!(detector.update("nvidia", records).is_empty());
    }

    #[test]
    fn test_stock_and_price_change_together() {
        let mut detector = ChangeDetector::new();
        detector.update("nvidia", vec![record("RTX 3070 Ti", Availability::OutOfStock, None)]);

        let events = detector.update(
            "nvidia",
            vec![record("RTX 3070 Ti", Availability::InStock, usd(59999))],
        );

        assert_eq!(events.len(), 2);
        assert!(events.iter().any(|e| matches!(e,
            ChangeEvent::StockChanged { old, new }
                if old.availability == Availability::OutOfStock && new.availability == Availability::InStock)));
        assert!(events.iter().any(|e| matches!(e,
            ChangeEvent::PriceChanged { old, new } if old.price.is_none() && new.price == usd(59999))));

        let stored = detector.record("nvidia", "nvidia:rtx3070ti").unwrap();
        assert_eq!(stored.availability, Availability::InStock);
        assert_eq!(stored.price, usd(59999));
    }

    #[rstest]
    #[case(Availability::OutOfStock, Availability::InStock)]
    #[case(Availability::InStock, Availability::Unknown)]
    #[case(Availability::Unknown, Availability::OutOfStock)]
    fn test_availability_change_only(#[case] before: Availability, #[case] after: Availability) {
        let mut detector = ChangeDetector::new();
        detector.update("nvidia", vec![record("RTX 3080", before, usd(71900))]);

        let events = detector.update("nvidia", vec![record("RTX 3080", after, usd(71900))]);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], ChangeEvent::StockChanged { .. }));
        assert_eq!(detector.record("nvidia", "nvidia:rtx3080").unwrap().availability, after);
    }

    #[test]
    fn test_missing_products_are_left_untouched() {
        let mut detector = ChangeDetector::new();
        detector.update(
            "nvidia",
            vec![
                record("RTX 3080", Availability::InStock, None),
                record("RTX 3090", Availability::InStock, None),
            ],
        );

        let events = detector.update("nvidia", vec![record("RTX 3080", Availability::InStock, None)]);
        assert!(events.is_empty());
        assert!(detector.record("nvidia", "nvidia:rtx3090").is_some());

        // Coming back unchanged is not a change either.
        let events = detector.update("nvidia", vec![record("RTX 3090", Availability::InStock, None)]);
        assert!(events.is_empty());
    }

    #[test]
    fn test_duplicate_listing_last_one_wins() {
        let mut detector = ChangeDetector::new();
        let events = detector.update(
            "nvidia",
            vec![
                record("RTX 3080", Availability::OutOfStock, None),
                record("RTX 3090", Availability::OutOfStock, None),
                record("rtx-3080", Availability::InStock, usd(71900)),
            ],
        );

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].current().title, "rtx-3080");
        assert_eq!(
            detector.record("nvidia", "nvidia:rtx3080").unwrap().availability,
            Availability::InStock
        );
    }

    #[test]
    fn test_stores_are_independent() {
        let mut detector = ChangeDetector::new();
        detector.update("nvidia", vec![record("RTX 3080", Availability::InStock, None)]);

        let mut other = record("RTX 3080", Availability::InStock, None);
        other.store_key = "ldlc".to_string();
        let events = detector.update("ldlc", vec![other]);

        assert_eq!(events.len(), 1);
        assert!(detector.snapshot("ldlc").is_some());
        assert_eq!(detector.export().len(), 2);
    }

    #[test]
    fn test_resume_from_snapshots() {
        let mut detector = ChangeDetector::new();
        detector.update("nvidia", vec![record("RTX 3080", Availability::InStock, None)]);

        let mut resumed = ChangeDetector::from_snapshots(detector.export());
        assert!(resumed
            .update("nvidia", vec![record("RTX 3080", Availability::InStock, None)])
            .is_empty());
    }
}
