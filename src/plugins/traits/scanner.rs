use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::fetcher::HttpFetcher;
use crate::models::{Availability, ProductRecord, RawListing, SearchPattern};
use crate::normalizer::{DEFAULT_CURRENCY, Normalizer, StockVocabulary, StoreRules};
use crate::utils::error::ScanError;

/// Which fields a store can report.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Stock,
    Price,
    StockAndPrice,
}

impl Capability {
    pub fn reports_stock(self) -> bool {
        matches!(self, Capability::Stock | Capability::StockAndPrice)
    }

    pub fn reports_price(self) -> bool {
        matches!(self, Capability::Price | Capability::StockAndPrice)
    }
}

/// Trait for implementing one store's search scraper
#[async_trait]
pub trait ScannerPlugin: Send + Sync {
    /// Plugin metadata
    fn key(&self) -> &str;
    fn name(&self) -> &str;
    fn capability(&self) -> Capability;

    /// Normalization inputs
    fn vocabulary(&self) -> StockVocabulary;
    fn default_currency(&self) -> &str {
        DEFAULT_CURRENCY
    }

    /// Page a user should open to check the store by hand.
    fn user_url(&self, pattern: &SearchPattern) -> String;

    /// Query the store and extract raw listings. Apply whatever filtering
    /// the store's search supports; the final pattern check happens in
    /// [`ScannerDescriptor::scan`].
    async fn fetch_listings(
        &self,
        fetcher: &HttpFetcher,
        pattern: &SearchPattern,
    ) -> Result<Vec<RawListing>, ScanError>;
}

/// A registered scanner: identity plus the plugin doing the work.
#[derive(Clone)]
pub struct ScannerDescriptor {
    key: String,
    name: String,
    capability: Capability,
    plugin: Arc<dyn ScannerPlugin>,
}

impl ScannerDescriptor {
    pub fn new<P: ScannerPlugin + 'static>(plugin: P) -> Self {
        Self::from_arc(Arc::new(plugin))
    }

    pub fn from_arc(plugin: Arc<dyn ScannerPlugin>) -> Self {
        Self {
            key: plugin.key().to_lowercase(),
            name: plugin.name().to_string(),
            capability: plugin.capability(),
            plugin,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capability(&self) -> Capability {
        self.capability
    }

    pub fn user_url(&self, pattern: &SearchPattern) -> String {
        self.plugin.user_url(pattern)
    }

    pub fn store_rules(&self) -> StoreRules {
        StoreRules {
            vocabulary: self.plugin.vocabulary(),
            default_currency: self.plugin.default_currency().to_string(),
        }
    }

    /// Fetch, keep listings whose title matches `pattern`, normalize.
    pub async fn scan(
        &self,
        fetcher: &HttpFetcher,
        pattern: &SearchPattern,
        normalizer: &Normalizer,
    ) -> Result<Vec<ProductRecord>, ScanError> {
        let listings = self.plugin.fetch_listings(fetcher, pattern).await?;
        let fetched = listings.len();
        let observed_at = Utc::now();

        let records: Vec<ProductRecord> = listings
            .into_iter()
            .filter(|listing| pattern.matches(&listing.title))
            .map(|listing| {
                let mut record = normalizer.normalize_at(&self.key, listing, observed_at);
                if !self.capability.reports_price() {
                    record.price = None;
                }
                if !self.capability.reports_stock() {
                    record.availability = Availability::Unknown;
                }
                record
            })
            .collect();

        tracing::debug!(
            store = %self.key,
            fetched,
            matched = records.len(),
            "scan complete"
        );
        Ok(records)
    }
}

impl fmt::Debug for ScannerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScannerDescriptor")
            .field("key", &self.key)
            .field("name", &self.name)
            .field("capability", &self.capability)
            .finish()
    }
}
