use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::fetcher::HttpFetcher;
use crate::models::{RawListing, SearchPattern};
use crate::normalizer::StockVocabulary;
use crate::plugins::traits::{Capability, ScannerPlugin};
use crate::utils::error::ScanError;

const DUMMY_URL: &str = "http://www.dummy.com/";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DummyOutcome {
    InStock,
    Unavailable,
    FetchError,
    ParseError,
}

/// Offline scanner that plays back a script of outcomes, one per scan,
/// wrapping around at the end. Never touches the network.
pub struct DummyScanner {
    script: Vec<DummyOutcome>,
    delay: Duration,
    position: AtomicUsize,
}

impl Default for DummyScanner {
    fn default() -> Self {
        Self::new(vec![
            DummyOutcome::InStock,
            DummyOutcome::Unavailable,
            DummyOutcome::FetchError,
        ])
    }
}

impl DummyScanner {
    pub fn new(script: Vec<DummyOutcome>) -> Self {
        Self {
            script,
            delay: Duration::ZERO,
            position: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn next_outcome(&self) -> DummyOutcome {
        if self.script.is_empty() {
            return DummyOutcome::Unavailable;
        }
        let index = self.position.fetch_add(1, Ordering::SeqCst);
        self.script[index % self.script.len()]
    }
}

#[async_trait]
impl ScannerPlugin for DummyScanner {
    fn key(&self) -> &str {
        "dummy"
    }

    fn name(&self) -> &str {
        "Dummy"
    }

    fn capability(&self) -> Capability {
        Capability::StockAndPrice
    }

    fn vocabulary(&self) -> StockVocabulary {
        StockVocabulary::new()
            .in_stock(&["in stock"])
            .out_of_stock(&["out of stock"])
    }

    fn user_url(&self, _pattern: &SearchPattern) -> String {
        DUMMY_URL.to_string()
    }

    async fn fetch_listings(
        &self,
        _fetcher: &HttpFetcher,
        pattern: &SearchPattern,
    ) -> Result<Vec<RawListing>, ScanError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let title = format!("Dummy {}", pattern.keywords().join(" "));
        let listing = RawListing::new(title, DUMMY_URL).with_price("499,99 €");

        match self.next_outcome() {
            DummyOutcome::InStock => Ok(vec![listing.with_stock("in stock")]),
            DummyOutcome::Unavailable => Ok(vec![listing.with_stock("out of stock")]),
            DummyOutcome::FetchError => Err(ScanError::fetch(DUMMY_URL, "dummy connection refused")),
            DummyOutcome::ParseError => Err(ScanError::parse("dummy layout changed")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScraperConfig;
    use crate::models::MatchPolicy;

    #[tokio::test]
    async fn test_script_wraps_around() {
        let scanner = DummyScanner::new(vec![DummyOutcome::InStock, DummyOutcome::ParseError]);
        let fetcher = HttpFetcher::new(ScraperConfig::default()).unwrap();
        let pattern = SearchPattern::parse("rtx 3080", MatchPolicy::Keywords).unwrap();

        let first = scanner.fetch_listings(&fetcher, &pattern).await.unwrap();
        assert_eq!(first[0].title, "Dummy rtx 3080");
        assert_eq!(first[0].stock_text.as_deref(), Some("in stock"));

        assert!(matches!(
            scanner.fetch_listings(&fetcher, &pattern).await,
            Err(ScanError::Parse { .. })
        ));
        assert!(scanner.fetch_listings(&fetcher, &pattern).await.is_ok());
    }

    #[tokio::test]
    async fn test_empty_script_is_unavailable() {
        let scanner = DummyScanner::new(Vec::new());
        let fetcher = HttpFetcher::new(ScraperConfig::default()).unwrap();
        let pattern = SearchPattern::parse("anything", MatchPolicy::Keywords).unwrap();

        let listings = scanner.fetch_listings(&fetcher, &pattern).await.unwrap();
        assert_eq!(listings[0].stock_text.as_deref(), Some("out of stock"));
    }
}
