use async_trait::async_trait;
use url::Url;

use super::{endpoint, static_url};
use crate::fetcher::{FetchRequest, HttpFetcher};
use crate::html::{self, HtmlPage};
use crate::models::{RawListing, SearchPattern};
use crate::normalizer::StockVocabulary;
use crate::plugins::traits::{Capability, ScannerPlugin};
use crate::utils::error::ScanError;

pub struct CaseKingScanner {
    base_url: Url,
}

impl Default for CaseKingScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl CaseKingScanner {
    pub fn new() -> Self {
        Self::with_base_url(static_url("https://www.caseking.de/"))
    }

    pub fn with_base_url(base_url: Url) -> Self {
        Self { base_url }
    }

    fn search_url(&self, pattern: &SearchPattern) -> Result<Url, ScanError> {
        let mut url = endpoint(&self.base_url, "en/search")?;
        url.query_pairs_mut().append_pair("sSearch", &pattern.query(" "));
        Ok(url)
    }

    pub fn parse_listings(body: &str, page_url: &Url) -> Result<Vec<RawListing>, ScanError> {
        let page = HtmlPage::parse(body, page_url);
        let items = page.select_first_layout(&[".artbox"])?;

        items
            .into_iter()
            .map(|item| {
                let title = html::attr_of(item, ".producttitles", "data-description")?;
                let title = html::require_title(title, "CaseKing")?;

                let url = html::attr_of(item, "a.producttitles", "href")?
                    .map(|href| page.absolute_url(&href))
                    .unwrap_or_else(|| page.base_url().to_string());

                let mut listing = RawListing::new(title, url);
                listing.price_text = html::text_of(item, ".price")?;
                // deliverable1 = in stock, higher numbers = longer lead time
                listing.stock_text = html::class_with_prefix(item, &["deliverable"]);
                Ok(listing)
            })
            .collect()
    }
}

#[async_trait]
impl ScannerPlugin for CaseKingScanner {
    fn key(&self) -> &str {
        "caseking"
    }

    fn name(&self) -> &str {
        "CaseKing"
    }

    fn capability(&self) -> Capability {
        Capability::StockAndPrice
    }

    fn vocabulary(&self) -> StockVocabulary {
        StockVocabulary::new()
            .in_stock(&["deliverable1"])
            .out_of_stock(&["deliverable2", "deliverable3", "deliverable4", "deliverable5"])
    }

    fn user_url(&self, pattern: &SearchPattern) -> String {
        self.search_url(pattern)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| self.base_url.to_string())
    }

    async fn fetch_listings(
        &self,
        fetcher: &HttpFetcher,
        pattern: &SearchPattern,
    ) -> Result<Vec<RawListing>, ScanError> {
        let request = FetchRequest::get(self.search_url(pattern)?);
        let body = fetcher.fetch_text(&request).await?;
        Self::parse_listings(&body, &request.url)
    }
}
