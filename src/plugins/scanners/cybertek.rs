use async_trait::async_trait;
use scraper::ElementRef;
use url::Url;

use super::{endpoint, static_url};
use crate::fetcher::{FetchRequest, HttpFetcher};
use crate::html::{self, HtmlPage};
use crate::models::{RawListing, SearchPattern};
use crate::normalizer::StockVocabulary;
use crate::plugins::traits::{Capability, ScannerPlugin};
use crate::utils::error::ScanError;

const AVAILABLE_CLASS: &str = "listing_dispo";
const UNAVAILABLE_MARKER: &str = "listing_indispo";

pub struct CybertekScanner {
    base_url: Url,
}

impl Default for CybertekScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl CybertekScanner {
    pub fn new() -> Self {
        Self::with_base_url(static_url("https://www.cybertek.fr/"))
    }

    pub fn with_base_url(base_url: Url) -> Self {
        Self { base_url }
    }

    fn search_url(&self, pattern: &SearchPattern) -> Result<Url, ScanError> {
        let mut url = endpoint(&self.base_url, "boutique/produit.aspx")?;
        url.query_pairs_mut().append_pair("q", &pattern.query(" "));
        Ok(url)
    }

    pub fn parse_listings(body: &str, page_url: &Url) -> Result<Vec<RawListing>, ScanError> {
        let page = HtmlPage::parse(body, page_url);
        let items = page.select_first_layout(&[".liste-produits .lst_grid > div"])?;

        items
            .into_iter()
            .map(|item| {
                let title = html::text_of(item, ".nom-produit h2")?;
                let title = html::require_title(title, "Cybertek")?;

                // Product link is the item's own first <a>, not one nested in
                // the description.
                let url = item
                    .children()
                    .filter_map(ElementRef::wrap)
                    .find(|child| child.value().name() == "a")
                    .and_then(|a| a.value().attr("href"))
                    .map(|href| page.absolute_url(href))
                    .unwrap_or_else(|| page.base_url().to_string());

                // Availability is only flagged on the container itself.
                let in_stock = item.value().classes().any(|c| c == AVAILABLE_CLASS);
                let stock = if in_stock { AVAILABLE_CLASS } else { UNAVAILABLE_MARKER };

                let mut listing = RawListing::new(title, url).with_stock(stock);
                listing.price_text = html::text_of(item, ".prix-produit")?;
                Ok(listing)
            })
            .collect()
    }
}

#[async_trait]
impl ScannerPlugin for CybertekScanner {
    fn key(&self) -> &str {
        "cybertek"
    }

    fn name(&self) -> &str {
        "Cybertek"
    }

    fn capability(&self) -> Capability {
        Capability::StockAndPrice
    }

    fn vocabulary(&self) -> StockVocabulary {
        StockVocabulary::new()
            .in_stock(&[AVAILABLE_CLASS])
            .out_of_stock(&[UNAVAILABLE_MARKER])
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
