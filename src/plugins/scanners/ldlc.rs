use async_trait::async_trait;
use url::Url;

use super::{encoded_terms, endpoint, static_url};
use crate::fetcher::{FetchRequest, HttpFetcher};
use crate::html::{self, HtmlPage};
use crate::models::{RawListing, SearchPattern};
use crate::normalizer::StockVocabulary;
use crate::plugins::traits::{Capability, ScannerPlugin};
use crate::utils::error::ScanError;

const STOCK_LEVELS: &[&str] = &[
    "stock-1", "stock-2", "stock-3", "stock-4", "stock-5", "stock-6", "stock-7", "stock-8", "stock-9",
];

/// LDLC search results, or the product page it redirects to on a single hit.
pub struct LdlcScanner {
    base_url: Url,
}

impl Default for LdlcScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl LdlcScanner {
    pub fn new() -> Self {
        Self::with_base_url(static_url("https://www.ldlc.com/"))
    }

    pub fn with_base_url(base_url: Url) -> Self {
        Self { base_url }
    }

    fn search_url(&self, pattern: &SearchPattern) -> Result<Url, ScanError> {
        endpoint(&self.base_url, &format!("recherche/{}/", encoded_terms(pattern, "+")))
    }

    pub fn parse_listings(body: &str, page_url: &Url) -> Result<Vec<RawListing>, ScanError> {
        let page = HtmlPage::parse(body, page_url);
        let items = page.select_first_layout(&[".listing-product .pdt-item", ".product-bloc"])?;

        items
            .into_iter()
            .map(|item| {
                let title = match html::text_of(item, ".title-3")? {
                    Some(title) => Some(title),
                    None => html::text_of(item, ".title-1")?,
                };
                let title = html::require_title(title, "LDLC")?;

                let url = html::attr_of(item, ".title-3 a", "href")?
                    .map(|href| page.absolute_url(&href))
                    .unwrap_or_else(|| page.base_url().to_string());

                // The stock badge carries its level as a class: stock-1 and
                // stock-2 mean shippable now.
                let stock = match html::first(item, ".stock-web")? {
                    Some(badge) => html::class_with_prefix(badge, STOCK_LEVELS)
                        .or_else(|| Some(html::element_text(badge))),
                    None => None,
                };

                let mut listing = RawListing::new(title, url);
                listing.price_text = html::text_of(item, ".price")?;
                listing.stock_text = stock;
                Ok(listing)
            })
            .collect()
    }
}

#[async_trait]
impl ScannerPlugin for LdlcScanner {
    fn key(&self) -> &str {
        "ldlc"
    }

    fn name(&self) -> &str {
        "LDLC"
    }

    fn capability(&self) -> Capability {
        Capability::StockAndPrice
    }

    fn vocabulary(&self) -> StockVocabulary {
        StockVocabulary::new()
            .in_stock(&["stock-1", "stock-2", "en stock"])
            .out_of_stock(&[
                "stock-3", "stock-4", "stock-5", "stock-6", "stock-7", "stock-8", "stock-9",
                "rupture", "sous 7 jours", "sur commande",
            ])
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
