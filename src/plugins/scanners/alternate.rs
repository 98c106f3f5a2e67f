use async_trait::async_trait;
use url::Url;

use super::{endpoint, static_url};
use crate::fetcher::{FetchRequest, HttpFetcher};
use crate::html::{self, HtmlPage};
use crate::models::{RawListing, SearchPattern};
use crate::normalizer::StockVocabulary;
use crate::plugins::traits::{Capability, ScannerPlugin};
use crate::utils::error::ScanError;

const STOCK_CLASSES: &[&str] = &["available_", "preorder", "not_available"];

/// Alternate storefront for one country (`alternate.fr`, `alternate.de`, ...).
pub struct AlternateScanner {
    base_url: Url,
    name: String,
}

impl AlternateScanner {
    pub fn new(locale: &str) -> Self {
        let locale = locale.trim().to_lowercase();
        let base_url = static_url(&format!("https://www.alternate.{}/", locale));
        Self::with_base_url(&locale, base_url)
    }

    pub fn with_base_url(locale: &str, base_url: Url) -> Self {
        Self {
            base_url,
            name: format!("Alternate{}", locale.trim().to_uppercase()),
        }
    }

    fn search_url(&self, pattern: &SearchPattern) -> Result<Url, ScanError> {
        let mut url = endpoint(&self.base_url, "html/search.html")?;
        url.query_pairs_mut().append_pair("query", &pattern.query(" "));
        Ok(url)
    }

    pub fn parse_listings(body: &str, page_url: &Url) -> Result<Vec<RawListing>, ScanError> {
        let page = HtmlPage::parse(body, page_url);
        let items = page.select_first_layout(&[".listingContainer .listRow"])?;

        items
            .into_iter()
            .map(|item| {
                let title = html::attr_of(item, ".productLink", "title")?;
                let title = html::require_title(title, "Alternate")?;

                let url = html::attr_of(item, ".productLink", "href")?
                    .map(|href| page.absolute_url(&href))
                    .unwrap_or_else(|| page.base_url().to_string());

                let stock = match html::first(item, ".stockStatus")? {
                    Some(status) => html::class_with_prefix(status, STOCK_CLASSES),
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
impl ScannerPlugin for AlternateScanner {
    fn key(&self) -> &str {
        "alternate"
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn capability(&self) -> Capability {
        Capability::StockAndPrice
    }

    fn vocabulary(&self) -> StockVocabulary {
        StockVocabulary::new()
            .in_stock(&["available_stock"])
            .out_of_stock(&["available_delivery", "available_supplier", "preorder", "not_available"])
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
