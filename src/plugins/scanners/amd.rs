use async_trait::async_trait;
use url::Url;

use super::{endpoint, static_url};
use crate::fetcher::{FetchRequest, HttpFetcher};
use crate::html::{self, HtmlPage};
use crate::models::{RawListing, SearchPattern};
use crate::normalizer::StockVocabulary;
use crate::plugins::traits::{Capability, ScannerPlugin};
use crate::utils::error::ScanError;

const SHOP_PATH: &str = "fr/direct-buy/fr";

/// AMD direct-buy shop. The page lists every product regardless of the
/// query, so filtering is left entirely to the pattern check.
pub struct AmdScanner {
    base_url: Url,
}

impl Default for AmdScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl AmdScanner {
    pub fn new() -> Self {
        Self::with_base_url(static_url("https://www.amd.com/"))
    }

    pub fn with_base_url(base_url: Url) -> Self {
        Self { base_url }
    }

    pub fn parse_listings(body: &str, page_url: &Url) -> Result<Vec<RawListing>, ScanError> {
        let page = HtmlPage::parse(body, page_url);
        let items = page.select_first_layout(&[".view-shop-product-search .shop-content"])?;

        items
            .into_iter()
            .map(|item| {
                let title = html::require_title(html::text_of(item, ".shop-title")?, "AMD")?;

                let url = html::attr_of(item, ".shop-details a", "href")?
                    .map(|href| page.absolute_url(&href))
                    .unwrap_or_else(|| page.base_url().to_string());

                // Only purchasable products get a cart button; otherwise the
                // links block holds a sold-out label.
                let stock = match html::text_of(item, ".shop-links button")? {
                    Some(button) => Some(button),
                    None => html::text_of(item, ".shop-links")?,
                };

                let mut listing = RawListing::new(title, url);
                listing.price_text = html::text_of(item, ".shop-price")?;
                listing.stock_text = stock;
                Ok(listing)
            })
            .collect()
    }
}

#[async_trait]
impl ScannerPlugin for AmdScanner {
    fn key(&self) -> &str {
        "amd"
    }

    fn name(&self) -> &str {
        "AMD"
    }

    fn capability(&self) -> Capability {
        Capability::StockAndPrice
    }

    fn vocabulary(&self) -> StockVocabulary {
        StockVocabulary::new()
            .in_stock(&["ajouter au panier", "add to cart"])
            .out_of_stock(&["rupture de stock", "épuisé", "out of stock", "sold out"])
    }

    fn user_url(&self, _pattern: &SearchPattern) -> String {
        endpoint(&self.base_url, SHOP_PATH)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| self.base_url.to_string())
    }

    async fn fetch_listings(
        &self,
        fetcher: &HttpFetcher,
        _pattern: &SearchPattern,
    ) -> Result<Vec<RawListing>, ScanError> {
        let request = FetchRequest::get(endpoint(&self.base_url, SHOP_PATH)?)
            .header("cookie", "pmuser_country=fr")
            .header("accept-language", "fr-FR,fr;q=0.9,en-US;q=0.8,en;q=0.7");
        let body = fetcher.fetch_text(&request).await?;
        Self::parse_listings(&body, &request.url)
    }
}
