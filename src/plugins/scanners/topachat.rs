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

const STOCK_CLASSES: &[&str] = &["en-stock", "en-rupture", "en-cmde", "en-preco"];

pub struct TopAchatScanner {
    base_url: Url,
}

impl Default for TopAchatScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl TopAchatScanner {
    pub fn new() -> Self {
        Self::with_base_url(static_url("https://www.topachat.com/"))
    }

    pub fn with_base_url(base_url: Url) -> Self {
        Self { base_url }
    }

    fn search_url(&self, pattern: &SearchPattern) -> Result<Url, ScanError> {
        let mut url = endpoint(&self.base_url, "pages/recherche.php")?;
        url.query_pairs_mut()
            .append_pair("cat", "micro")
            .append_pair("etou", "0")
            .append_pair("mc", &pattern.query(" "));
        Ok(url)
    }

    pub fn parse_listings(body: &str, page_url: &Url) -> Result<Vec<RawListing>, ScanError> {
        let page = HtmlPage::parse(body, page_url);

        let mut items = page.select_first_layout(&[".produits.list article"])?;
        if items.is_empty() {
            // Single hit: the search redirects to the product sheet, whose
            // parent holds the title block.
            let sheet = html::selector(".product-sheet")?;
            items.extend(
                page.document()
                    .select(&sheet)
                    .next()
                    .and_then(|e| e.parent())
                    .and_then(ElementRef::wrap),
            );
        }

        items
            .into_iter()
            .map(|item| {
                let title = html::text_of(item, ".libelle h1, .libelle h2, .libelle h3")?;
                let title = html::require_title(title, "TopAchat")?;

                let url = html::attr_of(item, ".libelle a", "href")?
                    .map(|href| page.absolute_url(&href))
                    .unwrap_or_else(|| page.base_url().to_string());

                let mut listing = RawListing::new(title, url);
                listing.price_text = html::text_of(item, ".prod_px_euro, .priceFinal.fp44")?;
                listing.stock_text = html::class_with_prefix(item, STOCK_CLASSES);
                Ok(listing)
            })
            .collect()
    }
}

#[async_trait]
impl ScannerPlugin for TopAchatScanner {
    fn key(&self) -> &str {
        "topachat"
    }

    fn name(&self) -> &str {
        "TopAchat"
    }

    fn capability(&self) -> Capability {
        Capability::StockAndPrice
    }

    fn vocabulary(&self) -> StockVocabulary {
        StockVocabulary::new()
            .in_stock(&["en-stock"])
            .out_of_stock(&["en-rupture", "en-cmde", "en-preco"])
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
