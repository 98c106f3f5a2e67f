use async_trait::async_trait;
use url::Url;

use super::{endpoint, static_url};
use crate::fetcher::{FetchRequest, HttpFetcher};
use crate::html::{self, HtmlPage};
use crate::models::{RawListing, SearchPattern};
use crate::normalizer::StockVocabulary;
use crate::plugins::traits::{Capability, ScannerPlugin};
use crate::utils::error::ScanError;

/// GrosBill search. A single hit lands on the datasheet page, which
/// carries schema.org microdata instead of the listing buttons.
pub struct GrosBillScanner {
    base_url: Url,
}

impl Default for GrosBillScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl GrosBillScanner {
    pub fn new() -> Self {
        Self::with_base_url(static_url("https://www.grosbill.com/"))
    }

    pub fn with_base_url(base_url: Url) -> Self {
        Self { base_url }
    }

    fn search_url(&self, pattern: &SearchPattern) -> Result<Url, ScanError> {
        let mut url = endpoint(&self.base_url, "catv2.cgi")?;
        url.query_pairs_mut()
            .append_pair("mode", "recherche")
            .append_pair("recherche", &pattern.query(" "));
        Ok(url)
    }

    pub fn parse_listings(body: &str, page_url: &Url) -> Result<Vec<RawListing>, ScanError> {
        let page = HtmlPage::parse(body, page_url);
        let items =
            page.select_first_layout(&[".diaporama_mode_display div[id]", ".datasheet_container"])?;

        items
            .into_iter()
            .map(|item| {
                let title = match html::text_of(item, ".product_description h2")? {
                    Some(title) => Some(title),
                    None => html::text_of(item, "h1[itemprop=name]")?,
                };
                let title = html::require_title(title, "GrosBill")?;

                let url = html::attr_of(item, ".product_description a", "href")?
                    .map(|href| page.absolute_url(&href))
                    .unwrap_or_else(|| page.base_url().to_string());

                let price = match html::text_of(item, ".btn_price_wrapper b")? {
                    Some(price) => Some(price),
                    None => html::attr_of(item, "b[itemprop=price]", "content")?,
                };

                let stock = match html::text_of(item, ".btn_en_stock_wrapper")? {
                    Some(stock) => Some(stock),
                    None => html::attr_of(item, "link[itemprop=availability]", "href")?,
                };

                let mut listing = RawListing::new(title, url);
                listing.price_text = price;
                listing.stock_text = stock;
                Ok(listing)
            })
            .collect()
    }
}

#[async_trait]
impl ScannerPlugin for GrosBillScanner {
    fn key(&self) -> &str {
        "grosbill"
    }

    fn name(&self) -> &str {
        "GrosBill"
    }

    fn capability(&self) -> Capability {
        Capability::StockAndPrice
    }

    fn vocabulary(&self) -> StockVocabulary {
        StockVocabulary::new()
            .in_stock(&["en stock", "https://schema.org/InStock", "http://schema.org/InStock"])
            .out_of_stock(&[
                "rupture",
                "rupture de stock",
                "sur commande",
                "https://schema.org/OutOfStock",
                "http://schema.org/OutOfStock",
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
