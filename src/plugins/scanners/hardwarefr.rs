use async_trait::async_trait;
use regex::Regex;
use scraper::Html;
use serde::Deserialize;
use url::Url;

use super::{encoded_terms, endpoint, static_url};
use crate::fetcher::{FetchRequest, HttpFetcher};
use crate::html::{self, HtmlPage};
use crate::models::{RawListing, SearchPattern};
use crate::normalizer::StockVocabulary;
use crate::plugins::traits::{Capability, ScannerPlugin};
use crate::utils::error::ScanError;

const PRODUCT_PAGE_ID: &str = "infosProduit";

/// schema.org metadata embedded in product pages.
#[derive(Debug, Deserialize)]
struct ProductMetadata {
    offers: OfferMetadata,
}

#[derive(Debug, Deserialize)]
struct OfferMetadata {
    price: serde_json::Value,
    availability: String,
}

/// Hardware.fr fills price and stock on listing pages from inline scripts
/// keyed by each item's element id; product pages carry ld+json instead.
pub struct HardwareFrScanner {
    base_url: Url,
}

impl Default for HardwareFrScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl HardwareFrScanner {
    pub fn new() -> Self {
        Self::with_base_url(static_url("https://shop.hardware.fr/"))
    }

    pub fn with_base_url(base_url: Url) -> Self {
        Self { base_url }
    }

    fn search_url(&self, pattern: &SearchPattern) -> Result<Url, ScanError> {
        endpoint(&self.base_url, &format!("search/+ftxt-{}/", encoded_terms(pattern, "-")))
    }

    pub fn parse_listings(body: &str, page_url: &Url) -> Result<Vec<RawListing>, ScanError> {
        let page = HtmlPage::parse(body, page_url);
        let items = page.select_first_layout(&[".list li[data-ref]", "div#infosProduit"])?;
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let scripts = inline_scripts(page.document())?;

        items
            .into_iter()
            .map(|item| {
                let title = html::text_of(item, ".description h2, #description h1")?;
                let title = html::require_title(title, "HardwareFr")?;

                let url = html::attr_of(item, "a", "href")?
                    .map(|href| page.absolute_url(&href))
                    .unwrap_or_else(|| page.base_url().to_string());

                let mut listing = RawListing::new(title, url);
                match item.value().id() {
                    Some(PRODUCT_PAGE_ID) => {
                        let offer = product_metadata(page.document())?.offers;
                        listing.price_text = match offer.price {
                            serde_json::Value::String(price) => Some(price),
                            serde_json::Value::Number(price) => Some(price.to_string()),
                            _ => None,
                        };
                        listing.stock_text = offer
                            .availability
                            .rsplit('/')
                            .next()
                            .map(|state| state.to_string());
                    }
                    Some(id) => {
                        listing.price_text = script_price(&scripts, id)?;
                        listing.stock_text = script_stock(&scripts, id)?;
                    }
                    None => {}
                }
                Ok(listing)
            })
            .collect()
    }
}

/// Concatenated bodies of every script without a `src`.
fn inline_scripts(document: &Html) -> Result<String, ScanError> {
    let sel = html::selector("script")?;
    Ok(document
        .select(&sel)
        .filter(|script| script.value().attr("src").is_none())
        .flat_map(|script| script.text())
        .collect())
}

fn product_metadata(document: &Html) -> Result<ProductMetadata, ScanError> {
    let sel = html::selector(r#"script[type="application/ld+json"]"#)?;
    let script = document
        .select(&sel)
        .next()
        .ok_or_else(|| ScanError::parse("HardwareFr: product page without ld+json metadata"))?;
    let text: String = script.text().collect();
    serde_json::from_str(&text)
        .map_err(|e| ScanError::parse(format!("HardwareFr: unexpected product metadata: {}", e)))
}

fn item_regex(pattern: String) -> Result<Regex, ScanError> {
    Regex::new(&pattern).map_err(|e| ScanError::parse(format!("HardwareFr: bad item pattern: {}", e)))
}

/// The listing script swaps each item's price wrapper for a `prix` span.
fn script_price(scripts: &str, id: &str) -> Result<Option<String>, ScanError> {
    let regex = item_regex(format!(
        r#"#{}\s+\.price-wrapper.*?replaceWith\('<span class="prix">(.*?)</span>'\)"#,
        regex::escape(id)
    ))?;
    Ok(regex
        .captures(scripts)
        .map(|caps| html::element_text(Html::parse_fragment(&caps[1]).root_element()))
        .filter(|text| !text.is_empty()))
}

fn script_stock(scripts: &str, id: &str) -> Result<Option<String>, ScanError> {
    let regex = item_regex(format!(r"#{}\s+\.stock-wrapper.*?stock-([0-9])", regex::escape(id)))?;
    Ok(regex.captures(scripts).map(|caps| format!("stock-{}", &caps[1])))
}

#[async_trait]
impl ScannerPlugin for HardwareFrScanner {
    fn key(&self) -> &str {
        "hardwarefr"
    }

    fn name(&self) -> &str {
        "HardwareFr"
    }

    fn capability(&self) -> Capability {
        Capability::StockAndPrice
    }

    fn vocabulary(&self) -> StockVocabulary {
        StockVocabulary::new()
            .in_stock(&["stock-0", "stock-1", "stock-2", "instock", "onlineonly", "limitedavailability"])
            .out_of_stock(&[
                "stock-3", "stock-4", "stock-5", "stock-6", "stock-7", "stock-8", "stock-9",
                "outofstock", "soldout", "preorder", "discontinued",
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
