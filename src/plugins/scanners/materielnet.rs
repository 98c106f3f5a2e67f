use async_trait::async_trait;
use regex::Regex;
use scraper::Html;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::LazyLock;
use url::Url;

use super::{encoded_terms, endpoint, static_url};
use crate::fetcher::{FetchRequest, HttpFetcher};
use crate::html::{self, HtmlPage};
use crate::models::{RawListing, SearchPattern};
use crate::normalizer::StockVocabulary;
use crate::plugins::traits::{Capability, ScannerPlugin};
use crate::utils::error::ScanError;

static STOCK_LEVEL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"o-availability__value--stock_([0-9])").expect("stock level regex is valid")
});

/// Listing entry waiting for its stock and price, keyed by offer id.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingOffer {
    pub offer_id: String,
    pub listing: RawListing,
}

#[derive(Debug, Deserialize)]
struct StockPriceResponse {
    stock: HashMap<String, String>,
    #[serde(default)]
    price: HashMap<String, String>,
}

/// Materiel.net renders listings without availability; stock and price
/// come from a second request keyed by the offer ids on the page.
pub struct MaterielNetScanner {
    base_url: Url,
}

impl Default for MaterielNetScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl MaterielNetScanner {
    pub fn new() -> Self {
        Self::with_base_url(static_url("https://www.materiel.net/"))
    }

    pub fn with_base_url(base_url: Url) -> Self {
        Self { base_url }
    }

    fn search_url(&self, pattern: &SearchPattern) -> Result<Url, ScanError> {
        endpoint(&self.base_url, &format!("recherche/{}/", encoded_terms(pattern, "+")))
    }

    fn stock_request(&self, offers: &[PendingOffer]) -> Result<FetchRequest, ScanError> {
        let query = json!({
            "currencyISOCode3": "EUR",
            "offers": offers
                .iter()
                .map(|o| json!({"offerId": o.offer_id, "marketplace": false}))
                .collect::<Vec<_>>(),
            "shops": [{"shopId": -1}],
        });

        let url = endpoint(&self.base_url, "product-listing/stock-price/")?;
        Ok(FetchRequest::post_form(url, vec![("json".to_string(), query.to_string())])
            .header("x-requested-with", "XMLHttpRequest"))
    }

    pub fn parse_offers(body: &str, page_url: &Url) -> Result<Vec<PendingOffer>, ScanError> {
        let page = HtmlPage::parse(body, page_url);
        let items = page.select_first_layout(&[
            "ul.c-products-list li.c-products-list__item",
            "#tpl__product-page",
        ])?;

        items
            .into_iter()
            .map(|item| {
                let title = html::text_of(item, ".c-product__title, .c-product__header h1")?;
                let title = html::require_title(title, "MaterielNet")?;

                let offer_id = html::attr_of(item, "[data-offer-id]", "data-offer-id")?
                    .ok_or_else(|| ScanError::parse(format!("MaterielNet: no offer id for '{}'", title)))?;

                let url = html::attr_of(item, "a.c-product__link", "href")?
                    .map(|href| page.absolute_url(&href))
                    .unwrap_or_else(|| page.base_url().to_string());

                Ok(PendingOffer {
                    offer_id,
                    listing: RawListing::new(title, url),
                })
            })
            .collect()
    }

    /// Fill stock and price from the stock-price response. Offers the
    /// response does not mention keep no stock text.
    pub fn merge_stock_prices(
        offers: Vec<PendingOffer>,
        body: &str,
    ) -> Result<Vec<RawListing>, ScanError> {
        let response: StockPriceResponse = serde_json::from_str(body)
            .map_err(|e| ScanError::parse(format!("unexpected MaterielNet stock response: {}", e)))?;

        Ok(offers
            .into_iter()
            .map(|offer| {
                let mut listing = offer.listing;
                listing.stock_text = response
                    .stock
                    .get(&offer.offer_id)
                    .and_then(|snippet| STOCK_LEVEL_REGEX.captures(snippet))
                    .map(|caps| format!("stock_{}", &caps[1]));
                listing.price_text = response
                    .price
                    .get(&offer.offer_id)
                    .map(|snippet| fragment_text(snippet))
                    .filter(|text| !text.is_empty());
                listing
            })
            .collect())
    }
}

fn fragment_text(snippet: &str) -> String {
    let fragment = Html::parse_fragment(snippet);
    html::element_text(fragment.root_element())
}

#[async_trait]
impl ScannerPlugin for MaterielNetScanner {
    fn key(&self) -> &str {
        "materielnet"
    }

    fn name(&self) -> &str {
        "MaterielNet"
    }

    fn capability(&self) -> Capability {
        Capability::StockAndPrice
    }

    fn vocabulary(&self) -> StockVocabulary {
        StockVocabulary::new()
            .in_stock(&["stock_1", "stock_2"])
            .out_of_stock(&[
                "stock_0", "stock_3", "stock_4", "stock_5", "stock_6", "stock_7", "stock_8", "stock_9",
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
        let offers: Vec<PendingOffer> = Self::parse_offers(&body, &request.url)?
            .into_iter()
            .filter(|offer| pattern.matches(&offer.listing.title))
            .collect();
        if offers.is_empty() {
            return Ok(Vec::new());
        }

        let stock_body = fetcher.fetch_text(&self.stock_request(&offers)?).await?;
        Self::merge_stock_prices(offers, &stock_body)
    }
}
