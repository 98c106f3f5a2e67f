use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use super::{endpoint, static_url};
use crate::fetcher::{FetchRequest, HttpFetcher};
use crate::html;
use crate::models::{RawListing, SearchPattern};
use crate::normalizer::StockVocabulary;
use crate::plugins::traits::{Capability, ScannerPlugin};
use crate::utils::error::ScanError;

const SEARCH_PATH: &str = "edge/product/search?page=1&limit=9&locale=fr-fr&manufacturer=NVIDIA";
const USER_URL: &str =
    "https://www.nvidia.com/fr-fr/shop/geforce/?page=1&limit=9&locale=fr-fr&manufacturer=NVIDIA";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    searched_products: SearchedProducts,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchedProducts {
    product_details: Vec<NvidiaProduct>,
    #[serde(default)]
    featured_product: Option<NvidiaProduct>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NvidiaProduct {
    product_title: Option<String>,
    product_price: Option<String>,
    prd_status: Option<String>,
    #[serde(default)]
    retailers: Vec<Retailer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Retailer {
    direct_purchase_link: Option<String>,
}

/// Founders Edition cards from the NVIDIA partner store API.
pub struct NvidiaScanner {
    base_url: Url,
}

impl Default for NvidiaScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl NvidiaScanner {
    pub fn new() -> Self {
        Self::with_base_url(static_url("https://api.nvidia.partners/"))
    }

    pub fn with_base_url(base_url: Url) -> Self {
        Self { base_url }
    }

    pub fn parse_listings(body: &str) -> Result<Vec<RawListing>, ScanError> {
        let response: SearchResponse = serde_json::from_str(body)
            .map_err(|e| ScanError::parse(format!("unexpected NVIDIA search response: {}", e)))?;
        let products = response.searched_products;

        products
            .product_details
            .into_iter()
            .chain(products.featured_product)
            .map(|product| {
                let title = html::require_title(product.product_title, "Nvidia")?;
                let url = product
                    .retailers
                    .into_iter()
                    .next()
                    .and_then(|r| r.direct_purchase_link)
                    .unwrap_or_else(|| USER_URL.to_string());

                let mut listing = RawListing::new(title, url);
                listing.price_text = product.product_price;
                listing.stock_text = product.prd_status;
                Ok(listing)
            })
            .collect()
    }
}

#[async_trait]
impl ScannerPlugin for NvidiaScanner {
    fn key(&self) -> &str {
        "nvidia"
    }

    fn name(&self) -> &str {
        "Nvidia"
    }

    fn capability(&self) -> Capability {
        Capability::StockAndPrice
    }

    fn vocabulary(&self) -> StockVocabulary {
        StockVocabulary::new()
            .in_stock(&["buy_now", "in_stock", "available"])
            .out_of_stock(&["out_of_stock", "check_availability"])
    }

    fn user_url(&self, _pattern: &SearchPattern) -> String {
        USER_URL.to_string()
    }

    async fn fetch_listings(
        &self,
        fetcher: &HttpFetcher,
        _pattern: &SearchPattern,
    ) -> Result<Vec<RawListing>, ScanError> {
        let request = FetchRequest::get(endpoint(&self.base_url, SEARCH_PATH)?)
            .header("accept", "application/json,text/plain,*/*");
        let body = fetcher.fetch_text(&request).await?;
        Self::parse_listings(&body)
    }
}
