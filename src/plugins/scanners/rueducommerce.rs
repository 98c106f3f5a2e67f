use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use super::{encoded_terms, endpoint, static_url};
use crate::fetcher::{FetchRequest, HttpFetcher};
use crate::html;
use crate::models::{RawListing, SearchPattern};
use crate::normalizer::StockVocabulary;
use crate::plugins::traits::{Capability, ScannerPlugin};
use crate::utils::error::ScanError;

/// Offers sold by the store itself; everything else is marketplace.
const OWN_SHOP: &str = "Rue du Commerce";

#[derive(Debug, Deserialize)]
struct ListingResponse {
    produits: Vec<RdcProduct>,
}

#[derive(Debug, Deserialize)]
struct RdcProduct {
    fournisseur_nom: Option<String>,
    produit_nom_nom: Option<String>,
    #[serde(default)]
    produit_prix_ttc: Option<serde_json::Value>,
    #[serde(rename = "Disponibilite")]
    disponibilite: Option<String>,
    shop_name: Option<String>,
}

pub struct RueDuCommerceScanner {
    base_url: Url,
}

impl Default for RueDuCommerceScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl RueDuCommerceScanner {
    pub fn new() -> Self {
        Self::with_base_url(static_url("https://www.rueducommerce.fr/"))
    }

    pub fn with_base_url(base_url: Url) -> Self {
        Self { base_url }
    }

    fn api_url(&self, pattern: &SearchPattern) -> Result<Url, ScanError> {
        let mut url = endpoint(&self.base_url, "listingDyn")?;
        url.query_pairs_mut()
            .append_pair("boutique_id", "18")
            .append_pair("langue_id", "1")
            .append_pair("recherche", &pattern.query("-"))
            .append_pair("from", "0");
        Ok(url)
    }

    pub fn parse_listings(body: &str, user_url: &str) -> Result<Vec<RawListing>, ScanError> {
        let response: ListingResponse = serde_json::from_str(body)
            .map_err(|e| ScanError::parse(format!("unexpected RueDuCommerce listing: {}", e)))?;

        let mut listings = Vec::new();
        for product in response.produits {
            if product.shop_name.as_deref() != Some(OWN_SHOP) {
                tracing::trace!(shop = ?product.shop_name, "skipping marketplace offer");
                continue;
            }

            let name = html::require_title(product.produit_nom_nom, "RueDuCommerce")?;
            let title = match product.fournisseur_nom {
                Some(brand) if !brand.trim().is_empty() => format!("{} - {}", brand.trim(), name),
                _ => name,
            };

            let price = product.produit_prix_ttc.and_then(|v| match v {
                serde_json::Value::String(s) => Some(s),
                serde_json::Value::Number(n) => Some(n.to_string()),
                _ => None,
            });

            let mut listing = RawListing::new(title, user_url);
            listing.price_text = price;
            listing.stock_text = product.disponibilite;
            listings.push(listing);
        }
        Ok(listings)
    }
}

#[async_trait]
impl ScannerPlugin for RueDuCommerceScanner {
    fn key(&self) -> &str {
        "rueducommerce"
    }

    fn name(&self) -> &str {
        "RueDuCommerce"
    }

    fn capability(&self) -> Capability {
        Capability::StockAndPrice
    }

    fn vocabulary(&self) -> StockVocabulary {
        StockVocabulary::new()
            .in_stock(&["en stock"])
            .out_of_stock(&["rupture", "rupture de stock", "épuisé", "indisponible"])
    }

    fn user_url(&self, pattern: &SearchPattern) -> String {
        endpoint(&self.base_url, &format!("r/{}.html", encoded_terms(pattern, "-")))
            .map(|u| u.to_string())
            .unwrap_or_else(|_| self.base_url.to_string())
    }

    async fn fetch_listings(
        &self,
        fetcher: &HttpFetcher,
        pattern: &SearchPattern,
    ) -> Result<Vec<RawListing>, ScanError> {
        let request = FetchRequest::get(self.api_url(pattern)?);
        let body = fetcher.fetch_text(&request).await?;
        Self::parse_listings(&body, &self.user_url(pattern))
    }
}
