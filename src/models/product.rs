use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Availability {
    InStock,
    OutOfStock,
    Unknown,
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Availability::InStock => write!(f, "IN_STOCK"),
            Availability::OutOfStock => write!(f, "OUT_OF_STOCK"),
            Availability::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Price {
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
    pub currency: String,
}

impl Price {
    pub fn new(amount: Decimal, currency: impl Into<String>) -> Self {
        Self {
            amount,
            currency: currency.into(),
        }
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}

/// Fields a scanner pulled out of a store page, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawListing {
    pub title: String,
    pub price_text: Option<String>,
    pub stock_text: Option<String>,
    pub url: String,
}

impl RawListing {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_price(mut self, price_text: impl Into<String>) -> Self {
        self.price_text = Some(price_text.into());
        self
    }

    pub fn with_stock(mut self, stock_text: impl Into<String>) -> Self {
        self.stock_text = Some(stock_text.into());
        self
    }
}

/// Normalized product observation. A fresh record is produced every cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductRecord {
    pub store_key: String,
    pub title: String,
    pub availability: Availability,
    pub price: Option<Price>,
    pub url: String,
    pub observed_at: DateTime<Utc>,
}

impl ProductRecord {
    /// Stable key correlating this product across cycles.
    pub fn identity_key(&self) -> String {
        identity_key(&self.store_key, &self.title)
    }

    pub fn is_in_stock(&self) -> bool {
        self.availability == Availability::InStock
    }
}

/// `"{store}:{title}"` with the title lowercased and stripped to
/// alphanumerics, so cosmetic spacing and punctuation changes keep the key.
pub fn identity_key(store_key: &str, title: &str) -> String {
    let normalized: String = title
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect();
    format!("{}:{}", store_key, normalized)
}
