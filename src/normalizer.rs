use chrono::{DateTime, Utc};
use regex::Regex;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::models::{Availability, Price, ProductRecord, RawListing};

pub const DEFAULT_CURRENCY: &str = "EUR";

static NUMBER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d[\d\s.,']*\d|\d").expect("number regex is valid"));

// "599€95": French listings use the currency sign as the decimal separator.
static SYMBOL_DECIMAL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d)\s*[€$£]\s*(\d{2})(\D|$)").expect("symbol decimal regex is valid"));

// "1.299,-" means no cents.
static DASH_CENTS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([.,])-+").expect("dash cents regex is valid"));

/// Per-store words for stock states, e.g. "en stock" or "stock-1".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StockVocabulary {
    entries: Vec<(String, Availability)>,
}

impl StockVocabulary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_stock(self, words: &[&str]) -> Self {
        self.with(words, Availability::InStock)
    }

    pub fn out_of_stock(self, words: &[&str]) -> Self {
        self.with(words, Availability::OutOfStock)
    }

    fn with(mut self, words: &[&str], availability: Availability) -> Self {
        self.entries
            .extend(words.iter().map(|w| (normalize_text(w), availability)));
        // Longest first so prefix matching prefers the most specific entry.
        self.entries.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        self
    }

    /// Exact match, then the longest entry that prefixes the text at a word
    /// boundary. Anything else is `Unknown`.
    pub fn classify(&self, text: &str) -> Availability {
        let text = normalize_text(text);
        if text.is_empty() {
            return Availability::Unknown;
        }

        if let Some((_, availability)) = self.entries.iter().find(|(word, _)| *word == text) {
            return *availability;
        }

        self.entries
            .iter()
            .find(|(word, _)| {
                text.strip_prefix(word.as_str())
                    .and_then(|rest| rest.chars().next())
                    .is_some_and(|c| !c.is_alphanumeric())
            })
            .map(|(_, availability)| *availability)
            .unwrap_or(Availability::Unknown)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct StoreRules {
    pub vocabulary: StockVocabulary,
    pub default_currency: String,
}

impl Default for StoreRules {
    fn default() -> Self {
        Self {
            vocabulary: StockVocabulary::new(),
            default_currency: DEFAULT_CURRENCY.to_string(),
        }
    }
}

/// Maps raw store fields into the common `ProductRecord` shape.
#[derive(Debug, Clone)]
pub struct Normalizer {
    rules: HashMap<String, StoreRules>,
    currency_symbols: Vec<(String, String)>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer {
    pub fn new() -> Self {
        let mut currency_symbols: Vec<(String, String)> = [
            ("US$", "USD"),
            ("USD", "USD"),
            ("$", "USD"),
            ("EUR", "EUR"),
            ("€", "EUR"),
            ("GBP", "GBP"),
            ("£", "GBP"),
            ("CHF", "CHF"),
            ("¥", "JPY"),
        ]
        .iter()
        .map(|(symbol, code)| (symbol.to_string(), code.to_string()))
        .collect();
        // Check longer currency symbols first (US$ before $)
        currency_symbols.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

        Self {
            rules: HashMap::new(),
            currency_symbols,
        }
    }

    pub fn register_store(&mut self, store_key: &str, rules: StoreRules) {
        self.rules.insert(store_key.to_string(), rules);
    }

    pub fn with_store(mut self, store_key: &str, rules: StoreRules) -> Self {
        self.register_store(store_key, rules);
        self
    }

    pub fn normalize(&self, store_key: &str, raw: RawListing) -> ProductRecord {
        self.normalize_at(store_key, raw, Utc::now())
    }

    pub fn normalize_at(
        &self,
        store_key: &str,
        raw: RawListing,
        observed_at: DateTime<Utc>,
    ) -> ProductRecord {
        let default_rules = StoreRules::default();
        let rules = self.rules.get(store_key).unwrap_or(&default_rules);

        let availability = raw
            .stock_text
            .as_deref()
            .map(|text| rules.vocabulary.classify(text))
            .unwrap_or(Availability::Unknown);

        let price = raw
            .price_text
            .as_deref()
            .and_then(|text| self.parse_price(text, &rules.default_currency));

        ProductRecord {
            store_key: store_key.to_string(),
            title: collapse_whitespace(&raw.title),
            availability,
            price,
            url: raw.url,
            observed_at,
        }
    }

    /// Parse a displayed price. Returns `None` when the text has no amount or
    /// holds more than one distinct amount.
    pub fn parse_price(&self, text: &str, default_currency: &str) -> Option<Price> {
        let text = text.replace(['\u{a0}', '\u{202f}'], " ");

        let currency = self
            .extract_currency(&text)
            .unwrap_or_else(|| default_currency.to_string());

        let text = SYMBOL_DECIMAL_REGEX.replace_all(&text, "${1}.${2}${3}");
        let text = DASH_CENTS_REGEX.replace_all(&text, "${1}00");

        let mut amounts: Vec<Decimal> = Vec::new();
        for m in NUMBER_REGEX.find_iter(&text) {
            let amount = parse_amount(m.as_str())?;
            if !amounts.contains(&amount) {
                amounts.push(amount);
            }
        }

        match amounts.as_slice() {
            [amount] => Some(Price::new(*amount, currency)),
            _ => None,
        }
    }

    fn extract_currency(&self, text: &str) -> Option<String> {
        self.currency_symbols
            .iter()
            .find(|(symbol, _)| text.contains(symbol.as_str()))
            .map(|(_, code)| code.clone())
    }
}

/// Decide which of `,` and `.` is the decimal separator and parse.
fn parse_amount(number: &str) -> Option<Decimal> {
    let digits: String = number
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\'')
        .collect();

    let canonical = match (digits.rfind(','), digits.rfind('.')) {
        (Some(comma), Some(dot)) => {
            if comma > dot {
                digits.replace('.', "").replace(',', ".")
            } else {
                digits.replace(',', "")
            }
        }
        (Some(_), None) => single_separator(&digits, ',')?,
        (None, Some(_)) => single_separator(&digits, '.')?,
        (None, None) => digits,
    };

    Decimal::from_str(&canonical).ok()
}

fn single_separator(digits: &str, separator: char) -> Option<String> {
    let parts: Vec<&str> = digits.split(separator).collect();
    match parts.as_slice() {
        [whole, fraction] if !fraction.is_empty() && fraction.len() <= 2 => {
            Some(format!("{}.{}", whole, fraction))
        }
        [_, groups @ ..] if groups.iter().all(|g| g.len() == 3) => Some(parts.concat()),
        _ => None,
    }
}

fn normalize_text(text: &str) -> String {
    collapse_whitespace(text).to_lowercase()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
