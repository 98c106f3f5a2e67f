//! Helpers for pulling listing fields out of store HTML with `scraper`.
//!
//! `scraper::Html` is not `Send`, so pages are parsed and dropped inside
//! synchronous functions; nothing here may be held across an `.await`.

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::utils::error::ScanError;

pub fn selector(css: &str) -> Result<Selector, ScanError> {
    Selector::parse(css).map_err(|e| ScanError::parse(format!("invalid selector '{}': {:?}", css, e)))
}

pub struct HtmlPage {
    document: Html,
    base_url: Url,
}

impl HtmlPage {
    pub fn parse(body: &str, base_url: &Url) -> Self {
        Self {
            document: Html::parse_document(body),
            base_url: base_url.clone(),
        }
    }

    /// Elements matching the first of `alternatives` that matches anything.
    /// Stores serve different layouts for listing and single-product pages.
    pub fn select_first_layout(&self, alternatives: &[&str]) -> Result<Vec<ElementRef<'_>>, ScanError> {
        for css in alternatives {
            let sel = selector(css)?;
            let found: Vec<_> = self.document.select(&sel).collect();
            if !found.is_empty() {
                return Ok(found);
            }
        }
        Ok(Vec::new())
    }

    pub fn document(&self) -> &Html {
        &self.document
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve a possibly relative link against the page URL.
    pub fn absolute_url(&self, href: &str) -> String {
        self.base_url
            .join(href)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| self.base_url.to_string())
    }
}

pub fn first<'a>(element: ElementRef<'a>, css: &str) -> Result<Option<ElementRef<'a>>, ScanError> {
    let sel = selector(css)?;
    Ok(element.select(&sel).next())
}

/// Whitespace-collapsed text of the first match, if any and non-empty.
pub fn text_of(element: ElementRef<'_>, css: &str) -> Result<Option<String>, ScanError> {
    Ok(first(element, css)?.map(element_text).filter(|t| !t.is_empty()))
}

pub fn attr_of(element: ElementRef<'_>, css: &str, attr: &str) -> Result<Option<String>, ScanError> {
    Ok(first(element, css)?
        .and_then(|e| e.value().attr(attr))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty()))
}

pub fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(|t| t.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Title is mandatory: a listing without one means the layout changed.
pub fn require_title(title: Option<String>, store: &str) -> Result<String, ScanError> {
    title.ok_or_else(|| ScanError::parse(format!("{}: listing without a title", store)))
}

/// First class on the element or its descendants that starts with one of
/// `prefixes`, e.g. `stock-1` for prefix `stock-`.
pub fn class_with_prefix(element: ElementRef<'_>, prefixes: &[&str]) -> Option<String> {
    std::iter::once(element)
        .chain(element.descendants().filter_map(ElementRef::wrap))
        .flat_map(|e| e.value().classes())
        .find(|class| prefixes.iter().any(|p| class.starts_with(p)))
        .map(|class| class.to_string())
}
