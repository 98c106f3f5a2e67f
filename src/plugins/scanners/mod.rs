pub mod alternate;
pub mod amd;
pub mod caseking;
pub mod cybertek;
pub mod dummy;
pub mod grosbill;
pub mod hardwarefr;
pub mod ldlc;
pub mod materielnet;
pub mod nvidia;
pub mod rueducommerce;
pub mod topachat;

pub use alternate::AlternateScanner;
pub use amd::AmdScanner;
pub use caseking::CaseKingScanner;
pub use cybertek::CybertekScanner;
pub use dummy::{DummyOutcome, DummyScanner};
pub use grosbill::GrosBillScanner;
pub use hardwarefr::HardwareFrScanner;
pub use ldlc::LdlcScanner;
pub use materielnet::MaterielNetScanner;
pub use nvidia::NvidiaScanner;
pub use rueducommerce::RueDuCommerceScanner;
pub use topachat::TopAchatScanner;

use url::{Url, form_urlencoded};

use crate::models::SearchPattern;
use crate::utils::error::ScanError;

/// Parse a compiled-in store URL.
pub(crate) fn static_url(url: &str) -> Url {
    Url::parse(url).expect("store base URL is valid")
}

/// Resolve `path` (which may carry a query string) against a store's base URL.
pub(crate) fn endpoint(base: &Url, path: &str) -> Result<Url, ScanError> {
    base.join(path)
        .map_err(|e| ScanError::fetch(base.as_str(), format!("invalid URL path '{}': {}", path, e)))
}

/// Keywords percent-encoded one by one and joined with `separator`, for
/// stores that take the query as a path segment.
pub(crate) fn encoded_terms(pattern: &SearchPattern, separator: &str) -> String {
    pattern
        .keywords()
        .iter()
        .map(|k| form_urlencoded::byte_serialize(k.as_bytes()).collect::<String>())
        .collect::<Vec<_>>()
        .join(separator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MatchPolicy;

    #[test]
    fn test_encoded_terms() {
        let pattern = SearchPattern::parse("RTX 3080 a&b", MatchPolicy::Keywords).unwrap();
        assert_eq!(encoded_terms(&pattern, "+"), "rtx+3080+a%26b");
    }

    #[test]
    fn test_endpoint_keeps_query() {
        let base = static_url("http://127.0.0.1:8080");
        let url = endpoint(&base, "edge/product/search?page=1").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8080/edge/product/search?page=1");
    }
}
