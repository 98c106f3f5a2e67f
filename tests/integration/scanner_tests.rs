use super::*;
use stock_scanner::models::Availability;
use stock_scanner::normalizer::Normalizer;
use stock_scanner::plugins::scanners::{HardwareFrScanner, LdlcScanner, MaterielNetScanner, NvidiaScanner};
use stock_scanner::utils::error::{FailureKind, ScanError};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, ResponseTemplate};

const MATERIELNET_LISTING: &str = r#"
    <ul class="c-products-list">
      <li class="c-products-list__item">
        <a class="c-product__link" href="/produit/202009090040.html">
          <h2 class="c-product__title">Gigabyte GeForce RTX 3090 GAMING OC</h2></a>
        <div class="o-availability" data-offer-id="AR202009090040"></div>
      </li>
      <li class="c-products-list__item">
        <a class="c-product__link" href="/produit/202009090077.html">
          <h2 class="c-product__title">Gigabyte GeForce RTX 3090 Ti GAMING OC</h2></a>
        <div class="o-availability" data-offer-id="AR202009090077"></div>
      </li>
    </ul>
"#;

const MATERIELNET_STOCK: &str = r#"{
    "stock": {
        "AR202009090040": "<span class=\"o-availability__value o-availability__value--stock_2\">Expédié sous 24h</span>"
    },
    "price": {
        "AR202009090040": "<span class=\"o-product__price\">1 599<sup>€95</sup></span>"
    }
}"#;

fn normalizer_for(scanner: &ScannerDescriptor) -> Normalizer {
    Normalizer::new().with_store(scanner.key(), scanner.store_rules())
}

#[tokio::test]
async fn test_ldlc_scan_end_to_end() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/recherche/rtx+3080/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(LDLC_LISTING_RESTOCKED))
        .expect(1)
        .mount(&server)
        .await;

    let scanner = ScannerDescriptor::new(LdlcScanner::with_base_url(server_url(&server)));
    let fetcher = HttpFetcher::new(get_test_scraper_config())?;
    let pattern = test_pattern("rtx 3080");

    let records = scanner.scan(&fetcher, &pattern, &normalizer_for(&scanner)).await?;

    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.store_key, "ldlc");
    assert_eq!(record.availability, Availability::InStock);
    assert_eq!(record.price.as_ref().map(|p| p.to_string()).as_deref(), Some("869.95 EUR"));
    assert_eq!(record.url, format!("{}/fiche/PB00394561.html", server.uri()));
    assert_eq!(record.identity_key(), "ldlc:gigabytegeforcertx3080gamingoc");

    Ok(())
}

#[tokio::test]
async fn test_pattern_filters_unrelated_listings() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/recherche/rtx+3080/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(LDLC_LISTING))
        .expect(1)
        .mount(&server)
        .await;

    let scanner = ScannerDescriptor::new(LdlcScanner::with_base_url(server_url(&server)));
    let fetcher = HttpFetcher::new(get_test_scraper_config())?;
    let pattern = test_pattern("rtx 3080 -gaming");

    // Exclusions stay out of the store query; the listing is dropped locally.
    let records = scanner.scan(&fetcher, &pattern, &normalizer_for(&scanner)).await?;
    assert!(records.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_empty_listing_page_is_not_an_error() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/recherche/rtx+3080/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body>Aucun résultat</body></html>"))
        .mount(&server)
        .await;

    let scanner = ScannerDescriptor::new(LdlcScanner::with_base_url(server_url(&server)));
    let fetcher = HttpFetcher::new(get_test_scraper_config())?;

    let records = scanner
        .scan(&fetcher, &test_pattern("rtx 3080"), &normalizer_for(&scanner))
        .await?;
    assert!(records.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_listing_without_title_is_parse_error() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/recherche/rtx+3080/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<div class="listing-product"><ul><li class="pdt-item"><div class="price">869€95</div></li></ul></div>"#,
        ))
        .mount(&server)
        .await;

    let scanner = ScannerDescriptor::new(LdlcScanner::with_base_url(server_url(&server)));
    let fetcher = HttpFetcher::new(get_test_scraper_config())?;

    let result = scanner
        .scan(&fetcher, &test_pattern("rtx 3080"), &normalizer_for(&scanner))
        .await;
    assert!(matches!(result, Err(ScanError::Parse { .. })));

    Ok(())
}

#[tokio::test]
async fn test_server_error_is_fetch_error() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let scanner = ScannerDescriptor::new(NvidiaScanner::with_base_url(server_url(&server)));
    let fetcher = HttpFetcher::new(get_test_scraper_config())?;

    let err = scanner
        .scan(&fetcher, &test_pattern("rtx 3080"), &normalizer_for(&scanner))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::Fetch);
    assert!(err.is_transient());
    assert!(err.to_string().contains("503"));

    Ok(())
}

#[tokio::test]
async fn test_json_missing_keys_is_parse_error() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/edge/product/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"products": []}"#))
        .mount(&server)
        .await;

    let scanner = ScannerDescriptor::new(NvidiaScanner::with_base_url(server_url(&server)));
    let fetcher = HttpFetcher::new(get_test_scraper_config())?;

    let err = scanner
        .scan(&fetcher, &test_pattern("rtx 3080"), &normalizer_for(&scanner))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::Parse);
    assert!(!err.is_transient());

    Ok(())
}

#[tokio::test]
async fn test_materielnet_two_step_fetch() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/recherche/rtx+3090/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(MATERIELNET_LISTING))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/product-listing/stock-price/"))
        .and(header("x-requested-with", "XMLHttpRequest"))
        .and(body_string_contains("AR202009090040"))
        .respond_with(ResponseTemplate::new(200).set_body_string(MATERIELNET_STOCK))
        .expect(1)
        .mount(&server)
        .await;

    let scanner = ScannerDescriptor::new(MaterielNetScanner::with_base_url(server_url(&server)));
    let fetcher = HttpFetcher::new(get_test_scraper_config())?;

    let records = scanner
        .scan(&fetcher, &test_pattern("rtx 3090 -ti"), &normalizer_for(&scanner))
        .await?;

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].title, "Gigabyte GeForce RTX 3090 GAMING OC");
    assert_eq!(records[0].availability, Availability::InStock);
    assert_eq!(records[0].price.as_ref().map(|p| p.to_string()).as_deref(), Some("1599.95 EUR"));

    // Only offers that pass the pattern are sent to the stock endpoint.
    let requests = server.received_requests().await.unwrap_or_default();
    let stock_query = requests
        .iter()
        .find(|r| r.url.path() == "/product-listing/stock-price/")
        .map(|r| String::from_utf8_lossy(&r.body).into_owned())
        .unwrap_or_default();
    assert!(stock_query.contains("AR202009090040"));
    assert!(!stock_query.contains("AR202009090077"));

    Ok(())
}

#[tokio::test]
async fn test_hardwarefr_product_page() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/+ftxt-rtx-3080/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><head><script type="application/ld+json">
                {"name": "ASUS TUF RTX 3080 OC",
                 "offers": {"price": 899.95, "availability": "http://schema.org/InStock"}}
            </script></head><body>
            <div id="infosProduit"><div id="description"><h1>ASUS TUF RTX 3080 OC</h1></div></div>
            </body></html>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let scanner = ScannerDescriptor::new(HardwareFrScanner::with_base_url(server_url(&server)));
    let fetcher = HttpFetcher::new(get_test_scraper_config())?;

    let records = scanner
        .scan(&fetcher, &test_pattern("rtx 3080"), &normalizer_for(&scanner))
        .await?;

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].availability, Availability::InStock);
    assert_eq!(records[0].price.as_ref().map(|p| p.to_string()).as_deref(), Some("899.95 EUR"));

    Ok(())
}
