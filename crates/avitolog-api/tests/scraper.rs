use std::time::Duration;

use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use avitolog_api::scraper::{AdMetadata, AvitoScraper, MetadataSource, USER_AGENT};
use avitolog_types::models::DEFAULT_CATEGORY;

const LISTING: &str = r#"<html><head>
  <meta property="og:title" content="Велосипед горный">
  <meta property="og:image" content="https://img.example/bike.jpg">
  <meta itemprop="datePublished" content="2024-05-01T08:00:00+03:00">
</head><body>
  <div data-marker="breadcrumb"><a href="/">Главная</a><a href="/sport">Спорт и отдых</a></div>
</body></html>"#;

fn scraper(timeout: Duration) -> AvitoScraper {
    AvitoScraper::new(timeout).unwrap()
}

#[tokio::test]
async fn fetches_and_parses_listing_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/item_1"))
        .and(header("user-agent", USER_AGENT))
        .respond_with(ResponseTemplate::new(200).set_body_raw(LISTING, "text/html; charset=utf-8"))
        .expect(1)
        .mount(&server)
        .await;

    let meta = scraper(Duration::from_secs(5)).fetch(&format!("{}/item_1", server.uri())).await;

    assert_eq!(meta.title.as_deref(), Some("Велосипед горный"));
    assert_eq!(meta.image_url.as_deref(), Some("https://img.example/bike.jpg"));
    assert_eq!(meta.published_at.map(|d| d.to_rfc3339()), Some("2024-05-01T05:00:00+00:00".into()));
    assert_eq!(meta.category, "Спорт и отдых");
}

#[tokio::test]
async fn error_status_yields_defaults() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_raw(LISTING, "text/html"))
        .mount(&server)
        .await;

    let meta = scraper(Duration::from_secs(5)).fetch(&format!("{}/broken", server.uri())).await;
    assert_eq!(meta, AdMetadata::default());
}

#[tokio::test]
async fn slow_page_times_out_to_defaults() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(LISTING, "text/html")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let meta = scraper(Duration::from_millis(200)).fetch(&format!("{}/slow", server.uri())).await;
    assert_eq!(meta.title, None);
    assert_eq!(meta.category, DEFAULT_CATEGORY);
}

#[tokio::test]
async fn unreachable_host_yields_defaults() {
    let meta = scraper(Duration::from_secs(1)).fetch("http://127.0.0.1:9/item").await;
    assert_eq!(meta, AdMetadata::default());
}
