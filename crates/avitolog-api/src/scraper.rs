//! Best-effort metadata extraction from a marketplace listing page.
//!
//! Any failure (transport, HTTP status, unexpected markup) produces
//! [`AdMetadata::default`]; resolving an ad never fails because of the
//! remote page.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use reqwest::redirect::Policy;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use avitolog_types::models::DEFAULT_CATEGORY;

pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdMetadata {
    pub title: Option<String>,
    pub image_url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub category: String,
}

impl Default for AdMetadata {
    fn default() -> Self {
        Self {
            title: None,
            image_url: None,
            published_at: None,
            category: DEFAULT_CATEGORY.to_string(),
        }
    }
}

#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Never fails: unreachable or unparseable pages yield defaults.
    async fn fetch(&self, url: &str) -> AdMetadata;
}

pub struct AvitoScraper {
    client: reqwest::Client,
}

impl AvitoScraper {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .redirect(Policy::limited(10))
            .build()?;
        Ok(Self { client })
    }

    async fn fetch_page(&self, url: &str) -> reqwest::Result<String> {
        self.client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }
}

#[async_trait]
impl MetadataSource for AvitoScraper {
    async fn fetch(&self, url: &str) -> AdMetadata {
        match self.fetch_page(url).await {
            Ok(html) => {
                let meta = parse_page(&html);
                debug!("Fetched metadata for {}: {:?}", url, meta);
                meta
            }
            Err(e) => {
                warn!("Metadata fetch failed for {}: {}", url, e);
                AdMetadata::default()
            }
        }
    }
}

const PUBLISHED_SOURCES: &[(&str, &str)] = &[
    (r#"meta[itemprop="datePublished"]"#, "content"),
    (r#"meta[property="article:published_time"]"#, "content"),
    (r#"meta[name="date"]"#, "content"),
    (r#"time[itemprop="datePublished"]"#, "datetime"),
];

pub fn parse_page(html: &str) -> AdMetadata {
    let doc = Html::parse_document(html);

    let title = attr_of(&doc, r#"meta[property="og:title"]"#, "content")
        .or_else(|| select_first(&doc, "title").map(|el| el.text().collect()))
        .map(|t| normalize_space(&t))
        .filter(|t| !t.is_empty());

    let image_url = attr_of(&doc, r#"meta[property="og:image"]"#, "content")
        .or_else(|| {
            let img = select_first(&doc, r#"img[itemprop="image"]"#).or_else(|| select_first(&doc, "img"))?;
            ["src", "data-src"]
                .iter()
                .find_map(|name| img.value().attr(name).map(str::trim).filter(|v| !v.is_empty()))
                .map(str::to_string)
        });

    let published_at = PUBLISHED_SOURCES
        .iter()
        .filter_map(|(css, attr)| attr_of(&doc, css, attr))
        .find_map(|value| parse_datetime(&value));

    let category = breadcrumb_category(&doc)
        .or_else(|| attr_of(&doc, r#"meta[property="og:type"]"#, "content").map(|c| normalize_space(&c)))
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());

    AdMetadata {
        title,
        image_url,
        published_at,
        category,
    }
}

fn breadcrumb_category(doc: &Html) -> Option<String> {
    let breadcrumb = select_first(doc, r#"[data-marker="breadcrumb"]"#)?;
    let links = Selector::parse("a").ok()?;
    let last = breadcrumb.select(&links).last()?;
    Some(normalize_space(&last.text().collect::<String>()))
}

fn select_first<'a>(doc: &'a Html, css: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(css).ok()?;
    doc.select(&selector).next()
}

/// Trimmed, non-empty attribute of the first element matching `css`.
fn attr_of(doc: &Html, css: &str, attr: &str) -> Option<String> {
    select_first(doc, css)?
        .value()
        .attr(attr)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn normalize_space(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
];

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%d.%m.%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y"];

/// Parse the date formats seen on listing pages. Values without an offset
/// are taken as UTC.
pub fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    let v = value.trim();
    if v.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(v) {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(v, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(v, fmt) {
            return Some(ndt.and_utc());
        }
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(v, fmt).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|ndt| ndt.and_utc())
}
