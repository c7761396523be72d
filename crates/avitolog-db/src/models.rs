//! Database row types. These map directly to stored records and are shared
//! by both ad store implementations. Distinct from avitolog-types API models
//! to keep the storage layer independent of the wire format.

use avitolog_types::models::AdSort;
use chrono::{DateTime, Utc};

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub password: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ad {
    pub id: String,
    pub source_url: String,
    pub title: Option<String>,
    pub image_url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub category: String,
    pub view_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields of an ad about to be created on first resolve.
#[derive(Debug, Clone)]
pub struct NewAd {
    pub source_url: String,
    pub title: Option<String>,
    pub image_url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub category: String,
}

#[derive(Debug, Clone)]
pub struct CommentRow {
    pub id: String,
    pub ad_id: String,
    pub author_id: String,
    pub author_username: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Key used for case-insensitive category comparison.
pub fn category_key(category: &str) -> String {
    category.trim().to_lowercase()
}

/// Parsed listing request shared by both store implementations.
#[derive(Debug, Clone)]
pub struct AdQuery {
    pub sort: AdSort,
    /// Normalized category key, `None` for "no filter".
    pub category: Option<String>,
    pub limit: u32,
    pub offset: u32,
}

impl AdQuery {
    pub fn new(sort: AdSort, category: Option<&str>, limit: u32, offset: u32) -> Self {
        Self {
            sort,
            category: category_filter(category),
            limit,
            offset,
        }
    }
}

impl Default for AdQuery {
    fn default() -> Self {
        Self::new(AdSort::Popular, None, 20, 0)
    }
}

/// Blank, "все" and "all" mean no category filter.
pub fn category_filter(raw: Option<&str>) -> Option<String> {
    let key = category_key(raw?);
    match key.as_str() {
        "" | "все" | "all" => None,
        _ => Some(key),
    }
}

#[derive(Debug, Clone)]
pub struct AdPage {
    pub total: u64,
    pub items: Vec<Ad>,
}
