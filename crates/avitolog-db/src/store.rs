use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row};
use uuid::Uuid;

use avitolog_types::models::AdSort;

use crate::models::{Ad, AdPage, AdQuery, NewAd, category_key};
use crate::{Database, format_ts, now, parse_ts};

/// Storage for mirrored ads, keyed by id and unique on source URL.
///
/// Implemented by [`Database`] (the `ads` table) and by
/// [`MemoryAdStore`](crate::MemoryAdStore). Both give the same results for
/// the same sequence of calls.
pub trait AdStore: Send + Sync {
    /// Filter, sort and paginate. `total` counts matches before pagination.
    fn list(&self, query: &AdQuery) -> Result<AdPage>;

    fn find_by_url(&self, source_url: &str) -> Result<Option<Ad>>;

    /// Find-or-create on `source_url`. The flag is `true` when this call
    /// created the ad, `false` when one already existed.
    fn insert_if_absent(&self, new: NewAd) -> Result<(Ad, bool)>;

    fn get(&self, id: &str) -> Result<Option<Ad>>;

    /// Atomically bump `view_count` and `updated_at`. `None` for unknown ids.
    fn increment_views(&self, id: &str) -> Result<Option<Ad>>;
}

const AD_COLUMNS: &str =
    "id, source_url, title, image_url, published_at, category, view_count, created_at, updated_at";

impl AdStore for Database {
    fn list(&self, query: &AdQuery) -> Result<AdPage> {
        self.with_conn(|conn| query_ads(conn, query))
    }

    fn find_by_url(&self, source_url: &str) -> Result<Option<Ad>> {
        self.with_conn(|conn| query_ad_by_url(conn, source_url))
    }

    fn insert_if_absent(&self, new: NewAd) -> Result<(Ad, bool)> {
        self.with_conn(|conn| {
            let ts = format_ts(&now());
            let inserted = conn.execute(
                "INSERT INTO ads (id, source_url, title, image_url, published_at, category, category_key,
                                  view_count, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8, ?8)
                 ON CONFLICT(source_url) DO NOTHING",
                rusqlite::params![
                    Uuid::new_v4().to_string(),
                    &new.source_url,
                    &new.title,
                    &new.image_url,
                    new.published_at.as_ref().map(format_ts),
                    &new.category,
                    category_key(&new.category),
                    ts,
                ],
            )?;

            let ad = query_ad_by_url(conn, &new.source_url)?
                .ok_or_else(|| anyhow::anyhow!("Ad vanished after insert: {}", new.source_url))?;
            Ok((ad, inserted == 1))
        })
    }

    fn get(&self, id: &str) -> Result<Option<Ad>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {AD_COLUMNS} FROM ads WHERE id = ?1");
            let ad = conn.query_row(&sql, [id], map_ad).optional()?;
            Ok(ad)
        })
    }

    fn increment_views(&self, id: &str) -> Result<Option<Ad>> {
        self.with_conn(|conn| {
            let sql = format!(
                "UPDATE ads SET view_count = view_count + 1, updated_at = ?2 WHERE id = ?1
                 RETURNING {AD_COLUMNS}"
            );
            let ad = conn
                .query_row(&sql, rusqlite::params![id, format_ts(&now())], map_ad)
                .optional()?;
            Ok(ad)
        })
    }
}

fn query_ad_by_url(conn: &Connection, source_url: &str) -> Result<Option<Ad>> {
    let sql = format!("SELECT {AD_COLUMNS} FROM ads WHERE source_url = ?1");
    let ad = conn.query_row(&sql, [source_url], map_ad).optional()?;
    Ok(ad)
}

fn query_ads(conn: &Connection, query: &AdQuery) -> Result<AdPage> {
    let filter = if query.category.is_some() { "WHERE category_key = ?1" } else { "" };

    let order = match query.sort {
        AdSort::Popular => "view_count DESC, created_at DESC, id ASC",
        AdSort::Date => "(published_at IS NULL) ASC, published_at DESC, created_at DESC, id ASC",
    };

    let count_sql = format!("SELECT COUNT(*) FROM ads {filter}");
    let first = if query.category.is_some() { 2 } else { 1 };
    let page_sql = format!(
        "SELECT {AD_COLUMNS} FROM ads {filter} ORDER BY {order} LIMIT ?{first} OFFSET ?{}",
        first + 1
    );

    let limit = i64::from(query.limit);
    let offset = i64::from(query.offset);

    let mut params: Vec<&dyn rusqlite::ToSql> = Vec::with_capacity(3);
    if let Some(category) = &query.category {
        params.push(category);
    }

    let total: i64 = conn.query_row(&count_sql, params.as_slice(), |row| row.get(0))?;

    params.push(&limit);
    params.push(&offset);

    let mut stmt = conn.prepare(&page_sql)?;
    let items = stmt
        .query_map(params.as_slice(), map_ad)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(AdPage {
        total: total as u64,
        items,
    })
}

fn map_ad(row: &Row<'_>) -> rusqlite::Result<Ad> {
    let published_at = row
        .get::<_, Option<String>>(4)?
        .map(|value| parse_ts(4, &value))
        .transpose()?;

    Ok(Ad {
        id: row.get(0)?,
        source_url: row.get(1)?,
        title: row.get(2)?,
        image_url: row.get(3)?,
        published_at,
        category: row.get(5)?,
        view_count: row.get(6)?,
        created_at: parse_ts(7, &row.get::<_, String>(7)?)?,
        updated_at: parse_ts(8, &row.get::<_, String>(8)?)?,
    })
}
