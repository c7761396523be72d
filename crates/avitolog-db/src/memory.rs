use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::Result;
use uuid::Uuid;

use avitolog_types::models::AdSort;

use crate::models::{Ad, AdPage, AdQuery, NewAd, category_key};
use crate::now;
use crate::store::AdStore;

/// Process-local ad store. Contents are lost on restart.
#[derive(Default)]
pub struct MemoryAdStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    by_id: HashMap<String, Ad>,
    id_by_url: HashMap<String, String>,
}

impl MemoryAdStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_inner<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Inner) -> T,
    {
        let mut inner = self
            .inner
            .lock()
            .map_err(|e| anyhow::anyhow!("Ad store lock poisoned: {}", e))?;
        Ok(f(&mut inner))
    }
}

impl AdStore for MemoryAdStore {
    fn list(&self, query: &AdQuery) -> Result<AdPage> {
        self.with_inner(|inner| {
            let mut ads: Vec<&Ad> = inner
                .by_id
                .values()
                .filter(|ad| match &query.category {
                    Some(key) => category_key(&ad.category) == *key,
                    None => true,
                })
                .collect();

            ads.sort_by(|a, b| compare(query.sort, a, b));

            let total = ads.len() as u64;
            let items = ads
                .into_iter()
                .skip(query.offset as usize)
                .take(query.limit as usize)
                .cloned()
                .collect();

            AdPage { total, items }
        })
    }

    fn find_by_url(&self, source_url: &str) -> Result<Option<Ad>> {
        self.with_inner(|inner| {
            inner
                .id_by_url
                .get(source_url)
                .and_then(|id| inner.by_id.get(id))
                .cloned()
        })
    }

    fn insert_if_absent(&self, new: NewAd) -> Result<(Ad, bool)> {
        self.with_inner(|inner| {
            if let Some(existing) = inner.id_by_url.get(&new.source_url).and_then(|id| inner.by_id.get(id)) {
                return (existing.clone(), false);
            }

            let ts = now();
            let ad = Ad {
                id: Uuid::new_v4().to_string(),
                source_url: new.source_url,
                title: new.title,
                image_url: new.image_url,
                published_at: new.published_at,
                category: new.category,
                view_count: 0,
                created_at: ts,
                updated_at: ts,
            };

            inner.id_by_url.insert(ad.source_url.clone(), ad.id.clone());
            inner.by_id.insert(ad.id.clone(), ad.clone());
            (ad, true)
        })
    }

    fn get(&self, id: &str) -> Result<Option<Ad>> {
        self.with_inner(|inner| inner.by_id.get(id).cloned())
    }

    fn increment_views(&self, id: &str) -> Result<Option<Ad>> {
        self.with_inner(|inner| {
            let ad = inner.by_id.get_mut(id)?;
            ad.view_count += 1;
            ad.updated_at = now();
            Some(ad.clone())
        })
    }
}

/// Same ordering as the SQL `ORDER BY` clauses of the `ads` table.
fn compare(sort: AdSort, a: &Ad, b: &Ad) -> Ordering {
    let primary = match sort {
        AdSort::Popular => b.view_count.cmp(&a.view_count),
        AdSort::Date => match (a.published_at, b.published_at) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
    };

    primary
        .then_with(|| b.created_at.cmp(&a.created_at))
        .then_with(|| a.id.cmp(&b.id))
}
