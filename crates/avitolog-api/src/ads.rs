use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection, rejection::QueryRejection},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use url::Url;
use uuid::Uuid;

use avitolog_db::models::{Ad, AdQuery, NewAd};
use avitolog_types::api::{AdListResponse, AdResponse, AdsQuery, ResolveRequest};
use avitolog_types::models::{AdSort, DEFAULT_CATEGORY};

use crate::error::{ApiError, Validator};
use crate::state::{AppState, run_blocking};

const DEFAULT_LIMIT: u32 = 20;
const MAX_LIMIT: u32 = 100;
const MAX_URL_LEN: usize = 1000;

/// GET /api/ads: sorted, filtered, paginated listing.
pub async fn list_ads(
    State(state): State<AppState>,
    query: Result<Query<AdsQuery>, QueryRejection>,
) -> Result<Json<AdListResponse>, ApiError> {
    let Query(query) = query?;

    let mut v = Validator::new();
    let sort = match query.sort.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        None => AdSort::default(),
        Some(raw) => raw.parse::<AdSort>().unwrap_or_else(|e| {
            v.add("sort", format!("{e}"));
            AdSort::default()
        }),
    };
    let limit = v.integer("limit", query.limit.as_deref(), DEFAULT_LIMIT, 1, Some(MAX_LIMIT));
    let offset = v.integer("offset", query.offset.as_deref(), 0, 0, None);
    v.finish()?;

    let ad_query = AdQuery::new(sort, query.category.as_deref(), limit, offset);
    let store = state.ads.clone();
    let page = run_blocking(move || store.list(&ad_query)).await?;

    Ok(Json(AdListResponse {
        count: page.total,
        limit,
        offset,
        results: page.items.into_iter().map(ad_response).collect::<Result<_, _>>()?,
    }))
}

/// POST /api/ads/resolve: return the ad for a source URL, creating it from
/// the remote page on first sight.
pub async fn resolve_ad(
    State(state): State<AppState>,
    payload: Result<Json<ResolveRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let source_url = validate_source_url(req.url.as_deref())?;

    let store = state.ads.clone();
    let lookup = source_url.clone();
    if let Some(existing) = run_blocking(move || store.find_by_url(&lookup)).await? {
        return Ok((StatusCode::OK, Json(ad_response(existing)?)));
    }

    // Outbound fetch happens without holding any store lock
    let meta = state.metadata.fetch(&source_url).await;
    let category = if meta.category.trim().is_empty() {
        DEFAULT_CATEGORY.to_string()
    } else {
        meta.category
    };

    let new_ad = NewAd {
        source_url,
        title: meta.title,
        image_url: meta.image_url,
        published_at: meta.published_at,
        category,
    };

    let store = state.ads.clone();
    let (ad, created) = run_blocking(move || store.insert_if_absent(new_ad)).await?;

    let status = if created {
        info!("Created ad {} for {}", ad.id, ad.source_url);
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((status, Json(ad_response(ad)?)))
}

/// GET /api/ads/{ad_id}, counts as a view.
pub async fn get_ad(
    State(state): State<AppState>,
    Path(ad_id): Path<String>,
) -> Result<Json<AdResponse>, ApiError> {
    let store = state.ads.clone();
    let ad = run_blocking(move || store.increment_views(&ad_id))
        .await?
        .ok_or_else(|| ApiError::NotFound("Not found".into()))?;

    Ok(Json(ad_response(ad)?))
}

/// Trimmed absolute http(s) URL of bounded length.
fn validate_source_url(raw: Option<&str>) -> Result<String, ApiError> {
    let mut v = Validator::new();
    let url = v.text("url", raw, 1, MAX_URL_LEN, true);
    if url.as_deref().is_some_and(|u| !is_web_url(u)) {
        v.add("url", "Enter a valid URL.");
    }
    v.finish()?;

    url.ok_or_else(|| ApiError::BadRequest("Invalid url".into()))
}

fn is_web_url(raw: &str) -> bool {
    Url::parse(raw)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some_and(|h| !h.is_empty()))
        .unwrap_or(false)
}

/// Stored ids are UUID text; anything else is a corrupt row.
pub(crate) fn parse_id(kind: &str, raw: &str) -> Result<Uuid, ApiError> {
    raw.parse::<Uuid>()
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("Corrupt {} id '{}': {}", kind, raw, e)))
}

pub(crate) fn ad_response(ad: Ad) -> Result<AdResponse, ApiError> {
    Ok(AdResponse {
        id: parse_id("ad", &ad.id)?,
        source_url: ad.source_url,
        title: ad.title,
        image_url: ad.image_url,
        published_at: ad.published_at,
        category: ad.category,
        view_count: ad.view_count,
        created_at: ad.created_at,
        updated_at: ad.updated_at,
    })
}
