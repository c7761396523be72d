use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use avitolog_db::models::CommentRow;
use avitolog_types::api::{Claims, CommentResponse, CreateCommentRequest};

use crate::ads::parse_id;
use crate::error::{ApiError, Validator};
use crate::state::{AppState, run_blocking};

const MAX_COMMENT_LEN: usize = 2000;

fn ad_not_found() -> ApiError {
    ApiError::NotFound("Ad not found".into())
}

/// GET /api/ads/{ad_id}/comments, oldest first.
pub async fn list_comments(
    State(state): State<AppState>,
    Path(ad_id): Path<String>,
) -> Result<Json<Vec<CommentResponse>>, ApiError> {
    let db = state.db.clone();
    let ads = state.ads.clone();

    let rows = run_blocking(move || {
        if ads.get(&ad_id)?.is_none() {
            return Ok(None);
        }
        db.get_comments(&ad_id).map(Some)
    })
    .await?
    .ok_or_else(ad_not_found)?;

    let comments = rows.into_iter().map(comment_response).collect::<Result<_, _>>()?;
    Ok(Json(comments))
}

/// POST /api/ads/{ad_id}/comments. Requires a bearer token.
pub async fn create_comment(
    State(state): State<AppState>,
    Path(ad_id): Path<String>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<CreateCommentRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let ads = state.ads.clone();
    let lookup = ad_id.clone();
    if run_blocking(move || ads.get(&lookup)).await?.is_none() {
        return Err(ad_not_found());
    }

    let Json(req) = payload?;
    let mut v = Validator::new();
    let text = v.text("text", req.text.as_deref(), 1, MAX_COMMENT_LEN, true);
    v.finish()?;
    let text = text.ok_or_else(|| ApiError::BadRequest("Invalid text".into()))?;

    let comment_id = Uuid::new_v4().to_string();
    let author_id = claims.sub.to_string();
    let db = state.db.clone();
    let row = run_blocking(move || db.insert_comment(&comment_id, &ad_id, &author_id, &text)).await?;

    Ok((StatusCode::CREATED, Json(comment_response(row)?)))
}

fn comment_response(row: CommentRow) -> Result<CommentResponse, ApiError> {
    Ok(CommentResponse {
        id: parse_id("comment", &row.id)?,
        ad_id: parse_id("ad", &row.ad_id)?,
        username: row.author_username,
        text: row.text,
        created_at: row.created_at,
    })
}
