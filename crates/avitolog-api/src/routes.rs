use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::middleware::require_auth;
use crate::state::AppState;
use crate::{ads, auth, comments, settings};

/// All API routes. Auth endpoints answer with and without a trailing slash.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/register/", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/login/", post(auth::login))
        .route("/api/ads", get(ads::list_ads))
        .route("/api/ads/resolve", post(ads::resolve_ad))
        .route("/api/ads/{ad_id}", get(ads::get_ad))
        .route("/api/ads/{ad_id}/comments", get(comments::list_comments))
        .route("/api/settings", get(settings::get_settings))
        .route("/health", get(settings::health));

    let protected_routes = Router::new()
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/me/", get(auth::me))
        .route("/api/ads/{ad_id}/comments", post(comments::create_comment))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
