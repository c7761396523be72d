use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
    typed_header::TypedHeaderRejection,
};

use crate::auth::verify_token;
use crate::error::ApiError;
use crate::state::AppState;

/// Extract and validate the bearer JWT, exposing its claims to handlers as
/// `Extension<Claims>`.
pub async fn require_auth(
    State(state): State<AppState>,
    auth: Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let TypedHeader(Authorization(bearer)) = auth.map_err(|rejection| {
        if rejection.is_missing() {
            ApiError::Unauthorized("Authentication credentials were not provided.".into())
        } else {
            ApiError::Unauthorized("Invalid Authorization header format. Use 'Bearer <token>'.".into())
        }
    })?;

    let claims = verify_token(&state.jwt_secret, bearer.token())?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
