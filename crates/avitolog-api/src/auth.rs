use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Extension, Json, extract::State, extract::rejection::JsonRejection, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use tracing::info;
use uuid::Uuid;

use avitolog_types::api::{Claims, CredentialsRequest, MeResponse, TokenResponse};

use crate::error::{ApiError, Validator};
use crate::state::{AppState, run_blocking};

const USERNAME_LEN: (usize, usize) = (3, 64);
const PASSWORD_LEN: (usize, usize) = (6, 128);

pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let (username, password) = validate_credentials(&req)?;

    // Check before hashing; the insert below still guards against races
    let db = state.db.clone();
    let name = username.clone();
    let taken = run_blocking(move || db.get_user_by_username(&name)).await?.is_some();
    if taken {
        return Err(username_taken());
    }

    let user_id = Uuid::new_v4();
    let db = state.db.clone();
    let name = username.clone();
    let created = run_blocking(move || {
        let password_hash = hash_password(&password)?;
        db.create_user(&user_id.to_string(), &name, &password_hash)
    })
    .await?;
    if !created {
        return Err(username_taken());
    }

    info!("Registered user {}", username);

    let token = create_token(&state.jwt_secret, user_id, &username, state.token_ttl)?;

    Ok((StatusCode::CREATED, Json(TokenResponse { username, token })))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let (username, password) = validate_credentials(&req)?;

    let db = state.db.clone();
    let user = run_blocking(move || {
        let Some(user) = db.get_user_by_username(&username)? else {
            return Ok(None);
        };
        Ok(verify_password(&password, &user.password)?.then_some(user))
    })
    .await?
    .ok_or_else(|| ApiError::BadRequest("Invalid credentials".into()))?;

    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|e| anyhow::anyhow!("Corrupt user id '{}': {}", user.id, e))?;

    let token = create_token(&state.jwt_secret, user_id, &user.username, state.token_ttl)?;

    Ok(Json(TokenResponse {
        username: user.username,
        token,
    }))
}

pub async fn me(Extension(claims): Extension<Claims>) -> Json<MeResponse> {
    Json(MeResponse {
        username: claims.username,
    })
}

fn username_taken() -> ApiError {
    ApiError::BadRequest("Username already exists".into())
}

fn validate_credentials(req: &CredentialsRequest) -> Result<(String, String), ApiError> {
    let mut v = Validator::new();
    let username = v.text("username", req.username.as_deref(), USERNAME_LEN.0, USERNAME_LEN.1, true);
    let password = v.text("password", req.password.as_deref(), PASSWORD_LEN.0, PASSWORD_LEN.1, true);
    v.finish()?;

    match (username, password) {
        (Some(username), Some(password)) => Ok((username, password)),
        _ => Err(ApiError::BadRequest("Invalid credentials".into())),
    }
}

/// Hash password with Argon2id.
fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Password hashing failed: {}", e))?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, stored: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(stored).map_err(|e| anyhow::anyhow!("Corrupt password hash: {}", e))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

pub fn create_token(
    secret: &str,
    user_id: Uuid,
    username: &str,
    ttl: chrono::Duration,
) -> anyhow::Result<String> {
    let now = chrono::Utc::now();
    let expires = now
        .checked_add_signed(ttl)
        .ok_or_else(|| anyhow::anyhow!("Token lifetime out of range"))?;
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        iat: now.timestamp() as usize,
        exp: expires.timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

pub fn verify_token(secret: &str, token: &str) -> Result<Claims, ApiError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => ApiError::Unauthorized("Token has expired".into()),
        _ => ApiError::Unauthorized("Invalid token".into()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn token_roundtrip_preserves_identity() {
        let id = Uuid::new_v4();
        let token = create_token(SECRET, id, "alice", chrono::Duration::minutes(5)).unwrap();
        let claims = verify_token(SECRET, &token).unwrap();
        assert_eq!(claims.sub, id);
        assert_eq!(claims.username, "alice");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn token_with_wrong_secret_is_invalid() {
        let token = create_token(SECRET, Uuid::new_v4(), "alice", chrono::Duration::minutes(5)).unwrap();
        let err = verify_token("other-secret", &token).unwrap_err();
        assert_eq!(err.to_string(), "Invalid token");
    }

    #[test]
    fn expired_token_is_reported() {
        let token = create_token(SECRET, Uuid::new_v4(), "alice", chrono::Duration::hours(-2)).unwrap();
        let err = verify_token(SECRET, &token).unwrap_err();
        assert_eq!(err.to_string(), "Token has expired");
    }

    #[test]
    fn oversized_lifetime_is_an_error() {
        assert!(create_token(SECRET, Uuid::new_v4(), "alice", chrono::TimeDelta::MAX).is_err());
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("hunter22").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("hunter22", &hash).unwrap());
        assert!(!verify_password("hunter23", &hash).unwrap());
    }

    #[test]
    fn credentials_are_validated() {
        let req = CredentialsRequest {
            username: Some("  bob  ".into()),
            password: Some("secret1".into()),
        };
        assert_eq!(validate_credentials(&req).unwrap(), ("bob".to_string(), "secret1".to_string()));

        let req = CredentialsRequest {
            username: Some("bo".into()),
            password: None,
        };
        let Err(ApiError::Validation(errors)) = validate_credentials(&req) else {
            panic!("expected validation errors");
        };
        assert!(errors.contains_key("username"));
        assert_eq!(errors["password"], vec!["This field is required."]);
    }

    #[test]
    fn password_is_trimmed_before_length_check() {
        let req = CredentialsRequest {
            username: Some("bob".into()),
            password: Some("  secret1 ".into()),
        };
        assert_eq!(validate_credentials(&req).unwrap().1, "secret1");

        let req = CredentialsRequest {
            username: Some("bob".into()),
            password: Some("      x".into()),
        };
        let Err(ApiError::Validation(errors)) = validate_credentials(&req) else {
            panic!("expected validation errors");
        };
        assert_eq!(errors["password"], vec!["Ensure this field has at least 6 characters."]);
    }
}
