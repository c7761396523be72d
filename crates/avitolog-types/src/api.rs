use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// -- JWT Claims --

/// Bearer token claims. Issued by the auth handlers, checked by the
/// `require_auth` middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub iat: usize,
    pub exp: usize,
}

// -- Auth --

/// Body of both `/auth/register` and `/auth/login`. Fields are optional so
/// missing ones surface as field errors instead of a deserialization failure.
#[derive(Debug, Default, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub username: String,
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MeResponse {
    pub username: String,
}

// -- Ads --

#[derive(Debug, Default, Deserialize)]
pub struct AdsQuery {
    pub sort: Option<String>,
    pub category: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResolveRequest {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdResponse {
    pub id: Uuid,
    pub source_url: String,
    pub title: Option<String>,
    pub image_url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub category: String,
    pub view_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdListResponse {
    pub count: u64,
    pub limit: u32,
    pub offset: u32,
    pub results: Vec<AdResponse>,
}

// -- Comments --

#[derive(Debug, Default, Deserialize)]
pub struct CreateCommentRequest {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentResponse {
    pub id: Uuid,
    pub ad_id: Uuid,
    pub username: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

// -- Settings --

#[derive(Debug, Serialize, Deserialize)]
pub struct SettingsResponse {
    pub header_title: String,
}
