use std::sync::Arc;

use tracing::error;

use avitolog_db::{AdStore, Database};

use crate::error::ApiError;
use crate::scraper::MetadataSource;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    /// Users, comments and settings.
    pub db: Arc<Database>,
    /// Ads live here; may be `db` itself or a process-local map.
    pub ads: Arc<dyn AdStore>,
    pub metadata: Arc<dyn MetadataSource>,
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
}

/// Run blocking DB work off the async runtime.
pub(crate) async fn run_blocking<F, T>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow::Error::new(e))
        })?
        .map_err(ApiError::from)
}
