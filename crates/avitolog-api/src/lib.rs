pub mod ads;
pub mod auth;
pub mod comments;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod scraper;
pub mod settings;
pub mod state;

pub use error::ApiError;
pub use state::{AppState, AppStateInner};
