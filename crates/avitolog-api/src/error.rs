use std::collections::BTreeMap;

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Per-field validation messages, serialized as `{"field": ["message"]}`.
pub type FieldErrors = BTreeMap<&'static str, Vec<String>>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation failed")]
    Validation(FieldErrors),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            ApiError::Validation(fields) => (status, Json(fields)).into_response(),
            ApiError::Internal(err) => {
                error!("Internal error: {:#}", err);
                (status, Json(json!({ "detail": "Internal server error" }))).into_response()
            }
            other => (status, Json(json!({ "detail": other.to_string() }))).into_response(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// Collects field errors, then fails once with all of them.
#[derive(Debug, Default)]
pub struct Validator {
    errors: FieldErrors,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.entry(field).or_default().push(message.into());
    }

    /// Required text field with a length range in characters. `trim`
    /// strips surrounding whitespace before the checks.
    pub fn text(
        &mut self,
        field: &'static str,
        value: Option<&str>,
        min: usize,
        max: usize,
        trim: bool,
    ) -> Option<String> {
        let Some(raw) = value else {
            self.add(field, "This field is required.");
            return None;
        };

        let value = if trim { raw.trim() } else { raw };
        let len = value.chars().count();

        if len == 0 {
            self.add(field, "This field may not be blank.");
            return None;
        }
        if len < min {
            self.add(field, format!("Ensure this field has at least {min} characters."));
            return None;
        }
        if len > max {
            self.add(field, format!("Ensure this field has no more than {max} characters."));
            return None;
        }
        Some(value.to_string())
    }

    /// Optional integer field. Absent or blank input yields `default`;
    /// without `max` the bound is `u32::MAX`.
    pub fn integer(
        &mut self,
        field: &'static str,
        value: Option<&str>,
        default: u32,
        min: u32,
        max: Option<u32>,
    ) -> u32 {
        let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
            return default;
        };

        let Ok(parsed) = raw.parse::<i64>() else {
            self.add(field, "A valid integer is required.");
            return default;
        };

        if parsed < i64::from(min) {
            self.add(field, format!("Ensure this value is greater than or equal to {min}."));
            return default;
        }
        let max = max.unwrap_or(u32::MAX);
        match u32::try_from(parsed) {
            Ok(value) if value <= max => value,
            _ => {
                self.add(field, format!("Ensure this value is less than or equal to {max}."));
                default
            }
        }
    }

    pub fn finish(self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self.errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_rules() {
        let mut v = Validator::new();
        assert_eq!(v.text("a", Some("  bob  "), 3, 64, true).as_deref(), Some("bob"));
        assert_eq!(v.text("b", None, 3, 64, true), None);
        assert_eq!(v.text("c", Some("   "), 1, 10, true), None);
        assert_eq!(v.text("d", Some("ab"), 3, 64, true), None);
        assert_eq!(v.text("e", Some("абвгд"), 1, 4, true), None);
        assert_eq!(v.text("f", Some("абвг"), 1, 4, true).as_deref(), Some("абвг"));

        let Err(ApiError::Validation(errors)) = v.finish() else {
            panic!("expected validation errors");
        };
        assert_eq!(errors["b"], vec!["This field is required."]);
        assert_eq!(errors["c"], vec!["This field may not be blank."]);
        assert_eq!(errors["d"], vec!["Ensure this field has at least 3 characters."]);
        assert_eq!(errors["e"], vec!["Ensure this field has no more than 4 characters."]);
        assert!(!errors.contains_key("a"));
        assert!(!errors.contains_key("f"));
    }

    #[test]
    fn integer_rules() {
        let mut v = Validator::new();
        assert_eq!(v.integer("limit", None, 20, 1, Some(100)), 20);
        assert_eq!(v.integer("limit", Some(""), 20, 1, Some(100)), 20);
        assert_eq!(v.integer("limit", Some("5"), 20, 1, Some(100)), 5);
        assert!(v.finish().is_ok());

        let mut v = Validator::new();
        v.integer("limit", Some("0"), 20, 1, Some(100));
        v.integer("offset", Some("-1"), 0, 0, None);
        v.integer("page", Some("ten"), 0, 0, None);
        v.integer("size", Some("101"), 20, 1, Some(100));
        let Err(ApiError::Validation(errors)) = v.finish() else {
            panic!("expected validation errors");
        };
        assert_eq!(errors["limit"], vec!["Ensure this value is greater than or equal to 1."]);
        assert_eq!(errors["offset"], vec!["Ensure this value is greater than or equal to 0."]);
        assert_eq!(errors["page"], vec!["A valid integer is required."]);
        assert_eq!(errors["size"], vec!["Ensure this value is less than or equal to 100."]);
    }

    #[test]
    fn unbounded_integer_stops_at_u32_max() {
        let mut v = Validator::new();
        assert_eq!(v.integer("offset", Some("4294967295"), 0, 0, None), u32::MAX);
        assert!(v.finish().is_ok());

        let mut v = Validator::new();
        assert_eq!(v.integer("offset", Some("5000000000"), 0, 0, None), 0);
        let Err(ApiError::Validation(errors)) = v.finish() else {
            panic!("expected validation errors");
        };
        assert_eq!(errors["offset"], vec!["Ensure this value is less than or equal to 4294967295."]);
    }

    #[test]
    fn statuses() {
        assert_eq!(ApiError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::Unauthorized("x".into()).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Validation(FieldErrors::new()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::from(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
