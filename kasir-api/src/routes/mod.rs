/// API route handlers
///
/// - `health`: Health check endpoint
/// - `auth`: Current account, provisioned on first sight
/// - `categories`: Category CRUD
/// - `products`: Product CRUD
///
/// Successful responses share the [`ApiResponse`] envelope:
///
/// ```json
/// { "success": true, "message": "Category created", "data": { ... } }
/// ```

pub mod auth;
pub mod categories;
pub mod health;
pub mod products;

use crate::error::{ApiError, ApiResult};
use axum::extract::FromRequest;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// JSON request body whose rejections use the error envelope
///
/// Malformed or mistyped bodies become 400 `{"error": "..."}` instead of
/// axum's plain-text 422.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Success response envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    /// Envelope with a message and no data
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
        }
    }
}

/// Parses a path id, rejecting malformed ids with 400
pub(crate) fn parse_id(raw: &str, resource: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::BadRequest(format!("Invalid {} ID", resource)))
}

/// Deserializes a field that distinguishes "absent" from "null"
///
/// Use with `#[serde(default, deserialize_with = "double_option")]`: an
/// absent field stays `None`, `null` becomes `Some(None)`.
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
