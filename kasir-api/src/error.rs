/// Error handling for the API server
///
/// Handlers return `ApiResult<T>`; every error becomes a JSON body of the form
///
/// ```json
/// { "error": "Validation failed", "details": "...", "fields": [{ "field": "name", "message": "..." }] }
/// ```
///
/// where `details` and `fields` are present only when there is something to
/// put in them.
///
/// # Example
///
/// ```
/// use kasir_api::error::{ApiError, ApiResult};
///
/// fn parse_quantity(raw: &str) -> ApiResult<u32> {
///     raw.parse()
///         .map_err(|_| ApiError::BadRequest(format!("Invalid quantity: {}", raw)))
/// }
///
/// assert!(parse_quantity("3").is_ok());
/// assert!(parse_quantity("three").is_err());
/// ```

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use kasir_shared::{
    auth::{authorization::AuthzError, jwt::JwtError, middleware::AuthError},
    provisioning::ProvisioningError,
    store::StoreError,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400)
    BadRequest(String),

    /// Unauthorized (401)
    Unauthorized(String),

    /// Forbidden (403)
    Forbidden(String),

    /// Not found (404)
    NotFound(String),

    /// Conflict (409)
    Conflict(String),

    /// Request validation failed (400)
    ValidationError(Vec<ValidationErrorDetail>),

    /// Internal server error (500); `details` carries the underlying message
    InternalError {
        message: String,
        details: Option<String>,
    },
}

impl ApiError {
    /// Internal error with the underlying cause passed through in `details`
    pub fn internal(message: impl Into<String>, cause: impl fmt::Display) -> Self {
        ApiError::InternalError {
            message: message.into(),
            details: Some(cause.to_string()),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::InternalError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Validation error detail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub error: String,

    /// Underlying cause, for internal errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,

    /// Per-field validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<ValidationErrorDetail>>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::InternalError { message, details } => match details {
                Some(details) => write!(f, "Internal error: {}: {}", message, details),
                None => write!(f, "Internal error: {}", message),
            },
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match self {
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg) => ErrorResponse {
                error: msg,
                details: None,
                fields: None,
            },
            ApiError::ValidationError(errors) => ErrorResponse {
                error: "Validation failed".to_string(),
                details: None,
                fields: Some(errors),
            },
            ApiError::InternalError { message, details } => {
                tracing::error!(details = ?details, "Internal error: {}", message);
                ErrorResponse {
                    error: message,
                    details,
                    fields: None,
                }
            }
        };

        (status, Json(body)).into_response()
    }
}

/// Convert store errors to API errors
impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(constraint) | StoreError::ForeignKey(constraint) => {
                ApiError::Conflict(format!("Constraint violation: {}", constraint))
            }
            StoreError::Invalid(constraint) => {
                ApiError::BadRequest(format!("Constraint violation: {}", constraint))
            }
            StoreError::Backend(msg) => ApiError::internal("Database error", msg),
        }
    }
}

/// Convert provisioning errors to API errors
impl From<ProvisioningError> for ApiError {
    fn from(err: ProvisioningError) -> Self {
        match err {
            ProvisioningError::EmptyIdentity => {
                ApiError::Unauthorized("Token has no subject".to_string())
            }
            ProvisioningError::Store { step, source } => {
                ApiError::internal(format!("Failed to provision account ({})", step), source)
            }
        }
    }
}

/// Convert identity extraction errors to API errors
impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredentials => {
                ApiError::Unauthorized("Missing authorization header".to_string())
            }
            AuthError::InvalidFormat(msg) => ApiError::BadRequest(msg),
            AuthError::InvalidToken(err) => err.into(),
        }
    }
}

/// Convert JWT errors to API errors
impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => ApiError::Unauthorized("Token expired".to_string()),
            JwtError::InvalidIssuer { .. } => {
                ApiError::Unauthorized("Invalid token issuer".to_string())
            }
            _ => ApiError::Unauthorized(format!("Invalid token: {}", err)),
        }
    }
}

/// Convert authorization errors to API errors
impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::NotProvisioned => ApiError::Forbidden(
                "Account not provisioned; call GET /api/auth/user first".to_string(),
            ),
            AuthzError::NotMember(_) => {
                ApiError::Forbidden("Not a member of this organization".to_string())
            }
            AuthzError::Forbidden { .. } => ApiError::Forbidden(err.to_string()),
            AuthzError::Store(err) => err.into(),
        }
    }
}

/// Convert JSON body rejections to API errors
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// Flattens validator errors into per-field details, sorted by field
pub fn validation_details(errors: &validator::ValidationErrors) -> Vec<ValidationErrorDetail> {
    let mut details: Vec<ValidationErrorDetail> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| ValidationErrorDetail {
                field: field.to_string(),
                message: error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "Validation failed".to_string()),
            })
        })
        .collect();
    details.sort_by(|a, b| a.field.cmp(&b.field));
    details
}

/// Convert validator errors to API errors
impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        ApiError::ValidationError(validation_details(&err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kasir_shared::models::role::{Action, Resource, Role};
    use kasir_shared::provisioning::Step;

    #[test]
    fn test_error_display() {
        let err = ApiError::BadRequest("Invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: Invalid input");

        let err = ApiError::NotFound("Category not found".to_string());
        assert_eq!(err.to_string(), "Not found: Category not found");
    }

    #[test]
    fn test_validation_error() {
        let errors = vec![
            ValidationErrorDetail {
                field: "name".to_string(),
                message: "Name is required".to_string(),
            },
            ValidationErrorDetail {
                field: "price".to_string(),
                message: "Price must be greater than 0".to_string(),
            },
        ];

        let err = ApiError::ValidationError(errors);
        assert_eq!(err.to_string(), "Validation failed: 2 errors");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_store_error_mapping() {
        let err: ApiError = StoreError::Backend("connection refused".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(matches!(
            err,
            ApiError::InternalError { details: Some(ref d), .. } if d == "connection refused"
        ));

        let err: ApiError = StoreError::Conflict("organizations_slug_key".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_auth_error_mapping() {
        let err: ApiError = AuthError::MissingCredentials.into();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);

        let err: ApiError = AuthError::InvalidFormat("Expected Bearer token".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err: ApiError = AuthError::InvalidToken(JwtError::Expired).into();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_authz_error_mapping() {
        let err: ApiError = AuthzError::Forbidden {
            role: Role::Cashier,
            resource: Resource::Products,
            action: Action::Delete,
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(err.to_string(), "Forbidden: Role cashier may not delete products");
    }

    #[test]
    fn test_provisioning_error_passes_details_through() {
        let err: ApiError = ProvisioningError::Store {
            step: Step::ResolveOrganization,
            source: StoreError::Backend("timeout".to_string()),
        }
        .into();

        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            err.to_string(),
            "Internal error: Failed to provision account (resolve_organization): Store failure: timeout"
        );
    }
}
