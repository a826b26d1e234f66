/// Identity extraction for Axum
///
/// Reads the `Authorization: Bearer <token>` header, validates the identity
/// token and produces an [`AuthContext`] for the request extensions.
///
/// # Failures
///
/// - Missing header: [`AuthError::MissingCredentials`]
/// - Header present but not a Bearer credential: [`AuthError::InvalidFormat`]
/// - Token rejected by [`validate_token`]: [`AuthError::InvalidToken`]
///
/// # Example
///
/// ```no_run
/// use axum::extract::Request;
/// use kasir_shared::auth::middleware::IdentityVerifier;
///
/// # fn example(req: Request) {
/// let verifier = IdentityVerifier::new("your-secret-key-at-least-32-bytes-long", None);
///
/// match verifier.authenticate(req.headers()) {
///     Ok(auth) => println!("caller: {}", auth.external_id),
///     Err(e) => println!("rejected: {}", e),
/// }
/// # }
/// ```

use axum::http::{header, HeaderMap};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::jwt::{validate_token, JwtError};

/// Authentication context added to request extensions
///
/// Handlers extract it with `Extension<AuthContext>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    /// Subject id from the identity token
    pub external_id: String,
}

/// Error type for identity extraction
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Missing authorization header
    #[error("Missing credentials")]
    MissingCredentials,

    /// Invalid authorization header format
    #[error("{0}")]
    InvalidFormat(String),

    /// Token validation failed
    #[error("Invalid token: {0}")]
    InvalidToken(#[from] JwtError),
}

/// Validates identity tokens against a shared secret
#[derive(Debug, Clone)]
pub struct IdentityVerifier {
    secret: String,
    issuer: Option<String>,
}

impl IdentityVerifier {
    /// Creates a verifier; `issuer` of None accepts any issuer
    pub fn new(secret: impl Into<String>, issuer: Option<String>) -> Self {
        Self {
            secret: secret.into(),
            issuer,
        }
    }

    /// Authenticates a request from its headers
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<AuthContext, AuthError> {
        let token = bearer_token(headers)?;
        let claims = validate_token(token, &self.secret, self.issuer.as_deref()).map_err(|e| {
            debug!(error = %e, "Rejected identity token");
            AuthError::InvalidToken(e)
        })?;

        Ok(AuthContext {
            external_id: claims.sub,
        })
    }
}

/// Extracts the token from an `Authorization: Bearer` header
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingCredentials)?
        .to_str()
        .map_err(|_| AuthError::InvalidFormat("Authorization header is not valid ASCII".to_string()))?;

    let token = value
        .strip_prefix("Bearer ")
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))?
        .trim();

    if token.is_empty() {
        return Err(AuthError::MissingCredentials);
    }

    Ok(token)
}
