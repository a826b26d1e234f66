/// Identity token creation and validation
///
/// The external identity provider signs tokens with HS256 using a secret
/// shared with this service. The only claim the service relies on is `sub`,
/// the provider's subject id, which becomes the account's external id.
///
/// # Validation
///
/// - **Algorithm**: HS256 only
/// - **Expiration**: `exp` is required and checked
/// - **Not before**: `nbf` is checked when present
/// - **Issuer**: checked only when an expected issuer is configured
/// - **Subject**: must be non-empty
///
/// # Example
///
/// ```
/// use kasir_shared::auth::jwt::{create_token, validate_token, IdentityClaims};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let secret = "your-secret-key-at-least-32-bytes-long";
///
/// let claims = IdentityClaims::new("user_2abc", Some("https://auth.example.com"));
/// let token = create_token(&claims, secret)?;
///
/// let validated = validate_token(&token, secret, Some("https://auth.example.com"))?;
/// assert_eq!(validated.sub, "user_2abc");
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Default lifetime of tokens minted by [`IdentityClaims::new`]
pub const DEFAULT_TOKEN_LIFETIME_MINUTES: i64 = 60;

/// Error type for identity token operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JwtError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Signature, format or claim validation failed
    #[error("Failed to validate token: {0}")]
    ValidationError(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// Issuer didn't match the configured one
    #[error("Invalid issuer: expected {expected}")]
    InvalidIssuer { expected: String },

    /// Token has no subject
    #[error("Token has no subject")]
    MissingSubject,
}

/// Claims carried by an identity token
///
/// # Standard Claims
///
/// - `sub`: Subject, the identity provider's user id
/// - `iss`: Issuer (optional)
/// - `iat`: Issued at timestamp (optional)
/// - `exp`: Expiration timestamp
/// - `nbf`: Not before timestamp (optional)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaims {
    /// Subject - external identity id
    pub sub: String,

    /// Issuer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// Issued at (Unix timestamp)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Not before (Unix timestamp)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,
}

impl IdentityClaims {
    /// Creates claims with the default lifetime
    pub fn new(subject: impl Into<String>, issuer: Option<&str>) -> Self {
        Self::with_expiration(
            subject,
            issuer,
            Duration::minutes(DEFAULT_TOKEN_LIFETIME_MINUTES),
        )
    }

    /// Creates claims expiring after `expires_in`
    ///
    /// A negative duration yields an already expired token.
    pub fn with_expiration(
        subject: impl Into<String>,
        issuer: Option<&str>,
        expires_in: Duration,
    ) -> Self {
        let now = Utc::now();

        Self {
            sub: subject.into(),
            iss: issuer.map(str::to_string),
            iat: Some(now.timestamp()),
            exp: (now + expires_in).timestamp(),
            nbf: Some(now.timestamp()),
        }
    }

    /// Checks if token has expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}

/// Signs claims into an HS256 token
///
/// # Errors
///
/// Returns `JwtError::CreateError` if encoding fails
pub fn create_token(claims: &IdentityClaims, secret: &str) -> Result<String, JwtError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Validates an identity token and extracts its claims
///
/// # Arguments
///
/// * `token` - JWT string (without the `Bearer ` prefix)
/// * `secret` - Shared HS256 secret
/// * `issuer` - Expected `iss`, or None to accept any issuer
///
/// # Errors
///
/// Returns error if:
/// - Signature is invalid or the token is malformed
/// - Token has expired or is not yet valid
/// - Issuer doesn't match the expected one
/// - Subject is empty
pub fn validate_token(
    token: &str,
    secret: &str,
    issuer: Option<&str>,
) -> Result<IdentityClaims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    validation.validate_nbf = true;
    if let Some(issuer) = issuer {
        validation.set_issuer(&[issuer]);
    }

    let token_data = decode::<IdentityClaims>(token, &key, &validation).map_err(|e| {
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
            jsonwebtoken::errors::ErrorKind::InvalidIssuer => JwtError::InvalidIssuer {
                expected: issuer.unwrap_or_default().to_string(),
            },
            _ => JwtError::ValidationError(format!("Token validation failed: {}", e)),
        }
    })?;

    if token_data.claims.sub.trim().is_empty() {
        return Err(JwtError::MissingSubject);
    }

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    #[test]
    fn test_claims_creation() {
        let claims = IdentityClaims::new("user_1", None);

        assert_eq!(claims.sub, "user_1");
        assert_eq!(claims.iss, None);
        assert!(!claims.is_expired());
    }

    #[test]
    fn test_create_and_validate_token() {
        let claims = IdentityClaims::new("user_1", Some("kasir-auth"));
        let token = create_token(&claims, SECRET).expect("Should create token");

        let validated = validate_token(&token, SECRET, Some("kasir-auth")).expect("Should validate");
        assert_eq!(validated.sub, "user_1");
        assert_eq!(validated.iss.as_deref(), Some("kasir-auth"));
    }

    #[test]
    fn test_issuer_ignored_when_not_configured() {
        let claims = IdentityClaims::new("user_1", Some("somebody-else"));
        let token = create_token(&claims, SECRET).unwrap();

        assert!(validate_token(&token, SECRET, None).is_ok());
    }

    #[test]
    fn test_validate_with_wrong_issuer() {
        let claims = IdentityClaims::new("user_1", Some("somebody-else"));
        let token = create_token(&claims, SECRET).unwrap();

        let result = validate_token(&token, SECRET, Some("kasir-auth"));
        assert!(matches!(result, Err(JwtError::InvalidIssuer { .. })));
    }

    #[test]
    fn test_validate_with_wrong_secret() {
        let claims = IdentityClaims::new("user_1", None);
        let token = create_token(&claims, SECRET).unwrap();

        let result = validate_token(&token, "another-secret-key-at-least-32-bytes", None);
        assert!(matches!(result, Err(JwtError::ValidationError(_))));
    }

    #[test]
    fn test_validate_expired_token() {
        // Well past the default leeway
        let claims = IdentityClaims::with_expiration("user_1", None, Duration::seconds(-3600));
        assert!(claims.is_expired());

        let token = create_token(&claims, SECRET).unwrap();
        let result = validate_token(&token, SECRET, None);

        assert!(matches!(result, Err(JwtError::Expired)));
    }

    #[test]
    fn test_empty_subject_rejected() {
        let claims = IdentityClaims::new("", None);
        let token = create_token(&claims, SECRET).unwrap();

        assert_eq!(
            validate_token(&token, SECRET, None),
            Err(JwtError::MissingSubject)
        );
    }

    #[test]
    fn test_garbage_token_rejected() {
        assert!(validate_token("not-a-jwt", SECRET, None).is_err());
    }
}
