/// Authentication and authorization
///
/// Callers authenticate with an identity token issued by the external
/// identity provider. The token's subject is the account's external id; the
/// local account is bound to it by the provisioning sequence.
///
/// # Modules
///
/// - [`jwt`]: HS256 identity token creation and validation
/// - [`middleware`]: Axum middleware extracting the identity from `Authorization: Bearer`
/// - [`authorization`]: Role capability checks against the caller's membership
///
/// # Example
///
/// ```
/// use kasir_shared::auth::jwt::{create_token, validate_token, IdentityClaims};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let secret = "your-secret-key-at-least-32-bytes-long";
/// let token = create_token(&IdentityClaims::new("user_2abc", None), secret)?;
///
/// let claims = validate_token(&token, secret, None)?;
/// assert_eq!(claims.sub, "user_2abc");
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
