/// Access token signing and validation
///
/// Tokens are HS256 JWTs carrying a verified external identity: the
/// provider's subject plus email and display name. They are minted by the
/// session flow after the provider has verified the caller; this API only
/// validates them and provisions the matching user.
///
/// # Security
///
/// - **Algorithm**: HS256
/// - **Expiration**: 24 hours by default
/// - **Validation**: signature, `exp`, `nbf` and issuer
/// - **Secret**: at least 32 bytes
///
/// # Example
///
/// ```
/// use taskboard_shared::auth::jwt::{create_token, validate_token, Claims};
/// use taskboard_shared::models::user::ExternalIdentity;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let identity = ExternalIdentity {
///     external_auth_id: "auth0|123".to_string(),
///     email: "ada@example.com".to_string(),
///     name: Some("Ada".to_string()),
/// };
/// let secret = "a-secret-that-is-at-least-32-bytes!";
///
/// let token = create_token(&Claims::new(identity), secret)?;
/// let claims = validate_token(&token, secret)?;
/// assert_eq!(claims.sub, "auth0|123");
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::models::user::ExternalIdentity;

/// Value of the `iss` claim
pub const ISSUER: &str = "taskboard";

/// Lifetime of a token built with [`Claims::new`]
pub fn default_expiration() -> Duration {
    Duration::hours(24)
}

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Signature, format or claims are invalid
    #[error("Failed to validate token: {0}")]
    ValidationError(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// Token was issued by someone else
    #[error("Invalid issuer")]
    InvalidIssuer,
}

/// Claims carried by an access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - the identity provider's stable user identifier
    pub sub: String,

    /// Verified email address
    pub email: String,

    /// Display name, if the provider has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Issuer - always [`ISSUER`]
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Not before (Unix timestamp)
    pub nbf: i64,
}

impl Claims {
    /// Claims for `identity` with the default lifetime
    pub fn new(identity: ExternalIdentity) -> Self {
        Self::with_expiration(identity, default_expiration())
    }

    /// Claims for `identity` expiring after `expires_in`
    pub fn with_expiration(identity: ExternalIdentity, expires_in: Duration) -> Self {
        let now = Utc::now();

        Self {
            sub: identity.external_auth_id,
            email: identity.email,
            name: identity.name,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: (now + expires_in).timestamp(),
            nbf: now.timestamp(),
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }

    /// The identity the token vouches for
    pub fn identity(&self) -> ExternalIdentity {
        ExternalIdentity {
            external_auth_id: self.sub.clone(),
            email: self.email.clone(),
            name: self.name.clone(),
        }
    }
}

/// Signs `claims` with HS256
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Verifies a token and returns its claims
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = true;
    validation.validate_nbf = true;
    validation.leeway = 0;

    let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => JwtError::Expired,
        ErrorKind::InvalidIssuer => JwtError::InvalidIssuer,
        _ => JwtError::ValidationError(format!("Token validation failed: {}", e)),
    })?;

    Ok(token_data.claims)
}
