// security/src/lib.rs

pub mod middleware;
pub mod roles;

use std::fmt;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use models::medical::Role;

pub use middleware::{authorize, bearer_token};
pub use roles::{permissions, RoleConfig, RolesConfig};

/// Tokens are valid for 24 hours unless the issuer says otherwise.
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;

/// Claims carried by an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Subject (staff id)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub role: Role,
    pub exp: u64, // Expiration time
    pub iat: u64, // Issued at
}

/// Authentication and authorization failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    MissingToken,
    InvalidToken(String),
    PermissionDenied(String),
    UnknownRole(String),
    JwtError(String),
    Config(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AuthError::MissingToken => write!(f, "Missing or malformed bearer token"),
            AuthError::InvalidToken(msg) => write!(f, "Invalid token: {}", msg),
            AuthError::PermissionDenied(perm) => write!(f, "Permission denied: {} required", perm),
            AuthError::UnknownRole(role) => write!(f, "Unknown role: {}", role),
            AuthError::JwtError(msg) => write!(f, "JWT error: {}", msg),
            AuthError::Config(msg) => write!(f, "Security configuration error: {}", msg),
        }
    }
}

impl std::error::Error for AuthError {}

fn unix_seconds(at: chrono::DateTime<Utc>) -> Result<u64, AuthError> {
    u64::try_from(at.timestamp())
        .map_err(|_| AuthError::JwtError(format!("timestamp {} predates the epoch", at)))
}

/// Signs an HS256 access token for a staff member.
pub fn issue_token(
    secret: &[u8],
    sub: &str,
    username: Option<&str>,
    role: Role,
    ttl: Duration,
) -> Result<String, AuthError> {
    if secret.is_empty() {
        return Err(AuthError::Config("jwt secret must not be empty".to_string()));
    }
    let now = Utc::now();
    let claims = Claims {
        sub: sub.to_string(),
        username: username.map(str::to_string),
        role,
        exp: unix_seconds(now + ttl)?,
        iat: unix_seconds(now)?,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|e| AuthError::JwtError(format!("Failed to encode JWT: {}", e)))
}

/// Decodes and validates a JWT token, including its expiry.
pub fn validate_jwt_token(token: &str, secret: &[u8]) -> Result<Claims, AuthError> {
    let validation = Validation::new(Algorithm::HS256);
    decode::<Claims>(token, &DecodingKey::from_secret(secret), &validation)
        .map(|data| data.claims)
        .map_err(|e| AuthError::InvalidToken(e.to_string()))
}
