/// JWT Token Generation and Validation
///
/// Access and refresh tokens share one claim shape but are signed with
/// separate secrets and carry separate lifetimes.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::auth::claims::Claims;
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    fn secret<'a>(&self, config: &'a JwtSettings) -> &'a str {
        match self {
            TokenKind::Access => &config.access_secret,
            TokenKind::Refresh => &config.refresh_secret,
        }
    }

    fn expiry(&self, config: &JwtSettings) -> i64 {
        match self {
            TokenKind::Access => config.access_token_expiry,
            TokenKind::Refresh => config.refresh_token_expiry,
        }
    }
}

/// Sign a new token of the given kind for an account
///
/// # Errors
/// Returns `TokenIssuance` if encoding fails
pub fn generate_token(
    kind: TokenKind,
    account_id: &Uuid,
    config: &JwtSettings,
) -> Result<String, AppError> {
    let claims = Claims::new(*account_id, kind.expiry(config), config.issuer.clone());

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(kind.secret(config).as_bytes()),
    )
    .map_err(|e| {
        tracing::error!(kind = ?kind, "Token generation failed: {}", e);
        AppError::Auth(AuthError::TokenIssuance)
    })
}

/// Validate a token of the given kind and return its claims
///
/// # Errors
/// Returns `TokenInvalid` if the token is malformed, expired, signed with
/// another secret, or issued by someone else
pub fn validate_token(kind: TokenKind, token: &str, config: &JwtSettings) -> Result<Claims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[&config.issuer]);

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(kind.secret(config).as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::warn!(kind = ?kind, "JWT validation error: {}", e);
        AppError::Auth(AuthError::TokenInvalid)
    })
}
