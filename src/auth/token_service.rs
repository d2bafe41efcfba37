/// Session Token Service
///
/// Issues, verifies, rotates and revokes access/refresh token pairs.
///
/// Each account has at most one live refresh token: the value stored on its
/// record. Issuing a new pair overwrites it, revoking clears it, and a refresh
/// token is only honoured while it is byte-for-byte equal to the stored value.
/// There is no blocklist; overwriting the stored value is what invalidates old
/// refresh tokens.

use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::account::Account;
use crate::auth::jwt::{generate_token, validate_token, TokenKind};
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError};
use crate::store::AccountStore;

/// Freshly issued tokens
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Clone)]
pub struct TokenService {
    store: Arc<dyn AccountStore>,
    config: JwtSettings,
}

impl TokenService {
    pub fn new(store: Arc<dyn AccountStore>, config: JwtSettings) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &JwtSettings {
        &self.config
    }

    /// Issue a new token pair and make its refresh token the account's only
    /// live one.
    ///
    /// # Errors
    /// `TokenIssuance` if the account cannot be loaded, signing fails, or the
    /// refresh token cannot be persisted
    pub async fn issue(&self, account_id: Uuid) -> Result<TokenPair, AppError> {
        let account = self
            .store
            .find_by_id(account_id)
            .await
            .map_err(|e| issuance_failure(account_id, e))?
            .ok_or_else(|| {
                tracing::warn!(account_id = %account_id, "Token issuance for unknown account");
                AppError::Auth(AuthError::TokenIssuance)
            })?;

        let access_token = generate_token(TokenKind::Access, &account.id, &self.config)?;
        let refresh_token = generate_token(TokenKind::Refresh, &account.id, &self.config)?;

        let stored = self
            .store
            .set_refresh_token(account.id, Some(&refresh_token))
            .await
            .map_err(|e| issuance_failure(account_id, e))?;
        if !stored {
            tracing::warn!(account_id = %account_id, "Account vanished during token issuance");
            return Err(AppError::Auth(AuthError::TokenIssuance));
        }

        tracing::info!(account_id = %account.id, "Token pair issued");

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Replace both tokens. The previous refresh token stops working because
    /// the stored value is overwritten.
    pub async fn rotate(&self, account_id: Uuid) -> Result<TokenPair, AppError> {
        let pair = self.issue(account_id).await?;
        tracing::info!(account_id = %account_id, "Refresh token rotated");
        Ok(pair)
    }

    /// Check a presented refresh token and return the account it belongs to.
    ///
    /// # Errors
    /// - `TokenInvalid` for bad signatures, expiry, or an unknown account
    /// - `SessionExpired` if the token is not the account's stored token
    pub async fn verify_refresh(&self, token: &str) -> Result<Uuid, AppError> {
        let claims = validate_token(TokenKind::Refresh, token, &self.config)?;
        let account_id = claims.account_id()?;

        let account = self
            .store
            .find_by_id(account_id)
            .await?
            .ok_or(AppError::Auth(AuthError::TokenInvalid))?;

        if account.refresh_token.as_deref() != Some(token) {
            tracing::warn!(
                account_id = %account_id,
                "Refresh token does not match the stored session"
            );
            return Err(AppError::Auth(AuthError::SessionExpired));
        }

        Ok(account_id)
    }

    /// Check a presented access token. Stateless: the store is not consulted.
    pub fn verify_access(&self, token: &str) -> Result<Uuid, AppError> {
        validate_token(TokenKind::Access, token, &self.config)?.account_id()
    }

    /// Resolve an access token to the account it was issued for.
    pub async fn authenticate(&self, token: &str) -> Result<Account, AppError> {
        let account_id = self.verify_access(token)?;
        self.store
            .find_by_id(account_id)
            .await?
            .ok_or(AppError::Auth(AuthError::TokenInvalid))
    }

    /// Clear the stored refresh token. Succeeds whether or not a session (or
    /// the account) exists.
    pub async fn revoke(&self, account_id: Uuid) -> Result<(), AppError> {
        let cleared = self.store.set_refresh_token(account_id, None).await?;
        tracing::info!(account_id = %account_id, found = cleared, "Session revoked");
        Ok(())
    }
}

fn issuance_failure(account_id: Uuid, error: AppError) -> AppError {
    tracing::error!(account_id = %account_id, error = %error, "Token issuance failed");
    AppError::Auth(AuthError::TokenIssuance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::NewAccount;
    use crate::auth::claims::Claims;
    use crate::store::InMemoryAccountStore;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn test_config() -> JwtSettings {
        JwtSettings {
            access_secret: "test-access-secret-at-least-32-characters".to_string(),
            refresh_secret: "test-refresh-secret-at-least-32-characters".to_string(),
            access_token_expiry: 900,
            refresh_token_expiry: 604800,
            issuer: "test".to_string(),
        }
    }

    async fn setup() -> (TokenService, Arc<InMemoryAccountStore>, Uuid) {
        let store = Arc::new(InMemoryAccountStore::new());
        let account = store
            .insert(NewAccount {
                email: "u1@example.com".to_string(),
                name: "u1".to_string(),
                age: 30,
                city: "Lisbon".to_string(),
                postal_code: "1000".to_string(),
                password_hash: "hash".to_string(),
            })
            .await
            .unwrap();
        let service = TokenService::new(store.clone(), test_config());
        (service, store, account.id)
    }

    #[tokio::test]
    async fn issue_persists_refresh_token() {
        let (service, store, id) = setup().await;

        let pair = service.issue(id).await.unwrap();

        let stored = store.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.refresh_token.as_deref(), Some(pair.refresh_token.as_str()));
        assert_ne!(pair.access_token, pair.refresh_token);
    }

    #[tokio::test]
    async fn issue_then_verify_refresh_returns_account() {
        let (service, _, id) = setup().await;

        let pair = service.issue(id).await.unwrap();

        assert_eq!(service.verify_refresh(&pair.refresh_token).await.unwrap(), id);
    }

    #[tokio::test]
    async fn issue_for_unknown_account_fails() {
        let (service, _, _) = setup().await;

        let result = service.issue(Uuid::new_v4()).await;

        assert!(matches!(result, Err(AppError::Auth(AuthError::TokenIssuance))));
    }

    #[tokio::test]
    async fn rotation_invalidates_previous_refresh_token() {
        let (service, _, id) = setup().await;

        let r1 = service.issue(id).await.unwrap();
        assert_eq!(service.verify_refresh(&r1.refresh_token).await.unwrap(), id);

        let r2 = service.rotate(id).await.unwrap();
        assert_ne!(r1.refresh_token, r2.refresh_token);

        let stale = service.verify_refresh(&r1.refresh_token).await;
        assert!(matches!(stale, Err(AppError::Auth(AuthError::SessionExpired))));
        assert_eq!(service.verify_refresh(&r2.refresh_token).await.unwrap(), id);
    }

    #[tokio::test]
    async fn revoke_invalidates_and_is_idempotent() {
        let (service, store, id) = setup().await;
        let pair = service.issue(id).await.unwrap();

        service.revoke(id).await.unwrap();
        service.revoke(id).await.unwrap();

        let result = service.verify_refresh(&pair.refresh_token).await;
        assert!(matches!(result, Err(AppError::Auth(AuthError::SessionExpired))));
        assert!(store.find_by_id(id).await.unwrap().unwrap().refresh_token.is_none());
    }

    #[tokio::test]
    async fn revoke_unknown_account_is_not_an_error() {
        let (service, _, _) = setup().await;
        assert!(service.revoke(Uuid::new_v4()).await.is_ok());
    }

    #[tokio::test]
    async fn verify_refresh_rejects_access_token() {
        let (service, _, id) = setup().await;
        let pair = service.issue(id).await.unwrap();

        let result = service.verify_refresh(&pair.access_token).await;
        assert!(matches!(result, Err(AppError::Auth(AuthError::TokenInvalid))));
    }

    #[tokio::test]
    async fn verify_refresh_rejects_deleted_account() {
        let (service, store, id) = setup().await;
        let pair = service.issue(id).await.unwrap();
        store.delete(id).await.unwrap();

        let result = service.verify_refresh(&pair.refresh_token).await;
        assert!(matches!(result, Err(AppError::Auth(AuthError::TokenInvalid))));
    }

    #[tokio::test]
    async fn verify_refresh_rejects_expired_token() {
        let (service, store, id) = setup().await;
        let config = test_config();
        let claims = Claims::new(id, -3600, config.issuer.clone());
        let expired = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.refresh_secret.as_bytes()),
        )
        .unwrap();
        // Even a stored token is refused once it has expired
        store.set_refresh_token(id, Some(&expired)).await.unwrap();

        let result = service.verify_refresh(&expired).await;
        assert!(matches!(result, Err(AppError::Auth(AuthError::TokenInvalid))));
    }

    #[tokio::test]
    async fn access_tokens_survive_rotation() {
        let (service, _, id) = setup().await;
        let first = service.issue(id).await.unwrap();
        service.rotate(id).await.unwrap();

        assert_eq!(service.verify_access(&first.access_token).unwrap(), id);
    }

    #[tokio::test]
    async fn authenticate_resolves_account() {
        let (service, store, id) = setup().await;
        let pair = service.issue(id).await.unwrap();

        let account = service.authenticate(&pair.access_token).await.unwrap();
        assert_eq!(account.id, id);

        store.delete(id).await.unwrap();
        assert!(service.authenticate(&pair.access_token).await.is_err());
        assert!(service.authenticate(&pair.refresh_token).await.is_err());
    }
}
