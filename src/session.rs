/// Session Handler
///
/// Account workflows on top of the Token Service and the credential store:
/// registration, login, logout, refresh, password change and profile
/// management. HTTP concerns (cookies, envelopes) stay in `routes`.

use serde_json::{Map, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::account::{AccountProfile, NewAccount};
use crate::auth::{hash_password, verify_password, TokenPair, TokenService};
use crate::error::{AccountError, AppError, AuthError, ValidationError};
use crate::schema::{
    filter_allowed_fields, validate_profile_update, ChangePasswordRequest, LoginRequest,
    RegisterRequest,
};
use crate::store::AccountStore;

/// Result of a successful login
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub account: AccountProfile,
    pub tokens: TokenPair,
}

#[derive(Clone)]
pub struct SessionHandler {
    store: Arc<dyn AccountStore>,
    tokens: TokenService,
    password_hash_cost: u32,
}

impl SessionHandler {
    pub fn new(store: Arc<dyn AccountStore>, tokens: TokenService, password_hash_cost: u32) -> Self {
        Self {
            store,
            tokens,
            password_hash_cost,
        }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Create an account. Either a taken email or a taken postal code blocks
    /// registration.
    pub async fn register(&self, payload: RegisterRequest) -> Result<AccountProfile, AppError> {
        let registration = payload.validate()?;

        let existing = self
            .store
            .find_by_email_or_postal_code(&registration.email, &registration.postal_code)
            .await?;
        if existing.is_some() {
            return Err(AppError::Account(AccountError::AlreadyExists));
        }

        let password_hash = hash_password(&registration.password, self.password_hash_cost)?;
        let created = self
            .store
            .insert(NewAccount {
                email: registration.email,
                name: registration.name,
                age: registration.age,
                city: registration.city,
                postal_code: registration.postal_code,
                password_hash,
            })
            .await?;

        let account = self
            .store
            .find_by_id(created.id)
            .await?
            .ok_or_else(|| AppError::Internal("unable to create a user".to_string()))?;

        tracing::info!(account_id = %account.id, "Account registered");
        Ok(account.profile())
    }

    /// Check credentials and open a new session.
    pub async fn login(&self, payload: LoginRequest) -> Result<LoginOutcome, AppError> {
        let credentials = payload.validate()?;

        let account = self
            .store
            .find_by_email(&credentials.email)
            .await?
            .ok_or(AppError::Account(AccountError::NotFound))?;

        if !verify_password(&credentials.password, &account.password_hash)? {
            return Err(AppError::Auth(AuthError::InvalidCredentials));
        }

        let tokens = self.tokens.issue(account.id).await?;

        tracing::info!(account_id = %account.id, "Account logged in");
        Ok(LoginOutcome {
            account: account.profile(),
            tokens,
        })
    }

    pub async fn logout(&self, account_id: Uuid) -> Result<(), AppError> {
        self.tokens.revoke(account_id).await?;
        tracing::info!(account_id = %account_id, "Account logged out");
        Ok(())
    }

    /// Exchange the caller's current refresh token for a new pair. Every
    /// failure is reported as unauthorized.
    pub async fn refresh(&self, caller: Uuid, presented: Option<&str>) -> Result<TokenPair, AppError> {
        let token = presented
            .filter(|t| !t.is_empty())
            .ok_or(AppError::Auth(AuthError::MissingToken))?;

        let account_id = self
            .tokens
            .verify_refresh(token)
            .await
            .map_err(AppError::into_unauthorized)?;

        if account_id != caller {
            tracing::warn!(
                account_id = %caller,
                token_account_id = %account_id,
                "Refresh token belongs to another account"
            );
            return Err(AppError::Auth(AuthError::TokenInvalid).into_unauthorized());
        }

        self.tokens
            .rotate(account_id)
            .await
            .map_err(AppError::into_unauthorized)
    }

    pub async fn change_password(
        &self,
        account_id: Uuid,
        request: ChangePasswordRequest,
    ) -> Result<(), AppError> {
        let account = self
            .store
            .find_by_id(account_id)
            .await?
            .ok_or(AppError::Account(AccountError::NotFound))?;

        if !verify_password(&request.old_password, &account.password_hash)? {
            return Err(AppError::Auth(AuthError::InvalidCredentials));
        }

        let password_hash = hash_password(&request.new_password, self.password_hash_cost)?;
        if !self.store.set_password_hash(account_id, &password_hash).await? {
            return Err(AppError::Account(AccountError::NotFound));
        }

        tracing::info!(account_id = %account_id, "Password changed");
        Ok(())
    }

    /// Apply allow-listed profile changes. With `partial`, a missing account is
    /// reported before the payload is looked at.
    pub async fn update_profile(
        &self,
        account_id: Uuid,
        payload: &Map<String, Value>,
        partial: bool,
    ) -> Result<AccountProfile, AppError> {
        if partial && self.store.find_by_id(account_id).await?.is_none() {
            return Err(AppError::Account(AccountError::NotFound));
        }

        let fields = filter_allowed_fields(payload);
        if fields.is_empty() {
            return Err(AppError::Validation(ValidationError::NoUpdatableFields));
        }
        let update = validate_profile_update(fields)?;

        let updated = self
            .store
            .update_profile(account_id, &update)
            .await?
            .ok_or(AppError::Account(AccountError::NotFound))?;

        tracing::info!(account_id = %account_id, partial = partial, "Profile updated");
        Ok(updated.profile())
    }

    pub async fn list_accounts(&self) -> Result<Vec<AccountProfile>, AppError> {
        let accounts = self.store.list().await?;
        Ok(accounts.iter().map(|a| a.profile()).collect())
    }

    pub async fn get_account(&self, account_id: Uuid) -> Result<AccountProfile, AppError> {
        self.store
            .find_by_id(account_id)
            .await?
            .map(|a| a.profile())
            .ok_or(AppError::Account(AccountError::NotFound))
    }

    pub async fn delete_account(&self, account_id: Uuid) -> Result<(), AppError> {
        if !self.store.delete(account_id).await? {
            return Err(AppError::Account(AccountError::NotFound));
        }
        tracing::info!(account_id = %account_id, "Account deleted");
        Ok(())
    }
}
