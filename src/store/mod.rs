/// Credential store
///
/// One record per account. The Token Service and the Session Handler only talk
/// to persistence through `AccountStore`, so the same flows run against
/// Postgres in production and against memory in tests.

mod memory;
mod postgres;

pub use memory::InMemoryAccountStore;
pub use postgres::PostgresAccountStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::account::{Account, NewAccount, ProfileUpdate};
use crate::error::AppError;

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, AppError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AppError>;

    /// First account whose email OR postal code matches.
    async fn find_by_email_or_postal_code(
        &self,
        email: &str,
        postal_code: &str,
    ) -> Result<Option<Account>, AppError>;

    async fn list(&self) -> Result<Vec<Account>, AppError>;

    /// Fails with a uniqueness violation if email or postal code is taken.
    async fn insert(&self, account: NewAccount) -> Result<Account, AppError>;

    /// Returns `None` when no account has this id.
    async fn update_profile(
        &self,
        id: Uuid,
        update: &ProfileUpdate,
    ) -> Result<Option<Account>, AppError>;

    /// Returns whether an account was updated.
    async fn set_password_hash(&self, id: Uuid, password_hash: &str) -> Result<bool, AppError>;

    /// Overwrite (or clear, with `None`) the stored refresh token.
    /// Returns whether an account was updated.
    async fn set_refresh_token(&self, id: Uuid, token: Option<&str>) -> Result<bool, AppError>;

    /// Returns whether an account was removed.
    async fn delete(&self, id: Uuid) -> Result<bool, AppError>;
}
