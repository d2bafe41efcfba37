use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::account::{Account, NewAccount, ProfileUpdate};
use crate::error::{AppError, DatabaseError};
use crate::store::AccountStore;

/// Process-local store, used for tests and `store = "memory"` deployments
#[derive(Default)]
pub struct InMemoryAccountStore {
    accounts: RwLock<HashMap<Uuid, Account>>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn conflict(field: &str) -> AppError {
    AppError::Database(DatabaseError::UniqueConstraintViolation(format!(
        "{} already registered",
        field
    )))
}

/// Check uniqueness of email and postal code against every other account.
fn ensure_unique<'a>(
    accounts: impl Iterator<Item = &'a Account>,
    skip: Option<Uuid>,
    email: Option<&str>,
    postal_code: Option<&str>,
) -> Result<(), AppError> {
    for other in accounts.filter(|a| Some(a.id) != skip) {
        if email == Some(other.email.as_str()) {
            return Err(conflict("email"));
        }
        if postal_code == Some(other.postal_code.as_str()) {
            return Err(conflict("zipcode"));
        }
    }
    Ok(())
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, AppError> {
        Ok(self.accounts.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AppError> {
        Ok(self
            .accounts
            .read()
            .await
            .values()
            .find(|a| a.email == email)
            .cloned())
    }

    async fn find_by_email_or_postal_code(
        &self,
        email: &str,
        postal_code: &str,
    ) -> Result<Option<Account>, AppError> {
        Ok(self
            .accounts
            .read()
            .await
            .values()
            .find(|a| a.email == email || a.postal_code == postal_code)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<Account>, AppError> {
        let mut accounts: Vec<Account> = self.accounts.read().await.values().cloned().collect();
        accounts.sort_by_key(|a| a.created_at);
        Ok(accounts)
    }

    async fn insert(&self, account: NewAccount) -> Result<Account, AppError> {
        let mut accounts = self.accounts.write().await;
        ensure_unique(
            accounts.values(),
            None,
            Some(&account.email),
            Some(&account.postal_code),
        )?;

        let now = Utc::now();
        let record = Account {
            id: Uuid::new_v4(),
            email: account.email,
            name: account.name,
            age: account.age,
            city: account.city,
            postal_code: account.postal_code,
            password_hash: account.password_hash,
            refresh_token: None,
            created_at: now,
            updated_at: now,
        };
        accounts.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        update: &ProfileUpdate,
    ) -> Result<Option<Account>, AppError> {
        let mut accounts = self.accounts.write().await;
        if !accounts.contains_key(&id) {
            return Ok(None);
        }
        ensure_unique(
            accounts.values(),
            Some(id),
            update.email.as_deref(),
            update.postal_code.as_deref(),
        )?;

        Ok(accounts.get_mut(&id).map(|account| {
            update.apply_to(account);
            account.clone()
        }))
    }

    async fn set_password_hash(&self, id: Uuid, password_hash: &str) -> Result<bool, AppError> {
        let mut accounts = self.accounts.write().await;
        Ok(match accounts.get_mut(&id) {
            Some(account) => {
                account.password_hash = password_hash.to_string();
                account.updated_at = Utc::now();
                true
            }
            None => false,
        })
    }

    async fn set_refresh_token(&self, id: Uuid, token: Option<&str>) -> Result<bool, AppError> {
        let mut accounts = self.accounts.write().await;
        Ok(match accounts.get_mut(&id) {
            Some(account) => {
                account.refresh_token = token.map(str::to_string);
                true
            }
            None => false,
        })
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        Ok(self.accounts.write().await.remove(&id).is_some())
    }
}
