/// Account records
///
/// `Account` is the full stored record. Everything that leaves the service goes
/// through `AccountProfile`, which drops the password hash and refresh token.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub age: i32,
    pub city: String,
    pub postal_code: String,
    pub password_hash: String,
    pub refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn profile(&self) -> AccountProfile {
        AccountProfile {
            id: self.id,
            email: self.email.clone(),
            name: self.name.clone(),
            age: self.age,
            city: self.city.clone(),
            postal_code: self.postal_code.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Sanitized account representation
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccountProfile {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub age: i32,
    pub city: String,
    #[serde(rename = "zipcode")]
    pub postal_code: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated data for a new account, password already hashed
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub name: String,
    pub age: i32,
    pub city: String,
    pub postal_code: String,
    pub password_hash: String,
}

/// Validated profile changes. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub age: Option<i32>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub email: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.age.is_none()
            && self.city.is_none()
            && self.postal_code.is_none()
            && self.email.is_none()
    }

    /// Apply the changes to a stored record in place.
    pub fn apply_to(&self, account: &mut Account) {
        if let Some(name) = &self.name {
            account.name = name.clone();
        }
        if let Some(age) = self.age {
            account.age = age;
        }
        if let Some(city) = &self.city {
            account.city = city.clone();
        }
        if let Some(postal_code) = &self.postal_code {
            account.postal_code = postal_code.clone();
        }
        if let Some(email) = &self.email {
            account.email = email.clone();
        }
        account.updated_at = Utc::now();
    }
}
