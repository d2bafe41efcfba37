/// Request schemas
///
/// Incoming payloads are deserialized into the request types below and then
/// checked field by field. A payload that passes comes out as a normalized,
/// typed value; anything else is a `ValidationError`.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::account::ProfileUpdate;
use crate::auth::validate_password;
use crate::error::ValidationError;
use crate::validators::{
    is_valid_age, is_valid_city, is_valid_email, is_valid_name, is_valid_postal_code,
};

/// Profile fields a client may change
pub const ALLOWED_PROFILE_FIELDS: [&str; 5] = ["name", "age", "city", "zipcode", "email"];

/// Postal codes arrive either as JSON numbers or strings
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PostalCodeInput {
    Number(u64),
    Text(String),
}

impl PostalCodeInput {
    fn into_validated(self) -> Result<String, ValidationError> {
        match self {
            PostalCodeInput::Number(n) => is_valid_postal_code(&n.to_string()),
            PostalCodeInput::Text(s) => is_valid_postal_code(&s),
        }
    }
}

/// Registration payload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub name: Option<String>,
    pub age: Option<i64>,
    pub city: Option<String>,
    pub zipcode: Option<PostalCodeInput>,
    pub password: Option<String>,
}

/// Registration data that passed validation. The password is still plain text.
#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub name: String,
    pub age: i32,
    pub city: String,
    pub postal_code: String,
    pub password: String,
}

impl RegisterRequest {
    pub fn validate(self) -> Result<Registration, ValidationError> {
        let email = is_valid_email(&required("email", self.email)?)?;
        let name = is_valid_name(&required("name", self.name)?)?.to_lowercase();
        let age = is_valid_age(required("age", self.age)?)?;
        let city = is_valid_city(&required("city", self.city)?)?;
        let postal_code = required("zipcode", self.zipcode)?.into_validated()?;
        let password = required("password", self.password)?;
        validate_password(&password)?;

        Ok(Registration {
            email,
            name,
            age,
            city,
            postal_code,
            password,
        })
    }
}

/// Login payload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(self) -> Result<Credentials, ValidationError> {
        let email = is_valid_email(&required("email", self.email)?)?;
        let password = required("password", self.password)?;
        if password.is_empty() {
            return Err(ValidationError::EmptyField("password".to_string()));
        }
        Ok(Credentials { email, password })
    }
}

/// Password change payload
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

/// Partial profile payload, all fields optional
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct UpdateRequest {
    name: Option<String>,
    age: Option<i64>,
    city: Option<String>,
    zipcode: Option<PostalCodeInput>,
    email: Option<String>,
}

/// Keep only the keys a client is allowed to change.
pub fn filter_allowed_fields(payload: &Map<String, Value>) -> Map<String, Value> {
    payload
        .iter()
        .filter(|(key, _)| ALLOWED_PROFILE_FIELDS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Validate an already filtered profile payload against the partial schema.
pub fn validate_profile_update(fields: Map<String, Value>) -> Result<ProfileUpdate, ValidationError> {
    let request: UpdateRequest = serde_json::from_value(Value::Object(fields))
        .map_err(|e| ValidationError::Malformed(e.to_string()))?;

    let update = ProfileUpdate {
        name: request.name.as_deref().map(is_valid_name).transpose()?,
        age: request.age.map(is_valid_age).transpose()?,
        city: request.city.as_deref().map(is_valid_city).transpose()?,
        postal_code: request
            .zipcode
            .map(PostalCodeInput::into_validated)
            .transpose()?,
        email: request.email.as_deref().map(is_valid_email).transpose()?,
    };

    if update.is_empty() {
        return Err(ValidationError::NoUpdatableFields);
    }

    Ok(update)
}

fn required<T>(field: &str, value: Option<T>) -> Result<T, ValidationError> {
    value.ok_or_else(|| ValidationError::EmptyField(field.to_string()))
}
