/// Field validators for account payloads
/// Features:
/// 1. DoS Protection: Input length limits
/// 2. Data Theft Protection: Control character rejection
/// 3. Phishing Protection: Email validation
/// 4. SQL Injection Prevention: Pattern screening on free text

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ValidationError;

const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321
const MIN_EMAIL_LENGTH: usize = 5;
const MAX_TEXT_LENGTH: usize = 256;
const MIN_POSTAL_CODE_LENGTH: usize = 3;
const MAX_POSTAL_CODE_LENGTH: usize = 10;
const MAX_AGE: i64 = 150;

lazy_static! {
    // RFC 5322 simplified email regex (practical validation)
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).unwrap();

    static ref POSTAL_CODE_REGEX: Regex = Regex::new(r"^[A-Za-z0-9][A-Za-z0-9 -]*[A-Za-z0-9]$").unwrap();

    static ref SQL_INJECTION_PATTERNS: [Regex; 4] = [
        // Union-based SQL injection
        Regex::new(r"(?i)\s+UNION\s+").unwrap(),
        // Comment-based injection
        Regex::new(r"(--|;|/\*|\*/)").unwrap(),
        // Stacked queries
        Regex::new(r"(?i);\s*(INSERT|UPDATE|DELETE|DROP|CREATE|ALTER)").unwrap(),
        // Boolean-based injection
        Regex::new(r#"(?i)(\bOR\b|\bAND\b)\s*(['"][0-9]*['"]|[0-9]*)\s*=\s*(['"][0-9]*['"]|[0-9]*|True|False)"#).unwrap(),
    ];
}

/// Validates an email address and returns it trimmed and lowercased
pub fn is_valid_email(email: &str) -> Result<String, ValidationError> {
    let trimmed = email.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("email".to_string()));
    }

    if trimmed.len() < MIN_EMAIL_LENGTH {
        return Err(ValidationError::TooShort("email".to_string(), MIN_EMAIL_LENGTH));
    }

    if trimmed.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong("email".to_string(), MAX_EMAIL_LENGTH));
    }

    if !EMAIL_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("email".to_string()));
    }

    if has_suspicious_email_patterns(trimmed) {
        return Err(ValidationError::SuspiciousContent("email".to_string()));
    }

    if contains_sql_injection_patterns(trimmed) {
        return Err(ValidationError::PossibleSQLInjection);
    }

    Ok(trimmed.to_lowercase())
}

/// Validates a display name
pub fn is_valid_name(name: &str) -> Result<String, ValidationError> {
    is_valid_text("name", name)
}

/// Validates a city name
pub fn is_valid_city(city: &str) -> Result<String, ValidationError> {
    is_valid_text("city", city)
}

/// Validates a postal code: letters, digits, inner spaces and hyphens
pub fn is_valid_postal_code(postal_code: &str) -> Result<String, ValidationError> {
    let trimmed = postal_code.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("zipcode".to_string()));
    }

    if trimmed.len() < MIN_POSTAL_CODE_LENGTH {
        return Err(ValidationError::TooShort("zipcode".to_string(), MIN_POSTAL_CODE_LENGTH));
    }

    if trimmed.len() > MAX_POSTAL_CODE_LENGTH {
        return Err(ValidationError::TooLong("zipcode".to_string(), MAX_POSTAL_CODE_LENGTH));
    }

    if !POSTAL_CODE_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("zipcode".to_string()));
    }

    Ok(trimmed.to_string())
}

/// Validates an age in whole years
pub fn is_valid_age(age: i64) -> Result<i32, ValidationError> {
    if !(0..=MAX_AGE).contains(&age) {
        return Err(ValidationError::OutOfRange("age".to_string()));
    }
    Ok(age as i32)
}

fn is_valid_text(field: &str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField(field.to_string()));
    }

    if trimmed.len() > MAX_TEXT_LENGTH {
        return Err(ValidationError::TooLong(field.to_string(), MAX_TEXT_LENGTH));
    }

    if has_suspicious_text_patterns(trimmed) {
        return Err(ValidationError::SuspiciousContent(field.to_string()));
    }

    if contains_sql_injection_patterns(trimmed) {
        return Err(ValidationError::PossibleSQLInjection);
    }

    Ok(trimmed.to_string())
}

/// Detects suspicious patterns in email addresses that might indicate phishing
fn has_suspicious_email_patterns(email: &str) -> bool {
    // Overlong local part
    if let Some(at_pos) = email.find('@') {
        if at_pos > 64 {
            return true;
        }
    }

    if email.matches('@').count() != 1 {
        return true;
    }

    email.contains('\0')
}

/// Detects control characters and symbol-heavy input in free text
fn has_suspicious_text_patterns(text: &str) -> bool {
    if text.chars().any(|c| c.is_control()) {
        return true;
    }

    let special_char_count = text
        .chars()
        .filter(|c| {
            !c.is_alphanumeric() && !c.is_whitespace() && !matches!(c, '-' | '.' | '_' | '\'')
        })
        .count();

    special_char_count > 5
}

fn contains_sql_injection_patterns(input: &str) -> bool {
    SQL_INJECTION_PATTERNS.iter().any(|pattern| pattern.is_match(input))
}
