/// Application Error Handling
///
/// Every failure in the service maps onto `AppError`. The enum is split into
/// domain-specific kinds so each layer reports what actually went wrong:
/// 1. Validation of incoming payloads
/// 2. Credential store faults
/// 3. Account lookups and conflicts
/// 4. Authentication and session tokens
///
/// At the request boundary `AppError` is rendered into the standard error
/// envelope `{statusCode, data: null, message, success: false}`.

use actix_web::{error::ResponseError, http::StatusCode, HttpMessage, HttpRequest, HttpResponse};
use std::error::Error as StdError;
use std::fmt;

/// ============================================================================
/// 1. DOMAIN-SPECIFIC ERROR TYPES
/// ============================================================================

/// Validation errors for request payloads
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    EmptyField(String),
    TooShort(String, usize),
    TooLong(String, usize),
    InvalidFormat(String),
    OutOfRange(String),
    SuspiciousContent(String),
    PossibleSQLInjection,
    NoUpdatableFields,
    Malformed(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyField(field) => write!(f, "{} is empty", field),
            ValidationError::TooShort(field, min) => {
                write!(f, "{} is too short (minimum {} characters)", field, min)
            }
            ValidationError::TooLong(field, max) => {
                write!(f, "{} is too long (maximum {} characters)", field, max)
            }
            ValidationError::InvalidFormat(field) => write!(f, "{} has invalid format", field),
            ValidationError::OutOfRange(field) => write!(f, "{} is out of range", field),
            ValidationError::SuspiciousContent(field) => {
                write!(f, "{} contains suspicious content", field)
            }
            ValidationError::PossibleSQLInjection => {
                write!(f, "input contains potentially dangerous SQL patterns")
            }
            ValidationError::NoUpdatableFields => write!(f, "No valid fields to update"),
            ValidationError::Malformed(msg) => write!(f, "Malformed request: {}", msg),
        }
    }
}

impl StdError for ValidationError {}

/// Credential store errors
#[derive(Debug)]
pub enum DatabaseError {
    UniqueConstraintViolation(String),
    QueryExecution(String),
    ConnectionPool(String),
    UnexpectedError(String),
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseError::UniqueConstraintViolation(msg) => {
                write!(f, "Duplicate entry: {}", msg)
            }
            DatabaseError::QueryExecution(msg) => write!(f, "Query error: {}", msg),
            DatabaseError::ConnectionPool(msg) => write!(f, "Database connection error: {}", msg),
            DatabaseError::UnexpectedError(msg) => write!(f, "Database error: {}", msg),
        }
    }
}

impl StdError for DatabaseError {}

/// Account lookup errors
#[derive(Debug, Clone, PartialEq)]
pub enum AccountError {
    AlreadyExists,
    NotFound,
}

impl fmt::Display for AccountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountError::AlreadyExists => write!(f, "user already existed"),
            AccountError::NotFound => write!(f, "user not found"),
        }
    }
}

impl StdError for AccountError {}

/// Authentication and session errors
#[derive(Debug, Clone, PartialEq)]
pub enum AuthError {
    InvalidCredentials,
    TokenInvalid,
    SessionExpired,
    MissingToken,
    TokenIssuance,
    Forbidden,
    Unauthorized(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::InvalidCredentials => write!(f, "Invalid credentials"),
            AuthError::TokenInvalid => write!(f, "Invalid or expired token"),
            AuthError::SessionExpired => write!(f, "Refresh token expired or already used"),
            AuthError::MissingToken => write!(f, "Unauthorized request"),
            AuthError::TokenIssuance => write!(f, "Unable to generate tokens"),
            AuthError::Forbidden => write!(f, "Operation not permitted for this account"),
            AuthError::Unauthorized(msg) => write!(f, "{}", msg),
        }
    }
}

impl StdError for AuthError {}

/// ============================================================================
/// 2. UNIFIED APPLICATION ERROR TYPE
/// ============================================================================

/// Central error type that all application errors map to
#[derive(Debug)]
pub enum AppError {
    Validation(ValidationError),
    Database(DatabaseError),
    Account(AccountError),
    Auth(AuthError),
    Internal(String),
}

const INVALID_REFRESH_TOKEN: &str = "Invalid refresh token";

impl AppError {
    /// Collapse any failure into a 401.
    ///
    /// The refresh flow reports every verification or rotation failure this way.
    /// Client-facing messages are kept; store and internal faults are logged
    /// and replaced by a generic one.
    pub fn into_unauthorized(self) -> AppError {
        match self {
            AppError::Auth(AuthError::Unauthorized(_)) => self,
            AppError::Database(_) | AppError::Internal(_) => {
                tracing::error!(error = %self, "Refresh failed on a server fault");
                AppError::Auth(AuthError::Unauthorized(INVALID_REFRESH_TOKEN.to_string()))
            }
            other => AppError::Auth(AuthError::Unauthorized(other.to_string())),
        }
    }

    /// Render the error envelope under a known request id.
    pub fn render(&self, request_id: &str) -> HttpResponse {
        self.log_error(request_id);
        let (status, error_response) = <Self as ErrorHandler>::error_response(self, request_id);
        HttpResponse::build(status).json(error_response)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(e) => write!(f, "{}", e),
            AppError::Database(e) => write!(f, "{}", e),
            AppError::Account(e) => write!(f, "{}", e),
            AppError::Auth(e) => write!(f, "{}", e),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl StdError for AppError {}

// ============================================================================
// FROM IMPLEMENTATIONS
// ============================================================================

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err)
    }
}

impl From<DatabaseError> for AppError {
    fn from(err: DatabaseError) -> Self {
        AppError::Database(err)
    }
}

impl From<AccountError> for AppError {
    fn from(err: AccountError) -> Self {
        AppError::Account(err)
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Auth(err)
    }
}

/// Postgres SQLSTATE for unique_violation
const UNIQUE_VIOLATION: &str = "23505";

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err)
                if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) =>
            {
                AppError::Database(DatabaseError::UniqueConstraintViolation(
                    "email or zipcode already registered".to_string(),
                ))
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                AppError::Database(DatabaseError::ConnectionPool(err.to_string()))
            }
            sqlx::Error::Database(_) | sqlx::Error::ColumnDecode { .. } => {
                AppError::Database(DatabaseError::QueryExecution(err.to_string()))
            }
            _ => AppError::Database(DatabaseError::UnexpectedError(err.to_string())),
        }
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Internal(msg)
    }
}

// ============================================================================
// 3. HTTP RESPONSE MAPPING
// ============================================================================

/// Error envelope returned to clients
#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// HTTP status code
    pub status_code: u16,
    /// Always null for errors
    pub data: Option<()>,
    /// Human-readable error message
    pub message: String,
    /// Always false for errors
    pub success: bool,
    /// Error code for client-side handling
    pub code: String,
    /// Unique error ID for correlating with server logs
    pub error_id: String,
}

impl ErrorResponse {
    pub fn new(error_id: String, message: String, code: String, status: u16) -> Self {
        Self {
            status_code: status,
            data: None,
            message,
            success: false,
            code,
            error_id,
        }
    }
}

/// Trait for converting errors to HTTP responses with proper logging
pub trait ErrorHandler {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse);
    fn log_error(&self, request_id: &str);
}

impl AppError {
    fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Database(DatabaseError::UniqueConstraintViolation(_)) => "CONFLICT",
            AppError::Database(DatabaseError::ConnectionPool(_)) => "SERVICE_UNAVAILABLE",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Account(AccountError::AlreadyExists) => "CONFLICT",
            AppError::Account(AccountError::NotFound) => "NOT_FOUND",
            AppError::Auth(e) => match e {
                AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
                AuthError::TokenInvalid => "TOKEN_INVALID",
                AuthError::SessionExpired => "SESSION_EXPIRED",
                AuthError::MissingToken => "MISSING_TOKEN",
                AuthError::TokenIssuance => "TOKEN_ISSUANCE_FAILED",
                AuthError::Forbidden => "FORBIDDEN",
                AuthError::Unauthorized(_) => "UNAUTHORIZED",
            },
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Message shown to clients. Store and internal details stay in the logs.
    fn public_message(&self) -> String {
        match self {
            AppError::Database(DatabaseError::UniqueConstraintViolation(_)) => {
                "user already existed".to_string()
            }
            AppError::Database(DatabaseError::ConnectionPool(_)) => {
                "Database service temporarily unavailable".to_string()
            }
            AppError::Database(_) => "Database error occurred".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl ErrorHandler for AppError {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse) {
        let status = self.status_code();
        let error_response = ErrorResponse::new(
            request_id.to_string(),
            self.public_message(),
            self.code().to_string(),
            status.as_u16(),
        );

        (status, error_response)
    }

    fn log_error(&self, request_id: &str) {
        match self {
            AppError::Validation(e) => {
                tracing::warn!(request_id = request_id, error = %e, "Validation error");
            }
            AppError::Database(DatabaseError::UniqueConstraintViolation(_))
            | AppError::Account(AccountError::AlreadyExists) => {
                tracing::warn!(request_id = request_id, error = %self, "Duplicate entry attempt");
            }
            AppError::Database(e) => {
                tracing::error!(request_id = request_id, error = %e, "Database error");
            }
            AppError::Account(e) => {
                tracing::info!(request_id = request_id, error = %e, "Account lookup failed");
            }
            AppError::Auth(AuthError::TokenIssuance) => {
                tracing::error!(request_id = request_id, error = %self, "Token issuance failed");
            }
            AppError::Auth(AuthError::InvalidCredentials) => {
                tracing::warn!(request_id = request_id, "Invalid credentials attempt");
            }
            AppError::Auth(e) => {
                tracing::warn!(request_id = request_id, error = %e, "Authentication error");
            }
            AppError::Internal(msg) => {
                tracing::error!(request_id = request_id, error = %msg, "Internal error");
            }
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        self.render(&uuid::Uuid::new_v4().to_string())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Database(e) => match e {
                DatabaseError::UniqueConstraintViolation(_) => StatusCode::CONFLICT,
                DatabaseError::ConnectionPool(_) => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Account(AccountError::AlreadyExists) => StatusCode::CONFLICT,
            AppError::Account(AccountError::NotFound) => StatusCode::NOT_FOUND,
            AppError::Auth(e) => match e {
                AuthError::TokenIssuance => StatusCode::INTERNAL_SERVER_ERROR,
                AuthError::Forbidden => StatusCode::FORBIDDEN,
                _ => StatusCode::UNAUTHORIZED,
            },
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// An `AppError` tied to the request it failed, so `errorId` matches the
/// `x-request-id` header and the log lines of that request
#[derive(Debug)]
pub struct RequestError {
    pub request_id: String,
    pub error: AppError,
}

impl RequestError {
    /// Bind to the id `LoggerMiddleware` assigned, or a fresh one.
    pub fn for_request(req: &HttpRequest, error: AppError) -> Self {
        Self {
            request_id: request_id_of(req).unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            error,
        }
    }
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl StdError for RequestError {}

impl From<AppError> for RequestError {
    fn from(error: AppError) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            error,
        }
    }
}

impl ResponseError for RequestError {
    fn error_response(&self) -> HttpResponse {
        self.error.render(&self.request_id)
    }

    fn status_code(&self) -> StatusCode {
        self.error.status_code()
    }
}

/// Id assigned to the request by `LoggerMiddleware`
pub fn request_id_of(req: &impl HttpMessage) -> Option<String> {
    req.extensions()
        .get::<crate::logger::RequestId>()
        .map(|id| id.0.clone())
}

// ============================================================================
// 4. ERROR CONTEXT ENRICHMENT
// ============================================================================

/// Request-scoped context for log enrichment
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub request_id: String,
    pub account_id: Option<String>,
    pub operation: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl ErrorContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            account_id: None,
            operation: operation.into(),
            timestamp: chrono::Utc::now(),
        }
    }

    /// Context carrying the id assigned by `LoggerMiddleware`, if any.
    pub fn for_request(req: &HttpRequest, operation: impl Into<String>) -> Self {
        let context = Self::new(operation);
        match request_id_of(req) {
            Some(id) => context.with_request_id(id),
            None => context,
        }
    }

    pub fn with_request_id(mut self, request_id: String) -> Self {
        self.request_id = request_id;
        self
    }

    pub fn with_account_id(mut self, account_id: impl ToString) -> Self {
        self.account_id = Some(account_id.to_string());
        self
    }

    /// Log a failure with the context attached, then hand it back bound to
    /// this request's id.
    pub fn record(&self, error: AppError) -> RequestError {
        let status = error.status_code();
        if status.is_server_error() {
            tracing::error!(
                request_id = %self.request_id,
                operation = %self.operation,
                account_id = ?self.account_id,
                error = %error,
                "Operation failed"
            );
        } else {
            tracing::warn!(
                request_id = %self.request_id,
                operation = %self.operation,
                account_id = ?self.account_id,
                error = %error,
                "Operation rejected"
            );
        }
        RequestError {
            request_id: self.request_id.clone(),
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::EmptyField("email".to_string());
        assert_eq!(err.to_string(), "email is empty");
    }

    #[test]
    fn test_app_error_conversion() {
        let val_err = ValidationError::InvalidFormat("test".to_string());
        let app_err: AppError = val_err.into();
        match app_err {
            AppError::Validation(_) => (),
            _ => panic!("Expected Validation error"),
        }
    }

    #[test]
    fn test_status_codes() {
        let cases = vec![
            (AppError::Validation(ValidationError::NoUpdatableFields), 400),
            (AppError::Account(AccountError::AlreadyExists), 409),
            (AppError::Account(AccountError::NotFound), 404),
            (AppError::Auth(AuthError::InvalidCredentials), 401),
            (AppError::Auth(AuthError::TokenInvalid), 401),
            (AppError::Auth(AuthError::SessionExpired), 401),
            (AppError::Auth(AuthError::Forbidden), 403),
            (AppError::Auth(AuthError::TokenIssuance), 500),
            (
                AppError::Database(DatabaseError::UniqueConstraintViolation("x".into())),
                409,
            ),
            (AppError::Internal("boom".into()), 500),
        ];

        for (error, expected) in cases {
            assert_eq!(error.status_code().as_u16(), expected, "{:?}", error);
        }
    }

    #[test]
    fn test_error_envelope_shape() {
        let error = AppError::Account(AccountError::NotFound);
        let (status, body) = ErrorHandler::error_response(&error, "req-1");
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["statusCode"], 404);
        assert!(json["data"].is_null());
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "user not found");
        assert_eq!(json["errorId"], "req-1");
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let error = AppError::Internal("connection string leaked".to_string());
        let (_, body) = ErrorHandler::error_response(&error, "req-2");
        assert_eq!(body.message, "Internal server error");
    }

    #[test]
    fn test_into_unauthorized_keeps_message() {
        let error = AppError::Auth(AuthError::SessionExpired).into_unauthorized();
        assert_eq!(error.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(error.to_string(), "Refresh token expired or already used");

        let issuance = AppError::Auth(AuthError::TokenIssuance).into_unauthorized();
        assert_eq!(issuance.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_into_unauthorized_hides_store_faults() {
        let faults = vec![
            AppError::Database(DatabaseError::QueryExecution(
                "relation accounts at db.internal:5432 password=hunter2".into(),
            )),
            AppError::Internal("pool poisoned".into()),
        ];

        for fault in faults {
            let error = fault.into_unauthorized();
            assert_eq!(error.status_code(), StatusCode::UNAUTHORIZED);
            assert_eq!(error.to_string(), "Invalid refresh token");
        }
    }

    #[test]
    fn test_request_error_uses_logger_request_id() {
        let req = actix_web::test::TestRequest::default().to_http_request();
        req.extensions_mut()
            .insert(crate::logger::RequestId("req-42".to_string()));

        let error = RequestError::for_request(&req, AppError::Auth(AuthError::MissingToken));
        assert_eq!(error.request_id, "req-42");
        assert_eq!(error.status_code(), StatusCode::UNAUTHORIZED);

        let recorded = ErrorContext::for_request(&req, "lookup")
            .record(AppError::Account(AccountError::NotFound));
        assert_eq!(recorded.request_id, "req-42");
    }

    #[test]
    fn test_error_context_creation() {
        let ctx = ErrorContext::new("test_operation");
        assert_eq!(ctx.operation, "test_operation");
        assert!(ctx.account_id.is_none());

        let ctx_with_account = ctx.with_account_id("account-123");
        assert_eq!(ctx_with_account.account_id, Some("account-123".to_string()));
    }
}
