/// Authentication module
///
/// Handles JWT token generation/validation, password hashing,
/// and the session token lifecycle.

mod claims;
mod jwt;
mod password;
mod token_service;

pub use claims::Claims;
pub use jwt::generate_token;
pub use jwt::validate_token;
pub use jwt::TokenKind;
pub use password::hash_password;
pub use password::validate_password;
pub use password::verify_password;
pub use token_service::TokenPair;
pub use token_service::TokenService;
