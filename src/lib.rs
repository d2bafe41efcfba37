//! Account and session service.
//!
//! Registration, login, token refresh, logout, password change and profile
//! management over HTTP, backed by a pluggable credential store.

pub mod account;
pub mod auth;
pub mod configuration;
pub mod error;
pub mod logger;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod schema;
pub mod session;
pub mod startup;
pub mod store;
pub mod telemetry;
pub mod validators;
