/// Account Routes
///
/// HTTP surface of the session handler. Handlers translate requests into
/// `SessionHandler` calls and shape the results: response envelopes and the
/// `accessToken` / `refreshToken` cookie pair.

use actix_web::cookie::Cookie;
use actix_web::http::StatusCode;
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::account::AccountProfile;
use crate::auth::TokenPair;
use crate::error::{AppError, AuthError, ErrorContext, RequestError};
use crate::response::ApiResponse;
use crate::schema::{ChangePasswordRequest, LoginRequest, RegisterRequest};
use crate::session::SessionHandler;

pub const ACCESS_COOKIE: &str = "accessToken";
pub const REFRESH_COOKIE: &str = "refreshToken";

/// Token refresh request body, used when no cookie is present
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

fn session_cookie(name: &'static str, value: String) -> Cookie<'static> {
    Cookie::build(name, value)
        .path("/")
        .http_only(true)
        .secure(true)
        .finish()
}

fn removal_cookie(name: &'static str) -> Cookie<'static> {
    let mut cookie = session_cookie(name, String::new());
    cookie.make_removal();
    cookie
}

fn with_session_cookies(status: StatusCode, tokens: &TokenPair) -> actix_web::HttpResponseBuilder {
    let mut builder = HttpResponse::build(status);
    builder
        .cookie(session_cookie(ACCESS_COOKIE, tokens.access_token.clone()))
        .cookie(session_cookie(REFRESH_COOKIE, tokens.refresh_token.clone()));
    builder
}

fn without_session_cookies() -> actix_web::HttpResponseBuilder {
    let mut builder = HttpResponse::Ok();
    builder
        .cookie(removal_cookie(ACCESS_COOKIE))
        .cookie(removal_cookie(REFRESH_COOKIE));
    builder
}

/// Only the account itself may change its profile
fn ensure_self(current: &AccountProfile, target: Uuid) -> Result<(), AppError> {
    if current.id != target {
        return Err(AppError::Auth(AuthError::Forbidden));
    }
    Ok(())
}

/// GET|POST /worko/user/CreateUser
///
/// # Errors
/// - 400: Validation errors
/// - 409: Email or zipcode already registered
pub async fn register(
    req: HttpRequest,
    form: web::Json<RegisterRequest>,
    sessions: web::Data<SessionHandler>,
) -> Result<HttpResponse, RequestError> {
    let context = ErrorContext::for_request(&req, "user_registration");

    let account = sessions
        .register(form.into_inner())
        .await
        .map_err(|e| context.record(e))?;

    Ok(HttpResponse::Created().json(ApiResponse::new(
        StatusCode::CREATED,
        account,
        "user created successfully",
    )))
}

/// POST /worko/user/login
///
/// Sets both session cookies and also returns the tokens in the body.
///
/// # Errors
/// - 400: Validation error
/// - 404: No account with this email
/// - 401: Wrong password
pub async fn login(
    req: HttpRequest,
    form: web::Json<LoginRequest>,
    sessions: web::Data<SessionHandler>,
) -> Result<HttpResponse, RequestError> {
    let context = ErrorContext::for_request(&req, "user_login");

    let outcome = sessions
        .login(form.into_inner())
        .await
        .map_err(|e| context.record(e))?;

    Ok(with_session_cookies(StatusCode::OK, &outcome.tokens).json(ApiResponse::ok(
        json!({
            "user": outcome.account,
            "accessToken": outcome.tokens.access_token,
            "refreshToken": outcome.tokens.refresh_token,
        }),
        "user loggedin successfully",
    )))
}

/// POST /worko/user/logout
pub async fn logout(
    req: HttpRequest,
    current: web::ReqData<AccountProfile>,
    sessions: web::Data<SessionHandler>,
) -> Result<HttpResponse, RequestError> {
    let context = ErrorContext::for_request(&req, "user_logout").with_account_id(current.id);

    sessions
        .logout(current.id)
        .await
        .map_err(|e| context.record(e))?;

    Ok(without_session_cookies().json(ApiResponse::ok(json!({}), "User loggedOut")))
}

/// POST /worko/user/refreshToken
///
/// The refresh token is read from the `refreshToken` cookie, falling back to
/// the `refreshToken` field of the JSON body.
///
/// # Errors
/// - 401: Missing, invalid, expired, rotated or revoked refresh token, or one
///   issued to a different account than the caller
pub async fn refresh(
    req: HttpRequest,
    current: web::ReqData<AccountProfile>,
    body: Option<web::Json<RefreshRequest>>,
    sessions: web::Data<SessionHandler>,
) -> Result<HttpResponse, RequestError> {
    let context = ErrorContext::for_request(&req, "token_refresh").with_account_id(current.id);

    let presented = req
        .cookie(REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| body.and_then(|b| b.into_inner().refresh_token));

    let tokens = sessions
        .refresh(current.id, presented.as_deref())
        .await
        .map_err(|e| context.record(e))?;

    Ok(with_session_cookies(StatusCode::OK, &tokens)
        .json(ApiResponse::ok(&tokens, "AccessToken Refreshed successfully")))
}

/// POST /worko/user/change-password
pub async fn change_password(
    req: HttpRequest,
    current: web::ReqData<AccountProfile>,
    form: web::Json<ChangePasswordRequest>,
    sessions: web::Data<SessionHandler>,
) -> Result<HttpResponse, RequestError> {
    let context = ErrorContext::for_request(&req, "change_password").with_account_id(current.id);

    sessions
        .change_password(current.id, form.into_inner())
        .await
        .map_err(|e| context.record(e))?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(json!({}), "Password Changes Successfully")))
}

/// GET /worko/user
pub async fn list_accounts(
    req: HttpRequest,
    current: web::ReqData<AccountProfile>,
    sessions: web::Data<SessionHandler>,
) -> Result<HttpResponse, RequestError> {
    let context = ErrorContext::for_request(&req, "list_accounts").with_account_id(current.id);

    let accounts = sessions
        .list_accounts()
        .await
        .map_err(|e| context.record(e))?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(
        json!({ "users": accounts }),
        "Fetched all user data successfully",
    )))
}

/// GET /worko/user/{user_id}
pub async fn get_account(
    req: HttpRequest,
    current: web::ReqData<AccountProfile>,
    path: web::Path<Uuid>,
    sessions: web::Data<SessionHandler>,
) -> Result<HttpResponse, RequestError> {
    let context = ErrorContext::for_request(&req, "get_account").with_account_id(current.id);

    let account = sessions
        .get_account(path.into_inner())
        .await
        .map_err(|e| context.record(e))?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(
        json!({ "user": account }),
        "user fetched successfully",
    )))
}

/// PUT /worko/user/update/{user_id}
pub async fn update_account(
    req: HttpRequest,
    current: web::ReqData<AccountProfile>,
    path: web::Path<Uuid>,
    payload: web::Json<Map<String, Value>>,
    sessions: web::Data<SessionHandler>,
) -> Result<HttpResponse, RequestError> {
    apply_update(&req, current.into_inner(), path.into_inner(), payload.into_inner(), false, sessions)
        .await
}

/// PATCH /worko/user/update-patch/{user_id}
pub async fn patch_account(
    req: HttpRequest,
    current: web::ReqData<AccountProfile>,
    path: web::Path<Uuid>,
    payload: web::Json<Map<String, Value>>,
    sessions: web::Data<SessionHandler>,
) -> Result<HttpResponse, RequestError> {
    apply_update(&req, current.into_inner(), path.into_inner(), payload.into_inner(), true, sessions)
        .await
}

async fn apply_update(
    req: &HttpRequest,
    current: AccountProfile,
    target: Uuid,
    payload: Map<String, Value>,
    partial: bool,
    sessions: web::Data<SessionHandler>,
) -> Result<HttpResponse, RequestError> {
    let context = ErrorContext::for_request(req, "profile_update").with_account_id(current.id);
    ensure_self(&current, target).map_err(|e| context.record(e))?;

    let account = sessions
        .update_profile(target, &payload, partial)
        .await
        .map_err(|e| context.record(e))?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(account, "User updated successfully")))
}

/// DELETE /worko/user/delete
pub async fn delete_account(
    req: HttpRequest,
    current: web::ReqData<AccountProfile>,
    sessions: web::Data<SessionHandler>,
) -> Result<HttpResponse, RequestError> {
    let context = ErrorContext::for_request(&req, "account_deletion").with_account_id(current.id);

    sessions
        .delete_account(current.id)
        .await
        .map_err(|e| context.record(e))?;

    Ok(without_session_cookies().json(ApiResponse::ok(json!({}), "User deleted successfully")))
}
