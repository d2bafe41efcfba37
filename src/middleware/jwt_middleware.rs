/// JWT Authentication Middleware
///
/// Reads the access token from the `accessToken` cookie or the
/// `Authorization: Bearer` header, resolves it to an account through the
/// Token Service and injects the sanitized account into request extensions.
/// Requests without a usable token are answered with 401 right here, as a
/// response rather than an error, so outer middleware still sees them.

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage, ResponseError,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;

use crate::auth::TokenService;
use crate::error::{AppError, AuthError, RequestError};
use crate::routes::ACCESS_COOKIE;

/// JWT middleware for protecting routes
pub struct JwtMiddleware {
    tokens: TokenService,
}

impl JwtMiddleware {
    pub fn new(tokens: TokenService) -> Self {
        Self { tokens }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = JwtMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(JwtMiddlewareService {
            service: Rc::new(service),
            tokens: self.tokens.clone(),
        }))
    }
}

pub struct JwtMiddlewareService<S> {
    service: Rc<S>,
    tokens: TokenService,
}

/// Cookie first, then the Authorization header
fn extract_access_token(req: &ServiceRequest) -> Option<String> {
    if let Some(cookie) = req.cookie(ACCESS_COOKIE) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }

    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Answer the request with the error envelope, tagged with its request id
fn reject<B>(req: ServiceRequest, error: AppError) -> ServiceResponse<EitherBody<B>> {
    let (http_req, _payload) = req.into_parts();
    let response = RequestError::for_request(&http_req, error).error_response();
    ServiceResponse::new(http_req, response).map_into_right_body()
}

impl<S, B> Service<ServiceRequest> for JwtMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let tokens = self.tokens.clone();

        Box::pin(async move {
            let token = match extract_access_token(&req) {
                Some(token) => token,
                None => {
                    tracing::warn!(path = %req.path(), "Missing access token");
                    return Ok(reject(req, AppError::Auth(AuthError::MissingToken)));
                }
            };

            let account = match tokens.authenticate(&token).await {
                Ok(account) => account,
                Err(e) => {
                    tracing::warn!(path = %req.path(), "Access token rejected: {}", e);
                    return Ok(reject(req, e));
                }
            };

            tracing::debug!(account_id = %account.id, "JWT validated successfully");
            req.extensions_mut().insert(account.profile());

            service.call(req).await.map(|res| res.map_into_left_body())
        })
    }
}
