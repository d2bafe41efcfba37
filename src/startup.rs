use actix_web::dev::Server;
use actix_web::{middleware::Logger, web, App, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::TokenService;
use crate::configuration::JwtSettings;
use crate::error::{AppError, RequestError, ValidationError};
use crate::logger::LoggerMiddleware;
use crate::middleware::JwtMiddleware;
use crate::routes::{
    change_password, delete_account, get_account, health_check, list_accounts, login, logout,
    patch_account, refresh, register, update_account,
};
use crate::session::SessionHandler;
use crate::store::AccountStore;

pub fn run(
    listener: TcpListener,
    store: Arc<dyn AccountStore>,
    jwt_config: JwtSettings,
    password_hash_cost: u32,
) -> Result<Server, std::io::Error> {
    let tokens = TokenService::new(store.clone(), jwt_config);
    let sessions = web::Data::new(SessionHandler::new(store, tokens.clone(), password_hash_cost));

    let server = HttpServer::new(move || {
        // Malformed bodies and ids are reported in the standard error envelope
        let json_config = web::JsonConfig::default().error_handler(|err, req| {
            RequestError::for_request(
                req,
                AppError::Validation(ValidationError::Malformed(err.to_string())),
            )
            .into()
        });
        let path_config = web::PathConfig::default().error_handler(|err, req| {
            RequestError::for_request(
                req,
                AppError::Validation(ValidationError::Malformed(err.to_string())),
            )
            .into()
        });
        let auth = || JwtMiddleware::new(tokens.clone());

        App::new()
            // Global middleware
            .wrap(Logger::default())
            .wrap(LoggerMiddleware)

            // Shared state
            .app_data(sessions.clone())
            .app_data(json_config)
            .app_data(path_config)

            .route("/health_check", web::get().to(health_check))

            // Public routes
            .service(
                web::resource("/worko/user/CreateUser")
                    .route(web::get().to(register))
                    .route(web::post().to(register)),
            )
            .service(web::resource("/worko/user/login").route(web::post().to(login)))

            // Protected routes (require a valid access token)
            .service(
                web::resource("/worko/user/logout")
                    .route(web::post().to(logout))
                    .wrap(auth()),
            )
            .service(
                web::resource("/worko/user/refreshToken")
                    .route(web::post().to(refresh))
                    .wrap(auth()),
            )
            .service(
                web::resource("/worko/user/change-password")
                    .route(web::post().to(change_password))
                    .wrap(auth()),
            )
            .service(
                web::resource("/worko/user/delete")
                    .route(web::delete().to(delete_account))
                    .wrap(auth()),
            )
            .service(
                web::resource("/worko/user/update/{user_id}")
                    .route(web::put().to(update_account))
                    .wrap(auth()),
            )
            .service(
                web::resource("/worko/user/update-patch/{user_id}")
                    .route(web::patch().to(patch_account))
                    .wrap(auth()),
            )
            .service(
                web::resource("/worko/user")
                    .route(web::get().to(list_accounts))
                    .wrap(auth()),
            )
            // Must stay after the fixed /worko/user/* paths
            .service(
                web::resource("/worko/user/{user_id}")
                    .route(web::get().to(get_account))
                    .wrap(auth()),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
