use actix_web::{web, App, HttpServer};
use actix_web::dev::Server;
use std::net::TcpListener;
use std::sync::Arc;

use crate::configuration::Settings;
use crate::logger::RequestLogger;
use crate::media::MediaStore;
use crate::middleware::JwtGuard;
use crate::routes::{
    change_password, current_user, health_check, login, logout, refresh, register,
    update_avatar, update_cover, update_profile,
};
use crate::users::CredentialStore;

pub fn run(
    listener: TcpListener,
    store: Arc<dyn CredentialStore>,
    media_store: Arc<dyn MediaStore>,
    settings: Settings,
) -> Result<Server, std::io::Error> {
    let store_data: web::Data<dyn CredentialStore> = web::Data::from(store.clone());
    let media_data: web::Data<dyn MediaStore> = web::Data::from(media_store);
    let jwt_data = web::Data::new(settings.jwt.clone());
    let media_settings = web::Data::new(settings.media.clone());
    let jwt_config = settings.jwt;

    let server = HttpServer::new(move || {
        App::new()
            .wrap(RequestLogger)
            // Shared state
            .app_data(store_data.clone())
            .app_data(media_data.clone())
            .app_data(jwt_data.clone())
            .app_data(media_settings.clone())
            // Public routes
            .route("/health_check", web::get().to(health_check))
            .route("/users/register", web::post().to(register))
            .route("/users/login", web::post().to(login))
            .route("/users/refresh", web::post().to(refresh))
            // Protected routes
            .service(
                web::scope("/users")
                    .wrap(JwtGuard::new(jwt_config.clone(), store.clone()))
                    .route("/logout", web::post().to(logout))
                    .route("/me", web::get().to(current_user))
                    .route("/me", web::patch().to(update_profile))
                    .route("/me/avatar", web::patch().to(update_avatar))
                    .route("/me/cover", web::patch().to(update_cover))
                    .route("/change-password", web::post().to(change_password)),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
