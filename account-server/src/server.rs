use std::sync::Arc;

use actix_cors::Cors;
use actix_web::middleware::DefaultHeaders;
use actix_web::{App, HttpServer, web};
use tracing::info;

use crate::application::user_service::UserService;
use crate::data::order_source::MongoOrderSource;
use crate::data::user_repository::MongoUserRepository;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::database::connect;
use crate::infrastructure::security::JwtKeys;
use crate::presentation::handlers;
use crate::presentation::middleware::{RequestIdMiddleware, TimingMiddleware};

/// Registers every route. Shared by the binary and the HTTP tests.
pub fn configure(cfg: &mut web::ServiceConfig, service: UserService, keys: JwtKeys) {
    cfg.app_data(web::Data::new(service))
        .service(handlers::health::health)
        .service(web::scope("/api").service(handlers::user::scope(keys)));
}

pub async fn start_rest_server(config: AppConfig) -> anyhow::Result<()> {
    let database = connect(&config).await?;

    let users = MongoUserRepository::new(&database);
    users.ensure_indexes().await?;
    let orders = MongoOrderSource::new(&database);

    let service = UserService::new(Arc::new(users), Arc::new(orders));
    let keys = JwtKeys::new(config.jwt_secret.clone());
    let bind_address = (config.host.clone(), config.port);

    info!(host = %bind_address.0, port = bind_address.1, "HTTP server starting");

    HttpServer::new(move || {
        App::new()
            .wrap(TimingMiddleware)
            .wrap(RequestIdMiddleware)
            .wrap(
                DefaultHeaders::new()
                    .add(("X-Content-Type-Options", "nosniff"))
                    .add(("Referrer-Policy", "no-referrer"))
                    .add(("Permissions-Policy", "geolocation=()"))
                    .add(("Cross-Origin-Opener-Policy", "same-origin")),
            )
            .wrap(build_cors(&config))
            .configure(|cfg| configure(cfg, service.clone(), keys.clone()))
    })
    .bind(bind_address)?
    .run()
    .await
    .map_err(anyhow::Error::new)?;

    info!("HTTP server stopped");
    Ok(())
}

fn build_cors(config: &AppConfig) -> Cors {
    let mut cors = Cors::default()
        .allowed_methods(vec!["GET", "POST"])
        .allowed_headers(vec![
            actix_web::http::header::CONTENT_TYPE,
            actix_web::http::header::AUTHORIZATION,
        ])
        .supports_credentials()
        .max_age(3600);

    for origin in &config.cors_origins {
        cors = cors.allowed_origin(origin);
    }

    cors
}
