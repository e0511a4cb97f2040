use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{get, web, App, HttpResponse, HttpServer, Responder, Result};
use serde::Serialize;
use tracing::info;

use todos::config::Config;
use todos::repository::{Database, TodoRepository};
use todos::{api, telemetry};

#[derive(Serialize)]
pub struct Response {
    pub message: String,
}

#[get("/health")]
async fn healthcheck() -> impl Responder {
    let response = Response {
        message: "Everything is working fine".to_string(),
    };
    HttpResponse::Ok().json(response)
}

async fn not_found() -> Result<HttpResponse> {
    let response = Response {
        message: "Resource not found".to_string(),
    };
    Ok(HttpResponse::NotFound().json(response))
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::new()?;
    telemetry::init_subscriber(telemetry::get_subscriber(config.app_name.clone(), "INFO"))?;

    let database = Database::new(&config.database_url, config.pool_size)?;
    let todo_db: Arc<dyn TodoRepository> = Arc::new(database);
    let app_data = web::Data::from(todo_db);

    info!(host = %config.host, port = config.port, "starting todo api");
    let cors_origin = config.cors_origin.clone();
    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&cors_origin)
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE"])
            .allow_any_header()
            .max_age(3600);
        App::new()
            .app_data(app_data.clone())
            .configure(api::config)
            .service(healthcheck)
            .default_service(web::route().to(not_found))
            .wrap(actix_web::middleware::Logger::default())
            .wrap(cors)
    })
        .bind((config.host.as_str(), config.port))?
        .run()
        .await?;
    Ok(())
}
