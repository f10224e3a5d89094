use std::net::TcpListener;

use actix_web::dev::Server;
use actix_web::{get, HttpResponse, Responder};
use actix_web::{web, App, HttpServer};

use tracing_actix_web::TracingLogger;

use crate::controller::error::RestError;
use crate::controller::{analytics, media, newsletters, scheduling, subscribers, tracking};
use crate::dispatch::DispatchQueue;
use crate::media::MediaStore;
use crate::repo::Repos;

/// Simple health-check endpoint
#[tracing::instrument(name = "Health check")]
#[get("/health_check")]
async fn health_check() -> impl Responder {
    HttpResponse::Ok().body("I am alive")
}

/// Run the application on a specified TCP listener
pub fn run(
    listener: TcpListener,
    repos: Repos,
    queue: DispatchQueue,
    media_store: MediaStore,
) -> anyhow::Result<Server> {
    // Wrap application data
    let repos = web::Data::new(repos);
    let queue = web::Data::new(queue);
    let media_store = web::Data::new(media_store);

    // Start the server
    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .app_data(repos.clone())
            .app_data(queue.clone())
            .app_data(media_store.clone())
            // Malformed paths, queries and forms answer with the same JSON body as other errors
            .app_data(web::PathConfig::default().error_handler(|e, _| {
                RestError::BadRequest(format!("Invalid path: {}", e)).into()
            }))
            .app_data(web::QueryConfig::default().error_handler(|e, _| {
                RestError::BadRequest(format!("Invalid query: {}", e)).into()
            }))
            .app_data(web::FormConfig::default().error_handler(|e, _| {
                RestError::BadRequest(format!("Invalid form: {}", e)).into()
            }))
            .service(health_check)
            .service(
                web::scope("/api")
                    .service(subscribers::scope())
                    .service(newsletters::scope())
                    .service(scheduling::scope())
                    .service(analytics::scope())
                    .service(tracking::scope())
                    .service(media::scope()),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
