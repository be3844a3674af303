use std::env;

use actix_web::{middleware, web::Data, App, HttpServer};
use log::info;

use givebridge::{init_pool, routes, AppState, MIGRATOR};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let database_url =
        env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://givebridge.db".to_owned());
    let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_owned());

    let db_pool = init_pool(&database_url)
        .await
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

    MIGRATOR
        .run(&db_pool)
        .await
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    info!("Database migrated successfully");

    info!("Starting HTTP server on http://{}/", bind_addr);

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Compress::default())
            // always register the Logger middleware last
            .wrap(middleware::Logger::default())
            .app_data(Data::new(AppState {
                db_pool: db_pool.clone(),
            }))
            .configure(routes::configure)
    })
    .bind(bind_addr)?
    .run()
    .await
}
