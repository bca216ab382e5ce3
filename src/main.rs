mod cache;
mod config;
mod db;
mod error;
mod middleware;
mod models;
mod routes;
mod services;
mod tasks;
mod utils;

use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Context;

use crate::cache::{KvStore, RedisStore};
use crate::config::AppConfig;
use crate::routes::Collaborators;
use crate::services::pnl_service::HeartbeatRunStatus;
use crate::tasks::TaskQueue;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let config = AppConfig::from_env().context("Invalid configuration")?;
    utils::logging::setup_logging(&config.log_level, config.log_json);

    tracing::info!("Connecting to database...");
    let db = db::establish_connection(&config)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connected");

    let store: Arc<dyn KvStore> = Arc::new(RedisStore::open(&config.redis_url).context("Invalid REDIS_URL")?);
    let collaborators = Collaborators {
        store: store.clone(),
        run_status: Arc::new(HeartbeatRunStatus::new(store.clone())),
        tasks: TaskQueue::new(store),
    };

    let bind = (config.bind_addr.clone(), config.port);
    tracing::info!("Starting server on http://{}:{}", bind.0, bind.1);

    let db = web::Data::new(db);
    let config = web::Data::new(config);
    let collaborators = web::Data::new(collaborators);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(db.clone())
            .app_data(config.clone())
            .app_data(collaborators.clone())
            .configure(routes::configure_routes)
    })
    .bind(bind)?
    .run()
    .await?;

    Ok(())
}
