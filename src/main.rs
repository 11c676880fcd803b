use std::io;
use std::sync::Arc;

use actix_web::{middleware::Logger, App, HttpServer};
use dotenv::dotenv;
use log::{error, info};

use taskhub_backend::config::{Config, StoreBackend};
use taskhub_backend::store::{MemoryStore, MySqlStore, TaskHubStore};
use taskhub_backend::AppData;

fn startup_error(context: &str, err: impl std::fmt::Display) -> io::Error {
    error!("{}: {}", context, err);
    io::Error::other(format!("{}: {}", context, err))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env().map_err(|e| startup_error("Invalid configuration", e))?;

    let store: Arc<dyn TaskHubStore> = match config.store_backend {
        StoreBackend::MySql => {
            let database_url = config.database_url.as_deref().unwrap_or_default();
            let store = MySqlStore::connect(database_url, config.database_max_connections)
                .await
                .map_err(|e| startup_error("Failed to create pool", e))?;
            if config.run_migrations {
                store
                    .migrate()
                    .await
                    .map_err(|e| startup_error("Failed to run migrations", e))?;
            }
            Arc::new(store)
        }
        StoreBackend::Memory => {
            info!("Using the in-memory store, data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let data = AppData::from_config(&config, store).map_err(|e| startup_error("Invalid configuration", e))?;
    tokio::fs::create_dir_all(&config.upload_dir).await?;

    info!("Server running at http://{}", config.bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .configure(|cfg| data.configure(cfg))
    })
    .bind(config.bind_address.as_str())?
    .run()
    .await
}
