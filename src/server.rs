use std::{net::SocketAddr, path::Path};

use chrono::Duration;
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};
use tokio::signal::ctrl_c;
#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

use crate::{
    actions::import_ingredients,
    api::{routes, AppState},
    config::Config,
    error::ApiError,
    jwt::SessionKeys,
    schema::NewIngredient,
};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Database connection failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Could not bind {0}: {1}")]
    Bind(SocketAddr, String),

    #[error("Could not read {0}: {1}")]
    Import(String, String),

    #[error(transparent)]
    Api(#[from] ApiError),
}

pub async fn connect(config: &Config) -> Result<Pool<Postgres>, StartupError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    log::info!("Database migrations applied");

    Ok(pool)
}

pub async fn start_server(config: Config) -> Result<(), StartupError> {
    let pool = connect(&config).await?;
    let keys = SessionKeys::new(
        config.secret.as_bytes(),
        Duration::hours(config.token_hours),
    )?;
    let state = AppState::new(pool.clone(), keys, &config.base_url);

    let address = SocketAddr::from(([0, 0, 0, 0], config.port));
    let (bound, server) = warp::serve(routes(state))
        .try_bind_with_graceful_shutdown(address, shutdown_signal())
        .map_err(|e| StartupError::Bind(address, e.to_string()))?;

    log::info!("Server running on {bound}");
    server.await;

    pool.close().await;
    log::info!("Server shut down");

    Ok(())
}

pub async fn import_ingredients_file(config: &Config, path: &Path) -> Result<u64, StartupError> {
    let display = path.display().to_string();
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| StartupError::Import(display.clone(), e.to_string()))?;
    let ingredients: Vec<NewIngredient> =
        serde_json::from_str(&raw).map_err(|e| StartupError::Import(display, e.to_string()))?;

    let pool = connect(config).await?;
    let inserted = import_ingredients(ingredients, &pool).await?;
    pool.close().await;

    Ok(inserted)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = ctrl_c().await {
            log::error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }

        log::info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                log::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                log::error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
