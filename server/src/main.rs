//! Quizsync Server binary.

use quizsync_server::config::Config;
use quizsync_server::{create_app, db, AppState};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quizsync_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing::info!("Starting Quizsync Server on {}:{}", config.host, config.port);

    // Create database pool
    let pool = db::create_pool(&config.database_url, config.max_connections).await?;

    // Run migrations
    tracing::info!("Running database migrations...");
    db::run_migrations(&pool).await?;

    match (&config.auth_secret, config.allow_anonymous) {
        (None, true) => {
            tracing::warn!(
                "AUTH_SECRET not set and ALLOW_ANONYMOUS on, \
                 requests without a token may access any user"
            );
        }
        (None, false) => tracing::warn!("AUTH_SECRET not set, bearer tokens are bare user ids"),
        (Some(_), true) => tracing::warn!("ALLOW_ANONYMOUS ignored because AUTH_SECRET is set"),
        (Some(_), false) => {}
    }

    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
    };
    let app = create_app(state);

    // Start server
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
