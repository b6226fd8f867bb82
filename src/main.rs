use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;

use stockmarket_backend::app;
use stockmarket_backend::config::AppConfig;
use stockmarket_backend::logging::{init_logging, LoggingConfig};
use stockmarket_backend::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize logging FIRST
    init_logging(LoggingConfig::from_env())?;

    let config = AppConfig::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("✅ Database migrations applied");

    let state = AppState::new(pool, &config.jwt_secret);
    let app = app::create_app(state);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("🚀 Stockmarket backend running at http://{}/", config.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
