use tracing_subscriber::EnvFilter;

use reelvault::config::Config;
use reelvault::db::{self, Cache};
use reelvault::routes::{create_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reelvault=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;

    let pool = db::create_pool(&config.database_url).await?;
    let cache = Cache::connect(&config.redis_url)?;

    let addr = format!("{}:{}", config.host, config.port);
    let state = AppState::new(pool, cache, config);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "reelvault listening");
    axum::serve(listener, app).await?;

    Ok(())
}
