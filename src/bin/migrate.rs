use sqlx::SqlitePool;
use tracing::info;

use attendance_tracker::env::load_environment;
use attendance_tracker::telemetry::{init_tracing, shutdown_telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_environment()?;
    init_tracing()?;

    let database_url = std::env::var("DATABASE_URL")?;
    let pool = SqlitePool::connect(&database_url).await?;

    info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Migrations completed successfully");

    shutdown_telemetry();
    Ok(())
}
