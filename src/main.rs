// Courtside CMS entry point.
//
// Startup sequence:
// 1. Initialize tracing
// 2. Load config
// 3. Ensure the uploads directory exists
// 4. Open database
// 5. Seed sample data when configured
// 6. Serve HTTP until shutdown

use std::sync::Arc;

use courtside_cms::config;
use courtside_cms::db;
use courtside_cms::server;

use anyhow::Context;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing
    init_tracing()?;
    info!("Courtside CMS starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: {}:{}, database at {}",
        config.server.host, config.server.port, config.db_path
    );

    // 3. Ensure the uploads directory exists
    std::fs::create_dir_all(&config.uploads.dir).with_context(|| {
        format!("failed to create uploads directory {}", config.uploads.dir)
    })?;

    // 4. Open database
    let db = Arc::new(db::Database::open(&config.db_path).context("failed to open database")?);
    info!("Database opened at {}", config.db_path);

    // 5. Seed sample data when configured
    if config.seed_on_start {
        db.seed_sample_data().context("failed to seed sample data")?;
        info!("Sample data seeded");
    }

    // 6. Serve HTTP until shutdown
    server::serve(config, db).await?;

    info!("Courtside CMS shut down cleanly");
    Ok(())
}

/// Initialize tracing to the terminal, honoring RUST_LOG when set.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("courtside_cms=info,warn")),
        )
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
