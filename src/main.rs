use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use lessons_api::{config, db, http};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| cfg.database.url.clone());
    let pool = db::init_pool(&database_url).await?;
    db::run_migrations(&pool).await?;

    let state = http::AppState::new(pool, &cfg);
    let router = http::create_router(state);

    let listener = tokio::net::TcpListener::bind(&cfg.server.bind_addr).await?;
    info!(addr = %cfg.server.bind_addr, "listening");
    axum::serve(listener, router).await?;

    Ok(())
}
