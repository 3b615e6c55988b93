mod config;
mod modules;
mod web;

pub use web::{escape_html, render_footer};

use anyhow::{Context, Result};
use dotenvy::dotenv;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::{config::AppConfig, web::AppState};

#[tokio::main]
async fn main() {
    dotenv().ok();
    init_tracing();

    if let Err(err) = app_main().await {
        error!(?err, "application error");
        std::process::exit(1);
    }
}

async fn app_main() -> Result<()> {
    let config = AppConfig::from_env().context("invalid configuration")?;
    let addr = config.listen_addr();
    info!(
        %addr,
        max_upload_bytes = config.max_upload_bytes,
        "starting essay grader"
    );

    let app = web::router::build_router(AppState::new(config));

    let listener = TcpListener::bind(addr)
        .await
        .context("failed to bind listener")?;
    info!(%addr, "listening");
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}
