//! Tiny HTTP endpoint that uptime pingers hit to keep the host awake.

use anyhow::{Context, Result};
use axum::{routing::get, Router};
use tracing::info;

pub const ALIVE_MESSAGE: &str = "✨ Bot is alive!";

async fn alive() -> &'static str {
    ALIVE_MESSAGE
}

pub fn router() -> Router {
    Router::new().route("/", get(alive))
}

pub async fn serve(port: u16) -> Result<()> {
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    info!("Keep-alive server running on http://localhost:{port}");

    axum::serve(listener, router())
        .await
        .context("Keep-alive server error")?;

    Ok(())
}
