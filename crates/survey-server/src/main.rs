//! Survey server - area detection and coverage planning over HTTP.

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use survey_server::config::Config;
use survey_server::raster_client::HttpRasterSource;
use survey_server::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("survey_server=debug".parse()?)
            .add_directive("survey_core=info".parse()?))
        .init();

    tracing::info!("Starting survey server...");

    let config = Config::from_env();
    let port = config.server_port;
    if !config.has_raster_source() {
        tracing::warn!("RASTER_SOURCE_URL not set, detection requests will fail");
    }
    let client = reqwest::Client::builder().build()?;
    let source = HttpRasterSource::new(client, tokio::runtime::Handle::current(), &config);
    let name = if config.has_raster_source() {
        source.base_url().to_string()
    } else {
        "unconfigured".to_string()
    };
    let state = AppState::new(config, Arc::new(source), name);

    let app = survey_server::build_app(Arc::new(state));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
