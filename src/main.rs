use tracing_subscriber::{EnvFilter, fmt};
use tracing::info;

use faregate::config::GatewayConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))?;
    fmt().with_env_filter(filter).init();

    let config = GatewayConfig::from_env()?;

    // Startup banner at info level so something always prints at default verbosity.
    // The sales API key stays out of the logs.
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    info!(
        target: "faregate",
        "faregate starting: RUST_LOG='{}', bind={}:{}, data_api='{}', sales_api='{}', origin='{}', session_dir='{}', session_ttl={:?}, upstream_timeout={:?}",
        rust_log,
        config.bind,
        config.http_port,
        config.data_api_url,
        config.sales_api_url,
        config.allowed_origin,
        config.session_dir.display(),
        config.session_ttl,
        config.upstream_timeout
    );
    if config.sales_api_key.is_empty() {
        tracing::warn!(target: "faregate", "FAREGATE_SALES_API_KEY is empty; fare purchases will be sent without a usable key");
    }

    faregate::server::run(config).await
}
