//! tasklane server entry point.

use tasklane::{api, logging, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_tracing(logging::DEFAULT_FILTER);

    let config = Config::from_env()?;
    tracing::info!(
        model = %config.model,
        enrichment = config.enrichment_enabled(),
        "Starting tasklane {}",
        env!("CARGO_PKG_VERSION")
    );

    api::serve(config).await
}
