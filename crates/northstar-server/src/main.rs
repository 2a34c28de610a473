use northstar_server::config::Config;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "northstar_server=info,northstar_core=info,tower_http=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
        )
        .with_target(false)
        .init();

    let config = Config::from_env()?;
    tracing::info!(
        host = %config.host,
        port = config.port,
        database = config.database_url.is_some(),
        "Starting northstar-server"
    );

    northstar_server::run_server(config).await
}
