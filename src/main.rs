use std::sync::Arc;

use anyhow::Result;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use memeboard::api::routes::create_router;
use memeboard::api::state::AppState;
use memeboard::config::Config;
use memeboard::services::aggregator::{Aggregator, AggregatorSettings};
use memeboard::services::chain::RpcChainClient;
use memeboard::services::monitor::Monitor;
use memeboard::services::price::DexScreenerClient;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    dotenv().ok();
    let config = Config::from_env()?;
    if config.rpc_api_key.is_none() {
        tracing::warn!("RPC_API_KEY is not set, requests go out without an x-api-key header");
    }

    let rpc_limiter = RpcChainClient::rate_limiter(config.rpc_rate_limit);
    let rpc_client = Arc::new(RpcChainClient::new(
        config.rpc_endpoint(),
        config.rpc_api_key.clone(),
        config.rpc_timeout,
        rpc_limiter,
    )?);

    // Test RPC connection at startup
    match rpc_client.get_version().await {
        Ok(version) => tracing::info!("Connected to Solana RPC (version: {})", version),
        Err(e) => tracing::error!("Failed to connect to RPC: {}", e),
    };

    let price_client = Arc::new(DexScreenerClient::new(config.price_api_url.clone(), config.rpc_timeout)?);

    let aggregator = Arc::new(Aggregator::new(
        rpc_client,
        price_client,
        AggregatorSettings::from(&config),
    ));

    tracing::info!("Tracking token {}", config.token_mint);
    let monitor = Monitor::start(aggregator, config.poll_interval);

    let state = AppState::new(config.token_mint.to_string(), monitor.subscribe());
    let app = create_router(state);

    tracing::info!("Listening on {}", config.listen_addr);
    let listener = TcpListener::bind(config.listen_addr).await?;

    let served = axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
            tracing::info!("Shutdown signal received");
        })
        .await;

    monitor.stop().await;

    if let Err(e) = served {
        tracing::error!("Failed to serve API: {:?}", e);
        return Err(e.into());
    }

    Ok(())
}
