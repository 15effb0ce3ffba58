//! Side-chain bridge oracle node
//!
//! Serves the JSON-RPC interface the side-chain node and arbiters call to
//! relay cross-chain transfers. Each request is checked against the bridging
//! contract's `completed` ledger first; a transaction is submitted only when
//! the ledger does not yet record the transfer.

use std::sync::Arc;

use oracle::completion::CompletionOracle;
use oracle::config::Config;
use oracle::dispatcher::RequestDispatcher;
use oracle::evm_client::EvmBridgeClient;
use oracle::metrics::OracleMetrics;
use oracle::reconciler::TransferReconciler;
use oracle::server::{start_server, AppState};
use tracing::info;

fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main())
}

async fn async_main() -> eyre::Result<()> {
    init_logging();

    info!("Starting bridge oracle");

    let config = Config::load()?;
    info!(
        rpc = %config.sidechain_rpc_url,
        bridge = %config.bridge_address,
        signer = config.private_key.is_some(),
        "Configuration loaded"
    );

    let client = Arc::new(EvmBridgeClient::new(
        &config.sidechain_rpc_url,
        &config.bridge_address.to_string(),
        config.private_key.as_deref(),
        config.rpc_timeout(),
    )?);

    let metrics = Arc::new(OracleMetrics::new());
    let completion = CompletionOracle::new(client.clone())
        .with_metrics(metrics.clone())
        .with_max_concurrent_queries(config.max_concurrent_queries);
    let reconciler = TransferReconciler::new(completion, client).with_metrics(metrics.clone());
    let dispatcher = Arc::new(RequestDispatcher::new(reconciler).with_metrics(metrics.clone()));

    start_server(
        &config.bind_address,
        config.port,
        AppState::new(dispatcher, metrics),
        wait_for_shutdown_signal(),
    )
    .await?;

    info!("Bridge oracle stopped");
    Ok(())
}

/// `LOG_FORMAT=json` switches to JSON lines; `RUST_LOG` overrides the filter
fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,bridge_oracle=debug,oracle=debug"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_target(true))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true))
            .with(filter)
            .init();
    }
}

async fn wait_for_shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown");
        }
    }
}
