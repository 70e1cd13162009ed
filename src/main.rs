// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{error::Error, net::SocketAddr, sync::Arc};

use axum_server::tls_rustls::RustlsConfig;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use ledger_blog_server::{
    api::router,
    config::{AppConfig, TransportKind, LOG_FORMAT_ENV},
    ledger::{error::error_chain, FabricTransport, HttpTransport, InMemoryNetwork, LedgerGateway},
    reconciler::Reconciler,
    state::AppState,
    storage::{ReceiptDatabase, RECEIPTS_FILE},
    store::InMemoryStore,
};

const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match std::env::var(LOG_FORMAT_ENV).as_deref() {
        Ok("json") => builder.json().init(),
        _ => builder.pretty().init(),
    }
}

#[tokio::main]
async fn main() {
    init_tracing();

    if let Err(e) = run().await {
        error!(error = %error_chain(e.as_ref()), "Server terminated");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn Error + Send + Sync>> {
    let config = AppConfig::from_env()?;
    info!(ledger = ?config.ledger, "Configuration loaded");

    let transport: Arc<dyn FabricTransport> = match config.ledger.transport {
        TransportKind::Http => Arc::new(HttpTransport::new(config.ledger.request_timeout)?),
        TransportKind::Memory => {
            warn!("Using the in-process ledger network; state is lost on restart");
            Arc::new(
                InMemoryNetwork::new(config.ledger.topology.channel.clone())
                    .with_admin(
                        config.ledger.admin_name.clone(),
                        config.ledger.admin_secret.clone(),
                    )
                    .with_chaincode(config.ledger.chaincode.clone()),
            )
        }
    };

    let receipts_path = config.server.data_dir.join(RECEIPTS_FILE);
    let receipts = Arc::new(ReceiptDatabase::open(&receipts_path)?);
    info!(path = %receipts_path.display(), "Receipt database opened");

    let gateway = Arc::new(
        LedgerGateway::new(transport, config.ledger.clone()).with_receipts(Arc::clone(&receipts)),
    );

    // The session is rebuilt lazily on first use if this fails.
    if let Err(e) = gateway.warm_up().await {
        warn!(error = %e, "Ledger session not established at startup");
    }

    let shutdown = CancellationToken::new();
    let reconciler = tokio::spawn(
        Reconciler::new(Arc::clone(&gateway), receipts).run(shutdown.clone()),
    );

    let state = AppState::new(InMemoryStore::new(), Arc::clone(&gateway))
        .with_chaincode_api(config.server.chaincode_api_enabled);
    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    tokio::spawn(cancel_on_signal(shutdown.clone()));

    match &config.server.tls {
        Some(tls) => {
            if rustls::crypto::ring::default_provider()
                .install_default()
                .is_err()
            {
                warn!("A rustls crypto provider was already installed");
            }
            let tls_config = RustlsConfig::from_pem_file(&tls.cert, &tls.key).await?;
            info!(%addr, "Ledger blog server listening on https (docs at /docs)");
            tokio::select! {
                served = axum_server::bind_rustls(addr, tls_config).serve(app.into_make_service()) => served?,
                _ = shutdown.cancelled() => {}
            }
        }
        None => {
            let listener = tokio::net::TcpListener::bind(addr).await?;
            info!(%addr, "Ledger blog server listening on http (docs at /docs)");
            let stop = shutdown.clone();
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { stop.cancelled().await })
                .await?;
        }
    }

    shutdown.cancel();
    if let Err(e) = reconciler.await {
        warn!(error = %e, "Receipt reconciler task failed");
    }
    gateway.shutdown().await;
    info!("Shutdown complete");
    Ok(())
}

async fn cancel_on_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    info!("Shutdown signal received");
    shutdown.cancel();
}
