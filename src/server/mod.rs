//! Quote server: one route, `GET /cotacao`, backed by a [`QuoteService`].

pub mod handler;

use crate::core::config::AppConfig;
use crate::core::quote::QuoteStore;
use crate::providers::AwesomeApiProvider;
use crate::store::SqliteQuoteStore;
use anyhow::{Context, Result};
use axum::{Router, routing::get};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

pub use handler::QuoteService;

pub const QUOTE_ROUTE: &str = "/cotacao";

pub fn build_router(service: Arc<QuoteService>) -> Router {
    Router::new()
        .route(QUOTE_ROUTE, get(handler::get_quote))
        .with_state(service)
}

/// Serves `router` on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, router: Router, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

pub async fn run_server(config: &AppConfig) -> Result<()> {
    let store = Arc::new(
        SqliteQuoteStore::open(
            &config.server.database_path,
            config.server.max_connections,
        )
        .await
        .with_context(|| {
            format!(
                "Failed to open quote store: {}",
                config.server.database_path
            )
        })?,
    );
    let provider = Arc::new(
        AwesomeApiProvider::new(&config.provider.base_url)
            .context("Failed to build provider client")?,
    );

    let budgets = config.budgets.stage_budgets();
    let service = Arc::new(QuoteService::new(provider, store.clone(), budgets));

    let listener = TcpListener::bind(&config.server.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_address))?;
    info!(
        fetch = ?budgets.fetch,
        persist = ?budgets.persist,
        policy = ?budgets.policy,
        "Quote server listening on {}",
        listener.local_addr()?
    );

    serve(listener, build_router(service), shutdown_signal()).await?;

    store.close().await;
    info!("Quote server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
