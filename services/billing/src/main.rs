use std::sync::Arc;

use anyhow::Context as _;
use paydesk_core::tracing::init_tracing;
use paydesk_core::uow::UnitOfWork;
use sea_orm::Database;
use tokio::sync::watch;
use tracing::info;

use paydesk_billing::bootstrap::{build_broker, build_relay};
use paydesk_billing::config::BillingConfig;
use paydesk_billing::infra::db::DbOutboxRepository;
use paydesk_billing::router::build_router;
use paydesk_billing::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = BillingConfig::from_env().context("load billing config")?;

    let db = Database::connect(&config.database_url)
        .await
        .context("connect to database")?;

    let broker = Arc::new(build_broker(
        UnitOfWork::new(db.clone()),
        config.broker_failures_before_success,
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let relay = build_relay(
        DbOutboxRepository::new(db.clone()),
        Arc::clone(&broker),
        config.relay_settings(),
    );
    let relay_task = tokio::spawn(relay.run(shutdown_rx));

    let state = AppState {
        db,
        broker,
        max_retries: config.outbox_max_retries,
    };
    let router = build_router(state);
    let addr = format!("0.0.0.0:{}", config.billing_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("bind {addr}"))?;

    info!("billing service listening on {addr}");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serve http")?;

    let _ = shutdown_tx.send(true);
    relay_task.await.context("join outbox relay")?;
    info!("billing service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
