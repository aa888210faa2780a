use std::sync::Arc;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::AppState;
use ward_core::{
    alert_thresholds_from_env_values, constants::DEFAULT_DATA_DIR, AuditEvent, AuditSink,
    ChannelAuditSink, CoreConfig, FileStore, TracingAuditSink,
};

/// Main entry point for the ward service
///
/// Serves the REST API (with Swagger UI at `/swagger-ui`) over a YAML record
/// store. Audit events are queued on a channel and written out by a background
/// task so request handlers never wait on them.
///
/// # Environment Variables
/// - `WARD_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `WARD_DATA_DIR`: Record store directory (default: "ward_data")
/// - `WARD_LONG_STAY_DAYS`, `WARD_CRITICAL_STAY_DAYS`, `WARD_OVERDUE_STEPS_HIGH`:
///   alert thresholds
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("ward=info".parse()?))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("WARD_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let data_dir = std::env::var("WARD_DATA_DIR").unwrap_or_else(|_| DEFAULT_DATA_DIR.into());

    let thresholds = alert_thresholds_from_env_values(
        std::env::var("WARD_LONG_STAY_DAYS").ok(),
        std::env::var("WARD_CRITICAL_STAY_DAYS").ok(),
        std::env::var("WARD_OVERDUE_STEPS_HIGH").ok(),
    )?;
    let cfg = Arc::new(CoreConfig::new(data_dir.into(), thresholds)?);
    let store = Arc::new(FileStore::open(cfg.data_dir())?);

    let (audit_tx, mut audit_rx) = mpsc::unbounded_channel::<AuditEvent>();
    let audit_writer = tokio::spawn(async move {
        while let Some(event) = audit_rx.recv().await {
            TracingAuditSink.emit(event);
        }
    });

    let state = AppState::new(cfg.clone(), store, Arc::new(ChannelAuditSink::new(audit_tx)));
    let app = api_rest::router(state);

    tracing::info!("++ Starting ward REST on {}", rest_addr);
    tracing::info!("++ Records stored under {}", cfg.data_dir().display());

    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app).await?;

    audit_writer.await?;
    Ok(())
}
