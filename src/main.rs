use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{router, AppState, Panel};
use discharge_core::config::resolve_specialties;
use discharge_core::{CoreConfig, TracingNotifier};
use discharge_store::{connect, StoreSettings};

/// Main entry point for the discharge panel service
///
/// Resolves configuration once, connects to the record store, performs the initial load of active
/// records and today's statistics, then serves the REST API.
///
/// # Environment Variables
/// - `DISCHARGE_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `DISCHARGE_SPECIALTIES_FILE`: YAML file listing the specialties to report on
/// - `DISCHARGE_SPECIALTIES`: Comma-separated specialties, used when no file is given
/// - `DISCHARGE_STORE_URL` / `DISCHARGE_STORE_KEY`: Remote record store
/// - `DISCHARGE_SEED_FILE`: JSON seed for the in-memory store when no remote store is set
/// - `DISCHARGE_STORE_TIMEOUT_SECS`: Remote request timeout (default: 30)
///
/// # Errors
/// Returns an error if configuration is invalid, the store cannot be set up, or the server fails
/// to bind or run. A failing initial load is logged and the server still starts.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("discharge=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr =
        std::env::var("DISCHARGE_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let specialties = resolve_specialties(
        std::env::var("DISCHARGE_SPECIALTIES_FILE")
            .ok()
            .map(PathBuf::from),
        std::env::var("DISCHARGE_SPECIALTIES").ok(),
    )?;
    let cfg = Arc::new(CoreConfig::new(specialties)?);
    let store = connect(&StoreSettings::from_env()?)?;
    let store_name = store.name();

    let mut panel = Panel::new(cfg, store, TracingNotifier);
    if let Err(e) = panel.initial_load().await {
        tracing::warn!("initial load incomplete, retry via /records/reload: {e}");
    }

    tracing::info!("++ Starting discharge REST on {} ({} store)", rest_addr, store_name);

    let app = router(AppState::new(panel, store_name));
    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
