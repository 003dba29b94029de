//! OmniPDF Control Plane Server
//!
//! Serves the workflow API: definition management, workflow triggers and
//! execution history.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use omnipdf_control_plane::{
    build_router,
    config::{AppConfig, DatabaseConfig, PlatformConfig, StoreBackend},
    db::{create_pool, ensure_schema},
    platform::PlatformClient,
    state::AppState,
    store::{MemoryWorkflowStore, PgWorkflowStore, WorkflowStore},
};

/// Initialize tracing/logging.
///
/// `OMNIPDF_LOG_FORMAT=json` switches to one JSON object per line.
fn init_tracing() {
    let registry = tracing_subscriber::registry().with(
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "info,omnipdf_control_plane=debug,tower_http=debug".into()),
    );
    let json = std::env::var("OMNIPDF_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Open the configured workflow store, creating the schema for PostgreSQL.
async fn open_workflow_store(config: &AppConfig) -> anyhow::Result<Arc<dyn WorkflowStore>> {
    match config.store {
        StoreBackend::Postgres => {
            let db_config = DatabaseConfig::from_env().unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Failed to load database config, using defaults");
                DatabaseConfig::default()
            });
            let pool = create_pool(&db_config).await?;
            ensure_schema(&pool).await?;
            tracing::info!(database = %db_config.target(), "Workflow store ready");
            Ok(Arc::new(PgWorkflowStore::new(pool)))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory workflow store; definitions are lost on restart");
            Ok(Arc::new(MemoryWorkflowStore::new()))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();

    init_tracing();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting OmniPDF Control Plane"
    );

    let app_config = AppConfig::from_env().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load app config, using defaults");
        AppConfig::default()
    });

    let platform_config = PlatformConfig::from_env().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load platform config, using defaults");
        PlatformConfig::default()
    });

    tracing::info!(
        host = %app_config.host,
        port = app_config.port,
        store = ?app_config.store,
        legacy_lookup = app_config.legacy_workflow_lookup,
        platform = %platform_config.base_url,
        app_id = %platform_config.app_id,
        "Configuration loaded"
    );
    if platform_config.api_key.is_none() {
        tracing::warn!("PLATFORM_API_KEY not set; platform calls are unauthenticated");
    }

    let workflows = open_workflow_store(&app_config).await?;
    let platform = Arc::new(PlatformClient::new(&platform_config)?);

    let addr: SocketAddr = app_config.bind_address().parse()?;
    let state = AppState::new(
        app_config,
        workflows,
        platform.clone(),
        platform.clone(),
        platform,
    );

    let app = build_router(state);

    let listener = TcpListener::bind(addr).await?;

    tracing::info!(address = %addr, "Server listening");

    // Run the server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
///
/// A signal handler that cannot be installed never fires; the other one
/// still does.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
