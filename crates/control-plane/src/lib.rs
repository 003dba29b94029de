//! OmniPDF Control Plane Library
//!
//! Runs document-processing workflows: a workflow is a named, ordered list
//! of steps (OCR, Translate, Compress, ...) applied to one platform
//! document. Every step runs even when an earlier one fails, and each run
//! leaves one `workflow_executed` entry in the platform audit log.
//!
//! ## Modules
//!
//! - [`config`]: configuration from environment variables
//! - [`platform`]: the backend platform (documents, audit log, LLM, email, auth)
//! - [`store`]: keyed workflow definitions and the audit log
//! - [`engine`]: step registry, sequential executor, lookup, execution records
//! - [`services`] / [`handlers`]: the HTTP API
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use omnipdf_control_plane::{
//!     build_router, config::AppConfig, platform::MemoryPlatform,
//!     state::AppState, store::MemoryWorkflowStore,
//! };
//!
//! let platform = Arc::new(MemoryPlatform::new());
//! let state = AppState::new(
//!     AppConfig::default(),
//!     Arc::new(MemoryWorkflowStore::new()),
//!     platform.clone(),
//!     platform.clone(),
//!     platform,
//! );
//! let app = build_router(state);
//! ```

pub mod auth;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod platform;
pub mod result_ext;
pub mod sanitize;
pub mod services;
pub mod state;
pub mod store;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use error::{AppError, AppResult};
pub use result_ext::ResultExt;

use state::AppState;

/// Build the application router.
///
/// Everything under `/api` except `/api/health` requires a session token.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let auth_layer = middleware::from_fn_with_state(state.auth_state(), auth::require_caller);

    // Health check routes (no auth required)
    let health_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/health", get(handlers::api_health))
        .with_state(state.clone());

    // `/api/workflows/steps` is a static segment and wins over `{workflow_id}`
    let workflow_routes = Router::new()
        .route("/api/workflows/trigger", post(handlers::workflows::trigger))
        .route("/api/workflows/steps", get(handlers::workflows::steps))
        .route(
            "/api/workflows",
            post(handlers::workflows::create).get(handlers::workflows::list),
        )
        .route(
            "/api/workflows/{workflow_id}",
            get(handlers::workflows::get).delete(handlers::workflows::delete),
        )
        .route_layer(auth_layer.clone())
        .with_state(state.workflow_service());

    let execution_routes = Router::new()
        .route("/api/executions", get(handlers::executions::list))
        .route_layer(auth_layer)
        .with_state(state.execution_service());

    Router::new()
        .merge(health_routes)
        .merge(workflow_routes)
        .merge(execution_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
