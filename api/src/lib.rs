//! REST API library for Hyper-V VM security settings
//!
//! Provides REST endpoints for:
//! - Reading and overwriting a VM's security settings (TPM, shielding, encryption)
//! - The declarative `vm_security` block form of the same settings

pub mod config;
pub mod dto;
pub mod handlers;
pub mod response;
pub mod routes;

use std::sync::Arc;

use axum::{routing::get, Json, Router};
use hyperv_security::{PsExecutor, SecurityReconciler, VmSecurityClient};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub use config::{Config, ConfigError};
pub use dto::*;
pub use response::{ApiResponse, ApiResult};

// =============================================================================
// Tracing Initialization
// =============================================================================

/// Initialize tracing/logging with the given filter level
pub fn init_tracing(filter: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

// =============================================================================
// Shared State
// =============================================================================

pub struct AppState {
    pub client: Arc<dyn VmSecurityClient>,
}

impl AppState {
    pub fn new(client: Arc<dyn VmSecurityClient>) -> Self {
        Self { client }
    }

    /// State backed by PowerShell against the configured host.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let executor = PsExecutor::new(config.connection()?);
        Ok(Self::new(Arc::new(SecurityReconciler::new(executor))))
    }
}

pub type SharedState = Arc<AppState>;

// =============================================================================
// Router
// =============================================================================

pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .nest("/api/v1", api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn api_routes() -> Router<SharedState> {
    Router::new().nest("/hyperv", routes::hyperv_routes())
}

// =============================================================================
// Root Endpoints
// =============================================================================

async fn root() -> &'static str {
    "Hyper-V VM Security API - Use /api/v1/hyperv/vms/{name}/security"
}

async fn health() -> Json<ApiResponse<&'static str>> {
    Json(ApiResponse::success("ok"))
}

// =============================================================================
// Tests
// =============================================================================
