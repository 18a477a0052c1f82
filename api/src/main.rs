//! REST API for Hyper-V VM security settings
//!
//! Configuration is loaded from config.toml in the working directory, or
//! from the path given as the first argument.

use std::sync::Arc;

use api::{create_router, init_tracing, AppState, Config};

fn main() {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    // Load configuration
    let config = Config::load(&config_path).unwrap_or_else(|e| {
        eprintln!("Warning: {}", e);
        Config::default()
    });

    // Initialize tracing
    init_tracing(&config.logging.level);

    let state = match AppState::from_config(&config) {
        Ok(state) => Arc::new(state),
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };

    tracing::info!(
        target_host = config.hyperv.machine_name.as_deref().unwrap_or("localhost"),
        "Starting API server on {}:{}",
        config.server.host,
        config.server.port
    );

    // Create tokio runtime and run
    let runtime = tokio::runtime::Runtime::new().expect("Failed to create Tokio runtime");

    runtime.block_on(async {
        let app = create_router(state);

        let addr: std::net::SocketAddr = config
            .socket_addr()
            .parse()
            .expect("Invalid socket address");

        tracing::info!("API server listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .expect("Failed to bind to address");

        axum::serve(listener, app).await.expect("Server error");
    });
}
