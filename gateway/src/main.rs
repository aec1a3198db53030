use std::env;

use gateway::registry::ClientRegistry;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_owned());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_level))
        .init();

    let control_addr = env::var("CONTROL_ADDR").unwrap_or_else(|_| "127.0.0.1:5500".to_owned());
    let http_addr = env::var("HTTP_ADDR").unwrap_or_else(|_| "127.0.0.1:8000".to_owned());

    let registry = ClientRegistry::new();

    let control_listener = control_addr
        .parse()
        .expect("CONTROL_ADDR must be a socket address");
    tokio::spawn(gateway::control::run_control_listener(control_listener, registry.clone()));

    let router = gateway::build_router(registry);
    let listener = tokio::net::TcpListener::bind(&http_addr).await.expect("failed to bind HTTP_ADDR");
    info!(addr = %http_addr, "public HTTP listener bound");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("gateway server error");
    info!("gateway shut down gracefully");
}

/// Waits for SIGTERM or Ctrl-C (SIGINT) and returns to trigger graceful shutdown.
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => { info!("received Ctrl+C, shutting down"); },
        _ = terminate => { info!("received SIGTERM, shutting down"); },
    }
}
