use backend::{app, config::AppConfig, store, telemetry};
use tokio::net::TcpListener;
use tokio::signal;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(error) => {
            eprintln!("Configuration error: {error}");
            std::process::exit(1);
        }
    };

    if let Err(error) = telemetry::init_tracing(config.log_format) {
        eprintln!("Failed to initialise logging: {error}");
        std::process::exit(1);
    }

    let store = match store::connect(&config.store, store::system_clock()).await {
        Ok(store) => store,
        Err(error) => {
            tracing::error!(%error, "Failed to open task store");
            std::process::exit(1);
        }
    };

    let listener = match TcpListener::bind(config.bind_addr).await {
        Ok(listener) => listener,
        Err(error) => {
            tracing::error!(%error, addr = %config.bind_addr, "Failed to bind");
            std::process::exit(1);
        }
    };

    tracing::info!(
        addr = %config.bind_addr,
        static_dir = %config.static_dir.display(),
        "Server running"
    );

    let router = app(store, &config.static_dir);
    if let Err(error) = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(%error, "Server error");
        std::process::exit(1);
    }
    tracing::info!("Server stopped");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::error!(%error, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(error) => {
                tracing::error!(%error, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
