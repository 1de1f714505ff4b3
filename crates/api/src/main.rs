use std::net::SocketAddr;
use std::sync::Arc;

use fitcoach_api::config::ServerConfig;
use fitcoach_api::router::build_app_router;
use fitcoach_api::state::AppState;
use fitcoach_db::store::{JobStore, PgJobStore};
use fitcoach_generation::GenerationConfig;
use fitcoach_worker::dispatcher::{DispatcherConfig, JobDispatcher};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fitcoach_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = fitcoach_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    fitcoach_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    fitcoach_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database ready");

    // --- Jobs ---
    let jobs: Arc<dyn JobStore> = Arc::new(PgJobStore::new(pool.clone()));
    let processor =
        fitcoach_worker::build_processor(pool.clone(), jobs.clone(), &GenerationConfig::from_env())
            .expect("Failed to build generation clients");
    let dispatcher = Arc::new(JobDispatcher::new(
        Arc::new(processor),
        DispatcherConfig::from_env(),
    ));

    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        jobs,
        dispatcher,
    };
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    tracing::info!("Server stopped");
}

/// Resolve on SIGINT or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
