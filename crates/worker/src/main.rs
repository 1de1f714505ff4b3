use std::sync::Arc;

use fitcoach_db::store::{JobStore, PgJobStore};
use fitcoach_generation::GenerationConfig;
use fitcoach_worker::dispatcher::{DispatcherConfig, JobDispatcher};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fitcoach_worker=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = fitcoach_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    fitcoach_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    let store: Arc<dyn JobStore> = Arc::new(PgJobStore::new(pool.clone()));
    let processor = fitcoach_worker::build_processor(pool, store, &GenerationConfig::from_env())
        .expect("Failed to build generation clients");
    let dispatcher = JobDispatcher::new(Arc::new(processor), DispatcherConfig::from_env());

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown.cancel();
    });

    dispatcher.run(cancel).await;
    tracing::info!("Worker stopped");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
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
        () = ctrl_c => tracing::info!("Received Ctrl+C, starting graceful shutdown"),
        () = terminate => tracing::info!("Received SIGTERM, starting graceful shutdown"),
    }
}
