use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use ailingo_events::{ChangeBus, Finalizer, ProgressTrigger, RedeliverySweep};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ailingo_api::config::ServerConfig;
use ailingo_api::router::build_app_router;
use ailingo_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "ailingo_api=debug,ailingo_events=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        day_offset = %config.finalizer.day_offset,
        "Loaded server configuration"
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = ailingo_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    ailingo_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    ailingo_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Change bus ---
    let bus = Arc::new(ChangeBus::default());

    // Spawn the progress trigger (finalizes every published change).
    let finalizer = Arc::new(Finalizer::new(pool.clone(), config.finalizer.clone()));
    let trigger_handle = tokio::spawn(ProgressTrigger::new(finalizer).run(bus.subscribe()));

    // Spawn the redelivery sweep (republishes unsettled completions).
    let sweep_cancel = CancellationToken::new();
    let sweep = RedeliverySweep::new(pool.clone(), Arc::clone(&bus), config.sweep.clone());
    let sweep_handle = tokio::spawn(sweep.run(sweep_cancel.clone()));

    tracing::info!("Progress services started (trigger, redelivery sweep)");

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        bus: Arc::clone(&bus),
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

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");
    let drain = Duration::from_secs(config.shutdown_timeout_secs);

    // Stop the sweep first so it cannot publish onto a closing bus.
    sweep_cancel.cancel();
    let _ = tokio::time::timeout(drain, sweep_handle).await;
    tracing::info!("Redelivery sweep stopped");

    // Dropping the last bus sender closes the channel; the trigger drains
    // its in-flight settlements and exits. The router and its state were
    // consumed by `serve`, so this is the last handle.
    drop(bus);
    if tokio::time::timeout(drain, trigger_handle).await.is_err() {
        tracing::warn!("Progress trigger did not drain in time, unsettled completions are left to the next sweep");
    }
    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
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
