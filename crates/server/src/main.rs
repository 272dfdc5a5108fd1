//! Academy-rs server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use academy_api::{AppState, metrics_middleware, router as api_router};
use academy_common::{Config, IdGenerator};
use academy_core::{
    ChannelEventSink, EVENT_BUFFER_SIZE, EventSinkService, Workflows, run_event_logger,
    run_scheduler,
};
use axum::{Router, middleware};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "academy=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting academy-rs server...");

    // Load configuration
    let config = Config::load()?;

    // Connect to database
    let db = academy_db::init(&config).await?;
    info!("Connected to database");

    // Run migrations
    info!("Running database migrations...");
    academy_db::migrate(&db).await?;
    info!("Migrations completed");

    let db = Arc::new(db);

    // Workflow events are drained by a background logger; delivery of
    // notifications lives outside this service.
    let (event_sink, event_receiver) = ChannelEventSink::new(EVENT_BUFFER_SIZE);
    let event_sink: EventSinkService = Arc::new(event_sink);
    tokio::spawn(run_event_logger(event_receiver));

    let workflows = Workflows::new(
        Arc::clone(&db),
        &config.enrollment,
        IdGenerator::new(),
        Some(event_sink),
    );

    // Start maintenance jobs
    let scheduler_handles = if config.scheduler.enabled {
        let maintenance = Arc::new(workflows.maintenance(config.scheduler.expiring_within_days));
        run_scheduler(&config.scheduler, maintenance)
    } else {
        info!("Maintenance scheduler disabled");
        Vec::new()
    };

    let state = AppState::new(workflows, db);

    let app = Router::new()
        .nest("/api", api_router())
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    // Start server with graceful shutdown
    let host: std::net::IpAddr = config.server.host.parse()?;
    let addr = SocketAddr::new(host, config.server.port);
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    for handle in scheduler_handles {
        handle.abort();
    }

    info!("Server shutdown complete");
    Ok(())
}
