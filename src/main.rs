use std::panic;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use texloop_rooms::auth::OpaqueProofVerifier;
use texloop_rooms::config::Config;
use texloop_rooms::db::dbrooms::DbRooms;
use texloop_rooms::db::{MemStore, RoomStore};
use texloop_rooms::docs::ApiDoc;
use texloop_rooms::routes::create_api_routes;
use texloop_rooms::services::cleanup_service::CleanupService;
use texloop_rooms::ws::hub::{HubConfig, RoomHub};
use texloop_rooms::AppState;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Set panic hook for better error messages
    panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
    }));

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            // Default to info level, but allow debug for our app
            "texloop_rooms=debug,tower_http=debug,axum::rejection=trace,info".into()
        }))
        .init();

    info!("Starting server...");

    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        error!("Failed to load configuration: {}", e);
        warn!("Using default configuration");
        Config::default()
    });

    // Pick the room store: Postgres when a URL is configured, otherwise the
    // in-memory store (rooms do not survive a restart).
    let store: Arc<dyn RoomStore> = match &config.db_url {
        Some(db_url) => match DbRooms::connect(db_url).await {
            Ok(db) => {
                info!("Database initialized successfully");
                Arc::new(db)
            }
            Err(e) => {
                error!("Failed to initialize database: {}", e);
                warn!("Falling back to the in-memory store");
                Arc::new(MemStore::new())
            }
        },
        None => {
            warn!("No database URL configured - using the in-memory store");
            Arc::new(MemStore::new())
        }
    };

    let hub = RoomHub::new(
        store.clone(),
        Arc::new(OpaqueProofVerifier),
        HubConfig {
            max_text_length: config.max_text_length,
            max_message_length: config.max_message_length,
            join_rate_limit: config.join_rate_limit,
            chat_rate_limit: config.chat_rate_limit,
            rate_limit_window: Duration::from_secs(config.rate_limit_window_secs),
        },
    );

    let cleanup = Arc::new(CleanupService::new(
        store,
        hub.clone(),
        Duration::from_secs(config.inactivity_threshold_hours * 3600),
    ));
    cleanup
        .clone()
        .spawn_sweep(Duration::from_secs(config.cleanup_interval_secs));
    info!(
        "🧹 Cleanup sweep running every {}s",
        config.cleanup_interval_secs
    );

    let state = AppState { hub, cleanup };

    // Create API routes
    let api_routes = create_api_routes(state);

    // Combine all routes
    let app_routes = Router::new()
        // Mount API routes
        .nest("/api", api_routes)
        // Mount Swagger UI
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Add tracing layer
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start the HTTP/API server
    let listener = tokio::net::TcpListener::bind(config.server_address())
        .await
        .unwrap_or_else(|_| panic!("Failed to bind to {}", config.server_address()));

    info!("🚀 Server running on http://{}", config.server_address());
    info!(
        "📡 WebSocket available at ws://{}/api/socket",
        config.server_address()
    );
    info!(
        "📚 Swagger UI available at http://{}/swagger",
        config.server_address()
    );

    axum::serve(listener, app_routes)
        .await
        .expect("Server failed to start");
}
