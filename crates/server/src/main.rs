//! Huddle server entry point.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{Router, middleware, routing::get};
use fred::interfaces::ClientLike;
use huddle_api::{GatewayState, gateway_handler, middleware::AppState, router as api_router};
use huddle_cache::{Cache, Invalidator};
use huddle_common::Config;
use huddle_core::{
    AuthService, ChatListService, GroupService, MessageService, OrganizationService, UserService,
};
use huddle_db::repositories::{
    DirectMessageRepository, GroupMessageRepository, GroupRepository, OrganizationRepository,
    UserRepository,
};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
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
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "huddle=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting huddle server...");

    // Load configuration
    let config = Config::load()?;

    // Connect to database and run migrations
    let db = huddle_db::init(&config).await?;
    info!("Connected to database");

    info!("Running database migrations...");
    huddle_db::migrate(&db).await?;
    info!("Migrations completed");

    // Connect to Redis
    let redis_config = fred::types::config::Config::from_url(&config.redis.url)?;
    let redis_client = fred::clients::Client::new(redis_config, None, None, None);
    redis_client.connect();
    redis_client.wait_for_connect().await?;
    let redis_client = Arc::new(redis_client);
    info!("Connected to Redis");

    let cache = Cache::new(
        redis_client,
        config.redis.prefix.clone(),
        Duration::from_millis(config.cache.op_timeout_ms),
    );
    let invalidator = Invalidator::new(cache.clone());

    // Initialize repositories
    let db = Arc::new(db);
    let user_repo = UserRepository::new(Arc::clone(&db));
    let org_repo = OrganizationRepository::new(Arc::clone(&db));
    let group_repo = GroupRepository::new(Arc::clone(&db));
    let dm_repo = DirectMessageRepository::new(Arc::clone(&db));
    let gm_repo = GroupMessageRepository::new(Arc::clone(&db));

    // Initialize services
    let auth_service = AuthService::new(user_repo.clone(), org_repo.clone());

    let mut user_service = UserService::new(user_repo.clone(), org_repo.clone());
    user_service.set_cache(
        cache.clone(),
        invalidator.clone(),
        config.cache.profile_ttl_secs,
    );

    let organization_service = OrganizationService::new(org_repo.clone(), user_repo.clone());

    let group_service = GroupService::new(group_repo.clone(), org_repo.clone(), user_repo.clone());

    let mut message_service = MessageService::new(
        dm_repo.clone(),
        gm_repo,
        group_repo,
        org_repo,
        user_repo.clone(),
    );
    message_service.set_cache(
        cache.clone(),
        invalidator.clone(),
        config.cache.page_ttl_secs,
    );

    let mut chat_list_service = ChatListService::new(dm_repo, user_repo);
    chat_list_service.set_cache(cache, config.cache.chat_list_ttl_secs);

    // Gateway state owns the connection registry for the process lifetime
    let gateway = GatewayState::new();

    let state = AppState {
        auth_service,
        user_service,
        organization_service,
        group_service,
        message_service,
        chat_list_service,
        gateway,
    };

    // Build router
    let app = Router::new()
        .route("/gateway", get(gateway_handler))
        .nest("/api", api_router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            huddle_api::middleware::auth_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    // Start server with graceful shutdown
    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
