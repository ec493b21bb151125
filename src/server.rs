//! # Server Module
//!
//! Application state, the route table, and HTTP server start-up.

use anyhow::{Context, Result};
use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post, put, MethodRouter},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::auth::{jwt::JwtService, middleware::AuthMiddleware};
use crate::config::{Config, StoreBackend};
use crate::database::{DocumentStore, MemoryStore, PgDocumentStore};
use crate::routes::{auth, foods, health, orders, users};

/// Application state shared across all route handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub jwt_service: Arc<JwtService>,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>, jwt_service: JwtService) -> Self {
        Self {
            store,
            jwt_service: Arc::new(jwt_service),
        }
    }
}

/// Whether a route sits behind the auth gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Authenticated,
}

/// One row of the route table
pub struct RouteEntry {
    pub path: &'static str,
    pub access: Access,
    pub handler: MethodRouter<AppState>,
}

impl RouteEntry {
    fn new(path: &'static str, access: Access, handler: MethodRouter<AppState>) -> Self {
        Self { path, access, handler }
    }
}

/// Every endpoint the server exposes. Entries sharing a path are merged by
/// method, so a path can mix public and authenticated methods.
pub fn route_table() -> Vec<RouteEntry> {
    use Access::{Authenticated, Public};

    vec![
        RouteEntry::new("/", Public, get(health::status)),
        RouteEntry::new("/topSelling", Public, get(foods::top_selling)),
        RouteEntry::new("/foods", Public, get(foods::list_foods)),
        RouteEntry::new("/totalFoods", Public, get(foods::total_foods)),
        RouteEntry::new("/food/{id}", Public, get(foods::food_detail)),
        RouteEntry::new("/myFood", Authenticated, get(foods::my_foods)),
        RouteEntry::new("/addFood", Public, post(foods::add_food)),
        RouteEntry::new("/updateFood/{id}", Public, put(foods::update_food)),
        RouteEntry::new("/purchaseCount/{id}", Public, put(foods::update_purchase_count)),
        RouteEntry::new("/order", Public, post(orders::place_order)),
        RouteEntry::new("/users", Authenticated, get(users::list_users)),
        RouteEntry::new("/users", Public, post(users::add_user)),
        RouteEntry::new("/jwt", Public, post(auth::issue_token)),
        RouteEntry::new("/logout", Public, get(auth::logout)),
    ]
}

fn cors_layer(allowed_origin: HeaderValue) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(allowed_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::ORIGIN, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true) // Allow cookies for auth
}

/// Mount the route table, applying the auth gate per entry
pub fn build_router(state: AppState, allowed_origin: HeaderValue) -> Router {
    let mut router = Router::new();

    for entry in route_table() {
        let handler = match entry.access {
            Access::Public => entry.handler,
            Access::Authenticated => entry.handler.route_layer(middleware::from_fn_with_state(
                state.jwt_service.clone(),
                AuthMiddleware::validate_token,
            )),
        };
        router = router.route(entry.path, handler);
    }

    router
        .layer(ServiceBuilder::new().layer(cors_layer(allowed_origin)))
        .with_state(state)
}

async fn open_store(backend: &StoreBackend) -> Result<Arc<dyn DocumentStore>> {
    let store: Arc<dyn DocumentStore> = match backend {
        StoreBackend::Postgres(db_config) => Arc::new(PgDocumentStore::connect(db_config.clone()).await?),
        StoreBackend::Memory => {
            tracing::warn!("⚠️  Using the in-memory store; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };
    Ok(store)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("🛑 Shutdown signal received");
}

/// Connects the store, builds the router and serves until Ctrl-C.
pub async fn start(config: Config) -> Result<()> {
    let store = open_store(&config.store).await?;
    let state = AppState::new(store, JwtService::new(&config.auth.token_secret));

    let allowed_origin: HeaderValue = config
        .cors
        .allowed_origin
        .parse()
        .with_context(|| format!("CLIENT_ORIGIN {:?} is not a valid header value", config.cors.allowed_origin))?;

    let app = build_router(state, allowed_origin);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr} - port may already be in use"))?;

    tracing::info!("🚀 Dine-in server starting...");
    tracing::info!("📡 Listening on http://{}", addr);
    tracing::info!("🌐 Allowed origin: {}", config.cors.allowed_origin);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")
}
