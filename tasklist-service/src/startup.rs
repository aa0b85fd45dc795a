//! Application startup and lifecycle management.

use crate::config::{CorsConfig, TasklistConfig};
use crate::handlers;
use crate::middleware::require_auth;
use crate::services::{init_metrics, AuthService, Database, JwtService, TaskService, TaskStore};
use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    metrics_middleware, request_id_middleware, security_headers_middleware,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<TasklistConfig>,
    pub store: Arc<dyn TaskStore>,
    pub tasks: TaskService,
    pub auth: AuthService,
    pub jwt: JwtService,
}

impl AppState {
    pub fn new(config: TasklistConfig, store: Arc<dyn TaskStore>) -> Result<Self, AppError> {
        let jwt = JwtService::new(&config.jwt).map_err(AppError::ConfigError)?;

        Ok(Self {
            tasks: TaskService::new(store.clone()),
            auth: AuthService::new(store.clone(), jwt.clone()),
            config: Arc::new(config),
            store,
            jwt,
        })
    }
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins = if config.allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::mirror_request()
    } else {
        let parsed: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|origin| match origin.parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::ORIGIN, header::CONTENT_TYPE, header::AUTHORIZATION])
        .expose_headers([header::CONTENT_LENGTH])
        .allow_credentials(true)
}

/// Build the HTTP router over the given state.
pub fn build_router(state: AppState) -> Router {
    let mut task_routes: Router<AppState> = Router::new()
        .route("/tasklist", get(handlers::list_tasks))
        .route("/insert", post(handlers::insert_tasks))
        .route("/update", post(handlers::update_tasks))
        .route("/delete/:id", get(handlers::delete_task));

    if state.config.require_auth {
        task_routes = task_routes.route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));
    }

    Router::new()
        .merge(task_routes)
        .route("/login", post(handlers::login))
        .route("/health", get(handlers::health))
        .route("/ready", get(handlers::ready))
        .route("/metrics", get(handlers::metrics))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config.cors))
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Connect to MySQL, apply migrations and bind the listener.
    pub async fn build(config: TasklistConfig) -> Result<Self, AppError> {
        let db = Database::new(
            &config.database.url,
            config.database.max_connections,
            config.database.min_connections,
        )
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to connect to MySQL");
            e
        })?;

        db.run_migrations().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to run migrations");
            e
        })?;

        Self::build_with_store(config, Arc::new(db)).await
    }

    /// Bind the listener over an already constructed store.
    pub async fn build_with_store(
        config: TasklistConfig,
        store: Arc<dyn TaskStore>,
    ) -> Result<Self, AppError> {
        init_metrics();

        let addr = config.common.bind_address();
        let listener = TcpListener::bind(&addr).await.map_err(|e| {
            tracing::error!(error = %e, addr = %addr, "Failed to bind HTTP listener");
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        if config.require_auth {
            tracing::info!("Bearer authentication required on task routes");
        }

        let router = build_router(AppState::new(config, store)?);

        tracing::info!(port = port, "Tasklist service listener bound");

        Ok(Self {
            port,
            listener,
            router,
        })
    }

    /// Get the HTTP port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        tracing::info!(
            service = "tasklist-service",
            version = env!("CARGO_PKG_VERSION"),
            port = self.port,
            "Service ready to accept connections"
        );

        axum::serve(self.listener, self.router).await.map_err(|e| {
            tracing::error!(error = %e, "HTTP server error");
            std::io::Error::other(format!("HTTP server error: {}", e))
        })
    }
}
