use axum::{
    http::{HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Json},
    routing::{get, patch, post},
    Router,
};
use serde_json::{json, Value};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use freelancer_hub::config;
use freelancer_hub::database::DatabaseManager;
use freelancer_hub::handlers::{protected, public};
use freelancer_hub::middleware::jwt_auth_middleware;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    let default_filter = if freelancer_hub::is_development!() {
        "info,freelancer_hub=debug,tower_http=info"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .init();

    let config = config::config();
    info!("Starting FreelancerHub API in {:?} mode", config.environment);
    if config.security.jwt_secret.is_empty() {
        if freelancer_hub::is_production!() {
            anyhow::bail!("JWT_SECRET must be set in production");
        }
        warn!("JWT_SECRET is not set; login and protected routes will fail");
    }

    // The API still starts without a database so /health can report it
    if config.database.run_migrations {
        if let Err(e) = DatabaseManager::migrate().await {
            warn!("Skipping migrations: {}", e);
        }
    }

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("FreelancerHub API listening on http://{}", bind_addr);

    axum::serve(listener, app())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    DatabaseManager::close().await;
    Ok(())
}

fn app() -> Router {
    let api = &config::config().api;

    let mut router = Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(auth_public_routes())
        // Protected
        .merge(protected_routes())
        // Global middleware
        .layer(cors_layer())
        .layer(RequestBodyLimitLayer::new(api.max_request_size_bytes));

    if api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }
    router
}

fn cors_layer() -> CorsLayer {
    let security = &config::config().security;
    if !security.enable_cors {
        return CorsLayer::new();
    }
    if security.cors_origins.is_empty() || security.cors_origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

fn auth_public_routes() -> Router {
    Router::new()
        .route("/api/auth/register", post(public::auth::register))
        .route("/api/auth/login", post(public::auth::login))
}

fn protected_routes() -> Router {
    Router::new()
        .merge(auth_routes())
        .merge(client_routes())
        .merge(project_routes())
        .merge(task_routes())
        .merge(time_entry_routes())
        .merge(invoice_routes())
        .merge(profile_routes())
        .route("/api/inicio", get(protected::dashboard::get))
        .route_layer(middleware::from_fn(jwt_auth_middleware))
}

fn auth_routes() -> Router {
    Router::new().route("/api/auth/whoami", get(protected::auth::whoami))
}

fn client_routes() -> Router {
    use protected::clients;

    Router::new()
        .route("/api/clients", get(clients::list).post(clients::post))
        .route(
            "/api/clients/:id",
            get(clients::get).put(clients::put).delete(clients::delete),
        )
}

fn project_routes() -> Router {
    use protected::projects;

    Router::new()
        .route("/api/projects", get(projects::list).post(projects::post))
        .route(
            "/api/projects/:id",
            get(projects::get).put(projects::put).delete(projects::delete),
        )
}

fn task_routes() -> Router {
    use protected::tasks;

    Router::new()
        .route("/api/tasks", get(tasks::list).post(tasks::post))
        .route(
            "/api/tasks/:id",
            get(tasks::get).put(tasks::put).delete(tasks::delete),
        )
        .route("/api/tasks/:id/status", patch(tasks::patch_status))
}

fn time_entry_routes() -> Router {
    use protected::time_entries;

    Router::new()
        .route("/api/time-entries", get(time_entries::list).post(time_entries::post))
        .route(
            "/api/time-entries/:id",
            get(time_entries::get).delete(time_entries::delete),
        )
}

fn invoice_routes() -> Router {
    use protected::invoices;

    Router::new()
        .route("/api/invoices", get(invoices::list).post(invoices::post))
        .route("/api/invoices/:id", get(invoices::get))
        .route("/api/invoices/:id/status", patch(invoices::patch_status))
        .route("/api/invoices/:id/pix", get(invoices::pix))
        .route("/api/invoices/:id/document", get(invoices::document))
}

fn profile_routes() -> Router {
    use protected::profile;

    Router::new().route(
        "/api/profile",
        get(profile::get).post(profile::save).put(profile::save),
    )
}

async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "FreelancerHub API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Clients, projects, Kanban tasks, time tracking and invoicing for freelancers",
            "endpoints": {
                "health": "/health (public)",
                "auth": "/api/auth/register, /api/auth/login (public), /api/auth/whoami (protected)",
                "clients": "/api/clients[/:id] (protected)",
                "projects": "/api/projects[/:id] (protected)",
                "tasks": "/api/tasks[/:id][/status] (protected)",
                "time_entries": "/api/time-entries[/:id] (protected)",
                "invoices": "/api/invoices[/:id][/status|/pix|/document] (protected)",
                "profile": "/api/profile (protected)",
                "dashboard": "/api/inicio (protected)",
            }
        }
    }))
}

async fn health() -> impl IntoResponse {
    let now = chrono::Utc::now();

    match DatabaseManager::health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "code": "SERVICE_UNAVAILABLE",
                    "data": {
                        "status": "degraded",
                        "timestamp": now
                    }
                })),
            )
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutting down");
}
