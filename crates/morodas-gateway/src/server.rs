//! HTTP server implementation using Axum.

use axum::response::IntoResponse;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use morodas_core::config::{GatewayConfig, MorodasConfig};
use morodas_db::MorodasDb;
use morodas_scheduler::{SweepExecutor, WorkflowDispatcher};

/// Shared state for the gateway server.
#[derive(Clone)]
pub struct AppState {
    pub gateway_config: GatewayConfig,
    pub db: Arc<MorodasDb>,
    pub executor: Arc<SweepExecutor>,
    /// Single-flight guard: only one sweep may run at a time. Overlapping
    /// invocations are rejected, never queued (see the sweep handler).
    pub sweep_gate: Arc<tokio::sync::Mutex<()>>,
    pub start_time: std::time::Instant,
}

/// Pull the presented credential: `Authorization: Bearer <x>` first, then a
/// dedicated header.
fn presented_secret(headers: &axum::http::HeaderMap, header_name: &str) -> Option<String> {
    if let Some(auth) = headers.get("Authorization").and_then(|v| v.to_str().ok())
        && let Some(token) = auth.strip_prefix("Bearer ")
    {
        return Some(token.trim().to_string());
    }
    headers
        .get(header_name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

fn unauthorized(message: &str) -> axum::response::Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({"ok": false, "error": message})),
    )
        .into_response()
}

/// Dashboard auth middleware — validates Bearer token or X-Api-Token header.
/// An empty configured token leaves the dashboard API open (development).
async fn require_api_token(
    State(state): State<Arc<AppState>>,
    req: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let expected = &state.gateway_config.api_token;
    if expected.is_empty() {
        return next.run(req).await;
    }
    match presented_secret(req.headers(), "X-Api-Token") {
        Some(token) if token == *expected => next.run(req).await,
        _ => unauthorized("Unauthorized — invalid or missing API token"),
    }
}

/// Sweep auth middleware — strict: the entry point rejects invocations
/// lacking the pre-shared secret, and an unconfigured secret disables the
/// endpoint entirely. Runs before any sweep logic, so a rejected call has
/// no side effects.
async fn require_sweep_secret(
    State(state): State<Arc<AppState>>,
    req: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let expected = &state.gateway_config.sweep_secret;
    if expected.is_empty() {
        return unauthorized("Sweep secret not configured");
    }
    match presented_secret(req.headers(), "X-Sweep-Secret") {
        Some(secret) if secret == *expected => next.run(req).await,
        _ => unauthorized("Unauthorized — invalid or missing sweep secret"),
    }
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    build_router_from_arc(Arc::new(state))
}

pub fn build_router_from_arc(shared: Arc<AppState>) -> Router {
    // Dashboard routes — require valid API token (when configured)
    let protected = Router::new()
        .route("/api/v1/info", get(super::routes::system_info))
        .route(
            "/api/v1/agents",
            get(super::routes::list_agents).post(super::routes::create_agent),
        )
        .route(
            "/api/v1/agents/{id}",
            put(super::routes::update_agent).delete(super::routes::delete_agent),
        )
        .route(
            "/api/v1/triggers",
            get(super::routes::list_triggers).post(super::routes::create_trigger),
        )
        .route("/api/v1/triggers/preview", post(super::routes::preview_schedule))
        .route(
            "/api/v1/triggers/{id}",
            put(super::routes::update_trigger).delete(super::routes::delete_trigger),
        )
        .route("/api/v1/runs", get(super::routes::list_runs))
        .route_layer(axum::middleware::from_fn_with_state(
            shared.clone(),
            require_api_token,
        ));

    // The cron entry point — its own pre-shared secret, always required
    let sweep = Router::new()
        .route("/api/v1/sweep", post(super::routes::run_sweep))
        .route_layer(axum::middleware::from_fn_with_state(
            shared.clone(),
            require_sweep_secret,
        ));

    // Public routes — no auth
    let public = Router::new().route("/health", get(super::routes::health_check));

    protected
        .merge(sweep)
        .merge(public)
        .layer({
            let cors = CorsLayer::new()
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::PUT,
                    axum::http::Method::DELETE,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers(Any)
                .max_age(std::time::Duration::from_secs(3600));

            // Restrict CORS origins in production via env var
            // Example: MORODAS_CORS_ORIGINS=https://ops.morodas.com
            if let Ok(origins_str) = std::env::var("MORODAS_CORS_ORIGINS") {
                let origins: Vec<_> = origins_str
                    .split(',')
                    .filter_map(|s| s.trim().parse::<axum::http::HeaderValue>().ok())
                    .collect();
                cors.allow_origin(origins)
            } else {
                cors.allow_origin(Any)
            }
        })
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}

/// Start the HTTP server.
pub async fn start(config: &MorodasConfig, db: Arc<MorodasDb>) -> anyhow::Result<()> {
    let mut executor = SweepExecutor::new(db.clone());
    if config.workflow.base_url.is_empty() {
        tracing::info!("🔌 No workflow server configured — firings are recorded locally only");
    } else {
        executor = executor.with_dispatcher(WorkflowDispatcher::new(
            &config.workflow.base_url,
            config.workflow.timeout_secs,
        ));
        tracing::info!("🔌 Workflow dispatch enabled → {}", config.workflow.base_url);
    }

    if config.gateway.api_token.is_empty() {
        tracing::warn!("⚠️ No api_token configured — dashboard API is OPEN");
    }
    if config.gateway.sweep_secret.is_empty() {
        tracing::warn!("⚠️ No sweep_secret configured — the sweep endpoint rejects all invocations");
    }

    let state = AppState {
        gateway_config: config.gateway.clone(),
        db,
        executor: Arc::new(executor),
        sweep_gate: Arc::new(tokio::sync::Mutex::new(())),
        start_time: std::time::Instant::now(),
    };

    let app = build_router(state);
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("🌐 MORODAS gateway listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
