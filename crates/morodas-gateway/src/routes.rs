//! API route handlers for the gateway.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

use morodas_core::MorodasError;
use morodas_db::AgentPatch;
use morodas_scheduler::trigger::{Schedule, TriggerPatch};
use morodas_scheduler::upcoming;

use super::server::AppState;

fn bool_true() -> bool { true }

fn error_response(e: MorodasError) -> (StatusCode, Json<Value>) {
    let status = match &e {
        MorodasError::NotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({"ok": false, "error": e.to_string()})))
}

/// Health check endpoint (public).
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "morodas-gateway",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// System information endpoint.
pub async fn system_info(State(state): State<Arc<AppState>>) -> Json<Value> {
    let uptime = state.start_time.elapsed();
    let agents = state.db.list_agents().map(|a| a.len()).unwrap_or(0);
    let triggers = state.db.list_triggers(None).map(|t| t.len()).unwrap_or(0);
    Json(json!({
        "service": "morodas",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": uptime.as_secs(),
        "agents": agents,
        "triggers": triggers,
        "gateway": {
            "host": state.gateway_config.host,
            "port": state.gateway_config.port,
            "api_token_set": !state.gateway_config.api_token.is_empty(),
            "sweep_secret_set": !state.gateway_config.sweep_secret.is_empty(),
        }
    }))
}

// ─── Sweep ───────────────────────────────────────────────────

/// The cron entry point: find all due triggers, fire them once, reschedule.
///
/// Single-flight: a second invocation while one sweep is running gets 409
/// and touches nothing — overlapping sweeps could double-fire a trigger.
pub async fn run_sweep(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    let Ok(_guard) = state.sweep_gate.try_lock() else {
        return (
            StatusCode::CONFLICT,
            Json(json!({"ok": false, "error": "Sweep already running"})),
        );
    };

    let now = Utc::now();
    match state.executor.run_sweep(now).await {
        Ok(summary) => {
            tracing::info!(
                "🧹 Sweep done: {} checked, {} fired, {} skipped",
                summary.checked,
                summary.fired,
                summary.skipped
            );
            (
                StatusCode::OK,
                Json(json!({"ok": true, "timestamp": now.to_rfc3339(), "summary": summary})),
            )
        }
        // nothing was touched (the due-trigger query failed up front);
        // the next cron tick retries naturally
        Err(e) => error_response(e),
    }
}

// ─── Agents ──────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CreateAgentBody {
    pub name: String,
    #[serde(default = "default_agent_type")]
    pub agent_type: String,
    #[serde(default = "bool_true")]
    pub enabled: bool,
}

fn default_agent_type() -> String { "workflow".into() }

pub async fn list_agents(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    match state.db.list_agents() {
        Ok(agents) => (StatusCode::OK, Json(json!({"ok": true, "agents": agents}))),
        Err(e) => error_response(e),
    }
}

pub async fn create_agent(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateAgentBody>,
) -> (StatusCode, Json<Value>) {
    match state.db.create_agent(&body.name, &body.agent_type, body.enabled) {
        Ok(agent) => {
            tracing::info!("🤖 Agent created: '{}' ({})", agent.name, agent.id);
            (StatusCode::OK, Json(json!({"ok": true, "agent": agent})))
        }
        Err(e) => error_response(e),
    }
}

pub async fn update_agent(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(patch): Json<AgentPatch>,
) -> (StatusCode, Json<Value>) {
    match state.db.update_agent(&id, &patch) {
        Ok(agent) => (StatusCode::OK, Json(json!({"ok": true, "agent": agent}))),
        Err(e) => error_response(e),
    }
}

pub async fn delete_agent(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> (StatusCode, Json<Value>) {
    match state.db.delete_agent(&id) {
        Ok(true) => (StatusCode::OK, Json(json!({"ok": true}))),
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Json(json!({"ok": false, "error": format!("Not found: agent {id}")})),
        ),
        Err(e) => error_response(e),
    }
}

// ─── Triggers ────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CreateTriggerBody {
    pub agent_id: String,
    pub name: String,
    #[serde(flatten)]
    pub schedule: Schedule,
    #[serde(default = "bool_true")]
    pub enabled: bool,
}

#[derive(Deserialize)]
pub struct TriggersQuery {
    pub agent_id: Option<String>,
}

pub async fn list_triggers(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TriggersQuery>,
) -> (StatusCode, Json<Value>) {
    match state.db.list_triggers(query.agent_id.as_deref()) {
        Ok(triggers) => (StatusCode::OK, Json(json!({"ok": true, "triggers": triggers}))),
        Err(e) => error_response(e),
    }
}

pub async fn create_trigger(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateTriggerBody>,
) -> (StatusCode, Json<Value>) {
    match state
        .db
        .create_trigger(&body.agent_id, &body.name, body.schedule, body.enabled, Utc::now())
    {
        Ok(trigger) => {
            tracing::info!("📅 Trigger created: '{}' ({})", trigger.name, trigger.id);
            (StatusCode::OK, Json(json!({"ok": true, "trigger": trigger})))
        }
        Err(e) => error_response(e),
    }
}

pub async fn update_trigger(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(patch): Json<TriggerPatch>,
) -> (StatusCode, Json<Value>) {
    match state.db.update_trigger(&id, &patch, Utc::now()) {
        Ok(trigger) => (StatusCode::OK, Json(json!({"ok": true, "trigger": trigger}))),
        Err(e) => error_response(e),
    }
}

pub async fn delete_trigger(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> (StatusCode, Json<Value>) {
    match state.db.delete_trigger(&id) {
        Ok(true) => (StatusCode::OK, Json(json!({"ok": true}))),
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Json(json!({"ok": false, "error": format!("Not found: trigger {id}")})),
        ),
        Err(e) => error_response(e),
    }
}

// ─── Schedule preview ────────────────────────────────────────

#[derive(Deserialize)]
pub struct PreviewBody {
    #[serde(flatten)]
    pub schedule: Schedule,
    #[serde(default = "default_preview_count")]
    pub count: usize,
    /// Defaults to the current instant.
    pub from: Option<DateTime<Utc>>,
}

fn default_preview_count() -> usize { 5 }

/// Upcoming fire instants for a schedule — display/validation only, no
/// side effects.
pub async fn preview_schedule(Json(body): Json<PreviewBody>) -> Json<Value> {
    let count = body.count.clamp(1, 60);
    let from = body.from.unwrap_or_else(Utc::now);
    let fires: Vec<String> = upcoming(&body.schedule, count, from)
        .iter()
        .map(|f| f.to_rfc3339())
        .collect();
    Json(json!({"ok": true, "from": from.to_rfc3339(), "fires": fires}))
}

// ─── Runs ────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct RunsQuery {
    pub agent_id: Option<String>,
    pub limit: Option<usize>,
}

pub async fn list_runs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RunsQuery>,
) -> (StatusCode, Json<Value>) {
    let limit = query.limit.unwrap_or(50).min(500);
    match state.db.list_runs(query.agent_id.as_deref(), limit) {
        Ok(runs) => (StatusCode::OK, Json(json!({"ok": true, "runs": runs}))),
        Err(e) => error_response(e),
    }
}
