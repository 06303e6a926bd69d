//! Admin-tier endpoints
//!
//! Agent lifecycle, audit queries, and forced index rebuilds. All guarded
//! by the admin key header; admin actions are audited under the `admin`
//! actor.

use crate::api::ApiError;
use crate::models::*;
use crate::security::require_admin;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use selkie_registry::{RegisterAgentSpec, ADMIN_ACTOR};
use serde_json::json;

/// `POST /admin/agents` - register a new agent
///
/// The plaintext API key appears in this response and nowhere else.
pub async fn register_agent(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(spec): Json<RegisterAgentSpec>,
) -> Result<Json<RegisterResponse>, ApiError> {
    require_admin(&state, &headers)?;

    let (agent, api_key) = state.registry.register(spec).await?;

    state
        .audit
        .record(ADMIN_ACTOR, "register_agent", json!({"agent": &agent.agent_id}))
        .await;

    Ok(Json(RegisterResponse {
        status: "created",
        agent,
        api_key,
        warning: "Save this API key - it will not be shown again!",
    }))
}

/// `GET /admin/agents` - list registered agents (never exposes keys)
pub async fn list_agents(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<AgentListResponse>, ApiError> {
    require_admin(&state, &headers)?;
    Ok(Json(AgentListResponse {
        agents: state.registry.list().await,
    }))
}

/// `DELETE /admin/agents/{agent_id}` - revoke an agent's access
pub async fn revoke_agent(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(agent_id): Path<String>,
) -> Result<Json<RevokeResponse>, ApiError> {
    require_admin(&state, &headers)?;

    if !state.registry.revoke(&agent_id).await {
        return Err(ApiError::not_found(format!("agent {agent_id} not found")));
    }

    state
        .audit
        .record(ADMIN_ACTOR, "revoke_agent", json!({"agent": &agent_id}))
        .await;

    Ok(Json(RevokeResponse {
        status: "revoked",
        agent_id,
    }))
}

/// `GET /admin/audit` - recent audit entries, optionally per agent
pub async fn audit_log(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<AuditQuery>,
) -> Result<Json<AuditResponse>, ApiError> {
    require_admin(&state, &headers)?;
    query.validate()?;

    let entries = state
        .audit
        .recent(query.limit, query.agent_id.as_deref())
        .await;
    Ok(Json(AuditResponse { entries }))
}

/// `POST /admin/rebuild` - rebuild the index immediately
pub async fn rebuild_index(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<RebuildResponse>, ApiError> {
    require_admin(&state, &headers)?;

    state.scheduler.rebuild_now().await?;

    state
        .audit
        .record(ADMIN_ACTOR, "rebuild_index", json!({}))
        .await;

    Ok(Json(RebuildResponse {
        status: "rebuilt",
        index: state.index.status(),
    }))
}
