//! Agent-tier memory endpoints
//!
//! Every handler admits the caller first (auth + rate limit), validates
//! the request, performs the operation, and records the admitted action
//! to the audit trail. Audit appends never fail the request.

use crate::api::ApiError;
use crate::models::*;
use crate::security::admit;
use crate::state::AppState;
use axum::{extract::State, http::HeaderMap, Json};
use chrono::Utc;
use selkie_core::constants::CONTEXT_CANDIDATES_COUNT;
use selkie_index::{assemble_context, filter_candidates, raw_candidates};
use selkie_memory::{MemoryType, RecordDraft, SourceKind};
use selkie_registry::AgentRegistry;
use serde_json::json;

/// `POST /v1/search` - semantic search over memories
pub async fn search(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    let agent = admit(&state, &headers).await?;
    req.validate()?;

    let k = raw_candidates(req.top_k, req.is_filtered());
    let hits = match state.index.search(&req.query, k).await {
        Ok(hits) => hits,
        Err(err) => {
            state
                .audit
                .record(
                    &agent.agent_id,
                    "search",
                    json!({"query": &req.query, "error": err.code()}),
                )
                .await;
            return Err(err.into());
        }
    };
    let hits = filter_candidates(hits, req.memory_type, req.min_authority, req.top_k);

    state
        .audit
        .record(
            &agent.agent_id,
            "search",
            json!({"query": &req.query, "results": hits.len()}),
        )
        .await;
    state.registry.record_usage(&agent.agent_id, false).await;

    Ok(Json(SearchResponse {
        agent: agent.agent_id,
        query: req.query,
        results: hits.into_iter().map(SearchHit::from).collect(),
        timestamp: Utc::now(),
    }))
}

/// `POST /v1/context` - authority-ranked context block for LLM injection
pub async fn context(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ContextRequest>,
) -> Result<Json<ContextResponse>, ApiError> {
    let agent = admit(&state, &headers).await?;
    req.validate()?;

    let hits = state
        .index
        .search(&req.query, CONTEXT_CANDIDATES_COUNT)
        .await?;
    let block = assemble_context(&hits, req.max_tokens);

    state
        .audit
        .record(&agent.agent_id, "context", json!({"query": &req.query}))
        .await;
    state.registry.record_usage(&agent.agent_id, false).await;

    Ok(Json(ContextResponse {
        agent: agent.agent_id,
        query: req.query,
        context: block,
        timestamp: Utc::now(),
    }))
}

/// `POST /v1/write` - append a new memory record
pub async fn write(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<WriteRequest>,
) -> Result<Json<WriteResponse>, ApiError> {
    let agent = admit(&state, &headers).await?;
    req.validate()?;

    if let Err(err) = AgentRegistry::ensure_authority(&agent, req.memory_type) {
        state
            .audit
            .record(
                &agent.agent_id,
                "write",
                json!({
                    "memory_type": req.memory_type,
                    "denied": err.code(),
                }),
            )
            .await;
        return Err(err.into());
    }

    let mut tags = req.tags.clone();
    tags.push(format!("agent:{}", agent.agent_id));

    let mut draft = RecordDraft::new(req.memory_type, req.content.clone(), SourceKind::Agent)
        .tags(tags)
        .agent_id(agent.agent_id.clone());
    draft.rationale = req.rationale.clone();
    draft.confidence = req.confidence;

    let record = state.log.append(draft).await?;

    // index catches up in the background; the write is already durable
    state.scheduler.notify();

    state
        .audit
        .record(
            &agent.agent_id,
            "write",
            json!({
                "memory_id": &record.id,
                "memory_type": record.kind,
                "content_length": record.content.len(),
            }),
        )
        .await;
    state.registry.record_usage(&agent.agent_id, true).await;

    Ok(Json(WriteResponse {
        agent: agent.agent_id,
        memory_id: record.id,
        status: "created",
        kind: record.kind,
        authority: record.kind.authority(),
        timestamp: Utc::now(),
    }))
}

/// `GET /v1/stats` - record counts and index status
pub async fn stats(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<StatsResponse>, ApiError> {
    let agent = admit(&state, &headers).await?;

    let by_type = state.log.counts_by_kind().await;
    let total = state.log.len().await;

    state
        .audit
        .record(&agent.agent_id, "stats", json!({}))
        .await;

    Ok(Json(StatsResponse {
        agent: agent.agent_id,
        total,
        by_type,
        index: state.index.status(),
        timestamp: Utc::now(),
    }))
}

/// `GET /v1/me` - calling agent's own profile
pub async fn me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<selkie_registry::Agent>, ApiError> {
    let agent = admit(&state, &headers).await?;
    Ok(Json(agent))
}

/// `GET /v1/types` - public table of memory types
pub async fn list_types() -> Json<TypesResponse> {
    let mut types: Vec<TypeInfo> = MemoryType::ALL
        .into_iter()
        .map(|kind| TypeInfo {
            kind: kind.as_str(),
            authority: kind.authority(),
            description: kind.description(),
        })
        .collect();
    types.sort_by_key(|info| std::cmp::Reverse(info.authority));
    Json(TypesResponse { types })
}
