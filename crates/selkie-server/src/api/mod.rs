//! REST API module
//!
//! Two trust tiers: `/v1/*` for authenticated agents, `/admin/*` for the
//! operator. `/health` and `/v1/types` are public.

pub mod admin;
pub mod memory;

use crate::models::{ErrorResponse, HealthResponse};
use crate::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use selkie_core::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the API router with all routes
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Public
        .route("/health", get(health))
        .route("/v1/types", get(memory::list_types))
        // Agent tier
        .route("/v1/search", post(memory::search))
        .route("/v1/context", post(memory::context))
        .route("/v1/write", post(memory::write))
        .route("/v1/stats", get(memory::stats))
        .route("/v1/me", get(memory::me))
        // Admin tier
        .route(
            "/admin/agents",
            post(admin::register_agent).get(admin::list_agents),
        )
        .route("/admin/agents/{agent_id}", delete(admin::revoke_agent))
        .route("/admin/audit", get(admin::audit_log))
        .route("/admin/rebuild", post(admin::rebuild_index))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Health check endpoint
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        index_built: state.index.status().built,
        agents_registered: state.registry.agent_count().await,
        uptime_seconds: state.uptime_seconds(),
    })
}

/// API error that converts to an HTTP response
pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl ApiError {
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            body: ErrorResponse {
                error: "forbidden",
                message: message.into(),
            },
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            body: ErrorResponse {
                error: "not_found",
                message: message.into(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = match &err {
            Error::Validation { .. } | Error::Conflict { .. } => StatusCode::BAD_REQUEST,
            Error::Auth { .. } => StatusCode::UNAUTHORIZED,
            Error::Authority { .. } => StatusCode::FORBIDDEN,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::RateLimit { .. } => StatusCode::TOO_MANY_REQUESTS,
            Error::IndexUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Error::Upstream { .. } => StatusCode::BAD_GATEWAY,
            Error::Config { .. } | Error::Io(_) | Error::Serialization(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if status.is_server_error() {
            tracing::error!(error = %err, "request failed");
        }

        Self {
            status,
            body: ErrorResponse {
                error: err.code(),
                message: err.to_string(),
            },
        }
    }
}
