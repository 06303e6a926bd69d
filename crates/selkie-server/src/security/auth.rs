//! Request admission
//!
//! Agent tier: `Authorization: Bearer <api_key>` resolved through the
//! registry, then charged against the agent's sliding-window quota.
//! Admin tier: `x-admin-key` header compared in constant time against the
//! configured key. Auth and rate checks run in that order and are never
//! reordered: a rate-limited agent was still authenticated, an
//! unauthenticated caller never consumes quota.

use crate::api::ApiError;
use crate::state::AppState;
use axum::http::{header, HeaderMap};
use selkie_core::{Error, Result};
use selkie_registry::Agent;
use subtle::ConstantTimeEq;

/// Authorization scheme prefix for agent keys
pub const BEARER_PREFIX: &str = "Bearer ";

/// Header carrying the admin key
pub const ADMIN_KEY_HEADER: &str = "x-admin-key";

/// Extract the bearer key from request headers
fn bearer_key(headers: &HeaderMap) -> Result<&str> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| Error::auth("missing Authorization header, expected: Bearer <api_key>"))?;

    value
        .strip_prefix(BEARER_PREFIX)
        .ok_or_else(|| Error::auth("invalid Authorization header, expected: Bearer <api_key>"))
}

/// Admit an agent-tier request: authenticate, then rate-limit
pub async fn admit(state: &AppState, headers: &HeaderMap) -> Result<Agent> {
    let key = bearer_key(headers)?;
    let agent = state.registry.verify(key).await?;
    state
        .registry
        .check_and_record_rate(&agent.agent_id)
        .await?;
    Ok(agent)
}

/// Admit an admin-tier request
///
/// Fails closed when no admin key is configured.
pub fn require_admin(state: &AppState, headers: &HeaderMap) -> std::result::Result<(), ApiError> {
    let Some(expected) = state.admin_key() else {
        return Err(ApiError::forbidden("admin tier disabled: no admin key configured"));
    };

    let provided = headers
        .get(ADMIN_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if provided.as_bytes().ct_eq(expected.as_bytes()).into() {
        Ok(())
    } else {
        Err(ApiError::forbidden("invalid admin key"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(name: &'static str, value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(name, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_extraction() {
        let headers = headers_with("authorization", "Bearer smem_abc");
        assert_eq!(bearer_key(&headers).unwrap(), "smem_abc");
    }

    #[test]
    fn test_bearer_extraction_rejects_other_schemes() {
        let headers = headers_with("authorization", "Basic dXNlcg==");
        assert!(bearer_key(&headers).is_err());

        let empty = HeaderMap::new();
        assert!(bearer_key(&empty).is_err());
    }
}
