//! Bearer-token extraction and user resolution

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use shared::{AuthUser, ServiceId, service_debug};

use crate::error::{WebServerError, WebServerResult};
use crate::traits::BackendService;

/// Access token from `Authorization: Bearer <token>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerToken(pub String);

impl BearerToken {
    /// Token from a raw header value; the scheme is case-insensitive
    pub fn parse(header: &str) -> Option<Self> {
        let (scheme, token) = header.trim().split_once(' ')?;
        let token = token.trim();
        if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
            return None;
        }
        Some(Self(token.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = WebServerError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(BearerToken::parse)
            .ok_or(WebServerError::Unauthorized)
    }
}

/// Resolve the user behind a token; anything but a confirmed user is a 401
pub async fn authenticate<B>(backend: &B, token: &BearerToken) -> WebServerResult<AuthUser>
where
    B: BackendService + ?Sized,
{
    let user = backend.get_user(token.as_str()).await.map_err(|e| match e {
        WebServerError::Unauthorized | WebServerError::AuthRejected { .. } => WebServerError::Unauthorized,
        other => other,
    })?;
    service_debug!(ServiceId::current(), user_id = %user.id, "Request authenticated");
    Ok(user)
}
