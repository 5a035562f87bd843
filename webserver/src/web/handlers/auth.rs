//! Credential pass-through and health routes

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;

use shared::{Credentials, ServiceId, Session, SignUpOutcome, service_info};

use crate::error::{WebServerError, WebServerResult};
use crate::traits::{BackendService, ChatCompletionClient, ImageGenerator};
use crate::types::HealthStatus;
use crate::webserver_impl::WebServer;

fn credentials(payload: Result<Json<Credentials>, JsonRejection>) -> WebServerResult<Credentials> {
    let Json(credentials) = payload.map_err(|rejection| WebServerError::invalid(rejection.body_text()))?;
    if credentials.email.trim().is_empty() || credentials.password.is_empty() {
        return Err(WebServerError::invalid("email and password are required"));
    }
    Ok(Credentials {
        email: credentials.email.trim().to_string(),
        password: credentials.password,
    })
}

/// `POST /api/auth/signup`
pub async fn signup<C, I, B>(
    State(webserver): State<WebServer<C, I, B>>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> WebServerResult<(StatusCode, Json<SignUpOutcome>)>
where
    C: ChatCompletionClient + 'static,
    I: ImageGenerator + 'static,
    B: BackendService + 'static,
{
    let credentials = credentials(payload)?;
    let outcome = webserver.backend().sign_up(&credentials).await?;
    service_info!(ServiceId::current(), user_id = %outcome.user.id, confirmed = outcome.session.is_some(), "User signed up");
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// `POST /api/auth/login`
pub async fn login<C, I, B>(
    State(webserver): State<WebServer<C, I, B>>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> WebServerResult<Json<Session>>
where
    C: ChatCompletionClient + 'static,
    I: ImageGenerator + 'static,
    B: BackendService + 'static,
{
    let credentials = credentials(payload)?;
    let session = webserver.backend().sign_in(&credentials).await?;
    Ok(Json(session))
}

/// `GET /health`
pub async fn health<C, I, B>(State(webserver): State<WebServer<C, I, B>>) -> Json<HealthStatus>
where
    C: ChatCompletionClient + 'static,
    I: ImageGenerator + 'static,
    B: BackendService + 'static,
{
    let state = webserver.state();
    Json(HealthStatus {
        status: if state.is_running() { "ok" } else { "stopping" }.to_string(),
        provider: webserver.provider_name().to_string(),
        image_generation: webserver.image_generation(),
        uptime_seconds: state.get_uptime_seconds(),
        active_streams: state.active_streams(),
        streams_started: state.streams_started(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
