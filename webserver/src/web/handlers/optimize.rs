//! Streaming prompt optimizer endpoint

use axum::Json;
use axum::body::Body;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};

use shared::{OptimizationRequest, ServiceId, service_info, service_warn};

use crate::error::{WebServerError, WebServerResult};
use crate::traits::{BackendService, ChatCompletionClient, ImageGenerator};
use crate::webserver_impl::WebServer;

pub const STREAM_CONTENT_TYPE: &str = "text/event-stream; charset=utf-8";

/// `POST /api/optimize`
///
/// Errors up to the first upstream fragment come back as a JSON error
/// payload; after that the body is a plain text stream which ends with the
/// completion marker only when upstream finished cleanly.
pub async fn optimize<C, I, B>(
    State(webserver): State<WebServer<C, I, B>>,
    payload: Result<Json<OptimizationRequest>, JsonRejection>,
) -> WebServerResult<Response>
where
    C: ChatCompletionClient + 'static,
    I: ImageGenerator + 'static,
    B: BackendService + 'static,
{
    let service = ServiceId::current();
    let Json(request) = payload.map_err(|rejection| WebServerError::invalid(rejection.body_text()))?;
    let mode = request.mode;

    let relay = webserver.optimizer().start(request).await.map_err(|e| {
        service_warn!(service, %mode, error = %e, "Optimization failed before streaming");
        e
    })?;
    service_info!(service, %mode, "Streaming optimization started");

    Ok((
        [(CONTENT_TYPE, STREAM_CONTENT_TYPE), (CACHE_CONTROL, "no-cache")],
        Body::from_stream(relay.into_body_stream()),
    )
        .into_response())
}
