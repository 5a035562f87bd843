//! Preview image endpoint

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;

use shared::{ImageRequest, ImageResponse, ServiceId, service_warn};

use crate::core::preview::generate_preview;
use crate::traits::{BackendService, ChatCompletionClient, ImageGenerator};
use crate::webserver_impl::WebServer;

/// `POST /api/generate-image`
///
/// Always answers 200; failures travel in the `error` field with a null URL.
pub async fn generate_image<C, I, B>(
    State(webserver): State<WebServer<C, I, B>>,
    payload: Result<Json<ImageRequest>, JsonRejection>,
) -> Json<ImageResponse>
where
    C: ChatCompletionClient + 'static,
    I: ImageGenerator + 'static,
    B: BackendService + 'static,
{
    let prompt = match payload {
        Ok(Json(request)) => request.prompt,
        Err(rejection) => return Json(ImageResponse::failure(rejection.body_text())),
    };

    match generate_preview(webserver.images(), webserver.backend(), &prompt).await {
        Ok(url) => Json(ImageResponse::success(url)),
        Err(e) => {
            service_warn!(ServiceId::current(), error = %e, "Preview image failed");
            Json(ImageResponse::failure(e.to_string()))
        }
    }
}
