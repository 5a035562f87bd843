//! Gallery, publish, like and profile routes

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;

use shared::{Category, LikeOutcome, PublishOutcome, PublishRequest, PublishedPrompt};

use crate::core::publish::{ImageUpload, ManualSubmission};
use crate::core::{gallery, likes, publish};
use crate::error::{WebServerError, WebServerResult};
use crate::traits::{BackendService, ChatCompletionClient, ImageGenerator};
use crate::types::{GalleryQuery, ProfileQuery};
use crate::web::auth::{BearerToken, authenticate};
use crate::webserver_impl::WebServer;

/// `GET /api/prompts`
pub async fn list_prompts<C, I, B>(
    State(webserver): State<WebServer<C, I, B>>,
    query: Result<Query<GalleryQuery>, QueryRejection>,
) -> WebServerResult<Json<Vec<PublishedPrompt>>>
where
    C: ChatCompletionClient + 'static,
    I: ImageGenerator + 'static,
    B: BackendService + 'static,
{
    let Query(query) = query.map_err(|rejection| WebServerError::invalid(rejection.body_text()))?;
    let prompts = gallery::list_gallery(webserver.backend(), &query).await?;
    Ok(Json(prompts))
}

/// `GET /api/prompts/:id`
pub async fn get_prompt<C, I, B>(
    State(webserver): State<WebServer<C, I, B>>,
    Path(id): Path<i64>,
) -> WebServerResult<Json<PublishedPrompt>>
where
    C: ChatCompletionClient + 'static,
    I: ImageGenerator + 'static,
    B: BackendService + 'static,
{
    webserver
        .backend()
        .get_prompt(id)
        .await?
        .map(Json)
        .ok_or_else(|| WebServerError::NotFound(format!("prompt {id}")))
}

/// `POST /api/prompts`
pub async fn publish_prompt<C, I, B>(
    State(webserver): State<WebServer<C, I, B>>,
    token: BearerToken,
    payload: Result<Json<PublishRequest>, JsonRejection>,
) -> WebServerResult<(StatusCode, Json<PublishOutcome>)>
where
    C: ChatCompletionClient + 'static,
    I: ImageGenerator + 'static,
    B: BackendService + 'static,
{
    let author = authenticate(webserver.backend(), &token).await?;
    let Json(request) = payload.map_err(|rejection| WebServerError::invalid(rejection.body_text()))?;

    let outcome = publish::publish(webserver.images(), webserver.backend(), &author, request).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// `POST /api/prompts/manual`
pub async fn manual_publish<C, I, B>(
    State(webserver): State<WebServer<C, I, B>>,
    token: BearerToken,
    multipart: Multipart,
) -> WebServerResult<(StatusCode, Json<PublishedPrompt>)>
where
    C: ChatCompletionClient + 'static,
    I: ImageGenerator + 'static,
    B: BackendService + 'static,
{
    let author = authenticate(webserver.backend(), &token).await?;
    let submission = read_submission(multipart).await?;

    let prompt = publish::manual_publish(webserver.backend(), &author, submission).await?;
    Ok((StatusCode::CREATED, Json(prompt)))
}

/// Collect the multipart fields of a manual submission; unknown fields are
/// ignored
async fn read_submission(mut multipart: Multipart) -> WebServerResult<ManualSubmission> {
    let mut submission = ManualSubmission {
        title: String::new(),
        content: String::new(),
        category: Category::Image,
        image: None,
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| WebServerError::invalid(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "title" => submission.title = field.text().await.map_err(|e| WebServerError::invalid(e.body_text()))?,
            "content" => submission.content = field.text().await.map_err(|e| WebServerError::invalid(e.body_text()))?,
            "category" => {
                let value = field.text().await.map_err(|e| WebServerError::invalid(e.body_text()))?;
                if !value.trim().is_empty() {
                    submission.category = value.trim().parse()?;
                }
            }
            "image" => {
                let file_name = field.file_name().unwrap_or("upload.png").to_string();
                let content_type = field.content_type().unwrap_or("image/png").to_string();
                let bytes = field.bytes().await.map_err(|e| WebServerError::invalid(e.body_text()))?;
                submission.image = Some(ImageUpload {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            _ => {}
        }
    }

    Ok(submission)
}

/// `POST /api/prompts/:id/like`
pub async fn like_prompt<C, I, B>(
    State(webserver): State<WebServer<C, I, B>>,
    token: BearerToken,
    Path(id): Path<i64>,
) -> WebServerResult<Json<LikeOutcome>>
where
    C: ChatCompletionClient + 'static,
    I: ImageGenerator + 'static,
    B: BackendService + 'static,
{
    let user = authenticate(webserver.backend(), &token).await?;
    let outcome = likes::toggle_like(webserver.backend(), &user, id).await?;
    Ok(Json(outcome))
}

/// `GET /api/me/prompts`
pub async fn my_prompts<C, I, B>(
    State(webserver): State<WebServer<C, I, B>>,
    token: BearerToken,
    query: Result<Query<ProfileQuery>, QueryRejection>,
) -> WebServerResult<Json<Vec<PublishedPrompt>>>
where
    C: ChatCompletionClient + 'static,
    I: ImageGenerator + 'static,
    B: BackendService + 'static,
{
    let user = authenticate(webserver.backend(), &token).await?;
    let Query(query) = query.map_err(|rejection| WebServerError::invalid(rejection.body_text()))?;
    let prompts = gallery::list_profile(webserver.backend(), &user, query.tab).await?;
    Ok(Json(prompts))
}
