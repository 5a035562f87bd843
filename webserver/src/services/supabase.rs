//! Hosted backend client
//!
//! Talks to the three REST surfaces of the backend: the table API
//! (`/rest/v1`), object storage (`/storage/v1`) and auth (`/auth/v1`).

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use uuid::Uuid;

use shared::{
    AuthUser, Category, Credentials, NewPrompt, PublishedPrompt, ServiceId, Session, SignUpOutcome, service_debug,
};

use crate::config::{BackendConfig, Timeouts};
use crate::error::{WebServerError, WebServerResult};
use crate::traits::BackendService;

const PROMPTS_TABLE: &str = "prompts";
const LIKES_TABLE: &str = "prompt_likes";
const PROMPT_SELECT: &str = "*,profiles(username,avatar_url)";
const LIKED_SELECT: &str = "prompt_id,prompts(*,profiles(username,avatar_url))";

#[derive(Debug, Deserialize)]
struct LikedRow {
    #[serde(default)]
    prompts: Option<PublishedPrompt>,
}

/// Real backend client
#[derive(Debug, Clone)]
pub struct SupabaseClient {
    http: reqwest::Client,
    config: BackendConfig,
}

impl SupabaseClient {
    pub fn new(config: BackendConfig, timeouts: &Timeouts) -> WebServerResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(timeouts.connect)
            .timeout(timeouts.establish)
            .build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.config.url)
    }

    fn authorized(&self, builder: RequestBuilder, key: &str) -> RequestBuilder {
        builder
            .header("apikey", key)
            .header(AUTHORIZATION, format!("Bearer {key}"))
    }

    /// Public reads
    fn read(&self, table: &str) -> RequestBuilder {
        self.authorized(self.http.get(self.table_url(table)), &self.config.anon_key)
    }

    /// Server-side writes and per-user reads
    fn privileged(&self, builder: RequestBuilder) -> RequestBuilder {
        self.authorized(builder, self.config.write_key())
    }

    async fn fetch_rows<T: DeserializeOwned>(&self, request: RequestBuilder) -> WebServerResult<Vec<T>> {
        let response = check(request.send().await?).await?;
        Ok(response.json().await?)
    }
}

/// Pass a success through, turn anything else into a backend error with the
/// most specific message the body offers
async fn check(response: Response) -> WebServerResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(WebServerError::BackendError {
        status: status.as_u16(),
        message: backend_message(&body),
    })
}

fn backend_message(body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    parsed
        .as_ref()
        .and_then(|value| {
            ["error_description", "msg", "message", "error"]
                .iter()
                .find_map(|key| value.get(*key).and_then(Value::as_str))
        })
        .map(str::to_string)
        .unwrap_or_else(|| body.to_string())
}

fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{value}")
}

#[async_trait]
impl BackendService for SupabaseClient {
    async fn sign_up(&self, credentials: &Credentials) -> WebServerResult<SignUpOutcome> {
        let request = self.authorized(
            self.http.post(format!("{}/auth/v1/signup", self.config.url)),
            &self.config.anon_key,
        );
        let response = request.json(credentials).send().await?;
        if response.status() == StatusCode::BAD_REQUEST || response.status() == StatusCode::UNPROCESSABLE_ENTITY {
            let body = response.text().await.unwrap_or_default();
            return Err(WebServerError::AuthRejected { message: backend_message(&body) });
        }

        let value: Value = check(response).await?.json().await?;
        // A session is only issued when no e-mail confirmation is pending
        if value.get("access_token").is_some() {
            let session: Session = serde_json::from_value(value)?;
            return Ok(SignUpOutcome { user: session.user.clone(), session: Some(session) });
        }
        let user = match value.get("user") {
            Some(user) => serde_json::from_value(user.clone())?,
            None => serde_json::from_value(value)?,
        };
        Ok(SignUpOutcome { user, session: None })
    }

    async fn sign_in(&self, credentials: &Credentials) -> WebServerResult<Session> {
        let request = self.authorized(
            self.http.post(format!("{}/auth/v1/token", self.config.url)),
            &self.config.anon_key,
        );
        let response = request
            .query(&[("grant_type", "password")])
            .json(credentials)
            .send()
            .await?;
        if response.status().is_client_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(WebServerError::AuthRejected { message: backend_message(&body) });
        }
        Ok(check(response).await?.json().await?)
    }

    async fn get_user(&self, access_token: &str) -> WebServerResult<AuthUser> {
        let response = self
            .http
            .get(format!("{}/auth/v1/user", self.config.url))
            .header("apikey", &self.config.anon_key)
            .header(AUTHORIZATION, format!("Bearer {access_token}"))
            .send()
            .await?;
        if matches!(response.status(), StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Err(WebServerError::Unauthorized);
        }
        Ok(check(response).await?.json().await?)
    }

    async fn list_public_prompts(&self, category: Option<Category>, limit: u32) -> WebServerResult<Vec<PublishedPrompt>> {
        let mut query = vec![
            ("select", PROMPT_SELECT.to_string()),
            ("is_public", eq(true)),
            ("order", "created_at.desc".to_string()),
            ("limit", limit.to_string()),
        ];
        if let Some(category) = category {
            query.push(("category", eq(category.label())));
        }
        service_debug!(ServiceId::current(), ?category, limit, "Listing public prompts");
        self.fetch_rows(self.read(PROMPTS_TABLE).query(&query)).await
    }

    async fn list_author_prompts(&self, author_id: Uuid) -> WebServerResult<Vec<PublishedPrompt>> {
        let query = [
            ("select", PROMPT_SELECT.to_string()),
            ("author_id", eq(author_id)),
            ("order", "created_at.desc".to_string()),
        ];
        let request = self.privileged(self.http.get(self.table_url(PROMPTS_TABLE)));
        self.fetch_rows(request.query(&query)).await
    }

    async fn list_liked_prompts(&self, user_id: Uuid) -> WebServerResult<Vec<PublishedPrompt>> {
        let query = [
            ("select", LIKED_SELECT.to_string()),
            ("user_id", eq(user_id)),
            ("order", "created_at.desc".to_string()),
        ];
        let request = self.privileged(self.http.get(self.table_url(LIKES_TABLE)));
        let rows: Vec<LikedRow> = self.fetch_rows(request.query(&query)).await?;
        // Likes whose prompt was deleted come back without one
        Ok(rows.into_iter().filter_map(|row| row.prompts).collect())
    }

    async fn get_prompt(&self, id: i64) -> WebServerResult<Option<PublishedPrompt>> {
        let query = [("select", PROMPT_SELECT.to_string()), ("id", eq(id)), ("limit", "1".to_string())];
        let rows: Vec<PublishedPrompt> = self.fetch_rows(self.read(PROMPTS_TABLE).query(&query)).await?;
        Ok(rows.into_iter().next())
    }

    async fn find_prompt_by_title(&self, title: &str, author_id: Uuid) -> WebServerResult<Option<PublishedPrompt>> {
        let query = [
            ("select", "*".to_string()),
            ("title", eq(title)),
            ("author_id", eq(author_id)),
            ("limit", "1".to_string()),
        ];
        let request = self.privileged(self.http.get(self.table_url(PROMPTS_TABLE)));
        let rows: Vec<PublishedPrompt> = self.fetch_rows(request.query(&query)).await?;
        Ok(rows.into_iter().next())
    }

    async fn insert_prompt(&self, prompt: &NewPrompt) -> WebServerResult<PublishedPrompt> {
        let request = self
            .privileged(self.http.post(self.table_url(PROMPTS_TABLE)))
            .header("Prefer", "return=representation")
            .json(prompt);
        let rows: Vec<PublishedPrompt> = self.fetch_rows(request).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| WebServerError::InternalError("insert returned no row".to_string()))
    }

    async fn update_likes(&self, prompt_id: i64, likes: i64) -> WebServerResult<()> {
        let request = self
            .privileged(self.http.patch(self.table_url(PROMPTS_TABLE)))
            .query(&[("id", eq(prompt_id))])
            .json(&json!({ "likes": likes }));
        check(request.send().await?).await?;
        Ok(())
    }

    async fn has_like(&self, user_id: Uuid, prompt_id: i64) -> WebServerResult<bool> {
        let query = [
            ("select", "prompt_id".to_string()),
            ("user_id", eq(user_id)),
            ("prompt_id", eq(prompt_id)),
            ("limit", "1".to_string()),
        ];
        let request = self.privileged(self.http.get(self.table_url(LIKES_TABLE)));
        let rows: Vec<Value> = self.fetch_rows(request.query(&query)).await?;
        Ok(!rows.is_empty())
    }

    async fn add_like(&self, user_id: Uuid, prompt_id: i64) -> WebServerResult<()> {
        let request = self
            .privileged(self.http.post(self.table_url(LIKES_TABLE)))
            .json(&json!({ "user_id": user_id, "prompt_id": prompt_id }));
        check(request.send().await?).await?;
        Ok(())
    }

    async fn remove_like(&self, user_id: Uuid, prompt_id: i64) -> WebServerResult<()> {
        let request = self
            .privileged(self.http.delete(self.table_url(LIKES_TABLE)))
            .query(&[("user_id", eq(user_id)), ("prompt_id", eq(prompt_id))]);
        check(request.send().await?).await?;
        Ok(())
    }

    async fn upload_object(&self, path: &str, bytes: Vec<u8>, content_type: &str, upsert: bool) -> WebServerResult<()> {
        let url = format!("{}/storage/v1/object/{}/{path}", self.config.url, self.config.bucket);
        service_debug!(ServiceId::current(), path, size = bytes.len(), upsert, "Uploading object");
        let request = self
            .privileged(self.http.post(url))
            .header(CONTENT_TYPE, content_type)
            .header("x-upsert", upsert.to_string())
            .body(bytes);
        check(request.send().await?).await?;
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/storage/v1/object/public/{}/{path}", self.config.url, self.config.bucket)
    }
}
