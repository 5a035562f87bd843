//! Gallery API client

use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use url::Url;

use shared::{
    Credentials, ErrorBody, ImageRequest, ImageResponse, LikeOutcome, PublishOutcome, PublishRequest,
    PublishedPrompt, Session, SignUpOutcome,
};

use crate::error::{ClientError, ClientResult};

/// Validate a server URL and strip its trailing slash
pub fn normalize_base_url(base_url: &str) -> ClientResult<String> {
    Url::parse(base_url).map_err(|e| ClientError::InvalidUrl {
        url: base_url.to_string(),
        message: e.to_string(),
    })?;
    Ok(base_url.trim_end_matches('/').to_string())
}

/// Pass a success through; read `{error}` from anything else
pub(crate) async fn check(response: Response) -> ClientResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|error| error.error)
        .unwrap_or(body);
    Err(ClientError::Server {
        status: status.as_u16(),
        message,
    })
}

/// Client for the non-streaming routes
#[derive(Debug, Clone)]
pub struct PromptHubClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl PromptHubClient {
    pub fn new(base_url: &str) -> ClientResult<Self> {
        Ok(Self {
            http: reqwest::Client::new(),
            base_url: normalize_base_url(base_url)?,
            token: None,
        })
    }

    /// Access token sent as a bearer credential
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.trim().is_empty());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn authorized(&self, builder: RequestBuilder) -> ClientResult<RequestBuilder> {
        let token = self.token.as_deref().ok_or(ClientError::MissingToken)?;
        Ok(builder.bearer_auth(token))
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> ClientResult<T> {
        let response = check(builder.send().await?).await?;
        Ok(response.json().await?)
    }

    /// Public gallery, newest first
    pub async fn gallery(&self, category: Option<&str>, limit: Option<u32>) -> ClientResult<Vec<PublishedPrompt>> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(category) = category {
            query.push(("category", category.to_string()));
        }
        if let Some(limit) = limit {
            query.push(("limit", limit.to_string()));
        }
        self.send(self.http.get(self.url("/api/prompts")).query(&query)).await
    }

    pub async fn prompt(&self, id: i64) -> ClientResult<PublishedPrompt> {
        self.send(self.http.get(self.url(&format!("/api/prompts/{id}")))).await
    }

    pub async fn like(&self, id: i64) -> ClientResult<LikeOutcome> {
        let builder = self.authorized(self.http.post(self.url(&format!("/api/prompts/{id}/like"))))?;
        self.send(builder).await
    }

    /// The caller's own (`created`) or liked (`liked`) prompts
    pub async fn my_prompts(&self, tab: &str) -> ClientResult<Vec<PublishedPrompt>> {
        let builder = self.authorized(self.http.get(self.url("/api/me/prompts")))?;
        self.send(builder.query(&[("tab", tab)])).await
    }

    pub async fn publish(&self, request: &PublishRequest) -> ClientResult<PublishOutcome> {
        let builder = self.authorized(self.http.post(self.url("/api/prompts")))?;
        self.send(builder.json(request)).await
    }

    pub async fn login(&self, credentials: &Credentials) -> ClientResult<Session> {
        self.send(self.http.post(self.url("/api/auth/login")).json(credentials)).await
    }

    pub async fn signup(&self, credentials: &Credentials) -> ClientResult<SignUpOutcome> {
        self.send(self.http.post(self.url("/api/auth/signup")).json(credentials)).await
    }

    /// Preview image; failures come back in-band as a null URL
    pub async fn generate_image(&self, prompt: &str) -> ClientResult<ImageResponse> {
        let request = ImageRequest { prompt: prompt.to_string() };
        self.send(self.http.post(self.url("/api/generate-image")).json(&request)).await
    }
}
