//! Main webserver implementation
//!
//! The WebServer struct owns every injected service and builds the axum
//! router whose handlers receive it as state.

use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use shared::{ServiceId, logging, service_info};

use crate::core::{PromptOptimizer, RelayConfig};
use crate::error::{WebServerError, WebServerResult};
use crate::state::WebServerState;
use crate::traits::{BackendService, ChatCompletionClient, ImageGenerator};
use crate::web::handlers::{auth, images, optimize, prompts};

/// Largest accepted manual-publish upload
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Main webserver struct with dependency injection
pub struct WebServer<C, I, B>
where
    C: ChatCompletionClient,
    I: ImageGenerator,
    B: BackendService,
{
    state: Arc<WebServerState>,
    optimizer: PromptOptimizer<C>,
    images: Arc<I>,
    backend: Arc<B>,
    provider_name: String,
    image_generation: bool,
    static_dir: Option<PathBuf>,
}

impl<C, I, B> Clone for WebServer<C, I, B>
where
    C: ChatCompletionClient,
    I: ImageGenerator,
    B: BackendService,
{
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            optimizer: self.optimizer.clone(),
            images: self.images.clone(),
            backend: self.backend.clone(),
            provider_name: self.provider_name.clone(),
            image_generation: self.image_generation,
            static_dir: self.static_dir.clone(),
        }
    }
}

impl<C, I, B> WebServer<C, I, B>
where
    C: ChatCompletionClient + 'static,
    I: ImageGenerator + 'static,
    B: BackendService + 'static,
{
    /// Create a new webserver with dependency injection
    pub fn new(chat_client: C, images: I, backend: B, relay_config: RelayConfig) -> Self {
        let state = Arc::new(WebServerState::new());
        let optimizer = PromptOptimizer::new(Arc::new(chat_client), relay_config, state.clone());

        Self {
            state,
            optimizer,
            images: Arc::new(images),
            backend: Arc::new(backend),
            provider_name: "unknown".to_string(),
            image_generation: true,
            static_dir: None,
        }
    }

    /// Name reported by the health route
    pub fn with_provider_name(mut self, name: impl Into<String>) -> Self {
        self.provider_name = name.into();
        self
    }

    pub fn with_image_generation(mut self, enabled: bool) -> Self {
        self.image_generation = enabled;
        self
    }

    /// Serve files from `dir` for every path no route matches
    pub fn with_static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.static_dir = Some(dir.into());
        self
    }

    pub fn state(&self) -> &Arc<WebServerState> {
        &self.state
    }

    pub fn optimizer(&self) -> &PromptOptimizer<C> {
        &self.optimizer
    }

    pub fn images(&self) -> &I {
        &self.images
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn provider_name(&self) -> &str {
        &self.provider_name
    }

    pub fn image_generation(&self) -> bool {
        self.image_generation
    }

    /// Build the Axum router with all routes
    pub fn build_router(&self) -> Router {
        let router = Router::new()
            // Optimizer and preview image
            .route("/api/optimize", post(optimize::optimize::<C, I, B>))
            .route("/api/generate-image", post(images::generate_image::<C, I, B>))
            // Gallery
            .route(
                "/api/prompts",
                get(prompts::list_prompts::<C, I, B>).post(prompts::publish_prompt::<C, I, B>),
            )
            .route(
                "/api/prompts/manual",
                post(prompts::manual_publish::<C, I, B>).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
            )
            .route("/api/prompts/:id", get(prompts::get_prompt::<C, I, B>))
            .route("/api/prompts/:id/like", post(prompts::like_prompt::<C, I, B>))
            .route("/api/me/prompts", get(prompts::my_prompts::<C, I, B>))
            // Auth pass-through
            .route("/api/auth/signup", post(auth::signup::<C, I, B>))
            .route("/api/auth/login", post(auth::login::<C, I, B>))
            // Health check
            .route("/health", get(auth::health::<C, I, B>));

        let router = match &self.static_dir {
            Some(dir) => router.fallback_service(ServeDir::new(dir)),
            None => router,
        };

        router
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(CorsLayer::permissive())
                    .into_inner(),
            )
            .with_state(self.clone())
    }

    /// Serve until `shutdown` resolves; in-flight requests are allowed to
    /// finish
    pub async fn run<F>(&self, bind_address: SocketAddr, shutdown: F) -> WebServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let service = ServiceId::current();
        let router = self.build_router();

        let listener = tokio::net::TcpListener::bind(bind_address)
            .await
            .map_err(|e| WebServerError::ServerStartup(format!("Failed to bind to {bind_address}: {e}")))?;

        service_info!(service, "🌐 Web server listening on http://{}", bind_address);
        if let Some(dir) = &self.static_dir {
            service_info!(service, "📁 Serving static files from {}", dir.display());
        }

        let state = self.state.clone();
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                shutdown.await;
                state.set_running(false);
            })
            .await
            .map_err(|e| WebServerError::ServerStartup(format!("Server error: {e}")))?;

        logging::log_success(service, "HTTP server stopped");
        Ok(())
    }
}
