//! Webserver library for PromptHub
//!
//! Provides the streaming prompt optimizer endpoint, the preview image
//! endpoint and the gallery API (publishing, likes, profiles and auth
//! pass-through) on top of an external chat provider, an image provider and
//! a hosted storage/database/auth backend.

pub mod config;
pub mod core;
pub mod error;
pub mod services;
pub mod state;
pub mod traits;
pub mod types;
pub mod web;
pub mod webserver_impl;

// Re-export main types
pub use error::{WebServerError, WebServerResult};
pub use state::WebServerState;
pub use types::*;
pub use webserver_impl::WebServer;

// Re-export trait definitions
pub use traits::{BackendService, ChatCompletionClient, ImageGenerator, TextStream};

// Re-export service implementations
pub use services::{RealChatClient, RealImageGenerator, SupabaseClient};
