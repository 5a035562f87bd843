//! HTTP route handlers
//!
//! Every handler receives the whole `WebServer` as state and stays generic
//! over the injected services.

pub mod auth;
pub mod images;
pub mod optimize;
pub mod prompts;
