//! HTTP surface: request extractors and route handlers

pub mod auth;
pub mod handlers;
