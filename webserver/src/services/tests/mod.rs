//! Service tests for webserver
//!
//! HTTP-level tests of the real service clients against wiremock servers.

pub mod helpers;
pub mod chat_client;
