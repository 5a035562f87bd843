//! Test helpers for webserver service tests

use std::time::Duration;

use futures_util::StreamExt;
use wiremock::MockServer;

use crate::config::{BackendConfig, ChatProvider, ImageProviderConfig, Timeouts};
use crate::error::WebServerResult;
use crate::services::{RealChatClient, RealImageGenerator, SupabaseClient};
use crate::traits::TextStream;

pub const CHAT_KEY: &str = "chat-key";
pub const IMAGE_KEY: &str = "image-key";
pub const ANON_KEY: &str = "anon-key";
pub const SERVICE_KEY: &str = "service-key";

pub fn test_timeouts() -> Timeouts {
    Timeouts {
        connect: Duration::from_secs(2),
        establish: Duration::from_secs(5),
        idle: Duration::from_secs(5),
    }
}

/// Chat client speaking to the mock server
pub fn chat_client(server: &MockServer) -> RealChatClient {
    let provider = ChatProvider::OpenAiCompatible {
        api_key: CHAT_KEY.to_string(),
        base_url: server.uri(),
    };
    RealChatClient::new(provider, &test_timeouts()).unwrap()
}

/// Image generator speaking to the mock server
pub fn image_client(server: &MockServer) -> RealImageGenerator {
    let config = ImageProviderConfig::new(IMAGE_KEY).with_base_url(server.uri());
    RealImageGenerator::new(Some(config), &test_timeouts()).unwrap()
}

/// Backend client with a service-role key
pub fn backend_client(server: &MockServer) -> SupabaseClient {
    let config = BackendConfig::new(server.uri(), ANON_KEY)
        .unwrap()
        .with_service_role_key(SERVICE_KEY);
    SupabaseClient::new(config, &test_timeouts()).unwrap()
}

/// Drain a text stream, keeping the items in order
pub async fn drain(mut stream: TextStream) -> Vec<WebServerResult<String>> {
    let mut items = Vec::new();
    while let Some(item) = stream.next().await {
        items.push(item);
    }
    items
}
