//! Tests for the chat-completion client

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::fixtures::{sse_body, truncated_sse_body};
use super::helpers::{CHAT_KEY, chat_client, drain};
use crate::error::WebServerError;
use crate::traits::ChatCompletionClient;
use crate::types::{CompletionSpec, SamplingParams};

fn spec(json_output: bool) -> CompletionSpec {
    CompletionSpec {
        system: "system text".to_string(),
        user: "a cat".to_string(),
        params: SamplingParams {
            temperature: 0.9,
            max_tokens: 8192,
            json_output,
        },
    }
}

#[tokio::test]
async fn test_streams_fragments_in_order() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", format!("Bearer {CHAT_KEY}").as_str()))
        .and(body_partial_json(json!({
            "model": "deepseek-chat",
            "stream": true,
            "max_tokens": 8192,
            "messages": [
                { "role": "system", "content": "system text" },
                { "role": "user", "content": "a cat" }
            ],
            "response_format": { "type": "json_object" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(sse_body(&["{\"a\":", " 1}"]), "text/event-stream"))
        .expect(1)
        .mount(&server)
        .await;

    let stream = chat_client(&server).stream_chat(spec(true)).await.unwrap();
    let fragments: Vec<String> = drain(stream).await.into_iter().map(Result::unwrap).collect();
    assert_eq!(fragments, vec!["{\"a\":".to_string(), " 1}".to_string()]);
}

#[tokio::test]
async fn test_error_status_is_reported_before_streaming() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&server)
        .await;

    let err = chat_client(&server).stream_chat(spec(false)).await.err().unwrap();
    match err {
        WebServerError::UpstreamStatus { status, body } => {
            assert_eq!(status, 401);
            assert!(body.contains("invalid api key"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_missing_completion_signal_is_truncation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(truncated_sse_body(&["partial"]), "text/event-stream"))
        .mount(&server)
        .await;

    let stream = chat_client(&server).stream_chat(spec(false)).await.unwrap();
    let items = drain(stream).await;
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].as_ref().unwrap(), "partial");
    assert!(matches!(items[1], Err(WebServerError::UpstreamTruncated)));
}

#[tokio::test]
async fn test_in_band_error_aborts_stream() {
    let server = MockServer::start().await;
    let body = "data: {\"error\":{\"message\":\"quota exceeded\",\"type\":\"insufficient_quota\"}}\n\n";
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let stream = chat_client(&server).stream_chat(spec(false)).await.unwrap();
    let items = drain(stream).await;
    assert_eq!(items.len(), 1);
    assert!(matches!(&items[0], Err(e) if e.to_string().contains("quota exceeded")));
}
