//! Prompt optimizer relay
//!
//! Turns an [`OptimizationRequest`] into a byte stream of generated text.
//! Everything up to and including the first upstream fragment happens before
//! the caller commits to a streaming response, so those failures are still
//! reported as errors. After that a spawned forwarding loop copies fragments
//! into a bounded channel in arrival order and appends the completion marker
//! once the provider signals a clean end.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::{Stream, StreamExt, stream};
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;

use shared::{COMPLETION_MARKER, OptimizationRequest, ServiceId, service_debug, service_info, service_warn};

use crate::config::Timeouts;
use crate::core::instructions::build_completion;
use crate::error::{WebServerError, WebServerResult};
use crate::state::WebServerState;
use crate::traits::{ChatCompletionClient, TextStream};

/// Lifecycle of one optimizer request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayPhase {
    Idle,
    InstructionSelected,
    UpstreamRequested,
    Streaming,
    Completed,
    Aborted,
}

impl RelayPhase {
    pub fn is_final(&self) -> bool {
        matches!(self, RelayPhase::Completed | RelayPhase::Aborted)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayConfig {
    /// Bound on reaching the first upstream fragment
    pub establish_timeout: Duration,
    /// Bound on the wait between two upstream fragments
    pub idle_timeout: Duration,
    /// Fragments buffered between the forwarding loop and the response body
    pub channel_capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self::from_timeouts(&Timeouts::default())
    }
}

impl RelayConfig {
    pub fn from_timeouts(timeouts: &Timeouts) -> Self {
        Self {
            establish_timeout: timeouts.establish,
            idle_timeout: timeouts.idle,
            channel_capacity: 32,
        }
    }
}

/// A committed optimizer stream
pub struct RelayStream {
    receiver: mpsc::Receiver<Bytes>,
    phase: watch::Receiver<RelayPhase>,
}

impl RelayStream {
    /// Watch the forwarding loop's phase
    pub fn phase_watch(&self) -> watch::Receiver<RelayPhase> {
        self.phase.clone()
    }

    /// Next chunk of the response body, `None` once the loop has finished
    pub async fn next_chunk(&mut self) -> Option<Bytes> {
        self.receiver.recv().await
    }

    /// Response body stream; dropping it closes the channel and stops the
    /// forwarding loop
    pub fn into_body_stream(self) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
        stream::unfold(self.receiver, |mut receiver| async move {
            receiver.recv().await.map(|chunk| (Ok(chunk), receiver))
        })
    }
}

/// Optimizer endpoint logic, independent of HTTP
pub struct PromptOptimizer<C: ChatCompletionClient> {
    client: Arc<C>,
    config: RelayConfig,
    state: Arc<WebServerState>,
}

impl<C: ChatCompletionClient> Clone for PromptOptimizer<C> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            config: self.config,
            state: self.state.clone(),
        }
    }
}

impl<C> PromptOptimizer<C>
where
    C: ChatCompletionClient + 'static,
{
    pub fn new(client: Arc<C>, config: RelayConfig, state: Arc<WebServerState>) -> Self {
        Self { client, config, state }
    }

    /// Validate, call upstream and wait for its first fragment, then hand the
    /// rest of the stream to a forwarding task
    pub async fn start(&self, request: OptimizationRequest) -> WebServerResult<RelayStream> {
        let service = ServiceId::current();
        if request.user_input.trim().is_empty() {
            return Err(WebServerError::invalid("userInput is required"));
        }

        let (phase_tx, phase_rx) = watch::channel(RelayPhase::Idle);

        let spec = build_completion(request.mode, &request.user_input);
        phase_tx.send_replace(RelayPhase::InstructionSelected);
        service_debug!(service, mode = %request.mode, "Instruction selected");

        phase_tx.send_replace(RelayPhase::UpstreamRequested);
        let client = self.client.clone();
        let establish = async move {
            let mut upstream = client.stream_chat(spec).await?;
            let first = upstream.next().await.transpose()?;
            Ok::<_, WebServerError>((upstream, first))
        };
        let (upstream, first) = match timeout(self.config.establish_timeout, establish).await {
            Ok(Ok(established)) => established,
            Ok(Err(e)) => {
                phase_tx.send_replace(RelayPhase::Aborted);
                return Err(e);
            }
            Err(_) => {
                phase_tx.send_replace(RelayPhase::Aborted);
                return Err(WebServerError::UpstreamTimeout {
                    seconds: self.config.establish_timeout.as_secs(),
                });
            }
        };

        let (tx, rx) = mpsc::channel(self.config.channel_capacity.max(1));
        phase_tx.send_replace(RelayPhase::Streaming);
        let active = self.state.stream_started();
        service_info!(service, mode = %request.mode, active, "Optimizer stream started");

        let idle_timeout = self.config.idle_timeout;
        let state = self.state.clone();
        tokio::spawn(async move {
            let phase = forward(upstream, first, tx, idle_timeout).await;
            phase_tx.send_replace(phase);
            let active = state.stream_finished();
            service_info!(ServiceId::current(), ?phase, active, "Optimizer stream finished");
        });

        Ok(RelayStream { receiver: rx, phase: phase_rx })
    }
}

/// Forwarding loop; returns the final phase. The upstream stream is dropped
/// when this returns, which releases its connection.
async fn forward(
    mut upstream: TextStream,
    first: Option<String>,
    tx: mpsc::Sender<Bytes>,
    idle_timeout: Duration,
) -> RelayPhase {
    let service = ServiceId::current();

    let Some(first) = first else {
        return finish(&tx).await;
    };
    if tx.send(Bytes::from(first)).await.is_err() {
        service_debug!(service, "Client went away before the first fragment");
        return RelayPhase::Aborted;
    }

    loop {
        let next = tokio::select! {
            _ = tx.closed() => {
                service_debug!(service, "Client disconnected, releasing upstream");
                return RelayPhase::Aborted;
            }
            next = timeout(idle_timeout, upstream.next()) => next,
        };

        match next {
            Err(_) => {
                service_warn!(service, seconds = idle_timeout.as_secs(), "Upstream went idle, ending stream early");
                return RelayPhase::Aborted;
            }
            Ok(None) => return finish(&tx).await,
            Ok(Some(Err(e))) => {
                service_warn!(service, error = %e, "Upstream failed mid-stream, ending stream early");
                return RelayPhase::Aborted;
            }
            Ok(Some(Ok(fragment))) => {
                if tx.send(Bytes::from(fragment)).await.is_err() {
                    service_debug!(service, "Client disconnected, releasing upstream");
                    return RelayPhase::Aborted;
                }
            }
        }
    }
}

async fn finish(tx: &mpsc::Sender<Bytes>) -> RelayPhase {
    match tx.send(Bytes::from_static(COMPLETION_MARKER.as_bytes())).await {
        Ok(()) => RelayPhase::Completed,
        Err(_) => RelayPhase::Aborted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::MockChatCompletionClient;
    use futures_util::stream::{self, StreamExt};
    use shared::Mode;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Sets its flag when dropped together with the stream that owns it
    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    fn fragments(parts: &[&str]) -> Vec<WebServerResult<String>> {
        parts.iter().map(|p| Ok(p.to_string())).collect()
    }

    fn optimizer(client: MockChatCompletionClient, config: RelayConfig) -> PromptOptimizer<MockChatCompletionClient> {
        PromptOptimizer::new(Arc::new(client), config, Arc::new(WebServerState::new()))
    }

    fn fast_config() -> RelayConfig {
        RelayConfig {
            establish_timeout: Duration::from_millis(500),
            idle_timeout: Duration::from_millis(100),
            channel_capacity: 4,
        }
    }

    async fn collect(mut relay: RelayStream) -> String {
        let mut body = Vec::new();
        while let Some(chunk) = relay.next_chunk().await {
            body.extend_from_slice(&chunk);
        }
        String::from_utf8(body).unwrap()
    }

    async fn final_phase(mut phase: watch::Receiver<RelayPhase>) -> RelayPhase {
        let phase = tokio::time::timeout(Duration::from_secs(2), phase.wait_for(RelayPhase::is_final))
            .await
            .expect("relay did not finish")
            .expect("phase sender dropped");
        *phase
    }

    #[tokio::test]
    async fn test_fragments_are_relayed_in_order_with_marker() {
        let mut client = MockChatCompletionClient::new();
        client
            .expect_stream_chat()
            .times(1)
            .returning(|_| Ok(stream::iter(fragments(&["Hel", "lo", " 你好"])).boxed()));

        let relay = optimizer(client, fast_config())
            .start(OptimizationRequest::new("hi", Mode::Chat))
            .await
            .unwrap();
        let phase = relay.phase_watch();

        assert_eq!(collect(relay).await, format!("Hello 你好{COMPLETION_MARKER}"));
        assert_eq!(final_phase(phase).await, RelayPhase::Completed);
    }

    #[tokio::test]
    async fn test_mode_selects_instruction() {
        let mut client = MockChatCompletionClient::new();
        client
            .expect_stream_chat()
            .withf(|spec| spec.params.json_output && spec.system.contains("english_structure") && spec.user == "a cat")
            .returning(|_| Ok(stream::iter(fragments(&["{}"])).boxed()));

        let relay = optimizer(client, fast_config())
            .start(OptimizationRequest::new("a cat", Mode::Image))
            .await
            .unwrap();
        assert!(collect(relay).await.starts_with("{}"));
    }

    #[tokio::test]
    async fn test_blank_input_is_rejected_without_upstream_call() {
        let mut client = MockChatCompletionClient::new();
        client.expect_stream_chat().never();

        let err = optimizer(client, fast_config())
            .start(OptimizationRequest::new("   ", Mode::Code))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, WebServerError::InvalidRequest { .. }));
    }

    #[tokio::test]
    async fn test_failure_before_first_fragment_is_an_error() {
        let mut client = MockChatCompletionClient::new();
        client
            .expect_stream_chat()
            .returning(|_| Ok(stream::iter(vec![Err(WebServerError::upstream("quota exceeded"))]).boxed()));

        let err = optimizer(client, fast_config())
            .start(OptimizationRequest::new("hi", Mode::Chat))
            .await
            .err()
            .unwrap();
        assert!(err.to_string().contains("quota exceeded"));
    }

    #[tokio::test]
    async fn test_upstream_status_error_is_propagated() {
        let mut client = MockChatCompletionClient::new();
        client
            .expect_stream_chat()
            .returning(|_| Err(WebServerError::UpstreamStatus { status: 401, body: "bad key".into() }));

        let err = optimizer(client, fast_config())
            .start(OptimizationRequest::new("hi", Mode::Chat))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, WebServerError::UpstreamStatus { status: 401, .. }));
    }

    #[tokio::test]
    async fn test_slow_first_fragment_times_out() {
        let mut client = MockChatCompletionClient::new();
        client
            .expect_stream_chat()
            .returning(|_| Ok(stream::pending::<WebServerResult<String>>().boxed()));

        let err = optimizer(client, fast_config())
            .start(OptimizationRequest::new("hi", Mode::Chat))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, WebServerError::UpstreamTimeout { .. }));
    }

    #[tokio::test]
    async fn test_mid_stream_failure_ends_without_marker() {
        let mut client = MockChatCompletionClient::new();
        client.expect_stream_chat().returning(|_| {
            let items = vec![Ok("partial".to_string()), Err(WebServerError::UpstreamTruncated)];
            Ok(stream::iter(items).boxed())
        });

        let relay = optimizer(client, fast_config())
            .start(OptimizationRequest::new("hi", Mode::Chat))
            .await
            .unwrap();
        let phase = relay.phase_watch();

        assert_eq!(collect(relay).await, "partial");
        assert_eq!(final_phase(phase).await, RelayPhase::Aborted);
    }

    #[tokio::test]
    async fn test_idle_upstream_is_cut_off() {
        let released = Arc::new(AtomicBool::new(false));
        let flag = released.clone();
        let mut client = MockChatCompletionClient::new();
        client.expect_stream_chat().returning(move |_| {
            let guard = DropFlag(flag.clone());
            let upstream = stream::iter(fragments(&["first"]))
                .chain(stream::pending())
                .map(move |item| {
                    let _keep = &guard;
                    item
                });
            Ok(upstream.boxed())
        });

        let relay = optimizer(client, fast_config())
            .start(OptimizationRequest::new("hi", Mode::Chat))
            .await
            .unwrap();
        let phase = relay.phase_watch();

        assert_eq!(collect(relay).await, "first");
        assert_eq!(final_phase(phase).await, RelayPhase::Aborted);
        assert!(released.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_client_disconnect_releases_upstream() {
        let released = Arc::new(AtomicBool::new(false));
        let flag = released.clone();
        let mut client = MockChatCompletionClient::new();
        client.expect_stream_chat().returning(move |_| {
            let guard = DropFlag(flag.clone());
            let upstream = stream::iter(fragments(&["a", "b"]))
                .chain(stream::pending())
                .map(move |item| {
                    let _keep = &guard;
                    item
                });
            Ok(upstream.boxed())
        });

        let config = RelayConfig { idle_timeout: Duration::from_secs(30), ..fast_config() };
        let mut relay = optimizer(client, config)
            .start(OptimizationRequest::new("hi", Mode::Chat))
            .await
            .unwrap();
        let phase = relay.phase_watch();

        assert_eq!(relay.next_chunk().await.unwrap(), Bytes::from("a"));
        drop(relay);

        assert_eq!(final_phase(phase).await, RelayPhase::Aborted);
        assert!(released.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_empty_completion_still_gets_marker() {
        let mut client = MockChatCompletionClient::new();
        client
            .expect_stream_chat()
            .returning(|_| Ok(stream::iter(Vec::<WebServerResult<String>>::new()).boxed()));

        let relay = optimizer(client, fast_config())
            .start(OptimizationRequest::new("hi", Mode::Chat))
            .await
            .unwrap();
        assert_eq!(collect(relay).await, COMPLETION_MARKER);
    }
}
