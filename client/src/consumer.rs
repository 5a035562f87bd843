//! Client stream consumer
//!
//! Posts an optimization request and folds the streamed body into a growing
//! transcript. Every fragment that changes the visible text republishes a
//! [`TranscriptSnapshot`] through a `watch` channel, so observers always see
//! the latest partial result without buffering.

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};

use shared::{OptimizationRequest, ServiceId, StreamOutcome, TranscriptBuilder, service_debug};

use crate::api::{check, normalize_base_url};
use crate::error::{ClientError, ClientResult};

/// Where a transcript stands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotStatus {
    /// More fragments may follow
    Streaming,
    /// The server signalled a clean end
    Completed,
    /// The stream ended without the completion signal; the text may be partial
    Truncated,
    /// Stopped by the consumer; the text received so far is kept
    Cancelled,
    /// The connection failed mid-stream
    Failed(String),
}

impl SnapshotStatus {
    pub fn is_final(&self) -> bool {
        !matches!(self, SnapshotStatus::Streaming)
    }
}

/// Text received so far and the stream's status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptSnapshot {
    pub text: String,
    pub status: SnapshotStatus,
}

impl TranscriptSnapshot {
    fn new(text: impl Into<String>, status: SnapshotStatus) -> Self {
        Self { text: text.into(), status }
    }
}

/// Opens optimizer streams against one server
#[derive(Debug, Clone)]
pub struct StreamConsumer {
    http: reqwest::Client,
    base_url: String,
}

impl StreamConsumer {
    pub fn new(base_url: &str) -> ClientResult<Self> {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Reuse an existing HTTP client. No request timeout is applied to the
    /// stream itself.
    pub fn with_client(http: reqwest::Client, base_url: &str) -> ClientResult<Self> {
        Ok(Self {
            http,
            base_url: normalize_base_url(base_url)?,
        })
    }

    /// Send the request and start consuming its stream.
    ///
    /// Errors reported before streaming (validation, upstream failures) are
    /// returned here as [`ClientError::Server`].
    pub async fn start(&self, request: &OptimizationRequest) -> ClientResult<StreamHandle> {
        let response = self
            .http
            .post(format!("{}/api/optimize", self.base_url))
            .json(request)
            .send()
            .await?;
        let response = check(response).await?;
        service_debug!(ServiceId::current(), mode = %request.mode, "Optimizer stream opened");

        Ok(StreamHandle::spawn(response.bytes_stream()))
    }
}

/// A running stream. Dropping the handle cancels it.
#[derive(Debug)]
pub struct StreamHandle {
    snapshots: watch::Receiver<TranscriptSnapshot>,
    token: CancellationToken,
    task: JoinHandle<TranscriptSnapshot>,
    _guard: DropGuard,
}

impl StreamHandle {
    /// Consume `body` on a background task
    pub fn spawn<S, E>(body: S) -> Self
    where
        S: Stream<Item = Result<Bytes, E>> + Send + Unpin + 'static,
        E: std::fmt::Display + Send + 'static,
    {
        let token = CancellationToken::new();
        let (tx, rx) = watch::channel(TranscriptSnapshot::new(String::new(), SnapshotStatus::Streaming));
        let task = tokio::spawn(consume(body, token.clone(), tx));

        Self {
            snapshots: rx,
            _guard: token.clone().drop_guard(),
            token,
            task,
        }
    }

    /// Receiver of every published snapshot
    pub fn snapshots(&self) -> watch::Receiver<TranscriptSnapshot> {
        self.snapshots.clone()
    }

    /// Latest snapshot
    pub fn current(&self) -> TranscriptSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Stop reading; the connection is closed and the text so far is kept
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Token that cancels this stream, e.g. from a signal handler
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Wait for the stream to end and return the final snapshot
    pub async fn finish(self) -> ClientResult<TranscriptSnapshot> {
        // The guard must outlive the task, otherwise waiting would cancel it
        let StreamHandle { task, _guard, .. } = self;
        let snapshot = task.await.map_err(|e| ClientError::StreamTask(e.to_string()))?;
        drop(_guard);
        Ok(snapshot)
    }
}

/// Apply fragments in arrival order until the body ends, fails or the token
/// is cancelled
async fn consume<S, E>(mut body: S, token: CancellationToken, tx: watch::Sender<TranscriptSnapshot>) -> TranscriptSnapshot
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: std::fmt::Display,
{
    let mut transcript = TranscriptBuilder::new();

    let last = loop {
        let next = tokio::select! {
            biased;
            _ = token.cancelled() => {
                break TranscriptSnapshot::new(transcript.text(), SnapshotStatus::Cancelled);
            }
            next = body.next() => next,
        };

        match next {
            Some(Ok(bytes)) => {
                if transcript.push(&bytes) {
                    tx.send_replace(TranscriptSnapshot::new(transcript.text(), SnapshotStatus::Streaming));
                }
            }
            Some(Err(e)) => {
                let (text, _) = transcript.finish();
                break TranscriptSnapshot::new(text, SnapshotStatus::Failed(e.to_string()));
            }
            None => {
                let (text, outcome) = transcript.finish();
                let status = match outcome {
                    StreamOutcome::Completed => SnapshotStatus::Completed,
                    StreamOutcome::Truncated => SnapshotStatus::Truncated,
                };
                break TranscriptSnapshot::new(text, status);
            }
        }
    };

    service_debug!(ServiceId::current(), status = ?last.status, chars = last.text.chars().count(), "Optimizer stream ended");
    tx.send_replace(last.clone());
    last
}
