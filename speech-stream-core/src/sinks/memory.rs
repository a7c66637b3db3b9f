use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::credentials::ServiceAccountKey;
use crate::models::error::StreamError;
use crate::models::recognition::{RecognitionRequest, RecognitionResponse};
use crate::traits::recognition::{RecognitionConnector, RecognitionStream, RequestSink};

/// When the in-memory recognizer ends its response stream after end-of-input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AckMode {
    #[default]
    Immediate,
    Delayed(Duration),
    /// Never acknowledge; closing the uplink hangs until its timeout.
    Never,
}

enum ServerEvent {
    Response(RecognitionResponse),
    Error(StreamError),
    Complete,
}

#[derive(Default)]
struct Shared {
    requests: Mutex<Vec<RecognitionRequest>>,
    events: Mutex<Option<mpsc::UnboundedSender<ServerEvent>>>,
    connections: AtomicUsize,
    input_complete: AtomicBool,
}

/// In-memory stand-in for a streaming recognition service.
///
/// Records every request in order and answers with whatever responses the
/// paired [`MemoryRecognizerHandle`] injects. After end-of-input it
/// acknowledges by ending the response stream (see [`AckMode`]).
pub struct MemoryRecognizer {
    shared: Arc<Shared>,
    connect_error: Option<StreamError>,
    fail_send_after: Option<usize>,
    ack: AckMode,
}

/// Test/driver side of a [`MemoryRecognizer`].
#[derive(Clone)]
pub struct MemoryRecognizerHandle {
    shared: Arc<Shared>,
}

impl MemoryRecognizer {
    pub fn new() -> (Self, MemoryRecognizerHandle) {
        let shared = Arc::new(Shared::default());
        let recognizer = Self {
            shared: Arc::clone(&shared),
            connect_error: None,
            fail_send_after: None,
            ack: AckMode::Immediate,
        };
        (recognizer, MemoryRecognizerHandle { shared })
    }

    /// Refuse every connection with `error`.
    pub fn with_connect_error(mut self, error: StreamError) -> Self {
        self.connect_error = Some(error);
        self
    }

    /// Accept `count` requests, then fail every further send.
    pub fn with_send_failure_after(mut self, count: usize) -> Self {
        self.fail_send_after = Some(count);
        self
    }

    pub fn with_ack(mut self, ack: AckMode) -> Self {
        self.ack = ack;
        self
    }
}

#[async_trait]
impl RecognitionConnector for MemoryRecognizer {
    async fn connect(&self, credential: &ServiceAccountKey) -> Result<RecognitionStream, StreamError> {
        if let Some(error) = &self.connect_error {
            return Err(error.clone());
        }
        credential.validate()?;

        let (tx, rx) = mpsc::unbounded_channel();
        *self.shared.events.lock() = Some(tx);
        self.shared.requests.lock().clear();
        self.shared.input_complete.store(false, Ordering::SeqCst);
        self.shared.connections.fetch_add(1, Ordering::SeqCst);

        let responses = futures::stream::unfold(rx, |mut rx| async move {
            match rx.recv().await {
                Some(ServerEvent::Response(response)) => Some((Ok(response), rx)),
                Some(ServerEvent::Error(error)) => Some((Err(error), rx)),
                Some(ServerEvent::Complete) | None => None,
            }
        })
        .boxed();

        let requests = MemoryRequestSink {
            shared: Arc::clone(&self.shared),
            sent: 0,
            fail_after: self.fail_send_after,
            ack: self.ack,
        };

        log::debug!("Memory recognizer connected for project {}", credential.project_id);
        Ok(RecognitionStream::new(Box::new(requests), responses))
    }
}

struct MemoryRequestSink {
    shared: Arc<Shared>,
    sent: usize,
    fail_after: Option<usize>,
    ack: AckMode,
}

#[async_trait]
impl RequestSink for MemoryRequestSink {
    async fn send(&mut self, request: RecognitionRequest) -> Result<(), StreamError> {
        if self.shared.input_complete.load(Ordering::SeqCst) {
            return Err(StreamError::Stream("send after end-of-input".into()));
        }
        if self.fail_after.is_some_and(|limit| self.sent >= limit) {
            return Err(StreamError::Stream("connection reset by peer".into()));
        }
        self.shared.requests.lock().push(request);
        self.sent += 1;
        Ok(())
    }

    async fn complete(&mut self) -> Result<(), StreamError> {
        self.shared.input_complete.store(true, Ordering::SeqCst);
        let Some(tx) = self.shared.events.lock().clone() else {
            return Ok(());
        };
        match self.ack {
            AckMode::Immediate => {
                let _ = tx.send(ServerEvent::Complete);
            }
            AckMode::Delayed(delay) => {
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = tx.send(ServerEvent::Complete);
                });
            }
            AckMode::Never => {}
        }
        Ok(())
    }
}

impl MemoryRecognizerHandle {
    /// Queue a response on the current connection. False when not connected.
    pub fn push_response(&self, response: RecognitionResponse) -> bool {
        self.send(ServerEvent::Response(response))
    }

    /// Fail the current connection's response stream.
    pub fn push_error(&self, error: StreamError) -> bool {
        self.send(ServerEvent::Error(error))
    }

    fn send(&self, event: ServerEvent) -> bool {
        match &*self.shared.events.lock() {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }

    /// Every request received on the current connection, in arrival order.
    pub fn requests(&self) -> Vec<RecognitionRequest> {
        self.shared.requests.lock().clone()
    }

    /// Concatenated audio payloads received so far.
    pub fn audio(&self) -> Vec<u8> {
        self.shared
            .requests
            .lock()
            .iter()
            .filter_map(|r| r.audio())
            .flatten()
            .copied()
            .collect()
    }

    pub fn audio_bytes(&self) -> usize {
        self.shared
            .requests
            .lock()
            .iter()
            .filter_map(|r| r.audio())
            .map(|a| a.len())
            .sum()
    }

    /// Whether end-of-input has been received.
    pub fn is_input_complete(&self) -> bool {
        self.shared.input_complete.load(Ordering::SeqCst)
    }

    pub fn connections(&self) -> usize {
        self.shared.connections.load(Ordering::SeqCst)
    }
}
