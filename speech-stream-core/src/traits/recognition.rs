use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::credentials::ServiceAccountKey;
use crate::models::error::StreamError;
use crate::models::recognition::{RecognitionRequest, RecognitionResponse};

/// Inbound half of a recognition stream.
///
/// Ends (`None`) once the recognizer has answered everything it was sent
/// after end-of-input; an `Err` item ends the session.
pub type ResponseStream = BoxStream<'static, Result<RecognitionResponse, StreamError>>;

/// Outbound half of a recognition stream. Messages arrive in call order.
#[async_trait]
pub trait RequestSink: Send {
    /// Send one message, waiting on the transport's flow control.
    async fn send(&mut self, request: RecognitionRequest) -> Result<(), StreamError>;

    /// Signal end-of-input. No `send` follows.
    async fn complete(&mut self) -> Result<(), StreamError>;
}

/// An open bidirectional recognition call.
pub struct RecognitionStream {
    pub requests: Box<dyn RequestSink>,
    pub responses: ResponseStream,
}

impl RecognitionStream {
    pub fn new(requests: Box<dyn RequestSink>, responses: ResponseStream) -> Self {
        Self { requests, responses }
    }
}

/// Opens recognition calls against a speech service.
///
/// Transport and authentication live behind this trait; a failure here is a
/// setup failure and is never retried by the session.
#[async_trait]
pub trait RecognitionConnector: Send + Sync {
    async fn connect(&self, credential: &ServiceAccountKey) -> Result<RecognitionStream, StreamError>;
}
